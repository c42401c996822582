//! Ready-made clock trees for supported parts.

pub mod stm32f4;
