//! Exhaustive clock-tree parameter solver.
//!
//! Microcontroller clock trees derive every on-chip clock from one
//! oscillator through chains of integer dividers and multipliers. Each
//! divider/multiplier (a *stage*) accepts a small set of legal register
//! values; the legal settings are the tuples whose derived clocks (the
//! *outputs*) satisfy every constraint. This crate enumerates those tuples,
//! pruning a sub-tree as soon as an output that is already final fails.
//!
//! # Architecture
//!
//! ```text
//! StageDomain (legal register values)
//!         ↓
//! ClockTree (input + stages + output expressions, exact arithmetic)
//!         ↓
//! Problem (checks + objective) ──solve──► Solution (candidates + stats)
//! ```
//!
//! # Modules
//!
//! - [`stage`] - stage domains
//! - [`expr`] - output expressions and their textual syntax
//! - [`tree`] - tree evaluator
//! - [`constraint`] / [`objective`] - what a match is and how matches rank
//! - [`search`] - depth-first search with early pruning
//! - [`config`] - serde form of trees and queries
//! - [`presets`] - STM32F4 main PLL and PLLI2S trees
//!
//! # Example
//!
//! ```
//! use clocktree::presets::stm32f4;
//! use clocktree::hz;
//!
//! let best = stm32f4::system_clock_problem(hz(180_000_000))
//!     .unwrap()
//!     .best()
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(best.output("pll48"), Some(hz(48_000_000)));
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// ────────────────────────────────────────────────────────────────────────────
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod candidate;
pub mod config;
pub mod constraint;
pub mod error;
pub mod expr;
pub mod objective;
pub mod presets;
pub mod search;
pub mod stage;
pub mod tree;

pub use candidate::Candidate;
pub use config::TreeConfig;
pub use constraint::{Check, Constraint, DEFAULT_TOLERANCE};
pub use error::{ConfigError, EvaluationError, PartialAssignment, Result, SolveError};
pub use expr::{parse_rational, Expr};
pub use objective::Objective;
pub use search::{Problem, Report, SearchStats, Solution};
pub use stage::StageDomain;
pub use tree::{ClockTree, ClockTreeBuilder};

/// Exact frequency or constant: a 64-bit numerator/denominator pair.
pub type Rational = num_rational::Rational64;

/// Integer frequency in Hz as a [`Rational`].
pub fn hz(value: i64) -> Rational {
    Rational::from_integer(value)
}
