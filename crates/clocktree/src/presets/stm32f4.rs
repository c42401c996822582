//! STM32F4 main PLL and PLLI2S clock trees (8 MHz HSE boards such as the
//! STM32F4-Discovery).
//!
//! # Main PLL
//!
//! ```text
//!   HSE (8 MHz) -> /M -> VCO_IN (1-2 MHz)
//!                        -> xN -> VCO_OUT (100-432 MHz)
//!                                 -> /P -> PLLCLK -> /AHB -> SYSCLK (<= 180 MHz)
//!                                 -> /Q -> PLL48CK (USB OTG FS, SDIO, RNG: 48 MHz)
//! ```
//!
//! # PLLI2S
//!
//! The I2S PLL shares the main PLL's M divider, fixed at 8 here, so it is
//! fed with 1 MHz.
//!
//! ```text
//!   HSE (8 MHz) -> /8 -> xPLLI2SN -> /PLLI2SR -> I2SCLK
//!   I2SCLK -> /(FRAME x (2 x I2SDIV + ODD)) -> Fs
//!
//!   FRAME = 256              when MCLK output is enabled (MCKOE = 1)
//!         = 2 x CHLEN        otherwise (32 for 16-bit, 64 for 32-bit channels)
//! ```
//!
//! References:
//! - STM32F4 RM0090, S6.3.2 (RCC_PLLCFGR: M 2-63, N 50-432, P 2/4/6/8, Q 2-15)
//! - STM32F4 RM0090, S6.3.23 (RCC_PLLI2SCFGR: R 2-7)
//! - STM32F4 RM0090, S28.4.4 (I2S clock generator, I2SDIV 2-255, ODD)

use crate::constraint::Constraint;
use crate::error::ConfigError;
use crate::expr::Expr;
use crate::objective::Objective;
use crate::search::Problem;
use crate::stage::StageDomain;
use crate::tree::ClockTree;
use crate::{hz, Rational};

/// External crystal on the Discovery board.
pub const HSE_HZ: i64 = 8_000_000;

/// Legal AHB prescaler values (HPRE). There is no /32.
pub const AHB_PRESCALERS: [u32; 9] = [1, 2, 4, 8, 16, 64, 128, 256, 512];

/// Legal main PLL P divider values.
pub const PLL_P_VALUES: [u32; 4] = [2, 4, 6, 8];

/// VCO input window, RM0090 S6.3.2.
pub const VCO_INPUT_MIN_HZ: i64 = 1_000_000;
/// VCO input window, RM0090 S6.3.2.
pub const VCO_INPUT_MAX_HZ: i64 = 2_000_000;
/// VCO output window, RM0090 S6.3.2.
pub const VCO_OUTPUT_MIN_HZ: i64 = 100_000_000;
/// VCO output window, RM0090 S6.3.2.
pub const VCO_OUTPUT_MAX_HZ: i64 = 432_000_000;

/// Maximum system clock on STM32F42x/43x with over-drive.
pub const SYSCLK_MAX_HZ: i64 = 180_000_000;

/// USB OTG FS needs exactly 48 MHz on PLL48CK.
pub const PLL48_HZ: i64 = 48_000_000;

/// Fixed PLL M divider feeding PLLI2S.
pub const I2S_PLL_M: i64 = 8;

/// Legal I2S channel lengths (bits).
pub const I2S_CHANNEL_LENGTHS: [u32; 2] = [16, 32];

/// Main PLL tree.
///
/// Stages in enumeration order: `M`, `N`, `P`, `Q`, `AHB`.
/// Outputs: `vco_in`, `vco_out`, `pllclk`, `pll48`, `sysclk`.
///
/// # Errors
///
/// Never for these constants; the `Result` mirrors [`ClockTree::builder`].
pub fn system_clock_tree() -> Result<ClockTree, ConfigError> {
    ClockTree::builder(hz(HSE_HZ))
        .stage(StageDomain::range("M", 2, 63)?)
        .stage(StageDomain::range("N", 50, 432)?)
        .stage(StageDomain::values("P", PLL_P_VALUES)?)
        .stage(StageDomain::range("Q", 2, 15)?)
        .stage(StageDomain::values("AHB", AHB_PRESCALERS)?)
        .output("vco_in", Expr::input() / Expr::var("M"))
        .output("vco_out", Expr::var("vco_in") * Expr::var("N"))
        .output("pllclk", Expr::var("vco_out") / Expr::var("P"))
        .output("pll48", Expr::var("vco_out") / Expr::var("Q"))
        .output("sysclk", Expr::var("pllclk") / Expr::var("AHB"))
        .build()
}

/// Fastest legal system clock not above `sysclk_max` with PLL48CK at
/// exactly 48 MHz and both VCO windows respected. Ranked by `sysclk`.
///
/// # Errors
///
/// Propagates tree construction errors.
pub fn system_clock_problem(sysclk_max: Rational) -> Result<Problem, ConfigError> {
    Ok(Problem::new(system_clock_tree()?)
        .check("vco_in", Constraint::between(hz(VCO_INPUT_MIN_HZ), hz(VCO_INPUT_MAX_HZ)))
        .check("vco_out", Constraint::between(hz(VCO_OUTPUT_MIN_HZ), hz(VCO_OUTPUT_MAX_HZ)))
        .check("pll48", Constraint::exact(hz(PLL48_HZ)))
        .check("sysclk", Constraint::at_most(sysclk_max))
        .objective(Objective::maximize("sysclk")))
}

/// Every tuple giving exactly `sysclk` and exactly 48 MHz on PLL48CK, with
/// no VCO window checks.
///
/// # Errors
///
/// Propagates tree construction errors.
pub fn exact_system_clock_problem(sysclk: Rational) -> Result<Problem, ConfigError> {
    Ok(Problem::new(system_clock_tree()?)
        .check("pll48", Constraint::exact(hz(PLL48_HZ)))
        .check("sysclk", Constraint::exact(sysclk)))
}

/// PLLI2S plus I2S prescaler tree.
///
/// Stages in enumeration order: `sn` (PLLI2SN), `sr` (PLLI2SR), `chlen`,
/// `mckoe`, `div` (I2SDIV), `odd` (ODD).
/// Outputs: `i2sclk`, `frame`, `fs`.
///
/// # Errors
///
/// Never for these constants; the `Result` mirrors [`ClockTree::builder`].
pub fn i2s_clock_tree() -> Result<ClockTree, ConfigError> {
    let frame = Expr::var("mckoe") * Expr::int(256)
        + (Expr::int(1) - Expr::var("mckoe")) * Expr::int(2) * Expr::var("chlen");
    let divider = Expr::int(2) * Expr::var("div") + Expr::var("odd");
    ClockTree::builder(hz(HSE_HZ))
        .stage(StageDomain::range("sn", 2, 432)?)
        .stage(StageDomain::range("sr", 2, 7)?)
        .stage(StageDomain::values("chlen", I2S_CHANNEL_LENGTHS)?)
        .stage(StageDomain::flag("mckoe"))
        .stage(StageDomain::range("div", 2, 255)?)
        .stage(StageDomain::flag("odd"))
        .output("i2sclk", Expr::input() / Expr::int(I2S_PLL_M) * Expr::var("sn") / Expr::var("sr"))
        .output("frame", frame)
        .output("fs", Expr::var("i2sclk") / (Expr::var("frame") * divider))
        .build()
}

/// Settings whose sample rate is within `epsilon` (relative) of `fs`,
/// ordered by ascending sample rate. `chlen` and `mckoe` fix those stages
/// when given.
///
/// # Errors
///
/// [`ConfigError::OutOfDomain`] for an illegal channel length,
/// [`ConfigError::InvalidTolerance`] surfaces when the problem is solved.
pub fn i2s_problem(
    fs: Rational,
    epsilon: f64,
    chlen: Option<u32>,
    mckoe: Option<bool>,
) -> Result<Problem, ConfigError> {
    let mut problem = Problem::new(i2s_clock_tree()?)
        .check("fs", Constraint::within(fs, epsilon))
        .objective(Objective::minimize("fs"));
    if let Some(chlen) = chlen {
        problem = problem.restrict("chlen", chlen)?;
    }
    if let Some(mckoe) = mckoe {
        problem = problem.restrict("mckoe", u32::from(mckoe))?;
    }
    Ok(problem)
}
