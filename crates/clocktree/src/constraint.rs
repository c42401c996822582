//! Constraints on output values.
//!
//! - `Exact` — raw equality on the exact rational. No tolerance: the
//!   reference clock targets are exact rational multiples of the oscillator.
//! - `Tolerance` — strict relative error `|c - t| / |t| < ε`, evaluated in
//!   `f64`.
//! - `Range` — inclusive bounds, either end optional. Used both for targets
//!   and for hardware validity limits such as the VCO input window.

use num_traits::{Signed, ToPrimitive, Zero};

use crate::error::ConfigError;
use crate::Rational;

/// Relative tolerance used by [`Constraint::near`]: 0.1 %.
pub const DEFAULT_TOLERANCE: f64 = 0.001;

/// A predicate over one output value.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `computed == target`.
    Exact(Rational),
    /// `|computed - target| / |target| < epsilon`.
    Tolerance {
        /// Target value.
        target: Rational,
        /// Relative error bound (exclusive).
        epsilon: f64,
    },
    /// `low <= computed <= high`; `None` leaves that side open.
    Range {
        /// Inclusive lower bound.
        low: Option<Rational>,
        /// Inclusive upper bound.
        high: Option<Rational>,
    },
}

impl Constraint {
    /// Exact equality.
    pub fn exact(target: Rational) -> Self {
        Self::Exact(target)
    }

    /// Relative tolerance `epsilon` around `target`.
    pub fn within(target: Rational, epsilon: f64) -> Self {
        Self::Tolerance { target, epsilon }
    }

    /// Relative tolerance of [`DEFAULT_TOLERANCE`] around `target`.
    pub fn near(target: Rational) -> Self {
        Self::within(target, DEFAULT_TOLERANCE)
    }

    /// Inclusive range.
    pub fn between(low: Rational, high: Rational) -> Self {
        Self::Range { low: Some(low), high: Some(high) }
    }

    /// Inclusive lower bound.
    pub fn at_least(low: Rational) -> Self {
        Self::Range { low: Some(low), high: None }
    }

    /// Inclusive upper bound.
    pub fn at_most(high: Rational) -> Self {
        Self::Range { low: None, high: Some(high) }
    }

    /// Check the constraint is well formed. `output` names the output it is
    /// attached to, for the error message.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidTolerance`] or [`ConfigError::MalformedBound`].
    pub fn validate(&self, output: &str) -> Result<(), ConfigError> {
        match self {
            Self::Exact(_) => Ok(()),
            Self::Tolerance { target, epsilon } => {
                if target.is_zero() || !epsilon.is_finite() || *epsilon <= 0.0 {
                    return Err(ConfigError::InvalidTolerance { output: output.to_owned() });
                }
                Ok(())
            }
            Self::Range { low: Some(low), high: Some(high) } if low > high => {
                Err(ConfigError::MalformedBound { output: output.to_owned() })
            }
            Self::Range { .. } => Ok(()),
        }
    }

    /// `true` if `value` satisfies the constraint.
    pub fn accepts(&self, value: Rational) -> bool {
        match self {
            Self::Exact(target) => value == *target,
            Self::Tolerance { target, epsilon } => relative_error(value, *target).is_some_and(|e| e < *epsilon),
            Self::Range { low, high } => {
                low.map_or(true, |l| value >= l) && high.map_or(true, |h| value <= h)
            }
        }
    }
}

fn relative_error(value: Rational, target: Rational) -> Option<f64> {
    let diff = value.to_f64()? - target.to_f64()?;
    let err = diff.abs() / target.abs().to_f64()?;
    err.is_finite().then_some(err)
}

/// A constraint attached to a named output.
#[derive(Debug, Clone, PartialEq)]
pub struct Check {
    /// Output the constraint applies to.
    pub output: String,
    /// The constraint.
    pub constraint: Constraint,
}

impl Check {
    /// Attach `constraint` to `output`.
    pub fn new(output: impl Into<String>, constraint: Constraint) -> Self {
        Self { output: output.into(), constraint }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hz;

    #[test]
    fn exact_has_no_tolerance() {
        let c = Constraint::exact(hz(48_000_000));
        assert!(c.accepts(hz(48_000_000)));
        assert!(!c.accepts(Rational::new(48_000_000 * 3 + 1, 3)));
    }

    #[test]
    fn tolerance_is_strict_and_relative_to_target() {
        let c = Constraint::within(hz(1_000), 0.001);
        assert!(c.accepts(Rational::new(10_009, 10)));
        assert!(c.accepts(Rational::new(9_991, 10)));
        // Exactly 0.1 % off is outside a strict bound.
        assert!(!c.accepts(hz(1_001)));
        assert!(!c.accepts(hz(999)));
    }

    #[test]
    fn i2s_board_rate_is_within_default_tolerance_of_44100() {
        // 429 * 1 MHz / 2 / (256 * 19)
        let fs = Rational::new(214_500_000, 4_864);
        assert!(Constraint::near(hz(44_100)).accepts(fs));
    }

    #[test]
    fn range_is_inclusive_and_sides_are_optional() {
        let vco_in = Constraint::between(hz(1_000_000), hz(2_000_000));
        assert!(vco_in.accepts(hz(1_000_000)));
        assert!(vco_in.accepts(hz(2_000_000)));
        assert!(!vco_in.accepts(hz(2_000_001)));
        assert!(Constraint::at_most(hz(180_000_000)).accepts(hz(0)));
        assert!(!Constraint::at_least(hz(10)).accepts(hz(9)));
    }

    #[test]
    fn validation_rejects_malformed_constraints() {
        assert_eq!(
            Constraint::between(hz(2), hz(1)).validate("x"),
            Err(ConfigError::MalformedBound { output: "x".into() })
        );
        for bad in [Constraint::within(hz(0), 0.1), Constraint::within(hz(5), 0.0), Constraint::within(hz(5), f64::NAN)] {
            assert_eq!(bad.validate("fs"), Err(ConfigError::InvalidTolerance { output: "fs".into() }));
        }
        assert!(Constraint::between(hz(1), hz(1)).validate("x").is_ok());
    }
}
