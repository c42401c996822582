//! Ranking objectives.
//!
//! An objective maps a candidate's output value to an exact score where a
//! larger score is better. Scores give a total order over matches.

use num_traits::{CheckedSub, Signed, Zero};

use crate::Rational;

/// What makes one match better than another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Objective {
    /// Larger output value is better.
    Maximize(String),
    /// Smaller output value is better.
    Minimize(String),
    /// Smaller distance to `target` is better.
    ClosestTo {
        /// Output being ranked.
        output: String,
        /// Desired value.
        target: Rational,
    },
}

impl Objective {
    /// Prefer the largest value of `output`.
    pub fn maximize(output: impl Into<String>) -> Self {
        Self::Maximize(output.into())
    }

    /// Prefer the smallest value of `output`.
    pub fn minimize(output: impl Into<String>) -> Self {
        Self::Minimize(output.into())
    }

    /// Prefer values of `output` nearest to `target`.
    pub fn closest_to(output: impl Into<String>, target: Rational) -> Self {
        Self::ClosestTo { output: output.into(), target }
    }

    /// The output this objective ranks.
    pub fn output(&self) -> &str {
        match self {
            Self::Maximize(o) | Self::Minimize(o) | Self::ClosestTo { output: o, .. } => o,
        }
    }

    /// Score for `value`; larger is better. `None` on overflow.
    pub fn score(&self, value: Rational) -> Option<Rational> {
        match self {
            Self::Maximize(_) => Some(value),
            Self::Minimize(_) => Rational::zero().checked_sub(&value),
            Self::ClosestTo { target, .. } => {
                let distance = value.checked_sub(target)?;
                // -|d|, without negating i64::MIN.
                if distance.is_negative() {
                    Some(distance)
                } else {
                    Rational::zero().checked_sub(&distance)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hz;

    #[test]
    fn maximize_and_minimize_order_opposite_ways() {
        let max = Objective::maximize("sysclk");
        let min = Objective::minimize("sysclk");
        assert!(max.score(hz(180)) > max.score(hz(168)));
        assert!(min.score(hz(180)) < min.score(hz(168)));
        assert_eq!(max.output(), "sysclk");
    }

    #[test]
    fn closest_to_is_symmetric_around_target() {
        let obj = Objective::closest_to("fs", hz(44_100));
        assert_eq!(obj.score(hz(44_000)), obj.score(hz(44_200)));
        assert!(obj.score(hz(44_099)) > obj.score(hz(44_000)));
        assert_eq!(obj.score(hz(44_100)), Some(hz(0)));
    }

    #[test]
    fn scores_overflow_to_none_instead_of_panicking() {
        let min = Rational::from_integer(i64::MIN);
        assert_eq!(Objective::minimize("x").score(min), None);
        assert_eq!(Objective::maximize("x").score(min), Some(min));
        // Distance below target is already -|d|.
        assert_eq!(Objective::closest_to("x", hz(0)).score(min), Some(min));
        assert_eq!(Objective::closest_to("x", hz(1)).score(min), None);
        assert_eq!(Objective::closest_to("x", hz(-1)).score(min), Some(min + hz(1)));
    }
}
