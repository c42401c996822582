//! Declarative clock-tree descriptions.
//!
//! A [`TreeConfig`] is the serde form of a tree plus its query, so boards can
//! be described in data files instead of code:
//!
//! ```json
//! {
//!   "input_hz": 8000000,
//!   "stages": [
//!     { "name": "M", "range": [2, 63] },
//!     { "name": "P", "values": [2, 4, 6, 8] },
//!     { "name": "odd", "flag": true }
//!   ],
//!   "outputs": [{ "name": "vco_in", "expr": "input / M" }],
//!   "checks": [
//!     { "output": "vco_in", "min": 1000000, "max": 2000000 },
//!     { "output": "fs", "target": "44100", "tolerance": 0.001 }
//!   ],
//!   "objective": { "maximize": "sysclk" }
//! }
//! ```
//!
//! Numbers may be JSON integers, JSON floats or strings accepted by
//! [`parse_rational`].

use serde::Deserialize;

use crate::constraint::{Constraint, DEFAULT_TOLERANCE};
use crate::error::ConfigError;
use crate::expr::{parse_rational, Expr};
use crate::objective::Objective;
use crate::search::Problem;
use crate::stage::StageDomain;
use crate::tree::ClockTree;
use crate::Rational;

/// A frequency or constant as written in a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Number {
    /// JSON integer.
    Int(i64),
    /// JSON float. Converted through its shortest decimal form.
    Float(f64),
    /// `"35156.25"`, `"1000000/3"`.
    Text(String),
}

impl Number {
    /// Exact value.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for text or floats that are not a representable
    /// rational.
    pub fn to_rational(&self) -> Result<Rational, ConfigError> {
        match self {
            Self::Int(v) => Ok(Rational::from_integer(*v)),
            Self::Float(v) if !v.is_finite() => {
                Err(ConfigError::Parse { text: v.to_string(), reason: "not a finite number".to_owned() })
            }
            Self::Float(v) => parse_rational(&v.to_string()),
            Self::Text(text) => parse_rational(text),
        }
    }
}

/// One stage: a name plus exactly one of `range`, `values`, `flag` or `fixed`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    /// Stage name.
    pub name: String,
    /// Inclusive `[low, high]`.
    #[serde(default)]
    pub range: Option<[u32; 2]>,
    /// Explicit ordered values.
    #[serde(default)]
    pub values: Option<Vec<u32>>,
    /// `true` for a `{0, 1}` domain.
    #[serde(default)]
    pub flag: Option<bool>,
    /// Single value.
    #[serde(default)]
    pub fixed: Option<u32>,
}

impl StageConfig {
    fn into_domain(self) -> Result<StageDomain, ConfigError> {
        let invalid = |stage: &str, reason: &str| ConfigError::InvalidStage {
            stage: stage.to_owned(),
            reason: reason.to_owned(),
        };
        let kinds = [self.range.is_some(), self.values.is_some(), self.flag.is_some(), self.fixed.is_some()];
        match kinds.iter().filter(|k| **k).count() {
            0 => return Err(invalid(&self.name, "needs one of range, values, flag or fixed")),
            1 => {}
            _ => return Err(invalid(&self.name, "range, values, flag and fixed are mutually exclusive")),
        }
        match self {
            Self { name, range: Some([low, high]), .. } => StageDomain::range(name, low, high),
            Self { name, values: Some(values), .. } => StageDomain::values(name, values),
            Self { name, flag: Some(true), .. } => Ok(StageDomain::flag(name)),
            Self { name, fixed: Some(value), .. } => Ok(StageDomain::fixed(name, value)),
            Self { name, .. } => Err(invalid(&name, "flag must be true when given")),
        }
    }
}

/// One derived output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Output name.
    pub name: String,
    /// Expression text, e.g. `"vco_out / P"`.
    pub expr: String,
}

/// One check: an output plus `exact`, `target` (with optional `tolerance`),
/// or `min`/`max`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckConfig {
    /// Output the check applies to.
    pub output: String,
    /// Exact value.
    #[serde(default)]
    pub exact: Option<Number>,
    /// Tolerance target.
    #[serde(default)]
    pub target: Option<Number>,
    /// Relative tolerance; defaults to [`DEFAULT_TOLERANCE`].
    #[serde(default)]
    pub tolerance: Option<f64>,
    /// Inclusive lower bound.
    #[serde(default)]
    pub min: Option<Number>,
    /// Inclusive upper bound.
    #[serde(default)]
    pub max: Option<Number>,
}

impl CheckConfig {
    fn to_constraint(&self) -> Result<Constraint, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidConstraint {
            output: self.output.clone(),
            reason: reason.to_owned(),
        };
        let bounded = self.min.is_some() || self.max.is_some();
        match (&self.exact, &self.target, bounded) {
            (Some(exact), None, false) => {
                if self.tolerance.is_some() {
                    return Err(invalid("tolerance needs target, not exact"));
                }
                Ok(Constraint::exact(exact.to_rational()?))
            }
            (None, Some(target), false) => Ok(Constraint::within(
                target.to_rational()?,
                self.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            )),
            (None, None, true) => {
                if self.tolerance.is_some() {
                    return Err(invalid("tolerance needs target, not min/max"));
                }
                let low = self.min.as_ref().map(Number::to_rational).transpose()?;
                let high = self.max.as_ref().map(Number::to_rational).transpose()?;
                Ok(Constraint::Range { low, high })
            }
            (None, None, false) => Err(invalid("needs one of exact, target or min/max")),
            _ => Err(invalid("exact, target and min/max are mutually exclusive")),
        }
    }
}

/// Ranking, written `{"maximize": "sysclk"}`, `{"minimize": "fs"}` or
/// `{"closest": {"output": "fs", "target": 44100}}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum ObjectiveConfig {
    /// Largest value first.
    Maximize(String),
    /// Smallest value first.
    Minimize(String),
    /// Nearest to `target` first.
    Closest {
        /// Output being ranked.
        output: String,
        /// Desired value.
        target: Number,
    },
}

impl ObjectiveConfig {
    fn to_objective(&self) -> Result<Objective, ConfigError> {
        Ok(match self {
            Self::Maximize(output) => Objective::maximize(output.as_str()),
            Self::Minimize(output) => Objective::minimize(output.as_str()),
            Self::Closest { output, target } => Objective::closest_to(output.as_str(), target.to_rational()?),
        })
    }
}

/// A whole tree and query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TreeConfig {
    /// Oscillator frequency.
    pub input_hz: Number,
    /// Stages in enumeration order.
    pub stages: Vec<StageConfig>,
    /// Outputs in declaration order.
    pub outputs: Vec<OutputConfig>,
    /// Checks.
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
    /// Ranking.
    #[serde(default)]
    pub objective: Option<ObjectiveConfig>,
}

impl TreeConfig {
    /// Build the tree alone.
    ///
    /// # Errors
    ///
    /// Any [`ConfigError`] from parsing numbers and expressions or from
    /// [`ClockTreeBuilder::build`](crate::ClockTreeBuilder::build).
    pub fn to_tree(&self) -> Result<ClockTree, ConfigError> {
        let mut builder = ClockTree::builder(self.input_hz.to_rational()?);
        for stage in &self.stages {
            builder = builder.stage(stage.clone().into_domain()?);
        }
        for output in &self.outputs {
            builder = builder.output(output.name.as_str(), output.expr.parse::<Expr>()?);
        }
        builder.build()
    }

    /// Build the tree, checks and objective.
    ///
    /// Check targets and constraint shapes are validated here; whether they
    /// name real outputs is validated when the problem is solved.
    ///
    /// # Errors
    ///
    /// See [`TreeConfig::to_tree`]; also [`ConfigError::InvalidConstraint`].
    pub fn to_problem(&self) -> Result<Problem, ConfigError> {
        let mut problem = Problem::new(self.to_tree()?);
        for check in &self.checks {
            let constraint = check.to_constraint()?;
            constraint.validate(&check.output)?;
            problem = problem.check(check.output.as_str(), constraint);
        }
        if let Some(objective) = &self.objective {
            problem = problem.objective(objective.to_objective()?);
        }
        Ok(problem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hz;

    fn stage(json: &str) -> Result<StageDomain, ConfigError> {
        serde_json::from_str::<StageConfig>(json).unwrap().into_domain()
    }

    fn check(json: &str) -> Result<Constraint, ConfigError> {
        serde_json::from_str::<CheckConfig>(json).unwrap().to_constraint()
    }

    #[test]
    fn numbers_accept_integers_floats_and_text() {
        let n: Vec<Number> = serde_json::from_str(r#"[8000000, 35156.25, "1000000/3", "0.5"]"#).unwrap();
        assert_eq!(n[0].to_rational(), Ok(hz(8_000_000)));
        assert_eq!(n[1].to_rational(), Ok(Rational::new(140_625, 4)));
        assert_eq!(n[2].to_rational(), Ok(Rational::new(1_000_000, 3)));
        assert_eq!(n[3].to_rational(), Ok(Rational::new(1, 2)));
        assert!(Number::Text("abc".into()).to_rational().is_err());
    }

    #[test]
    fn each_stage_kind_builds_its_domain() {
        assert_eq!(stage(r#"{"name":"M","range":[2,4]}"#).unwrap().as_slice(), &[2, 3, 4]);
        assert_eq!(stage(r#"{"name":"P","values":[8,2]}"#).unwrap().as_slice(), &[8, 2]);
        assert_eq!(stage(r#"{"name":"odd","flag":true}"#).unwrap().as_slice(), &[0, 1]);
        assert_eq!(stage(r#"{"name":"sr","fixed":2}"#).unwrap().as_slice(), &[2]);
    }

    #[test]
    fn stage_needs_exactly_one_kind() {
        assert!(matches!(stage(r#"{"name":"M"}"#), Err(ConfigError::InvalidStage { .. })));
        assert!(matches!(
            stage(r#"{"name":"M","range":[1,2],"fixed":1}"#),
            Err(ConfigError::InvalidStage { .. })
        ));
        assert!(matches!(stage(r#"{"name":"M","flag":false}"#), Err(ConfigError::InvalidStage { .. })));
        assert!(matches!(stage(r#"{"name":"M","range":[5,2]}"#), Err(ConfigError::MalformedRange { .. })));
    }

    #[test]
    fn check_kinds_map_to_constraints() {
        assert_eq!(check(r#"{"output":"pll48","exact":48000000}"#), Ok(Constraint::exact(hz(48_000_000))));
        assert_eq!(check(r#"{"output":"fs","target":44100}"#), Ok(Constraint::near(hz(44_100))));
        assert_eq!(
            check(r#"{"output":"fs","target":44100,"tolerance":0.01}"#),
            Ok(Constraint::within(hz(44_100), 0.01))
        );
        assert_eq!(check(r#"{"output":"sysclk","max":180000000}"#), Ok(Constraint::at_most(hz(180_000_000))));
    }

    #[test]
    fn conflicting_check_kinds_are_rejected() {
        for json in [
            r#"{"output":"x"}"#,
            r#"{"output":"x","exact":1,"target":1}"#,
            r#"{"output":"x","exact":1,"tolerance":0.1}"#,
            r#"{"output":"x","min":1,"tolerance":0.1}"#,
        ] {
            assert!(matches!(check(json), Err(ConfigError::InvalidConstraint { .. })), "{json}");
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<StageConfig>(r#"{"name":"M","rnage":[1,2]}"#).is_err());
    }

    #[test]
    fn objectives_use_externally_tagged_form() {
        let o: ObjectiveConfig = serde_json::from_str(r#"{"closest":{"output":"fs","target":"44100"}}"#).unwrap();
        assert_eq!(o.to_objective(), Ok(Objective::closest_to("fs", hz(44_100))));
        let o: ObjectiveConfig = serde_json::from_str(r#"{"maximize":"sysclk"}"#).unwrap();
        assert_eq!(o.to_objective(), Ok(Objective::maximize("sysclk")));
    }

    #[test]
    fn malformed_range_check_fails_at_build() {
        let cfg: TreeConfig = serde_json::from_str(
            r#"{"input_hz":8,"stages":[],"outputs":[{"name":"o","expr":"input"}],
                "checks":[{"output":"o","min":5,"max":1}]}"#,
        )
        .unwrap();
        assert_eq!(cfg.to_problem().unwrap_err(), ConfigError::MalformedBound { output: "o".into() });
    }
}
