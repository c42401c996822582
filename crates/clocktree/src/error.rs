//! Error types for tree construction, evaluation and search.
//!
//! Two failure classes exist and they never mix:
//!
//! - [`ConfigError`] — the tree or query is malformed. Detected before any
//!   enumeration starts.
//! - [`EvaluationError`] — arithmetic failed while evaluating an output for a
//!   concrete (partial) assignment. Aborts the search.
//!
//! An unsatisfiable query is neither: it produces an empty
//! [`Solution`](crate::Solution).

use core::fmt;

use thiserror::Error;

/// Result type for solver operations.
pub type Result<T> = core::result::Result<T, SolveError>;

/// A malformed stage domain, tree, constraint or query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A stage was declared with no legal values.
    #[error("stage '{stage}' has an empty domain")]
    EmptyDomain {
        /// Stage name.
        stage: String,
    },

    /// An inclusive range with `low > high`.
    #[error("stage '{stage}' has a malformed range {low}..={high}")]
    MalformedRange {
        /// Stage name.
        stage: String,
        /// Lower bound as given.
        low: u32,
        /// Upper bound as given.
        high: u32,
    },

    /// An explicit value list repeats a value.
    #[error("stage '{stage}' lists value {value} more than once")]
    DuplicateValue {
        /// Stage name.
        stage: String,
        /// The repeated value.
        value: u32,
    },

    /// A value was requested that the stage domain does not contain.
    #[error("value {value} is outside the domain of stage '{stage}'")]
    OutOfDomain {
        /// Stage name.
        stage: String,
        /// Rejected value.
        value: u32,
    },

    /// Two stages or outputs share a name, or a name shadows `input`.
    #[error("name '{name}' is declared more than once")]
    DuplicateName {
        /// The clashing name.
        name: String,
    },

    /// A reference to a stage or output that is not declared (or is declared
    /// after the referring output).
    #[error("{context} references unknown name '{name}'")]
    UnknownName {
        /// Where the reference appeared, e.g. `output 'sysclk'`.
        context: String,
        /// The unresolved name.
        name: String,
    },

    /// An output divides by a constant zero or by a stage whose domain
    /// contains zero.
    #[error("output '{output}' divides by '{divisor}', which can be zero")]
    ZeroDivisor {
        /// Output name.
        output: String,
        /// The offending divisor (stage name or `0`).
        divisor: String,
    },

    /// The input oscillator frequency is zero or negative.
    #[error("input frequency must be positive")]
    NonPositiveInput,

    /// A tolerance constraint with a zero target or a bad epsilon.
    #[error("tolerance check on '{output}' needs a non-zero target and a finite epsilon > 0")]
    InvalidTolerance {
        /// Output name.
        output: String,
    },

    /// A range constraint with `low > high`.
    #[error("range check on '{output}' has low bound above high bound")]
    MalformedBound {
        /// Output name.
        output: String,
    },

    /// A config stage entry that does not describe exactly one domain kind.
    #[error("stage '{stage}' is not a valid domain: {reason}")]
    InvalidStage {
        /// Stage name.
        stage: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A config check entry that does not describe exactly one constraint kind.
    #[error("check on '{output}' is not a valid constraint: {reason}")]
    InvalidConstraint {
        /// Output name.
        output: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Best-only reporting requested without an objective to rank by.
    #[error("best-only reporting requires an objective")]
    MissingObjective,

    /// A full assignment has the wrong number of values.
    #[error("assignment has {found} values, tree has {expected} stages")]
    ArityMismatch {
        /// Number of declared stages.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },

    /// A named assignment leaves a stage unbound.
    #[error("assignment does not bind stage '{stage}'")]
    MissingStage {
        /// Stage name.
        stage: String,
    },

    /// Expression or number text could not be parsed.
    #[error("cannot parse '{text}': {reason}")]
    Parse {
        /// The offending text.
        text: String,
        /// Parser diagnostic.
        reason: String,
    },
}

/// Arithmetic failure while evaluating an output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    /// A divisor evaluated to zero.
    #[error("division by zero in output '{output}' at {assignment}")]
    DivisionByZero {
        /// Output being evaluated.
        output: String,
        /// The stages bound when the failure happened.
        assignment: PartialAssignment,
    },

    /// An expression read a stage that is not bound at its evaluation depth.
    #[error("output '{output}' read an unbound stage at {assignment}")]
    UnboundStage {
        /// Output being evaluated.
        output: String,
        /// The stages bound when the failure happened.
        assignment: PartialAssignment,
    },

    /// The exact 64-bit rational overflowed.
    #[error("arithmetic overflow in output '{output}' at {assignment}")]
    Overflow {
        /// Output being evaluated.
        output: String,
        /// The stages bound when the failure happened.
        assignment: PartialAssignment,
    },
}

/// Any failure surfaced by [`Problem::solve`](crate::Problem::solve).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// Setup failed; no enumeration was attempted.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Enumeration aborted on an arithmetic failure.
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

/// The stage values bound at the time of an evaluation failure, in
/// enumeration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialAssignment(pub Vec<(String, u32)>);

impl fmt::Display for PartialAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<no stages bound>");
        }
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}
