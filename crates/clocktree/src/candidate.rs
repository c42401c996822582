//! A full stage assignment together with every computed output.

use std::sync::Arc;

use num_traits::ToPrimitive;

use crate::Rational;

/// Stage and output names shared by every candidate of one tree.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub(crate) stages: Vec<String>,
    pub(crate) outputs: Vec<String>,
}

impl Layout {
    fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s == name)
    }

    fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|s| s == name)
    }
}

/// One full tuple of stage values plus the value of every output.
///
/// Immutable once built. Two candidates are equal when their stage values
/// and output values are equal.
#[derive(Debug, Clone)]
pub struct Candidate {
    layout: Arc<Layout>,
    values: Box<[u32]>,
    outputs: Box<[Rational]>,
}

impl Candidate {
    pub(crate) fn new(layout: Arc<Layout>, values: &[u32], outputs: &[Rational]) -> Self {
        Self { layout, values: values.into(), outputs: outputs.into() }
    }

    /// Stage values in declaration order.
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    /// Output values in declaration order.
    pub fn output_values(&self) -> &[Rational] {
        &self.outputs
    }

    /// Value chosen for stage `name`.
    pub fn stage(&self, name: &str) -> Option<u32> {
        self.layout.stage_index(name).and_then(|i| self.values.get(i).copied())
    }

    /// Exact value of output `name`.
    pub fn output(&self, name: &str) -> Option<Rational> {
        self.layout.output_index(name).and_then(|i| self.outputs.get(i).copied())
    }

    /// Value of output `name` as `f64`, for reporting.
    pub fn output_hz(&self, name: &str) -> Option<f64> {
        self.output(name).and_then(|r| r.to_f64())
    }

    /// `(name, value)` pairs for every stage.
    pub fn stages(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.layout.stages.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// `(name, value)` pairs for every output.
    pub fn outputs(&self) -> impl Iterator<Item = (&str, Rational)> + '_ {
        self.layout.outputs.iter().map(String::as_str).zip(self.outputs.iter().copied())
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values && self.outputs == other.outputs
    }
}

impl Eq for Candidate {}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> Arc<Layout> {
        Arc::new(Layout {
            stages: vec!["M".into(), "N".into()],
            outputs: vec!["vco".into()],
        })
    }

    #[test]
    fn lookups_by_name() {
        let c = Candidate::new(layout(), &[8, 336], &[Rational::from_integer(336_000_000)]);
        assert_eq!(c.stage("N"), Some(336));
        assert_eq!(c.stage("Q"), None);
        assert_eq!(c.output("vco"), Some(Rational::from_integer(336_000_000)));
        assert_eq!(c.output_hz("vco"), Some(336_000_000.0));
        assert_eq!(c.stages().collect::<Vec<_>>(), vec![("M", 8), ("N", 336)]);
    }

    #[test]
    fn equality_ignores_layout_identity() {
        let out = [Rational::new(1, 3)];
        let a = Candidate::new(layout(), &[1, 2], &out);
        let b = Candidate::new(layout(), &[1, 2], &out);
        let c = Candidate::new(layout(), &[1, 3], &out);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
