//! Tree evaluator: stages plus named outputs over an input oscillator.
//!
//! Outputs are declared in order and may reference stages and any output
//! declared before them. A referenced output is computed once per
//! assignment and reused, so a shared VCO frequency feeding both the system
//! clock and the 48 MHz clock is evaluated once.
//!
//! # Ready depth
//!
//! Stages are enumerated in declaration order. An output's *ready depth* is
//! one past the deepest stage it depends on (transitively through referenced
//! outputs). Once that many stages are bound the output's value is final,
//! which is what lets the search prune early.
//!
//! ```text
//!   input ─► /M ─► vco_in ─► *N ─► vco_out ─┬─► /P ─► pllclk ─► /AHB ─► sysclk
//!                                           └─► /Q ─► pll48
//!   depth:      1                2           3 (pllclk) 4 (pll48)    5 (sysclk)
//! ```
//!
//! Arithmetic is exact (`Rational64`) and checked: a zero divisor or an
//! overflow is an [`EvaluationError`], never a silent infinity.

use std::collections::HashMap;
use std::sync::Arc;

use num_traits::{CheckedAdd, CheckedDiv, CheckedMul, CheckedSub, Zero};

use crate::candidate::{Candidate, Layout};
use crate::error::{ConfigError, EvaluationError, PartialAssignment, SolveError};
use crate::expr::{Expr, INPUT};
use crate::stage::StageDomain;
use crate::Rational;

/// Resolved expression: names replaced by stage/output indices.
#[derive(Debug, Clone)]
enum Node {
    Input,
    Const(Rational),
    Stage(usize),
    Output(usize),
    Add(Box<Node>, Box<Node>),
    Sub(Box<Node>, Box<Node>),
    Mul(Box<Node>, Box<Node>),
    Div(Box<Node>, Box<Node>),
}

/// Why a node failed to evaluate; decorated with context by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    DivisionByZero,
    Overflow,
    Unbound,
}

#[derive(Debug, Clone)]
struct Output {
    name: String,
    source: Expr,
    node: Node,
    depth: usize,
}

#[derive(Debug, Clone, Copy)]
enum Binding {
    Stage(usize),
    Output(usize),
}

/// Builder for [`ClockTree`].
#[derive(Debug, Clone)]
pub struct ClockTreeBuilder {
    input: Rational,
    stages: Vec<StageDomain>,
    outputs: Vec<(String, Expr)>,
}

impl ClockTreeBuilder {
    /// Append a stage. Enumeration order is declaration order, so declare
    /// the stages feeding the most outputs first.
    #[must_use]
    pub fn stage(mut self, stage: StageDomain) -> Self {
        self.stages.push(stage);
        self
    }

    /// Append a named output.
    #[must_use]
    pub fn output(mut self, name: impl Into<String>, expr: Expr) -> Self {
        self.outputs.push((name.into(), expr));
        self
    }

    /// Resolve names and validate the tree.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NonPositiveInput`], [`ConfigError::DuplicateName`],
    /// [`ConfigError::UnknownName`] or [`ConfigError::ZeroDivisor`].
    pub fn build(self) -> Result<ClockTree, ConfigError> {
        if self.input <= Rational::zero() {
            return Err(ConfigError::NonPositiveInput);
        }

        let mut names: HashMap<String, Binding> = HashMap::new();
        for (i, stage) in self.stages.iter().enumerate() {
            declare(&mut names, stage.name(), Binding::Stage(i))?;
        }

        let mut outputs: Vec<Output> = Vec::with_capacity(self.outputs.len());
        for (name, source) in self.outputs {
            let resolver = Resolver { name: &name, names: &names, stages: &self.stages, outputs: &outputs };
            let (node, deepest) = resolver.resolve(&source)?;
            let depth = deepest.map_or(0, |d| d.saturating_add(1));
            declare(&mut names, &name, Binding::Output(outputs.len()))?;
            outputs.push(Output { name, source, node, depth });
        }

        let mut by_depth = vec![Vec::new(); self.stages.len().saturating_add(1)];
        for (i, output) in outputs.iter().enumerate() {
            if let Some(level) = by_depth.get_mut(output.depth) {
                level.push(i);
            }
        }

        let layout = Arc::new(Layout {
            stages: self.stages.iter().map(|s| s.name().to_owned()).collect(),
            outputs: outputs.iter().map(|o| o.name.clone()).collect(),
        });

        Ok(ClockTree { input: self.input, stages: self.stages, outputs, by_depth, layout })
    }
}

fn declare(names: &mut HashMap<String, Binding>, name: &str, binding: Binding) -> Result<(), ConfigError> {
    if name == INPUT || names.contains_key(name) {
        return Err(ConfigError::DuplicateName { name: name.to_owned() });
    }
    names.insert(name.to_owned(), binding);
    Ok(())
}

struct Resolver<'a> {
    name: &'a str,
    names: &'a HashMap<String, Binding>,
    stages: &'a [StageDomain],
    outputs: &'a [Output],
}

impl Resolver<'_> {
    /// Returns the resolved node and the deepest stage index it reads.
    fn resolve(&self, expr: &Expr) -> Result<(Node, Option<usize>), ConfigError> {
        let binary = |l: &Expr, r: &Expr| -> Result<(Node, Node, Option<usize>), ConfigError> {
            let (ln, ld) = self.resolve(l)?;
            let (rn, rd) = self.resolve(r)?;
            Ok((ln, rn, ld.max(rd)))
        };
        Ok(match expr {
            Expr::Input => (Node::Input, None),
            Expr::Const(c) => (Node::Const(*c), None),
            Expr::Var(name) => match self.names.get(name) {
                Some(Binding::Stage(i)) => (Node::Stage(*i), Some(*i)),
                Some(Binding::Output(j)) => {
                    let deepest = self.outputs.get(*j).and_then(|o| o.depth.checked_sub(1));
                    (Node::Output(*j), deepest)
                }
                None => {
                    return Err(ConfigError::UnknownName {
                        context: format!("output '{}'", self.name),
                        name: name.clone(),
                    })
                }
            },
            Expr::Add(l, r) => {
                let (l, r, d) = binary(l, r)?;
                (Node::Add(Box::new(l), Box::new(r)), d)
            }
            Expr::Sub(l, r) => {
                let (l, r, d) = binary(l, r)?;
                (Node::Sub(Box::new(l), Box::new(r)), d)
            }
            Expr::Mul(l, r) => {
                let (l, r, d) = binary(l, r)?;
                (Node::Mul(Box::new(l), Box::new(r)), d)
            }
            Expr::Div(l, r) => {
                let (l, r, d) = binary(l, r)?;
                self.check_divisor(&r)?;
                (Node::Div(Box::new(l), Box::new(r)), d)
            }
        })
    }

    fn check_divisor(&self, divisor: &Node) -> Result<(), ConfigError> {
        let offending = match divisor {
            Node::Const(c) if c.is_zero() => Some("0".to_owned()),
            Node::Stage(i) => self
                .stages
                .get(*i)
                .filter(|s| s.contains(0))
                .map(|s| s.name().to_owned()),
            _ => None,
        };
        match offending {
            Some(divisor) => Err(ConfigError::ZeroDivisor { output: self.name.to_owned(), divisor }),
            None => Ok(()),
        }
    }
}

/// A validated clock tree: input frequency, stages and outputs.
#[derive(Debug, Clone)]
pub struct ClockTree {
    input: Rational,
    stages: Vec<StageDomain>,
    outputs: Vec<Output>,
    by_depth: Vec<Vec<usize>>,
    layout: Arc<Layout>,
}

impl ClockTree {
    /// Start a tree fed by an oscillator of `input_hz`.
    pub fn builder(input_hz: Rational) -> ClockTreeBuilder {
        ClockTreeBuilder { input: input_hz, stages: Vec::new(), outputs: Vec::new() }
    }

    /// Input oscillator frequency.
    pub fn input(&self) -> Rational {
        self.input
    }

    /// Stages in enumeration order.
    pub fn stages(&self) -> &[StageDomain] {
        &self.stages
    }

    /// Stage named `name`.
    pub fn stage(&self, name: &str) -> Option<&StageDomain> {
        self.stages.iter().find(|s| s.name() == name)
    }

    /// Output names in declaration order.
    pub fn output_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.outputs.iter().map(|o| o.name.as_str())
    }

    /// Declared expression for output `name`.
    pub fn output_expr(&self, name: &str) -> Option<&Expr> {
        self.outputs.iter().find(|o| o.name == name).map(|o| &o.source)
    }

    /// Number of stages that must be bound before output `name` is final.
    pub fn output_depth(&self, name: &str) -> Option<usize> {
        self.output_index(name).and_then(|j| self.outputs.get(j)).map(|o| o.depth)
    }

    /// Size of the full Cartesian product of all stage domains, saturating.
    pub fn space_size(&self) -> u128 {
        self.stages.iter().fold(1u128, |acc, s| acc.saturating_mul(s.len() as u128))
    }

    /// Copy of this tree with stage `name` replaced by `domain`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownName`] if no such stage exists, or any error
    /// rebuilding the tree raises (e.g. a new zero in a divisor's domain).
    pub fn with_stage(&self, name: &str, domain: StageDomain) -> Result<Self, ConfigError> {
        let index = self.stage_index(name).ok_or_else(|| ConfigError::UnknownName {
            context: "stage replacement".to_owned(),
            name: name.to_owned(),
        })?;
        let mut stages = self.stages.clone();
        if let Some(slot) = stages.get_mut(index) {
            *slot = domain;
        }
        let builder = ClockTreeBuilder {
            input: self.input,
            stages,
            outputs: self.outputs.iter().map(|o| (o.name.clone(), o.source.clone())).collect(),
        };
        builder.build()
    }

    /// Copy of this tree with stage `name` fixed to `value`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownName`] or [`ConfigError::OutOfDomain`].
    pub fn restrict(&self, name: &str, value: u32) -> Result<Self, ConfigError> {
        let domain = self
            .stage(name)
            .ok_or_else(|| ConfigError::UnknownName {
                context: "stage restriction".to_owned(),
                name: name.to_owned(),
            })?
            .restrict(value)?;
        self.with_stage(name, domain)
    }

    /// Evaluate every output for a full assignment given in stage order.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ArityMismatch`] or [`ConfigError::OutOfDomain`] before
    /// any arithmetic; an [`EvaluationError`] if arithmetic fails.
    pub fn evaluate(&self, values: &[u32]) -> Result<Candidate, SolveError> {
        if values.len() != self.stages.len() {
            return Err(ConfigError::ArityMismatch { expected: self.stages.len(), found: values.len() }.into());
        }
        for (stage, &value) in self.stages.iter().zip(values) {
            if !stage.contains(value) {
                return Err(ConfigError::OutOfDomain { stage: stage.name().to_owned(), value }.into());
            }
        }
        let mut outputs = vec![Rational::zero(); self.outputs.len()];
        for j in 0..self.outputs.len() {
            self.eval_output(j, values, values.len(), &mut outputs)?;
        }
        Ok(Candidate::new(Arc::clone(&self.layout), values, &outputs))
    }

    /// Evaluate a full assignment given as `(stage, value)` pairs.
    ///
    /// # Errors
    ///
    /// As [`ClockTree::evaluate`], plus [`ConfigError::MissingStage`] for an
    /// unbound stage and [`ConfigError::UnknownName`] for an undeclared one.
    pub fn evaluate_named(&self, assignment: &[(&str, u32)]) -> Result<Candidate, SolveError> {
        for (name, _) in assignment {
            if self.stage_index(name).is_none() {
                return Err(ConfigError::UnknownName {
                    context: "assignment".to_owned(),
                    name: (*name).to_owned(),
                }
                .into());
            }
        }
        let values = self
            .stages
            .iter()
            .map(|s| {
                assignment
                    .iter()
                    .rev()
                    .find(|(name, _)| *name == s.name())
                    .map(|(_, v)| *v)
                    .ok_or_else(|| ConfigError::MissingStage { stage: s.name().to_owned() })
            })
            .collect::<Result<Vec<u32>, ConfigError>>()?;
        self.evaluate(&values)
    }

    // ── Search support ──────────────────────────────────────────────────────

    pub(crate) fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    /// Outputs whose ready depth is exactly `depth`, in declaration order.
    pub(crate) fn outputs_at(&self, depth: usize) -> &[usize] {
        self.by_depth.get(depth).map_or(&[][..], Vec::as_slice)
    }

    pub(crate) fn output_index(&self, name: &str) -> Option<usize> {
        self.outputs.iter().position(|o| o.name == name)
    }

    pub(crate) fn output_depth_at(&self, index: usize) -> usize {
        self.outputs.get(index).map_or(0, |o| o.depth)
    }

    fn stage_index(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name() == name)
    }

    /// Evaluate output `j` into `outputs[j]`, with the first `bound` entries
    /// of `values` bound. Outputs it references must already be filled in.
    pub(crate) fn eval_output(
        &self,
        j: usize,
        values: &[u32],
        bound: usize,
        outputs: &mut [Rational],
    ) -> Result<(), EvaluationError> {
        let Some(output) = self.outputs.get(j) else {
            return Ok(());
        };
        let bound_values = values.get(..bound).unwrap_or(values);
        match eval_node(&output.node, self.input, bound_values, outputs) {
            Ok(value) => {
                if let Some(slot) = outputs.get_mut(j) {
                    *slot = value;
                }
                Ok(())
            }
            Err(fault) => Err(self.fault_to_error(fault, &output.name, bound_values)),
        }
    }

    fn fault_to_error(&self, fault: Fault, output: &str, values: &[u32]) -> EvaluationError {
        let assignment = PartialAssignment(
            self.stages.iter().zip(values).map(|(s, v)| (s.name().to_owned(), *v)).collect(),
        );
        let output = output.to_owned();
        match fault {
            Fault::DivisionByZero => EvaluationError::DivisionByZero { output, assignment },
            Fault::Overflow => EvaluationError::Overflow { output, assignment },
            Fault::Unbound => EvaluationError::UnboundStage { output, assignment },
        }
    }
}

fn eval_node(node: &Node, input: Rational, values: &[u32], outputs: &[Rational]) -> Result<Rational, Fault> {
    let pair = |l: &Node, r: &Node| -> Result<(Rational, Rational), Fault> {
        Ok((eval_node(l, input, values, outputs)?, eval_node(r, input, values, outputs)?))
    };
    match node {
        Node::Input => Ok(input),
        Node::Const(c) => Ok(*c),
        Node::Stage(i) => values
            .get(*i)
            .map(|v| Rational::from_integer(i64::from(*v)))
            .ok_or(Fault::Unbound),
        Node::Output(j) => outputs.get(*j).copied().ok_or(Fault::Unbound),
        Node::Add(l, r) => {
            let (a, b) = pair(l, r)?;
            a.checked_add(&b).ok_or(Fault::Overflow)
        }
        Node::Sub(l, r) => {
            let (a, b) = pair(l, r)?;
            a.checked_sub(&b).ok_or(Fault::Overflow)
        }
        Node::Mul(l, r) => {
            let (a, b) = pair(l, r)?;
            a.checked_mul(&b).ok_or(Fault::Overflow)
        }
        Node::Div(l, r) => {
            let (a, b) = pair(l, r)?;
            if b.is_zero() {
                return Err(Fault::DivisionByZero);
            }
            a.checked_div(&b).ok_or(Fault::Overflow)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hz;

    fn pll_tree() -> ClockTree {
        ClockTree::builder(hz(8_000_000))
            .stage(StageDomain::range("M", 2, 63).unwrap())
            .stage(StageDomain::range("N", 50, 432).unwrap())
            .stage(StageDomain::values("P", [2, 4, 6, 8]).unwrap())
            .stage(StageDomain::range("Q", 2, 15).unwrap())
            .output("vco_in", Expr::input() / Expr::var("M"))
            .output("vco_out", Expr::var("vco_in") * Expr::var("N"))
            .output("pllclk", Expr::var("vco_out") / Expr::var("P"))
            .output("pll48", Expr::var("vco_out") / Expr::var("Q"))
            .build()
            .unwrap()
    }

    #[test]
    fn ready_depth_follows_deepest_stage() {
        let tree = pll_tree();
        assert_eq!(tree.output_depth("vco_in"), Some(1));
        assert_eq!(tree.output_depth("vco_out"), Some(2));
        assert_eq!(tree.output_depth("pllclk"), Some(3));
        assert_eq!(tree.output_depth("pll48"), Some(4));
    }

    #[test]
    fn evaluates_board_configuration() {
        let tree = pll_tree();
        let c = tree.evaluate(&[8, 336, 2, 7]).unwrap();
        assert_eq!(c.output("vco_out"), Some(Rational::from_integer(336_000_000)));
        assert_eq!(c.output("pllclk"), Some(Rational::from_integer(168_000_000)));
        assert_eq!(c.output("pll48"), Some(Rational::from_integer(48_000_000)));
    }

    #[test]
    fn named_evaluation_matches_positional() {
        let tree = pll_tree();
        let named = tree.evaluate_named(&[("Q", 7), ("P", 2), ("N", 336), ("M", 8)]).unwrap();
        assert_eq!(named, tree.evaluate(&[8, 336, 2, 7]).unwrap());
    }

    #[test]
    fn exact_arithmetic_keeps_non_integer_frequencies() {
        let tree = pll_tree();
        let c = tree.evaluate(&[3, 50, 2, 2]).unwrap();
        assert_eq!(c.output("vco_in"), Some(Rational::new(8_000_000, 3)));
    }

    #[test]
    fn out_of_domain_values_are_rejected_not_clamped() {
        let err = pll_tree().evaluate(&[8, 336, 3, 7]).unwrap_err();
        assert_eq!(err, SolveError::Config(ConfigError::OutOfDomain { stage: "P".into(), value: 3 }));
    }

    #[test]
    fn wrong_arity_is_a_caller_error() {
        let err = pll_tree().evaluate(&[8, 336]).unwrap_err();
        assert_eq!(err, SolveError::Config(ConfigError::ArityMismatch { expected: 4, found: 2 }));
    }

    #[test]
    fn named_evaluation_requires_every_stage() {
        let err = pll_tree().evaluate_named(&[("M", 8), ("N", 336), ("P", 2)]).unwrap_err();
        assert_eq!(err, SolveError::Config(ConfigError::MissingStage { stage: "Q".into() }));
        let err = pll_tree().evaluate_named(&[("X", 1)]).unwrap_err();
        assert!(matches!(err, SolveError::Config(ConfigError::UnknownName { .. })));
    }

    #[test]
    fn unknown_and_forward_references_fail_at_build() {
        let err = ClockTree::builder(hz(8_000_000))
            .stage(StageDomain::range("M", 2, 4).unwrap())
            .output("a", Expr::var("b") * Expr::var("M"))
            .output("b", Expr::input() / Expr::var("M"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownName { context: "output 'a'".into(), name: "b".into() });
    }

    #[test]
    fn duplicate_names_fail_at_build() {
        let err = ClockTree::builder(hz(1))
            .stage(StageDomain::fixed("M", 1))
            .output("M", Expr::input())
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateName { name: "M".into() });

        let err = ClockTree::builder(hz(1)).stage(StageDomain::fixed("input", 1)).build().unwrap_err();
        assert_eq!(err, ConfigError::DuplicateName { name: "input".into() });
    }

    #[test]
    fn non_positive_input_fails_at_build() {
        assert_eq!(ClockTree::builder(hz(0)).build().unwrap_err(), ConfigError::NonPositiveInput);
    }

    #[test]
    fn dividing_by_a_stage_that_can_be_zero_fails_at_build() {
        let err = ClockTree::builder(hz(1_000))
            .stage(StageDomain::flag("odd"))
            .output("bad", Expr::input() / Expr::var("odd"))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroDivisor { output: "bad".into(), divisor: "odd".into() });

        let err = ClockTree::builder(hz(1_000)).output("bad", Expr::input() / Expr::int(0)).build().unwrap_err();
        assert_eq!(err, ConfigError::ZeroDivisor { output: "bad".into(), divisor: "0".into() });
    }

    #[test]
    fn composite_zero_divisor_fails_loudly_at_evaluation() {
        let tree = ClockTree::builder(hz(1_000))
            .stage(StageDomain::range("a", 1, 3).unwrap())
            .output("bad", Expr::input() / (Expr::var("a") - Expr::int(2)))
            .build()
            .unwrap();
        assert!(tree.evaluate(&[1]).is_ok());
        let err = tree.evaluate(&[2]).unwrap_err();
        assert_eq!(
            err,
            SolveError::Evaluation(EvaluationError::DivisionByZero {
                output: "bad".into(),
                assignment: PartialAssignment(vec![("a".into(), 2)]),
            })
        );
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let tree = ClockTree::builder(Rational::from_integer(i64::MAX))
            .stage(StageDomain::fixed("k", 4))
            .output("huge", Expr::input() * Expr::var("k"))
            .build()
            .unwrap();
        let err = tree.evaluate(&[4]).unwrap_err();
        assert!(matches!(err, SolveError::Evaluation(EvaluationError::Overflow { .. })));
    }

    #[test]
    fn restrict_collapses_one_dimension() {
        let tree = pll_tree().restrict("P", 2).unwrap();
        assert_eq!(tree.stage("P").unwrap().as_slice(), &[2]);
        assert_eq!(tree.space_size(), 62 * 383 * 14);
        assert!(pll_tree().restrict("P", 3).is_err());
        assert!(pll_tree().restrict("Z", 3).is_err());
    }
}
