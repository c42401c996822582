//! Search & ranking engine.
//!
//! Depth-first enumeration of the Cartesian product of all stage domains,
//! outer stage first. After each stage is bound, every output whose ready
//! depth has been reached is evaluated and its checks applied; a failing
//! check skips the whole remaining inner sub-tree. Because a check only runs
//! once every stage it reads is bound, its verdict is the same one it would
//! give on any full tuple extending the partial assignment, so pruning never
//! changes which tuples match.
//!
//! Evaluation errors only surface in sub-trees the search actually enters.
//! An output that would divide by zero somewhere under a pruned branch is
//! never evaluated there, so a pruned search can succeed where the same
//! problem with [`Problem::pruning`] disabled aborts. Whenever both succeed
//! they report the same candidates in the same order.
//!
//! # Reporting
//!
//! - [`Report::All`] — every match, in discovery order; with an objective,
//!   stably sorted best first (ties keep discovery order).
//! - [`Report::Best`] — a running best under the objective, replaced
//!   whenever a new match scores **greater than or equal to** it. Ties
//!   therefore go to the most recently discovered match.
//!
//! ```
//! use clocktree::{hz, ClockTree, Constraint, Expr, Objective, Problem, StageDomain};
//!
//! let tree = ClockTree::builder(hz(8_000_000))
//!     .stage(StageDomain::range("M", 4, 8).unwrap())
//!     .stage(StageDomain::range("N", 50, 432).unwrap())
//!     .output("vco", Expr::input() / Expr::var("M") * Expr::var("N"))
//!     .build()
//!     .unwrap();
//! let best = Problem::new(tree)
//!     .check("vco", Constraint::at_most(hz(432_000_000)))
//!     .objective(Objective::maximize("vco"))
//!     .best()
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(best.output("vco"), Some(hz(432_000_000)));
//! ```

use num_traits::Zero;
use tracing::{debug, trace};

use crate::candidate::Candidate;
use crate::constraint::{Check, Constraint};
use crate::error::{ConfigError, EvaluationError, PartialAssignment, Result};
use crate::objective::Objective;
use crate::tree::ClockTree;
use crate::Rational;

/// Which matches to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    /// Every match.
    All,
    /// The single best match under the objective.
    Best,
}

/// Counters collected during one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Partial and full assignments visited.
    pub nodes: u64,
    /// Sub-trees skipped because a check failed before the last stage.
    pub pruned: u64,
    /// Full assignments reached.
    pub leaves: u64,
    /// Full assignments that passed every check.
    pub matches: u64,
}

/// Result of a search. Empty when nothing matches.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    candidates: Vec<Candidate>,
    stats: SearchStats,
}

impl Solution {
    /// Matches in reporting order.
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// First candidate in reporting order (the best one when ranked).
    pub fn first(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Consume into the first candidate.
    pub fn into_best(self) -> Option<Candidate> {
        self.candidates.into_iter().next()
    }

    /// Consume into all candidates.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }

    /// Number of reported candidates.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// `true` when no assignment matched.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Search counters.
    pub fn stats(&self) -> SearchStats {
        self.stats
    }
}

/// A clock tree plus the checks and ranking to search it with.
#[derive(Debug, Clone)]
pub struct Problem {
    tree: ClockTree,
    checks: Vec<Check>,
    objective: Option<Objective>,
    pruning: bool,
}

impl Problem {
    /// Search `tree` with no checks yet; every tuple matches.
    pub fn new(tree: ClockTree) -> Self {
        Self { tree, checks: Vec::new(), objective: None, pruning: true }
    }

    /// Require `output` to satisfy `constraint`.
    #[must_use]
    pub fn check(mut self, output: impl Into<String>, constraint: Constraint) -> Self {
        self.checks.push(Check::new(output, constraint));
        self
    }

    /// Rank matches by `objective`.
    #[must_use]
    pub fn objective(mut self, objective: Objective) -> Self {
        self.objective = Some(objective);
        self
    }

    /// Enable (default) or disable early pruning. Disabled, every full tuple
    /// is evaluated and filtered afterwards.
    #[must_use]
    pub fn pruning(mut self, enabled: bool) -> Self {
        self.pruning = enabled;
        self
    }

    /// Fix stage `name` to `value`, collapsing that dimension.
    ///
    /// # Errors
    ///
    /// [`ConfigError::UnknownName`] or [`ConfigError::OutOfDomain`].
    pub fn restrict(mut self, name: &str, value: u32) -> core::result::Result<Self, ConfigError> {
        self.tree = self.tree.restrict(name, value)?;
        Ok(self)
    }

    /// The tree being searched.
    pub fn tree(&self) -> &ClockTree {
        &self.tree
    }

    /// Declared checks.
    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Declared objective.
    pub fn ranking(&self) -> Option<&Objective> {
        self.objective.as_ref()
    }

    /// Post-hoc filter: does a fully evaluated candidate pass every check?
    ///
    /// # Errors
    ///
    /// [`ConfigError`] if a check is malformed or names an unknown output.
    pub fn is_match(&self, candidate: &Candidate) -> core::result::Result<bool, ConfigError> {
        for check in &self.checks {
            self.check_index(check)?;
        }
        Ok(self
            .checks
            .iter()
            .all(|c| candidate.output(&c.output).is_some_and(|v| c.constraint.accepts(v))))
    }

    /// Every match.
    ///
    /// # Errors
    ///
    /// See [`Problem::solve`].
    pub fn all(&self) -> Result<Solution> {
        self.solve(Report::All)
    }

    /// The best match, or `None` if nothing matches.
    ///
    /// # Errors
    ///
    /// See [`Problem::solve`]; also [`ConfigError::MissingObjective`].
    pub fn best(&self) -> Result<Option<Candidate>> {
        self.solve(Report::Best).map(Solution::into_best)
    }

    /// Validate, then enumerate.
    ///
    /// # Errors
    ///
    /// A [`ConfigError`] before enumeration starts, or an
    /// [`EvaluationError`] that aborted it. No match is not an error.
    pub fn solve(&self, report: Report) -> Result<Solution> {
        let plan = self.validate(report)?;
        debug!(
            stages = self.tree.stages().len(),
            space = %self.tree.space_size(),
            checks = self.checks.len(),
            pruning = self.pruning,
            ?report,
            "clock-tree search started"
        );
        let solution = plan.run(report)?;
        debug!(
            nodes = solution.stats.nodes,
            pruned = solution.stats.pruned,
            leaves = solution.stats.leaves,
            matches = solution.stats.matches,
            reported = solution.len(),
            "clock-tree search finished"
        );
        Ok(solution)
    }

    /// Resolve a check's output and validate its constraint.
    fn check_index(&self, check: &Check) -> core::result::Result<usize, ConfigError> {
        let index = self.tree.output_index(&check.output).ok_or_else(|| ConfigError::UnknownName {
            context: "check".to_owned(),
            name: check.output.clone(),
        })?;
        check.constraint.validate(&check.output)?;
        Ok(index)
    }

    fn validate(&self, report: Report) -> core::result::Result<Plan<'_>, ConfigError> {
        let stage_count = self.tree.stages().len();
        let mut checks_at: Vec<Vec<(usize, &Constraint)>> = vec![Vec::new(); stage_count.saturating_add(1)];
        for check in &self.checks {
            let index = self.check_index(check)?;
            let depth = if self.pruning { self.tree.output_depth_at(index) } else { stage_count };
            if let Some(level) = checks_at.get_mut(depth) {
                level.push((index, &check.constraint));
            }
        }

        let objective = match &self.objective {
            Some(objective) => {
                let index = self.tree.output_index(objective.output()).ok_or_else(|| ConfigError::UnknownName {
                    context: "objective".to_owned(),
                    name: objective.output().to_owned(),
                })?;
                Some((index, objective))
            }
            None if report == Report::Best => return Err(ConfigError::MissingObjective),
            None => None,
        };

        Ok(Plan { tree: &self.tree, checks_at, objective })
    }
}

/// Validated, index-resolved form of a [`Problem`].
struct Plan<'p> {
    tree: &'p ClockTree,
    checks_at: Vec<Vec<(usize, &'p Constraint)>>,
    objective: Option<(usize, &'p Objective)>,
}

struct State {
    values: Vec<u32>,
    outputs: Vec<Rational>,
    stats: SearchStats,
    collector: Collector,
}

enum Collector {
    All(Vec<(Option<Rational>, Candidate)>),
    Best(Option<(Rational, Candidate)>),
}

impl Collector {
    fn offer(&mut self, score: Option<Rational>, candidate: Candidate) {
        match self {
            Self::All(found) => found.push((score, candidate)),
            Self::Best(best) => {
                let Some(score) = score else { return };
                // `>=`: a tie replaces the incumbent, so the later match wins.
                if best.as_ref().map_or(true, |(incumbent, _)| score >= *incumbent) {
                    *best = Some((score, candidate));
                }
            }
        }
    }

    fn finish(self, ranked: bool) -> Vec<Candidate> {
        match self {
            Self::All(mut found) => {
                if ranked {
                    found.sort_by(|a, b| b.0.cmp(&a.0));
                }
                found.into_iter().map(|(_, c)| c).collect()
            }
            Self::Best(best) => best.into_iter().map(|(_, c)| c).collect(),
        }
    }
}

impl Plan<'_> {
    fn run(&self, report: Report) -> core::result::Result<Solution, EvaluationError> {
        let collector = match report {
            Report::All => Collector::All(Vec::new()),
            Report::Best => Collector::Best(None),
        };
        let mut state = State {
            values: vec![0; self.tree.stages().len()],
            outputs: vec![Rational::zero(); self.tree.output_names().count()],
            stats: SearchStats::default(),
            collector,
        };

        state.stats.nodes = 1;
        if self.enter(0, &mut state)? {
            if self.tree.stages().is_empty() {
                state.stats.leaves = 1;
                self.accept(&mut state)?;
            } else {
                self.descend(0, &mut state)?;
            }
        } else {
            state.stats.pruned = 1;
        }

        Ok(Solution {
            candidates: state.collector.finish(self.objective.is_some()),
            stats: state.stats,
        })
    }

    /// Evaluate outputs that became ready at `depth` and apply their checks.
    fn enter(&self, depth: usize, state: &mut State) -> core::result::Result<bool, EvaluationError> {
        for &j in self.tree.outputs_at(depth) {
            self.tree.eval_output(j, &state.values, depth, &mut state.outputs)?;
        }
        let checks = self.checks_at.get(depth).map_or(&[][..], Vec::as_slice);
        Ok(checks
            .iter()
            .all(|(j, constraint)| state.outputs.get(*j).is_some_and(|v| constraint.accepts(*v))))
    }

    fn descend(&self, depth: usize, state: &mut State) -> core::result::Result<(), EvaluationError> {
        let Some(stage) = self.tree.stages().get(depth) else {
            return Ok(());
        };
        let next = depth.saturating_add(1);
        let last = next == self.tree.stages().len();
        for value in stage.iter() {
            if let Some(slot) = state.values.get_mut(depth) {
                *slot = value;
            }
            state.stats.nodes = state.stats.nodes.saturating_add(1);
            if last {
                state.stats.leaves = state.stats.leaves.saturating_add(1);
            }
            if !self.enter(next, state)? {
                if !last {
                    state.stats.pruned = state.stats.pruned.saturating_add(1);
                    trace!(stage = stage.name(), value, depth = next, "sub-tree pruned");
                }
                continue;
            }
            if last {
                self.accept(state)?;
            } else {
                self.descend(next, state)?;
            }
        }
        Ok(())
    }

    fn accept(&self, state: &mut State) -> core::result::Result<(), EvaluationError> {
        state.stats.matches = state.stats.matches.saturating_add(1);
        let candidate = Candidate::new(std::sync::Arc::clone(self.tree.layout()), &state.values, &state.outputs);
        trace!(values = ?candidate.values(), "match");
        let score = match self.objective {
            Some((j, objective)) => {
                let value = state.outputs.get(j).copied().unwrap_or_else(Rational::zero);
                let score = objective.score(value).ok_or_else(|| EvaluationError::Overflow {
                    output: objective.output().to_owned(),
                    assignment: PartialAssignment(
                        candidate.stages().map(|(name, v)| (name.to_owned(), v)).collect(),
                    ),
                })?;
                Some(score)
            }
            None => None,
        };
        state.collector.offer(score, candidate);
        Ok(())
    }
}
