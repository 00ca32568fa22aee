//! CDCL search.
//!
//! The solver keeps two watched literals per clause, learns first-UIP clauses,
//! backjumps non-chronologically and restarts on the Luby sequence. Clauses can
//! be added between calls to [`Solver::solve`], which is how models are
//! enumerated with blocking clauses.

use crate::literal::{LBool, Lit, Var};
use crate::monitor::TraceMonitor;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Result of a solve call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverResult {
    /// Satisfiable
    Sat,
    /// Unsatisfiable
    Unsat,
    /// Unknown (timeout, conflict budget, interrupt)
    Unknown,
}

/// Solver configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Timeout in milliseconds per solve call (0 = no timeout)
    pub timeout_ms: u64,
    /// Maximum number of conflicts per solve call (0 = unlimited)
    pub max_conflicts: u64,
    /// Conflicts between restarts are `restart_base * luby(i)`
    pub restart_base: u64,
    /// Activity decay factor
    pub var_decay: f64,
    /// Verbosity (0 = quiet)
    pub verbosity: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 0,
            max_conflicts: 0,
            restart_base: 100,
            var_decay: 0.95,
            verbosity: 0,
        }
    }
}

impl SolverConfig {
    /// Set the timeout in milliseconds
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the conflict budget
    #[must_use]
    pub fn with_max_conflicts(mut self, max_conflicts: u64) -> Self {
        self.max_conflicts = max_conflicts;
        self
    }

    /// Set the restart base
    #[must_use]
    pub fn with_restart_base(mut self, restart_base: u64) -> Self {
        self.restart_base = restart_base.max(1);
        self
    }

    /// Set the verbosity
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Search statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverStats {
    /// Number of solve calls
    pub solves: u64,
    /// Number of decisions
    pub decisions: u64,
    /// Number of propagated literals
    pub propagations: u64,
    /// Number of conflicts
    pub conflicts: u64,
    /// Number of learned clauses
    pub learned: u64,
    /// Number of restarts
    pub restarts: u64,
}

/// A satisfying assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    /// Value of a variable; unknown variables are false.
    #[must_use]
    pub fn value(&self, var: Var) -> bool {
        self.values.get(var.index()).copied().unwrap_or(false)
    }

    /// Value of a literal.
    #[must_use]
    pub fn lit_value(&self, lit: Lit) -> bool {
        self.value(lit.var()) == lit.is_pos()
    }

    /// Literals that are true in the model, one per variable.
    pub fn true_lits(&self) -> impl Iterator<Item = Lit> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| Lit::new(Var::new(i as u32), v))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the model has no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type Clause = SmallVec<[Lit; 4]>;

fn lit_value(assigns: &[LBool], lit: Lit) -> LBool {
    assigns[lit.var().index()].xor(lit.is_neg())
}

/// Luby sequence 1, 1, 2, 1, 1, 2, 4, ...
fn luby(mut index: u64) -> u64 {
    let mut size = 1u64;
    let mut seq = 0u32;
    while size < index + 1 {
        seq += 1;
        size = 2 * size + 1;
    }
    while size - 1 != index {
        size = (size - 1) >> 1;
        seq -= 1;
        index %= size;
    }
    1u64 << seq
}

/// CDCL SAT solver.
pub struct Solver<'m> {
    config: SolverConfig,
    clauses: Vec<Clause>,
    /// Clauses to visit when a literal becomes true, indexed by literal code
    watches: Vec<Vec<usize>>,
    assigns: Vec<LBool>,
    levels: Vec<u32>,
    reasons: Vec<Option<usize>>,
    trail: Vec<Lit>,
    trail_lim: Vec<usize>,
    qhead: usize,
    activity: Vec<f64>,
    var_inc: f64,
    phase: Vec<bool>,
    seen: Vec<bool>,
    /// A conflict was derived at level 0
    inconsistent: bool,
    model: Option<Model>,
    monitor: Option<&'m mut dyn TraceMonitor>,
    interrupt: Arc<AtomicBool>,
    /// Absolute bound shared by every solve call
    deadline: Option<Instant>,
    stats: SolverStats,
}

impl fmt::Debug for Solver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Solver")
            .field("num_vars", &self.num_vars())
            .field("num_clauses", &self.clauses.len())
            .field("inconsistent", &self.inconsistent)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Default for Solver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'m> Solver<'m> {
    /// Create a new solver with the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SolverConfig::default())
    }

    /// Create a new solver with the given configuration
    #[must_use]
    pub fn with_config(config: SolverConfig) -> Self {
        Self {
            config,
            clauses: Vec::new(),
            watches: Vec::new(),
            assigns: Vec::new(),
            levels: Vec::new(),
            reasons: Vec::new(),
            trail: Vec::new(),
            trail_lim: Vec::new(),
            qhead: 0,
            activity: Vec::new(),
            var_inc: 1.0,
            phase: Vec::new(),
            seen: Vec::new(),
            inconsistent: false,
            model: None,
            monitor: None,
            interrupt: Arc::new(AtomicBool::new(false)),
            deadline: None,
            stats: SolverStats::default(),
        }
    }

    /// Attach a monitor. Attach it before adding clauses to observe every event.
    pub fn attach_monitor(&mut self, monitor: &'m mut dyn TraceMonitor) {
        self.monitor = Some(monitor);
    }

    /// Shared flag that aborts the running search when set.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Use an existing flag as the interrupt flag.
    pub fn set_interrupt_handle(&mut self, interrupt: Arc<AtomicBool>) {
        self.interrupt = interrupt;
    }

    /// Stop every later search at `deadline`, on top of the per-call timeout.
    pub fn set_deadline(&mut self, deadline: Option<Instant>) {
        self.deadline = deadline;
    }

    /// Allocate a fresh variable.
    pub fn new_var(&mut self) -> Var {
        let var = Var::new(self.assigns.len() as u32);
        self.assigns.push(LBool::Undef);
        self.levels.push(0);
        self.reasons.push(None);
        self.activity.push(0.0);
        self.phase.push(false);
        self.seen.push(false);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        var
    }

    /// Number of variables.
    #[must_use]
    pub fn num_vars(&self) -> usize {
        self.assigns.len()
    }

    /// Number of stored (non-unit) clauses, learned ones included.
    #[must_use]
    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// Search statistics.
    #[must_use]
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Model of the last satisfiable call.
    #[must_use]
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    /// Current value of a literal.
    #[must_use]
    pub fn value(&self, lit: Lit) -> LBool {
        lit_value(&self.assigns, lit)
    }

    /// Check if the clause set is known to be unsatisfiable.
    #[must_use]
    pub fn is_inconsistent(&self) -> bool {
        self.inconsistent
    }

    fn decision_level(&self) -> u32 {
        self.trail_lim.len() as u32
    }

    fn ensure_var(&mut self, var: Var) {
        while self.num_vars() <= var.index() {
            self.new_var();
        }
    }

    /// Add a clause. Returns `false` once the clause set is unsatisfiable.
    ///
    /// The search is reset to level 0 first; a clause that is unit there is
    /// propagated immediately.
    pub fn add_clause(&mut self, lits: &[Lit]) -> bool {
        if self.inconsistent {
            return false;
        }
        self.cancel_until(0);
        let mut clause: Clause = lits.iter().copied().collect();
        clause.sort_unstable();
        clause.dedup();
        for &lit in &clause {
            self.ensure_var(lit.var());
        }
        // x and -x are adjacent after sorting
        if clause.windows(2).any(|w| w[0] == w[1].negate()) {
            return true;
        }
        if clause.iter().any(|&l| self.value(l) == LBool::True) {
            return true;
        }
        clause.retain(|l| self.value(*l) != LBool::False);

        match clause.len() {
            0 => {
                self.inconsistent = true;
                false
            }
            1 => {
                self.assign(clause[0], None);
                if self.propagate().is_some() {
                    self.inconsistent = true;
                }
                !self.inconsistent
            }
            _ => {
                self.attach(clause);
                true
            }
        }
    }

    fn attach(&mut self, clause: Clause) -> usize {
        let index = self.clauses.len();
        self.watches[clause[0].negate().code()].push(index);
        self.watches[clause[1].negate().code()].push(index);
        self.clauses.push(clause);
        index
    }

    fn assign(&mut self, lit: Lit, reason: Option<usize>) {
        let v = lit.var().index();
        let level = self.decision_level();
        self.assigns[v] = LBool::from_bool(lit.is_pos());
        self.levels[v] = level;
        self.reasons[v] = reason;
        self.trail.push(lit);
        if let Some(monitor) = &mut self.monitor {
            monitor.propagate(lit, level);
        }
    }

    fn cancel_until(&mut self, level: u32) {
        if self.decision_level() <= level {
            return;
        }
        let start = self.trail_lim[level as usize];
        for &lit in &self.trail[start..] {
            let v = lit.var().index();
            self.assigns[v] = LBool::Undef;
            self.reasons[v] = None;
            self.phase[v] = lit.is_pos();
        }
        self.trail.truncate(start);
        self.trail_lim.truncate(level as usize);
        self.qhead = self.trail.len();
        if let Some(monitor) = &mut self.monitor {
            monitor.backtrack(level);
        }
    }

    /// Unit propagation; returns a conflicting clause if one is found.
    fn propagate(&mut self) -> Option<usize> {
        while self.qhead < self.trail.len() {
            let p = self.trail[self.qhead];
            self.qhead += 1;
            self.stats.propagations += 1;
            let false_lit = p.negate();
            let mut watchers = std::mem::take(&mut self.watches[p.code()]);
            let mut conflict = None;
            let mut i = 0;
            let mut j = 0;

            while i < watchers.len() {
                let ci = watchers[i];
                i += 1;
                let clause = &mut self.clauses[ci];
                if clause[0] == false_lit {
                    clause.swap(0, 1);
                }
                let first = clause[0];
                if lit_value(&self.assigns, first) == LBool::True {
                    watchers[j] = ci;
                    j += 1;
                    continue;
                }

                let mut moved = false;
                for k in 2..clause.len() {
                    if lit_value(&self.assigns, clause[k]) != LBool::False {
                        clause.swap(1, k);
                        self.watches[clause[1].negate().code()].push(ci);
                        moved = true;
                        break;
                    }
                }
                if moved {
                    continue;
                }

                watchers[j] = ci;
                j += 1;
                if lit_value(&self.assigns, first) == LBool::False {
                    conflict = Some(ci);
                    while i < watchers.len() {
                        watchers[j] = watchers[i];
                        j += 1;
                        i += 1;
                    }
                } else {
                    self.assign(first, Some(ci));
                }
            }

            watchers.truncate(j);
            self.watches[p.code()] = watchers;
            if conflict.is_some() {
                self.qhead = self.trail.len();
                return conflict;
            }
        }
        None
    }

    fn bump(&mut self, v: usize) {
        self.activity[v] += self.var_inc;
        if self.activity[v] > 1e100 {
            for a in &mut self.activity {
                *a *= 1e-100;
            }
            self.var_inc *= 1e-100;
        }
    }

    /// First-UIP conflict analysis. Returns the learned clause (asserting
    /// literal first, highest remaining level second) and the backjump level.
    fn analyze(&mut self, mut conflict: usize) -> (Clause, u32) {
        let current = self.decision_level();
        let mut learnt: Clause = SmallVec::new();
        learnt.push(Lit::pos(Var::new(0)));
        let mut pending = 0usize;
        let mut asserting: Option<Lit> = None;
        let mut index = self.trail.len();

        loop {
            let clause = self.clauses[conflict].clone();
            // The implied literal of a reason clause sits at position 0
            let skip = usize::from(asserting.is_some());
            for &q in &clause[skip..] {
                let v = q.var().index();
                if !self.seen[v] && self.levels[v] > 0 {
                    self.bump(v);
                    self.seen[v] = true;
                    if self.levels[v] >= current {
                        pending += 1;
                    } else {
                        learnt.push(q);
                    }
                }
            }

            loop {
                index -= 1;
                if self.seen[self.trail[index].var().index()] {
                    break;
                }
            }
            let p = self.trail[index];
            self.seen[p.var().index()] = false;
            pending -= 1;
            asserting = Some(p);
            if pending == 0 {
                break;
            }
            match self.reasons[p.var().index()] {
                Some(reason) => conflict = reason,
                None => break,
            }
        }

        if let Some(p) = asserting {
            learnt[0] = p.negate();
        }
        for lit in &learnt[1..] {
            self.seen[lit.var().index()] = false;
        }

        let mut backjump = 0;
        if learnt.len() > 1 {
            let mut max_i = 1;
            for i in 2..learnt.len() {
                if self.levels[learnt[i].var().index()] > self.levels[learnt[max_i].var().index()] {
                    max_i = i;
                }
            }
            learnt.swap(1, max_i);
            backjump = self.levels[learnt[1].var().index()];
        }
        (learnt, backjump)
    }

    fn pick_branch(&self) -> Option<Lit> {
        let mut best: Option<usize> = None;
        for v in 0..self.num_vars() {
            if self.assigns[v].is_assigned() {
                continue;
            }
            if best.map_or(true, |b| self.activity[v] > self.activity[b]) {
                best = Some(v);
            }
        }
        best.map(|v| Lit::new(Var::new(v as u32), self.phase[v]))
    }

    fn budget_exhausted(&self, start: Instant, conflicts: u64) -> bool {
        if self.interrupt.load(Ordering::Relaxed) {
            return true;
        }
        if self.config.max_conflicts > 0 && conflicts >= self.config.max_conflicts {
            return true;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return true;
        }
        self.config.timeout_ms > 0
            && start.elapsed() >= Duration::from_millis(self.config.timeout_ms)
    }

    /// Search for a satisfying assignment of the current clause set.
    pub fn solve(&mut self) -> SolverResult {
        self.stats.solves += 1;
        self.model = None;
        let result = self.search();
        debug!(
            result = ?result,
            vars = self.num_vars(),
            clauses = self.clauses.len(),
            conflicts = self.stats.conflicts,
            "solve finished"
        );
        if self.config.verbosity > 0 {
            info!(
                decisions = self.stats.decisions,
                propagations = self.stats.propagations,
                restarts = self.stats.restarts,
                learned = self.stats.learned,
                "search statistics"
            );
        }
        result
    }

    fn search(&mut self) -> SolverResult {
        if self.inconsistent {
            return SolverResult::Unsat;
        }
        self.cancel_until(0);
        if self.propagate().is_some() {
            self.inconsistent = true;
            return SolverResult::Unsat;
        }

        let start = Instant::now();
        let base = self.config.restart_base.max(1);
        let mut conflicts = 0u64;
        let mut since_restart = 0u64;
        let mut restart_limit = base * luby(self.stats.restarts);

        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                conflicts += 1;
                since_restart += 1;
                if self.decision_level() == 0 {
                    self.inconsistent = true;
                    return SolverResult::Unsat;
                }
                let (learnt, backjump) = self.analyze(conflict);
                self.cancel_until(backjump);
                if learnt.len() == 1 {
                    self.assign(learnt[0], None);
                } else {
                    let asserting = learnt[0];
                    let index = self.attach(learnt);
                    self.assign(asserting, Some(index));
                }
                self.stats.learned += 1;
                self.var_inc /= self.config.var_decay;
                continue;
            }

            if self.budget_exhausted(start, conflicts) {
                self.cancel_until(0);
                return SolverResult::Unknown;
            }

            if since_restart >= restart_limit {
                self.stats.restarts += 1;
                trace!(restarts = self.stats.restarts, "restart");
                since_restart = 0;
                restart_limit = base * luby(self.stats.restarts);
                self.cancel_until(0);
                continue;
            }

            match self.pick_branch() {
                None => {
                    let values = self.assigns.iter().map(|&v| v == LBool::True).collect();
                    self.model = Some(Model { values });
                    return SolverResult::Sat;
                }
                Some(lit) => {
                    self.stats.decisions += 1;
                    self.trail_lim.push(self.trail.len());
                    self.assign(lit, None);
                }
            }
        }
    }
}
