//! Model expansion: the pipeline tying every stage together.
//!
//! One call runs, in order: definition calculation, symmetry detection,
//! grounding, encoding, and model enumeration with decoding. All per-call
//! state lives in a `Session` that is dropped when the call returns.
//!
//! The configured timeout and the [`Expander`] interrupt flag bound the whole
//! call: every solve during enumeration shares one deadline, and raising the
//! flag from any thread stops the running search. The models found so far
//! are returned with [`ExpansionStatus::Interrupted`].

use crate::encode::Encoder;
use crate::fixpoint::{CalculatedDefinitions, FixpointOutcome, calculate_known_definitions};
use crate::ground::Grounder;
use crate::symmetry::SymmetryFinder;
use finmx_core::{
    ExpansionConfig, FinmxError, Formula, Result, Structure, SymmetryBreaking, Theory,
    format_tuple,
};
use finmx_sat::{Solver, SolverConfig, SolverResult, SolverStats, TraceMonitor};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How an expansion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionStatus {
    /// At least one model was found and the search ended normally.
    Satisfiable,
    /// The solver proved that there is no (further) model.
    Unsatisfiable,
    /// A definition has no consistent value in the input structure; the
    /// solver was never started.
    InconsistentDefinition,
    /// A solver budget ran out or the search was interrupted; the models
    /// found so far are returned.
    Interrupted,
}

/// Counters for one expansion call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionStats {
    /// Definitions and fixpoint definitions evaluated before grounding
    pub calculated_definitions: usize,
    /// Interchangeable element sets found
    pub iv_sets: usize,
    /// Symmetry breaking formulas added
    pub breaking_formulas: usize,
    /// Ground sentences, facts included
    pub ground_sentences: usize,
    /// Ground rules
    pub ground_rules: usize,
    /// Atom variables
    pub atoms: usize,
    /// Auxiliary variables
    pub gates: usize,
    /// Clauses handed to the solver
    pub clauses: usize,
    /// Solver models decoded
    pub candidates: usize,
    /// Candidates rejected by the definition check
    pub rejected: usize,
    /// Search statistics of the solver
    pub solver: SolverStats,
    /// Wall-clock time of the call in milliseconds
    pub time_ms: u64,
}

impl ExpansionStats {
    /// Create empty statistics
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Models of one expansion call plus how the call ended.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Result structures, in the order the solver produced them.
    pub models: Vec<Structure>,
    /// Final status.
    pub status: ExpansionStatus,
    /// Counters.
    pub stats: ExpansionStats,
}

impl Expansion {
    /// Number of models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Check if no model was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// State of one expansion call.
struct Session<'a> {
    theory: &'a Theory,
    config: &'a ExpansionConfig,
    interrupt: Arc<AtomicBool>,
    stats: ExpansionStats,
    start: Instant,
    deadline: Option<Instant>,
}

impl<'a> Session<'a> {
    fn new(theory: &'a Theory, config: &'a ExpansionConfig, interrupt: Arc<AtomicBool>) -> Self {
        let start = Instant::now();
        let deadline = (config.timeout_ms > 0)
            .then(|| start.checked_add(Duration::from_millis(config.timeout_ms)))
            .flatten();
        Self {
            theory,
            config,
            interrupt,
            stats: ExpansionStats::new(),
            start,
            deadline,
        }
    }

    /// Check if the interrupt flag is raised or the deadline has passed.
    fn cancelled(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn finish(mut self, models: Vec<Structure>, status: ExpansionStatus) -> Expansion {
        self.stats.time_ms = u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            status = ?status,
            models = models.len(),
            candidates = self.stats.candidates,
            rejected = self.stats.rejected,
            time_ms = self.stats.time_ms,
            "model expansion finished"
        );
        Expansion {
            models,
            status,
            stats: self.stats,
        }
    }

    /// Per-call solver budgets; the timeout is enforced as a session deadline.
    fn solver_config(&self) -> SolverConfig {
        SolverConfig::default()
            .with_max_conflicts(self.config.max_conflicts)
            .with_restart_base(self.config.restart_base)
            .with_verbosity(self.config.verbosity)
    }

    /// The theory without the definitions already written into the structure.
    fn residual(&self, calculated: &CalculatedDefinitions) -> Theory {
        let mut residual = Theory::new(self.theory.vocabulary.clone());
        for (i, definition) in self.theory.definitions.iter().enumerate() {
            if !calculated.definitions.contains(&i) {
                residual.add_definition(definition.clone());
            }
        }
        for (i, fixpoint) in self.theory.fixpoints.iter().enumerate() {
            if !calculated.fixpoints.contains(&i) {
                residual.add_fixpoint(fixpoint.clone());
            }
        }
        residual.sentences = self.theory.sentences.clone();
        residual
    }

    fn breaking_formulas(&mut self, theory: &Theory, structure: &Structure) -> Result<Vec<Formula>> {
        let iv_sets = SymmetryFinder::new(theory, structure).find_iv_sets()?;
        let mut formulas = Vec::new();
        for iv_set in &iv_sets {
            debug!(
                elements = %format_tuple(iv_set.elements()),
                sorts = iv_set.sorts().len(),
                symbols = iv_set.symbols().len(),
                "interchangeable elements"
            );
            formulas.extend(iv_set.breaking_formulas(self.config.symmetry_chain_length)?);
        }
        self.stats.iv_sets = iv_sets.len();
        self.stats.breaking_formulas = formulas.len();
        Ok(formulas)
    }

    fn run<'m>(
        mut self,
        structure: &Structure,
        monitor: Option<&'m mut dyn TraceMonitor>,
    ) -> Result<Expansion> {
        self.config.validate()?;

        let mut refined = structure.clone();
        let mut calculated = CalculatedDefinitions::default();
        if self.config.calculate_definitions {
            match calculate_known_definitions(self.theory, &mut refined)? {
                FixpointOutcome::Consistent { calculated: done } => calculated = done,
                FixpointOutcome::Inconsistent { .. } => {
                    return Ok(self.finish(Vec::new(), ExpansionStatus::InconsistentDefinition));
                }
            }
        }
        self.stats.calculated_definitions = calculated.len();
        let residual = self.residual(&calculated);

        let breaking = match self.config.symmetry_breaking {
            SymmetryBreaking::Static => self.breaking_formulas(&residual, &refined)?,
            SymmetryBreaking::None => Vec::new(),
        };

        let mut ground = Grounder::new(&refined).ground_theory(&residual)?;
        ground.sentences.extend(breaking);
        self.stats.ground_sentences = ground.sentences.len();
        self.stats.ground_rules = ground.rules().count();
        if self.cancelled() {
            debug!("cancelled before encoding");
            return Ok(self.finish(Vec::new(), ExpansionStatus::Interrupted));
        }

        let mut solver = Solver::with_config(self.solver_config());
        solver.set_interrupt_handle(Arc::clone(&self.interrupt));
        solver.set_deadline(self.deadline);
        if let Some(monitor) = monitor {
            solver.attach_monitor(monitor);
        }
        let mut encoder = Encoder::new(&refined, solver)?;
        encoder.add_theory(&ground)?;

        let mut models = Vec::new();
        let mut status = ExpansionStatus::Unsatisfiable;
        while self.config.wants_all_models() || models.len() < self.config.nb_models {
            match encoder.solve() {
                SolverResult::Sat => {}
                SolverResult::Unsat => break,
                SolverResult::Unknown => {
                    status = ExpansionStatus::Interrupted;
                    break;
                }
            }
            let model = encoder
                .solver()
                .model()
                .cloned()
                .ok_or_else(|| FinmxError::Solver("satisfiable without a model".to_string()))?;
            let decoded = encoder.decode(&model)?;
            self.stats.candidates += 1;
            if !encoder.needs_model_check() || encoder.accepts(&decoded)? {
                debug!(index = models.len(), "model found");
                models.push(decoded);
            } else {
                debug!("candidate rejected by the definition check");
                self.stats.rejected += 1;
            }
            if !encoder.block(&model) {
                break;
            }
        }
        if status != ExpansionStatus::Interrupted && !models.is_empty() {
            status = ExpansionStatus::Satisfiable;
        }

        let encoded = encoder.stats();
        self.stats.atoms = encoded.atoms;
        self.stats.gates = encoded.gates;
        self.stats.clauses = encoded.clauses;
        self.stats.solver = encoder.solver().stats().clone();
        Ok(self.finish(models, status))
    }
}

/// Expand `structure` to models of `theory`.
///
/// Returns up to [`ExpansionConfig::nb_models`] structures in the order the
/// solver finds them. An empty list means that the theory is unsatisfiable,
/// that a definition is inconsistent with the structure, or that the search
/// was interrupted before a model was found; use [`expand_with_status`] to
/// tell these apart.
///
/// # Errors
///
/// [`FinmxError::InfiniteDomain`] when a quantifier ranges over a sort
/// without a finite table, reported before any solver is created.
pub fn expand<'m>(
    theory: &Theory,
    structure: &Structure,
    config: &ExpansionConfig,
    monitor: Option<&'m mut dyn TraceMonitor>,
) -> Result<Vec<Structure>> {
    expand_with_status(theory, structure, config, monitor).map(|e| e.models)
}

/// Expand `structure` to models of `theory`, reporting how the call ended.
pub fn expand_with_status<'m>(
    theory: &Theory,
    structure: &Structure,
    config: &ExpansionConfig,
    monitor: Option<&'m mut dyn TraceMonitor>,
) -> Result<Expansion> {
    Expander::new(theory, config).run(structure, monitor)
}

/// Reusable expansion entry point with an interrupt flag.
///
/// ```
/// use finmx_core::{ExpansionConfig, Formula, Structure, Theory, Vocabulary};
/// use finmx_solver::{ExpansionStatus, Expander};
/// use std::sync::Arc;
/// use std::sync::atomic::Ordering;
///
/// let mut voc = Vocabulary::new();
/// let p = voc.add_predicate("P", &[]);
/// let voc = Arc::new(voc);
/// let mut theory = Theory::new(voc.clone());
/// theory.add_sentence(Formula::atom(p, vec![]));
///
/// let config = ExpansionConfig::default();
/// let expander = Expander::new(&theory, &config);
/// expander.interrupt_handle().store(true, Ordering::Relaxed);
/// let expansion = expander.run(&Structure::new(voc), None).unwrap();
/// assert_eq!(expansion.status, ExpansionStatus::Interrupted);
/// ```
#[derive(Debug, Clone)]
pub struct Expander<'a> {
    theory: &'a Theory,
    config: &'a ExpansionConfig,
    interrupt: Arc<AtomicBool>,
}

impl<'a> Expander<'a> {
    /// Create an expander with a fresh interrupt flag.
    #[must_use]
    pub fn new(theory: &'a Theory, config: &'a ExpansionConfig) -> Self {
        Self {
            theory,
            config,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use an existing flag, e.g. one shared by several expansions.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Flag that stops a running expansion when set. It stays raised until
    /// cleared, so later runs stop immediately too.
    #[must_use]
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupt)
    }

    /// Run one expansion of `structure`.
    ///
    /// # Errors
    ///
    /// Input errors as for [`expand`].
    pub fn run<'m>(
        &self,
        structure: &Structure,
        monitor: Option<&'m mut dyn TraceMonitor>,
    ) -> Result<Expansion> {
        Session::new(self.theory, self.config, Arc::clone(&self.interrupt)).run(structure, monitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmx_core::{Definition, DomainElement, Rule, SortTable, Term, Variable, Vocabulary};
    use finmx_sat::RecordingMonitor;
    use std::sync::Arc;

    fn el(n: &str) -> DomainElement {
        DomainElement::name(n)
    }

    #[test]
    fn test_status_unsatisfiable() {
        let mut voc = Vocabulary::new();
        let p = voc.add_predicate("P", &[]);
        let voc = Arc::new(voc);
        let mut theory = Theory::new(voc.clone());
        theory.add_sentence(Formula::atom(p, vec![]));
        theory.add_sentence(Formula::atom(p, vec![]).negate());
        let expansion =
            expand_with_status(&theory, &Structure::new(voc), &ExpansionConfig::default(), None)
                .unwrap();
        assert!(expansion.is_empty());
        assert_eq!(expansion.status, ExpansionStatus::Unsatisfiable);
    }

    #[test]
    fn test_status_inconsistent_definition() {
        let mut voc = Vocabulary::new();
        let s = voc.add_sort("S", &[]);
        let h = voc.add_predicate("H", &[s]);
        let voc = Arc::new(voc);
        let mut structure = Structure::new(voc.clone());
        structure.set_domain(s, SortTable::finite([el("a")]));
        structure.make_false(h, &[el("a")]).unwrap();
        let mut theory = Theory::new(voc);
        theory.add_definition(Definition::new(vec![Rule::fact(
            h,
            vec![Term::domain(el("a"))],
            Formula::truth(true),
        )]));

        let expansion =
            expand_with_status(&theory, &structure, &ExpansionConfig::default(), None).unwrap();
        assert_eq!(expansion.status, ExpansionStatus::InconsistentDefinition);
        assert_eq!(expansion.stats.clauses, 0);

        // without calculation the clash is left to the solver
        let config = ExpansionConfig::default().with_calculate_definitions(false);
        let expansion = expand_with_status(&theory, &structure, &config, None).unwrap();
        assert_eq!(expansion.status, ExpansionStatus::Unsatisfiable);
    }

    #[test]
    fn test_calculated_definitions_are_in_models() {
        let mut voc = Vocabulary::new();
        let s = voc.add_sort("S", &[]);
        let base = voc.add_predicate("Base", &[s]);
        let derived = voc.add_predicate("Derived", &[s]);
        let voc = Arc::new(voc);
        let mut structure = Structure::new(voc.clone());
        structure.set_domain(s, SortTable::finite([el("a"), el("b")]));
        structure.make_true(base, &[el("a")]).unwrap();
        structure.make_false(base, &[el("b")]).unwrap();

        let x = Variable::new(0, "x", s);
        let mut theory = Theory::new(voc);
        theory.add_definition(Definition::new(vec![Rule::new(
            vec![x.clone()],
            derived,
            vec![Term::var(&x)],
            Formula::atom(base, vec![Term::var(&x)]),
        )]));

        let expansion = expand_with_status(
            &theory,
            &structure,
            &ExpansionConfig::default().with_models(0),
            None,
        )
        .unwrap();
        assert_eq!(expansion.stats.calculated_definitions, 1);
        assert_eq!(expansion.len(), 1);
        assert!(expansion.models[0].value(derived, &[el("a")]).is_true());
        assert!(expansion.models[0].value(derived, &[el("b")]).is_false());
    }

    #[test]
    fn test_monitor_and_budget() {
        let mut voc = Vocabulary::new();
        let p = voc.add_predicate("P", &[]);
        let voc = Arc::new(voc);
        let mut theory = Theory::new(voc.clone());
        theory.add_sentence(Formula::atom(p, vec![]));

        let mut monitor = RecordingMonitor::new();
        let models = expand(
            &theory,
            &Structure::new(voc),
            &ExpansionConfig::default(),
            Some(&mut monitor),
        )
        .unwrap();
        assert_eq!(models.len(), 1);
        assert!(monitor.num_propagations() > 0);
    }

    #[test]
    fn test_timeout_is_one_deadline() {
        let theory = Theory::new(Arc::new(Vocabulary::new()));
        let flag = Arc::new(AtomicBool::new(false));

        let long = ExpansionConfig::default().with_timeout(60_000);
        let session = Session::new(&theory, &long, Arc::clone(&flag));
        let deadline = session.deadline.unwrap();
        assert_eq!(deadline - session.start, Duration::from_millis(60_000));
        assert!(!session.cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(session.cancelled());
        flag.store(false, Ordering::Relaxed);

        let short = ExpansionConfig::default().with_timeout(1);
        let session = Session::new(&theory, &short, Arc::clone(&flag));
        std::thread::sleep(Duration::from_millis(5));
        assert!(session.cancelled());
        let expansion = session.finish(Vec::new(), ExpansionStatus::Interrupted);
        assert!(expansion.stats.time_ms >= 5);

        let untimed = ExpansionConfig::default().with_timeout(0);
        assert!(Session::new(&theory, &untimed, flag).deadline.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let voc = Arc::new(Vocabulary::new());
        let theory = Theory::new(voc.clone());
        let config = ExpansionConfig {
            restart_base: 0,
            ..ExpansionConfig::default()
        };
        let err = expand(&theory, &Structure::new(voc), &config, None).unwrap_err();
        assert!(matches!(err, FinmxError::InvalidConfig(_)));
    }
}
