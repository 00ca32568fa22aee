//! Translation of ground theories into clauses.
//!
//! Every atom of every symbol gets one solver variable, allocated up front in
//! vocabulary order and odometer order, so the variable of `P(d̄)` can be
//! read back when decoding a model. Formulas are Tseitin encoded with full
//! equivalences; terms become *value cases*, a list of `(value, literal)`
//! pairs where each literal states "the term equals this value".

use crate::fixpoint::{satisfies_definition, satisfies_fixpoint};
use finmx_core::{
    AggregateKind, Comparator, Definition, DomainElement, FinmxError, FixpointDefinition, Formula,
    Odometer, Result, Rule, SetExpr, Structure, SymbolId, Term, Theory, Tuple, Tuples,
};
use finmx_sat::{Lit, Model, Solver, SolverResult, Var};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Possible values of a term, each guarded by the literal "term = value".
pub type Cases = Vec<(DomainElement, Lit)>;

type Gate = SmallVec<[Lit; 4]>;

/// Encoding statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Atom variables.
    pub atoms: usize,
    /// Atoms already certain in the input structure.
    pub inputs: usize,
    /// Auxiliary gate variables.
    pub gates: usize,
    /// Clauses handed to the solver.
    pub clauses: usize,
    /// Gates answered from the cache.
    pub gate_hits: usize,
}

/// Bidirectional atom table plus the Tseitin encoder driving a [`Solver`].
pub struct Encoder<'s, 'm> {
    structure: &'s Structure,
    solver: Solver<'m>,
    atoms: Vec<(SymbolId, Tuple)>,
    index: FxHashMap<(SymbolId, Tuple), Var>,
    inputs: Vec<bool>,
    truth: Lit,
    gates: FxHashMap<Gate, Lit>,
    definitions: Vec<Definition>,
    fixpoints: Vec<FixpointDefinition>,
    stats: EncodeStats,
}

impl<'s, 'm> Encoder<'s, 'm> {
    /// Allocate the atom variables of `structure` in `solver`.
    ///
    /// The solver should be fresh and already carry its monitor, if any.
    pub fn new(structure: &'s Structure, solver: Solver<'m>) -> Result<Self> {
        let mut encoder = Self {
            structure,
            solver,
            atoms: Vec::new(),
            index: FxHashMap::default(),
            inputs: Vec::new(),
            truth: Lit::pos(Var::new(0)),
            gates: FxHashMap::default(),
            definitions: Vec::new(),
            fixpoints: Vec::new(),
            stats: EncodeStats::default(),
        };

        let vocabulary = structure.vocabulary();
        for symbol in vocabulary.symbols() {
            for tuple in structure.tuples(symbol)? {
                let var = encoder.solver.new_var();
                let input = structure.value(symbol, &tuple).is_known();
                encoder.inputs.push(input);
                encoder.stats.inputs += usize::from(input);
                encoder.index.insert((symbol, tuple.clone()), var);
                encoder.atoms.push((symbol, tuple));
            }
        }
        encoder.stats.atoms = encoder.atoms.len();
        encoder.truth = Lit::pos(encoder.solver.new_var());
        encoder.clause(&[encoder.truth]);

        for symbol in vocabulary.symbols() {
            if vocabulary.symbol(symbol)?.is_function() {
                encoder.exactly_one_values(symbol)?;
            }
        }
        debug!(
            atoms = encoder.stats.atoms,
            inputs = encoder.stats.inputs,
            "atom table allocated"
        );
        Ok(encoder)
    }

    /// Every application of a function has exactly one value.
    fn exactly_one_values(&mut self, symbol: SymbolId) -> Result<()> {
        let structure = self.structure;
        let sym = structure.vocabulary().symbol(symbol)?;
        let Some(result) = sym.result() else {
            return Ok(());
        };
        let args: Vec<&[DomainElement]> = sym
            .args
            .iter()
            .map(|&s| structure.domain(s))
            .collect::<Result<_>>()?;
        let values = structure.domain(result)?;
        for mut tuple in Tuples::new(args) {
            let mut lits: Vec<Lit> = Vec::with_capacity(values.len());
            for value in values {
                tuple.push(value.clone());
                if let Some(lit) = self.atom_lit(symbol, &tuple) {
                    lits.push(lit);
                }
                tuple.pop();
            }
            self.clause(&lits);
            for (i, &a) in lits.iter().enumerate() {
                for &b in &lits[i + 1..] {
                    self.clause(&[!a, !b]);
                }
            }
        }
        Ok(())
    }

    /// The constant true literal.
    #[must_use]
    pub fn true_lit(&self) -> Lit {
        self.truth
    }

    /// Literal of an atom, if the tuple lies in the symbol's domains.
    #[must_use]
    pub fn atom_lit(&self, symbol: SymbolId, tuple: &[DomainElement]) -> Option<Lit> {
        let key: (SymbolId, Tuple) = (symbol, tuple.iter().cloned().collect());
        self.index.get(&key).copied().map(Lit::pos)
    }

    /// The atom a variable stands for; `None` for auxiliary variables.
    #[must_use]
    pub fn atom(&self, var: Var) -> Option<(SymbolId, &[DomainElement])> {
        self.atoms
            .get(var.index())
            .map(|(symbol, tuple)| (*symbol, tuple.as_slice()))
    }

    /// Check if a variable is an atom that was already certain in the input structure.
    #[must_use]
    pub fn is_input(&self, var: Var) -> bool {
        self.inputs.get(var.index()).copied().unwrap_or(false)
    }

    /// Number of atom variables.
    #[must_use]
    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    /// Encoding statistics.
    #[must_use]
    pub fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    /// The underlying solver.
    #[must_use]
    pub fn solver(&self) -> &Solver<'m> {
        &self.solver
    }

    /// Mutable access to the underlying solver.
    pub fn solver_mut(&mut self) -> &mut Solver<'m> {
        &mut self.solver
    }

    /// Run the solver on everything added so far.
    pub fn solve(&mut self) -> SolverResult {
        self.solver.solve()
    }

    fn clause(&mut self, lits: &[Lit]) -> bool {
        self.stats.clauses += 1;
        self.solver.add_clause(lits)
    }

    /// Add a ground theory: sentences are asserted, definitions completed.
    pub fn add_theory(&mut self, theory: &Theory) -> Result<()> {
        for sentence in &theory.sentences {
            self.assert_formula(sentence)?;
        }
        for definition in &theory.definitions {
            self.add_definition(definition)?;
        }
        for fixpoint in &theory.fixpoints {
            self.add_fixpoint(fixpoint)?;
        }
        debug!(
            gates = self.stats.gates,
            clauses = self.stats.clauses,
            cached = self.stats.gate_hits,
            "theory encoded"
        );
        Ok(())
    }

    /// Assert a ground formula.
    pub fn assert_formula(&mut self, formula: &Formula) -> Result<()> {
        match formula {
            Formula::Boolean {
                sign: true,
                conjunction: true,
                children,
            } => {
                for child in children {
                    self.assert_formula(child)?;
                }
            }
            Formula::Boolean {
                sign: true,
                conjunction: false,
                children,
            } => {
                let lits = children
                    .iter()
                    .map(|c| self.encode_formula(c))
                    .collect::<Result<Vec<_>>>()?;
                self.clause(&lits);
            }
            _ => {
                let lit = self.encode_formula(formula)?;
                self.clause(&[lit]);
            }
        }
        Ok(())
    }

    /// Add a ground definition by its completion.
    ///
    /// Recursive definitions are also remembered so that candidate models
    /// can be checked against their well-founded model.
    pub fn add_definition(&mut self, definition: &Definition) -> Result<()> {
        let defined = definition.defined_symbols();
        self.complete(definition.rules.iter(), &defined)?;
        if definition.is_recursive() {
            self.definitions.push(definition.clone());
        }
        Ok(())
    }

    /// Add a ground fixpoint definition by the completion of all its levels.
    pub fn add_fixpoint(&mut self, fixpoint: &FixpointDefinition) -> Result<()> {
        let defined = fixpoint.defined_symbols();
        self.complete(fixpoint.all_rules().into_iter(), &defined)?;
        self.fixpoints.push(fixpoint.clone());
        Ok(())
    }

    /// Each defined atom is equivalent to the disjunction of its rule bodies.
    fn complete<'r>(
        &mut self,
        rules: impl Iterator<Item = &'r Rule>,
        defined: &[SymbolId],
    ) -> Result<()> {
        let mut bodies: FxHashMap<(SymbolId, Tuple), Vec<&'r Formula>> = FxHashMap::default();
        for rule in rules {
            let head = rule
                .ground_head()
                .ok_or_else(|| FinmxError::not_ground(format!("head of rule for {}", rule.head)))?;
            if !rule.vars.is_empty() {
                return Err(FinmxError::not_ground(format!("rule for {}", rule.head)));
            }
            bodies
                .entry((rule.head, head.into_iter().collect()))
                .or_default()
                .push(&rule.body);
        }

        let structure = self.structure;
        for &symbol in defined {
            for tuple in structure.tuples(symbol)? {
                let Some(atom) = self.atom_lit(symbol, &tuple) else {
                    continue;
                };
                let body = match bodies.get(&(symbol, tuple)) {
                    Some(formulas) => {
                        let lits = formulas
                            .iter()
                            .map(|f| self.encode_formula(f))
                            .collect::<Result<Vec<_>>>()?;
                        self.or(&lits)
                    }
                    None => !self.truth,
                };
                self.clause(&[!atom, body]);
                self.clause(&[atom, !body]);
            }
        }
        Ok(())
    }

    /// Check a decoded model against every recursive definition and
    /// fixpoint definition; completion alone admits unfounded models.
    pub fn accepts(&self, model: &Structure) -> Result<bool> {
        for definition in &self.definitions {
            if !satisfies_definition(definition, model)? {
                return Ok(false);
            }
        }
        for fixpoint in &self.fixpoints {
            if !satisfies_fixpoint(fixpoint, model)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Check if any candidate model needs [`Encoder::accepts`].
    #[must_use]
    pub fn needs_model_check(&self) -> bool {
        !self.definitions.is_empty() || !self.fixpoints.is_empty()
    }

    /// Decode a solver model into a copy of the input structure.
    ///
    /// Predicate atoms are written first, then function values.
    pub fn decode(&self, model: &Model) -> Result<Structure> {
        let vocabulary = self.structure.vocabulary();
        let mut out = self.structure.clone();
        let mut functions = Vec::new();
        for (i, (symbol, tuple)) in self.atoms.iter().enumerate() {
            let value = model.value(Var::new(i as u32));
            if vocabulary.symbol(*symbol)?.is_function() {
                if value {
                    functions.push((*symbol, tuple));
                }
            } else {
                out.set_value(*symbol, tuple, value)?;
            }
        }
        for (symbol, tuple) in functions {
            if let Some((value, args)) = tuple.split_last() {
                out.set_function(symbol, args, value)?;
            }
        }
        Ok(out)
    }

    /// Exclude the current assignment of the non-input atoms.
    ///
    /// Returns `false` when no other assignment is left.
    pub fn block(&mut self, model: &Model) -> bool {
        let lits: Vec<Lit> = (0..self.atoms.len())
            .map(|i| Var::new(i as u32))
            .filter(|&v| !self.is_input(v))
            .map(|v| Lit::new(v, !model.value(v)))
            .collect();
        trace!(size = lits.len(), "blocking clause");
        self.clause(&lits)
    }

    /// Literal equivalent to a ground formula.
    pub fn encode_formula(&mut self, formula: &Formula) -> Result<Lit> {
        let lit = match formula {
            Formula::Atomic { symbol, args, .. } => {
                let cases = self.cartesian(args)?;
                let mut alternatives = Vec::new();
                for (tuple, guard) in cases {
                    if let Some(atom) = self.atom_lit(*symbol, &tuple) {
                        alternatives.push(self.and(&[guard, atom]));
                    }
                }
                self.or(&alternatives)
            }
            Formula::Boolean {
                conjunction,
                children,
                ..
            } => {
                let lits = children
                    .iter()
                    .map(|c| self.encode_formula(c))
                    .collect::<Result<Vec<_>>>()?;
                if *conjunction {
                    self.and(&lits)
                } else {
                    self.or(&lits)
                }
            }
            Formula::Quantified { .. } => {
                return Err(FinmxError::not_ground(format!("{:?}", formula)));
            }
            Formula::Equivalence { left, right, .. } => {
                let l = self.encode_formula(left)?;
                let r = self.encode_formula(right)?;
                self.iff(l, r)
            }
            Formula::Comparison {
                terms, comparators, ..
            } => {
                if comparators.len() + 1 != terms.len() {
                    return Err(FinmxError::InvalidFormula(format!(
                        "{} comparators between {} terms",
                        comparators.len(),
                        terms.len()
                    )));
                }
                let cases = terms
                    .iter()
                    .map(|t| self.term_cases(t))
                    .collect::<Result<Vec<_>>>()?;
                let mut links = Vec::with_capacity(comparators.len());
                for (i, &op) in comparators.iter().enumerate() {
                    links.push(self.compare(&cases[i], op, &cases[i + 1]));
                }
                self.and(&links)
            }
        };
        Ok(if formula.sign() { lit } else { !lit })
    }

    fn compare(&mut self, left: &Cases, op: Comparator, right: &Cases) -> Lit {
        let mut alternatives = Vec::new();
        for (a, la) in left {
            for (b, lb) in right {
                if op.holds(a, b) {
                    alternatives.push(self.and(&[*la, *lb]));
                }
            }
        }
        self.or(&alternatives)
    }

    /// Value cases of the argument tuple of an application.
    fn cartesian(&mut self, args: &[Term]) -> Result<Vec<(Tuple, Lit)>> {
        let cases = args
            .iter()
            .map(|t| self.term_cases(t))
            .collect::<Result<Vec<_>>>()?;
        let sizes: Vec<usize> = cases.iter().map(Vec::len).collect();
        let mut out = Vec::new();
        for indices in Odometer::new(sizes) {
            let mut tuple = Tuple::new();
            let mut guards: SmallVec<[Lit; 4]> = SmallVec::new();
            for (arg, &i) in indices.iter().enumerate() {
                let (value, lit) = &cases[arg][i];
                tuple.push(value.clone());
                guards.push(*lit);
            }
            let guard = self.and(&guards);
            out.push((tuple, guard));
        }
        Ok(out)
    }

    /// Value cases of a ground term.
    pub fn term_cases(&mut self, term: &Term) -> Result<Cases> {
        match term {
            Term::Var(v) => Err(FinmxError::not_ground(v.to_string())),
            Term::Domain(element) => Ok(vec![(element.clone(), self.truth)]),
            Term::Function { symbol, args } => {
                let structure = self.structure;
                let vocabulary = structure.vocabulary();
                let result = vocabulary
                    .symbol(*symbol)?
                    .result()
                    .ok_or_else(|| FinmxError::UnknownSymbol(vocabulary.symbol_name(*symbol)))?;
                let values = structure.domain(result)?;
                let mut grouped: Vec<Vec<Lit>> = vec![Vec::new(); values.len()];
                for (mut tuple, guard) in self.cartesian(args)? {
                    for (slot, value) in values.iter().enumerate() {
                        tuple.push(value.clone());
                        if let Some(atom) = self.atom_lit(*symbol, &tuple) {
                            let lit = self.and(&[guard, atom]);
                            grouped[slot].push(lit);
                        }
                        tuple.pop();
                    }
                }
                let mut cases = Vec::new();
                for (value, lits) in values.iter().zip(grouped) {
                    let lit = self.or(&lits);
                    if lit != !self.truth {
                        cases.push((value.clone(), lit));
                    }
                }
                Ok(cases)
            }
            Term::Aggregate { kind, set } => self.aggregate_cases(*kind, set),
        }
    }

    /// Dynamic programme over the reachable partial aggregates of an
    /// enumerated set.
    fn aggregate_cases(&mut self, kind: AggregateKind, set: &SetExpr) -> Result<Cases> {
        let SetExpr::Enumerated(members) = set else {
            return Err(FinmxError::not_ground(format!("{:?}", set)));
        };
        let mut states: BTreeMap<Option<i64>, Lit> = BTreeMap::new();
        states.insert(kind.identity(), self.truth);

        for (condition, weight) in members {
            let present = self.encode_formula(condition)?;
            let weights: Vec<(i64, Lit)> = if kind.uses_weights() {
                self.term_cases(weight)?
                    .into_iter()
                    .map(|(value, lit)| {
                        value.as_int().map(|w| (w, lit)).ok_or_else(|| {
                            FinmxError::InvalidAggregate(format!("{} weight {}", kind, value))
                        })
                    })
                    .collect::<Result<_>>()?
            } else {
                vec![(1, self.truth)]
            };

            let mut next: BTreeMap<Option<i64>, Vec<Lit>> = BTreeMap::new();
            for (&acc, &reach) in &states {
                let skip = self.and(&[reach, !present]);
                next.entry(acc).or_default().push(skip);
                for &(w, lw) in &weights {
                    let take = self.and(&[reach, present, lw]);
                    next.entry(kind.combine(acc, w)).or_default().push(take);
                }
            }
            states = BTreeMap::new();
            for (acc, lits) in next {
                let lit = self.or(&lits);
                if lit != !self.truth {
                    states.insert(acc, lit);
                }
            }
        }

        Ok(states
            .into_iter()
            .filter_map(|(acc, lit)| acc.map(|v| (DomainElement::int(v), lit)))
            .collect())
    }

    /// Literal equivalent to the conjunction of `lits`.
    pub fn and(&mut self, lits: &[Lit]) -> Lit {
        let falsity = !self.truth;
        let mut gate: Gate = SmallVec::new();
        for &lit in lits {
            if lit == falsity {
                return falsity;
            }
            if lit != self.truth {
                gate.push(lit);
            }
        }
        gate.sort_unstable();
        gate.dedup();
        if gate.windows(2).any(|w| w[0] == !w[1]) {
            return falsity;
        }
        match gate.len() {
            0 => return self.truth,
            1 => return gate[0],
            _ => {}
        }
        if let Some(&lit) = self.gates.get(&gate) {
            self.stats.gate_hits += 1;
            return lit;
        }

        let g = Lit::pos(self.solver.new_var());
        self.stats.gates += 1;
        let mut back: Vec<Lit> = Vec::with_capacity(gate.len() + 1);
        back.push(g);
        for &lit in &gate {
            self.clause(&[!g, lit]);
            back.push(!lit);
        }
        self.clause(&back);
        self.gates.insert(gate, g);
        g
    }

    /// Literal equivalent to the disjunction of `lits`.
    pub fn or(&mut self, lits: &[Lit]) -> Lit {
        let negated: SmallVec<[Lit; 8]> = lits.iter().map(|&l| !l).collect();
        !self.and(&negated)
    }

    /// Literal equivalent to `a ⇔ b`.
    pub fn iff(&mut self, a: Lit, b: Lit) -> Lit {
        let falsity = !self.truth;
        if a == self.truth {
            return b;
        }
        if a == falsity {
            return !b;
        }
        if b == self.truth {
            return a;
        }
        if b == falsity {
            return !a;
        }
        if a == b {
            return self.truth;
        }
        if a == !b {
            return falsity;
        }
        let g = Lit::pos(self.solver.new_var());
        self.stats.gates += 1;
        self.clause(&[!g, !a, b]);
        self.clause(&[!g, a, !b]);
        self.clause(&[g, a, b]);
        self.clause(&[g, !a, !b]);
        g
    }
}

impl std::fmt::Debug for Encoder<'_, '_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encoder")
            .field("atoms", &self.atoms.len())
            .field("stats", &self.stats)
            .field("definitions", &self.definitions.len())
            .field("fixpoints", &self.fixpoints.len())
            .finish()
    }
}
