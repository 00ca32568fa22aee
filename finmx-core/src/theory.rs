//! Rules, inductive definitions, fixpoint definitions and theories.

use crate::element::DomainElement;
use crate::formula::Formula;
use crate::term::{Term, Variable};
use crate::vocabulary::{SymbolId, Vocabulary};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// A rule `∀x̄: P(t̄) ← φ`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Quantified variables.
    pub vars: Vec<Variable>,
    /// Head predicate.
    pub head: SymbolId,
    /// Head arguments.
    pub args: Vec<Term>,
    /// Body.
    pub body: Formula,
}

impl Rule {
    /// Create a rule.
    #[must_use]
    pub fn new(vars: Vec<Variable>, head: SymbolId, args: Vec<Term>, body: Formula) -> Self {
        Self {
            vars,
            head,
            args,
            body,
        }
    }

    /// Create a rule without quantified variables.
    #[must_use]
    pub fn fact(head: SymbolId, args: Vec<Term>, body: Formula) -> Self {
        Self::new(Vec::new(), head, args, body)
    }

    /// The head as a positive atom.
    #[must_use]
    pub fn head_formula(&self) -> Formula {
        Formula::atom(self.head, self.args.clone())
    }

    /// Check if the rule has no quantified variables and a ground head and body.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.vars.is_empty() && self.args.iter().all(Term::is_ground) && self.body.is_ground()
    }

    /// Free variables not bound by the rule.
    #[must_use]
    pub fn free_vars(&self) -> FxHashSet<Variable> {
        let mut free: FxHashSet<Variable> = self.args.iter().flat_map(Term::free_vars).collect();
        free.extend(self.body.free_vars());
        for v in &self.vars {
            free.remove(v);
        }
        free
    }

    /// Head arguments as domain elements, if they are all literal.
    #[must_use]
    pub fn ground_head(&self) -> Option<Vec<DomainElement>> {
        self.args.iter().map(|t| t.as_domain().cloned()).collect()
    }
}

fn has_cycle(edges: &FxHashMap<SymbolId, FxHashSet<SymbolId>>) -> bool {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Open,
        Done,
    }

    fn visit(
        node: SymbolId,
        edges: &FxHashMap<SymbolId, FxHashSet<SymbolId>>,
        marks: &mut FxHashMap<SymbolId, Mark>,
    ) -> bool {
        match marks.get(&node) {
            Some(Mark::Open) => return true,
            Some(Mark::Done) => return false,
            None => {}
        }
        marks.insert(node, Mark::Open);
        if let Some(targets) = edges.get(&node) {
            for &target in targets {
                if visit(target, edges, marks) {
                    return true;
                }
            }
        }
        marks.insert(node, Mark::Done);
        false
    }

    let mut marks = FxHashMap::default();
    edges.keys().any(|&node| visit(node, edges, &mut marks))
}

fn dependency_edges<'r>(
    rules: impl Iterator<Item = &'r Rule>,
    defined: &FxHashSet<SymbolId>,
) -> FxHashMap<SymbolId, FxHashSet<SymbolId>> {
    let mut edges: FxHashMap<SymbolId, FxHashSet<SymbolId>> = FxHashMap::default();
    for rule in rules {
        let mut used = rule.body.symbols();
        for arg in &rule.args {
            arg.collect_symbols(&mut used);
        }
        edges
            .entry(rule.head)
            .or_default()
            .extend(used.into_iter().filter(|s| defined.contains(s)));
    }
    edges
}

fn ordered_heads<'r>(rules: impl Iterator<Item = &'r Rule>) -> Vec<SymbolId> {
    let mut seen = FxHashSet::default();
    rules
        .map(|r| r.head)
        .filter(|h| seen.insert(*h))
        .collect()
}

fn open_symbols_of<'r>(
    rules: impl Iterator<Item = &'r Rule>,
    defined: &FxHashSet<SymbolId>,
) -> FxHashSet<SymbolId> {
    let mut used = FxHashSet::default();
    for rule in rules {
        rule.body.collect_symbols(&mut used);
        for arg in &rule.args {
            arg.collect_symbols(&mut used);
        }
    }
    used.retain(|s| !defined.contains(s));
    used
}

/// An inductive definition: rules defining their head predicates by (mutual) induction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Definition {
    /// Rules, in input order.
    pub rules: Vec<Rule>,
}

impl Definition {
    /// Create a definition.
    #[must_use]
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Defined symbols, in order of first appearance.
    #[must_use]
    pub fn defined_symbols(&self) -> Vec<SymbolId> {
        ordered_heads(self.rules.iter())
    }

    /// Symbols used in the rules but not defined by them.
    #[must_use]
    pub fn open_symbols(&self) -> FxHashSet<SymbolId> {
        let defined: FxHashSet<SymbolId> = self.defined_symbols().into_iter().collect();
        open_symbols_of(self.rules.iter(), &defined)
    }

    /// Check if some defined symbol depends (transitively) on itself.
    #[must_use]
    pub fn is_recursive(&self) -> bool {
        let defined: FxHashSet<SymbolId> = self.defined_symbols().into_iter().collect();
        has_cycle(&dependency_edges(self.rules.iter(), &defined))
    }

    /// Check if every rule is ground.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.rules.iter().all(Rule::is_ground)
    }
}

/// A nested fixpoint definition: one level of least or greatest fixpoint
/// semantics, with its own rules and nested levels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixpointDefinition {
    /// `true` for a least fixpoint, `false` for a greatest fixpoint.
    pub least: bool,
    /// Rules of this level.
    pub rules: Vec<Rule>,
    /// Nested levels, evaluated inside this one.
    pub nested: Vec<FixpointDefinition>,
}

impl FixpointDefinition {
    /// A least fixpoint level.
    #[must_use]
    pub fn least(rules: Vec<Rule>, nested: Vec<FixpointDefinition>) -> Self {
        Self {
            least: true,
            rules,
            nested,
        }
    }

    /// A greatest fixpoint level.
    #[must_use]
    pub fn greatest(rules: Vec<Rule>, nested: Vec<FixpointDefinition>) -> Self {
        Self {
            least: false,
            rules,
            nested,
        }
    }

    /// All rules of this level and of every nested level.
    #[must_use]
    pub fn all_rules(&self) -> Vec<&Rule> {
        let mut out: Vec<&Rule> = self.rules.iter().collect();
        for nested in &self.nested {
            out.extend(nested.all_rules());
        }
        out
    }

    /// Symbols defined at any level.
    #[must_use]
    pub fn defined_symbols(&self) -> Vec<SymbolId> {
        ordered_heads(self.all_rules().into_iter())
    }

    /// Symbols used but not defined at any level.
    #[must_use]
    pub fn open_symbols(&self) -> FxHashSet<SymbolId> {
        let defined: FxHashSet<SymbolId> = self.defined_symbols().into_iter().collect();
        open_symbols_of(self.all_rules().into_iter(), &defined)
    }

    /// Check if every rule at every level is ground.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.all_rules().into_iter().all(Rule::is_ground)
    }
}

/// A theory: definitions, fixpoint definitions and sentences over a vocabulary.
#[derive(Debug, Clone)]
pub struct Theory {
    /// Shared vocabulary.
    pub vocabulary: Arc<Vocabulary>,
    /// Inductive definitions.
    pub definitions: Vec<Definition>,
    /// Fixpoint definitions.
    pub fixpoints: Vec<FixpointDefinition>,
    /// Sentences.
    pub sentences: Vec<Formula>,
}

impl Theory {
    /// Create an empty theory.
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self {
            vocabulary,
            definitions: Vec::new(),
            fixpoints: Vec::new(),
            sentences: Vec::new(),
        }
    }

    /// Add a sentence.
    pub fn add_sentence(&mut self, sentence: Formula) {
        self.sentences.push(sentence);
    }

    /// Add a definition.
    pub fn add_definition(&mut self, definition: Definition) {
        self.definitions.push(definition);
    }

    /// Add a fixpoint definition.
    pub fn add_fixpoint(&mut self, fixpoint: FixpointDefinition) {
        self.fixpoints.push(fixpoint);
    }

    /// Check if the theory contains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.fixpoints.is_empty() && self.sentences.is_empty()
    }

    /// Check if every component is ground.
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.sentences.iter().all(Formula::is_ground)
            && self.definitions.iter().all(Definition::is_ground)
            && self.fixpoints.iter().all(FixpointDefinition::is_ground)
    }

    /// Every rule of every definition and fixpoint definition.
    pub fn rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.definitions
            .iter()
            .flat_map(|d| d.rules.iter())
            .chain(self.fixpoints.iter().flat_map(FixpointDefinition::all_rules))
    }

    /// Literal domain elements mentioned anywhere in the theory.
    #[must_use]
    pub fn mentioned_elements(&self) -> FxHashSet<DomainElement> {
        let mut out = FxHashSet::default();
        for sentence in &self.sentences {
            sentence.collect_elements(&mut out);
        }
        for rule in self.rules() {
            for arg in &rule.args {
                arg.collect_elements(&mut out);
            }
            rule.body.collect_elements(&mut out);
        }
        out
    }

    /// Number of sentences and rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sentences.len() + self.rules().count()
    }
}
