//! Grounding over finite domains.
//!
//! The [`Grounder`] instantiates every quantified construct over the
//! cartesian product of its variables' domains, in odometer order, and
//! rebuilds everything else unchanged. Variable bindings are carried in an
//! explicit [`Bindings`] map that is restored after each quantifier.

pub mod facts;

use finmx_core::{
    Definition, DomainElement, FixpointDefinition, Formula, Result, Rule, SetExpr,
    Structure, Term, Theory, Tuples, VarId, Variable,
};
use rustc_hash::FxHashMap;
use tracing::debug;

pub use facts::{atom_formula, certain_facts};

/// Current value of each bound variable.
pub type Bindings = FxHashMap<VarId, DomainElement>;

/// Grounds theories and their parts against a structure's domains.
#[derive(Debug, Clone, Copy)]
pub struct Grounder<'s> {
    structure: &'s Structure,
}

impl<'s> Grounder<'s> {
    /// Create a grounder over the domains of `structure`.
    #[must_use]
    pub fn new(structure: &'s Structure) -> Self {
        Self { structure }
    }

    /// Ground a formula.
    pub fn ground_formula(&self, formula: &Formula) -> Result<Formula> {
        self.formula(formula, &mut Bindings::default())
    }

    /// Ground a term.
    pub fn ground_term(&self, term: &Term) -> Result<Term> {
        self.term(term, &mut Bindings::default())
    }

    /// Ground a set expression into an enumerated set.
    pub fn ground_set(&self, set: &SetExpr) -> Result<SetExpr> {
        self.set(set, &mut Bindings::default())
    }

    /// Ground a rule: one quantifier-free rule per tuple of its variables.
    pub fn ground_rule(&self, rule: &Rule) -> Result<Vec<Rule>> {
        let mut out = Vec::new();
        self.rule(rule, &mut Bindings::default(), &mut out)?;
        Ok(out)
    }

    /// Ground every rule of a definition.
    pub fn ground_definition(&self, definition: &Definition) -> Result<Definition> {
        let mut rules = Vec::new();
        let mut bindings = Bindings::default();
        for rule in &definition.rules {
            self.rule(rule, &mut bindings, &mut rules)?;
        }
        Ok(Definition::new(rules))
    }

    /// Ground a fixpoint definition, keeping each level's least/greatest flag.
    pub fn ground_fixpoint(&self, fixpoint: &FixpointDefinition) -> Result<FixpointDefinition> {
        let mut rules = Vec::new();
        let mut bindings = Bindings::default();
        for rule in &fixpoint.rules {
            self.rule(rule, &mut bindings, &mut rules)?;
        }
        let nested = fixpoint
            .nested
            .iter()
            .map(|n| self.ground_fixpoint(n))
            .collect::<Result<Vec<_>>>()?;
        Ok(FixpointDefinition {
            least: fixpoint.least,
            rules,
            nested,
        })
    }

    /// Ground a whole theory.
    ///
    /// The result also contains the certain facts of the structure as ground
    /// sentences, after the theory's own sentences.
    pub fn ground_theory(&self, theory: &Theory) -> Result<Theory> {
        let mut ground = Theory::new(theory.vocabulary.clone());
        for definition in &theory.definitions {
            ground.add_definition(self.ground_definition(definition)?);
        }
        for fixpoint in &theory.fixpoints {
            ground.add_fixpoint(self.ground_fixpoint(fixpoint)?);
        }
        for sentence in &theory.sentences {
            ground.add_sentence(self.ground_formula(sentence)?);
        }
        let facts = certain_facts(self.structure)?;
        debug!(
            sentences = ground.sentences.len(),
            rules = ground.rules().count(),
            facts = facts.len(),
            "grounded theory"
        );
        ground.sentences.extend(facts);
        Ok(ground)
    }

    /// Run `visit` once per tuple of `vars`' domains with the variables bound.
    ///
    /// Previous bindings of the same variables are restored afterwards, also
    /// when `visit` fails.
    fn for_each_tuple<F>(&self, vars: &[Variable], bindings: &mut Bindings, mut visit: F) -> Result<()>
    where
        F: FnMut(&mut Bindings, &[DomainElement]) -> Result<()>,
    {
        let domains = vars
            .iter()
            .map(|v| self.structure.domain(v.sort))
            .collect::<Result<Vec<_>>>()?;
        let saved: Vec<Option<DomainElement>> =
            vars.iter().map(|v| bindings.get(&v.id).cloned()).collect();

        let mut result = Ok(());
        for tuple in Tuples::new(domains) {
            for (var, element) in vars.iter().zip(tuple.iter()) {
                bindings.insert(var.id, element.clone());
            }
            result = visit(bindings, tuple.as_slice());
            if result.is_err() {
                break;
            }
        }

        for (var, old) in vars.iter().zip(saved) {
            match old {
                Some(element) => bindings.insert(var.id, element),
                None => bindings.remove(&var.id),
            };
        }
        result
    }

    fn term(&self, term: &Term, bindings: &mut Bindings) -> Result<Term> {
        Ok(match term {
            Term::Var(v) => match bindings.get(&v.id) {
                Some(element) => Term::Domain(element.clone()),
                None => term.clone(),
            },
            Term::Domain(_) => term.clone(),
            Term::Function { symbol, args } => Term::Function {
                symbol: *symbol,
                args: self.terms(args, bindings)?,
            },
            Term::Aggregate { kind, set } => Term::Aggregate {
                kind: *kind,
                set: Box::new(self.set(set, bindings)?),
            },
        })
    }

    fn terms(&self, terms: &[Term], bindings: &mut Bindings) -> Result<Vec<Term>> {
        terms.iter().map(|t| self.term(t, bindings)).collect()
    }

    fn set(&self, set: &SetExpr, bindings: &mut Bindings) -> Result<SetExpr> {
        match set {
            SetExpr::Enumerated(members) => {
                let members = members
                    .iter()
                    .map(|(cond, weight)| Ok((self.formula(cond, bindings)?, self.term(weight, bindings)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(SetExpr::Enumerated(members))
            }
            SetExpr::Quantified { vars, body, weight } => {
                let mut members = Vec::new();
                self.for_each_tuple(vars, bindings, |bindings, tuple| {
                    let cond = self.formula(body, bindings)?;
                    // The weight is the element bound to the first variable
                    let weight = match tuple.first() {
                        Some(element) => Term::Domain(element.clone()),
                        None => self.term(weight, bindings)?,
                    };
                    members.push((cond, weight));
                    Ok(())
                })?;
                Ok(SetExpr::Enumerated(members))
            }
        }
    }

    fn formula(&self, formula: &Formula, bindings: &mut Bindings) -> Result<Formula> {
        Ok(match formula {
            Formula::Atomic { sign, symbol, args } => Formula::Atomic {
                sign: *sign,
                symbol: *symbol,
                args: self.terms(args, bindings)?,
            },
            Formula::Boolean {
                sign,
                conjunction,
                children,
            } => Formula::Boolean {
                sign: *sign,
                conjunction: *conjunction,
                children: children
                    .iter()
                    .map(|c| self.formula(c, bindings))
                    .collect::<Result<_>>()?,
            },
            Formula::Quantified {
                sign,
                universal,
                vars,
                body,
            } => {
                let mut instances = Vec::new();
                self.for_each_tuple(vars, bindings, |bindings, _| {
                    instances.push(self.formula(body, bindings)?);
                    Ok(())
                })?;
                Formula::Boolean {
                    sign: *sign,
                    conjunction: *universal,
                    children: instances,
                }
            }
            Formula::Equivalence { sign, left, right } => Formula::Equivalence {
                sign: *sign,
                left: Box::new(self.formula(left, bindings)?),
                right: Box::new(self.formula(right, bindings)?),
            },
            Formula::Comparison {
                sign,
                terms,
                comparators,
            } => Formula::Comparison {
                sign: *sign,
                terms: self.terms(terms, bindings)?,
                comparators: comparators.clone(),
            },
        })
    }

    fn rule(&self, rule: &Rule, bindings: &mut Bindings, out: &mut Vec<Rule>) -> Result<()> {
        self.for_each_tuple(&rule.vars, bindings, |bindings, _| {
            out.push(Rule::fact(
                rule.head,
                self.terms(&rule.args, bindings)?,
                self.formula(&rule.body, bindings)?,
            ));
            Ok(())
        })
    }
}
