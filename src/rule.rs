//! Rules: reusable units of computation over attributes.

use std::any::Any;
use std::fmt;

use crate::attribute::{Attribute, Node};
use crate::error::{ErrorRef, SemanticError};
use crate::reactor::Reactor;
use crate::value::{AttrValue, Payload};

/// Identifies a rule within a [`Reactor`]. Stable for the reactor's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) usize);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

pub(crate) type Computation<N> = Box<dyn FnOnce(&mut RuleCx<'_, N>)>;

/// A declarative computation: fixed `exports`/`dependencies`, filled in as
/// the reactor supplies dependency values and the rule's computation
/// publishes exports. See spec §4.3.
pub(crate) struct Rule<N: Node> {
    pub(crate) id: RuleId,
    pub(crate) label: Option<String>,
    pub(crate) exports: Vec<Attribute<N>>,
    pub(crate) dependencies: Vec<Attribute<N>>,
    pub(crate) dependency_values: Vec<Option<AttrValue<N>>>,
    pub(crate) export_values: Vec<Option<AttrValue<N>>>,
    pub(crate) unsatisfied: usize,
    pub(crate) queued_or_fired: bool,
    pub(crate) computation: Option<Computation<N>>,
}

impl<N: Node> Rule<N> {
    pub(crate) fn new(
        id: RuleId,
        label: Option<String>,
        exports: Vec<Attribute<N>>,
        dependencies: Vec<Attribute<N>>,
        computation: Computation<N>,
    ) -> Self {
        let unsatisfied = dependencies.len();
        let dependency_values = vec![None; dependencies.len()];
        let export_values = vec![None; exports.len()];
        Rule {
            id,
            label,
            exports,
            dependencies,
            dependency_values,
            export_values,
            unsatisfied,
            queued_or_fired: false,
            computation: Some(computation),
        }
    }

    pub(crate) fn has_fired(&self) -> bool {
        self.computation.is_none()
    }

    /// Fill the first still-empty slot matching `dep` with `value`.
    /// Returns `true` exactly when this call is the one that brings
    /// `unsatisfied` to zero (so the caller knows to enqueue the rule).
    pub(crate) fn supply(&mut self, dep: &Attribute<N>, value: &AttrValue<N>) -> bool {
        for (slot, d) in self.dependency_values.iter_mut().zip(self.dependencies.iter()) {
            if d == dep && slot.is_none() {
                *slot = Some(value.clone());
                self.unsatisfied -= 1;
                return self.unsatisfied == 0;
            }
        }
        false
    }

    pub(crate) fn display_name(&self) -> String {
        match &self.label {
            Some(label) => format!("{} ({label})", self.id),
            None => self.id.to_string(),
        }
    }
}

/// The handle a rule's computation uses to read dependencies, publish
/// exports, and signal errors. See spec §4.3's "public operations" list.
pub struct RuleCx<'a, N: Node> {
    pub(crate) reactor: &'a mut Reactor<N>,
    pub(crate) rule_id: RuleId,
}

impl<'a, N: Node> RuleCx<'a, N> {
    fn rule(&self) -> &crate::rule::Rule<N> {
        &self.reactor.rules[self.rule_id.0]
    }

    fn rule_mut(&mut self) -> &mut crate::rule::Rule<N> {
        &mut self.reactor.rules[self.rule_id.0]
    }

    /// The value of dependency `index`. Panics if the reactor handed this
    /// rule's computation control before that dependency was supplied,
    /// which would itself be a framework bug (a rule only fires once
    /// `unsatisfied == 0`, i.e. every dependency slot is full).
    pub fn get(&self, index: usize) -> &AttrValue<N> {
        self.rule().dependency_values[index]
            .as_ref()
            .expect("dependency slot read before it was supplied")
    }

    /// The value of the dependency matching `attr` (first match, in
    /// declaration order).
    pub fn get_attr(&self, attr: &Attribute<N>) -> &AttrValue<N> {
        let rule = self.rule();
        let idx = rule
            .dependencies
            .iter()
            .position(|d| d == attr)
            .expect("attribute is not a dependency of this rule");
        self.get(idx)
    }

    /// Publish export `index`.
    pub fn set<T: Any>(&mut self, index: usize, value: T) {
        self.set_attr_value(index, AttrValue::Value(Payload::new(value)));
    }

    pub(crate) fn set_attr_value(&mut self, index: usize, value: AttrValue<N>) {
        self.rule_mut().export_values[index] = Some(value);
    }

    /// Copy dependency 0 to export 0 — the common "pass the value through"
    /// computation.
    pub fn copy_first(&mut self) {
        let value = self.get(0).clone();
        self.set_attr_value(0, value);
    }

    /// Signal an error that precludes every export of this rule. If the
    /// rule has no exports, the error is reported to the reactor with no
    /// affected attribute.
    pub fn error(&mut self, description: impl Into<String>, location: Option<N>) {
        let err = SemanticError::new(description, location);
        self.error_value(err);
    }

    /// As [`RuleCx::error`], with an existing error value.
    pub fn error_value(&mut self, err: ErrorRef<N>) {
        let export_count = self.rule().export_values.len();
        if export_count == 0 {
            self.reactor.report_error(err, None);
        } else {
            for i in 0..export_count {
                self.rule_mut().export_values[i] = Some(AttrValue::Error(err.clone()));
            }
        }
    }

    /// Mark specific attributes — not necessarily this rule's exports — as
    /// failed with `err`. Export attributes get their slot set directly;
    /// non-export attributes are routed straight to the reactor, which lets
    /// a rule pre-fail attributes belonging to rules it is about to
    /// register lazily.
    pub fn error_for(&mut self, err: ErrorRef<N>, affected: &[Attribute<N>]) {
        for attr in affected {
            let export_index = self.rule().exports.iter().position(|e| e == attr);
            match export_index {
                Some(idx) => self.rule_mut().export_values[idx] = Some(AttrValue::Error(err.clone())),
                None => self.reactor.set_value(attr.clone(), AttrValue::Error(err.clone())),
            }
        }
    }

    /// As [`RuleCx::error_for`], constructing a fresh error.
    pub fn error_for_desc(
        &mut self,
        description: impl Into<String>,
        location: Option<N>,
        affected: &[Attribute<N>],
    ) {
        let err = SemanticError::new(description, location);
        self.error_for(err, affected);
    }

    /// Register a new rule from within this computation. If its
    /// dependencies are already present, the reactor supplies them
    /// synchronously, which may let it fire within this same `run`.
    pub fn rule(&mut self, exports: Vec<Attribute<N>>) -> crate::builder::RuleBuilder<'_, N> {
        self.reactor.rule(exports)
    }
}
