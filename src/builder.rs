//! Fluent rule-registration surface: `reactor.rule(exports).using(deps).by(computation)`.

use crate::attribute::{Attribute, Node};
use crate::reactor::Reactor;
use crate::rule::{RuleCx, RuleId};

pub struct RuleBuilder<'a, N: Node> {
    pub(crate) reactor: &'a mut Reactor<N>,
    pub(crate) exports: Vec<Attribute<N>>,
    pub(crate) dependencies: Vec<Attribute<N>>,
    pub(crate) label: Option<String>,
}

impl<'a, N: Node> RuleBuilder<'a, N> {
    /// Declares this rule's dependencies. Optional — a rule with no
    /// dependencies is ready immediately.
    pub fn using(mut self, dependencies: Vec<Attribute<N>>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Attaches a debug label, surfaced in fatal-error messages that name
    /// the rule.
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Finalizes and registers the rule, returning its id.
    pub fn by(self, computation: impl FnOnce(&mut RuleCx<'_, N>) + 'static) -> RuleId {
        self.reactor.register(self.exports, self.dependencies, self.label, Box::new(computation))
    }
}
