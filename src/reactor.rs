//! The dataflow engine: attribute store, dependency index, ready-queue, and
//! the fixed-point evaluation loop with error propagation. See spec §4.4.

use std::any::Any;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use crate::attribute::{Attribute, Node};
use crate::builder::RuleBuilder;
use crate::error::{ErrorRef, ReactorError, SemanticError};
use crate::rule::{Computation, Rule, RuleCx, RuleId};
use crate::value::{AttrValue, Payload};

/// How the reactor should resolve a second value arriving for an attribute
/// that already has one. The default (no hook installed) always rejects,
/// matching spec §4.4's "default policy fails fast".
pub enum RedefinitionDecision {
    /// Fatal: abort the run. The framework-default behavior.
    Reject,
    /// Keep the existing value; silently discard the new one.
    Keep,
    /// Overwrite the stored value and re-notify dependents of the new one.
    Redefine,
}

type RedefinitionHook<N> =
    Box<dyn FnMut(&Attribute<N>, &AttrValue<N>, &AttrValue<N>) -> RedefinitionDecision>;

enum StoreOutcome<N: Node> {
    Stored,
    SkippedAfterError,
    Redefinition(AttrValue<N>),
}

/// Summary of one `run()`, for logging/diagnostics — not load-bearing for
/// correctness.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunStats {
    pub rules_fired: usize,
    pub root_errors: usize,
}

/// The dataflow engine. Owns every attribute, rule, and pending error for
/// its lifetime; see spec §3 "Reactor state".
pub struct Reactor<N: Node> {
    attributes: HashMap<Attribute<N>, AttrValue<N>>,
    dependents: HashMap<Attribute<N>, Vec<RuleId>>,
    no_deps: Vec<RuleId>,
    pub(crate) rules: Vec<Rule<N>>,
    queue: VecDeque<RuleId>,
    root_errors: Vec<ErrorRef<N>>,
    attributeless_derived_errors: Vec<ErrorRef<N>>,
    running: bool,
    fatal: Option<ReactorError<N>>,
    redefinition_hook: Option<RedefinitionHook<N>>,
}

impl<N: Node> Default for Reactor<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Node> Reactor<N> {
    pub fn new() -> Self {
        Reactor {
            attributes: HashMap::new(),
            dependents: HashMap::new(),
            no_deps: Vec::new(),
            rules: Vec::new(),
            queue: VecDeque::new(),
            root_errors: Vec::new(),
            attributeless_derived_errors: Vec::new(),
            running: false,
            fatal: None,
            redefinition_hook: None,
        }
    }

    /// Overrides the default fatal redefinition policy. See spec's
    /// "Redefinition hook for incremental mode" design note.
    pub fn with_redefinition_hook(
        mut self,
        hook: impl FnMut(&Attribute<N>, &AttrValue<N>, &AttrValue<N>) -> RedefinitionDecision + 'static,
    ) -> Self {
        self.redefinition_hook = Some(Box::new(hook));
        self
    }

    // ---- Pre-run interface -------------------------------------------

    /// Stores an eagerly-known value. Forbidden while `run` is executing.
    /// Notification of already-registered rules is deferred to `run`'s seed
    /// step, not performed here.
    pub fn set<T: Any>(&mut self, attr: Attribute<N>, value: T) -> Result<(), ReactorError<N>> {
        if self.running {
            return Err(ReactorError::SetWhileRunning);
        }
        let new_value = AttrValue::Value(Payload::new(value));
        match self.store_attr(&attr, &new_value) {
            StoreOutcome::Stored | StoreOutcome::SkippedAfterError => {}
            StoreOutcome::Redefinition(old) => {
                self.attribute_redefinition_attempt(&attr, &old, &new_value);
            }
        }
        self.take_fatal()
    }

    /// Registers an error without a rule. With no `affected` attributes the
    /// error is attributeless (root if it has no cause, else retained so it
    /// isn't lost). Otherwise each affected attribute is marked failed.
    pub fn error(&mut self, err: ErrorRef<N>, affected: &[Attribute<N>]) -> Result<(), ReactorError<N>> {
        if affected.is_empty() {
            self.report_error(err, None);
        } else {
            for attr in affected {
                let value = AttrValue::Error(err.clone());
                match self.store_attr(attr, &value) {
                    StoreOutcome::Stored | StoreOutcome::SkippedAfterError => {}
                    StoreOutcome::Redefinition(old) => {
                        self.attribute_redefinition_attempt(attr, &old, &value);
                    }
                }
            }
        }
        self.take_fatal()
    }

    /// As [`Reactor::error`], constructing a fresh root error.
    pub fn error_desc(
        &mut self,
        description: impl Into<String>,
        location: Option<N>,
        affected: &[Attribute<N>],
    ) -> Result<(), ReactorError<N>> {
        let err = SemanticError::new(description, location);
        self.error(err, affected)
    }

    /// Starts building a rule. `using` is optional (defaults to zero
    /// dependencies); `by` finalizes registration.
    pub fn rule(&mut self, exports: Vec<Attribute<N>>) -> RuleBuilder<'_, N> {
        RuleBuilder { reactor: self, exports, dependencies: Vec::new(), label: None }
    }

    fn take_fatal(&mut self) -> Result<(), ReactorError<N>> {
        match self.fatal.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    // ---- Registration --------------------------------------------------

    pub(crate) fn register(
        &mut self,
        exports: Vec<Attribute<N>>,
        dependencies: Vec<Attribute<N>>,
        label: Option<String>,
        computation: Computation<N>,
    ) -> RuleId {
        let id = RuleId(self.rules.len());
        tracing::debug!(rule = %id, deps = dependencies.len(), exports = exports.len(), "rule_registered");
        let rule = Rule::new(id, label, exports, dependencies.clone(), computation);
        self.rules.push(rule);

        if dependencies.is_empty() {
            self.no_deps.push(id);
            if self.running {
                self.enqueue(id);
            }
            return id;
        }

        for dep in &dependencies {
            self.dependents.entry(dep.clone()).or_default().push(id);
        }
        if self.running {
            for dep in &dependencies {
                if self.fatal.is_some() {
                    break;
                }
                if let Some(value) = self.attributes.get(dep).cloned() {
                    self.notify_dependent(id, dep, &value);
                }
            }
        }
        id
    }

    fn enqueue(&mut self, rid: RuleId) {
        let rule = &mut self.rules[rid.0];
        if rule.queued_or_fired {
            return;
        }
        rule.queued_or_fired = true;
        tracing::trace!(rule = %rule.display_name(), "rule_enqueued");
        self.queue.push_back(rid);
    }

    // ---- Value/error plumbing -------------------------------------------

    fn store_attr(&mut self, attr: &Attribute<N>, value: &AttrValue<N>) -> StoreOutcome<N> {
        match self.attributes.get(attr) {
            Some(AttrValue::Error(_)) => StoreOutcome::SkippedAfterError,
            Some(existing) => StoreOutcome::Redefinition(existing.clone()),
            None => {
                if let AttrValue::Error(err) = value {
                    if err.is_root() {
                        self.root_errors.push(err.clone());
                    }
                }
                self.attributes.insert(attr.clone(), value.clone());
                StoreOutcome::Stored
            }
        }
    }

    fn redefine(&mut self, attr: Attribute<N>, value: AttrValue<N>) {
        self.attributes.insert(attr, value);
    }

    fn attribute_redefinition_attempt(&mut self, attr: &Attribute<N>, old: &AttrValue<N>, new: &AttrValue<N>) {
        let decision = match &mut self.redefinition_hook {
            Some(hook) => hook(attr, old, new),
            None => RedefinitionDecision::Reject,
        };
        match decision {
            RedefinitionDecision::Reject => {
                self.fail(ReactorError::Redefinition { attribute: attr.clone() });
            }
            RedefinitionDecision::Keep => {}
            RedefinitionDecision::Redefine => {
                self.redefine(attr.clone(), new.clone());
                if self.running {
                    self.supply_to_dependents(attr, new);
                }
            }
        }
    }

    /// The mid-run publication pipeline: store-if-absent, then either
    /// propagate (error) or notify dependents (value). Used for rule
    /// exports, error signaling from a rule, and the missing-attribute
    /// diagnostic.
    pub(crate) fn set_value(&mut self, attr: Attribute<N>, value: AttrValue<N>) {
        match self.store_attr(&attr, &value) {
            StoreOutcome::SkippedAfterError => {}
            StoreOutcome::Redefinition(old) => self.attribute_redefinition_attempt(&attr, &old, &value),
            StoreOutcome::Stored => match &value {
                AttrValue::Error(err) => self.propagate_error(err.clone(), &attr),
                AttrValue::Value(_) => self.supply_to_dependents(&attr, &value),
            },
        }
    }

    pub(crate) fn report_error(&mut self, err: ErrorRef<N>, affected: Option<Attribute<N>>) {
        match affected {
            None => {
                if err.is_root() {
                    self.root_errors.push(err);
                } else {
                    self.attributeless_derived_errors.push(err);
                }
            }
            Some(attr) => self.set_value(attr, AttrValue::Error(err)),
        }
    }

    /// Taints every export of every rule depending on `affected`: a rule
    /// with no exports is skipped (nowhere to attach, and the root stays
    /// visible on its own).
    fn propagate_error(&mut self, err: ErrorRef<N>, affected: &Attribute<N>) {
        let dependents = self.dependents.get(affected).cloned().unwrap_or_default();
        for rid in dependents {
            if self.fatal.is_some() {
                break;
            }
            self.taint_rule_exports(rid, affected, &err);
        }
    }

    fn taint_rule_exports(&mut self, rid: RuleId, affected: &Attribute<N>, err: &ErrorRef<N>) {
        let exports = self.rules[rid.0].exports.clone();
        for export in exports {
            if self.fatal.is_some() {
                break;
            }
            let derived = SemanticError::caused_by(format!("missing dependency {affected}"), err.clone(), None);
            self.set_value(export, AttrValue::Error(derived));
        }
    }

    fn supply_to_dependents(&mut self, attr: &Attribute<N>, value: &AttrValue<N>) {
        let dependents = self.dependents.get(attr).cloned().unwrap_or_default();
        for rid in dependents {
            if self.fatal.is_some() {
                break;
            }
            self.notify_dependent(rid, attr, value);
        }
    }

    /// Shared dispatch used both by `run`'s seed step and by re-entrant
    /// registration catch-up: an error taints exports directly, a value
    /// fills the matching dependency slot (and may enqueue the rule).
    fn notify_dependent(&mut self, rid: RuleId, attr: &Attribute<N>, value: &AttrValue<N>) {
        match value {
            AttrValue::Error(err) => self.taint_rule_exports(rid, attr, err),
            AttrValue::Value(_) => {
                let became_ready = self.rules[rid.0].supply(attr, value);
                if became_ready {
                    self.enqueue(rid);
                }
            }
        }
    }

    fn fail(&mut self, err: ReactorError<N>) {
        if self.fatal.is_none() {
            tracing::warn!(error = %err, "reactor_fatal_error");
            self.fatal = Some(err);
        }
    }

    // ---- Evaluation ------------------------------------------------------

    /// Drives the reactor to a fixed point: seeds already-present values to
    /// existing rules, drains the ready-queue, then runs the
    /// missing-attribute diagnostic. A second call with no new rules or
    /// eager values is a no-op (spec §8 "Idempotence of run").
    pub fn run(&mut self) -> Result<RunStats, ReactorError<N>> {
        self.running = true;
        self.fatal = None;
        let mut stats = RunStats::default();

        self.seed();

        while self.fatal.is_none() {
            let Some(rid) = self.queue.pop_front() else { break };
            if self.fire(rid, &mut stats) {
                break;
            }
        }

        if self.fatal.is_none() {
            self.run_missing_attribute_diagnostic();
        }

        self.running = false;
        match self.fatal.take() {
            Some(err) => Err(err),
            None => {
                stats.root_errors = self.root_errors.len();
                Ok(stats)
            }
        }
    }

    fn seed(&mut self) {
        let snapshot: Vec<(Attribute<N>, AttrValue<N>)> =
            self.attributes.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        for (attr, value) in &snapshot {
            if self.fatal.is_some() {
                break;
            }
            let dependents = self.dependents.get(attr).cloned().unwrap_or_default();
            for rid in dependents {
                if self.fatal.is_some() {
                    break;
                }
                self.notify_dependent(rid, attr, value);
            }
        }
        if self.fatal.is_none() {
            let no_deps = self.no_deps.clone();
            for rid in no_deps {
                self.enqueue(rid);
            }
        }
    }

    /// Fires `rid`. Returns `true` if a fatal error aborted evaluation.
    fn fire(&mut self, rid: RuleId, stats: &mut RunStats) -> bool {
        let Some(computation) = self.rules[rid.0].computation.take() else {
            return false;
        };
        tracing::debug!(rule = %self.rules[rid.0].display_name(), "rule_firing");
        let mut cx = RuleCx { reactor: self, rule_id: rid };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| computation(&mut cx)));
        if let Err(payload) = result {
            self.fail(ReactorError::RulePanicked { rule: rid, message: panic_message(&*payload) });
            return true;
        }
        stats.rules_fired += 1;

        let rule = &self.rules[rid.0];
        let exports = rule.exports.clone();
        let values = rule.export_values.clone();

        if let Some(missing_index) = values.iter().position(Option::is_none) {
            self.fail(ReactorError::MissingExport { rule: rid, export: exports[missing_index].clone() });
            return true;
        }

        for (attr, value) in exports.into_iter().zip(values.into_iter()) {
            if self.fatal.is_some() {
                break;
            }
            self.set_value(attr, value.expect("checked above"));
        }
        self.fatal.is_some()
    }

    /// After the queue drains, fabricates "missing attribute" errors for
    /// dependencies that were never supplied and cannot still be produced
    /// indirectly by another untriggered rule. See spec §4.5.
    fn run_missing_attribute_diagnostic(&mut self) {
        let untriggered: Vec<RuleId> = self
            .rules
            .iter()
            .filter(|r| !r.has_fired())
            .filter(|r| {
                !r.dependencies
                    .iter()
                    .any(|d| matches!(self.attributes.get(d), Some(AttrValue::Error(_))))
            })
            .map(|r| r.id)
            .collect();

        let untriggered_exports: HashSet<Attribute<N>> = untriggered
            .iter()
            .flat_map(|rid| self.rules[rid.0].exports.iter().cloned())
            .collect();

        let mut to_diagnose = Vec::new();
        let mut seen = HashSet::new();
        for rid in &untriggered {
            for dep in &self.rules[rid.0].dependencies {
                if !self.attributes.contains_key(dep)
                    && !untriggered_exports.contains(dep)
                    && seen.insert(dep.clone())
                {
                    to_diagnose.push(dep.clone());
                }
            }
        }

        for attr in to_diagnose {
            if self.fatal.is_some() {
                break;
            }
            tracing::warn!(attribute = %attr, "missing_attribute");
            let err = SemanticError::new(format!("missing attribute {attr}"), attr.node().cloned());
            self.set_value(attr, AttrValue::Error(err));
        }
    }

    // ---- Inspection --------------------------------------------------

    pub fn get(&self, attr: &Attribute<N>) -> Option<&AttrValue<N>> {
        self.attributes.get(attr)
    }

    pub fn get_on(&self, node: N, name: impl Into<String>) -> Option<&AttrValue<N>> {
        self.get(&Attribute::on(node, name))
    }

    /// Every `(attribute, value)` pair whose attribute names `node`.
    pub fn get_all<'a>(&'a self, node: &'a N) -> impl Iterator<Item = (&'a Attribute<N>, &'a AttrValue<N>)> {
        self.attributes.iter().filter(move |(a, _)| a.node() == Some(node))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute<N>> {
        self.attributes.keys()
    }

    /// Root errors only — the natural summary.
    pub fn errors(&self) -> &[ErrorRef<N>] {
        &self.root_errors
    }

    /// Roots, every derived error stored as an attribute value, and
    /// attributeless-derived errors. Each error appears once.
    pub fn all_errors(&self) -> Vec<ErrorRef<N>> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for err in &self.root_errors {
            if seen.insert(Rc::as_ptr(err) as usize) {
                out.push(err.clone());
            }
        }
        for value in self.attributes.values() {
            if let AttrValue::Error(err) = value {
                if !err.is_root() && seen.insert(Rc::as_ptr(err) as usize) {
                    out.push(err.clone());
                }
            }
        }
        for err in &self.attributeless_derived_errors {
            if seen.insert(Rc::as_ptr(err) as usize) {
                out.push(err.clone());
            }
        }
        out
    }

    /// A textual dump of root errors at their effective location.
    pub fn report_errors(&self, print_location: impl Fn(&N) -> String) -> String {
        let mut out = String::new();
        for err in &self.root_errors {
            let loc = err.effective_location().map(&print_location).unwrap_or_else(|| "<unknown>".to_string());
            out.push_str(&format!("{loc}: {}\n", err.description()));
        }
        out
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
