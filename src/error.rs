//! Error values and the reactor's own fatal errors.
//!
//! [`SemanticError`] is a first-class attribute value: the framework never
//! distinguishes it specially except to avoid recursing into it and to walk
//! its cause chain. [`ReactorError`] is a different animal — a contract
//! violation in the embedder's own rule code (a rule that didn't fill an
//! export, a redefinition under the default policy, ...) that aborts
//! evaluation rather than becoming a value anyone can inspect.

use std::fmt;
use std::rc::Rc;

use crate::attribute::{Attribute, Node};
use crate::rule::RuleId;

/// Shared handle to a [`SemanticError`]. Two handles are the *same* error
/// only if they point at the same allocation — compare with
/// [`same_error`], never with field-by-field equality.
pub type ErrorRef<N> = Rc<SemanticError<N>>;

/// An immutable, first-class error value.
///
/// `cause` chains to a strictly older error (never a cycle, by
/// construction: every derived error is built from a `cause` that already
/// exists). `location` is the attribute's node, when known; when absent,
/// [`SemanticError::effective_location`] walks the cause chain for the
/// nearest ancestor that does have one.
pub struct SemanticError<N: Node> {
    description: String,
    cause: Option<ErrorRef<N>>,
    location: Option<N>,
}

impl<N: Node> SemanticError<N> {
    /// A root error: no cause.
    pub fn new(description: impl Into<String>, location: Option<N>) -> ErrorRef<N> {
        Rc::new(SemanticError { description: description.into(), cause: None, location })
    }

    /// A derived error, chained to an older one.
    pub fn caused_by(
        description: impl Into<String>,
        cause: ErrorRef<N>,
        location: Option<N>,
    ) -> ErrorRef<N> {
        Rc::new(SemanticError { description: description.into(), cause: Some(cause), location })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn cause(&self) -> Option<&ErrorRef<N>> {
        self.cause.as_ref()
    }

    pub fn location(&self) -> Option<&N> {
        self.location.as_ref()
    }

    pub fn is_root(&self) -> bool {
        self.cause.is_none()
    }

    /// `location` if set, else the nearest ancestor's location, else `None`.
    /// Terminates: the cause chain is acyclic by construction.
    pub fn effective_location(&self) -> Option<&N> {
        let mut current = self;
        loop {
            if current.location.is_some() {
                return current.location.as_ref();
            }
            match &current.cause {
                Some(cause) => current = cause,
                None => return None,
            }
        }
    }
}

impl<N: Node> fmt::Debug for SemanticError<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SemanticError")
            .field("description", &self.description)
            .field("has_cause", &self.cause.is_some())
            .field("location", &self.location)
            .finish()
    }
}

impl<N: Node> fmt::Display for SemanticError<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// Identity comparison for error handles: distinct instances are distinct
/// errors even when their text is identical.
pub fn same_error<N: Node>(a: &ErrorRef<N>, b: &ErrorRef<N>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Fatal framework errors: contract violations that abort `run` immediately
/// rather than propagating as attribute values. See spec §7 category 4.
#[derive(thiserror::Error)]
pub enum ReactorError<N: Node> {
    #[error("{rule} returned without a value for export {export}")]
    MissingExport { rule: RuleId, export: Attribute<N> },

    #[error("attribute {attribute} redefined: a value is already present and the default redefinition policy rejects the new one")]
    Redefinition { attribute: Attribute<N> },

    #[error("set() called while the reactor is running")]
    SetWhileRunning,

    #[error("{rule} panicked: {message}")]
    RulePanicked { rule: RuleId, message: String },
}

impl<N: Node> fmt::Debug for ReactorError<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_instances_are_distinct_even_with_same_text() {
        let a = SemanticError::<u32>::new("bad", None);
        let b = SemanticError::<u32>::new("bad", None);
        assert!(!same_error(&a, &b));
        assert!(same_error(&a, &a));
    }

    #[test]
    fn effective_location_walks_cause_chain() {
        let root = SemanticError::new("bad", Some(1u32));
        let derived = SemanticError::caused_by("missing dependency", root.clone(), None);
        assert_eq!(derived.effective_location(), Some(&1u32));
    }

    #[test]
    fn effective_location_is_none_when_nothing_in_chain_has_one() {
        let root = SemanticError::<u32>::new("bad", None);
        let derived = SemanticError::caused_by("missing dependency", root, None);
        assert_eq!(derived.effective_location(), None);
    }

    #[test]
    fn root_has_no_cause() {
        let root = SemanticError::<u32>::new("bad", None);
        assert!(root.is_root());
        let derived = SemanticError::caused_by("derived", root, None);
        assert!(!derived.is_root());
    }
}
