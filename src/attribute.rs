//! Attribute identity.
//!
//! An [`Attribute`] is the `(node, name)` pair used throughout the reactor as
//! a map key and as an edge label in the rule-dependency graph. Equality is
//! identity on `node` and value equality on `name` — two distinct AST nodes
//! with textually identical contents are distinct attributes.

use std::fmt;
use std::hash::Hash;

/// Marker bound for embedder-supplied node identities.
///
/// The reactor never inspects or walks node values; it only needs them to be
/// cheaply cloned, compared for identity, and hashed, so they can serve as a
/// map key. A bare index into an arena (`NodeId(u32)`) is the usual choice —
/// two indices compare equal exactly when they name the same AST node, which
/// is the identity semantics this trait assumes of `Eq`.
pub trait Node: Clone + Eq + Hash + fmt::Debug {}

impl<T: Clone + Eq + Hash + fmt::Debug> Node for T {}

/// A `(node, name)` identity pair.
///
/// `node` is `None` for "global" attributes with no associated AST node.
/// Immutable once constructed.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Attribute<N: Node> {
    node: Option<N>,
    name: String,
}

impl<N: Node> Attribute<N> {
    /// An attribute attached to a specific node.
    pub fn on(node: N, name: impl Into<String>) -> Self {
        Attribute { node: Some(node), name: name.into() }
    }

    /// A global attribute with no associated node.
    pub fn global(name: impl Into<String>) -> Self {
        Attribute { node: None, name: name.into() }
    }

    pub fn node(&self) -> Option<&N> {
        self.node.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<N: Node> fmt::Debug for Attribute<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<N: Node> fmt::Display for Attribute<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node {
            Some(node) => write!(f, "({node:?} :: {})", self.name),
            None => write!(f, "(<global> :: {})", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_identity_on_node_value_on_name() {
        let a = Attribute::on(1u32, "t");
        let b = Attribute::on(1u32, "t");
        let c = Attribute::on(2u32, "t");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn global_attributes_have_no_node() {
        let g1 = Attribute::<u32>::global("phase");
        let g2 = Attribute::<u32>::global("phase");
        assert_eq!(g1, g2);
        assert!(g1.node().is_none());
    }

    #[test]
    fn display_is_compact() {
        let a = Attribute::on(7u32, "type");
        assert_eq!(format!("{a}"), "(7 :: type)");
    }
}
