//! Heterogeneous attribute values.
//!
//! Attribute values are arbitrary — strings, numbers, compound records —
//! checked at the use site rather than by the framework. [`Payload`] is a
//! dynamically-typed box; framework code only ever discriminates
//! [`AttrValue::Value`] from [`AttrValue::Error`], never the payload's
//! concrete type.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::attribute::Node;
use crate::error::ErrorRef;

/// A dynamically-typed, cheaply-cloned payload.
///
/// The reactor is single-threaded and cooperative (spec §5: no parallel
/// evaluation), so payloads are `Rc`-backed rather than `Arc`-backed — there
/// is never a second thread to share them with.
#[derive(Clone)]
pub struct Payload(Rc<dyn Any>);

impl Payload {
    pub fn new<T: Any>(value: T) -> Self {
        Payload(Rc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<payload>")
    }
}

/// What an attribute's stored value actually is: a payload, or an error
/// that precluded computing one. Errors are first-class values in this
/// framework, not a side channel.
#[derive(Clone, Debug)]
pub enum AttrValue<N: Node> {
    Value(Payload),
    Error(ErrorRef<N>),
}

impl<N: Node> AttrValue<N> {
    pub fn is_error(&self) -> bool {
        matches!(self, AttrValue::Error(_))
    }

    pub fn as_error(&self) -> Option<&ErrorRef<N>> {
        match self {
            AttrValue::Error(e) => Some(e),
            AttrValue::Value(_) => None,
        }
    }

    pub fn as_payload(&self) -> Option<&Payload> {
        match self {
            AttrValue::Value(p) => Some(p),
            AttrValue::Error(_) => None,
        }
    }

    /// Downcast the payload, or `None` if this is an error or the wrong type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_payload().and_then(Payload::downcast_ref::<T>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_roundtrips_through_downcast() {
        let p = Payload::new(42i64);
        assert_eq!(p.downcast_ref::<i64>(), Some(&42i64));
        assert_eq!(p.downcast_ref::<String>(), None);
    }

    #[test]
    fn attr_value_discriminates_error_vs_value() {
        let v: AttrValue<u32> = AttrValue::Value(Payload::new("int".to_string()));
        assert!(!v.is_error());
        assert_eq!(v.downcast_ref::<String>(), Some(&"int".to_string()));
    }
}
