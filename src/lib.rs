//! # Attribute Reactor
//!
//! A dataflow engine for semantic analysis over an embedder-supplied AST:
//! attributes, rules, and fixed-point evaluation with errors as first-class
//! values rather than a side channel.
//!
//! ## Pipeline
//!
//! ```text
//! Embedder registers rules   reactor.rule(exports).using(deps).by(|cx| ...)
//!     ↓
//! Eager facts seeded         reactor.set(attr, value) / reactor.error(err, &[...])
//!     ↓
//! [Reactor::run]             drains the ready-queue to a fixed point
//!     ↓
//! Attributes + errors        reactor.get(attr) / reactor.all_errors()
//! ```
//!
//! A rule becomes ready exactly when every attribute it depends on has a
//! value (or is transitively tainted by an error, in which case its exports
//! are tainted too and it never fires). Dependencies can be registered
//! lazily from within another rule's computation, which lets the dependency
//! graph grow while `run` is in progress.
//!
//! ## Example
//!
//! ```
//! use reactor::{Attribute, Reactor};
//!
//! let mut r: Reactor<u32> = Reactor::new();
//! let a = Attribute::on(1, "len");
//! let b = Attribute::on(1, "doubled");
//!
//! r.rule(vec![b.clone()]).using(vec![a.clone()]).by(|cx| {
//!     let len = *cx.get(0).downcast_ref::<i64>().unwrap();
//!     cx.set(0, len * 2);
//! });
//!
//! r.set(a, 21i64).unwrap();
//! r.run().unwrap();
//! assert_eq!(r.get(&b).unwrap().downcast_ref::<i64>(), Some(&42));
//! ```

pub mod attribute;
pub mod builder;
pub mod config;
pub mod error;
pub mod logging;
pub mod reactor;
pub mod rule;
pub mod value;

pub use attribute::{Attribute, Node};
pub use builder::RuleBuilder;
pub use config::{LoggingConfig, ReactorConfig};
pub use error::{same_error, ErrorRef, ReactorError, SemanticError};
pub use reactor::{Reactor, RedefinitionDecision, RunStats};
pub use rule::{RuleCx, RuleId};
pub use value::{AttrValue, Payload};
