//! `actions` crate: the contract between the workflow engine and the
//! side-effecting actions an `Execute` node delegates to.
//!
//! The engine never inspects *why* an action succeeds or fails; it only
//! consumes the [`ActionExecutor`] result.  Hosts plug concrete actions in
//! through an [`ActionRegistry`].

pub mod builtin;
pub mod error;
pub mod mock;
pub mod registry;
pub mod traits;

pub use error::ActionError;
pub use registry::ActionRegistry;
pub use traits::{ActionExecutor, ActionParameter};
