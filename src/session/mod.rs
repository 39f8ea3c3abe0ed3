//! Session state for gated execution
//!
//! A session is a bounded run of tool invocations sharing one policy and one
//! action counter.

mod context;

pub use context::SessionContext;
