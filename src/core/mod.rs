//! Core types shared by every gating component

pub mod error;

pub use error::{GateError, GateResult};
