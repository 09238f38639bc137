//! testdesk-core: data model, traits, and the student test workflow.
//!
//! This crate defines the backend records, the error taxonomy, and the
//! attempt, result, and history logic that the rest of testdesk builds on.

pub mod attempt;
pub mod countdown;
pub mod error;
pub mod history;
pub mod model;
pub mod result;
pub mod traits;

pub use error::{AccessDenial, ApiError};
