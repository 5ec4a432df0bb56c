//! Deterministic scope classification for project intake.
//!
//! [`scope`] scores intake signals into a `feature`, `epic`, or `program` recommendation and
//! exports the rubric it scores with. [`gate`] wraps a classification in the versioned payload
//! consumed by decision surfaces and repairs payloads received from other producers.

pub mod config;
pub mod error;
pub mod gate;
pub mod scope;
pub mod telemetry;

pub use scope::{
    classify, scope_router, ScopeClassification, ScopeClassifier, ScopeConfig, ScopeInput,
    ScopeMode,
};
