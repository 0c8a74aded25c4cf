//! Core infrastructure shared by every gatekeeper crate.
//!
//! This crate provides the pieces that don't belong to any single
//! resilience pattern:
//! - [`command`]: command identity and the handler contract
//! - [`priority`]: the fixed middleware execution order
//! - [`context`]: the per-request typed store and event sink
//! - [`error`]: the closed `PipelineError` taxonomy
//! - [`events`]: the generic event system every pattern emits through
//! - [`health_integration`]: proactive health-to-resilience wiring
//! - [`aimd`]: an additive-increase/multiplicative-decrease controller,
//!   available as a building block for an adaptive concurrency limiter;
//!   no component in this workspace currently drives one

pub mod aimd;
pub mod command;
pub mod context;
pub mod error;
pub mod events;
pub mod health_integration;
pub mod priority;

pub use command::{Command, CommandTypeId};
pub use context::{Context, ContextKey, Metadata};
pub use error::{
    BackPressureReason, BulkheadRejectionReason, ErrorContext, PipelineError, ResilienceExhaustion,
};
pub use events::{EventListener, EventListeners, ResilienceEvent};
pub use health_integration::{HealthTriggerable, SharedHealthTrigger, TriggerHealth};
pub use priority::Priority;
