//! Concurrency, outstanding, and memory budget back-pressure (C2).
//!
//! [`BackPressureSemaphore`] admits callers against three budgets —
//! `max_concurrency`, `max_outstanding` (held + queued), and an optional
//! memory budget — and queues callers it can't immediately admit in a
//! priority-then-FIFO wait queue. A held permit is represented by a
//! [`SemaphoreToken`] whose `Drop` releases it; there is no other way to
//! give a permit back.

mod config;
mod error;
mod events;
mod semaphore;
mod token;
mod waiter;

pub use config::{BackPressureConfig, BackPressureConfigBuilder, OverflowStrategy, WaiterPriority};
pub use error::{BackPressureError, Result};
pub use events::BackPressureEvent;
pub use semaphore::{BackPressureSemaphore, BackPressureStats};
pub use token::SemaphoreToken;
