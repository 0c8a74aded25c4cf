//! Bulkhead pattern: limit concurrent calls against a resource, optionally
//! partitioned by key with cross-partition borrowing.
//!
//! A [`Bulkhead`] guards a single budget; a [`PartitionedBulkhead`] splits
//! that budget across independent partition keys (e.g. per tenant), with an
//! optional rule allowing a partition at capacity to borrow a permit from
//! another partition that has spare headroom.
//!
//! # Basic Example
//!
//! ```rust
//! use gatekeeper_bulkhead::Bulkhead;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bulkhead = Bulkhead::new(
//!     gatekeeper_bulkhead::BulkheadConfig::builder()
//!         .max_concurrent_calls(10)
//!         .name("my-bulkhead")
//!         .build(),
//! );
//!
//! let token = bulkhead.acquire().await?;
//! // ... do work while holding `token` ...
//! drop(token);
//! # Ok(())
//! # }
//! ```
//!
//! # Partitioned Example
//!
//! ```rust
//! use gatekeeper_bulkhead::{PartitionedBulkhead, PartitionedBulkheadConfig, PartitionLimits};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bulkhead = PartitionedBulkhead::new(
//!     PartitionedBulkheadConfig::builder()
//!         .default_limits(PartitionLimits::new(10))
//!         .partition("premium", PartitionLimits::new(50))
//!         .max_borrow_percentage(0.2)
//!         .build(),
//! );
//!
//! let token = bulkhead.acquire("premium").await?;
//! drop(token);
//! # Ok(())
//! # }
//! ```

mod bulkhead;
mod config;
mod error;
mod events;
mod partition;
mod partitioned;
mod token;

pub use bulkhead::Bulkhead;
pub use config::{
    BulkheadConfig, BulkheadConfigBuilder, PartitionLimits, PartitionedBulkheadConfig,
    PartitionedBulkheadConfigBuilder,
};
pub use error::{BulkheadError, Result};
pub use events::BulkheadEvent;
pub use partitioned::PartitionedBulkhead;
pub use token::BulkheadToken;
