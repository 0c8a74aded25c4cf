//! A bounded object pool plus a label-keyed observability aggregator.
//!
//! [`ObjectPool`] checks objects out with [`ObjectPool::acquire`] and takes
//! them back when the returned [`PooledObject`] guard drops, constructing a
//! new object on a miss and evicting on a release into a full idle queue.
//! Pools may opt into a process-wide registry (`ObjectPool::register`) so a
//! caller under memory pressure can call [`shrink_all`] to trim every
//! registered pool's idle queue at once.
//!
//! [`Observability`] aggregates counters, gauges, histograms and summaries
//! keyed by name and label set, with streaming quantile estimation so a
//! histogram's memory footprint never grows with the number of observations.
//!
//! # Examples
//!
//! ```
//! use gatekeeper_pool::ObjectPool;
//!
//! let pool = ObjectPool::new("buffers", 16, || Vec::<u8>::with_capacity(4096));
//! let mut buf = pool.acquire();
//! buf.extend_from_slice(b"hello");
//! drop(buf); // returned to the pool for reuse
//!
//! assert_eq!(pool.stats().available, 1);
//! ```
//!
//! ```
//! use gatekeeper_pool::{LabelKey, Observability};
//!
//! let obs = Observability::new();
//! let key = LabelKey::new("http_requests_total", [("route".to_string(), "/orders".to_string())]);
//! obs.increment_counter(key, 1);
//! assert_eq!(obs.snapshot().len(), 1);
//! ```

mod observability;
mod pool;
mod quantile;

pub use observability::{DistributionSnapshot, LabelKey, MetricSnapshot, Observability};
pub use pool::{registered_pool_count, shrink_all, ObjectPool, PoolStats, PooledObject, ShrinkablePool};
pub use quantile::P2Quantile;
