//! Bounded object pool: check objects out with `acquire`, hand them back by
//! dropping the returned guard.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crossbeam_queue::ArrayQueue;

/// A point-in-time snapshot of a pool's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquisitions satisfied from the idle queue.
    pub hits: u64,
    /// Acquisitions that had to construct a new object.
    pub misses: u64,
    /// Releases dropped because the idle queue was already at capacity.
    pub evictions: u64,
    /// Objects currently checked out.
    pub active_in_use: u64,
    /// Idle objects currently available for reuse.
    pub available: u64,
    /// The highest `active_in_use` has ever been.
    pub peak_usage: u64,
}

struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    active_in_use: AtomicU64,
    peak_usage: AtomicU64,
}

impl Counters {
    fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            active_in_use: AtomicU64::new(0),
            peak_usage: AtomicU64::new(0),
        }
    }
}

/// A bounded pool of reusable `T` objects.
///
/// `acquire` pops an idle object if one is available, else constructs a new
/// one via the configured factory. Dropping the returned [`PooledObject`]
/// releases it back to the pool; if the idle queue is already full, the
/// object is dropped instead (an eviction).
pub struct ObjectPool<T: Send + 'static> {
    idle: ArrayQueue<T>,
    factory: Box<dyn Fn() -> T + Send + Sync>,
    counters: Counters,
    name: String,
}

impl<T: Send + 'static> ObjectPool<T> {
    /// Creates a pool holding at most `capacity` idle objects, constructing
    /// new ones via `factory` on a miss.
    pub fn new<F>(name: impl Into<String>, capacity: usize, factory: F) -> Arc<Self>
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Arc::new(Self {
            idle: ArrayQueue::new(capacity.max(1)),
            factory: Box::new(factory),
            counters: Counters::new(),
            name: name.into(),
        })
    }

    /// This pool's configured name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checks out an object: reuses an idle one if available, else
    /// constructs a new one.
    pub fn acquire(self: &Arc<Self>) -> PooledObject<T> {
        let (object, hit) = match self.idle.pop() {
            Some(object) => (object, true),
            None => ((self.factory)(), false),
        };

        if hit {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.counters.misses.fetch_add(1, Ordering::Relaxed);
        }

        let active = self.counters.active_in_use.fetch_add(1, Ordering::Relaxed) + 1;
        self.counters.peak_usage.fetch_max(active, Ordering::Relaxed);

        PooledObject {
            object: Some(object),
            pool: Arc::clone(self),
        }
    }

    /// A snapshot of this pool's statistics.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            active_in_use: self.counters.active_in_use.load(Ordering::Relaxed),
            available: self.idle.len() as u64,
            peak_usage: self.counters.peak_usage.load(Ordering::Relaxed),
        }
    }

    /// Opts this pool into the process-wide registry swept by
    /// [`shrink_all`]. Holding only a `Weak` reference, the registry never
    /// keeps a pool alive past its owner dropping it.
    pub fn register(self: &Arc<Self>) {
        registry().lock().unwrap().push(Arc::downgrade(self) as Weak<dyn ShrinkablePool>);
    }

    fn release(&self, object: T) {
        self.counters.active_in_use.fetch_sub(1, Ordering::Relaxed);
        if self.idle.push(object).is_err() {
            self.counters.evictions.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// An object checked out of an [`ObjectPool`]. Dereferences to `T`; dropping
/// it releases the object back to the pool.
pub struct PooledObject<T: Send + 'static> {
    object: Option<T>,
    pool: Arc<ObjectPool<T>>,
}

impl<T: Send + 'static> std::ops::Deref for PooledObject<T> {
    type Target = T;
    fn deref(&self) -> &T {
        self.object.as_ref().expect("object taken before drop")
    }
}

impl<T: Send + 'static> std::ops::DerefMut for PooledObject<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.object.as_mut().expect("object taken before drop")
    }
}

impl<T: Send + 'static> Drop for PooledObject<T> {
    fn drop(&mut self) {
        if let Some(object) = self.object.take() {
            self.pool.release(object);
        }
    }
}

/// A pool that can shrink its idle queue on command, independent of the
/// element type it holds. This is the trait-object seam the process-wide
/// registry uses, since a single registry cannot be generic over every
/// pool's `T`.
pub trait ShrinkablePool: Send + Sync {
    /// Drops roughly `fraction` of currently idle objects (clamped to
    /// `[0.0, 1.0]`; `NaN` is treated as `0.0`).
    fn shrink(&self, fraction: f64);

    /// This pool's configured name, for observability.
    fn name(&self) -> &str;
}

impl<T: Send + 'static> ShrinkablePool for ObjectPool<T> {
    fn shrink(&self, fraction: f64) {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        let to_drop = (self.idle.len() as f64 * fraction).floor() as usize;
        for _ in 0..to_drop {
            if self.idle.pop().is_none() {
                break;
            }
        }
    }

    fn name(&self) -> &str {
        ObjectPool::name(self)
    }
}

fn registry() -> &'static Mutex<Vec<Weak<dyn ShrinkablePool>>> {
    static REGISTRY: OnceLock<Mutex<Vec<Weak<dyn ShrinkablePool>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(Vec::new()))
}

/// Shrinks every pool registered via [`ObjectPool::register`] by
/// `percentage` (clamped to `[0.0, 1.0]`; `NaN`/infinite values clamp to the
/// nearest bound, with `NaN` treated as `0.0`). Dead (dropped) pools are
/// swept from the registry as a side effect.
pub fn shrink_all(percentage: f64) {
    let fraction = if percentage.is_nan() {
        0.0
    } else {
        percentage.clamp(0.0, 1.0)
    };
    let mut guard = registry().lock().unwrap();
    guard.retain(|weak| match weak.upgrade() {
        Some(pool) => {
            pool.shrink(fraction);
            true
        }
        None => false,
    });
}

/// The number of pools currently registered (for tests/diagnostics).
pub fn registered_pool_count() -> usize {
    let mut guard = registry().lock().unwrap();
    guard.retain(|weak| weak.strong_count() > 0);
    guard.len()
}
