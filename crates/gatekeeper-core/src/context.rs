//! Per-request context (C1): metadata, a typed store, and an event sink.

use crate::events::{EventListener, EventListeners, ResilienceEvent};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use parking_lot::{Mutex, RwLock};

/// A compile-time key into the [`Context`] typed store.
///
/// `K` itself is never instantiated as a value; it only exists to carry the
/// `Value` associated type, the way the teacher's `CircuitBreakerConfig<Res, Err>`
/// encodes a response/error pair at the type level instead of as strings.
///
/// # Example
///
/// ```
/// use gatekeeper_core::context::{Context, ContextKey};
///
/// struct UserTier;
/// impl ContextKey for UserTier {
///     type Value = String;
/// }
///
/// let ctx = Context::new();
/// ctx.set::<UserTier>("gold".to_string());
/// assert_eq!(ctx.get::<UserTier>().as_deref().map(String::as_str), Some("gold"));
/// ```
pub trait ContextKey: 'static {
    /// The value type associated with this key.
    type Value: Send + Sync + 'static;
}

/// Request metadata carried alongside the typed store.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// Unique identifier for this request.
    pub request_id: String,
    /// Identifier of the authenticated user, if any.
    pub user_id: Option<String>,
    /// Correlation id linking this request to a wider trace/transaction.
    pub correlation_id: Option<String>,
    /// Wall-clock time the request was submitted.
    pub submitted_at: SystemTime,
    /// Monotonic instant the request was submitted, used for duration math.
    pub submitted_instant: Instant,
    /// A small free-form key/value bag.
    pub properties: HashMap<String, String>,
}

impl Metadata {
    /// Creates metadata for a request with a given id, stamping the current time.
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            user_id: None,
            correlation_id: None,
            submitted_at: SystemTime::now(),
            submitted_instant: Instant::now(),
            properties: HashMap::new(),
        }
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the correlation id.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

/// An event emitted through [`Context::emit`].
///
/// This is the free-form sibling of the structured, per-component events
/// (`CircuitBreakerEvent`, `BulkheadEvent`, ...): middlewares use it to
/// record request-scoped, ad-hoc observability without needing a dedicated
/// event enum.
#[derive(Debug, Clone)]
pub struct ContextEvent {
    name: &'static str,
    properties: HashMap<String, String>,
    timestamp: Instant,
}

impl ContextEvent {
    /// The event's name.
    pub fn name(&self) -> &str {
        self.name
    }

    /// The event's properties.
    pub fn properties(&self) -> &HashMap<String, String> {
        &self.properties
    }
}

impl ResilienceEvent for ContextEvent {
    fn event_type(&self) -> &'static str {
        self.name
    }

    fn timestamp(&self) -> Instant {
        self.timestamp
    }

    fn pattern_name(&self) -> &str {
        "context"
    }
}

#[derive(Default)]
struct TypedStore {
    values: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl TypedStore {
    fn get<K: ContextKey>(&self) -> Option<Arc<K::Value>> {
        self.values
            .get(&TypeId::of::<K>())
            .and_then(|v| Arc::clone(v).downcast::<K::Value>().ok())
    }

    fn set<K: ContextKey>(&mut self, value: K::Value) {
        self.values.insert(TypeId::of::<K>(), Arc::new(value));
    }

    fn remove<K: ContextKey>(&mut self) -> Option<Arc<K::Value>> {
        self.values
            .remove(&TypeId::of::<K>())
            .and_then(|v| v.downcast::<K::Value>().ok())
    }

    fn contains<K: ContextKey>(&self) -> bool {
        self.values.contains_key(&TypeId::of::<K>())
    }
}

/// A per-request container passed by shared reference through the
/// middleware chain (C1).
///
/// Reads never fail (`get` of an unset key returns `None`); writes are
/// last-writer-wins under the internal lock. `Context` is `Send + Sync` and
/// cheap to clone (it is reference-counted internally through `Arc` field
/// values, though the `Context` handle itself is usually passed as `&Context`
/// rather than cloned).
pub struct Context {
    metadata: Mutex<Metadata>,
    store: RwLock<TypedStore>,
    events: EventListeners<ContextEvent>,
}

impl Context {
    /// Creates a new context with a freshly generated metadata block.
    pub fn new() -> Self {
        Self::with_metadata(Metadata::new(generate_request_id()))
    }

    /// Creates a new context from an explicit [`Metadata`] value.
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata: Mutex::new(metadata),
            store: RwLock::new(TypedStore::default()),
            events: EventListeners::new(),
        }
    }

    /// Returns a clone of the current metadata.
    pub fn metadata(&self) -> Metadata {
        self.metadata.lock().clone()
    }

    /// Mutates the metadata in place (e.g. to stamp a correlation id
    /// discovered mid-chain).
    pub fn update_metadata(&self, f: impl FnOnce(&mut Metadata)) {
        let mut guard = self.metadata.lock();
        f(&mut guard);
    }

    /// Reads the value stored for `K`, if any has been set.
    pub fn get<K: ContextKey>(&self) -> Option<Arc<K::Value>> {
        self.store.read().get::<K>()
    }

    /// Writes a value for `K`, overwriting any previous value
    /// (last-writer-wins).
    pub fn set<K: ContextKey>(&self, value: K::Value) {
        self.store.write().set::<K>(value);
    }

    /// Removes and returns the value stored for `K`, if any.
    pub fn remove<K: ContextKey>(&self) -> Option<Arc<K::Value>> {
        self.store.write().remove::<K>()
    }

    /// Returns `true` if a value is currently stored for `K`.
    pub fn contains<K: ContextKey>(&self) -> bool {
        self.store.read().contains::<K>()
    }

    /// Registers a listener for events emitted via [`Context::emit`].
    pub fn on_event<L>(&mut self, listener: L)
    where
        L: EventListener<ContextEvent> + 'static,
    {
        self.events.add(listener);
    }

    /// Emits a named event with a property bag to every registered listener.
    ///
    /// Listener panics are caught and never propagate to the caller (see
    /// [`EventListeners::emit`]).
    pub fn emit(&self, event_name: &'static str, properties: HashMap<String, String>) {
        let event = ContextEvent {
            name: event_name,
            properties,
            timestamp: Instant::now(),
        };
        self.events.emit(&event);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_request_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let seq = COUNTER.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    format!("req-{nanos:x}-{seq:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc as StdArc;

    struct CounterKey;
    impl ContextKey for CounterKey {
        type Value = i64;
    }

    struct NameKey;
    impl ContextKey for NameKey {
        type Value = String;
    }

    #[test]
    fn unset_key_reads_as_none() {
        let ctx = Context::new();
        assert!(ctx.get::<CounterKey>().is_none());
    }

    #[test]
    fn round_trip_set_then_get() {
        let ctx = Context::new();
        ctx.set::<CounterKey>(42);
        assert_eq!(*ctx.get::<CounterKey>().unwrap(), 42);
    }

    #[test]
    fn last_writer_wins() {
        let ctx = Context::new();
        ctx.set::<NameKey>("first".to_string());
        ctx.set::<NameKey>("second".to_string());
        assert_eq!(ctx.get::<NameKey>().unwrap().as_str(), "second");
    }

    #[test]
    fn remove_clears_the_slot() {
        let ctx = Context::new();
        ctx.set::<CounterKey>(1);
        assert!(ctx.remove::<CounterKey>().is_some());
        assert!(ctx.get::<CounterKey>().is_none());
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let ctx = Context::new();
        ctx.set::<CounterKey>(7);
        ctx.set::<NameKey>("seven".to_string());
        assert_eq!(*ctx.get::<CounterKey>().unwrap(), 7);
        assert_eq!(ctx.get::<NameKey>().unwrap().as_str(), "seven");
    }

    #[test]
    fn metadata_round_trips() {
        let ctx = Context::with_metadata(
            Metadata::new("abc").with_user_id("u1").with_correlation_id("corr-1"),
        );
        let md = ctx.metadata();
        assert_eq!(md.request_id, "abc");
        assert_eq!(md.user_id.as_deref(), Some("u1"));
        assert_eq!(md.correlation_id.as_deref(), Some("corr-1"));
    }

    #[test]
    fn two_contexts_get_distinct_generated_request_ids() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.metadata().request_id, b.metadata().request_id);
    }

    #[test]
    fn emit_reaches_registered_listeners() {
        let mut ctx = Context::new();
        let count = StdArc::new(AtomicUsize::new(0));
        let count_clone = StdArc::clone(&count);
        ctx.on_event(crate::events::FnListener::new(move |_: &ContextEvent| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        ctx.emit("middleware.started", HashMap::new());
        ctx.emit("middleware.finished", HashMap::new());

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn concurrent_readers_and_writer_never_observe_torn_values() {
        use std::thread;

        let ctx = StdArc::new(Context::new());
        ctx.set::<CounterKey>(0);

        let writer = {
            let ctx = StdArc::clone(&ctx);
            thread::spawn(move || {
                for i in 1..=1000 {
                    ctx.set::<CounterKey>(i);
                }
            })
        };

        let reader = {
            let ctx = StdArc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..1000 {
                    if let Some(v) = ctx.get::<CounterKey>() {
                        assert!(*v >= 0);
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(*ctx.get::<CounterKey>().unwrap(), 1000);
    }
}
