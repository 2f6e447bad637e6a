//! Continuous observation of single nodes and keyed collections.
//!
//! Every call to `observe_*` opens exactly one subscription and returns immediately with its [`CancelHandle`].
//! Each subscription drains its own ordered event stream in its own task, so its callbacks never run
//! concurrently with each other and see events in arrival order. Nothing is ordered across subscriptions.
//!
//! Subscriptions run on the ambient tokio runtime. Outside of one, `observe_*` still returns a handle, but the
//! subscription is stalled from the start.
//!
//! Cancelling is explicit. Dropping a handle does not cancel anything, and [`Observer::close`] cancels
//! everything opened through that observer at once.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};

use futures::StreamExt;
use serde::de::DeserializeOwned;
use slotmap::{DefaultKey, SlotMap};
use tokio::task::AbortHandle;

use crate::codec::{self, kind_name};
use crate::data_model::{
    ChildEvent, DecodeError, EventFilter, Mirror, Path, Reconcile, Record, SubscriptionHealth,
    ValueEvent,
};
use crate::store::RemoteWatch;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct SubscriptionKey(DefaultKey);

struct Subscription {
    path: Path,
    live: AtomicBool,
    health: Mutex<SubscriptionHealth>,
    task: Mutex<Option<AbortHandle>>,
    // held for the whole of every callback
    gate: Mutex<()>,
    delivering_on: Mutex<Option<ThreadId>>,
}

impl Subscription {
    fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    fn health(&self) -> MutexGuard<'_, SubscriptionHealth> {
        lock(&self.health)
    }

    /// Runs `callback` behind the gate unless the subscription was cancelled. Every callback goes through here.
    fn gated(&self, callback: impl FnOnce()) {
        let _gate = lock(&self.gate);
        if !self.is_live() {
            return;
        }
        *lock(&self.delivering_on) = Some(thread::current().id());
        callback();
        *lock(&self.delivering_on) = None;
    }

    fn deliver(&self, callback: impl FnOnce()) {
        self.gated(|| {
            self.health().record_success();
            callback();
        });
    }

    /// Blocks until a callback that is running right now has returned. A cancel from inside the callback itself
    /// doesn't wait for itself.
    fn wait_for_delivery(&self) {
        if *lock(&self.delivering_on) == Some(thread::current().id()) {
            return;
        }
        drop(lock(&self.gate));
    }

    fn drop_event(&self, error: DecodeError) {
        log::warn!("Dropping undecodable event for {}: {error}", self.path);
        self.health().record_failure(error.to_string());
    }

    fn stall(&self, reason: String) {
        log::warn!("Subscription to {} stalled: {reason}", self.path);
        self.health().mark_stalled(reason);
    }

    fn stream_ended(&self) {
        if self.is_live() {
            self.stall("the transport ended the stream".to_string());
        }
    }

    /// Returns true if this call did the cancelling.
    fn cancel(&self) -> bool {
        let was_live = self.live.swap(false, Ordering::AcqRel);
        self.wait_for_delivery();
        if !was_live {
            return false;
        }
        self.health().cancelled = true;
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
        true
    }
}

type Registry = Mutex<SlotMap<DefaultKey, Arc<Subscription>>>;

/// Owner's handle to one subscription. Clones refer to the same subscription.
#[derive(Clone)]
pub struct CancelHandle {
    key: SubscriptionKey,
    subscription: Arc<Subscription>,
    registry: Weak<Registry>,
}

impl CancelHandle {
    /// Stops the subscription. No callback runs after this returns, including for events that were already queued.
    /// Calling it again does nothing.
    pub fn cancel(&self) {
        if self.subscription.cancel() {
            log::info!("Cancelled subscription to {}", self.subscription.path);
        }
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).remove(self.key.0);
        }
    }

    pub fn is_active(&self) -> bool {
        self.subscription.is_live()
    }

    pub fn health(&self) -> SubscriptionHealth {
        self.subscription.health().clone()
    }

    pub fn path(&self) -> &Path {
        &self.subscription.path
    }

    pub fn key(&self) -> SubscriptionKey {
        self.key
    }
}

/// What a collection subscription hands to its sink.
enum Delivery<T: Record> {
    Step(Reconcile<T>),
    Synced,
}

pub struct Observer<S> {
    store: Arc<S>,
    registry: Arc<Registry>,
}

impl<S: RemoteWatch> Observer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            registry: Arc::new(Mutex::new(SlotMap::new())),
        }
    }

    /// Number of subscriptions opened through this observer that haven't been cancelled.
    pub fn active(&self) -> usize {
        lock(&self.registry)
            .values()
            .filter(|subscription| subscription.is_live())
            .count()
    }

    /// Cancels every subscription opened through this observer.
    pub fn close(&self) {
        let subscriptions: Vec<_> = lock(&self.registry).drain().map(|(_, s)| s).collect();
        let cancelled = subscriptions.iter().filter(|s| s.cancel()).count();
        log::info!("Observer closed, cancelled {cancelled} subscriptions");
    }

    fn register(&self, path: &Path) -> CancelHandle {
        let subscription = Arc::new(Subscription {
            path: path.clone(),
            live: AtomicBool::new(true),
            health: Mutex::new(SubscriptionHealth::default()),
            task: Mutex::new(None),
            gate: Mutex::new(()),
            delivering_on: Mutex::new(None),
        });
        let key = lock(&self.registry).insert(subscription.clone());
        CancelHandle {
            key: SubscriptionKey(key),
            subscription,
            registry: Arc::downgrade(&self.registry),
        }
    }

    fn spawn(handle: &CancelHandle, task: impl Future<Output = ()> + Send + 'static) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                handle.subscription.stall(format!("no tokio runtime to run on: {e}"));
                return;
            }
        };
        let task = runtime.spawn(task).abort_handle();
        *lock(&handle.subscription.task) = Some(task.clone());
        // Cancelled between registering and spawning.
        if !handle.subscription.is_live() {
            task.abort();
        }
    }

    /// Observes a single node. `on_change` gets every decodable value, `on_remove` runs when the node is absent or
    /// empty, including right away if it doesn't exist yet. Undecodable values are dropped.
    pub fn observe_object<T, C, R>(&self, path: &Path, mut on_change: C, mut on_remove: R) -> CancelHandle
    where
        T: DeserializeOwned + Send + 'static,
        C: FnMut(T) + Send + 'static,
        R: FnMut() + Send + 'static,
    {
        let handle = self.register(path);
        let subscription = handle.subscription.clone();
        let mut events = self.store.watch_value(path);

        Self::spawn(&handle, async move {
            while let Some(event) = events.next().await {
                if !subscription.is_live() {
                    return;
                }
                match event {
                    ValueEvent::Changed(value) => match codec::decode::<T>(&value) {
                        Ok(value) => subscription.deliver(|| on_change(value)),
                        Err(e) => subscription.drop_event(e),
                    },
                    ValueEvent::Removed => subscription.deliver(&mut on_remove),
                }
                subscription.health().synced = true;
            }
            subscription.stream_ended();
        });
        handle
    }

    /// Observes a keyed collection. `on_reconcile` gets one step per child event and is expected to apply it to
    /// the caller's list, e.g. with [`Reconcile::apply`].
    pub fn observe_collection<T, C>(&self, path: &Path, on_reconcile: C) -> CancelHandle
    where
        T: Record,
        C: FnMut(Reconcile<T>) + Send + 'static,
    {
        self.observe_collection_filtered(path, EventFilter::ALL, on_reconcile)
    }

    /// Like [`Observer::observe_collection`], but only for the child events `filter` accepts.
    pub fn observe_collection_filtered<T, C>(
        &self,
        path: &Path,
        filter: EventFilter,
        mut on_reconcile: C,
    ) -> CancelHandle
    where
        T: Record,
        C: FnMut(Reconcile<T>) + Send + 'static,
    {
        self.observe_children(path, filter, move |delivery| {
            if let Delivery::Step(step) = delivery {
                on_reconcile(step);
            }
        })
    }

    /// Keeps `mirror` in sync with the collection at `path`.
    pub fn observe_into<T>(&self, path: &Path, mirror: Mirror<T>) -> CancelHandle
    where
        T: Record + PartialEq,
    {
        self.observe_children(path, EventFilter::ALL, move |delivery| match delivery {
            Delivery::Step(step) => {
                mirror.apply(step);
            }
            Delivery::Synced => {
                mirror.mark_loaded();
            }
        })
    }

    fn observe_children<T, F>(&self, path: &Path, filter: EventFilter, mut sink: F) -> CancelHandle
    where
        T: Record,
        F: FnMut(Delivery<T>) + Send + 'static,
    {
        let handle = self.register(path);
        let subscription = handle.subscription.clone();
        let mut events = self.store.watch_children(path);

        Self::spawn(&handle, async move {
            while let Some(event) = events.next().await {
                if !subscription.is_live() {
                    return;
                }
                let kind = event.kind();
                let step = match event {
                    ChildEvent::Synced => {
                        subscription.health().synced = true;
                        subscription.gated(|| sink(Delivery::Synced));
                        continue;
                    }
                    ChildEvent::NotKeyed { value } => {
                        let error = DecodeError::NotKeyed {
                            found: kind_name(&value),
                        };
                        subscription.stall(error.to_string());
                        return;
                    }
                    _ if kind.is_some_and(|kind| !filter.accepts(kind)) => continue,
                    ChildEvent::Added { key, value } | ChildEvent::Changed { key, value } => {
                        codec::decode_keyed::<T>(&key, &value).map(Reconcile::Upsert)
                    }
                    ChildEvent::Removed { key, .. } => {
                        codec::decode_key::<T>(&key).map(Reconcile::Remove)
                    }
                };
                match step {
                    Ok(step) => subscription.deliver(|| sink(Delivery::Step(step))),
                    Err(e) => subscription.drop_event(e),
                }
            }
            subscription.stream_ended();
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Clone, Debug, PartialEq, serde::Deserialize)]
    struct Person {
        id: String,
        name: String,
    }

    impl Record for Person {
        type Id = String;

        fn id(&self) -> &String {
            &self.id
        }
    }

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    fn setup() -> (Arc<MemoryStore>, Observer<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let observer = Observer::new(store.clone());
        (store, observer)
    }

    async fn eventually(condition: impl Fn() -> bool) {
        let waited = tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await;
        assert!(waited.is_ok(), "condition not reached in time");
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn test_reconcile_sequence_into_mirror() {
        let (store, observer) = setup();
        let persons = Path::parse("clubA/persons");
        let mirror = Mirror::<Person>::new();
        let handle = observer.observe_into(&persons, mirror.clone());

        store.set(&persons.child("P1"), json!({ "name": "Ann" }));
        store.set(&persons.child("P2"), json!({ "name": "Bo" }));
        store.set(&persons.child("P1/name"), json!("Ann Renamed"));
        store.remove(&persons.child("P2"));

        eventually(|| mirror.snapshot() == vec![person("P1", "Ann Renamed")]).await;
        assert!(mirror.loaded_at_least_once());
        assert_eq!(handle.health().delivered, 4);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_caller_owned_list() {
        let (store, observer) = setup();
        let path = Path::parse("list");
        store.set(&path.child("b"), json!({ "name": "B" }));

        let list = Arc::new(Mutex::new(Vec::<Person>::new()));
        let target = list.clone();
        let handle = observer.observe_collection(&path, move |step: Reconcile<Person>| {
            step.apply(&mut lock(&target));
        });

        eventually(|| lock(&list).len() == 1).await;
        // The caller sorts however it likes; new records go to the end, changed ones stay put.
        lock(&list).insert(0, person("z", "Z"));
        store.set(&path.child("a"), json!({ "name": "A" }));
        store.set(&path.child("b/name"), json!("B2"));

        eventually(|| {
            *lock(&list) == vec![person("z", "Z"), person("b", "B2"), person("a", "A")]
        })
        .await;
        handle.cancel();
    }

    #[tokio::test]
    async fn test_cancel_before_first_event_suppresses_everything() {
        let (store, observer) = setup();
        let path = Path::parse("clubA/persons");
        store.set(&path.child("P1"), json!({ "name": "Ann" }));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = observer.observe_collection(&path, move |_: Reconcile<Person>| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        // The initial snapshot and this change are already queued.
        store.set(&path.child("P2"), json!({ "name": "Bo" }));
        handle.cancel();

        store.set(&path.child("P3"), json!({ "name": "Cid" }));
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!handle.is_active());
        assert!(handle.health().cancelled);
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_silences_later_events() {
        let (store, observer) = setup();
        let path = Path::parse("counter");

        let seen = Arc::new(Mutex::new(Vec::new()));
        let target = seen.clone();
        let handle = observer.observe_object(&path, move |value: i64| lock(&target).push(value), || {});

        store.set(&path, json!(1));
        eventually(|| *lock(&seen) == vec![1]).await;

        handle.cancel();
        handle.cancel();
        store.set(&path, json!(2));
        settle().await;

        assert_eq!(*lock(&seen), vec![1]);
        assert_eq!(observer.active(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_waits_for_running_callback() {
        let (store, observer) = setup();
        let path = Path::parse("slow");
        let trail = Arc::new(Mutex::new(Vec::new()));
        let (entered, entered_rx) = std::sync::mpsc::channel();

        let target = trail.clone();
        let handle = observer.observe_object(
            &path,
            move |value: u32| {
                let _ = entered.send(());
                std::thread::sleep(Duration::from_millis(50));
                lock(&target).push(format!("callback {value}"));
            },
            || {},
        );
        store.set(&path, json!(1));

        let canceller = handle.clone();
        let target = trail.clone();
        tokio::task::spawn_blocking(move || {
            entered_rx.recv().unwrap();
            canceller.cancel();
            lock(&target).push("cancel returned".to_string());
        })
        .await
        .unwrap();

        store.set(&path, json!(2));
        settle().await;
        assert_eq!(*lock(&trail), vec!["callback 1", "cancel returned"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_from_inside_callback() {
        let (store, observer) = setup();
        let path = Path::parse("once");
        let own_handle: Arc<Mutex<Option<CancelHandle>>> = Arc::new(Mutex::new(None));
        let calls = Arc::new(AtomicUsize::new(0));

        let (slot, counter) = (own_handle.clone(), calls.clone());
        let handle = observer.observe_object(
            &path,
            move |_: u32| {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(handle) = lock(&slot).as_ref() {
                    handle.cancel();
                }
            },
            || {},
        );
        *lock(&own_handle) = Some(handle.clone());

        store.set(&path, json!(1));
        eventually(|| !handle.is_active()).await;
        store.set(&path, json!(2));
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.health().cancelled);
    }

    #[test]
    fn test_observe_outside_runtime_stalls() {
        let (store, observer) = setup();
        let path = Path::parse("counter");
        let handle = observer.observe_object(&path, |_: u32| {}, || {});

        store.set(&path, json!(1));
        assert!(handle.health().stalled);
        assert_eq!(handle.health().delivered, 0);
        handle.cancel();
        assert_eq!(observer.active(), 0);
    }

    #[tokio::test]
    async fn test_observe_object_change_remove_and_wrong_type() {
        let (store, observer) = setup();
        let path = Path::parse("clubA/name");

        let changes = Arc::new(Mutex::new(Vec::new()));
        let removes = Arc::new(AtomicUsize::new(0));
        let (target, removed) = (changes.clone(), removes.clone());
        let handle = observer.observe_object(
            &path,
            move |name: String| lock(&target).push(name),
            move || {
                removed.fetch_add(1, Ordering::SeqCst);
            },
        );

        // Absent at first.
        eventually(|| removes.load(Ordering::SeqCst) == 1).await;

        store.set(&path, json!("value"));
        store.set(&path, json!(true));
        store.set(&path, json!("newValue"));
        store.remove(&path);

        eventually(|| removes.load(Ordering::SeqCst) == 2).await;
        assert_eq!(*lock(&changes), vec!["value".to_string(), "newValue".to_string()]);

        let health = handle.health();
        assert_eq!(health.dropped, 1);
        assert_eq!(health.consecutive_failures, 0);
        assert!(health.synced);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_bad_child_is_dropped_and_subscription_continues() {
        let (store, observer) = setup();
        let path = Path::parse("persons");
        let mirror = Mirror::<Person>::new();
        let handle = observer.observe_into(&path, mirror.clone());

        store.set(&path.child("bad"), json!({ "name": 7 }));
        store.set(&path.child("good"), json!({ "name": "Good" }));

        eventually(|| mirror.snapshot() == vec![person("good", "Good")]).await;
        let health = handle.health();
        assert_eq!(health.dropped, 1);
        assert!(!health.stalled);
        assert!(health.last_failure.is_some());
        handle.cancel();
    }

    #[tokio::test]
    async fn test_collection_becoming_scalar_stalls() {
        let (store, observer) = setup();
        let path = Path::parse("persons");
        store.set(&path.child("P1"), json!({ "name": "Ann" }));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = observer.observe_collection(&path, move |_: Reconcile<Person>| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        eventually(|| calls.load(Ordering::SeqCst) == 1).await;

        store.set(&path, json!("oops"));
        eventually(|| handle.health().stalled).await;
        let after_stall = calls.load(Ordering::SeqCst);

        store.set(&path, json!({}));
        store.set(&path.child("P2"), json!({ "name": "Bo" }));
        settle().await;

        assert_eq!(calls.load(Ordering::SeqCst), after_stall);
        assert!(handle.is_active());
        assert!(!handle.health().is_healthy());
    }

    #[tokio::test]
    async fn test_filter_only_removals() {
        let (store, observer) = setup();
        let path = Path::parse("fines");
        store.set(&path.child("f1"), json!({ "name": "x" }));

        let removed = Arc::new(Mutex::new(Vec::new()));
        let target = removed.clone();
        let handle = observer.observe_collection_filtered(
            &path,
            EventFilter::only(crate::data_model::ChildEventKind::Removed),
            move |step: Reconcile<Person>| lock(&target).push(step),
        );

        store.set(&path.child("f2"), json!({ "name": "y" }));
        store.remove(&path.child("f1"));

        eventually(|| lock(&removed).len() == 1).await;
        settle().await;
        assert_eq!(*lock(&removed), vec![Reconcile::Remove("f1".to_string())]);
        handle.cancel();
    }

    #[tokio::test]
    async fn test_close_cancels_everything() {
        let (store, observer) = setup();
        let calls = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = ["a", "b", "a"]
            .into_iter()
            .map(|key| {
                let counter = calls.clone();
                observer.observe_object(
                    &Path::parse(key),
                    move |_: u32| {
                        counter.fetch_add(1, Ordering::SeqCst);
                    },
                    || {},
                )
            })
            .collect();
        assert_eq!(observer.active(), 3);

        observer.close();
        store.set(&Path::parse("a"), json!(1));
        store.set(&Path::parse("b"), json!(2));
        settle().await;

        assert_eq!(observer.active(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(handles.iter().all(|handle| !handle.is_active()));
        // Cancelling through a handle afterwards is still fine.
        handles[0].cancel();
    }

    #[tokio::test]
    async fn test_independent_subscriptions_on_same_path() {
        let (store, observer) = setup();
        let path = Path::parse("persons");
        let first = Mirror::<Person>::new();
        let second = Mirror::<Person>::new();
        let first_handle = observer.observe_into(&path, first.clone());
        let second_handle = observer.observe_into::<Person>(&path, second.clone());

        store.set(&path.child("P1"), json!({ "name": "Ann" }));
        eventually(|| first.len() == 1 && second.len() == 1).await;

        first_handle.cancel();
        store.set(&path.child("P2"), json!({ "name": "Bo" }));
        eventually(|| second.len() == 2).await;
        assert_eq!(first.len(), 1);
        second_handle.cancel();
    }
}
