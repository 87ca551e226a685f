//! Event bus: delivery modes, worker pool, and lifecycle.
//!
//! [`EventBus::send_event`] fans an event out to matching subscribers on the
//! calling thread. [`EventBus::post_event`] enqueues one unit of work to a
//! fixed pool of worker threads; the work performs the same snapshot-and-
//! fan-out when it runs. Async submission is best-effort: if the bus is not
//! running or the queue cannot accept the event, the submission is dropped
//! silently (counted, logged at debug).

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::{debug, error, trace};

use crate::error::BusResult;
use crate::event::{Attributes, Event};
use crate::registry::{RegistrationHandle, SubscriberRegistry};
use crate::subscriber::Subscriber;

/// Worker pool configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Number of async delivery worker threads (clamped to at least 1).
    pub worker_threads: usize,
    /// Async queue capacity; `None` means unbounded. A full bounded queue
    /// drops new submissions.
    pub queue_capacity: Option<usize>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            worker_threads: 2,
            queue_capacity: Some(1024),
        }
    }
}

/// Bus lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// No worker pool; async submissions are dropped.
    Stopped,
    /// Worker pool accepting async submissions.
    Running,
    /// Shutting down; queued async deliveries are being abandoned.
    Stopping,
}

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;

struct WorkerPool {
    tx: Sender<Arc<Event>>,
    cancel: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

/// In-process event bus with synchronous and asynchronous delivery.
///
/// The bus is explicitly constructed and explicitly started; there is no
/// process-wide instance. Publishers and the external lifecycle collaborator
/// hold references (or clones of the registry `Arc`) handed out by the
/// owner.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use topicbus::{Attributes, BusConfig, Event, EventBus, FnSubscriber};
///
/// let bus = EventBus::new(BusConfig::default());
/// bus.start();
///
/// let sub = Arc::new(FnSubscriber::new("audit", |event: &Event| {
///     // record the event
///     let _ = event.topic();
/// }));
/// let handle = bus.subscriber_added(sub, &Attributes::new()).unwrap();
///
/// bus.send_event(&Event::new("org/example/ADDED"));
/// bus.subscriber_removed(&handle);
/// bus.stop();
/// ```
pub struct EventBus {
    config: BusConfig,
    registry: Arc<SubscriberRegistry>,
    state: AtomicU8,
    pool: Mutex<Option<WorkerPool>>,
    dropped_posts: AtomicU64,
}

impl EventBus {
    /// Creates a stopped bus with the given configuration.
    #[must_use]
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            registry: Arc::new(SubscriberRegistry::new()),
            state: AtomicU8::new(STATE_STOPPED),
            pool: Mutex::new(None),
            dropped_posts: AtomicU64::new(0),
        }
    }

    /// Starts the worker pool. No-op if already running.
    pub fn start(&self) {
        let mut pool = self.lock_pool();
        if pool.is_some() {
            return;
        }

        let (tx, rx) = match self.config.queue_capacity {
            Some(cap) => bounded::<Arc<Event>>(cap.max(1)),
            None => unbounded::<Arc<Event>>(),
        };
        let cancel = Arc::new(AtomicBool::new(false));

        let workers = self.config.worker_threads.max(1);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = rx.clone();
            let cancel = Arc::clone(&cancel);
            let registry = Arc::clone(&self.registry);
            let handle = thread::Builder::new()
                .name(format!("topicbus-worker-{i}"))
                .spawn(move || worker_loop(&rx, &cancel, &registry))
                .expect("failed to spawn topicbus worker");
            handles.push(handle);
        }

        *pool = Some(WorkerPool {
            tx,
            cancel,
            handles,
        });
        self.state.store(STATE_RUNNING, Ordering::Release);
        debug!(workers, queue_capacity = ?self.config.queue_capacity, "event bus started");
    }

    /// Stops the worker pool: stops accepting async submissions, abandons
    /// queued deliveries, and joins the workers. Synchronous deliveries in
    /// progress on publisher threads are unaffected. No-op if not running.
    pub fn stop(&self) {
        let taken = {
            let mut pool = self.lock_pool();
            let Some(taken) = pool.take() else {
                return;
            };
            self.state.store(STATE_STOPPING, Ordering::Release);
            taken
        };

        // Abandon anything still queued, then disconnect the queue so the
        // workers drain out and exit.
        taken.cancel.store(true, Ordering::Release);
        drop(taken.tx);
        for handle in taken.handles {
            if handle.join().is_err() {
                error!("event bus worker terminated abnormally");
            }
        }

        self.state.store(STATE_STOPPED, Ordering::Release);
        debug!("event bus stopped");
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> BusState {
        match self.state.load(Ordering::Acquire) {
            STATE_RUNNING => BusState::Running,
            STATE_STOPPING => BusState::Stopping,
            _ => BusState::Stopped,
        }
    }

    /// The subscriber registry backing this bus.
    ///
    /// The returned `Arc` may be cloned and handed to the lifecycle
    /// collaborator; a subscriber may also use it to unregister itself from
    /// within its own `handle` without deadlocking.
    #[must_use]
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// Registration entry point for the external lifecycle collaborator.
    ///
    /// Derives the topic filter and the delivery priority from `properties`
    /// (see [`EVENT_TOPICS`](crate::registry::EVENT_TOPICS) and
    /// [`SERVICE_RANKING`](crate::registry::SERVICE_RANKING)). The
    /// registration is visible to every dispatch that snapshots after this
    /// call returns.
    ///
    /// # Errors
    ///
    /// [`crate::BusError::InvalidFilter`] if the filter property is
    /// malformed.
    pub fn subscriber_added(
        &self,
        subscriber: Arc<dyn Subscriber>,
        properties: &Attributes,
    ) -> BusResult<RegistrationHandle> {
        self.registry.register(subscriber, properties)
    }

    /// Removal entry point for the external lifecycle collaborator.
    /// Idempotent.
    pub fn subscriber_removed(&self, handle: &RegistrationHandle) {
        self.registry.unregister(handle);
    }

    /// Delivers `event` synchronously.
    ///
    /// Every matching subscriber is invoked on the calling thread, in
    /// ascending rank order, one at a time; returns only after all of them
    /// completed or failed. A subscriber panic is caught and logged and does
    /// not stop delivery to the remaining subscribers.
    pub fn send_event(&self, event: &Event) {
        distribute(&self.registry, event);
    }

    /// Submits `event` for asynchronous delivery, best-effort.
    ///
    /// Returns immediately. The fan-out (identical to
    /// [`send_event`](EventBus::send_event), including the registry
    /// snapshot) happens later on a worker thread. The submission is dropped
    /// silently when the bus is not running or when a bounded queue is full;
    /// drops are observable only via [`dropped_posts`](EventBus::dropped_posts).
    pub fn post_event(&self, event: Event) {
        let pool = self.lock_pool();
        let accepted = match pool.as_ref() {
            Some(p) if !p.cancel.load(Ordering::Acquire) => {
                match p.tx.try_send(Arc::new(event)) {
                    Ok(()) => true,
                    Err(TrySendError::Full(ev) | TrySendError::Disconnected(ev)) => {
                        debug!(topic = ?ev.topic(), "async queue rejected event, dropping");
                        false
                    }
                }
            }
            _ => {
                debug!("bus not running, dropping posted event");
                false
            }
        };

        if !accepted {
            self.dropped_posts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of async submissions dropped since the bus was created.
    #[must_use]
    pub fn dropped_posts(&self) -> u64 {
        self.dropped_posts.load(Ordering::Relaxed)
    }

    fn lock_pool(&self) -> std::sync::MutexGuard<'_, Option<WorkerPool>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        // Do not join here.
        //
        // A worker may be mid-delivery to an arbitrarily slow subscriber;
        // blocking Drop on it would stall the owner. Disconnecting the queue
        // is enough: the workers exit once it drains.
        if let Some(pool) = self.lock_pool().take() {
            pool.cancel.store(true, Ordering::Release);
            drop(pool.tx);
        }
        self.state.store(STATE_STOPPED, Ordering::Release);
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("registrations", &self.registry.len())
            .finish_non_exhaustive()
    }
}

fn worker_loop(rx: &Receiver<Arc<Event>>, cancel: &AtomicBool, registry: &SubscriberRegistry) {
    while let Ok(event) = rx.recv() {
        if cancel.load(Ordering::Acquire) {
            // Shutting down: drain the queue without delivering.
            continue;
        }
        distribute(registry, &event);
    }
}

/// Snapshot-and-fan-out with per-subscriber fault isolation.
///
/// The registry lock is released before any subscriber runs; registrations
/// added or removed concurrently do not affect this dispatch.
fn distribute(registry: &SubscriberRegistry, event: &Event) {
    for registration in registry.snapshot() {
        if !registration.filter.matches(event.topic()) {
            continue;
        }
        trace!(
            topic = ?event.topic(),
            subscriber = registration.subscriber.name(),
            "delivering event"
        );
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            registration.subscriber.handle(event);
        }));
        if outcome.is_err() {
            error!(
                topic = ?event.topic(),
                subscriber = registration.subscriber.name(),
                "subscriber panicked while handling event"
            );
        }
    }
}
