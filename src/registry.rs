//! Subscriber registrations and the ordered registry.
//!
//! The registry is the only mutable shared state in the bus. Structural
//! mutation (register/unregister) and snapshotting each take the lock only
//! for the duration of the map operation; subscriber code is never invoked
//! while the lock is held, so a slow or reentrant subscriber (one that
//! registers or unregisters during its own handling) cannot deadlock the bus.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{self, AtomicU64};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BusError, BusResult};
use crate::event::Attributes;
use crate::subscriber::Subscriber;
use crate::topic::TopicFilter;
use crate::value::Value;

/// Registration property key holding the topic filter (absent, a string, or
/// a sequence of strings).
pub const EVENT_TOPICS: &str = "event.topics";

/// Registration property key holding the integer delivery priority; higher
/// priorities are delivered earlier. Absent or non-integer values count as 0.
pub const SERVICE_RANKING: &str = "service.ranking";

/// Unique identifier for a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistrationId(Uuid);

impl RegistrationId {
    /// Creates a new random registration ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RegistrationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Totally-ordered delivery rank.
///
/// Ranks order ascending by *delivery position*: higher priority sorts
/// first, and among equal priorities the earlier registration (lower
/// sequence number) sorts first. The sequence number makes ranks minted by
/// one registry unique, so rank order is a total order over registrations.
///
/// Rank only determines delivery order among subscribers matching the same
/// event; it has no effect on which subscribers match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rank {
    /// Delivery priority; higher delivers earlier.
    pub priority: i64,
    /// Registration sequence number; lower (earlier) wins priority ties.
    pub seq: u64,
}

impl Ord for Rank {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for Rank {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// One registered subscriber together with its filter and rank.
pub struct Registration {
    /// Opaque identity of this registration.
    pub id: RegistrationId,
    /// Delivery rank.
    pub rank: Rank,
    /// The subscriber itself.
    pub subscriber: Arc<dyn Subscriber>,
    /// Compiled topic filter.
    pub filter: TopicFilter,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("id", &self.id)
            .field("rank", &self.rank)
            .field("subscriber", &self.subscriber.name())
            .field("filter", &self.filter)
            .finish()
    }
}

/// Caller-facing token identifying a registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationHandle {
    /// Identity of the registration.
    pub id: RegistrationId,
    /// Rank the registration was inserted under.
    pub rank: Rank,
}

/// Thread-safe ordered collection of registrations, keyed by rank.
///
/// Iteration (via [`snapshot`](SubscriberRegistry::snapshot)) is always in
/// ascending rank order, i.e. delivery order.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    entries: Mutex<BTreeMap<Rank, Arc<Registration>>>,
    next_seq: AtomicU64,
}

impl SubscriberRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber from a lifecycle property map.
    ///
    /// The topic filter is read from [`EVENT_TOPICS`] and the priority from
    /// [`SERVICE_RANKING`]; a fresh rank is minted, so this cannot collide.
    ///
    /// # Errors
    ///
    /// [`BusError::InvalidFilter`] if the filter property is malformed; the
    /// registration does not take effect.
    pub fn register(
        &self,
        subscriber: Arc<dyn Subscriber>,
        properties: &Attributes,
    ) -> BusResult<RegistrationHandle> {
        let filter = TopicFilter::from_property(properties.get(EVENT_TOPICS))?;
        let priority = properties
            .get(SERVICE_RANKING)
            .and_then(Value::as_int)
            .unwrap_or(0);

        let rank = Rank {
            priority,
            seq: self.next_seq.fetch_add(1, atomic::Ordering::Relaxed),
        };
        self.register_with_rank(subscriber, rank, filter)
    }

    /// Registers a subscriber under an explicit rank.
    ///
    /// # Errors
    ///
    /// [`BusError::DuplicateRank`] if the rank is already occupied. Ranks
    /// minted by [`register`](SubscriberRegistry::register) never collide;
    /// a collision here is a defect in the caller's rank construction.
    pub fn register_with_rank(
        &self,
        subscriber: Arc<dyn Subscriber>,
        rank: Rank,
        filter: TopicFilter,
    ) -> BusResult<RegistrationHandle> {
        let registration = Arc::new(Registration {
            id: RegistrationId::new(),
            rank,
            subscriber,
            filter,
        });
        let handle = RegistrationHandle {
            id: registration.id,
            rank,
        };

        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.contains_key(&rank) {
            return Err(BusError::DuplicateRank {
                priority: rank.priority,
                seq: rank.seq,
            });
        }
        entries.insert(rank, registration);
        Ok(handle)
    }

    /// Removes a registration. Idempotent: removing an already-removed
    /// registration is a no-op, and a stale handle whose rank has been
    /// reoccupied by a different registration removes nothing.
    pub fn unregister(&self, handle: &RegistrationHandle) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if entries.get(&handle.rank).is_some_and(|r| r.id == handle.id) {
            entries.remove(&handle.rank);
        }
    }

    /// Point-in-time copy of all registrations in ascending rank order.
    ///
    /// The lock is held only while copying; iterating the snapshot (and
    /// invoking subscribers against it) is lock-free, and concurrent
    /// mutation does not affect an already-taken snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Registration>> {
        let entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.values().cloned().collect()
    }

    /// Number of current registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriber::FnSubscriber;

    fn noop(name: &str) -> Arc<dyn Subscriber> {
        Arc::new(FnSubscriber::new(name, |_| {}))
    }

    fn props(ranking: Option<i64>) -> Attributes {
        let mut p = Attributes::new();
        if let Some(r) = ranking {
            p.insert(SERVICE_RANKING.to_string(), Value::Int(r));
        }
        p
    }

    #[test]
    fn rank_orders_by_priority_then_registration_order() {
        let high = Rank { priority: 10, seq: 5 };
        let low = Rank { priority: -3, seq: 0 };
        let early = Rank { priority: 0, seq: 1 };
        let late = Rank { priority: 0, seq: 2 };

        assert!(high < early);
        assert!(early < late);
        assert!(late < low);
    }

    #[test]
    fn snapshot_is_in_delivery_order() {
        let registry = SubscriberRegistry::new();
        registry.register(noop("c"), &props(Some(-1))).unwrap();
        registry.register(noop("a"), &props(Some(5))).unwrap();
        registry.register(noop("b"), &props(None)).unwrap();

        let names: Vec<_> = registry
            .snapshot()
            .iter()
            .map(|r| r.subscriber.name().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn equal_priorities_deliver_in_registration_order() {
        let registry = SubscriberRegistry::new();
        registry.register(noop("first"), &props(Some(3))).unwrap();
        registry.register(noop("second"), &props(Some(3))).unwrap();

        let names: Vec<_> = registry
            .snapshot()
            .iter()
            .map(|r| r.subscriber.name().to_string())
            .collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn explicit_rank_collision_is_an_error() {
        let registry = SubscriberRegistry::new();
        let rank = Rank { priority: 1, seq: 7 };
        registry
            .register_with_rank(noop("a"), rank, TopicFilter::match_all())
            .unwrap();
        let err = registry
            .register_with_rank(noop("b"), rank, TopicFilter::match_all())
            .unwrap_err();
        assert!(matches!(err, BusError::DuplicateRank { priority: 1, seq: 7 }));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_is_idempotent_and_targeted() {
        let registry = SubscriberRegistry::new();
        let a = registry.register(noop("a"), &props(None)).unwrap();
        let b = registry.register(noop("b"), &props(None)).unwrap();

        registry.unregister(&a);
        registry.unregister(&a);
        assert_eq!(registry.len(), 1);

        // A stale handle with b's rank but a different id removes nothing.
        let stale = RegistrationHandle {
            id: RegistrationId::new(),
            rank: b.rank,
        };
        registry.unregister(&stale);
        assert_eq!(registry.len(), 1);

        registry.unregister(&b);
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_unaffected_by_later_mutation() {
        let registry = SubscriberRegistry::new();
        let a = registry.register(noop("a"), &props(None)).unwrap();

        let snapshot = registry.snapshot();
        registry.unregister(&a);
        registry.register(noop("b"), &props(None)).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].subscriber.name(), "a");
    }

    #[test]
    fn invalid_filter_property_fails_registration() {
        let registry = SubscriberRegistry::new();
        let mut p = Attributes::new();
        p.insert(EVENT_TOPICS.to_string(), Value::Bool(true));

        let err = registry.register(noop("a"), &p).unwrap_err();
        assert!(matches!(err, BusError::InvalidFilter { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn non_integer_ranking_defaults_to_zero() {
        let registry = SubscriberRegistry::new();
        let mut p = Attributes::new();
        p.insert(SERVICE_RANKING.to_string(), Value::from("high"));

        let handle = registry.register(noop("a"), &p).unwrap();
        assert_eq!(handle.rank.priority, 0);
    }
}
