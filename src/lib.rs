//! # topicbus - In-process topic-based event bus
//!
//! Publishers submit named events (a topic string plus an attribute map);
//! subscribers register interest in wildcard topic patterns and receive
//! matching events synchronously (the publisher's thread runs the fan-out)
//! or asynchronously (a worker pool runs it, decoupled from the publisher).
//!
//! ## Core Concepts
//!
//! - **Event**: an immutable topic + attribute map, opaque to the bus
//! - **Subscriber**: anything implementing `handle(&Event)`
//! - **Rank**: priority plus registration order, fixing delivery order
//! - **TopicFilter**: `*`-wildcard patterns compiled at registration time
//!
//! ## Guarantees
//!
//! Within one dispatch, matching subscribers run strictly in ascending rank
//! order and a failing subscriber never affects the others or the publisher.
//! Across dispatches there is no ordering. Asynchronous submission is
//! at-most-once and best-effort: a stopped bus or a full queue drops the
//! event silently.
//!
//! ## Usage
//!
//! ```
//! use std::sync::Arc;
//! use topicbus::{Attributes, BusConfig, Event, EventBus, FnSubscriber, Value};
//! use topicbus::registry::EVENT_TOPICS;
//!
//! let bus = EventBus::new(BusConfig::default());
//! bus.start();
//!
//! let mut props = Attributes::new();
//! props.insert(EVENT_TOPICS.to_string(), Value::from("org/example/*"));
//! let handle = bus
//!     .subscriber_added(
//!         Arc::new(FnSubscriber::new("watcher", |event: &Event| {
//!             let _ = event.topic();
//!         })),
//!         &props,
//!     )
//!     .unwrap();
//!
//! bus.send_event(&Event::new("org/example/resource/ADDED"));
//! bus.post_event(Event::new("org/example/resource/CHANGED"));
//!
//! bus.subscriber_removed(&handle);
//! bus.stop();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod error;
pub mod event;
pub mod registry;
pub mod subscriber;
pub mod topic;
pub mod value;

pub use bus::{BusConfig, BusState, EventBus};
pub use error::{BusError, BusResult};
pub use event::{Attributes, Event};
pub use registry::{Rank, Registration, RegistrationHandle, RegistrationId, SubscriberRegistry};
pub use subscriber::{FnSubscriber, Subscriber};
pub use topic::TopicFilter;
pub use value::Value;
