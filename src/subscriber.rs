//! The subscriber seam.

use std::fmt;

use crate::event::Event;

/// A consumer of events.
///
/// Implementations must be `Send + Sync`: the same subscriber may be invoked
/// from publisher threads (synchronous delivery) and from bus workers
/// (asynchronous delivery). Invocations within a single dispatch are
/// sequential; invocations from separate dispatches may be concurrent.
///
/// A panic raised by [`handle`](Subscriber::handle) is caught by the bus,
/// logged, and never affects other subscribers or the publisher.
pub trait Subscriber: Send + Sync {
    /// Handles one event. The event is shared and must not be assumed to
    /// outlive the call.
    fn handle(&self, event: &Event);

    /// Name used in delivery logs.
    fn name(&self) -> &str {
        "subscriber"
    }
}

/// Adapts a closure to [`Subscriber`].
///
/// ```
/// use topicbus::{Event, FnSubscriber, Subscriber};
///
/// let printer = FnSubscriber::new("printer", |event: &Event| {
///     println!("got {:?}", event.topic());
/// });
/// printer.handle(&Event::new("a/b"));
/// ```
pub struct FnSubscriber<F> {
    name: String,
    handler: F,
}

impl<F> FnSubscriber<F>
where
    F: Fn(&Event) + Send + Sync,
{
    /// Wraps `handler` under the given log name.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&Event) + Send + Sync,
{
    fn handle(&self, event: &Event) {
        (self.handler)(event);
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl<F> fmt::Debug for FnSubscriber<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSubscriber")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
