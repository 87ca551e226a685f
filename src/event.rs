//! The event value submitted by publishers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Attribute map attached to an event or a registration.
pub type Attributes = BTreeMap<String, Value>;

/// An immutable named event.
///
/// An event is a topic plus an attribute map. Topics are opaque to the bus;
/// by convention they are slash-delimited hierarchical names like
/// `org/example/resource/ADDED`. The bus never mutates an event, it only
/// reads it during dispatch.
///
/// A topic may be absent ([`Event::without_topic`]); such an event is only
/// ever delivered to subscribers registered without a topic filter.
///
/// # Examples
///
/// ```
/// use topicbus::Event;
///
/// let event = Event::new("org/example/resource/ADDED")
///     .with_attribute("path", "/content/site")
///     .with_attribute("recursive", true);
///
/// assert_eq!(event.topic(), Some("org/example/resource/ADDED"));
/// assert_eq!(event.attribute("path").and_then(|v| v.as_str()), Some("/content/site"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    topic: Option<String>,
    attributes: Attributes,
}

impl Event {
    /// Creates an event with the given topic and no attributes.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            attributes: Attributes::new(),
        }
    }

    /// Creates an event with no topic.
    ///
    /// Only filterless subscribers can observe such an event.
    #[must_use]
    pub const fn without_topic() -> Self {
        Self {
            topic: None,
            attributes: Attributes::new(),
        }
    }

    /// Adds a single attribute, replacing any previous value for the key.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Merges a whole attribute map into the event.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes.extend(attributes);
        self
    }

    /// The event topic, if present.
    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Looks up a single attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// All attributes of the event.
    #[must_use]
    pub const fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_topic_and_attributes() {
        let event = Event::new("a/b/C")
            .with_attribute("k", 1i64)
            .with_attribute("k", 2i64)
            .with_attribute("other", "v");

        assert_eq!(event.topic(), Some("a/b/C"));
        assert_eq!(event.attribute("k").and_then(Value::as_int), Some(2));
        assert_eq!(event.attributes().len(), 2);
    }

    #[test]
    fn topicless_event_has_no_topic() {
        let event = Event::without_topic().with_attribute("k", true);
        assert_eq!(event.topic(), None);
        assert_eq!(event.attribute("k").and_then(Value::as_bool), Some(true));
    }
}
