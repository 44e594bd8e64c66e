//! In-process broker with retained-message semantics.
//!
//! Subscribing replays the retained value of the topic (if any), retained
//! publishes replace the stored value and an empty retained payload clears
//! it. Delivered messages queue up until [`MemoryBroker::poll`] takes them.

use super::{Message, Transport};
use crate::error::Result;
use std::collections::{HashMap, HashSet, VecDeque};

/// A publish recorded by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Debug, Default)]
pub struct MemoryBroker {
    subscriptions: HashSet<String>,
    retained: HashMap<String, String>,
    inbox: VecDeque<Message>,
    published: Vec<Published>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a retained value as if a previous session had published it.
    pub fn retain(&mut self, topic: &str, payload: &str) {
        self.retained.insert(topic.to_string(), payload.to_string());
    }

    pub fn retained(&self, topic: &str) -> Option<&str> {
        self.retained.get(topic).map(String::as_str)
    }

    pub fn is_subscribed(&self, topic: &str) -> bool {
        self.subscriptions.contains(topic)
    }

    /// Publish from another client: stored if retained, delivered if subscribed.
    pub fn inject(&mut self, topic: &str, payload: &str, retain: bool) {
        self.store(topic, payload, retain);
        self.deliver(topic, payload, false);
    }

    /// Force delivery of a retained replay regardless of subscriptions.
    pub fn replay(&mut self, topic: &str) {
        if let Some(payload) = self.retained.get(topic).cloned() {
            self.inbox.push_back(Message {
                topic: topic.to_string(),
                payload,
                retained: true,
            });
        }
    }

    /// Next message waiting for the node.
    pub fn poll(&mut self) -> Option<Message> {
        self.inbox.pop_front()
    }

    /// Publishes made through the [`Transport`] interface, oldest first.
    pub fn published(&self) -> &[Published] {
        &self.published
    }

    pub fn clear_published(&mut self) {
        self.published.clear();
    }

    fn store(&mut self, topic: &str, payload: &str, retain: bool) {
        if !retain {
            return;
        }
        if payload.is_empty() {
            self.retained.remove(topic);
        } else {
            self.retained.insert(topic.to_string(), payload.to_string());
        }
    }

    fn deliver(&mut self, topic: &str, payload: &str, retained: bool) {
        if self.subscriptions.contains(topic) {
            self.inbox.push_back(Message {
                topic: topic.to_string(),
                payload: payload.to_string(),
                retained,
            });
        }
    }
}

impl Transport for MemoryBroker {
    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.subscriptions.insert(topic.to_string());
        if let Some(payload) = self.retained.get(topic).cloned() {
            self.deliver(topic, &payload, true);
        }
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &str) -> Result<()> {
        self.subscriptions.remove(topic);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<()> {
        self.published.push(Published {
            topic: topic.to_string(),
            payload: payload.to_string(),
            retain,
        });
        self.store(topic, payload, retain);
        self.deliver(topic, payload, false);
        Ok(())
    }
}
