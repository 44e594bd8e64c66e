//! Topic router: binds elements to their channels and runs the boot-time
//! state recovery.
//!
//! Each element listens on its command channel for the whole process
//! lifetime. Switches additionally subscribe to their own retained status
//! channel at start-up: the first message seen there is the state published
//! before the restart, and it is applied exactly like a live command. The
//! router then unsubscribes, so later replays of the retained value are
//! never mistaken for commands.
//!
//! An accepted command is followed by retained publication of the element's
//! resulting values, which keeps the broker's copy equal to the last
//! commanded state. A rejected command publishes nothing.

use crate::element::Element;
use crate::error::Result;
use crate::registry::Registry;
use crate::topic;
use crate::transport::{Message, Transport};
use log::{debug, info, warn};
use std::collections::HashMap;

/// Recovery progress of one stateful element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    /// Subscribed to the status channel, waiting for the retained replay.
    AwaitingInitialState,
    /// Recovery finished; the status channel is no longer consumed.
    SteadyState,
}

/// Result of dispatching one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Command accepted, `published` retained values sent.
    Accepted { published: usize },
    /// Command rejected by the element; nothing published.
    Rejected,
    /// Initial state replayed into the element.
    Recovered { accepted: bool },
    /// No handler for the topic, or a replay after recovery finished.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteKind {
    Command,
    Recovery,
}

#[derive(Debug, Clone, Copy)]
struct Route {
    binding: usize,
    kind: RouteKind,
}

#[derive(Debug)]
struct Binding {
    element: usize,
    name: String,
    command_topic: String,
    status_topic: Option<String>,
    recovery: Option<RecoveryState>,
}

#[derive(Debug)]
pub struct Router {
    device_name: String,
    bindings: Vec<Binding>,
    routes: HashMap<String, Route>,
}

impl Router {
    /// Build the channel table from the registry.
    pub fn new(registry: &Registry) -> Self {
        let device_name = registry.device_name().to_string();
        let mut bindings = Vec::new();
        let mut routes = HashMap::new();

        for (index, element) in registry.elements().iter().enumerate() {
            let binding = Binding {
                element: index,
                name: element.name().to_string(),
                command_topic: element.command_topic(&device_name),
                status_topic: element.status_topic(&device_name),
                recovery: element
                    .is_stateful()
                    .then_some(RecoveryState::AwaitingInitialState),
            };

            routes.insert(
                binding.command_topic.clone(),
                Route {
                    binding: bindings.len(),
                    kind: RouteKind::Command,
                },
            );
            if let Some(status_topic) = &binding.status_topic {
                routes.insert(
                    status_topic.clone(),
                    Route {
                        binding: bindings.len(),
                        kind: RouteKind::Recovery,
                    },
                );
            }
            bindings.push(binding);
        }

        Self {
            device_name,
            bindings,
            routes,
        }
    }

    /// Command channels in registry order.
    pub fn command_topics(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|b| b.command_topic.as_str())
    }

    /// Recovery progress of a stateful element, `None` for the rest.
    pub fn recovery_state(&self, name: &str) -> Option<RecoveryState> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .and_then(|b| b.recovery)
    }

    /// Subscribe to every channel the router consumes.
    ///
    /// Called on each broker (re)connection. Recovery subscriptions are only
    /// renewed for elements that have not received their initial state yet.
    pub fn start(&mut self, transport: &mut impl Transport) -> Result<()> {
        info!(
            "[Router] Subscribing {} element(s) of {}",
            self.bindings.len(),
            self.device_name
        );

        let mut first_error = None;
        for binding in &self.bindings {
            if binding.recovery == Some(RecoveryState::AwaitingInitialState)
                && let Some(status_topic) = &binding.status_topic
            {
                debug!("[Router] {} awaiting initial state", binding.name);
                if let Err(e) = transport.subscribe(status_topic) {
                    warn!("[Router] Failed to subscribe to {}: {}", status_topic, e);
                    first_error.get_or_insert(e);
                }
            }
            if let Err(e) = transport.subscribe(&binding.command_topic) {
                warn!(
                    "[Router] Failed to subscribe to {}: {}",
                    binding.command_topic, e
                );
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Route one inbound message to its element.
    pub fn dispatch(
        &mut self,
        registry: &mut Registry,
        message: &Message,
        transport: &mut impl Transport,
    ) -> Dispatch {
        let Some(route) = self.routes.get(&message.topic).copied() else {
            debug!("[Router] No handler for {}", message.topic);
            return Dispatch::Ignored;
        };

        let binding = &mut self.bindings[route.binding];
        let Some(element) = registry.element_mut(binding.element) else {
            warn!("[Router] {} is missing from the registry", binding.name);
            return Dispatch::Ignored;
        };

        match route.kind {
            RouteKind::Recovery => Self::recover(binding, element, message, transport),
            RouteKind::Command => {
                debug!("[Router] {} command: {}", binding.name, message.payload);
                if !element.handle_command(&message.payload) {
                    return Dispatch::Rejected;
                }

                // A live command is newer than anything the broker retained.
                if binding.recovery == Some(RecoveryState::AwaitingInitialState) {
                    Self::finish_recovery(binding, transport);
                }

                let published = Self::publish_state(&self.device_name, element, transport);
                Dispatch::Accepted { published }
            }
        }
    }

    fn recover(
        binding: &mut Binding,
        element: &mut Element,
        message: &Message,
        transport: &mut impl Transport,
    ) -> Dispatch {
        if binding.recovery != Some(RecoveryState::AwaitingInitialState) {
            debug!(
                "[Router] Ignoring replay on {} after recovery",
                message.topic
            );
            return Dispatch::Ignored;
        }

        info!("[Router] {} initial status: {}", binding.name, message.payload);
        let accepted = element.handle_command(&message.payload);
        Self::finish_recovery(binding, transport);
        Dispatch::Recovered { accepted }
    }

    fn finish_recovery(binding: &mut Binding, transport: &mut impl Transport) {
        binding.recovery = Some(RecoveryState::SteadyState);
        if let Some(status_topic) = &binding.status_topic
            && let Err(e) = transport.unsubscribe(status_topic)
        {
            warn!("[Router] Failed to unsubscribe from {}: {}", status_topic, e);
        }
    }

    fn publish_state(device_name: &str, element: &Element, transport: &mut impl Transport) -> usize {
        let mut published = 0;
        for publication in element.publications() {
            let topic = topic::sub_topic(device_name, element.segment(), publication.suffix);
            match transport.publish(&topic, &publication.payload, true) {
                Ok(()) => published += 1,
                Err(e) => warn!("[Router] Failed to publish to {}: {}", topic, e),
            }
        }
        published
    }
}
