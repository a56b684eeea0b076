//! Host-side event payloads
//!
//! These are the shapes a host hands to the producer entry points of
//! [`CommandLog`](crate::CommandLog). They are deliberately loose (optional
//! actor, raw interaction kind) because they mirror what the host's
//! dispatch framework can actually resolve at the time of the event.

use serde::{Deserialize, Serialize};

/// A user as the host resolved it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUser {
    pub id: u64,
    pub name: String,
    /// Legacy four-digit tag, rendered as `name#discriminator` when present
    #[serde(default)]
    pub discriminator: Option<String>,
}

impl EventUser {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            discriminator: None,
        }
    }

    pub fn with_discriminator(mut self, discriminator: impl Into<String>) -> Self {
        self.discriminator = Some(discriminator.into());
        self
    }
}

/// An id/name pair for channels, containers and targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPlace {
    pub id: u64,
    pub name: String,
}

impl EventPlace {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A text command that completed or failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandEvent {
    /// `None` when the host could not resolve who ran the command
    pub actor: Option<EventUser>,
    /// Fully qualified command name, e.g. `playlist create`
    pub command_name: String,
    pub message_id: u64,
    #[serde(default)]
    pub channel: Option<EventPlace>,
    #[serde(default)]
    pub container: Option<EventPlace>,
    /// Raw message content, kept only when content logging is enabled
    #[serde(default)]
    pub content: Option<String>,
}

impl CommandEvent {
    pub fn new(actor: EventUser, command_name: impl Into<String>, message_id: u64) -> Self {
        Self {
            actor: Some(actor),
            command_name: command_name.into(),
            message_id,
            channel: None,
            container: None,
            content: None,
        }
    }

    /// Place the event in a channel of a container
    pub fn in_channel(mut self, channel: EventPlace, container: EventPlace) -> Self {
        self.channel = Some(channel);
        self.container = Some(container);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// An application command interaction (slash, user or message command)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppCommandEvent {
    pub actor: Option<EventUser>,
    pub command_name: String,
    /// Wire value of the interaction kind: 1 slash, 2 user, 3 message
    pub interaction_kind: u8,
    #[serde(default)]
    pub target: Option<EventPlace>,
    #[serde(default)]
    pub channel: Option<EventPlace>,
    #[serde(default)]
    pub container: Option<EventPlace>,
}

impl AppCommandEvent {
    pub fn new(actor: EventUser, command_name: impl Into<String>, interaction_kind: u8) -> Self {
        Self {
            actor: Some(actor),
            command_name: command_name.into(),
            interaction_kind,
            target: None,
            channel: None,
            container: None,
        }
    }

    pub fn with_target(mut self, target: EventPlace) -> Self {
        self.target = Some(target);
        self
    }

    pub fn in_channel(mut self, channel: EventPlace, container: EventPlace) -> Self {
        self.channel = Some(channel);
        self.container = Some(container);
        self
    }
}
