//! Logged command records
//!
//! A [`LogRecord`] is one immutable logged event. The three kinds share
//! the same identity fields and differ only in their [`RecordKind`]
//! payload. Every record has two renderings:
//!
//! - [`LogRecord::render`]: the full one-line summary, used for the host
//!   log, operator reports and sink pages
//! - [`LogRecord::safe_summary`]: a redacted marker with no identifying
//!   data, the only form allowed to reach error telemetry
//!
//! `Debug` is implemented in terms of `safe_summary` so a record that ends
//! up in an error chain or a `{:?}` never leaks actor data.

use std::fmt;
use std::mem::size_of;

use chrono::{DateTime, Local, Timelike};

use crate::error::{CmdLogError, CmdLogResult};
use crate::event::{AppCommandEvent, CommandEvent, EventPlace, EventUser};

/// Local rendering format for record and report timestamps
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Who ran the command
#[derive(Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub display_name: String,
}

impl Actor {
    fn from_event(user: &EventUser) -> Self {
        let display_name = match &user.discriminator {
            Some(tag) => format!("{}#{}", user.name, tag),
            None => user.name.clone(),
        };
        Self {
            id: user.id,
            display_name,
        }
    }
}

/// An id/name pair (channel, container or target)
#[derive(Clone, PartialEq, Eq)]
pub struct Named {
    pub id: u64,
    pub name: String,
}

impl From<&EventPlace> for Named {
    fn from(place: &EventPlace) -> Self {
        Self {
            id: place.id,
            name: place.name.clone(),
        }
    }
}

/// Where a command ran; absent for private, containerless contexts
#[derive(Clone, PartialEq, Eq)]
pub struct Origin {
    pub channel: Named,
    pub container: Named,
}

impl Origin {
    fn from_parts(channel: Option<&EventPlace>, container: Option<&EventPlace>) -> Option<Self> {
        match (channel, container) {
            (Some(channel), Some(container)) => Some(Self {
                channel: channel.into(),
                container: container.into(),
            }),
            _ => None,
        }
    }
}

/// Application command interaction kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InteractionKind {
    Slash = 1,
    UserTarget = 2,
    MessageTarget = 3,
}

impl TryFrom<u8> for InteractionKind {
    type Error = CmdLogError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Slash),
            2 => Ok(Self::UserTarget),
            3 => Ok(Self::MessageTarget),
            other => Err(CmdLogError::MalformedEvent(format!(
                "unknown interaction kind {}",
                other
            ))),
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slash => write!(f, "Slash"),
            Self::UserTarget => write!(f, "UserTarget"),
            Self::MessageTarget => write!(f, "MessageTarget"),
        }
    }
}

/// An application command together with its (kind-dependent) target
#[derive(Clone, PartialEq, Eq)]
pub enum AppInteraction {
    Slash,
    UserTarget { target: Named },
    MessageTarget { target: Named },
}

impl AppInteraction {
    pub fn kind(&self) -> InteractionKind {
        match self {
            Self::Slash => InteractionKind::Slash,
            Self::UserTarget { .. } => InteractionKind::UserTarget,
            Self::MessageTarget { .. } => InteractionKind::MessageTarget,
        }
    }

    pub fn target(&self) -> Option<&Named> {
        match self {
            Self::Slash => None,
            Self::UserTarget { target } | Self::MessageTarget { target } => Some(target),
        }
    }

    fn build(kind: InteractionKind, target: Option<&EventPlace>) -> CmdLogResult<Self> {
        match (kind, target) {
            (InteractionKind::Slash, _) => Ok(Self::Slash),
            (InteractionKind::UserTarget, Some(t)) => Ok(Self::UserTarget { target: t.into() }),
            (InteractionKind::MessageTarget, Some(t)) => {
                Ok(Self::MessageTarget { target: t.into() })
            }
            (kind, None) => Err(CmdLogError::MalformedEvent(format!(
                "{} interaction without a target",
                kind
            ))),
        }
    }
}

/// Kind-specific payload of a record
#[derive(Clone, PartialEq, Eq)]
pub enum RecordKind {
    Command { message_id: u64 },
    CommandError { message_id: u64 },
    AppCommand(AppInteraction),
}

impl RecordKind {
    /// Short kind label, safe for telemetry
    pub fn label(&self) -> &'static str {
        match self {
            Self::Command { .. } => "Command",
            Self::CommandError { .. } => "CommandError",
            Self::AppCommand(_) => "AppCommand",
        }
    }
}

/// One logged command event
#[derive(Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub actor: Actor,
    pub command_name: String,
    /// Local time, truncated to whole seconds
    pub recorded_at: DateTime<Local>,
    pub content: Option<String>,
    pub origin: Option<Origin>,
    pub kind: RecordKind,
}

impl LogRecord {
    /// Build a record for a completed text command
    ///
    /// Returns `None` when the actor could not be resolved.
    pub fn command(event: &CommandEvent, log_content: bool) -> Option<Self> {
        Self::text(event, log_content, RecordKind::Command {
            message_id: event.message_id,
        })
    }

    /// Build a record for a text command that raised an error
    ///
    /// Returns `None` when the actor could not be resolved.
    pub fn command_error(event: &CommandEvent, log_content: bool) -> Option<Self> {
        Self::text(event, log_content, RecordKind::CommandError {
            message_id: event.message_id,
        })
    }

    /// Build a record for an application command
    ///
    /// Returns `Ok(None)` when the actor could not be resolved, and an
    /// error when the interaction kind is unknown or a targeted
    /// interaction carries no target.
    pub fn app_command(event: &AppCommandEvent) -> CmdLogResult<Option<Self>> {
        let Some(actor) = event.actor.as_ref() else {
            return Ok(None);
        };

        let kind = InteractionKind::try_from(event.interaction_kind)?;
        let interaction = AppInteraction::build(kind, event.target.as_ref())?;

        Ok(Some(Self {
            actor: Actor::from_event(actor),
            command_name: event.command_name.clone(),
            recorded_at: now_seconds(),
            content: None,
            origin: Origin::from_parts(event.channel.as_ref(), event.container.as_ref()),
            kind: RecordKind::AppCommand(interaction),
        }))
    }

    fn text(event: &CommandEvent, log_content: bool, kind: RecordKind) -> Option<Self> {
        let actor = event.actor.as_ref()?;
        let content = if log_content { event.content.clone() } else { None };

        Some(Self {
            actor: Actor::from_event(actor),
            command_name: event.command_name.clone(),
            recorded_at: now_seconds(),
            content,
            origin: Origin::from_parts(event.channel.as_ref(), event.container.as_ref()),
            kind,
        })
    }

    /// Replace the recording time
    pub fn with_recorded_at(mut self, at: DateTime<Local>) -> Self {
        self.recorded_at = at.with_nanosecond(0).unwrap_or(at);
        self
    }

    /// Id of the container the command ran in, if any
    pub fn container_id(&self) -> Option<u64> {
        self.origin.as_ref().map(|o| o.container.id)
    }

    /// `recorded_at` in [`TIME_FORMAT`]
    pub fn timestamp(&self) -> String {
        self.recorded_at.format(TIME_FORMAT).to_string()
    }

    /// Full one-line human readable summary
    pub fn render(&self) -> String {
        let by = format!("{} ({})", self.actor.id, self.actor.display_name);

        let head = match &self.kind {
            RecordKind::Command { .. } => {
                format!("Text command '{}' ran by {}", self.shown_command(), by)
            }
            RecordKind::CommandError { .. } => format!(
                "Text command '{}' raised an error by {}",
                self.shown_command(),
                by
            ),
            RecordKind::AppCommand(AppInteraction::Slash) => {
                format!("Slash command '{}' ran by {}", self.command_name, by)
            }
            RecordKind::AppCommand(AppInteraction::UserTarget { target }) => format!(
                "User command '{}' ran by {} targeting user {} ({})",
                self.command_name, by, target.name, target.id
            ),
            RecordKind::AppCommand(AppInteraction::MessageTarget { target }) => format!(
                "Message command '{}' ran by {} targeting message {}",
                self.command_name, by, target.id
            ),
        };

        let Some(origin) = &self.origin else {
            return format!("{} in our DMs.", head);
        };

        let message = match &self.kind {
            RecordKind::Command { message_id } | RecordKind::CommandError { message_id } => {
                format!(" with message ID {}", message_id)
            }
            RecordKind::AppCommand(_) => String::new(),
        };

        format!(
            "{}{} in channel {} (#{}) in guild {} ({})",
            head,
            message,
            origin.channel.id,
            origin.channel.name,
            origin.container.id,
            origin.container.name
        )
    }

    /// Redacted summary for error telemetry
    pub fn safe_summary(&self) -> String {
        match &self.kind {
            RecordKind::AppCommand(interaction) => format!(
                "<AppCommand with data removed kind={}>",
                interaction.kind()
            ),
            kind => format!("<{} with data removed>", kind.label()),
        }
    }

    /// Approximate in-memory footprint in bytes
    ///
    /// Inline size plus string payloads; allocator overhead is ignored.
    pub fn estimated_size(&self) -> usize {
        let named = |n: &Named| n.name.len();

        let mut size = size_of::<Self>()
            + self.actor.display_name.len()
            + self.command_name.len()
            + self.content.as_ref().map_or(0, String::len);

        if let Some(origin) = &self.origin {
            size += named(&origin.channel) + named(&origin.container);
        }
        if let RecordKind::AppCommand(interaction) = &self.kind {
            size += interaction.target().map_or(0, named);
        }
        size
    }

    /// Content if captured, otherwise the command name
    fn shown_command(&self) -> &str {
        self.content.as_deref().unwrap_or(&self.command_name)
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.safe_summary())
    }
}

fn now_seconds() -> DateTime<Local> {
    let now = Local::now();
    now.with_nanosecond(0).unwrap_or(now)
}
