//! # Component Identity
//!
//! Every component that takes part in shutdown orchestration is tracked by an
//! [`Identity`]: either one of the closed set of well-known roles, or a name
//! supplied at runtime by a component outside that set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name reported for role codes that do not map to a known role.
pub const UNKNOWN_NAME: &str = "unknown";

/// Well-known component roles of the on-board client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ComponentRole {
    /// Routes inbound application messages.
    MessageController = 1,
    /// Owns the MQTT broker connection.
    MqttClient = 2,
    /// Publishes upload batches over MQTT.
    MqttUploader = 3,
    /// Receives platform notifications.
    NotificationListener = 4,
    /// Schedules and batches uploads.
    UploadController = 5,
    /// In-process message queue.
    MessageQueue = 6,
    /// Handles vehicle MID traffic.
    MidHandler = 7,
    /// Cache storage transport.
    CacheTransport = 8,
    /// Database storage transport.
    DbTransport = 9,
    /// Socket bridge accepting messages from external processes.
    ExternalReceiveBridge = 10,
    /// Process lifecycle controller.
    LifecycleController = 11,
}

impl ComponentRole {
    /// Numeric role code.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Map a numeric role code back to a role.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::all().into_iter().find(|role| role.code() == code)
    }

    /// Static name of the role.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::MessageController => "MessageController",
            Self::MqttClient => "MQTTClient",
            Self::MqttUploader => "MQTTUploader",
            Self::NotificationListener => "NotificationListener",
            Self::UploadController => "UploadController",
            Self::MessageQueue => "MessageQueue",
            Self::MidHandler => "MidHandler",
            Self::CacheTransport => "CacheTransport",
            Self::DbTransport => "DBTransport",
            Self::ExternalReceiveBridge => "ExternalReceiveBridge",
            Self::LifecycleController => "LifecycleController",
        }
    }

    /// Name for a raw role code, or [`UNKNOWN_NAME`] when unmapped.
    #[must_use]
    pub fn name_of_code(code: u8) -> &'static str {
        Self::from_code(code).map_or(UNKNOWN_NAME, Self::name)
    }

    /// All well-known roles.
    #[must_use]
    pub fn all() -> [ComponentRole; 11] {
        [
            Self::MessageController,
            Self::MqttClient,
            Self::MqttUploader,
            Self::NotificationListener,
            Self::UploadController,
            Self::MessageQueue,
            Self::MidHandler,
            Self::CacheTransport,
            Self::DbTransport,
            Self::ExternalReceiveBridge,
            Self::LifecycleController,
        ]
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registry key for a component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Identity {
    /// One of the well-known roles. Subject to stage ordering.
    Fixed(ComponentRole),
    /// A component outside the closed role set. Never staged.
    Named(String),
}

impl Identity {
    /// Create a named identity.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Human-readable name: the role name for `Fixed`, the stored name for `Named`.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Fixed(role) => role.name(),
            Self::Named(name) => name,
        }
    }

    /// The role, for `Fixed` identities.
    #[must_use]
    pub fn role(&self) -> Option<ComponentRole> {
        match self {
            Self::Fixed(role) => Some(*role),
            Self::Named(_) => None,
        }
    }

    #[must_use]
    pub fn is_named(&self) -> bool {
        matches!(self, Self::Named(_))
    }
}

impl From<ComponentRole> for Identity {
    fn from(role: ComponentRole) -> Self {
        Self::Fixed(role)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(role) => write!(f, "{}", role),
            Self::Named(name) => write!(f, "named:{}", name),
        }
    }
}
