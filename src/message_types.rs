use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPlayers {
    pub online: u32,
    pub max: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

/// The fields every server family reports.
///
/// Fields the server left out keep their default (zero or empty) value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusResponse {
    pub players: StatusPlayers,
    pub version: StatusVersion,
    /// Either plain text or, for servers that send a chat component, its JSON.
    pub motd: String,
    pub latency: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JavaPlayer {
    pub name: String,
    pub id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaStatusResponse {
    pub common: StatusResponse,
    pub players_sample: Option<Vec<JavaPlayer>>,
    pub enforces_secure_chat: Option<bool>,
    /// Usually a `data:image/png;base64,...` URI.
    pub icon: Option<String>,
    /// Raw `forgeData` (or legacy `modinfo`) JSON from modded servers.
    pub mod_metadata: Option<String>,
}

/// A status reply from any supported server family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Java(JavaStatusResponse),
}

impl ServerStatus {
    pub fn common(&self) -> &StatusResponse {
        match self {
            ServerStatus::Java(status) => &status.common,
        }
    }

    pub fn into_common(self) -> StatusResponse {
        match self {
            ServerStatus::Java(status) => status.common,
        }
    }
}

impl From<JavaStatusResponse> for ServerStatus {
    fn from(value: JavaStatusResponse) -> Self {
        ServerStatus::Java(value)
    }
}
