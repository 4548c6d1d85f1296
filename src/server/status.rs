use crate::error::ProtocolError;
use crate::message_types::{
    JavaPlayer, JavaStatusResponse, StatusPlayers, StatusResponse, StatusVersion,
};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::trace;
use uuid::Uuid;

/// Maps the JSON document of a status reply onto [`JavaStatusResponse`].
///
/// The document is taken as the raw bytes of the reply; anything that is not
/// UTF-8 JSON is rejected as invalid JSON.
///
/// Only the overall shape is enforced: the document and its `players` and
/// `version` members must be objects. Anything else that is missing or of the
/// wrong type is treated as absent.
pub(crate) fn parse_java_status(
    latency: Duration,
    document: &[u8],
) -> Result<JavaStatusResponse, ProtocolError> {
    let root: Value = serde_json::from_slice(document)?;
    let root = root
        .as_object()
        .ok_or(ProtocolError::MalformedStatus("status is not a JSON object"))?;

    let players = member_object(root, "players", "missing or invalid \"players\" object")?;
    let version = member_object(root, "version", "missing or invalid \"version\" object")?;

    let motd = match root.get("description") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let mod_metadata = root
        .get("forgeData")
        .or_else(|| root.get("modinfo"))
        .map(Value::to_string);

    Ok(JavaStatusResponse {
        common: StatusResponse {
            players: StatusPlayers {
                online: u32_member(players, "online"),
                max: u32_member(players, "max"),
            },
            version: StatusVersion {
                name: version
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                protocol: version
                    .get("protocol")
                    .and_then(Value::as_i64)
                    .and_then(|p| i32::try_from(p).ok())
                    .unwrap_or_default(),
            },
            motd,
            latency,
        },
        players_sample: players
            .get("sample")
            .and_then(Value::as_array)
            .map(|sample| parse_sample(sample)),
        enforces_secure_chat: root.get("enforcesSecureChat").and_then(Value::as_bool),
        icon: root.get("favicon").and_then(Value::as_str).map(str::to_string),
        mod_metadata,
    })
}

fn member_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
    missing: &'static str,
) -> Result<&'a Map<String, Value>, ProtocolError> {
    root.get(key)
        .and_then(Value::as_object)
        .ok_or(ProtocolError::MalformedStatus(missing))
}

fn u32_member(object: &Map<String, Value>, key: &str) -> u32 {
    object
        .get(key)
        .and_then(Value::as_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or_default()
}

// Entries without a name or a parseable id are dropped.
fn parse_sample(sample: &[Value]) -> Vec<JavaPlayer> {
    sample
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let id = entry.get("id")?.as_str()?;
            match Uuid::parse_str(id) {
                Ok(id) => Some(JavaPlayer {
                    name: name.to_string(),
                    id,
                }),
                Err(error) => {
                    trace!(name, id, %error, "skipping sample player with invalid id");
                    None
                }
            }
        })
        .collect()
}
