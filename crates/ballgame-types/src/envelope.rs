//! The message envelope carried on the `ballgame` topic.

use chrono::Utc;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};

use crate::ids::PlayerId;
use crate::leaderboard::{AggregatedScores, LeaderboardSnapshot};

/// Dot-namespaced tag identifying what an [`Envelope`] carries.
///
/// Unknown tags are preserved in [`MessageType::Other`] rather than
/// rejected: the topic is shared, and new client event kinds must not
/// break the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageType {
    /// A player scored a point (`single.score`).
    SingleScore,
    /// A player joined the game (`single.new-player`).
    SingleNewPlayer,
    /// A ball was thrown to another player (`ball`).
    Ball,
    /// The periodic leaderboard broadcast (`aggregated.scores`).
    AggregatedScores,
    /// Any other tag.
    Other(String),
}

impl MessageType {
    /// The wire string for this tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::SingleScore => "single.score",
            Self::SingleNewPlayer => "single.new-player",
            Self::Ball => "ball",
            Self::AggregatedScores => "aggregated.scores",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "single.score" => Self::SingleScore,
            "single.new-player" => Self::SingleNewPlayer,
            "ball" => Self::Ball,
            "aggregated.scores" => Self::AggregatedScores,
            _ => Self::Other(tag),
        }
    }
}

impl From<MessageType> for String {
    fn from(kind: MessageType) -> Self {
        match kind {
            MessageType::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message on the `ballgame` topic.
///
/// Only `type` is mandatory. `name` is the originating player for player
/// events and absent on broadcasts. `value` is opaque to everything except
/// the consumer of that particular message type.
///
/// Decoding accepts JSON objects only; an array in field order is rejected
/// even though it would line up with the fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    /// Event tag.
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Originating player, if any. Kept raw so that blank names can be
    /// reported as a classification problem rather than a decode failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Event-specific payload.
    pub value: Value,
    /// Client-side timestamp, free-form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Field layout of an envelope object on the wire.
#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "type")]
    kind: MessageType,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default, alias = "timestamp")]
    ts: Option<String>,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let object = Map::<String, Value>::deserialize(deserializer)?;
        let wire = WireEnvelope::deserialize(Value::Object(object)).map_err(D::Error::custom)?;
        Ok(Self {
            kind: wire.kind,
            name: wire.name,
            value: wire.value,
            ts: wire.ts,
        })
    }
}

impl Envelope {
    /// A `single.score` event for `player`, stamped with the current time.
    pub fn scored(player: &PlayerId) -> Self {
        Self::player_event(MessageType::SingleScore, player)
    }

    /// A `single.new-player` event for `player`, stamped with the current time.
    pub fn new_player(player: &PlayerId) -> Self {
        Self::player_event(MessageType::SingleNewPlayer, player)
    }

    /// The `aggregated.scores` broadcast carrying `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the snapshot cannot be converted to
    /// a JSON value.
    pub fn aggregated(snapshot: LeaderboardSnapshot) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(AggregatedScores { scores: snapshot })?;
        Ok(Self {
            kind: MessageType::AggregatedScores,
            name: None,
            value,
            ts: None,
        })
    }

    fn player_event(kind: MessageType, player: &PlayerId) -> Self {
        Self {
            kind,
            name: Some(player.as_str().to_owned()),
            value: json!({ "player": player.as_str() }),
            ts: Some(Utc::now().to_rfc2822()),
        }
    }
}
