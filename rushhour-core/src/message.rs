//! Transport wire format.
//!
//! ```text
//! inbound   {"cars": {"red": [[0, 0], [0, 1]], "7": [[2, 3], [3, 3]]}}
//! outbound  {"event": "connected"}
//! ```

use serde::{Deserialize, Serialize};

use crate::Configuration;

/// One observed board change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub cars: Configuration,
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<InboundMessage, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Messages sent to the board feed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Sent once when the feed connects.
    Connected,
}

impl OutboundMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ConfigurationDocument {
    Message(InboundMessage),
    Bare(Configuration),
}

/// Parse a configuration given either bare or wrapped in an inbound message.
pub fn parse_configuration(text: &str) -> Result<Configuration, serde_json::Error> {
    let document: ConfigurationDocument = serde_json::from_str(text)?;
    Ok(match document {
        ConfigurationDocument::Message(message) => message.cars,
        ConfigurationDocument::Bare(config) => config,
    })
}
