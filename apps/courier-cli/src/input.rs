//! Parsing of lines typed at the prompt.

use serde_json::{Map, Value, json};

use courier_protocol::Envelope;
use courier_protocol::constants::{KEY_CONTENT, KEY_RECIPIENT_ID, TYPE_MESSAGE};

/// A line typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Chat text, optionally addressed with `@<id> `.
    Say {
        recipient: Option<u64>,
        content: String,
    },
    /// `/raw <json>`: sent as typed.
    Raw(String),
    Info,
    Connect,
    Disconnect,
    Enable,
    Disable,
    ClearQueue,
    /// `/token <value>`; an empty value logs out.
    Token(String),
    Quit,
    Help,
    Unknown(String),
    Empty,
}

pub const HELP: &str = "\
lines are sent as chat messages; prefix with @<id> to pick a recipient
/info        connection details
/connect     reconnect now
/disconnect  close the socket
/enable      allow connecting
/disable     close and refuse to connect
/clear       drop queued messages
/token <t>   replace the credential (empty logs out)
/raw <json>  send a frame as typed
/quit        exit";

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    if let Some(rest) = line.strip_prefix('/') {
        let (name, arg) = rest.split_once(' ').unwrap_or((rest, ""));
        let arg = arg.trim();
        return match name {
            "info" => Command::Info,
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "enable" => Command::Enable,
            "disable" => Command::Disable,
            "clear" => Command::ClearQueue,
            "token" => Command::Token(arg.to_string()),
            "raw" => Command::Raw(arg.to_string()),
            "quit" | "exit" => Command::Quit,
            "help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        };
    }

    if let Some(rest) = line.strip_prefix('@')
        && let Some((id, content)) = rest.split_once(' ')
        && let Ok(id) = id.parse::<u64>()
    {
        return Command::Say {
            recipient: Some(id),
            content: content.trim().to_string(),
        };
    }

    Command::Say {
        recipient: None,
        content: line.to_string(),
    }
}

/// Builds the chat envelope for typed text.
pub fn chat_message(content: &str, recipient: Option<u64>) -> Envelope {
    let mut data = Map::new();
    data.insert(KEY_CONTENT.into(), Value::String(content.into()));
    if let Some(id) = recipient {
        data.insert(KEY_RECIPIENT_ID.into(), json!(id));
    }
    Envelope::new(TYPE_MESSAGE, data)
}
