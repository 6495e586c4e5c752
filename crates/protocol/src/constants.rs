/// Well-known path of the message socket on the server.
pub const WS_PATH: &str = "/api/v1/messages/ws";

/// Host used instead of the page origin when running against a local
/// development server.
pub const WS_DEV_HOST: &str = "localhost:8080";

/// Query parameter carrying the bearer credential.
pub const WS_TOKEN_PARAM: &str = "token";

/// Maximum message size in bytes (matches the server's 512 KB read limit).
pub const WS_MAX_MESSAGE_SIZE: usize = 512 * 1024;

/// Normal closure.
pub const WS_CLOSE_NORMAL: u16 = 1000;

/// Endpoint going away (server shutdown, page navigation).
pub const WS_CLOSE_GOING_AWAY: u16 = 1001;

/// Close frame without a status code.
pub const WS_CLOSE_NO_STATUS: u16 = 1005;

/// Reported when the connection dropped without a close frame.
pub const WS_CLOSE_ABNORMAL: u16 = 1006;

/// Used by the client when its health check finds a stale socket.
pub const WS_CLOSE_HEALTH_CHECK: u16 = 4000;

/// Envelope type for chat messages and wrapped legacy payloads.
pub const TYPE_MESSAGE: &str = "message";

/// Envelope type for frames that are not JSON objects.
pub const TYPE_RAW: &str = "raw";

pub const KEY_TYPE: &str = "type";
pub const KEY_DATA: &str = "data";
pub const KEY_CONTENT: &str = "content";
pub const KEY_SENDER_ID: &str = "senderId";
pub const KEY_RECIPIENT_ID: &str = "recipientId";
pub const KEY_TIMESTAMP: &str = "timestamp";

/// Legacy flat fields and the canonical `data` key each one is mirrored to.
///
/// Order matters: `receiver_id` wins over `receiverId` when both are present.
pub const LEGACY_FIELDS: [(&str, &str); 4] = [
    ("sender_id", KEY_SENDER_ID),
    ("receiver_id", KEY_RECIPIENT_ID),
    ("receiverId", KEY_RECIPIENT_ID),
    ("content", KEY_CONTENT),
];

/// Returns `true` for close codes that mean "closed on purpose".
///
/// A closure with one of these codes never triggers a reconnect.
pub fn is_normal_closure(code: u16) -> bool {
    code == WS_CLOSE_NORMAL || code == WS_CLOSE_GOING_AWAY
}
