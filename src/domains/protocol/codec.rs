//! Frame codec shared by the server and the client.
//!
//! A frame is one line of UTF-8 JSON terminated by `\n`. Lines longer than
//! the configured limit, and lines that are not valid UTF-8, are transport
//! errors: the stream cannot be resynchronized reliably after either.

use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec, LinesCodecError};

use super::message::Message;

/// Default upper bound for a single frame, in bytes.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// A TCP stream split into JSON-line frames.
pub type MessageFramed = Framed<TcpStream, LinesCodec>;

/// Wrap a stream in the line codec.
pub fn framed(stream: TcpStream, max_frame_bytes: usize) -> MessageFramed {
    Framed::new(stream, LinesCodec::new_with_max_length(max_frame_bytes))
}

/// Serialize a message into a single frame (without the trailing newline).
pub fn encode(message: &Message) -> serde_json::Result<String> {
    serde_json::to_string(message)
}

/// Human-readable reason for a framing failure.
pub fn describe_frame_error(err: &LinesCodecError) -> String {
    match err {
        LinesCodecError::MaxLineLengthExceeded => "Frame exceeds maximum length".to_string(),
        LinesCodecError::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            "Frame is not valid UTF-8".to_string()
        }
        LinesCodecError::Io(e) => format!("Transport error: {}", e),
    }
}
