//! Protocol domain module.
//!
//! Defines the message envelope exchanged over a connection, the line codec
//! used to frame it, and the validator that turns raw frames into requests.

pub mod codec;
pub mod message;
mod validator;

pub use codec::{DEFAULT_MAX_FRAME_BYTES, MessageFramed};
pub use message::{
    ErrorBody, ErrorCode, Header, Message, QueryBody, Request, RequestBody, Status,
    ToolCallBody, ToolCallResult, ToolList,
};
pub use validator::validate;
