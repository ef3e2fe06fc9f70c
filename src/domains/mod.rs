//! Domains module containing the server's business logic.
//!
//! - **protocol**: wire messages, framing and validation
//! - **tools**: tool declarations, registry snapshots and hot reload
//! - **dispatch**: routing validated requests and executing tool calls

pub mod dispatch;
pub mod protocol;
pub mod tools;
