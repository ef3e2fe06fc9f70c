//! Per-connection request handling.
//!
//! Each connection runs a read loop, one writer task and a set of in-flight
//! executions. Every outbound frame goes through the writer's queue, so
//! responses from concurrent calls never interleave on the socket; they are
//! written in completion order, not request order.

use std::net::SocketAddr;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::TransportError;
use crate::domains::dispatch::{Dispatcher, Routed};
use crate::domains::protocol::codec::{self, MessageFramed};
use crate::domains::protocol::{ErrorCode, Message};

/// Item on a connection's outbound queue.
#[derive(Debug)]
enum Outbound {
    Frame(Message),
    /// Flush and close the write half.
    Close,
}

/// Why the read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    /// The server is shutting down: finish in-flight calls first.
    Shutdown,
    /// The peer went away: in-flight results have nowhere to go.
    PeerClosed,
    /// A framing or transport failure.
    Failed,
}

/// Serve one accepted connection until it closes or the server shuts down.
#[instrument(name = "connection", skip_all, fields(peer = %peer))]
pub async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    dispatcher: Dispatcher,
    max_frame_bytes: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let (sink, mut frames) = codec::framed(stream, max_frame_bytes).split();
    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_loop(sink, rx, peer));
    let mut in_flight = JoinSet::new();

    let ending = loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break Ending::Shutdown,
            Some(done) = in_flight.join_next(), if !in_flight.is_empty() => reap(done),
            frame = frames.next() => match frame {
                None => break Ending::PeerClosed,
                Some(Err(e)) => {
                    let err = TransportError::from(e);
                    warn!("Closing connection: {}", err);
                    let notice = Message::failure(Uuid::nil().to_string(), ErrorCode::ConnectionError, err.to_string());
                    let _ = tx.send(Outbound::Frame(notice));
                    break Ending::Failed;
                }
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match dispatcher.accept(&line) {
                        Routed::Reply(reply) => {
                            let _ = tx.send(Outbound::Frame(reply));
                        }
                        Routed::Execute(execution) => {
                            let dispatcher = dispatcher.clone();
                            let tx = tx.clone();
                            in_flight.spawn(async move {
                                let response = dispatcher.execute(execution).await;
                                let _ = tx.send(Outbound::Frame(response));
                            });
                        }
                    }
                }
            },
        }
    };

    match ending {
        Ending::Shutdown => {
            debug!("Draining {} in-flight calls", in_flight.len());
            while let Some(done) = in_flight.join_next().await {
                reap(done);
            }
        }
        Ending::PeerClosed | Ending::Failed => {
            if !in_flight.is_empty() {
                debug!("Detaching {} in-flight calls", in_flight.len());
            }
            in_flight.detach_all();
        }
    }

    let _ = tx.send(Outbound::Close);
    drop(tx);
    if let Err(e) = writer.await {
        error!("Writer task failed: {}", e);
    }
    info!("Connection closed ({:?})", ending);
}

fn reap(done: Result<(), JoinError>) {
    if let Err(e) = done {
        error!("In-flight call task failed: {}", e);
    }
}

/// Drain the outbound queue onto the socket.
async fn write_loop(
    mut sink: SplitSink<MessageFramed, String>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    peer: SocketAddr,
) {
    while let Some(outbound) = rx.recv().await {
        let message = match outbound {
            Outbound::Frame(message) => message,
            Outbound::Close => break,
        };
        let frame = match codec::encode(&message) {
            Ok(frame) => frame,
            Err(e) => {
                error!("Dropping unencodable response: {}", e);
                continue;
            }
        };
        if let Err(e) = sink.send(frame).await {
            warn!("Failed to write to {}: {}", peer, e);
            return;
        }
    }

    if let Err(e) = sink.close().await {
        debug!("Error closing connection to {}: {}", peer, e);
    }
}
