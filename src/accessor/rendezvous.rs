//! Rendezvous channel - blocking request/response handshake for Operations.
//!
//! A bounded channel carries complete Operation values to the worker; each
//! request carries its own oneshot reply slot, so a caller always awaits
//! exactly the response to its own request and concurrent callers never
//! share mutable state. The bound is defensive depth, not a correctness
//! requirement: callers queue safely behind it.

use tokio::sync::{mpsc, oneshot};

use crate::accessor::operation::Operation;

/// Request queue depth. Matches the accessor's historical semaphore bound;
/// with per-request reply slots it is an actual safe queue.
pub const QUEUE_DEPTH: usize = 100;

/// One queued request: the operation plus the slot its outcome returns in.
struct Ticket {
    op: Operation,
    reply: oneshot::Sender<Operation>,
}

/// Caller side of the handshake.
#[derive(Clone)]
pub(crate) struct Submitter {
    tx: mpsc::Sender<Ticket>,
}

/// Worker side of the handshake.
pub(crate) struct Requests {
    rx: mpsc::Receiver<Ticket>,
}

/// Obligation to deliver an outcome for one dequeued request.
pub(crate) struct Completion {
    reply: oneshot::Sender<Operation>,
}

/// Create a connected caller/worker pair.
pub(crate) fn channel() -> (Submitter, Requests) {
    let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
    (Submitter { tx }, Requests { rx })
}

impl Submitter {
    /// Submit an operation and suspend until the worker completes it.
    ///
    /// Returns the same Operation with its outcome fields filled in. No
    /// cancellation or timeout: once queued, the operation runs to
    /// completion. Returns `None` only if the worker task is gone, which
    /// does not happen while any submitter is alive.
    pub(crate) async fn submit(&self, op: Operation) -> Option<Operation> {
        let (reply, response) = oneshot::channel();
        self.tx.send(Ticket { op, reply }).await.ok()?;
        response.await.ok()
    }
}

impl Requests {
    /// Suspend until the next request arrives.
    ///
    /// Returns `None` once every submitter has been dropped, which is the
    /// worker's shutdown signal.
    pub(crate) async fn next(&mut self) -> Option<(Operation, Completion)> {
        let ticket = self.rx.recv().await?;
        Some((ticket.op, Completion { reply: ticket.reply }))
    }
}

impl Completion {
    /// Deliver the completed operation back to its caller.
    ///
    /// A vanished caller is not an error for the worker; the outcome is
    /// simply discarded.
    pub(crate) fn complete(self, op: Operation) {
        let _ = self.reply.send(op);
    }
}
