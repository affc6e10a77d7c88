use crate::payload::CallReply;
use crate::rpc::RpcError;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

struct PendingEntry {
    sender: oneshot::Sender<Result<CallReply, RpcError>>,
    connection_id: u64,
}

/// Handle for one outstanding call, returned by [`CorrelationTable::register`].
///
/// Resolve it with [`CorrelationTable::wait`].
#[must_use = "a pending call does nothing unless waited on"]
pub struct PendingCall {
    request_id: u64,
    receiver: oneshot::Receiver<Result<CallReply, RpcError>>,
}

impl PendingCall {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }
}

/// Maps in-flight request ids to the callers waiting on them.
///
/// Each entry is resolved at most once: whichever of `complete`, `fail`,
/// `fail_connection` or a timeout removes it first wins, and later attempts
/// report `false` and are otherwise ignored.
pub struct CorrelationTable {
    next_id: AtomicU64,
    entries: DashMap<u64, PendingEntry>,
}

impl Default for CorrelationTable {
    fn default() -> Self {
        Self::new()
    }
}

impl CorrelationTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: DashMap::new(),
        }
    }

    /// Allocates a fresh request id. Ids start at 1 and never repeat for the
    /// lifetime of the table.
    pub fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Registers a result slot for `request_id`, sent over `connection_id`.
    ///
    /// Must be called before the request is written so a fast reply cannot
    /// arrive ahead of its entry.
    pub fn register(&self, request_id: u64, connection_id: u64) -> Result<PendingCall, RpcError> {
        let (sender, receiver) = oneshot::channel();

        match self.entries.entry(request_id) {
            Entry::Occupied(_) => Err(RpcError::DuplicateRequestId(request_id)),
            Entry::Vacant(slot) => {
                slot.insert(PendingEntry {
                    sender,
                    connection_id,
                });
                Ok(PendingCall {
                    request_id,
                    receiver,
                })
            }
        }
    }

    /// Delivers a reply. Returns `false` if nothing was waiting on `request_id`.
    pub fn complete(&self, request_id: u64, reply: CallReply) -> bool {
        self.resolve(request_id, Ok(reply))
    }

    pub fn fail(&self, request_id: u64, error: RpcError) -> bool {
        self.resolve(request_id, Err(error))
    }

    /// Fails every call pending on `connection_id`, returning how many were failed.
    pub fn fail_connection<F>(&self, connection_id: u64, make_error: F) -> usize
    where
        F: Fn(u64) -> RpcError,
    {
        let request_ids: Vec<u64> = self
            .entries
            .iter()
            .filter(|entry| entry.value().connection_id == connection_id)
            .map(|entry| *entry.key())
            .collect();

        request_ids
            .into_iter()
            .filter(|request_id| self.fail(*request_id, make_error(*request_id)))
            .count()
    }

    /// Waits for `pending` to resolve, giving up after `timeout`.
    ///
    /// The table entry is removed however the wait ends, including when the
    /// returned future is dropped, so a late reply finds nothing to complete.
    pub async fn wait(
        &self,
        pending: PendingCall,
        timeout: Duration,
    ) -> Result<CallReply, RpcError> {
        let PendingCall {
            request_id,
            receiver,
        } = pending;

        let _guard = RemoveOnDrop {
            entries: &self.entries,
            request_id,
        };

        match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RpcError::Aborted),
            Err(_) => {
                tracing::debug!(request_id, ?timeout, "pending call timed out");
                Err(RpcError::Timeout {
                    request_id,
                    after: timeout,
                })
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_pending(&self, request_id: u64) -> bool {
        self.entries.contains_key(&request_id)
    }

    fn resolve(&self, request_id: u64, result: Result<CallReply, RpcError>) -> bool {
        match self.entries.remove(&request_id) {
            Some((_, entry)) => {
                // The receiver may be gone if the caller stopped waiting
                let _ = entry.sender.send(result);
                true
            }
            None => {
                tracing::trace!(request_id, "no pending call for request id");
                false
            }
        }
    }
}

struct RemoveOnDrop<'a> {
    entries: &'a DashMap<u64, PendingEntry>,
    request_id: u64,
}

impl Drop for RemoveOnDrop<'_> {
    fn drop(&mut self) {
        self.entries.remove(&self.request_id);
    }
}
