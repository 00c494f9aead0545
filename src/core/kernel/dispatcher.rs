use crate::core::errors::ExchangeError;
use crate::core::kernel::envelope::{SignedEnvelope, Transport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// One queued request: the envelope, its deadline, and the single-use slot
/// the worker fulfills. The oneshot channel enforces the written-at-most-once
/// contract structurally.
struct Submission {
    envelope: SignedEnvelope,
    deadline: Instant,
    done: oneshot::Sender<Result<Vec<u8>, ExchangeError>>,
}

/// Serialized, rate-paced request dispatcher.
///
/// One background worker owns the submission queue and the pacing clock, so
/// all outbound traffic for a client is serialized and spaced by at least the
/// configured interval. Callers submit concurrently and each suspends only on
/// its own completion slot; the per-submission deadline is enforced
/// independently of pacing, so a submission stuck behind a slow queue still
/// times out on schedule.
pub struct Dispatcher {
    queue: mpsc::Sender<Submission>,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// Spawn the worker and return the submission handle.
    ///
    /// The worker runs until `cancel` is signaled. Cancellation is
    /// observed at both wait points (queue wait and pacing wait); submissions
    /// not yet dispatched when it fires are abandoned and their callers see
    /// [`ExchangeError::PoolClosed`].
    pub fn start(
        transport: Arc<dyn Transport>,
        pacing_interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (queue, rx) = mpsc::channel(1);
        tokio::spawn(worker(transport, pacing_interval, cancel.clone(), rx));
        Self { queue, cancel }
    }

    /// Submit one envelope and wait for its result.
    ///
    /// Blocks the calling task until the worker fulfills the submission or
    /// `deadline` elapses, whichever comes first. Any number of callers may
    /// submit concurrently; submissions are served in FIFO arrival order and
    /// one caller's deadline never affects another's submission.
    pub async fn submit(
        &self,
        envelope: SignedEnvelope,
        deadline: Duration,
    ) -> Result<Vec<u8>, ExchangeError> {
        if self.cancel.is_cancelled() {
            return Err(ExchangeError::PoolClosed);
        }

        let due = Instant::now() + deadline;
        let (done, slot) = oneshot::channel();
        let submission = Submission {
            envelope,
            deadline: due,
            done,
        };

        // The queue is bounded, so enqueueing itself is covered by the
        // deadline as well.
        match time::timeout_at(due, self.queue.send(submission)).await {
            Err(_) => return Err(ExchangeError::Timeout),
            Ok(Err(_)) => return Err(ExchangeError::PoolClosed),
            Ok(Ok(())) => {}
        }

        let bytes = match time::timeout_at(due, slot).await {
            Err(_) => return Err(ExchangeError::Timeout),
            // Worker dropped the slot without fulfilling: shutdown.
            Ok(Err(_)) => return Err(ExchangeError::PoolClosed),
            Ok(Ok(result)) => result?,
        };

        if bytes.is_empty() {
            return Err(ExchangeError::EmptyResponse);
        }
        Ok(bytes)
    }

    /// Stop the worker. Idempotent.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

async fn worker(
    transport: Arc<dyn Transport>,
    pacing_interval: Duration,
    cancel: CancellationToken,
    mut rx: mpsc::Receiver<Submission>,
) {
    debug!(?pacing_interval, "dispatcher worker started");

    // Earliest instant the next request may be dispatched. Only this task
    // reads or writes it.
    let mut gate = Instant::now();

    loop {
        let submission = tokio::select! {
            () = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(submission) => submission,
                None => break,
            },
        };

        // Race cancellation, the submission's own deadline, and the pacing
        // gate. Biased so an already-expired deadline wins over an open gate.
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Dropping the submission closes its slot; the caller
                // observes PoolClosed.
                break;
            }
            () = time::sleep_until(submission.deadline) => {
                trace!("submission expired before dispatch");
                let _ = submission.done.send(Err(ExchangeError::Timeout));
                // Pacing state untouched: nothing was dispatched.
            }
            () = time::sleep_until(gate) => {
                trace!(path = %submission.envelope.url().path(), "dispatching");
                let result = transport.round_trip(&submission.envelope).await;
                gate = Instant::now() + pacing_interval;
                // A lapsed caller has dropped its receiver; that is fine.
                let _ = submission.done.send(result);
            }
        }
    }

    debug!("dispatcher worker stopped");
}
