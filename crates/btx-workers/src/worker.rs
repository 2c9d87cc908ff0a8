//! A single worker: an OS thread running the job loop, connected to the
//! parent by byte channels carrying framed packets.
//!
//! The parent side keeps a pending-job table mapping frame ids to
//! oneshot senders. A router task drains the child's output, reassembles
//! frames, and resolves the matching entry; control packets (env, log,
//! event, unsolicited errors) are forwarded to the tracer instead. When
//! the child goes away, every outstanding job is rejected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::WorkerError;
use crate::framer;
use crate::jobs;
use crate::packets::{Packet, PROTOCOL_VERSION};
use crate::parser::Parser;

type Reply = Result<Packet, WorkerError>;
type Pending = Arc<Mutex<HashMap<u32, oneshot::Sender<Reply>>>>;

/// Handle to one worker thread.
pub struct Worker {
    id: usize,
    sender: Mutex<Option<std::sync::mpsc::Sender<Vec<u8>>>>,
    pending: Pending,
    next_id: AtomicU32,
}

impl Worker {
    /// Spawns a worker thread and its router task. Must be called from
    /// within a tokio runtime.
    pub fn spawn(id: usize) -> Self {
        let (to_child, from_parent) = std::sync::mpsc::channel::<Vec<u8>>();
        let (to_parent, from_child) = mpsc::unbounded_channel::<Vec<u8>>();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));

        thread::Builder::new()
            .name(format!("btx-worker-{}", id))
            .spawn(move || child_main(from_parent, to_parent))
            // Thread spawning only fails when the OS is out of resources;
            // the router will then reject every job as destroyed.
            .ok();

        tokio::spawn(route(id, from_child, Arc::clone(&pending)));

        Worker {
            id,
            sender: Mutex::new(Some(to_child)),
            pending,
            next_id: AtomicU32::new(1),
        }
    }

    /// This worker's id within the pool.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Whether the worker is still accepting jobs.
    pub fn is_alive(&self) -> bool {
        lock(&self.sender).is_some()
    }

    /// Sends a pre-encoded request and waits for its reply.
    ///
    /// # Arguments
    /// * `cmd` - Command byte of the request packet.
    /// * `payload` - Encoded packet payload.
    /// * `timeout` - Job deadline; `None` waits indefinitely.
    pub async fn execute(
        &self,
        cmd: u8,
        payload: &[u8],
        timeout: Option<Duration>,
    ) -> Result<Packet, WorkerError> {
        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply_tx, reply_rx) = oneshot::channel();
        lock(&self.pending).insert(job_id, reply_tx);

        let frame = framer::frame(job_id, cmd, payload);
        let sent = match lock(&self.sender).as_ref() {
            Some(sender) => sender.send(frame).is_ok(),
            None => false,
        };
        if !sent {
            lock(&self.pending).remove(&job_id);
            return Err(WorkerError::Destroyed);
        }

        let reply = match timeout {
            Some(deadline) => match tokio::time::timeout(deadline, reply_rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    // Drop the pending entry so a late reply is discarded
                    // instead of resolving a job already rejected.
                    lock(&self.pending).remove(&job_id);
                    return Err(WorkerError::Timeout);
                }
            },
            None => reply_rx.await,
        };

        match reply {
            Ok(Ok(Packet::ErrorResult { error })) => Err(WorkerError::Job(error)),
            Ok(result) => result,
            Err(_) => Err(WorkerError::Destroyed),
        }
    }

    /// Tears the worker down: closes the channel so the thread exits,
    /// and rejects every outstanding job.
    pub fn destroy(&self) {
        lock(&self.sender).take();
        reject_all(&self.pending);
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.destroy();
    }
}

// Mutex poisoning only happens if a holder panicked; the map is still
// structurally sound, so keep going with it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reject_all(pending: &Pending) {
    for (_, sender) in lock(pending).drain() {
        let _ = sender.send(Err(WorkerError::Destroyed));
    }
}

/// Parent-side router: reassembles the child's byte stream into frames
/// and resolves pending jobs. Ends when the child hangs up, rejecting
/// whatever is still outstanding.
async fn route(worker_id: usize, mut from_child: mpsc::UnboundedReceiver<Vec<u8>>, pending: Pending) {
    let mut parser = Parser::new();
    'stream: while let Some(chunk) = from_child.recv().await {
        let frames = match parser.feed(&chunk) {
            Ok(frames) => frames,
            Err(err) => {
                tracing::error!(worker = worker_id, %err, "frame stream desynchronized");
                break 'stream;
            }
        };
        for frame in frames {
            let packet = match Packet::decode(frame.cmd, &frame.payload) {
                Ok(packet) => packet,
                Err(err) => {
                    tracing::warn!(worker = worker_id, %err, "dropping undecodable packet");
                    continue;
                }
            };
            match packet {
                Packet::Env { version } => {
                    tracing::debug!(worker = worker_id, version, "worker online");
                }
                Packet::Log { text } => {
                    tracing::debug!(worker = worker_id, "{}", text);
                }
                Packet::Event { items } => {
                    tracing::trace!(worker = worker_id, items = items.len(), "worker event");
                }
                Packet::Error { error } => {
                    tracing::error!(worker = worker_id, %error, "worker error");
                }
                result => match lock(&pending).remove(&frame.id) {
                    Some(sender) => {
                        let _ = sender.send(Ok(result));
                    }
                    None => {
                        tracing::warn!(worker = worker_id, id = frame.id, "reply for unknown job");
                    }
                },
            }
        }
    }
    reject_all(&pending);
}

/// Child-side loop: decode requests, execute them, frame the replies.
/// Runs until the parent closes its channel.
fn child_main(
    from_parent: std::sync::mpsc::Receiver<Vec<u8>>,
    to_parent: mpsc::UnboundedSender<Vec<u8>>,
) {
    let env = Packet::Env {
        version: PROTOCOL_VERSION,
    };
    if to_parent.send(framer::frame(0, env.cmd(), &env.encode())).is_err() {
        return;
    }

    let mut parser = Parser::new();
    while let Ok(chunk) = from_parent.recv() {
        let frames = match parser.feed(&chunk) {
            Ok(frames) => frames,
            Err(err) => {
                let error = Packet::Error {
                    error: jobs::job_error(&err),
                };
                let _ = to_parent.send(framer::frame(0, error.cmd(), &error.encode()));
                return;
            }
        };
        for frame in frames {
            let reply = match Packet::decode(frame.cmd, &frame.payload) {
                Ok(packet) => match packet {
                    // Control packets get no reply.
                    Packet::Env { .. }
                    | Packet::Event { .. }
                    | Packet::Log { .. }
                    | Packet::Error { .. } => continue,
                    request => match jobs::execute(request) {
                        Ok(result) => result,
                        Err(err) => Packet::ErrorResult {
                            error: jobs::job_error(&err),
                        },
                    },
                },
                Err(err) => Packet::ErrorResult {
                    error: jobs::job_error(&err),
                },
            };
            if to_parent
                .send(framer::frame(frame.id, reply.cmd(), &reply.encode()))
                .is_err()
            {
                return;
            }
        }
    }
}
