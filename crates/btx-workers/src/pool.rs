//! The worker pool.
//!
//! Jobs are dispatched round-robin across a fixed set of workers. A
//! pool created with zero workers executes every job in-process on the
//! calling task instead, with the same result surface, so callers never
//! need to care which mode they are in. Timed jobs (transaction check
//! and sign) get a deadline; raw crypto, mining, and scrypt run without
//! one.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use btx_primitives::ec::PrivateKey;
use btx_transaction::{Coin, CoinView, KeyRing, MutableTransaction, Transaction};

use crate::error::WorkerError;
use crate::jobs;
use crate::packets::{self, Packet};
use crate::worker::Worker;

/// Default deadline for transaction check and sign jobs.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(120_000);

/// A fixed-size pool of worker threads. Workers are spawned lazily,
/// one per dispatch, until the pool is full.
pub struct WorkerPool {
    size: usize,
    workers: Mutex<Vec<Arc<Worker>>>,
    counter: AtomicUsize,
    destroyed: AtomicBool,
    timeout: Option<Duration>,
}

impl WorkerPool {
    /// Creates a pool with the default size: two workers, or one per
    /// CPU when more are available. Must be called from within a tokio
    /// runtime.
    pub fn new() -> Self {
        Self::with_size(default_size())
    }

    /// Creates a pool with an explicit worker count. A size of zero
    /// disables the workers entirely; jobs then execute in-process.
    pub fn with_size(size: usize) -> Self {
        WorkerPool {
            size,
            workers: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Maximum number of workers in the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of workers currently spawned.
    pub fn spawned(&self) -> usize {
        lock(&self.workers).len()
    }

    /// Overrides the deadline for timed jobs. `None` disables it.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Destroys every worker. Outstanding jobs are rejected; later jobs
    /// fail with [`WorkerError::Destroyed`].
    pub fn shutdown(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        for worker in lock(&self.workers).drain(..) {
            worker.destroy();
        }
    }

    // ---- jobs ----

    /// Verifies every input script of a transaction.
    pub async fn check(
        &self,
        tx: &Transaction,
        view: &CoinView,
        flags: u32,
    ) -> Result<(), WorkerError> {
        let payload = packets::encode_check(tx, view, flags);
        match self.dispatch(packets::cmd::CHECK, payload, self.timeout).await? {
            Packet::CheckResult => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Verifies a single input against the coin it spends.
    pub async fn check_input(
        &self,
        tx: &Transaction,
        index: usize,
        coin: &Coin,
        flags: u32,
    ) -> Result<(), WorkerError> {
        let payload = packets::encode_check_input(tx, index as u32, coin, flags);
        match self
            .dispatch(packets::cmd::CHECK_INPUT, payload, self.timeout)
            .await?
        {
            Packet::CheckInputResult => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    /// Templates and signs every input the rings can satisfy, writing
    /// the produced scripts and witnesses back into the builder.
    ///
    /// # Returns
    /// The number of inputs signed.
    pub async fn sign(
        &self,
        mtx: &mut MutableTransaction,
        rings: &[KeyRing],
        sighash_type: u32,
    ) -> Result<usize, WorkerError> {
        let tx = mtx.to_tx();
        let payload = packets::encode_sign(&tx, &mtx.view, rings, sighash_type);
        match self.dispatch(packets::cmd::SIGN, payload, self.timeout).await? {
            Packet::SignResult {
                total,
                scripts,
                witnesses,
            } => {
                if scripts.len() != mtx.inputs.len() || witnesses.len() != mtx.inputs.len() {
                    return Err(WorkerError::Frame(
                        "sign result input count mismatch".into(),
                    ));
                }
                for (input, (script, witness)) in
                    mtx.inputs.iter_mut().zip(scripts.into_iter().zip(witnesses))
                {
                    input.script = script;
                    input.witness = witness;
                }
                Ok(total as usize)
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Templates and signs one input, writing the result back into the
    /// builder.
    ///
    /// # Returns
    /// `true` if a signature was produced.
    pub async fn sign_input(
        &self,
        mtx: &mut MutableTransaction,
        index: usize,
        ring: &KeyRing,
        sighash_type: u32,
    ) -> Result<bool, WorkerError> {
        let input = mtx
            .inputs
            .get(index)
            .ok_or_else(|| WorkerError::InvalidParameter(format!(
                "input index {} out of range",
                index
            )))?;
        let coin = mtx.view.get_coin_for(input).ok_or_else(|| {
            WorkerError::InvalidParameter(format!("no coin for input {}", index))
        })?;
        let tx = mtx.to_tx();
        let payload = packets::encode_sign_input(&tx, index as u32, coin, ring, sighash_type);
        match self
            .dispatch(packets::cmd::SIGN_INPUT, payload, self.timeout)
            .await?
        {
            Packet::SignInputResult {
                signed,
                script,
                witness,
            } => {
                mtx.inputs[index].script = script;
                mtx.inputs[index].witness = witness;
                Ok(signed)
            }
            other => Err(unexpected(&other)),
        }
    }

    /// Verifies a raw ECDSA signature. Runs without a deadline.
    pub async fn ec_verify(
        &self,
        hash: &[u8; 32],
        signature: &[u8],
        key: &[u8],
    ) -> Result<bool, WorkerError> {
        let packet = Packet::EcVerify {
            hash: *hash,
            signature: signature.to_vec(),
            key: key.to_vec(),
        };
        match self
            .dispatch(packets::cmd::EC_VERIFY, packet.encode(), None)
            .await?
        {
            Packet::EcVerifyResult { valid } => Ok(valid),
            other => Err(unexpected(&other)),
        }
    }

    /// Produces a raw DER-encoded ECDSA signature. Runs without a
    /// deadline.
    pub async fn ec_sign(
        &self,
        hash: &[u8; 32],
        key: &PrivateKey,
    ) -> Result<Vec<u8>, WorkerError> {
        let packet = Packet::EcSign {
            hash: *hash,
            key: key.to_bytes(),
        };
        match self
            .dispatch(packets::cmd::EC_SIGN, packet.encode(), None)
            .await?
        {
            Packet::EcSignResult { signature } => Ok(signature),
            other => Err(unexpected(&other)),
        }
    }

    /// Searches a block header's nonce range for a hash at or below the
    /// target. Runs without a deadline.
    ///
    /// # Returns
    /// The solving nonce, or `None` if the range is exhausted.
    pub async fn mine(
        &self,
        header: &[u8],
        target: &[u8; 32],
        min: u32,
        max: u32,
    ) -> Result<Option<u32>, WorkerError> {
        let packet = Packet::Mine {
            header: header.to_vec(),
            target: *target,
            min,
            max,
        };
        match self.dispatch(packets::cmd::MINE, packet.encode(), None).await? {
            Packet::MineResult { nonce } => Ok(nonce),
            other => Err(unexpected(&other)),
        }
    }

    /// Derives a key with scrypt. Runs without a deadline.
    pub async fn scrypt(
        &self,
        passphrase: &[u8],
        salt: &[u8],
        n: u32,
        r: u32,
        p: u32,
        length: u32,
    ) -> Result<Vec<u8>, WorkerError> {
        let packet = Packet::Scrypt {
            passphrase: passphrase.to_vec(),
            salt: salt.to_vec(),
            n,
            r,
            p,
            length,
        };
        match self
            .dispatch(packets::cmd::SCRYPT, packet.encode(), None)
            .await?
        {
            Packet::ScryptResult { key } => Ok(key),
            other => Err(unexpected(&other)),
        }
    }

    // ---- dispatch ----

    async fn dispatch(
        &self,
        cmd: u8,
        payload: Vec<u8>,
        timeout: Option<Duration>,
    ) -> Result<Packet, WorkerError> {
        match self.alloc()? {
            Some(worker) => worker.execute(cmd, &payload, timeout).await,
            None => {
                let request = Packet::decode(cmd, &payload)?;
                jobs::execute(request).map_err(|err| match err {
                    rejected @ (WorkerError::Transaction(_)
                    | WorkerError::Script(_)
                    | WorkerError::Primitives(_)) => {
                        WorkerError::Job(jobs::job_error(&rejected))
                    }
                    other => other,
                })
            }
        }
    }

    // Round-robin allocation, spawning a worker per call until the
    // pool is full.
    fn alloc(&self) -> Result<Option<Arc<Worker>>, WorkerError> {
        if self.size == 0 {
            return Ok(None);
        }
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(WorkerError::Destroyed);
        }
        let mut workers = lock(&self.workers);
        if workers.len() < self.size {
            let worker = Arc::new(Worker::spawn(workers.len()));
            tracing::debug!(worker = worker.id(), "spawning worker");
            workers.push(Arc::clone(&worker));
            return Ok(Some(worker));
        }
        let index = self.counter.fetch_add(1, Ordering::Relaxed) % workers.len();
        Ok(Some(Arc::clone(&workers[index])))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Default for WorkerPool {
    fn default() -> Self {
        WorkerPool::new()
    }
}

fn unexpected(packet: &Packet) -> WorkerError {
    WorkerError::Packet {
        cmd: packet.cmd(),
        reason: "unexpected result packet".into(),
    }
}

fn default_size() -> usize {
    std::thread::available_parallelism()
        .map(|cores| cores.get())
        .unwrap_or(1)
        .max(2)
}
