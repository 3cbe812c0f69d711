#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use caretrack_kernel_contracts::audit::AuditEntryInput;
use caretrack_storage::CaretrackStore;

use crate::ports::AuditSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditWriterConfig {
    pub queue_capacity: usize,
}

impl AuditWriterConfig {
    pub fn mvp_v1() -> Self {
        Self {
            queue_capacity: 256,
        }
    }
}

/// Asynchronous ledger writer. Callers hand entries over a bounded queue and
/// continue immediately; a single worker thread owns the append order. If
/// the queue is full or the worker is gone the entry is dropped and counted,
/// never blocking the request path.
pub struct AuditWriter {
    tx: Option<SyncSender<AuditEntryInput>>,
    failed: Arc<AtomicU64>,
    worker: Option<JoinHandle<()>>,
}

impl AuditWriter {
    pub fn spawn(config: AuditWriterConfig, store: Arc<Mutex<CaretrackStore>>) -> Self {
        let (tx, rx) = sync_channel::<AuditEntryInput>(config.queue_capacity);
        let failed = Arc::new(AtomicU64::new(0));
        let worker_failed = failed.clone();
        let worker = std::thread::spawn(move || {
            for input in rx {
                let appended = store
                    .lock()
                    .map_err(|_| ())
                    .and_then(|mut store| store.append_audit_entry(input).map_err(|_| ()));
                if appended.is_err() {
                    worker_failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        });
        Self {
            tx: Some(tx),
            failed,
            worker: Some(worker),
        }
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl AuditSink for AuditWriter {
    fn record(&self, input: AuditEntryInput) {
        let Some(tx) = &self.tx else {
            self.failed.fetch_add(1, Ordering::Relaxed);
            return;
        };
        match tx.try_send(input) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl Drop for AuditWriter {
    fn drop(&mut self) {
        // Closing the sender lets the worker drain the queue and exit.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// Synchronous sink writing straight into the store. Used where the caller
/// needs the entry visible before the next statement, primarily in tests.
#[derive(Debug, Clone)]
pub struct DirectAuditSink {
    store: Arc<Mutex<CaretrackStore>>,
    failed: Arc<AtomicU64>,
}

impl DirectAuditSink {
    pub fn new(store: Arc<Mutex<CaretrackStore>>) -> Self {
        Self {
            store,
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn failed_writes(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }
}

impl AuditSink for DirectAuditSink {
    fn record(&self, input: AuditEntryInput) {
        let appended = self
            .store
            .lock()
            .map_err(|_| ())
            .and_then(|mut store| store.append_audit_entry(input).map_err(|_| ()));
        if appended.is_err() {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}
