use crate::error::RunError;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::Record;

/// Shared, append-only list of collected records.
#[derive(Clone, Default)]
pub(crate) struct RecordLog(Arc<Mutex<Vec<Record>>>);

impl RecordLog {
    /// Records collected so far. `None` once the log is poisoned.
    pub fn len(&self) -> Option<usize> {
        self.0.lock().ok().map(|log| log.len())
    }
}

/// Drains the record stream into the [`RecordLog`] until every sender is gone.
pub(crate) struct Collector {
    log: RecordLog,
    handle: JoinHandle<()>,
}

impl Collector {
    pub fn spawn(records: mpsc::Receiver<Record>) -> Self {
        let log = RecordLog::default();
        let handle = tokio::spawn(drain(records, log.clone()));
        Self { log, handle }
    }

    pub fn log(&self) -> RecordLog {
        self.log.clone()
    }

    /// Waits for the stream to close and drain, then hands over the log.
    pub async fn finish(self) -> Result<Vec<Record>, RunError> {
        self.handle.await?;
        let mut log = self.log.0.lock()?;
        Ok(std::mem::take(&mut *log))
    }
}

async fn drain(mut records: mpsc::Receiver<Record>, log: RecordLog) {
    while let Some(record) = records.recv().await {
        let Ok(mut guard) = log.0.lock() else {
            error!("Record log is poisoned; collector exiting");
            return;
        };
        guard.push(record);
        while let Ok(record) = records.try_recv() {
            guard.push(record);
        }
    }
    debug!("Record stream closed");
}
