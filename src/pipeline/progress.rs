// src/pipeline/progress.rs

//! Progress reporting for the synchronizer.
//!
//! Frontends implement [`SyncProgress`] and pass it in; the synchronizer
//! calls it after each unit of work and never keeps progress state of its
//! own.

/// Observer of a sync run.
pub trait SyncProgress {
    /// Called once with the number of pending documents.
    fn begin(&mut self, _total: usize) {}

    /// Free-form status line.
    fn log(&mut self, _msg: &str) {}

    /// Called after each pending document, fetched or not.
    fn item_done(&mut self, _name: &str) {}

    /// Called at the end, successful or not.
    fn finish(&mut self) {}
}

/// A no-op progress sink.
pub struct NullProgress;
impl SyncProgress for NullProgress {}

/// Reports progress through the `log` facade.
#[derive(Debug, Default)]
pub struct LogProgress {
    total: usize,
    done: usize,
    last_percent: Option<usize>,
}

impl LogProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn percent(&self) -> usize {
        if self.total == 0 {
            100
        } else {
            self.done * 100 / self.total
        }
    }
}

impl SyncProgress for LogProgress {
    fn begin(&mut self, total: usize) {
        self.total = total;
        self.done = 0;
        self.last_percent = None;
    }

    fn log(&mut self, msg: &str) {
        log::info!("{}", msg);
    }

    fn item_done(&mut self, name: &str) {
        self.done += 1;
        log::debug!("[{}/{}] {}", self.done, self.total, name);

        // One line per 10% step keeps long runs readable.
        let percent = self.percent();
        let bucket = percent / 10;
        if self.last_percent.map(|p| p / 10) != Some(bucket) {
            self.last_percent = Some(percent);
            log::info!("Progress: {}% ({}/{})", percent, self.done, self.total);
        }
    }

    fn finish(&mut self) {
        log::debug!("Processed {}/{} pending documents", self.done, self.total);
    }
}
