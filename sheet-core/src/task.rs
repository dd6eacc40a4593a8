//! Runs a sheet on a worker thread so a front end stays responsive.

use std::io;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use barcode_core::{CancelToken, Result, SheetError};
use tracing::warn;

use crate::run::SheetRun;

#[derive(Debug)]
pub enum RunEvent {
    Progress(u8),
    /// Always the last event of a run.
    Finished(Result<PathBuf>),
}

pub struct RunHandle {
    events: Receiver<RunEvent>,
    cancel: CancelToken,
    worker: Option<JoinHandle<()>>,
}

impl RunHandle {
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    /// Asks the worker to stop before the next item. The run then finishes
    /// with `SheetError::Cancelled` after cleaning up.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Blocks until the run ends, discarding progress events.
    pub fn wait(mut self) -> Result<PathBuf> {
        let mut outcome = None;
        for event in self.events.iter() {
            if let RunEvent::Finished(result) = event {
                outcome = Some(result);
                break;
            }
        }
        self.join();
        outcome.unwrap_or_else(|| {
            Err(SheetError::Io(io::Error::other(
                "worker stopped without reporting a result",
            )))
        })
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("sheet worker panicked");
            }
        }
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.join();
    }
}

/// Starts `run` on a named thread. Progress arrives as `RunEvent::Progress`,
/// followed by exactly one `RunEvent::Finished`.
pub fn spawn_run(run: SheetRun) -> Result<RunHandle> {
    let (tx, rx) = mpsc::channel();
    let cancel = CancelToken::new();
    let run = run.cancel_token(cancel.clone());
    let worker = thread::Builder::new()
        .name("sheet-run".to_string())
        .spawn(move || {
            let progress_tx = tx.clone();
            let mut sink = move |percent: u8| {
                // The receiver may already be gone; the run still completes
                // so its scratch directory is cleaned up.
                let _ = progress_tx.send(RunEvent::Progress(percent));
            };
            let result = run.execute(&mut sink);
            let _ = tx.send(RunEvent::Finished(result));
        })?;
    Ok(RunHandle {
        events: rx,
        cancel,
        worker: Some(worker),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::SheetJob;
    use barcode_core::{ErrorKind, Mode};

    fn job(dir: &std::path::Path, count: usize) -> SheetJob {
        let mut job = SheetJob::new(count, Mode::RandomDigits, 8);
        job.human_readable = false;
        job.px_per_module = 1;
        job.output = dir.join("threaded.pdf");
        job
    }

    #[test]
    fn test_events_end_with_finished() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let run = SheetRun::new(job(dir.path(), 4)).scratch_root(scratch.path());
        let handle = spawn_run(run).unwrap();

        let mut percents = Vec::new();
        let mut finished = None;
        for event in handle.events().iter() {
            match event {
                RunEvent::Progress(p) => percents.push(p),
                RunEvent::Finished(result) => {
                    finished = Some(result);
                    break;
                }
            }
        }
        assert_eq!(percents, vec![25, 50, 75, 100]);
        let path = finished.unwrap().unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_wait_returns_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let run = SheetRun::new(job(dir.path(), 2));
        let path = spawn_run(run).unwrap().wait().unwrap();
        assert_eq!(path, dir.path().join("threaded.pdf"));
    }

    #[test]
    fn test_errors_are_delivered_through_wait() {
        let dir = tempfile::tempdir().unwrap();
        let mut bad = job(dir.path(), 2);
        bad.count = 0;
        let err = spawn_run(SheetRun::new(bad)).unwrap().wait().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_cancel_from_the_receiving_side() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let output = dir.path().join("threaded.pdf");
        let run = SheetRun::new(job(dir.path(), 200)).scratch_root(scratch.path());
        let handle = spawn_run(run).unwrap();
        handle.cancel();
        // Cancelling before the first item or mid-run both end in Cancelled.
        let result = handle.wait();
        match result {
            Err(e) => {
                assert_eq!(e.kind(), ErrorKind::Cancelled);
                assert!(!output.exists());
            }
            // The worker may have outrun the cancel on a fast machine.
            Ok(path) => assert!(path.exists()),
        }
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }
}
