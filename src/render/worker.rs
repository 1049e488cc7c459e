use std::{thread::JoinHandle, time::Duration};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, unbounded};
use tracing::{debug, warn};

use crate::{
    foundation::error::{PortraitError, PortraitResult},
    project::StateKey,
    render::pipeline::{FinishedJob, RenderJob},
};

/// A finished (or failed) background render, tagged with the ticket from [`PreviewWorker::submit`].
pub struct PreviewResult {
    /// Value returned by [`PreviewWorker::submit`].
    pub ticket: u64,
    /// State the job rendered.
    pub state: StateKey,
    /// The finished job, ready for the pipeline.
    pub result: PortraitResult<FinishedJob>,
}

/// Single background thread that runs preview jobs in submission order.
///
/// Results come back over a channel; the owner passes them to
/// [`RenderPipeline::complete`](crate::render::RenderPipeline::complete) on its own thread.
pub struct PreviewWorker {
    jobs: Option<Sender<(u64, RenderJob)>>,
    results: Receiver<PreviewResult>,
    handle: Option<JoinHandle<()>>,
    next_ticket: u64,
}

impl PreviewWorker {
    /// Start the worker thread.
    pub fn spawn() -> PortraitResult<Self> {
        let (job_tx, job_rx) = unbounded::<(u64, RenderJob)>();
        let (res_tx, res_rx) = unbounded::<PreviewResult>();
        let handle = std::thread::Builder::new()
            .name("portrait-preview".to_owned())
            .spawn(move || {
                for (ticket, job) in job_rx.iter() {
                    let state = job.state();
                    let result = job.run();
                    if let Err(e) = &result {
                        warn!(ticket, state = %state, error = %e, "preview render failed");
                    }
                    if res_tx.send(PreviewResult { ticket, state, result }).is_err() {
                        break;
                    }
                }
                debug!("preview worker exiting");
            })
            .map_err(|e| PortraitError::io("spawn preview worker", e))?;

        Ok(Self {
            jobs: Some(job_tx),
            results: res_rx,
            handle: Some(handle),
            next_ticket: 1,
        })
    }

    /// Queue `job` and return its ticket. Tickets increase monotonically.
    pub fn submit(&mut self, job: RenderJob) -> PortraitResult<u64> {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        let tx = self
            .jobs
            .as_ref()
            .ok_or_else(|| PortraitError::validation("preview worker is shut down"))?;
        tx.send((ticket, job))
            .map_err(|_| PortraitError::Other(anyhow::anyhow!("preview worker disconnected")))?;
        Ok(ticket)
    }

    /// Next result if one is waiting.
    pub fn try_recv(&self) -> Option<PreviewResult> {
        match self.results.try_recv() {
            Ok(r) => Some(r),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next result.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PreviewResult> {
        match self.results.recv_timeout(timeout) {
            Ok(r) => Some(r),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Drain everything that has arrived and keep only the newest result.
    pub fn latest(&self) -> Option<PreviewResult> {
        let mut newest = None;
        while let Some(r) = self.try_recv() {
            newest = Some(r);
        }
        newest
    }
}

impl Drop for PreviewWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("preview worker panicked");
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/worker.rs"]
mod tests;
