//! Cooperative tick bridge between the HTTP threads and the host thread.
//!
//! ```text
//! ┌──────────────────────────┐    crossbeam channel     ┌──────────────────────────┐
//! │  HTTP worker threads     │  ───── Job{call} ──────▶ │  Host thread             │
//! │  (rouille)               │                          │  FrameScheduler tick     │
//! │                          │                          │   └─ TickBridge::on_tick │
//! │  block on reply channel  │  ◀──── ApiResponse ───── │       └─ Api::handle     │
//! └──────────────────────────┘                          └──────────────────────────┘
//! ```
//!
//! Network I/O runs on the server's own threads, which never touch host
//! state. They enqueue a [`Job`] and wait. The channel is the mutual-exclusion
//! boundary: every host access happens inside `on_tick`, on the host thread,
//! between the host's own frames.
//!
//! Latency: a request waits up to one tick interval before it is picked up.
//! A tick handles at most `max_per_tick` jobs back to back, and there is no
//! preemption, so the worst case a tick can hold the host is
//! `max_per_tick` times the slowest handler (a script run or an export),
//! plus one interval before the next host frame sees the result.
//! Stopping the server is separate: [`super::SceneServer::stop`] joins the
//! HTTP thread and can hold the host for up to a second.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, TryRecvError, bounded};
use log::{trace, warn};

use crate::api::{Api, ApiCall, ApiResponse};
use crate::host::{SceneHost, TickHandler};

/// One queued request and the channel its response goes back on.
#[derive(Debug)]
pub struct Job {
    pub call: ApiCall,
    pub reply: Sender<ApiResponse>,
}

impl Job {
    /// New job plus the receiver its response will arrive on.
    pub fn new(call: ApiCall) -> (Job, Receiver<ApiResponse>) {
        let (reply, rx) = bounded(1);
        (Job { call, reply }, rx)
    }
}

/// Drains queued jobs on the host thread.
pub struct TickBridge {
    api: Api,
    jobs: Receiver<Job>,
    interval: Duration,
    max_per_tick: usize,
}

impl TickBridge {
    pub fn new(api: Api, jobs: Receiver<Job>, interval: Duration, max_per_tick: usize) -> Self {
        Self { api, jobs, interval, max_per_tick: max_per_tick.max(1) }
    }

    /// Handle up to `max_per_tick` ready jobs. Returns how many ran.
    pub fn pump(&mut self, host: &mut dyn SceneHost) -> usize {
        let mut handled = 0;
        while handled < self.max_per_tick {
            let job = match self.jobs.try_recv() {
                Ok(job) => job,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    trace!("Job channel closed");
                    break;
                }
            };
            let response = self.api.handle(host, &job.call);
            if job.reply.send(response).is_err() {
                warn!("Client went away before {:?} completed", job.call);
            }
            handled += 1;
        }
        if handled > 0 {
            trace!("Tick handled {} job(s), {} queued", handled, self.jobs.len());
        }
        handled
    }
}

impl TickHandler for TickBridge {
    fn on_tick(&mut self, host: &mut dyn SceneHost) -> Duration {
        self.pump(host);
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Body;
    use crate::host::memory::MemoryScene;
    use crossbeam_channel::unbounded;

    fn submit(tx: &Sender<Job>, call: ApiCall) -> Receiver<ApiResponse> {
        let (job, rx) = Job::new(call);
        tx.send(job).unwrap();
        rx
    }

    #[test]
    fn test_tick_returns_interval() {
        let (_tx, rx) = unbounded();
        let mut bridge = TickBridge::new(Api::default(), rx, Duration::from_millis(100), 8);
        let mut scene = MemoryScene::demo();
        assert_eq!(bridge.on_tick(&mut scene), Duration::from_millis(100));
    }

    #[test]
    fn test_jobs_answered_in_order() {
        let (tx, rx) = unbounded();
        let mut bridge = TickBridge::new(Api::default(), rx, Duration::ZERO, 8);
        let mut scene = MemoryScene::demo();

        let version = submit(&tx, ApiCall::Version);
        let missing = submit(&tx, ApiCall::Object("Ghost".into()));
        assert_eq!(bridge.pump(&mut scene), 2);

        assert!(matches!(version.try_recv().unwrap().body, Body::Text(_)));
        assert_eq!(missing.try_recv().unwrap().status, 404);
    }

    #[test]
    fn test_pass_is_bounded() {
        let (tx, rx) = unbounded();
        let mut bridge = TickBridge::new(Api::default(), rx, Duration::ZERO, 2);
        let mut scene = MemoryScene::demo();

        let replies: Vec<_> = (0..5).map(|_| submit(&tx, ApiCall::Objects)).collect();
        assert_eq!(bridge.pump(&mut scene), 2);
        assert_eq!(bridge.pump(&mut scene), 2);
        assert_eq!(bridge.pump(&mut scene), 1);
        assert_eq!(bridge.pump(&mut scene), 0);
        assert!(replies.iter().all(|r| r.try_recv().is_ok()));
    }

    #[test]
    fn test_dropped_client_does_not_stall() {
        let (tx, rx) = unbounded();
        let mut bridge = TickBridge::new(Api::default(), rx, Duration::ZERO, 8);
        let mut scene = MemoryScene::demo();

        drop(submit(&tx, ApiCall::Texts));
        let alive = submit(&tx, ApiCall::Texts);
        assert_eq!(bridge.pump(&mut scene), 2);
        assert_eq!(alive.try_recv().unwrap().status, 200);
    }
}
