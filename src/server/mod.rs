//! HTTP server embedded in the host.
//!
//! # Architecture
//!
//! - **rouille** - sync HTTP server on its own threads (parse, enqueue, wait)
//! - **crossbeam channel** - jobs from HTTP threads to the host thread
//! - **TickBridge** - registered with the host's [`FrameScheduler`], handles
//!   jobs between host frames
//!
//! See [`bridge`] for the concurrency contract and latency bounds.
//!
//! # Trust boundary
//!
//! There is no authentication. `POST /run_script/{name}` executes host
//! script code: anyone who can reach the port can run code in the host
//! process. Bind to loopback unless that is intended.
//!
//! # Endpoints
//!
//! | Method | Path                  | Description                       |
//! |--------|-----------------------|-----------------------------------|
//! | GET    | `/version`            | Host version (plain text)         |
//! | GET    | `/objects`            | All objects                       |
//! | GET    | `/object/{name}`      | Object with materials and mesh    |
//! | GET    | `/collections`        | All collections                   |
//! | GET    | `/collection/{name}`  | Direct members of a collection    |
//! | GET    | `/materials`          | All materials                     |
//! | GET    | `/material/{name}`    | Material factors and textures     |
//! | GET    | `/texts`              | All text assets                   |
//! | POST   | `/run_script/{name}`  | Run a text asset                  |
//! | POST   | `/export_scene`       | Export the active scene           |
//! | GET    | `/{name}`             | Greeting (liveness)               |

pub mod bridge;
pub mod http;
pub mod routes;

use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread::JoinHandle;

use log::{info, warn};
use thiserror::Error;

use crate::api::Api;
use crate::config::ServerSettings;
use crate::host::{FrameScheduler, TimerId};
use bridge::TickBridge;
use http::HttpFrontend;
use routes::RouteTable;

/// Startup failures. These abort `start`; nothing is left running.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("server is already running on {0}")]
    AlreadyRunning(SocketAddr),

    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
}

/// A running listener and its tick registration.
pub struct ServerHandle {
    addr: SocketAddr,
    timer: TimerId,
    stop_tx: mpsc::Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn shutdown(mut self) {
        if self.stop_tx.send(()).is_err() {
            warn!("HTTP server thread already exited");
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("HTTP server thread panicked");
            }
        }
    }
}

/// Owns the server lifecycle. At most one [`ServerHandle`] at a time.
pub struct SceneServer {
    settings: ServerSettings,
    handle: Option<ServerHandle>,
}

impl SceneServer {
    pub fn new(settings: ServerSettings) -> Self {
        Self { settings, handle: None }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.as_ref().map(ServerHandle::addr)
    }

    /// Bind, spawn the HTTP thread and register the tick bridge.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) -> Result<SocketAddr, ServerError> {
        if let Some(handle) = &self.handle {
            return Err(ServerError::AlreadyRunning(handle.addr));
        }

        let (jobs_tx, jobs_rx) = crossbeam_channel::unbounded();
        let frontend = HttpFrontend::new(RouteTable::new(), jobs_tx, self.settings.cors);

        let addr = self.settings.bind_addr();
        let server = rouille::Server::new(addr.as_str(), move |request| frontend.handle(request))
            .map_err(|e| ServerError::Bind { addr: addr.clone(), reason: e.to_string() })?;
        let server = match self.settings.pool_size {
            Some(size) => server.pool_size(size),
            None => server,
        };
        let local = server.server_addr();
        let (thread, stop_tx) = server.stoppable();

        let bridge = TickBridge::new(
            Api::new(self.settings.export_settings()),
            jobs_rx,
            self.settings.tick_interval(),
            self.settings.max_requests_per_tick,
        );
        let timer = scheduler.register(Box::new(bridge));

        info!("Scene server listening on http://{} (tick {:?})", local, self.settings.tick_interval());
        self.handle = Some(ServerHandle { addr: local, timer, stop_tx, thread: Some(thread) });
        Ok(local)
    }

    /// Unregister the bridge and stop the HTTP thread. Returns false if not running.
    ///
    /// Requests still waiting get 503. Blocks the calling (host) thread until
    /// the HTTP thread exits; rouille's stoppable loop polls with a one second
    /// timeout, so expect up to ~1s here.
    pub fn stop(&mut self, scheduler: &mut dyn FrameScheduler) -> bool {
        let Some(handle) = self.handle.take() else {
            return false;
        };
        if !scheduler.unregister(handle.timer) {
            warn!("Tick bridge {:?} was not registered", handle.timer);
        }
        let addr = handle.addr;
        handle.shutdown();
        info!("Scene server on {} stopped", addr);
        true
    }
}
