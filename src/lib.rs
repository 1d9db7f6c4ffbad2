//! SCENERY - HTTP/JSON API over a live, host-owned scene graph
//!
//! Re-exports all modules for use by the binary target and tests.

// Request core (resolve, assemble, actions)
pub mod api;

// Host interfaces and the in-memory reference host
pub mod host;

// HTTP front end and tick bridge
pub mod server;

// App modules
pub mod cli;
pub mod config;

pub use api::{Api, ApiCall, ApiError, ApiResponse};
pub use config::{PathConfig, ServerSettings};
pub use host::memory::MemoryScene;
pub use host::timers::Timers;
pub use host::{FrameScheduler, SceneHost, SceneQuery, TickHandler};
pub use server::{SceneServer, ServerError};
