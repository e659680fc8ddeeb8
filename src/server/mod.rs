//! Server module
//!
//! The HTTP side of the relay: download, health, and banner routes plus
//! testable startup/shutdown plumbing.

pub mod http;
pub mod startup;

// Re-export key types
pub use http::{create_router, AppState};
pub use startup::{
    resolve_bind_address, run_server_with_config, BindError, ServerConfig, ServerHandle,
};
