//! confseal HTTP server and CLI plumbing
//!
//! The binary (`confseal`) lives in `main.rs`; everything it wires together
//! is exposed here so the router can be exercised in tests without binding
//! a socket.

pub mod api;
pub mod cli;
pub mod error;

pub use api::{create_router, AppState, SourceInfo};
pub use cli::{Cli, Command, LogFormat};
pub use error::ApiError;
