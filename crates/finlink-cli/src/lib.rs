/*
[INPUT]:  Public API exports for the finlink-cli crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod credentials;
pub mod server;

// Re-export main types for convenience
pub use config::ListenerConfig;
pub use server::{router, serve, serve_listener, LoggingHandler};
