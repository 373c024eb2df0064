/// Config command handlers
pub mod config;

/// Serve command handler
pub mod serve;

/// Version command handlers
pub mod version;
