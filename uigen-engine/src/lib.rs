pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod session;
pub mod transport;
