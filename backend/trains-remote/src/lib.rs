pub mod client;
pub mod config;
pub mod error;
pub mod json_stream;
pub mod logger;
pub mod message;
pub mod proxy;
pub mod server;
