mod bootstrap;
pub use bootstrap::*;

mod client;
pub use client::*;

mod config;
pub use config::*;

mod connection_manager;
pub use connection_manager::*;

pub mod constants;

pub mod net;

mod server;
pub use server::*;

mod transport;
pub use transport::*;
