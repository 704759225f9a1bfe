//! TCP clients and servers.

mod client;
mod server;

pub use {client::*, server::*};
