#![doc = include_str!("../README.md")]
#![cfg_attr(feature = "doc_cfg", feature(doc_cfg))]
// If this was in Cargo.toml, it would cover the demos as well
#![warn(
    missing_docs,
    clippy::missing_assert_message,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

#[macro_use]
mod macros;

mod client;
mod endpoint;
mod family;
mod misc;
mod os;
mod socket;
mod sys;

pub mod tcp;
pub mod udp;

pub use {
    client::*,
    endpoint::*,
    family::*,
    socket::{ConnectOptions, SocketHandle, DEFAULT_BACKLOG},
};

/// The native socket descriptor type: [`RawFd`](std::os::unix::io::RawFd) on Unix,
/// [`RawSocket`](std::os::windows::io::RawSocket) on Windows.
#[cfg(unix)]
pub use os::unix::NativeSocket;
/// The native socket descriptor type: [`RawFd`](std::os::unix::io::RawFd) on Unix,
/// [`RawSocket`](std::os::windows::io::RawSocket) on Windows.
#[cfg(windows)]
pub use os::windows::NativeSocket;

/// The value [`SocketHandle::file_no`] returns for a handle that is not open.
pub const INVALID_SOCKET: NativeSocket = sys::INVALID_SOCKET;

#[cfg(test)]
#[path = "../tests/index.rs"]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects, clippy::indexing_slicing)]
mod tests;
