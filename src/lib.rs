//! gridcord - Second Life group chat <-> Discord channel bridge.
//!
//! Relays messages between an ordered list of grid groups and an ordered list
//! of Discord channels in one guild. Position `i` on one side is paired with
//! position `i` on the other.
//!
//! The grid protocol is not implemented here: embedders wrap their grid SDK in
//! a [`grid::GridClient`] and hand it to [`runtime::run_from_env`]:
//!
//! ```ignore
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     let grid = std::sync::Arc::new(MySdkClient::new());
//!     gridcord::runtime::run_from_env(grid).await
//! }
//! ```

pub mod bridge;
pub mod common;
pub mod config;
pub mod discord;
pub mod grid;
pub mod runtime;

#[cfg(test)]
mod test_utils;
