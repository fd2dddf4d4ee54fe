//! Roombook Network Library
//!
//! Request/response access to the booking service over TCP.
//!
//! # Architecture
//!
//! - **Server**: accepts connections; each one owns a database connection
//!   and a signed-in user
//! - **Client**: sends one request at a time and waits for the answer
//! - **Protocol**: length-prefixed JSON `Request`/`Response` frames
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start("127.0.0.1:7341", options).await?;
//!
//! let mut client = Client::connect(server.addr()).await?;
//! client.login("ana@example.com", "secret123").await?;
//! let free = client.availability(room_id, "2026-01-08").await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;
mod session;

pub use client::Client;
pub use error::{Error, Result};
pub use protocol::{ErrorKind, ListQuery, Request, Response};
pub use server::{Server, ServerOptions};
pub use session::ConnectionSession;

/// Default port for Roombook servers
pub const DEFAULT_PORT: u16 = roombook_core::config::DEFAULT_PORT;
