//! Client-side pluggable authentication driver for the MySQL wire protocol
//! (spec §1). Negotiates credentials with a MySQL/MariaDB/Percona server
//! immediately after the transport handshake and leaves the connection
//! ready for queries; framing, TLS establishment, and query execution are
//! the caller's concerns, reached only through [`transport::PacketTransport`].

pub mod connect;
pub mod constant;
pub mod crypto;
pub mod error;
pub mod mechanism;
mod negotiate;
pub mod sasl;
pub mod session;
pub mod transport;
pub mod wire;

pub use connect::{run_change_user_auth, run_connect_auth};
pub use session::{Credentials, ServerGreeting, SessionOptions, TlsMode};
pub use transport::{PacketTransport, TlsOptions};
