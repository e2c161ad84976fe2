//! Error taxonomy for the authentication driver (spec §7).
//!
//! Every variant surfaces to the caller; the negotiation engine recovers
//! locally from nothing except the one-shot default-mechanism substitution
//! and the 5.1.13-5.1.18 duplicate-ERR workaround, both in [`crate::connect`].

use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed packet on the wire")]
    InvalidPacket,

    #[error("unexpected end of packet data")]
    UnexpectedEof,

    #[error("server requested authentication method unknown to the client [{0}]")]
    UnknownMechanism(String),

    #[error("server sent wrong length for scramble")]
    MalformedSalt,

    #[error(
        "mysqld cannot connect using the old insecure authentication. Please use an \
         administration tool to reset your password with SET PASSWORD = PASSWORD('...'), \
         which stores a new, more secure hash"
    )]
    LegacyAuthRejected,

    #[error("password is too long")]
    PasswordTooLong,

    #[error("sha256 server public key is not set")]
    KeyUnavailable,

    #[error("failed to parse RSA public key PEM")]
    BadPublicKey,

    #[error("server has gone away")]
    TransportGone,

    #[error("ERROR {error_code} ({sql_state}): {message}")]
    ServerError {
        error_code: u16,
        sql_state: String,
        message: String,
    },

    #[error("not supported SASL method: {0}")]
    SaslUnsupported(String),

    #[error("SASL exchange failed: {0}")]
    SaslFailure(String),

    #[error("auth switch loop exceeded {0} iterations")]
    TooManySwitches(u32),

    #[error("{0}")]
    NotImplemented(&'static str),

    #[error("bad configuration: {0}")]
    BadConfig(String),
}

impl Error {
    /// Whether this error means the connection must transition to a
    /// terminal "quit" state (spec §7 policy): everything except a relayed
    /// `ERR` packet, which is a normal rejection the caller may act on.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ServerError { .. })
    }
}
