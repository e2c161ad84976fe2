//! Name → mechanism dispatch (spec §4.3, component C3). Built-ins are
//! matched by name rather than registered at runtime, so the lookup needs
//! no lock even though a process may drive many connections concurrently
//! (spec §5): the set of mechanisms is fixed at compile time.

pub mod caching_sha2;
pub mod clear;
#[cfg(feature = "ldap-sasl")]
pub mod ldap_sasl;
pub mod native;
#[cfg(feature = "sha256")]
pub mod sha256;

use crate::error::Result;
use crate::transport::PacketTransport;

/// Fallback mechanism substituted, once, when the server names one this
/// client doesn't recognise (spec §4.5, §6.5).
pub const DEFAULT_MECHANISM: &str = native::NAME;

/// What a mechanism wants to happen after consuming one `AuthMoreData`
/// packet (spec §4.3).
pub enum MoreDataOutcome {
    /// Nothing more to send; the engine reads the next packet expecting
    /// OK, ERR, or an auth switch.
    Done,
    /// Write this payload, then read another server packet.
    Continue(Vec<u8>),
}

/// Context a mechanism needs beyond the salt/password the engine already
/// threads through every call (spec §6.5's options surface, narrowed to
/// what the mechanisms themselves consult).
pub struct MechanismContext<'a> {
    pub transport: &'a mut dyn PacketTransport,
    pub transport_is_secure: bool,
    pub sha2_public_key_path: Option<&'a str>,
    pub username: &'a str,
}

/// Per-attempt mechanism state (spec §3, `session_mechanism_driver`).
/// Stateless mechanisms carry no payload; SASL keeps its exchange state
/// here across rounds.
pub enum Mechanism {
    Native,
    ClearPassword,
    #[cfg(feature = "sha256")]
    Sha256,
    CachingSha2,
    #[cfg(feature = "ldap-sasl")]
    LdapSasl(Option<crate::sasl::ScramClient>),
}

impl Mechanism {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            native::NAME => Some(Mechanism::Native),
            clear::NAME => Some(Mechanism::ClearPassword),
            #[cfg(feature = "sha256")]
            sha256::NAME => Some(Mechanism::Sha256),
            caching_sha2::NAME => Some(Mechanism::CachingSha2),
            #[cfg(feature = "ldap-sasl")]
            ldap_sasl::NAME => Some(Mechanism::LdapSasl(None)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Mechanism::Native => native::NAME,
            Mechanism::ClearPassword => clear::NAME,
            #[cfg(feature = "sha256")]
            Mechanism::Sha256 => sha256::NAME,
            Mechanism::CachingSha2 => caching_sha2::NAME,
            #[cfg(feature = "ldap-sasl")]
            Mechanism::LdapSasl(_) => ldap_sasl::NAME,
        }
    }

    pub fn initial_response(
        &mut self,
        ctx: &mut MechanismContext,
        salt: &[u8],
        password: &[u8],
    ) -> Result<Vec<u8>> {
        match self {
            Mechanism::Native => native::scramble(password, salt),
            Mechanism::ClearPassword => Ok(clear::initial_response(password)),
            #[cfg(feature = "sha256")]
            Mechanism::Sha256 => sha256::initial_response(
                password,
                salt,
                ctx.transport_is_secure,
                ctx.sha2_public_key_path,
                &mut *ctx.transport,
            ),
            Mechanism::CachingSha2 => caching_sha2::scramble(password, salt),
            #[cfg(feature = "ldap-sasl")]
            Mechanism::LdapSasl(state) => {
                let (client, first) = ldap_sasl::start(ctx.username, password, salt)?;
                *state = Some(client);
                Ok(first)
            }
        }
    }

    pub fn handle_more_data(
        &mut self,
        ctx: &mut MechanismContext,
        data: &[u8],
        salt: &[u8],
        password: &[u8],
    ) -> Result<MoreDataOutcome> {
        match self {
            Mechanism::CachingSha2 => caching_sha2::handle_more_data(
                data,
                password,
                salt,
                ctx.transport_is_secure,
                ctx.sha2_public_key_path,
                &mut *ctx.transport,
            ),
            #[cfg(feature = "ldap-sasl")]
            Mechanism::LdapSasl(state) => {
                let client = state
                    .as_mut()
                    .expect("handle_more_data called before initial_response");
                ldap_sasl::handle_more_data(client, data)
            }
            _ => Ok(MoreDataOutcome::Done),
        }
    }
}
