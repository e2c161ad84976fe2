//! The collaborator the negotiation engine drives for all I/O (spec §6.1).
//! Length-prefixing, sequence numbers, and the TLS handshake itself live on
//! the implementor's side of this trait; nothing in this crate opens a
//! socket.

use crate::error::Result;

/// Parameters for an in-place TLS upgrade. Certificate verification policy
/// belongs to the implementor; the auth driver only decides *whether* to
/// call [`PacketTransport::upgrade_to_tls`] (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct TlsOptions {
    pub server_name: Option<String>,
}

pub trait PacketTransport {
    /// Sends one packet body; the implementor prefixes length and sequence id.
    fn write_packet(&mut self, payload: &[u8]) -> Result<()>;

    /// Reads one packet body with its length/sequence framing stripped.
    fn read_packet(&mut self) -> Result<Vec<u8>>;

    /// Upgrades the underlying connection to TLS in place.
    fn upgrade_to_tls(&mut self, options: &TlsOptions) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::collections::VecDeque;

    /// A scripted transport: queue up server packets to read, then
    /// inspect `writes` afterward. No real I/O or TLS.
    #[derive(Default)]
    pub struct MockTransport {
        pub inbound: VecDeque<Vec<u8>>,
        pub writes: Vec<Vec<u8>>,
        pub tls_upgrades: usize,
    }

    impl MockTransport {
        pub fn with_replies(replies: Vec<Vec<u8>>) -> Self {
            Self {
                inbound: replies.into(),
                writes: Vec::new(),
                tls_upgrades: 0,
            }
        }
    }

    impl PacketTransport for MockTransport {
        fn write_packet(&mut self, payload: &[u8]) -> Result<()> {
            self.writes.push(payload.to_vec());
            Ok(())
        }

        fn read_packet(&mut self) -> Result<Vec<u8>> {
            self.inbound
                .pop_front()
                .ok_or(crate::error::Error::TransportGone)
        }

        fn upgrade_to_tls(&mut self, _options: &TlsOptions) -> Result<()> {
            self.tls_upgrades += 1;
            Ok(())
        }
    }
}
