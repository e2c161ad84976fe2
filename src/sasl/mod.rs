//! Multi-round SASL client scaffolding, used only by
//! `authentication_ldap_sasl_client` (spec §4.7, component C7). Real
//! Kerberos/GSSAPI SASL mechanisms are not implemented; only the
//! SCRAM-SHA-1 and SCRAM-SHA-256 profiles are (spec §1, Non-goals).

mod scram;

pub use scram::{ScramClient, ScramVariant};
