//! Packet codecs for the auth-related wire packets (spec §4.2, component C2).
//! All of these shapes are little-endian and ride on packets already
//! length-prefixed and sequence-numbered by the framing layer (spec §6.1);
//! nothing in this module touches a socket.

pub mod handshake;
pub mod primitive;
pub mod response;

pub use handshake::{
    read_auth_switch_request, write_auth_switch_response, write_change_user,
    write_handshake_response, write_ssl_request, AuthSwitchRequest, ChangeUserRequest,
    HandshakeResponse41,
};
pub use response::{read_server_reply, OkPayload, ServerReply};
