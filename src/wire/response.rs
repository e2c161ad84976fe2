//! The packet the client reads after sending an auth response: OK, ERR,
//! EOF-as-AuthSwitch, AuthMoreData, or the pre-4.1 "old password" sentinel
//! (spec §4.2, §6.3).

use crate::error::{Error, Result};
use crate::wire::handshake::AuthSwitchRequest;
use crate::wire::primitive::*;

#[derive(Debug, Clone)]
pub struct OkPayload {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
}

/// The discriminated shapes a client can receive while authenticating.
#[derive(Debug, Clone)]
pub enum ServerReply {
    Ok(OkPayload),
    Err {
        error_code: u16,
        sql_state: String,
        message: String,
    },
    AuthSwitch(AuthSwitchRequest),
    /// `0xFE` with no following plugin name: the pre-4.1 legacy auth request
    /// (spec §4.5, "Old-password sentinel").
    OldAuthSentinel,
    /// `0x01` followed by a mechanism-specific body.
    AuthMoreData(Vec<u8>),
}

fn read_int_lenenc(data: &[u8]) -> Result<(u64, &[u8])> {
    let (tag, rest) = read_int_1(data)?;
    match tag {
        0xfc => {
            let (v, rest) = read_int_2(rest)?;
            Ok((v as u64, rest))
        }
        0xfd => {
            let (bytes, rest) = read_string_fix(rest, 3)?;
            Ok((u32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]) as u64, rest))
        }
        0xfe => {
            let (bytes, rest) = read_string_fix(rest, 8)?;
            Ok((u64::from_le_bytes(bytes.try_into().unwrap()), rest))
        }
        v => Ok((v as u64, rest)),
    }
}

fn parse_ok(payload: &[u8]) -> Result<OkPayload> {
    let (_header, data) = read_int_1(payload)?;
    let (affected_rows, data) = read_int_lenenc(data)?;
    let (last_insert_id, data) = read_int_lenenc(data)?;
    let (status_flags, data) = read_int_2(data)?;
    let (warnings, _data) = read_int_2(data)?;
    Ok(OkPayload {
        affected_rows,
        last_insert_id,
        status_flags,
        warnings,
    })
}

fn parse_err(payload: &[u8]) -> Result<(u16, String, String)> {
    let (_header, data) = read_int_1(payload)?;
    let (error_code, data) = read_int_2(data)?;
    let (_marker, data) = read_string_fix(data, 1)?;
    let (sql_state, data) = read_string_fix(data, 5)?;
    Ok((
        error_code,
        String::from_utf8_lossy(sql_state).into_owned(),
        String::from_utf8_lossy(data).into_owned(),
    ))
}

/// Parses one packet read after an auth response was written (spec §6.3).
///
/// `0xFE` is ambiguous between an `AuthSwitchRequest` and the legacy
/// old-password sentinel: a plugin name is present iff the payload carries
/// more than the single header byte.
pub fn read_server_reply(payload: &[u8]) -> Result<ServerReply> {
    if payload.is_empty() {
        return Err(Error::UnexpectedEof);
    }
    match payload[0] {
        0x00 => Ok(ServerReply::Ok(parse_ok(payload)?)),
        0xff => {
            let (error_code, sql_state, message) = parse_err(payload)?;
            Ok(ServerReply::Err {
                error_code,
                sql_state,
                message,
            })
        }
        0xfe if payload.len() == 1 => Ok(ServerReply::OldAuthSentinel),
        0xfe => {
            let (_header, data) = read_int_1(payload)?;
            let (plugin_name, data) = read_string_null(data)?;
            Ok(ServerReply::AuthSwitch(AuthSwitchRequest {
                plugin_name: String::from_utf8_lossy(plugin_name).into_owned(),
                plugin_data: data.to_vec(),
            }))
        }
        0x01 => Ok(ServerReply::AuthMoreData(payload[1..].to_vec())),
        _ => Err(Error::InvalidPacket),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ok_packet() {
        let payload = [0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];
        match read_server_reply(&payload).unwrap() {
            ServerReply::Ok(ok) => assert_eq!(ok.affected_rows, 0),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn parses_err_packet() {
        let mut payload = vec![0xff, 0x15, 0x04, b'#'];
        payload.extend_from_slice(b"28000");
        payload.extend_from_slice(b"Access denied");
        match read_server_reply(&payload).unwrap() {
            ServerReply::Err {
                error_code,
                sql_state,
                message,
            } => {
                assert_eq!(error_code, 0x0415);
                assert_eq!(sql_state, "28000");
                assert_eq!(message, "Access denied");
            }
            other => panic!("expected Err, got {other:?}"),
        }
    }

    #[test]
    fn distinguishes_auth_switch_from_old_auth_sentinel() {
        assert!(matches!(
            read_server_reply(&[0xfe]).unwrap(),
            ServerReply::OldAuthSentinel
        ));

        let mut payload = vec![0xfe];
        payload.extend_from_slice(b"mysql_native_password\0");
        payload.extend_from_slice(&[1u8; 20]);
        match read_server_reply(&payload).unwrap() {
            ServerReply::AuthSwitch(req) => {
                assert_eq!(req.plugin_name, "mysql_native_password");
                assert_eq!(req.plugin_data.len(), 20);
            }
            other => panic!("expected AuthSwitch, got {other:?}"),
        }
    }

    #[test]
    fn parses_auth_more_data() {
        match read_server_reply(&[0x01, 0x04]).unwrap() {
            ServerReply::AuthMoreData(body) => assert_eq!(body, vec![0x04]),
            other => panic!("expected AuthMoreData, got {other:?}"),
        }
    }
}
