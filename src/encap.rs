//! ENIP encapsulation layer: RegisterSession, ForwardOpen, and the
//! SendUnitData frame used to mirror cyclic frames over TCP.
//!
//! This module deliberately does not implement general ENIP/CIP: the
//! ForwardOpen request is an opaque canned template (full protocol
//! conformance is out of scope), only its session-handle patch point and
//! its reply are understood.

use crate::cpf;
use crate::error::{Error, Result};
use crate::wire::{hex_bytes, read_u16_le, read_u32_le, write_u32_le};
use std::io::{Read, Write};
use std::net::TcpStream;

const CMD_REGISTER_SESSION: u16 = 0x0065;
const CMD_SEND_UNIT_DATA: u16 = 0x0070;

/// CIP reply item type: Unconnected Data.
const CIP_ITEM_UNCONNECTED_DATA: u16 = 0x00B2;
/// CIP reply item type: Connected Data.
const CIP_ITEM_CONNECTED_DATA: u16 = 0x00B0;

/// Fixed 28-byte RegisterSession request: encapsulation header (command
/// 0x0065, length 4, session 0, status 0, 8-byte sender context, options 0)
/// followed by the 4-byte command-specific payload `{version=1, options=0}`.
fn register_session_request() -> Vec<u8> {
    hex_bytes("65000400000000000000000000000000000000000000000001000000")
}

/// Canned ForwardOpen request template (encapsulation header + CIP service
/// request). Bytes 4..8 (the session handle field) are patched in before
/// sending; the rest is opaque.
fn forward_open_request_template() -> Vec<u8> {
    hex_bytes(
        "6f004a000100000000000000000000000100008000000000000000000000020000000000b2003a00\
         540220062401059c0000000001400100020001003814947002000000102700002e48102700003a48\
         01083404bb002b00e613810120042c652c64",
    )
}

/// Send RegisterSession over `stream` and return the 32-bit session handle.
///
/// A zero handle, or a reply shorter than 8 bytes, is a handshake failure.
pub fn register_session(stream: &mut TcpStream) -> Result<u32> {
    stream.write_all(&register_session_request())?;
    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf)?;
    let reply = &buf[..n];

    let handle = if reply.len() >= 8 {
        read_u32_le(reply, 4).unwrap_or(0)
    } else {
        0
    };

    if handle == 0 {
        return Err(Error::Handshake("RegisterSession returned a zero session handle".into()));
    }
    Ok(handle)
}

/// Send ForwardOpen (patched with `session`) over `stream` and return the
/// O->T connection id extracted from the reply.
pub fn forward_open(stream: &mut TcpStream, session: u32) -> Result<u32> {
    let mut req = forward_open_request_template();
    write_u32_le(&mut req, 4, session);
    stream.write_all(&req)?;

    let mut buf = [0u8; 8192];
    let n = stream.read(&mut buf)?;
    let reply = &buf[..n];

    let conn_id = parse_forward_open_reply(reply)
        .ok_or_else(|| Error::Handshake("ForwardOpen reply could not be parsed".into()))?;
    if conn_id == 0 {
        return Err(Error::Handshake("ForwardOpen returned a zero connection id".into()));
    }
    Ok(conn_id)
}

/// Decode a ForwardOpen reply and return the O->T connection id, or `None`
/// if the reply is malformed or the CIP general status is non-zero.
///
/// Steps:
/// 1. Encapsulation header: command, length `ln`, session, status (LE);
///    status != 0 is failure.
/// 2. Reply body is the next `ln` bytes; skip 6 bytes (interface handle +
///    timeout), then a `u16` item count.
/// 3. Iterate `{u16 type, u16 length, bytes data}` items; capture the CIP
///    reply from the first Unconnected (0x00B2) or Connected (0x00B0) item.
/// 4. In the CIP reply: byte 1 is the path word count; skip
///    `2 + 2*path_words` bytes to the general-status byte (must be 0); skip
///    `2 + 2*additional_status_words` more bytes; the next 4 bytes LE are
///    the connection id.
pub fn parse_forward_open_reply(reply: &[u8]) -> Option<u32> {
    if reply.len() < 24 {
        return None;
    }
    let length = read_u16_le(reply, 2)? as usize;
    let status = read_u32_le(reply, 8)?;
    if status != 0 || reply.len() < 24 + length {
        return None;
    }
    let body = &reply[24..24 + length];
    if body.len() < 8 {
        return None;
    }
    let item_count = read_u16_le(body, 6)?;

    let mut offset = 8usize;
    let mut cip_reply: Option<&[u8]> = None;
    for _ in 0..item_count {
        let item_type = read_u16_le(body, offset)?;
        let item_len = read_u16_le(body, offset + 2)? as usize;
        offset += 4;
        let data = body.get(offset..offset + item_len)?;
        offset += item_len;
        if item_type == CIP_ITEM_UNCONNECTED_DATA || item_type == CIP_ITEM_CONNECTED_DATA {
            cip_reply = Some(data);
        }
    }

    let cip = cip_reply?;
    if cip.len() < 2 {
        return None;
    }
    let path_words = cip[1] as usize;
    let mut pos = 2 + 2 * path_words;
    if pos + 2 > cip.len() {
        return None;
    }
    let general_status = cip[pos];
    let additional_status_words = cip[pos + 1] as usize;
    pos += 2 + 2 * additional_status_words;
    if general_status != 0 || pos + 4 > cip.len() {
        return None;
    }
    read_u32_le(cip, pos)
}

/// Wrap a CPF frame as a SendUnitData encapsulation and send it over
/// `stream` -- used only when mirroring cyclic frames over TCP for
/// diagnostics.
pub fn send_unit_data(stream: &mut TcpStream, session: u32, cpf_frame: &[u8]) -> Result<()> {
    let mut payload = Vec::with_capacity(8 + cpf_frame.len());
    payload.extend_from_slice(&0u32.to_le_bytes()); // interface handle
    payload.extend_from_slice(&0u16.to_le_bytes()); // timeout
    payload.extend_from_slice(&2u16.to_le_bytes()); // item count (mirrors cpf's own count)
    payload.extend_from_slice(cpf_frame);

    let mut encap = Vec::with_capacity(24 + payload.len());
    encap.extend_from_slice(&CMD_SEND_UNIT_DATA.to_le_bytes());
    encap.extend_from_slice(&(payload.len() as u16).to_le_bytes());
    encap.extend_from_slice(&session.to_le_bytes());
    encap.extend_from_slice(&0u32.to_le_bytes()); // status
    encap.extend_from_slice(&[0u8; 8]); // sender context
    encap.extend_from_slice(&0u32.to_le_bytes()); // options
    encap.extend_from_slice(&payload);

    stream.write_all(&encap)?;
    Ok(())
}

// Referenced so `cargo doc`/clippy see the relationship between the mirror
// frame and the CPF item-count convention it reuses (item count 2: address
// + connected data), without duplicating the constant here.
const _: u16 = cpf::ITEM_CONNECTED_DATA;

#[cfg(test)]
mod tests {
    use super::*;

    fn build_forward_open_reply(status: u32, item_type: u16, general_status: u8, conn_id: u32) -> Vec<u8> {
        // CIP reply: service(1) + reserved(1) + general_status(1) + ext_status_size(1) + conn_id(4)
        let cip_reply = {
            let mut c = vec![0xCBu8, 0x00, general_status, 0x00];
            c.extend_from_slice(&conn_id.to_le_bytes());
            c
        };

        let mut body = Vec::new();
        body.extend_from_slice(&[0u8; 6]); // interface handle + timeout
        body.extend_from_slice(&1u16.to_le_bytes()); // item count
        body.extend_from_slice(&item_type.to_le_bytes());
        body.extend_from_slice(&(cip_reply.len() as u16).to_le_bytes());
        body.extend_from_slice(&cip_reply);

        let mut encap = Vec::new();
        encap.extend_from_slice(&0x006Fu16.to_le_bytes()); // command
        encap.extend_from_slice(&(body.len() as u16).to_le_bytes());
        encap.extend_from_slice(&0x1122_3344u32.to_le_bytes()); // session
        encap.extend_from_slice(&status.to_le_bytes());
        encap.extend_from_slice(&[0u8; 8]);
        encap.extend_from_slice(&0u32.to_le_bytes());
        encap.extend_from_slice(&body);
        encap
    }

    #[test]
    fn parses_connection_id_from_unconnected_data_item() {
        let reply = build_forward_open_reply(0, CIP_ITEM_UNCONNECTED_DATA, 0, 0x0A0B_0C0D);
        assert_eq!(parse_forward_open_reply(&reply), Some(0x0A0B_0C0D));
    }

    #[test]
    fn parses_connection_id_from_connected_data_item() {
        let reply = build_forward_open_reply(0, CIP_ITEM_CONNECTED_DATA, 0, 0x0102_0304);
        assert_eq!(parse_forward_open_reply(&reply), Some(0x0102_0304));
    }

    #[test]
    fn rejects_non_zero_encapsulation_status() {
        let reply = build_forward_open_reply(1, CIP_ITEM_UNCONNECTED_DATA, 0, 0x0A0B_0C0D);
        assert_eq!(parse_forward_open_reply(&reply), None);
    }

    #[test]
    fn rejects_non_zero_general_status() {
        let reply = build_forward_open_reply(0, CIP_ITEM_UNCONNECTED_DATA, 0x08, 0x0A0B_0C0D);
        assert_eq!(parse_forward_open_reply(&reply), None);
    }

    #[test]
    fn register_session_request_has_expected_shape() {
        let req = register_session_request();
        assert_eq!(req.len(), 28);
        assert_eq!(read_u16_le(&req, 0), Some(CMD_REGISTER_SESSION));
        assert_eq!(read_u16_le(&req, 2), Some(4));
    }

    #[test]
    fn forward_open_request_patches_session_handle() {
        let mut req = forward_open_request_template();
        write_u32_le(&mut req, 4, 0x1122_3344);
        assert_eq!(read_u32_le(&req, 4), Some(0x1122_3344));
    }
}
