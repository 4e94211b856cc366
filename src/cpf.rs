//! Common Packet Format (CPF) codec for the Class-1 implicit I/O frames.
//!
//! CPF is an item-list encoding: a `u16` item count followed by that many
//! `{u16 type, u16 length, bytes data}` records. This module only builds
//! and parses the two item types the O<->T stream uses -- it is not a
//! general CPF library (no Forward-Close, unconnected-message, or other
//! item types).

use crate::wire::read_u16_le;

/// CPF item type: Sequenced Address (O->T connection id + SAI sequence).
pub const ITEM_SEQUENCED_ADDRESS: u16 = 0x8002;
/// CPF item type: Connected (Transport Packet) Data.
pub const ITEM_CONNECTED_DATA: u16 = 0x00B1;

/// Build the O->T CPF frame for one cyclic transmission.
///
/// Layout: item count (2), Sequenced Address item (conn id, SAI sequence,
/// reserved), Connected Data item (CTP sequence, application bytes).
pub fn build_o2t_frame(conn_id: u32, seq_ctp: u16, seq_sai: u16, app: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 4 + 8 + 4 + 2 + app.len());
    out.extend_from_slice(&2u16.to_le_bytes());

    out.extend_from_slice(&ITEM_SEQUENCED_ADDRESS.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&conn_id.to_le_bytes());
    out.extend_from_slice(&seq_sai.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());

    out.extend_from_slice(&ITEM_CONNECTED_DATA.to_le_bytes());
    out.extend_from_slice(&((2 + app.len()) as u16).to_le_bytes());
    out.extend_from_slice(&seq_ctp.to_le_bytes());
    out.extend_from_slice(app);

    out
}

/// Parse a T->O CPF frame and return the application bytes (with the
/// leading 2-byte CTP sequence stripped).
///
/// Falls back to treating `pkt[2..]` as `[ctp_seq, app...]` when the item
/// list can't be parsed but the packet is at least 2 bytes long, matching
/// the original listener's tolerance for malformed/partial frames. Returns
/// `None` only when there is nothing usable at all.
pub fn parse_t2o_frame(pkt: &[u8]) -> Option<Vec<u8>> {
    if let Some(app) = parse_cpf_strict(pkt) {
        return Some(app);
    }
    if pkt.len() >= 2 {
        return Some(pkt[2..].to_vec());
    }
    None
}

fn parse_cpf_strict(pkt: &[u8]) -> Option<Vec<u8>> {
    let item_count = read_u16_le(pkt, 0)?;
    if !(1..=8).contains(&item_count) {
        return None;
    }

    let mut offset = 2usize;
    for _ in 0..item_count {
        let item_type = read_u16_le(pkt, offset)?;
        let item_len = read_u16_le(pkt, offset + 2)? as usize;
        offset += 4;
        let data = pkt.get(offset..offset + item_len)?;
        offset += item_len;

        if item_type == ITEM_CONNECTED_DATA && item_len >= 2 {
            return Some(data[2..].to_vec());
        }
    }
    None
}
