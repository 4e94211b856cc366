//! Literal 44-byte O->T command payloads.
//!
//! These are configuration, not protocol logic: the core never inspects
//! their bit layout beyond treating them as opaque 44-byte blobs. The
//! values below are transcribed from the drive's vendor packet captures.
//!
//! OP_1 selects operation 0 (bytes 6..7 = `0000`); OP_2 selects operation 1
//! (bytes 6..7 = `0100`). The Fixed I/O (IN) command word itself sits at
//! bytes 8..9 in these transcribed blobs; the core never reads this offset
//! (the blobs are opaque to it either way).

use crate::config::O2T_APP_SIZE;
use crate::wire::hex_bytes;

fn payload(hex: &str) -> [u8; O2T_APP_SIZE] {
    let bytes = hex_bytes(hex);
    assert_eq!(bytes.len(), O2T_APP_SIZE, "command payload must be {O2T_APP_SIZE} bytes");
    let mut out = [0u8; O2T_APP_SIZE];
    out.copy_from_slice(&bytes);
    out
}

/// Forward-jog: Fixed I/O (IN) bit0 = FW-JOG.
pub fn jog() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 0100 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// Stop: Fixed I/O (IN) bit5 = STOP.
pub fn stop() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 2000 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// Start operation 1 (operation-select = 0, bit3 = START).
pub fn op_1() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 0800 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// Start operation 2 (operation-select = 1, bit3 = START).
pub fn op_2() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0100 0800 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// Free (servo-off): Fixed I/O (IN) bit6 = FREE.
pub fn free() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 4000 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// Trigger: a one-shot strobe distinct from STOP/FREE/JOG/START (bit
/// pattern chosen to not collide with any command bit already assigned
/// above).
pub fn trigger() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 8000 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// De-trigger: clears the trigger strobe.
pub fn de_trigger() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 0000 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}

/// No-op: all command bits clear, equivalent to de-trigger but kept as a
/// distinct named constant since callers reach for it to mean "assert
/// nothing" rather than "clear the trigger specifically".
pub fn no_op() -> [u8; O2T_APP_SIZE] {
    payload(
        "01000000 0000 0000 0000 0000 \
         00000000 00000000 00000000 00000000 \
         0000 0000 0000 0000 0000 0000 0000 0000",
    )
}
