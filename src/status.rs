//! Fixed-I/O status word decoding and offset auto-detection.

use crate::config::FIXED_IO_OFFSET_CANDIDATES;
use crate::wire::read_u16_le;

const BIT_SEQ_BSY: u16 = 1 << 0;
const BIT_MOVE: u16 = 1 << 1;
const BIT_IN_POS: u16 = 1 << 2;
const BIT_START_R: u16 = 1 << 3;
const BIT_HOME_END: u16 = 1 << 4;
const BIT_READY: u16 = 1 << 5;
const BIT_DCMD_RDY: u16 = 1 << 6;
const BIT_ALM_A: u16 = 1 << 7;

/// Mask used for offset auto-detection: a candidate offset "qualifies" if
/// any of MOVE, IN-POS, or READY is set there.
const AUTO_DETECT_MASK: u16 = BIT_MOVE | BIT_IN_POS | BIT_READY;

/// Decoded view of the 16-bit little-endian Fixed-I/O status word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FixedIoBits {
    pub raw: u16,
}

impl FixedIoBits {
    pub fn seq_bsy(self) -> bool {
        self.raw & BIT_SEQ_BSY != 0
    }
    pub fn move_(self) -> bool {
        self.raw & BIT_MOVE != 0
    }
    pub fn in_pos(self) -> bool {
        self.raw & BIT_IN_POS != 0
    }
    pub fn start_r(self) -> bool {
        self.raw & BIT_START_R != 0
    }
    pub fn home_end(self) -> bool {
        self.raw & BIT_HOME_END != 0
    }
    pub fn ready(self) -> bool {
        self.raw & BIT_READY != 0
    }
    pub fn dcmd_rdy(self) -> bool {
        self.raw & BIT_DCMD_RDY != 0
    }
    pub fn alm_a(self) -> bool {
        self.raw & BIT_ALM_A != 0
    }

    /// 16-character MSB->LSB bit string, e.g. for `debug_snapshot`.
    pub fn bit_string(self) -> String {
        (0..16)
            .rev()
            .map(|i| if self.raw & (1 << i) != 0 { '1' } else { '0' })
            .collect()
    }
}

/// Maintains the most recently observed T->O application bytes and decodes
/// the Fixed-I/O status word from them, auto-detecting its offset.
///
/// Once an offset is locked in it never changes -- `update` only probes for
/// a new offset while `offset` is still `None`.
#[derive(Debug, Default)]
pub struct StatusDecoder {
    last_app: Vec<u8>,
    offset: Option<usize>,
}

impl StatusDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a decoder with a pinned offset (bypassing auto-detection).
    pub fn with_offset(offset: usize) -> Self {
        Self {
            last_app: Vec::new(),
            offset: Some(offset),
        }
    }

    /// Record newly received application bytes and, if the offset is not
    /// yet known, attempt to auto-detect it.
    pub fn update(&mut self, app: &[u8]) {
        self.last_app = app.to_vec();
        if self.offset.is_none() {
            self.offset = Self::auto_detect(&self.last_app);
        }
    }

    /// The locked-in offset, if any (irrespective of the fallback used by
    /// `fixed_out` while still probing).
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// The offset used for reads right now: the locked-in one, or the
    /// default candidate while still probing.
    pub fn effective_offset(&self) -> usize {
        self.offset.unwrap_or(FIXED_IO_OFFSET_CANDIDATES[0])
    }

    /// The most recently stored application bytes.
    pub fn last_app(&self) -> &[u8] {
        &self.last_app
    }

    /// Decode the Fixed-I/O word at the effective offset. Returns a
    /// zero word if the stored bytes are too short.
    pub fn fixed_out(&self) -> FixedIoBits {
        let raw = read_u16_le(&self.last_app, self.effective_offset()).unwrap_or(0);
        FixedIoBits { raw }
    }

    pub fn in_pos(&self) -> bool {
        self.fixed_out().in_pos()
    }

    pub fn move_(&self) -> bool {
        self.fixed_out().move_()
    }

    pub fn ready(&self) -> bool {
        self.fixed_out().ready()
    }

    fn auto_detect(bytes: &[u8]) -> Option<usize> {
        FIXED_IO_OFFSET_CANDIDATES.into_iter().find(|&offset| {
            read_u16_le(bytes, offset)
                .map(|word| word & AUTO_DETECT_MASK != 0)
                .unwrap_or(false)
        })
    }
}
