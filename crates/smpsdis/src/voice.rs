//! FM voice records.
//!
//! A voice is a fixed 25-byte block of YM2612 operator parameters. The
//! layout is shared by every SMPS dialect:
//!
//! | Offset | Contents |
//! |--------|----------|
//! | 0      | feedback (bits 3-5) / algorithm (bits 0-2), bits 6-7 unused |
//! | 1-4    | detune (bits 4-6) / coarse frequency multiple (bits 0-3) |
//! | 5-8    | rate scaling (bits 6-7) / attack rate (bits 0-4) |
//! | 9-12   | amplitude modulation (bit 7) / first decay rate (bits 0-4) |
//! | 13-16  | second decay rate (bits 0-4) |
//! | 17-20  | decay level (bits 4-7) / release rate (bits 0-3) |
//! | 21-24  | total level (bits 0-6) |
//!
//! Operators are kept in the order they are stored in the record.
use tracing::warn;

use crate::binutil::{ParseError, read_array};

/// Size in bytes of one voice record.
pub const VOICE_SIZE: usize = 25;

/// One decoded FM voice record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FmVoice {
    pub raw: [u8; VOICE_SIZE],
}

impl FmVoice {
    pub fn algorithm(&self) -> u8 {
        self.raw[0] & 0x07
    }

    pub fn feedback(&self) -> u8 {
        (self.raw[0] >> 3) & 0x07
    }

    pub fn unused_bits(&self) -> u8 {
        self.raw[0] >> 6
    }

    fn operators(&self, group: usize) -> [u8; 4] {
        let start = 1 + group * 4;
        let mut ops = [0u8; 4];
        ops.copy_from_slice(&self.raw[start..start + 4]);
        ops
    }

    pub fn detune(&self) -> [u8; 4] {
        self.operators(0).map(|b| (b >> 4) & 0x07)
    }

    pub fn coarse_freq(&self) -> [u8; 4] {
        self.operators(0).map(|b| b & 0x0F)
    }

    pub fn rate_scale(&self) -> [u8; 4] {
        self.operators(1).map(|b| b >> 6)
    }

    pub fn attack_rate(&self) -> [u8; 4] {
        self.operators(1).map(|b| b & 0x1F)
    }

    pub fn amp_mod(&self) -> [u8; 4] {
        self.operators(2).map(|b| b >> 7)
    }

    pub fn decay_rate_1(&self) -> [u8; 4] {
        self.operators(2).map(|b| b & 0x1F)
    }

    pub fn decay_rate_2(&self) -> [u8; 4] {
        self.operators(3).map(|b| b & 0x1F)
    }

    pub fn decay_level(&self) -> [u8; 4] {
        self.operators(4).map(|b| b >> 4)
    }

    pub fn release_rate(&self) -> [u8; 4] {
        self.operators(4).map(|b| b & 0x0F)
    }

    pub fn total_level(&self) -> [u8; 4] {
        self.operators(5).map(|b| b & 0x7F)
    }
}

/// Parse one voice record at `off`.
pub fn parse_voice(bytes: &[u8], off: usize) -> Result<FmVoice, ParseError> {
    let raw = read_array::<VOICE_SIZE>(bytes, off)?;
    Ok(FmVoice { raw })
}

/// Result of reading a run of consecutive voice records.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceBatch {
    /// Decoded voices paired with their start address.
    pub voices: Vec<(usize, FmVoice)>,
    /// Number of records the caller asked for.
    pub requested: usize,
    /// Set when the input ended before `requested` records were read.
    pub truncated: Option<ParseError>,
}

/// Read up to `count` consecutive voice records starting at `address`.
///
/// Reading stops at the first record that does not fit in `bytes`; the
/// records decoded so far are kept and the error is reported in
/// [`VoiceBatch::truncated`].
pub fn read_voices(bytes: &[u8], address: usize, count: usize) -> VoiceBatch {
    let mut voices = Vec::with_capacity(count);
    let mut truncated = None;
    for index in 0..count {
        let off = address + index * VOICE_SIZE;
        match parse_voice(bytes, off) {
            Ok(v) => voices.push((off, v)),
            Err(e) => {
                warn!(
                    "voice table at 0x{:04X} truncated: produced {} of {} records ({})",
                    address,
                    voices.len(),
                    count,
                    e
                );
                truncated = Some(e);
                break;
            }
        }
    }
    VoiceBatch {
        voices,
        requested: count,
        truncated,
    }
}
