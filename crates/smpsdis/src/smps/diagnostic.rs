//! Recoverable conditions met while disassembling.
//!
//! None of these stop a disassembly. Each one is logged with `tracing`
//! where it happens and collected on the result so callers (and tests) can
//! inspect what was skipped or patched over.
use std::fmt;

use crate::smps::track::TrackClass;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Coordination flag (or `0xFF` sub-command) not defined by the dialect.
    UnknownOpcode {
        opcode: u8,
        sub: Option<u8>,
        offset: usize,
    },
    /// The input ended in the middle of an instruction.
    Truncated { opcode: u8, offset: usize },
    /// The voice table ended before every referenced voice was read.
    TruncatedVoices {
        address: usize,
        produced: usize,
        requested: usize,
    },
    /// A sound effect channel header whose playback-control byte is not `0x80`.
    UnexpectedPlaybackControl { channel: usize, value: u8 },
    /// A claim whose address lies outside the input.
    ClaimOutOfRange { address: usize, class: TrackClass },
    /// An instruction at `offset` whose operands run into bytes already
    /// decoded from `overlap` on. Its own bytes are kept as raw data.
    OverlappingInstruction {
        opcode: u8,
        offset: usize,
        overlap: usize,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownOpcode {
                opcode,
                sub: Some(sub),
                offset,
            } => write!(
                f,
                "unknown meta sub-command 0x{:02X} 0x{:02X} at offset 0x{:04X}",
                opcode, sub, offset
            ),
            Diagnostic::UnknownOpcode {
                opcode,
                sub: None,
                offset,
            } => write!(
                f,
                "unknown coordination flag 0x{:02X} at offset 0x{:04X}",
                opcode, offset
            ),
            Diagnostic::Truncated { opcode, offset } => write!(
                f,
                "instruction 0x{:02X} at offset 0x{:04X} runs past the end of input",
                opcode, offset
            ),
            Diagnostic::TruncatedVoices {
                address,
                produced,
                requested,
            } => write!(
                f,
                "voice table at 0x{:04X} truncated: {} of {} voices decoded",
                address, produced, requested
            ),
            Diagnostic::UnexpectedPlaybackControl { channel, value } => write!(
                f,
                "sfx channel {} has playback control 0x{:02X} (expected 0x80)",
                channel, value
            ),
            Diagnostic::ClaimOutOfRange { address, class } => write!(
                f,
                "{:?} entry at 0x{:X} lies outside the input",
                class, address
            ),
            Diagnostic::OverlappingInstruction {
                opcode,
                offset,
                overlap,
            } => write!(
                f,
                "instruction 0x{:02X} at offset 0x{:04X} overlaps code decoded at 0x{:04X}",
                opcode, offset, overlap
            ),
        }
    }
}
