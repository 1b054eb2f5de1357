//! Bounds-checked byte readers shared by the header, voice and track decoders.
use std::fmt;

/// Hard failures while reading SMPS data.
///
/// Most malformed input is reported as a [`crate::smps::Diagnostic`] and
/// decoding carries on; these errors are reserved for data the
/// disassembler cannot start from at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A read of `needed` bytes at `offset` ran past the input.
    ///
    /// `available` is the input length, or the bytes left after `offset` for
    /// slice reads. `context` names the structure being read, such as
    /// `"bank pointer table"`.
    OffsetOutOfRange {
        offset: usize,
        needed: usize,
        available: usize,
        context: Option<String>,
    },

    /// The engine version number is not one of the supported dialects.
    UnsupportedVersion(u8),

    /// The song header, or one of its channel entries, does not fit in the input.
    HeaderTooShort(String),

    Other(String),
}

impl ParseError {
    /// Attach a context string to an `OffsetOutOfRange` error.
    ///
    /// Other variants are returned unchanged.
    pub fn with_context(self, ctx: &str) -> Self {
        match self {
            ParseError::OffsetOutOfRange {
                offset,
                needed,
                available,
                context: None,
            } => ParseError::OffsetOutOfRange {
                offset,
                needed,
                available,
                context: Some(ctx.into()),
            },
            other => other,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::OffsetOutOfRange {
                offset,
                needed,
                available,
                context,
            } => {
                if let Some(ctx) = context {
                    write!(
                        f,
                        "offset out of range at {}: 0x{:X} (needed {} bytes, available {})",
                        ctx, offset, needed, available
                    )
                } else {
                    write!(
                        f,
                        "offset out of range: 0x{:X} (needed {} bytes, available {})",
                        offset, needed, available
                    )
                }
            }
            ParseError::UnsupportedVersion(v) => write!(f, "unsupported SMPS version: {}", v),
            ParseError::HeaderTooShort(name) => write!(f, "header too short: {}", name),
            ParseError::Other(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for ParseError {}

/// Byte at `off`, or `OffsetOutOfRange` past the end of `bytes`.
pub fn read_u8_at(bytes: &[u8], off: usize) -> Result<u8, ParseError> {
    bytes.get(off).copied().ok_or(ParseError::OffsetOutOfRange {
        offset: off,
        needed: 1,
        available: bytes.len(),
        context: None,
    })
}

/// Read a 16-bit big-endian unsigned integer from `bytes` at `off`.
pub fn read_u16_be_at(bytes: &[u8], off: usize) -> Result<u16, ParseError> {
    let s = read_array::<2>(bytes, off)?;
    Ok(u16::from_be_bytes(s))
}

/// Little-endian counterpart of [`read_u16_be_at`].
///
/// Pointer tables of the Z80 drivers are stored this way.
pub fn read_u16_le_at(bytes: &[u8], off: usize) -> Result<u16, ParseError> {
    let s = read_array::<2>(bytes, off)?;
    Ok(u16::from_le_bytes(s))
}

/// Copy `N` bytes starting at `off` into a fixed-size array.
///
/// Returns `Err(ParseError::OffsetOutOfRange)` when fewer than `N` bytes
/// remain.
pub fn read_array<const N: usize>(bytes: &[u8], off: usize) -> Result<[u8; N], ParseError> {
    let s = read_slice(bytes, off, N)?;
    let mut tmp = [0u8; N];
    tmp.copy_from_slice(s);
    Ok(tmp)
}

/// Borrow `len` bytes starting at `off`.
pub fn read_slice(bytes: &[u8], off: usize, len: usize) -> Result<&[u8], ParseError> {
    match off.checked_add(len) {
        Some(end) if end <= bytes.len() => Ok(&bytes[off..end]),
        _ => Err(ParseError::OffsetOutOfRange {
            offset: off,
            needed: len,
            available: bytes.len().saturating_sub(off),
            context: Some("read_slice".into()),
        }),
    }
}
