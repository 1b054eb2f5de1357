//! SMPS song and sound effect headers.
//!
//! Music header layout (all pointers resolved with the dialect's header
//! pointer rule):
//!
//! ```text
//! +0  voice table pointer (2)
//! +2  FM channel count, DAC included (1)
//! +3  PSG channel count (1)
//! +4  tempo divider (1)
//! +5  tempo modifier (1)
//! +6  per FM channel: pointer (2), keydisp (1), volume (1); channel 0 is the DAC
//! ..  per PSG channel: pointer (2), keydisp (1), volume (1), modulation (1), tone (1)
//! ```
//!
//! Sound effect header layout:
//!
//! ```text
//! +0  voice table pointer (2)
//! +2  tempo divider (1)
//! +3  channel count (1)
//! +4  per channel: playback control (1), channel id (1), pointer (2), keydisp (1), volume (1)
//! ```
use crate::binutil::{ParseError, read_u8_at};
use crate::dialect::{DialectPolicy, EngineVersion};
use crate::smps::options::SongKind;
use crate::smps::track::TrackClass;

/// Voice pointer value meaning "use the driver's universal voice bank".
pub const UNIVERSAL_VOICE_BANK: u16 = 0x17D8;

/// Playback-control byte every sound effect channel is expected to carry.
pub const SFX_PLAYBACK_CONTROL: u8 = 0x80;

/// Hardware family driven by a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Dac,
    Fm,
    Psg,
}

impl ChannelKind {
    /// Class used to seed the channel's first claim.
    pub fn init_class(self) -> TrackClass {
        match self {
            ChannelKind::Dac => TrackClass::DacInit,
            ChannelKind::Fm => TrackClass::FmInit,
            ChannelKind::Psg => TrackClass::PsgInit,
        }
    }
}

/// Fields of a channel entry that depend on the header layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelExtra {
    /// Music DAC or FM channel.
    Music,
    /// Music PSG channel.
    Psg { mod_control: u8, tone: u8 },
    /// Sound effect channel.
    SoundEffect { playback_control: u8, channel_id: u8 },
}

/// One channel entry of a header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHeader {
    pub kind: ChannelKind,
    /// Label suffix (`DAC`, `FM1`, `PSG3`, ...).
    pub name: String,
    pub pointer: u16,
    pub address: usize,
    pub keydisp: i8,
    pub volume: u8,
    pub extra: ChannelExtra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    Music {
        fm_channels: u8,
        psg_channels: u8,
        tempo_modifier: u8,
    },
    SoundEffect {
        channel_count: u8,
    },
}

/// State of the voice table pointer after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoicePointer {
    /// Points inside the input.
    Local(usize),
    /// The pointer field is `0x0000`.
    Null,
    /// The song uses the driver's universal voice bank.
    Universal,
    /// Resolves outside the input.
    OutOfRange(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmpsHeader {
    /// Offset of the first header byte.
    pub start: usize,
    /// Offset of the first byte after the header.
    pub end: usize,
    pub voice_pointer: u16,
    pub voices: VoicePointer,
    pub tempo_divider: u8,
    pub layout: HeaderLayout,
    pub channels: Vec<ChannelHeader>,
}

impl SmpsHeader {
    pub fn kind(&self) -> SongKind {
        match self.layout {
            HeaderLayout::Music { .. } => SongKind::Music,
            HeaderLayout::SoundEffect { .. } => SongKind::SoundEffect,
        }
    }
}

/// Label suffix and hardware family of a sound effect channel id.
pub fn sfx_channel(channel_id: u8) -> (ChannelKind, String) {
    match channel_id {
        0x00 => (ChannelKind::Fm, "FM1".into()),
        0x01 => (ChannelKind::Fm, "FM2".into()),
        0x02 => (ChannelKind::Fm, "FM3".into()),
        0x04 => (ChannelKind::Fm, "FM4".into()),
        0x05 => (ChannelKind::Fm, "FM5".into()),
        0x06 => (ChannelKind::Fm, "FM6".into()),
        0x80 => (ChannelKind::Psg, "PSG1".into()),
        0xA0 => (ChannelKind::Psg, "PSG2".into()),
        0xC0 | 0xE0 => (ChannelKind::Psg, "PSG3".into()),
        id if id & 0x80 != 0 => (ChannelKind::Psg, format!("Ch{:02X}", id)),
        id => (ChannelKind::Fm, format!("Ch{:02X}", id)),
    }
}

/// SMPS2ASM constant for a sound effect channel id.
pub fn sfx_channel_constant(channel_id: u8) -> Option<&'static str> {
    match channel_id {
        0x00 => Some("cFM1"),
        0x01 => Some("cFM2"),
        0x02 => Some("cFM3"),
        0x04 => Some("cFM4"),
        0x05 => Some("cFM5"),
        0x06 => Some("cFM6"),
        0x80 => Some("cPSG1"),
        0xA0 => Some("cPSG2"),
        0xC0 => Some("cPSG3"),
        0xE0 => Some("cNoise"),
        _ => None,
    }
}

fn ensure_len(bytes: &[u8], offset: usize, size: usize, what: &str) -> Result<(), ParseError> {
    match offset.checked_add(size) {
        Some(end) if end <= bytes.len() => Ok(()),
        _ => Err(ParseError::HeaderTooShort(format!(
            "smps: {} (0x{:X} bytes at 0x{:X}, input is 0x{:X})",
            what,
            size,
            offset,
            bytes.len()
        ))),
    }
}

/// Parse the header at `offset`.
///
/// `base` is the caller base handed to
/// [`DialectPolicy::resolve_header_pointer`]. The voice pointer sentinels
/// (`0x0000`, and [`UNIVERSAL_VOICE_BANK`] for version 3) are recognised
/// here so later stages never try to read them.
pub fn parse_header(
    bytes: &[u8],
    offset: usize,
    kind: SongKind,
    version: EngineVersion,
    policy: DialectPolicy,
    base: isize,
) -> Result<SmpsHeader, ParseError> {
    ensure_len(bytes, offset, 4, "base header")?;

    let voice_pointer = policy.read_u16(bytes, offset)?;
    let voices = if voice_pointer == 0 {
        VoicePointer::Null
    } else if version == EngineVersion::V3 && voice_pointer == UNIVERSAL_VOICE_BANK {
        VoicePointer::Universal
    } else {
        let address = policy.resolve_header_pointer(voice_pointer, base);
        if address < bytes.len() {
            VoicePointer::Local(address)
        } else {
            VoicePointer::OutOfRange(address)
        }
    };

    let mut channels = Vec::new();
    let (layout, tempo_divider, end) = match kind {
        SongKind::Music => {
            ensure_len(bytes, offset, 6, "music header")?;
            let fm_channels = read_u8_at(bytes, offset + 2)?;
            let psg_channels = read_u8_at(bytes, offset + 3)?;
            let tempo_divider = read_u8_at(bytes, offset + 4)?;
            let tempo_modifier = read_u8_at(bytes, offset + 5)?;
            let size = 6 + 4 * fm_channels as usize + 6 * psg_channels as usize;
            ensure_len(bytes, offset, size, "music channel entries")?;

            let mut cur = offset + 6;
            for i in 0..fm_channels {
                let pointer = policy.read_u16(bytes, cur)?;
                let (kind, name) = if i == 0 {
                    (ChannelKind::Dac, "DAC".to_string())
                } else {
                    (ChannelKind::Fm, format!("FM{}", i))
                };
                channels.push(ChannelHeader {
                    kind,
                    name,
                    pointer,
                    address: policy.resolve_header_pointer(pointer, base),
                    keydisp: read_u8_at(bytes, cur + 2)? as i8,
                    volume: read_u8_at(bytes, cur + 3)?,
                    extra: ChannelExtra::Music,
                });
                cur += 4;
            }
            for i in 0..psg_channels {
                let pointer = policy.read_u16(bytes, cur)?;
                channels.push(ChannelHeader {
                    kind: ChannelKind::Psg,
                    name: format!("PSG{}", i + 1),
                    pointer,
                    address: policy.resolve_header_pointer(pointer, base),
                    keydisp: read_u8_at(bytes, cur + 2)? as i8,
                    volume: read_u8_at(bytes, cur + 3)?,
                    extra: ChannelExtra::Psg {
                        mod_control: read_u8_at(bytes, cur + 4)?,
                        tone: read_u8_at(bytes, cur + 5)?,
                    },
                });
                cur += 6;
            }
            (
                HeaderLayout::Music {
                    fm_channels,
                    psg_channels,
                    tempo_modifier,
                },
                tempo_divider,
                cur,
            )
        }
        SongKind::SoundEffect => {
            let tempo_divider = read_u8_at(bytes, offset + 2)?;
            let channel_count = read_u8_at(bytes, offset + 3)?;
            let size = 4 + 6 * channel_count as usize;
            ensure_len(bytes, offset, size, "sfx channel entries")?;

            let mut cur = offset + 4;
            for _ in 0..channel_count {
                let playback_control = read_u8_at(bytes, cur)?;
                let channel_id = read_u8_at(bytes, cur + 1)?;
                let pointer = policy.read_u16(bytes, cur + 2)?;
                let (kind, name) = sfx_channel(channel_id);
                channels.push(ChannelHeader {
                    kind,
                    name,
                    pointer,
                    address: policy.resolve_header_pointer(pointer, base),
                    keydisp: read_u8_at(bytes, cur + 4)? as i8,
                    volume: read_u8_at(bytes, cur + 5)?,
                    extra: ChannelExtra::SoundEffect {
                        playback_control,
                        channel_id,
                    },
                });
                cur += 6;
            }
            (
                HeaderLayout::SoundEffect { channel_count },
                tempo_divider,
                cur,
            )
        }
    };

    Ok(SmpsHeader {
        start: offset,
        end,
        voice_pointer,
        voices,
        tempo_divider,
        layout,
        channels,
    })
}
