//! Instruction model: decoded events and the coordination-flag tables.
//!
//! Every byte of a track decodes to exactly one [`Event`]:
//!
//! - `0x00..=0x7F` is a duration,
//! - `0x80..=0xDF` is a note (`0x80` is the rest),
//! - `0xE0..=0xFF` is a coordination flag whose parameter shape depends on
//!   the engine version, see [`coord_flag_spec`] and [`meta_flag_spec`].
//!
//! Parameters of `0xFF` meta events (version 3) include the sub-command
//! byte as their first entry, so `FF 05 a b c d` is a [`EventKind::Meta5Params`].
use crate::dialect::EngineVersion;
use crate::voice::{FmVoice, VOICE_SIZE};

/// Coordination flags known to any of the dialects.
///
/// A flag only says *what* an event does; its byte value and parameter
/// shape come from the version tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordFlag {
    Pan,
    AlterNote,
    Detune,
    Nop,
    Fade,
    FadeIn,
    Return,
    ChanTempoDiv,
    AlterVol,
    NoAttack,
    NoteFill,
    ChangeTransposition,
    SetTempoMod,
    SetTempoDiv,
    PsgAlterVol,
    ClearPush,
    StopSpecial,
    SetVoice,
    ModSet,
    ModOn,
    Stop,
    PsgForm,
    ModOff,
    PsgVoice,
    Jump,
    Loop,
    Call,
    MaxRelRate,
    SpindashRev,
    PlayDacSample,
    ConditionalJump,
    FmICommand,
    FmICommandFm1,
    ModChange2,
    ModChange,
    ContinuousLoop,
    AlternateSmps,
    Fm3SpecialMode,
    PlaySound,
    HaltMusic,
    CopyData,
    SsgEg,
    FmVolEnv,
    ResetSpindashRev,
    /// Byte not recognized for the active dialect.
    Unknown,
}

impl CoordFlag {
    /// SMPS2ASM macro name.
    pub fn macro_name(self) -> &'static str {
        match self {
            CoordFlag::Pan => "smpsPan",
            CoordFlag::AlterNote => "smpsAlterNote",
            CoordFlag::Detune => "smpsDetune",
            CoordFlag::Nop => "smpsNop",
            CoordFlag::Fade => "smpsFade",
            CoordFlag::FadeIn => "smpsFadeIn",
            CoordFlag::Return => "smpsReturn",
            CoordFlag::ChanTempoDiv => "smpsChanTempoDiv",
            CoordFlag::AlterVol => "smpsAlterVol",
            CoordFlag::NoAttack => "smpsNoAttack",
            CoordFlag::NoteFill => "smpsNoteFill",
            CoordFlag::ChangeTransposition => "smpsChangeTransposition",
            CoordFlag::SetTempoMod => "smpsSetTempoMod",
            CoordFlag::SetTempoDiv => "smpsSetTempoDiv",
            CoordFlag::PsgAlterVol => "smpsPSGAlterVol",
            CoordFlag::ClearPush => "smpsClearPush",
            CoordFlag::StopSpecial => "smpsStopSpecial",
            CoordFlag::SetVoice => "smpsSetvoice",
            CoordFlag::ModSet => "smpsModSet",
            CoordFlag::ModOn => "smpsModOn",
            CoordFlag::Stop => "smpsStop",
            CoordFlag::PsgForm => "smpsPSGform",
            CoordFlag::ModOff => "smpsModOff",
            CoordFlag::PsgVoice => "smpsPSGvoice",
            CoordFlag::Jump => "smpsJump",
            CoordFlag::Loop => "smpsLoop",
            CoordFlag::Call => "smpsCall",
            CoordFlag::MaxRelRate => "smpsMaxRelRate",
            CoordFlag::SpindashRev => "smpsSpindashRev",
            CoordFlag::PlayDacSample => "smpsPlayDACSample",
            CoordFlag::ConditionalJump => "smpsConditionalJump",
            CoordFlag::FmICommand => "smpsFMICommand",
            CoordFlag::FmICommandFm1 => "smpsFMICommandFM1",
            CoordFlag::ModChange2 => "smpsModChange2",
            CoordFlag::ModChange => "smpsModChange",
            CoordFlag::ContinuousLoop => "smpsContinuousLoop",
            CoordFlag::AlternateSmps => "smpsAlternateSMPS",
            CoordFlag::Fm3SpecialMode => "smpsFM3SpecialMode",
            CoordFlag::PlaySound => "smpsPlaySound",
            CoordFlag::HaltMusic => "smpsHaltMusic",
            CoordFlag::CopyData => "smpsCopyData",
            CoordFlag::SsgEg => "smpsSSGEG",
            CoordFlag::FmVolEnv => "smpsFMVolEnv",
            CoordFlag::ResetSpindashRev => "smpsResetSpindashRev",
            CoordFlag::Unknown => "dc.b",
        }
    }
}

/// Kind of synthesized label created for a pointer target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    Jump,
    Call,
    Loop,
}

impl LabelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            LabelKind::Jump => "Jump",
            LabelKind::Call => "Call",
            LabelKind::Loop => "Loop",
        }
    }
}

/// Parameter shape of a coordination flag.
///
/// Bytes are laid out as `lead` parameters, then the 16-bit pointer when
/// `pointer` is set, then `trail` parameters. For `0xFF` meta events the
/// sub-command byte is counted in `lead`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSpec {
    pub flag: CoordFlag,
    pub lead: usize,
    pub pointer: Option<LabelKind>,
    pub trail: usize,
    pub ends_track: bool,
}

impl FlagSpec {
    const fn params(flag: CoordFlag, lead: usize) -> Self {
        Self {
            flag,
            lead,
            pointer: None,
            trail: 0,
            ends_track: false,
        }
    }

    const fn pointer(flag: CoordFlag, lead: usize, kind: LabelKind) -> Self {
        Self {
            flag,
            lead,
            pointer: Some(kind),
            trail: 0,
            ends_track: false,
        }
    }

    const fn terminal(self) -> Self {
        Self {
            ends_track: true,
            ..self
        }
    }

    const fn trailing(self, trail: usize) -> Self {
        Self { trail, ..self }
    }

    /// Number of parameter bytes, not counting the opcode or the pointer.
    pub fn param_count(&self) -> usize {
        self.lead + self.trail
    }
}

/// Look up the coordination flag for `opcode` (`0xE0..=0xFF`) in `version`.
///
/// Returns `None` for bytes the dialect does not define. For version 3
/// `0xFF` is not in this table; it is dispatched through [`meta_flag_spec`].
pub fn coord_flag_spec(version: EngineVersion, opcode: u8) -> Option<FlagSpec> {
    use CoordFlag as F;
    use FlagSpec as S;

    match version {
        EngineVersion::V1 | EngineVersion::V2 => {
            let spec = match opcode {
                0xE0 => S::params(F::Pan, 1),
                0xE1 => S::params(F::AlterNote, 1),
                0xE2 => S::params(F::Nop, 1),
                0xE3 => S::params(F::Return, 0).terminal(),
                0xE4 => S::params(F::Fade, 0).terminal(),
                0xE5 => S::params(F::ChanTempoDiv, 1),
                0xE6 => S::params(F::AlterVol, 1),
                0xE7 => S::params(F::NoAttack, 0),
                0xE8 => S::params(F::NoteFill, 1),
                0xE9 => S::params(F::ChangeTransposition, 1),
                0xEA => S::params(F::SetTempoMod, 1),
                0xEB => S::params(F::SetTempoDiv, 1),
                0xEC => S::params(F::PsgAlterVol, 1),
                0xED if version == EngineVersion::V1 => S::params(F::ClearPush, 0),
                0xEE if version == EngineVersion::V1 => S::params(F::StopSpecial, 0).terminal(),
                0xEF => S::params(F::SetVoice, 1),
                0xF0 => S::params(F::ModSet, 4),
                0xF1 => S::params(F::ModOn, 0),
                0xF2 => S::params(F::Stop, 0).terminal(),
                0xF3 => S::params(F::PsgForm, 1),
                0xF4 => S::params(F::ModOff, 0),
                0xF5 => S::params(F::PsgVoice, 1),
                0xF6 => S::pointer(F::Jump, 0, LabelKind::Jump).terminal(),
                0xF7 => S::pointer(F::Loop, 2, LabelKind::Loop),
                0xF8 => S::pointer(F::Call, 0, LabelKind::Call),
                0xF9 => S::params(F::MaxRelRate, 0),
                _ => return None,
            };
            Some(spec)
        }
        EngineVersion::V3 => {
            let spec = match opcode {
                0xE0 => S::params(F::Pan, 1),
                0xE1 => S::params(F::Detune, 1),
                0xE2 => S::params(F::Fade, 1),
                0xE3 => S::params(F::Return, 0).terminal(),
                0xE4 => S::params(F::FadeIn, 0),
                0xE5 => S::params(F::ChanTempoDiv, 1),
                0xE6 => S::params(F::AlterVol, 1),
                0xE7 => S::params(F::NoAttack, 0),
                0xE8 => S::params(F::NoteFill, 1),
                0xE9 => S::params(F::SpindashRev, 0),
                0xEA => S::params(F::PlayDacSample, 1),
                0xEB => S::pointer(F::ConditionalJump, 1, LabelKind::Jump),
                0xEC => S::params(F::PsgAlterVol, 1),
                0xED => S::params(F::FmICommand, 2),
                0xEE => S::params(F::FmICommandFm1, 2),
                0xEF => S::params(F::SetVoice, 1),
                0xF0 => S::params(F::ModSet, 4),
                0xF1 => S::params(F::ModChange2, 2),
                0xF2 => S::params(F::Stop, 0).terminal(),
                0xF3 => S::params(F::PsgForm, 1),
                0xF4 => S::params(F::ModChange, 1),
                0xF5 => S::params(F::PsgVoice, 1),
                0xF6 => S::pointer(F::Jump, 0, LabelKind::Jump).terminal(),
                0xF7 => S::pointer(F::Loop, 2, LabelKind::Loop),
                0xF8 => S::pointer(F::Call, 0, LabelKind::Call),
                0xF9 => S::params(F::ModOff, 0),
                0xFA => S::params(F::ModOn, 0),
                0xFB => S::params(F::ChangeTransposition, 1),
                0xFC => S::pointer(F::ContinuousLoop, 0, LabelKind::Loop),
                0xFD => S::params(F::AlternateSmps, 1),
                0xFE => S::params(F::Fm3SpecialMode, 4),
                _ => return None,
            };
            Some(spec)
        }
    }
}

/// Look up the version 3 `0xFF` meta sub-command `sub`.
///
/// The returned shape counts the sub-command byte as the first lead parameter.
pub fn meta_flag_spec(sub: u8) -> Option<FlagSpec> {
    use CoordFlag as F;
    use FlagSpec as S;

    let spec = match sub {
        0x00 => S::params(F::SetTempoMod, 2),
        0x01 => S::params(F::PlaySound, 2),
        0x02 => S::params(F::HaltMusic, 2),
        0x03 => S::pointer(F::CopyData, 1, LabelKind::Jump).trailing(1),
        0x04 => S::params(F::SetTempoDiv, 2),
        0x05 => S::params(F::SsgEg, 5),
        0x06 => S::params(F::FmVolEnv, 3),
        0x07 => S::params(F::ResetSpindashRev, 1),
        _ => return None,
    };
    Some(spec)
}

/// Opcode of the keydisp-change flag in `version`.
pub fn transposition_opcode(version: EngineVersion) -> u8 {
    match version {
        EngineVersion::V1 | EngineVersion::V2 => 0xE9,
        EngineVersion::V3 => 0xFB,
    }
}

/// Closed set of decoded instruction shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Rest/hold length (`0x00..=0x7F`).
    Duration,
    /// Note or DAC sample (`0x80..=0xDF`).
    RealNote { dac: bool },
    /// Placeholder: an optional comment plus the input bytes it stands for,
    /// which are printed verbatim.
    Null { comment: Option<String>, raw: Vec<u8> },
    /// One FM voice record of the voice table.
    VoiceRecord { index: usize, voice: FmVoice },
    MetaNoParams(CoordFlag),
    Meta1Param(CoordFlag, [u8; 1]),
    Meta2Params(CoordFlag, [u8; 2]),
    Meta3Params(CoordFlag, [u8; 3]),
    Meta4Params(CoordFlag, [u8; 4]),
    Meta5Params(CoordFlag, [u8; 5]),
    MetaPointer(CoordFlag, usize),
    MetaPointer1Param(CoordFlag, [u8; 1], usize),
    MetaPointer2Params(CoordFlag, [u8; 2], usize),
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Raw opcode byte (first byte of the instruction).
    pub opcode: u8,
    /// Key displacement in effect when the event was decoded.
    pub keydisp: i8,
    pub ends_track: bool,
    pub is_rest: bool,
    pub kind: EventKind,
}

impl Event {
    pub fn new(opcode: u8, keydisp: i8, kind: EventKind) -> Self {
        Self {
            opcode,
            keydisp,
            ends_track: false,
            is_rest: false,
            kind,
        }
    }

    /// Terminal placeholder produced when the input ends mid-instruction.
    ///
    /// `raw` holds whatever bytes of the instruction were present.
    pub fn truncated(opcode: u8, keydisp: i8, comment: String, raw: Vec<u8>) -> Self {
        Self {
            ends_track: true,
            ..Self::new(
                opcode,
                keydisp,
                EventKind::Null {
                    comment: Some(comment),
                    raw,
                },
            )
        }
    }

    /// Number of input bytes the event occupies.
    pub fn size(&self) -> usize {
        match &self.kind {
            EventKind::Duration | EventKind::RealNote { .. } => 1,
            EventKind::Null { raw, .. } => raw.len(),
            EventKind::VoiceRecord { .. } => VOICE_SIZE,
            EventKind::MetaPointer(..)
            | EventKind::MetaPointer1Param(..)
            | EventKind::MetaPointer2Params(..) => 1 + self.params().len() + 2,
            _ => 1 + self.params().len(),
        }
    }

    pub fn has_pointer(&self) -> bool {
        self.target().is_some()
    }

    /// Resolved pointer target of a pointer-bearing event.
    pub fn target(&self) -> Option<usize> {
        match self.kind {
            EventKind::MetaPointer(_, t)
            | EventKind::MetaPointer1Param(_, _, t)
            | EventKind::MetaPointer2Params(_, _, t) => Some(t),
            _ => None,
        }
    }

    /// Coordination flag of a meta event.
    pub fn flag(&self) -> Option<CoordFlag> {
        match self.kind {
            EventKind::MetaNoParams(f)
            | EventKind::Meta1Param(f, _)
            | EventKind::Meta2Params(f, _)
            | EventKind::Meta3Params(f, _)
            | EventKind::Meta4Params(f, _)
            | EventKind::Meta5Params(f, _)
            | EventKind::MetaPointer(f, _)
            | EventKind::MetaPointer1Param(f, _, _)
            | EventKind::MetaPointer2Params(f, _, _) => Some(f),
            _ => None,
        }
    }

    /// Raw parameter bytes of a meta event (sub-command byte included).
    pub fn params(&self) -> &[u8] {
        match &self.kind {
            EventKind::Meta1Param(_, p) | EventKind::MetaPointer1Param(_, p, _) => p.as_slice(),
            EventKind::Meta2Params(_, p) | EventKind::MetaPointer2Params(_, p, _) => p.as_slice(),
            EventKind::Meta3Params(_, p) => p.as_slice(),
            EventKind::Meta4Params(_, p) => p.as_slice(),
            EventKind::Meta5Params(_, p) => p.as_slice(),
            _ => &[],
        }
    }

    /// Durations and notes are packed several to a line by the printer.
    pub fn is_packed(&self) -> bool {
        matches!(self.kind, EventKind::Duration | EventKind::RealNote { .. })
    }
}
