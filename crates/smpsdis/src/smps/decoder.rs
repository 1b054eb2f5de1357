//! Single-instruction decoder.
//!
//! [`Decoder::decode`] turns the bytes at one cursor position into one
//! [`Event`] and reports where the next instruction starts. Pointer-bearing
//! flags get their target labelled and queued as a new claim before the
//! event is returned.
//!
//! [`Decoder::read_instruction`] does the same without touching the label
//! table; [`Decoded::link`] applies the pointer afterwards. The engine uses
//! the pair to drop instructions that overlap already decoded bytes.
use tracing::warn;

use crate::binutil::{read_slice, read_u8_at};
use crate::dialect::{DialectPolicy, EngineVersion};
use crate::smps::diagnostic::Diagnostic;
use crate::smps::event::{
    CoordFlag, Event, EventKind, FlagSpec, LabelKind, coord_flag_spec, meta_flag_spec,
    transposition_opcode,
};
use crate::smps::label::LabelTable;
use crate::smps::track::{LocationClaim, TrackClass};

/// Outcome of decoding one instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub event: Event,
    /// Offset of the following instruction.
    pub next: usize,
    /// Key displacement in effect after this instruction.
    pub keydisp: i8,
    pub diagnostic: Option<Diagnostic>,
    /// Pointer target and the kind of label it needs.
    pub pointer: Option<(usize, LabelKind)>,
}

impl Decoded {
    fn plain(event: Event, next: usize, keydisp: i8) -> Self {
        Self {
            event,
            next,
            keydisp,
            diagnostic: None,
            pointer: None,
        }
    }

    /// Label the pointer target, if any, and queue it as a `class` claim.
    pub fn link(&self, class: TrackClass, labels: &mut LabelTable, claims: &mut Vec<LocationClaim>) {
        if let Some((address, kind)) = self.pointer {
            labels.ensure_pointer_label(address, kind);
            claims.push(LocationClaim::new(class, address, self.event.keydisp));
        }
    }
}

/// Stateless decoder bound to one input and one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    version: EngineVersion,
    policy: DialectPolicy,
    base: isize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8], version: EngineVersion, policy: DialectPolicy, base: isize) -> Self {
        Self {
            bytes,
            version,
            policy,
            base,
        }
    }

    /// Decode the instruction at `offset` as part of a `class` track.
    ///
    /// Labels for pointer targets are added to `labels` and the matching
    /// claims are appended to `claims`. The decoder never reads past the
    /// input: an instruction cut short by the end of the input becomes a
    /// terminal placeholder whose `next` is the input length.
    pub fn decode(
        &self,
        offset: usize,
        class: TrackClass,
        keydisp: i8,
        labels: &mut LabelTable,
        claims: &mut Vec<LocationClaim>,
    ) -> Decoded {
        let decoded = self.read_instruction(offset, class, keydisp);
        decoded.link(class, labels, claims);
        decoded
    }

    /// Decode the instruction at `offset` without creating labels or claims.
    pub fn read_instruction(&self, offset: usize, class: TrackClass, keydisp: i8) -> Decoded {
        let opcode = match read_u8_at(self.bytes, offset) {
            Ok(b) => b,
            Err(_) => return self.truncated(0, offset, keydisp),
        };

        match opcode {
            0x00..=0x7F => Decoded::plain(
                Event::new(opcode, keydisp, EventKind::Duration),
                offset + 1,
                keydisp,
            ),
            0x80..=0xDF => {
                let mut event = Event::new(
                    opcode,
                    keydisp,
                    EventKind::RealNote {
                        dac: class.plays_samples(),
                    },
                );
                event.is_rest = opcode == 0x80;
                Decoded::plain(event, offset + 1, keydisp)
            }
            _ => self.decode_flag(opcode, offset, keydisp),
        }
    }

    fn decode_flag(&self, opcode: u8, offset: usize, keydisp: i8) -> Decoded {
        let (spec, sub) = if opcode == 0xFF && self.version == EngineVersion::V3 {
            match read_u8_at(self.bytes, offset + 1) {
                Ok(sub) => (meta_flag_spec(sub), Some(sub)),
                Err(_) => return self.truncated(opcode, offset, keydisp),
            }
        } else {
            (coord_flag_spec(self.version, opcode), None)
        };

        let Some(spec) = spec else {
            return self.unknown(opcode, sub, offset, keydisp);
        };

        let mut cur = offset + 1;
        let mut params = Vec::with_capacity(spec.param_count());

        match read_slice(self.bytes, cur, spec.lead) {
            Ok(lead) => params.extend_from_slice(lead),
            Err(_) => return self.truncated(opcode, offset, keydisp),
        }
        cur += spec.lead;

        let target = match spec.pointer {
            Some(kind) => {
                let raw = match self.policy.read_u16(self.bytes, cur) {
                    Ok(raw) => raw,
                    Err(_) => return self.truncated(opcode, offset, keydisp),
                };
                cur += 2;
                Some((self.policy.resolve_track_pointer(raw, cur, self.base), kind))
            }
            None => None,
        };

        match read_slice(self.bytes, cur, spec.trail) {
            Ok(trail) => params.extend_from_slice(trail),
            Err(_) => return self.truncated(opcode, offset, keydisp),
        }
        cur += spec.trail;

        let kind = match build_kind(&spec, &params, target.map(|(t, _)| t)) {
            Some(kind) => kind,
            None => EventKind::Null {
                comment: Some(format!(
                    "unsupported parameter shape for {} at ${:04X}",
                    spec.flag.macro_name(),
                    offset
                )),
                raw: self.bytes[offset..cur].to_vec(),
            },
        };

        let pointer = match kind {
            EventKind::Null { .. } => None,
            _ => target,
        };
        let next_keydisp = if opcode == transposition_opcode(self.version) {
            keydisp.wrapping_add(params.first().copied().unwrap_or(0) as i8)
        } else {
            keydisp
        };

        let mut event = Event::new(opcode, keydisp, kind);
        event.ends_track = spec.ends_track;
        Decoded {
            pointer,
            ..Decoded::plain(event, cur, next_keydisp)
        }
    }

    fn unknown(&self, opcode: u8, sub: Option<u8>, offset: usize, keydisp: i8) -> Decoded {
        let diagnostic = Diagnostic::UnknownOpcode {
            opcode,
            sub,
            offset,
        };
        warn!("{}", diagnostic);
        Decoded {
            event: Event::new(opcode, keydisp, EventKind::MetaNoParams(CoordFlag::Unknown)),
            next: offset + 1,
            keydisp,
            diagnostic: Some(diagnostic),
            pointer: None,
        }
    }

    fn truncated(&self, opcode: u8, offset: usize, keydisp: i8) -> Decoded {
        let diagnostic = Diagnostic::Truncated { opcode, offset };
        warn!("{}", diagnostic);
        Decoded {
            event: Event::truncated(
                opcode,
                keydisp,
                format!("truncated instruction ${:02X} at ${:04X}", opcode, offset),
                self.bytes.get(offset..).unwrap_or_default().to_vec(),
            ),
            next: self.bytes.len().max(offset),
            keydisp,
            diagnostic: Some(diagnostic),
            pointer: None,
        }
    }
}

fn build_kind(spec: &FlagSpec, params: &[u8], target: Option<usize>) -> Option<EventKind> {
    let flag = spec.flag;
    let kind = match (target, params) {
        (None, []) => EventKind::MetaNoParams(flag),
        (None, &[a]) => EventKind::Meta1Param(flag, [a]),
        (None, &[a, b]) => EventKind::Meta2Params(flag, [a, b]),
        (None, &[a, b, c]) => EventKind::Meta3Params(flag, [a, b, c]),
        (None, &[a, b, c, d]) => EventKind::Meta4Params(flag, [a, b, c, d]),
        (None, &[a, b, c, d, e]) => EventKind::Meta5Params(flag, [a, b, c, d, e]),
        (Some(t), []) => EventKind::MetaPointer(flag, t),
        (Some(t), &[a]) => EventKind::MetaPointer1Param(flag, [a], t),
        (Some(t), &[a, b]) => EventKind::MetaPointer2Params(flag, [a, b], t),
        _ => return None,
    };
    Some(kind)
}
