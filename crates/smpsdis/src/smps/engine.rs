//! Exploration engine.
//!
//! The engine is a small state machine:
//!
//! ```text
//! SeedingHeader -> ExploringTracks -> ResolvingVoices -> Done
//! ```
//!
//! Seeding parses the header, labels the channel entry points and queues
//! one claim per channel plus one for the voice table. Exploration pops
//! the smallest claim (by track class, then address), decodes a run of
//! instructions from it and queues every pointer target found on the way.
//! Once only the voice-table claim is left, the number of referenced
//! voices is known and the table is read.
//!
//! Every address is decoded at most once: a claim whose address is already
//! explored is dropped, and a run stops as soon as it reaches explored
//! bytes. Since the explored set only grows, exploration always ends.
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace, warn};

use crate::binutil::ParseError;
use crate::dialect::DialectPolicy;
use crate::smps::decoder::Decoder;
use crate::smps::diagnostic::Diagnostic;
use crate::smps::event::{CoordFlag, Event, EventKind};
use crate::smps::header::{
    ChannelExtra, SFX_PLAYBACK_CONTROL, SmpsHeader, VoicePointer, parse_header,
};
use crate::smps::label::LabelTable;
use crate::smps::options::DisasmOptions;
use crate::smps::printer::{Printer, PrinterOptions};
use crate::smps::track::{LocationClaim, TrackClass};
use crate::voice::{VOICE_SIZE, read_voices};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineState {
    SeedingHeader,
    ExploringTracks,
    ResolvingVoices,
    Done,
}

/// What became of the voice table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceTableStatus {
    /// `count` of `requested` records were decoded.
    Decoded { count: usize, requested: usize },
    /// The table is local but no FM track selects a voice.
    NotReferenced,
    /// The voice pointer is `0x0000`.
    Null { requested: usize },
    /// The song uses the driver's universal voice bank.
    Universal { requested: usize },
    /// The voice pointer resolves outside the input.
    OutOfRange { address: usize, requested: usize },
}

/// Finished disassembly, ready to be printed.
#[derive(Debug, Clone, PartialEq)]
pub struct Disassembly {
    pub options: DisasmOptions,
    pub header: SmpsHeader,
    /// Decoded events keyed by address.
    pub events: BTreeMap<usize, Event>,
    pub labels: LabelTable,
    pub diagnostics: Vec<Diagnostic>,
    /// Claims in the order they were serviced, with `*Init` classes rewritten.
    pub serviced: Vec<LocationClaim>,
    pub voice_table: VoiceTableStatus,
    /// Largest voice index selected by an FM track.
    pub max_voice: Option<u8>,
    /// Number of input bytes covered by the header, tracks and voices.
    pub explored_bytes: usize,
}

impl Disassembly {
    /// Render the disassembly as SMPS2ASM source text.
    pub fn render(&self) -> String {
        Printer::new(PrinterOptions::from(&self.options)).print(self)
    }
}

/// One exploration run over one input.
pub struct Engine<'a> {
    bytes: &'a [u8],
    options: DisasmOptions,
    policy: DialectPolicy,
    base: isize,
    state: EngineState,
    header: Option<SmpsHeader>,
    worklist: BTreeSet<LocationClaim>,
    explored: BTreeMap<usize, TrackClass>,
    events: BTreeMap<usize, Event>,
    labels: LabelTable,
    diagnostics: Vec<Diagnostic>,
    serviced: Vec<LocationClaim>,
    max_voice: Option<u8>,
    voice_table: Option<VoiceTableStatus>,
}

impl<'a> Engine<'a> {
    pub fn new(bytes: &'a [u8], options: DisasmOptions) -> Self {
        let policy = options.policy();
        let base = options.effective_base();
        let labels = LabelTable::new(options.project.clone());
        Self {
            bytes,
            options,
            policy,
            base,
            state: EngineState::SeedingHeader,
            header: None,
            worklist: BTreeSet::new(),
            explored: BTreeMap::new(),
            events: BTreeMap::new(),
            labels,
            diagnostics: Vec::new(),
            serviced: Vec::new(),
            max_voice: None,
            voice_table: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Claims still waiting to be serviced, smallest first.
    pub fn pending(&self) -> impl Iterator<Item = &LocationClaim> {
        self.worklist.iter()
    }

    /// Advance the engine by one unit of work and return the new state.
    ///
    /// While exploring, one unit is one claim. The only error is a header
    /// that cannot be read.
    pub fn step(&mut self) -> Result<EngineState, ParseError> {
        let next = match self.state {
            EngineState::SeedingHeader => {
                self.seed()?;
                EngineState::ExploringTracks
            }
            EngineState::ExploringTracks => match self.worklist.first() {
                Some(claim) if !claim.class.is_voice_table() => {
                    if let Some(claim) = self.worklist.pop_first() {
                        self.explore(claim);
                    }
                    EngineState::ExploringTracks
                }
                _ => EngineState::ResolvingVoices,
            },
            EngineState::ResolvingVoices => {
                self.resolve_voices();
                EngineState::Done
            }
            EngineState::Done => EngineState::Done,
        };
        if next != self.state {
            debug!("engine: {:?} -> {:?}", self.state, next);
        }
        self.state = next;
        Ok(next)
    }

    /// Run to completion.
    pub fn run(mut self) -> Result<Disassembly, ParseError> {
        while self.step()? != EngineState::Done {}
        self.finish()
    }

    fn finish(self) -> Result<Disassembly, ParseError> {
        let header = self.header.ok_or_else(|| {
            ParseError::Other("engine finished without a header".to_string())
        })?;
        Ok(Disassembly {
            options: self.options,
            header,
            events: self.events,
            labels: self.labels,
            diagnostics: self.diagnostics,
            serviced: self.serviced,
            voice_table: self.voice_table.unwrap_or(VoiceTableStatus::NotReferenced),
            max_voice: self.max_voice,
            explored_bytes: self.explored.len(),
        })
    }

    fn len(&self) -> usize {
        self.bytes.len()
    }

    fn mark_explored(&mut self, start: usize, end: usize, class: TrackClass) {
        for address in start..end.min(self.len()) {
            self.explored.entry(address).or_insert(class);
        }
    }

    fn seed(&mut self) -> Result<(), ParseError> {
        let header = parse_header(
            self.bytes,
            self.options.header_offset,
            self.options.kind,
            self.options.version,
            self.policy,
            self.base,
        )?;
        debug!(
            "header at 0x{:04X}..0x{:04X}: {} channels, voices {:?}",
            header.start,
            header.end,
            header.channels.len(),
            header.voices
        );

        self.mark_explored(header.start, header.end, TrackClass::Header);
        self.labels.add_structural(header.start, "Header");

        for (i, channel) in header.channels.iter().enumerate() {
            if let ChannelExtra::SoundEffect {
                playback_control, ..
            } = channel.extra
                && playback_control != SFX_PLAYBACK_CONTROL
            {
                let diagnostic = Diagnostic::UnexpectedPlaybackControl {
                    channel: i,
                    value: playback_control,
                };
                warn!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
            }
            self.labels.add_structural(channel.address, &channel.name);
            let claim = LocationClaim::new(channel.kind.init_class(), channel.address, channel.keydisp);
            trace!("seed {:?}", claim);
            self.worklist.insert(claim);
        }

        let voice_claim = match header.voices {
            VoicePointer::Local(address) => {
                self.labels.add_structural(address, "Voices");
                LocationClaim::new(TrackClass::Voices, address, 0)
            }
            VoicePointer::OutOfRange(address) => LocationClaim::new(TrackClass::ExtVoices, address, 0),
            VoicePointer::Null | VoicePointer::Universal => {
                LocationClaim::new(TrackClass::ExtVoices, 0, 0)
            }
        };
        trace!("seed {:?}", voice_claim);
        self.worklist.insert(voice_claim);

        self.header = Some(header);
        Ok(())
    }

    fn explore(&mut self, claim: LocationClaim) {
        if claim.address >= self.len() {
            let diagnostic = Diagnostic::ClaimOutOfRange {
                address: claim.address,
                class: claim.class,
            };
            warn!("{}", diagnostic);
            self.diagnostics.push(diagnostic);
            return;
        }
        let class = claim.class.to_track();
        if self.explored.contains_key(&claim.address) {
            trace!("skip explored {:?}", claim);
            self.inherit_voices(class, claim.address);
            return;
        }

        let claim = LocationClaim { class, ..claim };
        debug!("explore {:?}", claim);
        self.serviced.push(claim);

        let decoder = Decoder::new(self.bytes, self.options.version, self.policy, self.base);
        let mut found = Vec::new();
        let mut cursor = claim.address;
        let mut keydisp = claim.keydisp;
        loop {
            let decoded = decoder.read_instruction(cursor, class, keydisp);

            if let Some((&overlap, _)) = self.explored.range(cursor + 1..decoded.next).next() {
                let diagnostic = Diagnostic::OverlappingInstruction {
                    opcode: decoded.event.opcode,
                    offset: cursor,
                    overlap,
                };
                warn!("{}", diagnostic);
                self.diagnostics.push(diagnostic);
                let raw = Event::new(
                    decoded.event.opcode,
                    keydisp,
                    EventKind::Null {
                        comment: Some(format!(
                            "{} at ${:04X} overlaps decoded data at ${:04X}",
                            decoded.event.flag().map_or("instruction", |f| f.macro_name()),
                            cursor,
                            overlap
                        )),
                        raw: self.bytes[cursor..overlap].to_vec(),
                    },
                );
                self.events.insert(cursor, raw);
                self.mark_explored(cursor, overlap, class);
                self.inherit_voices(class, overlap);
                break;
            }

            decoded.link(class, &mut self.labels, &mut found);
            if class == TrackClass::FmTrack
                && decoded.event.flag() == Some(CoordFlag::SetVoice)
                && let Some(&index) = decoded.event.params().first()
            {
                self.note_voice(index);
            }

            self.mark_explored(cursor, decoded.next, class);
            if let Some(diagnostic) = decoded.diagnostic {
                self.diagnostics.push(diagnostic);
            }

            let ends_track = decoded.event.ends_track;
            self.events.insert(cursor, decoded.event);
            keydisp = decoded.keydisp;
            cursor = decoded.next;

            if ends_track || cursor >= self.len() {
                break;
            }
            if self.explored.contains_key(&cursor) {
                self.inherit_voices(class, cursor);
                break;
            }
        }

        for claim in found {
            trace!("queue {:?}", claim);
            self.worklist.insert(claim);
        }
    }

    fn note_voice(&mut self, index: u8) {
        self.max_voice = Some(self.max_voice.map_or(index, |m| m.max(index)));
    }

    /// FM code that continues into bytes another track class decoded first
    /// still selects the voices found there.
    fn inherit_voices(&mut self, class: TrackClass, address: usize) {
        if class != TrackClass::FmTrack
            || self.explored.get(&address) == Some(&TrackClass::FmTrack)
        {
            return;
        }
        let mut found = None;
        let mut seen = BTreeSet::new();
        let mut pending = vec![address];
        while let Some(mut cursor) = pending.pop() {
            while seen.insert(cursor) {
                let Some(event) = self.events.get(&cursor) else {
                    break;
                };
                if event.flag() == Some(CoordFlag::SetVoice)
                    && let Some(&index) = event.params().first()
                {
                    found = Some(found.map_or(index, |m: u8| m.max(index)));
                }
                if let Some(target) = event.target() {
                    pending.push(target);
                }
                if event.ends_track || event.size() == 0 {
                    break;
                }
                cursor += event.size();
            }
        }
        if let Some(index) = found {
            debug!("voice ${:02X} selected by code shared with an FM track", index);
            self.note_voice(index);
        }
    }

    fn end_of_data(&self) -> usize {
        self.explored
            .last_key_value()
            .map(|(address, _)| address + 1)
            .unwrap_or(self.options.header_offset)
    }

    fn place_voice_placeholder(&mut self, address: usize, comment: String) {
        self.labels.add_structural(address, "Voices");
        self.events.entry(address).or_insert_with(|| {
            Event::new(
                0,
                0,
                EventKind::Null {
                    comment: Some(comment),
                    raw: Vec::new(),
                },
            )
        });
    }

    /// A voice record at `offset` runs into decoded bytes at `overlap`:
    /// keep the bytes before the overlap as raw data and stop the table.
    fn keep_voice_bytes(&mut self, offset: usize, overlap: usize) {
        let diagnostic = Diagnostic::OverlappingInstruction {
            opcode: self.bytes[offset],
            offset,
            overlap,
        };
        warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
        if overlap > offset {
            self.events.insert(
                offset,
                Event::new(
                    self.bytes[offset],
                    0,
                    EventKind::Null {
                        comment: Some(format!(
                            "Voice record at ${:04X} overlaps decoded data at ${:04X}",
                            offset, overlap
                        )),
                        raw: self.bytes[offset..overlap].to_vec(),
                    },
                ),
            );
            self.mark_explored(offset, overlap, TrackClass::Voices);
        }
    }

    fn resolve_voices(&mut self) {
        let claim = self.worklist.pop_first();
        // Anything still queued is a voice-table claim as well.
        self.worklist.clear();
        if let Some(claim) = claim {
            self.serviced.push(claim);
        }

        let voices = match &self.header {
            Some(header) => header.voices,
            None => VoicePointer::Null,
        };
        let requested = self.max_voice.map_or(0, |m| m as usize + 1);
        let end = self.end_of_data();

        let status = match voices {
            VoicePointer::Null => {
                self.place_voice_placeholder(
                    end,
                    format!("Voice table pointer is $0000; {} voices referenced", requested),
                );
                VoiceTableStatus::Null { requested }
            }
            VoicePointer::Universal => {
                self.place_voice_placeholder(
                    end,
                    format!("Song uses the universal voice bank; {} voices referenced", requested),
                );
                VoiceTableStatus::Universal { requested }
            }
            VoicePointer::OutOfRange(address) => {
                self.place_voice_placeholder(
                    end,
                    format!(
                        "Voice table at ${:04X} lies outside the input; {} voices referenced",
                        address, requested
                    ),
                );
                VoiceTableStatus::OutOfRange { address, requested }
            }
            VoicePointer::Local(address) if requested == 0 => {
                if !self.events.contains_key(&address) {
                    self.place_voice_placeholder(address, "No FM voices referenced".to_string());
                }
                VoiceTableStatus::NotReferenced
            }
            VoicePointer::Local(address) => {
                let batch = read_voices(self.bytes, address, requested);
                let mut count = 0;
                for (index, &(offset, voice)) in batch.voices.iter().enumerate() {
                    let end = offset + VOICE_SIZE;
                    if let Some((&overlap, _)) = self.explored.range(offset..end).next() {
                        self.keep_voice_bytes(offset, overlap);
                        break;
                    }
                    self.events.insert(
                        offset,
                        Event::new(voice.raw[0], 0, EventKind::VoiceRecord { index, voice }),
                    );
                    self.mark_explored(offset, end, TrackClass::Voices);
                    count += 1;
                }
                if batch.truncated.is_some() {
                    self.diagnostics.push(Diagnostic::TruncatedVoices {
                        address,
                        produced: batch.voices.len(),
                        requested,
                    });
                }
                VoiceTableStatus::Decoded { count, requested }
            }
        };
        debug!("voice table: {:?}", status);
        self.voice_table = Some(status);
    }
}
