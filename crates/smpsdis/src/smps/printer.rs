//! SMPS2ASM text output.
//!
//! The printer walks the event map in address order. Labels are emitted
//! just before the event at their address. A label that points inside a
//! multi-byte event (a jump into the operands of another instruction) is
//! written after that event as `Name = *-N`, so it still assembles to its
//! own address. Durations and notes are packed up to [`ITEMS_PER_LINE`] to
//! a `dc.b` line.
use crate::dialect::EngineVersion;
use crate::smps::engine::Disassembly;
use crate::smps::event::{CoordFlag, Event, EventKind, coord_flag_spec, meta_flag_spec};
use crate::smps::header::{
    ChannelExtra, ChannelHeader, HeaderLayout, SFX_PLAYBACK_CONTROL, SmpsHeader, VoicePointer,
    sfx_channel_constant,
};
use crate::smps::label::LabelTable;
use crate::smps::options::DisasmOptions;
use crate::voice::FmVoice;

/// Maximum number of durations/notes on one `dc.b` line.
pub const ITEMS_PER_LINE: usize = 12;

const NOTE_NAMES: [&str; 12] = [
    "C", "Cs", "D", "Eb", "E", "F", "Fs", "G", "Ab", "A", "Bb", "B",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PrinterOptions {
    /// Emit an `nRst` before `SetVoice`, `ModSet` and `NoAttack` when the
    /// previous note was a rest.
    pub s3k_rest_compat: bool,
}

impl From<&DisasmOptions> for PrinterOptions {
    fn from(options: &DisasmOptions) -> Self {
        Self {
            s3k_rest_compat: options.s3k_rest_compat && options.version == EngineVersion::V3,
        }
    }
}

/// Symbolic name of a tone byte (`0x80..=0xDF`).
pub fn note_name(opcode: u8) -> String {
    match opcode {
        0x80 => "nRst".to_string(),
        0x81..=0xDF => {
            let n = (opcode - 0x81) as usize;
            format!("n{}{}", NOTE_NAMES[n % 12], n / 12)
        }
        _ => format!("${:02X}", opcode),
    }
}

/// Symbolic name of a DAC sample byte.
pub fn dac_name(version: EngineVersion, opcode: u8) -> String {
    let name = match (version, opcode) {
        (_, 0x80) => Some("nRst"),
        (EngineVersion::V1, 0x81) => Some("dKick"),
        (EngineVersion::V1, 0x82) => Some("dSnare"),
        (EngineVersion::V1, 0x83) => Some("dTimpani"),
        (EngineVersion::V1, 0x88) => Some("dHiTimpani"),
        (EngineVersion::V1, 0x89) => Some("dMidTimpani"),
        (EngineVersion::V1, 0x8A) => Some("dLowTimpani"),
        (EngineVersion::V1, 0x8B) => Some("dVLowTimpani"),
        _ => None,
    };
    name.map(str::to_string)
        .unwrap_or_else(|| format!("${:02X}", opcode))
}

fn hex_list(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("${:02X}", b))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Single-use text renderer for one [`Disassembly`].
#[derive(Debug, Default)]
pub struct Printer {
    options: PrinterOptions,
    out: String,
    items_on_line: usize,
    packed_run: bool,
    last_note_was_rest: bool,
}

impl Printer {
    pub fn new(options: PrinterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn print(mut self, dis: &Disassembly) -> String {
        let version = dis.options.version;
        let mut header_done = false;
        let mut last: Option<usize> = None;

        for (&address, event) in &dis.events {
            if !header_done && dis.header.start <= address {
                self.emit_labels(&dis.labels, last, dis.header.start);
                last = Some(dis.header.start);
                self.print_header(dis);
                header_done = true;
            }
            self.emit_labels(&dis.labels, last, address);
            last = Some(address);
            self.print_event(dis, event, version);

            let end = address + event.size();
            if end > address + 1 {
                self.emit_inner_labels(&dis.labels, address, end);
                last = Some(end - 1);
            }
        }
        if !header_done {
            self.emit_labels(&dis.labels, last, dis.header.start);
            last = Some(dis.header.start);
            self.print_header(dis);
        }
        self.close_line();

        let rest: Vec<_> = match last {
            Some(last) => dis.labels.range(last + 1..).collect(),
            None => dis.labels.iter().collect(),
        };
        if !rest.is_empty() {
            self.blank();
            self.line("; Labels outside the decoded data");
            for (address, names) in rest {
                for name in names {
                    self.line(&format!("{}:\t; ${:04X}", name, address));
                }
            }
        }
        self.out
    }

    fn line(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn close_line(&mut self) {
        if self.items_on_line > 0 {
            self.out.push('\n');
            self.items_on_line = 0;
            self.packed_run = true;
        }
    }

    /// Finish any packed run before a non-packed line.
    fn end_run(&mut self) {
        self.close_line();
        self.packed_run = false;
    }

    fn emit_labels(&mut self, labels: &LabelTable, after: Option<usize>, upto: usize) {
        let pending: Vec<String> = match after {
            Some(after) if after >= upto => return,
            Some(after) => labels
                .range(after + 1..=upto)
                .flat_map(|(_, names)| names.iter().cloned())
                .collect(),
            None => labels
                .range(..=upto)
                .flat_map(|(_, names)| names.iter().cloned())
                .collect(),
        };
        if pending.is_empty() {
            return;
        }
        self.close_line();
        if self.packed_run {
            self.blank();
        }
        self.packed_run = false;
        self.last_note_was_rest = false;
        for name in pending {
            self.line(&format!("{}:", name));
        }
    }

    /// Labels strictly inside the event at `start..end`, placed relative to
    /// the end of the event.
    fn emit_inner_labels(&mut self, labels: &LabelTable, start: usize, end: usize) {
        for (address, names) in labels.range(start + 1..end) {
            for name in names {
                self.line(&format!("{} = *-{}", name, end - address));
            }
        }
    }

    fn push_item(&mut self, item: &str) {
        if self.items_on_line == 0 {
            self.out.push_str("\tdc.b\t");
        } else {
            self.out.push_str(", ");
        }
        self.out.push_str(item);
        self.items_on_line += 1;
        if self.items_on_line == ITEMS_PER_LINE {
            self.close_line();
        }
    }

    fn print_event(&mut self, dis: &Disassembly, event: &Event, version: EngineVersion) {
        if event.is_packed() {
            let item = match event.kind {
                EventKind::RealNote { dac: true } => dac_name(version, event.opcode),
                EventKind::RealNote { dac: false } => note_name(event.opcode),
                _ => format!("${:02X}", event.opcode),
            };
            self.push_item(&item);
            if matches!(event.kind, EventKind::RealNote { .. }) {
                self.last_note_was_rest = event.is_rest;
            }
            return;
        }

        self.end_run();
        match &event.kind {
            EventKind::Null { comment, raw } => {
                if let Some(comment) = comment {
                    self.line(&format!("; {}", comment));
                }
                for chunk in raw.chunks(ITEMS_PER_LINE) {
                    self.line(&format!("\tdc.b\t{}", hex_list(chunk)));
                }
            }
            EventKind::VoiceRecord { index, voice } => self.print_voice(*index, voice),
            _ => self.print_flag(dis, event, version),
        }
    }

    fn print_flag(&mut self, dis: &Disassembly, event: &Event, version: EngineVersion) {
        let Some(flag) = event.flag() else {
            return;
        };
        if flag == CoordFlag::Unknown {
            self.line(&format!(
                "\tdc.b\t${:02X}\t; unrecognized coordination flag",
                event.opcode
            ));
            return;
        }

        if self.options.s3k_rest_compat
            && self.last_note_was_rest
            && matches!(flag, CoordFlag::SetVoice | CoordFlag::ModSet | CoordFlag::NoAttack)
        {
            self.line("\tdc.b\tnRst");
        }
        self.last_note_was_rest = false;

        let is_meta = version == EngineVersion::V3 && event.opcode == 0xFF;
        let params = event.params();
        let (lead, params) = if is_meta {
            let lead = meta_flag_spec(params.first().copied().unwrap_or(0)).map_or(0, |s| s.lead);
            (lead.saturating_sub(1), params.get(1..).unwrap_or(&[]))
        } else {
            let lead = coord_flag_spec(version, event.opcode).map_or(params.len(), |s| s.lead);
            (lead, params)
        };

        let mut args: Vec<String> = Vec::new();
        let lead = lead.min(params.len());
        args.extend(params[..lead].iter().map(|b| format!("${:02X}", b)));
        if let Some(target) = event.target() {
            args.push(
                dis.labels
                    .first(target)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("${:04X}", target)),
            );
        }
        args.extend(params[lead..].iter().map(|b| format!("${:02X}", b)));

        if args.is_empty() {
            self.line(&format!("\t{}", flag.macro_name()));
        } else {
            self.line(&format!("\t{}\t{}", flag.macro_name(), args.join(", ")));
        }
    }

    fn print_voice(&mut self, index: usize, voice: &FmVoice) {
        self.line(&format!("; Voice ${:02X}", index));
        let fields: [(&str, String); 13] = [
            ("smpsVcAlgorithm", format!("${:02X}", voice.algorithm())),
            ("smpsVcFeedback", format!("${:02X}", voice.feedback())),
            ("smpsVcUnusedBits", format!("${:02X}", voice.unused_bits())),
            ("smpsVcDetune", hex_list(&voice.detune())),
            ("smpsVcCoarseFreq", hex_list(&voice.coarse_freq())),
            ("smpsVcRateScale", hex_list(&voice.rate_scale())),
            ("smpsVcAttackRate", hex_list(&voice.attack_rate())),
            ("smpsVcAmpMod", hex_list(&voice.amp_mod())),
            ("smpsVcDecayRate1", hex_list(&voice.decay_rate_1())),
            ("smpsVcDecayRate2", hex_list(&voice.decay_rate_2())),
            ("smpsVcDecayLevel", hex_list(&voice.decay_level())),
            ("smpsVcReleaseRate", hex_list(&voice.release_rate())),
            ("smpsVcTotalLevel", hex_list(&voice.total_level())),
        ];
        for (name, value) in fields {
            self.line(&format!("\t{}\t{}", name, value));
        }
        self.blank();
    }

    fn print_header(&mut self, dis: &Disassembly) {
        self.end_run();
        let header = &dis.header;
        let labels = &dis.labels;

        self.line(&format!(
            "\t{}\t{}",
            "smpsHeaderStartSong",
            dis.options.version.number()
        ));
        self.print_voice_pointer(header, labels);

        match header.layout {
            HeaderLayout::Music {
                fm_channels,
                psg_channels,
                tempo_modifier,
            } => {
                self.line(&format!(
                    "\t{}\t${:02X}, ${:02X}",
                    "smpsHeaderChan", fm_channels, psg_channels
                ));
                self.line(&format!(
                    "\t{}\t${:02X}, ${:02X}",
                    "smpsHeaderTempo", header.tempo_divider, tempo_modifier
                ));
                self.blank();
                for (i, channel) in header.channels.iter().enumerate() {
                    let label = channel_label(labels, channel);
                    let line = match channel.extra {
                        ChannelExtra::Psg { mod_control, tone } => format!(
                            "\t{}\t{}, ${:02X}, ${:02X}, ${:02X}, ${:02X}",
                            "smpsHeaderPSG", label, channel.keydisp as u8, channel.volume, mod_control, tone
                        ),
                        _ => format!(
                            "\t{}\t{}, ${:02X}, ${:02X}",
                            if i == 0 { "smpsHeaderDAC" } else { "smpsHeaderFM" },
                            label,
                            channel.keydisp as u8,
                            channel.volume
                        ),
                    };
                    self.line(&line);
                }
            }
            HeaderLayout::SoundEffect { channel_count } => {
                self.line(&format!(
                    "\t{}\t${:02X}",
                    "smpsHeaderTempoSFX", header.tempo_divider
                ));
                self.line(&format!("\t{}\t${:02X}", "smpsHeaderChanSFX", channel_count));
                self.blank();
                for channel in &header.channels {
                    self.print_sfx_channel(labels, channel);
                }
            }
        }
        self.blank();
    }

    fn print_voice_pointer(&mut self, header: &SmpsHeader, labels: &LabelTable) {
        let voices = format!("{}_Voices", labels.project());
        let line = match header.voices {
            VoicePointer::Null => "\tsmpsHeaderVoiceNull".to_string(),
            VoicePointer::Universal => "\tsmpsHeaderVoiceUVB".to_string(),
            VoicePointer::Local(_) | VoicePointer::OutOfRange(_) => {
                let label = labels
                    .iter()
                    .flat_map(|(_, names)| names.iter())
                    .find(|n| **n == voices)
                    .cloned()
                    .unwrap_or_else(|| format!("${:04X}", header.voice_pointer));
                format!("\t{}\t{}", "smpsHeaderVoice", label)
            }
        };
        self.line(&line);
    }

    fn print_sfx_channel(&mut self, labels: &LabelTable, channel: &ChannelHeader) {
        let ChannelExtra::SoundEffect {
            playback_control,
            channel_id,
        } = channel.extra
        else {
            return;
        };
        let id = sfx_channel_constant(channel_id)
            .map(str::to_string)
            .unwrap_or_else(|| format!("${:02X}", channel_id));
        let label = channel_label(labels, channel);
        if playback_control == SFX_PLAYBACK_CONTROL {
            self.line(&format!(
                "\t{}\t{}, {}, ${:02X}, ${:02X}",
                "smpsHeaderSFXChannel", id, label, channel.keydisp as u8, channel.volume
            ));
        } else {
            self.line(&format!(
                "\t; Unexpected playback control byte ${:02X}",
                playback_control
            ));
            self.line(&format!("\tdc.b\t${:02X}, {}", playback_control, id));
            self.line(&format!("\tdc.w\t{}", label));
            self.line(&format!(
                "\tdc.b\t${:02X}, ${:02X}",
                channel.keydisp as u8, channel.volume
            ));
        }
    }
}

/// Label naming a channel's entry point.
fn channel_label(labels: &LabelTable, channel: &ChannelHeader) -> String {
    let own = format!("{}_{}", labels.project(), channel.name);
    let names = labels.names_at(channel.address);
    if names.iter().any(|n| *n == own) {
        return own;
    }
    names
        .first()
        .cloned()
        .unwrap_or_else(|| format!("${:04X}", channel.pointer))
}
