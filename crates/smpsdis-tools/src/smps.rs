use std::fs::File;
use std::io::{Read, stdin};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use comfy_table::{Cell, ContentArrangement, Table, presets::NOTHING};
use flate2::read::GzDecoder;
use smpsdis::dialect::{ByteOrder, EngineVersion};
use smpsdis::smps::header::{ChannelExtra, HeaderLayout, VoicePointer};
use smpsdis::smps::{
    DisasmOptions, Disassembly, SongKind, VoiceTableStatus, disassemble, disassemble_bank,
    render_bank,
};

use crate::DisasmArgs;

fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == 0x1F && bytes[1] == 0x8B
}

fn gunzip(bytes: &[u8], what: &str) -> anyhow::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .with_context(|| format!("failed to decompress gzip data from {}", what))?;
    Ok(out)
}

/// Read input bytes from a path or stdin ('-').
///
/// Gzip-compressed input is detected by its magic bytes (0x1F 0x8B) and
/// decompressed.
pub fn read_input_as_vec(path: &PathBuf) -> anyhow::Result<Vec<u8>> {
    let mut inbuf = Vec::new();
    if path == Path::new("-") {
        stdin()
            .read_to_end(&mut inbuf)
            .context("failed to read from stdin")?;
    } else {
        let mut f = File::open(path)
            .with_context(|| format!("failed to open input file: {}", path.display()))?;
        f.read_to_end(&mut inbuf)
            .context("failed to read input file")?;
    }
    if is_gzip(&inbuf) {
        gunzip(&inbuf, &path.display().to_string())
    } else {
        Ok(inbuf)
    }
}

/// Label prefix derived from the input file name.
fn project_from_path(path: &Path) -> String {
    if path == Path::new("-") {
        return "Song".to_string();
    }
    let stem: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    match stem.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => stem,
        Some(_) => format!("Song_{}", stem),
        None => "Song".to_string(),
    }
}

fn build_options(path: &Path, args: &DisasmArgs) -> anyhow::Result<DisasmOptions> {
    let version = EngineVersion::try_from(args.engine)
        .map_err(|e| anyhow!("invalid engine version: {}", e))?;
    Ok(DisasmOptions {
        project: args
            .project
            .clone()
            .unwrap_or_else(|| project_from_path(path)),
        version,
        kind: if args.sfx {
            SongKind::SoundEffect
        } else {
            SongKind::Music
        },
        header_offset: args.offset,
        base: args.base,
        byte_order: args.little_endian.then_some(ByteOrder::LittleEndian),
        s3k_rest_compat: args.s3k_rest,
    })
}

fn write_output(output: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match output {
        Some(out) => std::fs::write(out, text)
            .with_context(|| format!("failed to write output file: {}", out.display())),
        None => {
            print!("{}", text);
            Ok(())
        }
    }
}

/// Disasm command: one song or sound effect.
pub fn disasm(
    path: &Path,
    data: Vec<u8>,
    args: &DisasmArgs,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let options = build_options(path, args)?;
    let dis = disassemble(&data, options)
        .with_context(|| format!("failed to disassemble {}", path.display()))?;
    for diagnostic in &dis.diagnostics {
        eprintln!("{}: {}", path.display(), diagnostic);
    }
    write_output(output, &dis.render())
}

/// Bank command: every entry of a pointer table.
pub fn bank(
    path: &Path,
    data: Vec<u8>,
    table: usize,
    count: usize,
    args: &DisasmArgs,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let options = build_options(path, args)?;
    let slots = disassemble_bank(&data, table, count, &options)
        .with_context(|| format!("failed to read pointer table of {}", path.display()))?;
    write_output(output, &render_bank(&slots))
}

fn summarize(dis: &Disassembly) -> Vec<(String, String)> {
    let header = &dis.header;
    let mut rows = vec![
        ("Engine version".to_string(), dis.options.version.to_string()),
        (
            "Kind".to_string(),
            format!("{:?}", header.kind()),
        ),
        (
            "Header".to_string(),
            format!("0x{:04X}..0x{:04X}", header.start, header.end),
        ),
    ];

    let voices = match header.voices {
        VoicePointer::Local(a) => format!("0x{:04X} -> 0x{:04X}", header.voice_pointer, a),
        VoicePointer::Null => "null".to_string(),
        VoicePointer::Universal => "universal voice bank".to_string(),
        VoicePointer::OutOfRange(a) => format!(
            "0x{:04X} -> 0x{:X} (outside input)",
            header.voice_pointer, a
        ),
    };
    rows.push(("Voice pointer".to_string(), voices));

    let tempo = match header.layout {
        HeaderLayout::Music { tempo_modifier, .. } => format!(
            "divider 0x{:02X}, modifier 0x{:02X}",
            header.tempo_divider, tempo_modifier
        ),
        HeaderLayout::SoundEffect { .. } => format!("divider 0x{:02X}", header.tempo_divider),
    };
    rows.push(("Tempo".to_string(), tempo));

    let channels = header
        .channels
        .iter()
        .map(|c| {
            let extra = match c.extra {
                ChannelExtra::SoundEffect {
                    playback_control,
                    channel_id,
                } => format!("  id 0x{:02X} ctrl 0x{:02X}", channel_id, playback_control),
                _ => String::new(),
            };
            format!(
                "{:<6} 0x{:04X}  key {:+}  vol 0x{:02X}{}",
                c.name, c.address, c.keydisp, c.volume, extra
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    rows.push(("Channels".to_string(), channels));

    let voice_table = match dis.voice_table {
        VoiceTableStatus::Decoded { count, requested } => {
            format!("{} of {} voices decoded", count, requested)
        }
        VoiceTableStatus::NotReferenced => "not referenced".to_string(),
        VoiceTableStatus::Null { requested }
        | VoiceTableStatus::Universal { requested }
        | VoiceTableStatus::OutOfRange { requested, .. } => {
            format!("external, {} voices referenced", requested)
        }
    };
    rows.push(("Voice table".to_string(), voice_table));
    rows.push(("Events".to_string(), dis.events.len().to_string()));
    rows.push(("Labels".to_string(), dis.labels.len().to_string()));
    rows.push((
        "Explored bytes".to_string(),
        dis.explored_bytes.to_string(),
    ));

    let diagnostics = if dis.diagnostics.is_empty() {
        "(none)".to_string()
    } else {
        dis.diagnostics
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    };
    rows.push(("Diagnostics".to_string(), diagnostics));
    rows
}

/// Info command: header fields and exploration statistics.
///
/// A header that cannot be parsed is reported on stderr with the file name.
pub fn info(path: &Path, data: Vec<u8>, args: &DisasmArgs) -> anyhow::Result<()> {
    let file_str = match path.canonicalize() {
        Ok(p) => p.to_string_lossy().into_owned(),
        Err(_) => path.to_string_lossy().into_owned(),
    };
    let options = build_options(path, args)?;
    let dis = match disassemble(&data, options) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("\"{}\": parse error: {}", file_str, e);
            return Ok(());
        }
    };

    let mut table = Table::new();
    table.load_preset(NOTHING);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("Field"), Cell::new("Value")]);
    for (k, v) in summarize(&dis) {
        for (i, line) in v.split('\n').enumerate() {
            let key = if i == 0 { k.clone() } else { String::new() };
            table.add_row(vec![Cell::new(key), Cell::new(line)]);
        }
    }
    println!("\"{}\"", file_str);
    println!("{}", table);
    Ok(())
}
