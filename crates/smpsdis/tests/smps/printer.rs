// Text output: header macros, packing, labels and the legacy rest mode.
use smpsdis::dialect::EngineVersion;
use smpsdis::smps::{DisasmOptions, disassemble};

use crate::{music_header, options, place, voice};

fn render(bytes: &[u8], options: DisasmOptions) -> String {
    disassemble(bytes, options)
        .expect("header should parse")
        .render()
}

/// Version 3 song whose FM track plays a rest and then selects a voice.
fn rest_then_voice() -> Vec<u8> {
    let mut bytes = music_header(0x0000, &[0x0E, 0x0F], &[]);
    place(&mut bytes, 0x0E, &[0xF2]);
    place(&mut bytes, 0x0F, &[0x80, 0x0C, 0xEF, 0x00, 0xF2]);
    bytes
}

#[test]
fn test_music_header_block() {
    let mut bytes = music_header(0x8017, &[0x14, 0x15], &[(0x16, -12)]);
    place(&mut bytes, 0x14, &[0xF2, 0xF2, 0xF2]);

    let text = render(&bytes, options(EngineVersion::V2));
    let expected = "Song_Header:\n\
                    \tsmpsHeaderStartSong\t2\n\
                    \tsmpsHeaderVoice\tSong_Voices\n\
                    \tsmpsHeaderChan\t$02, $01\n\
                    \tsmpsHeaderTempo\t$01, $05\n\
                    \n\
                    \tsmpsHeaderDAC\tSong_DAC, $00, $00\n\
                    \tsmpsHeaderFM\tSong_FM1, $00, $00\n\
                    \tsmpsHeaderPSG\tSong_PSG1, $F4, $02, $00, $00\n\
                    \n\
                    Song_DAC:\n\
                    \tsmpsStop\n";
    assert!(text.starts_with(expected), "got:\n{}", text);
}

#[test]
fn test_packed_lines_hold_twelve_items() {
    // version 1 header pointers are not banked
    let mut bytes = vec![0x00, 0x00, 0x01, 0x00, 0x01, 0x05, 0x00, 0x0A, 0x00, 0x00];
    // kick + 13 durations, then stop
    let mut track = vec![0x81];
    track.extend(std::iter::repeat_n(0x0C, 13));
    track.push(0xF2);
    place(&mut bytes, 0x0A, &track);

    let text = render(&bytes, options(EngineVersion::V1));
    let first = "\tdc.b\tdKick, $0C, $0C, $0C, $0C, $0C, $0C, $0C, $0C, $0C, $0C, $0C\n";
    assert!(text.contains(first), "got:\n{}", text);
    assert!(text.contains("\tdc.b\t$0C, $0C\n\tsmpsStop\n"));
}

#[test]
fn test_pointer_events_print_labels() {
    let mut bytes = music_header(0x0000, &[0x0A], &[]);
    place(
        &mut bytes,
        0x0A,
        &[0x81, 0x0C, 0xF7, 0x00, 0x02, 0x80, 0x0B, 0xF6, 0x80, 0x0A],
    );

    let text = render(&bytes, options(EngineVersion::V2));
    assert!(text.contains("Song_DAC:\n\tdc.b\t$81\n\nSong_Loop00:\n\tdc.b\t$0C\n"));
    assert!(text.contains("\tsmpsLoop\t$00, $02, Song_Loop00\n"));
    assert!(text.contains("\tsmpsJump\tSong_DAC\n"));
    assert!(!text.contains("smpsJump\t$"));
}

#[test]
fn test_copy_data_prints_label_before_length() {
    let mut bytes = music_header(0x0000, &[0x0E, 0x0F], &[]);
    place(&mut bytes, 0x0E, &[0xF2]);
    place(&mut bytes, 0x0F, &[0xFF, 0x03, 0x80, 0x0E, 0x01, 0xF2]);

    let text = render(&bytes, options(EngineVersion::V3));
    assert!(text.contains("\tsmpsCopyData\tSong_DAC, $01\n"), "got:\n{}", text);
}

#[test]
fn test_unknown_flag_is_emitted_as_raw_byte() {
    let mut bytes = music_header(0x0000, &[0x0A], &[]);
    place(&mut bytes, 0x0A, &[0xFA, 0xF2]);

    let text = render(&bytes, options(EngineVersion::V2));
    assert!(text.contains("\tdc.b\t$FA\t; unrecognized coordination flag\n\tsmpsStop\n"));
}

#[test]
fn test_voice_records() {
    let mut bytes = music_header(0x8012, &[0x0E, 0x0F], &[]);
    place(&mut bytes, 0x0E, &[0xF2]);
    place(&mut bytes, 0x0F, &[0xEF, 0x00, 0xF2]);
    let mut v = voice(0);
    v[0] = 0x3A; // feedback 7, algorithm 2
    v[1] = 0x71; // detune 7, multiple 1
    v[21] = 0x7F;
    place(&mut bytes, 0x12, &v);

    let text = render(&bytes, options(EngineVersion::V2));
    assert!(text.contains("Song_Voices:\n; Voice $00\n\tsmpsVcAlgorithm\t$02\n\tsmpsVcFeedback\t$07\n"));
    assert!(text.contains("\tsmpsVcDetune\t$07, $00, $00, $00\n"));
    assert!(text.contains("\tsmpsVcCoarseFreq\t$01, $00, $00, $00\n"));
    assert!(text.contains("\tsmpsVcTotalLevel\t$7F, $00, $00, $00\n"));
}

#[test]
fn test_legacy_rest_before_set_voice() {
    let bytes = rest_then_voice();

    let plain = render(&bytes, options(EngineVersion::V3));
    assert!(plain.contains("\tdc.b\tnRst, $0C\n\tsmpsSetvoice\t$00\n"));

    let legacy = DisasmOptions {
        s3k_rest_compat: true,
        ..options(EngineVersion::V3)
    };
    let text = render(&bytes, legacy.clone());
    assert!(text.contains("\tdc.b\tnRst, $0C\n\tdc.b\tnRst\n\tsmpsSetvoice\t$00\n"));

    // only honoured for version 3
    let v2 = DisasmOptions {
        version: EngineVersion::V2,
        ..legacy
    };
    assert!(!render(&bytes, v2).contains("\tdc.b\tnRst\n"));
}

#[test]
fn test_legacy_rest_flag_is_cleared_by_labels() {
    // the DAC track jumps to the SetVoice in the FM track, so a label sits
    // between the rest and the flag
    let mut bytes = music_header(0x0000, &[0x0E, 0x11], &[]);
    place(&mut bytes, 0x0E, &[0xF6, 0x80, 0x13]);
    place(&mut bytes, 0x11, &[0x80, 0x0C, 0xEF, 0x00, 0xF2]);

    let legacy = DisasmOptions {
        s3k_rest_compat: true,
        ..options(EngineVersion::V3)
    };
    let text = render(&bytes, legacy);
    assert!(
        text.contains("\tdc.b\tnRst, $0C\n\nSong_Jump00:\n\tsmpsSetvoice\t$00\n"),
        "got:\n{}",
        text
    );
    assert!(!text.contains("\tdc.b\tnRst\n"));
}

#[test]
fn test_truncated_instruction_keeps_its_bytes() {
    let mut bytes = music_header(0x0000, &[0x0A], &[]);
    place(&mut bytes, 0x0A, &[0x0C, 0xF0, 0x01, 0x02]);

    let text = render(&bytes, options(EngineVersion::V2));
    assert!(
        text.contains(
            "Song_DAC:\n\tdc.b\t$0C\n; truncated instruction $F0 at $000B\n\tdc.b\t$F0, $01, $02\n"
        ),
        "got:\n{}",
        text
    );
}

#[test]
fn test_label_inside_operands_is_placed_relative() {
    let mut bytes = music_header(0x0000, &[0x14, 0x15], &[(0x1B, 0)]);
    place(&mut bytes, 0x14, &[0xF2]);
    place(&mut bytes, 0x15, &[0xF0, 0x01, 0x02, 0x03, 0x04, 0xF2]);
    place(&mut bytes, 0x1B, &[0xF6, 0x80, 0x17]);

    let text = render(&bytes, options(EngineVersion::V2));
    assert!(
        text.contains(
            "Song_FM1:\n\tsmpsModSet\t$01, $02, $03, $04\nSong_Jump00 = *-3\n\tsmpsStop\n"
        ),
        "got:\n{}",
        text
    );
    assert!(!text.contains("Song_Jump00:"));
    assert!(text.contains("\tsmpsJump\tSong_Jump00\n"));
}

#[test]
fn test_overlapping_instruction_is_emitted_raw() {
    let mut bytes = music_header(0x0000, &[0x10, 0x0E], &[]);
    place(&mut bytes, 0x0E, &[0x0C, 0xF0]);
    place(&mut bytes, 0x10, &[0x0C, 0x0C, 0x0C, 0x0C, 0xF2]);

    let text = render(&bytes, options(EngineVersion::V2));
    let expected = "Song_FM1:\n\
                    \tdc.b\t$0C\n\
                    ; smpsModSet at $000F overlaps decoded data at $0010\n\
                    \tdc.b\t$F0\n\
                    Song_DAC:\n\
                    \tdc.b\t$0C, $0C, $0C, $0C\n\
                    \tsmpsStop\n";
    assert!(text.contains(expected), "got:\n{}", text);
    assert!(!text.contains("smpsModSet\t"));
}
