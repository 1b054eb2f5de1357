// Single-instruction decoding per dialect.
use smpsdis::dialect::{ByteOrder, DialectPolicy, EngineVersion};
use smpsdis::smps::{
    CoordFlag, Decoded, Decoder, Diagnostic, EventKind, LabelKind, LabelTable, LocationClaim,
    TrackClass,
};

fn decode_at(
    bytes: &[u8],
    version: EngineVersion,
    offset: usize,
    class: TrackClass,
    keydisp: i8,
) -> (Decoded, LabelTable, Vec<LocationClaim>) {
    let mut labels = LabelTable::new("Song");
    let mut claims = Vec::new();
    let decoder = Decoder::new(bytes, version, DialectPolicy::for_version(version), 0);
    let decoded = decoder.decode(offset, class, keydisp, &mut labels, &mut claims);
    (decoded, labels, claims)
}

#[test]
fn test_duration_on_dac_track() {
    let (d, labels, claims) = decode_at(&[0x05], EngineVersion::V2, 0, TrackClass::DacTrack, 0);
    assert_eq!(d.event.kind, EventKind::Duration);
    assert_eq!(d.event.opcode, 0x05);
    assert!(d.event.params().is_empty());
    assert!(!d.event.ends_track);
    assert_eq!(d.keydisp, 0);
    assert_eq!(d.next, 1);
    assert!(labels.is_empty());
    assert!(claims.is_empty());
}

#[test]
fn test_notes_and_rests() {
    let (d, _, _) = decode_at(&[0x80], EngineVersion::V2, 0, TrackClass::FmTrack, 0);
    assert!(d.event.is_rest);
    assert_eq!(d.event.kind, EventKind::RealNote { dac: false });

    let (d, _, _) = decode_at(&[0x81], EngineVersion::V1, 0, TrackClass::DacTrack, 0);
    assert!(!d.event.is_rest);
    assert_eq!(d.event.kind, EventKind::RealNote { dac: true });

    let (d, _, _) = decode_at(&[0xDF], EngineVersion::V3, 0, TrackClass::PsgTrack, 0);
    assert_eq!(d.event.kind, EventKind::RealNote { dac: false });
}

#[test]
fn test_loop_creates_label_and_claim() {
    let mut bytes = vec![0xF7, 0x02, 0x05, 0x80, 0x10];
    bytes.resize(0x20, 0);
    let (d, labels, claims) = decode_at(&bytes, EngineVersion::V2, 0, TrackClass::FmTrack, 3);

    if let EventKind::MetaPointer2Params(flag, params, target) = &d.event.kind {
        assert_eq!(*flag, CoordFlag::Loop);
        assert_eq!(*params, [0x02, 0x05]);
        assert_eq!(*target, 0x10);
    } else {
        panic!("expected a loop event, got {:?}", d.event.kind);
    }
    assert!(d.event.has_pointer());
    assert!(!d.event.ends_track);
    assert_eq!(d.next, 5);
    assert_eq!(labels.first(0x10), Some("Song_Loop00"));
    assert_eq!(claims, vec![LocationClaim::new(TrackClass::FmTrack, 0x10, 3)]);
}

#[test]
fn test_self_relative_pointers() {
    // forward loop: pointer field ends at 5, +0x0B
    let mut bytes = vec![0xF7, 0x00, 0x02, 0x00, 0x0B];
    bytes.resize(0x20, 0);
    // backward jump at 0x10: field ends at 0x13, -0x12
    bytes[0x10..0x13].copy_from_slice(&[0xF6, 0xFF, 0xEE]);

    let (d, labels, _) = decode_at(&bytes, EngineVersion::V1, 0, TrackClass::FmTrack, 0);
    assert_eq!(d.event.target(), Some(0x10));
    assert_eq!(labels.first(0x10), Some("Song_Loop00"));

    let (d, labels, claims) = decode_at(&bytes, EngineVersion::V1, 0x10, TrackClass::PsgTrack, 0);
    assert_eq!(d.event.kind, EventKind::MetaPointer(CoordFlag::Jump, 0x01));
    assert!(d.event.ends_track);
    assert_eq!(labels.first(0x01), Some("Song_Jump00"));
    assert_eq!(claims[0].class, TrackClass::PsgTrack);
}

#[test]
fn test_little_endian_override() {
    let mut bytes = vec![0xF6, 0x10, 0x80];
    bytes.resize(0x20, 0);
    let policy = DialectPolicy::for_version(EngineVersion::V2).with_byte_order(ByteOrder::LittleEndian);
    let decoder = Decoder::new(&bytes, EngineVersion::V2, policy, 0);
    let mut labels = LabelTable::new("Song");
    let mut claims = Vec::new();
    let d = decoder.decode(0, TrackClass::FmTrack, 0, &mut labels, &mut claims);
    assert_eq!(d.event.target(), Some(0x10));
}

#[test]
fn test_fe_is_not_fm3_special_mode_before_version_3() {
    for version in [EngineVersion::V1, EngineVersion::V2] {
        let (d, _, _) = decode_at(
            &[0xFE, 0x01, 0x02, 0x03, 0x04],
            version,
            0,
            TrackClass::FmTrack,
            0,
        );
        assert_eq!(d.event.kind, EventKind::MetaNoParams(CoordFlag::Unknown));
        assert_ne!(d.event.flag(), Some(CoordFlag::Fm3SpecialMode));
        assert_eq!(d.next, 1);
        assert_eq!(
            d.diagnostic,
            Some(Diagnostic::UnknownOpcode {
                opcode: 0xFE,
                sub: None,
                offset: 0
            })
        );
    }

    let (d, _, _) = decode_at(
        &[0xFE, 0x01, 0x02, 0x03, 0x04],
        EngineVersion::V3,
        0,
        TrackClass::FmTrack,
        0,
    );
    assert_eq!(
        d.event.kind,
        EventKind::Meta4Params(CoordFlag::Fm3SpecialMode, [0x01, 0x02, 0x03, 0x04])
    );
    assert_eq!(d.next, 5);
}

#[test]
fn test_version_1_only_flags() {
    let (d, _, _) = decode_at(&[0xEE], EngineVersion::V1, 0, TrackClass::FmTrack, 0);
    assert_eq!(d.event.flag(), Some(CoordFlag::StopSpecial));
    assert!(d.event.ends_track);

    let (d, _, _) = decode_at(&[0xEE], EngineVersion::V2, 0, TrackClass::FmTrack, 0);
    assert_eq!(d.event.flag(), Some(CoordFlag::Unknown));
    assert!(!d.event.ends_track);
}

#[test]
fn test_transposition_threads_keydisp() {
    let (d, _, _) = decode_at(&[0xE9, 0xFE], EngineVersion::V2, 0, TrackClass::FmTrack, 3);
    assert_eq!(d.event.keydisp, 3);
    assert_eq!(d.keydisp, 1);

    let (d, _, _) = decode_at(&[0xFB, 0x05], EngineVersion::V3, 0, TrackClass::FmTrack, 0x7E);
    assert_eq!(d.keydisp, (0x7Ei8).wrapping_add(5));

    // E9 is the spindash flag in version 3
    let (d, _, _) = decode_at(&[0xE9, 0x05], EngineVersion::V3, 0, TrackClass::FmTrack, 2);
    assert_eq!(d.event.flag(), Some(CoordFlag::SpindashRev));
    assert_eq!(d.keydisp, 2);
    assert_eq!(d.next, 1);
}

#[test]
fn test_meta_sub_commands() {
    let (d, _, _) = decode_at(
        &[0xFF, 0x05, 0x0A, 0x0B, 0x0C, 0x0D],
        EngineVersion::V3,
        0,
        TrackClass::FmTrack,
        0,
    );
    assert_eq!(
        d.event.kind,
        EventKind::Meta5Params(CoordFlag::SsgEg, [0x05, 0x0A, 0x0B, 0x0C, 0x0D])
    );
    assert_eq!(d.next, 6);

    let mut bytes = vec![0xFF, 0x03, 0x80, 0x20, 0x04];
    bytes.resize(0x30, 0);
    let (d, labels, claims) = decode_at(&bytes, EngineVersion::V3, 0, TrackClass::FmTrack, 0);
    assert_eq!(
        d.event.kind,
        EventKind::MetaPointer2Params(CoordFlag::CopyData, [0x03, 0x04], 0x20)
    );
    assert_eq!(d.next, 5);
    assert_eq!(labels.first(0x20), Some("Song_Jump00"));
    assert_eq!(claims.len(), 1);

    let (d, _, _) = decode_at(&[0xFF, 0x09], EngineVersion::V3, 0, TrackClass::FmTrack, 0);
    assert_eq!(d.event.flag(), Some(CoordFlag::Unknown));
    assert_eq!(d.next, 1);
    assert_eq!(
        d.diagnostic,
        Some(Diagnostic::UnknownOpcode {
            opcode: 0xFF,
            sub: Some(0x09),
            offset: 0
        })
    );
}

#[test]
fn test_truncated_instructions_end_the_track() {
    let (d, _, _) = decode_at(&[0x81, 0xF0, 0x01, 0x02], EngineVersion::V2, 1, TrackClass::FmTrack, 0);
    assert!(d.event.ends_track);
    assert!(matches!(
        &d.event.kind,
        EventKind::Null { comment: Some(_), raw } if raw == &[0xF0, 0x01, 0x02]
    ));
    assert_eq!(d.event.size(), 3);
    assert_eq!(d.next, 4);
    assert_eq!(
        d.diagnostic,
        Some(Diagnostic::Truncated {
            opcode: 0xF0,
            offset: 1
        })
    );

    // pointer cut in half: no label, no claim
    let (d, labels, claims) = decode_at(&[0xF7, 0x02, 0x05, 0x80], EngineVersion::V2, 0, TrackClass::FmTrack, 0);
    assert!(d.event.ends_track);
    assert!(labels.is_empty());
    assert!(claims.is_empty());

    let (d, _, _) = decode_at(&[0xFF], EngineVersion::V3, 0, TrackClass::FmTrack, 0);
    assert!(d.event.ends_track);
    assert_eq!(d.next, 1);
}

#[test]
fn test_read_instruction_leaves_labels_alone() {
    let mut bytes = vec![0xF8, 0x80, 0x10];
    bytes.resize(0x20, 0);
    let decoder = Decoder::new(
        &bytes,
        EngineVersion::V2,
        DialectPolicy::for_version(EngineVersion::V2),
        0,
    );
    let d = decoder.read_instruction(0, TrackClass::FmTrack, 4);
    assert_eq!(d.pointer, Some((0x10, LabelKind::Call)));
    assert_eq!(d.event.size(), 3);

    let mut labels = LabelTable::new("Song");
    let mut claims = Vec::new();
    assert!(labels.is_empty());
    d.link(TrackClass::FmTrack, &mut labels, &mut claims);
    assert_eq!(labels.first(0x10), Some("Song_Call00"));
    assert_eq!(claims, vec![LocationClaim::new(TrackClass::FmTrack, 0x10, 4)]);
}
