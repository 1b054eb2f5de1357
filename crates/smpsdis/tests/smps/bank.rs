// Bank mode over a little-endian pointer table.
use smpsdis::dialect::EngineVersion;
use smpsdis::smps::{BankSlot, DisasmOptions, disassemble_bank, render_bank};
use smpsdis::smps::bank::read_pointer_table;

use crate::place;

fn bank() -> Vec<u8> {
    // entry 0 valid at 0x10, entry 1 empty, entry 2 valid but out of range,
    // entry 3 valid at 0x20
    let mut bytes = vec![0x10, 0x80, 0x00, 0x00, 0x00, 0xF0, 0x20, 0x80];
    for start in [0x10usize, 0x20] {
        let dac = (start + 10) as u16 | 0x8000;
        let mut header = vec![0x00, 0x00, 0x01, 0x00, 0x01, 0x05];
        header.extend_from_slice(&dac.to_be_bytes());
        header.extend_from_slice(&[0x00, 0x00]);
        header.extend_from_slice(&[0x81, 0xF2]);
        place(&mut bytes, start, &header);
    }
    bytes
}

#[test]
fn test_pointer_table() {
    let entries = read_pointer_table(&bank(), 0, 4, 0).expect("table fits");
    assert_eq!(entries.len(), 4);
    assert!(entries[0].valid);
    assert_eq!(entries[0].address, 0x10);
    assert!(!entries[1].valid);
    assert_eq!(entries[2].address, 0x7000);

    assert!(read_pointer_table(&bank(), 0, 0x100, 0).is_err());
}

#[test]
fn test_bank_entries_are_disassembled_in_order() {
    let bytes = bank();
    let opts = DisasmOptions::new("Bank", EngineVersion::V2);
    let slots = disassemble_bank(&bytes, 0, 4, &opts).expect("table fits");

    assert_eq!(slots.len(), 4);
    assert_eq!(
        slots.iter().map(BankSlot::index).collect::<Vec<_>>(),
        vec![0, 1, 2, 3]
    );
    assert_eq!(slots[1], BankSlot::Empty { index: 1, raw: 0 });
    assert_eq!(
        slots[2],
        BankSlot::OutOfRange {
            index: 2,
            address: 0x7000
        }
    );

    for (slot, start, project) in [(&slots[0], 0x10, "Bank_00"), (&slots[3], 0x20, "Bank_03")] {
        if let BankSlot::Disassembled { address, result, .. } = slot {
            assert_eq!(*address, start);
            let dis = result.as_ref().expect("entry should parse");
            assert_eq!(dis.labels.project(), project);
            assert_eq!(
                dis.labels.first(start + 10),
                Some(format!("{}_DAC", project).as_str())
            );
        } else {
            panic!("expected a disassembled entry, got {:?}", slot);
        }
    }

    let text = render_bank(&slots);
    assert!(text.contains("Bank_00_DAC:\n"));
    assert!(text.contains("Bank_03_DAC:\n"));
    assert!(text.contains("; Entry $01: empty ($0000)\n"));
    // independent engines: both entries number their labels from scratch
    let again = render_bank(&disassemble_bank(&bytes, 0, 4, &opts).expect("table fits"));
    assert_eq!(text, again);
}
