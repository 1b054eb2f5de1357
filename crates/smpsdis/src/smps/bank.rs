//! Bank mode: disassemble every song of a pointer table.
//!
//! The table is a run of little-endian 16-bit Z80 pointers. Bit 15 marks a
//! valid entry; the remaining bits are an offset from the caller base.
//! Entries are independent, so each gets its own [`Engine`] and they run in
//! parallel. Results come back in table order.
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::binutil::ParseError;
use crate::dialect::{ByteOrder, DialectPolicy};
use crate::smps::engine::{Disassembly, Engine};
use crate::smps::options::DisasmOptions;

/// One raw pointer-table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BankEntry {
    pub index: usize,
    pub raw: u16,
    /// Resolved header address; meaningful only when `valid`.
    pub address: usize,
    pub valid: bool,
}

/// Outcome for one table entry.
#[derive(Debug, Clone, PartialEq)]
pub enum BankSlot {
    /// Bit 15 is clear.
    Empty { index: usize, raw: u16 },
    /// The entry points outside the input.
    OutOfRange { index: usize, address: usize },
    Disassembled {
        index: usize,
        address: usize,
        result: Result<Disassembly, ParseError>,
    },
}

impl BankSlot {
    pub fn index(&self) -> usize {
        match self {
            BankSlot::Empty { index, .. }
            | BankSlot::OutOfRange { index, .. }
            | BankSlot::Disassembled { index, .. } => *index,
        }
    }
}

/// Read `count` entries of the pointer table at `table_offset`.
///
/// A table that does not fit in the input is a hard error.
pub fn read_pointer_table(
    bytes: &[u8],
    table_offset: usize,
    count: usize,
    base: isize,
) -> Result<Vec<BankEntry>, ParseError> {
    let policy = DialectPolicy::bank_relative().with_byte_order(ByteOrder::LittleEndian);
    (0..count)
        .map(|index| {
            let raw = policy
                .read_u16(bytes, table_offset + index * 2)
                .map_err(|e| e.with_context("bank pointer table"))?;
            Ok(BankEntry {
                index,
                raw,
                address: policy.resolve_header_pointer(raw, base),
                valid: raw & 0x8000 != 0,
            })
        })
        .collect()
}

/// Disassemble every valid entry of the pointer table.
///
/// Each entry is named `<project>_<NN>` after its table index. `options`
/// supplies everything else; its header offset is replaced per entry.
pub fn disassemble_bank(
    bytes: &[u8],
    table_offset: usize,
    count: usize,
    options: &DisasmOptions,
) -> Result<Vec<BankSlot>, ParseError> {
    let entries = read_pointer_table(bytes, table_offset, count, options.base.unwrap_or(0))?;
    debug!(
        "bank table at 0x{:04X}: {} entries, {} valid",
        table_offset,
        entries.len(),
        entries.iter().filter(|e| e.valid).count()
    );

    let slots = entries
        .par_iter()
        .map(|entry| {
            if !entry.valid {
                return BankSlot::Empty {
                    index: entry.index,
                    raw: entry.raw,
                };
            }
            if entry.address >= bytes.len() {
                warn!(
                    "bank entry {:02X} points to 0x{:X}, outside the input",
                    entry.index, entry.address
                );
                return BankSlot::OutOfRange {
                    index: entry.index,
                    address: entry.address,
                };
            }
            let entry_options = DisasmOptions {
                project: format!("{}_{:02X}", options.project, entry.index),
                header_offset: entry.address,
                ..options.clone()
            };
            BankSlot::Disassembled {
                index: entry.index,
                address: entry.address,
                result: Engine::new(bytes, entry_options).run(),
            }
        })
        .collect();
    Ok(slots)
}

/// Render all slots, one section per entry.
pub fn render_bank(slots: &[BankSlot]) -> String {
    let mut out = String::new();
    for slot in slots {
        match slot {
            BankSlot::Empty { index, raw } => {
                out.push_str(&format!("; Entry ${:02X}: empty (${:04X})\n\n", index, raw));
            }
            BankSlot::OutOfRange { index, address } => {
                out.push_str(&format!(
                    "; Entry ${:02X}: ${:04X} lies outside the input\n\n",
                    index, address
                ));
            }
            BankSlot::Disassembled {
                index,
                address,
                result,
            } => match result {
                Ok(dis) => {
                    out.push_str(&format!("; Entry ${:02X} at ${:04X}\n", index, address));
                    out.push_str(&dis.render());
                    out.push('\n');
                }
                Err(e) => {
                    out.push_str(&format!(
                        "; Entry ${:02X} at ${:04X}: {}\n\n",
                        index, address, e
                    ));
                }
            },
        }
    }
    out
}
