//! smpsdis: explorer and disassembler for SMPS sound-driver bytecode
//!
//! SMPS is the sound driver family used by Sonic the Hedgehog games on the
//! Mega Drive. Songs and sound effects are stored as a header followed by
//! one bytecode track per channel and a table of FM voices. This crate
//! walks that bytecode from the header's entry points, follows every jump,
//! call and loop, and prints the result as SMPS2ASM source.
//!
//! Three dialects are supported:
//! - version 1 (Sonic 1, 68k driver, self-relative track pointers),
//! - version 2 (Sonic 2, Z80 driver, banked pointers),
//! - version 3 and later (Sonic 3 & Knuckles, adds the `0xFF` meta flags).
//!
//! Example
//!
//! ```rust
//! use smpsdis::dialect::EngineVersion;
//! use smpsdis::smps::{DisasmOptions, disassemble};
//!
//! let song = [
//!     0x00, 0x00, // no voice table
//!     0x01, 0x00, // one FM channel (the DAC), no PSG
//!     0x01, 0x05, // tempo
//!     0x00, 0x0A, 0x00, 0x00, // DAC track at 0x0A
//!     0x81, 0x0C, 0xF2, // kick, duration, stop
//! ];
//! let dis = disassemble(&song, DisasmOptions::new("Song", EngineVersion::V2)).unwrap();
//! let text = dis.render();
//! assert!(text.contains("Song_DAC:"));
//! assert!(text.contains("\tsmpsStop"));
//! ```
mod binutil;
pub mod dialect;
pub mod smps;
pub mod voice;

pub use binutil::ParseError;
