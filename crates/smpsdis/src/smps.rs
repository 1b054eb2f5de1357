//! SMPS exploration, decoding and printing.
//!
//! [`disassemble`] is the one-call entry point; [`Engine`] exposes the
//! state machine step by step for callers that want to watch it.
pub mod bank;
pub mod decoder;
pub mod diagnostic;
pub mod engine;
pub mod event;
pub mod header;
pub mod label;
pub mod options;
pub mod printer;
pub mod track;

pub use bank::{BankSlot, disassemble_bank, render_bank};
pub use decoder::{Decoded, Decoder};
pub use diagnostic::Diagnostic;
pub use engine::{Disassembly, Engine, EngineState, VoiceTableStatus};
pub use event::{CoordFlag, Event, EventKind, LabelKind};
pub use header::{ChannelKind, SmpsHeader, VoicePointer};
pub use label::LabelTable;
pub use options::{DisasmOptions, SongKind};
pub use printer::{Printer, PrinterOptions};
pub use track::{LocationClaim, TrackClass};

use crate::binutil::ParseError;

/// Explore `bytes` from the header described by `options`.
pub fn disassemble(bytes: &[u8], options: DisasmOptions) -> Result<Disassembly, ParseError> {
    Engine::new(bytes, options).run()
}
