//! Per-disassembly configuration.
use crate::dialect::{Addressing, ByteOrder, DialectPolicy, EngineVersion};

/// Whether the header describes a song or a sound effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SongKind {
    #[default]
    Music,
    SoundEffect,
}

/// Settings for one disassembly run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisasmOptions {
    /// Prefix of every emitted label.
    pub project: String,
    pub version: EngineVersion,
    pub kind: SongKind,
    /// Offset of the header inside the input.
    pub header_offset: usize,
    /// Base added to header (and, for banked dialects, track) pointers.
    ///
    /// `None` picks the header offset for self-relative dialects and `0`
    /// for bank-relative ones.
    pub base: Option<isize>,
    /// Override of the dialect's byte order.
    pub byte_order: Option<ByteOrder>,
    /// Re-emit the implicit rest the version 3 driver inserts before some
    /// coordination flags.
    pub s3k_rest_compat: bool,
}

impl Default for DisasmOptions {
    fn default() -> Self {
        Self {
            project: "Song".to_string(),
            version: EngineVersion::V2,
            kind: SongKind::Music,
            header_offset: 0,
            base: None,
            byte_order: None,
            s3k_rest_compat: false,
        }
    }
}

impl DisasmOptions {
    pub fn new(project: impl Into<String>, version: EngineVersion) -> Self {
        Self {
            project: project.into(),
            version,
            ..Self::default()
        }
    }

    /// Dialect policy for these options.
    pub fn policy(&self) -> DialectPolicy {
        let policy = DialectPolicy::for_version(self.version);
        match self.byte_order {
            Some(order) => policy.with_byte_order(order),
            None => policy,
        }
    }

    /// Base actually used for pointer resolution.
    pub fn effective_base(&self) -> isize {
        match (self.base, self.policy().addressing()) {
            (Some(base), _) => base,
            (None, Addressing::SelfRelative) => self.header_offset as isize,
            (None, Addressing::BankRelative) => 0,
        }
    }
}
