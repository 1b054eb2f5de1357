//! Label table: address to one or more symbolic names.
//!
//! The table is append-only. Structural labels (`<project>_Header`,
//! `<project>_FM1`, ...) are added by the engine while seeding; pointer
//! labels (`<project>_Jump00`, `<project>_Call00`, `<project>_Loop00`) are
//! synthesized by the decoder the first time an unlabelled address is the
//! target of a pointer. Name counters belong to the table instance, so two
//! disassemblies never influence each other's names.
use std::collections::{BTreeMap, HashSet};
use std::ops::RangeBounds;

use crate::smps::event::LabelKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    project: String,
    labels: BTreeMap<usize, Vec<String>>,
    issued: HashSet<String>,
    jumps: u32,
    calls: u32,
    loops: u32,
}

impl LabelTable {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            ..Self::default()
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Add the structural label `<project>_<suffix>` at `address`.
    ///
    /// A name already present at the same address is not added twice. When
    /// the name is taken by another address a numeric suffix keeps it unique.
    /// Returns the name that labels `address`.
    pub fn add_structural(&mut self, address: usize, suffix: &str) -> String {
        let base = format!("{}_{}", self.project, suffix);
        if self.names_at(address).iter().any(|n| *n == base) {
            return base;
        }
        let mut name = base.clone();
        let mut n = 2;
        while self.issued.contains(&name) {
            name = format!("{}_{}", base, n);
            n += 1;
        }
        self.insert(address, name.clone());
        name
    }

    /// Return the label at `address`, synthesizing a `kind` label when the
    /// address has none yet.
    pub fn ensure_pointer_label(&mut self, address: usize, kind: LabelKind) -> &str {
        if !self.labels.contains_key(&address) {
            let name = loop {
                let counter = match kind {
                    LabelKind::Jump => &mut self.jumps,
                    LabelKind::Call => &mut self.calls,
                    LabelKind::Loop => &mut self.loops,
                };
                let candidate = format!("{}_{}{:02X}", self.project, kind.as_str(), *counter);
                *counter += 1;
                if !self.issued.contains(&candidate) {
                    break candidate;
                }
            };
            self.insert(address, name);
        }
        self.labels[&address][0].as_str()
    }

    fn insert(&mut self, address: usize, name: String) {
        self.issued.insert(name.clone());
        self.labels.entry(address).or_default().push(name);
    }

    /// First (primary) name at `address`.
    pub fn first(&self, address: usize) -> Option<&str> {
        self.labels
            .get(&address)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All names at `address`, in the order they were added.
    pub fn names_at(&self, address: usize) -> &[String] {
        self.labels.get(&address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Labelled addresses within `range`, in address order.
    pub fn range<R>(&self, range: R) -> impl Iterator<Item = (usize, &[String])>
    where
        R: RangeBounds<usize>,
    {
        self.labels.range(range).map(|(a, v)| (*a, v.as_slice()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.range(..)
    }

    /// Total number of names in the table.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
