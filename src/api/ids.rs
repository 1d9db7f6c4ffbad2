//! Process-local surrogate ids.
//!
//! Scene nodes have no portable identity, so each (kind, name) pair gets a
//! monotonic integer the first time it is observed. Ids live as long as the
//! process. A renamed node is a new key and gets a new id.

use std::collections::HashMap;

use crate::host::NodeKind;

#[derive(Debug, Default)]
pub struct IdTable {
    ids: HashMap<NodeKind, HashMap<String, u64>>,
    next: u64,
}

impl IdTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name` of `kind`, assigning one on first use.
    pub fn id(&mut self, kind: NodeKind, name: &str) -> u64 {
        let by_name = self.ids.entry(kind).or_default();
        if let Some(&id) = by_name.get(name) {
            return id;
        }
        self.next += 1;
        by_name.insert(name.to_string(), self.next);
        self.next
    }

    pub fn len(&self) -> usize {
        self.ids.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
