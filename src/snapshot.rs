use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde_json::{json, Value};

use crate::flag::Flag;
use crate::store::Store;

/// FlagSet is an immutable snapshot of every known flag, stamped with the time it was produced.
#[derive(Clone, Debug)]
pub struct FlagSet {
    flags: HashMap<String, Flag>,
    last_update: DateTime<Utc>,
}

impl FlagSet {
    /// Create a snapshot stamped with the current time.
    pub fn new(flags: HashMap<String, Flag>) -> Self {
        Self::with_timestamp(flags, Utc::now())
    }

    pub fn with_timestamp(flags: HashMap<String, Flag>, last_update: DateTime<Utc>) -> Self {
        Self { flags, last_update }
    }

    pub fn flags(&self) -> &HashMap<String, Flag> {
        &self.flags
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flag names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.flags.keys().map(String::as_str).sorted().collect()
    }

    /// The snapshot as a flag document, readable by [crate::parse_flags]. Flags are ordered by
    /// name.
    pub fn to_document(&self) -> Value {
        let records: Vec<&Flag> = self
            .flags
            .values()
            .sorted_by(|a, b| a.name().cmp(b.name()))
            .collect();
        json!({ "flags": records })
    }
}

impl Store for FlagSet {
    fn flag(&self, name: &str) -> Option<&Flag> {
        self.flags.get(name)
    }
}

/// SnapshotCell holds the current [FlagSet] and replaces it as a whole.
///
/// Readers take a clone of the inner `Arc` and keep a consistent snapshot for as long as they
/// hold it. The lock only guards the pointer, never the work that builds a new snapshot.
#[derive(Debug)]
pub(crate) struct SnapshotCell {
    current: RwLock<Arc<FlagSet>>,
}

impl SnapshotCell {
    pub(crate) fn new(initial: FlagSet) -> Self {
        Self {
            current: RwLock::new(Arc::new(initial)),
        }
    }

    pub(crate) fn load(&self) -> Arc<FlagSet> {
        // a poisoned lock still guards a complete Arc
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn store(&self, next: FlagSet) {
        let next = Arc::new(next);
        let previous = {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        // the old snapshot is released outside the lock
        drop(previous);
    }
}
