//! Per-partition transactions: copy-on-write snapshots with optimistic
//! conflict detection at commit time (spec §4.4, §5).
//!
//! A transaction reads from a fixed [`Snapshot`] taken at `begin`. Commit
//! only succeeds if no other transaction has published a newer snapshot
//! in the meantime; otherwise it fails with [`LdapError::Conflict`] and
//! the caller (the operation manager's retry loop) starts over against
//! the new snapshot.

use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::RwLock;

use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::{LdapError, LdapResult};

/// An immutable point-in-time view of a partition's entries.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub entries: Arc<FnvHashMap<Dn, Arc<Entry>>>,
    pub generation: u64,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            entries: Arc::new(FnvHashMap::default()),
            generation: 0,
        }
    }
}

/// The published, shared state a partition's transactions read from and
/// race to commit into.
#[derive(Debug)]
pub struct PartitionState {
    current: RwLock<Arc<Snapshot>>,
}

impl Default for PartitionState {
    fn default() -> Self {
        Self {
            current: RwLock::new(Arc::new(Snapshot::empty())),
        }
    }
}

impl PartitionState {
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current.read().clone()
    }

    pub fn begin(&self) -> Txn {
        Txn {
            base: self.snapshot(),
            working: FnvHashMap::default(),
        }
    }

    /// Publishes `txn`'s changes iff the snapshot it read from is still
    /// current. Returns [`LdapError::Conflict`] on a lost race.
    pub fn commit(&self, txn: Txn) -> LdapResult<()> {
        if txn.working.is_empty() {
            return Ok(());
        }
        let mut guard = self.current.write();
        if !Arc::ptr_eq(&guard, &txn.base) {
            return Err(LdapError::Conflict);
        }
        let mut entries = (*guard.entries).clone();
        for (dn, change) in txn.working {
            match change {
                Some(entry) => {
                    entries.insert(dn, entry);
                }
                None => {
                    entries.remove(&dn);
                }
            }
        }
        *guard = Arc::new(Snapshot {
            entries: Arc::new(entries),
            generation: guard.generation + 1,
        });
        Ok(())
    }
}

/// A transaction in progress against one partition.
#[derive(Debug)]
pub struct Txn {
    base: Arc<Snapshot>,
    working: FnvHashMap<Dn, Option<Arc<Entry>>>,
}

impl Txn {
    pub fn get(&self, dn: &Dn) -> Option<Arc<Entry>> {
        match self.working.get(dn) {
            Some(Some(e)) => Some(e.clone()),
            Some(None) => None,
            None => self.base.entries.get(dn).cloned(),
        }
    }

    pub fn contains(&self, dn: &Dn) -> bool {
        self.get(dn).is_some()
    }

    pub fn put(&mut self, dn: Dn, entry: Entry) {
        self.working.insert(dn, Some(Arc::new(entry)));
    }

    pub fn delete(&mut self, dn: &Dn) {
        self.working.insert(dn.clone(), None);
    }

    /// Iterates the transaction's logical view: the base snapshot with
    /// this transaction's uncommitted writes and deletes overlaid.
    pub fn iter(&self) -> impl Iterator<Item = (&Dn, Arc<Entry>)> + '_ {
        self.base
            .entries
            .iter()
            .filter(move |(dn, _)| !self.working.contains_key(dn))
            .map(|(dn, e)| (dn, e.clone()))
            .chain(self.working.iter().filter_map(|(dn, change)| {
                change.as_ref().map(|e| (dn, e.clone()))
            }))
    }

    pub fn base_generation(&self) -> u64 {
        self.base.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    fn dn(s: &str, schema: &crate::schema::SchemaRef) -> Dn {
        Dn::parse(s, schema).unwrap()
    }

    #[test]
    fn commit_succeeds_without_interleaving() {
        let schema = SchemaRegistry::bootstrap();
        let state = PartitionState::default();
        let mut txn = state.begin();
        txn.put(dn("ou=system", &schema), Entry::new(dn("ou=system", &schema)));
        state.commit(txn).unwrap();
        assert_eq!(state.snapshot().generation, 1);
    }

    #[test]
    fn concurrent_commit_yields_conflict() {
        let schema = SchemaRegistry::bootstrap();
        let state = PartitionState::default();
        let mut txn_a = state.begin();
        let mut txn_b = state.begin();
        txn_a.put(dn("ou=a", &schema), Entry::new(dn("ou=a", &schema)));
        txn_b.put(dn("ou=b", &schema), Entry::new(dn("ou=b", &schema)));
        state.commit(txn_a).unwrap();
        let err = state.commit(txn_b).unwrap_err();
        assert_eq!(err, LdapError::Conflict);
    }

    #[test]
    fn retry_after_conflict_reads_fresh_snapshot() {
        let schema = SchemaRegistry::bootstrap();
        let state = PartitionState::default();
        let mut first = state.begin();
        first.put(dn("ou=a", &schema), Entry::new(dn("ou=a", &schema)));

        let mut stale = state.begin();
        state.commit(first).unwrap();
        stale.put(dn("ou=b", &schema), Entry::new(dn("ou=b", &schema)));
        assert_eq!(state.commit(stale).unwrap_err(), LdapError::Conflict);

        let mut retry = state.begin();
        assert!(retry.contains(&dn("ou=a", &schema)));
        retry.put(dn("ou=b", &schema), Entry::new(dn("ou=b", &schema)));
        state.commit(retry).unwrap();
        assert_eq!(state.snapshot().entries.len(), 2);
    }
}
