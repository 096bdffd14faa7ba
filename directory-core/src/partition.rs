//! The `Partition` trait: one naming-context-rooted store of entries
//! (spec §4.2, Component B). [`crate::mem_partition`] provides the
//! in-memory reference implementation used by tests and by the facade
//! crate until a persistent backend is wired in.

use std::sync::Arc;

use crate::csn::Csn;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::LdapResult;
use crate::schema::SchemaRef;
use crate::txn::{PartitionState, Txn};

/// Stamps (overwriting any prior value) the `entryCSN` operational
/// attribute, since a write always replaces the prior stamp rather than
/// accumulating values.
pub fn stamp_csn(entry: &mut Entry, schema: &SchemaRef, csn: Csn) {
    let _ = entry.remove_value(schema, "entryCSN", None);
    let _ = entry.add_value(schema, "entryCSN", &csn.to_string());
}

/// A single naming context. A partition only ever sees DNs at or below
/// its `suffix`; the nexus is responsible for routing (spec §4.2).
pub trait Partition: Send + Sync {
    fn suffix(&self) -> &Dn;

    fn schema(&self) -> &SchemaRef;

    fn state(&self) -> &PartitionState;

    fn begin(&self) -> Txn {
        self.state().begin()
    }

    fn commit(&self, txn: Txn) -> LdapResult<()> {
        self.state().commit(txn)
    }

    fn lookup(&self, txn: &Txn, dn: &Dn) -> Option<Arc<Entry>> {
        txn.get(dn)
    }

    fn add(&self, txn: &mut Txn, mut entry: Entry, csn: Csn) -> LdapResult<()> {
        stamp_csn(&mut entry, self.schema(), csn);
        let dn = entry.dn.clone();
        txn.put(dn, entry);
        Ok(())
    }

    fn delete(&self, txn: &mut Txn, dn: &Dn) -> LdapResult<()> {
        txn.delete(dn);
        Ok(())
    }

    fn replace(&self, txn: &mut Txn, mut entry: Entry, csn: Csn) -> LdapResult<()> {
        stamp_csn(&mut entry, self.schema(), csn);
        let dn = entry.dn.clone();
        txn.put(dn, entry);
        Ok(())
    }

    /// All entries whose DN is `base` or a descendant of `base`, used by
    /// subtree and one-level search scopes (spec §4.2).
    fn entries_under<'a>(&self, txn: &'a Txn, base: &'a Dn) -> Box<dyn Iterator<Item = Arc<Entry>> + 'a> {
        Box::new(
            txn.iter()
                .filter(move |(dn, _)| base.is_equal_or_ancestor_of(dn))
                .map(|(_, e)| e),
        )
    }

    /// The DNs of every entry `entries_under` would return, without
    /// materializing the entries themselves — a search cursor only needs
    /// the key list up front and fetches each entry lazily as it drains
    /// (spec §4.10).
    fn dns_under<'a>(&self, txn: &'a Txn, base: &'a Dn) -> Box<dyn Iterator<Item = Dn> + 'a> {
        Box::new(self.entries_under(txn, base).map(|e| e.dn.clone()))
    }
}
