//! The search cursor: a lazy iterator over candidate DNs, backed by the
//! read transaction it was opened against, with size and time limits
//! enforced as it is drained rather than up front (spec §4.6, §4.10,
//! Component G/K).
//!
//! The cursor owns its [`Txn`]: the snapshot a search reads from stays
//! alive for exactly as long as the cursor does, so a caller that drives
//! `next()` slowly still sees a consistent view, and dropping the cursor
//! (closing it) is what releases the transaction (spec §4.4: "closing
//! the cursor closes the transaction").

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::LdapError;
use crate::filter::Filter;
use crate::schema::SchemaRef;
use crate::txn::Txn;

/// Wraps a precomputed candidate DN list, fetching and filtering each
/// entry lazily from the held transaction as `next()` is called.
pub struct SearchCursor {
    txn: Txn,
    candidates: std::vec::IntoIter<Dn>,
    filter: Filter,
    schema: SchemaRef,
    size_limit: Option<usize>,
    time_limit: Option<Duration>,
    started_at: Instant,
    returned: usize,
    exhausted: bool,
}

impl SearchCursor {
    pub fn new(
        txn: Txn,
        candidates: Vec<Dn>,
        filter: Filter,
        schema: SchemaRef,
        size_limit: Option<usize>,
        time_limit: Option<Duration>,
    ) -> Self {
        Self {
            txn,
            candidates: candidates.into_iter(),
            filter,
            schema,
            size_limit,
            time_limit,
            started_at: Instant::now(),
            returned: 0,
            exhausted: false,
        }
    }

    /// Releases the held transaction without pulling any more entries.
    pub fn close(self) {}
}

impl Iterator for SearchCursor {
    type Item = Result<Arc<Entry>, LdapError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        loop {
            if let Some(limit) = self.time_limit {
                if self.started_at.elapsed() > limit {
                    self.exhausted = true;
                    return Some(Err(LdapError::TimeLimitExceeded));
                }
            }
            if let Some(limit) = self.size_limit {
                if self.returned >= limit {
                    self.exhausted = true;
                    return Some(Err(LdapError::SizeLimitExceeded));
                }
            }
            match self.candidates.next() {
                None => {
                    self.exhausted = true;
                    return None;
                }
                Some(dn) => {
                    let Some(entry) = self.txn.get(&dn) else {
                        continue;
                    };
                    if self.filter.matches(&entry, &self.schema) {
                        self.returned += 1;
                        return Some(Ok(entry));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;
    use crate::txn::PartitionState;

    fn populated(schema: &SchemaRef, n: usize) -> (PartitionState, Vec<Dn>) {
        let state = PartitionState::default();
        let mut txn = state.begin();
        let mut dns = Vec::new();
        for i in 0..n {
            let dn = Dn::parse(&format!("cn=e{i},ou=system"), schema).unwrap();
            let mut e = Entry::new(dn.clone());
            e.add_value(schema, "objectClass", "organizationalPerson").unwrap();
            e.add_value(schema, "cn", &format!("e{i}")).unwrap();
            e.add_value(schema, "sn", "s").unwrap();
            txn.put(dn.clone(), e);
            dns.push(dn);
        }
        state.commit(txn).unwrap();
        (state, dns)
    }

    #[test]
    fn size_limit_stops_after_n_and_reports_error() {
        let schema = SchemaRegistry::bootstrap();
        let (state, dns) = populated(&schema, 10);
        let txn = state.begin();
        let filter = crate::filter::parse("(objectClass=organizationalPerson)").unwrap();
        let mut cursor = SearchCursor::new(txn, dns, filter, schema, Some(7), None);
        let mut ok_count = 0;
        let mut saw_limit_error = false;
        for item in &mut cursor {
            match item {
                Ok(_) => ok_count += 1,
                Err(LdapError::SizeLimitExceeded) => saw_limit_error = true,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(ok_count, 7);
        assert!(saw_limit_error);
        assert!(cursor.next().is_none());
    }

    #[test]
    fn non_matching_entries_are_skipped_without_counting() {
        let schema = SchemaRegistry::bootstrap();
        let (state, mut dns) = populated(&schema, 3);
        let stray_dn = Dn::parse("ou=stray,ou=system", &schema).unwrap();
        let mut txn = state.begin();
        let mut stray = Entry::new(stray_dn.clone());
        stray.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
        stray.add_value(&schema, "ou", "stray").unwrap();
        txn.put(stray_dn.clone(), stray);
        state.commit(txn).unwrap();
        dns.push(stray_dn);

        let txn = state.begin();
        let filter = crate::filter::parse("(objectClass=organizationalPerson)").unwrap();
        let cursor = SearchCursor::new(txn, dns, filter, schema, None, None);
        let results: Vec<_> = cursor.collect();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.is_ok()));
    }

    #[test]
    fn lazy_fetch_reads_the_snapshot_the_cursor_opened_against() {
        let schema = SchemaRegistry::bootstrap();
        let (state, dns) = populated(&schema, 2);
        let txn = state.begin();
        let filter = crate::filter::parse("(objectClass=organizationalPerson)").unwrap();
        let mut cursor = SearchCursor::new(txn, dns.clone(), filter, schema.clone(), None, None);

        // Overwriting an already-yielded-candidate DN after the cursor
        // opened must not be visible through it: `next()` fetches lazily
        // from the held transaction's snapshot, not from the partition's
        // live state.
        let mut writer = state.begin();
        let mut changed = Entry::new(dns[0].clone());
        changed.add_value(&schema, "objectClass", "organizationalPerson").unwrap();
        changed.add_value(&schema, "cn", "changed-after-open").unwrap();
        changed.add_value(&schema, "sn", "s").unwrap();
        writer.put(dns[0].clone(), changed);
        state.commit(writer).unwrap();

        let seen: Vec<_> = cursor.by_ref().collect::<Result<Vec<_>, _>>().unwrap();
        assert_eq!(seen.len(), 2);
        assert!(seen.iter().all(|e| e.get("2.5.4.3").unwrap().values[0].user != "changed-after-open"));
    }
}
