//! Caches group membership lookups so evaluating `userGroup` ACI tuples
//! does not re-read a group entry's member list on every access check
//! (spec §4.9, Component H).

use std::sync::Arc;

use directory_core::Dn;
use parking_lot::RwLock;

/// Reads a group entry's member DNs. Supplied by the embedding
/// application so this crate stays independent of any one partition
/// implementation.
pub type MemberLookup = Arc<dyn Fn(&Dn) -> Vec<Dn> + Send + Sync>;

#[derive(Default)]
pub struct GroupCache {
    lookup: Option<MemberLookup>,
    cached: RwLock<Vec<(Dn, Vec<Dn>)>>,
}

impl GroupCache {
    pub fn new(lookup: MemberLookup) -> Self {
        Self {
            lookup: Some(lookup),
            cached: RwLock::new(Vec::new()),
        }
    }

    pub fn is_member(&self, group: &Dn, principal: &Dn) -> bool {
        if let Some(hit) = self.cached.read().iter().find(|(g, _)| g == group) {
            return hit.1.contains(principal);
        }
        let Some(lookup) = &self.lookup else {
            return false;
        };
        let members = lookup(group);
        let is_member = members.contains(principal);
        self.cached.write().push((group.clone(), members));
        is_member
    }

    /// Drops a group's cached membership; called by the interceptor
    /// wiring after any write under a group entry's DN.
    pub fn invalidate(&self, group: &Dn) {
        self.cached.write().retain(|(g, _)| g != group);
    }

    pub fn invalidate_all(&self) {
        self.cached.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_after_first_lookup() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let schema = directory_core::SchemaRegistry::bootstrap();
        let group = Dn::parse("cn=admins,ou=groups,ou=system", &schema).unwrap();
        let member = Dn::parse("uid=alice,ou=people,ou=system", &schema).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let member2 = member.clone();
        let lookup: MemberLookup = Arc::new(move |_: &Dn| {
            calls2.fetch_add(1, Ordering::SeqCst);
            vec![member2.clone()]
        });
        let cache = GroupCache::new(lookup);
        assert!(cache.is_member(&group, &member));
        assert!(cache.is_member(&group, &member));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        cache.invalidate(&group);
        assert!(cache.is_member(&group, &member));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
