//! The partition nexus: suffix-based routing across naming contexts
//! (spec §4.2, §4.3, Component C).

use std::sync::Arc;

use crate::dn::Dn;
use crate::error::{LdapError, LdapResult};
use crate::partition::Partition;

/// Routes a DN to the partition whose suffix is its longest matching
/// ancestor. Naming contexts may be nested (e.g. `ou=people,dc=example`
/// held separately from `dc=example`); the nexus always picks the most
/// specific match, exactly like IP longest-prefix routing.
#[derive(Default)]
pub struct Nexus {
    partitions: Vec<Arc<dyn Partition>>,
}

impl Nexus {
    pub fn new() -> Self {
        Self { partitions: Vec::new() }
    }

    /// Registers a naming context. Fails if a partition with the exact
    /// same suffix is already registered (spec §4.2 invariant: one
    /// partition per naming context).
    pub fn register(&mut self, partition: Arc<dyn Partition>) -> LdapResult<()> {
        if self.partitions.iter().any(|p| p.suffix() == partition.suffix()) {
            return Err(LdapError::AlreadyExists(format!(
                "naming context {} already registered",
                partition.suffix()
            )));
        }
        self.partitions.push(partition);
        Ok(())
    }

    pub fn naming_contexts(&self) -> Vec<Dn> {
        self.partitions.iter().map(|p| p.suffix().clone()).collect()
    }

    /// The partition holding `dn`, chosen by longest matching suffix.
    /// `NoSuchObject` when no registered naming context covers it at all
    /// (a referral-bearing ancestor is the Operation Manager's job to
    /// check before calling this, per spec §4.4).
    pub fn partition_for(&self, dn: &Dn) -> LdapResult<Arc<dyn Partition>> {
        self.partitions
            .iter()
            .filter(|p| p.suffix().is_equal_or_ancestor_of(dn))
            .max_by_key(|p| p.suffix().rdns.len())
            .cloned()
            .ok_or_else(|| LdapError::NoSuchObject(dn.to_string()))
    }

    /// Every registered partition whose suffix falls under `dn` — used
    /// when a subtree search's base spans more than one naming context
    /// (spec §4.3 `AffectsMultipleDSAs` edge case lives one layer up, in
    /// the operation manager, which decides whether that is an error for
    /// the operation kind in play).
    pub fn partitions_under<'a>(&'a self, dn: &'a Dn) -> impl Iterator<Item = Arc<dyn Partition>> + 'a {
        self.partitions
            .iter()
            .filter(move |p| dn.is_equal_or_ancestor_of(p.suffix()))
            .cloned()
    }

    pub fn is_naming_context(&self, dn: &Dn) -> bool {
        self.partitions.iter().any(|p| p.suffix() == dn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_partition::MemPartition;
    use crate::schema::SchemaRegistry;

    #[test]
    fn longest_suffix_wins() {
        let schema = SchemaRegistry::bootstrap();
        let mut nexus = Nexus::new();
        let system = Dn::parse("ou=system", &schema).unwrap();
        let people = Dn::parse("ou=people,ou=system", &schema).unwrap();
        nexus
            .register(Arc::new(MemPartition::new(system.clone(), schema.clone())))
            .unwrap();
        nexus
            .register(Arc::new(MemPartition::new(people.clone(), schema.clone())))
            .unwrap();

        let target = Dn::parse("cn=alice,ou=people,ou=system", &schema).unwrap();
        let chosen = nexus.partition_for(&target).unwrap();
        assert_eq!(chosen.suffix(), &people);
    }

    #[test]
    fn unrouted_dn_is_no_such_object() {
        let schema = SchemaRegistry::bootstrap();
        let nexus = Nexus::new();
        let dn = Dn::parse("ou=nowhere", &schema).unwrap();
        assert!(matches!(nexus.partition_for(&dn), Err(LdapError::NoSuchObject(_))));
    }
}
