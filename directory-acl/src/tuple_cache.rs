//! Caches the ACI tuples contributed by each access-control subentry so
//! ACDF does not re-parse `prescriptiveACI` values on every access check
//! (spec §4.9, Component H).

use parking_lot::RwLock;

use directory_core::Dn;

use crate::aci::AciTuple;

struct Planted {
    subtree_root: Dn,
    tuples: Vec<AciTuple>,
}

#[derive(Default)]
pub struct TupleCache {
    planted: RwLock<Vec<Planted>>,
}

impl TupleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the tuples a subentry's `prescriptiveACI` contributes
    /// over its governed subtree.
    pub fn register_prescriptive(&self, subtree_root: Dn, tuples: Vec<AciTuple>) {
        self.planted.write().retain(|p| p.subtree_root != subtree_root);
        self.planted.write().push(Planted { subtree_root, tuples });
    }

    pub fn unregister(&self, subtree_root: &Dn) {
        self.planted.write().retain(|p| &p.subtree_root != subtree_root);
    }

    /// Every tuple whose governing subtree covers `dn`, most specific
    /// subtree first (closer subentries take precedence when precedence
    /// values tie, per spec §4.9).
    pub fn tuples_for(&self, dn: &Dn) -> Vec<AciTuple> {
        let mut planted: Vec<_> = self
            .planted
            .read()
            .iter()
            .filter(|p| p.subtree_root.is_equal_or_ancestor_of(dn))
            .map(|p| (p.subtree_root.rdns.len(), p.tuples.clone()))
            .collect();
        planted.sort_by(|a, b| b.0.cmp(&a.0));
        planted.into_iter().flat_map(|(_, tuples)| tuples).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aci::{AuthenticationLevel, MicroOperation, Permission, ProtectedItem, UserClass};
    use directory_core::SchemaRegistry;

    fn tuple(tag: &str, precedence: u8, permission: Permission) -> AciTuple {
        AciTuple {
            identification_tag: tag.into(),
            precedence,
            authentication_level: AuthenticationLevel::None,
            user_classes: vec![UserClass::AllUsers],
            protected_items: vec![ProtectedItem::Entry],
            operations: vec![MicroOperation::Read],
            permission,
        }
    }

    #[test]
    fn more_specific_subtree_is_listed_first() {
        let schema = SchemaRegistry::bootstrap();
        let cache = TupleCache::new();
        let system = Dn::parse("ou=system", &schema).unwrap();
        let people = Dn::parse("ou=people,ou=system", &schema).unwrap();
        cache.register_prescriptive(system, vec![tuple("coarse", 1, Permission::Grant)]);
        cache.register_prescriptive(people.clone(), vec![tuple("fine", 1, Permission::Deny)]);

        let target = Dn::parse("cn=alice,ou=people,ou=system", &schema).unwrap();
        let tuples = cache.tuples_for(&target);
        assert_eq!(tuples.len(), 2);
        assert_eq!(tuples[0].identification_tag, "fine");
    }
}
