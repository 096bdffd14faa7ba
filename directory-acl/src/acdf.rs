//! The Basic Access Control Decision Function: given a principal, a
//! target DN/attribute and a requested operation, decides grant or deny
//! by precedence over the applicable ACI tuples (spec §4.9, Component H).

use directory_core::Dn;

use crate::aci::{AciTuple, AuthenticationLevel, MicroOperation, Permission, UserClass};
use crate::default_authz::DefaultAuthzPolicy;
use crate::group_cache::GroupCache;
use crate::tuple_cache::TupleCache;

pub struct AccessRequest<'a> {
    pub principal: &'a Dn,
    pub principal_authenticated: bool,
    pub target: &'a Dn,
    pub attribute_oid: Option<&'a str>,
    pub operation: MicroOperation,
}

pub struct Acdf {
    tuples: TupleCache,
    groups: GroupCache,
    default_policy: Box<dyn DefaultAuthzPolicy>,
}

impl Acdf {
    pub fn new(tuples: TupleCache, groups: GroupCache, default_policy: Box<dyn DefaultAuthzPolicy>) -> Self {
        Self {
            tuples,
            groups,
            default_policy,
        }
    }

    pub fn tuples(&self) -> &TupleCache {
        &self.tuples
    }

    pub fn groups(&self) -> &GroupCache {
        &self.groups
    }

    /// Evaluates whether `req` is granted. Algorithm (spec §4.9):
    /// 1. gather tuples whose governing subtree covers the target;
    /// 2. keep only those applicable to the requesting principal;
    /// 3. keep only those covering the requested operation and item;
    /// 4. among the survivors, the highest-precedence tuple wins; a
    ///    deny beats a grant at the same precedence;
    /// 5. with no applicable tuple at all, the default policy decides.
    pub fn evaluate(&self, req: &AccessRequest<'_>) -> bool {
        let applicable: Vec<AciTuple> = self
            .applicable_candidates(req)
            .into_iter()
            .filter(|t| self.user_class_matches(t, req))
            .filter(|t| t.covers_operation(req.operation))
            .filter(|t| match req.attribute_oid {
                Some(oid) => t.covers_attribute(oid) || t.covers_entry(),
                None => t.covers_entry(),
            })
            .collect();

        if applicable.is_empty() {
            return self.default_policy.decide(req);
        }

        let max_precedence = applicable.iter().map(|t| t.precedence).max().unwrap();
        let at_max: Vec<&AciTuple> = applicable.iter().filter(|t| t.precedence == max_precedence).collect();
        !at_max.iter().any(|t| t.permission == Permission::Deny)
    }

    fn applicable_candidates(&self, req: &AccessRequest<'_>) -> Vec<AciTuple> {
        self.tuples.tuples_for(req.target)
    }

    fn user_class_matches(&self, tuple: &AciTuple, req: &AccessRequest<'_>) -> bool {
        if tuple.authentication_level == AuthenticationLevel::Simple && !req.principal_authenticated {
            return false;
        }
        tuple.user_classes.iter().any(|class| match class {
            UserClass::AllUsers => true,
            UserClass::ThisEntry => req.principal == req.target,
            UserClass::Name(names) => names.contains(req.principal),
            UserClass::UserGroup(groups) => groups.iter().any(|g| self.groups.is_member(g, req.principal)),
            UserClass::Subtree(root) => root.is_equal_or_ancestor_of(req.principal),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aci::ProtectedItem;
    use crate::default_authz::DenyByDefault;
    use directory_core::SchemaRegistry;

    fn grant_all_tuple() -> AciTuple {
        AciTuple {
            identification_tag: "grantAll".into(),
            precedence: 1,
            authentication_level: AuthenticationLevel::None,
            user_classes: vec![UserClass::AllUsers],
            protected_items: vec![ProtectedItem::Entry, ProtectedItem::AllUserAttributeTypes],
            operations: vec![MicroOperation::Read, MicroOperation::Search],
            permission: Permission::Grant,
        }
    }

    #[test]
    fn no_tuple_falls_back_to_default_deny() {
        let schema = SchemaRegistry::bootstrap();
        let acdf = Acdf::new(TupleCache::new(), GroupCache::default(), Box::new(DenyByDefault));
        let target = Dn::parse("ou=system", &schema).unwrap();
        let anon = Dn::root();
        let req = AccessRequest {
            principal: &anon,
            principal_authenticated: false,
            target: &target,
            attribute_oid: None,
            operation: MicroOperation::Read,
        };
        assert!(!acdf.evaluate(&req));
    }

    #[test]
    fn grant_tuple_at_precedence_allows_access() {
        let schema = SchemaRegistry::bootstrap();
        let tuples = TupleCache::new();
        let system = Dn::parse("ou=system", &schema).unwrap();
        tuples.register_prescriptive(system.clone(), vec![grant_all_tuple()]);
        let acdf = Acdf::new(tuples, GroupCache::default(), Box::new(DenyByDefault));
        let target = Dn::parse("cn=alice,ou=system", &schema).unwrap();
        let anon = Dn::root();
        let req = AccessRequest {
            principal: &anon,
            principal_authenticated: false,
            target: &target,
            attribute_oid: None,
            operation: MicroOperation::Read,
        };
        assert!(acdf.evaluate(&req));
    }

    #[test]
    fn deny_beats_grant_at_equal_precedence() {
        let schema = SchemaRegistry::bootstrap();
        let tuples = TupleCache::new();
        let system = Dn::parse("ou=system", &schema).unwrap();
        let mut deny = grant_all_tuple();
        deny.identification_tag = "denyAll".into();
        deny.permission = Permission::Deny;
        tuples.register_prescriptive(system.clone(), vec![grant_all_tuple(), deny]);
        let acdf = Acdf::new(tuples, GroupCache::default(), Box::new(DenyByDefault));
        let target = Dn::parse("cn=alice,ou=system", &schema).unwrap();
        let anon = Dn::root();
        let req = AccessRequest {
            principal: &anon,
            principal_authenticated: false,
            target: &target,
            attribute_oid: None,
            operation: MicroOperation::Read,
        };
        assert!(!acdf.evaluate(&req));
    }
}
