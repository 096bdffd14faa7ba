use std::sync::Arc;

use crate::context::{OperationContext, OperationRequest};
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::LdapResult;
use crate::interceptor::{Interceptor, Next, OperationResult};
use crate::schema::SchemaRef;

fn is_subentry(schema: &SchemaRef, entry: &Entry) -> bool {
    let subentry_oid = schema.canonical_oid("subentry");
    entry.object_classes().iter().any(|oc| schema.canonical_oid(oc) == subentry_oid)
}

/// Looks up the collective attribute values a governing subentry
/// publishes for entries within its administrative scope (spec §4.6 item
/// 7: "materializes subentry-scoped attributes onto entries whose DN
/// falls within an administrative area's subtree specification"). This
/// interceptor has no direct partition access of its own, so a caller
/// that wants real collective attributes provides an implementation
/// backed by its own subentry lookup — typically a scan of the owning
/// partition for `collectiveAttributeSubentry` entries whose
/// `subtreeSpecification` covers the target DN.
pub trait CollectiveAttributeSource: Send + Sync {
    /// Values to fold into `dn`'s entry for every attribute it does not
    /// already define itself, as `(oid, type_name, value)` triples.
    fn collective_values_for(&self, dn: &Dn) -> Vec<(String, String, String)>;
}

fn materialize(source: &dyn CollectiveAttributeSource, mut entry: Entry) -> Entry {
    for (oid, type_name, value) in source.collective_values_for(&entry.dn) {
        if entry.has_attribute(&oid) {
            continue;
        }
        entry.add_value_raw(
            &oid,
            &type_name,
            crate::entry::AttributeValue {
                user: value.clone(),
                normalized: value.into_bytes(),
            },
        );
    }
    entry
}

/// Hides subentries (`objectClass: subentry`) from ordinary subtree and
/// one-level searches, and materializes collective attributes from a
/// registered [`CollectiveAttributeSource`] onto the entries it covers
/// (spec §3 Entry note on subentries, §4.6 item 7).
pub struct SubentryInterceptor {
    schema: SchemaRef,
    collective_source: Option<Arc<dyn CollectiveAttributeSource>>,
}

impl SubentryInterceptor {
    pub fn new(schema: SchemaRef) -> Self {
        Self {
            schema,
            collective_source: None,
        }
    }

    pub fn with_collective_attribute_source(mut self, source: Arc<dyn CollectiveAttributeSource>) -> Self {
        self.collective_source = Some(source);
        self
    }
}

impl Interceptor for SubentryInterceptor {
    fn name(&self) -> &'static str {
        "subentry"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        let is_search = matches!(ctx.request, OperationRequest::Search(_));
        let show_subentries = ctx.extension("show_subentries").is_some();
        let result = next.call(ctx)?;
        if !is_search || show_subentries {
            return Ok(result);
        }
        match result {
            OperationResult::Entries(entries) => {
                let schema = self.schema.clone();
                let source = self.collective_source.clone();
                let visible = entries
                    .into_iter()
                    .filter(|e| !is_subentry(&schema, e))
                    .map(|e| match &source {
                        Some(source) => Arc::new(materialize(source.as_ref(), (*e).clone())),
                        None => e,
                    })
                    .collect();
                Ok(OperationResult::Entries(visible))
            }
            OperationResult::Cursor(cursor) => {
                let schema = self.schema.clone();
                let source = self.collective_source.clone();
                let filtered = cursor.filter(move |item| match item {
                    Ok(e) => !is_subentry(&schema, e),
                    Err(_) => true,
                });
                let materialized = filtered.map(move |item| {
                    item.map(|e| match &source {
                        Some(source) => Arc::new(materialize(source.as_ref(), (*e).clone())),
                        None => e,
                    })
                });
                Ok(OperationResult::Cursor(Box::new(materialized)))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{OperationContext, Principal};
    use crate::schema::SchemaRegistry;
    use std::sync::Arc;

    struct StaticSubtree {
        scope: Dn,
    }

    impl CollectiveAttributeSource for StaticSubtree {
        fn collective_values_for(&self, dn: &Dn) -> Vec<(String, String, String)> {
            if self.scope.is_equal_or_ancestor_of(dn) {
                vec![("1.3.6.1.4.1.18060.0.4.1.2.35".to_string(), "c-description".to_string(), "east wing".to_string())]
            } else {
                Vec::new()
            }
        }
    }

    #[test]
    fn collective_attribute_is_materialized_for_entries_under_the_subtree_specification() {
        let schema = SchemaRegistry::bootstrap();
        let scope = Dn::parse("ou=system", &schema).unwrap();
        let source = Arc::new(StaticSubtree { scope: scope.clone() });
        let interceptor = SubentryInterceptor::new(schema.clone()).with_collective_attribute_source(source);

        let mut entry = Entry::new(Dn::parse("cn=alice,ou=system", &schema).unwrap());
        entry.add_value(&schema, "objectClass", "organizationalPerson").unwrap();
        entry.add_value(&schema, "cn", "alice").unwrap();
        entry.add_value(&schema, "sn", "doe").unwrap();
        let entries = vec![Arc::new(entry)];

        let mut ctx = OperationContext::new(
            Principal::anonymous(),
            OperationRequest::Search(crate::context::SearchRequest {
                base: scope,
                scope: crate::referral::Scope::Subtree,
                filter: crate::filter::parse("(objectClass=*)").unwrap(),
                attributes: vec![],
                size_limit: None,
                time_limit: None,
                types_only: false,
            }),
        );
        let mut chain = crate::interceptor::InterceptorChain::new();
        chain.add(Arc::new(interceptor));
        let result = chain.invoke(&mut ctx, &|_| Ok(OperationResult::Entries(entries.clone()))).unwrap();
        match result {
            OperationResult::Entries(entries) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].get("1.3.6.1.4.1.18060.0.4.1.2.35").unwrap().values[0].user, "east wing");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn collective_attribute_is_not_materialized_outside_the_subtree_specification() {
        let schema = SchemaRegistry::bootstrap();
        let scope = Dn::parse("ou=system", &schema).unwrap();
        let source = Arc::new(StaticSubtree { scope });
        let interceptor = SubentryInterceptor::new(schema.clone()).with_collective_attribute_source(source);

        let mut entry = Entry::new(Dn::parse("cn=bob,ou=other", &schema).unwrap());
        entry.add_value(&schema, "objectClass", "organizationalPerson").unwrap();
        entry.add_value(&schema, "cn", "bob").unwrap();
        entry.add_value(&schema, "sn", "roe").unwrap();
        let entries = vec![Arc::new(entry)];

        let mut ctx = OperationContext::new(
            Principal::anonymous(),
            OperationRequest::Search(crate::context::SearchRequest {
                base: Dn::parse("ou=other", &schema).unwrap(),
                scope: crate::referral::Scope::Subtree,
                filter: crate::filter::parse("(objectClass=*)").unwrap(),
                attributes: vec![],
                size_limit: None,
                time_limit: None,
                types_only: false,
            }),
        );
        let mut chain = crate::interceptor::InterceptorChain::new();
        chain.add(Arc::new(interceptor));
        let result = chain.invoke(&mut ctx, &|_| Ok(OperationResult::Entries(entries.clone()))).unwrap();
        match result {
            OperationResult::Entries(entries) => {
                assert!(entries[0].get("1.3.6.1.4.1.18060.0.4.1.2.35").is_none());
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
