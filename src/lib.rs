//! `directoryd`: the embeddable facade over `directory-core`'s
//! operation manager and `directory-acl`'s access-control layer.
//!
//! Wiring (schema bootstrap, interceptor chain assembly, ACDF
//! construction) lives here so a consumer only has to depend on this
//! one crate and call [`DirectoryService::new`].

pub mod config;
pub mod logging;

use std::sync::Arc;

use anyhow::{Context, Result};

use directory_acl::{Acdf, AciInterceptor, GroupCache, TupleCache};
use directory_core::authenticator::{AnonymousAuthenticator, AuthenticatorRegistry};
use directory_core::csn::CsnGenerator;
use directory_core::interceptors::{default_chain, ChangeEvent, EventInterceptor, TriggerInterceptor};
use directory_core::mem_partition::MemPartition;
use directory_core::nexus::Nexus;
use directory_core::referral::ReferralManager;
use directory_core::{Dn, LdapResult, OperationContext, OperationManager, OperationResult, SchemaRef, SchemaRegistry};

pub use config::{DefaultAuthz, DirectoryConfig, DirectoryConfigBuilder};

/// One embedded directory service instance: a schema, a set of
/// registered naming contexts, and the assembled interceptor chain that
/// every operation runs through.
pub struct DirectoryService {
    schema: SchemaRef,
    operations: OperationManager,
    referrals: Arc<ReferralManager>,
    events: EventInterceptor,
    triggers: TriggerInterceptor,
}

impl DirectoryService {
    /// Builds a service with no naming contexts registered yet; call
    /// [`DirectoryService::register_naming_context`] before serving
    /// traffic against a suffix.
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let schema = SchemaRegistry::bootstrap();
        let csn_gen = Arc::new(CsnGenerator::new(config.replica_id));
        let referrals = Arc::new(ReferralManager::default());

        let mut authenticators = AuthenticatorRegistry::new();
        authenticators.register(Arc::new(AnonymousAuthenticator));
        let authenticators = Arc::new(authenticators);

        let acdf = Acdf::new(TupleCache::new(), GroupCache::default(), config.default_authz.build());
        let aci_interceptor = match &config.root_dn {
            Some(raw) => {
                let root_dn = Dn::parse(raw, &schema).with_context(|| format!("parsing root_dn {raw:?}"))?;
                AciInterceptor::with_root_dn(acdf, root_dn)
            }
            None => AciInterceptor::new(acdf),
        };
        let (chain, events, triggers) = default_chain(
            schema.clone(),
            authenticators,
            referrals.clone(),
            csn_gen.clone(),
            config.denormalize_op_attrs,
            Arc::new(aci_interceptor),
        );

        let nexus = Nexus::new();
        let operations = OperationManager::new(nexus, chain, csn_gen);

        Ok(Self {
            schema,
            operations,
            referrals,
            events,
            triggers,
        })
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn referrals(&self) -> &Arc<ReferralManager> {
        &self.referrals
    }

    /// Subscribes `listener` to every successful add/delete/modify/modifyDn
    /// from now on (spec §4.6 item 9). Runs synchronously and in
    /// registration order on the thread that performed the write.
    pub fn on_change(&self, listener: impl Fn(&ChangeEvent) + Send + Sync + 'static) {
        self.events.register(Arc::new(listener));
    }

    /// Binds a stored-procedure-style callback to every write at or
    /// beneath `scope` (spec §4.6 item 10). The write has already
    /// committed by the time the procedure runs; an error it returns
    /// still fails the client's view of the operation.
    pub fn bind_trigger(
        &self,
        scope: &str,
        procedure: impl Fn(&ChangeEvent) -> LdapResult<()> + Send + Sync + 'static,
    ) -> Result<()> {
        let dn = Dn::parse(scope, &self.schema).with_context(|| format!("parsing trigger scope {scope:?}"))?;
        self.triggers.bind(dn, Arc::new(procedure));
        Ok(())
    }

    /// Registers an in-memory naming context rooted at `suffix`.
    /// Swap the [`MemPartition`] this constructs for a persistent
    /// implementation of [`directory_core::partition::Partition`] to
    /// back a naming context with durable storage (spec §9 design note:
    /// persistence is a pluggable concern, not this crate's job).
    pub fn register_naming_context(&mut self, suffix: &str) -> Result<()> {
        let dn = Dn::parse(suffix, &self.schema).with_context(|| format!("parsing suffix {suffix:?}"))?;
        let partition = Arc::new(MemPartition::new(dn, self.schema.clone()));
        self.operations
            .nexus_mut()
            .register(partition)
            .with_context(|| format!("registering naming context {suffix:?}"))
    }

    /// Runs one operation through the full interceptor chain.
    pub fn execute(&self, ctx: OperationContext) -> directory_core::LdapResult<OperationResult> {
        self.operations.execute(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use directory_core::context::{BindCredentials, Principal, SearchRequest};
    use directory_core::entry::Entry;
    use directory_core::filter;
    use directory_core::referral::Scope;
    use directory_core::OperationRequest;

    fn service_with_system_ou() -> DirectoryService {
        let mut svc = DirectoryService::new(
            DirectoryConfig::builder()
                .default_authz(DefaultAuthz::AllowAuthenticatedRead)
                .root_dn("uid=admin,ou=system")
                .build(),
        )
        .unwrap();
        svc.register_naming_context("ou=system").unwrap();

        let schema = svc.schema().clone();
        let admin = Principal {
            dn: Dn::parse("uid=admin,ou=system", &schema).unwrap(),
            authenticated: true,
        };
        let mut root = Entry::new(Dn::parse("ou=system", &schema).unwrap());
        root.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
        root.add_value(&schema, "ou", "system").unwrap();
        svc.execute(OperationContext::new(admin.clone(), OperationRequest::Add { entry: root }))
            .unwrap();

        for name in ["people", "groups"] {
            let dn = Dn::parse(&format!("ou={name},ou=system"), &schema).unwrap();
            let mut e = Entry::new(dn);
            e.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
            e.add_value(&schema, "ou", name).unwrap();
            svc.execute(OperationContext::new(admin.clone(), OperationRequest::Add { entry: e }))
                .unwrap();
        }
        svc
    }

    #[test]
    fn add_and_one_level_search_round_trip() {
        let svc = service_with_system_ou();
        let schema = svc.schema().clone();
        let admin = Principal {
            dn: Dn::parse("uid=admin,ou=system", &schema).unwrap(),
            authenticated: true,
        };
        let search = SearchRequest {
            base: Dn::parse("ou=system", &schema).unwrap(),
            scope: Scope::OneLevel,
            filter: filter::parse("(objectClass=organizationalUnit)").unwrap(),
            attributes: vec![],
            size_limit: None,
            time_limit: None,
            types_only: false,
        };
        let result = svc
            .execute(OperationContext::new(admin, OperationRequest::Search(search)))
            .unwrap();
        match result {
            OperationResult::Cursor(cursor) => {
                let entries: Vec<_> = cursor.collect::<directory_core::LdapResult<Vec<_>>>().unwrap();
                assert_eq!(entries.len(), 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn anonymous_search_is_denied_by_default_policy() {
        let svc = service_with_system_ou();
        let schema = svc.schema().clone();
        let anon = Principal::anonymous();
        let search = SearchRequest {
            base: Dn::parse("ou=system", &schema).unwrap(),
            scope: Scope::OneLevel,
            filter: filter::parse("(objectClass=organizationalUnit)").unwrap(),
            attributes: vec![],
            size_limit: None,
            time_limit: None,
            types_only: false,
        };
        let result = svc.execute(OperationContext::new(anon, OperationRequest::Search(search)));
        assert_eq!(
            result.unwrap_err(),
            directory_core::LdapError::InsufficientAccessRights
        );
    }

    #[test]
    fn change_listener_and_trigger_both_see_a_committed_add() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut svc = DirectoryService::new(
            DirectoryConfig::builder()
                .default_authz(DefaultAuthz::AllowAuthenticatedRead)
                .root_dn("uid=admin,ou=system")
                .build(),
        )
        .unwrap();
        svc.register_naming_context("ou=system").unwrap();

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        svc.on_change(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        svc.bind_trigger("ou=system", |event| {
            assert_eq!(event.kind, directory_core::interceptors::ChangeKind::Add);
            Ok(())
        })
        .unwrap();

        let schema = svc.schema().clone();
        let admin = Principal {
            dn: Dn::parse("uid=admin,ou=system", &schema).unwrap(),
            authenticated: true,
        };
        let mut root = Entry::new(Dn::parse("ou=system", &schema).unwrap());
        root.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
        root.add_value(&schema, "ou", "system").unwrap();
        svc.execute(OperationContext::new(admin, OperationRequest::Add { entry: root })).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn bind_with_unsupported_mechanism_is_rejected() {
        let svc = service_with_system_ou();
        let schema = svc.schema().clone();
        let dn = Dn::parse("uid=admin,ou=system", &schema).unwrap();
        let result = svc.execute(OperationContext::new(
            Principal::anonymous(),
            OperationRequest::Bind {
                name: dn,
                credentials: BindCredentials::Simple("whatever".into()),
            },
        ));
        assert!(result.is_err());
    }
}
