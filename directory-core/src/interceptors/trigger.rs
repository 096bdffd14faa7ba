//! Change-notification and stored-procedure hook points (spec §4.6 items
//! 9-10). Both are registrable callback lists rather than a full
//! notification transport or procedure language: a consumer embedding
//! this directory core registers closures at startup and gets called
//! in-process when a matching write completes.

use std::sync::Arc;

use tracing::trace;

use crate::context::{OperationContext, OperationRequest};
use crate::dn::Dn;
use crate::error::LdapResult;
use crate::interceptor::{Interceptor, Next, OperationResult};

/// What kind of write a [`ChangeEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Delete,
    Modify,
    ModifyDn,
}

/// A completed write, published to every registered listener after the
/// rest of the chain (and the partition commit beneath it) succeeds.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub dn: Dn,
}

type Listener = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Publishes a [`ChangeEvent`] to every registered listener after a
/// successful add/delete/modify/modifyDn. Listeners run synchronously
/// and in registration order, on the calling thread — there is no queue
/// or retry; a listener that needs durability must persist the event
/// itself before returning.
#[derive(Default, Clone)]
pub struct EventInterceptor {
    listeners: Arc<parking_lot::RwLock<Vec<Listener>>>,
}

impl EventInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Listener) {
        self.listeners.write().push(listener);
    }

    fn publish(&self, event: ChangeEvent) {
        for listener in self.listeners.read().iter() {
            listener(&event);
        }
    }
}

impl Interceptor for EventInterceptor {
    fn name(&self) -> &'static str {
        "event"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        let kind = match &ctx.request {
            OperationRequest::Add { entry } => Some((ChangeKind::Add, entry.dn.clone())),
            OperationRequest::Delete { dn } => Some((ChangeKind::Delete, dn.clone())),
            OperationRequest::Modify { dn, .. } => Some((ChangeKind::Modify, dn.clone())),
            OperationRequest::ModifyDn { dn, .. } => Some((ChangeKind::ModifyDn, dn.clone())),
            _ => None,
        };
        let result = next.call(ctx)?;
        if let Some((kind, dn)) = kind {
            trace!(?kind, %dn, "publishing change event");
            self.publish(ChangeEvent { kind, dn });
        }
        Ok(result)
    }
}

type TriggerFn = Arc<dyn Fn(&ChangeEvent) -> LdapResult<()> + Send + Sync>;

struct BoundTrigger {
    scope: Dn,
    procedure: TriggerFn,
}

/// Invokes stored procedures bound to a DIT subtree when a write lands
/// at or below it, mirroring a subentry's administrative scope rather
/// than a single DN (spec §4.6 item 10). A procedure that returns an
/// error fails the operation; the partition write it wraps has already
/// committed, matching the source behavior of triggers running as an
/// after-commit side effect rather than inside the transaction.
#[derive(Default, Clone)]
pub struct TriggerInterceptor {
    triggers: Arc<parking_lot::RwLock<Vec<BoundTrigger>>>,
}

impl TriggerInterceptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `procedure` to every write at or beneath `scope`.
    pub fn bind(&self, scope: Dn, procedure: TriggerFn) {
        self.triggers.write().push(BoundTrigger { scope, procedure });
    }
}

impl Interceptor for TriggerInterceptor {
    fn name(&self) -> &'static str {
        "trigger"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        let kind = match &ctx.request {
            OperationRequest::Add { entry } => Some((ChangeKind::Add, entry.dn.clone())),
            OperationRequest::Delete { dn } => Some((ChangeKind::Delete, dn.clone())),
            OperationRequest::Modify { dn, .. } => Some((ChangeKind::Modify, dn.clone())),
            OperationRequest::ModifyDn { dn, .. } => Some((ChangeKind::ModifyDn, dn.clone())),
            _ => None,
        };
        let result = next.call(ctx)?;
        if let Some((change_kind, dn)) = kind {
            let event = ChangeEvent { kind: change_kind, dn: dn.clone() };
            for bound in self.triggers.read().iter() {
                if bound.scope.is_equal_or_ancestor_of(&dn) {
                    (bound.procedure)(&event)?;
                }
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationContext;
    use crate::entry::Entry;
    use crate::interceptor::InterceptorChain;
    use crate::schema::SchemaRegistry;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn add_ctx(schema: &crate::schema::SchemaRef, dn: &str) -> OperationContext {
        let dn = Dn::parse(dn, schema).unwrap();
        OperationContext::new(
            crate::context::Principal::anonymous(),
            OperationRequest::Add { entry: Entry::new(dn) },
        )
    }

    #[test]
    fn event_listener_fires_once_per_successful_write() {
        let schema = SchemaRegistry::bootstrap();
        let events = EventInterceptor::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        events.register(Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(events));
        let mut ctx = add_ctx(&schema, "cn=e,ou=system");
        chain.invoke(&mut ctx, &|_| Ok(OperationResult::Success)).unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn trigger_only_fires_within_its_bound_scope() {
        let schema = SchemaRegistry::bootstrap();
        let triggers = TriggerInterceptor::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        triggers.bind(
            Dn::parse("ou=system", &schema).unwrap(),
            Arc::new(move |_event| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(triggers));

        let mut in_scope = add_ctx(&schema, "cn=e,ou=system");
        chain.invoke(&mut in_scope, &|_| Ok(OperationResult::Success)).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let mut out_of_scope = add_ctx(&schema, "cn=e,ou=other");
        chain.invoke(&mut out_of_scope, &|_| Ok(OperationResult::Success)).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failing_procedure_fails_the_operation() {
        let schema = SchemaRegistry::bootstrap();
        let triggers = TriggerInterceptor::new();
        triggers.bind(
            Dn::parse("ou=system", &schema).unwrap(),
            Arc::new(|_event| Err(crate::error::LdapError::UnwillingToPerform("rejected by trigger".into()))),
        );
        let mut chain = InterceptorChain::new();
        chain.add(Arc::new(triggers));
        let mut ctx = add_ctx(&schema, "cn=e,ou=system");
        let err = chain.invoke(&mut ctx, &|_| Ok(OperationResult::Success)).unwrap_err();
        assert!(matches!(err, crate::error::LdapError::UnwillingToPerform(_)));
    }
}
