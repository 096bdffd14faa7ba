use std::sync::Arc;

use crate::context::{OperationContext, OperationRequest};
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::{LdapError, LdapResult};
use crate::interceptor::{Interceptor, Next, OperationResult};
use crate::referral::{ReferralManager, Scope};

fn is_referral_entry(entry: &Entry) -> bool {
    entry.object_classes().iter().any(|oc| oc.eq_ignore_ascii_case("referral"))
}

fn ref_urls(entry: &Entry) -> Vec<String> {
    entry
        .attributes()
        .find(|a| a.type_name.eq_ignore_ascii_case("ref"))
        .map(|a| a.values.iter().map(|v| v.user.clone()).collect())
        .unwrap_or_default()
}

/// Throws [`LdapError::Referral`] when the target DN falls under a
/// planted referral, before any schema or partition work happens
/// (spec §4.7, Component F). Also keeps the [`ReferralManager`] cache in
/// sync with the entry store: committing an add of a `referral`-class
/// entry plants it, committing a delete unplants it — the "caches
/// subscribe to post-commit state" design, collapsed to this one
/// interceptor since referral planting only ever depends on its own
/// operation's outcome, never another interceptor's.
pub struct ReferralInterceptor {
    referrals: Arc<ReferralManager>,
}

impl ReferralInterceptor {
    pub fn new(referrals: Arc<ReferralManager>) -> Self {
        Self { referrals }
    }
}

impl Interceptor for ReferralInterceptor {
    fn name(&self) -> &'static str {
        "referral"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        let scope = match &ctx.request {
            OperationRequest::Search(s) => s.scope,
            _ => Scope::Base,
        };
        if let Some(dn) = ctx.request.target_dn() {
            if let Some(urls) = self.referrals.resolve(dn, scope) {
                return Err(LdapError::Referral(urls));
            }
        }

        let pending_plant: Option<(Dn, Vec<String>)> = match &ctx.request {
            OperationRequest::Add { entry } if is_referral_entry(entry) => Some((entry.dn.clone(), ref_urls(entry))),
            _ => None,
        };
        let pending_unplant: Option<Dn> = match &ctx.request {
            OperationRequest::Delete { dn } => Some(dn.clone()),
            _ => None,
        };

        let result = next.call(ctx)?;

        if let Some((dn, urls)) = pending_plant {
            self.referrals.plant(dn, urls);
        }
        if let Some(dn) = pending_unplant {
            self.referrals.unplant(&dn);
        }
        Ok(result)
    }
}
