//! The standard interceptor set (spec §4.3). Each one is independently
//! constructible so a caller can assemble a custom chain; [`default_chain`]
//! returns the ordering this directory core ships with.

mod authentication;
mod exception;
mod normalization;
mod operational_attributes;
mod referral;
mod schema;
mod subentry;
mod trigger;

pub use authentication::AuthenticationInterceptor;
pub use exception::ExceptionInterceptor;
pub use normalization::NormalizationInterceptor;
pub use operational_attributes::OperationalAttributeInterceptor;
pub use referral::ReferralInterceptor;
pub use schema::SchemaInterceptor;
pub use subentry::SubentryInterceptor;
pub use trigger::{ChangeEvent, ChangeKind, EventInterceptor, TriggerInterceptor};

use std::sync::Arc;

use crate::authenticator::AuthenticatorRegistry;
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::referral::ReferralManager;
use crate::schema::SchemaRef;
use crate::csn::CsnGenerator;

/// The chain this directory core runs by default, in canonical order
/// (spec §4.6): Normalization, Authentication, Referral, Authorization
/// (ACI plus its default-policy fallback, supplied by the caller since
/// access control lives in a separate crate), Schema, Subentry, Operational
/// Attributes, Event, Trigger, and finally Exception — added last so it
/// sits innermost, right before the terminal partition dispatch, and sees
/// every error the rest of the chain can raise on the way back out.
/// Authorization runs before Schema/Subentry/OperationalAttributes/
/// Event/Trigger so a write ACI ultimately denies never reaches those
/// later stages: an attribute a principal can't write never gets an
/// operational-attribute stamp or a trigger/event fired on its behalf.
///
/// Returns the assembled chain along with the Event and Trigger
/// interceptors' registration handles, since a caller needs those to
/// subscribe listeners and bind procedures after the chain is built.
pub fn default_chain(
    schema: SchemaRef,
    authenticators: Arc<AuthenticatorRegistry>,
    referrals: Arc<ReferralManager>,
    csn_gen: Arc<CsnGenerator>,
    denormalize_op_attrs: bool,
    authorization: Arc<dyn Interceptor>,
) -> (InterceptorChain, EventInterceptor, TriggerInterceptor) {
    let events = EventInterceptor::new();
    let triggers = TriggerInterceptor::new();

    let mut chain = InterceptorChain::new();
    chain.add(Arc::new(NormalizationInterceptor::new(schema.clone())));
    chain.add(Arc::new(AuthenticationInterceptor::new(authenticators)));
    chain.add(Arc::new(ReferralInterceptor::new(referrals)));
    chain.add(authorization);
    chain.add(Arc::new(SchemaInterceptor::new(schema.clone())));
    chain.add(Arc::new(SubentryInterceptor::new(schema.clone())));
    chain.add(Arc::new(
        OperationalAttributeInterceptor::new(schema, csn_gen).with_denormalize_op_attrs(denormalize_op_attrs),
    ));
    chain.add(Arc::new(events.clone()));
    chain.add(Arc::new(triggers.clone()));
    chain.add(Arc::new(ExceptionInterceptor::new()));
    (chain, events, triggers)
}
