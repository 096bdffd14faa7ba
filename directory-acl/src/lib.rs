//! Group and ACI tuple caches plus the access-control decision function
//! layered on top of `directory-core`'s interceptor chain.

pub mod acdf;
pub mod aci;
pub mod default_authz;
pub mod group_cache;
pub mod interceptor;
pub mod tuple_cache;

pub use acdf::{AccessRequest, Acdf};
pub use aci::{AciTuple, AuthenticationLevel, MicroOperation, Permission, ProtectedItem, UserClass};
pub use default_authz::{AllowAuthenticatedRead, DefaultAuthzPolicy, DenyByDefault};
pub use group_cache::{GroupCache, MemberLookup};
pub use interceptor::AciInterceptor;
pub use tuple_cache::TupleCache;
