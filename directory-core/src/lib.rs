//! The core data model, partition store, transaction manager and
//! interceptor chain of an embedded X.500/LDAP-style directory service.
//!
//! This crate has no network layer: it is the engine a front end (an
//! LDAP listener, an embedding application, a test harness) drives
//! directly through [`operation::OperationManager`].

pub mod authenticator;
pub mod context;
pub mod csn;
pub mod cursor;
pub mod dn;
pub mod entry;
pub mod error;
pub mod filter;
pub mod interceptor;
pub mod interceptors;
pub mod mem_partition;
pub mod modification;
pub mod nexus;
pub mod operation;
pub mod partition;
pub mod referral;
pub mod rootdse;
pub mod schema;
pub mod txn;

pub use context::{BindCredentials, OperationContext, OperationRequest, Principal, SearchRequest};
pub use dn::Dn;
pub use entry::Entry;
pub use error::{LdapError, LdapResult};
pub use filter::Filter;
pub use interceptor::{InterceptorChain, OperationResult};
pub use operation::OperationManager;
pub use referral::Scope;
pub use schema::{SchemaRef, SchemaRegistry};
