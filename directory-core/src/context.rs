//! The request envelope interceptors and the operation manager pass down
//! the chain (spec §3 OperationContext, §4.4).

use std::time::Duration;

use fnv::FnvHashMap;

use crate::dn::{Dn, Rdn};
use crate::entry::Entry;
use crate::filter::Filter;
use crate::modification::Modification;
use crate::referral::Scope;

/// The authenticated (or anonymous) identity an operation runs as.
#[derive(Debug, Clone)]
pub struct Principal {
    pub dn: Dn,
    pub authenticated: bool,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            dn: Dn::root(),
            authenticated: false,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        !self.authenticated
    }
}

#[derive(Debug, Clone)]
pub enum BindCredentials {
    Anonymous,
    Simple(String),
}

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub base: Dn,
    pub scope: Scope,
    pub filter: Filter,
    pub attributes: Vec<String>,
    pub size_limit: Option<usize>,
    pub time_limit: Option<Duration>,
    pub types_only: bool,
}

#[derive(Debug, Clone)]
pub enum OperationRequest {
    Bind { name: Dn, credentials: BindCredentials },
    Unbind,
    Add { entry: Entry },
    Delete { dn: Dn },
    Modify { dn: Dn, changes: Vec<Modification> },
    ModifyDn {
        dn: Dn,
        new_rdn: Rdn,
        delete_old_rdn: bool,
        new_superior: Option<Dn>,
    },
    Search(SearchRequest),
    Compare { dn: Dn, attribute: String, value: String },
}

impl OperationRequest {
    /// The DN the request targets, for routing and referral checks.
    /// Bind targets the DN it authenticates as; unbind has none.
    pub fn target_dn(&self) -> Option<&Dn> {
        match self {
            OperationRequest::Bind { name, .. } => Some(name),
            OperationRequest::Unbind => None,
            OperationRequest::Add { entry } => Some(&entry.dn),
            OperationRequest::Delete { dn } => Some(dn),
            OperationRequest::Modify { dn, .. } => Some(dn),
            OperationRequest::ModifyDn { dn, .. } => Some(dn),
            OperationRequest::Search(s) => Some(&s.base),
            OperationRequest::Compare { dn, .. } => Some(dn),
        }
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, OperationRequest::Search(_) | OperationRequest::Compare { .. })
    }
}

/// Carries one request through the interceptor chain. `extensions` is a
/// free-form scratch space interceptors use to pass derived state (a
/// resolved ACI tuple set, a normalized filter, ...) to interceptors
/// further down the chain without widening this struct for every need.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub principal: Principal,
    pub request: OperationRequest,
    extensions: FnvHashMap<String, String>,
}

impl OperationContext {
    pub fn new(principal: Principal, request: OperationRequest) -> Self {
        Self {
            principal,
            request,
            extensions: FnvHashMap::default(),
        }
    }

    pub fn set_extension(&mut self, key: &str, value: impl Into<String>) {
        self.extensions.insert(key.to_string(), value.into());
    }

    pub fn extension(&self, key: &str) -> Option<&str> {
        self.extensions.get(key).map(String::as_str)
    }
}
