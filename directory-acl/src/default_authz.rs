//! The fallback policy ACDF applies when no ACI tuple governs a target
//! at all (spec §4.9 edge case: an administrative point with no
//! prescriptive ACI planted yet).

use crate::acdf::AccessRequest;

pub trait DefaultAuthzPolicy: Send + Sync {
    fn decide(&self, req: &AccessRequest<'_>) -> bool;
}

/// Deny everything not explicitly granted by a tuple. This is the
/// policy this directory core ships with: an administrative area with
/// no ACI planted is inaccessible rather than implicitly open.
pub struct DenyByDefault;

impl DefaultAuthzPolicy for DenyByDefault {
    fn decide(&self, _req: &AccessRequest<'_>) -> bool {
        false
    }
}

/// Grants read-only access to authenticated principals and denies
/// everyone else. Useful for an embedding application that wants a
/// permissive starting point before any ACI has been planted.
pub struct AllowAuthenticatedRead;

impl DefaultAuthzPolicy for AllowAuthenticatedRead {
    fn decide(&self, req: &AccessRequest<'_>) -> bool {
        req.principal_authenticated
            && matches!(
                req.operation,
                crate::aci::MicroOperation::Read | crate::aci::MicroOperation::Search | crate::aci::MicroOperation::Browse
            )
    }
}
