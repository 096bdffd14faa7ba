//! Wires [`Acdf`] into the directory core's interceptor chain
//! (spec §4.9, Component H).

use std::sync::Arc;

use directory_core::interceptor::{Interceptor, Next, OperationResult};
use directory_core::{LdapError, LdapResult, OperationContext, OperationRequest};

use crate::acdf::{AccessRequest, Acdf};
use crate::aci::MicroOperation;

pub struct AciInterceptor {
    acdf: Arc<Acdf>,
    /// A principal exempt from ACDF entirely, mirroring the conventional
    /// LDAP "root DN" / directory manager that administers ACI itself
    /// and so cannot be locked out by it.
    root_dn: Option<directory_core::Dn>,
}

impl AciInterceptor {
    pub fn new(acdf: Acdf) -> Self {
        Self {
            acdf: Arc::new(acdf),
            root_dn: None,
        }
    }

    pub fn with_root_dn(acdf: Acdf, root_dn: directory_core::Dn) -> Self {
        Self {
            acdf: Arc::new(acdf),
            root_dn: Some(root_dn),
        }
    }

    fn check(&self, ctx: &OperationContext, operation: MicroOperation, target: &directory_core::Dn, attribute_oid: Option<&str>) -> LdapResult<()> {
        if self.root_dn.as_ref() == Some(&ctx.principal.dn) {
            return Ok(());
        }
        let req = AccessRequest {
            principal: &ctx.principal.dn,
            principal_authenticated: ctx.principal.authenticated,
            target,
            attribute_oid,
            operation,
        };
        if self.acdf.evaluate(&req) {
            Ok(())
        } else {
            Err(LdapError::InsufficientAccessRights)
        }
    }
}

impl Interceptor for AciInterceptor {
    fn name(&self) -> &'static str {
        "accessControl"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        match ctx.request.clone() {
            OperationRequest::Add { entry } => {
                let parent = entry.dn.parent().unwrap_or_else(directory_core::Dn::root);
                self.check(ctx, MicroOperation::Add, &parent, None)?;
            }
            OperationRequest::Delete { dn } => {
                self.check(ctx, MicroOperation::Remove, &dn, None)?;
            }
            OperationRequest::Modify { dn, ref changes } => {
                for change in changes {
                    self.check(ctx, MicroOperation::Modify, &dn, Some(&change.attribute))?;
                }
            }
            OperationRequest::ModifyDn { ref dn, .. } => {
                self.check(ctx, MicroOperation::Rename, dn, None)?;
            }
            OperationRequest::Compare { dn, ref attribute, .. } => {
                self.check(ctx, MicroOperation::Compare, &dn, Some(attribute))?;
            }
            OperationRequest::Search(ref search) => {
                self.check(ctx, MicroOperation::Search, &search.base, None)?;
            }
            OperationRequest::Bind { .. } | OperationRequest::Unbind => {}
        }

        let is_root = self.root_dn.as_ref() == Some(&ctx.principal.dn);
        match next.call(ctx)? {
            OperationResult::Entries(entries) if is_root => Ok(OperationResult::Entries(entries)),
            OperationResult::Entries(entries) => {
                let visible = entries
                    .into_iter()
                    .filter(|e| {
                        let req = AccessRequest {
                            principal: &ctx.principal.dn,
                            principal_authenticated: ctx.principal.authenticated,
                            target: &e.dn,
                            attribute_oid: None,
                            operation: MicroOperation::Browse,
                        };
                        self.acdf.evaluate(&req)
                    })
                    .collect();
                Ok(OperationResult::Entries(visible))
            }
            OperationResult::Cursor(cursor) if is_root => Ok(OperationResult::Cursor(cursor)),
            OperationResult::Cursor(cursor) => {
                let acdf = self.acdf.clone();
                let principal = ctx.principal.dn.clone();
                let authenticated = ctx.principal.authenticated;
                let filtered = cursor.filter_map(move |item| match item {
                    Ok(e) => {
                        let req = AccessRequest {
                            principal: &principal,
                            principal_authenticated: authenticated,
                            target: &e.dn,
                            attribute_oid: None,
                            operation: MicroOperation::Browse,
                        };
                        if acdf.evaluate(&req) {
                            Some(Ok(e))
                        } else {
                            None
                        }
                    }
                    Err(err) => Some(Err(err)),
                });
                Ok(OperationResult::Cursor(Box::new(filtered)))
            }
            other => Ok(other),
        }
    }
}
