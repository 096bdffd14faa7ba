use crate::context::{OperationContext, OperationRequest};
use crate::error::LdapResult;
use crate::interceptor::{Interceptor, Next, OperationResult};
use crate::schema::SchemaRef;

/// Re-derives the normalized form of every DN in the request from its
/// user-provided spelling before anything downstream compares DNs for
/// equality or ancestry (spec §3: the two forms must stay in sync).
pub struct NormalizationInterceptor {
    schema: SchemaRef,
}

impl NormalizationInterceptor {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }
}

impl Interceptor for NormalizationInterceptor {
    fn name(&self) -> &'static str {
        "normalization"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        match &mut ctx.request {
            OperationRequest::Bind { name, .. } => *name = name.normalize(&self.schema)?,
            OperationRequest::Add { entry } => entry.dn = entry.dn.normalize(&self.schema)?,
            OperationRequest::Delete { dn } => *dn = dn.normalize(&self.schema)?,
            OperationRequest::Modify { dn, .. } => *dn = dn.normalize(&self.schema)?,
            OperationRequest::ModifyDn { dn, new_superior, .. } => {
                *dn = dn.normalize(&self.schema)?;
                if let Some(sup) = new_superior {
                    *sup = sup.normalize(&self.schema)?;
                }
            }
            OperationRequest::Search(search) => search.base = search.base.normalize(&self.schema)?,
            OperationRequest::Compare { dn, .. } => *dn = dn.normalize(&self.schema)?,
            OperationRequest::Unbind => {}
        }
        next.call(ctx)
    }
}
