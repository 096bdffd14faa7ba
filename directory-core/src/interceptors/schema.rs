use crate::context::{OperationContext, OperationRequest};
use crate::error::LdapResult;
use crate::interceptor::{Interceptor, Next, OperationResult};
use crate::schema::SchemaRef;

/// Validates schema conformance as early as possible: a whole new entry
/// on add, and that every modified attribute name actually resolves on
/// modify. The MUST/MAY check against a modified entry's *final* state
/// only happens once the modification is applied to the looked-up entry
/// inside the partition dispatch, since that is the first point an
/// entry's current attribute set is available (spec §4.1).
pub struct SchemaInterceptor {
    schema: SchemaRef,
}

impl SchemaInterceptor {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }
}

impl Interceptor for SchemaInterceptor {
    fn name(&self) -> &'static str {
        "schema"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        match &ctx.request {
            OperationRequest::Add { entry } => {
                entry.validate_against_schema(&self.schema)?;
            }
            OperationRequest::Modify { changes, .. } => {
                for change in changes {
                    self.schema.lookup_attribute_type(&change.attribute)?;
                }
            }
            OperationRequest::Compare { attribute, .. } => {
                self.schema.lookup_attribute_type(attribute)?;
            }
            _ => {}
        }
        next.call(ctx)
    }
}
