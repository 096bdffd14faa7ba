use tracing::warn;

use crate::context::OperationContext;
use crate::error::{LdapError, LdapResult};
use crate::interceptor::{Interceptor, Next, OperationResult};

/// Outermost interceptor: logs failures at the boundary and makes sure
/// an internal [`LdapError::Conflict`] never leaks to a caller — it must
/// always be absorbed by the operation manager's retry loop before
/// reaching here (spec §4.4, §7).
pub struct ExceptionInterceptor;

impl ExceptionInterceptor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ExceptionInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for ExceptionInterceptor {
    fn name(&self) -> &'static str {
        "exception"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        match next.call(ctx) {
            Err(LdapError::Conflict) => {
                warn!("transaction conflict escaped the retry loop");
                Err(LdapError::OperationError("internal retry budget exhausted".into()))
            }
            Err(err) if !err.is_referral_like() => {
                warn!(error = %err, "operation failed");
                Err(err)
            }
            other => other,
        }
    }
}
