use std::sync::Arc;

use crate::authenticator::AuthenticatorRegistry;
use crate::context::{OperationContext, OperationRequest};
use crate::error::LdapResult;
use crate::interceptor::{Interceptor, Next, OperationResult};

/// Handles bind requests directly; every other request passes through
/// with whatever principal the connection already carries (spec §4.1
/// InvalidCredentials/AuthMethodNotSupported).
pub struct AuthenticationInterceptor {
    registry: Arc<AuthenticatorRegistry>,
}

impl AuthenticationInterceptor {
    pub fn new(registry: Arc<AuthenticatorRegistry>) -> Self {
        Self { registry }
    }
}

impl Interceptor for AuthenticationInterceptor {
    fn name(&self) -> &'static str {
        "authentication"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        if let OperationRequest::Bind { name, credentials } = &ctx.request {
            let principal = self.registry.authenticate(name, credentials)?;
            ctx.principal = principal;
            return Ok(OperationResult::Bound);
        }
        next.call(ctx)
    }
}
