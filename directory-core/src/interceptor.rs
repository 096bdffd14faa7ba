//! The interceptor chain: an ordered pipeline of cross-cutting
//! processors wrapped around the nexus dispatch, each free to inspect,
//! rewrite, short-circuit or pass along the request (spec §4.3,
//! Component D).

use std::sync::Arc;

use crate::context::OperationContext;
use crate::entry::Entry;
use crate::error::LdapResult;

/// What a completed operation produced. Every interceptor that passes
/// the request along returns whatever the chain eventually produces,
/// unmodified or not, up to the caller.
///
/// `Entries` is a fully materialized result (used for the synthetic root
/// DSE, which never reads a partition transaction). `Cursor` is what a
/// partition-backed search actually returns: a live, externally-driven
/// iterator that owns its read transaction, so a caller pulling it
/// slowly still sees entries one at a time and a size/time limit failure
/// surfaces only after every entry up to the limit has already been
/// yielded (spec §2, §4.4, §4.10).
pub enum OperationResult {
    Success,
    Bound,
    Compared(bool),
    Entries(Vec<Arc<Entry>>),
    Cursor(Box<dyn Iterator<Item = LdapResult<Arc<Entry>>> + Send>),
}

impl std::fmt::Debug for OperationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationResult::Success => write!(f, "Success"),
            OperationResult::Bound => write!(f, "Bound"),
            OperationResult::Compared(b) => write!(f, "Compared({b})"),
            OperationResult::Entries(entries) => write!(f, "Entries({} entries)", entries.len()),
            OperationResult::Cursor(_) => write!(f, "Cursor(..)"),
        }
    }
}

/// A handle to the remainder of the chain. Calling it either invokes the
/// next interceptor or, once exhausted, the terminal dispatcher that
/// actually talks to the nexus.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Interceptor>],
    terminal: &'a dyn Fn(&mut OperationContext) -> LdapResult<OperationResult>,
}

impl<'a> Next<'a> {
    pub fn call(self, ctx: &mut OperationContext) -> LdapResult<OperationResult> {
        match self.remaining.split_first() {
            Some((head, rest)) => head.invoke(
                ctx,
                Next {
                    remaining: rest,
                    terminal: self.terminal,
                },
            ),
            None => (self.terminal)(ctx),
        }
    }
}

pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;
    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult>;
}

/// An ordered list of interceptors. Construction order is invocation
/// order; the first interceptor added sees the request first and the
/// result last (spec §4.3's "outermost wraps everything" ordering).
#[derive(Default, Clone)]
pub struct InterceptorChain {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self { interceptors: Vec::new() }
    }

    pub fn add(&mut self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors.push(interceptor);
    }

    pub fn invoke(
        &self,
        ctx: &mut OperationContext,
        terminal: &dyn Fn(&mut OperationContext) -> LdapResult<OperationResult>,
    ) -> LdapResult<OperationResult> {
        let next = Next {
            remaining: &self.interceptors,
            terminal,
        };
        next.call(ctx)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }
}
