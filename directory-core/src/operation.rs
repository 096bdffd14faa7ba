//! The operation manager: normalize → referral check → schema check
//! (all as interceptors) → transaction retry loop → nexus dispatch
//! (spec §4.4, Component E).

use std::sync::Arc;

use crate::context::{OperationContext, OperationRequest};
use crate::csn::CsnGenerator;
use crate::cursor::SearchCursor;
use crate::dn::Dn;
use crate::entry::Entry;
use crate::error::{LdapError, LdapResult};
use crate::interceptor::{InterceptorChain, OperationResult};
use crate::modification::apply_all;
use crate::nexus::Nexus;
use crate::referral::Scope;

/// How many times a single logical operation retries after losing a
/// write-write race at commit, before giving up with an internal error
/// (spec §4.4). Five is generous for the contention an embedded,
/// single-process directory core actually sees.
const MAX_COMMIT_RETRIES: usize = 5;

pub struct OperationManager {
    nexus: Nexus,
    chain: InterceptorChain,
    csn_gen: Arc<CsnGenerator>,
}

impl OperationManager {
    pub fn new(nexus: Nexus, chain: InterceptorChain, csn_gen: Arc<CsnGenerator>) -> Self {
        Self { nexus, chain, csn_gen }
    }

    pub fn nexus(&self) -> &Nexus {
        &self.nexus
    }

    pub fn nexus_mut(&mut self) -> &mut Nexus {
        &mut self.nexus
    }

    pub fn execute(&self, mut ctx: OperationContext) -> LdapResult<OperationResult> {
        self.chain.invoke(&mut ctx, &|ctx| self.dispatch_with_retry(ctx))
    }

    fn dispatch_with_retry(&self, ctx: &mut OperationContext) -> LdapResult<OperationResult> {
        for attempt in 0..MAX_COMMIT_RETRIES {
            match self.dispatch_once(ctx) {
                Err(LdapError::Conflict) if attempt + 1 < MAX_COMMIT_RETRIES => continue,
                other => return other,
            }
        }
        Err(LdapError::Conflict)
    }

    fn dispatch_once(&self, ctx: &mut OperationContext) -> LdapResult<OperationResult> {
        match &ctx.request {
            OperationRequest::Unbind => Ok(OperationResult::Success),
            OperationRequest::Bind { .. } => {
                // The authentication interceptor always resolves binds
                // before the chain reaches this terminal step.
                Ok(OperationResult::Bound)
            }
            OperationRequest::Add { entry } => self.dispatch_add(entry.clone()),
            OperationRequest::Delete { dn } => self.dispatch_delete(dn),
            OperationRequest::Modify { dn, changes } => self.dispatch_modify(dn, changes),
            OperationRequest::ModifyDn {
                dn,
                new_rdn,
                delete_old_rdn,
                new_superior,
            } => self.dispatch_modify_dn(dn, new_rdn, *delete_old_rdn, new_superior.as_ref()),
            OperationRequest::Search(search) => self.dispatch_search(search),
            OperationRequest::Compare { dn, attribute, value } => self.dispatch_compare(dn, attribute, value),
        }
    }

    fn dispatch_add(&self, entry: Entry) -> LdapResult<OperationResult> {
        if entry.dn.is_root() {
            return Err(LdapError::NotAllowedOnRootDse);
        }
        let parent = entry.dn.parent().ok_or(LdapError::NotAllowedOnRootDse)?;
        let partition = self.nexus.partition_for(&entry.dn)?;
        let mut txn = partition.begin();
        if !self.nexus.is_naming_context(&entry.dn) && !txn.contains(&parent) {
            return Err(LdapError::NoSuchObject(parent.to_string()));
        }
        if txn.contains(&entry.dn) {
            return Err(LdapError::AlreadyExists(entry.dn.to_string()));
        }
        partition.add(&mut txn, entry, self.csn_gen.next())?;
        partition.commit(txn)?;
        Ok(OperationResult::Success)
    }

    fn dispatch_delete(&self, dn: &Dn) -> LdapResult<OperationResult> {
        if dn.is_root() {
            return Err(LdapError::NotAllowedOnRootDse);
        }
        let partition = self.nexus.partition_for(dn)?;
        let mut txn = partition.begin();
        if !txn.contains(dn) {
            return Err(LdapError::NoSuchObject(dn.to_string()));
        }
        if txn.iter().any(|(other, _)| other != dn && dn.is_ancestor_of(other)) {
            return Err(LdapError::NotAllowedOnNonLeaf(dn.to_string()));
        }
        partition.delete(&mut txn, dn)?;
        partition.commit(txn)?;
        Ok(OperationResult::Success)
    }

    fn dispatch_modify(&self, dn: &Dn, changes: &[crate::modification::Modification]) -> LdapResult<OperationResult> {
        if dn.is_root() {
            return Err(LdapError::NotAllowedOnRootDse);
        }
        let partition = self.nexus.partition_for(dn)?;
        let mut txn = partition.begin();
        let current = txn.get(dn).ok_or_else(|| LdapError::NoSuchObject(dn.to_string()))?;
        let mut updated = (*current).clone();
        apply_all(&mut updated, partition.schema(), changes)?;
        partition.replace(&mut txn, updated, self.csn_gen.next())?;
        partition.commit(txn)?;
        Ok(OperationResult::Success)
    }

    fn dispatch_modify_dn(
        &self,
        dn: &Dn,
        new_rdn: &crate::dn::Rdn,
        delete_old_rdn: bool,
        new_superior: Option<&Dn>,
    ) -> LdapResult<OperationResult> {
        if dn.is_root() {
            return Err(LdapError::NotAllowedOnRootDse);
        }
        let partition = self.nexus.partition_for(dn)?;
        let mut txn = partition.begin();
        let current = txn.get(dn).ok_or_else(|| LdapError::NoSuchObject(dn.to_string()))?;
        if txn.iter().any(|(other, _)| other != dn && dn.is_ancestor_of(other)) {
            return Err(LdapError::NotAllowedOnNonLeaf(dn.to_string()));
        }
        let parent = new_superior.cloned().or_else(|| dn.parent()).unwrap_or_else(Dn::root);
        let new_dn = crate::dn::Dn {
            rdns: std::iter::once(new_rdn.clone()).chain(parent.rdns.iter().cloned()).collect(),
        };
        if txn.contains(&new_dn) {
            return Err(LdapError::AlreadyExists(new_dn.to_string()));
        }
        let mut entry = (*current).clone();
        entry.dn = new_dn.clone();
        if delete_old_rdn {
            for ava in &dn.rdns[0].avas {
                let _ = entry.remove_value(partition.schema(), &ava.oid, Some(&ava.value));
            }
        }
        partition.delete(&mut txn, dn)?;
        partition.add(&mut txn, entry, self.csn_gen.next())?;
        partition.commit(txn)?;
        Ok(OperationResult::Success)
    }

    fn dispatch_search(&self, search: &crate::context::SearchRequest) -> LdapResult<OperationResult> {
        if search.base.is_root() && matches!(search.scope, Scope::Base) {
            let schema = self
                .nexus
                .partitions_under(&Dn::root())
                .next()
                .map(|p| p.schema().clone());
            let dse = match schema {
                Some(schema) => crate::rootdse::build(&self.nexus, &schema),
                None => return Ok(OperationResult::Entries(Vec::new())),
            };
            return Ok(OperationResult::Entries(vec![Arc::new(dse)]));
        }
        let partitions: Vec<_> = self.nexus.partitions_under(&search.base).collect();
        let partition = if partitions.is_empty() {
            self.nexus.partition_for(&search.base)?
        } else {
            partitions[0].clone()
        };
        let txn = partition.begin();
        let candidates: Vec<Dn> = match search.scope {
            Scope::Base => txn.get(&search.base).map(|_| search.base.clone()).into_iter().collect(),
            Scope::OneLevel => txn
                .iter()
                .filter(|(dn, _)| dn.parent().as_ref() == Some(&search.base))
                .map(|(dn, _)| dn.clone())
                .collect(),
            Scope::Subtree => partition.dns_under(&txn, &search.base).collect(),
        };
        let cursor = SearchCursor::new(
            txn,
            candidates,
            search.filter.clone(),
            partition.schema().clone(),
            search.size_limit,
            search.time_limit,
        );
        Ok(OperationResult::Cursor(Box::new(cursor)))
    }

    fn dispatch_compare(&self, dn: &Dn, attribute: &str, value: &str) -> LdapResult<OperationResult> {
        let partition = self.nexus.partition_for(dn)?;
        let txn = partition.begin();
        let entry = txn.get(dn).ok_or_else(|| LdapError::NoSuchObject(dn.to_string()))?;
        let at = partition.schema().lookup_attribute_type(attribute)?;
        let normalized = at.equality.normalize(value.as_bytes());
        let result = entry.get(&at.oid).map(|a| a.contains(&normalized)).unwrap_or(false);
        Ok(OperationResult::Compared(result))
    }
}
