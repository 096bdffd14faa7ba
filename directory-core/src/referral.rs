//! Referral planting and URL rewriting (spec §3 Referral, §4.7,
//! Component F).

use crate::dn::Dn;

/// The LDAP search scope, needed only to render the `?scope` component of
/// a rewritten referral URL (RFC 4516).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Base,
    OneLevel,
    Subtree,
}

impl Scope {
    fn label(self) -> &'static str {
        match self {
            Scope::Base => "base",
            Scope::OneLevel => "one",
            Scope::Subtree => "sub",
        }
    }
}

#[derive(Debug, Clone)]
struct PlantedReferral {
    dn: Dn,
    base_urls: Vec<String>,
}

/// Holds every planted referral, keyed by the DN at which it was
/// created. Lookup picks the referral whose DN is the longest matching
/// ancestor of the target, mirroring [`crate::nexus::Nexus`]'s routing.
#[derive(Default)]
pub struct ReferralCache {
    entries: Vec<PlantedReferral>,
}

impl ReferralCache {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn plant(&mut self, dn: Dn, base_urls: Vec<String>) {
        self.entries.retain(|e| e.dn != dn);
        self.entries.push(PlantedReferral { dn, base_urls });
    }

    pub fn unplant(&mut self, dn: &Dn) {
        self.entries.retain(|e| &e.dn != dn);
    }

    /// The closest referral that is an ancestor of, or equal to, `dn`.
    fn closest(&self, dn: &Dn) -> Option<&PlantedReferral> {
        self.entries
            .iter()
            .filter(|e| e.dn.is_equal_or_ancestor_of(dn))
            .max_by_key(|e| e.dn.rdns.len())
    }

    pub fn is_referral(&self, dn: &Dn) -> bool {
        self.entries.iter().any(|e| &e.dn == dn)
    }
}

/// Resolves target DNs against planted referrals and rewrites base URLs
/// into full continuation references (spec §4.7).
pub struct ReferralManager {
    cache: parking_lot::RwLock<ReferralCache>,
}

impl Default for ReferralManager {
    fn default() -> Self {
        Self {
            cache: parking_lot::RwLock::new(ReferralCache::new()),
        }
    }
}

impl ReferralManager {
    pub fn plant(&self, dn: Dn, base_urls: Vec<String>) {
        self.cache.write().plant(dn, base_urls);
    }

    pub fn unplant(&self, dn: &Dn) {
        self.cache.write().unplant(dn);
    }

    pub fn is_referral(&self, dn: &Dn) -> bool {
        self.cache.read().is_referral(dn)
    }

    /// If `dn` (or an ancestor of it) carries a referral, returns the
    /// fully rewritten continuation URLs the client should chase next.
    /// `None` means the operation should proceed normally.
    pub fn resolve(&self, dn: &Dn, scope: Scope) -> Option<Vec<String>> {
        let guard = self.cache.read();
        let hit = guard.closest(dn)?;
        Some(
            hit.base_urls
                .iter()
                .map(|base| format!("{}/{}??{}", base.trim_end_matches('/'), dn, scope.label()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    #[test]
    fn referral_below_planted_dn_rewrites_url() {
        let schema = SchemaRegistry::bootstrap();
        let planted = Dn::parse("ou=foo", &schema).unwrap();
        let mgr = ReferralManager::default();
        mgr.plant(planted.clone(), vec!["ldap://host2".into()]);

        let urls = mgr.resolve(&planted, Scope::Base).unwrap();
        assert_eq!(urls, vec!["ldap://host2/ou=foo??base".to_string()]);
    }

    #[test]
    fn non_referral_dn_resolves_to_none() {
        let schema = SchemaRegistry::bootstrap();
        let mgr = ReferralManager::default();
        let dn = Dn::parse("ou=elsewhere", &schema).unwrap();
        assert!(mgr.resolve(&dn, Scope::Base).is_none());
    }
}
