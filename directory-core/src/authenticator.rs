//! Bind authentication (spec §4.1 AuthMethodNotSupported/InvalidCredentials
//! edge cases, Component D's authentication interceptor).

use std::sync::Arc;

use fnv::FnvHashMap;

use crate::context::BindCredentials;
use crate::context::Principal;
use crate::dn::Dn;
use crate::error::{LdapError, LdapResult};

/// Looks up the `userPassword` value stored for a DN, decoupling
/// authenticators from any particular partition implementation.
pub type PasswordLookup = Arc<dyn Fn(&Dn) -> Option<Vec<u8>> + Send + Sync>;

pub trait Authenticator: Send + Sync {
    fn mechanism(&self) -> &'static str;
    fn authenticate(&self, name: &Dn, credentials: &BindCredentials) -> LdapResult<Principal>;
}

/// Anonymous bind: always succeeds, never authenticates (spec: an
/// anonymous principal performs reads under whatever ACIs grant the
/// anonymous user class).
pub struct AnonymousAuthenticator;

impl Authenticator for AnonymousAuthenticator {
    fn mechanism(&self) -> &'static str {
        "none"
    }

    fn authenticate(&self, _name: &Dn, credentials: &BindCredentials) -> LdapResult<Principal> {
        match credentials {
            BindCredentials::Anonymous => Ok(Principal::anonymous()),
            _ => Err(LdapError::AuthMethodNotSupported("none".into())),
        }
    }
}

/// Simple bind: compares the supplied password against the `userPassword`
/// value stored on the target entry.
pub struct SimpleAuthenticator {
    lookup: PasswordLookup,
}

impl SimpleAuthenticator {
    pub fn new(lookup: PasswordLookup) -> Self {
        Self { lookup }
    }
}

impl Authenticator for SimpleAuthenticator {
    fn mechanism(&self) -> &'static str {
        "simple"
    }

    fn authenticate(&self, name: &Dn, credentials: &BindCredentials) -> LdapResult<Principal> {
        let BindCredentials::Simple(supplied) = credentials else {
            return Err(LdapError::AuthMethodNotSupported("simple".into()));
        };
        if supplied.is_empty() {
            // An unauthenticated bind (empty password) must not be
            // silently treated as anonymous; RFC 4513 requires rejection
            // unless the server explicitly opts in, which this one does not.
            return Err(LdapError::InvalidCredentials);
        }
        let stored = (self.lookup)(name).ok_or(LdapError::InvalidCredentials)?;
        if stored == supplied.as_bytes() {
            Ok(Principal {
                dn: name.clone(),
                authenticated: true,
            })
        } else {
            Err(LdapError::InvalidCredentials)
        }
    }
}

/// Dispatches a bind request to the authenticator registered for its
/// mechanism.
#[derive(Default)]
pub struct AuthenticatorRegistry {
    by_mechanism: FnvHashMap<&'static str, Arc<dyn Authenticator>>,
}

impl AuthenticatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, authenticator: Arc<dyn Authenticator>) {
        self.by_mechanism.insert(authenticator.mechanism(), authenticator);
    }

    pub fn authenticate(&self, name: &Dn, credentials: &BindCredentials) -> LdapResult<Principal> {
        let mechanism = match credentials {
            BindCredentials::Anonymous => "none",
            BindCredentials::Simple(_) => "simple",
        };
        let authenticator = self
            .by_mechanism
            .get(mechanism)
            .ok_or_else(|| LdapError::AuthMethodNotSupported(mechanism.to_string()))?;
        authenticator.authenticate(name, credentials)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaRegistry;

    #[test]
    fn anonymous_bind_succeeds() {
        let mut reg = AuthenticatorRegistry::new();
        reg.register(Arc::new(AnonymousAuthenticator));
        let principal = reg.authenticate(&Dn::root(), &BindCredentials::Anonymous).unwrap();
        assert!(!principal.authenticated);
    }

    #[test]
    fn simple_bind_checks_password() {
        let schema = SchemaRegistry::bootstrap();
        let dn = Dn::parse("uid=admin,ou=system", &schema).unwrap();
        let lookup: PasswordLookup = Arc::new(|_: &Dn| Some(b"secret".to_vec()));
        let mut reg = AuthenticatorRegistry::new();
        reg.register(Arc::new(SimpleAuthenticator::new(lookup)));

        let ok = reg.authenticate(&dn, &BindCredentials::Simple("secret".into()));
        assert!(ok.is_ok());
        let bad = reg.authenticate(&dn, &BindCredentials::Simple("wrong".into()));
        assert_eq!(bad.unwrap_err(), LdapError::InvalidCredentials);
    }

    #[test]
    fn empty_password_is_rejected_not_anonymous() {
        let schema = SchemaRegistry::bootstrap();
        let dn = Dn::parse("uid=admin,ou=system", &schema).unwrap();
        let lookup: PasswordLookup = Arc::new(|_: &Dn| Some(b"secret".to_vec()));
        let mut reg = AuthenticatorRegistry::new();
        reg.register(Arc::new(SimpleAuthenticator::new(lookup)));
        assert_eq!(
            reg.authenticate(&dn, &BindCredentials::Simple(String::new())).unwrap_err(),
            LdapError::InvalidCredentials
        );
    }
}
