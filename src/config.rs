//! Builder for a [`crate::DirectoryService`] instance.

use directory_acl::{AllowAuthenticatedRead, DefaultAuthzPolicy, DenyByDefault};

/// Which fallback the access-control decision function applies when no
/// ACI tuple governs a target at all.
pub enum DefaultAuthz {
    /// Nothing is accessible until an administrator plants an ACI.
    DenyAll,
    /// Authenticated principals may read/search/browse by default.
    AllowAuthenticatedRead,
}

impl DefaultAuthz {
    pub(crate) fn build(&self) -> Box<dyn DefaultAuthzPolicy> {
        match self {
            DefaultAuthz::DenyAll => Box::new(DenyByDefault),
            DefaultAuthz::AllowAuthenticatedRead => Box::new(AllowAuthenticatedRead),
        }
    }
}

/// Configuration for one embedded directory service instance.
pub struct DirectoryConfig {
    pub(crate) replica_id: u32,
    pub(crate) default_authz: DefaultAuthz,
    pub(crate) root_dn: Option<String>,
    pub(crate) denormalize_op_attrs: bool,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            replica_id: 1,
            default_authz: DefaultAuthz::DenyAll,
            root_dn: None,
            denormalize_op_attrs: true,
        }
    }
}

impl DirectoryConfig {
    pub fn builder() -> DirectoryConfigBuilder {
        DirectoryConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct DirectoryConfigBuilder {
    replica_id: Option<u32>,
    default_authz: Option<DefaultAuthz>,
    root_dn: Option<String>,
    denormalize_op_attrs: Option<bool>,
}

impl DirectoryConfigBuilder {
    /// The CSN generator's replica identifier. Every embedded instance
    /// that shares a replication stream must use a distinct value
    /// (spec §4.4, §5); a lone embedded instance can leave the default.
    pub fn replica_id(mut self, id: u32) -> Self {
        self.replica_id = Some(id);
        self
    }

    pub fn default_authz(mut self, policy: DefaultAuthz) -> Self {
        self.default_authz = Some(policy);
        self
    }

    /// The DN exempt from access-control checks entirely, conventionally
    /// the identity that administers ACI in the first place.
    pub fn root_dn(mut self, dn: impl Into<String>) -> Self {
        self.root_dn = Some(dn.into());
        self
    }

    /// Whether DN-valued operational attributes (`creatorsName`,
    /// `modifiersName`) are emitted in user-typed or normalized form.
    /// Defaults to `true` (user-typed), the more common embedder
    /// expectation.
    pub fn denormalize_op_attrs(mut self, denormalize: bool) -> Self {
        self.denormalize_op_attrs = Some(denormalize);
        self
    }

    pub fn build(self) -> DirectoryConfig {
        DirectoryConfig {
            replica_id: self.replica_id.unwrap_or(1),
            default_authz: self.default_authz.unwrap_or(DefaultAuthz::DenyAll),
            root_dn: self.root_dn,
            denormalize_op_attrs: self.denormalize_op_attrs.unwrap_or(true),
        }
    }
}
