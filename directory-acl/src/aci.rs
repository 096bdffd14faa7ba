//! The access control item (ACI) tuple model (spec §4.9, Component H;
//! X.501 Basic Access Control).

use directory_core::Dn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationLevel {
    None,
    Simple,
}

/// Which principals a tuple applies to.
#[derive(Debug, Clone)]
pub enum UserClass {
    AllUsers,
    ThisEntry,
    Name(Vec<Dn>),
    UserGroup(Vec<Dn>),
    Subtree(Dn),
}

/// Which part of an entry a tuple governs.
#[derive(Debug, Clone)]
pub enum ProtectedItem {
    Entry,
    AllUserAttributeTypes,
    AttributeType(Vec<String>),
}

/// The access categories ACDF reasons about (spec §4.9 micro-operations).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MicroOperation {
    Read,
    Browse,
    Add,
    Remove,
    Modify,
    Rename,
    Search,
    Compare,
    FilterMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Grant,
    Deny,
}

/// One ACI tuple: "at precedence P, for principals matching these user
/// classes, {grant|deny} these operations on these protected items."
#[derive(Debug, Clone)]
pub struct AciTuple {
    pub identification_tag: String,
    pub precedence: u8,
    pub authentication_level: AuthenticationLevel,
    pub user_classes: Vec<UserClass>,
    pub protected_items: Vec<ProtectedItem>,
    pub operations: Vec<MicroOperation>,
    pub permission: Permission,
}

impl AciTuple {
    pub fn covers_operation(&self, op: MicroOperation) -> bool {
        self.operations.contains(&op)
    }

    pub fn covers_attribute(&self, attribute_oid: &str) -> bool {
        self.protected_items.iter().any(|item| match item {
            ProtectedItem::Entry => false,
            ProtectedItem::AllUserAttributeTypes => true,
            ProtectedItem::AttributeType(types) => types.iter().any(|t| t == attribute_oid),
        })
    }

    pub fn covers_entry(&self) -> bool {
        self.protected_items.iter().any(|item| matches!(item, ProtectedItem::Entry))
    }
}
