//! Attribute-type, object-class, matching-rule and syntax registries
//! (spec §4.1, Component A). Registries are built once at startup and
//! shared behind an `Arc`; spec.md's non-goal of dynamic schema reload
//! without quiescing means there is no registration API once built.

use fnv::FnvHashMap;
use std::sync::Arc;

use crate::error::{LdapError, LdapResult};

/// A value syntax: decides whether a raw byte value is well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    DirectoryString,
    Boolean,
    Integer,
    Dn,
    OctetString,
    Oid,
    NumericString,
}

impl SyntaxKind {
    pub fn validate(self, value: &[u8]) -> bool {
        match self {
            SyntaxKind::OctetString => true,
            SyntaxKind::DirectoryString => !value.is_empty() && std::str::from_utf8(value).is_ok(),
            SyntaxKind::Boolean => matches!(value, b"TRUE" | b"FALSE"),
            SyntaxKind::Integer => std::str::from_utf8(value)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .is_some(),
            SyntaxKind::Dn => std::str::from_utf8(value).is_ok(),
            SyntaxKind::Oid => std::str::from_utf8(value)
                .map(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit() || c == '.'))
                .unwrap_or(false),
            SyntaxKind::NumericString => std::str::from_utf8(value)
                .map(|s| s.chars().all(|c| c.is_ascii_digit() || c == ' '))
                .unwrap_or(false),
        }
    }
}

/// A matching rule: normalizes a value for the purpose of equality
/// comparison (DN normalization, filter evaluation, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchingRuleKind {
    CaseIgnoreMatch,
    CaseExactMatch,
    NumericStringMatch,
    DistinguishedNameMatch,
    IntegerMatch,
    BooleanMatch,
    OctetStringMatch,
}

impl MatchingRuleKind {
    /// Normalizes a value: case folds where the rule dictates and always
    /// collapses runs of structural whitespace (spec §3 DN invariants).
    pub fn normalize(self, value: &[u8]) -> Vec<u8> {
        match self {
            MatchingRuleKind::OctetStringMatch
            | MatchingRuleKind::IntegerMatch
            | MatchingRuleKind::BooleanMatch => value.to_vec(),
            MatchingRuleKind::CaseExactMatch | MatchingRuleKind::NumericStringMatch => {
                collapse_whitespace(value)
            }
            MatchingRuleKind::CaseIgnoreMatch | MatchingRuleKind::DistinguishedNameMatch => {
                let collapsed = collapse_whitespace(value);
                collapsed.to_ascii_lowercase()
            }
        }
    }
}

fn collapse_whitespace(value: &[u8]) -> Vec<u8> {
    let s = String::from_utf8_lossy(value);
    let trimmed = s.trim();
    let mut out = String::with_capacity(trimmed.len());
    let mut prev_space = false;
    for c in trimmed.chars() {
        if c.is_whitespace() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out.into_bytes()
}

/// Whether an attribute type belongs to the `USER_APPLICATIONS` class or
/// is an operational attribute (spec §3 Entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeUsage {
    UserApplications,
    DirectoryOperation,
}

#[derive(Debug, Clone)]
pub struct AttributeType {
    pub oid: String,
    pub names: Vec<String>,
    pub syntax: SyntaxKind,
    pub equality: MatchingRuleKind,
    pub single_value: bool,
    pub usage: AttributeUsage,
    pub collective: bool,
}

impl AttributeType {
    pub fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.oid)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClassKind {
    Structural,
    Auxiliary,
    Abstract,
}

#[derive(Debug, Clone)]
pub struct ObjectClass {
    pub oid: String,
    pub names: Vec<String>,
    pub kind: ObjectClassKind,
    pub must: Vec<String>,
    pub may: Vec<String>,
}

/// Schema lookup failure, distinguished from "found but value invalid"
/// per spec §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    AttributeType,
    ObjectClass,
    MatchingRule,
    Syntax,
}

/// Immutable, shared schema registry (spec §4.1).
#[derive(Debug)]
pub struct SchemaRegistry {
    attribute_types: FnvHashMap<String, AttributeType>,
    object_classes: FnvHashMap<String, ObjectClass>,
    name_to_oid: FnvHashMap<String, String>,
}

pub type SchemaRef = Arc<SchemaRegistry>;

impl SchemaRegistry {
    fn new() -> Self {
        Self {
            attribute_types: FnvHashMap::default(),
            object_classes: FnvHashMap::default(),
            name_to_oid: FnvHashMap::default(),
        }
    }

    fn add_attribute_type(&mut self, at: AttributeType) {
        for name in &at.names {
            self.name_to_oid
                .insert(name.to_ascii_lowercase(), at.oid.clone());
        }
        self.name_to_oid.insert(at.oid.clone(), at.oid.clone());
        self.attribute_types.insert(at.oid.clone(), at);
    }

    fn add_object_class(&mut self, oc: ObjectClass) {
        for name in &oc.names {
            self.name_to_oid
                .insert(name.to_ascii_lowercase(), oc.oid.clone());
        }
        self.name_to_oid.insert(oc.oid.clone(), oc.oid.clone());
        self.object_classes.insert(oc.oid.clone(), oc);
    }

    /// Looks up an attribute type by OID or any registered name. Lookup by
    /// OID or by any alias name yields the identical record (spec §4.1).
    pub fn lookup_attribute_type(&self, oid_or_name: &str) -> LdapResult<&AttributeType> {
        let oid = self
            .name_to_oid
            .get(&oid_or_name.to_ascii_lowercase())
            .ok_or_else(|| LdapError::InvalidAttributeIdentifier(oid_or_name.to_string()))?;
        self.attribute_types
            .get(oid)
            .ok_or_else(|| LdapError::InvalidAttributeIdentifier(oid_or_name.to_string()))
    }

    pub fn lookup_objectclass(&self, oid_or_name: &str) -> LdapResult<&ObjectClass> {
        let oid = self
            .name_to_oid
            .get(&oid_or_name.to_ascii_lowercase())
            .ok_or_else(|| LdapError::ObjectClassViolation(format!("unknown objectClass {oid_or_name}")))?;
        self.object_classes
            .get(oid)
            .ok_or_else(|| LdapError::ObjectClassViolation(format!("unknown objectClass {oid_or_name}")))
    }

    pub fn canonical_oid(&self, oid_or_name: &str) -> Option<&str> {
        self.name_to_oid
            .get(&oid_or_name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// All object classes, transitively, that `oc` inherits the MUST/MAY
    /// set of `top` from. This registry does not model a superclass chain
    /// explicitly; `top` is implied for every structural class.
    pub fn required_attributes(&self, object_classes: &[String]) -> LdapResult<Vec<String>> {
        let mut musts = Vec::new();
        for name in object_classes {
            let oc = self.lookup_objectclass(name)?;
            for m in &oc.must {
                let oid = self.canonical_oid(m).unwrap_or(m).to_string();
                if !musts.contains(&oid) {
                    musts.push(oid);
                }
            }
        }
        Ok(musts)
    }

    pub fn permitted_attributes(&self, object_classes: &[String]) -> LdapResult<Vec<String>> {
        let mut allowed = vec![self.canonical_oid("objectClass").unwrap().to_string()];
        for name in object_classes {
            let oc = self.lookup_objectclass(name)?;
            for attr in oc.must.iter().chain(oc.may.iter()) {
                let oid = self.canonical_oid(attr).unwrap_or(attr).to_string();
                if !allowed.contains(&oid) {
                    allowed.push(oid);
                }
            }
        }
        Ok(allowed)
    }

    /// Builds the standard bootstrap schema used by this directory core:
    /// enough of RFC 4519/2798 to exercise every operation in spec.md §8.
    pub fn bootstrap() -> SchemaRef {
        let mut reg = Self::new();
        use AttributeUsage::*;
        use MatchingRuleKind::*;
        use SyntaxKind::*;

        let mut at = |oid: &str, names: &[&str], syntax, equality, single_value, usage| {
            reg.add_attribute_type(AttributeType {
                oid: oid.to_string(),
                names: names.iter().map(|s| s.to_string()).collect(),
                syntax,
                equality,
                single_value,
                usage,
                collective: false,
            });
        };

        at("2.5.4.0", &["objectClass"], Oid, CaseIgnoreMatch, false, UserApplications);
        at("2.5.4.3", &["cn", "commonName"], DirectoryString, CaseIgnoreMatch, false, UserApplications);
        at("2.5.4.11", &["ou", "organizationalUnitName"], DirectoryString, CaseIgnoreMatch, false, UserApplications);
        at("2.5.4.13", &["description"], DirectoryString, CaseIgnoreMatch, false, UserApplications);
        at("0.9.2342.19200300.100.1.1", &["uid", "userid"], DirectoryString, CaseIgnoreMatch, false, UserApplications);
        at("2.5.4.35", &["userPassword"], OctetString, OctetStringMatch, false, UserApplications);
        at("2.5.4.31", &["member"], Dn, DistinguishedNameMatch, false, UserApplications);
        at("2.5.4.50", &["uniqueMember"], Dn, DistinguishedNameMatch, false, UserApplications);
        at("1.3.6.1.4.1.18060.0.4.1.2.25", &["ref"], Dn, CaseExactMatch, false, UserApplications);
        at("2.5.4.4", &["sn", "surname"], DirectoryString, CaseIgnoreMatch, false, UserApplications);
        at("1.3.6.1.4.1.18060.0.4.1.2.26", &["prescriptiveACI"], DirectoryString, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.18060.0.4.1.2.27", &["entryACI"], DirectoryString, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.18060.0.4.1.2.28", &["subentryACI"], DirectoryString, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.18060.0.4.1.2.29", &["accessControlSubentries"], Dn, DistinguishedNameMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.18060.0.4.1.2.30", &["subtreeSpecification"], DirectoryString, CaseExactMatch, true, DirectoryOperation);
        at("2.5.18.3", &["creatorsName"], Dn, DistinguishedNameMatch, true, DirectoryOperation);
        at("2.5.18.1", &["createTimestamp"], DirectoryString, CaseExactMatch, true, DirectoryOperation);
        at("2.5.18.4", &["modifiersName"], Dn, DistinguishedNameMatch, true, DirectoryOperation);
        at("2.5.18.2", &["modifyTimestamp"], DirectoryString, CaseExactMatch, true, DirectoryOperation);
        at("1.3.6.1.1.16.4", &["entryUUID"], OctetString, OctetStringMatch, true, DirectoryOperation);
        at("1.3.6.1.4.1.4203.666.1.7", &["entryCSN"], DirectoryString, CaseExactMatch, true, DirectoryOperation);
        at("1.3.6.1.4.1.1466.101.120.5", &["namingContexts"], Dn, DistinguishedNameMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.1466.101.120.15", &["supportedLDAPVersion"], DirectoryString, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.1466.101.120.13", &["supportedControl"], Oid, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.1466.101.120.7", &["supportedExtension"], Oid, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.1466.101.120.14", &["supportedSASLMechanisms"], DirectoryString, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.4203.1.3.5", &["supportedFeatures"], Oid, CaseExactMatch, false, DirectoryOperation);
        at("1.3.6.1.4.1.18060.0.4.1.2.31", &["vendorName"], DirectoryString, CaseExactMatch, true, DirectoryOperation);
        at("1.3.6.1.4.1.18060.0.4.1.2.32", &["vendorVersion"], DirectoryString, CaseExactMatch, true, DirectoryOperation);
        at("2.5.18.10", &["subschemaSubentry"], Dn, DistinguishedNameMatch, true, DirectoryOperation);
        at("2.5.21.7", &["objectClasses"], DirectoryString, CaseExactMatch, false, DirectoryOperation);
        reg.add_attribute_type(AttributeType {
            oid: "1.3.6.1.4.1.18060.0.4.1.2.35".to_string(),
            names: vec!["c-description".to_string()],
            syntax: DirectoryString,
            equality: CaseIgnoreMatch,
            single_value: false,
            usage: UserApplications,
            collective: true,
        });

        let mut oc = |oid: &str, names: &[&str], kind, must: &[&str], may: &[&str]| {
            reg.add_object_class(ObjectClass {
                oid: oid.to_string(),
                names: names.iter().map(|s| s.to_string()).collect(),
                kind,
                must: must.iter().map(|s| s.to_string()).collect(),
                may: may.iter().map(|s| s.to_string()).collect(),
            });
        };
        use ObjectClassKind::*;
        oc("2.5.6.0", &["top"], Abstract, &["objectClass"], &[]);
        oc("2.5.6.5", &["organizationalUnit"], Structural, &["ou"], &["description"]);
        oc("2.5.6.6", &["person"], Structural, &["cn", "sn"], &["description", "userPassword"]);
        oc("2.5.6.7", &["organizationalPerson"], Structural, &["cn", "sn"], &["ou", "description", "userPassword"]);
        oc("2.5.6.8", &["organizationalRole"], Structural, &["cn"], &["ou", "description"]);
        oc("2.16.840.1.113730.3.2.6", &["referral"], Structural, &["ref"], &[]);
        oc("2.5.6.9", &["groupOfNames"], Structural, &["cn", "member"], &["description"]);
        oc("2.5.6.17", &["groupOfUniqueNames"], Structural, &["cn", "uniqueMember"], &["description"]);
        oc(
            "1.3.6.1.4.1.18060.0.4.1.2.33",
            &["accessControlSubentry"],
            Auxiliary,
            &[],
            &["prescriptiveACI"],
        );
        oc(
            "1.3.6.1.4.1.18060.0.4.1.2.34",
            &["subentry"],
            Structural,
            &["cn", "subtreeSpecification"],
            &[],
        );
        oc(
            "1.3.6.1.4.1.18060.0.4.1.2.36",
            &["collectiveAttributeSubentry"],
            Auxiliary,
            &[],
            &["c-description"],
        );

        Arc::new(reg)
    }
}
