//! The entry model (spec §3, §4.1, Component A): a DN plus a bag of
//! schema-typed attributes, each value carrying both its user-provided
//! spelling and its normalized form.

use fnv::FnvHashMap;

use crate::dn::Dn;
use crate::error::{LdapError, LdapResult};
use crate::schema::SchemaRef;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub user: String,
    pub normalized: Vec<u8>,
}

impl AttributeValue {
    pub fn matches(&self, other: &AttributeValue) -> bool {
        self.normalized == other.normalized
    }
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub oid: String,
    pub type_name: String,
    pub values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(oid: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            type_name: type_name.into(),
            values: Vec::new(),
        }
    }

    pub fn contains(&self, normalized: &[u8]) -> bool {
        self.values.iter().any(|v| v.normalized == normalized)
    }
}

/// A directory entry: a DN plus the attribute set it holds (spec §3).
/// Operational attributes (`creatorsName`, `entryCSN`, ...) live in the
/// same attribute map as user attributes — usage is looked up via the
/// schema, not a separate field, matching how entries are actually
/// represented on the wire and in partitions.
#[derive(Debug, Clone)]
pub struct Entry {
    pub dn: Dn,
    attributes: FnvHashMap<String, Attribute>,
}

impl Entry {
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: FnvHashMap::default(),
        }
    }

    pub fn get(&self, oid: &str) -> Option<&Attribute> {
        self.attributes.get(oid)
    }

    pub fn get_mut(&mut self, oid: &str) -> Option<&mut Attribute> {
        self.attributes.get_mut(oid)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn attributes_mut(&mut self) -> impl Iterator<Item = &mut Attribute> {
        self.attributes.values_mut()
    }

    pub fn has_attribute(&self, oid: &str) -> bool {
        self.attributes.contains_key(oid)
    }

    /// Adds a value, creating the attribute if absent. Schema-aware
    /// callers should use [`Entry::add_value`] via the interceptor chain's
    /// schema checker so duplicates and single-value violations surface
    /// as [`LdapError`] rather than silently collapsing.
    pub fn add_value_raw(&mut self, oid: &str, type_name: &str, value: AttributeValue) {
        self.attributes
            .entry(oid.to_string())
            .or_insert_with(|| Attribute::new(oid, type_name))
            .values
            .push(value);
    }

    pub fn add_value(&mut self, schema: &SchemaRef, oid_or_name: &str, raw: &str) -> LdapResult<()> {
        let at = schema.lookup_attribute_type(oid_or_name)?;
        if !at.syntax.validate(raw.as_bytes()) {
            return Err(LdapError::AttributeSyntax {
                attribute: oid_or_name.to_string(),
                reason: format!("{raw:?} is not valid for this attribute's syntax"),
            });
        }
        let normalized = at.equality.normalize(raw.as_bytes());
        let attr = self
            .attributes
            .entry(at.oid.clone())
            .or_insert_with(|| Attribute::new(at.oid.clone(), at.primary_name()));
        if at.single_value && !attr.values.is_empty() {
            return Err(LdapError::ObjectClassViolation(format!(
                "{} is single-valued",
                at.primary_name()
            )));
        }
        if attr.contains(&normalized) {
            return Ok(());
        }
        attr.values.push(AttributeValue {
            user: raw.to_string(),
            normalized,
        });
        Ok(())
    }

    /// Removes a single value, or the whole attribute when `value` is
    /// `None` (spec §3 Modification `Delete`).
    pub fn remove_value(&mut self, schema: &SchemaRef, oid_or_name: &str, value: Option<&str>) -> LdapResult<()> {
        let at = schema.lookup_attribute_type(oid_or_name)?;
        let Some(attr) = self.attributes.get_mut(&at.oid) else {
            return Err(LdapError::NoSuchAttribute(oid_or_name.to_string()));
        };
        match value {
            None => {
                self.attributes.remove(&at.oid);
            }
            Some(v) => {
                let normalized = at.equality.normalize(v.as_bytes());
                let before = attr.values.len();
                attr.values.retain(|existing| existing.normalized != normalized);
                if attr.values.len() == before {
                    return Err(LdapError::NoSuchAttribute(format!(
                        "{oid_or_name}: value {v:?} not present"
                    )));
                }
                if attr.values.is_empty() {
                    self.attributes.remove(&at.oid);
                }
            }
        }
        Ok(())
    }

    pub fn replace_values(&mut self, schema: &SchemaRef, oid_or_name: &str, values: &[String]) -> LdapResult<()> {
        let at = schema.lookup_attribute_type(oid_or_name)?;
        self.attributes.remove(&at.oid);
        for v in values {
            self.add_value(schema, oid_or_name, v)?;
        }
        Ok(())
    }

    pub fn object_classes(&self) -> Vec<String> {
        self.get("2.5.4.0")
            .map(|a| a.values.iter().map(|v| v.user.clone()).collect())
            .unwrap_or_default()
    }

    /// Checks every MUST attribute is present and every present attribute
    /// is permitted by the entry's object classes (spec §4.1 schema
    /// checker, §3 ObjectClassViolation).
    pub fn validate_against_schema(&self, schema: &SchemaRef) -> LdapResult<()> {
        let ocs = self.object_classes();
        if ocs.is_empty() {
            return Err(LdapError::ObjectClassViolation(
                "entry has no objectClass values".into(),
            ));
        }
        let musts = schema.required_attributes(&ocs)?;
        for must in &musts {
            if !self.attributes.contains_key(must) {
                let at = schema.lookup_attribute_type(must)?;
                return Err(LdapError::ObjectClassViolation(format!(
                    "missing mandatory attribute {}",
                    at.primary_name()
                )));
            }
        }
        let allowed = schema.permitted_attributes(&ocs)?;
        for oid in self.attributes.keys() {
            if !allowed.contains(oid) {
                if let Ok(at) = schema.lookup_attribute_type(oid) {
                    if matches!(at.usage, crate::schema::AttributeUsage::DirectoryOperation) {
                        continue;
                    }
                }
                return Err(LdapError::ObjectClassViolation(format!(
                    "attribute {oid} not permitted by entry's object classes"
                )));
            }
        }
        Ok(())
    }
}
