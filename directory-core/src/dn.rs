//! Distinguished names (spec §3, §4.1, Component A).
//!
//! A [`Dn`] carries the user-provided spelling of every RDN alongside the
//! normalized, schema-resolved form in the same structure — equality,
//! hashing and ordering only ever consult the normalized form.

use std::fmt;

use crate::error::{LdapError, LdapResult};
use crate::schema::SchemaRegistry;

/// One attribute-type/value assertion inside an RDN.
#[derive(Debug, Clone)]
pub struct Ava {
    /// User-provided attribute type spelling (e.g. `OU`).
    pub type_name: String,
    /// Canonical OID of the attribute type.
    pub oid: String,
    /// User-provided value spelling.
    pub value: String,
    /// Schema-normalized value bytes.
    pub normalized: Vec<u8>,
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        self.oid == other.oid && self.normalized == other.normalized
    }
}
impl Eq for Ava {}

/// A relative distinguished name: an unordered set of [`Ava`]s.
#[derive(Debug, Clone, Default)]
pub struct Rdn {
    pub avas: Vec<Ava>,
}

impl Rdn {
    fn sorted_avas(&self) -> Vec<&Ava> {
        let mut v: Vec<&Ava> = self.avas.iter().collect();
        v.sort_by(|a, b| a.oid.cmp(&b.oid).then_with(|| a.normalized.cmp(&b.normalized)));
        v
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.sorted_avas() == other.sorted_avas()
    }
}
impl Eq for Rdn {}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ava) in self.avas.iter().enumerate() {
            if i > 0 {
                write!(f, "+")?;
            }
            write!(f, "{}={}", ava.type_name, escape_value(&ava.value))?;
        }
        Ok(())
    }
}

fn escape_value(v: &str) -> String {
    let mut out = String::with_capacity(v.len());
    for (i, c) in v.chars().enumerate() {
        let needs_escape = matches!(c, ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=')
            || (i == 0 && c == ' ')
            || (i == v.chars().count() - 1 && c == ' ');
        if needs_escape {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// A distinguished name: an ordered sequence of RDNs, most-specific first.
/// The empty DN names the root DSE (spec §3 invariant).
#[derive(Debug, Clone, Default)]
pub struct Dn {
    pub rdns: Vec<Rdn>,
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.rdns == other.rdns
    }
}
impl Eq for Dn {}

impl std::hash::Hash for Dn {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for rdn in &self.rdns {
            for ava in rdn.sorted_avas() {
                ava.oid.hash(state);
                ava.normalized.hash(state);
            }
            0xffu8.hash(state);
        }
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, rdn) in self.rdns.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{rdn}")?;
        }
        Ok(())
    }
}

impl Dn {
    /// The empty DN (root DSE).
    pub fn root() -> Self {
        Self { rdns: Vec::new() }
    }

    pub fn is_root(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Parses and normalizes a user-provided DN string in one pass.
    /// Fails with [`LdapError::DnSyntax`] on malformed input.
    pub fn parse(input: &str, schema: &SchemaRegistry) -> LdapResult<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(Self::root());
        }
        let raw_rdns = split_unescaped(input, ',')?;
        let mut rdns = Vec::with_capacity(raw_rdns.len());
        for raw_rdn in raw_rdns {
            if raw_rdn.trim().is_empty() {
                return Err(LdapError::DnSyntax("empty RDN".into()));
            }
            let raw_avas = split_unescaped(&raw_rdn, '+')?;
            let mut avas = Vec::with_capacity(raw_avas.len());
            for raw_ava in raw_avas {
                avas.push(parse_ava(&raw_ava, schema)?);
            }
            rdns.push(Rdn { avas });
        }
        Ok(Self { rdns })
    }

    /// Re-derives the normalized form from a DN already built from
    /// normalized components. Idempotent by construction since every
    /// `Ava.normalized` is already the output of its matching rule.
    pub fn normalize(&self, schema: &SchemaRegistry) -> LdapResult<Self> {
        let mut rdns = Vec::with_capacity(self.rdns.len());
        for rdn in &self.rdns {
            let mut avas = Vec::with_capacity(rdn.avas.len());
            for ava in &rdn.avas {
                let at = schema.lookup_attribute_type(&ava.oid)?;
                avas.push(Ava {
                    type_name: ava.type_name.clone(),
                    oid: at.oid.clone(),
                    value: ava.value.clone(),
                    normalized: at.equality.normalize(&ava.normalized),
                });
            }
            rdns.push(Rdn { avas });
        }
        Ok(Self { rdns })
    }

    /// Renders the DN in fully normalized (OID=value) form.
    pub fn to_normalized_string(&self) -> String {
        self.rdns
            .iter()
            .map(|rdn| {
                rdn.avas
                    .iter()
                    .map(|a| format!("{}={}", a.oid, String::from_utf8_lossy(&a.normalized)))
                    .collect::<Vec<_>>()
                    .join("+")
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// True iff `self`'s normalized RDN sequence is a suffix of `other`'s.
    pub fn is_ancestor_of(&self, other: &Dn) -> bool {
        if self.rdns.len() > other.rdns.len() {
            return false;
        }
        if self.rdns.is_empty() {
            // Root DSE is the ancestor of every DN, including itself.
            return true;
        }
        let offset = other.rdns.len() - self.rdns.len();
        self.rdns[..] == other.rdns[offset..]
    }

    pub fn is_equal_or_ancestor_of(&self, other: &Dn) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Returns `dn` with `ancestor`'s suffix removed. Fails if `ancestor`
    /// is not actually an ancestor.
    pub fn descendant_of(&self, ancestor: &Dn) -> LdapResult<Dn> {
        if !ancestor.is_ancestor_of(self) {
            return Err(LdapError::OperationError(format!(
                "{ancestor} is not an ancestor of {self}"
            )));
        }
        let keep = self.rdns.len() - ancestor.rdns.len();
        Ok(Dn {
            rdns: self.rdns[..keep].to_vec(),
        })
    }

    /// Returns `self` with an RDN sequence prepended, yielding a DN whose
    /// suffix is `self` (used by referral URL rewriting, spec §4.7).
    pub fn prepend(&self, prefix: &Dn) -> Dn {
        let mut rdns = prefix.rdns.clone();
        rdns.extend(self.rdns.iter().cloned());
        Dn { rdns }
    }

    /// The immediate parent DN, or `None` for the root DSE.
    pub fn parent(&self) -> Option<Dn> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Dn {
            rdns: self.rdns[1..].to_vec(),
        })
    }

    pub fn rdn(&self) -> Option<&Rdn> {
        self.rdns.first()
    }
}

fn parse_ava(raw: &str, schema: &SchemaRegistry) -> LdapResult<Ava> {
    let eq = find_unescaped(raw, '=')
        .ok_or_else(|| LdapError::DnSyntax(format!("missing '=' in RDN component {raw:?}")))?;
    let type_name = raw[..eq].trim().to_string();
    if type_name.is_empty() {
        return Err(LdapError::DnSyntax("empty attribute type".into()));
    }
    let raw_value = raw[eq + 1..].trim();
    let value = unescape(raw_value)?;
    let at = schema.lookup_attribute_type(&type_name)?;
    if !at.syntax.validate(value.as_bytes()) {
        return Err(LdapError::AttributeSyntax {
            attribute: type_name,
            reason: format!("value {value:?} does not match syntax"),
        });
    }
    let normalized = at.equality.normalize(value.as_bytes());
    Ok(Ava {
        type_name,
        oid: at.oid.clone(),
        value,
        normalized,
    })
}

/// Splits on `sep` ignoring occurrences preceded by an odd number of
/// backslashes (escaped) per the RFC 4514 grammar.
fn split_unescaped(s: &str, sep: char) -> LdapResult<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            current.push(c);
            if let Some(next) = chars.next() {
                current.push(next);
            } else {
                return Err(LdapError::DnSyntax("dangling escape".into()));
            }
        } else if c == sep {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    parts.push(current);
    Ok(parts)
}

fn find_unescaped(s: &str, needle: char) -> Option<usize> {
    let mut chars = s.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == needle {
            return Some(i);
        }
    }
    None
}

/// Unescapes an RFC 4514 value: `\HH` hex pairs decode to raw bytes,
/// `\<special>` decodes to the literal character.
fn unescape(s: &str) -> LdapResult<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if i + 2 < bytes.len() && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit() {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|_| LdapError::DnSyntax("invalid hex escape".into()))?;
                out.push(byte);
                i += 3;
            } else if i + 1 < bytes.len() {
                out.push(bytes[i + 1]);
                i += 2;
            } else {
                return Err(LdapError::DnSyntax("dangling escape".into()));
            }
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| LdapError::DnSyntax("non-utf8 value".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> std::sync::Arc<SchemaRegistry> {
        SchemaRegistry::bootstrap()
    }

    #[test]
    fn parse_and_normalize_idempotent() {
        let schema = schema();
        let dn = Dn::parse("cn=Alpha, ou=System", &schema).unwrap();
        let n1 = dn.normalize(&schema).unwrap();
        let n2 = n1.normalize(&schema).unwrap();
        assert_eq!(n1, n2);
    }

    #[test]
    fn ancestor_relationship() {
        let schema = schema();
        let child = Dn::parse("ou=subtest,ou=testing01,ou=system", &schema).unwrap();
        let parent = Dn::parse("ou=testing01,ou=system", &schema).unwrap();
        let root = Dn::parse("ou=system", &schema).unwrap();
        assert!(parent.is_ancestor_of(&child));
        assert!(root.is_ancestor_of(&child));
        assert!(!child.is_ancestor_of(&parent));
        assert!(Dn::root().is_ancestor_of(&child));
    }

    #[test]
    fn descendant_of_strips_suffix() {
        let schema = schema();
        let child = Dn::parse("ou=subtest,ou=testing01,ou=system", &schema).unwrap();
        let parent = Dn::parse("ou=testing01,ou=system", &schema).unwrap();
        let rel = child.descendant_of(&parent).unwrap();
        assert_eq!(rel.to_string(), "ou=subtest");
    }

    #[test]
    fn case_insensitive_equality() {
        let schema = schema();
        let a = Dn::parse("OU=System", &schema).unwrap();
        let b = Dn::parse("ou=system", &schema).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn denormalized_rendering_matches_scenario_eight() {
        let schema = schema();
        let dn = Dn::parse("uid=admin,ou=system", &schema).unwrap();
        assert_eq!(
            dn.to_normalized_string(),
            "0.9.2342.19200300.100.1.1=admin,2.5.4.11=system"
        );
    }

    #[test]
    fn unbalanced_escape_is_dn_syntax_error() {
        let schema = schema();
        assert!(Dn::parse("cn=foo\\", &schema).is_err());
    }
}
