//! Search filters and their three-valued evaluation (spec §3, §4.1).
//!
//! Filter evaluation against an entry yields [`Tristate::Undefined`]
//! whenever the attribute involved does not exist in the schema, or does
//! not appear on the entry at all — never an error. A bare search match
//! collapses `Undefined` to non-match, matching X.500's defined
//! evaluation rules.

use crate::entry::Entry;
use crate::schema::SchemaRef;

/// The outcome of evaluating one filter node (spec §3 Filter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tristate {
    True,
    False,
    Undefined,
}

impl Tristate {
    fn not(self) -> Tristate {
        match self {
            Tristate::True => Tristate::False,
            Tristate::False => Tristate::True,
            Tristate::Undefined => Tristate::Undefined,
        }
    }

    fn and(results: impl Iterator<Item = Tristate>) -> Tristate {
        let mut saw_undefined = false;
        for r in results {
            match r {
                Tristate::False => return Tristate::False,
                Tristate::Undefined => saw_undefined = true,
                Tristate::True => {}
            }
        }
        if saw_undefined {
            Tristate::Undefined
        } else {
            Tristate::True
        }
    }

    fn or(results: impl Iterator<Item = Tristate>) -> Tristate {
        let mut saw_undefined = false;
        for r in results {
            match r {
                Tristate::True => return Tristate::True,
                Tristate::Undefined => saw_undefined = true,
                Tristate::False => {}
            }
        }
        if saw_undefined {
            Tristate::Undefined
        } else {
            Tristate::False
        }
    }
}

#[derive(Debug, Clone)]
pub struct Substrings {
    pub initial: Option<String>,
    pub any: Vec<String>,
    pub final_: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Equality { attr: String, value: String },
    Substrings { attr: String, parts: Substrings },
    GreaterOrEqual { attr: String, value: String },
    LessOrEqual { attr: String, value: String },
    Present { attr: String },
    Approx { attr: String, value: String },
}

impl Filter {
    /// Evaluates to a definite boolean, treating `Undefined` as non-match
    /// (the behavior a search operation applies, spec §4.1).
    pub fn matches(&self, entry: &Entry, schema: &SchemaRef) -> bool {
        self.evaluate(entry, schema) == Tristate::True
    }

    pub fn evaluate(&self, entry: &Entry, schema: &SchemaRef) -> Tristate {
        match self {
            Filter::And(children) => Tristate::and(children.iter().map(|c| c.evaluate(entry, schema))),
            Filter::Or(children) => Tristate::or(children.iter().map(|c| c.evaluate(entry, schema))),
            Filter::Not(inner) => inner.evaluate(entry, schema).not(),
            Filter::Present { attr } => {
                let Ok(at) = schema.lookup_attribute_type(attr) else {
                    return Tristate::Undefined;
                };
                if entry.has_attribute(&at.oid) {
                    Tristate::True
                } else {
                    Tristate::False
                }
            }
            Filter::Equality { attr, value } => {
                let Ok(at) = schema.lookup_attribute_type(attr) else {
                    return Tristate::Undefined;
                };
                let Some(a) = entry.get(&at.oid) else {
                    return Tristate::Undefined;
                };
                let normalized = at.equality.normalize(value.as_bytes());
                if a.contains(&normalized) {
                    Tristate::True
                } else {
                    Tristate::False
                }
            }
            Filter::Approx { attr, value } => {
                // No approximate-match algorithm is specified; fall back
                // to equality, matching how most directory servers treat
                // unsupported approx rules.
                Filter::Equality {
                    attr: attr.clone(),
                    value: value.clone(),
                }
                .evaluate(entry, schema)
            }
            Filter::GreaterOrEqual { attr, value } => ordered_compare(entry, schema, attr, value, |o| o != std::cmp::Ordering::Less),
            Filter::LessOrEqual { attr, value } => ordered_compare(entry, schema, attr, value, |o| o != std::cmp::Ordering::Greater),
            Filter::Substrings { attr, parts } => {
                let Ok(at) = schema.lookup_attribute_type(attr) else {
                    return Tristate::Undefined;
                };
                let Some(a) = entry.get(&at.oid) else {
                    return Tristate::Undefined;
                };
                let matched = a.values.iter().any(|v| {
                    let hay = String::from_utf8_lossy(&at.equality.normalize(v.user.as_bytes())).into_owned();
                    substring_match(&hay, parts, &at.equality)
                });
                if matched {
                    Tristate::True
                } else {
                    Tristate::False
                }
            }
        }
    }
}

fn ordered_compare(
    entry: &Entry,
    schema: &SchemaRef,
    attr: &str,
    value: &str,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Tristate {
    let Ok(at) = schema.lookup_attribute_type(attr) else {
        return Tristate::Undefined;
    };
    let Some(a) = entry.get(&at.oid) else {
        return Tristate::Undefined;
    };
    let target = at.equality.normalize(value.as_bytes());
    let hit = a.values.iter().any(|v| accept(v.normalized.cmp(&target)));
    if hit {
        Tristate::True
    } else {
        Tristate::False
    }
}

fn substring_match(hay: &str, parts: &Substrings, eq: &crate::schema::MatchingRuleKind) -> bool {
    let norm = |s: &str| String::from_utf8_lossy(&eq.normalize(s.as_bytes())).into_owned();
    let mut rest = hay;
    if let Some(initial) = &parts.initial {
        let needle = norm(initial);
        if !rest.starts_with(&needle) {
            return false;
        }
        rest = &rest[needle.len()..];
    }
    for chunk in &parts.any {
        let needle = norm(chunk);
        match rest.find(&needle) {
            Some(idx) => rest = &rest[idx + needle.len()..],
            None => return false,
        }
    }
    if let Some(final_) = &parts.final_ {
        let needle = norm(final_);
        if !rest.ends_with(&needle) {
            return false;
        }
    }
    true
}

/// Parses an RFC 4515 filter string, e.g. `(&(objectClass=person)(cn=A*))`.
pub fn parse(input: &str) -> crate::error::LdapResult<Filter> {
    let input = input.trim();
    let mut chars: std::iter::Peekable<std::str::Chars> = input.chars().peekable();
    let filter = parse_filter(&mut chars)?;
    if chars.next().is_some() {
        return Err(crate::error::LdapError::InvalidSearchFilterSyntax(
            "trailing characters after filter".into(),
        ));
    }
    Ok(filter)
}

fn parse_filter(chars: &mut std::iter::Peekable<std::str::Chars>) -> crate::error::LdapResult<Filter> {
    use crate::error::LdapError;
    expect(chars, '(')?;
    let filter = match chars.peek().copied() {
        Some('&') => {
            chars.next();
            Filter::And(parse_filter_list(chars)?)
        }
        Some('|') => {
            chars.next();
            Filter::Or(parse_filter_list(chars)?)
        }
        Some('!') => {
            chars.next();
            let inner = parse_filter(chars)?;
            Filter::Not(Box::new(inner))
        }
        _ => parse_item(chars)?,
    };
    expect(chars, ')')?;
    Ok(filter)
}

fn parse_filter_list(chars: &mut std::iter::Peekable<std::str::Chars>) -> crate::error::LdapResult<Vec<Filter>> {
    let mut list = Vec::new();
    while chars.peek() == Some(&'(') {
        list.push(parse_filter(chars)?);
    }
    Ok(list)
}

fn expect(chars: &mut std::iter::Peekable<std::str::Chars>, want: char) -> crate::error::LdapResult<()> {
    match chars.next() {
        Some(c) if c == want => Ok(()),
        other => Err(crate::error::LdapError::InvalidSearchFilterSyntax(format!(
            "expected {want:?}, found {other:?}"
        ))),
    }
}

fn parse_item(chars: &mut std::iter::Peekable<std::str::Chars>) -> crate::error::LdapResult<Filter> {
    let mut raw = String::new();
    while let Some(&c) = chars.peek() {
        if c == ')' {
            break;
        }
        raw.push(c);
        chars.next();
    }
    parse_simple(&raw)
}

fn parse_simple(raw: &str) -> crate::error::LdapResult<Filter> {
    use crate::error::LdapError;
    for (op, len) in [(">=", 2), ("<=", 2), ("~=", 2)] {
        if let Some(idx) = raw.find(op) {
            let attr = raw[..idx].to_string();
            let value = unescape_filter_value(&raw[idx + len..])?;
            return Ok(match op {
                ">=" => Filter::GreaterOrEqual { attr, value },
                "<=" => Filter::LessOrEqual { attr, value },
                _ => Filter::Approx { attr, value },
            });
        }
    }
    let idx = raw
        .find('=')
        .ok_or_else(|| LdapError::InvalidSearchFilterSyntax(format!("missing operator in {raw:?}")))?;
    let attr = raw[..idx].to_string();
    let rhs = &raw[idx + 1..];
    if rhs == "*" {
        return Ok(Filter::Present { attr });
    }
    if rhs.contains('*') {
        let segments: Vec<&str> = rhs.split('*').collect();
        let initial = if !segments[0].is_empty() {
            Some(unescape_filter_value(segments[0])?)
        } else {
            None
        };
        let final_ = if !segments[segments.len() - 1].is_empty() {
            Some(unescape_filter_value(segments[segments.len() - 1])?)
        } else {
            None
        };
        let mut any = Vec::new();
        for seg in &segments[1..segments.len() - 1] {
            if !seg.is_empty() {
                any.push(unescape_filter_value(seg)?);
            }
        }
        return Ok(Filter::Substrings {
            attr,
            parts: Substrings { initial, any, final_ },
        });
    }
    Ok(Filter::Equality {
        attr,
        value: unescape_filter_value(rhs)?,
    })
}

/// Unescapes RFC 4515 `\HH` sequences (e.g. `\2A` for a literal `*`).
fn unescape_filter_value(s: &str) -> crate::error::LdapResult<String> {
    use crate::error::LdapError;
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if i + 2 >= bytes.len() {
                return Err(LdapError::InvalidSearchFilterSyntax("dangling escape".into()));
            }
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .map_err(|_| LdapError::InvalidSearchFilterSyntax("invalid escape".into()))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| LdapError::InvalidSearchFilterSyntax("invalid hex escape".into()))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| LdapError::InvalidSearchFilterSyntax("non-utf8 value".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::schema::SchemaRegistry;

    fn entry_with(schema: &SchemaRef, oc: &str, attrs: &[(&str, &str)]) -> Entry {
        let mut e = Entry::new(Dn::root());
        e.add_value(schema, "objectClass", oc).unwrap();
        for (k, v) in attrs {
            e.add_value(schema, k, v).unwrap();
        }
        e
    }

    #[test]
    fn equality_and_and_or_not() {
        let schema = SchemaRegistry::bootstrap();
        let e = entry_with(&schema, "organizationalUnit", &[("ou", "system")]);
        let f = parse("(&(objectClass=organizationalUnit)(ou=system))").unwrap();
        assert!(f.matches(&e, &schema));
        let f2 = parse("(!(ou=other))").unwrap();
        assert!(f2.matches(&e, &schema));
    }

    #[test]
    fn substring_wildcard_matches_prefix() {
        let schema = SchemaRegistry::bootstrap();
        let e = entry_with(&schema, "organizationalUnit", &[("ou", "system")]);
        let f = parse("(objectClass=organ*)").unwrap();
        assert!(f.matches(&e, &schema));
    }

    #[test]
    fn unknown_attribute_is_undefined_not_error() {
        let schema = SchemaRegistry::bootstrap();
        let e = entry_with(&schema, "organizationalUnit", &[("ou", "system")]);
        let f = parse("(bogusAttr=foo)").unwrap();
        assert_eq!(f.evaluate(&e, &schema), Tristate::Undefined);
        assert!(!f.matches(&e, &schema));
    }

    #[test]
    fn escaped_asterisk_matches_literal_value() {
        let schema = SchemaRegistry::bootstrap();
        let e = entry_with(
            &schema,
            "organizationalUnit",
            &[("ou", "system"), ("description", "a*b")],
        );
        let f = parse("(description=*\\2A*)").unwrap();
        assert!(f.matches(&e, &schema));
        let other = entry_with(
            &schema,
            "organizationalUnit",
            &[("ou", "other"), ("description", "plain text")],
        );
        assert!(!f.matches(&other, &schema));
    }
}
