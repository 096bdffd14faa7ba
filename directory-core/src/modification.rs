//! The modify-operation change set (spec §3 Modification).

use crate::entry::Entry;
use crate::error::LdapResult;
use crate::schema::SchemaRef;

#[derive(Debug, Clone)]
pub enum ModificationOp {
    Add { values: Vec<String> },
    Delete { values: Vec<String> },
    Replace { values: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct Modification {
    pub attribute: String,
    pub op: ModificationOp,
}

impl Modification {
    pub fn add(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: ModificationOp::Add { values },
        }
    }

    pub fn delete(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: ModificationOp::Delete { values },
        }
    }

    pub fn replace(attribute: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            attribute: attribute.into(),
            op: ModificationOp::Replace { values },
        }
    }

    /// Applies this change to `entry` in place. Modifications within one
    /// request are applied in list order (spec §3 invariant); the schema
    /// check against the resulting entry is the caller's responsibility
    /// so interceptors can batch several modifications before validating.
    pub fn apply(&self, entry: &mut Entry, schema: &SchemaRef) -> LdapResult<()> {
        match &self.op {
            ModificationOp::Add { values } => {
                for v in values {
                    entry.add_value(schema, &self.attribute, v)?;
                }
                Ok(())
            }
            ModificationOp::Delete { values } => {
                if values.is_empty() {
                    entry.remove_value(schema, &self.attribute, None)
                } else {
                    for v in values {
                        entry.remove_value(schema, &self.attribute, Some(v))?;
                    }
                    Ok(())
                }
            }
            ModificationOp::Replace { values } => {
                if values.is_empty() {
                    let _ = entry.remove_value(schema, &self.attribute, None);
                    Ok(())
                } else {
                    entry.replace_values(schema, &self.attribute, values)
                }
            }
        }
    }
}

/// Applies a whole modify request, then validates the resulting entry
/// against the schema once (spec §4.1: per-operation, not per-step).
pub fn apply_all(entry: &mut Entry, schema: &SchemaRef, mods: &[Modification]) -> LdapResult<()> {
    for m in mods {
        m.apply(entry, schema)?;
    }
    entry.validate_against_schema(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::schema::SchemaRegistry;

    #[test]
    fn add_then_delete_then_replace() {
        let schema = SchemaRegistry::bootstrap();
        let mut e = Entry::new(Dn::root());
        e.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
        e.add_value(&schema, "ou", "people").unwrap();
        let mods = vec![
            Modification::add("description", vec!["first".into(), "second".into()]),
            Modification::delete("description", vec!["first".into()]),
            Modification::replace("ou", vec!["renamed".into()]),
        ];
        apply_all(&mut e, &schema, &mods).unwrap();
        assert_eq!(e.get("2.5.4.13").unwrap().values.len(), 1);
        assert_eq!(e.get("2.5.4.11").unwrap().values[0].user, "renamed");
    }

    #[test]
    fn delete_missing_value_is_error() {
        let schema = SchemaRegistry::bootstrap();
        let mut e = Entry::new(Dn::root());
        e.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
        e.add_value(&schema, "ou", "people").unwrap();
        let mods = vec![Modification::delete("description", vec!["nope".into()])];
        assert!(apply_all(&mut e, &schema, &mods).is_err());
    }
}
