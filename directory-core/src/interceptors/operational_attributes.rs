use std::sync::Arc;

use chrono::Utc;

use crate::context::{OperationContext, OperationRequest};
use crate::csn::CsnGenerator;
use crate::dn::Dn;
use crate::entry::AttributeValue;
use crate::error::LdapResult;
use crate::interceptor::{Interceptor, Next, OperationResult};
use crate::schema::{AttributeUsage, SchemaRef, SyntaxKind};

fn generalized_time_now() -> String {
    Utc::now().format("%Y%m%d%H%M%SZ").to_string()
}

/// Stamps a DN-valued attribute with both the principal's user-typed
/// spelling and its normalized (OID-keyed) form, bypassing
/// [`crate::entry::Entry::add_value`]'s generic matching-rule
/// normalization since a DN's normalized form is `Dn::to_normalized_string`,
/// not a case-folded copy of the user string.
fn stamp_dn_attr(entry: &mut crate::entry::Entry, schema: &SchemaRef, name: &str, dn: &Dn) -> LdapResult<()> {
    let at = schema.lookup_attribute_type(name)?;
    let _ = entry.remove_value(schema, name, None);
    entry.add_value_raw(
        &at.oid,
        at.primary_name(),
        AttributeValue {
            user: dn.to_string(),
            normalized: dn.to_normalized_string().into_bytes(),
        },
    );
    Ok(())
}

fn stamp_text_attr(entry: &mut crate::entry::Entry, schema: &SchemaRef, name: &str, value: &str) -> LdapResult<()> {
    let _ = entry.remove_value(schema, name, None);
    entry.add_value(schema, name, value)
}

/// Stamps `creatorsName`/`createTimestamp` on add and
/// `modifiersName`/`modifyTimestamp` on modify, using the bound principal
/// and wall-clock time (spec §3 Entry operational attributes), and
/// projects DN-valued operational attributes on search results into
/// either their normalized or user-typed form depending on
/// `denormalize_op_attrs` (spec §8 scenario 8, §9 design note).
/// `entryCSN` is stamped separately by the partition at commit time
/// (spec §4.4), since only the partition knows the commit's final CSN.
pub struct OperationalAttributeInterceptor {
    schema: SchemaRef,
    #[allow(dead_code)]
    csn_gen: Arc<CsnGenerator>,
    denormalize_op_attrs: bool,
}

impl OperationalAttributeInterceptor {
    pub fn new(schema: SchemaRef, csn_gen: Arc<CsnGenerator>) -> Self {
        Self {
            schema,
            csn_gen,
            denormalize_op_attrs: true,
        }
    }

    pub fn with_denormalize_op_attrs(mut self, denormalize: bool) -> Self {
        self.denormalize_op_attrs = denormalize;
        self
    }

    /// Rewrites every DN-syntax directory-operation attribute's exposed
    /// value to the form selected by `denormalize_op_attrs`, without
    /// touching the entry's stored normalized comparison key.
    fn project(&self, entry: &crate::entry::Entry) -> crate::entry::Entry {
        project_dn_valued_attrs(&self.schema, self.denormalize_op_attrs, entry)
    }
}

/// Standalone form of [`OperationalAttributeInterceptor::project`], usable
/// from a 'static closure (e.g. wrapping a search cursor) that can't borrow
/// `&self` across the lifetime of the returned iterator.
fn project_dn_valued_attrs(schema: &SchemaRef, denormalize: bool, entry: &crate::entry::Entry) -> crate::entry::Entry {
    let mut projected = entry.clone();
    for attr in projected.attributes_mut() {
        let Ok(at) = schema.lookup_attribute_type(&attr.oid) else {
            continue;
        };
        if at.syntax != SyntaxKind::Dn || at.usage != AttributeUsage::DirectoryOperation {
            continue;
        }
        for value in &mut attr.values {
            value.user = if denormalize {
                value.user.clone()
            } else {
                String::from_utf8_lossy(&value.normalized).into_owned()
            };
        }
    }
    projected
}

impl Interceptor for OperationalAttributeInterceptor {
    fn name(&self) -> &'static str {
        "operationalAttribute"
    }

    fn invoke(&self, ctx: &mut OperationContext, next: Next<'_>) -> LdapResult<OperationResult> {
        let actor = ctx.principal.dn.clone();
        let now = generalized_time_now();
        match &mut ctx.request {
            OperationRequest::Add { entry } => {
                stamp_dn_attr(entry, &self.schema, "creatorsName", &actor)?;
                stamp_text_attr(entry, &self.schema, "createTimestamp", &now)?;
                stamp_dn_attr(entry, &self.schema, "modifiersName", &actor)?;
                stamp_text_attr(entry, &self.schema, "modifyTimestamp", &now)?;
            }
            OperationRequest::Modify { dn, changes } => {
                let _ = dn;
                changes.push(crate::modification::Modification::replace(
                    "modifiersName",
                    vec![actor.to_string()],
                ));
                changes.push(crate::modification::Modification::replace("modifyTimestamp", vec![now]));
            }
            _ => {}
        }
        let result = next.call(ctx)?;
        match result {
            OperationResult::Entries(entries) => Ok(OperationResult::Entries(
                entries.iter().map(|e| Arc::new(self.project(e))).collect(),
            )),
            OperationResult::Cursor(cursor) => {
                let schema = self.schema.clone();
                let denormalize = self.denormalize_op_attrs;
                let projected = cursor.map(move |item| item.map(|e| Arc::new(project_dn_valued_attrs(&schema, denormalize, &e))));
                Ok(OperationResult::Cursor(Box::new(projected)))
            }
            other => Ok(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::schema::SchemaRegistry;

    fn stamped_entry() -> (Entry, SchemaRef) {
        let schema = SchemaRegistry::bootstrap();
        let admin = Dn::parse("uid=admin,ou=system", &schema).unwrap();
        let mut entry = Entry::new(Dn::parse("ou=people,ou=system", &schema).unwrap());
        stamp_dn_attr(&mut entry, &schema, "creatorsName", &admin).unwrap();
        (entry, schema)
    }

    #[test]
    fn denormalized_creators_name_is_user_typed() {
        let (entry, schema) = stamped_entry();
        let interceptor = OperationalAttributeInterceptor::new(
            schema,
            Arc::new(CsnGenerator::new(1)),
        )
        .with_denormalize_op_attrs(true);
        let projected = interceptor.project(&entry);
        assert_eq!(
            projected.get("2.5.18.3").unwrap().values[0].user,
            "uid=admin,ou=system"
        );
    }

    #[test]
    fn normalized_creators_name_uses_oid_form() {
        let (entry, schema) = stamped_entry();
        let interceptor = OperationalAttributeInterceptor::new(
            schema,
            Arc::new(CsnGenerator::new(1)),
        )
        .with_denormalize_op_attrs(false);
        let projected = interceptor.project(&entry);
        assert_eq!(
            projected.get("2.5.18.3").unwrap().values[0].user,
            "0.9.2342.19200300.100.1.1=admin,2.5.4.11=system"
        );
    }
}
