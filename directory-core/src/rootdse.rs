//! The root DSE: a synthetic, read-only entry at the empty DN
//! advertising naming contexts and server capabilities (RFC 4512 §5.1,
//! spec §4.1 NotAllowedOnRootDse edge case).

use crate::dn::Dn;
use crate::entry::Entry;
use crate::nexus::Nexus;
use crate::schema::SchemaRef;

pub const VENDOR_NAME: &str = "directoryd";
pub const VENDOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Builds the root DSE entry. Never validated against the schema: the
/// root DSE is exempt from objectClass/MUST-attribute rules by
/// definition (RFC 4512 §5.1).
pub fn build(nexus: &Nexus, schema: &SchemaRef) -> Entry {
    let mut entry = Entry::new(Dn::root());
    for context in nexus.naming_contexts() {
        let _ = entry.add_value(schema, "namingContexts", &context.to_string());
    }
    let _ = entry.add_value(schema, "supportedLDAPVersion", "3");
    let _ = entry.add_value(schema, "vendorName", VENDOR_NAME);
    let _ = entry.add_value(schema, "vendorVersion", VENDOR_VERSION);
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem_partition::MemPartition;
    use crate::schema::SchemaRegistry;
    use std::sync::Arc;

    #[test]
    fn advertises_registered_naming_contexts() {
        let schema = SchemaRegistry::bootstrap();
        let mut nexus = Nexus::new();
        let suffix = Dn::parse("ou=system", &schema).unwrap();
        nexus
            .register(Arc::new(MemPartition::new(suffix.clone(), schema.clone())))
            .unwrap();
        let dse = build(&nexus, &schema);
        let values = &dse.get("1.3.6.1.4.1.1466.101.120.5").unwrap().values;
        assert_eq!(values.len(), 1);
        assert_eq!(values[0].user, suffix.to_string());
    }
}
