//! The in-memory reference [`Partition`] implementation (spec §4.2,
//! §9 design note: a persistent backend is out of scope, but the trait
//! boundary is where one would plug in).

use crate::dn::Dn;
use crate::partition::Partition;
use crate::schema::SchemaRef;
use crate::txn::PartitionState;

#[derive(Debug)]
pub struct MemPartition {
    suffix: Dn,
    schema: SchemaRef,
    state: PartitionState,
}

impl MemPartition {
    pub fn new(suffix: Dn, schema: SchemaRef) -> Self {
        Self {
            suffix,
            schema,
            state: PartitionState::default(),
        }
    }
}

impl Partition for MemPartition {
    fn suffix(&self) -> &Dn {
        &self.suffix
    }

    fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    fn state(&self) -> &PartitionState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csn::CsnGenerator;
    use crate::entry::Entry;
    use crate::schema::SchemaRegistry;

    #[test]
    fn add_lookup_delete_round_trip() {
        let schema = SchemaRegistry::bootstrap();
        let suffix = Dn::parse("ou=system", &schema).unwrap();
        let part = MemPartition::new(suffix.clone(), schema.clone());
        let csn_gen = CsnGenerator::new(1);

        let mut txn = part.begin();
        let mut e = Entry::new(suffix.clone());
        e.add_value(&schema, "objectClass", "organizationalUnit").unwrap();
        e.add_value(&schema, "ou", "system").unwrap();
        part.add(&mut txn, e, csn_gen.next()).unwrap();
        part.commit(txn).unwrap();

        let txn = part.begin();
        let fetched = part.lookup(&txn, &suffix).expect("entry present");
        assert!(fetched.has_attribute("1.3.6.1.4.1.4203.666.1.7"));

        let mut txn = part.begin();
        part.delete(&mut txn, &suffix).unwrap();
        part.commit(txn).unwrap();
        let txn = part.begin();
        assert!(part.lookup(&txn, &suffix).is_none());
    }
}
