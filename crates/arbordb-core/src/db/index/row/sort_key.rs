use crate::{
    db::index::key::{KeyEdge, encode_edge_field, encode_value_field},
    error::InternalError,
    model::{Collation, IndexId, IndexModel, Schema},
    value::Value,
};

///
/// SortKeyTarget
///
/// Serializes typed values into a key buffer being built for one index.
/// Collations are resolved per physical field when the target is created,
/// so appends never go back to the schema.
///

#[derive(Clone, Debug)]
pub(super) struct SortKeyTarget {
    index: IndexId,
    collations: Vec<Collation>,
    appended: usize,
}

impl SortKeyTarget {
    pub(super) fn for_index(schema: &Schema, index: &IndexModel) -> Result<Self, InternalError> {
        let spatial = index.spatial();
        let collations = (0..index.physical_field_count())
            .map(|physical| {
                let declared = spatial.map_or(physical, |s| s.declared_position(physical));
                let column = index.all_columns().get(declared).ok_or_else(|| {
                    InternalError::index_invariant(format!(
                        "index '{}' has no declared column for field {physical}",
                        index.name()
                    ))
                })?;

                schema.column_model(*column).map(|model| model.collation)
            })
            .collect::<Result<_, _>>()?;

        Ok(Self {
            index: index.id(),
            collations,
            appended: 0,
        })
    }

    pub(super) const fn index(&self) -> IndexId {
        self.index
    }

    /// Start a new key.
    pub(super) const fn attach(&mut self) {
        self.appended = 0;
    }

    pub(super) fn append(&mut self, out: &mut Vec<u8>, value: &Value) -> Result<(), InternalError> {
        let collation = *self.collations.get(self.appended).ok_or_else(|| {
            InternalError::index_invariant(format!(
                "{} already holds all {} fields",
                self.index,
                self.collations.len()
            ))
        })?;
        encode_value_field(out, value, collation);
        self.appended += 1;

        Ok(())
    }

    // Edges close a bound key, so they are not held to the field count.
    pub(super) fn append_edge(&mut self, out: &mut Vec<u8>, edge: KeyEdge) {
        encode_edge_field(out, edge);
        self.appended = self.appended.saturating_add(1);
    }
}
