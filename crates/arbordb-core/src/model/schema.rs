use crate::{
    MAX_HIERARCHY_DEPTH,
    error::InternalError,
    model::{
        ColumnId, ColumnModel, GroupIndex, HKeySegment, HKeyShape, IndexDef, IndexId, IndexKind,
        IndexModel, IndexToHKey, IndexToHKeyEntry, SpatialLayout, TableDef, TableId, TableIndex,
        TableModel,
    },
};
use std::collections::{BTreeMap, BTreeSet};

///
/// Schema
///
/// Immutable table hierarchy plus index definitions.
/// Shared read-only by every cursor and planner invocation.
///

#[derive(Clone, Debug, Default)]
pub struct Schema {
    tables: Vec<TableModel>,
    pub(crate) indexes: Vec<IndexModel>,
    tables_by_name: BTreeMap<String, TableId>,
    indexes_by_name: BTreeMap<String, IndexId>,
}

impl Schema {
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn table(&self, id: TableId) -> Result<&TableModel, InternalError> {
        self.tables
            .get(id.position())
            .ok_or_else(|| InternalError::schema_not_found("table", id))
    }

    pub fn index(&self, id: IndexId) -> Result<&IndexModel, InternalError> {
        self.indexes
            .get(id.position())
            .ok_or_else(|| InternalError::schema_not_found("index", id))
    }

    pub fn table_by_name(&self, name: &str) -> Result<&TableModel, InternalError> {
        let id = self
            .tables_by_name
            .get(name)
            .ok_or_else(|| InternalError::schema_not_found("table", name))?;
        self.table(*id)
    }

    pub fn index_by_name(&self, name: &str) -> Result<&IndexModel, InternalError> {
        let id = self
            .indexes_by_name
            .get(name)
            .ok_or_else(|| InternalError::schema_not_found("index", name))?;
        self.index(*id)
    }

    #[must_use]
    pub fn tables(&self) -> &[TableModel] {
        &self.tables
    }

    #[must_use]
    pub fn indexes(&self) -> &[IndexModel] {
        &self.indexes
    }

    /// Resolve a column of `table` by name.
    pub fn column(&self, table: TableId, name: &str) -> Result<ColumnId, InternalError> {
        let model = self.table(table)?;
        resolve_column(model, name)
    }

    pub fn column_model(&self, column: ColumnId) -> Result<&ColumnModel, InternalError> {
        self.table(column.table)?
            .columns
            .get(usize::from(column.position))
            .ok_or_else(|| InternalError::schema_not_found("column", column))
    }

    /// True when `table` sits strictly below `ancestor` in the hierarchy.
    #[must_use]
    pub fn is_descendant_of(&self, table: TableId, ancestor: TableId) -> bool {
        table != ancestor
            && self
                .table(table)
                .is_ok_and(|model| model.ancestors.contains(&ancestor))
    }

    #[must_use]
    pub fn is_ancestor_or_self(&self, ancestor: TableId, table: TableId) -> bool {
        ancestor == table || self.is_descendant_of(table, ancestor)
    }
}

///
/// SchemaBuilder
///
/// Incremental catalog loader. Parents must be added before children so
/// every derived hierarchy shape can be resolved on insertion.
///

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_table(&mut self, def: TableDef) -> Result<TableId, InternalError> {
        let schema = &self.schema;
        if schema.tables_by_name.contains_key(&def.name) {
            return Err(InternalError::schema_unsupported(format!(
                "duplicate table name '{}'",
                def.name
            )));
        }
        if let Some(other) = schema.tables.iter().find(|t| t.ordinal == def.ordinal) {
            return Err(InternalError::schema_unsupported(format!(
                "table '{}' reuses ordinal {} of table '{}'",
                def.name, def.ordinal, other.name
            )));
        }
        if def.primary_key.is_empty() {
            return Err(InternalError::schema_unsupported(format!(
                "table '{}' has no primary key",
                def.name
            )));
        }

        let id = TableId(u32::try_from(schema.tables.len()).map_err(|_| {
            InternalError::schema_unsupported("table count exceeds u32 range")
        })?);

        let mut model = TableModel {
            id,
            name: def.name,
            ordinal: def.ordinal,
            depth: 0,
            parent: None,
            columns: def.columns,
            primary_key: Vec::new(),
            parent_join: Vec::new(),
            ancestors: Vec::new(),
            hkey_columns: Vec::new(),
            hkey_shape: HKeyShape::default(),
        };
        model.primary_key = def
            .primary_key
            .iter()
            .map(|name| resolve_column(&model, name))
            .collect::<Result<_, _>>()?;

        match def.parent {
            Some((parent_id, join)) => {
                let parent = schema.table(parent_id)?;
                if join.len() != parent.primary_key.len() {
                    return Err(InternalError::schema_unsupported(format!(
                        "table '{}' joins {} columns to '{}' whose primary key has {}",
                        model.name,
                        join.len(),
                        parent.name,
                        parent.primary_key.len()
                    )));
                }
                if parent.depth + 1 >= MAX_HIERARCHY_DEPTH {
                    return Err(InternalError::schema_unsupported(format!(
                        "table '{}' exceeds max hierarchy depth {MAX_HIERARCHY_DEPTH}",
                        model.name
                    )));
                }

                model.parent_join = join
                    .iter()
                    .map(|name| resolve_column(&model, name))
                    .collect::<Result<_, _>>()?;
                model.parent = Some(parent_id);
                model.depth = parent.depth + 1;
                model.ancestors = parent.ancestors.clone();
                model.ancestors.push(id);

                // Segments above the parent are carried the same way the parent carries them.
                model.hkey_columns = parent.hkey_columns[..parent.depth].to_vec();
                model.hkey_columns.push(model.parent_join.clone());
                model.hkey_columns.push(model.primary_key.clone());

                let mut segments = parent.hkey_shape.segments().to_vec();
                segments.push(HKeySegment {
                    ordinal: model.ordinal,
                    width: model.primary_key.len(),
                });
                model.hkey_shape = HKeyShape::new(segments);
            }
            None => {
                model.ancestors = vec![id];
                model.hkey_columns = vec![model.primary_key.clone()];
                model.hkey_shape = HKeyShape::new(vec![HKeySegment {
                    ordinal: model.ordinal,
                    width: model.primary_key.len(),
                }]);
            }
        }

        self.schema.tables_by_name.insert(model.name.clone(), id);
        self.schema.tables.push(model);

        Ok(id)
    }

    pub fn add_index(&mut self, def: IndexDef) -> Result<IndexId, InternalError> {
        let schema = &self.schema;
        if schema.indexes_by_name.contains_key(&def.name) {
            return Err(InternalError::schema_unsupported(format!(
                "duplicate index name '{}'",
                def.name
            )));
        }
        if def.columns.is_empty() {
            return Err(InternalError::schema_unsupported(format!(
                "index '{}' declares no columns",
                def.name
            )));
        }

        let leaf = schema.table(def.leaf)?;
        let mut key_columns = Vec::with_capacity(def.columns.len());
        for (table, name) in &def.columns {
            let allowed = if def.group {
                leaf.ancestors.contains(table)
            } else {
                *table == leaf.id
            };
            if !allowed {
                return Err(InternalError::schema_unsupported(format!(
                    "index '{}' column '{name}' is outside the indexed branch",
                    def.name
                )));
            }
            key_columns.push(schema.column(*table, name)?);
        }

        if let Some(spatial) = def.spatial {
            validate_spatial(&def.name, spatial, key_columns.len())?;
        }

        let id = IndexId(u32::try_from(schema.indexes.len()).map_err(|_| {
            InternalError::schema_unsupported("index count exceeds u32 range")
        })?);

        let (all_columns, kind) = if def.group {
            // Group rows may be missing descendant rows, so every segment is
            // carried by the owning table's own primary key.
            let segment_columns = leaf
                .ancestors
                .iter()
                .map(|table| schema.table(*table).map(|t| t.primary_key.clone()))
                .collect::<Result<Vec<_>, _>>()?;
            let all_columns = append_hierarchy_columns(&key_columns, &segment_columns);

            let mut index_to_hkey_by_depth = Vec::with_capacity(leaf.ancestors.len());
            for depth in 0..leaf.ancestors.len() {
                index_to_hkey_by_depth.push(build_index_to_hkey(
                    schema,
                    &leaf.ancestors[..=depth],
                    &segment_columns[..=depth],
                    &all_columns,
                )?);
            }

            let root_most = key_columns
                .iter()
                .map(|column| column.table)
                .min_by_key(|table| schema.table(*table).map_or(usize::MAX, |t| t.depth))
                .unwrap_or(leaf.id);

            (
                all_columns,
                IndexKind::Group(GroupIndex {
                    root_most,
                    leaf_most: leaf.id,
                    index_to_hkey_by_depth,
                }),
            )
        } else {
            let all_columns = append_hierarchy_columns(&key_columns, &leaf.hkey_columns);
            let index_to_hkey =
                build_index_to_hkey(schema, &leaf.ancestors, &leaf.hkey_columns, &all_columns)?;

            (
                all_columns,
                IndexKind::Table(TableIndex {
                    table: leaf.id,
                    index_to_hkey,
                }),
            )
        };

        if let Some(spatial) = def.spatial {
            reject_hkey_inside_spatial(&def.name, spatial, &kind)?;
        }

        self.schema.indexes_by_name.insert(def.name.clone(), id);
        self.schema.indexes.push(IndexModel {
            id,
            name: def.name,
            key_columns,
            all_columns,
            kind,
            spatial: def.spatial,
        });

        Ok(id)
    }

    /// Borrow the schema built so far.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }

    #[must_use]
    pub fn build(self) -> Schema {
        self.schema
    }
}

fn resolve_column(table: &TableModel, name: &str) -> Result<ColumnId, InternalError> {
    let position = table
        .columns
        .iter()
        .position(|column| column.name == name)
        .ok_or_else(|| {
            InternalError::schema_not_found("column", format!("{}.{name}", table.name))
        })?;
    let position = u16::try_from(position)
        .map_err(|_| InternalError::schema_unsupported("column position exceeds u16 range"))?;

    Ok(ColumnId::new(table.id, position))
}

// Declared columns first, then hierarchy columns not already present.
fn append_hierarchy_columns(declared: &[ColumnId], segments: &[Vec<ColumnId>]) -> Vec<ColumnId> {
    let mut all_columns = declared.to_vec();
    let mut seen = declared.iter().copied().collect::<BTreeSet<_>>();

    for column in segments.iter().flatten() {
        if seen.insert(*column) {
            all_columns.push(*column);
        }
    }

    all_columns
}

fn build_index_to_hkey(
    schema: &Schema,
    chain: &[TableId],
    segments: &[Vec<ColumnId>],
    all_columns: &[ColumnId],
) -> Result<IndexToHKey, InternalError> {
    let mut entries = Vec::new();

    for (table, columns) in chain.iter().zip(segments) {
        entries.push(IndexToHKeyEntry::Ordinal(schema.table(*table)?.ordinal));

        for column in columns {
            let position = all_columns
                .iter()
                .position(|candidate| candidate == column)
                .ok_or_else(|| {
                    InternalError::schema_unsupported(format!(
                        "hkey column {column} is not carried by the index row"
                    ))
                })?;
            entries.push(IndexToHKeyEntry::IndexRowPosition(position));
        }
    }

    Ok(IndexToHKey::new(entries))
}

fn validate_spatial(
    name: &str,
    spatial: SpatialLayout,
    declared: usize,
) -> Result<(), InternalError> {
    if spatial.dimensions == 0 || spatial.first_argument + spatial.dimensions > declared {
        return Err(InternalError::schema_unsupported(format!(
            "index '{name}' spatial columns {}..{} exceed its {declared} declared columns",
            spatial.first_argument,
            spatial.first_argument + spatial.dimensions
        )));
    }

    Ok(())
}

// HKey values must never live inside the collapsed z-value columns.
fn reject_hkey_inside_spatial(
    name: &str,
    spatial: SpatialLayout,
    kind: &IndexKind,
) -> Result<(), InternalError> {
    let mappings: Vec<&IndexToHKey> = match kind {
        IndexKind::Table(index) => vec![&index.index_to_hkey],
        IndexKind::Group(index) => index.index_to_hkey_by_depth.iter().collect(),
    };
    let spatial_range = spatial.first_argument..spatial.first_argument + spatial.dimensions;

    for mapping in mappings {
        for entry in mapping.entries() {
            if let IndexToHKeyEntry::IndexRowPosition(position) = entry
                && spatial_range.contains(position)
            {
                return Err(InternalError::schema_unsupported(format!(
                    "index '{name}' maps hkey position {position} into its spatial columns"
                )));
            }
        }
    }

    Ok(())
}
