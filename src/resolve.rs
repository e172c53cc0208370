//! Merges inferred mappings, manual overrides and static fills into the final
//! mapping and the normalized table for one target schema.
//!
//! Precedence, lowest to highest: inference, manual mapping, static fill.
//! Manual and static entries apply in document order, so the later of two
//! entries writing the same target wins. Target columns outside the schema's
//! required set are kept.

use log::debug;

use crate::{
    data::{Column, Table},
    rules::{ColumnMapping, RuleEntries},
    schema::SchemaSpec,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub mapping: ColumnMapping,
    pub table: Table,
}

pub fn resolve(
    schema: &SchemaSpec,
    source: &Table,
    inferred: &ColumnMapping,
    manual: Option<&RuleEntries>,
    statics: Option<&RuleEntries>,
) -> Resolution {
    let mut table = apply_inferred(source, inferred);
    backfill_required(schema, &mut table);
    let mut mapping = inferred.clone();
    if let Some(manual) = manual {
        apply_manual(source, manual, &mut table, &mut mapping);
    }
    if let Some(statics) = statics {
        apply_static(statics, &mut table);
    }
    debug!(
        "{schema}: {} mapping entr(ies), {} output column(s)",
        mapping.len(),
        table.columns().len()
    );
    Resolution { mapping, table }
}

fn apply_inferred(source: &Table, inferred: &ColumnMapping) -> Table {
    let mut table = Table::empty(source.row_count());
    for column in source.columns() {
        match inferred.get(&column.name) {
            Some(target) if !target.is_empty() => table.upsert(column.renamed(target)),
            _ => {}
        }
    }
    table
}

fn backfill_required(schema: &SchemaSpec, table: &mut Table) {
    for name in schema.required {
        if !table.contains(name) {
            table.upsert(Column::filled(*name, "", table.row_count()));
        }
    }
}

fn apply_manual(
    source: &Table,
    manual: &RuleEntries,
    table: &mut Table,
    mapping: &mut ColumnMapping,
) {
    for (source_name, target) in manual {
        if target.is_empty() {
            continue;
        }
        let Some(column) = source.column(source_name) else {
            continue;
        };
        table.upsert(column.renamed(target));
        mapping.insert(source_name.clone(), target.clone());
    }
}

fn apply_static(statics: &RuleEntries, table: &mut Table) {
    let rows = table.row_count();
    for (target, value) in statics {
        table.upsert(Column::filled(target.as_str(), value, rows));
    }
}
