use relplan_core::error::Result;
use relplan_core::id::OperatorKind;
use relplan_core::plan::{Plan, PlanKind, ScanTable};
use relplan_core::schema::{Column, Schema};

use crate::ast::TableName;

use super::PlanBuilder;

impl PlanBuilder<'_> {
    /// Leaf over a base table: one column per catalog field, in catalog order.
    pub fn build_table_scan(&mut self, table: &TableName) -> Result<Plan> {
        self.step(|b| {
            let lookup = match (&b.config().default_database, table.db.is_empty()) {
                (Some(db), true) => TableName::in_db(db.clone(), table.name.clone()),
                _ => table.clone(),
            };
            let fields = b.catalog.result_fields(&lookup)?;
            let id = b.alloc_id(OperatorKind::TableScan);

            let db_name = fields
                .first()
                .map(|f| f.db_name.clone())
                .unwrap_or_else(|| lookup.db.clone());
            let columns = fields
                .iter()
                .map(|f| {
                    Column::new(id, f.column_name.clone(), f.field_type)
                        .with_table(f.db_name.clone(), f.table_name.clone())
                })
                .collect();
            let scan = ScanTable {
                db_name,
                table_name: lookup.name.clone(),
                alias: None,
                columns: fields.iter().map(|f| f.column_name.clone()).collect(),
                ref_access: false,
            };

            #[cfg(feature = "tracing")]
            tracing::trace!(%id, table = %lookup, columns = fields.len(), "table scan");

            Ok(Plan::leaf(id, PlanKind::TableScan(scan), Schema::new(columns)))
        })
    }

    /// Single-row, zero-column source for a SELECT without FROM.
    pub fn build_table_dual(&mut self) -> Result<Plan> {
        self.step(|b| {
            let id = b.alloc_id(OperatorKind::TableDual);
            Ok(Plan::leaf(id, PlanKind::TableDual, Schema::default()))
        })
    }
}
