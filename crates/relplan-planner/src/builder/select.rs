use relplan_core::error::{Error, Result};
use relplan_core::plan::{LockType, Plan};

use crate::ast::SelectStmt;
use crate::rewrite::AggMapper;

use super::aggregation::{has_aggregation, AggExtraction};
use super::{PlanBuilder, ProjectionOutput};

/// Re-key a field-position map to projection-schema positions.
fn to_schema_positions(map: &AggMapper, field_offsets: &[usize]) -> Result<AggMapper> {
    map.iter()
        .map(|(id, field)| {
            field_offsets
                .get(*field)
                .map(|pos| (*id, *pos))
                .ok_or_else(|| Error::ExtractionFailure(format!("no field at position {field}")))
        })
        .collect()
}

impl PlanBuilder<'_> {
    /// The SELECT pipeline: source, WHERE, lock, aggregation, projection,
    /// HAVING, DISTINCT, ORDER BY, LIMIT, then a trim back to the visible
    /// fields.
    pub fn build_select(&mut self, stmt: &SelectStmt) -> Result<Plan> {
        self.session.ensure_clean()?;
        // Extraction and deferred resolution edit the statement.
        let mut sel = stmt.clone();
        let has_agg = has_aggregation(&sel);

        let mut plan = match &sel.from {
            Some(from) => self.build_result_set_node(from)?,
            None => self.build_table_dual()?,
        };
        if let Some(cond) = &sel.where_clause {
            plan = self.build_selection(plan, cond, None)?;
        }
        if sel.lock != LockType::None {
            plan = self.build_select_lock(plan, sel.lock)?;
        }

        let mut extraction = AggExtraction::default();
        if has_agg {
            let (input, group_by, correlated) = self.rewrite_group_by(plan, &sel)?;
            extraction = self.extract_aggregates(&mut sel)?;
            plan = self.build_aggregation(input, &extraction.agg_funcs, group_by, correlated, &sel)?;
        }

        let mapper = has_agg.then_some(&extraction.total_map);
        let ProjectionOutput {
            plan,
            visible_len,
            field_offsets,
        } = self.build_projection(plan, &sel.fields, mapper)?;

        // Runs with aggregation too: HAVING and ORDER BY may name a GROUP BY
        // column the field list leaves out.
        let mut plan = if sel.having.is_some() || !sel.order_by.is_empty() {
            self.replace_deferred_columns(plan, sel.having.as_mut(), &mut sel.order_by)?
        } else {
            plan
        };

        if let Some(having) = &sel.having {
            let having_map = self.session.record(to_schema_positions(&extraction.having_map, &field_offsets))?;
            plan = self.build_selection(plan, having, Some(&having_map))?;
        }
        if sel.distinct {
            plan = self.build_distinct(plan)?;
        }
        if !sel.order_by.is_empty() {
            let order_map = self.session.record(to_schema_positions(&extraction.order_map, &field_offsets))?;
            plan = self.build_sort(plan, &sel.order_by, Some(&order_map))?;
        }
        if let Some(limit) = sel.limit {
            plan = self.build_limit(plan, limit)?;
        }

        let trimmed = visible_len != plan.schema.len();
        if trimmed {
            plan = self.build_trim(plan, visible_len)?;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(root = %plan.id, visible = visible_len, trimmed, has_agg, "select built");

        Ok(plan)
    }
}
