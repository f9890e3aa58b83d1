use relplan_core::error::{Error, Result};
use relplan_core::plan::{Plan, PlanKind};

use crate::ast::{ResultSetNode, TableSource};

use super::PlanBuilder;

fn shape(node: &ResultSetNode) -> &'static str {
    match node {
        ResultSetNode::Join(_) => "join",
        ResultSetNode::TableSource(_) => "table source",
        ResultSetNode::TableName(_) => "table name",
        ResultSetNode::Select(_) => "select",
        ResultSetNode::Union(_) => "union",
    }
}

impl PlanBuilder<'_> {
    /// Resolve one FROM-tree node (or a bare sub-select) into a plan.
    pub fn build_result_set_node(&mut self, node: &ResultSetNode) -> Result<Plan> {
        self.session.ensure_clean()?;
        match node {
            ResultSetNode::Join(join) => self.build_join(join),
            ResultSetNode::TableSource(ts) => self.build_table_source(ts),
            ResultSetNode::Select(sel) => self.build_select(sel),
            ResultSetNode::Union(union) => self.build_union(union),
            ResultSetNode::TableName(name) => Err(self.fail(Error::UnsupportedConstruct(format!(
                "table name {name} outside a table source"
            )))),
        }
    }

    fn build_table_source(&mut self, ts: &TableSource) -> Result<Plan> {
        let mut plan = match &ts.source {
            ResultSetNode::Select(sel) => self.nested(|b| b.build_select(sel))?,
            ResultSetNode::Union(union) => self.nested(|b| b.build_union(union))?,
            ResultSetNode::TableName(name) => self.build_table_scan(name)?,
            other => {
                return Err(self.fail(Error::UnsupportedConstruct(format!(
                    "unsupported table source type: {}",
                    shape(other)
                ))))
            }
        };
        if let PlanKind::TableScan(scan) = &mut plan.kind {
            scan.alias = ts.alias.clone();
        }
        if let Some(alias) = ts.alias.as_deref().filter(|a| !a.is_empty()) {
            plan.schema.set_table_alias(alias);
        }
        Ok(plan)
    }
}
