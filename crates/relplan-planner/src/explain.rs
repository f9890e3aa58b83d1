//! Human- and machine-readable plan dumps.
//!
//! Text form, one operator per line, children indented two spaces:
//!
//! ```text
//! Trim_7 [a]
//!   Sort_6 by=[t.a desc] limit=0,10 [a, sel_agg_2*]
//!     Projection_5 exprs=[t.a, Aggregation_4_col_0] [a, sel_agg_2*]
//! ```
//!
//! Auxiliary output columns carry a trailing `*`.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Write as _};

use serde::Serialize;

use relplan_core::error::Result;
use relplan_core::expr::Expression;
use relplan_core::plan::{Plan, PlanKind};
use relplan_core::schema::Schema;

/// One operator's summary. Items are kept sorted so output is stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExplainEntry {
    pub name: String,
    pub items: BTreeMap<String, String>,
    pub columns: Vec<String>,
    pub children: Vec<ExplainEntry>,
}

impl ExplainEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: BTreeMap::new(),
            columns: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.items.insert(key.into(), value.to_string());
        self
    }

    /// Add `key=[v1, v2, ...]`, skipped when `values` is empty.
    pub fn with_values<T: Display>(self, key: impl Into<String>, values: &[T]) -> Self {
        if values.is_empty() {
            return self;
        }
        self.with_value(key, ListDisplay(values))
    }

    fn write_text(&self, out: &mut String, depth: usize) -> fmt::Result {
        write!(out, "{:indent$}{}", "", self.name, indent = depth * 2)?;
        for (k, v) in &self.items {
            write!(out, " {k}={v}")?;
        }
        writeln!(out, " [{}]", self.columns.join(", "))?;
        for child in &self.children {
            child.write_text(out, depth + 1)?;
        }
        Ok(())
    }
}

struct ListDisplay<'a, T>(&'a [T]);

impl<T: Display> Display for ListDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{v}")?;
        }
        f.write_str("]")
    }
}

fn column_names(schema: &Schema) -> Vec<String> {
    schema
        .iter()
        .map(|c| {
            if c.auxiliary {
                format!("{}*", c.col_name)
            } else {
                c.col_name.clone()
            }
        })
        .collect()
}

fn entry(plan: &Plan) -> ExplainEntry {
    let mut ent = ExplainEntry::new(plan.id.to_string());
    ent = match &plan.kind {
        PlanKind::TableScan(scan) => {
            let table = if scan.db_name.is_empty() {
                scan.table_name.clone()
            } else {
                format!("{}.{}", scan.db_name, scan.table_name)
            };
            let ent = ent.with_value("table", table);
            match &scan.alias {
                Some(alias) => ent.with_value("alias", alias),
                None => ent,
            }
        }
        PlanKind::Selection { conditions } => ent.with_values("cond", conditions),
        PlanKind::SelectLock { lock } => ent.with_value("lock", format!("{lock:?}")),
        PlanKind::Projection { exprs } => ent.with_values("exprs", exprs),
        PlanKind::Aggregation {
            agg_funcs,
            group_by,
        } => ent.with_values("funcs", agg_funcs).with_values("group", group_by),
        PlanKind::Join {
            join_type,
            eq_conditions,
            left_conditions,
            right_conditions,
            other_conditions,
        } => {
            let eq: Vec<Expression> = eq_conditions
                .iter()
                .cloned()
                .map(Expression::ScalarFunction)
                .collect();
            ent.with_value("type", format!("{join_type:?}"))
                .with_values("eq", &eq)
                .with_values("left", left_conditions)
                .with_values("right", right_conditions)
                .with_values("other", other_conditions)
        }
        PlanKind::Sort {
            by_items,
            exec_limit,
        } => {
            let ent = ent.with_values("by", by_items);
            match exec_limit {
                Some(l) => ent.with_value("limit", format!("{},{}", l.offset, l.count)),
                None => ent,
            }
        }
        PlanKind::Limit(l) => ent.with_value("limit", format!("{},{}", l.offset, l.count)),
        PlanKind::Apply { inner, .. } => {
            ent.children.push(entry(inner));
            ent
        }
        PlanKind::TableDual
        | PlanKind::Trim
        | PlanKind::Distinct
        | PlanKind::Union
        | PlanKind::Exists
        | PlanKind::MaxOneRow => ent,
    };
    ent.columns = column_names(&plan.schema);
    // Apply lists its inner plan first, then the outer input.
    ent.children.extend(plan.children.iter().map(entry));
    ent
}

/// Structured summary of the whole tree.
pub fn explain_entry(plan: &Plan) -> ExplainEntry {
    entry(plan)
}

/// Indented text rendering of the whole tree.
pub fn explain(plan: &Plan) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = entry(plan).write_text(&mut out, 0);
    out
}

/// JSON rendering of `explain_entry`.
pub fn explain_json(plan: &Plan) -> Result<String> {
    Ok(serde_json::to_string_pretty(&entry(plan))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use relplan_core::id::{OperatorKind, PlanId};
    use relplan_core::plan::ScanTable;
    use relplan_core::schema::Column;
    use relplan_core::types::{DataType, FieldType};

    fn scan() -> Plan {
        let id = PlanId::new(OperatorKind::TableScan, 1);
        let mut b = Column::new(id, "b", FieldType::of(DataType::Int));
        b.auxiliary = true;
        Plan::leaf(
            id,
            PlanKind::TableScan(ScanTable {
                db_name: "test".into(),
                table_name: "t".into(),
                alias: None,
                columns: vec!["a".into(), "b".into()],
                ref_access: false,
            }),
            Schema::new(vec![Column::new(id, "a", FieldType::of(DataType::Int)), b]),
        )
    }

    #[test]
    fn text_has_one_line_per_operator() {
        let child = scan();
        let schema = child.schema.truncated(1);
        let trim = Plan::with_children(PlanId::new(OperatorKind::Trim, 2), PlanKind::Trim, vec![child], schema);
        let text = explain(&trim);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, ["Trim_2 [a]", "  TableScan_1 table=test.t [a, b*]"]);
    }

    #[test]
    fn json_round_trips_through_serde_value() {
        let json = explain_json(&scan()).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["name"], "TableScan_1");
        assert_eq!(v["items"]["table"], "test.t");
    }
}
