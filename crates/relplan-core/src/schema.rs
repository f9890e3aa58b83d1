//! Output columns and schemas. Pure data; no catalog dependency here.
//!
//! A schema is an ordered list of columns. Order matters: it is the result
//! column order and downstream operators read columns positionally.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::id::PlanId;
use crate::types::FieldType;

/// A possibly qualified column reference as written by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct ColumnName {
    /// Database qualifier, empty when absent.
    pub db: String,
    /// Table qualifier, empty when absent.
    pub table: String,
    pub name: String,
}

impl ColumnName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_bare(&self) -> bool {
        self.db.is_empty() && self.table.is_empty()
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.db.is_empty() {
            write!(f, "{}.", self.db)?;
        }
        if !self.table.is_empty() {
            write!(f, "{}.", self.table)?;
        }
        f.write_str(&self.name)
    }
}

/// One output column of an operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    /// Operator that produces this column.
    pub from_id: PlanId,
    pub db_name: String,
    pub tbl_name: String,
    pub col_name: String,
    pub ret_type: FieldType,
    /// Reads a column owned by an enclosing scope.
    pub correlated: bool,
    /// Bookkeeping column that must never reach the visible result.
    pub auxiliary: bool,
}

impl Column {
    pub fn new(from_id: PlanId, col_name: impl Into<String>, ret_type: FieldType) -> Self {
        Self {
            from_id,
            db_name: String::new(),
            tbl_name: String::new(),
            col_name: col_name.into(),
            ret_type,
            correlated: false,
            auxiliary: false,
        }
    }

    pub fn with_table(mut self, db_name: impl Into<String>, tbl_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self.tbl_name = tbl_name.into();
        self
    }

    /// Same producing operator and same name.
    pub fn same_source(&self, other: &Column) -> bool {
        self.from_id == other.from_id && self.col_name.eq_ignore_ascii_case(&other.col_name)
    }

    /// Whether this column answers to the (possibly qualified) name.
    pub fn matches(&self, name: &ColumnName) -> bool {
        (name.db.is_empty() || name.db.eq_ignore_ascii_case(&self.db_name))
            && (name.table.is_empty() || name.table.eq_ignore_ascii_case(&self.tbl_name))
            && name.name.eq_ignore_ascii_case(&self.col_name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.db_name.is_empty() {
            write!(f, "{}.", self.db_name)?;
        }
        if !self.tbl_name.is_empty() {
            write!(f, "{}.", self.tbl_name)?;
        }
        f.write_str(&self.col_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<Column>,
}

impl Schema {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Column> {
        self.columns.iter()
    }

    pub fn push(&mut self, col: Column) {
        self.columns.push(col);
    }

    /// Position of the column with the same producer and name.
    pub fn index_of(&self, col: &Column) -> Option<usize> {
        self.columns.iter().position(|c| c.same_source(col))
    }

    pub fn contains(&self, col: &Column) -> bool {
        self.index_of(col).is_some()
    }

    /// Resolve a user-written name. `Ok(None)` when nothing matches; an
    /// error when more than one column matches.
    pub fn find_column(&self, name: &ColumnName) -> Result<Option<&Column>> {
        let mut found: Option<&Column> = None;
        for col in &self.columns {
            if !col.matches(name) {
                continue;
            }
            if found.is_some() {
                return Err(Error::AmbiguousOrMissingColumn(format!(
                    "Column {name} is ambiguous"
                )));
            }
            found = Some(col);
        }
        Ok(found)
    }

    /// `self` followed by `other`, as an independent copy.
    pub fn concat(&self, other: &Schema) -> Schema {
        let mut columns = Vec::with_capacity(self.len() + other.len());
        columns.extend(self.columns.iter().cloned());
        columns.extend(other.columns.iter().cloned());
        Schema { columns }
    }

    /// Copy of the first `len` columns.
    pub fn truncated(&self, len: usize) -> Schema {
        Schema {
            columns: self.columns.iter().take(len).cloned().collect(),
        }
    }

    /// Rebind every column to a table alias and drop the database qualifier.
    pub fn set_table_alias(&mut self, alias: &str) {
        for col in &mut self.columns {
            col.tbl_name = alias.to_string();
            col.db_name.clear();
        }
    }

    /// Make `id` the producer of every column and drop the database qualifier.
    pub fn retag(&mut self, id: PlanId) {
        for col in &mut self.columns {
            col.from_id = id;
            col.db_name.clear();
        }
    }

    pub fn mark_auxiliary(&mut self) {
        for col in &mut self.columns {
            col.auxiliary = true;
        }
    }

    pub fn mark_correlated(&mut self) {
        for col in &mut self.columns {
            col.correlated = true;
        }
    }

    pub fn visible_len(&self) -> usize {
        self.columns.iter().filter(|c| !c.auxiliary).count()
    }
}

impl<'a> IntoIterator for &'a Schema {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}
