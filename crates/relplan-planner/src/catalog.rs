//! Catalog collaborator: base table → declared result fields.
//!
//! The builder only needs the ordered column list of a table. `MemoryCatalog`
//! is a small YAML-loaded implementation for embedding and tests:
//!
//! ```yaml
//! default_database: shop
//! tables:
//!   - name: orders
//!     columns:
//!       - { name: id,     type: bigint }
//!       - { name: status, type: varchar, length: 16 }
//!   - database: audit
//!     name: events
//!     columns:
//!       - { name: ts, type: datetime }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use relplan_core::error::{Error, Result};
use relplan_core::types::{DataType, FieldType, UNSPECIFIED_LENGTH};

use crate::ast::TableName;

/// One declared column of a base table, as the catalog reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultField {
    pub db_name: String,
    pub table_name: String,
    pub column_name: String,
    pub field_type: FieldType,
}

pub trait Catalog {
    /// Declared columns of `table`, in table order.
    fn result_fields(&self, table: &TableName) -> Result<Vec<ResultField>>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDoc {
    #[serde(default)]
    pub default_database: Option<String>,
    pub tables: Vec<TableDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(default)]
    pub database: Option<String>,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub length: Option<i32>,
}

fn to_field(db: &str, table: &str, c: &ColumnDef) -> ResultField {
    ResultField {
        db_name: db.to_string(),
        table_name: table.to_string(),
        column_name: c.name.clone(),
        field_type: FieldType::new(
            DataType::parse(&c.data_type),
            c.length.unwrap_or(UNSPECIFIED_LENGTH),
        ),
    }
}

fn key(db: &str, table: &str) -> (String, String) {
    (db.to_ascii_lowercase(), table.to_ascii_lowercase())
}

/// In-memory catalog keyed by case-insensitive (database, table).
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    default_database: String,
    tables: HashMap<(String, String), Vec<ResultField>>,
}

impl MemoryCatalog {
    pub fn new(default_database: impl Into<String>) -> Self {
        Self {
            default_database: default_database.into(),
            tables: HashMap::new(),
        }
    }

    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn set_default_database(&mut self, db: impl Into<String>) {
        self.default_database = db.into();
    }

    /// Register (or replace) a table in the default database.
    pub fn add_table(&mut self, name: &str, columns: &[(&str, FieldType)]) {
        let db = self.default_database.clone();
        self.add_table_in(&db, name, columns);
    }

    pub fn add_table_in(&mut self, db: &str, name: &str, columns: &[(&str, FieldType)]) {
        let fields = columns
            .iter()
            .map(|(col, ft)| ResultField {
                db_name: db.to_string(),
                table_name: name.to_string(),
                column_name: col.to_string(),
                field_type: *ft,
            })
            .collect();
        self.tables.insert(key(db, name), fields);
    }

    /// Parse a YAML catalog document.
    pub fn from_yaml(yaml_src: &str) -> Result<Self> {
        let doc: CatalogDoc =
            serde_yaml::from_str(yaml_src).map_err(|e| Error::Catalog(e.to_string()))?;
        Ok(Self::from_doc(doc))
    }

    pub fn from_doc(doc: CatalogDoc) -> Self {
        let mut cat = Self::new(doc.default_database.unwrap_or_default());
        for table in doc.tables {
            let db = table
                .database
                .clone()
                .unwrap_or_else(|| cat.default_database.clone());
            let fields = table
                .columns
                .iter()
                .map(|c| to_field(&db, &table.name, c))
                .collect();
            cat.tables.insert(key(&db, &table.name), fields);
        }
        cat
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl Catalog for MemoryCatalog {
    fn result_fields(&self, table: &TableName) -> Result<Vec<ResultField>> {
        let db = if table.db.is_empty() {
            self.default_database.as_str()
        } else {
            table.db.as_str()
        };
        self.tables
            .get(&key(db, &table.name))
            .cloned()
            .ok_or_else(|| Error::Catalog(format!("Table '{}.{}' doesn't exist", db, table.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
default_database: shop
tables:
  - name: orders
    columns:
      - { name: id, type: bigint }
      - { name: status, type: varchar, length: 16 }
  - database: audit
    name: Events
    columns:
      - { name: ts, type: datetime }
"#;

    #[test]
    fn loads_yaml_in_declared_order() {
        let cat = MemoryCatalog::from_yaml(DOC).unwrap();
        assert_eq!(cat.len(), 2);
        let fields = cat.result_fields(&TableName::new("ORDERS")).unwrap();
        let names: Vec<_> = fields.iter().map(|f| f.column_name.as_str()).collect();
        assert_eq!(names, ["id", "status"]);
        assert_eq!(fields[1].field_type, FieldType::new(DataType::Varchar, 16));
        assert_eq!(fields[0].db_name, "shop");
    }

    #[test]
    fn qualified_lookup_and_missing_table() {
        let cat = MemoryCatalog::from_yaml(DOC).unwrap();
        assert!(cat.result_fields(&TableName::in_db("audit", "events")).is_ok());
        let err = cat.result_fields(&TableName::new("events")).unwrap_err();
        assert_eq!(err.kind(), "Catalog");
    }

    #[test]
    fn malformed_yaml_is_a_catalog_error() {
        let err = MemoryCatalog::from_yaml("tables: 7").unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
    }
}
