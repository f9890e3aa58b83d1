//! SQL field types and literal values.
//!
//! These are the planner's view of MySQL-flavoured column types: a type code
//! plus a declared display length. No storage layout lives here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display length for types that carry none.
pub const UNSPECIFIED_LENGTH: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DataType {
    /// No type decided yet (type code 0).
    #[default]
    Unspecified,
    /// Type of a bare `NULL` literal.
    Null,
    TinyInt,
    Int,
    BigInt,
    Double,
    Decimal,
    Varchar,
    Text,
    Blob,
    Date,
    Datetime,
    Timestamp,
}

impl DataType {
    /// Parse a catalog type name. Unknown names fall back to `Varchar`.
    pub fn parse(s: &str) -> DataType {
        match s.to_ascii_lowercase().as_str() {
            "null" => DataType::Null,
            "tinyint" | "bool" | "boolean" => DataType::TinyInt,
            "int" | "integer" | "smallint" | "mediumint" => DataType::Int,
            "bigint" => DataType::BigInt,
            "double" | "float" | "real" => DataType::Double,
            "decimal" | "numeric" => DataType::Decimal,
            "text" => DataType::Text,
            "blob" | "binary" | "varbinary" => DataType::Blob,
            "date" => DataType::Date,
            "datetime" => DataType::Datetime,
            "timestamp" => DataType::Timestamp,
            _ => DataType::Varchar,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            DataType::TinyInt
                | DataType::Int
                | DataType::BigInt
                | DataType::Double
                | DataType::Decimal
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, DataType::Varchar | DataType::Text | DataType::Blob)
    }

    /// True when the slot has no concrete type yet and may adopt one.
    pub fn is_placeholder(self) -> bool {
        matches!(self, DataType::Unspecified | DataType::Null)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Unspecified => "unspecified",
            DataType::Null => "null",
            DataType::TinyInt => "tinyint",
            DataType::Int => "int",
            DataType::BigInt => "bigint",
            DataType::Double => "double",
            DataType::Decimal => "decimal",
            DataType::Varchar => "varchar",
            DataType::Text => "text",
            DataType::Blob => "blob",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
            DataType::Timestamp => "timestamp",
        };
        f.write_str(s)
    }
}

/// Declared type of a column or expression result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldType {
    pub tp: DataType,
    /// Declared display length, `UNSPECIFIED_LENGTH` when unknown.
    pub flen: i32,
}

impl FieldType {
    pub const fn new(tp: DataType, flen: i32) -> Self {
        Self { tp, flen }
    }

    pub const fn of(tp: DataType) -> Self {
        Self::new(tp, UNSPECIFIED_LENGTH)
    }

    /// Boolean-like results (comparisons, EXISTS) are `tinyint(1)`.
    pub const fn boolean() -> Self {
        Self::new(DataType::TinyInt, 1)
    }
}

impl Default for FieldType {
    fn default() -> Self {
        Self::of(DataType::Unspecified)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.flen == UNSPECIFIED_LENGTH {
            write!(f, "{}", self.tp)
        } else {
            write!(f, "{}({})", self.tp, self.flen)
        }
    }
}

/// Literal value carried by constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Null,
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
}

impl Datum {
    /// Type the literal would have as a result column.
    pub fn field_type(&self) -> FieldType {
        match self {
            Datum::Null => FieldType::new(DataType::Null, 0),
            Datum::Int(v) => FieldType::new(DataType::BigInt, v.to_string().len() as i32),
            Datum::Float(_) => FieldType::of(DataType::Double),
            Datum::Str(s) => FieldType::new(DataType::Varchar, s.chars().count() as i32),
            Datum::Bytes(b) => FieldType::new(DataType::Blob, b.len() as i32),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => f.write_str("NULL"),
            Datum::Int(v) => write!(f, "{v}"),
            Datum::Float(v) => write!(f, "{v}"),
            Datum::Str(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Datum::Bytes(b) => {
                f.write_str("x'")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                f.write_str("'")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_types() {
        assert_eq!(Datum::Null.field_type().tp, DataType::Null);
        assert_eq!(Datum::Str("abc".into()).field_type(), FieldType::new(DataType::Varchar, 3));
        assert_eq!(Datum::Int(-42).field_type(), FieldType::new(DataType::BigInt, 3));
        assert!(Datum::Null.field_type().tp.is_placeholder());
        assert!(!DataType::Varchar.is_placeholder());
    }

    #[test]
    fn parse_catalog_type_names() {
        assert_eq!(DataType::parse("BIGINT"), DataType::BigInt);
        assert_eq!(DataType::parse("bool"), DataType::TinyInt);
        assert_eq!(DataType::parse("something_else"), DataType::Varchar);
    }

    #[test]
    fn string_literals_are_escaped() {
        assert_eq!(Datum::Str("it's".into()).to_string(), "'it''s'");
        assert_eq!(Datum::Bytes(vec![0xab, 0x01]).to_string(), "x'ab01'");
    }
}
