use crate::error::{ScanError, ScanResult};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Self-describing tagged value
/// Nested and variable-shaped columns (lists, key/value maps) materialize into
/// this type instead of fixed-width lanes; in schemaless mode a whole decoded
/// row folds into one `Map` document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int64(i64),
    Float64(f64),
    String(String),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

/// Stored column type, recorded in the segment footer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    Bool,
    Int64,
    Float64,
    String,
    List,
    Map,
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(pairs) => {
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.total_cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type tag of this value
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(ColumnType::Bool),
            Value::Int64(_) => Some(ColumnType::Int64),
            Value::Float64(_) => Some(ColumnType::Float64),
            Value::String(_) => Some(ColumnType::String),
            Value::List(_) => Some(ColumnType::List),
            Value::Map(_) => Some(ColumnType::Map),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            // Int64 and Float64 share a rank and compare numerically
            Value::Int64(_) | Value::Float64(_) => 2,
            Value::String(_) => 3,
            Value::List(_) => 4,
            Value::Map(_) => 5,
        }
    }

    /// Total order used by the merge heap and the filter evaluator
    /// Nulls sort first; floats order via OrderedFloat; numerics compare
    /// numerically across Int64/Float64; everything else orders by type rank
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
            (Value::Float64(a), Value::Float64(b)) => OrderedFloat(*a).cmp(&OrderedFloat(*b)),
            (Value::Int64(a), Value::Float64(b)) => {
                OrderedFloat(*a as f64).cmp(&OrderedFloat(*b))
            }
            (Value::Float64(a), Value::Int64(b)) => {
                OrderedFloat(*a).cmp(&OrderedFloat(*b as f64))
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.total_cmp(y) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            (Value::Map(a), Value::Map(b)) => {
                for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                    match ka.cmp(kb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                    match va.total_cmp(vb) {
                        Ordering::Equal => {}
                        other => return other,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    /// Map key lookup, `None` when absent
    pub fn map_get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Coerce a predicate constant to a column's comparable type
    /// Performed once per predicate at bind time, never per row group
    pub fn coerce_to(&self, target: ColumnType, column: &str) -> ScanResult<Value> {
        match (self, target) {
            (Value::Null, _) => Ok(Value::Null),
            (Value::Bool(v), ColumnType::Bool) => Ok(Value::Bool(*v)),
            (Value::Int64(v), ColumnType::Int64) => Ok(Value::Int64(*v)),
            (Value::Int64(v), ColumnType::Float64) => Ok(Value::Float64(*v as f64)),
            (Value::Float64(v), ColumnType::Float64) => Ok(Value::Float64(*v)),
            (Value::Float64(v), ColumnType::Int64) => {
                if v.fract() == 0.0 && *v >= i64::MIN as f64 && *v <= i64::MAX as f64 {
                    Ok(Value::Int64(*v as i64))
                } else {
                    Err(ScanError::coercion(
                        format!("float constant {} is not representable as Int64", v),
                        column,
                    ))
                }
            }
            (Value::String(v), ColumnType::String) => Ok(Value::String(v.clone())),
            _ => Err(ScanError::coercion(
                format!(
                    "constant {} cannot convert to column type {:?}",
                    self, target
                ),
                column,
            )),
        }
    }
}
