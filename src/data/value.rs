use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Represents the data type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    Null,
    Mixed, // For columns with mixed types
}

impl DataType {
    /// Infer type from a string value
    pub fn infer_from_string(value: &str) -> Self {
        if value.is_empty() || value.eq_ignore_ascii_case("null") {
            return DataType::Null;
        }

        if value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false") {
            return DataType::Boolean;
        }

        if value.parse::<i64>().is_ok() {
            return DataType::Integer;
        }

        if value.parse::<f64>().is_ok() {
            return DataType::Float;
        }

        if parse_datetime(value).is_some() {
            return DataType::DateTime;
        }

        DataType::String
    }

    /// Merge two types (for columns with mixed types)
    pub fn merge(&self, other: &DataType) -> DataType {
        if self == other {
            return *self;
        }

        match (self, other) {
            (DataType::Null, t) | (t, DataType::Null) => *t,
            (DataType::Integer, DataType::Float) | (DataType::Float, DataType::Integer) => {
                DataType::Float
            }
            _ => DataType::Mixed,
        }
    }
}

/// Parses the date/time shapes commonly found in CSV exports
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// A single value handed out by a table model for one cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Null,
}

impl CellValue {
    pub fn from_string(s: &str, data_type: DataType) -> Self {
        if s.is_empty() || s.eq_ignore_ascii_case("null") {
            return CellValue::Null;
        }

        match data_type {
            DataType::String => CellValue::Text(s.to_string()),
            DataType::Integer => s
                .parse::<i64>()
                .map(CellValue::Integer)
                .unwrap_or_else(|_| CellValue::Text(s.to_string())),
            DataType::Float => match Decimal::from_str(s) {
                // Keep exact decimals when the text is plain fixed point
                Ok(d) if !s.contains(['e', 'E']) => CellValue::Decimal(d),
                _ => s
                    .parse::<f64>()
                    .map(CellValue::Float)
                    .unwrap_or_else(|_| CellValue::Text(s.to_string())),
            },
            DataType::Boolean => {
                let lower = s.to_lowercase();
                CellValue::Boolean(lower == "true" || lower == "1" || lower == "yes")
            }
            DataType::DateTime => parse_datetime(s)
                .map(CellValue::DateTime)
                .unwrap_or_else(|| CellValue::Text(s.to_string())),
            DataType::Null => CellValue::Null,
            DataType::Mixed => Self::from_string(s, DataType::infer_from_string(s)),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            CellValue::Text(_) => DataType::String,
            CellValue::Integer(_) => DataType::Integer,
            CellValue::Float(_) | CellValue::Decimal(_) => DataType::Float,
            CellValue::Boolean(_) => DataType::Boolean,
            CellValue::DateTime(_) => DataType::DateTime,
            CellValue::Null => DataType::Null,
        }
    }

    /// Total ordering used by models that sort themselves; nulls sort first
    pub fn compare(&self, other: &CellValue) -> Ordering {
        match (self, other) {
            (CellValue::Integer(a), CellValue::Integer(b)) => a.cmp(b),
            (CellValue::Float(a), CellValue::Float(b)) => {
                a.partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Decimal(a), CellValue::Decimal(b)) => a.cmp(b),
            (CellValue::Integer(a), CellValue::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (CellValue::Float(a), CellValue::Integer(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (CellValue::Integer(a), CellValue::Decimal(b)) => Decimal::from(*a).cmp(b),
            (CellValue::Decimal(a), CellValue::Integer(b)) => a.cmp(&Decimal::from(*b)),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Boolean(a), CellValue::Boolean(b)) => a.cmp(b),
            (CellValue::DateTime(a), CellValue::DateTime(b)) => a.cmp(b),
            (CellValue::Null, CellValue::Null) => Ordering::Equal,
            (CellValue::Null, _) => Ordering::Less,
            (_, CellValue::Null) => Ordering::Greater,
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Decimal(d) => write!(f, "{}", d),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
            CellValue::Null => write!(f, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_types() {
        assert_eq!(DataType::infer_from_string("42"), DataType::Integer);
        assert_eq!(DataType::infer_from_string("4.5"), DataType::Float);
        assert_eq!(DataType::infer_from_string("TRUE"), DataType::Boolean);
        assert_eq!(DataType::infer_from_string("2024-01-31"), DataType::DateTime);
        assert_eq!(DataType::infer_from_string(""), DataType::Null);
        assert_eq!(DataType::infer_from_string("hello"), DataType::String);
    }

    #[test]
    fn test_merge_types() {
        assert_eq!(DataType::Integer.merge(&DataType::Float), DataType::Float);
        assert_eq!(DataType::Null.merge(&DataType::Boolean), DataType::Boolean);
        assert_eq!(DataType::String.merge(&DataType::Integer), DataType::Mixed);
    }

    #[test]
    fn test_from_string_keeps_exact_decimals() {
        match CellValue::from_string("1234.50", DataType::Float) {
            CellValue::Decimal(d) => assert_eq!(d.to_string(), "1234.50"),
            other => panic!("expected decimal, got {:?}", other),
        }
        assert!(matches!(
            CellValue::from_string("1e3", DataType::Float),
            CellValue::Float(_)
        ));
    }

    #[test]
    fn test_compare_nulls_first() {
        let a = CellValue::Null;
        let b = CellValue::Integer(1);
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&a), Ordering::Greater);
        assert_eq!(
            CellValue::Integer(2).compare(&CellValue::Float(1.5)),
            Ordering::Greater
        );
    }
}
