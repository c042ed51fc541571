//! Owned cell and record values crossing the row-source boundary.

/// Owned value produced at the row-source boundary and by the plan
/// interpreter.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent or null cell.
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    Utf8(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// Materialized nested record.
    Record(Box<RecordValue>),
}

impl Value {
    /// True for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Borrow the nested record, if this value is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

/// Materialized instance of a schema: the type name and the fields that
/// received data, in assignment order. Fields whose guard never passed are
/// absent rather than null.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordValue {
    /// Declared type name of the schema this record was built from.
    pub type_name: String,
    /// Assigned fields.
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub(crate) fn new(type_name: String) -> Self {
        Self {
            type_name,
            fields: Vec::new(),
        }
    }

    /// Value assigned to `name`, if the field received one.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// True when the field received a value.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{RecordValue, Value};

    #[test]
    fn record_lookup_by_name() {
        let mut record = RecordValue::new("User".to_string());
        record.fields.push(("id".to_string(), Value::from(7i64)));
        record.fields.push(("name".to_string(), Value::from("ada")));

        assert_eq!(record.get("id"), Some(&Value::Int64(7)));
        assert!(record.has("name"));
        assert!(!record.has("missing"));
    }

    #[test]
    fn null_detection() {
        assert!(Value::Null.is_null());
        assert!(!Value::Bool(false).is_null());
        assert!(Value::from("x").as_record().is_none());
    }
}
