//! Row-source boundary and the Arrow record-batch adapter.

use arrow::{
    array::{Array, AsArray, RecordBatch},
    datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type, SchemaRef},
};

use crate::{error::ValueError, schema::PrimitiveType, value::Value};

/// Position-addressable row data consumed at plan-use time.
///
/// Implementations expose column names in position order and cells coercible
/// to a requested primitive type or null; they never expose raw bytes or
/// connection state.
pub trait RowSource {
    /// Number of columns.
    fn column_count(&self) -> usize;

    /// Column name at `position`.
    fn column_name(&self, position: usize) -> &str;

    /// Number of rows.
    fn row_count(&self) -> usize;

    /// Cell at (`row`, `column`) coerced to `target`, or [`Value::Null`].
    fn value(&self, row: usize, column: usize, target: PrimitiveType)
        -> Result<Value, ValueError>;
}

/// Pass/fail coercion check between an Arrow column type and a target
/// primitive. Widening numeric reads are accepted; anything else fails.
#[must_use]
pub fn coercible(actual: &DataType, target: PrimitiveType) -> bool {
    matches!(
        (actual, target),
        (DataType::Boolean, PrimitiveType::Bool)
            | (DataType::Int32, PrimitiveType::Int32)
            | (DataType::Int32 | DataType::Int64, PrimitiveType::Int64)
            | (DataType::Float32 | DataType::Float64, PrimitiveType::Float64)
            | (DataType::Utf8 | DataType::LargeUtf8, PrimitiveType::Utf8)
            | (DataType::Binary | DataType::LargeBinary, PrimitiveType::Binary)
    )
}

/// [`RowSource`] adapter over an Arrow [`RecordBatch`].
pub struct RecordBatchSource<'a> {
    batch: &'a RecordBatch,
    schema: SchemaRef,
}

impl<'a> RecordBatchSource<'a> {
    /// Wrap a batch for plan consumption.
    pub fn new(batch: &'a RecordBatch) -> Self {
        let schema = batch.schema();
        Self { batch, schema }
    }

    /// Column names in position order, the resolution cache key.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.schema
            .fields()
            .iter()
            .map(|field| field.name().clone())
            .collect()
    }
}

impl RowSource for RecordBatchSource<'_> {
    fn column_count(&self) -> usize {
        self.batch.num_columns()
    }

    fn column_name(&self, position: usize) -> &str {
        self.schema.field(position).name()
    }

    fn row_count(&self) -> usize {
        self.batch.num_rows()
    }

    fn value(
        &self,
        row: usize,
        column: usize,
        target: PrimitiveType,
    ) -> Result<Value, ValueError> {
        if column >= self.batch.num_columns() {
            return Err(ValueError::ColumnOutOfBounds {
                column,
                count: self.batch.num_columns(),
            });
        }
        if row >= self.batch.num_rows() {
            return Err(ValueError::RowOutOfBounds {
                row,
                count: self.batch.num_rows(),
            });
        }
        let array = self.batch.column(column);
        if !coercible(array.data_type(), target) {
            return Err(ValueError::Incoercible {
                column,
                actual: array.data_type().to_string(),
                target,
            });
        }
        if array.is_null(row) {
            return Ok(Value::Null);
        }
        let value = match target {
            PrimitiveType::Bool => Value::Bool(array.as_boolean().value(row)),
            PrimitiveType::Int32 => Value::Int32(array.as_primitive::<Int32Type>().value(row)),
            PrimitiveType::Int64 => match array.data_type() {
                DataType::Int32 => {
                    Value::Int64(i64::from(array.as_primitive::<Int32Type>().value(row)))
                }
                _ => Value::Int64(array.as_primitive::<Int64Type>().value(row)),
            },
            PrimitiveType::Float64 => match array.data_type() {
                DataType::Float32 => {
                    Value::Float64(f64::from(array.as_primitive::<Float32Type>().value(row)))
                }
                _ => Value::Float64(array.as_primitive::<Float64Type>().value(row)),
            },
            PrimitiveType::Utf8 => match array.data_type() {
                DataType::LargeUtf8 => {
                    Value::Utf8(array.as_string::<i64>().value(row).to_string())
                }
                _ => Value::Utf8(array.as_string::<i32>().value(row).to_string()),
            },
            PrimitiveType::Binary => match array.data_type() {
                DataType::LargeBinary => {
                    Value::Binary(array.as_binary::<i64>().value(row).to_vec())
                }
                _ => Value::Binary(array.as_binary::<i32>().value(row).to_vec()),
            },
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{ArrayRef, Int32Array, RecordBatch, StringArray},
        datatypes::{DataType, Field, Schema as ArrowSchema},
    };

    use super::{coercible, RecordBatchSource, RowSource};
    use crate::{error::ValueError, schema::PrimitiveType, value::Value};

    fn batch() -> RecordBatch {
        let schema = Arc::new(ArrowSchema::new(vec![
            Field::new("id", DataType::Int32, false),
            Field::new("name", DataType::Utf8, true),
        ]));
        let id: ArrayRef = Arc::new(Int32Array::from(vec![Some(7), Some(8)]));
        let name: ArrayRef = Arc::new(StringArray::from(vec![Some("ada"), None]));
        RecordBatch::try_new(schema, vec![id, name]).expect("batch should build")
    }

    #[test]
    fn coercion_matrix() {
        assert!(coercible(&DataType::Int32, PrimitiveType::Int32));
        assert!(coercible(&DataType::Int32, PrimitiveType::Int64));
        assert!(coercible(&DataType::Float32, PrimitiveType::Float64));
        assert!(coercible(&DataType::LargeUtf8, PrimitiveType::Utf8));
        assert!(!coercible(&DataType::Int64, PrimitiveType::Int32));
        assert!(!coercible(&DataType::Utf8, PrimitiveType::Int64));
        assert!(!coercible(&DataType::Boolean, PrimitiveType::Utf8));
    }

    #[test]
    fn reads_cells_with_widening_and_nulls() {
        let batch = batch();
        let source = RecordBatchSource::new(&batch);

        assert_eq!(source.column_count(), 2);
        assert_eq!(source.row_count(), 2);
        assert_eq!(source.column_name(1), "name");
        assert_eq!(source.column_names(), ["id", "name"]);

        assert_eq!(
            source.value(0, 0, PrimitiveType::Int64).expect("cell"),
            Value::Int64(7)
        );
        assert_eq!(
            source.value(0, 1, PrimitiveType::Utf8).expect("cell"),
            Value::Utf8("ada".to_string())
        );
        assert_eq!(
            source.value(1, 1, PrimitiveType::Utf8).expect("cell"),
            Value::Null
        );
    }

    #[test]
    fn incoercible_and_out_of_bounds_cells_fail() {
        let batch = batch();
        let source = RecordBatchSource::new(&batch);

        assert!(matches!(
            source.value(0, 1, PrimitiveType::Int64),
            Err(ValueError::Incoercible { column: 1, .. })
        ));
        assert!(matches!(
            source.value(0, 5, PrimitiveType::Int64),
            Err(ValueError::ColumnOutOfBounds { .. })
        ));
        assert!(matches!(
            source.value(9, 0, PrimitiveType::Int32),
            Err(ValueError::RowOutOfBounds { .. })
        ));
    }
}
