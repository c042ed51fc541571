use thiserror::Error;

use crate::schema::PrimitiveType;

/// Errors surfaced while flattening a schema or compiling a plan.
#[derive(Debug, Error)]
pub enum PlanError {
    /// A nested field's schema (transitively) contains its own occurrence.
    #[error("schema cycle through type `{type_name}`")]
    SchemaCycle {
        /// Type whose occurrence was re-entered on the current path.
        type_name: String,
    },
    /// An [`Interrupt`](crate::interrupt::Interrupt) handle tripped between
    /// tree nodes.
    #[error("plan construction interrupted")]
    Interrupted,
}

/// Errors surfaced at the row-source boundary.
#[derive(Debug, Error)]
pub enum ValueError {
    /// The column's data type cannot coerce into the requested primitive.
    #[error("column {column}: cannot coerce `{actual}` into {target:?}")]
    Incoercible {
        /// Zero-based column position.
        column: usize,
        /// The column's actual data type.
        actual: String,
        /// Requested target primitive.
        target: PrimitiveType,
    },
    /// Column position past the end of the row source.
    #[error("column index {column} out of bounds ({count} columns)")]
    ColumnOutOfBounds {
        /// Requested column position.
        column: usize,
        /// Number of columns in the source.
        count: usize,
    },
    /// Row position past the end of the row source.
    #[error("row index {row} out of bounds ({count} rows)")]
    RowOutOfBounds {
        /// Requested row position.
        row: usize,
        /// Number of rows in the source.
        count: usize,
    },
}

/// Errors surfaced while declaring a schema.
#[derive(Debug, Error)]
pub enum SchemaBuildError {
    /// Two fields with the same name were declared on one type.
    #[error("duplicate field `{name}` in type `{type_name}`")]
    DuplicateField {
        /// The repeated field name.
        name: String,
        /// Owning type.
        type_name: String,
    },
}
