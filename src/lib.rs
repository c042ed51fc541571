#![deny(missing_docs)]
//! Schema-to-plan compiler for materializing nested records from
//! row-oriented, name-addressable data.
//!
//! The pipeline flattens a possibly-nested [`Schema`] into a slice arena,
//! resolves each field to a column position once per distinct column list,
//! and emits a minimal-branching construction plan whose guards decide when
//! an optional sub-record is worth allocating. Plans are cacheable per
//! schema, resolution tables per column list, and a reference interpreter
//! executes plans against any [`RowSource`], Arrow record batches included.

pub(crate) mod logging;

/// Error taxonomy for plan construction and row access.
pub mod error;

/// Slice arena and the tree-to-array flattening pass.
pub mod flatten;

/// Cooperative interruption between tree nodes.
pub mod interrupt;

mod materialize;

/// Naming conventions and candidate-name expansion.
pub mod naming;

/// Guard expressions, plan steps, and plan compilation.
pub mod plan;

/// Column resolution tables.
pub mod resolve;

/// Immutable schema model and builder.
pub mod schema;

/// Row-source boundary and the Arrow adapter.
pub mod source;

/// Owned cell and record values.
pub mod value;

/// Plan and resolution caches.
pub mod cache;

pub use crate::{
    error::{PlanError, SchemaBuildError, ValueError},
    flatten::{FieldId, FlatSchema, Slice},
    interrupt::Interrupt,
    naming::{Convention, NamingPolicy},
    plan::{Guard, MaterializePlan, PlanStep},
    resolve::ColumnIndexTable,
    schema::{Field, FieldKind, PrimitiveType, Schema, SchemaBuilder},
    source::{RecordBatchSource, RowSource},
    value::{RecordValue, Value},
};
