//! Schema model: the immutable description of a target record shape.

use std::sync::Arc;

use crate::error::SchemaBuildError;

/// Closed set of primitive cell types a field can materialize into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit float.
    Float64,
    /// UTF-8 string.
    Utf8,
    /// Raw bytes.
    Binary,
}

/// What a field materializes: a primitive cell or a nested record.
#[derive(Clone, Debug)]
pub enum FieldKind {
    /// Single cell read from one resolved column.
    Primitive(PrimitiveType),
    /// Nested record built from the referenced schema's own columns.
    Nested(Arc<Schema>),
}

/// One declared field of a schema.
///
/// This is also the host-type-system input boundary: whatever introspects
/// the host's type declarations hands over `(name, required, kind)` plus any
/// explicit source-name overrides, and nothing else.
#[derive(Clone, Debug)]
pub struct Field {
    name: String,
    required: bool,
    kind: FieldKind,
    source_names: Vec<String>,
}

impl Field {
    /// Declare a field.
    pub fn new(name: impl Into<String>, required: bool, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            required,
            kind,
            source_names: Vec::new(),
        }
    }

    /// Attach explicit source-column spellings, deduplicated in order.
    #[must_use]
    pub fn with_source_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if !self.source_names.contains(&name) {
                self.source_names.push(name);
            }
        }
        self
    }

    /// Declared identifier.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the model guarantees this field is always populated.
    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Primitive or nested payload.
    #[must_use]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Explicit source-column spellings, empty unless overridden.
    #[must_use]
    pub fn source_names(&self) -> &[String] {
        &self.source_names
    }
}

/// Immutable description of a record type: ordered fields, required or
/// optional, primitive or nested.
///
/// Schemas are shared via `Arc`; the same schema may back several nested
/// fields. Identity (and plan-cache keying) is pointer identity, never
/// structural equality.
#[derive(Debug)]
pub struct Schema {
    type_name: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Start a builder for `type_name`.
    pub fn builder(type_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(type_name)
    }

    /// Declared type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared fields in order.
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// Builder for declaring schemas programmatically.
///
/// Field order is declaration order; duplicate names are rejected at
/// [`SchemaBuilder::build`].
#[derive(Debug)]
pub struct SchemaBuilder {
    type_name: String,
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Start a builder for `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a required primitive field.
    #[must_use]
    pub fn required(self, name: impl Into<String>, ty: PrimitiveType) -> Self {
        self.field(Field::new(name, true, FieldKind::Primitive(ty)))
    }

    /// Append an optional primitive field.
    #[must_use]
    pub fn optional(self, name: impl Into<String>, ty: PrimitiveType) -> Self {
        self.field(Field::new(name, false, FieldKind::Primitive(ty)))
    }

    /// Append a required nested field backed by `schema`.
    #[must_use]
    pub fn required_nested(self, name: impl Into<String>, schema: &Arc<Schema>) -> Self {
        self.field(Field::new(name, true, FieldKind::Nested(Arc::clone(schema))))
    }

    /// Append an optional nested field backed by `schema`.
    #[must_use]
    pub fn optional_nested(self, name: impl Into<String>, schema: &Arc<Schema>) -> Self {
        self.field(Field::new(name, false, FieldKind::Nested(Arc::clone(schema))))
    }

    /// Append a pre-built field (useful for source-name overrides).
    #[must_use]
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Finalise the builder into a shared schema.
    pub fn build(self) -> Result<Arc<Schema>, SchemaBuildError> {
        for (position, field) in self.fields.iter().enumerate() {
            if self.fields[..position].iter().any(|f| f.name == field.name) {
                return Err(SchemaBuildError::DuplicateField {
                    name: field.name.clone(),
                    type_name: self.type_name,
                });
            }
        }
        Ok(Arc::new(Schema {
            type_name: self.type_name,
            fields: self.fields,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldKind, PrimitiveType, Schema};
    use crate::error::SchemaBuildError;

    #[test]
    fn builder_keeps_declaration_order() {
        let schema = Schema::builder("User")
            .required("id", PrimitiveType::Int64)
            .optional("name", PrimitiveType::Utf8)
            .build()
            .expect("builder should succeed");

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["id", "name"]);
        assert!(schema.fields()[0].is_required());
        assert!(!schema.fields()[1].is_required());
    }

    #[test]
    fn duplicate_field_rejected() {
        let err = Schema::builder("User")
            .required("id", PrimitiveType::Int64)
            .optional("id", PrimitiveType::Utf8)
            .build()
            .expect_err("duplicate name must fail");
        assert!(matches!(
            err,
            SchemaBuildError::DuplicateField { ref name, .. } if name == "id"
        ));
    }

    #[test]
    fn nested_fields_share_the_schema() {
        let address = Schema::builder("Address")
            .optional("city", PrimitiveType::Utf8)
            .build()
            .expect("builder should succeed");
        let user = Schema::builder("User")
            .required("id", PrimitiveType::Int64)
            .optional_nested("home", &address)
            .optional_nested("work", &address)
            .build()
            .expect("builder should succeed");

        let nested: Vec<_> = user
            .fields()
            .iter()
            .filter_map(|f| match f.kind() {
                FieldKind::Nested(schema) => Some(schema),
                FieldKind::Primitive(_) => None,
            })
            .collect();
        assert_eq!(nested.len(), 2);
        assert!(std::sync::Arc::ptr_eq(nested[0], nested[1]));
    }
}
