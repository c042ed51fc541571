//! Single-pass column resolution against expanded candidate spellings.

use std::{cmp::Ordering, collections::HashMap};

use crate::{
    flatten::{FieldCandidates, FieldId},
    naming::Candidate,
};

/// Field-to-column bindings for one ordered column-name list.
///
/// Positions are zero-based; `-1` marks a field with no matching column.
/// Rebuilding the table for the same column list is deterministic, so tables
/// are safe to cache and share once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnIndexTable {
    indices: Vec<i32>,
}

impl ColumnIndexTable {
    /// Resolved column position for a field, if any.
    #[must_use]
    pub fn get(&self, field: FieldId) -> Option<usize> {
        match self.indices.get(field.index()) {
            Some(&position) if position >= 0 => Some(position as usize),
            _ => None,
        }
    }

    /// True when the field resolved to a column.
    #[must_use]
    pub fn is_bound(&self, field: FieldId) -> bool {
        self.get(field).is_some()
    }

    /// Raw position with `-1` for absent.
    #[must_use]
    pub fn raw(&self, field: FieldId) -> i32 {
        self.indices.get(field.index()).copied().unwrap_or(-1)
    }

    /// Number of fields the table covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when the table covers no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of fields bound to a column.
    #[must_use]
    pub fn bound_count(&self) -> usize {
        self.indices.iter().filter(|&&position| position >= 0).count()
    }
}

#[derive(Debug)]
struct BucketEntry {
    candidate: Candidate,
    field: FieldId,
}

/// Length-keyed candidate index over a schema tree's whole candidate
/// universe, built once per compiled plan and reused for every resolution.
#[derive(Debug, Default)]
pub(crate) struct CandidateBuckets {
    buckets: HashMap<usize, Vec<BucketEntry>>,
    field_count: usize,
}

impl CandidateBuckets {
    /// Bucket all candidates by spelling length. Entries inside a bucket are
    /// ordered by ascii-case-insensitive spelling, then field identity; that
    /// order is the tie-break when several unbound fields match one column.
    pub(crate) fn build(fields: &[FieldCandidates]) -> Self {
        let mut buckets: HashMap<usize, Vec<BucketEntry>> = HashMap::new();
        for field in fields {
            for candidate in &field.candidates {
                buckets
                    .entry(candidate.text().len())
                    .or_default()
                    .push(BucketEntry {
                        candidate: candidate.clone(),
                        field: field.field,
                    });
            }
        }
        for entries in buckets.values_mut() {
            entries.sort_by(|a, b| {
                cmp_ascii_ci(a.candidate.text(), b.candidate.text())
                    .then_with(|| a.field.cmp(&b.field))
            });
        }
        Self {
            buckets,
            field_count: fields.len(),
        }
    }

    /// One pass over the columns. A column binds at most one still-unbound
    /// field (first match in bucket order); a field already bound keeps its
    /// earlier position even when a later column matches too. The pass never
    /// stops early, which also lets duplicate column names fall through to a
    /// later unbound field carrying the same spelling.
    pub(crate) fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> ColumnIndexTable {
        let mut indices = vec![-1i32; self.field_count];
        for (position, column) in columns.iter().enumerate() {
            let column = column.as_ref();
            let Some(bucket) = self.buckets.get(&column.len()) else {
                continue;
            };
            for entry in bucket {
                if indices[entry.field.index()] >= 0 {
                    continue;
                }
                if entry.candidate.matches(column) {
                    indices[entry.field.index()] = position as i32;
                    break;
                }
            }
        }
        ColumnIndexTable { indices }
    }
}

fn cmp_ascii_ci(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|byte| byte.to_ascii_lowercase())
        .cmp(b.bytes().map(|byte| byte.to_ascii_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::CandidateBuckets;
    use crate::{
        flatten::flatten,
        naming::{Convention, NamingPolicy},
        schema::{Field, FieldKind, PrimitiveType, Schema},
    };

    fn buckets_for(schema: &std::sync::Arc<Schema>, policy: &NamingPolicy) -> CandidateBuckets {
        let flat = flatten(schema, policy, None).expect("flatten should succeed");
        CandidateBuckets::build(flat.field_candidates())
    }

    #[test]
    fn case_insensitive_columns_resolve() {
        let schema = Schema::builder("User")
            .required("name", PrimitiveType::Utf8)
            .optional("age", PrimitiveType::Int32)
            .build()
            .expect("builder should succeed");
        let policy = NamingPolicy::new([Convention::Original, Convention::IgnoreCase]);
        let buckets = buckets_for(&schema, &policy);

        let table = buckets.resolve(&["Name", "AGE"]);
        assert_eq!(table.raw(crate::flatten::FieldId(0)), 0);
        assert_eq!(table.raw(crate::flatten::FieldId(1)), 1);
        assert_eq!(table.bound_count(), 2);
    }

    #[test]
    fn unmatched_fields_stay_absent() {
        let schema = Schema::builder("User")
            .required("name", PrimitiveType::Utf8)
            .optional("age", PrimitiveType::Int32)
            .build()
            .expect("builder should succeed");
        let buckets = buckets_for(&schema, &NamingPolicy::default());

        let table = buckets.resolve(&["name", "unrelated"]);
        assert_eq!(table.raw(crate::flatten::FieldId(0)), 0);
        assert_eq!(table.raw(crate::flatten::FieldId(1)), -1);
        assert!(!table.is_bound(crate::flatten::FieldId(1)));
    }

    #[test]
    fn first_writer_wins_across_duplicate_columns() {
        let schema = Schema::builder("User")
            .required("name", PrimitiveType::Utf8)
            .build()
            .expect("builder should succeed");
        let buckets = buckets_for(&schema, &NamingPolicy::default());

        // The second `name` column is ignored: the field keeps position 0.
        let table = buckets.resolve(&["name", "name"]);
        assert_eq!(table.raw(crate::flatten::FieldId(0)), 0);
    }

    #[test]
    fn tie_break_is_lexical_then_field_order() {
        // Two distinct fields sharing one explicit spelling; the field with
        // the lower identity wins the single matching column.
        let schema = Schema::builder("Pair")
            .field(
                Field::new("first", false, FieldKind::Primitive(PrimitiveType::Utf8))
                    .with_source_names(["val"]),
            )
            .field(
                Field::new("second", false, FieldKind::Primitive(PrimitiveType::Utf8))
                    .with_source_names(["val"]),
            )
            .build()
            .expect("builder should succeed");
        let buckets = buckets_for(&schema, &NamingPolicy::default());

        let table = buckets.resolve(&["pad", "val"]);
        assert_eq!(table.raw(crate::flatten::FieldId(0)), 1);
        assert_eq!(table.raw(crate::flatten::FieldId(1)), -1);

        // A second `val` column satisfies the remaining field.
        let table = buckets.resolve(&["val", "val"]);
        assert_eq!(table.raw(crate::flatten::FieldId(0)), 0);
        assert_eq!(table.raw(crate::flatten::FieldId(1)), 1);
    }

    #[test]
    fn resolution_is_idempotent() {
        let schema = Schema::builder("User")
            .required("UserId", PrimitiveType::Int64)
            .optional("DisplayName", PrimitiveType::Utf8)
            .build()
            .expect("builder should succeed");
        let policy = NamingPolicy::new([Convention::Snake, Convention::IgnoreCase]);
        let buckets = buckets_for(&schema, &policy);

        let columns = ["user_id", "displayname"];
        assert_eq!(buckets.resolve(&columns), buckets.resolve(&columns));
    }
}
