//! Reference interpreter executing a compiled plan against a row source.

use crate::{
    error::ValueError,
    plan::{MaterializePlan, PlanStep},
    resolve::ColumnIndexTable,
    source::RowSource,
    value::{RecordValue, Value},
};

impl MaterializePlan {
    /// Materialize one row into a record value tree.
    ///
    /// Required primitives whose column is absent read as [`Value::Null`];
    /// surfacing that is the consumer's concern. Optional primitives and
    /// optional sub-records are only touched when their guards pass, so a
    /// field whose guard never passed is absent from the record rather than
    /// null.
    pub fn materialize(
        &self,
        table: &ColumnIndexTable,
        source: &dyn RowSource,
        row: usize,
    ) -> Result<Value, ValueError> {
        let flat = self.flat();
        let mut slots: Vec<Option<RecordValue>> = vec![None; flat.slices().len()];
        let mut depth = 0usize;
        let mut skip_from: Option<usize> = None;

        for step in self.steps() {
            match step {
                PlanStep::OpenGuard { guard, .. } => {
                    depth += 1;
                    if skip_from.is_none() && !guard.evaluate(table) {
                        skip_from = Some(depth);
                    }
                }
                PlanStep::Close { count } => {
                    depth -= count;
                    if skip_from.is_some_and(|from| depth < from) {
                        skip_from = None;
                    }
                }
                PlanStep::Construct { slice } => {
                    if skip_from.is_some() {
                        continue;
                    }
                    let slice = &flat.slices()[*slice];
                    let mut record = RecordValue::new(slice.type_name.clone());
                    for entry in &flat.required_prims()[slice.required_prims.range()] {
                        let value = match table.get(entry.field) {
                            Some(column) => source.value(row, column, entry.ty)?,
                            None => Value::Null,
                        };
                        record.fields.push((entry.name.clone(), value));
                    }
                    slots[slice.index] = Some(record);
                }
                PlanStep::AssignOptional { slice, prim } => {
                    if skip_from.is_some() {
                        continue;
                    }
                    let entry = &flat.optional_prims()[*prim];
                    let Some(column) = table.get(entry.field) else {
                        continue;
                    };
                    let value = source.value(row, column, entry.ty)?;
                    if let Some(record) = slots[*slice].as_mut() {
                        record.fields.push((entry.name.clone(), value));
                    }
                }
            }
        }

        // Children occupy higher arena positions than their parents, so one
        // reverse pass attaches every constructed record to its parent.
        for index in (1..slots.len()).rev() {
            let Some(child) = slots[index].take() else {
                continue;
            };
            let slice = &flat.slices()[index];
            let parent = slice.parent.expect("non-root slice has a parent");
            let link = slice
                .parent_link
                .as_ref()
                .expect("non-root slice has a parent link");
            if let Some(record) = slots[parent].as_mut() {
                record
                    .fields
                    .push((link.field_name.clone(), Value::Record(Box::new(child))));
            }
        }

        let root = slots[0].take().expect("the root slice is always constructed");
        Ok(Value::Record(Box::new(root)))
    }
}
