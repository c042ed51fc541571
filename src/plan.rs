//! Construction-plan compilation and emission.
//!
//! A [`MaterializePlan`] is compiled once per (schema, policy) pair and is
//! independent of any row source: resolving column positions happens per
//! distinct column list, and both artifacts are shareable read-only.

use std::sync::Arc;

use log::Level;
use once_cell::sync::OnceCell;

use crate::{
    error::PlanError,
    flatten::{flatten, FieldId, FlatSchema},
    interrupt::Interrupt,
    logging::rowplan_log,
    naming::NamingPolicy,
    resolve::{CandidateBuckets, ColumnIndexTable},
    schema::Schema,
};

/// Boolean expression over column-bound checks guarding a conditional scope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Guard {
    /// Single column-bound check: true when the field resolved to a column.
    Bound(FieldId),
    /// Conjunction; true when every branch is true.
    All(Vec<Guard>),
    /// Disjunction; true when any branch is true.
    Any(Vec<Guard>),
}

impl Guard {
    /// Conjunction over the branches, flattening nested conjunctions and
    /// collapsing a single branch to itself. `None` when empty.
    #[must_use]
    pub fn all(branches: Vec<Guard>) -> Option<Guard> {
        let mut acc = Vec::new();
        for branch in branches {
            match branch {
                Guard::All(mut nested) => acc.append(&mut nested),
                other => acc.push(other),
            }
        }
        match acc.len() {
            0 => None,
            1 => acc.pop(),
            _ => Some(Guard::All(acc)),
        }
    }

    /// Disjunction over the branches, flattening nested disjunctions and
    /// collapsing a single branch to itself. `None` when empty.
    #[must_use]
    pub fn any(branches: Vec<Guard>) -> Option<Guard> {
        let mut acc = Vec::new();
        for branch in branches {
            match branch {
                Guard::Any(mut nested) => acc.append(&mut nested),
                other => acc.push(other),
            }
        }
        match acc.len() {
            0 => None,
            1 => acc.pop(),
            _ => Some(Guard::Any(acc)),
        }
    }

    /// Evaluate against a resolution table.
    #[must_use]
    pub fn evaluate(&self, table: &ColumnIndexTable) -> bool {
        match self {
            Guard::Bound(field) => table.is_bound(*field),
            Guard::All(branches) => branches.iter().all(|branch| branch.evaluate(table)),
            Guard::Any(branches) => branches.iter().any(|branch| branch.evaluate(table)),
        }
    }
}

/// One ordered instruction of a construction plan.
#[derive(Clone, Debug, PartialEq)]
pub enum PlanStep {
    /// Open a conditional scope for a slice. The scope stays open until the
    /// matching close and nests every scope opened in between.
    OpenGuard {
        /// Guarded slice (arena position).
        slice: usize,
        /// Scope condition.
        guard: Guard,
    },
    /// Construct the slice's record, assigning its required primitives
    /// inline.
    Construct {
        /// Slice to construct (arena position).
        slice: usize,
    },
    /// Assign one optional primitive after construction, guarded by that
    /// field's own column-bound check.
    AssignOptional {
        /// Owning slice (arena position).
        slice: usize,
        /// Position in the global optional-primitive array.
        prim: usize,
    },
    /// Close the innermost `count` open scopes.
    Close {
        /// Number of scopes ending here.
        count: usize,
    },
}

/// A compiled construction plan for one schema under one naming policy.
#[derive(Debug)]
pub struct MaterializePlan {
    pub(crate) schema: Arc<Schema>,
    pub(crate) flat: FlatSchema,
    pub(crate) steps: Vec<PlanStep>,
    buckets: OnceCell<CandidateBuckets>,
}

impl MaterializePlan {
    /// Flatten `schema` under `policy` and emit its construction steps.
    pub fn compile(schema: &Arc<Schema>, policy: &NamingPolicy) -> Result<Self, PlanError> {
        Self::compile_with_interrupt(schema, policy, None)
    }

    /// As [`MaterializePlan::compile`], polling `interrupt` between tree
    /// nodes.
    pub fn compile_with_interrupt(
        schema: &Arc<Schema>,
        policy: &NamingPolicy,
        interrupt: Option<&Interrupt>,
    ) -> Result<Self, PlanError> {
        let flat = flatten(schema, policy, interrupt)?;
        let steps = emit(&flat);
        rowplan_log!(
            Level::Debug,
            "plan_compiled",
            "type={} slices={} fields={} steps={}",
            schema.type_name(),
            flat.slices().len(),
            flat.field_count(),
            steps.len(),
        );
        Ok(Self {
            schema: Arc::clone(schema),
            flat,
            steps,
            buckets: OnceCell::new(),
        })
    }

    /// The schema this plan was compiled from.
    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The flattened arrays backing the plan.
    #[must_use]
    pub fn flat(&self) -> &FlatSchema {
        &self.flat
    }

    /// Ordered construction steps, consumable by any downstream emitter.
    #[must_use]
    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    /// Resolve the plan's fields against an ordered column-name list.
    ///
    /// The candidate index is built lazily on first use and shared by every
    /// later resolution. The result only depends on `columns`, so it is safe
    /// to cache per distinct column list.
    pub fn resolve_columns<S: AsRef<str>>(&self, columns: &[S]) -> ColumnIndexTable {
        let buckets = self
            .buckets
            .get_or_init(|| CandidateBuckets::build(self.flat.field_candidates()));
        let table = buckets.resolve(columns);
        rowplan_log!(
            Level::Debug,
            "columns_resolved",
            "type={} columns={} bound={}",
            self.schema.type_name(),
            columns.len(),
            table.bound_count(),
        );
        table
    }

    /// Render a guard over declared field names, parenthesizing exactly
    /// where the combinator switches.
    #[must_use]
    pub fn render_guard(&self, guard: &Guard) -> String {
        render_guard(guard, &self.flat, true)
    }
}

/// Emit the ordered step list for a flattened schema.
///
/// Guard conditions are assembled bottom-up over the arena (children occupy
/// higher positions, so one reverse pass suffices); the forward pass then
/// walks slices in pre-order, opening scopes for optional-linked slices and
/// closing them when it passes their last descendant.
fn emit(flat: &FlatSchema) -> Vec<PlanStep> {
    let slices = flat.slices();
    let count = slices.len();
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for slice in slices.iter().skip(1) {
        let parent = slice.parent.expect("non-root slice has a parent");
        children[parent].push(slice.index);
    }

    let mut required_checks: Vec<Vec<FieldId>> = vec![Vec::new(); count];
    let mut presence: Vec<Option<Guard>> = vec![None; count];
    for index in (0..count).rev() {
        let slice = &slices[index];
        let mut checks: Vec<FieldId> = flat.required_prims()[slice.required_prims.range()]
            .iter()
            .map(|entry| entry.field)
            .collect();
        for &child in &children[index] {
            if slices[child].via_required_link() {
                checks.extend(required_checks[child].iter().copied());
            }
        }
        presence[index] = if checks.is_empty() {
            // No required member anywhere down the required-only closure:
            // the slice is present when any of its data is.
            let mut branches: Vec<Guard> = flat.optional_prims()[slice.optional_prims.range()]
                .iter()
                .map(|entry| Guard::Bound(entry.field))
                .collect();
            for &child in &children[index] {
                if let Some(guard) = presence[child].clone() {
                    branches.push(guard);
                }
            }
            Guard::any(branches)
        } else {
            Guard::all(checks.iter().copied().map(Guard::Bound).collect())
        };
        required_checks[index] = checks;
    }

    let mut steps = Vec::new();
    let mut open_scopes: Vec<usize> = Vec::new();
    let mut skip_until: Option<usize> = None;
    for index in 0..count {
        let slice = &slices[index];
        if skip_until.is_none() {
            if !slice.via_required_link() && slice.total_in_subtree() == 0 {
                // Degenerate optional subtree: nothing to guard or assign.
                skip_until = Some(slice.last_descendant);
            } else {
                if !slice.via_required_link() {
                    let guard = presence[index]
                        .clone()
                        .expect("non-degenerate optional slice has a presence guard");
                    steps.push(PlanStep::OpenGuard {
                        slice: index,
                        guard,
                    });
                    open_scopes.push(slice.last_descendant);
                }
                steps.push(PlanStep::Construct { slice: index });
                for prim in slice.optional_prims.range() {
                    steps.push(PlanStep::AssignOptional {
                        slice: index,
                        prim,
                    });
                }
            }
        }
        let mut closed = 0;
        while open_scopes.last() == Some(&index) {
            open_scopes.pop();
            closed += 1;
        }
        if closed > 0 {
            steps.push(PlanStep::Close { count: closed });
        }
        if skip_until.is_some_and(|limit| limit <= index) {
            skip_until = None;
        }
    }
    steps
}

fn render_guard(guard: &Guard, flat: &FlatSchema, top_level: bool) -> String {
    match guard {
        Guard::Bound(field) => flat.field_candidates()[field.index()].name.clone(),
        Guard::All(branches) => join_branches(branches, flat, " && ", top_level),
        Guard::Any(branches) => join_branches(branches, flat, " || ", top_level),
    }
}

fn join_branches(branches: &[Guard], flat: &FlatSchema, separator: &str, top_level: bool) -> String {
    let body = branches
        .iter()
        .map(|branch| render_guard(branch, flat, false))
        .collect::<Vec<_>>()
        .join(separator);
    if top_level {
        body
    } else {
        format!("({body})")
    }
}
