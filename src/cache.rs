//! Per-schema plan cache and per-column-list resolution cache.
//!
//! Both caches only hand out `Arc`s of immutable results, so concurrent
//! readers may share entries freely; the locks cover map access only.

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::{Arc, Mutex},
};

use crate::{
    error::PlanError, naming::NamingPolicy, plan::MaterializePlan, resolve::ColumnIndexTable,
    schema::Schema,
};

/// Cache key: schema pointer identity plus policy bits.
#[derive(Clone, Debug)]
struct PlanKey {
    schema: Arc<Schema>,
    policy: NamingPolicy,
}

impl PartialEq for PlanKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema) && self.policy == other.policy
    }
}

impl Eq for PlanKey {}

impl Hash for PlanKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.schema) as usize).hash(state);
        self.policy.hash(state);
    }
}

/// Compiled-plan cache keyed by schema identity and policy.
///
/// The key holds the `Arc<Schema>`, which keeps the pointer identity stable
/// for as long as the entry lives.
#[derive(Debug, Default)]
pub struct PlanCache {
    plans: Mutex<HashMap<PlanKey, Arc<MaterializePlan>>>,
}

impl PlanCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the plan for (`schema`, `policy`), compiling on first use.
    pub fn get_or_compile(
        &self,
        schema: &Arc<Schema>,
        policy: &NamingPolicy,
    ) -> Result<Arc<MaterializePlan>, PlanError> {
        let key = PlanKey {
            schema: Arc::clone(schema),
            policy: *policy,
        };
        if let Some(plan) = self.plans.lock().expect("plan cache lock").get(&key) {
            return Ok(Arc::clone(plan));
        }
        // Compile outside the lock; a racing insert keeps the first entry.
        let plan = Arc::new(MaterializePlan::compile(schema, policy)?);
        let mut plans = self.plans.lock().expect("plan cache lock");
        Ok(Arc::clone(plans.entry(key).or_insert(plan)))
    }

    /// Number of cached plans.
    #[must_use]
    pub fn len(&self) -> usize {
        self.plans.lock().expect("plan cache lock").len()
    }

    /// True when no plan is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Column-table cache for one plan, keyed by the row source's ordered
/// column-name list. Recomputing a table is correct but wasteful; reuse the
/// cached entry for every row read from the same source shape.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    tables: Mutex<HashMap<Box<[String]>, Arc<ColumnIndexTable>>>,
}

impl ResolutionCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the table for `columns`, resolving through `plan` on first use.
    pub fn get_or_resolve(
        &self,
        plan: &MaterializePlan,
        columns: &[String],
    ) -> Arc<ColumnIndexTable> {
        if let Some(table) = self.tables.lock().expect("resolution cache lock").get(columns) {
            return Arc::clone(table);
        }
        let table = Arc::new(plan.resolve_columns(columns));
        let mut tables = self.tables.lock().expect("resolution cache lock");
        Arc::clone(
            tables
                .entry(columns.to_vec().into_boxed_slice())
                .or_insert(table),
        )
    }

    /// Number of cached tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.lock().expect("resolution cache lock").len()
    }

    /// True when no table is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
