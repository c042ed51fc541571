//! Tree-to-array schema flattening.
//!
//! One pass over the schema tree linearizes every (parent field, schema)
//! occurrence into a slice arena, appends each occurrence's primitive fields
//! to two global arrays, and folds aggregate counts upward on pop so later
//! stages can answer "is there anything under here" in O(1) without
//! re-walking the tree. The walk is iterative with an explicit stack; schema
//! depth is caller-controlled and must not bound the call stack.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::PlanError,
    interrupt::Interrupt,
    naming::{expand_candidates, Candidate, NamingPolicy},
    schema::{Field, FieldKind, PrimitiveType, Schema},
};

/// Identity of a primitive field across the whole schema tree.
///
/// A schema shared by several parents keeps one id per declared field, so
/// column resolution binds it once while every occurrence still flattens to
/// its own slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) u32);

impl FieldId {
    /// Position in the field registry and in resolution tables.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Contiguous range into one of the global primitive arrays.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrimRange {
    /// First entry.
    pub start: usize,
    /// Number of entries.
    pub count: usize,
}

impl PrimRange {
    /// The range as array indices.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }

    /// True when the range holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// The nested field on the parent through which a slice was reached.
#[derive(Clone, Debug)]
pub struct ParentLink {
    /// Field name on the parent schema.
    pub field_name: String,
    /// Whether that field is required.
    pub required: bool,
}

/// One flattened occurrence of a schema within the tree.
///
/// Slices are produced in pre-order (required-linked children before
/// optional-linked ones) and are immutable after flattening. All indices are
/// arena positions.
#[derive(Clone, Debug)]
pub struct Slice {
    /// Own arena position.
    pub index: usize,
    /// Parent arena position; `None` for the root.
    pub parent: Option<usize>,
    /// Link from the parent; `None` for the root.
    pub parent_link: Option<ParentLink>,
    /// True when every link from the root to this slice is required.
    pub on_required_path: bool,
    /// This occurrence's required primitives in the global required array.
    pub required_prims: PrimRange,
    /// This occurrence's optional primitives in the global optional array.
    pub optional_prims: PrimRange,
    /// First nested child, if any.
    pub first_child: Option<usize>,
    /// Direct children reached through a required link.
    pub direct_required_children: usize,
    /// Direct children reached through an optional link.
    pub direct_optional_children: usize,
    /// Required primitives in descendants reachable through required-only
    /// links.
    pub required_below: usize,
    /// All primitives in all descendants.
    pub total_below: usize,
    /// Last arena position of the required-only closure rooted here.
    pub last_required_descendant: usize,
    /// Last arena position of the whole subtree rooted here.
    pub last_descendant: usize,
    /// Declared type name of the occurrence's schema.
    pub type_name: String,
}

impl Slice {
    /// Whether the immediate link from the parent is required. The root
    /// counts as required.
    #[must_use]
    pub fn via_required_link(&self) -> bool {
        self.parent_link.as_ref().map_or(true, |link| link.required)
    }

    /// Required primitives in this slice plus its required-only closure.
    #[must_use]
    pub fn required_in_closure(&self) -> usize {
        self.required_prims.count + self.required_below
    }

    /// Primitives anywhere in this subtree, itself included.
    #[must_use]
    pub fn total_in_subtree(&self) -> usize {
        self.required_prims.count + self.optional_prims.count + self.total_below
    }
}

/// One primitive field occurrence appended to a global array.
#[derive(Clone, Debug)]
pub struct PrimitiveEntry {
    /// Field identity, shared across occurrences of a shared schema.
    pub field: FieldId,
    /// Owning slice.
    pub slice: usize,
    /// Declared field name.
    pub name: String,
    /// Target primitive type.
    pub ty: PrimitiveType,
}

/// Candidate spellings for one distinct field identity.
#[derive(Clone, Debug)]
pub struct FieldCandidates {
    /// Field identity.
    pub field: FieldId,
    /// Declared field name.
    pub name: String,
    /// Acceptable source-column spellings under the compile-time policy.
    pub candidates: Vec<Candidate>,
}

/// Flattened form of a schema tree: the slice arena, the two reachability
/// views over it, the two global primitive arrays, and the field registry.
#[derive(Debug, Default)]
pub struct FlatSchema {
    pub(crate) slices: Vec<Slice>,
    pub(crate) required_reached: Vec<usize>,
    pub(crate) optional_reached: Vec<usize>,
    pub(crate) required_prims: Vec<PrimitiveEntry>,
    pub(crate) optional_prims: Vec<PrimitiveEntry>,
    pub(crate) fields: Vec<FieldCandidates>,
}

impl FlatSchema {
    /// Slice arena in pre-order.
    #[must_use]
    pub fn slices(&self) -> &[Slice] {
        &self.slices
    }

    /// Arena positions of slices reached through required links only.
    #[must_use]
    pub fn required_reached(&self) -> &[usize] {
        &self.required_reached
    }

    /// Arena positions of slices reached through at least one optional link.
    #[must_use]
    pub fn optional_reached(&self) -> &[usize] {
        &self.optional_reached
    }

    /// Global required-primitive array.
    #[must_use]
    pub fn required_prims(&self) -> &[PrimitiveEntry] {
        &self.required_prims
    }

    /// Global optional-primitive array.
    #[must_use]
    pub fn optional_prims(&self) -> &[PrimitiveEntry] {
        &self.optional_prims
    }

    /// Field registry indexed by [`FieldId`].
    #[must_use]
    pub fn field_candidates(&self) -> &[FieldCandidates] {
        &self.fields
    }

    /// Number of distinct field identities.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

struct Frame {
    slice: usize,
    schema: Arc<Schema>,
    children: Vec<usize>,
    next_child: usize,
}

/// Flatten a schema tree under a naming policy.
///
/// `interrupt`, when supplied, is polled between tree nodes. Fails with
/// [`PlanError::SchemaCycle`] when a schema occurrence re-enters itself on
/// the current path.
pub fn flatten(
    root: &Arc<Schema>,
    policy: &NamingPolicy,
    interrupt: Option<&Interrupt>,
) -> Result<FlatSchema, PlanError> {
    let mut flat = FlatSchema::default();
    let mut ids: HashMap<(usize, usize), FieldId> = HashMap::new();
    let mut stack: Vec<Frame> = Vec::new();

    enter(
        &mut flat,
        &mut stack,
        &mut ids,
        policy,
        Arc::clone(root),
        None,
        None,
    );

    loop {
        let Some(frame) = stack.last_mut() else { break };
        if frame.next_child >= frame.children.len() {
            let done = frame.slice;
            stack.pop();
            fold_into_parent(&mut flat, &stack, done);
            continue;
        }
        let position = frame.children[frame.next_child];
        frame.next_child += 1;
        let parent_index = frame.slice;
        let parent_schema = Arc::clone(&frame.schema);

        if let Some(interrupt) = interrupt {
            interrupt.check()?;
        }

        let field = &parent_schema.fields()[position];
        let FieldKind::Nested(child_schema) = field.kind() else {
            continue;
        };
        if stack.iter().any(|f| Arc::ptr_eq(&f.schema, child_schema)) {
            return Err(PlanError::SchemaCycle {
                type_name: child_schema.type_name().to_string(),
            });
        }
        let link = ParentLink {
            field_name: field.name().to_string(),
            required: field.is_required(),
        };
        enter(
            &mut flat,
            &mut stack,
            &mut ids,
            policy,
            Arc::clone(child_schema),
            Some(parent_index),
            Some(link),
        );
    }

    Ok(flat)
}

fn enter(
    flat: &mut FlatSchema,
    stack: &mut Vec<Frame>,
    ids: &mut HashMap<(usize, usize), FieldId>,
    policy: &NamingPolicy,
    schema: Arc<Schema>,
    parent: Option<usize>,
    link: Option<ParentLink>,
) {
    let index = flat.slices.len();
    let link_required = link.as_ref().map_or(true, |l| l.required);
    let on_required_path = match parent {
        Some(p) => flat.slices[p].on_required_path && link_required,
        None => true,
    };

    if let Some(p) = parent {
        let parent_slice = &mut flat.slices[p];
        if parent_slice.first_child.is_none() {
            parent_slice.first_child = Some(index);
        }
        if link_required {
            parent_slice.direct_required_children += 1;
        } else {
            parent_slice.direct_optional_children += 1;
        }
    }

    let required_prims = append_prims(flat, ids, policy, &schema, index, true);
    let optional_prims = append_prims(flat, ids, policy, &schema, index, false);

    let mut children = Vec::new();
    for (position, field) in schema.fields().iter().enumerate() {
        if matches!(field.kind(), FieldKind::Nested(_)) && field.is_required() {
            children.push(position);
        }
    }
    for (position, field) in schema.fields().iter().enumerate() {
        if matches!(field.kind(), FieldKind::Nested(_)) && !field.is_required() {
            children.push(position);
        }
    }

    flat.slices.push(Slice {
        index,
        parent,
        parent_link: link,
        on_required_path,
        required_prims,
        optional_prims,
        first_child: None,
        direct_required_children: 0,
        direct_optional_children: 0,
        required_below: 0,
        total_below: 0,
        last_required_descendant: index,
        last_descendant: index,
        type_name: schema.type_name().to_string(),
    });
    if on_required_path {
        flat.required_reached.push(index);
    } else {
        flat.optional_reached.push(index);
    }
    stack.push(Frame {
        slice: index,
        schema,
        children,
        next_child: 0,
    });
}

fn append_prims(
    flat: &mut FlatSchema,
    ids: &mut HashMap<(usize, usize), FieldId>,
    policy: &NamingPolicy,
    schema: &Arc<Schema>,
    slice: usize,
    required: bool,
) -> PrimRange {
    let start = if required {
        flat.required_prims.len()
    } else {
        flat.optional_prims.len()
    };
    for (position, field) in schema.fields().iter().enumerate() {
        let FieldKind::Primitive(ty) = field.kind() else {
            continue;
        };
        if field.is_required() != required {
            continue;
        }
        let id = intern_field(flat, ids, policy, schema, position, field);
        let entry = PrimitiveEntry {
            field: id,
            slice,
            name: field.name().to_string(),
            ty: *ty,
        };
        if required {
            flat.required_prims.push(entry);
        } else {
            flat.optional_prims.push(entry);
        }
    }
    let end = if required {
        flat.required_prims.len()
    } else {
        flat.optional_prims.len()
    };
    PrimRange {
        start,
        count: end - start,
    }
}

fn intern_field(
    flat: &mut FlatSchema,
    ids: &mut HashMap<(usize, usize), FieldId>,
    policy: &NamingPolicy,
    schema: &Arc<Schema>,
    position: usize,
    field: &Field,
) -> FieldId {
    let key = (Arc::as_ptr(schema) as usize, position);
    if let Some(id) = ids.get(&key) {
        return *id;
    }
    let id = FieldId(flat.fields.len() as u32);
    flat.fields.push(FieldCandidates {
        field: id,
        name: field.name().to_string(),
        candidates: expand_candidates(field, policy),
    });
    ids.insert(key, id);
    id
}

/// Fold a finished slice's aggregates into its parent. The required-only
/// aggregate crosses only a required link; the any-data aggregate always
/// crosses one level.
fn fold_into_parent(flat: &mut FlatSchema, stack: &[Frame], child_index: usize) {
    let Some(parent_frame) = stack.last() else {
        return;
    };
    let parent_index = parent_frame.slice;
    let (req_own, opt_own, req_below, total_below, lrd, ld, link_required) = {
        let child = &flat.slices[child_index];
        (
            child.required_prims.count,
            child.optional_prims.count,
            child.required_below,
            child.total_below,
            child.last_required_descendant,
            child.last_descendant,
            child.via_required_link(),
        )
    };
    let parent = &mut flat.slices[parent_index];
    if link_required {
        parent.required_below += req_own + req_below;
        parent.last_required_descendant = parent.last_required_descendant.max(lrd);
    }
    parent.total_below += req_own + opt_own + total_below;
    parent.last_descendant = parent.last_descendant.max(ld);
}
