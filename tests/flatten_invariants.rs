//! Structural invariants of flattening, emission, and resolution.

use rowplan::{
    flatten::FlatSchema, Field, FieldKind, MaterializePlan, NamingPolicy, PlanStep,
    PrimitiveType, Schema,
};

/// A tree mixing required/optional links and primitives at every level:
///
/// Root { a req, b opt, m req -> M, o opt -> O }
/// M    { c req, n opt -> N }
/// N    { d opt }
/// O    { e opt, p req -> P }
/// P    { f req, g opt }
fn mixed_tree() -> std::sync::Arc<Schema> {
    let n = Schema::builder("N")
        .optional("d", PrimitiveType::Utf8)
        .build()
        .expect("schema should build");
    let m = Schema::builder("M")
        .required("c", PrimitiveType::Int32)
        .optional_nested("n", &n)
        .build()
        .expect("schema should build");
    let p = Schema::builder("P")
        .required("f", PrimitiveType::Int32)
        .optional("g", PrimitiveType::Utf8)
        .build()
        .expect("schema should build");
    let o = Schema::builder("O")
        .optional("e", PrimitiveType::Utf8)
        .required_nested("p", &p)
        .build()
        .expect("schema should build");
    Schema::builder("Root")
        .required("a", PrimitiveType::Int32)
        .optional("b", PrimitiveType::Utf8)
        .required_nested("m", &m)
        .optional_nested("o", &o)
        .build()
        .expect("schema should build")
}

fn required_in_closure_brute(flat: &FlatSchema, index: usize) -> usize {
    let mut total = flat.slices()[index].required_prims.count;
    for slice in flat.slices() {
        if slice.parent == Some(index) && slice.via_required_link() {
            total += required_in_closure_brute(flat, slice.index);
        }
    }
    total
}

fn total_in_subtree_brute(flat: &FlatSchema, index: usize) -> usize {
    let own = &flat.slices()[index];
    let mut total = own.required_prims.count + own.optional_prims.count;
    for slice in flat.slices() {
        if slice.parent == Some(index) {
            total += total_in_subtree_brute(flat, slice.index);
        }
    }
    total
}

#[test]
fn preorder_linearization_is_a_valid_tree() {
    let plan = MaterializePlan::compile(&mixed_tree(), &NamingPolicy::default())
        .expect("plan should compile");
    let flat = plan.flat();

    assert_eq!(flat.slices().len(), 5);
    for slice in &flat.slices()[1..] {
        let parent = slice.parent.expect("non-root slice has a parent");
        assert!(parent < slice.index);
        assert!(slice.parent_link.is_some());
        assert!(slice.last_descendant >= slice.index);
        assert!(slice.last_required_descendant >= slice.index);
        assert!(slice.last_descendant <= flat.slices().len() - 1);
    }
    // Reachability views partition the arena.
    let mut seen: Vec<usize> = flat
        .required_reached()
        .iter()
        .chain(flat.optional_reached())
        .copied()
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, [0, 1, 2, 3, 4]);
}

#[test]
fn aggregate_counts_match_reconstruction() {
    let plan = MaterializePlan::compile(&mixed_tree(), &NamingPolicy::default())
        .expect("plan should compile");
    let flat = plan.flat();

    for slice in flat.slices() {
        assert_eq!(
            slice.required_in_closure(),
            required_in_closure_brute(flat, slice.index),
            "required closure mismatch at slice {}",
            slice.index
        );
        assert_eq!(
            slice.total_in_subtree(),
            total_in_subtree_brute(flat, slice.index),
            "subtree total mismatch at slice {}",
            slice.index
        );
    }

    // Spot values for the fixed tree.
    let root = &flat.slices()[0];
    assert_eq!(root.required_below, 1); // M's `c`, through the required link
    assert_eq!(root.total_below, 5); // c, d, e, f, g
    assert_eq!(root.last_required_descendant, 1);
    assert_eq!(root.last_descendant, 4);
}

#[test]
fn step_sequence_follows_the_linear_walk() {
    let plan = MaterializePlan::compile(&mixed_tree(), &NamingPolicy::default())
        .expect("plan should compile");

    let kinds: Vec<&'static str> = plan
        .steps()
        .iter()
        .map(|step| match step {
            PlanStep::OpenGuard { .. } => "open",
            PlanStep::Construct { .. } => "construct",
            PlanStep::AssignOptional { .. } => "assign",
            PlanStep::Close { .. } => "close",
        })
        .collect();
    assert_eq!(
        kinds,
        [
            "construct", "assign", // Root, b
            "construct", // M (required link, unguarded)
            "open", "construct", "assign", "close", // N
            "open", "construct", "assign", // O, e
            "construct", "assign", // P (required link inside O's scope), g
            "close", // O's scope ends at P
        ]
    );
}

#[test]
fn resolution_is_idempotent_through_the_public_surface() {
    let plan = MaterializePlan::compile(&mixed_tree(), &NamingPolicy::default())
        .expect("plan should compile");
    let columns = ["a", "b", "c", "d", "e", "f", "g"];
    assert_eq!(plan.resolve_columns(&columns), plan.resolve_columns(&columns));
}

#[test]
fn tie_break_winner_is_stable_under_column_reordering() {
    // Two distinct fields share the explicit spelling `val`; with one such
    // column present, the same field must win no matter where the column
    // sits in the list.
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
        .expect("schema should build");
    let plan =
        MaterializePlan::compile(&schema, &NamingPolicy::default()).expect("plan should compile");
    let first = plan.flat().field_candidates()[0].field;
    let second = plan.flat().field_candidates()[1].field;

    fastrand::seed(7);
    let mut columns = vec!["alpha", "beta", "gamma", "val", "delta"];
    for _ in 0..32 {
        fastrand::shuffle(&mut columns);
        let table = plan.resolve_columns(&columns);
        let expected = columns.iter().position(|&c| c == "val").expect("present");
        assert_eq!(table.get(first), Some(expected));
        assert_eq!(table.get(second), None);
    }
}

#[test]
fn empty_candidate_universe_resolves_everything_absent() {
    let schema = Schema::builder("Opaque")
        .required("payload", PrimitiveType::Binary)
        .build()
        .expect("schema should build");
    let plan = MaterializePlan::compile(&schema, &NamingPolicy::empty())
        .expect("plan should compile");

    let table = plan.resolve_columns(&["payload"]);
    assert_eq!(table.bound_count(), 0);
}
