//! FILENAME: tests/test_transitions.rs
//! Integration tests for column customization transitions.

mod common;

use column_engine::{
    build_column_custom_controls, build_column_runtime_items, create_column_custom_snapshot,
    transition, ColumnCustomSnapshot, DragPosition,
};
use common::{sample_columns, TestHarness};
use engine::{ColumnDefinition, FixedSide};
use serde_json::json;

// ============================================================================
// INITIAL STATE
// ============================================================================

#[test]
fn test_initial_state_from_declarations() {
    let harness = TestHarness::with_sample_columns();
    let current = &harness.session.current;

    assert_eq!(
        harness.current_order(),
        vec!["index", "orderNo", "customer", "amount", "status", "actions", "column-6"]
    );
    assert_eq!(current.fixed["index"], FixedSide::Left);
    assert_eq!(current.fixed["actions"], FixedSide::Right);
    assert!(current.sortable["orderNo"]);
    assert!(current.sortable["amount"]);
    assert!(current.filterable["amount"]);
    assert!(!current.visible["status"]);
    assert!(current.visible["column-6"]);
    assert!(!harness.session.panel_open);
    assert!(!harness.session.has_unsaved_changes());
}

#[test]
fn test_every_map_covers_every_column() {
    let harness = TestHarness::with_sample_columns();
    let current = &harness.session.current;
    for key in &current.order {
        assert!(current.visible.contains_key(key));
        assert!(current.fixed.contains_key(key));
        assert!(current.sortable.contains_key(key));
        assert!(current.filterable.contains_key(key));
    }
    assert_eq!(current.visible.len(), current.order.len());
}

#[test]
fn test_persisted_snapshot_seeds_session() {
    let persisted: ColumnCustomSnapshot = serde_json::from_value(json!({
        "order": ["amount", "customer", "removedColumn"],
        "visible": {"customer": false},
        "fixed": {"amount": "left"}
    }))
    .unwrap();
    let harness = TestHarness::with_persisted(&persisted);

    assert_eq!(
        harness.current_order(),
        vec!["amount", "customer", "index", "orderNo", "status", "actions", "column-6"]
    );
    assert!(!harness.session.current.visible["customer"]);
    assert_eq!(harness.session.current.fixed["amount"], FixedSide::Left);
    // Keys the persisted state does not mention keep their declarations
    assert_eq!(harness.session.current.fixed["actions"], FixedSide::Right);
}

// ============================================================================
// OPEN / CANCEL
// ============================================================================

#[test]
fn test_open_cancel_round_trip() {
    let mut harness = TestHarness::with_sample_columns();
    let before = harness.session.current.clone();

    harness.open();
    assert!(harness.session.panel_open);
    harness.session.toggle_visible("orderNo");
    harness.session.set_fixed("customer", FixedSide::Left);
    harness
        .session
        .move_column(&harness.columns, "amount", "index", DragPosition::Top);
    assert!(harness.session.has_unsaved_changes());

    harness.cancel();
    assert!(!harness.session.panel_open);
    assert_eq!(harness.session.draft, before);
    assert_eq!(harness.session.current, before);
    assert_eq!(harness.session.origin, before);
}

#[test]
fn test_draft_edits_never_alias_origin() {
    let mut harness = TestHarness::with_sample_columns();
    harness.open();
    harness.session.set_visible("amount", false);

    assert!(!harness.session.draft.visible["amount"]);
    assert!(harness.session.origin.visible["amount"]);
    assert!(harness.session.current.visible["amount"]);
}

#[test]
fn test_cancel_without_origin_uses_current() {
    let columns = sample_columns();
    let mut current = create_column_custom_snapshot(&columns, None, true);
    current.visible.insert("orderNo".into(), false);

    let t = transition::cancel(&columns, Some(&current), None);
    assert!(!t.draft.visible["orderNo"]);
    assert!(t.origin.is_none());
    assert!(t.current.is_none());
}

// ============================================================================
// CONFIRM / RESET
// ============================================================================

#[test]
fn test_confirm_then_open_seeds_from_current() {
    let mut harness = TestHarness::with_sample_columns();
    harness.open();
    harness.session.set_visible("status", true);
    harness.session.set_sortable("customer", true);
    harness
        .session
        .move_column(&harness.columns, "actions", "orderNo", DragPosition::Bottom);

    let committed = harness.confirm();
    assert!(!harness.session.has_unsaved_changes());
    assert_eq!(
        committed.order,
        vec!["index", "orderNo", "actions", "customer", "amount", "status", "column-6"]
    );

    harness.open();
    assert_eq!(harness.session.draft, committed);
    assert_eq!(harness.session.origin, committed);
}

#[test]
fn test_reset_restores_declarations() {
    let mut harness = TestHarness::with_sample_columns();
    let declared = harness.session.current.clone();

    harness.open();
    harness.session.set_fixed("index", FixedSide::None);
    harness.session.set_filterable("amount", false);
    harness.confirm();
    assert_ne!(harness.session.current, declared);

    let reset = harness.reset();
    assert_eq!(reset, declared);
    assert_eq!(harness.session.draft, declared);
    assert_eq!(harness.session.origin, declared);
}

#[test]
fn test_confirm_drops_keys_of_removed_columns() {
    let mut harness = TestHarness::with_sample_columns();
    harness.open();
    harness.session.set_visible("status", true);

    let mut columns = sample_columns();
    columns.retain(|c| c.key.as_deref() != Some("status"));
    columns.push(ColumnDefinition::new("createdAt").with_type("seq"));
    harness.replace_columns(columns);

    let committed = harness.confirm();
    assert!(!committed.visible.contains_key("status"));
    assert!(committed.visible["createdAt"]);
    assert_eq!(committed.order.len(), 7);
    assert!(committed.order.contains(&"createdAt".to_string()));
}

// ============================================================================
// CONTROLS & RUNTIME ITEMS
// ============================================================================

#[test]
fn test_controls_reflect_draft() {
    let mut harness = TestHarness::with_sample_columns();
    harness.open();
    harness.session.toggle_visible("status");

    let controls = build_column_custom_controls(&harness.columns, &harness.session.draft);
    assert_eq!(controls.len(), 7);
    let status = controls.iter().find(|c| c.key == "status").unwrap();
    assert!(status.checked);
    assert_eq!(controls[1].title, "Order No.");
    assert_eq!(controls[6].title, "Notes");
    assert!(controls[0].seq);
}

#[test]
fn test_runtime_items_follow_current() {
    let mut harness = TestHarness::with_sample_columns();
    harness.open();
    harness
        .session
        .move_column(&harness.columns, "column-6", "index", DragPosition::Top);
    harness.session.set_visible("customer", false);
    let current = harness.confirm();

    let items = build_column_runtime_items(&harness.columns, &current);
    assert_eq!(items[0].key.as_deref(), Some("column-6"));
    assert_eq!(items[0].title.as_deref(), Some("Notes"));
    let customer = items.iter().find(|c| c.key.as_deref() == Some("customer")).unwrap();
    assert_eq!(customer.visible, Some(false));

    // Runtime items round-trip through a snapshot
    assert_eq!(create_column_custom_snapshot(&items, None, true), current);
}

#[test]
fn test_snapshot_serializes_as_camel_case_json() {
    let harness = TestHarness::with_sample_columns();
    let json = serde_json::to_value(&harness.session.current).unwrap();

    assert_eq!(json["fixed"]["index"], json!("left"));
    assert_eq!(json["fixed"]["orderNo"], json!(""));
    assert_eq!(json["visible"]["status"], json!(false));
    let back: ColumnCustomSnapshot = serde_json::from_value(json).unwrap();
    assert_eq!(back, harness.session.current);
}
