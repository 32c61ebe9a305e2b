//! FILENAME: tests/test_drag.rs
//! Integration tests for drag reordering, auto-scroll and FLIP reflow.

mod common;

use column_engine::{
    apply_drag_move, apply_drag_state, capture_flip_rects, compute_flip_offsets,
    resolve_auto_scroll_velocity, resolve_drag_hover, DragHoverState, DragPosition, DragState,
    FlipPhase, FlipPlayback,
};
use common::{sample_columns, TestHarness};

const ROW_HEIGHT: f64 = 32.0;

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

// ============================================================================
// ORDER MUTATION
// ============================================================================

#[test]
fn test_drag_forward_and_back() {
    let columns = sample_columns();
    let order = TestHarness::with_sample_columns().session.current.order.clone();

    let forward = apply_drag_move(&columns, &order, "orderNo", "status", DragPosition::Bottom);
    assert_eq!(
        forward,
        owned(&["index", "customer", "amount", "status", "orderNo", "actions", "column-6"])
    );

    let back = apply_drag_move(&columns, &forward, "orderNo", "customer", DragPosition::Top);
    assert_eq!(back, order);
}

#[test]
fn test_drag_result_is_always_a_permutation() {
    let columns = sample_columns();
    let mut order = TestHarness::with_sample_columns().session.current.order.clone();
    let keys = order.clone();

    for (i, drag) in keys.iter().enumerate() {
        let over = &keys[(i * 3 + 2) % keys.len()];
        let position = if i % 2 == 0 { DragPosition::Top } else { DragPosition::Bottom };
        order = apply_drag_move(&columns, &order, drag, over, position);

        let mut sorted = order.clone();
        sorted.sort();
        let mut expected = keys.clone();
        expected.sort();
        assert_eq!(sorted, expected);
    }
}

#[test]
fn test_drag_sequence_through_hover_states() {
    let mut harness = TestHarness::with_sample_columns();
    harness.open();

    // Pointer enters "amount" in its upper half, then drifts just past center
    let mut hover = DragHoverState::default();
    hover = resolve_drag_hover(&hover, "amount", 6.0, ROW_HEIGHT);
    assert_eq!(hover.position, Some(DragPosition::Top));
    hover = resolve_drag_hover(&hover, "amount", 18.0, ROW_HEIGHT);
    assert_eq!(hover.position, Some(DragPosition::Top));

    let drag = DragState {
        drag_key: Some("actions".into()),
        over_key: hover.over_key.clone(),
        position: hover.position,
    };
    let next = apply_drag_state(&harness.columns, &harness.session.draft.order, &drag);
    harness.session.draft.order = next;
    assert_eq!(
        harness.draft_order(),
        vec!["index", "orderNo", "customer", "actions", "amount", "status", "column-6"]
    );
    assert!(harness.session.has_unsaved_changes());
}

// ============================================================================
// AUTO-SCROLL
// ============================================================================

#[test]
fn test_auto_scroll_zones() {
    // 100px container at y=200: zone = clamp(24, 20, 48) = 24
    assert_eq!(resolve_auto_scroll_velocity(250.0, 200.0, 100.0), 0.0);
    assert!(resolve_auto_scroll_velocity(205.0, 200.0, 100.0) < 0.0);
    assert!(resolve_auto_scroll_velocity(295.0, 200.0, 100.0) > 0.0);

    let slow = resolve_auto_scroll_velocity(290.0, 200.0, 100.0);
    let fast = resolve_auto_scroll_velocity(340.0, 200.0, 100.0);
    assert_eq!(slow, 4.0);
    assert!(fast >= slow);
}

// ============================================================================
// FLIP
// ============================================================================

#[test]
fn test_flip_after_reorder() {
    let columns = sample_columns();
    let order = TestHarness::with_sample_columns().session.current.order.clone();
    let tops = |order: &[String]| {
        capture_flip_rects(
            order
                .iter()
                .enumerate()
                .map(|(i, key)| (key.clone(), i as f64 * ROW_HEIGHT)),
        )
    };

    let before = tops(&order);
    let next = apply_drag_move(&columns, &order, "index", "amount", DragPosition::Bottom);
    let after = tops(&next);

    let offsets = compute_flip_offsets(&before, &after, Some("index"));
    let keys: Vec<&str> = offsets.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["amount", "customer", "orderNo"]);
    assert!(offsets.iter().all(|o| o.delta_y == ROW_HEIGHT));

    let mut playback = FlipPlayback::new();
    playback.invert(offsets);
    assert_eq!(playback.transform_for("customer"), Some(ROW_HEIGHT));
    assert_eq!(playback.next_frame().len(), 3);
    assert_eq!(playback.phase(), FlipPhase::Playing);
    playback.finish();
    assert_eq!(playback.phase(), FlipPhase::Idle);
}
