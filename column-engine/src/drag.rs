//! FILENAME: column-engine/src/drag.rs
//! Drag Reorder - Position inference, order mutation and auto-scroll.
//!
//! The panel lists columns as rows. While a row is dragged over another, the
//! pointer's vertical offset inside the target row decides whether the drop
//! lands above (`Top`) or below (`Bottom`) it. A dead zone around the row's
//! center keeps the previous decision so the indicator does not flicker.

use crate::snapshot::normalize_order;
use engine::ColumnDefinition;
use serde::{Deserialize, Serialize};

/// Dead zone half-height as a fraction of the row height.
pub const DEAD_ZONE_RATIO: f64 = 0.16;
pub const DEAD_ZONE_MIN: f64 = 3.0;
pub const DEAD_ZONE_MAX: f64 = 10.0;

/// Auto-scroll activation zone as a fraction of the container height.
pub const SCROLL_ZONE_RATIO: f64 = 0.24;
pub const SCROLL_ZONE_MIN: f64 = 20.0;
pub const SCROLL_ZONE_MAX: f64 = 48.0;
pub const SCROLL_STEP_MIN: f64 = 4.0;
pub const SCROLL_STEP_DIVISOR: f64 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPosition {
    Top,
    Bottom,
}

/// The drag in progress. Reset to default when the drag ends.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragState {
    pub drag_key: Option<String>,
    pub over_key: Option<String>,
    pub position: Option<DragPosition>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragHoverState {
    pub over_key: Option<String>,
    pub position: Option<DragPosition>,
}

pub fn dead_zone(row_height: f64) -> f64 {
    (row_height * DEAD_ZONE_RATIO).clamp(DEAD_ZONE_MIN, DEAD_ZONE_MAX)
}

/// Top or bottom half of the target row, with hysteresis around the center.
pub fn resolve_drag_position(offset_y: f64, row_height: f64, previous: Option<DragPosition>) -> DragPosition {
    if !offset_y.is_finite() || !row_height.is_finite() {
        return previous.unwrap_or(DragPosition::Bottom);
    }
    let center = row_height / 2.0;
    if (offset_y - center).abs() <= dead_zone(row_height) {
        if let Some(previous) = previous {
            return previous;
        }
    }
    if offset_y >= center {
        DragPosition::Bottom
    } else {
        DragPosition::Top
    }
}

/// Hover update for `over_key`. The previous decision only carries over when
/// the pointer is still over the same row.
pub fn resolve_drag_hover(previous: &DragHoverState, over_key: &str, offset_y: f64, row_height: f64) -> DragHoverState {
    let carried = match previous.over_key.as_deref() {
        Some(key) if key == over_key => previous.position,
        _ => None,
    };
    DragHoverState {
        over_key: Some(over_key.to_string()),
        position: Some(resolve_drag_position(offset_y, row_height, carried)),
    }
}

/// Moves `drag_key` next to `over_key`. Returns the normalized order,
/// unchanged when either key is unknown or the move is a no-op.
pub fn apply_drag_move(
    columns: &[ColumnDefinition],
    order: &[String],
    drag_key: &str,
    over_key: &str,
    position: DragPosition,
) -> Vec<String> {
    let mut next = normalize_order(columns, order);
    let from = next.iter().position(|k| k == drag_key);
    let over = next.iter().position(|k| k == over_key);
    let (Some(from), Some(over)) = (from, over) else {
        return next;
    };
    if from == over {
        return next;
    }

    let mut target = match position {
        DragPosition::Top => over,
        DragPosition::Bottom => over + 1,
    };
    if from < target {
        target -= 1;
    }
    if target == from || target >= next.len() {
        return next;
    }

    let moved = next.remove(from);
    next.insert(target, moved);
    next
}

/// Apply a finished drag to an order. Incomplete drags change nothing.
pub fn apply_drag_state(columns: &[ColumnDefinition], order: &[String], state: &DragState) -> Vec<String> {
    match (&state.drag_key, &state.over_key, state.position) {
        (Some(drag), Some(over), Some(position)) => apply_drag_move(columns, order, drag, over, position),
        _ => normalize_order(columns, order),
    }
}

/// Pixels to scroll per tick while dragging near the container's edges.
/// Negative scrolls up, positive down, zero outside both zones.
pub fn resolve_auto_scroll_velocity(pointer_y: f64, container_top: f64, container_height: f64) -> f64 {
    if !pointer_y.is_finite() || !container_height.is_finite() || container_height <= 0.0 {
        return 0.0;
    }
    let zone = (container_height * SCROLL_ZONE_RATIO).clamp(SCROLL_ZONE_MIN, SCROLL_ZONE_MAX);
    let relative = pointer_y - container_top;

    let step = |distance: f64| SCROLL_STEP_MIN.max((distance.clamp(0.0, zone) / SCROLL_STEP_DIVISOR).ceil());

    if relative < zone {
        -step(zone - relative)
    } else if relative > container_height - zone {
        step(relative - (container_height - zone))
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("a"),
            ColumnDefinition::new("b"),
            ColumnDefinition::new("c"),
        ]
    }

    fn keys(order: &[&str]) -> Vec<String> {
        order.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn drag_onto_last_bottom() {
        let next = apply_drag_move(&abc(), &keys(&["a", "b", "c"]), "a", "c", DragPosition::Bottom);
        assert_eq!(next, keys(&["b", "c", "a"]));
    }

    #[test]
    fn drag_backwards_top() {
        let next = apply_drag_move(&abc(), &keys(&["a", "b", "c"]), "c", "a", DragPosition::Top);
        assert_eq!(next, keys(&["c", "a", "b"]));
        let next = apply_drag_move(&abc(), &keys(&["a", "b", "c"]), "c", "a", DragPosition::Bottom);
        assert_eq!(next, keys(&["a", "c", "b"]));
    }

    #[test]
    fn no_op_moves() {
        let order = keys(&["a", "b", "c"]);
        assert_eq!(apply_drag_move(&abc(), &order, "a", "a", DragPosition::Top), order);
        assert_eq!(apply_drag_move(&abc(), &order, "a", "b", DragPosition::Top), order);
        assert_eq!(apply_drag_move(&abc(), &order, "b", "a", DragPosition::Bottom), order);
        assert_eq!(apply_drag_move(&abc(), &order, "x", "a", DragPosition::Top), order);
        assert_eq!(apply_drag_move(&abc(), &order, "a", "x", DragPosition::Top), order);
    }

    #[test]
    fn stale_order_is_normalized() {
        let next = apply_drag_move(&abc(), &keys(&["c", "gone"]), "a", "c", DragPosition::Top);
        assert_eq!(next, keys(&["a", "c", "b"]));
    }

    #[test]
    fn position_with_dead_zone() {
        // 40px row: center 20, dead zone 6.4
        assert_eq!(resolve_drag_position(5.0, 40.0, None), DragPosition::Top);
        assert_eq!(resolve_drag_position(35.0, 40.0, Some(DragPosition::Top)), DragPosition::Bottom);
        assert_eq!(resolve_drag_position(24.0, 40.0, Some(DragPosition::Top)), DragPosition::Top);
        assert_eq!(resolve_drag_position(16.0, 40.0, Some(DragPosition::Bottom)), DragPosition::Bottom);
        assert_eq!(resolve_drag_position(20.0, 40.0, None), DragPosition::Bottom);
        assert_eq!(resolve_drag_position(19.0, 40.0, None), DragPosition::Top);
        // Dead zone is clamped to [3, 10]
        assert_eq!(dead_zone(10.0), 3.0);
        assert_eq!(dead_zone(200.0), 10.0);
    }

    #[test]
    fn hover_only_reuses_decision_for_same_row() {
        let hover = DragHoverState {
            over_key: Some("b".into()),
            position: Some(DragPosition::Top),
        };
        let same = resolve_drag_hover(&hover, "b", 22.0, 40.0);
        assert_eq!(same.position, Some(DragPosition::Top));
        let other = resolve_drag_hover(&hover, "c", 22.0, 40.0);
        assert_eq!(other.over_key.as_deref(), Some("c"));
        assert_eq!(other.position, Some(DragPosition::Bottom));
    }

    #[test]
    fn drag_state_application() {
        let order = keys(&["a", "b", "c"]);
        let state = DragState {
            drag_key: Some("a".into()),
            over_key: Some("c".into()),
            position: Some(DragPosition::Bottom),
        };
        assert_eq!(apply_drag_state(&abc(), &order, &state), keys(&["b", "c", "a"]));
        assert_eq!(apply_drag_state(&abc(), &order, &DragState::default()), order);
    }

    #[test]
    fn auto_scroll_velocity() {
        // 400px container: zone = clamp(96, 20, 48) = 48
        assert_eq!(resolve_auto_scroll_velocity(200.0, 0.0, 400.0), 0.0);
        assert_eq!(resolve_auto_scroll_velocity(40.0, 0.0, 400.0), -4.0);
        assert_eq!(resolve_auto_scroll_velocity(0.0, 0.0, 400.0), -8.0);
        assert_eq!(resolve_auto_scroll_velocity(-50.0, 0.0, 400.0), -8.0);
        assert_eq!(resolve_auto_scroll_velocity(390.0, 0.0, 400.0), 7.0);
        assert_eq!(resolve_auto_scroll_velocity(1130.0, 1000.0, 50.0), 4.0);
        assert_eq!(resolve_auto_scroll_velocity(10.0, 0.0, 0.0), 0.0);
    }
}
