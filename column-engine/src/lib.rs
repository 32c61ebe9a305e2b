//! FILENAME: column-engine/src/lib.rs
//! Column customization subsystem for the table runtime.
//!
//! This crate owns the column customization panel's state: which columns are
//! visible, where they are pinned, whether sorting and filtering are enabled,
//! and in which order they render. It depends on `engine` for column
//! definitions and logging.
//!
//! Layers:
//! - `snapshot`: Serializable customization state (what the user chose)
//! - `transition`: open / cancel / confirm / reset over draft, origin, current
//! - `drag`: Drag reorder, hover hysteresis and auto-scroll
//! - `flip`: Reflow animation bookkeeping
//! - `controls`: Panel rows and runtime column definitions (WHAT we display)

pub mod controls;
pub mod drag;
pub mod flip;
pub mod snapshot;
pub mod transition;

pub use controls::{
    build_column_custom_controls, build_column_runtime_items, visible_runtime_items, ColumnCustomControl,
};
pub use drag::{
    apply_drag_move, apply_drag_state, resolve_auto_scroll_velocity, resolve_drag_hover,
    resolve_drag_position, DragHoverState, DragPosition, DragState,
};
pub use flip::{capture_flip_rects, compute_flip_offsets, FlipOffset, FlipPhase, FlipPlayback, FlipRect};
pub use snapshot::{
    clone_column_custom_snapshot, create_column_custom_snapshot, normalize_order, resolve_column_key,
    resolve_column_keys, ColumnCustomSnapshot,
};
pub use transition::{has_any_snapshot, has_unsaved_changes, ColumnCustomSession, ColumnCustomTransition};
