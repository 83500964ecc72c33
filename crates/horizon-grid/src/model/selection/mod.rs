//! Row selection driven by pointer and keyboard input.
//!
//! [`SelectionModel`] exposes the selection as a one-column boolean table
//! whose rows correspond 1:1 with the rows of an observed source model.
//! Input events are forwarded into it by an external routing layer; the
//! gesture logic lives in the pure [`machine`] module.
//!
//! # Gestures
//!
//! - **Plain click / drag**: clears the selection and adds every row the
//!   pointer touches
//! - **Shift + click / arrow**: selects the range between the highlighted
//!   row (the anchor) and the row under the cursor
//! - **Control (or Meta) + click / arrow**: toggles the touched rows,
//!   adding or removing depending on the first row's state
//! - **Arrow keys**: moves the single selected row up or down
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use horizon_grid::input::KeyboardModifiers;
//! use horizon_grid::model::{ArrayTableModel, CellValue, SelectionModel};
//!
//! let rows = (0..7i64).map(|i| vec![CellValue::from(i)]).collect();
//! let source = Arc::new(ArrayTableModel::from_rows(rows).unwrap());
//! let selection = SelectionModel::new(&*source);
//!
//! selection.pointer_down(2, KeyboardModifiers::NONE).unwrap();
//! selection.pointer_enter(5, KeyboardModifiers::NONE).unwrap();
//! selection.pointer_up(KeyboardModifiers::NONE);
//! assert_eq!(selection.selected_rows(), vec![2, 3, 4, 5]);
//! ```

pub mod machine;

use std::sync::{Arc, Weak};

use horizon_grid_core::Subscription;
use parking_lot::Mutex;

use self::machine::{stroke, transition, Guards, InputState, InteractionState};
use super::array_model::ArrayTableModel;
use super::error::{Error, Result};
use super::operation::{moved_index, Operation, RowSnapshot};
use super::traits::{ModelSignals, TableModel};
use super::value::CellValue;
use crate::input::{Key, KeyboardModifiers};

/// Upper bound on chained transitions per input event.
const MAX_TRANSITIONS: usize = 8;

/// Ephemeral interaction state.
#[derive(Debug, Default)]
struct Interaction {
    input: InputState,
    state: InteractionState,
    /// The anchor row for range gestures.
    highlighted: Option<usize>,
    /// The row under the cursor.
    current: Option<usize>,
    /// Where the current stroke starts.
    previous: usize,
    /// Whether the active gesture selects or deselects.
    adding: bool,
}

/// The selection state of an observed model's rows.
pub struct SelectionModel {
    table: Arc<ArrayTableModel>,
    interaction: Mutex<Interaction>,
    _subscription: Subscription,
}

impl SelectionModel {
    /// Creates a selection over `source`, with its first row selected.
    pub fn new(source: &dyn TableModel) -> Arc<Self> {
        let row_count = source.row_count();
        let table = Arc::new(ArrayTableModel::new());
        for row in 0..row_count {
            if let Err(err) = table.add_row(vec![CellValue::Bool(row == 0)]) {
                tracing::error!(target: "horizon_grid::model::selection", %err, "failed to seed selection row");
            }
        }
        tracing::debug!(target: "horizon_grid::model::selection", rows = row_count, "selection model created");

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let subscription = source.signals().connect(move |operations| {
                if let Some(model) = weak.upgrade() {
                    model.on_source_changed(operations);
                }
            });
            Self {
                table,
                interaction: Mutex::new(Interaction {
                    highlighted: (row_count > 0).then_some(0),
                    ..Interaction::default()
                }),
                _subscription: subscription,
            }
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Returns whether `row` is selected.
    pub fn is_selected(&self, row: usize) -> Result<bool> {
        Ok(self.table.get(row, 0)?.as_bool().unwrap_or(false))
    }

    /// Returns the selected rows in ascending order.
    pub fn selected_rows(&self) -> Vec<usize> {
        self.table
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| row.value(0).and_then(CellValue::as_bool) == Some(true))
            .map(|(index, _)| index)
            .collect()
    }

    /// Returns the number of selected rows.
    pub fn selected_count(&self) -> usize {
        self.selected_rows().len()
    }

    /// Returns `true` if any row is selected.
    pub fn has_selection(&self) -> bool {
        self.selected_count() > 0
    }

    /// Returns the highlighted (anchor) row.
    pub fn highlighted(&self) -> Option<usize> {
        self.interaction.lock().highlighted
    }

    /// Returns the row under the cursor.
    pub fn current(&self) -> Option<usize> {
        self.interaction.lock().current
    }

    /// Returns the current interaction state.
    pub fn state(&self) -> InteractionState {
        self.interaction.lock().state
    }

    /// Returns the buttons and keys currently held.
    pub fn input(&self) -> InputState {
        self.interaction.lock().input
    }

    // =========================================================================
    // Programmatic selection
    // =========================================================================

    /// Selects or deselects `row`.
    pub fn set_selected(&self, row: usize, selected: bool) -> Result<()> {
        Error::check_range("row", row, self.table.row_count())?;
        self.table.transaction(|| self.write(row, selected))
    }

    /// Selects every row.
    pub fn select_all(&self) {
        if let Err(err) = self.table.transaction(|| self.fill(true)) {
            tracing::error!(target: "horizon_grid::model::selection", %err, "select all failed");
        }
    }

    /// Deselects every row.
    pub fn clear_selection(&self) {
        if let Err(err) = self.table.transaction(|| self.fill(false)) {
            tracing::error!(target: "horizon_grid::model::selection", %err, "clear selection failed");
        }
    }

    // =========================================================================
    // Input
    // =========================================================================

    /// The pointer button went down over `row`.
    pub fn pointer_down(&self, row: usize, modifiers: KeyboardModifiers) -> Result<()> {
        Error::check_range("row", row, self.table.row_count())?;
        self.handle(|interaction| {
            interaction.input.mouse = true;
            apply_modifiers(&mut interaction.input, modifiers);
            let moved = interaction.current != Some(row);
            interaction.current = Some(row);
            moved
        })
    }

    /// The pointer button was released.
    pub fn pointer_up(&self, modifiers: KeyboardModifiers) {
        let result = self.handle(|interaction| {
            interaction.input.mouse = false;
            apply_modifiers(&mut interaction.input, modifiers);
            false
        });
        if let Err(err) = result {
            tracing::error!(target: "horizon_grid::model::selection", %err, "pointer up failed");
        }
    }

    /// The pointer moved over `row`.
    ///
    /// Only moves the cursor while the pointer button is down.
    pub fn pointer_enter(&self, row: usize, modifiers: KeyboardModifiers) -> Result<()> {
        Error::check_range("row", row, self.table.row_count())?;
        self.handle(|interaction| {
            apply_modifiers(&mut interaction.input, modifiers);
            if interaction.input.mouse && interaction.current != Some(row) {
                interaction.current = Some(row);
                return true;
            }
            false
        })
    }

    /// A key was pressed.
    pub fn key_down(&self, key: Key, modifiers: KeyboardModifiers) -> Result<()> {
        let row_count = self.table.row_count();
        self.handle(|interaction| {
            apply_modifiers(&mut interaction.input, modifiers);
            match key {
                Key::ArrowUp | Key::ArrowDown if row_count > 0 => {
                    if key == Key::ArrowUp {
                        interaction.input.arrow_up = true;
                    } else {
                        interaction.input.arrow_down = true;
                    }
                    // Active range and toggle gestures step from the cursor,
                    // everything else from the highlighted row.
                    let from_cursor = matches!(
                        interaction.state,
                        InteractionState::RangeActive | InteractionState::ToggleActive
                    );
                    let base = if from_cursor {
                        interaction.current.or(interaction.highlighted)
                    } else {
                        interaction.highlighted.or(interaction.current)
                    };
                    let base = base.unwrap_or(0);
                    let next = if key == Key::ArrowUp {
                        base.saturating_sub(1)
                    } else {
                        (base + 1).min(row_count - 1)
                    };
                    interaction.current = Some(next);
                    true
                }
                key if key.is_shift() => {
                    interaction.input.shift = true;
                    false
                }
                key if key.is_control_class() => {
                    interaction.input.control = true;
                    false
                }
                _ => false,
            }
        })
    }

    /// A key was released.
    pub fn key_up(&self, key: Key, modifiers: KeyboardModifiers) -> Result<()> {
        self.handle(|interaction| {
            apply_modifiers(&mut interaction.input, modifiers);
            match key {
                Key::ArrowUp => interaction.input.arrow_up = false,
                Key::ArrowDown => interaction.input.arrow_down = false,
                key if key.is_shift() => interaction.input.shift = false,
                key if key.is_control_class() => interaction.input.control = false,
                _ => {}
            }
            false
        })
    }

    /// Runs one input event as one transaction on the selection table.
    ///
    /// `update` records the event in the interaction state and returns
    /// whether the cursor moved. The state machine then advances, running
    /// the entry action of every state it enters. If the state did not
    /// change, a tracking state applies the stroke the cursor made, and
    /// arrow navigation re-selects after an arrow key.
    fn handle(&self, update: impl FnOnce(&mut Interaction) -> bool) -> Result<()> {
        self.table.transaction(|| -> Result<()> {
            let mut interaction = self.interaction.lock();
            let moved = update(&mut interaction);

            let start = interaction.state;
            for _ in 0..MAX_TRANSITIONS {
                let guards = Guards::from_input(&interaction.input);
                let next = transition(interaction.state, guards);
                if next == interaction.state {
                    break;
                }
                tracing::trace!(
                    target: "horizon_grid::model::selection",
                    from = ?interaction.state,
                    to = ?next,
                    "selection state changed"
                );
                interaction.state = next;
                self.enter(&mut interaction)?;
            }

            if interaction.state == start && moved {
                match interaction.state {
                    state if state.is_tracking() => self.step(&mut interaction)?,
                    InteractionState::ArrowNav => self.navigate(&mut interaction)?,
                    _ => {}
                }
            }
            Ok(())
        })
    }

    /// Entry action of the state just entered.
    fn enter(&self, interaction: &mut Interaction) -> Result<()> {
        match interaction.state {
            InteractionState::Idle => Ok(()),
            InteractionState::RangeInit => {
                let anchor = interaction.highlighted.or(interaction.current).unwrap_or(0);
                interaction.highlighted = Some(anchor);
                interaction.previous = anchor;
                // The selection is cleared below, so the anchor always starts
                // unselected and the direction derived from it is "add".
                interaction.adding = true;
                self.fill(false)
            }
            InteractionState::ToggleInit => {
                let Some(current) = interaction.current else {
                    return Ok(());
                };
                interaction.adding = !self.is_selected(current)?;
                interaction.highlighted = Some(current);
                interaction.previous = current;
                Ok(())
            }
            InteractionState::PlainInit => {
                let Some(current) = interaction.current else {
                    return Ok(());
                };
                interaction.highlighted = Some(current);
                interaction.previous = current;
                interaction.adding = true;
                self.fill(false)
            }
            InteractionState::RangeActive
            | InteractionState::ToggleActive
            | InteractionState::PlainActive => self.step(interaction),
            InteractionState::ArrowNav => self.navigate(interaction),
        }
    }

    /// Applies the stroke from `previous` to `current`.
    fn step(&self, interaction: &mut Interaction) -> Result<()> {
        let (Some(anchor), Some(current)) = (interaction.highlighted, interaction.current) else {
            return Ok(());
        };
        for span in stroke(anchor, interaction.previous, current, interaction.adding) {
            for row in span.rows() {
                self.write(row, span.selected)?;
            }
        }
        interaction.previous = current;
        Ok(())
    }

    /// Selects only `current` and makes it the highlighted row.
    fn navigate(&self, interaction: &mut Interaction) -> Result<()> {
        let Some(current) = interaction.current else {
            return Ok(());
        };
        self.fill(false)?;
        interaction.highlighted = Some(current);
        interaction.previous = current;
        self.write(current, true)
    }

    /// Stores `selected` at `row` unless it is already there.
    fn write(&self, row: usize, selected: bool) -> Result<()> {
        if self.is_selected(row)? != selected {
            self.table.set(row, 0, selected)?;
        }
        Ok(())
    }

    fn fill(&self, selected: bool) -> Result<()> {
        (0..self.table.row_count()).try_for_each(|row| self.write(row, selected))
    }

    /// Keeps the selection rows aligned with the source rows.
    fn on_source_changed(&self, operations: &[Operation]) {
        self.table.transaction(|| {
            for operation in operations {
                if let Err(err) = self.mirror(operation) {
                    tracing::error!(
                        target: "horizon_grid::model::selection",
                        %err,
                        ?operation,
                        "selection lost track of its source"
                    );
                }
            }
        });
    }

    fn mirror(&self, operation: &Operation) -> Result<()> {
        let mut interaction = self.interaction.lock();
        match operation {
            Operation::AddRow { index, .. } => {
                let seed = self.table.is_empty();
                self.table.insert_row(*index, vec![CellValue::Bool(seed)])?;
                shift_rows(&mut interaction, |row| if row >= *index { row + 1 } else { row });
                if seed {
                    interaction.highlighted = Some(*index);
                }
            }
            Operation::RemoveRow { index, .. } => {
                self.table.remove_row(*index)?;
                let remaining = self.table.row_count();
                shift_rows(&mut interaction, |row| {
                    if row > *index {
                        row - 1
                    } else {
                        row.min(remaining.saturating_sub(1))
                    }
                });
                if remaining == 0 {
                    interaction.highlighted = None;
                    interaction.current = None;
                }
            }
            Operation::MoveRow {
                source,
                destination,
            } => {
                self.table.move_row(*source, *destination)?;
                shift_rows(&mut interaction, |row| moved_index(row, *source, *destination));
            }
            Operation::UpdateValue { .. } => {}
        }
        Ok(())
    }
}

/// Re-addresses the rows the interaction refers to after a structural change.
fn shift_rows(interaction: &mut Interaction, map: impl Fn(usize) -> usize) {
    interaction.highlighted = interaction.highlighted.map(&map);
    interaction.current = interaction.current.map(&map);
    interaction.previous = map(interaction.previous);
}

fn apply_modifiers(input: &mut InputState, modifiers: KeyboardModifiers) {
    input.shift = modifiers.shift;
    input.control = modifiers.is_control_class();
}

impl TableModel for SelectionModel {
    fn row_count(&self) -> usize {
        self.table.row_count()
    }

    fn column_count(&self) -> usize {
        self.table.column_count()
    }

    fn get(&self, row: usize, column: usize) -> Result<CellValue> {
        self.table.get(row, column)
    }

    fn signals(&self) -> &ModelSignals {
        self.table.signals()
    }

    fn row(&self, index: usize) -> Result<RowSnapshot> {
        self.table.row(index)
    }
}

static_assertions::assert_impl_all!(SelectionModel: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: KeyboardModifiers = KeyboardModifiers::NONE;
    const SHIFT: KeyboardModifiers = KeyboardModifiers::SHIFT;
    const CTRL: KeyboardModifiers = KeyboardModifiers::CTRL;

    fn source(rows: usize) -> Arc<ArrayTableModel> {
        let rows = (0..rows).map(|i| vec![CellValue::from(i as i64)]).collect();
        Arc::new(ArrayTableModel::from_rows(rows).unwrap())
    }

    fn click(selection: &SelectionModel, row: usize, modifiers: KeyboardModifiers) {
        selection.pointer_down(row, modifiers).unwrap();
        selection.pointer_up(modifiers);
    }

    fn press(selection: &SelectionModel, key: Key, modifiers: KeyboardModifiers) {
        selection.key_down(key, modifiers).unwrap();
        selection.key_up(key, modifiers).unwrap();
    }

    #[test]
    fn test_first_row_selected_at_construction() {
        let source = source(3);
        let selection = SelectionModel::new(&*source);
        assert_eq!(selection.row_count(), 3);
        assert_eq!(selection.column_count(), 1);
        assert_eq!(selection.selected_rows(), vec![0]);
        assert_eq!(selection.highlighted(), Some(0));
        assert_eq!(selection.state(), InteractionState::Idle);
    }

    #[test]
    fn test_plain_drag_then_arrow() {
        let source = source(7);
        let selection = SelectionModel::new(&*source);

        selection.pointer_down(2, NONE).unwrap();
        assert_eq!(selection.state(), InteractionState::PlainActive);
        selection.pointer_enter(3, NONE).unwrap();
        selection.pointer_enter(5, NONE).unwrap();
        assert_eq!(selection.selected_rows(), vec![2, 3, 4, 5]);

        selection.pointer_up(NONE);
        assert_eq!(selection.state(), InteractionState::Idle);
        assert_eq!(selection.selected_rows(), vec![2, 3, 4, 5]);

        selection.key_down(Key::ArrowDown, NONE).unwrap();
        assert_eq!(selection.state(), InteractionState::ArrowNav);
        assert_eq!(selection.selected_rows(), vec![3]);
        selection.key_up(Key::ArrowDown, NONE).unwrap();
        assert_eq!(selection.state(), InteractionState::Idle);

        press(&selection, Key::ArrowDown, NONE);
        assert_eq!(selection.selected_rows(), vec![4]);
        press(&selection, Key::ArrowUp, NONE);
        press(&selection, Key::ArrowUp, NONE);
        assert_eq!(selection.selected_rows(), vec![2]);
        assert_eq!(selection.highlighted(), Some(2));
    }

    #[test]
    fn test_drag_back_over_rows_deselects_them() {
        let source = source(7);
        let selection = SelectionModel::new(&*source);

        selection.pointer_down(3, NONE).unwrap();
        selection.pointer_enter(6, NONE).unwrap();
        selection.pointer_enter(4, NONE).unwrap();
        assert_eq!(selection.selected_rows(), vec![3, 4]);
        selection.pointer_enter(1, NONE).unwrap();
        assert_eq!(selection.selected_rows(), vec![1, 2, 3]);
    }

    #[test]
    fn test_shift_click_selects_range_from_anchor() {
        let source = source(7);
        let selection = SelectionModel::new(&*source);

        click(&selection, 2, NONE);
        selection.pointer_down(5, SHIFT).unwrap();
        assert_eq!(selection.state(), InteractionState::RangeActive);
        assert_eq!(selection.selected_rows(), vec![2, 3, 4, 5]);
        selection.pointer_up(SHIFT);
        // Still shifted, so the range gesture stays live.
        assert_eq!(selection.state(), InteractionState::RangeActive);

        selection.pointer_down(0, SHIFT).unwrap();
        selection.pointer_up(NONE);
        assert_eq!(selection.selected_rows(), vec![0, 1, 2]);
        assert_eq!(selection.state(), InteractionState::Idle);
        assert_eq!(selection.highlighted(), Some(2));
    }

    #[test]
    fn test_shift_arrows_extend_range() {
        let source = source(5);
        let selection = SelectionModel::new(&*source);
        click(&selection, 1, NONE);

        selection.key_down(Key::ShiftLeft, SHIFT).unwrap();
        press(&selection, Key::ArrowDown, SHIFT);
        press(&selection, Key::ArrowDown, SHIFT);
        assert_eq!(selection.selected_rows(), vec![1, 2, 3]);
        press(&selection, Key::ArrowUp, SHIFT);
        assert_eq!(selection.selected_rows(), vec![1, 2]);
        selection.key_up(Key::ShiftLeft, NONE).unwrap();
        assert_eq!(selection.state(), InteractionState::Idle);
    }

    #[test]
    fn test_control_click_toggles() {
        let source = source(5);
        let selection = SelectionModel::new(&*source);

        click(&selection, 1, CTRL);
        assert_eq!(selection.selected_rows(), vec![0, 1]);
        click(&selection, 3, KeyboardModifiers::META);
        assert_eq!(selection.selected_rows(), vec![0, 1, 3]);
        click(&selection, 1, CTRL);
        assert_eq!(selection.selected_rows(), vec![0, 3]);
        assert_eq!(selection.highlighted(), Some(1));
    }

    #[test]
    fn test_control_drag_removes_when_starting_on_selected_row() {
        let source = source(5);
        let selection = SelectionModel::new(&*source);
        selection.select_all();

        selection.pointer_down(1, CTRL).unwrap();
        selection.pointer_enter(3, CTRL).unwrap();
        selection.pointer_up(CTRL);
        assert_eq!(selection.selected_rows(), vec![0, 4]);
    }

    #[test]
    fn test_out_of_range_input_is_rejected() {
        let source = source(3);
        let selection = SelectionModel::new(&*source);

        assert!(selection.pointer_down(3, NONE).is_err());
        assert!(selection.pointer_enter(9, NONE).is_err());
        assert_eq!(selection.selected_rows(), vec![0]);
        assert_eq!(selection.state(), InteractionState::Idle);
        assert!(!selection.input().mouse);
    }

    #[test]
    fn test_arrow_clamps_at_edges() {
        let source = source(2);
        let selection = SelectionModel::new(&*source);

        press(&selection, Key::ArrowUp, NONE);
        assert_eq!(selection.selected_rows(), vec![0]);
        press(&selection, Key::ArrowDown, NONE);
        press(&selection, Key::ArrowDown, NONE);
        assert_eq!(selection.selected_rows(), vec![1]);
    }

    #[test]
    fn test_tracks_source_structure() {
        let source = Arc::new(ArrayTableModel::new());
        let selection = SelectionModel::new(&*source);
        assert!(selection.is_empty());

        source.add_row(vec!["a".into()]).unwrap();
        source.add_row(vec!["b".into()]).unwrap();
        source.insert_row(0, vec!["c".into()]).unwrap();
        assert_eq!(selection.row_count(), 3);
        assert_eq!(selection.selected_rows(), vec![1]);
        assert_eq!(selection.highlighted(), Some(1));

        source.move_row(1, 2).unwrap();
        assert_eq!(selection.selected_rows(), vec![2]);
        source.set(0, 0, "z").unwrap();
        source.remove_row(0).unwrap();
        assert_eq!(selection.selected_rows(), vec![1]);
        assert_eq!(selection.row_count(), 2);
    }

    #[test]
    fn test_selection_changes_are_one_dispatch_per_event() {
        let source = source(6);
        let selection = SelectionModel::new(&*source);
        let dispatches = Arc::new(Mutex::new(0usize));
        let counter = dispatches.clone();
        let _sub = selection.connect(move |_| *counter.lock() += 1);

        selection.pointer_down(2, NONE).unwrap();
        selection.pointer_enter(4, NONE).unwrap();
        selection.pointer_up(NONE);
        assert_eq!(*dispatches.lock(), 2);

        selection.clear_selection();
        assert!(!selection.has_selection());
        assert_eq!(*dispatches.lock(), 3);
        selection.set_selected(5, true).unwrap();
        assert_eq!(selection.selected_count(), 1);
    }
}
