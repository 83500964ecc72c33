//! The selection interaction state machine.
//!
//! Everything here is pure: [`transition`] maps a state and a set of guards
//! to the next state, and [`stroke`] computes which rows a gesture step
//! touches. The side effects live in [`SelectionModel`](super::SelectionModel).

/// States of the selection interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InteractionState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// A shift gesture just started.
    RangeInit,
    /// A shift gesture is extending the range from the anchor.
    RangeActive,
    /// A control gesture just started.
    ToggleInit,
    /// A control gesture is toggling the rows it touches.
    ToggleActive,
    /// A plain click just started.
    PlainInit,
    /// A plain drag is adding the rows it touches.
    PlainActive,
    /// Plain arrow-key navigation.
    ArrowNav,
}

impl InteractionState {
    /// Returns `true` for the states that apply strokes as the cursor moves.
    pub fn is_tracking(self) -> bool {
        matches!(
            self,
            InteractionState::RangeActive
                | InteractionState::ToggleActive
                | InteractionState::PlainActive
        )
    }
}

/// Buttons and keys currently held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputState {
    /// Shift is held.
    pub shift: bool,
    /// Control or Meta is held.
    pub control: bool,
    /// The pointer button is down.
    pub mouse: bool,
    /// The up arrow is held.
    pub arrow_up: bool,
    /// The down arrow is held.
    pub arrow_down: bool,
}

impl InputState {
    /// Returns `true` if either vertical arrow is held.
    pub fn arrow(&self) -> bool {
        self.arrow_up || self.arrow_down
    }
}

/// Conditions the transition table branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Guards {
    /// Shift held with the pointer down or an arrow held.
    pub range: bool,
    /// Control held with the pointer down or an arrow held.
    pub toggle: bool,
    /// Neither modifier held, pointer down.
    pub plain: bool,
    /// Neither modifier held, an arrow held.
    pub arrow: bool,
    /// Pointer up and shift released.
    pub idle: bool,
    /// Pointer up.
    pub pointer_released: bool,
    /// No arrow held and control released.
    pub arrows_released: bool,
}

impl Guards {
    /// Derives the guards from the held inputs.
    pub fn from_input(input: &InputState) -> Self {
        let moving = input.mouse || input.arrow();
        let unmodified = !input.shift && !input.control;
        Self {
            range: input.shift && moving,
            toggle: input.control && moving,
            plain: unmodified && input.mouse,
            arrow: unmodified && input.arrow(),
            idle: !input.mouse && !input.shift,
            pointer_released: !input.mouse,
            arrows_released: !input.arrow() && !input.control,
        }
    }
}

/// The transition table.
///
/// From `Idle` the gestures are tried in priority order: range, toggle,
/// plain, arrow. Init states always advance to their active state.
pub fn transition(state: InteractionState, guards: Guards) -> InteractionState {
    use InteractionState::*;

    match state {
        Idle if guards.range => RangeInit,
        Idle if guards.toggle => ToggleInit,
        Idle if guards.plain => PlainInit,
        Idle if guards.arrow => ArrowNav,
        Idle => Idle,

        RangeInit => RangeActive,
        RangeActive if guards.idle => Idle,
        RangeActive => RangeActive,

        ToggleInit => ToggleActive,
        ToggleActive if !guards.toggle => Idle,
        ToggleActive => ToggleActive,

        PlainInit => PlainActive,
        PlainActive if guards.pointer_released => Idle,
        PlainActive => PlainActive,

        ArrowNav if guards.arrows_released => Idle,
        ArrowNav => ArrowNav,
    }
}

/// An inclusive run of rows to set to one selection value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    /// First row of the run.
    pub first: usize,
    /// Last row of the run.
    pub last: usize,
    /// Value to store.
    pub selected: bool,
}

impl RowSpan {
    fn new(first: usize, last: usize, selected: bool) -> Self {
        Self {
            first,
            last,
            selected,
        }
    }

    /// Iterates the rows of the run.
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.first..=self.last
    }
}

/// The rows one gesture step touches as the cursor goes from `start` to
/// `end`, measured from `anchor`.
///
/// Moving away from the anchor sets the rows covered to `adding`; moving
/// back towards it sets the uncovered rows to `!adding`. A step that jumps
/// across the anchor is split there into a retreat and an advance.
pub fn stroke(anchor: usize, start: usize, end: usize, adding: bool) -> Vec<RowSpan> {
    if start < anchor && anchor < end {
        let mut spans = stroke(anchor, start, anchor, adding);
        spans.extend(stroke(anchor, anchor, end, adding));
        return spans;
    }
    if end < anchor && anchor < start {
        let mut spans = stroke(anchor, start, anchor, adding);
        spans.extend(stroke(anchor, anchor, end, adding));
        return spans;
    }

    let span = if anchor <= start && start <= end {
        RowSpan::new(start, end, adding)
    } else if anchor <= end && end < start {
        RowSpan::new(end + 1, start, !adding)
    } else if end <= start && start <= anchor {
        RowSpan::new(end, start, adding)
    } else {
        // start < end <= anchor
        RowSpan::new(start, end - 1, !adding)
    };
    vec![span]
}
