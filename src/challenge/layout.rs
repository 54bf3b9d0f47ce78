use serde::{Deserialize, Serialize};

pub const BOARD_ROWS: u8 = 3;
pub const BOARD_COLS: u8 = 3;

/// Cell on the 3x3 board a stimulus is drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutSlot {
    pub row: u8,
    pub col: u8,
}

const fn slot(row: u8, col: u8) -> LayoutSlot {
    LayoutSlot { row, col }
}

// Each preset visits every cell once, in an order unrelated to reading order.
const PRESETS: [[LayoutSlot; 9]; 4] = [
    [
        slot(1, 1),
        slot(0, 2),
        slot(2, 0),
        slot(0, 0),
        slot(2, 2),
        slot(1, 0),
        slot(0, 1),
        slot(2, 1),
        slot(1, 2),
    ],
    [
        slot(2, 1),
        slot(0, 0),
        slot(1, 2),
        slot(0, 2),
        slot(1, 0),
        slot(2, 2),
        slot(1, 1),
        slot(0, 1),
        slot(2, 0),
    ],
    [
        slot(0, 1),
        slot(2, 2),
        slot(1, 0),
        slot(2, 0),
        slot(0, 2),
        slot(1, 1),
        slot(2, 1),
        slot(1, 2),
        slot(0, 0),
    ],
    [
        slot(1, 2),
        slot(2, 0),
        slot(0, 0),
        slot(1, 1),
        slot(2, 1),
        slot(0, 2),
        slot(1, 0),
        slot(2, 2),
        slot(0, 1),
    ],
];

pub fn layout_count() -> usize {
    PRESETS.len()
}

/// Preset used by a 1-based round index
pub fn layout_for_round(round_index: usize) -> &'static [LayoutSlot] {
    &PRESETS[round_index.saturating_sub(1) % PRESETS.len()]
}

/// Slot for the `position`-th generated stimulus of a round
pub fn slot_for(round_index: usize, position: usize) -> LayoutSlot {
    let layout = layout_for_round(round_index);
    layout[position % layout.len()]
}
