use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;
use wasm_bindgen::prelude::*;

pub const CELL_COUNT: usize = 9;
pub const GRID_SIZE: usize = 3;
pub const NUM_PLAYERS: usize = 2;

/// Lifespan a freshly placed mark starts with, counted in the owner's own
/// subsequent moves. A mark ages on each of those moves and is cleared once it
/// ages past zero, so it survives exactly two further placements by its owner.
pub const START_LIFESPAN: u8 = 2;

/// The 8 winning lines in declaration order: rows, columns, diagonals. The
/// order is a deterministic tie-break for simultaneous completions, nothing
/// more.
pub const WIN_PATTERNS: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// One of the two sides. `X` always moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    X,
    O,
}

impl Player {
    #[inline]
    pub const fn opponent(self) -> Player {
        match self {
            Player::X => Player::O,
            Player::O => Player::X,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Player::X => 'X',
            Player::O => 'O',
        }
    }
}

/// A single square. The lifespan counter only exists while the square is
/// taken; an empty square carries no stale number. Serialized untagged so the
/// wire shape is a nullish empty marker or `[symbol, lifespan]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Taken(Player, u8),
}

impl Cell {
    #[inline]
    pub const fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }

    #[inline]
    pub const fn holder(self) -> Option<Player> {
        match self {
            Cell::Empty => None,
            Cell::Taken(player, _) => Some(player),
        }
    }
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("cell {0} is out of range (the board has {CELL_COUNT} cells)")]
    OutOfRange(usize),
    #[error("cell {0} is already taken")]
    CellTaken(usize),
    #[error("no move to undo")]
    NothingToUndo,
}

/// Reversible log of the cells touched by one [`Board::apply_move`]: the
/// placed cell plus every own mark that aged or was cleared, each paired with
/// its prior snapshot. Replaying the snapshots restores the pre-move board
/// exactly. A move touches at most 4 cells (1 placement + 3 surviving own
/// marks), so the log never spills to the heap.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Patch {
    entries: SmallVec<[(usize, Cell); 4]>,
}

impl Patch {
    #[inline]
    fn record(&mut self, position: usize, prior: Cell) {
        self.entries.push((position, prior));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Touched positions in recorded order (placed cell first).
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|&(position, _)| position)
    }
}

/// The 3×3 grid in row-major order. Serialized transparently as the bare
/// 9-cell sequence used by the boundary messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; CELL_COUNT],
}

/// A completed line: who closed it and which cells form it, for the surface
/// to highlight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLine {
    pub winner: Player,
    pub line: [usize; 3],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [Cell::Empty; CELL_COUNT],
        }
    }

    pub fn from_cells(cells: [Cell; CELL_COUNT]) -> Self {
        Self { cells }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn cells(&self) -> &[Cell; CELL_COUNT] {
        &self.cells
    }

    /// Empty positions in ascending index order. This is also the enumeration
    /// order of the search, so it decides which of several equally scored
    /// moves is found first.
    pub fn valid_positions(&self) -> SmallVec<[usize; CELL_COUNT]> {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(position, cell)| cell.is_empty().then_some(position))
            .collect()
    }

    /// Place `player` on `position` and age the player's other marks, in
    /// ascending index order: a mark whose lifespan already reached zero is
    /// cleared, any other loses one. The opponent's marks are untouched.
    /// Returns the patch that undoes the whole mutation; a taken or
    /// out-of-range target leaves the board unchanged.
    pub fn apply_move(&mut self, player: Player, position: usize) -> Result<Patch, BoardError> {
        let target = *self
            .cells
            .get(position)
            .ok_or(BoardError::OutOfRange(position))?;
        if !target.is_empty() {
            return Err(BoardError::CellTaken(position));
        }

        let mut patch = Patch::default();
        patch.record(position, target);
        self.cells[position] = Cell::Taken(player, START_LIFESPAN);

        for other in 0..CELL_COUNT {
            if other == position {
                continue;
            }
            if let Cell::Taken(holder, lifespan) = self.cells[other] {
                if holder != player {
                    continue;
                }
                patch.record(other, self.cells[other]);
                self.cells[other] = if lifespan == 0 {
                    Cell::Empty
                } else {
                    Cell::Taken(holder, lifespan - 1)
                };
            }
        }

        Ok(patch)
    }

    /// Restore every snapshot in `patch`, reverting the `apply_move` that
    /// produced it. Undoing patches in strict LIFO order walks the board back
    /// through any sequence of moves.
    pub fn undo(&mut self, patch: &Patch) {
        for &(position, prior) in &patch.entries {
            self.cells[position] = prior;
        }
    }

    /// First completed line in [`WIN_PATTERNS`] order, if any.
    pub fn winner(&self) -> Option<WinLine> {
        for line in WIN_PATTERNS {
            let [a, b, c] = line;
            if let Cell::Taken(player, _) = self.cells[a] {
                if self.cells[b].holder() == Some(player) && self.cells[c].holder() == Some(player)
                {
                    return Some(WinLine {
                        winner: player,
                        line,
                    });
                }
            }
        }
        None
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

/// A thin wasm-bindgen friendly board wrapper, holding the LIFO patch history
/// for the interactive surface.
#[wasm_bindgen]
pub struct DecayBoard {
    board: Board,
    history: Vec<Patch>,
}

#[wasm_bindgen]
impl DecayBoard {
    #[wasm_bindgen(constructor)]
    pub fn new() -> DecayBoard {
        DecayBoard {
            board: Board::new(),
            history: Vec::new(),
        }
    }

    /// Clear all marks and forget the undo history.
    pub fn reset(&mut self) {
        self.board.reset();
        self.history.clear();
    }

    /// Serialize the board to the 9-cell sequence (nullish empty marker or
    /// `[symbol, lifespan]` per cell).
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.board).map_err(JsValue::from)
    }

    /// Replace the board contents from a 9-cell sequence. The undo history is
    /// dropped, since its patches no longer refer to this board.
    #[wasm_bindgen(js_name = setState)]
    pub fn set_state(&mut self, state: JsValue) -> Result<(), JsValue> {
        self.board = serde_wasm_bindgen::from_value(state)?;
        self.history.clear();
        Ok(())
    }

    /// Empty positions in ascending index order.
    #[wasm_bindgen(js_name = validPositions)]
    pub fn valid_positions(&self) -> Vec<u8> {
        self.board
            .valid_positions()
            .into_iter()
            .map(|position| position as u8)
            .collect()
    }

    /// Apply a move for `player` (`"X"` or `"O"`) and push its undo patch
    /// onto the history. Rejects taken or out-of-range targets.
    #[wasm_bindgen(js_name = applyMove)]
    pub fn apply_move(&mut self, player: JsValue, position: usize) -> Result<(), JsValue> {
        let player: Player = serde_wasm_bindgen::from_value(player)?;
        let patch = self
            .board
            .apply_move(player, position)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        self.history.push(patch);
        Ok(())
    }

    /// Revert the most recent move. An empty history is a caller error.
    #[wasm_bindgen(js_name = undoLast)]
    pub fn undo_last(&mut self) -> Result<(), JsValue> {
        let patch = self
            .history
            .pop()
            .ok_or_else(|| JsValue::from_str(&BoardError::NothingToUndo.to_string()))?;
        self.board.undo(&patch);
        Ok(())
    }

    /// Number of moves that can still be undone.
    #[wasm_bindgen(js_name = historyLen)]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// The completed line as `{ winner, line }`, or `undefined` while the
    /// game is still open.
    pub fn winner(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.board.winner()).map_err(JsValue::from)
    }
}

impl DecayBoard {
    pub fn clone_internal(&self) -> Board {
        self.board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taken(player: Player, lifespan: u8) -> Cell {
        Cell::Taken(player, lifespan)
    }

    #[test]
    fn placement_starts_with_full_lifespan() {
        let mut board = Board::new();
        let patch = board.apply_move(Player::X, 4).expect("cell 4 is empty");
        assert_eq!(board.cells()[4], taken(Player::X, START_LIFESPAN));
        assert_eq!(patch.len(), 1);
        assert_eq!(patch.positions().collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn own_marks_age_and_expire_on_the_third_own_move() {
        let mut board = Board::new();
        board.apply_move(Player::X, 0).expect("empty");
        board.apply_move(Player::O, 5).expect("empty");

        board.apply_move(Player::X, 1).expect("empty");
        assert_eq!(board.cells()[0], taken(Player::X, 1));

        board.apply_move(Player::O, 7).expect("empty");
        assert_eq!(board.cells()[0], taken(Player::X, 1), "opponent moves never age a mark");

        board.apply_move(Player::X, 2).expect("empty");
        assert_eq!(board.cells()[0], taken(Player::X, 0), "aged out but still on the board");
        assert_eq!(board.cells()[1], taken(Player::X, 1));

        board.apply_move(Player::O, 8).expect("empty");
        board.apply_move(Player::X, 3).expect("empty");
        assert_eq!(board.cells()[0], Cell::Empty, "cleared on the third own move after placement");
        assert_eq!(board.cells()[1], taken(Player::X, 0));
        assert_eq!(board.cells()[2], taken(Player::X, 1));
        assert_eq!(board.cells()[3], taken(Player::X, START_LIFESPAN));

        assert_eq!(board.cells()[5], taken(Player::O, 1));
        assert_eq!(board.cells()[7], taken(Player::O, 2));
    }

    #[test]
    fn decay_is_recorded_in_the_patch() {
        let mut board = Board::new();
        board.apply_move(Player::X, 0).expect("empty");
        board.apply_move(Player::X, 1).expect("empty");
        let patch = board.apply_move(Player::X, 2).expect("empty");
        // Placement first, then the aged marks in ascending order.
        assert_eq!(patch.positions().collect::<Vec<_>>(), vec![2, 0, 1]);
    }

    #[test]
    fn undo_reverses_a_single_move() {
        let mut board = Board::new();
        board.apply_move(Player::X, 0).expect("empty");
        board.apply_move(Player::X, 1).expect("empty");
        let before = board;

        let patch = board.apply_move(Player::X, 8).expect("empty");
        assert_ne!(board, before);
        board.undo(&patch);
        assert_eq!(board, before);
    }

    #[test]
    fn lifo_undo_walks_back_to_the_empty_board() {
        let mut board = Board::new();
        let moves = [
            (Player::X, 0),
            (Player::O, 4),
            (Player::X, 1),
            (Player::O, 5),
            (Player::X, 2),
            (Player::O, 8),
            (Player::X, 6),
        ];

        let mut snapshots = Vec::new();
        let mut patches = Vec::new();
        for (player, position) in moves {
            snapshots.push(board);
            patches.push(board.apply_move(player, position).expect("scripted move"));
        }

        while let Some(patch) = patches.pop() {
            board.undo(&patch);
            let expected = snapshots.pop().expect("one snapshot per patch");
            assert_eq!(board, expected);
        }
        assert_eq!(board, Board::new());
    }

    #[test]
    fn moving_onto_a_taken_cell_is_rejected_and_harmless() {
        let mut board = Board::new();
        board.apply_move(Player::X, 4).expect("empty");
        let before = board;

        let err = board.apply_move(Player::O, 4).expect_err("cell 4 is taken");
        assert!(matches!(err, BoardError::CellTaken(4)));
        assert_eq!(board, before);

        let err = board.apply_move(Player::O, 9).expect_err("off the board");
        assert!(matches!(err, BoardError::OutOfRange(9)));
        assert_eq!(board, before);
    }

    #[test]
    fn valid_positions_are_ascending() {
        let mut board = Board::new();
        board.apply_move(Player::X, 7).expect("empty");
        board.apply_move(Player::O, 2).expect("empty");
        board.apply_move(Player::X, 0).expect("empty");
        assert_eq!(
            board.valid_positions().as_slice(),
            &[1, 3, 4, 5, 6, 8],
        );
    }

    #[test]
    fn no_winner_on_empty_or_open_boards() {
        assert_eq!(Board::new().winner(), None);

        let mut board = Board::new();
        board.apply_move(Player::X, 0).expect("empty");
        board.apply_move(Player::O, 4).expect("empty");
        board.apply_move(Player::X, 1).expect("empty");
        assert_eq!(board.winner(), None);
    }

    #[test]
    fn winner_reports_the_completed_line() {
        let mut cells = [Cell::Empty; CELL_COUNT];
        cells[2] = taken(Player::O, 1);
        cells[5] = taken(Player::O, 0);
        cells[8] = taken(Player::O, 2);
        cells[4] = taken(Player::X, 2);
        let board = Board::from_cells(cells);

        let win = board.winner().expect("column 2-5-8 is complete");
        assert_eq!(win.winner, Player::O);
        assert_eq!(win.line, [2, 5, 8]);
    }

    #[test]
    fn simultaneous_lines_report_the_first_pattern() {
        let mut cells = [Cell::Empty; CELL_COUNT];
        for position in [3, 4, 5] {
            cells[position] = taken(Player::X, 0);
        }
        for position in [6, 7, 8] {
            cells[position] = taken(Player::X, 1);
        }
        let board = Board::from_cells(cells);

        let win = board.winner().expect("two rows are complete");
        assert_eq!(win.line, [3, 4, 5], "row 3-4-5 is declared before row 6-7-8");
    }

    #[test]
    fn lifespans_never_linger_on_empty_cells() {
        let mut board = Board::new();
        board.apply_move(Player::X, 0).expect("empty");
        board.apply_move(Player::X, 1).expect("empty");
        board.apply_move(Player::X, 2).expect("empty");
        board.apply_move(Player::X, 3).expect("empty");
        assert_eq!(board.cells()[0], Cell::Empty);
        assert_eq!(board.cells()[0].holder(), None);
    }

    #[test]
    fn wire_shape_matches_the_surface_contract() {
        let mut board = Board::new();
        board.apply_move(Player::X, 1).expect("empty");

        let value = serde_json::to_value(board).expect("board serializes");
        assert_eq!(
            value,
            serde_json::json!([null, ["X", 2], null, null, null, null, null, null, null])
        );

        let back: Board = serde_json::from_value(value).expect("board deserializes");
        assert_eq!(back, board);
    }
}
