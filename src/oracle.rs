use hashbrown::HashMap;
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::board::{Board, Cell, Player, CELL_COUNT};

/// 7 symbols per cell: empty, or one of two roles with a lifespan in 0..=2.
const RADIX: u64 = 7;

/// Encode `(board, mover)` as the canonical lookup key for the precomputed
/// win table: 9 base-7 digits, cell 0 most significant, then doubled. The
/// digit alphabet reserves 0 for empty and gives the two roles the ranges
/// 1..=3 and 4..=6 (lifespan + 1 / lifespan + 4).
///
/// States are canonicalised as if `X` were about to move: when the mover is
/// `O` the roles swap, so a position and its colour-swapped mirror share one
/// key. The trailing doubling is part of the table format and carries no
/// meaning here; it must stay bit-exact with the generator or every lookup
/// silently misses.
pub fn encode(board: &Board, mover: Player) -> u64 {
    let flip = mover == Player::O;
    let mut key = 0u64;
    for &cell in board.cells() {
        key = key * RADIX + digit(cell, flip);
    }
    key * 2
}

const fn digit(cell: Cell, flip: bool) -> u64 {
    match cell {
        Cell::Empty => 0,
        Cell::Taken(holder, lifespan) => {
            let leads = matches!(holder, Player::X) != flip;
            if leads {
                lifespan as u64 + 1
            } else {
                lifespan as u64 + 4
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("key {0} has its low bit set; encoded states are always even")]
    OddKey(u64),
    #[error("key {0} does not fit in 9 base-7 digits")]
    KeyOutOfRange(u64),
    #[error("win table entry for key {key} lists position {position}, which is off the board")]
    BadTablePosition { key: u64, position: u8 },
}

/// Rebuild the canonical board behind an encoded key, with the mover mapped
/// to `X`. The inverse of [`encode`] up to the perspective flip; used for
/// diagnostics and for pinning the encoding in tests.
pub fn decode(key: u64) -> Result<Board, OracleError> {
    if key & 1 != 0 {
        return Err(OracleError::OddKey(key));
    }
    let mut n = key >> 1;
    let mut cells = [Cell::Empty; CELL_COUNT];
    for position in (0..CELL_COUNT).rev() {
        let digit = n % RADIX;
        n /= RADIX;
        cells[position] = match digit {
            0 => Cell::Empty,
            1..=3 => Cell::Taken(Player::X, (digit - 1) as u8),
            _ => Cell::Taken(Player::O, (digit - 4) as u8),
        };
    }
    if n != 0 {
        return Err(OracleError::KeyOutOfRange(key));
    }
    Ok(Board::from_cells(cells))
}

/// Read-only map from encoded state to the positions that start a guaranteed
/// win. Produced out-of-band; this side only looks keys up. A missing key
/// means "no known guaranteed win", which is an ordinary outcome and not a
/// fault.
#[derive(Debug, Default)]
pub struct WinTable {
    entries: HashMap<u64, Vec<u8>>,
}

impl WinTable {
    /// Build the table from `(key, positions)` pairs, rejecting entries that
    /// point off the board.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (u64, Vec<u8>)>,
    ) -> Result<Self, OracleError> {
        let mut table = HashMap::new();
        for (key, positions) in entries {
            if let Some(&position) = positions.iter().find(|&&p| p as usize >= CELL_COUNT) {
                return Err(OracleError::BadTablePosition { key, position });
            }
            table.insert(key, positions);
        }
        Ok(Self { entries: table })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Winning positions for `(board, mover)`, or `None` when the state has
    /// no known guaranteed win.
    pub fn lookup(&self, board: &Board, mover: Player) -> Option<&[u8]> {
        self.entries
            .get(&encode(board, mover))
            .map(Vec::as_slice)
    }
}

/// Win-table oracle exposed to the JavaScript surface. The table is injected
/// once at construction as a `[key, positions[]]` entry list and never
/// mutated afterwards.
#[wasm_bindgen]
pub struct DecayOracle {
    table: WinTable,
}

#[wasm_bindgen]
impl DecayOracle {
    #[wasm_bindgen(constructor)]
    pub fn new(entries: JsValue) -> Result<DecayOracle, JsValue> {
        let entries: Vec<(u64, Vec<u8>)> = serde_wasm_bindgen::from_value(entries)?;
        let table = WinTable::from_entries(entries)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        web_sys::console::debug_1(&format!("win table loaded, {} states", table.len()).into());
        Ok(DecayOracle { table })
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[wasm_bindgen(js_name = isEmpty)]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Winning positions for the given board and mover, or `undefined` when
    /// none are known.
    pub fn lookup(&self, board: JsValue, mover: JsValue) -> Result<Option<Vec<u8>>, JsValue> {
        let board: Board = serde_wasm_bindgen::from_value(board)?;
        let mover: Player = serde_wasm_bindgen::from_value(mover)?;
        Ok(self.table.lookup(&board, mover).map(<[u8]>::to_vec))
    }

    /// The raw lookup key for a board and mover, for table tooling.
    #[wasm_bindgen(js_name = encodeState)]
    pub fn encode_state(board: JsValue, mover: JsValue) -> Result<u64, JsValue> {
        let board: Board = serde_wasm_bindgen::from_value(board)?;
        let mover: Player = serde_wasm_bindgen::from_value(mover)?;
        Ok(encode(&board, mover))
    }
}
