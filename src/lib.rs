#![deny(clippy::unwrap_used)]
//! WebAssembly bindings for a decaying-mark tic-tac-toe engine: every placed
//! mark survives exactly two further moves by its owner and is cleared on the
//! third, so boards never fill and games can run indefinitely.
//!
//! The crate exposes three high-level building blocks:
//!
//! * [`DecayBoard`] – the 3×3 board with lifespan-carrying cells, reversible
//!   apply/undo mutation through patches, win detection over the 8 fixed
//!   lines, and the LIFO undo history the interactive surface drives.
//! * [`DecayMinimax`] – a depth-limited alpha-beta search runner meant to be
//!   loaded inside a worker context. Requests and score arrays cross the
//!   boundary by value; the async `search` export resolves once per request,
//!   with no cancellation.
//! * [`DecayOracle`] – lookup into an externally generated table of
//!   guaranteed-winning positions, keyed by a canonical base-7 encoding of
//!   board and mover.
//!
//! All game logic is target-independent; only the thin wrappers depend on the
//! JavaScript host.

mod board;
mod oracle;
mod search;

pub use board::{
    Board, BoardError, Cell, DecayBoard, Patch, Player, WinLine, CELL_COUNT, GRID_SIZE,
    NUM_PLAYERS, START_LIFESPAN, WIN_PATTERNS,
};
pub use oracle::{decode, encode, DecayOracle, OracleError, WinTable};
pub use search::{
    pick_move, search, DecayMinimax, SearchRequest, SearchResponse, INVALID_POSITION,
};

use wasm_bindgen::prelude::*;

/// Install a panic hook sending Rust panics to the browser console. The hook
/// is only compiled in when the `console_error_panic_hook` feature is enabled
/// (default).
#[wasm_bindgen]
pub fn init_panic_hook() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Number of board cells (3×3 = 9).
#[wasm_bindgen(js_name = cellCount)]
pub fn cell_count() -> usize {
    CELL_COUNT
}

/// Lifespan a freshly placed mark starts with.
#[wasm_bindgen(js_name = startLifespan)]
pub fn start_lifespan() -> u8 {
    START_LIFESPAN
}
