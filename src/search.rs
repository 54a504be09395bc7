use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use wasm_bindgen::prelude::*;

use crate::board::{Board, Player, CELL_COUNT};

/// Score reported for root positions that cannot be played. Valid positions
/// always score in `-max_depth..=max_depth`, so the sentinel never collides.
pub const INVALID_POSITION: f32 = f32::NEG_INFINITY;

/// Depth-limited minimax with alpha-beta pruning, maximizing for
/// `current_player` and minimizing for the opponent, strictly alternating
/// from the root. Returns a score per cell; unplayable cells hold
/// [`INVALID_POSITION`].
///
/// The search explores a single shared board through apply/undo patches
/// rather than cloning per branch, so sibling subtrees are evaluated strictly
/// one after another. The board is fully restored before this returns.
///
/// Scoring: a win for `current_player` found after `d` plies is worth
/// `max_depth - d`, a loss `d - max_depth`, and reaching the horizon scores 0
/// — faster wins and slower losses rank higher. The horizon is checked before
/// the winner probe, so `max_depth = 0` degenerates to a 0 score for every
/// playable root.
///
/// Root candidates are scored independently: pruning bounds reset for each,
/// never across root siblings.
pub fn search(current_player: Player, max_depth: u32, board: &mut Board) -> [f32; CELL_COUNT] {
    let mut scores = [INVALID_POSITION; CELL_COUNT];
    for position in board.valid_positions() {
        let patch = board
            .apply_move(current_player, position)
            .expect("valid root position is empty");
        scores[position] = minimax(
            board,
            current_player,
            max_depth,
            1,
            f32::NEG_INFINITY,
            f32::INFINITY,
            false,
        );
        board.undo(&patch);
    }
    scores
}

fn minimax(
    board: &mut Board,
    current_player: Player,
    max_depth: u32,
    depth: u32,
    mut alpha: f32,
    mut beta: f32,
    maximizing: bool,
) -> f32 {
    if depth >= max_depth {
        return 0.0;
    }
    if let Some(win) = board.winner() {
        let distance = (max_depth - depth) as f32;
        return if win.winner == current_player {
            distance
        } else {
            -distance
        };
    }

    let side = if maximizing {
        current_player
    } else {
        current_player.opponent()
    };

    if maximizing {
        let mut best = f32::NEG_INFINITY;
        for position in board.valid_positions() {
            let patch = board
                .apply_move(side, position)
                .expect("valid position is empty");
            let score = minimax(board, current_player, max_depth, depth + 1, alpha, beta, false);
            board.undo(&patch);
            best = best.max(score);
            if best >= beta {
                break;
            }
            alpha = alpha.max(score);
        }
        best
    } else {
        let mut best = f32::INFINITY;
        for position in board.valid_positions() {
            let patch = board
                .apply_move(side, position)
                .expect("valid position is empty");
            let score = minimax(board, current_player, max_depth, depth + 1, alpha, beta, true);
            board.undo(&patch);
            best = best.min(score);
            if best <= alpha {
                break;
            }
            beta = beta.min(score);
        }
        best
    }
}

/// Pick uniformly among the positions tied at the best score, or `None` when
/// every entry is the [`INVALID_POSITION`] sentinel. The search itself is
/// deterministic; this randomization only adds variety on top.
pub fn pick_move(scores: &[f32; CELL_COUNT], rng: &mut impl Rng) -> Option<usize> {
    let mut best = INVALID_POSITION;
    let mut ties: SmallVec<[usize; CELL_COUNT]> = SmallVec::new();
    for (position, &score) in scores.iter().enumerate() {
        if score == INVALID_POSITION {
            continue;
        }
        if ties.is_empty() || score > best {
            best = score;
            ties.clear();
            ties.push(position);
        } else if score == best {
            ties.push(position);
        }
    }
    if ties.is_empty() {
        None
    } else {
        Some(ties[rng.gen_range(0..ties.len())])
    }
}

/// Search request crossing the worker boundary. The board and scalars are
/// copied by value; nothing is shared with the surface's own board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub current_player: Player,
    pub max_depth: u32,
    pub board: Board,
}

/// Completion message: one score per cell, `-Infinity` marking unplayable
/// positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub scores: Vec<f32>,
}

/// Alpha-beta search runner exposed to the JavaScript surface. Meant to live
/// inside a worker context: `search` is async so completion arrives as a
/// one-shot promise resolution instead of blocking the caller. Nothing here
/// cancels or deduplicates requests — a dispatched search always runs to the
/// end, and overlapping requests are the caller's problem.
#[wasm_bindgen]
pub struct DecayMinimax {
    rng: SmallRng,
}

#[wasm_bindgen]
impl DecayMinimax {
    #[wasm_bindgen(constructor)]
    pub fn new() -> DecayMinimax {
        DecayMinimax {
            rng: SmallRng::from_entropy(),
        }
    }

    /// Reseed the tie-break RNG for reproducible move picks.
    #[wasm_bindgen(js_name = setSeed)]
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    /// Run a search for `{ currentPlayer, maxDepth, board }` and resolve with
    /// `{ scores }`. The request board is a private copy; the caller's board
    /// is never touched.
    #[wasm_bindgen(js_name = search)]
    pub async fn search(&mut self, request: JsValue) -> Result<JsValue, JsValue> {
        let request: SearchRequest = serde_wasm_bindgen::from_value(request)?;
        let mut board = request.board;
        let scores = search(request.current_player, request.max_depth, &mut board);
        let response = SearchResponse {
            scores: scores.to_vec(),
        };
        serde_wasm_bindgen::to_value(&response).map_err(JsValue::from)
    }

    /// Choose a move from a `scores` array, breaking ties with the runner's
    /// RNG. Returns `undefined` when no position is playable.
    #[wasm_bindgen(js_name = pickMove)]
    pub fn pick_move(&mut self, scores: Vec<f32>) -> Result<Option<u8>, JsValue> {
        let scores: [f32; CELL_COUNT] = scores
            .try_into()
            .map_err(|_| JsValue::from_str("scores must contain 9 entries"))?;
        Ok(pick_move(&scores, &mut self.rng).map(|position| position as u8))
    }
}
