//! Board state, FEN emission, and the board/tensor codec.
//!
//! The occupancy tensor is the common currency between the recognition
//! ensemble and the orientation classifier: shape `(13, 8, 8)` with channel 0
//! meaning "empty" and channels 1..=12 the twelve piece/color combinations.
//! Row 0 of the tensor is rank 8 (the top of the diagram), column 0 is file a.

use ndarray::{Array3, Axis};
use shakmaty::{Bitboard, Board, Color, File, Piece, Rank, Role, Square};

use crate::BOARD_SIZE;

/// Number of per-square classes: empty + 6 white + 6 black.
pub const OCC_CHANNELS: usize = 13;

const ROLES: [Role; 6] = [
    Role::Pawn,
    Role::Knight,
    Role::Bishop,
    Role::Rook,
    Role::Queen,
    Role::King,
];

/// Tensor channel for a piece. Channel 0 is reserved for "empty".
pub fn piece_channel(piece: Piece) -> usize {
    let role = ROLES.iter().position(|&r| r == piece.role).unwrap_or(0);
    if piece.color == Color::White {
        1 + role
    } else {
        7 + role
    }
}

fn channel_piece(channel: usize) -> Option<Piece> {
    match channel {
        1..=6 => Some(Piece {
            color: Color::White,
            role: ROLES[channel - 1],
        }),
        7..=12 => Some(Piece {
            color: Color::Black,
            role: ROLES[channel - 7],
        }),
        _ => None,
    }
}

/// A decoded board position plus the metadata needed to emit a full FEN.
///
/// Nothing beyond piece placement can be inferred from a still diagram, so
/// side to move defaults to white and castling rights to whatever is still
/// geometrically plausible (rook and king on their home squares).
#[derive(Clone, Debug, PartialEq)]
pub struct BoardState {
    board: Board,
    turn: Color,
}

impl BoardState {
    /// Board with no pieces.
    pub fn empty() -> Self {
        Self {
            board: Board::empty(),
            turn: Color::White,
        }
    }

    /// Standard starting position.
    pub fn starting() -> Self {
        Self {
            board: Board::new(),
            turn: Color::White,
        }
    }

    pub fn from_board(board: Board) -> Self {
        Self {
            board,
            turn: Color::White,
        }
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn turn(&self) -> Color {
        self.turn
    }

    /// Override the side to move.
    ///
    /// Callers typically derive this from an external hint (filename or
    /// request parameter), never from the image itself.
    pub fn with_side_to_move(mut self, turn: Color) -> Self {
        self.turn = turn;
        self
    }

    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.piece_at(square)
    }

    pub fn set_piece_at(&mut self, square: Square, piece: Piece) {
        self.board.set_piece_at(square, piece);
    }

    /// Number of occupied squares. More than 32 is suspicious but allowed;
    /// a noisy recognition is a soft result, not an error.
    pub fn occupied_count(&self) -> usize {
        self.board.occupied().count()
    }

    /// Full FEN string for this position.
    pub fn fen(&self) -> String {
        let mut setup = shakmaty::Setup::empty();
        setup.board = self.board.clone();
        setup.turn = self.turn;
        setup.castling_rights = plausible_castling_rights(&self.board);
        shakmaty::fen::Fen(setup).to_string()
    }
}

/// Castling rights consistent with the piece placement: a corner counts only
/// while the rook and the matching king still sit on their home squares.
fn plausible_castling_rights(board: &Board) -> Bitboard {
    let mut rights = Bitboard::EMPTY;
    let rook = |color| Piece {
        color,
        role: Role::Rook,
    };
    if board.king_of(Color::White) == Some(Square::E1) {
        for corner in [Square::A1, Square::H1] {
            if board.piece_at(corner) == Some(rook(Color::White)) {
                rights.add(corner);
            }
        }
    }
    if board.king_of(Color::Black) == Some(Square::E8) {
        for corner in [Square::A8, Square::H8] {
            if board.piece_at(corner) == Some(rook(Color::Black)) {
                rights.add(corner);
            }
        }
    }
    rights
}

fn square_at(row: usize, col: usize) -> Square {
    Square::from_coords(File::new(col as u32), Rank::new(7 - row as u32))
}

/// One-hot occupancy tensor for a board state.
pub fn board_to_tensor(state: &BoardState) -> Array3<f32> {
    let mut tensor = Array3::zeros((OCC_CHANNELS, BOARD_SIZE, BOARD_SIZE));
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            let channel = state
                .piece_at(square_at(row, col))
                .map_or(0, piece_channel);
            tensor[[channel, row, col]] = 1.0;
        }
    }
    tensor
}

/// Decode an (accumulated) occupancy tensor by per-square argmax.
///
/// Only the relative order of the scores within a square matters, so a
/// running sum over ensemble tries needs no renormalization before decoding.
pub fn decode_board_tensor(tensor: &Array3<f32>) -> BoardState {
    debug_assert_eq!(tensor.dim(), (OCC_CHANNELS, BOARD_SIZE, BOARD_SIZE));
    let mut state = BoardState::empty();
    for row in 0..BOARD_SIZE {
        for col in 0..BOARD_SIZE {
            let mut best = 0usize;
            let mut best_score = tensor[[0, row, col]];
            for channel in 1..OCC_CHANNELS {
                let score = tensor[[channel, row, col]];
                if score > best_score {
                    best = channel;
                    best_score = score;
                }
            }
            if let Some(piece) = channel_piece(best) {
                state.set_piece_at(square_at(row, col), piece);
            }
        }
    }
    state
}

/// Rotate an occupancy tensor by 180 degrees (square `(r, c)` maps to
/// `(7 - r, 7 - c)`). Involution.
pub fn rotate_board_tensor(mut tensor: Array3<f32>) -> Array3<f32> {
    tensor.invert_axis(Axis(1));
    tensor.invert_axis(Axis(2));
    tensor
}

/// Rotate a decoded board by 180 degrees.
///
/// This flips the logical board, not pixels; it is applied when the
/// orientation classifier decides the diagram was drawn from black's side.
pub fn rotate_board(state: &BoardState) -> BoardState {
    decode_board_tensor(&rotate_board_tensor(board_to_tensor(state))).with_side_to_move(state.turn())
}

/// Swap the white and black piece channels of a score tensor.
///
/// Used to undo the polarity inversion of a color-flipped ensemble try so
/// that flipped and unflipped tries vote on the same color semantics.
/// Involution: applying it twice returns the input exactly.
pub fn flip_color_channels(tensor: &Array3<f32>) -> Array3<f32> {
    let mut out = tensor.clone();
    for role in 0..6 {
        let white = tensor.index_axis(Axis(0), 1 + role);
        let black = tensor.index_axis(Axis(0), 7 + role);
        out.index_axis_mut(Axis(0), 1 + role).assign(&black);
        out.index_axis_mut(Axis(0), 7 + role).assign(&white);
    }
    out
}

/// Normalize a board-only FEN spelled with `-` or `/` rank separators.
///
/// Dataset files and batch callers encode the ground-truth position in the
/// filename, where slashes are not available. Returns `None` when the string
/// is not a valid eight-rank placement.
pub fn normalize_fen(raw: &str) -> Option<String> {
    let board_part = raw.split_whitespace().next()?.replace('-', "/");
    let ranks: Vec<&str> = board_part.split('/').collect();
    if ranks.len() != 8 {
        return None;
    }
    for rank in &ranks {
        let mut files = 0u32;
        for ch in rank.chars() {
            match ch {
                '1'..='8' => files += ch.to_digit(10)?,
                'p' | 'n' | 'b' | 'r' | 'q' | 'k' | 'P' | 'N' | 'B' | 'R' | 'Q' | 'K' => files += 1,
                _ => return None,
            }
        }
        if files != 8 {
            return None;
        }
    }
    Some(board_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_position_fen() {
        let fen = BoardState::starting().fen();
        assert_eq!(
            fen,
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn sparse_board_fen_has_no_castling() {
        let mut state = BoardState::empty();
        state.set_piece_at(
            Square::E4,
            Piece {
                color: Color::White,
                role: Role::King,
            },
        );
        state.set_piece_at(
            Square::A8,
            Piece {
                color: Color::Black,
                role: Role::King,
            },
        );
        assert_eq!(state.fen(), "k7/8/8/8/4K3/8/8/8 w - - 0 1");
    }

    #[test]
    fn side_to_move_override() {
        let state = BoardState::starting().with_side_to_move(Color::Black);
        assert!(state.fen().contains(" b "));
    }

    #[test]
    fn tensor_codec_roundtrip() {
        let state = BoardState::starting();
        let decoded = decode_board_tensor(&board_to_tensor(&state));
        assert_eq!(decoded, state);
    }

    #[test]
    fn board_rotation_is_involution() {
        let mut state = BoardState::empty();
        state.set_piece_at(
            Square::B7,
            Piece {
                color: Color::White,
                role: Role::Queen,
            },
        );
        state.set_piece_at(
            Square::G1,
            Piece {
                color: Color::Black,
                role: Role::Knight,
            },
        );
        assert_eq!(rotate_board(&rotate_board(&state)), state);
    }

    #[test]
    fn board_rotation_maps_opposite_corners() {
        let mut state = BoardState::empty();
        state.set_piece_at(
            Square::A1,
            Piece {
                color: Color::White,
                role: Role::Rook,
            },
        );
        let rotated = rotate_board(&state);
        assert_eq!(
            rotated.piece_at(Square::H8),
            Some(Piece {
                color: Color::White,
                role: Role::Rook,
            })
        );
        assert_eq!(rotated.occupied_count(), 1);
    }

    #[test]
    fn color_flip_is_involution() {
        let mut tensor = Array3::zeros((OCC_CHANNELS, 8, 8));
        let mut value = 0.0f32;
        for channel in 0..OCC_CHANNELS {
            for row in 0..8 {
                for col in 0..8 {
                    tensor[[channel, row, col]] = value;
                    value += 0.01;
                }
            }
        }
        let twice = flip_color_channels(&flip_color_channels(&tensor));
        assert_eq!(twice, tensor);
    }

    #[test]
    fn color_flip_swaps_piece_channels_only() {
        let mut tensor = Array3::zeros((OCC_CHANNELS, 8, 8));
        tensor[[0, 3, 3]] = 0.5;
        tensor[[1, 0, 0]] = 1.0;
        let flipped = flip_color_channels(&tensor);
        assert_eq!(flipped[[0, 3, 3]], 0.5);
        assert_eq!(flipped[[7, 0, 0]], 1.0);
        assert_eq!(flipped[[1, 0, 0]], 0.0);
    }

    #[test]
    fn decode_prefers_highest_score() {
        let mut tensor = Array3::zeros((OCC_CHANNELS, 8, 8));
        tensor.index_axis_mut(Axis(0), 0).fill(0.4);
        // White king on e1: tensor row 7, column 4.
        tensor[[6, 7, 4]] = 0.9;
        let state = decode_board_tensor(&tensor);
        assert_eq!(state.occupied_count(), 1);
        assert_eq!(
            state.piece_at(Square::E1),
            Some(Piece {
                color: Color::White,
                role: Role::King,
            })
        );
    }

    #[test]
    fn normalize_fen_accepts_dashes() {
        assert_eq!(
            normalize_fen("rnbqkbnr-pppppppp-8-8-8-8-PPPPPPPP-RNBQKBNR").as_deref(),
            Some("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR")
        );
    }

    #[test]
    fn normalize_fen_rejects_bad_placements() {
        assert_eq!(normalize_fen("8/8/8"), None);
        assert_eq!(normalize_fen("9/8/8/8/8/8/8/8"), None);
        assert_eq!(normalize_fen("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"), None);
        assert_eq!(normalize_fen("xnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"), None);
    }
}
