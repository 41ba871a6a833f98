//! Core types and utilities for chess-diagram recognition.
//!
//! This crate is intentionally small and purely computational. It knows how
//! to convert between images, score tensors, and board states, but does
//! *not* depend on any inference runtime.

mod augment;
mod board;
mod geometry;
mod logger;
mod tensor;

pub use augment::{augment, augment_with, AugmentParams};
pub use board::{
    board_to_tensor, decode_board_tensor, flip_color_channels, normalize_fen, piece_channel,
    rotate_board, rotate_board_tensor, BoardState, OCC_CHANNELS,
};
pub use geometry::{crop, pad, BoundingBox};
pub use tensor::{
    all_finite, default_transform, invert_polarity, min_max_mean_normalize, resize_bilinear,
    to_rgb_tensor,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;

/// Board side length in squares.
pub const BOARD_SIZE: usize = 8;
