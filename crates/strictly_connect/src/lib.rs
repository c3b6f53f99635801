//! Pure game logic for gravity-drop connection games.
//!
//! Discs fall to the lowest empty cell of a column; a player wins by
//! lining up `connect` discs horizontally, vertically or diagonally.
//! The reference game is a 6x6 board with a connect threshold of 4.
//!
//! This crate has no engine state and no I/O. The board is a plain value
//! so callers can apply a move to a copy and keep the original on error.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod types;

pub mod rules;

pub use error::MoveError;
pub use rules::{Direction, check_win, count_in_direction, is_draw, is_full};
pub use types::{Board, Cell, ConnectRules, Seat};
