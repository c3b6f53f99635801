//! Game rules for the connection game.
//!
//! Pure functions over a [`Board`](crate::Board). Rules are kept apart
//! from board storage so the engine can compose them with its own
//! state checks.

pub mod draw;
pub mod win;

pub use draw::{is_draw, is_full};
pub use win::{Direction, check_win, count_in_direction};
