//! Core domain types for the connection game.

use crate::error::MoveError;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// A seat at the board. Player 1 always sits in `One` and moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Seat {
    /// First player (cell value 1).
    One,
    /// Second player (cell value 2).
    Two,
}

impl Seat {
    /// Returns the other seat.
    pub fn opponent(self) -> Self {
        match self {
            Seat::One => Seat::Two,
            Seat::Two => Seat::One,
        }
    }

    /// Numeric cell value for this seat.
    pub fn value(self) -> u8 {
        match self {
            Seat::One => 1,
            Seat::Two => 2,
        }
    }
}

/// A cell on the board.
///
/// Serialized as the small integer used on the wire: `0` empty, `1`/`2`
/// for the occupying seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Cell {
    /// Empty cell.
    Empty,
    /// Cell occupied by a seat.
    Occupied(Seat),
}

impl Cell {
    /// Numeric value of the cell (0, 1 or 2).
    pub fn value(self) -> u8 {
        match self {
            Cell::Empty => 0,
            Cell::Occupied(seat) => seat.value(),
        }
    }

    /// Returns true if the cell is occupied by `seat`.
    pub fn is(self, seat: Seat) -> bool {
        self == Cell::Occupied(seat)
    }
}

impl From<Cell> for u8 {
    fn from(cell: Cell) -> Self {
        cell.value()
    }
}

impl TryFrom<u8> for Cell {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Cell::Empty),
            1 => Ok(Cell::Occupied(Seat::One)),
            2 => Ok(Cell::Occupied(Seat::Two)),
            other => Err(format!("Invalid cell value {}", other)),
        }
    }
}

/// Board dimensions and win threshold for one game variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectRules {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Contiguous discs needed to win.
    pub connect: usize,
}

impl ConnectRules {
    /// The reference game: 6x6, four in a row.
    pub const STANDARD: ConnectRules = ConnectRules {
        rows: 6,
        cols: 6,
        connect: 4,
    };

    /// Upper bound on either board dimension.
    pub const MAX_DIMENSION: usize = 64;

    /// Checks that the rules describe a playable board.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.rows == 0 || self.cols == 0 {
            return Err("Board must have at least one row and one column");
        }
        if self.rows > Self::MAX_DIMENSION || self.cols > Self::MAX_DIMENSION {
            return Err("Board dimension exceeds the supported maximum");
        }
        if self.connect < 2 {
            return Err("Connect threshold must be at least 2");
        }
        if self.connect > self.rows.max(self.cols) {
            return Err("Connect threshold cannot exceed the longest board side");
        }
        Ok(())
    }
}

impl Default for ConnectRules {
    fn default() -> Self {
        Self::STANDARD
    }
}

/// Fixed-size gravity grid.
///
/// Cells are stored row-major. Row 0 is the top row, row `rows - 1` the
/// bottom row where the first disc of every column lands.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBoard")]
pub struct Board {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

/// Serialized board before its shape is checked.
#[derive(Deserialize)]
struct RawBoard {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl TryFrom<RawBoard> for Board {
    type Error = String;

    fn try_from(raw: RawBoard) -> Result<Self, Self::Error> {
        let max = ConnectRules::MAX_DIMENSION;
        if raw.rows == 0 || raw.cols == 0 || raw.rows > max || raw.cols > max {
            return Err(format!(
                "Board {}x{} is outside 1..={} per side",
                raw.rows, raw.cols, max
            ));
        }
        if raw.cells.len() != raw.rows * raw.cols {
            return Err(format!(
                "Board {}x{} needs {} cells, got {}",
                raw.rows,
                raw.cols,
                raw.rows * raw.cols,
                raw.cells.len()
            ));
        }
        Ok(Self {
            rows: raw.rows,
            cols: raw.cols,
            cells: raw.cells,
        })
    }
}

impl Board {
    /// Creates an empty board.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![Cell::Empty; rows * cols],
        }
    }

    /// Creates an empty 6x6 board.
    pub fn standard() -> Self {
        Self::for_rules(&ConnectRules::STANDARD)
    }

    /// Creates an empty board sized for `rules`.
    pub fn for_rules(rules: &ConnectRules) -> Self {
        Self::new(rules.rows, rules.cols)
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Gets the cell at `(row, col)`, or `None` outside the board.
    pub fn cell(&self, row: usize, col: usize) -> Option<Cell> {
        if row < self.rows && col < self.cols {
            Some(self.cells[self.index(row, col)])
        } else {
            None
        }
    }

    /// Numeric value at `(row, col)`: 0 empty, 1 or 2 occupied.
    ///
    /// Bounds are the caller's responsibility; positions outside the
    /// board read as empty.
    pub fn value_at(&self, row: usize, col: usize) -> u8 {
        self.cell(row, col).map(Cell::value).unwrap_or(0)
    }

    /// Number of discs in a column.
    pub fn column_height(&self, col: usize) -> usize {
        (0..self.rows)
            .filter(|&row| self.cell(row, col).is_some_and(|c| c != Cell::Empty))
            .count()
    }

    /// Number of discs belonging to `seat`.
    pub fn count(&self, seat: Seat) -> usize {
        self.cells.iter().filter(|c| c.is(seat)).count()
    }

    /// Number of discs on the board.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| **c != Cell::Empty).count()
    }

    /// Drops a disc for `seat` into `column` and returns the row it landed on.
    ///
    /// The disc occupies the lowest empty cell of the column.
    ///
    /// # Errors
    ///
    /// - [`MoveError::InvalidColumn`] if `column` is not on the board
    /// - [`MoveError::ColumnFull`] if the column has no empty cell
    #[instrument(level = "debug", skip(self), fields(rows = self.rows, cols = self.cols))]
    pub fn drop_into_column(&mut self, column: usize, seat: Seat) -> Result<usize, MoveError> {
        if column >= self.cols {
            return Err(MoveError::InvalidColumn {
                column,
                columns: self.cols,
            });
        }

        for row in (0..self.rows).rev() {
            let idx = self.index(row, column);
            if self.cells[idx] == Cell::Empty {
                self.cells[idx] = Cell::Occupied(seat);
                debug!(row, "Disc placed");
                return Ok(row);
            }
        }

        Err(MoveError::ColumnFull { column })
    }

    /// Checks if the top row has no empty cell.
    pub fn is_full(&self) -> bool {
        crate::rules::is_full(self)
    }

    /// Checks if the disc at `(last_row, last_col)` completes a run of
    /// `connect` discs for `seat`.
    pub fn check_win(&self, seat: Seat, last_row: usize, last_col: usize, connect: usize) -> bool {
        crate::rules::check_win(self, seat, last_row, last_col, connect)
    }

    /// Returns true if some occupied cell sits above an empty cell.
    pub fn has_floating_disc(&self) -> bool {
        (0..self.cols).any(|col| {
            (0..self.rows.saturating_sub(1)).any(|row| {
                self.cells[self.index(row, col)] != Cell::Empty
                    && self.cells[self.index(row + 1, col)] == Cell::Empty
            })
        })
    }

    /// Formats the board as text, top row first.
    pub fn display(&self) -> String {
        let mut result = String::new();
        for row in 0..self.rows {
            for col in 0..self.cols {
                let symbol = match self.cells[self.index(row, col)] {
                    Cell::Empty => '.',
                    Cell::Occupied(Seat::One) => 'X',
                    Cell::Occupied(Seat::Two) => 'O',
                };
                result.push(symbol);
                if col + 1 < self.cols {
                    result.push(' ');
                }
            }
            result.push('\n');
        }
        for col in 0..self.cols {
            result.push_str(&(col % 10).to_string());
            if col + 1 < self.cols {
                result.push(' ');
            }
        }
        result
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_board_is_empty() {
        let board = Board::standard();
        assert_eq!(board.rows(), 6);
        assert_eq!(board.cols(), 6);
        assert!(board.cells().iter().all(|c| *c == Cell::Empty));
    }

    #[test]
    fn test_first_disc_lands_on_bottom_row() {
        let mut board = Board::standard();
        let row = board.drop_into_column(2, Seat::One).unwrap();
        assert_eq!(row, 5);
        assert_eq!(board.value_at(5, 2), 1);
    }

    #[test]
    fn test_discs_stack_upward() {
        let mut board = Board::standard();
        assert_eq!(board.drop_into_column(0, Seat::One), Ok(5));
        assert_eq!(board.drop_into_column(0, Seat::Two), Ok(4));
        assert_eq!(board.drop_into_column(0, Seat::One), Ok(3));
        assert_eq!(board.value_at(4, 0), 2);
        assert_eq!(board.column_height(0), 3);
    }

    #[test]
    fn test_invalid_column_rejected() {
        let mut board = Board::standard();
        let before = board.clone();
        assert_eq!(
            board.drop_into_column(6, Seat::One),
            Err(MoveError::InvalidColumn {
                column: 6,
                columns: 6
            })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_full_column_rejected() {
        let mut board = Board::new(3, 2);
        for _ in 0..3 {
            board.drop_into_column(1, Seat::Two).unwrap();
        }
        let before = board.clone();
        assert_eq!(
            board.drop_into_column(1, Seat::One),
            Err(MoveError::ColumnFull { column: 1 })
        );
        assert_eq!(board, before);
    }

    #[test]
    fn test_cell_out_of_bounds() {
        let board = Board::new(2, 3);
        assert_eq!(board.cell(2, 0), None);
        assert_eq!(board.cell(0, 3), None);
        assert_eq!(board.value_at(9, 9), 0);
    }

    #[test]
    fn test_cell_values() {
        let mut board = Board::new(1, 2);
        board.drop_into_column(1, Seat::Two).unwrap();
        let values: Vec<u8> = board.cells().iter().map(|c| u8::from(*c)).collect();
        assert_eq!(values, vec![0, 2]);
    }

    #[test]
    fn test_cell_try_from_rejects_unknown_value() {
        assert!(Cell::try_from(3).is_err());
        assert_eq!(Cell::try_from(1), Ok(Cell::Occupied(Seat::One)));
    }

    #[test]
    fn test_rules_validation() {
        assert!(ConnectRules::STANDARD.validate().is_ok());
        let bad = ConnectRules {
            rows: 3,
            cols: 3,
            connect: 4,
        };
        assert!(bad.validate().is_err());
        let empty = ConnectRules {
            rows: 0,
            cols: 4,
            connect: 2,
        };
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_floating_disc_detection() {
        let mut board = Board::new(3, 1);
        assert!(!board.has_floating_disc());
        board.drop_into_column(0, Seat::One).unwrap();
        assert!(!board.has_floating_disc());
        board.cells[0] = Cell::Occupied(Seat::Two);
        assert!(board.has_floating_disc());
    }

    #[test]
    fn test_display_marks_seats() {
        let mut board = Board::new(2, 2);
        board.drop_into_column(0, Seat::One).unwrap();
        board.drop_into_column(1, Seat::Two).unwrap();
        assert_eq!(board.display(), ". .\nX O\n0 1");
    }

    #[test]
    fn test_deserialize_checks_shape() {
        let mut board = Board::new(2, 3);
        board.drop_into_column(1, Seat::Two).unwrap();
        let json = serde_json::to_string(&board).unwrap();
        assert_eq!(serde_json::from_str::<Board>(&json).unwrap(), board);

        let short = r#"{"rows":6,"cols":6,"cells":[0,0,0]}"#;
        let err = serde_json::from_str::<Board>(short).unwrap_err();
        assert!(err.to_string().contains("needs 36 cells"));

        let huge = r#"{"rows":100,"cols":1,"cells":[]}"#;
        assert!(serde_json::from_str::<Board>(huge).is_err());
        let empty = r#"{"rows":0,"cols":0,"cells":[]}"#;
        assert!(serde_json::from_str::<Board>(empty).is_err());
    }
}
