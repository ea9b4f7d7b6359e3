//! Defines the Pos and Dims types, which identify the locations of a grid
//! and the grid's shape.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one location (or square, or cell) of a grid by row and column,
/// both counted from the top left.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Pos {
  pub row: usize,
  pub col: usize,
}

/// The four orthogonal directions, as (row, column) deltas.
pub const ORTHOGONAL: [(isize, isize); 4] = [(-1, 0), (0, 1), (1, 0), (0, -1)];

/// The eight surrounding cells, clockwise from the top left.
pub const RING: [(isize, isize); 8] = [
  (-1, -1),
  (-1, 0),
  (-1, 1),
  (0, 1),
  (1, 1),
  (1, 0),
  (1, -1),
  (0, -1),
];

impl Pos {
  pub const fn new(row: usize, col: usize) -> Pos {
    Pos { row, col }
  }

  /// Row-major index of this location within a grid of the given shape.
  pub const fn index(self, dims: Dims) -> usize {
    self.row * dims.cols + self.col
  }

  /// The location displaced by the given deltas, if it's still inside
  /// `dims`.
  pub fn offset(self, dr: isize, dc: isize, dims: Dims) -> Option<Pos> {
    let row = self.row.checked_add_signed(dr)?;
    let col = self.col.checked_add_signed(dc)?;
    let pos = Pos { row, col };
    dims.contains(pos).then_some(pos)
  }
}

impl fmt::Display for Pos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.row, self.col)
  }
}

/// The shape of a grid.  Never changes once a grid has been made.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Dims {
  pub rows: usize,
  pub cols: usize,
}

impl Dims {
  pub const fn new(rows: usize, cols: usize) -> Dims {
    Dims { rows, cols }
  }

  /// The number of cells in a grid of this shape.
  pub const fn area(self) -> usize {
    self.rows * self.cols
  }

  pub const fn contains(self, pos: Pos) -> bool {
    pos.row < self.rows && pos.col < self.cols
  }

  /// The location with the given row-major index.
  pub const fn pos(self, index: usize) -> Pos {
    Pos {
      row: index / self.cols,
      col: index % self.cols,
    }
  }

  /// Iterates all locations in row-major order.
  pub fn positions(self) -> impl Iterator<Item = Pos> {
    (0..self.area()).map(move |i| self.pos(i))
  }

  /// The in-bounds orthogonal neighbors of `pos`.
  pub fn neighbors(self, pos: Pos) -> impl Iterator<Item = Pos> {
    ORTHOGONAL
      .into_iter()
      .filter_map(move |(dr, dc)| pos.offset(dr, dc, self))
  }

  /// The 8-neighbor ring around `pos`, clockwise from the top left, with
  /// `None` for slots that fall off the grid.
  pub fn ring(self, pos: Pos) -> [Option<Pos>; 8] {
    RING.map(|(dr, dc)| pos.offset(dr, dc, self))
  }
}

impl fmt::Display for Dims {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}x{}", self.rows, self.cols)
  }
}
