//! Defines the Grid type, a rectangular table of cell states.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

use super::*;

/// A rectangular grid with one `T` per location, stored in row-major order.
/// The dimensions are fixed when the grid is made.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Grid<T> {
  rows: usize,
  cols: usize,
  cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
  /// Makes a grid with every location holding a copy of `value`.
  pub fn filled(dims: Dims, value: T) -> Grid<T> {
    Grid {
      rows: dims.rows,
      cols: dims.cols,
      cells: vec![value; dims.area()],
    }
  }
}

impl<T> Grid<T> {
  /// Makes a grid from row-major cells, checking that the shape is sane.
  pub fn from_cells(dims: Dims, cells: Vec<T>) -> Result<Grid<T>, ShapeError> {
    if dims.rows == 0 || dims.cols == 0 {
      return Err(ShapeError::Empty {
        rows: dims.rows,
        cols: dims.cols,
      });
    }
    if cells.len() != dims.area() {
      return Err(ShapeError::CellCount {
        expected: dims.area(),
        actual: cells.len(),
      });
    }
    Ok(Grid {
      rows: dims.rows,
      cols: dims.cols,
      cells,
    })
  }

  /// Parses a grid from text: one line per row, one character per cell,
  /// with leading/trailing whitespace and blank lines ignored.  `parse_cell`
  /// maps each character to a cell, or `None` to reject the text.
  pub fn parse_with(s: &str, parse_cell: impl Fn(char) -> Option<T>) -> Result<Grid<T>, ShapeError> {
    let lines: Vec<&str> = s.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let rows = lines.len();
    let cols = lines.first().map_or(0, |l| l.chars().count());
    let mut cells = Vec::with_capacity(rows * cols);
    for (row, line) in lines.iter().enumerate() {
      let width = line.chars().count();
      if width != cols {
        return Err(ShapeError::CellCount {
          expected: cols,
          actual: width,
        });
      }
      for (col, c) in line.chars().enumerate() {
        let cell = parse_cell(c).ok_or_else(|| ShapeError::Label {
          what: "cell character",
          label: format!("{c} at {}", Pos::new(row, col)),
        })?;
        cells.push(cell);
      }
    }
    Grid::from_cells(Dims::new(rows, cols), cells)
  }

  pub fn dims(&self) -> Dims {
    Dims::new(self.rows, self.cols)
  }

  pub fn rows(&self) -> usize {
    self.rows
  }

  pub fn cols(&self) -> usize {
    self.cols
  }

  /// The cell at `pos`, or `None` when it's outside the grid.
  pub fn get(&self, pos: Pos) -> Option<&T> {
    if self.dims().contains(pos) {
      self.cells.get(pos.index(self.dims()))
    } else {
      None
    }
  }

  /// Iterates the cells together with their locations, in row-major order.
  pub fn iter(&self) -> impl Iterator<Item = (Pos, &T)> {
    let dims = self.dims();
    self.cells.iter().enumerate().map(move |(i, cell)| (dims.pos(i), cell))
  }

  /// The cells in row-major order.
  pub fn cells(&self) -> &[T] {
    &self.cells
  }

  /// Makes a same-shaped grid by transforming every cell.
  pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Grid<U> {
    Grid {
      rows: self.rows,
      cols: self.cols,
      cells: self.cells.iter().map(f).collect(),
    }
  }
}

impl<T> Index<Pos> for Grid<T> {
  type Output = T;

  /// Allows grids to be indexed by `Pos`.  Panics when `pos` is outside the
  /// grid, which is a contract violation by the caller.
  fn index(&self, pos: Pos) -> &T {
    assert!(self.dims().contains(pos), "{pos} outside {} grid", self.dims());
    &self.cells[pos.index(self.dims())]
  }
}

impl<T> IndexMut<Pos> for Grid<T> {
  fn index_mut(&mut self, pos: Pos) -> &mut T {
    let dims = self.dims();
    assert!(dims.contains(pos), "{pos} outside {dims} grid");
    &mut self.cells[pos.index(dims)]
  }
}

impl<T: fmt::Display> fmt::Display for Grid<T> {
  /// Prints one line per row, cells separated by spaces.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, row) in self.cells.chunks(self.cols).enumerate() {
      if i > 0 {
        f.write_str("\n")?;
      }
      for (j, cell) in row.iter().enumerate() {
        if j > 0 {
          f.write_str(" ")?;
        }
        cell.fmt(f)?;
      }
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn shape_is_checked() {
    assert_eq!(
      Err(ShapeError::CellCount {
        expected: 6,
        actual: 5
      }),
      Grid::from_cells(Dims::new(2, 3), vec![0; 5])
    );
    assert_eq!(
      Err(ShapeError::Empty { rows: 0, cols: 3 }),
      Grid::<u8>::from_cells(Dims::new(0, 3), vec![])
    );
  }

  #[test]
  fn parse_and_index() {
    let g = Grid::parse_with(
      r"
        ab
        cd
        ef",
      |c| Some(c as u8 - b'a'),
    )
    .unwrap();
    assert_eq!(Dims::new(3, 2), g.dims());
    assert_eq!(3, g[Pos::new(1, 1)]);
    assert_eq!(Some(&4), g.get(Pos::new(2, 0)));
    assert_eq!(None, g.get(Pos::new(3, 0)));
    assert_eq!("0 1\n2 3\n4 5", g.to_string());
  }

  #[test]
  fn parse_rejects_bad_characters() {
    assert!(Grid::parse_with("a?", |c| (c == 'a').then_some(())).is_err());
  }

  #[test]
  fn map_keeps_shape() {
    let mut g = Grid::filled(Dims::new(2, 2), 1u8);
    g[Pos::new(0, 1)] = 7;
    let doubled = g.map(|&v| u16::from(v) * 2);
    assert_eq!(doubled.dims(), g.dims());
    assert_eq!(14, doubled[Pos::new(0, 1)]);
  }

  #[test]
  #[should_panic(expected = "outside")]
  fn index_out_of_bounds_panics() {
    let g = Grid::filled(Dims::new(2, 2), 0u8);
    let _ = g[Pos::new(2, 0)];
  }
}
