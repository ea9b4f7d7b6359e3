//! Defines the core logic-grid types.
//!
//! Among these are:
//!
//! - Pos and Dims: locations within a rectangular grid, and its shape
//! - Grid: a rectangular table of cell states
//! - Clue and ClueSet: player-visible hints anchored at locations
//! - region helpers for 4-connectivity

mod clue;
mod grid;
mod pos;
pub mod region;

pub use clue::*;
pub use grid::*;
pub use pos::*;

use thiserror::Error;

/// Contract violations detected when building grids, layouts, and clue
/// sets.  These indicate a caller bug, not an expected search outcome.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum ShapeError {
  #[error("grid must have at least one row and one column, got {rows}x{cols}")]
  Empty { rows: usize, cols: usize },
  #[error("expected {expected} cells for the grid, got {actual}")]
  CellCount { expected: usize, actual: usize },
  #[error("{pos} lies outside a {dims} grid")]
  OutOfBounds { pos: Pos, dims: Dims },
  #[error("more than one clue at {pos}")]
  DuplicateClue { pos: Pos },
  #[error("room {room} is not 4-connected")]
  DisconnectedRoom { room: u16 },
  #[error("room ids must run from 0 without gaps; room {room} is empty")]
  MissingRoom { room: u16 },
  #[error("unrecognized {what}: `{label}`")]
  Label { what: &'static str, label: String },
}
