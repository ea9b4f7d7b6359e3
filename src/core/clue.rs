//! Defines clues and the ordered, shrink-only collections of them that make
//! up a puzzle.

use serde::{Deserialize, Serialize};

use super::*;

/// A player-visible hint: a value anchored at a location.  Clues are only
/// ever derived from a solved grid, never authored independently.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Clue<V> {
  pub pos: Pos,
  pub value: V,
}

impl<V> Clue<V> {
  pub fn new(pos: Pos, value: V) -> Self {
    Clue { pos, value }
  }
}

/// The currently active clues of a puzzle, in the order they were
/// extracted.  At most one clue per location.  A ClueSet only ever shrinks:
/// a clue can be taken out and put back where it was, but never added.
/// Deserializes from a plain list of clues, through `ClueSet::new`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(try_from = "Vec<Clue<V>>", bound(deserialize = "V: Deserialize<'de>"))]
pub struct ClueSet<V>(Vec<Clue<V>>);

impl<V> ClueSet<V> {
  /// Makes a clue set from clues in extraction order.  Fails if two clues
  /// share a location.
  pub fn new(clues: Vec<Clue<V>>) -> Result<Self, ShapeError> {
    for (i, clue) in clues.iter().enumerate() {
      if clues[..i].iter().any(|c| c.pos == clue.pos) {
        return Err(ShapeError::DuplicateClue { pos: clue.pos });
      }
    }
    Ok(ClueSet(clues))
  }

  /// The clue set with no clues.
  pub fn empty() -> Self {
    ClueSet(Vec::new())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &Clue<V>> {
    self.0.iter()
  }

  /// The locations of the clues, in order.
  pub fn positions(&self) -> Vec<Pos> {
    self.0.iter().map(|c| c.pos).collect()
  }

  /// The clue at `pos`, if there is one.
  pub fn get(&self, pos: Pos) -> Option<&V> {
    self.0.iter().find(|c| c.pos == pos).map(|c| &c.value)
  }

  /// Removes the clue at `pos`, returning where it sat and the clue itself,
  /// so that `restore` can put it back exactly.
  pub fn take(&mut self, pos: Pos) -> Option<(usize, Clue<V>)> {
    let index = self.0.iter().position(|c| c.pos == pos)?;
    Some((index, self.0.remove(index)))
  }

  /// Undoes a `take`.
  pub fn restore(&mut self, index: usize, clue: Clue<V>) {
    debug_assert!(self.get(clue.pos).is_none());
    self.0.insert(index, clue);
  }

  /// Checks that every clue lies inside a grid of the given shape.
  pub fn check_bounds(&self, dims: Dims) -> Result<(), ShapeError> {
    match self.0.iter().find(|c| !dims.contains(c.pos)) {
      Some(c) => Err(ShapeError::OutOfBounds { pos: c.pos, dims }),
      None => Ok(()),
    }
  }

  /// Renders the clues as a grid, absent where there is no clue.
  pub fn to_grid(&self, dims: Dims) -> Grid<Option<V>>
  where
    V: Clone,
  {
    let mut grid = Grid::filled(dims, None);
    for clue in &self.0 {
      grid[clue.pos] = Some(clue.value.clone());
    }
    grid
  }
}

impl<V> TryFrom<Vec<Clue<V>>> for ClueSet<V> {
  type Error = ShapeError;

  fn try_from(clues: Vec<Clue<V>>) -> Result<Self, ShapeError> {
    ClueSet::new(clues)
  }
}

impl<V> Default for ClueSet<V> {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> ClueSet<u8> {
    ClueSet::new(vec![
      Clue::new(Pos::new(0, 0), 1),
      Clue::new(Pos::new(0, 2), 3),
      Clue::new(Pos::new(1, 1), 2),
    ])
    .unwrap()
  }

  #[test]
  fn take_and_restore_leave_set_unchanged() {
    let original = sample();
    let mut clues = original.clone();
    let (index, clue) = clues.take(Pos::new(0, 2)).unwrap();
    assert_eq!(1, index);
    assert_eq!(2, clues.len());
    assert_eq!(None, clues.get(Pos::new(0, 2)));
    clues.restore(index, clue);
    assert_eq!(original, clues);
  }

  #[test]
  fn take_missing_is_none() {
    let mut clues = sample();
    assert_eq!(None, clues.take(Pos::new(2, 2)));
  }

  #[test]
  fn duplicates_are_rejected() {
    assert!(ClueSet::new(vec![Clue::new(Pos::new(0, 0), 1), Clue::new(Pos::new(0, 0), 2)]).is_err());
  }

  #[test]
  fn bounds() {
    let clues = sample();
    assert!(clues.check_bounds(Dims::new(2, 3)).is_ok());
    assert_eq!(
      Err(ShapeError::OutOfBounds {
        pos: Pos::new(0, 2),
        dims: Dims::new(2, 2)
      }),
      clues.check_bounds(Dims::new(2, 2))
    );
  }

  #[test]
  fn to_grid_marks_absent_cells() {
    let grid = sample().to_grid(Dims::new(2, 3));
    assert_eq!(Some(3), grid[Pos::new(0, 2)]);
    assert_eq!(None, grid[Pos::new(1, 0)]);
  }

  #[test]
  fn deserializing_rejects_duplicates() {
    let json = serde_json::to_string(&sample()).unwrap();
    assert_eq!(sample(), serde_json::from_str::<ClueSet<u8>>(&json).unwrap());

    let twice = vec![Clue::new(Pos::new(1, 1), 2u8), Clue::new(Pos::new(1, 1), 3)];
    let json = serde_json::to_string(&twice).unwrap();
    assert!(serde_json::from_str::<ClueSet<u8>>(&json).is_err());
  }
}
