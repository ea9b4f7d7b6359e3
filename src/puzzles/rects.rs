//! Rects puzzles: place axis-aligned rectangles on the grid so that no two
//! of them share an edge.  Diagonal contact is fine, and cells outside every
//! rectangle stay empty.
//!
//! Each clue sits in a covered cell and gives the area of the rectangle
//! covering it.  Every rectangle must show at least one clue.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;

use crate::core::*;
use crate::gen::Difficulty;
use crate::random::*;
use crate::rules::*;

/// The state of one cell of a rects grid.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Cover {
  Empty,
  /// Covered by the rectangle with this id.
  Rect(u16),
}

/// A rectangle's extent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Extent {
  pub top: usize,
  pub left: usize,
  pub height: usize,
  pub width: usize,
}

impl Extent {
  pub fn area(&self) -> usize {
    self.height * self.width
  }

  pub fn contains(&self, pos: Pos) -> bool {
    (self.top..self.top + self.height).contains(&pos.row) && (self.left..self.left + self.width).contains(&pos.col)
  }

  pub fn cells(&self) -> impl Iterator<Item = Pos> {
    let cols = self.left..self.left + self.width;
    (self.top..self.top + self.height).cartesian_product(cols).map(|(row, col)| Pos::new(row, col))
  }

  /// The cells just outside the rectangle's edges.
  pub fn border(&self, dims: Dims) -> impl Iterator<Item = Pos> + '_ {
    self
      .cells()
      .flat_map(move |p| dims.neighbors(p).collect_vec())
      .filter(move |&p| !self.contains(p))
      .unique()
  }
}

/// The skeleton of a rects puzzle, which is just its size.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Rects {
  dims: Dims,
}

impl Rects {
  pub fn new(dims: Dims) -> Result<Self, ShapeError> {
    if dims.area() == 0 {
      return Err(ShapeError::Empty {
        rows: dims.rows,
        cols: dims.cols,
      });
    }
    Ok(Rects { dims })
  }

  /// Every rectangle of the given area that contains `pos` and fits the
  /// grid, ordered by height and then by position.
  fn extents_through(&self, pos: Pos, area: usize) -> impl Iterator<Item = Extent> + '_ {
    let dims = self.dims;
    (1..=area.min(dims.rows))
      .filter(move |height| area % height == 0)
      .map(move |height| (height, area / height))
      .filter(move |&(_, width)| width <= dims.cols)
      .flat_map(move |(height, width)| {
        let tops = pos.row.saturating_sub(height - 1)..=pos.row.min(dims.rows - height);
        let lefts = pos.col.saturating_sub(width - 1)..=pos.col.min(dims.cols - width);
        tops.cartesian_product(lefts).map(move |(top, left)| Extent {
          top,
          left,
          height,
          width,
        })
      })
  }
}

/// Counts the cells covered by each rectangle id.
fn areas(grid: &Grid<Cover>) -> HashMap<u16, usize> {
  grid
    .cells()
    .iter()
    .filter_map(|c| match c {
      Cover::Rect(id) => Some(*id),
      Cover::Empty => None,
    })
    .counts()
}

/// Parses a layout drawn with one letter per rectangle and `.` for empty
/// cells.  Ids are assigned in order of first appearance.
pub fn parse_cover(s: &str) -> Result<Grid<Cover>, ShapeError> {
  let labels = Grid::parse_with(s, |c| (c == '.' || c.is_ascii_alphabetic()).then_some(c))?;
  let mut ids = HashMap::new();
  Ok(labels.map(|&c| {
    if c == '.' {
      return Cover::Empty;
    }
    let next = ids.len() as u16;
    Cover::Rect(*ids.entry(c).or_insert(next))
  }))
}

impl Rules for Rects {
  type Cell = Cover;
  type Clue = u32;
  type State<'a> = RectsState<'a>;

  const NAME: &'static str = "rects";

  fn dims(&self) -> Dims {
    self.dims
  }

  /// A rectangle cell may not touch a different rectangle along an edge.
  fn is_locally_valid(&self, grid: &Grid<Option<Cover>>, pos: Pos, value: Cover) -> bool {
    let Cover::Rect(id) = value else {
      return true;
    };
    self
      .dims
      .neighbors(pos)
      .all(|n| !matches!(grid[n], Some(Cover::Rect(other)) if other != id))
  }

  fn is_globally_valid(&self, grid: &Grid<Cover>) -> bool {
    if grid.dims() != self.dims {
      return false;
    }
    let edges_ok = grid.iter().all(|(pos, &c)| match c {
      Cover::Empty => true,
      Cover::Rect(id) => self
        .dims
        .neighbors(pos)
        .all(|n| !matches!(grid[n], Cover::Rect(other) if other != id)),
    });
    if !edges_ok {
      return false;
    }
    // Each id must fill its bounding box exactly.
    let mut bounds: HashMap<u16, (usize, usize, usize, usize)> = HashMap::new();
    for (pos, c) in grid.iter() {
      if let Cover::Rect(id) = c {
        let b = bounds.entry(*id).or_insert((pos.row, pos.row, pos.col, pos.col));
        b.0 = b.0.min(pos.row);
        b.1 = b.1.max(pos.row);
        b.2 = b.2.min(pos.col);
        b.3 = b.3.max(pos.col);
      }
    }
    let areas = areas(grid);
    bounds
      .iter()
      .all(|(id, &(r0, r1, c0, c1))| (r1 - r0 + 1) * (c1 - c0 + 1) == areas[id])
  }

  fn extract_clue(&self, solution: &Grid<Cover>, pos: Pos) -> Option<u32> {
    match solution.get(pos)? {
      Cover::Empty => None,
      Cover::Rect(id) => Some(solution.cells().iter().filter(|&&c| c == Cover::Rect(*id)).count() as u32),
    }
  }

  /// Besides matching every clue, each rectangle must show a clue.
  fn satisfies(&self, grid: &Grid<Cover>, clues: &ClueSet<u32>) -> bool {
    let matches = clues
      .iter()
      .all(|clue| self.extract_clue(grid, clue.pos) == Some(clue.value));
    let mut shown = areas(grid);
    for clue in clues.iter() {
      if let Some(Cover::Rect(id)) = grid.get(clue.pos) {
        shown.remove(id);
      }
    }
    matches && shown.is_empty()
  }

  /// Renumbers the rectangles in row-major order of their first cell.
  fn normalize(&self, grid: Grid<Cover>) -> Grid<Cover> {
    let mut ids = HashMap::new();
    grid.map(|&c| match c {
      Cover::Empty => Cover::Empty,
      Cover::Rect(id) => {
        let next = ids.len() as u16;
        Cover::Rect(*ids.entry(id).or_insert(next))
      }
    })
  }

  fn start<'a>(&'a self, clues: &ClueSet<u32>) -> Option<RectsState<'a>> {
    if clues.iter().any(|clue| clue.value == 0) {
      return None;
    }
    Some(RectsState {
      rules: self,
      cells: Grid::filled(self.dims, None),
      clues: Rc::new(clues.iter().cloned().collect()),
      clue_grid: Rc::new(clues.to_grid(self.dims)),
      covered: vec![false; clues.len()],
      next_id: 0,
    })
  }
}

/// Places a rectangle over an uncovered clue.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Placement {
  pub clue: usize,
  pub extent: Extent,
}

#[derive(Clone, Debug)]
pub struct RectsState<'a> {
  rules: &'a Rects,
  cells: Grid<Option<Cover>>,
  clues: Rc<Vec<Clue<u32>>>,
  clue_grid: Rc<Grid<Option<u32>>>,
  covered: Vec<bool>,
  next_id: u16,
}

impl<'a> RectsState<'a> {
  /// The placements available to cover the given clue: its area, over
  /// undecided cells, with no differing clue inside and no clue on its
  /// border.
  fn placements(&self, clue: usize) -> Vec<Extent> {
    let Clue { pos, value } = self.clues[clue];
    let dims = self.rules.dims;
    self
      .rules
      .extents_through(pos, value as usize)
      .filter(|extent| {
        extent
          .cells()
          .all(|p| self.cells[p].is_none() && self.clue_grid[p].map_or(true, |v| v == value))
          && extent.border(dims).all(|p| self.clue_grid[p].is_none())
      })
      .collect()
  }
}

impl<'a> SearchState for RectsState<'a> {
  type Cell = Cover;
  type Choice = Placement;

  fn is_complete(&self) -> bool {
    self.covered.iter().all(|&c| c)
  }

  /// Covers the uncovered clue with the fewest placements, preferring the
  /// earliest clue.
  fn pivot(&self, choices: &mut Vec<Placement>) {
    let mut best: Option<(usize, Vec<Extent>)> = None;
    for clue in (0..self.clues.len()).filter(|&c| !self.covered[c]) {
      let extents = self.placements(clue);
      if best.as_ref().map_or(true, |(_, b)| extents.len() < b.len()) {
        let stuck = extents.is_empty();
        best = Some((clue, extents));
        if stuck {
          break;
        }
      }
    }
    if let Some((clue, extents)) = best {
      choices.extend(extents.into_iter().map(|extent| Placement { clue, extent }));
    }
  }

  fn apply(&mut self, choice: Placement) -> bool {
    let Placement { clue, extent } = choice;
    if self.covered[clue] {
      return false;
    }
    let id = self.next_id;
    self.next_id += 1;
    let value = self.clues[clue].value;
    for p in extent.cells() {
      if self.cells[p].is_some() || self.clue_grid[p].is_some_and(|v| v != value) {
        return false;
      }
      self.cells[p] = Some(Cover::Rect(id));
    }
    let dims = self.rules.dims;
    for p in extent.border(dims) {
      if matches!(self.cells[p], Some(Cover::Rect(_))) || self.clue_grid[p].is_some() {
        return false;
      }
      self.cells[p] = Some(Cover::Empty);
    }
    for (i, c) in self.clues.iter().enumerate() {
      if extent.contains(c.pos) {
        self.covered[i] = true;
      }
    }
    true
  }

  /// Undecided cells are left empty.
  fn grid(&self) -> Grid<Cover> {
    self.cells.map(|c| c.unwrap_or(Cover::Empty))
  }
}

/// Generator settings for rects puzzles.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RectsParams {
  /// The longest side a rectangle may have.
  pub max_side: usize,
  /// The fraction of cells to cover.
  pub coverage: f64,
  /// How many refused placements in a row end the construction.
  pub max_failures: u32,
}

impl Construct for Rects {
  type Params = RectsParams;

  fn params_for(difficulty: Difficulty) -> RectsParams {
    let (max_side, coverage) = match difficulty {
      Difficulty::Easy => (2, 0.45),
      Difficulty::Medium => (3, 0.5),
      Difficulty::Hard => (4, 0.55),
    };
    RectsParams {
      max_side,
      coverage,
      max_failures: 30,
    }
  }

  /// Tries rectangles of random size at shuffled start positions, keeping
  /// those that land on empty cells without touching another rectangle.
  fn candidate(dims: Dims, params: &RectsParams, random: &mut Lcg) -> Option<(Self, Grid<Cover>)> {
    let rules = Rects::new(dims).ok()?;
    let target = (dims.area() as f64 * params.coverage).round() as usize;
    let max_side = params.max_side.max(1);
    let mut cells = Grid::filled(dims, Some(Cover::Empty));
    let mut covered = 0;
    let mut failures = 0;
    let mut next_id = 0;
    for start in shuffle(&dims.positions().collect_vec(), random) {
      if covered >= target || failures >= params.max_failures {
        break;
      }
      let extent = Extent {
        top: start.row,
        left: start.col,
        height: 1 + random.below(max_side),
        width: 1 + random.below(max_side),
      };
      let fits = extent.top + extent.height <= dims.rows
        && extent.left + extent.width <= dims.cols
        && extent.cells().all(|p| {
          cells[p] == Some(Cover::Empty) && rules.is_locally_valid(&cells, p, Cover::Rect(next_id))
        });
      if !fits {
        failures += 1;
        continue;
      }
      for p in extent.cells() {
        cells[p] = Some(Cover::Rect(next_id));
      }
      next_id += 1;
      covered += extent.area();
      failures = 0;
    }
    if next_id == 0 || covered * 2 < target {
      log::trace!("rects placement stalled at {covered} of {target} cells");
      return None;
    }
    let solution = rules.normalize(cells.map(|c| c.unwrap_or(Cover::Empty)));
    rules.is_globally_valid(&solution).then_some((rules, solution))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::solve::*;

  #[test]
  fn parses_and_normalizes() {
    let rules = Rects::new(Dims::new(2, 3)).unwrap();
    let g = parse_cover(
      r"
        a.b
        a.b",
    )
    .unwrap();
    assert_eq!(Cover::Rect(1), g[Pos::new(0, 2)]);
    let swapped = g.map(|&c| match c {
      Cover::Rect(id) => Cover::Rect(1 - id),
      Cover::Empty => Cover::Empty,
    });
    assert_ne!(g, swapped);
    assert_eq!(g, rules.normalize(swapped));
  }

  #[test]
  fn buffer_rule() {
    let rules = Rects::new(Dims::new(3, 3)).unwrap();
    let diagonal = parse_cover(
      r"
        a..
        .b.
        ..c",
    )
    .unwrap();
    assert!(rules.is_globally_valid(&diagonal));
    let touching = parse_cover(
      r"
        ab.
        ...
        ...",
    )
    .unwrap();
    assert!(!rules.is_globally_valid(&touching));
    let partial = touching.map(|&c| Some(c));
    assert!(!rules.is_locally_valid(&partial, Pos::new(0, 1), Cover::Rect(1)));
    assert!(rules.is_locally_valid(&partial, Pos::new(0, 1), Cover::Empty));
  }

  #[test]
  fn shapes_must_be_rectangles() {
    let rules = Rects::new(Dims::new(2, 2)).unwrap();
    let ell = parse_cover(
      r"
        aa
        a.",
    )
    .unwrap();
    assert!(!rules.is_globally_valid(&ell));
    let square = parse_cover(
      r"
        aa
        aa",
    )
    .unwrap();
    assert!(rules.is_globally_valid(&square));
  }

  #[test]
  fn pivot_breaks_ties_in_clue_order() {
    let rules = Rects::new(Dims::new(1, 5)).unwrap();
    let clues = ClueSet::new(vec![Clue::new(Pos::new(0, 4), 1), Clue::new(Pos::new(0, 0), 1)]).unwrap();
    let state = rules.start(&clues).unwrap();
    let mut choices = Vec::new();
    state.pivot(&mut choices);
    assert_eq!(1, choices.len());
    assert_eq!(0, choices[0].clue);
    assert!(choices[0].extent.contains(Pos::new(0, 4)));
    assert_eq!(1, choices[0].extent.area());
  }

  #[test]
  fn clues_are_areas_and_every_rect_needs_one() {
    let rules = Rects::new(Dims::new(3, 3)).unwrap();
    let solution = parse_cover(
      r"
        aa.
        ...
        b.c",
    )
    .unwrap();
    let clues = rules.extract_clues(&solution);
    assert_eq!(4, clues.len());
    assert_eq!(Some(&2), clues.get(Pos::new(0, 1)));
    assert_eq!(Some(&1), clues.get(Pos::new(2, 2)));
    assert!(rules.satisfies(&solution, &clues));
    let mut fewer = clues.clone();
    fewer.take(Pos::new(2, 0));
    assert!(!rules.satisfies(&solution, &fewer));
  }

  #[test]
  fn full_clues_pin_down_the_solution() {
    let rules = Rects::new(Dims::new(4, 4)).unwrap();
    let solution = parse_cover(
      r"
        aa.b
        aa.b
        ....
        cc.d",
    )
    .unwrap();
    let clues = rules.extract_clues(&solution);
    let summary = first_solutions(&rules, &clues, &Budget::uniqueness());
    assert!(summary.is_unique());
    assert_eq!(vec![solution], summary.solutions);
  }

  #[test]
  fn ambiguous_clue() {
    let rules = Rects::new(Dims::new(1, 3)).unwrap();
    let clues = ClueSet::new(vec![Clue::new(Pos::new(0, 1), 2)]).unwrap();
    let summary = first_solutions(&rules, &clues, &Budget::uniqueness());
    assert_eq!(2, summary.count);
    assert!(!summary.is_unique());
  }

  #[test]
  fn generated_layouts_are_valid() {
    let dims = Dims::new(6, 6);
    let params = Rects::params_for(Difficulty::Medium);
    let mut produced = 0;
    for seed in 0..10 {
      let a = Rects::candidate(dims, &params, &mut Lcg::new(seed));
      assert_eq!(a, Rects::candidate(dims, &params, &mut Lcg::new(seed)));
      if let Some((rules, solution)) = a {
        assert!(rules.is_globally_valid(&solution));
        assert_eq!(solution, rules.normalize(solution.clone()));
        produced += 1;
      }
    }
    assert!(produced > 0);
  }
}
