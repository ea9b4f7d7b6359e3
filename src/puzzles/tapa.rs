//! Tapa puzzles: shade some cells so the shaded cells form one 4-connected
//! region containing no fully shaded 2×2 block.
//!
//! Every clue sits in an unshaded cell and lists the lengths of the runs of
//! shaded cells in its 8-neighbour ring, read circularly.  Cells beyond the
//! edge of the grid count as unshaded.

use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::rc::Rc;

use crate::core::*;
use crate::gen::Difficulty;
use crate::random::*;
use crate::rules::*;

/// The clue for each of the 256 ways of shading a ring, indexed by a mask
/// whose bit `i` is set when ring cell `i` (clockwise from top-left) is
/// shaded.
static RING_CLUES: Lazy<Vec<Vec<u8>>> = Lazy::new(|| (0..=255u8).map(runs_of).collect());

/// Computes the sorted circular run lengths of the shaded bits of `mask`.
fn runs_of(mask: u8) -> Vec<u8> {
  match mask {
    0 => vec![0],
    0xff => vec![8],
    _ => {
      // Start the circular scan just after an unshaded cell, so no run
      // wraps around.
      let zero = (0..8u32).find(|i| mask & (1 << i) == 0).unwrap_or(0);
      let mut runs = (1..=8)
        .map(|k| mask & (1 << ((zero + k) % 8)) != 0)
        .chunk_by(|&shaded| shaded)
        .into_iter()
        .filter(|(shaded, _)| *shaded)
        .map(|(_, run)| run.count() as u8)
        .collect_vec();
      runs.sort_unstable();
      runs
    }
  }
}

/// The skeleton of a tapa puzzle, which is just its size.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Tapa {
  dims: Dims,
}

impl Tapa {
  pub fn new(dims: Dims) -> Result<Self, ShapeError> {
    if dims.area() == 0 {
      return Err(ShapeError::Empty {
        rows: dims.rows,
        cols: dims.cols,
      });
    }
    Ok(Tapa { dims })
  }

  /// The ring mask of `pos` under a shading lookup.
  fn ring_mask(&self, pos: Pos, shaded: impl Fn(Pos) -> bool) -> u8 {
    self
      .dims
      .ring(pos)
      .iter()
      .enumerate()
      .filter(|(_, p)| p.is_some_and(&shaded))
      .fold(0, |mask, (i, _)| mask | (1 << i))
  }

  /// The top-left corners of the 2×2 blocks containing `pos`.
  fn blocks_around(&self, pos: Pos) -> impl Iterator<Item = Pos> {
    let dims = self.dims;
    [(-1, -1), (-1, 0), (0, -1), (0, 0)]
      .into_iter()
      .filter_map(move |(dr, dc)| pos.offset(dr, dc, dims))
      .filter(move |p| p.row + 1 < dims.rows && p.col + 1 < dims.cols)
  }

  fn block(corner: Pos) -> [Pos; 4] {
    let Pos { row, col } = corner;
    [
      corner,
      Pos::new(row, col + 1),
      Pos::new(row + 1, col),
      Pos::new(row + 1, col + 1),
    ]
  }
}

/// Parses a shading drawn with `#` for shaded and `.` for unshaded cells.
pub fn parse_shading(s: &str) -> Result<Grid<bool>, ShapeError> {
  Grid::parse_with(s, |c| match c {
    '#' => Some(true),
    '.' => Some(false),
    _ => None,
  })
}

impl Rules for Tapa {
  type Cell = bool;
  type Clue = Vec<u8>;
  type State<'a> = TapaState<'a>;

  const NAME: &'static str = "tapa";

  fn dims(&self) -> Dims {
    self.dims
  }

  /// Shading a cell is locally valid unless it completes a shaded 2×2
  /// block.
  fn is_locally_valid(&self, grid: &Grid<Option<bool>>, pos: Pos, value: bool) -> bool {
    !value
      || self
        .blocks_around(pos)
        .all(|corner| Self::block(corner).iter().any(|&p| p != pos && grid[p] != Some(true)))
  }

  fn is_globally_valid(&self, grid: &Grid<bool>) -> bool {
    grid.dims() == self.dims
      && self
        .dims
        .positions()
        .filter(|p| p.row + 1 < self.dims.rows && p.col + 1 < self.dims.cols)
        .all(|corner| !Self::block(corner).iter().all(|&p| grid[p]))
      && region::is_connected(self.dims, |p| grid[p])
  }

  fn extract_clue(&self, solution: &Grid<bool>, pos: Pos) -> Option<Vec<u8>> {
    match solution.get(pos) {
      Some(false) => Some(RING_CLUES[self.ring_mask(pos, |p| solution[p]) as usize].clone()),
      _ => None,
    }
  }

  fn start<'a>(&'a self, clues: &ClueSet<Vec<u8>>) -> Option<TapaState<'a>> {
    let dims = self.dims;
    let mut watchers = vec![Vec::new(); dims.area()];
    let mut is_clue = vec![false; dims.area()];
    let mut patterns = Vec::with_capacity(clues.len());
    for (index, clue) in clues.iter().enumerate() {
      is_clue[clue.pos.index(dims)] = true;
      let ring = dims.ring(clue.pos);
      let mut off_grid = 0u8;
      for (bit, p) in ring.iter().enumerate() {
        match p {
          Some(p) => watchers[p.index(dims)].push((index, bit as u8)),
          None => off_grid |= 1 << bit,
        }
      }
      let fits = (0..=255u8)
        .filter(|&mask| mask & off_grid == 0 && RING_CLUES[mask as usize] == clue.value)
        .collect_vec();
      patterns.push(fits);
    }
    let mut state = TapaState {
      rules: self,
      cells: Grid::filled(dims, None),
      open: dims.area(),
      layout: Rc::new(ClueLayout {
        positions: clues.positions(),
        watchers,
        is_clue,
      }),
      patterns,
    };
    if state.patterns.iter().any(|p| p.is_empty()) {
      return None;
    }
    for clue in clues.iter() {
      if !state.set(clue.pos, false) {
        return None;
      }
    }
    Some(state)
  }
}

/// Where the clues are, and which clue rings each cell belongs to.
#[derive(Debug)]
struct ClueLayout {
  positions: Vec<Pos>,
  /// For each cell, the clues whose ring contains it and its bit there.
  watchers: Vec<Vec<(usize, u8)>>,
  is_clue: Vec<bool>,
}

/// One step of a tapa search.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TapaChoice {
  /// Shade a clue's ring according to one of its remaining patterns.
  Ring { clue: usize, mask: u8 },
  /// Decide a single cell.
  Cell { pos: Pos, shaded: bool },
}

#[derive(Clone, Debug)]
pub struct TapaState<'a> {
  rules: &'a Tapa,
  cells: Grid<Option<bool>>,
  open: usize,
  layout: Rc<ClueLayout>,
  /// The ring masks each clue could still take.
  patterns: Vec<Vec<u8>>,
}

impl<'a> TapaState<'a> {
  /// Decides one cell and narrows the patterns of the clues watching it.
  /// Returns false on a contradiction.
  fn set(&mut self, pos: Pos, shaded: bool) -> bool {
    if let Some(old) = self.cells[pos] {
      return old == shaded;
    }
    let index = pos.index(self.rules.dims);
    if shaded && self.layout.is_clue[index] {
      return false;
    }
    if !self.rules.is_locally_valid(&self.cells, pos, shaded) {
      return false;
    }
    self.cells[pos] = Some(shaded);
    self.open -= 1;
    for &(clue, bit) in &self.layout.watchers[index] {
      let patterns = &mut self.patterns[clue];
      patterns.retain(|&mask| (mask & (1 << bit) != 0) == shaded);
      if patterns.is_empty() {
        return false;
      }
    }
    true
  }

  fn has_open_ring(&self, clue: usize) -> bool {
    let dims = self.rules.dims;
    dims
      .ring(self.layout.positions[clue])
      .iter()
      .flatten()
      .any(|&p| self.cells[p].is_none())
  }

  /// Tells whether the shaded cells could still join up through cells that
  /// aren't known to be unshaded.
  fn can_connect(&self) -> bool {
    region::can_connect(self.rules.dims, |p| self.cells[p] == Some(true), |p| self.cells[p] != Some(false))
  }
}

impl<'a> SearchState for TapaState<'a> {
  type Cell = bool;
  type Choice = TapaChoice;

  fn is_complete(&self) -> bool {
    self.open == 0
  }

  /// Prefers the clue with the fewest remaining patterns, then falls back
  /// to the first cell with the fewest legal states.
  fn pivot(&self, choices: &mut Vec<TapaChoice>) {
    let best_clue = (0..self.patterns.len())
      .filter(|&clue| self.has_open_ring(clue))
      .min_by_key(|&clue| self.patterns[clue].len());
    if let Some(clue) = best_clue {
      choices.extend(self.patterns[clue].iter().map(|&mask| TapaChoice::Ring { clue, mask }));
      return;
    }
    let mut best: Option<(Pos, Vec<bool>)> = None;
    for (pos, cell) in self.cells.iter() {
      if cell.is_some() {
        continue;
      }
      let states = [false, true]
        .into_iter()
        .filter(|&shaded| self.rules.is_locally_valid(&self.cells, pos, shaded))
        .collect_vec();
      if best.as_ref().map_or(true, |(_, b)| states.len() < b.len()) {
        let forced = states.len() < 2;
        best = Some((pos, states));
        if forced {
          break;
        }
      }
    }
    if let Some((pos, states)) = best {
      choices.extend(states.into_iter().map(|shaded| TapaChoice::Cell { pos, shaded }));
    }
  }

  fn apply(&mut self, choice: TapaChoice) -> bool {
    let ok = match choice {
      TapaChoice::Ring { clue, mask } => {
        let ring = self.rules.dims.ring(self.layout.positions[clue]);
        ring
          .iter()
          .enumerate()
          .all(|(bit, p)| p.map_or(true, |p| self.set(p, mask & (1 << bit) != 0)))
      }
      TapaChoice::Cell { pos, shaded } => self.set(pos, shaded),
    };
    ok && self.can_connect()
  }

  fn grid(&self) -> Grid<bool> {
    self.cells.map(|c| c.unwrap_or(false))
  }
}

/// Generator settings for tapa puzzles.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TapaParams {
  /// The fraction of cells to shade.
  pub density: f64,
  /// How many refused shadings in a row end the growth.
  pub max_failures: u32,
}

impl Construct for Tapa {
  type Params = TapaParams;

  fn params_for(difficulty: Difficulty) -> TapaParams {
    let density = match difficulty {
      Difficulty::Easy => 0.4,
      Difficulty::Medium => 0.5,
      Difficulty::Hard => 0.55,
    };
    TapaParams {
      density,
      max_failures: 50,
    }
  }

  /// Grows a shaded region from a random cell, shading random frontier
  /// cells that keep the grid free of shaded 2×2 blocks.
  fn candidate(dims: Dims, params: &TapaParams, random: &mut Lcg) -> Option<(Self, Grid<bool>)> {
    let rules = Tapa::new(dims).ok()?;
    let target = ((dims.area() as f64 * params.density).round() as usize).max(1);
    let mut cells = Grid::filled(dims, Some(false));
    cells[dims.pos(random.below(dims.area()))] = Some(true);
    let mut count = 1;
    let mut failures = 0;
    while count < target && failures < params.max_failures {
      let frontier = dims
        .positions()
        .filter(|&p| cells[p] == Some(false) && dims.neighbors(p).any(|n| cells[n] == Some(true)))
        .collect_vec();
      if frontier.is_empty() {
        break;
      }
      let pick = frontier[random.below(frontier.len())];
      if rules.is_locally_valid(&cells, pick, true) {
        cells[pick] = Some(true);
        count += 1;
        failures = 0;
      } else {
        failures += 1;
      }
    }
    if count * 2 < target {
      log::trace!("tapa shading stalled at {count} of {target} cells");
      return None;
    }
    let solution = cells.map(|&c| c == Some(true));
    rules.is_globally_valid(&solution).then_some((rules, solution))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::solve::*;

  #[test]
  fn ring_clues() {
    assert_eq!(vec![0], runs_of(0));
    assert_eq!(vec![8], runs_of(0xff));
    assert_eq!(vec![1], runs_of(0b0000_0001));
    // Bits 7 and 0 are adjacent around the ring.
    assert_eq!(vec![2], runs_of(0b1000_0001));
    assert_eq!(vec![1, 3], runs_of(0b0011_1010));
    assert_eq!(vec![1, 1, 1, 1], runs_of(0b0101_0101));
    assert_eq!(vec![7], runs_of(0b1111_0111));
  }

  #[test]
  fn two_by_two_blocks_are_refused() {
    let rules = Tapa::new(Dims::new(3, 3)).unwrap();
    let g = parse_shading(
      r"
        ##.
        #..
        ...",
    )
    .unwrap()
    .map(|&s| Some(s));
    assert!(!rules.is_locally_valid(&g, Pos::new(1, 1), true));
    assert!(rules.is_locally_valid(&g, Pos::new(1, 1), false));
    assert!(rules.is_locally_valid(&g, Pos::new(2, 2), true));
  }

  #[test]
  fn global_rules() {
    let rules = Tapa::new(Dims::new(3, 3)).unwrap();
    let good = parse_shading(
      r"
        ##.
        .##
        ..#",
    )
    .unwrap();
    assert!(rules.is_globally_valid(&good));
    let block = parse_shading(
      r"
        ##.
        ##.
        ...",
    )
    .unwrap();
    assert!(!rules.is_globally_valid(&block));
    let split = parse_shading(
      r"
        #..
        ...
        ..#",
    )
    .unwrap();
    assert!(!rules.is_globally_valid(&split));
    assert!(rules.is_globally_valid(&Grid::filled(rules.dims(), false)));
  }

  #[test]
  fn clues_describe_unshaded_cells() {
    let rules = Tapa::new(Dims::new(3, 3)).unwrap();
    let solution = parse_shading(
      r"
        ##.
        .#.
        .##",
    )
    .unwrap();
    assert_eq!(None, rules.extract_clue(&solution, Pos::new(0, 0)));
    assert_eq!(Some(vec![2]), rules.extract_clue(&solution, Pos::new(0, 2)));
    assert_eq!(Some(vec![4]), rules.extract_clue(&solution, Pos::new(1, 0)));
    assert_eq!(Some(vec![2]), rules.extract_clue(&solution, Pos::new(2, 0)));
    let clues = rules.extract_clues(&solution);
    assert_eq!(4, clues.len());
    assert!(rules.satisfies(&solution, &clues));
  }

  #[test]
  fn full_clues_pin_down_the_solution() {
    let rules = Tapa::new(Dims::new(3, 3)).unwrap();
    let solution = parse_shading(
      r"
        ##.
        .#.
        .##",
    )
    .unwrap();
    let clues = rules.extract_clues(&solution);
    let summary = first_solutions(&rules, &clues, &Budget::uniqueness());
    assert!(summary.is_unique());
    assert_eq!(vec![solution], summary.solutions);
  }

  #[test]
  fn pivot_breaks_clue_ties_in_clue_order() {
    let rules = Tapa::new(Dims::new(1, 5)).unwrap();
    let clues = ClueSet::new(vec![
      Clue::new(Pos::new(0, 4), vec![1]),
      Clue::new(Pos::new(0, 0), vec![1]),
    ])
    .unwrap();
    let state = rules.start(&clues).unwrap();
    let mut choices = Vec::new();
    state.pivot(&mut choices);
    // Each end sees only its one neighbour, so both clues have one pattern.
    assert_eq!(vec![TapaChoice::Ring { clue: 0, mask: 1 << 7 }], choices);
  }

  #[test]
  fn impossible_clue_has_no_start() {
    let rules = Tapa::new(Dims::new(2, 2)).unwrap();
    let clues = ClueSet::new(vec![Clue::new(Pos::new(0, 0), vec![4])]).unwrap();
    assert!(rules.start(&clues).is_none());
    assert_eq!(0, solve(&rules, &clues, &Budget::uniqueness()).count);
  }

  #[test]
  fn generated_shading_is_valid() {
    let dims = Dims::new(7, 7);
    let params = Tapa::params_for(Difficulty::Medium);
    let (rules, solution) = Tapa::candidate(dims, &params, &mut Lcg::new(12345)).unwrap();
    for corner in dims.positions().filter(|p| p.row < 6 && p.col < 6) {
      assert!(!Tapa::block(corner).iter().all(|&p| solution[p]));
    }
    assert!(region::is_connected(dims, |p| solution[p]));
    assert!(rules.is_globally_valid(&solution));
    assert!(solution.cells().iter().any(|&s| s));
  }
}
