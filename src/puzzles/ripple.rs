//! Ripple puzzles: a grid divided into rooms, where a room of `n` cells holds
//! the numbers `1..=n`, and two equal numbers `v` in the same row or column
//! must be more than `v` cells apart.
//!
//! Clues are givens: a number shown in a cell.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use crate::core::*;
use crate::gen::Difficulty;
use crate::random::*;
use crate::rules::*;

/// The skeleton of a ripple puzzle: its room layout.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Ripple {
  rooms: Grid<u16>,
  #[serde(skip)]
  members: Rc<Vec<Vec<Pos>>>,
}

impl Ripple {
  /// Makes a ripple skeleton from a room-id grid.  Room ids must run from 0
  /// without gaps, and every room must be 4-connected.
  pub fn new(rooms: Grid<u16>) -> Result<Self, ShapeError> {
    let dims = rooms.dims();
    if dims.area() == 0 {
      return Err(ShapeError::Empty {
        rows: dims.rows,
        cols: dims.cols,
      });
    }
    let count = rooms.cells().iter().max().map_or(0, |&max| max as usize + 1);
    let mut members = vec![Vec::new(); count];
    for (pos, &room) in rooms.iter() {
      members[room as usize].push(pos);
    }
    for (room, cells) in members.iter().enumerate() {
      let room = room as u16;
      let Some(&first) = cells.first() else {
        return Err(ShapeError::MissingRoom { room });
      };
      if cells.len() > u8::MAX as usize {
        return Err(ShapeError::Label {
          what: "room size",
          label: cells.len().to_string(),
        });
      }
      if region::flood(dims, first, |p| rooms[p] == room).len() != cells.len() {
        return Err(ShapeError::DisconnectedRoom { room });
      }
    }
    Ok(Ripple {
      rooms,
      members: Rc::new(members),
    })
  }

  pub fn rooms(&self) -> &Grid<u16> {
    &self.rooms
  }

  pub fn room_count(&self) -> usize {
    self.members.len()
  }

  /// The number of cells in the room containing `pos`, which is also the
  /// largest number that room holds.
  pub fn room_size(&self, pos: Pos) -> u8 {
    self.members[self.rooms[pos] as usize].len() as u8
  }

  /// Tells whether `value` at `pos` conflicts with any other assigned cell,
  /// given a way to look up assignments.
  fn conflicts(&self, pos: Pos, value: u8, lookup: impl Fn(Pos) -> Option<u8>) -> bool {
    if value == 0 || value > self.room_size(pos) {
      return true;
    }
    let room = &self.members[self.rooms[pos] as usize];
    if room.iter().any(|&p| p != pos && lookup(p) == Some(value)) {
      return true;
    }
    let dims = self.rooms.dims();
    let reach = value as isize;
    ORTHOGONAL.iter().any(|&(dr, dc)| {
      (1..=reach).any(|d| match pos.offset(dr * d, dc * d, dims) {
        Some(p) => lookup(p) == Some(value),
        None => false,
      })
    })
  }

  /// The values `pos` could still take.
  fn legal_values<'g>(&'g self, grid: &'g Grid<Option<u8>>, pos: Pos) -> impl Iterator<Item = u8> + 'g {
    (1..=self.room_size(pos)).filter(move |&v| !self.conflicts(pos, v, |p| grid[p]))
  }
}

/// Parses a room layout drawn with one letter or digit per room, such as
/// `"aab\ncab"`.  Rooms are numbered in order of first appearance.
impl FromStr for Ripple {
  type Err = ShapeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let labels = Grid::parse_with(s, |c| c.is_ascii_alphanumeric().then_some(c))?;
    let mut ids = HashMap::new();
    let rooms = labels.map(|c| {
      let next = ids.len() as u16;
      *ids.entry(*c).or_insert(next)
    });
    Ripple::new(rooms)
  }
}

/// Parses givens drawn with digits for clues and `.` for blanks.
pub fn parse_givens(s: &str) -> Result<ClueSet<u8>, ShapeError> {
  let grid = Grid::parse_with(s, |c| match c {
    '.' => Some(None),
    _ => c.to_digit(10).map(|d| Some(d as u8)),
  })?;
  ClueSet::new(
    grid
      .iter()
      .filter_map(|(pos, v)| v.map(|v| Clue::new(pos, v)))
      .collect(),
  )
}

impl Rules for Ripple {
  type Cell = u8;
  type Clue = u8;
  type State<'a> = RippleState<'a>;

  const NAME: &'static str = "ripple";

  fn dims(&self) -> Dims {
    self.rooms.dims()
  }

  fn is_locally_valid(&self, grid: &Grid<Option<u8>>, pos: Pos, value: u8) -> bool {
    !self.conflicts(pos, value, |p| grid[p])
  }

  /// Values in range with no repeats force each room to hold exactly
  /// `1..=n`.
  fn is_globally_valid(&self, grid: &Grid<u8>) -> bool {
    grid.dims() == self.dims() && grid.iter().all(|(pos, &v)| !self.conflicts(pos, v, |p| Some(grid[p])))
  }

  fn extract_clue(&self, solution: &Grid<u8>, pos: Pos) -> Option<u8> {
    solution.get(pos).copied()
  }

  fn start<'a>(&'a self, clues: &ClueSet<u8>) -> Option<RippleState<'a>> {
    let mut state = RippleState {
      rules: self,
      cells: Grid::filled(self.dims(), None),
      open: self.dims().area(),
    };
    for clue in clues.iter() {
      if !state.apply(Given {
        pos: clue.pos,
        value: clue.value,
      }) {
        return None;
      }
    }
    Some(state)
  }
}

/// A number placed in a cell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Given {
  pub pos: Pos,
  pub value: u8,
}

#[derive(Clone, Debug)]
pub struct RippleState<'a> {
  rules: &'a Ripple,
  cells: Grid<Option<u8>>,
  open: usize,
}

impl<'a> SearchState for RippleState<'a> {
  type Cell = u8;
  type Choice = Given;

  fn is_complete(&self) -> bool {
    self.open == 0
  }

  /// Picks the open cell with the fewest legal values, preferring the
  /// earliest in row-major order.
  fn pivot(&self, choices: &mut Vec<Given>) {
    let mut best: Option<(Pos, Vec<u8>)> = None;
    for (pos, cell) in self.cells.iter() {
      if cell.is_some() {
        continue;
      }
      let values = self.rules.legal_values(&self.cells, pos).collect_vec();
      if best.as_ref().map_or(true, |(_, b)| values.len() < b.len()) {
        let stuck = values.is_empty();
        best = Some((pos, values));
        if stuck {
          break;
        }
      }
    }
    if let Some((pos, values)) = best {
      choices.extend(values.into_iter().map(|value| Given { pos, value }));
    }
  }

  fn apply(&mut self, choice: Given) -> bool {
    let Given { pos, value } = choice;
    if let Some(old) = self.cells[pos] {
      return old == value;
    }
    if !self.rules.is_locally_valid(&self.cells, pos, value) {
      return false;
    }
    self.cells[pos] = Some(value);
    self.open -= 1;
    true
  }

  fn grid(&self) -> Grid<u8> {
    self.cells.map(|c| c.unwrap_or(0))
  }
}

/// Generator settings for ripple puzzles.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RippleParams {
  /// The largest room the layout may contain.
  pub max_room_size: u8,
  /// How many layouts may fail in a row before the candidate gives up.
  pub max_failures: u32,
}

impl Construct for Ripple {
  type Params = RippleParams;

  fn params_for(difficulty: Difficulty) -> RippleParams {
    let max_room_size = match difficulty {
      Difficulty::Easy => 4,
      Difficulty::Medium => 5,
      Difficulty::Hard => 6,
    };
    RippleParams {
      max_room_size,
      max_failures: 100,
    }
  }

  fn candidate(dims: Dims, params: &RippleParams, random: &mut Lcg) -> Option<(Self, Grid<u8>)> {
    for failures in 0..params.max_failures {
      if let Some((rooms, numbers)) = build_rooms(dims, params.max_room_size, random) {
        let rules = Ripple::new(rooms).ok()?;
        return Some((rules, numbers));
      }
      log::trace!("ripple layout {failures} could not be numbered");
    }
    None
  }
}

/// Divides the grid into 4-connected rooms of at most `max_size` cells and
/// numbers them as it goes.
///
/// Each still-unassigned cell, taken in shuffled order, seeds a room that
/// grows into random unassigned neighbours until it reaches a randomly
/// drawn size.  The room is then numbered against the rooms before it; if
/// it can't be, it gives back its newest cell and tries again.  A lone cell
/// that can't hold a 1 joins a neighbouring room instead, which is
/// renumbered.  Returns `None` when no neighbour can take it.
pub fn build_rooms(dims: Dims, max_size: u8, random: &mut Lcg) -> Option<(Grid<u16>, Grid<u8>)> {
  let max_size = max_size.max(1) as usize;
  let low = max_size.min(2);
  let mut rooms: Grid<Option<u16>> = Grid::filled(dims, None);
  let mut numbers: Grid<Option<u8>> = Grid::filled(dims, None);
  let mut members: Vec<Vec<Pos>> = Vec::new();
  for start in shuffle(&dims.positions().collect_vec(), random) {
    if rooms[start].is_some() {
      continue;
    }
    let id = members.len() as u16;
    let target = low + random.below(max_size - low + 1);
    rooms[start] = Some(id);
    let mut cells = vec![start];
    while cells.len() < target {
      let frontier = cells
        .iter()
        .flat_map(|&p| dims.neighbors(p))
        .filter(|&n| rooms[n].is_none())
        .unique()
        .collect_vec();
      if frontier.is_empty() {
        break;
      }
      let pick = frontier[random.below(frontier.len())];
      rooms[pick] = Some(id);
      cells.push(pick);
    }
    loop {
      if number_room(&mut numbers, &cells, random) {
        members.push(cells);
        break;
      }
      if cells.len() == 1 {
        rooms[start] = None;
        if !join_neighbor(start, max_size, &mut rooms, &mut numbers, &mut members, random) {
          return None;
        }
        break;
      }
      if let Some(last) = cells.pop() {
        rooms[last] = None;
      }
    }
  }
  // Earlier starts are never unassigned, so every cell has a room.
  Some((
    rooms.map(|r| r.unwrap_or_default()),
    numbers.map(|n| n.unwrap_or_default()),
  ))
}

/// Adds `pos` to a neighbouring room with space left, renumbering that room.
/// Leaves everything as it was when no neighbour works.
fn join_neighbor(
  pos: Pos,
  max_size: usize,
  rooms: &mut Grid<Option<u16>>,
  numbers: &mut Grid<Option<u8>>,
  members: &mut [Vec<Pos>],
  random: &mut Lcg,
) -> bool {
  let ids = rooms.dims().neighbors(pos).filter_map(|n| rooms[n]).unique().collect_vec();
  for id in shuffle(&ids, random) {
    let room = &mut members[id as usize];
    if room.len() >= max_size {
      continue;
    }
    let old = room.iter().map(|&p| numbers[p]).collect_vec();
    for &p in room.iter() {
      numbers[p] = None;
    }
    room.push(pos);
    if number_room(numbers, &room[..], random) {
      rooms[pos] = Some(id);
      return true;
    }
    room.pop();
    for (&p, n) in room.iter().zip(old) {
      numbers[p] = n;
    }
  }
  false
}

/// Writes `1..=cells.len()` into `cells` in some order that keeps equal
/// numbers far enough apart from those already in `numbers`.  Leaves the
/// cells blank if there is no such order.
fn number_room(numbers: &mut Grid<Option<u8>>, cells: &[Pos], random: &mut Lcg) -> bool {
  let mut pool = (1..=cells.len() as u8).collect_vec();
  shuffle_in_place(&mut pool, random);
  place_numbers(numbers, cells, &mut pool)
}

fn place_numbers(numbers: &mut Grid<Option<u8>>, cells: &[Pos], pool: &mut Vec<u8>) -> bool {
  let Some((&pos, rest)) = cells.split_first() else {
    return true;
  };
  for i in 0..pool.len() {
    let value = pool[i];
    if !spaced(numbers, pos, value) {
      continue;
    }
    numbers[pos] = Some(value);
    pool.remove(i);
    if place_numbers(numbers, rest, pool) {
      return true;
    }
    pool.insert(i, value);
    numbers[pos] = None;
  }
  false
}

/// Tells whether no other `value` lies within `value` cells of `pos` in its
/// row or column.
fn spaced(numbers: &Grid<Option<u8>>, pos: Pos, value: u8) -> bool {
  let dims = numbers.dims();
  let reach = value as isize;
  ORTHOGONAL.iter().all(|&(dr, dc)| {
    (1..=reach).all(|d| pos.offset(dr * d, dc * d, dims).map_or(true, |p| numbers[p] != Some(value)))
  })
}
