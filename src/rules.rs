//! The seams between the shared generate/solve/minimize machinery and the
//! individual puzzle types.
//!
//! Each puzzle type supplies one `Rules` implementation (its validity oracle
//! and clue extractor), a `SearchState` the solver drives, and a `Construct`
//! implementation that builds random candidate solutions.

use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

use crate::core::*;
use crate::random::Lcg;

/// The validity oracle and clue extractor for one puzzle type.  A value of
/// this type is the puzzle's skeleton: whatever the player sees before any
/// clues (its dimensions, and for some puzzles a fixed layout).
pub trait Rules: Sized {
  /// The state of one cell of a solved grid.
  type Cell: Copy + Debug + Eq + Serialize;
  /// The value of one clue.
  type Clue: Clone + Debug + Eq + Serialize;
  /// The solver's working state for this puzzle type.
  type State<'a>: SearchState<Cell = Self::Cell>
  where
    Self: 'a;

  /// A short name for logs and records.
  const NAME: &'static str;

  fn dims(&self) -> Dims;

  /// Tells whether placing `value` at `pos` in the partially assigned grid
  /// breaks none of the local rules.
  fn is_locally_valid(&self, grid: &Grid<Option<Self::Cell>>, pos: Pos, value: Self::Cell) -> bool;

  /// Tells whether a fully assigned grid obeys every rule of the puzzle.
  fn is_globally_valid(&self, grid: &Grid<Self::Cell>) -> bool;

  /// The clue a solved grid shows at `pos`, or `None` when the location
  /// can't carry one.
  fn extract_clue(&self, solution: &Grid<Self::Cell>, pos: Pos) -> Option<Self::Clue>;

  /// Every clue the solved grid shows, in row-major order.
  fn extract_clues(&self, solution: &Grid<Self::Cell>) -> ClueSet<Self::Clue> {
    let clues = solution
      .dims()
      .positions()
      .filter_map(|pos| self.extract_clue(solution, pos).map(|value| Clue::new(pos, value)))
      .collect();
    // Positions are distinct, so this can't fail.
    ClueSet::new(clues).unwrap_or_default()
  }

  /// Tells whether a complete grid is consistent with the given clues.  The
  /// default checks each clue against `extract_clue`, so the solver and the
  /// extractor can never disagree.
  fn satisfies(&self, grid: &Grid<Self::Cell>, clues: &ClueSet<Self::Clue>) -> bool {
    clues
      .iter()
      .all(|clue| self.extract_clue(grid, clue.pos).as_ref() == Some(&clue.value))
  }

  /// Rewrites a solved grid into canonical form, for puzzle types whose
  /// cells carry arbitrary labels.  The default leaves it alone.
  fn normalize(&self, grid: Grid<Self::Cell>) -> Grid<Self::Cell> {
    grid
  }

  /// Makes the solver's starting state for the given clues, or `None` if
  /// the clues contradict each other outright.
  fn start<'a>(&'a self, clues: &ClueSet<Self::Clue>) -> Option<Self::State<'a>>;
}

/// The grid under construction during a search, plus whatever bookkeeping
/// the puzzle type needs to find its frontier quickly.  The solver clones it
/// at every branch, so it must own its data (or share it immutably).
pub trait SearchState: Clone {
  type Cell;
  /// One way of extending the assignment at a pivot.
  type Choice: Copy + Debug;

  /// Tells whether nothing remains to be decided.
  fn is_complete(&self) -> bool;

  /// Picks the next pivot and pushes the choices available there onto
  /// `choices`, in the order to try them.  Pushing nothing means the state
  /// is a dead end.  Only called when the state isn't complete.
  fn pivot(&self, choices: &mut Vec<Self::Choice>);

  /// Applies a choice.  Returns false when that leads straight to a
  /// contradiction; the state must then be discarded.
  fn apply(&mut self, choice: Self::Choice) -> bool;

  /// The assignment as a grid.  Only meaningful once complete.
  fn grid(&self) -> Grid<Self::Cell>;
}

/// Builds random candidate solutions for a puzzle type.
pub trait Construct: Rules + Clone + Debug + Serialize {
  /// Tuning knobs for the candidate generator.
  type Params: Clone + Debug + Serialize + DeserializeOwned;

  /// The generator settings to use for a given difficulty.
  fn params_for(difficulty: crate::gen::Difficulty) -> Self::Params;

  /// Builds a random skeleton and a fully assigned grid that obeys its
  /// rules, drawing every random choice from `random` in a fixed order.
  /// Returns `None` when the attempt budget runs out first.
  fn candidate(dims: Dims, params: &Self::Params, random: &mut Lcg) -> Option<(Self, Grid<Self::Cell>)>;
}
