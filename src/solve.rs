//! Defines the backtracking solver shared by every puzzle type.
//!
//! The solver walks the search tree with an explicit stack rather than
//! recursion.  Each stack item owns a copy of the puzzle's search state and
//! the choices still to try at its pivot; branching clones the state, except
//! for the last choice, which reuses it.  The search is bounded by a
//! solution cap, an optional wall-clock budget, and an optional node budget.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::core::*;
use crate::rules::*;

/// How many search nodes we visit between checks of the clock.
pub const CHECK_INTERVAL: u64 = 8;

/// The wall-clock budget of a uniqueness check, when none is given.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Limits on a single solver invocation.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Budget {
  /// Stop as soon as this many solutions have been found.
  pub max_solutions: usize,
  /// Stop once this many milliseconds have passed.
  pub timeout_ms: Option<u64>,
  /// Stop after visiting this many search nodes.  Unlike the timeout, this
  /// cutoff is deterministic.
  pub max_nodes: Option<u64>,
}

impl Budget {
  /// The budget for deciding uniqueness: stop at the second solution.
  pub const fn uniqueness() -> Self {
    Budget {
      max_solutions: 2,
      timeout_ms: Some(DEFAULT_TIMEOUT_MS),
      max_nodes: None,
    }
  }

  pub const fn with_max_solutions(self, max_solutions: usize) -> Self {
    Budget {
      max_solutions,
      ..self
    }
  }

  pub const fn with_timeout_ms(self, timeout_ms: Option<u64>) -> Self {
    Budget { timeout_ms, ..self }
  }

  pub const fn with_max_nodes(self, max_nodes: Option<u64>) -> Self {
    Budget { max_nodes, ..self }
  }
}

impl Default for Budget {
  fn default() -> Self {
    Self::uniqueness()
  }
}

/// What a solver invocation found.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SolutionSummary<C> {
  /// How many solutions were found.  When `exhausted` is false this is an
  /// under-count: the search stopped before looking everywhere.
  pub count: usize,

  /// The solutions themselves, in the order found.  Empty unless the
  /// solver ran in "first solutions" mode.
  pub solutions: Vec<Grid<C>>,

  /// Whether the search stopped because it hit `max_solutions`.
  pub reached_max: bool,

  /// Whether the search stopped because it ran out of time.
  pub timed_out: bool,

  /// Whether the search stopped because it ran out of nodes.
  pub out_of_nodes: bool,

  /// Whether the search looked at the entire tree, so `count` is exact.
  pub exhausted: bool,

  /// How many search nodes were visited.
  pub nodes: u64,
}

impl<C> SolutionSummary<C> {
  /// Tells whether the clues are known to admit exactly one solution.  A
  /// count of one from a cut-short search proves nothing.
  pub fn is_unique(&self) -> bool {
    self.count == 1 && self.exhausted
  }
}

/// Counts the solutions consistent with the clues, up to the budget.
pub fn solve<R: Rules>(rules: &R, clues: &ClueSet<R::Clue>, budget: &Budget) -> SolutionSummary<R::Cell> {
  search(rules, clues, budget, DefaultHelper, false)
}

/// Like `solve`, but also returns the solutions found (at most
/// `max_solutions` of them).
pub fn first_solutions<R: Rules>(
  rules: &R,
  clues: &ClueSet<R::Clue>,
  budget: &Budget,
) -> SolutionSummary<R::Cell> {
  search(rules, clues, budget, DefaultHelper, true)
}

/// The general form of `solve` and `first_solutions`, with a helper that may
/// reorder the choices at each pivot.
pub fn search<R: Rules, H: SearchHelper>(
  rules: &R,
  clues: &ClueSet<R::Clue>,
  budget: &Budget,
  helper: H,
  record: bool,
) -> SolutionSummary<R::Cell> {
  if let Err(error) = clues.check_bounds(rules.dims()) {
    panic!("clues don't fit the {} puzzle: {error}", R::NAME);
  }
  let mut searcher = Searcher::new(rules, clues, budget, helper);
  let mut summary = SolutionSummary {
    count: 0,
    solutions: Vec::new(),
    reached_max: false,
    timed_out: false,
    out_of_nodes: false,
    exhausted: false,
    nodes: 0,
  };
  while summary.count < budget.max_solutions {
    match searcher.next_solution() {
      Some(solution) => {
        summary.count += 1;
        if record {
          summary.solutions.push(solution);
        }
      }
      None => break,
    }
  }
  summary.reached_max = summary.count >= budget.max_solutions;
  summary.timed_out = searcher.timed_out;
  summary.out_of_nodes = searcher.out_of_nodes;
  summary.exhausted = !summary.reached_max && !summary.timed_out && !summary.out_of_nodes;
  summary.nodes = searcher.nodes;
  if summary.timed_out {
    log::debug!(
      "{} search timed out after {} nodes with {} solutions",
      R::NAME,
      summary.nodes,
      summary.count
    );
  }
  summary
}

/// Callbacks for searching a puzzle's solution space.
pub trait SearchHelper {
  /// Optionally puts the choices at a pivot into a different order.
  fn order_choices<C>(&mut self, choices: &mut [C]);
}

/// Leaves choices in the order the puzzle type proposes them, which makes
/// the search deterministic.
pub struct DefaultHelper;

impl SearchHelper for DefaultHelper {
  fn order_choices<C>(&mut self, _choices: &mut [C]) {}
}

/// A wall-clock cutoff.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Deadline(DateTime<Utc>);

impl Deadline {
  /// The deadline `ms` milliseconds from now.
  pub fn after_ms(ms: u64) -> Self {
    // About 35 years; keeps the addition in range.
    let ms = ms.min(1 << 40) as i64;
    Deadline(Utc::now() + Duration::milliseconds(ms))
  }

  pub fn has_passed(&self) -> bool {
    Utc::now() >= self.0
  }
}

/// Walks a puzzle's search tree, yielding one solution at a time.
pub struct Searcher<'a, R: Rules + 'a, H: SearchHelper> {
  rules: &'a R,
  clues: &'a ClueSet<R::Clue>,
  helper: H,
  stack: Vec<StackItem<R::State<'a>>>,
  /// A solution found while setting up, not yet handed out.
  pending: Option<Grid<R::Cell>>,
  deadline: Option<Deadline>,
  max_nodes: Option<u64>,
  pub nodes: u64,
  pub max_depth: usize,
  pub timed_out: bool,
  pub out_of_nodes: bool,
}

struct StackItem<S: SearchState> {
  state: S,

  /// The choices to try at this item's pivot, and the index of the next one.
  choices: Vec<S::Choice>,
  next: usize,
}

impl<'a, R: Rules + 'a, H: SearchHelper> Searcher<'a, R, H> {
  pub fn new(rules: &'a R, clues: &'a ClueSet<R::Clue>, budget: &Budget, helper: H) -> Self {
    let mut answer = Searcher {
      rules,
      clues,
      helper,
      stack: Vec::with_capacity(32),
      pending: None,
      deadline: budget.timeout_ms.map(Deadline::after_ms),
      max_nodes: budget.max_nodes,
      nodes: 0,
      max_depth: 0,
      timed_out: false,
      out_of_nodes: false,
    };
    if let Some(state) = rules.start(clues) {
      answer.pending = answer.visit(state);
    }
    answer
  }

  /// Searches for the next solution.  Returns `None` when the tree is used
  /// up or the budget runs out; check `timed_out` and `out_of_nodes` to tell
  /// which.
  pub fn next_solution(&mut self) -> Option<Grid<R::Cell>> {
    if let Some(solution) = self.pending.take() {
      return Some(solution);
    }
    loop {
      if self.stack.is_empty() {
        return None;
      }
      if self.out_of_budget() {
        self.stack.clear();
        return None;
      }
      self.nodes += 1;
      let item = match self.stack.last_mut() {
        Some(item) => item,
        None => return None,
      };
      let Some((choice, last)) = item.next_choice() else {
        self.stack.pop();
        continue;
      };
      let mut state = if last {
        // For the final choice, we reuse the item's state instead of
        // copying it.
        match self.stack.pop() {
          Some(item) => item.state,
          None => return None,
        }
      } else {
        // There are other choices after this one, so we modify a copy to
        // let them all start from the same place.
        item.state.clone()
      };
      if !state.apply(choice) {
        continue;
      }
      if let Some(solution) = self.visit(state) {
        return Some(solution);
      }
    }
  }

  /// Handles a freshly extended state: checks it if it's complete, or
  /// pushes its pivot onto the stack.  Returns the solution if it's one.
  fn visit(&mut self, state: R::State<'a>) -> Option<Grid<R::Cell>> {
    if state.is_complete() {
      let grid = self.rules.normalize(state.grid());
      let valid = self.rules.is_globally_valid(&grid) && self.rules.satisfies(&grid, self.clues);
      return valid.then_some(grid);
    }
    let mut choices = Vec::new();
    state.pivot(&mut choices);
    self.helper.order_choices(&mut choices);
    self.stack.push(StackItem {
      state,
      choices,
      next: 0,
    });
    self.max_depth = self.max_depth.max(self.stack.len());
    None
  }

  fn out_of_budget(&mut self) -> bool {
    if let Some(max_nodes) = self.max_nodes {
      if self.nodes >= max_nodes {
        self.out_of_nodes = true;
        return true;
      }
    }
    if self.nodes % CHECK_INTERVAL == 0 {
      if let Some(deadline) = &self.deadline {
        if deadline.has_passed() {
          self.timed_out = true;
          return true;
        }
      }
    }
    false
  }
}

impl<S: SearchState> StackItem<S> {
  /// Returns the next choice to try, and whether it's the last one.
  fn next_choice(&mut self) -> Option<(S::Choice, bool)> {
    let choice = *self.choices.get(self.next)?;
    self.next += 1;
    Some((choice, self.next >= self.choices.len()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::puzzles::ripple::{parse_givens, Ripple};
  use crate::puzzles::tapa::Tapa;
  use paste::paste;
  use std::str::FromStr;
  use std::time::Instant;

  const MAX_SOLUTIONS: usize = 12;

  macro_rules! solve_test {
    ($name:ident, $rooms:expr, $givens:expr, $count:expr) => {
      paste! {
          #[test]
          fn [<test_solve_ $name>]() {
              let rules = Ripple::from_str($rooms).unwrap();
              let clues = parse_givens($givens).unwrap();
              let budget = Budget::uniqueness()
                .with_max_solutions(MAX_SOLUTIONS)
                .with_timeout_ms(None);
              let summary = first_solutions(&rules, &clues, &budget);
              let expected: usize = $count;
              assert_eq!(expected.min(MAX_SOLUTIONS), summary.count);
              assert_eq!(summary.count, summary.solutions.len());
              assert_eq!(summary.reached_max, expected >= MAX_SOLUTIONS);
              for s in summary.solutions {
                assert!(rules.is_globally_valid(&s));
                assert!(rules.satisfies(&s, &clues));
              }
          }
      }
    };
  }

  solve_test!(single_cell, "a", "1", 1);
  solve_test!(single_cell_bad_given, "a", "2", 0);
  solve_test!(single_cell_no_givens, "a", ".", 1);
  solve_test!(
    domino_needs_a_given,
    r"
      aa",
    r"
      ..",
    2
  );
  solve_test!(
    domino_with_given,
    r"
      aa",
    r"
      2.",
    1
  );
  solve_test!(
    ones_too_close,
    r"
      ab",
    r"
      ..",
    0
  );
  solve_test!(
    forced_by_distance,
    r"
      aab
      cab",
    r"
      ...
      ...",
    1
  );
  solve_test!(
    many_solutions,
    r"
      aaaa
      bbbb
      cccc
      dddd",
    r"
      ....
      ....
      ....
      ....",
    MAX_SOLUTIONS
  );

  #[test]
  fn stops_at_max_solutions() {
    let rules = Ripple::from_str("aaa").unwrap();
    let budget = Budget::uniqueness().with_max_solutions(1);
    let summary = solve(&rules, &ClueSet::empty(), &budget);
    assert_eq!(1, summary.count);
    assert!(summary.reached_max);
    assert!(!summary.exhausted);
    assert!(!summary.is_unique());
    assert!(summary.solutions.is_empty());
  }

  #[test]
  fn node_budget_is_an_under_count() {
    let rules = Tapa::new(Dims::new(6, 6)).unwrap();
    let budget = Budget::uniqueness()
      .with_max_solutions(usize::MAX)
      .with_timeout_ms(None)
      .with_max_nodes(Some(50));
    let summary = solve(&rules, &ClueSet::empty(), &budget);
    assert!(summary.out_of_nodes);
    assert!(!summary.exhausted);
    assert_eq!(50, summary.nodes);
  }

  #[test]
  fn timeout_is_honored() {
    let rules = Tapa::new(Dims::new(8, 8)).unwrap();
    let budget = Budget::uniqueness()
      .with_max_solutions(100)
      .with_timeout_ms(Some(100));
    let start = Instant::now();
    let summary = solve(&rules, &ClueSet::empty(), &budget);
    assert!(start.elapsed().as_millis() < 500);
    assert!(summary.count <= 100);
  }

  #[test]
  fn timeout_cuts_off_a_huge_enumeration() {
    let rules = Tapa::new(Dims::new(8, 8)).unwrap();
    let budget = Budget::uniqueness()
      .with_max_solutions(usize::MAX)
      .with_timeout_ms(Some(100));
    let start = Instant::now();
    let summary = solve(&rules, &ClueSet::empty(), &budget);
    assert!(start.elapsed().as_millis() < 500);
    assert!(summary.timed_out);
    assert!(!summary.exhausted);
    assert!(!summary.is_unique());
  }
}
