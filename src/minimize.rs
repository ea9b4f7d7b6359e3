//! Defines the clue minimizer.
//!
//! The minimizer starts from a clue set with a known unique solution and
//! removes clues one at a time, keeping each removal only if the puzzle still
//! has exactly that one solution.  The result is locally irreducible: no
//! single remaining clue can be dropped, unless the floor stopped the loop
//! first.  It is not a global minimum.

use crate::core::*;
use crate::random::*;
use crate::rules::*;
use crate::solve::*;

/// What the minimizer produced.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Minimized<V> {
  /// The surviving clues.
  pub clues: ClueSet<V>,
  /// How many removals were tried.
  pub trials: usize,
  /// How many trials the solver couldn't settle within its budget.  Each of
  /// those clues was kept.
  pub timeouts: usize,
}

/// Removes clues from `clues` while `solution` stays the only solution.
///
/// The clues are tried in a shuffled order drawn from `random`, from the
/// back of that order to the front, and each is tried once.  A removal is
/// kept only when the solver, looking for two solutions within `budget`,
/// finds exactly one and it matches `solution`; a timeout counts as failure.
/// The loop stops early once only `floor` clues remain.
pub fn minimize<R: Rules>(
  rules: &R,
  clues: ClueSet<R::Clue>,
  solution: &Grid<R::Cell>,
  budget: &Budget,
  floor: usize,
  random: &mut Lcg,
) -> Minimized<R::Clue> {
  let budget = budget.with_max_solutions(2);
  let order = shuffle(&clues.positions(), random);
  let mut answer = Minimized {
    clues,
    trials: 0,
    timeouts: 0,
  };
  for &pos in order.iter().rev() {
    if answer.clues.len() <= floor {
      log::trace!("{} minimizer reached its floor of {floor} clues", R::NAME);
      break;
    }
    let Some((index, clue)) = answer.clues.take(pos) else {
      continue;
    };
    answer.trials += 1;
    let summary = first_solutions(rules, &answer.clues, &budget);
    if summary.timed_out || summary.out_of_nodes {
      answer.timeouts += 1;
    }
    let keep = summary.is_unique() && summary.solutions.first() == Some(solution);
    log::trace!(
      "{} minimizer: clue at {pos} {}",
      R::NAME,
      if keep { "removed" } else { "restored" }
    );
    if !keep {
      answer.clues.restore(index, clue);
    }
  }
  answer
}
