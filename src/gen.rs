//! Defines the puzzle generator.
//!
//! One generation attempt runs a fixed pipeline, seeded by a single integer:
//!
//! 1. build a random candidate solution (which may fail; retry with the next
//!    seed)
//! 2. extract every clue the solution shows
//! 3. confirm the full clue set has exactly that one solution
//! 4. minimize the clues, then confirm uniqueness again
//! 5. package the result as an immutable `Puzzle`
//!
//! Any attempt that can't confirm uniqueness is discarded.

use num_derive::FromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::core::*;
use crate::minimize::minimize;
use crate::puzzles::{rects::Rects, ripple::Ripple, tapa::Tapa};
use crate::random::Lcg;
use crate::rules::*;
use crate::solve::*;

/// How hard a generated puzzle should be.  Each puzzle type turns this into
/// its own generator settings.
#[derive(Clone, Copy, Debug, Deserialize, Eq, FromPrimitive, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
#[wasm_bindgen]
#[repr(C)]
pub enum Difficulty {
  Easy = 1,
  Medium,
  Hard,
}

impl Difficulty {
  /// The fraction of the grid's cells that minimization leaves as clues,
  /// at least.
  fn min_clue_fraction(self) -> f64 {
    match self {
      Difficulty::Easy => 0.3,
      Difficulty::Medium => 0.15,
      Difficulty::Hard => 0.0,
    }
  }
}

impl fmt::Display for Difficulty {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Difficulty::Easy => "easy",
      Difficulty::Medium => "medium",
      Difficulty::Hard => "hard",
    })
  }
}

impl FromStr for Difficulty {
  type Err = ShapeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().as_str() {
      "easy" => Ok(Difficulty::Easy),
      "medium" => Ok(Difficulty::Medium),
      "hard" => Ok(Difficulty::Hard),
      _ => Err(ShapeError::Label {
        what: "difficulty",
        label: s.to_string(),
      }),
    }
  }
}

/// The puzzle types the generator knows.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PuzzleKind {
  Ripple,
  Tapa,
  Rects,
}

impl PuzzleKind {
  pub fn name(self) -> &'static str {
    match self {
      PuzzleKind::Ripple => Ripple::NAME,
      PuzzleKind::Tapa => Tapa::NAME,
      PuzzleKind::Rects => Rects::NAME,
    }
  }
}

impl fmt::Display for PuzzleKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for PuzzleKind {
  type Err = ShapeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    [PuzzleKind::Ripple, PuzzleKind::Tapa, PuzzleKind::Rects]
      .into_iter()
      .find(|kind| kind.name().eq_ignore_ascii_case(s))
      .ok_or_else(|| ShapeError::Label {
        what: "puzzle kind",
        label: s.to_string(),
      })
  }
}

/// How many seeds `generate` tries before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

/// Everything a generation attempt needs besides its seed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenConfig<P> {
  pub rows: usize,
  pub cols: usize,
  pub difficulty: Difficulty,
  /// The puzzle type's own generator settings.
  pub params: P,
  /// The budget for each uniqueness check.
  pub budget: Budget,
  /// Minimization stops once the clues are down to this fraction of the
  /// grid's cells.
  pub min_clue_fraction: f64,
  /// How many consecutive seeds `generate` tries.
  pub max_attempts: u32,
}

impl<P> GenConfig<P> {
  /// The default configuration for puzzle type `R` at the given size and
  /// difficulty.
  pub fn new<R: Construct<Params = P>>(rows: usize, cols: usize, difficulty: Difficulty) -> Self {
    GenConfig {
      rows,
      cols,
      difficulty,
      params: R::params_for(difficulty),
      budget: Budget::uniqueness(),
      min_clue_fraction: difficulty.min_clue_fraction(),
      max_attempts: DEFAULT_MAX_ATTEMPTS,
    }
  }

  pub fn dims(&self) -> Dims {
    Dims::new(self.rows, self.cols)
  }

  /// The clue count at which minimization stops.
  pub fn clue_floor(&self) -> usize {
    (self.dims().area() as f64 * self.min_clue_fraction).ceil() as usize
  }
}

/// The points at which an attempt checks uniqueness.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
  FullClues,
  Minimized,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Stage::FullClues => "full clue set",
      Stage::Minimized => "minimized clue set",
    })
  }
}

/// Why a generation attempt was discarded.  These are expected outcomes;
/// the caller moves on to another seed.
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Rejection {
  #[error("no candidate solution within the attempt budget")]
  NoCandidate,
  #[error("{stage} does not pin down the solution ({count} found)")]
  NotUnique { stage: Stage, count: usize },
  #[error("uniqueness of the {stage} is unknown: the solver ran out of budget")]
  TimedOut { stage: Stage },
}

/// A generated puzzle: the skeleton, the clues a player sees, and the
/// unique solution they lead to.  Never changes once made.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(bound(serialize = "R: Serialize"))]
pub struct Puzzle<R: Rules> {
  id: Option<u64>,
  kind: &'static str,
  rows: usize,
  cols: usize,
  difficulty: Difficulty,
  seed: u64,
  rules: R,
  clues: ClueSet<R::Clue>,
  solution: Grid<R::Cell>,
}

impl<R: Rules> Puzzle<R> {
  /// The puzzle's position within a batch, if it came from one.
  pub fn id(&self) -> Option<u64> {
    self.id
  }

  pub fn kind(&self) -> &'static str {
    self.kind
  }

  pub fn dims(&self) -> Dims {
    Dims::new(self.rows, self.cols)
  }

  pub fn difficulty(&self) -> Difficulty {
    self.difficulty
  }

  /// The seed that reproduces this puzzle.
  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn rules(&self) -> &R {
    &self.rules
  }

  pub fn clues(&self) -> &ClueSet<R::Clue> {
    &self.clues
  }

  pub fn solution(&self) -> &Grid<R::Cell> {
    &self.solution
  }
}

/// Runs one generation attempt with the given seed.
///
/// The candidate draws from `Lcg::new(seed)`, which keeps only the low 32
/// bits of the seed, so seeds `2^32` apart build the same candidate.  The
/// clue order is derived from the whole seed.  `Puzzle::seed` records the
/// seed as given.
pub fn generate_attempt<R: Construct>(config: &GenConfig<R::Params>, seed: u64) -> Result<Puzzle<R>, Rejection> {
  let dims = config.dims();
  let mut random = Lcg::new(seed);
  let (rules, solution) = R::candidate(dims, &config.params, &mut random).ok_or(Rejection::NoCandidate)?;
  let solution = rules.normalize(solution);
  debug_assert!(rules.is_globally_valid(&solution));
  log::debug!("{} seed {seed}: candidate built", R::NAME);

  let full = rules.extract_clues(&solution);
  let budget = config.budget.with_max_solutions(2);
  confirm(Stage::FullClues, &first_solutions(&rules, &full, &budget), &solution)?;
  log::debug!("{} seed {seed}: {} clues, unique", R::NAME, full.len());

  // Removal order gets its own stream, so minimization doesn't depend on
  // how many draws the candidate took.
  let mut order = Lcg::derived((seed, "clue-order"));
  let minimized = minimize(&rules, full, &solution, &config.budget, config.clue_floor(), &mut order);
  confirm(Stage::Minimized, &first_solutions(&rules, &minimized.clues, &budget), &solution)?;
  log::debug!(
    "{} seed {seed}: minimized to {} clues in {} trials ({} timeouts)",
    R::NAME,
    minimized.clues.len(),
    minimized.trials,
    minimized.timeouts
  );

  Ok(Puzzle {
    id: None,
    kind: R::NAME,
    rows: config.rows,
    cols: config.cols,
    difficulty: config.difficulty,
    seed,
    rules,
    clues: minimized.clues,
    solution,
  })
}

/// Checks that a solver run found `solution` and nothing else.
fn confirm<C: Eq>(stage: Stage, summary: &SolutionSummary<C>, solution: &Grid<C>) -> Result<(), Rejection> {
  if summary.timed_out || summary.out_of_nodes {
    return Err(Rejection::TimedOut { stage });
  }
  if !summary.is_unique() || summary.solutions.first() != Some(solution) {
    return Err(Rejection::NotUnique {
      stage,
      count: summary.count,
    });
  }
  Ok(())
}

/// Generates a puzzle, trying seeds `first_seed`, `first_seed + 1`, and so
/// on, up to the configured number of attempts.
pub fn generate<R: Construct>(config: &GenConfig<R::Params>, first_seed: u64) -> Option<Puzzle<R>> {
  (0..u64::from(config.max_attempts)).find_map(|k| {
    let seed = first_seed.wrapping_add(k);
    match generate_attempt::<R>(config, seed) {
      Ok(puzzle) => Some(puzzle),
      Err(rejection) => {
        log::debug!("{} seed {seed} rejected: {rejection}", R::NAME);
        None
      }
    }
  })
}

/// Generates a run of puzzles with ids 1, 2, ..., trying consecutive seeds
/// and skipping the ones that get rejected.
pub struct Batch<'c, R: Construct> {
  config: &'c GenConfig<R::Params>,
  next_seed: u64,
  next_id: u64,
  max_attempts: u64,
  /// How many seeds have been tried.
  pub attempts: u64,
  /// How many puzzles have been produced.
  pub produced: u64,
}

/// How often a batch reports its progress.
const PROGRESS_INTERVAL: u64 = 100;

impl<'c, R: Construct> Batch<'c, R> {
  /// Starts a batch at `first_seed` that gives up after `max_attempts`
  /// seeds in total.
  pub fn new(config: &'c GenConfig<R::Params>, first_seed: u64, max_attempts: u64) -> Self {
    Batch {
      config,
      next_seed: first_seed,
      next_id: 1,
      max_attempts,
      attempts: 0,
      produced: 0,
    }
  }

  /// The seed the next attempt will use.
  pub fn next_seed(&self) -> u64 {
    self.next_seed
  }

  /// The fraction of attempts that produced a puzzle.
  pub fn success_rate(&self) -> f64 {
    if self.attempts == 0 {
      0.0
    } else {
      self.produced as f64 / self.attempts as f64
    }
  }
}

impl<'c, R: Construct> Iterator for Batch<'c, R> {
  type Item = Puzzle<R>;

  fn next(&mut self) -> Option<Puzzle<R>> {
    while self.attempts < self.max_attempts {
      let seed = self.next_seed;
      self.next_seed = seed.wrapping_add(1);
      self.attempts += 1;
      match generate_attempt::<R>(self.config, seed) {
        Ok(puzzle) => {
          let puzzle = Puzzle {
            id: Some(self.next_id),
            ..puzzle
          };
          self.next_id += 1;
          self.produced += 1;
          if self.produced % PROGRESS_INTERVAL == 0 {
            log::info!(
              "{}: {} puzzles from {} seeds ({:.1}% success)",
              R::NAME,
              self.produced,
              self.attempts,
              100.0 * self.success_rate()
            );
          }
          return Some(puzzle);
        }
        Err(rejection) => log::debug!("{} seed {seed} rejected: {rejection}", R::NAME),
      }
    }
    None
  }
}

/// Generates a puzzle of the named kind with default settings, returning
/// its serialized record, or `null` if every attempt was rejected.
#[wasm_bindgen(js_name = "generatePuzzle")]
pub fn generate_puzzle(kind: &str, rows: usize, cols: usize, difficulty: Difficulty, seed: u64) -> Result<JsValue, JsValue> {
  let kind = PuzzleKind::from_str(kind).map_err(|e| JsValue::from_str(&e.to_string()))?;
  match kind {
    PuzzleKind::Ripple => to_js(generate::<Ripple>(&GenConfig::new::<Ripple>(rows, cols, difficulty), seed)),
    PuzzleKind::Tapa => to_js(generate::<Tapa>(&GenConfig::new::<Tapa>(rows, cols, difficulty), seed)),
    PuzzleKind::Rects => to_js(generate::<Rects>(&GenConfig::new::<Rects>(rows, cols, difficulty), seed)),
  }
}

fn to_js<R: Construct>(puzzle: Option<Puzzle<R>>) -> Result<JsValue, JsValue> {
  match puzzle {
    Some(puzzle) => Ok(serde_wasm_bindgen::to_value(&puzzle)?),
    None => Ok(JsValue::NULL),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use num_traits::FromPrimitive;

  #[test]
  fn difficulty_labels() {
    assert_eq!(Ok(Difficulty::Medium), "Medium".parse());
    assert_eq!("hard", Difficulty::Hard.to_string());
    assert!("extreme".parse::<Difficulty>().is_err());
    assert_eq!(Some(Difficulty::Easy), Difficulty::from_i32(1));
    assert_eq!(None, Difficulty::from_i32(4));
  }

  #[test]
  fn kind_labels() {
    assert_eq!(Ok(PuzzleKind::Tapa), "tapa".parse());
    assert_eq!(Ok(PuzzleKind::Rects), "RECTS".parse());
    assert_eq!(
      Err(ShapeError::Label {
        what: "puzzle kind",
        label: "sudoku".to_string()
      }),
      "sudoku".parse::<PuzzleKind>()
    );
  }

  #[test]
  fn config_defaults() {
    let config = GenConfig::new::<Tapa>(7, 7, Difficulty::Easy);
    assert_eq!(Tapa::params_for(Difficulty::Easy), config.params);
    assert_eq!(2, config.budget.max_solutions);
    assert_eq!(15, config.clue_floor());
  }

  #[test]
  fn rejections_explain_themselves() {
    let r = Rejection::NotUnique {
      stage: Stage::Minimized,
      count: 2,
    };
    assert_eq!("minimized clue set does not pin down the solution (2 found)", r.to_string());
  }

  #[test]
  fn generated_puzzle_is_unique() {
    let config = GenConfig::new::<Tapa>(5, 5, Difficulty::Medium);
    let puzzle = generate::<Tapa>(&config, 1).unwrap();
    assert_eq!("tapa", puzzle.kind());
    assert_eq!(None, puzzle.id());
    let summary = first_solutions(puzzle.rules(), puzzle.clues(), &Budget::uniqueness().with_timeout_ms(None));
    assert!(summary.is_unique());
    assert_eq!(puzzle.solution(), &summary.solutions[0]);
  }

  #[test]
  fn batch_numbers_puzzles() {
    let config = GenConfig::new::<Rects>(5, 5, Difficulty::Easy);
    let mut batch = Batch::<Rects>::new(&config, 10, 200);
    let first = batch.next().unwrap();
    let second = batch.next().unwrap();
    assert_eq!(Some(1), first.id());
    assert_eq!(Some(2), second.id());
    assert!(first.seed() < second.seed());
    assert_eq!(second.seed() + 1, batch.next_seed());
    assert_eq!(2, batch.produced);
    assert!(batch.success_rate() > 0.0);
  }

  #[test]
  fn batch_gives_up() {
    let config = GenConfig::new::<Ripple>(4, 4, Difficulty::Easy);
    let mut batch = Batch::<Ripple>::new(&config, 0, 0);
    assert!(batch.next().is_none());
    assert_eq!(0.0, batch.success_rate());
  }
}
