use logic_grids::{
  gen::*,
  puzzles::{rects::Rects, ripple::Ripple, tapa::Tapa},
  rules::Construct,
};
use std::env;

/// Finds the puzzles with the smallest and largest number of clues among
/// the first N puzzles of a batch.
fn main() {
  let args: Vec<String> = env::args().collect();
  assert_eq!(
    5,
    args.len(),
    "usage: {} <kind> <size> <difficulty> <number-of-puzzles>",
    args[0]
  );
  let kind = args[1]
    .parse::<PuzzleKind>()
    .unwrap_or_else(|e| panic!("kind: {e}"));
  let size = args[2]
    .parse::<usize>()
    .unwrap_or_else(|_| panic!("size (`{}`) must be a positive integer", args[2]));
  let difficulty = args[3]
    .parse::<Difficulty>()
    .unwrap_or_else(|e| panic!("difficulty: {e}"));
  let count = args[4].parse::<usize>().unwrap_or_else(|_| {
    panic!(
      "number-of-puzzles (`{}`) must be a positive integer",
      args[4]
    )
  });
  match kind {
    PuzzleKind::Ripple => report::<Ripple>(size, difficulty, count),
    PuzzleKind::Tapa => report::<Tapa>(size, difficulty, count),
    PuzzleKind::Rects => report::<Rects>(size, difficulty, count),
  }
}

fn report<R: Construct>(size: usize, difficulty: Difficulty, count: usize) {
  let config = GenConfig::new::<R>(size, size, difficulty);
  let mut batch = Batch::<R>::new(&config, 1, 100 * count as u64);
  let Some((min, max)) = find_clue_range(&mut batch, count) else {
    println!("No puzzles in {} attempts", batch.attempts);
    return;
  };
  println!(
    "Smallest number of clues ({}), seed {}:\n{:?}",
    min.clues().len(),
    min.seed(),
    min.clues()
  );
  println!(
    "Largest number of clues ({}), seed {}:\n{:?}",
    max.clues().len(),
    max.seed(),
    max.clues()
  );
  println!(
    "{} puzzles from {} seeds ({:.1}% success)",
    batch.produced,
    batch.attempts,
    100.0 * batch.success_rate()
  );
}

/// Finds smallest and largest puzzles by number of clues among the next
/// `count` puzzles of `batch`.
fn find_clue_range<R: Construct>(batch: &mut Batch<R>, count: usize) -> Option<(Puzzle<R>, Puzzle<R>)> {
  let mut smallest: Option<Puzzle<R>> = None;
  let mut largest: Option<Puzzle<R>> = None;
  for puzzle in batch.take(count) {
    let len = puzzle.clues().len();
    if smallest.as_ref().map_or(true, |p| len < p.clues().len()) {
      smallest = Some(puzzle.clone());
    }
    if largest.as_ref().map_or(true, |p| len > p.clues().len()) {
      largest = Some(puzzle);
    }
  }
  smallest.zip(largest)
}
