//! The deterministic random source that every generator draws from.
//!
//! All randomness in puzzle generation comes from an `Lcg`, a linear
//! congruential generator: the same seed gives the same sequence on every
//! platform and in every process.  `Lcg` also implements `rand`'s
//! `RngCore` and `SeedableRng`, so it can be derived from arbitrary
//! hashable seeds with `rand_seeder`.

pub use rand::{RngCore, SeedableRng};
use rand_seeder::Seeder;
use static_assertions::const_assert;
use std::hash::Hash;

/// The multiplier of the recurrence (Numerical Recipes).
const MULTIPLIER: u64 = 1_664_525;
/// The increment of the recurrence.
const INCREMENT: u64 = 1_013_904_223;
/// The modulus of the recurrence.
const MODULUS: u64 = 1 << 32;

const_assert!(MODULUS.is_power_of_two());
const_assert!(INCREMENT % 2 == 1);
const_assert!(MULTIPLIER % 4 == 1);

/// A linear congruential generator: `state = state * A + C mod M`, with
/// outputs `state / M` in `[0, 1)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Lcg {
  state: u64,
}

impl Lcg {
  /// Makes a generator from an integer seed.  Only the low 32 bits of the
  /// seed matter: `seed` and `seed + 2^32` give the same sequence.
  pub fn new(seed: u64) -> Self {
    Lcg {
      state: seed % MODULUS,
    }
  }

  /// Makes a generator whose seed is derived from any hashable value, such
  /// as a `(seed, "purpose")` pair.  Lets independent streams be split off a
  /// single puzzle seed.
  pub fn derived<H: Hash>(from: H) -> Self {
    Seeder::from(from).into_rng()
  }

  /// Advances the recurrence and returns the new state.
  fn step(&mut self) -> u64 {
    self.state = (self.state * MULTIPLIER + INCREMENT) % MODULUS;
    self.state
  }

  /// The next value in `[0, 1)`.
  pub fn next_f64(&mut self) -> f64 {
    self.step() as f64 / MODULUS as f64
  }

  /// A uniformly chosen index in `0..n`.  `n` must be positive.
  pub fn below(&mut self, n: usize) -> usize {
    assert!(n > 0, "below(0)");
    // The float product is strictly less than n, but clamp to be safe
    // against rounding.
    ((self.next_f64() * n as f64) as usize).min(n - 1)
  }

  /// True with probability `p`.
  pub fn chance(&mut self, p: f64) -> bool {
    self.next_f64() < p
  }
}

impl RngCore for Lcg {
  fn next_u32(&mut self) -> u32 {
    self.step() as u32
  }

  fn next_u64(&mut self) -> u64 {
    let high = u64::from(self.next_u32());
    let low = u64::from(self.next_u32());
    (high << 32) | low
  }

  fn fill_bytes(&mut self, dst: &mut [u8]) {
    for chunk in dst.chunks_mut(4) {
      let bytes = self.next_u32().to_le_bytes();
      chunk.copy_from_slice(&bytes[..chunk.len()]);
    }
  }
}

impl SeedableRng for Lcg {
  type Seed = [u8; 8];

  fn from_seed(seed: Self::Seed) -> Self {
    Self::new(u64::from_le_bytes(seed))
  }

  /// Uses the integer directly as the starting state, so that
  /// `Lcg::seed_from_u64(s) == Lcg::new(s)`.
  fn seed_from_u64(state: u64) -> Self {
    Self::new(state)
  }
}

/// Returns a Fisher-Yates permutation of `items` driven by `random`: from the
/// last index down to 1, each item is swapped with a uniformly chosen index
/// at or before it.  Leaves `items` alone.
pub fn shuffle<T: Clone>(items: &[T], random: &mut Lcg) -> Vec<T> {
  let mut answer = items.to_vec();
  shuffle_in_place(&mut answer, random);
  answer
}

/// Like `shuffle`, but permutes the slice itself.
pub fn shuffle_in_place<T>(items: &mut [T], random: &mut Lcg) {
  for i in (1..items.len()).rev() {
    let j = random.below(i + 1);
    items.swap(i, j);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn same_seed_same_sequence() {
    let mut a = Lcg::new(42);
    let mut b = Lcg::new(42);
    for _ in 0..1000 {
      assert_eq!(a.next_f64(), b.next_f64());
    }
    assert_ne!(Lcg::new(1).next_f64(), Lcg::new(2).next_f64());
  }

  #[test]
  fn only_the_low_seed_bits_count() {
    assert_eq!(Lcg::new(5), Lcg::new(5 + (1 << 32)));
    assert_ne!(Lcg::new(5), Lcg::new(6));
  }

  #[test]
  fn recurrence_matches_formula() {
    let mut random = Lcg::new(0);
    assert_eq!(INCREMENT as f64 / MODULUS as f64, random.next_f64());
    let expected = (INCREMENT * MULTIPLIER + INCREMENT) % MODULUS;
    assert_eq!(expected as u32, random.next_u32());
  }

  #[test]
  fn values_in_unit_interval() {
    let mut random = Lcg::new(12345);
    for _ in 0..10_000 {
      let v = random.next_f64();
      assert!((0.0..1.0).contains(&v));
    }
  }

  #[test]
  fn below_stays_in_range() {
    let mut random = Lcg::new(7);
    let mut seen = [false; 6];
    for _ in 0..1000 {
      let v = random.below(6);
      seen[v] = true;
    }
    assert!(seen.iter().all(|&s| s));
  }

  #[test]
  fn seedable_matches_new() {
    assert_eq!(Lcg::new(99), Lcg::seed_from_u64(99));
    assert_eq!(Lcg::new(99), Lcg::from_seed(99u64.to_le_bytes()));
  }

  #[test]
  fn derived_streams_are_stable_and_distinct() {
    let mut a = Lcg::derived((42u64, "clue-order"));
    let mut b = Lcg::derived((42u64, "clue-order"));
    let mut c = Lcg::derived((43u64, "clue-order"));
    let a: Vec<u32> = (0..8).map(|_| a.next_u32()).collect();
    let b: Vec<u32> = (0..8).map(|_| b.next_u32()).collect();
    let c: Vec<u32> = (0..8).map(|_| c.next_u32()).collect();
    assert_eq!(a, b);
    assert_ne!(a, c);
  }

  #[test]
  fn shuffle_is_a_permutation_and_leaves_input() {
    let items: Vec<u32> = (0..20).collect();
    let shuffled = shuffle(&items, &mut Lcg::new(5));
    assert_eq!((0..20).collect::<Vec<u32>>(), items);
    assert_ne!(items, shuffled);
    let mut sorted = shuffled.clone();
    sorted.sort();
    assert_eq!(items, sorted);
    assert_eq!(shuffled, shuffle(&items, &mut Lcg::new(5)));
  }

  #[test]
  fn shuffle_trivial_inputs() {
    let mut random = Lcg::new(3);
    assert!(shuffle::<u8>(&[], &mut random).is_empty());
    assert_eq!(vec![9], shuffle(&[9], &mut random));
  }
}
