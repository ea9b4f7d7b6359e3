pub mod core;
pub mod gen;
pub mod minimize;
pub mod puzzles;
pub mod random;
pub mod rules;
pub mod solve;
