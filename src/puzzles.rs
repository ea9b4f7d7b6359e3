//! The puzzle types this crate generates.
//!
//! - ripple: numbers in rooms, with equal numbers kept apart by their value
//! - tapa: a connected shaded region described by 8-neighbour run clues
//! - rects: separated rectangles described by their areas

pub mod rects;
pub mod ripple;
pub mod tapa;
