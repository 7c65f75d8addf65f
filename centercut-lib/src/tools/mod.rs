//! Miscellaneous runtime helpers.

pub mod timer;
