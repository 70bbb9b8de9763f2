//! Domain types for barmemo

pub mod bar;

pub use bar::{Bar, BarKey};
