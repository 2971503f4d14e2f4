//! Hash containers specialized to the Fx hasher.

pub use rustc_hash::FxHashMap;
