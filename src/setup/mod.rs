mod initializer;

pub use initializer::{InitState, Initializer};
