mod strategy;
pub use strategy::Strategy;

mod outcome;
pub use outcome::{ErrorKind, Outcome};
