mod error;
pub use error::ModelError;

mod domain;
pub use domain::*;

mod kind;
pub use kind::*;

mod event;
pub use event::{Event, Subscribe};
