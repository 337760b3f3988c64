mod journal;
pub use journal::Journal;

mod view;
pub use view::{View, log_event, message_for};
