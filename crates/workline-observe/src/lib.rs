mod logger;
pub use logger::*;

mod view;
pub use view::{View, log_result, log_summary, message_for};
