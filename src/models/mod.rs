pub mod log_entry;
pub mod slot;

pub use log_entry::{LogEntry, NewLogEntry, Visibility};
pub use slot::SlotInput;
