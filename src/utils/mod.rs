pub mod logger;

pub use logger::{format_duration, init_logging};
