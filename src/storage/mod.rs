// storage/mod.rs

pub mod output;
pub mod records;

pub use self::output::{ClusterWriter, FailedGroup, RunParameters, RunReport};
pub use self::records::{read_records, ReadStats};
