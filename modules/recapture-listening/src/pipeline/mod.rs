pub mod dedup;
pub mod matcher;
pub mod result;
pub mod scheduler;
pub mod stats;
