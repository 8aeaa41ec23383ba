pub mod pg;

pub use pg::PgStore;
