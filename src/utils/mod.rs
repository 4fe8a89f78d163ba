pub mod attempt_cache;
pub mod name_filter;

pub use attempt_cache::AttemptCache;
pub use name_filter::NameFilter;
