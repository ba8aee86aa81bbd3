//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` (or a transaction connection) as the first argument.

pub mod completion_repo;
pub mod content_repo;
pub mod progress_repo;
pub mod resource_view_repo;
pub mod stats_repo;
pub mod unlock_repo;

pub use completion_repo::CompletionRepo;
pub use content_repo::ContentRepo;
pub use progress_repo::ProgressRepo;
pub use resource_view_repo::ResourceViewRepo;
pub use stats_repo::StatsRepo;
pub use unlock_repo::UnlockRepo;
