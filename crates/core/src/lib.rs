//! Domain logic for course progress tracking and sequential unlocking.
//!
//! Contains no database dependencies; callers load rows and pass plain
//! values in.

pub mod content;
pub mod error;
pub mod progress;
pub mod slots;
pub mod types;
pub mod unlock;
