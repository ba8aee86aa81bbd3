//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` create DTOs where the table accepts writes from the API

pub mod completion;
pub mod content;
pub mod progress;
pub mod resource_view;
pub mod stats;
pub mod status;
pub mod unlock;
