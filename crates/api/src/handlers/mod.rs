pub mod admin;
pub mod content;
pub mod progress;
pub mod resources;
pub mod unlocks;
