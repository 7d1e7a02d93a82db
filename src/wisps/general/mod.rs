pub mod commands;
pub mod jobs;
pub mod tick;
