pub mod checks;
pub mod commands;
pub mod db;
pub mod jobs;
pub mod models;
