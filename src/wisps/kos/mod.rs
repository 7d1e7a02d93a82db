pub mod commands;
pub mod db;
pub mod models;
