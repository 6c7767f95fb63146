pub mod analyze;
pub mod clear;
pub mod config;
pub mod dashboard;
pub mod export;
pub mod show;
pub mod story;
