pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod export;
pub mod filters;
pub mod output;
pub mod progress;
pub mod records;
pub mod upload;
pub mod utils;
pub mod view;

#[cfg(test)]
mod tests;
