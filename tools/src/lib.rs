pub mod cat;
pub mod config;
