pub mod config;
pub mod learn;
pub mod main_module;
pub mod shared;
