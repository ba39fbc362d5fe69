pub mod cli;
pub mod config;
pub mod constants;
pub mod control;
pub mod daemon;
pub mod logging;
pub mod manager;
pub mod pills;
pub mod process;
pub mod utils;
