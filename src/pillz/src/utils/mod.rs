pub mod message;
pub mod yaml;
