pub mod about;
pub mod config;
pub mod url;
