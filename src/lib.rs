pub mod config;
pub mod domain;
pub mod fs;
pub mod memory;
pub mod postgres;
pub mod usecase;
