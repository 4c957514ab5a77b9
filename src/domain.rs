pub mod code;
pub mod error;
pub mod generator;
pub mod models;
pub mod repository;
pub mod validation;
