pub mod config;
pub mod data_model;
pub mod diff;
pub mod diff_engine;
pub mod edit_session;
pub mod error;
pub mod field;
pub mod session;
