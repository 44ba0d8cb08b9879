pub mod actions;
pub mod app;
pub mod save_bar;
pub mod table;
