pub mod commands;
pub mod constants;
pub mod display;
pub mod restore_workflow;
pub mod ui;
