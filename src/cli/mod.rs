pub mod check;
pub mod setup;
pub mod ui;
