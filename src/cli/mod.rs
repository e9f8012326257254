pub mod convert;
pub mod list;
pub mod screen;
pub mod setup;
pub mod ui;
