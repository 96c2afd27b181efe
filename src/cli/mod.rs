pub mod price;
pub mod returns;
pub mod setup;
pub mod ui;
