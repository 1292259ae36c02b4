pub mod cart;
pub mod catalog;
pub mod groups;
pub mod orders;
