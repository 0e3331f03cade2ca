pub mod clean;
pub mod index;
