pub mod build;
pub mod common;
pub mod extract;
pub mod fetch;
pub mod install;
pub mod recipe;
