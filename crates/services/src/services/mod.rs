pub mod config;
pub mod ordered_collection;
pub mod plan_editor;
