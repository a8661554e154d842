pub mod commands;
pub mod events;
pub mod model;
pub mod rules;
