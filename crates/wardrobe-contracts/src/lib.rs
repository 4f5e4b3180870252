pub mod assets;
pub mod commands;
pub mod events;
pub mod wizard;
