mod app;
mod commands;
mod markdown;
mod render;
mod run;
mod types;

pub use run::{run, RunOptions};
