#[path = "../support/mod.rs"]
mod support;

mod reporter;
mod sink;
