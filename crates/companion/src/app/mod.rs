pub(crate) mod bootstrap;
pub(crate) mod loop_runner;

mod chat;
mod companion;
mod console;
mod http_completion;
mod navigation;
mod quiz;
mod settings;
