pub mod form;
pub mod repl;
pub mod transcript;
