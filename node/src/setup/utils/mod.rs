pub mod cmd;
pub mod fetch;
pub mod pkg;
