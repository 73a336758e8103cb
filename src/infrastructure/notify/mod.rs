pub mod log;
pub mod webhook;
