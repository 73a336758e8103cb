pub mod daily_routine;
pub mod notify;
pub mod orchestrator;
pub mod routine_runner;
pub mod scoring;
