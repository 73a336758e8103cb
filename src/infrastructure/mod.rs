pub mod notify;
pub mod session;
pub mod sqlite;
pub mod strategy;
pub mod workers;
