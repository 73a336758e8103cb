pub mod automation_worker;
pub mod notification_sink;
pub mod product_ledger;
pub mod session;
pub mod strategy_advisor;
