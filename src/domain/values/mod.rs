pub mod metrics;
pub mod product_status;
pub mod scoring;
pub mod worker_id;
