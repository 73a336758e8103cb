pub mod product;
pub mod routine_report;
