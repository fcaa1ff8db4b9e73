// Declare the modules that make up this crate.
pub mod growth;
pub mod metrics;

// Re-export the core types to provide a clean public API.
pub use growth::calculate_yoy_growth;
pub use metrics::FinancialMetrics;
