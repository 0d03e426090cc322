//! CrawlTrail command line: watches a crawl's fetch lifecycle queue and
//! draws the most recent URL fetches as a live trail.

pub mod cli;
pub mod config;
pub mod metrics;

pub use config::Config;
pub use metrics::ObserveMetrics;
