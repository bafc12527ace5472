pub mod chart;
pub mod chart_store;
pub mod config;
pub mod http;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod sinks;
pub mod sources;
pub mod transform;

pub use pipeline::{Envelope, Pipeline, TariffError};
pub use report::{build_report, Report};
