//! Dashboard analytics
//!
//! - [`linearize`]: nested documents → flat records (Stage 1)
//! - [`kpi`]: flat records → KPIs (Stage 2)
//! - [`pipeline`]: memoized composition of both stages

pub mod kpi;
pub mod linearize;
pub mod pipeline;

pub use kpi::{KpiOptions, Kpis, TopClient, extract_kpis};
pub use linearize::{LinearField, LinearRecord, linearize, linearize_documents};
pub use pipeline::AnalyticsPipeline;
