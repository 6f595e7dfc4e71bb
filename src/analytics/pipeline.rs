//! Two-stage derivation: raw JSON → [`LinearRecord`]s → [`Kpis`].
//!
//! Each stage only runs when its input actually changed. A failing Stage 1
//! leaves the last good records and KPIs in place so the dashboard keeps
//! showing them next to the error.

use std::sync::Arc;

use crate::analytics::kpi::{KpiOptions, Kpis, extract_kpis};
use crate::analytics::linearize::{LinearRecord, linearize};
use crate::core::error::Result;

#[derive(Debug, Default)]
pub struct AnalyticsPipeline {
    options: KpiOptions,
    source: Option<Arc<str>>,
    records: Arc<Vec<LinearRecord>>,
    kpis: Arc<Kpis>,
    /// Message of the failure of the current source, if it failed
    last_error: Option<String>,
    linearize_runs: usize,
    kpi_runs: usize,
}

impl AnalyticsPipeline {
    pub fn new(options: KpiOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Feeds a new raw collection.
    ///
    /// Returns `Ok(true)` when the KPIs were recomputed. The same `Arc` twice
    /// in a row is a no-op, including when the first attempt failed; check
    /// [`Self::last_error`] to tell the two apart.
    pub fn set_source(&mut self, source: Arc<str>) -> Result<bool> {
        if self
            .source
            .as_ref()
            .is_some_and(|prev| Arc::ptr_eq(prev, &source))
        {
            return Ok(false);
        }
        self.source = Some(Arc::clone(&source));

        self.linearize_runs += 1;
        let records = match linearize(&source) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Keeping previous analytics: {}", e);
                self.last_error = Some(e.to_string());
                return Err(e);
            }
        };
        self.last_error = None;

        if *self.records == records && self.kpi_runs > 0 {
            tracing::debug!("Linearized records unchanged; skipping KPI extraction");
            return Ok(false);
        }

        self.records = Arc::new(records);
        self.recompute_kpis();
        Ok(true)
    }

    /// Replaces the KPI options and recomputes from the current records
    pub fn set_options(&mut self, options: KpiOptions) {
        if self.options == options {
            return;
        }
        self.options = options;
        self.recompute_kpis();
    }

    fn recompute_kpis(&mut self) {
        self.kpi_runs += 1;
        self.kpis = Arc::new(extract_kpis(&self.records, &self.options));
        tracing::debug!(
            "Extracted KPIs for {} records (total {:.2})",
            self.kpis.document_count,
            self.kpis.total_montant
        );
    }

    pub fn options(&self) -> &KpiOptions {
        &self.options
    }

    /// Why the current source could not be processed. `None` once a source
    /// succeeds.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn records(&self) -> Arc<Vec<LinearRecord>> {
        Arc::clone(&self.records)
    }

    pub fn kpis(&self) -> Arc<Kpis> {
        Arc::clone(&self.kpis)
    }

    pub fn linearize_runs(&self) -> usize {
        self.linearize_runs
    }

    pub fn kpi_runs(&self) -> usize {
        self.kpi_runs
    }
}
