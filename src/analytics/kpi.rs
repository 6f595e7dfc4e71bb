//! KPI extraction over linearized records

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::linearize::LinearRecord;
use crate::core::dates::month_key;
use crate::core::sorting::collation_key;

/// Statuses that count as a won/closed deal unless configured otherwise
pub const DEFAULT_WON_STATUSES: &[&str] = &["VALIDE", "ACCEPTE", "GAGNE", "PAYE"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiOptions {
    /// Compared against `statut` ignoring case and accents
    pub won_statuses: Vec<String>,
}

impl Default for KpiOptions {
    fn default() -> Self {
        Self {
            won_statuses: DEFAULT_WON_STATUSES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl KpiOptions {
    pub fn is_won(&self, statut: &str) -> bool {
        let statut = collation_key(statut.trim());
        self.won_statuses
            .iter()
            .any(|s| collation_key(s.trim()) == statut)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopClient {
    pub nom: String,
    pub montant: f64,
}

/// Summary of a collection of [`LinearRecord`]s
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub document_count: usize,
    pub total_montant: f64,
    pub average_montant: f64,
    pub count_by_status: BTreeMap<String, usize>,
    pub montant_by_status: BTreeMap<String, f64>,
    pub montant_by_client: BTreeMap<String, f64>,
    /// Keyed by `YYYY-MM`; records without a valid date are left out
    pub montant_by_month: BTreeMap<String, f64>,
    /// Amounts scaled by win probability; records without one count in full
    pub weighted_montant: f64,
    pub won_count: usize,
    /// `won_count / document_count`, 0 for an empty collection
    pub acceptance_rate: f64,
    pub top_client: Option<TopClient>,
}

/// Stage 2: aggregates records into [`Kpis`]. Pure; the same input always
/// yields the same output.
pub fn extract_kpis(records: &[LinearRecord], options: &KpiOptions) -> Kpis {
    let mut kpis = Kpis {
        document_count: records.len(),
        ..Kpis::default()
    };

    for record in records {
        kpis.total_montant += record.montant;

        *kpis
            .count_by_status
            .entry(record.statut.clone())
            .or_default() += 1;
        *kpis
            .montant_by_status
            .entry(record.statut.clone())
            .or_default() += record.montant;
        *kpis
            .montant_by_client
            .entry(record.client_nom.clone())
            .or_default() += record.montant;

        if let Some(month) = record.date.as_deref().and_then(month_key) {
            *kpis.montant_by_month.entry(month).or_default() += record.montant;
        }

        kpis.weighted_montant += match record.probabilite {
            Some(p) => record.montant * p.clamp(0.0, 100.0) / 100.0,
            None => record.montant,
        };

        if options.is_won(&record.statut) {
            kpis.won_count += 1;
        }
    }

    if kpis.document_count > 0 {
        let count = kpis.document_count as f64;
        kpis.average_montant = kpis.total_montant / count;
        kpis.acceptance_rate = kpis.won_count as f64 / count;
    }

    // BTreeMap order makes ties resolve to the alphabetically first client
    kpis.top_client = kpis
        .montant_by_client
        .iter()
        .fold(None::<(&String, f64)>, |best, (nom, &montant)| match best {
            Some((_, best_montant)) if best_montant >= montant => best,
            _ => Some((nom, montant)),
        })
        .map(|(nom, montant)| TopClient {
            nom: nom.clone(),
            montant,
        });

    kpis
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::linearize::linearize;

    fn records(json: &str) -> Vec<LinearRecord> {
        linearize(json).unwrap()
    }

    #[test]
    fn test_single_record_kpis() {
        let recs =
            records(r#"[{"id":1,"client":{"nom":"Acme"},"montant":1000,"statut":"VALIDE"}]"#);
        let kpis = extract_kpis(&recs, &KpiOptions::default());

        assert_eq!(kpis.document_count, 1);
        assert_eq!(kpis.total_montant, 1000.0);
        assert_eq!(kpis.count_by_status, BTreeMap::from([("VALIDE".to_string(), 1)]));
        assert_eq!(kpis.won_count, 1);
        assert_eq!(kpis.acceptance_rate, 1.0);
        assert_eq!(
            kpis.top_client,
            Some(TopClient {
                nom: "Acme".into(),
                montant: 1000.0
            })
        );
    }

    #[test]
    fn test_empty_collection() {
        let kpis = extract_kpis(&[], &KpiOptions::default());
        assert_eq!(kpis, Kpis::default());
    }

    #[test]
    fn test_grouped_totals() {
        let recs = records(
            r#"[
            {"id":1,"client":{"nom":"Acme"},"montant":100,"statut":"VALIDE","date":"2024-01-10"},
            {"id":2,"client":{"nom":"Beta"},"montant":300,"statut":"EN_ATTENTE","date":"15/01/2024"},
            {"id":3,"client":{"nom":"Acme"},"montant":250,"statut":"REFUSE","date":"2024-02-01"},
            {"id":4,"client":{"nom":"Gamma"},"montant":50,"statut":"valide","date":"n/a"}
        ]"#,
        );
        let kpis = extract_kpis(&recs, &KpiOptions::default());

        assert_eq!(kpis.total_montant, 700.0);
        assert_eq!(kpis.average_montant, 175.0);
        assert_eq!(kpis.count_by_status["VALIDE"], 1);
        assert_eq!(kpis.count_by_status["valide"], 1);
        assert_eq!(kpis.montant_by_client["Acme"], 350.0);
        assert_eq!(kpis.montant_by_month["2024-01"], 400.0);
        assert_eq!(kpis.montant_by_month["2024-02"], 250.0);
        assert_eq!(kpis.montant_by_month.len(), 2);
        // Won statuses compare case-insensitively
        assert_eq!(kpis.won_count, 2);
        assert_eq!(kpis.acceptance_rate, 0.5);
        assert_eq!(kpis.top_client.unwrap().nom, "Acme");
    }

    #[test]
    fn test_weighted_amounts() {
        let recs = records(
            r#"[
            {"id":1,"type":"opportunite","client":{"nom":"A"},"montant":1000,"statut":"OUVERTE","probabilite":25},
            {"id":2,"type":"opportunite","client":{"nom":"B"},"montant":200,"statut":"OUVERTE","probabilite":150},
            {"id":3,"client":{"nom":"C"},"montant":10,"statut":"OUVERTE"}
        ]"#,
        );
        let kpis = extract_kpis(&recs, &KpiOptions::default());
        // 250 + 200 (clamped to 100%) + 10
        assert_eq!(kpis.weighted_montant, 460.0);
    }

    #[test]
    fn test_top_client_tie_prefers_first_name() {
        let recs = records(
            r#"[
            {"id":1,"client":{"nom":"Zeta"},"montant":100,"statut":"X"},
            {"id":2,"client":{"nom":"Alpha"},"montant":100,"statut":"X"}
        ]"#,
        );
        let kpis = extract_kpis(&recs, &KpiOptions::default());
        assert_eq!(kpis.top_client.unwrap().nom, "Alpha");
    }

    #[test]
    fn test_custom_won_statuses() {
        let recs = records(r#"[{"id":1,"client":{"nom":"A"},"montant":1,"statut":"SIGNE"}]"#);
        let options = KpiOptions {
            won_statuses: vec!["signe".into()],
        };
        assert_eq!(extract_kpis(&recs, &options).won_count, 1);
        assert_eq!(extract_kpis(&recs, &KpiOptions::default()).won_count, 0);
    }

    #[test]
    fn test_won_status_ignores_accents_and_case() {
        let options = KpiOptions {
            won_statuses: vec!["validé".into()],
        };
        assert!(options.is_won("VALIDÉ"));
        assert!(options.is_won("Validé"));
        assert!(KpiOptions::default().is_won("VALIDÉ"));
        assert!(!options.is_won("REFUSÉ"));
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let recs = records(
            r#"[{"id":1,"client":{"nom":"A"},"montant":3,"statut":"X","date":"2024-03-01"}]"#,
        );
        let options = KpiOptions::default();
        assert_eq!(extract_kpis(&recs, &options), extract_kpis(&recs, &options));
    }
}
