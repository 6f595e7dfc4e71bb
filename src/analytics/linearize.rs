//! Flattening of nested business documents into one record per document

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::core::error::{Error, Result};
use crate::core::filtering::{FilterKind, Filterable};
use crate::core::records::{BusinessDocument, DocumentKind, ProductLine};
use crate::core::sorting::{FieldValue, Sortable};

/// Keys under which list endpoints wrap their payload
const ENVELOPE_KEYS: &[&str] = &["data", "items", "results"];

/// Single-level view of a [`BusinessDocument`] for tables and reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRecord {
    pub document_id: String,
    pub kind: DocumentKind,
    pub reference: Option<String>,
    pub client_nom: String,
    pub client_ville: Option<String>,
    pub client_secteur: Option<String>,
    pub client_region: Option<String>,
    pub client_categorie: Option<String>,
    pub contact_nom: Option<String>,
    /// Product designations joined with ", "
    pub produits: String,
    pub nb_produits: usize,
    pub montant: f64,
    pub date: Option<String>,
    pub statut: String,
    pub probabilite: Option<f64>,
}

impl LinearRecord {
    /// Flattens one document. `index` is its position in the collection and
    /// only serves error reporting.
    pub fn from_document(index: usize, doc: &BusinessDocument) -> Result<Self> {
        if doc.client.nom.trim().is_empty() {
            return Err(Error::processing(index, "has an empty client name"));
        }
        if doc.statut.trim().is_empty() {
            return Err(Error::processing(index, "has an empty statut"));
        }
        let montant = doc
            .resolved_amount()
            .ok_or_else(|| Error::processing(index, "has no montant and no product lines"))?;

        Ok(Self {
            document_id: doc.id.to_string(),
            kind: doc.kind,
            reference: doc.reference.clone(),
            client_nom: doc.client.nom.trim().to_string(),
            client_ville: doc.client.ville.clone(),
            client_secteur: doc.client.secteur.clone(),
            client_region: doc.client.region.clone(),
            client_categorie: doc.client.categorie.clone(),
            contact_nom: doc.contact.as_ref().map(crate::core::records::Contact::full_name),
            produits: doc
                .produits
                .iter()
                .map(|p: &ProductLine| p.designation.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            nb_produits: doc.produits.len(),
            montant,
            date: doc.resolved_date().map(str::to_string),
            statut: doc.statut.trim().to_string(),
            probabilite: doc.probabilite,
        })
    }
}

/// Stage 1: parses a JSON collection of documents and flattens each one.
///
/// Accepts a bare array or an object wrapping the array under `data`,
/// `items` or `results`. Malformed JSON is a [`Error::Parse`]; a document
/// that is missing required fields is a [`Error::Processing`] naming its
/// position.
pub fn linearize(json: &str) -> Result<Vec<LinearRecord>> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| Error::parse("document collection", e))?;

    let documents = match value {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => ENVELOPE_KEYS
            .iter()
            .find_map(|k| match map.remove(*k) {
                Some(serde_json::Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| Error::processing(0, "collection is not a JSON array"))?,
        _ => return Err(Error::processing(0, "collection is not a JSON array")),
    };

    documents
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let doc: BusinessDocument = serde_json::from_value(raw)
                .map_err(|e| Error::processing(index, format!("is malformed: {e}")))?;
            LinearRecord::from_document(index, &doc)
        })
        .collect()
}

/// Linearizes documents that were already deserialized
pub fn linearize_documents(docs: &[BusinessDocument]) -> Result<Vec<LinearRecord>> {
    docs.iter()
        .enumerate()
        .map(|(index, doc)| LinearRecord::from_document(index, doc))
        .collect()
}

/// Sortable columns of a [`LinearRecord`] table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LinearField {
    Reference,
    #[strum(to_string = "client", serialize = "client_nom")]
    Client,
    #[strum(to_string = "ville", serialize = "client_ville")]
    Ville,
    #[strum(to_string = "contact", serialize = "contact_nom")]
    Contact,
    Montant,
    #[strum(to_string = "date", serialize = "date_creation")]
    Date,
    Statut,
    Kind,
}

impl Sortable for LinearRecord {
    type Field = LinearField;

    fn field_value(&self, field: LinearField) -> FieldValue<'_> {
        match field {
            LinearField::Reference => {
                FieldValue::Text(self.reference.as_deref().unwrap_or(&self.document_id))
            }
            LinearField::Client => FieldValue::Text(&self.client_nom),
            LinearField::Ville => {
                FieldValue::Text(self.client_ville.as_deref().unwrap_or_default())
            }
            LinearField::Contact => {
                FieldValue::Text(self.contact_nom.as_deref().unwrap_or_default())
            }
            LinearField::Montant => FieldValue::Number(self.montant),
            LinearField::Date => FieldValue::Date(self.date.as_deref()),
            LinearField::Statut => FieldValue::Text(&self.statut),
            LinearField::Kind => FieldValue::Text(self.kind.as_ref()),
        }
    }
}

impl Filterable for LinearRecord {
    fn filter_value(&self, kind: FilterKind) -> Option<&str> {
        match kind {
            FilterKind::Categories => self.client_categorie.as_deref(),
            FilterKind::Cities => self.client_ville.as_deref(),
            FilterKind::Sectors => self.client_secteur.as_deref(),
            FilterKind::Regions => self.client_region.as_deref(),
            FilterKind::Companies => Some(&self.client_nom),
        }
    }

    fn search_text(&self) -> String {
        let mut text = format!("{} {} {}", self.document_id, self.client_nom, self.statut);
        for part in [&self.reference, &self.contact_nom].into_iter().flatten() {
            text.push(' ');
            text.push_str(part);
        }
        if !self.produits.is_empty() {
            text.push(' ');
            text.push_str(&self.produits);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linearize_minimal_document() {
        let json = r#"[{"id":1,"client":{"nom":"Acme"},"montant":1000,"statut":"VALIDE"}]"#;
        let records = linearize(json).unwrap();
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.document_id, "1");
        assert_eq!(r.client_nom, "Acme");
        assert_eq!(r.montant, 1000.0);
        assert_eq!(r.statut, "VALIDE");
        assert_eq!(r.contact_nom, None);
        assert_eq!(r.nb_produits, 0);
        assert_eq!(r.produits, "");
    }

    #[test]
    fn test_linearize_full_document() {
        let json = r#"{"data":[{
            "id":"F-2024-001","type":"facture","reference":"FAC-001",
            "client":{"nom":" Beta ","ville":"Lyon","secteur":"Services","region":"ARA","categorie":"PME"},
            "contact":{"nom":"Martin","prenom":"Paul"},
            "produits":[{"designation":"Licence","quantite":3,"prix_unitaire":100},
                        {"designation":"Formation","prix_unitaire":450}],
            "date":"2024-05-02","statut":"PAYE"
        }]}"#;
        let records = linearize(json).unwrap();
        let r = &records[0];
        assert_eq!(r.kind, DocumentKind::Facture);
        assert_eq!(r.client_nom, "Beta");
        assert_eq!(r.contact_nom.as_deref(), Some("Paul Martin"));
        assert_eq!(r.produits, "Licence, Formation");
        assert_eq!(r.nb_produits, 2);
        assert_eq!(r.montant, 750.0);
        assert_eq!(r.filter_value(FilterKind::Cities), Some("Lyon"));
    }

    #[test]
    fn test_linearize_is_deterministic() {
        let json = r#"[{"id":1,"client":{"nom":"A"},"montant":1,"statut":"X"},
                       {"id":2,"client":{"nom":"B"},"montant":2,"statut":"Y"}]"#;
        assert_eq!(linearize(json).unwrap(), linearize(json).unwrap());
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        assert!(matches!(linearize("[{"), Err(Error::Parse { .. })));
    }

    #[test]
    fn test_non_array_is_processing_error() {
        assert!(matches!(
            linearize(r#"{"total": 3}"#),
            Err(Error::Processing { index: 0, .. })
        ));
        assert!(matches!(linearize("42"), Err(Error::Processing { .. })));
    }

    #[test]
    fn test_missing_nested_field_names_document() {
        let json = r#"[{"id":1,"client":{"nom":"A"},"montant":1,"statut":"X"},
                       {"id":2,"client":{"ville":"Lyon"},"montant":2,"statut":"Y"}]"#;
        match linearize(json) {
            Err(Error::Processing { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("nom"));
            }
            other => panic!("expected processing error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_amount_is_rejected() {
        let json = r#"[{"id":1,"client":{"nom":"A"},"statut":"X"}]"#;
        match linearize(json) {
            Err(Error::Processing { reason, .. }) => assert!(reason.contains("montant")),
            other => panic!("expected processing error, got {other:?}"),
        }
    }

    #[test]
    fn test_linear_field_parse() {
        assert_eq!("client".parse::<LinearField>().unwrap(), LinearField::Client);
        assert_eq!("client_nom".parse::<LinearField>().unwrap(), LinearField::Client);
        assert_eq!("date_creation".parse::<LinearField>().unwrap(), LinearField::Date);
        assert_eq!("MONTANT".parse::<LinearField>().unwrap(), LinearField::Montant);
    }

    #[test]
    fn test_linearize_documents_reports_position() {
        use crate::core::test_helpers::create_test_document;

        let mut docs = vec![
            create_test_document(1, "Acme", 10.0, "VALIDE"),
            create_test_document(2, "Beta", 20.0, "REFUSE"),
        ];
        assert_eq!(linearize_documents(&docs).unwrap().len(), 2);

        docs[1].statut = "  ".into();
        assert!(matches!(
            linearize_documents(&docs),
            Err(Error::Processing { index: 1, .. })
        ));
    }

    #[test]
    fn test_document_with_both_dates_linearizes() {
        let json = r#"[{"id":1,"type":"FACTURE","client":{"nom":"Acme"},"montant":5,"statut":"PAYE",
                        "date":"2024-01-02","date_creation":"2024-01-01"},
                       {"id":2,"client":{"nom":"Beta"},"montant":7,"statut":"PAYE",
                        "date_creation":"2024-02-01"}]"#;
        let records = linearize(json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, DocumentKind::Facture);
        assert_eq!(records[0].date.as_deref(), Some("2024-01-02"));
        assert_eq!(records[1].date.as_deref(), Some("2024-02-01"));
    }

    #[test]
    fn test_search_text_includes_products() {
        let json = r#"[{"id":1,"client":{"nom":"Acme"},"statut":"VALIDE",
                        "produits":[{"designation":"Maintenance","prix_unitaire":10}]}]"#;
        let records = linearize(json).unwrap();
        assert!(records[0].search_text().contains("Maintenance"));
    }
}
