//! Shared test utilities for core module tests
//!
//! Provides common test helpers to avoid duplication across test suites.
//! This module is only compiled in test mode.

use crate::analytics::linearize::LinearRecord;
use crate::core::records::{
    BusinessDocument, Client, Contact, DocumentId, DocumentKind, ProductLine,
};

/// Creates a minimal document: numeric id, client name, amount and status.
///
/// This is the canonical helper for creating test documents.
pub fn create_test_document(id: i64, client: &str, montant: f64, statut: &str) -> BusinessDocument {
    BusinessDocument {
        id: DocumentId::Number(id),
        kind: DocumentKind::Offre,
        reference: None,
        client: Client {
            nom: client.to_string(),
            ..Client::default()
        },
        contact: None,
        produits: Vec::new(),
        montant: Some(montant),
        date: None,
        date_creation: None,
        statut: statut.to_string(),
        probabilite: None,
    }
}

/// Creates a document with every optional field populated.
///
/// # Arguments
///
/// * `id` - Numeric document id, also used to derive the reference
/// * `kind` - Document kind
/// * `client` - Client name
/// * `ville` - Client city
/// * `date` - Creation date as sent by the API
pub fn create_full_test_document(
    id: i64,
    kind: DocumentKind,
    client: &str,
    ville: &str,
    date: &str,
) -> BusinessDocument {
    BusinessDocument {
        id: DocumentId::Number(id),
        kind,
        reference: Some(format!("REF-{id:04}")),
        client: Client {
            nom: client.to_string(),
            ville: Some(ville.to_string()),
            secteur: Some("Services".to_string()),
            region: Some("Nord".to_string()),
            categorie: Some("PME".to_string()),
            ..Client::default()
        },
        contact: Some(Contact {
            nom: "Martin".to_string(),
            prenom: Some("Claire".to_string()),
            ..Contact::default()
        }),
        produits: vec![
            ProductLine {
                designation: "Licence".to_string(),
                quantite: 2.0,
                prix_unitaire: 100.0,
            },
            ProductLine {
                designation: "Support".to_string(),
                quantite: 1.0,
                prix_unitaire: 50.0,
            },
        ],
        montant: None,
        date: Some(date.to_string()),
        date_creation: None,
        statut: "EN_COURS".to_string(),
        probabilite: Some(50.0),
    }
}

/// Linearizes a single minimal document.
pub fn create_test_record(id: i64, client: &str, montant: f64, statut: &str) -> LinearRecord {
    LinearRecord::from_document(0, &create_test_document(id, client, montant, statut))
        .expect("test document is valid")
}

/// JSON collection with three documents of different kinds and cities
pub fn sample_collection_json() -> String {
    let docs = vec![
        create_full_test_document(1, DocumentKind::Offre, "Acme", "Lyon", "2024-01-15"),
        create_full_test_document(2, DocumentKind::Facture, "Beta", "Paris", "2024-02-03"),
        create_full_test_document(3, DocumentKind::Proforma, "Éclair", "Lyon", "not a date"),
    ];
    serde_json::to_string(&docs).expect("test documents serialize")
}
