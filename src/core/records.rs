//! Business records as returned by the back-end API
//!
//! Documents (offers, proformas, invoices, opportunities) nest a client, an
//! optional contact and product lines. Required fields are plain fields;
//! everything the API may omit is an `Option` or defaults to empty.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Identifier as sent by the API (numeric for most resources, text for some)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentId::Number(n) => write!(f, "{n}"),
            DocumentId::Text(s) => f.write_str(s),
        }
    }
}

/// Kind of commercial document
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum DocumentKind {
    #[default]
    #[serde(alias = "OFFRE", alias = "Offre")]
    Offre,
    #[serde(alias = "PROFORMA", alias = "Proforma")]
    Proforma,
    #[serde(alias = "FACTURE", alias = "Facture")]
    Facture,
    #[serde(alias = "OPPORTUNITE", alias = "Opportunite")]
    Opportunite,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Client {
    #[serde(default)]
    pub id: Option<DocumentId>,
    pub nom: String,
    #[serde(default)]
    pub categorie: Option<String>,
    #[serde(default)]
    pub ville: Option<String>,
    #[serde(default)]
    pub secteur: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub entreprise: Option<String>,
    #[serde(default, alias = "dateCreation")]
    pub date_creation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default)]
    pub id: Option<DocumentId>,
    pub nom: String,
    #[serde(default)]
    pub prenom: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub fonction: Option<String>,
    #[serde(default)]
    pub entreprise: Option<String>,
    #[serde(default)]
    pub ville: Option<String>,
}

impl Contact {
    /// "Prenom Nom", or just the last name when no first name is known
    pub fn full_name(&self) -> String {
        match self.prenom.as_deref().map(str::trim) {
            Some(prenom) if !prenom.is_empty() => format!("{prenom} {}", self.nom),
            _ => self.nom.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductLine {
    pub designation: String,
    #[serde(default = "default_quantity")]
    pub quantite: f64,
    #[serde(default, alias = "prixUnitaire")]
    pub prix_unitaire: f64,
}

fn default_quantity() -> f64 {
    1.0
}

impl ProductLine {
    pub fn total(&self) -> f64 {
        self.quantite * self.prix_unitaire
    }
}

/// A nested commercial document (offer, proforma, invoice or opportunity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessDocument {
    pub id: DocumentId,
    #[serde(default, alias = "type")]
    pub kind: DocumentKind,
    #[serde(default)]
    pub reference: Option<String>,
    pub client: Client,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub produits: Vec<ProductLine>,
    #[serde(default)]
    pub montant: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, alias = "dateCreation")]
    pub date_creation: Option<String>,
    pub statut: String,
    /// Win probability in percent (opportunities)
    #[serde(default)]
    pub probabilite: Option<f64>,
}

impl BusinessDocument {
    /// Declared amount, or the sum of the product lines when the API left it out
    pub fn resolved_amount(&self) -> Option<f64> {
        self.montant.or_else(|| {
            if self.produits.is_empty() {
                None
            } else {
                Some(self.produits.iter().map(ProductLine::total).sum())
            }
        })
    }

    /// Document date, or the creation date when the API only sent that
    pub fn resolved_date(&self) -> Option<&str> {
        self.date.as_deref().or(self.date_creation.as_deref())
    }
}
