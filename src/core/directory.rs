//! Sorting and filtering support for the client and contact directories

use strum::{Display, EnumIter, EnumString};

use crate::core::filtering::{FilterKind, Filterable};
use crate::core::records::{Client, Contact};
use crate::core::sorting::{FieldValue, Sortable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ClientField {
    Nom,
    Ville,
    Secteur,
    Region,
    Categorie,
    Entreprise,
    DateCreation,
}

impl Sortable for Client {
    type Field = ClientField;

    fn field_value(&self, field: ClientField) -> FieldValue<'_> {
        let text = match field {
            ClientField::Nom => Some(self.nom.as_str()),
            ClientField::Ville => self.ville.as_deref(),
            ClientField::Secteur => self.secteur.as_deref(),
            ClientField::Region => self.region.as_deref(),
            ClientField::Categorie => self.categorie.as_deref(),
            ClientField::Entreprise => self.entreprise.as_deref(),
            ClientField::DateCreation => return FieldValue::Date(self.date_creation.as_deref()),
        };
        FieldValue::Text(text.unwrap_or_default())
    }
}

impl Filterable for Client {
    fn filter_value(&self, kind: FilterKind) -> Option<&str> {
        match kind {
            FilterKind::Categories => self.categorie.as_deref(),
            FilterKind::Cities => self.ville.as_deref(),
            FilterKind::Sectors => self.secteur.as_deref(),
            FilterKind::Regions => self.region.as_deref(),
            FilterKind::Companies => Some(self.entreprise.as_deref().unwrap_or(&self.nom)),
        }
    }

    fn search_text(&self) -> String {
        [
            Some(self.nom.as_str()),
            self.entreprise.as_deref(),
            self.ville.as_deref(),
            self.secteur.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ContactField {
    Nom,
    Prenom,
    Email,
    Fonction,
    Entreprise,
    Ville,
}

impl Sortable for Contact {
    type Field = ContactField;

    fn field_value(&self, field: ContactField) -> FieldValue<'_> {
        let value = match field {
            ContactField::Nom => Some(self.nom.as_str()),
            ContactField::Prenom => self.prenom.as_deref(),
            ContactField::Email => self.email.as_deref(),
            ContactField::Fonction => self.fonction.as_deref(),
            ContactField::Entreprise => self.entreprise.as_deref(),
            ContactField::Ville => self.ville.as_deref(),
        };
        FieldValue::Text(value.unwrap_or_default())
    }
}

impl Filterable for Contact {
    /// Contacts carry no category, sector or region
    fn filter_value(&self, kind: FilterKind) -> Option<&str> {
        match kind {
            FilterKind::Cities => self.ville.as_deref(),
            FilterKind::Companies => self.entreprise.as_deref(),
            FilterKind::Categories | FilterKind::Sectors | FilterKind::Regions => None,
        }
    }

    fn search_text(&self) -> String {
        let mut text = self.full_name();
        for part in [&self.email, &self.entreprise, &self.fonction]
            .into_iter()
            .flatten()
        {
            text.push(' ');
            text.push_str(part);
        }
        text
    }
}
