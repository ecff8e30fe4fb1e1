//! Schema descriptors: column name to semantic type, per table.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Semantic type of a column. Drives coercion between the stored and displayed forms.
///
/// The serialized names are the tokens used by the sheet-side schema definitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnType {
    /// Row identifier. Stored and shown as text.
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "texto", alias = "text")]
    Text,
    /// Calendar date, stored as `dd/mm/yyyy` text.
    #[serde(rename = "data", alias = "date")]
    Date,
    /// Number stored multiplied by 100 and shown unscaled.
    #[serde(rename = "numero100", alias = "number100")]
    Number100,
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(ColumnType::Id),
            "texto" | "text" => Ok(ColumnType::Text),
            "data" | "date" => Ok(ColumnType::Date),
            "numero100" | "number100" => Ok(ColumnType::Number100),
            other => Err(format!("unknown column type: {}", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    #[serde(rename = "type")]
    pub col_type: ColumnType,
}

/// Ordered column definitions for one table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TableSchema {
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    pub fn new() -> Self {
        TableSchema { columns: Vec::new() }
    }

    /// Builder: append a column.
    pub fn column(mut self, name: &str, col_type: ColumnType) -> Self {
        self.columns.push(ColumnDef {
            name: name.to_string(),
            col_type,
        });
        self
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn type_of(&self, column: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == column).map(|c| c.col_type)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c.name == column)
    }
}

/// Worksheet names of the built-in tables.
pub mod tables {
    pub const USERS: &str = "users";
    pub const PERMISSIONS: &str = "permissions";
    pub const FEATURES: &str = "features";
    pub const MENUS: &str = "menus";
    pub const CLIENTS: &str = "clients";
}

/// Name of the identifier column every table carries.
pub const ID_COLUMN: &str = "ID";

pub fn users_schema() -> TableSchema {
    TableSchema::new()
        .column(ID_COLUMN, ColumnType::Id)
        .column("Name", ColumnType::Text)
        .column("Email", ColumnType::Text)
        .column("Password", ColumnType::Text)
}

pub fn permissions_schema() -> TableSchema {
    TableSchema::new()
        .column(ID_COLUMN, ColumnType::Id)
        .column("UserID", ColumnType::Text)
        .column("FeatureID", ColumnType::Text)
}

pub fn features_schema() -> TableSchema {
    TableSchema::new()
        .column(ID_COLUMN, ColumnType::Id)
        .column("MenuID", ColumnType::Text)
        .column("Name", ColumnType::Text)
        .column("Path", ColumnType::Text)
}

pub fn menus_schema() -> TableSchema {
    TableSchema::new()
        .column(ID_COLUMN, ColumnType::Id)
        .column("Name", ColumnType::Text)
        .column("Order", ColumnType::Number100)
}

pub fn clients_schema() -> TableSchema {
    TableSchema::new()
        .column(ID_COLUMN, ColumnType::Id)
        .column("TaxID", ColumnType::Text)
        .column("Source", ColumnType::Text)
        .column("HealthPlan", ColumnType::Text)
        .column("Name", ColumnType::Text)
        .column("TradeName", ColumnType::Text)
        .column("BirthDate", ColumnType::Date)
        .column("PostalCode", ColumnType::Text)
        .column("Street", ColumnType::Text)
        .column("Number", ColumnType::Text)
        .column("Complement", ColumnType::Text)
        .column("District", ColumnType::Text)
        .column("City", ColumnType::Text)
        .column("State", ColumnType::Text)
        .column("Occupation", ColumnType::Text)
        .column("Notes", ColumnType::Text)
        .column("RegisteredAt", ColumnType::Date)
        .column("Mobile", ColumnType::Text)
        .column("Mobile2", ColumnType::Text)
}

/// Every built-in table with its schema, in bootstrap order.
pub fn builtin_tables() -> Vec<(&'static str, TableSchema)> {
    vec![
        (tables::USERS, users_schema()),
        (tables::MENUS, menus_schema()),
        (tables::FEATURES, features_schema()),
        (tables::PERMISSIONS, permissions_schema()),
        (tables::CLIENTS, clients_schema()),
    ]
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

impl ValidationRule {
    pub fn required() -> Self {
        ValidationRule {
            required: Some(true),
            ..Default::default()
        }
    }

    pub fn format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.minimum = Some(min);
        self
    }
}
