//! Page model validation: path uniqueness and consistency with each table schema.

use crate::config::{PageModel, ID_COLUMN};
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(model: &PageModel) -> Result<(), ConfigError> {
    let mut path_segments = HashSet::new();
    for page in &model.pages {
        if page.path_segment.is_empty() || page.path_segment.contains('/') {
            return Err(ConfigError::Validation(format!(
                "invalid path segment '{}'",
                page.path_segment
            )));
        }
        if !path_segments.insert(page.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(page.path_segment.clone()));
        }
        if !page.schema.contains(ID_COLUMN) {
            return Err(ConfigError::MissingReference {
                kind: "id column",
                id: page.table.clone(),
            });
        }
        for col in page.validation.keys().chain(page.sensitive_columns.iter()) {
            if !page.schema.contains(col) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", page.table, col),
                });
            }
        }
        let mut names = HashSet::new();
        for col in &page.schema.columns {
            if !names.insert(col.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "table {} has columns differing only by case: {}",
                    page.table, col.name
                )));
            }
        }
    }
    Ok(())
}
