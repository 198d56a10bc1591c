use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("../../../config/labels.yaml");

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Failed to read label catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse label catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Label catalog is empty")]
    Empty,
    #[error("Duplicate label in catalog: {0}")]
    Duplicate(String),
    #[error("Label {0} has no treatment text")]
    MissingTreatment(String),
    #[error("Fallback label {0} is not part of the label set")]
    UnknownFallback(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelEntry {
    pub name: String,
    pub treatment: String,
}

/// Ordered label set plus treatment advice. Index `i` of the classifier output
/// corresponds to `labels[i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelCatalog {
    pub version: f32,
    pub fallback: String,
    pub labels: Vec<LabelEntry>,
}

impl LabelCatalog {
    /// The catalog compiled into the binary from `config/labels.yaml`.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml(DEFAULT_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let config_str = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<Self, CatalogError> {
        let catalog: LabelCatalog = serde_yaml::from_str(config_str)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        if self.labels.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &self.labels {
            if !seen.insert(entry.name.as_str()) {
                return Err(CatalogError::Duplicate(entry.name.clone()));
            }
            if entry.treatment.trim().is_empty() {
                return Err(CatalogError::MissingTreatment(entry.name.clone()));
            }
        }

        if !seen.contains(self.fallback.as_str()) {
            return Err(CatalogError::UnknownFallback(self.fallback.clone()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|entry| entry.name.as_str())
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn treatment(&self, label: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|entry| entry.name == label)
            .map(|entry| entry.treatment.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = LabelCatalog::builtin().unwrap();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.fallback(), "healthy");
        assert!(catalog.treatment("healthy").is_some());
        assert_eq!(catalog.label(0), Some("Bacterial Spot"));
        assert_eq!(catalog.label(10), None);
    }

    #[test]
    fn rejects_fallback_outside_label_set() {
        let yaml = r#"
version: 1.0
fallback: healthy
labels:
  - name: Rust
    treatment: Spray.
"#;
        let err = LabelCatalog::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownFallback(ref l) if l == "healthy"));
    }

    #[test]
    fn rejects_duplicates_and_blank_treatments() {
        let duplicate = r#"
version: 1.0
fallback: healthy
labels:
  - name: healthy
    treatment: Fine.
  - name: healthy
    treatment: Fine.
"#;
        assert!(matches!(
            LabelCatalog::from_yaml(duplicate),
            Err(CatalogError::Duplicate(_))
        ));

        let blank = r#"
version: 1.0
fallback: healthy
labels:
  - name: healthy
    treatment: "  "
"#;
        assert!(matches!(
            LabelCatalog::from_yaml(blank),
            Err(CatalogError::MissingTreatment(_))
        ));
    }

    #[test]
    fn rejects_empty_catalog() {
        let yaml = "version: 1.0\nfallback: healthy\nlabels: []\n";
        assert!(matches!(LabelCatalog::from_yaml(yaml), Err(CatalogError::Empty)));
    }
}
