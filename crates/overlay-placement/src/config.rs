use std::collections::BTreeMap;
use std::path::Path;

use overlay_cache::{CategoryMapping, DEFAULT_MODEL};
use overlay_types::ResourceKey;
use serde::{Deserialize, Serialize};

use crate::error::{PlacementError, PlacementResult};
use crate::scale::{ScaleTable, DEFAULT_SCALE};

/// Category used for placements requested by a tap rather than a detection.
pub const MANUAL_CATEGORY: &str = "manual";

/// Configuration for the overlay: which model and scale each detection
/// category gets.
///
/// Missing fields fall back to the built-in tables. A `[models]` or
/// `[scales]` table, when present, replaces the built-in one entirely.
///
/// ```toml
/// default_model = "default.glb"
/// default_scale = 0.5
/// manual_category = "manual"
///
/// [models]
/// couch = "sofa.glb"
///
/// [scales]
/// couch = 0.7
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OverlayConfig {
    /// Model shown for categories without an entry in `models`.
    pub default_model: String,
    /// Scale used for categories without an entry in `scales`.
    pub default_scale: f32,
    /// Category label given to manual placements.
    pub manual_category: String,
    // Tables last: TOML requires plain values before tables.
    /// Category label to model key.
    pub models: BTreeMap<String, String>,
    /// Category label to uniform scale factor.
    pub scales: BTreeMap<String, f32>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        let mapping = CategoryMapping::default();
        let scales = ScaleTable::default();
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            default_scale: DEFAULT_SCALE,
            manual_category: MANUAL_CATEGORY.to_string(),
            models: mapping
                .entries()
                .map(|(label, key)| (label.to_string(), key.to_string()))
                .collect(),
            scales: scales
                .entries()
                .map(|(label, scale)| (label.to_string(), scale))
                .collect(),
        }
    }
}

impl OverlayConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> PlacementResult<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| PlacementError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse, and validate a TOML file.
    pub fn load(path: &Path) -> PlacementResult<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> PlacementResult<String> {
        toml::to_string_pretty(self).map_err(|e| PlacementError::Config(e.to_string()))
    }

    /// Check that every key is non-blank and every scale is finite and positive.
    pub fn validate(&self) -> PlacementResult<()> {
        check_model("default_model", &self.default_model)?;
        if self.manual_category.trim().is_empty() {
            return Err(PlacementError::Config(
                "manual_category must not be empty".into(),
            ));
        }
        for (category, model) in &self.models {
            check_model(&format!("model for category '{category}'"), model)?;
        }
        check_scale("default_scale", self.default_scale)?;
        for (category, scale) in &self.scales {
            check_scale(&format!("scale for category '{category}'"), *scale)?;
        }
        Ok(())
    }

    /// The category-to-model table described by this configuration.
    pub fn category_mapping(&self) -> CategoryMapping {
        self.models
            .iter()
            .fold(CategoryMapping::new(self.default_model.as_str()), |mapping, (category, model)| {
                mapping.with(category.as_str(), model.as_str())
            })
    }

    /// The category-to-scale table described by this configuration.
    pub fn scale_table(&self) -> ScaleTable {
        self.scales
            .iter()
            .fold(ScaleTable::new(self.default_scale), |table, (category, scale)| {
                table.with(category.as_str(), *scale)
            })
    }
}

fn check_model(what: &str, model: &str) -> PlacementResult<()> {
    ResourceKey::parse(model)
        .map(drop)
        .map_err(|e| PlacementError::Config(format!("{what}: {e}")))
}

fn check_scale(what: &str, scale: f32) -> PlacementResult<()> {
    if scale.is_finite() && scale > 0.0 {
        Ok(())
    } else {
        Err(PlacementError::Config(format!(
            "{what} must be finite and positive, got {scale}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config() {
        let c = OverlayConfig::default();
        assert_eq!(c.default_model, "default.glb");
        assert_eq!(c.models.get("couch").map(String::as_str), Some("sofa.glb"));
        assert_eq!(c.scales.get("couch"), Some(&0.7));
        assert_eq!(c.manual_category, "manual");
        c.validate().unwrap();
    }

    #[test]
    fn default_tables_match_builtins() {
        let c = OverlayConfig::default();
        assert_eq!(c.category_mapping(), CategoryMapping::default());
        assert_eq!(c.scale_table(), ScaleTable::default());
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let c = OverlayConfig::from_toml_str("default_scale = 0.25\n").unwrap();
        assert_eq!(c.default_scale, 0.25);
        assert_eq!(c.default_model, "default.glb");
        assert_eq!(c.scale_table().scale_for("lamp"), 0.25);
        assert_eq!(c.scale_table().scale_for("couch"), 0.7);
    }

    #[test]
    fn tables_replace_builtins() {
        let doc = r#"
default_model = "cube.glb"

[models]
lamp = "lamp.glb"

[scales]
lamp = 1.5
"#;
        let c = OverlayConfig::from_toml_str(doc).unwrap();
        let mapping = c.category_mapping();
        assert_eq!(mapping.resolve("lamp").as_str(), "lamp.glb");
        assert_eq!(mapping.resolve("couch").as_str(), "cube.glb");
        assert_eq!(c.scale_table().scale_for("lamp"), 1.5);
        assert_eq!(c.scale_table().scale_for("couch"), DEFAULT_SCALE);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = OverlayConfig::from_toml_str("default_modle = \"x.glb\"\n").unwrap_err();
        assert!(matches!(err, PlacementError::Config(_)));
    }

    #[test]
    fn rejects_non_positive_scale() {
        let err = OverlayConfig::from_toml_str("[scales]\ntv = 0.0\n").unwrap_err();
        assert!(err.to_string().contains("tv"));
        assert!(OverlayConfig::from_toml_str("default_scale = -1.0\n").is_err());
    }

    #[test]
    fn rejects_blank_model() {
        let err = OverlayConfig::from_toml_str("[models]\nbed = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("bed"));
    }

    #[test]
    fn rejects_blank_default_model() {
        let err = OverlayConfig::from_toml_str("default_model = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("default_model"));
    }

    #[test]
    fn toml_roundtrip() {
        let c = OverlayConfig::default();
        let text = c.to_toml_string().unwrap();
        assert_eq!(OverlayConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "manual_category = \"tap\"").unwrap();
        let c = OverlayConfig::load(file.path()).unwrap();
        assert_eq!(c.manual_category, "tap");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = OverlayConfig::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, PlacementError::Io(_)));
    }
}
