use serde::Deserialize;
use std::{fs, io::ErrorKind, path::PathBuf};

use crate::{
    chart::ChartOptions,
    pipeline::TariffError,
    sources::{builtin_layouts, CsvLayout},
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:5000".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
        }
    }
}

/// How the rendered chart reaches the browser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartDelivery {
    /// Base64 `data:` URI embedded in the response.
    #[default]
    Inline,
    /// Written to the chart store and referenced by URL.
    Stored,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub output_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub delivery: ChartDelivery,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("charts"),
            width: 1000,
            height: 500,
            delivery: ChartDelivery::Inline,
        }
    }
}

impl ChartConfig {
    pub fn options(&self) -> ChartOptions {
        ChartOptions {
            width: self.width,
            height: self.height,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub chart: ChartConfig,
    pub default_layout: String,
    /// Extra layouts; a name matching a built-in layout replaces it.
    pub layouts: Vec<CsvLayout>,
    pub metrics: Option<MetricsConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            chart: ChartConfig::default(),
            default_layout: "named".to_string(),
            layouts: Vec::new(),
            metrics: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("TARIFF_CONFIG").unwrap_or_else(|_| "tariff-config.toml".to_string());
        let cfg = match fs::read_to_string(&path) {
            Ok(contents) => Self::from_toml_str(&contents)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path, "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(cfg)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), TariffError> {
        for layout in &self.layouts {
            layout.validate()?;
        }
        self.layout(&self.default_layout)?;
        Ok(())
    }

    pub fn layout(&self, name: &str) -> Result<&CsvLayout, TariffError> {
        self.layouts
            .iter()
            .chain(builtin_layouts())
            .find(|l| l.name == name)
            .ok_or_else(|| TariffError::UnknownLayout(name.to_string()))
    }

    /// Every selectable layout name, configured ones first.
    pub fn layout_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for layout in self.layouts.iter().chain(builtin_layouts()) {
            if !names.contains(&layout.name.as_str()) {
                names.push(&layout.name);
            }
        }
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ColumnSpec;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:5000");
        assert_eq!(cfg.chart.delivery, ChartDelivery::Inline);
        assert_eq!(cfg.default_layout, "named");
        assert!(cfg.metrics.is_none());
        assert_eq!(cfg.layout_names(), vec!["named", "named_time", "positional_time"]);
    }

    #[test]
    fn configured_layout_overrides_builtin() {
        let cfg = AppConfig::from_toml_str(
            r#"
            default_layout = "named_time"

            [chart]
            delivery = "stored"
            output_dir = "/tmp/charts"

            [[layouts]]
            name = "named_time"
            columns = { kind = "named", date = "Date", kwh = "Usage", time = "Time" }
            "#,
        )
        .unwrap();

        assert_eq!(cfg.chart.delivery, ChartDelivery::Stored);
        assert_eq!(cfg.chart.width, 1000);
        let layout = cfg.layout("named_time").unwrap();
        assert!(matches!(&layout.columns, ColumnSpec::Named { kwh, .. } if kwh == "Usage"));
        assert_eq!(cfg.layout_names(), vec!["named_time", "named", "positional_time"]);
    }

    #[test]
    fn unknown_default_layout_is_rejected() {
        assert!(AppConfig::from_toml_str(r#"default_layout = "nope""#).is_err());
    }

    #[test]
    fn unknown_layout_lookup_fails() {
        let cfg = AppConfig::default();
        assert!(matches!(cfg.layout("nope"), Err(TariffError::UnknownLayout(_))));
    }
}
