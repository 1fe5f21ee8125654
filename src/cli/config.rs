// FILE: src/cli/config.rs

use crate::error::{Result, ScanError};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub classpath: Option<Vec<String>>,
    pub full_classpath: Option<bool>,
    pub widget_exports: Option<bool>,
    pub react_enabled: Option<bool>,
    pub excluded_packages: Option<Vec<String>>,
    pub excluded_suffixes: Option<Vec<String>>,
    pub output: Option<String>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| ScanError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;
    let config = parse(config_path, &config_content)?;
    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}

fn parse(config_path: &str, config_content: &str) -> Result<ConfigFile> {
    if config_path.ends_with(".json") {
        serde_json::from_str(config_content).map_err(|e| ScanError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })
    } else if config_path.ends_with(".toml") {
        toml::from_str(config_content).map_err(|e| ScanError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })
    } else {
        Err(ScanError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_and_json_configs() {
        let toml = r#"
            classpath = ["target/classes", "lib/app.jar"]
            react_enabled = true
            excluded_packages = ["com.vendor"]
        "#;
        let config = parse("frontscan.toml", toml).unwrap();
        assert_eq!(config.classpath.unwrap().len(), 2);
        assert_eq!(config.react_enabled, Some(true));
        assert_eq!(config.excluded_packages.unwrap(), vec!["com.vendor"]);

        let config = parse("frontscan.json", r#"{"full_classpath": true, "output": "report.json"}"#).unwrap();
        assert_eq!(config.full_classpath, Some(true));
        assert_eq!(config.output.as_deref(), Some("report.json"));
        assert!(config.classpath.is_none());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        assert!(matches!(
            parse("frontscan.yaml", "classpath: []"),
            Err(ScanError::InvalidFormat { .. })
        ));
        assert!(matches!(load("/nonexistent/frontscan.toml"), Err(ScanError::FileNotFound { .. })));
    }
}
