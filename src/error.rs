//! Error types for the frontend dependency scanner

use std::fmt;
use thiserror::Error;

/// A class that declares a scan-global configuration value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclarationSite {
    /// Fully-qualified name of the declaring class
    pub class_name: String,
    /// Human readable rendering of the declared value
    pub value: String,
}

impl DeclarationSite {
    pub fn new(class_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for DeclarationSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "found '{}' in '{}'", self.value, self.class_name)
    }
}

/// Joins declaration sites one per line, indented under the error headline
fn format_sites(sites: &[DeclarationSite]) -> String {
    sites
        .iter()
        .map(|site| site.to_string())
        .collect::<Vec<_>>()
        .join("\n      ")
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed class file for '{class}': {message}")]
    Parse { class: String, message: String },

    #[error("Class '{class}' uses unsupported class file version {major}.{minor}")]
    UnsupportedVersion { class: String, major: u16, minor: u16 },

    #[error(
        "Class '{class}' uses class file version {major}, below the minimum supported version {minimum}. \
         This usually means a dependency was compiled for a much older platform; check for mismatched dependency versions."
    )]
    VersionTooOld { class: String, major: u16, minimum: u16 },

    #[error("\n Multiple Theme configuration is not supported:\n      {}", format_sites(.sites))]
    ThemeConflict { sites: Vec<DeclarationSite> },

    #[error(
        "Theme name and theme class can not both be specified. \
         Theme name uses {default_theme} and can not be used in combination with custom theme class. Found in '{class}'."
    )]
    ThemeNameAndClass { class: String, default_theme: String },

    #[error("{default_theme} dependency needs to be available on the classpath when using a theme name.")]
    DefaultThemeUnavailable { default_theme: String },

    #[error("Theme class '{theme_class}' declared in '{class}' is not available on the classpath")]
    ThemeClassUnavailable { class: String, theme_class: String },

    #[error("\n Multiple PWA configuration is not supported:\n      {}", format_sites(.sites))]
    PwaConflict { sites: Vec<DeclarationSite> },

    #[error("Marker '{marker}' found on '{class}' which is not {expected}")]
    InvalidMarkerPlacement { marker: String, class: String, expected: String },

    #[error("Expected exactly one '{marker}' on '{class}' but found {count}")]
    MarkerCardinality { marker: String, class: String, count: usize },

    #[error("Classpath error: {message}")]
    Classpath { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },
}

pub type Result<T> = std::result::Result<T, ScanError>;

impl ScanError {
    pub fn parse(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            class: class.into(),
            message: message.into(),
        }
    }

    pub fn invalid_placement(
        marker: impl Into<String>,
        class: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidMarkerPlacement {
            marker: marker.into(),
            class: class.into(),
            expected: expected.into(),
        }
    }

    pub fn classpath(message: impl Into<String>) -> Self {
        Self::Classpath {
            message: message.into(),
        }
    }

    /// Attach a class name to a parse error raised before the name was known
    pub fn with_class(self, class: &str) -> Self {
        match self {
            Self::Parse { class: c, message } if c.is_empty() => Self::Parse {
                class: class.to_string(),
                message,
            },
            Self::UnsupportedVersion { class: c, major, minor } if c.is_empty() => {
                Self::UnsupportedVersion {
                    class: class.to_string(),
                    major,
                    minor,
                }
            }
            Self::VersionTooOld { class: c, major, minimum } if c.is_empty() => Self::VersionTooOld {
                class: class.to_string(),
                major,
                minimum,
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_conflict_names_every_site() {
        let error = ScanError::ThemeConflict {
            sites: vec![
                DeclarationSite::new("com.example.A", "com.example.ThemeX"),
                DeclarationSite::new("com.example.B", "com.example.ThemeY"),
            ],
        };
        let message = error.to_string();
        assert!(message.contains("found 'com.example.ThemeX' in 'com.example.A'"));
        assert!(message.contains("found 'com.example.ThemeY' in 'com.example.B'"));
    }

    #[test]
    fn test_with_class_fills_missing_name() {
        let error = ScanError::parse("", "truncated constant pool").with_class("com.example.View");
        match error {
            ScanError::Parse { class, .. } => assert_eq!(class, "com.example.View"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_version_too_old_hints_at_dependencies() {
        let error = ScanError::VersionTooOld {
            class: "a.B".to_string(),
            major: 45,
            minimum: 49,
        };
        assert!(error.to_string().contains("dependency versions"));
    }
}
