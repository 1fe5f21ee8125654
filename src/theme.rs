//! Scan-global theme and installable web app configuration
//!
//! Both follow the same shape: collect every declaration from the classes in scope,
//! collapse identical ones, and fail with every declaring site listed when more than
//! one distinct declaration remains.

use crate::error::{DeclarationSite, Result, ScanError};
use crate::graph::{ClassRecord, ScanContext};
use crate::markers::{MarkerValue, RepeatedMarkers};
use crate::types::*;
use serde::Serialize;

/// The theme the application resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThemeDefinition {
    /// Implementation class providing the theme's assets
    pub theme_class: String,
    /// Named application theme, empty when only a class was given
    pub name: String,
    pub variant: String,
}

impl ThemeDefinition {
    pub fn default_theme() -> Self {
        Self {
            theme_class: DEFAULT_THEME.to_string(),
            name: String::new(),
            variant: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ThemeDeclaration {
    Theme {
        name: String,
        theme_class: Option<String>,
        variant: String,
    },
    NoTheme,
}

impl ThemeDeclaration {
    fn describe(&self) -> String {
        match self {
            ThemeDeclaration::NoTheme => NO_THEME.to_string(),
            ThemeDeclaration::Theme { name, theme_class, .. } => match theme_class {
                Some(class) if name.is_empty() => class.clone(),
                _ => name.clone(),
            },
        }
    }
}

fn text(markers: &RepeatedMarkers<'_>, attribute: &str) -> Result<String> {
    Ok(markers
        .get_value(attribute)?
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default())
}

fn theme_declaration(context: &ScanContext<'_>, record: &ClassRecord) -> Result<Option<ThemeDeclaration>> {
    if record.has_marker(NO_THEME) {
        return Ok(Some(ThemeDeclaration::NoTheme));
    }
    if !record.has_marker(THEME) {
        return Ok(None);
    }
    let markers = context.markers_of(record, THEME)?;
    let value = markers.get_value(VALUE)?;
    // The class-valued form names the implementation directly
    let (name, value_class) = match value {
        Some(MarkerValue::Class(class)) => (String::new(), Some(class)),
        Some(MarkerValue::Str(name)) => (name, None),
        _ => (String::new(), None),
    };
    let theme_class = match value_class {
        Some(class) => Some(class),
        None => markers
            .get_value(THEME_CLASS)?
            .and_then(|v| v.as_class().map(str::to_string))
            .filter(|class| class != ABSTRACT_THEME),
    };
    Ok(Some(ThemeDeclaration::Theme {
        name,
        theme_class,
        variant: text(&markers, VARIANT)?,
    }))
}

/// Resolve the single theme declared by `declaring_classes`.
///
/// With no declaration the default theme is used when `default_allowed` and it is
/// resolvable.
pub fn resolve_theme<'n>(
    context: &ScanContext<'_>,
    declaring_classes: impl IntoIterator<Item = &'n str>,
    default_allowed: bool,
) -> Result<Option<ThemeDefinition>> {
    let mut distinct: Vec<ThemeDeclaration> = Vec::new();
    let mut sites: Vec<DeclarationSite> = Vec::new();

    for name in declaring_classes {
        let Some(record) = context.record(name) else {
            continue;
        };
        let Some(declaration) = theme_declaration(context, record)? else {
            continue;
        };
        let site = DeclarationSite::new(name, declaration.describe());
        if !sites.contains(&site) {
            sites.push(site);
        }
        if !distinct.contains(&declaration) {
            distinct.push(declaration);
        }
    }

    if distinct.len() > 1 {
        return Err(ScanError::ThemeConflict { sites });
    }

    let default_available = context.finder().load_class(DEFAULT_THEME)?.is_some();
    let Some(declaration) = distinct.pop() else {
        return Ok((default_allowed && default_available).then(ThemeDefinition::default_theme));
    };

    match declaration {
        ThemeDeclaration::NoTheme => Ok(None),
        ThemeDeclaration::Theme {
            name,
            theme_class: Some(_),
            ..
        } if !name.is_empty() => Err(ScanError::ThemeNameAndClass {
            class: sites.first().map(|site| site.class_name.clone()).unwrap_or_default(),
            default_theme: DEFAULT_THEME.to_string(),
        }),
        ThemeDeclaration::Theme {
            name,
            theme_class: Some(theme_class),
            variant,
        } => {
            if context.finder().load_class(&theme_class)?.is_none() {
                return Err(ScanError::ThemeClassUnavailable {
                    class: sites.first().map(|site| site.class_name.clone()).unwrap_or_default(),
                    theme_class,
                });
            }
            Ok(Some(ThemeDefinition {
                theme_class,
                name,
                variant,
            }))
        }
        ThemeDeclaration::Theme { name, variant, .. } => {
            if !default_available {
                if name.is_empty() {
                    return Ok(None);
                }
                return Err(ScanError::DefaultThemeUnavailable {
                    default_theme: DEFAULT_THEME.to_string(),
                });
            }
            Ok(Some(ThemeDefinition {
                theme_class: DEFAULT_THEME.to_string(),
                name,
                variant,
            }))
        }
    }
}

/// Installable web app descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PwaConfiguration {
    pub enabled: bool,
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub background_color: String,
    pub theme_color: String,
    pub icon_path: String,
    pub manifest_path: String,
    pub offline_path: String,
    pub display: String,
    pub start_path: String,
    pub offline_resources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_in: Option<String>,
}

impl Default for PwaConfiguration {
    fn default() -> Self {
        Self {
            enabled: false,
            name: String::new(),
            short_name: String::new(),
            description: String::new(),
            background_color: "#f2f2f2".to_string(),
            theme_color: "#ffffff".to_string(),
            icon_path: "icons/icon.png".to_string(),
            manifest_path: "manifest.webmanifest".to_string(),
            offline_path: "offline.html".to_string(),
            display: "standalone".to_string(),
            start_path: String::new(),
            offline_resources: Vec::new(),
            declared_in: None,
        }
    }
}

impl PwaConfiguration {
    pub fn disabled() -> Self {
        Self::default()
    }

    fn from_markers(class_name: &str, markers: &RepeatedMarkers<'_>) -> Result<Self> {
        let base = Self::default();
        let read = |attribute: &str, fallback: String| -> Result<String> {
            Ok(markers
                .get_value(attribute)?
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or(fallback))
        };
        let name = read("name", base.name)?;
        Ok(Self {
            enabled: true,
            short_name: read("shortName", name.clone())?,
            name,
            description: read("description", base.description)?,
            background_color: read("backgroundColor", base.background_color)?,
            theme_color: read("themeColor", base.theme_color)?,
            icon_path: read("iconPath", base.icon_path)?,
            manifest_path: read("manifestPath", base.manifest_path)?,
            offline_path: read("offlinePath", base.offline_path)?,
            display: read("display", base.display)?,
            start_path: read("startPath", base.start_path)?,
            offline_resources: markers.get_values("offlineResources").iter().flat_map(MarkerValue::strings).collect(),
            declared_in: Some(class_name.to_string()),
        })
    }

    fn same_settings(&self, other: &Self) -> bool {
        Self {
            declared_in: None,
            ..self.clone()
        } == Self {
            declared_in: None,
            ..other.clone()
        }
    }
}

/// Resolve the single installable web app descriptor among `declaring_classes`
pub fn resolve_pwa<'n>(
    context: &ScanContext<'_>,
    declaring_classes: impl IntoIterator<Item = &'n str>,
) -> Result<PwaConfiguration> {
    let finder = context.finder();
    let mut distinct: Vec<PwaConfiguration> = Vec::new();
    let mut sites: Vec<DeclarationSite> = Vec::new();

    for name in declaring_classes {
        let Some(record) = context.record(name) else {
            continue;
        };
        if !record.has_marker(PWA) {
            continue;
        }
        let mut qualifies = false;
        for supertype in [APP_SHELL_CONFIGURATOR, ROUTER_LAYOUT, WEB_COMPONENT_EXPORTER] {
            qualifies = qualifies || finder.is_assignable(supertype, name)?;
        }
        if !qualifies {
            return Err(ScanError::invalid_placement(
                PWA,
                name,
                format!(
                    "an implementation of {}, {} or {}",
                    APP_SHELL_CONFIGURATOR, ROUTER_LAYOUT, WEB_COMPONENT_EXPORTER
                ),
            ));
        }

        let markers = context.markers_of(record, PWA)?;
        let config = PwaConfiguration::from_markers(name, &markers)?;
        let site = DeclarationSite::new(name, config.name.clone());
        if !sites.contains(&site) {
            sites.push(site);
        }
        if !distinct.iter().any(|known| known.same_settings(&config)) {
            distinct.push(config);
        }
    }

    match distinct.len() {
        0 => Ok(PwaConfiguration::disabled()),
        1 => Ok(distinct.remove(0)),
        _ => Err(ScanError::PwaConflict { sites }),
    }
}
