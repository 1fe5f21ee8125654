//! npm package requirements declared on classes
//!
//! Packages are collected from every class carrying the package marker, whether or not
//! it is reachable from an entry point.

use crate::error::Result;
use crate::finder::ClassFinder;
use crate::markers::{MarkerDefaults, RepeatedMarkers};
use crate::types::{ASSETS, DEV, NPM_PACKAGE, VALUE, VERSION};
use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
    /// Runtime packages, name to version
    pub dependencies: IndexMap<String, String>,
    /// Build-time only packages
    pub dev_dependencies: IndexMap<String, String>,
    /// Asset globs copied out of each package
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub assets: IndexMap<String, Vec<String>>,
}

impl PackageManifest {
    pub fn len(&self) -> usize {
        self.dependencies.len() + self.dev_dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version_of(&self, package: &str) -> Option<&str> {
        self.dependencies
            .get(package)
            .or_else(|| self.dev_dependencies.get(package))
            .map(String::as_str)
    }
}

#[derive(Debug, Default)]
struct PackageDeclarations {
    versions: Vec<String>,
    runtime: bool,
    assets: Vec<String>,
}

/// Read every package declaration. Returns the manifest and one warning per package
/// declared with more than one version.
pub fn collect_packages(finder: &dyn ClassFinder, defaults: &MarkerDefaults) -> Result<(PackageManifest, Vec<String>)> {
    let mut declarations: IndexMap<String, PackageDeclarations> = IndexMap::new();

    for class_name in finder.annotated_classes(NPM_PACKAGE)? {
        let Some(handle) = finder.load_class(&class_name)? else {
            continue;
        };
        let markers = RepeatedMarkers::new(
            &class_name,
            NPM_PACKAGE,
            &handle.markers,
            defaults.defaults_for(finder, NPM_PACKAGE)?,
        );
        for &marker in markers.occurrences() {
            let Some(name) = markers.value_on(marker, VALUE).and_then(|v| v.as_str().map(str::to_string)) else {
                continue;
            };
            let version = markers
                .value_on(marker, VERSION)
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let dev = markers.value_on(marker, DEV).and_then(|v| v.as_bool()).unwrap_or(false);

            let entry = declarations.entry(name).or_default();
            if !entry.versions.contains(&version) {
                entry.versions.push(version);
            }
            entry.runtime |= !dev;
            if let Some(assets) = markers.value_on(marker, ASSETS) {
                for asset in assets.strings() {
                    if !entry.assets.contains(&asset) {
                        entry.assets.push(asset);
                    }
                }
            }
        }
    }

    let mut manifest = PackageManifest::default();
    let mut warnings = Vec::new();
    for (name, declared) in declarations {
        let Some(version) = declared.versions.first().cloned() else {
            continue;
        };
        if declared.versions.len() > 1 {
            let warning = format!(
                "Multiple npm versions for {} found: [{}]. First version found '{}' will be considered.",
                name,
                declared.versions.join(", "),
                version
            );
            log::warn!("{}", warning);
            warnings.push(warning);
        }
        if !declared.assets.is_empty() {
            manifest.assets.insert(name.clone(), declared.assets);
        }
        if declared.runtime {
            manifest.dependencies.insert(name, version);
        } else {
            manifest.dev_dependencies.insert(name, version);
        }
    }

    log::debug!(
        "Collected {} runtime and {} development packages",
        manifest.dependencies.len(),
        manifest.dev_dependencies.len()
    );
    Ok((manifest, warnings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::builder::ClassFileBuilder;
    use crate::finder::ClasspathFinder;
    use crate::markers::{Marker, MarkerValue};

    fn package(name: &str, version: &str) -> Marker {
        Marker::new(NPM_PACKAGE).with(VALUE, name).with(VERSION, version)
    }

    #[test]
    fn test_first_version_wins_with_warning() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            ClassFileBuilder::new("com.app.A").marker(package("@vaadin/button", "24.1.0")).build(),
            ClassFileBuilder::new("com.app.B").marker(package("@vaadin/button", "24.2.0")).build(),
            ClassFileBuilder::new("com.app.C").marker(package("lit", "3.0.0")).build(),
        ])
        .unwrap();
        let (manifest, warnings) = collect_packages(&finder, &MarkerDefaults::new()).unwrap();
        assert_eq!(manifest.version_of("@vaadin/button"), Some("24.1.0"));
        assert_eq!(manifest.version_of("lit"), Some("3.0.0"));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("24.2.0"));
    }

    #[test]
    fn test_dev_packages_and_assets() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            ClassFileBuilder::annotation_type(NPM_PACKAGE)
                .attribute_default(DEV, MarkerValue::Bool(false))
                .build(),
            ClassFileBuilder::new("com.app.Tools")
                .marker(package("vite-plugin", "1.0.0").with(DEV, true))
                .marker(
                    package("icons", "2.0.0")
                        .with(ASSETS, MarkerValue::Array(vec!["svg/**:icons".into(), "font/*.woff".into()])),
                )
                .build(),
        ])
        .unwrap();
        let (manifest, warnings) = collect_packages(&finder, &MarkerDefaults::new()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(manifest.dev_dependencies.get("vite-plugin").map(String::as_str), Some("1.0.0"));
        assert_eq!(manifest.dependencies.get("icons").map(String::as_str), Some("2.0.0"));
        assert_eq!(manifest.assets["icons"], vec!["svg/**:icons", "font/*.woff"]);
        assert_eq!(manifest.len(), 2);
    }
}
