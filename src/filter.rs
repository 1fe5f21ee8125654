//! Exclusion policy for class inspection
//!
//! Platform classes and common third-party libraries never carry frontend markers.
//! Walking into them only costs time, so they are cut off before their bytes are read.

/// Namespaces skipped by default
pub const DEFAULT_EXCLUDED_PACKAGES: &[&str] = &[
    "java",
    "javax",
    "jakarta",
    "sun",
    "com.sun",
    "jdk",
    "elemental",
    "org.apache",
    "org.atmosphere",
    "org.jsoup",
    "org.jboss",
    "org.w3c",
    "org.spring",
    "org.springframework",
    "org.joda",
    "org.hibernate",
    "org.glassfish",
    "org.hsqldb",
    "org.slf4j",
    "org.junit",
    "com.helger",
    "com.spring",
    "com.gwt",
    "com.lowagie",
    "com.fasterxml",
    "com.google",
    "net.sf",
    "net.bytebuddy",
    "kotlin",
    "scala",
];

pub const DEFAULT_EXCLUDED_SUFFIXES: &[&str] = &["Exception"];

/// Package segment that is excluded wherever it appears
const LOGGING_SEGMENT: &str = "slf4j";

/// Decides which classes the scanner may open
pub trait ClassFilter: std::fmt::Debug {
    fn is_excluded(&self, class_name: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct NamespaceFilter {
    packages: Vec<String>,
    suffixes: Vec<String>,
}

impl Default for NamespaceFilter {
    fn default() -> Self {
        Self {
            packages: DEFAULT_EXCLUDED_PACKAGES.iter().map(|p| p.to_string()).collect(),
            suffixes: DEFAULT_EXCLUDED_SUFFIXES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl NamespaceFilter {
    /// A filter that excludes nothing but the empty name
    pub fn empty() -> Self {
        Self {
            packages: Vec::new(),
            suffixes: Vec::new(),
        }
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.packages.push(package.into());
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffixes.push(suffix.into());
        self
    }

    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    fn in_package(class_name: &str, package: &str) -> bool {
        class_name
            .strip_prefix(package)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('$'))
    }
}

impl ClassFilter for NamespaceFilter {
    fn is_excluded(&self, class_name: &str) -> bool {
        if class_name.is_empty() {
            return true;
        }
        if self.packages.iter().any(|package| Self::in_package(class_name, package)) {
            return true;
        }
        if class_name.split('.').any(|segment| segment == LOGGING_SEGMENT) {
            return true;
        }
        self.suffixes.iter().any(|suffix| class_name.ends_with(suffix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_segment_matching() {
        let filter = NamespaceFilter::default();
        assert!(filter.is_excluded("org.spring.Bean"));
        assert!(!filter.is_excluded("org.springseason.Bean"));
        assert!(filter.is_excluded("java.lang.String"));
        assert!(!filter.is_excluded("javafx.scene.Node"));
        assert!(!filter.is_excluded("com.vaadin.flow.component.UI"));
    }

    #[test]
    fn test_suffix_logging_and_empty_name() {
        let filter = NamespaceFilter::default();
        assert!(filter.is_excluded("com.app.ValidationException"));
        assert!(filter.is_excluded("com.shaded.slf4j.Logger"));
        assert!(filter.is_excluded(""));
        assert!(!filter.is_excluded("com.app.slf4jish.Logger"));
    }

    #[test]
    fn test_custom_packages() {
        let filter = NamespaceFilter::empty().with_package("com.thirdparty");
        assert!(filter.is_excluded("com.thirdparty.Widget"));
        assert!(!filter.is_excluded("java.lang.String"));
        assert!(!filter.is_excluded("com.app.ValidationException"));
    }
}
