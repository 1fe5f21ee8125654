//! Frontscan: static front-end dependency scanner for compiled JVM applications
//!
//! Reads compiled class files without loading them, follows every type reference from
//! the application's entry points and reports which front-end modules, scripts and
//! stylesheets each entry point needs, grouped into bundler chunks.
//!
//! # Features
//!
//! - Class file reader for major versions 49 through 69, jars and directories
//! - Reachability closures per entry point with reuse between related views
//! - Eager and lazy chunks with dependency triggers
//! - Theme and installable web app resolution with conflict reporting
//! - npm package manifest collection
//! - MD5 fingerprint of every inspected class for cache invalidation
//!
//! # Basic Usage
//!
//! ```no_run
//! use frontscan::{scan, ClasspathFinder, Result};
//!
//! fn main() -> Result<()> {
//!     let finder = ClasspathFinder::from_paths(&["target/classes"])?;
//!     let result = scan(&finder)?;
//!     println!("{} chunks", result.chunks.len());
//!     Ok(())
//! }
//! ```
//!
//! # Scan Pipeline
//!
//! 1. **Phase 1**: Entry points - routed views, lifecycle types, widget exporters
//! 2. **Phase 2**: Visit - record every class reachable from an entry point once
//! 3. **Phase 3**: Closures - ordered reachable set per entry point
//! 4. **Phase 4**: Theme & installable app - one declaration or a conflict error
//! 5. **Phase 5**: Aggregate - union assets per entry point and group into chunks
//! 6. **Phase 6**: Packages - npm packages declared anywhere on the classpath

pub mod types;
pub mod error;
pub mod classfile;
pub mod markers;
pub mod finder;
pub mod filter;
pub mod graph;
pub mod entry_points;
pub mod theme;
pub mod packages;
pub mod chunks;
pub mod cli;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

// Re-export commonly used types and functions
pub use error::{DeclarationSite, Result, ScanError};
pub use classfile::{parse_class, ClassEvent, MarkerTarget, ParseMode, ParsedClass};
pub use markers::{Marker, MarkerDefaults, MarkerValue, RepeatedMarkers};
pub use finder::{ClassFinder, ClassHandle, ClasspathFinder};
pub use filter::{ClassFilter, NamespaceFilter};
pub use graph::{ClassRecord, CssData, ScanContext};
pub use entry_points::{discover_entry_points, DiscoveryOptions, EntryKind, EntryPoint};
pub use theme::{resolve_pwa, resolve_theme, PwaConfiguration, ThemeDefinition};
pub use packages::{collect_packages, PackageManifest};
pub use chunks::{ChunkAssets, ChunkInfo, Chunks};
pub use cli::EnhancedCli;

/// Scanner version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Which classes contribute assets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Only classes reachable from an entry point
    #[default]
    Targeted,
    /// Every class carrying an asset marker, all in the global chunk
    FullClasspath,
}

/// Scan options and settings
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Enable debug mode with extra logging
    pub debug_mode: bool,

    pub mode: ScanMode,

    /// Treat widget exporters and their components as entry points
    pub widget_exports: bool,

    /// Add the client-side router outlet as an internal entry point
    pub react_enabled: bool,

    /// Classes that are never opened
    pub filter: Arc<dyn ClassFilter>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            debug_mode: false,
            mode: ScanMode::Targeted,
            widget_exports: true,
            react_enabled: false,
            filter: Arc::new(NamespaceFilter::default()),
        }
    }
}

/// Scan statistics and metrics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanStats {
    /// Number of entry points discovered
    pub entry_point_count: usize,

    /// Classes recorded, including unresolvable leaves
    pub visited_classes: usize,

    /// Classes whose bytes were read and parsed
    pub inspected_classes: usize,

    pub chunk_count: usize,
    pub module_count: usize,
    pub script_count: usize,
    pub css_count: usize,
    pub package_count: usize,
    pub warning_count: usize,

    /// Scan time in milliseconds
    pub scan_time_ms: u64,
}

/// Everything a scan found
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub chunks: Chunks,
    pub packages: PackageManifest,
    pub theme: Option<ThemeDefinition>,
    pub pwa: PwaConfiguration,
    pub entry_points: IndexMap<String, EntryPoint>,
    /// Inspected classes in visit order
    pub classes: IndexSet<String>,
    /// Hex MD5 over the names and bytes of the inspected classes
    pub fingerprint: String,
    pub warnings: Vec<String>,
    pub stats: ScanStats,
}

impl ScanResult {
    pub fn report(&self) -> ScanReport {
        ScanReport {
            scanner: format!("{} {}", NAME, VERSION),
            fingerprint: self.fingerprint.clone(),
            theme: self.theme.clone(),
            pwa: self.pwa.clone(),
            packages: self.packages.clone(),
            chunks: self
                .chunks
                .iter()
                .map(|(info, assets)| ChunkReport {
                    id: info.id(),
                    info: info.clone(),
                    assets: assets.clone(),
                })
                .collect(),
            entry_points: self.entry_points.values().cloned().collect(),
            classes: self.classes.iter().cloned().collect(),
            warnings: self.warnings.clone(),
            stats: self.stats.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChunkReport {
    pub id: String,
    pub info: ChunkInfo,
    #[serde(flatten)]
    pub assets: ChunkAssets,
}

/// Serializable form of a [`ScanResult`]
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub scanner: String,
    pub fingerprint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<ThemeDefinition>,
    pub pwa: PwaConfiguration,
    pub packages: PackageManifest,
    pub chunks: Vec<ChunkReport>,
    pub entry_points: Vec<EntryPoint>,
    pub classes: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: ScanStats,
}

/// Main scanner entry point with default options
pub fn scan(finder: &dyn ClassFinder) -> Result<ScanResult> {
    scan_with_options(finder, &ScanOptions::default())
}

/// Scan with custom options
pub fn scan_with_options(finder: &dyn ClassFinder, options: &ScanOptions) -> Result<ScanResult> {
    scan_with_defaults(finder, options, &MarkerDefaults::new())
}

/// Scan with a marker default cache shared between scans
pub fn scan_with_defaults(
    finder: &dyn ClassFinder,
    options: &ScanOptions,
    defaults: &MarkerDefaults,
) -> Result<ScanResult> {
    let start_time = Instant::now();

    if options.debug_mode {
        log::info!("{} v{}", NAME, VERSION);
        log::debug!("Scan options: {:?}", options);
    }

    let mut context = ScanContext::new(finder, options.filter.as_ref(), defaults);
    let mut result = match options.mode {
        ScanMode::Targeted => scan_targeted(&mut context, options)?,
        ScanMode::FullClasspath => scan_full_classpath(&mut context)?,
    };

    log::debug!("Phase 6: Collecting npm packages...");
    let (packages, warnings) = collect_packages(finder, defaults)?;
    result.packages = packages;
    result.warnings.extend(warnings);

    result.classes = context.inspected().clone();
    result.fingerprint = context.fingerprint();
    result.stats = ScanStats {
        entry_point_count: result.entry_points.len(),
        visited_classes: context.visited_count(),
        inspected_classes: result.classes.len(),
        chunk_count: result.chunks.len(),
        module_count: result.chunks.all_modules().len(),
        script_count: result.chunks.iter().map(|(_, a)| a.scripts.len()).sum(),
        css_count: result.chunks.iter().map(|(_, a)| a.css.len()).sum(),
        package_count: result.packages.len(),
        warning_count: result.warnings.len(),
        scan_time_ms: start_time.elapsed().as_millis() as u64,
    };

    log::info!(
        "Scanned {} classes from {} entry points into {} chunks in {}ms",
        result.stats.inspected_classes,
        result.stats.entry_point_count,
        result.stats.chunk_count,
        result.stats.scan_time_ms
    );
    if options.debug_mode {
        log::debug!("Full stats: {:?}", result.stats);
    }
    Ok(result)
}

fn empty_result(chunks: Chunks, theme: Option<ThemeDefinition>, pwa: PwaConfiguration) -> ScanResult {
    ScanResult {
        chunks,
        packages: PackageManifest::default(),
        theme,
        pwa,
        entry_points: IndexMap::new(),
        classes: IndexSet::new(),
        fingerprint: String::new(),
        warnings: Vec::new(),
        stats: ScanStats::default(),
    }
}

fn scan_targeted(context: &mut ScanContext<'_>, options: &ScanOptions) -> Result<ScanResult> {
    let finder = context.finder();

    log::debug!("Phase 1: Discovering entry points...");
    let discovery = DiscoveryOptions {
        widget_exports: options.widget_exports,
        react_enabled: options.react_enabled,
    };
    let mut entries = discover_entry_points(finder, context.marker_defaults(), discovery)?;
    log::debug!("Phase 1 complete. {} entry points", entries.len());

    log::debug!("Phase 2: Visiting reachable classes...");
    for name in entries.keys() {
        context.visit_class(name)?;
    }
    log::debug!("Phase 2 complete. {} classes recorded", context.visited_count());

    log::debug!("Phase 3: Computing closures...");
    let closures: Vec<Arc<IndexSet<String>>> = entries
        .keys()
        .map(|name| context.collect_reachable_classes(name))
        .collect();

    log::debug!("Phase 4: Resolving theme and installable app...");
    let mut application = IndexSet::new();
    let mut exported = IndexSet::new();
    let mut has_application_entries = false;
    for (entry, closure) in entries.values().zip(&closures) {
        if entry.kind == EntryKind::WidgetExport {
            exported.extend(closure.iter().cloned());
        } else if entry.application_defined {
            has_application_entries = true;
            application.extend(closure.iter().cloned());
        }
    }
    let application_theme = resolve_theme(context, application.iter().map(String::as_str), has_application_entries)?;
    let export_theme = resolve_theme(context, exported.iter().map(String::as_str), false)?;
    let theme = application_theme.or(export_theme);

    let everything: IndexSet<&str> = closures.iter().flat_map(|c| c.iter().map(String::as_str)).collect();
    let pwa = resolve_pwa(context, everything.iter().copied())?;
    let theme_assets = match &theme {
        Some(theme) => Some(theme_assets(context, &theme.theme_class)?),
        None => None,
    };

    log::debug!("Phase 5: Aggregating assets...");
    let mut theme_implementations = IndexSet::new();
    for record in context.records() {
        if record.resolved && finder.is_assignable(types::ABSTRACT_THEME, &record.name)? {
            theme_implementations.insert(record.name.clone());
        }
    }
    for (entry, closure) in entries.values_mut().zip(closures) {
        entry.absorb_closure(context, closure, |name| theme_implementations.contains(name));
    }
    let chunks = Chunks::assemble(entries.values(), theme_assets);
    log::debug!("Phase 5 complete. {} chunks", chunks.len());

    let mut result = empty_result(chunks, theme, pwa);
    result.entry_points = entries;
    Ok(result)
}

fn scan_full_classpath(context: &mut ScanContext<'_>) -> Result<ScanResult> {
    let finder = context.finder();

    log::debug!("Recording every class with an asset marker...");
    for kind in types::ASSET_MARKERS {
        for name in finder.annotated_classes(kind)? {
            if !context.is_excluded(&name) {
                context.inspect_class(&name)?;
            }
        }
    }
    let mut assets = ChunkAssets::default();
    for record in context.records() {
        assets.absorb_record(record);
    }

    let mut declaring = finder.annotated_classes(types::THEME)?;
    declaring.extend(finder.annotated_classes(types::NO_THEME)?);
    for name in &declaring {
        context.inspect_class(name)?;
    }
    let theme = resolve_theme(context, declaring.iter().map(String::as_str), true)?;

    let declaring = finder.annotated_classes(types::PWA)?;
    for name in &declaring {
        context.inspect_class(name)?;
    }
    let pwa = resolve_pwa(context, declaring.iter().map(String::as_str))?;

    let mut global = match &theme {
        Some(theme) => theme_assets(context, &theme.theme_class)?,
        None => ChunkAssets::default(),
    };
    global.merge(&assets);
    Ok(empty_result(Chunks::global(global), theme, pwa))
}

/// Assets of everything reachable from the theme implementation
fn theme_assets(context: &mut ScanContext<'_>, theme_class: &str) -> Result<ChunkAssets> {
    context.visit_class(theme_class)?;
    let closure = context.collect_reachable_classes(theme_class);
    let mut assets = ChunkAssets::default();
    for name in closure.iter() {
        if let Some(record) = context.record(name) {
            assets.absorb_record(record);
        }
    }
    log::debug!("Theme {} contributes {} modules", theme_class, assets.modules.len());
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::builder::ClassFileBuilder;
    use crate::types::*;

    fn route(path: &str) -> Marker {
        Marker::new(ROUTE).with(VALUE, path)
    }

    fn js_module(value: &str) -> Marker {
        Marker::new(JS_MODULE).with(VALUE, value)
    }

    fn lumo() -> Vec<u8> {
        ClassFileBuilder::new(DEFAULT_THEME)
            .interface(ABSTRACT_THEME)
            .marker(js_module("@vaadin/vaadin-lumo-styles/all-imports.js"))
            .build()
    }

    #[test]
    fn test_zero_entry_points_round_trip() {
        let finder = ClasspathFinder::from_class_bytes(vec![]).unwrap();
        let result = scan(&finder).unwrap();

        assert!(result.chunks.is_empty());
        assert!(result.theme.is_none());
        assert_eq!(result.pwa, PwaConfiguration::disabled());
        assert!(result.packages.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_routed_application_end_to_end() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            lumo(),
            ClassFileBuilder::new("com.app.MainView")
                .marker(route(""))
                .marker(js_module("./main.js"))
                .field("grid", "Lcom/app/Grid;")
                .build(),
            ClassFileBuilder::new("com.app.OrdersView")
                .marker(route("orders"))
                .field("grid", "Lcom/app/Grid;")
                .build(),
            ClassFileBuilder::new("com.app.Grid")
                .marker(js_module("@vaadin/grid"))
                .marker(Marker::new(CSS_IMPORT).with(VALUE, "./grid.css"))
                .build(),
            ClassFileBuilder::new("com.app.Shell")
                .interface(APP_SHELL_CONFIGURATOR)
                .marker(Marker::new(THEME).with(VALUE, "my-theme"))
                .marker(Marker::new(PWA).with("name", "Orders"))
                .marker(js_module("./shell.js"))
                .build(),
            ClassFileBuilder::new("com.app.Icons")
                .marker(
                    Marker::new(NPM_PACKAGE)
                        .with(VALUE, "@vaadin/icons")
                        .with(types::VERSION, "24.4.0"),
                )
                .build(),
        ])
        .unwrap();
        let result = scan(&finder).unwrap();

        let theme = result.theme.as_ref().unwrap();
        assert_eq!(theme.name, "my-theme");
        assert_eq!(theme.theme_class, DEFAULT_THEME);
        assert!(result.pwa.enabled);
        assert_eq!(result.pwa.short_name, "Orders");
        assert_eq!(result.packages.version_of("@vaadin/icons"), Some("24.4.0"));

        let global = result.chunks.global_assets().unwrap();
        assert_eq!(
            global.modules,
            vec!["@vaadin/vaadin-lumo-styles/all-imports.js", "./shell.js"]
        );

        let modules = result.chunks.modules();
        let main = modules.iter().find(|(info, _)| info.name.as_deref() == Some("com.app.MainView")).unwrap();
        assert!(main.0.eager);
        assert_eq!(main.1, &vec!["./main.js".to_string(), "@vaadin/grid".to_string()]);
        let orders = modules.iter().find(|(info, _)| info.name.as_deref() == Some("com.app.OrdersView")).unwrap();
        assert!(!orders.0.eager);
        assert_eq!(orders.1, &vec!["@vaadin/grid".to_string()]);
        assert_eq!(result.chunks.css().len(), 2);

        assert!(result.classes.contains("com.app.Grid"));
        assert!(!result.classes.contains("java.lang.Object"));
        assert_eq!(result.fingerprint.len(), 32);
        assert_eq!(result.stats.entry_point_count, result.entry_points.len());
    }

    #[test]
    fn test_theme_implementation_assets_stay_global() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            lumo(),
            ClassFileBuilder::new("com.app.MainView")
                .marker(route(""))
                .field("theme", &format!("L{};", DEFAULT_THEME.replace('.', "/")))
                .build(),
        ])
        .unwrap();
        let result = scan(&finder).unwrap();

        assert_eq!(result.theme, Some(ThemeDefinition::default_theme()));
        let main = &result.entry_points["com.app.MainView"];
        assert!(main.modules.is_empty());
        assert_eq!(result.chunks.len(), 1);
        assert!(result.chunks.iter().next().unwrap().0.is_global());
    }

    #[test]
    fn test_exporter_only_application_has_no_default_theme() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            lumo(),
            ClassFileBuilder::new("com.app.CardExporter")
                .super_class(WEB_COMPONENT_EXPORTER)
                .signature("Lcom/vaadin/flow/component/WebComponentExporter<Lcom/app/Card;>;")
                .build(),
            ClassFileBuilder::new("com.app.Card").marker(js_module("./card.js")).build(),
        ])
        .unwrap();
        let result = scan(&finder).unwrap();

        assert!(result.theme.is_none());
        let card = ChunkInfo::for_entry(&result.entry_points["com.app.Card"]);
        assert_eq!(result.chunks.get(&card).unwrap().modules, vec!["./card.js"]);
    }

    #[test]
    fn test_widget_exports_can_be_disabled() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            ClassFileBuilder::new("com.app.CardExporter")
                .super_class(WEB_COMPONENT_EXPORTER)
                .signature("Lcom/vaadin/flow/component/WebComponentExporter<Lcom/app/Card;>;")
                .build(),
            ClassFileBuilder::new("com.app.Card").marker(js_module("./card.js")).build(),
        ])
        .unwrap();
        let options = ScanOptions {
            widget_exports: false,
            ..ScanOptions::default()
        };
        let result = scan_with_options(&finder, &options).unwrap();
        assert!(!result.entry_points.contains_key("com.app.CardExporter"));
        assert!(result.chunks.is_empty());
    }

    #[test]
    fn test_full_classpath_mode_puts_everything_in_global_chunk() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            ClassFileBuilder::new("com.app.Unreferenced").marker(js_module("./orphan.js")).build(),
            ClassFileBuilder::new("com.app.Other")
                .marker(js_module("./other.js"))
                .marker(js_module("./debug.js").with(DEVELOPMENT_ONLY, true))
                .build(),
        ])
        .unwrap();
        let options = ScanOptions {
            mode: ScanMode::FullClasspath,
            ..ScanOptions::default()
        };
        let result = scan_with_options(&finder, &options).unwrap();

        assert_eq!(result.chunks.len(), 1);
        let global = result.chunks.global_assets().unwrap();
        assert!(global.modules.contains(&"./orphan.js".to_string()));
        assert!(global.modules.contains(&"./other.js".to_string()));
        assert_eq!(global.modules_development_only, vec!["./debug.js"]);
        assert!(result.entry_points.is_empty());
    }

    #[test]
    fn test_conflicting_themes_abort_scan() {
        let finder = ClasspathFinder::from_class_bytes(vec![
            lumo(),
            ClassFileBuilder::new("com.app.MainView")
                .marker(route(""))
                .marker(Marker::new(THEME).with(VALUE, "theme-x"))
                .build(),
            ClassFileBuilder::new("com.app.OtherView")
                .marker(route("other"))
                .marker(Marker::new(THEME).with(VALUE, "theme-y"))
                .build(),
        ])
        .unwrap();
        assert!(matches!(scan(&finder), Err(ScanError::ThemeConflict { .. })));
    }

    #[test]
    fn test_shared_defaults_and_report_serialization() {
        let finder = ClasspathFinder::from_class_bytes(vec![ClassFileBuilder::new("com.app.MainView")
            .marker(route(""))
            .marker(js_module("./main.js"))
            .build()])
        .unwrap();
        let defaults = MarkerDefaults::new();
        let first = scan_with_defaults(&finder, &ScanOptions::default(), &defaults).unwrap();
        let second = scan_with_defaults(&finder, &ScanOptions::default(), &defaults).unwrap();
        assert_eq!(first.fingerprint, second.fingerprint);

        let json = serde_json::to_value(first.report()).unwrap();
        assert_eq!(json["chunks"][0]["id"], "com.app.MainView");
        assert_eq!(json["chunks"][0]["modules"][0], "./main.js");
        assert_eq!(json["pwa"]["enabled"], false);
    }
}
