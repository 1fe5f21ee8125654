//! Entry point discovery and eagerness
//!
//! Independent discovery strategies append into one ordered map; the first strategy to
//! report a class decides its kind. Routed views come first and are ordered so that a
//! supertype always precedes its subtypes, which lets a subtype's closure reuse the one
//! computed for its parent.

use crate::classfile::descriptor::{simple_name, to_dotted, to_internal};
use crate::error::{Result, ScanError};
use crate::finder::{ClassFinder, ClassHandle};
use crate::graph::{push_unique, CssData, ScanContext};
use crate::markers::{MarkerDefaults, MarkerValue, RepeatedMarkers};
use crate::types::*;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// A view reachable through the router
    Routed,
    /// Framework lifecycle types; always eager and merged into the global chunk
    Internal,
    /// An embeddable widget exporter or the component it exports
    WidgetExport,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryPoint {
    pub name: String,
    pub kind: EntryKind,
    pub eager: bool,
    pub dependency_triggers: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub layout: Option<String>,
    /// Discovered from the application rather than a fixed platform type
    #[serde(skip)]
    pub application_defined: bool,
    #[serde(skip)]
    pub reachable_classes: Arc<IndexSet<String>>,
    pub modules: Vec<String>,
    pub modules_development_only: Vec<String>,
    pub scripts: Vec<String>,
    pub scripts_development_only: Vec<String>,
    pub css: Vec<CssData>,
}

impl EntryPoint {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
            eager: kind == EntryKind::Internal,
            dependency_triggers: Vec::new(),
            route: None,
            layout: None,
            application_defined: true,
            reachable_classes: Arc::default(),
            modules: Vec::new(),
            modules_development_only: Vec::new(),
            scripts: Vec::new(),
            scripts_development_only: Vec::new(),
            css: Vec::new(),
        }
    }

    fn platform(name: &str) -> Self {
        Self {
            application_defined: false,
            ..Self::new(name, EntryKind::Internal)
        }
    }

    /// Union the assets of every class in `closure`, in closure order.
    /// Classes for which `skip` is true contribute nothing.
    pub fn absorb_closure(
        &mut self,
        context: &ScanContext<'_>,
        closure: Arc<IndexSet<String>>,
        skip: impl Fn(&str) -> bool,
    ) {
        for name in closure.iter() {
            if skip(name) {
                continue;
            }
            let Some(record) = context.record(name) else {
                continue;
            };
            for module in &record.modules {
                push_unique(&mut self.modules, module.clone());
            }
            for module in &record.modules_development_only {
                push_unique(&mut self.modules_development_only, module.clone());
            }
            for script in &record.scripts {
                push_unique(&mut self.scripts, script.clone());
            }
            for script in &record.scripts_development_only {
                push_unique(&mut self.scripts_development_only, script.clone());
            }
            for css in &record.css {
                push_unique(&mut self.css, css.clone());
            }
        }
        self.reachable_classes = closure;
    }
}

/// Toggles that change which entry points exist
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    pub widget_exports: bool,
    pub react_enabled: bool,
}

/// Discover every entry point and resolve eagerness and dependency triggers
pub fn discover_entry_points(
    finder: &dyn ClassFinder,
    defaults: &MarkerDefaults,
    options: DiscoveryOptions,
) -> Result<IndexMap<String, EntryPoint>> {
    let mut entries: IndexMap<String, EntryPoint> = IndexMap::new();

    for name in sorted_by_depth(finder, finder.annotated_classes(ROUTE)?)? {
        let Some(handle) = finder.load_class(&name)? else {
            continue;
        };
        let mut entry = EntryPoint::new(&name, EntryKind::Routed);
        let route = RepeatedMarkers::new(&name, ROUTE, &handle.markers, defaults.defaults_for(finder, ROUTE)?);
        entry.route = Some(route_path(&name, route.get_value(VALUE)?.as_ref()));
        entry.layout = route
            .get_value(LAYOUT_ATTR)?
            .and_then(|v| v.as_class().map(str::to_string))
            .filter(|layout| layout != UI);
        entry.dependency_triggers.push(name.clone());
        if let Some(layout) = &entry.layout {
            entry.dependency_triggers.push(layout.clone());
        }
        entries.entry(name).or_insert(entry);
    }
    let routed = entries.len();

    let mut internal = finder.annotated_classes(LAYOUT)?;
    for supertype in [UI_INIT_LISTENER, SERVICE_INIT_LISTENER, APP_SHELL_CONFIGURATOR, HAS_ERROR_PARAMETER] {
        internal.extend(finder.subtypes_of(supertype)?);
    }
    for name in internal {
        entries
            .entry(name.clone())
            .or_insert_with(|| EntryPoint::new(name, EntryKind::Internal));
    }
    entries
        .entry(UI.to_string())
        .or_insert_with(|| EntryPoint::platform(UI));
    if options.react_enabled {
        entries
            .entry(REACT_ROUTER_OUTLET.to_string())
            .or_insert_with(|| EntryPoint::platform(REACT_ROUTER_OUTLET));
    }
    let internal = entries.len() - routed;

    let mut exports = 0;
    if options.widget_exports {
        let mut exporters = finder.subtypes_of(WEB_COMPONENT_EXPORTER)?;
        for factory in finder.subtypes_of(WEB_COMPONENT_EXPORTER_FACTORY)? {
            if !exporters.contains(&factory) {
                exporters.push(factory);
            }
        }
        for exporter in exporters {
            let component = match finder.load_class(&exporter)? {
                Some(handle) if !handle.is_abstract() => exported_component(finder, &handle)?,
                _ => None,
            };
            let mut triggers = vec![exporter.clone()];
            if let Some(component) = &component {
                triggers.push(component.clone());
            }

            let before = entries.len();
            entries.entry(exporter.clone()).or_insert_with(|| {
                let mut entry = EntryPoint::new(exporter.clone(), EntryKind::WidgetExport);
                entry.dependency_triggers = triggers.clone();
                entry
            });
            if let Some(component) = component {
                entries.entry(component.clone()).or_insert_with(|| {
                    let mut entry = EntryPoint::new(component, EntryKind::WidgetExport);
                    entry.dependency_triggers = triggers;
                    entry
                });
            }
            exports += entries.len() - before;
        }
    }

    log::debug!(
        "Discovered {} routed, {} internal and {} exported entry points",
        routed,
        internal,
        exports
    );

    resolve_eagerness(finder, defaults, &mut entries)?;
    Ok(entries)
}

/// Apply the startup override, or the root and login path rule without one
fn resolve_eagerness(
    finder: &dyn ClassFinder,
    defaults: &MarkerDefaults,
    entries: &mut IndexMap<String, EntryPoint>,
) -> Result<()> {
    let declaring = finder.annotated_classes(LOAD_DEPENDENCIES_ON_STARTUP)?;

    let mut startup: Option<IndexSet<String>> = None;
    for name in &declaring {
        if !finder.is_assignable(APP_SHELL_CONFIGURATOR, name)? {
            return Err(ScanError::invalid_placement(
                LOAD_DEPENDENCIES_ON_STARTUP,
                name,
                format!("an implementation of {}", APP_SHELL_CONFIGURATOR),
            ));
        }
        let Some(handle) = finder.load_class(name)? else {
            continue;
        };
        let markers = RepeatedMarkers::new(
            name,
            LOAD_DEPENDENCIES_ON_STARTUP,
            &handle.markers,
            defaults.defaults_for(finder, LOAD_DEPENDENCIES_ON_STARTUP)?,
        );
        let listed = startup.get_or_insert_with(IndexSet::new);
        for value in markers.get_values(VALUE) {
            if let Some(class) = value.as_class() {
                listed.insert(class.to_string());
            }
        }
    }

    for entry in entries.values_mut() {
        entry.eager = match (&startup, entry.kind) {
            (_, EntryKind::Internal) => true,
            (Some(listed), _) if listed.is_empty() => true,
            (Some(listed), _) => listed.contains(&entry.name),
            (None, EntryKind::Routed) => entry
                .route
                .as_deref()
                .map_or(false, |route| EAGER_ROUTE_PATHS.contains(&route)),
            (None, EntryKind::WidgetExport) => false,
        };
    }
    Ok(())
}

/// Route path of a routed view: the explicit value, or derived from the class name
pub fn route_path(class_name: &str, value: Option<&MarkerValue>) -> String {
    match value.and_then(MarkerValue::as_str) {
        Some(path) if path != ROUTE_PATH_NOT_DERIVED => path.trim_matches('/').to_string(),
        _ => derive_route_path(class_name),
    }
}

fn derive_route_path(class_name: &str) -> String {
    let simple = simple_name(class_name);
    let base = simple.strip_suffix("View").unwrap_or(simple).to_lowercase();
    if base == "main" {
        String::new()
    } else {
        base
    }
}

const MAX_HIERARCHY_DEPTH: usize = 256;

/// Stable sort so that every class comes after all of its known superclasses
fn sorted_by_depth(finder: &dyn ClassFinder, names: Vec<String>) -> Result<Vec<String>> {
    let mut keyed = Vec::with_capacity(names.len());
    for name in names {
        let mut depth = 0usize;
        let mut current = finder.load_class(&name)?;
        while let Some(handle) = current {
            let Some(parent) = handle.super_name.as_deref() else {
                break;
            };
            if depth >= MAX_HIERARCHY_DEPTH {
                break;
            }
            depth += 1;
            current = finder.load_class(parent)?;
        }
        keyed.push((depth, name));
    }
    keyed.sort_by_key(|(depth, _)| *depth);
    Ok(keyed.into_iter().map(|(_, name)| name).collect())
}

/// Component type an exporter declares through its generic exporter supertype
pub fn exported_component(finder: &dyn ClassFinder, exporter: &ClassHandle) -> Result<Option<String>> {
    let needle = format!("L{}<", to_internal(WEB_COMPONENT_EXPORTER));
    let mut current = Some(Arc::new(exporter.clone()));
    while let Some(handle) = current {
        if let Some(signature) = &handle.signature {
            if let Some(position) = signature.find(&needle) {
                let argument = &signature[position + needle.len()..];
                // A type variable here means the component is bound further down
                let Some(rest) = argument.strip_prefix('L') else {
                    return Ok(None);
                };
                let end = rest.find(|c| c == ';' || c == '<').unwrap_or(rest.len());
                let component = to_dotted(&rest[..end]);
                return match finder.load_class(&component)? {
                    Some(resolved) if !resolved.has_marker(ROUTE) => Ok(Some(component)),
                    _ => Ok(None),
                };
            }
        }
        current = match &handle.super_name {
            Some(parent) => finder.load_class(parent)?,
            None => None,
        };
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::builder::ClassFileBuilder;
    use crate::finder::ClasspathFinder;
    use crate::markers::Marker;

    const OPTIONS: DiscoveryOptions = DiscoveryOptions {
        widget_exports: true,
        react_enabled: false,
    };

    fn route(value: &str) -> Marker {
        Marker::new(ROUTE).with(VALUE, value)
    }

    fn discover(classes: Vec<Vec<u8>>) -> Result<IndexMap<String, EntryPoint>> {
        let finder = ClasspathFinder::from_class_bytes(classes).unwrap();
        discover_entry_points(&finder, &MarkerDefaults::new(), OPTIONS)
    }

    #[test]
    fn test_route_path_derivation() {
        assert_eq!(route_path("com.app.MainView", None), "");
        assert_eq!(route_path("com.app.LoginView", None), "login");
        assert_eq!(route_path("com.app.Orders", None), "orders");
        let sentinel = MarkerValue::from(ROUTE_PATH_NOT_DERIVED);
        assert_eq!(route_path("com.app.Main", Some(&sentinel)), "");
        assert_eq!(route_path("com.app.X", Some(&MarkerValue::from("/admin/"))), "admin");
    }

    #[test]
    fn test_supertypes_precede_subtypes_and_routes_come_first() {
        let entries = discover(vec![
            ClassFileBuilder::new("com.app.Listener")
                .interface(UI_INIT_LISTENER)
                .build(),
            ClassFileBuilder::new("com.app.ChildView")
                .super_class("com.app.ParentView")
                .marker(route("child"))
                .build(),
            ClassFileBuilder::new("com.app.ParentView").marker(route("parent")).build(),
        ])
        .unwrap();

        let names: Vec<_> = entries.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["com.app.ParentView", "com.app.ChildView", "com.app.Listener", UI]);
        assert_eq!(entries["com.app.Listener"].kind, EntryKind::Internal);
        assert!(entries["com.app.Listener"].eager);
        assert!(!entries[UI].application_defined);
    }

    #[test]
    fn test_default_eagerness_and_triggers() {
        let entries = discover(vec![
            ClassFileBuilder::new("com.app.MainView")
                .marker(Marker::new(ROUTE).with(LAYOUT_ATTR, MarkerValue::Class("com.app.Shell".to_string())))
                .build(),
            ClassFileBuilder::new("com.app.LoginView").marker(route("login")).build(),
            ClassFileBuilder::new("com.app.OrdersView").marker(route("orders")).build(),
        ])
        .unwrap();

        let main = &entries["com.app.MainView"];
        assert!(main.eager);
        assert_eq!(main.route.as_deref(), Some(""));
        assert_eq!(main.dependency_triggers, vec!["com.app.MainView", "com.app.Shell"]);
        assert!(entries["com.app.LoginView"].eager);
        assert!(!entries["com.app.OrdersView"].eager);
        assert_eq!(entries["com.app.OrdersView"].dependency_triggers, vec!["com.app.OrdersView"]);
    }

    #[test]
    fn test_startup_override_list() {
        let entries = discover(vec![
            ClassFileBuilder::new("com.app.Shell")
                .interface(APP_SHELL_CONFIGURATOR)
                .marker(Marker::new(LOAD_DEPENDENCIES_ON_STARTUP).with(
                    VALUE,
                    MarkerValue::Array(vec![MarkerValue::Class("com.app.OrdersView".to_string())]),
                ))
                .build(),
            ClassFileBuilder::new("com.app.MainView").marker(route("")).build(),
            ClassFileBuilder::new("com.app.OrdersView").marker(route("orders")).build(),
        ])
        .unwrap();
        assert!(!entries["com.app.MainView"].eager);
        assert!(entries["com.app.OrdersView"].eager);
        assert!(entries["com.app.Shell"].eager);
    }

    #[test]
    fn test_empty_startup_override_makes_everything_eager() {
        let entries = discover(vec![
            ClassFileBuilder::new("com.app.Shell")
                .interface(APP_SHELL_CONFIGURATOR)
                .marker(Marker::new(LOAD_DEPENDENCIES_ON_STARTUP).with(VALUE, MarkerValue::Array(vec![])))
                .build(),
            ClassFileBuilder::new("com.app.OrdersView").marker(route("orders")).build(),
        ])
        .unwrap();
        assert!(entries.values().all(|entry| entry.eager));
    }

    #[test]
    fn test_startup_marker_on_wrong_type_is_fatal() {
        let result = discover(vec![ClassFileBuilder::new("com.app.NotAShell")
            .marker(Marker::new(LOAD_DEPENDENCIES_ON_STARTUP))
            .build()]);
        match result {
            Err(ScanError::InvalidMarkerPlacement { class, .. }) => assert_eq!(class, "com.app.NotAShell"),
            other => panic!("expected invalid placement, got {other:?}"),
        }
    }

    #[test]
    fn test_exporter_contributes_component() {
        let entries = discover(vec![
            ClassFileBuilder::new("com.app.CardExporter")
                .super_class(WEB_COMPONENT_EXPORTER)
                .signature("Lcom/vaadin/flow/component/WebComponentExporter<Lcom/app/Card;>;")
                .build(),
            ClassFileBuilder::new("com.app.Card").build(),
            ClassFileBuilder::new("com.app.AbstractExporter")
                .super_class(WEB_COMPONENT_EXPORTER)
                .signature("<C:Ljava/lang/Object;>Lcom/vaadin/flow/component/WebComponentExporter<TC;>;")
                .abstract_class()
                .build(),
        ])
        .unwrap();

        let exporter = &entries["com.app.CardExporter"];
        assert_eq!(exporter.kind, EntryKind::WidgetExport);
        assert!(!exporter.eager);
        assert_eq!(exporter.dependency_triggers, vec!["com.app.CardExporter", "com.app.Card"]);
        assert_eq!(entries["com.app.Card"].kind, EntryKind::WidgetExport);
        assert_eq!(entries["com.app.AbstractExporter"].dependency_triggers, vec!["com.app.AbstractExporter"]);
    }

    #[test]
    fn test_routed_component_is_not_exported_twice() {
        let entries = discover(vec![
            ClassFileBuilder::new("com.app.CardExporter")
                .super_class(WEB_COMPONENT_EXPORTER)
                .signature("Lcom/vaadin/flow/component/WebComponentExporter<Lcom/app/CardView;>;")
                .build(),
            ClassFileBuilder::new("com.app.CardView").marker(route("card")).build(),
        ])
        .unwrap();
        assert_eq!(entries["com.app.CardView"].kind, EntryKind::Routed);
        assert_eq!(entries["com.app.CardExporter"].dependency_triggers, vec!["com.app.CardExporter"]);
    }

    #[test]
    fn test_react_outlet_toggle() {
        let finder = ClasspathFinder::from_class_bytes(vec![]).unwrap();
        let entries = discover_entry_points(
            &finder,
            &MarkerDefaults::new(),
            DiscoveryOptions {
                widget_exports: false,
                react_enabled: true,
            },
        )
        .unwrap();
        assert!(entries.contains_key(REACT_ROUTER_OUTLET));
        assert!(entries.contains_key(UI));
    }
}
