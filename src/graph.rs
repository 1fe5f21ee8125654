//! Reachability graph over compiled classes
//!
//! Visiting and closure computation are two separate passes. [`ScanContext::visit_class`]
//! records every class reachable from a root exactly once, across all roots, and
//! [`ScanContext::collect_reachable_classes`] later walks the recorded graph per entry
//! point, reusing the closures of entry points computed before it.

use crate::classfile::{parse_class, MarkerTarget, ParseMode, ParsedClass};
use crate::error::Result;
use crate::filter::ClassFilter;
use crate::finder::ClassFinder;
use crate::markers::{Marker, MarkerDefaults, RepeatedMarkers};
use crate::types::*;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One stylesheet import and its optional scoping attributes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CssData {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_for: Option<String>,
}

impl CssData {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            id: None,
            include: None,
            theme_for: None,
        }
    }
}

/// A visited class: its edges and the assets it declares itself
#[derive(Debug, Clone, Default)]
pub struct ClassRecord {
    pub name: String,
    /// False for classes the finder could not resolve; those are leaves
    pub resolved: bool,
    pub access_flags: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<String>,
    pub references: IndexSet<String>,
    pub markers: Vec<Marker>,
    pub modules: Vec<String>,
    pub modules_development_only: Vec<String>,
    pub scripts: Vec<String>,
    pub scripts_development_only: Vec<String>,
    pub css: Vec<CssData>,
}

impl ClassRecord {
    fn leaf(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn has_marker(&self, kind: &str) -> bool {
        self.markers.iter().any(|marker| marker.kind == kind)
    }

    pub fn is_abstract(&self) -> bool {
        self.access_flags & (ACC_ABSTRACT | ACC_INTERFACE) != 0
    }

    pub fn has_assets(&self) -> bool {
        !(self.modules.is_empty()
            && self.modules_development_only.is_empty()
            && self.scripts.is_empty()
            && self.scripts_development_only.is_empty()
            && self.css.is_empty())
    }
}

/// Working state of one scan. Owned by the scan call and dropped with it.
pub struct ScanContext<'a> {
    finder: &'a dyn ClassFinder,
    filter: &'a dyn ClassFilter,
    defaults: &'a MarkerDefaults,
    visited: IndexMap<String, ClassRecord>,
    inspected: IndexSet<String>,
    closures: HashMap<String, Arc<IndexSet<String>>>,
    digest: md5::Context,
}

impl<'a> ScanContext<'a> {
    pub fn new(finder: &'a dyn ClassFinder, filter: &'a dyn ClassFilter, defaults: &'a MarkerDefaults) -> Self {
        Self {
            finder,
            filter,
            defaults,
            visited: IndexMap::new(),
            inspected: IndexSet::new(),
            closures: HashMap::new(),
            digest: md5::Context::new(),
        }
    }

    pub fn finder(&self) -> &'a dyn ClassFinder {
        self.finder
    }

    pub fn marker_defaults(&self) -> &'a MarkerDefaults {
        self.defaults
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.filter.is_excluded(name) || !self.finder.should_inspect(name)
    }

    pub fn record(&self, name: &str) -> Option<&ClassRecord> {
        self.visited.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &ClassRecord> {
        self.visited.values()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Classes whose bytes were actually read, in visit order
    pub fn inspected(&self) -> &IndexSet<String> {
        &self.inspected
    }

    /// All occurrences of `kind` on a recorded class, with declared defaults attached
    pub fn markers_of<'r>(&'r self, record: &'r ClassRecord, kind: &'r str) -> Result<RepeatedMarkers<'r>> {
        let defaults = if record.has_marker(kind) {
            self.defaults.defaults_for(self.finder, kind)?
        } else {
            Arc::default()
        };
        Ok(RepeatedMarkers::new(&record.name, kind, &record.markers, defaults))
    }

    /// Record `name` and everything reachable from it that is not yet recorded
    pub fn visit_class(&mut self, name: &str) -> Result<()> {
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if self.visited.contains_key(&current) || self.is_excluded(&current) {
                continue;
            }
            self.inspect_class(&current)?;
            if let Some(record) = self.visited.get(&current) {
                for reference in record.references.iter().rev() {
                    if !self.visited.contains_key(reference) {
                        pending.push(reference.clone());
                    }
                }
            }
        }
        Ok(())
    }

    /// Record a single class without following its references
    pub fn inspect_class(&mut self, name: &str) -> Result<()> {
        if self.visited.contains_key(name) {
            return Ok(());
        }
        self.visited.insert(name.to_string(), ClassRecord::leaf(name));

        let Some(bytes) = self.finder.read_class(name)? else {
            log::trace!("Class {} is not resolvable, treating it as a leaf", name);
            return Ok(());
        };
        log::trace!("Inspecting class {} ({} bytes)", name, bytes.len());

        let parsed = parse_class(&bytes, ParseMode::Full).map_err(|e| e.with_class(name))?;
        self.digest.consume(name.as_bytes());
        self.digest.consume(&bytes);
        self.inspected.insert(name.to_string());

        let record = self.build_record(name, parsed)?;
        self.visited.insert(name.to_string(), record);
        Ok(())
    }

    fn build_record(&self, name: &str, parsed: ParsedClass) -> Result<ClassRecord> {
        let mut record = ClassRecord {
            name: name.to_string(),
            resolved: true,
            access_flags: parsed.access_flags,
            super_name: parsed.super_name().map(str::to_string),
            interfaces: parsed.interfaces().map(str::to_string).collect(),
            signature: parsed.signature().map(str::to_string),
            references: parsed.referenced_types().into_iter().filter(|r| r != name).collect(),
            markers: parsed.markers(MarkerTarget::Type).cloned().collect(),
            ..ClassRecord::default()
        };
        self.collect_assets(&mut record)?;
        Ok(record)
    }

    fn collect_assets(&self, record: &mut ClassRecord) -> Result<()> {
        let mut modules = (Vec::new(), Vec::new());
        let mut scripts = (Vec::new(), Vec::new());
        let mut css = Vec::new();

        for (kind, (eager, development)) in [(JS_MODULE, &mut modules), (JAVASCRIPT, &mut scripts)] {
            let markers = self.markers_of(record, kind)?;
            for &marker in markers.occurrences() {
                let Some(value) = markers.value_on(marker, VALUE).and_then(|v| v.as_str().map(str::to_string))
                else {
                    continue;
                };
                let development_only = markers
                    .value_on(marker, DEVELOPMENT_ONLY)
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false);
                let bucket = if development_only { &mut *development } else { &mut *eager };
                push_unique(bucket, value);
            }
        }

        let imports = self.markers_of(record, CSS_IMPORT)?;
        // Unset attributes are declared as empty strings
        let text = |marker: &Marker, attribute: &str| {
            imports
                .value_on(marker, attribute)
                .and_then(|v| v.as_str().map(str::to_string))
                .filter(|v| !v.is_empty())
        };
        for &marker in imports.occurrences() {
            let Some(value) = text(marker, VALUE) else {
                continue;
            };
            let data = CssData {
                value,
                id: text(marker, ID),
                include: text(marker, INCLUDE),
                theme_for: text(marker, THEME_FOR),
            };
            push_unique(&mut css, data);
        }

        record.modules = modules.0;
        record.modules_development_only = modules.1;
        record.scripts = scripts.0;
        record.scripts_development_only = scripts.1;
        record.css = css;
        Ok(())
    }

    /// Ordered closure of recorded classes reachable from `entry`, starting with `entry`.
    /// Closures of previously computed entry points are spliced in without descending.
    pub fn collect_reachable_classes(&mut self, entry: &str) -> Arc<IndexSet<String>> {
        if let Some(known) = self.closures.get(entry) {
            return Arc::clone(known);
        }

        let mut closure = IndexSet::new();
        closure.insert(entry.to_string());
        let mut pending: Vec<&str> = Vec::new();
        if let Some(record) = self.visited.get(entry) {
            pending.extend(record.references.iter().rev().map(String::as_str));
        }

        while let Some(current) = pending.pop() {
            if closure.contains(current) {
                continue;
            }
            if let Some(other) = self.closures.get(current) {
                closure.extend(other.iter().cloned());
                continue;
            }
            let Some(record) = self.visited.get(current) else {
                continue;
            };
            closure.insert(current.to_string());
            for reference in record.references.iter().rev() {
                if !closure.contains(reference.as_str()) {
                    pending.push(reference);
                }
            }
        }

        let closure = Arc::new(closure);
        self.closures.insert(entry.to_string(), Arc::clone(&closure));
        closure
    }

    /// Hex MD5 over the names and bytes of every inspected class
    pub fn fingerprint(&self) -> String {
        format!("{:x}", self.digest.clone().compute())
    }
}

pub(crate) fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) {
    if !items.contains(&item) {
        items.push(item);
    }
}
