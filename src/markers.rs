//! Metadata markers (class file annotations) and their default values
//!
//! A marker is a generic key/value tree. Repeated markers arrive wrapped in a
//! container marker whose only attribute is an array of nested markers; those are
//! flattened here so the rest of the scanner only ever sees individual occurrences.

use crate::classfile::{parse_class, ClassEvent, ParseMode};
use crate::error::{Result, ScanError};
use crate::finder::ClassFinder;
use crate::types::{MAX_MARKER_NESTING, VALUE};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
    /// Fully-qualified class name, or a primitive descriptor such as `V`
    Class(String),
    Enum { type_name: String, constant: String },
    Nested(Marker),
    Array(Vec<MarkerValue>),
}

impl MarkerValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MarkerValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MarkerValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&str> {
        match self {
            MarkerValue::Class(name) => Some(name),
            _ => None,
        }
    }

    /// Array elements, or the value itself for a single element
    pub fn elements(&self) -> &[MarkerValue] {
        match self {
            MarkerValue::Array(items) => items,
            single => std::slice::from_ref(single),
        }
    }

    /// String elements of a string or string array value
    pub fn strings(&self) -> Vec<String> {
        self.elements()
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }

    /// Class elements of a class or class array value
    pub fn classes(&self) -> Vec<String> {
        self.elements()
            .iter()
            .filter_map(|item| item.as_class().map(str::to_string))
            .collect()
    }
}

impl From<&str> for MarkerValue {
    fn from(value: &str) -> Self {
        MarkerValue::Str(value.to_string())
    }
}

impl From<String> for MarkerValue {
    fn from(value: String) -> Self {
        MarkerValue::Str(value)
    }
}

impl From<i64> for MarkerValue {
    fn from(value: i64) -> Self {
        MarkerValue::Int(value)
    }
}

impl From<bool> for MarkerValue {
    fn from(value: bool) -> Self {
        MarkerValue::Bool(value)
    }
}

impl fmt::Display for MarkerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerValue::Bool(value) => write!(f, "{}", value),
            MarkerValue::Int(value) => write!(f, "{}", value),
            MarkerValue::Float(value) => write!(f, "{}", value),
            MarkerValue::Char(value) => write!(f, "{}", value),
            MarkerValue::Str(value) => write!(f, "{}", value),
            MarkerValue::Class(name) => write!(f, "{}", name),
            MarkerValue::Enum { type_name, constant } => write!(f, "{}.{}", type_name, constant),
            MarkerValue::Nested(marker) => write!(f, "{}", marker),
            MarkerValue::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

/// One marker occurrence with the attributes written at the usage site
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Fully-qualified name of the marker type
    pub kind: String,
    pub attributes: IndexMap<String, MarkerValue>,
}

impl Marker {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: IndexMap::new(),
        }
    }

    pub fn with(mut self, attribute: impl Into<String>, value: impl Into<MarkerValue>) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }

    pub fn get(&self, attribute: &str) -> Option<&MarkerValue> {
        self.attributes.get(attribute)
    }

    /// Class names held anywhere in this marker's attribute tree
    pub fn referenced_classes(&self) -> Vec<String> {
        let mut names = Vec::new();
        for value in self.attributes.values() {
            collect_classes(value, &mut names);
        }
        names
    }

    fn is_container(&self) -> bool {
        if self.attributes.len() != 1 {
            return false;
        }
        match self.attributes.get(VALUE) {
            Some(MarkerValue::Array(items)) => {
                !items.is_empty() && items.iter().all(|item| matches!(item, MarkerValue::Nested(_)))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}(", self.kind)?;
        for (i, (name, value)) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, value)?;
        }
        write!(f, ")")
    }
}

fn collect_classes(value: &MarkerValue, names: &mut Vec<String>) {
    match value {
        MarkerValue::Class(name) if name.contains('.') || name.len() > 1 => {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        MarkerValue::Enum { type_name, .. } => {
            if !names.contains(type_name) {
                names.push(type_name.clone());
            }
        }
        MarkerValue::Nested(marker) => {
            for nested in marker.attributes.values() {
                collect_classes(nested, names);
            }
        }
        MarkerValue::Array(items) => {
            for item in items {
                collect_classes(item, names);
            }
        }
        _ => {}
    }
}

/// Expand container markers into their individual occurrences
pub fn flatten(marker: Marker) -> Vec<Marker> {
    let mut occurrences = Vec::new();
    flatten_into(marker, 0, &mut occurrences);
    occurrences
}

fn flatten_into(marker: Marker, depth: usize, out: &mut Vec<Marker>) {
    if depth >= MAX_MARKER_NESTING || !marker.is_container() {
        out.push(marker);
        return;
    }
    let Marker { mut attributes, .. } = marker;
    if let Some(MarkerValue::Array(items)) = attributes.shift_remove(VALUE) {
        for item in items {
            if let MarkerValue::Nested(nested) = item {
                flatten_into(nested, depth + 1, out);
            }
        }
    }
}

pub type MarkerDefaultMap = IndexMap<String, MarkerValue>;

/// All occurrences of one marker kind on one class
pub struct RepeatedMarkers<'a> {
    class_name: &'a str,
    kind: &'a str,
    occurrences: Vec<&'a Marker>,
    defaults: Arc<MarkerDefaultMap>,
}

impl<'a> RepeatedMarkers<'a> {
    pub fn new(
        class_name: &'a str,
        kind: &'a str,
        markers: impl IntoIterator<Item = &'a Marker>,
        defaults: Arc<MarkerDefaultMap>,
    ) -> Self {
        Self {
            class_name,
            kind,
            occurrences: markers.into_iter().filter(|m| m.kind == kind).collect(),
            defaults,
        }
    }

    pub fn len(&self) -> usize {
        self.occurrences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occurrences.is_empty()
    }

    pub fn occurrences(&self) -> &[&'a Marker] {
        &self.occurrences
    }

    /// Value of `attribute` on one occurrence, falling back to the declared default
    pub fn value_on(&self, marker: &Marker, attribute: &str) -> Option<MarkerValue> {
        marker
            .get(attribute)
            .or_else(|| self.defaults.get(attribute))
            .cloned()
    }

    /// Value of `attribute` on the single occurrence, falling back to the declared default
    pub fn get_value(&self, attribute: &str) -> Result<Option<MarkerValue>> {
        match self.occurrences.as_slice() {
            [single] => Ok(self.value_on(single, attribute)),
            other => Err(ScanError::MarkerCardinality {
                marker: self.kind.to_string(),
                class: self.class_name.to_string(),
                count: other.len(),
            }),
        }
    }

    /// Every distinct value of `attribute` across all occurrences, in encounter order
    pub fn get_values(&self, attribute: &str) -> Vec<MarkerValue> {
        let mut values = Vec::new();
        for marker in &self.occurrences {
            if let Some(value) = self.value_on(marker, attribute) {
                push_elements(&mut values, value);
            }
        }
        values
    }

    /// Distinct `value_attribute` values of the occurrences whose `key_attribute` equals `key`.
    /// Occurrences without an explicit `key_attribute` never match.
    pub fn get_values_for_key(
        &self,
        key_attribute: &str,
        key: impl Into<MarkerValue>,
        value_attribute: &str,
    ) -> Vec<MarkerValue> {
        let key = key.into();
        let mut values = Vec::new();
        for marker in &self.occurrences {
            if marker.get(key_attribute) != Some(&key) {
                continue;
            }
            if let Some(value) = self.value_on(marker, value_attribute) {
                push_elements(&mut values, value);
            }
        }
        values
    }
}

fn push_elements(values: &mut Vec<MarkerValue>, value: MarkerValue) {
    match value {
        MarkerValue::Array(items) => {
            for item in items {
                if !values.contains(&item) {
                    values.push(item);
                }
            }
        }
        single => {
            if !values.contains(&single) {
                values.push(single);
            }
        }
    }
}

/// Per marker kind cache of declared attribute defaults
///
/// Defaults depend only on the marker type's own declaration, so one instance can be
/// shared between independent scans.
#[derive(Debug, Default)]
pub struct MarkerDefaults {
    cache: Mutex<HashMap<String, Arc<MarkerDefaultMap>>>,
}

impl MarkerDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults declared by `kind`, read from its class file on first request
    pub fn defaults_for(&self, finder: &dyn ClassFinder, kind: &str) -> Result<Arc<MarkerDefaultMap>> {
        if let Some(hit) = self.lock().get(kind) {
            return Ok(Arc::clone(hit));
        }

        let defaults = Arc::new(read_defaults(finder, kind)?);
        log::trace!("Read {} default values for marker {}", defaults.len(), kind);
        let mut cache = self.lock();
        Ok(Arc::clone(cache.entry(kind.to_string()).or_insert(defaults)))
    }

    pub fn cached_kinds(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<MarkerDefaultMap>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_defaults(finder: &dyn ClassFinder, kind: &str) -> Result<MarkerDefaultMap> {
    let mut defaults = MarkerDefaultMap::new();
    let Some(bytes) = finder.read_class(kind)? else {
        return Ok(defaults);
    };
    let parsed = parse_class(&bytes, ParseMode::Defaults).map_err(|e| e.with_class(kind))?;
    for event in parsed.events {
        if let ClassEvent::MarkerDefault { attribute, value } = event {
            defaults.insert(attribute, value);
        }
    }
    Ok(defaults)
}
