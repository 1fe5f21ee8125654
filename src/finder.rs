//! Class reference resolution over a classpath
//!
//! The scanner never executes application code. It only needs three things from its
//! environment: the raw bytes of a class by name, a light handle describing a class's
//! declared hierarchy, and enumeration of classes by marker or supertype. The
//! [`ClassFinder`] trait captures exactly that; [`ClasspathFinder`] implements it over
//! class directories, jar archives and in-memory class files.

use crate::classfile::descriptor::{class_name_from_resource, resource_path};
use crate::classfile::{parse_class, MarkerTarget, ParseMode};
use crate::error::{Result, ScanError};
use crate::markers::Marker;
use crate::types::MAX_CLASS_FILE_SIZE;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Declared structure of one class, without its method bodies
#[derive(Debug, Clone, PartialEq)]
pub struct ClassHandle {
    pub name: String,
    pub access_flags: u16,
    pub super_name: Option<String>,
    pub interfaces: Vec<String>,
    pub signature: Option<String>,
    /// Type-level markers, containers already flattened
    pub markers: Vec<Marker>,
}

impl ClassHandle {
    pub fn is_abstract(&self) -> bool {
        self.access_flags & (crate::types::ACC_ABSTRACT | crate::types::ACC_INTERFACE) != 0
    }

    pub fn has_marker(&self, kind: &str) -> bool {
        self.markers.iter().any(|marker| marker.kind == kind)
    }

    /// Super class followed by interfaces
    pub fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.super_name
            .as_deref()
            .into_iter()
            .chain(self.interfaces.iter().map(String::as_str))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let parsed = parse_class(bytes, ParseMode::Declaration)?;
        Ok(Self {
            access_flags: parsed.access_flags,
            super_name: parsed.super_name().map(str::to_string),
            interfaces: parsed.interfaces().map(str::to_string).collect(),
            signature: parsed.signature().map(str::to_string),
            markers: parsed.markers(MarkerTarget::Type).cloned().collect(),
            name: parsed.name,
        })
    }
}

pub trait ClassFinder {
    /// Open a classpath resource such as `com/app/View.class`; `None` when absent
    fn open_resource(&self, path: &str) -> Result<Option<Box<dyn Read + '_>>>;

    /// Declared structure of a class; `None` when it cannot be resolved
    fn load_class(&self, name: &str) -> Result<Option<Arc<ClassHandle>>>;

    /// Every class carrying the given type-level marker
    fn annotated_classes(&self, marker: &str) -> Result<Vec<String>>;

    /// Every class extending or implementing `supertype`, directly or transitively
    fn subtypes_of(&self, supertype: &str) -> Result<Vec<String>>;

    /// Environment specific veto on opening a class
    fn should_inspect(&self, _name: &str) -> bool {
        true
    }

    /// Full bytes of a compiled class. The stream is dropped before returning on every path.
    fn read_class(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let stream = self.open_resource(&resource_path(name))?;
        read_stream(name, stream)
    }

    /// Whether `name` is `supertype` or extends/implements it somewhere up its hierarchy.
    /// Unresolvable ancestors end the walk on that branch.
    fn is_assignable(&self, supertype: &str, name: &str) -> Result<bool> {
        let mut seen = HashSet::new();
        let mut pending = vec![name.to_string()];
        while let Some(current) = pending.pop() {
            if current == supertype {
                return Ok(true);
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(handle) = self.load_class(&current)? {
                pending.extend(handle.supertypes().map(str::to_string));
            }
        }
        Ok(false)
    }
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    JarEntry { archive: Arc<PathBuf>, entry: String },
    Memory(Arc<[u8]>),
}

/// [`ClassFinder`] over class directories, jar archives and in-memory class files.
///
/// Entries are indexed once on construction. Earlier classpath entries shadow later ones.
#[derive(Debug, Default)]
pub struct ClasspathFinder {
    resources: IndexMap<String, Location>,
    handles: IndexMap<String, Arc<ClassHandle>>,
}

impl ClasspathFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index directories and `.jar` files in classpath order
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> Result<Self> {
        let mut finder = Self::new();
        for path in paths {
            finder.add_path(path.as_ref())?;
        }
        finder.index_classes();
        Ok(finder)
    }

    /// Index class files held in memory; names come from the class files themselves
    pub fn from_class_bytes(classes: Vec<Vec<u8>>) -> Result<Self> {
        let mut finder = Self::new();
        for bytes in classes {
            let handle = ClassHandle::from_bytes(&bytes)?;
            let path = resource_path(&handle.name);
            if finder.resources.contains_key(&path) {
                continue;
            }
            finder.resources.insert(path, Location::Memory(Arc::from(bytes)));
            finder.handles.insert(handle.name.clone(), Arc::new(handle));
        }
        Ok(finder)
    }

    pub fn add_path(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(ScanError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        if path.is_dir() {
            self.add_directory(path)
        } else if path.extension().map_or(false, |ext| ext == "jar" || ext == "zip") {
            self.add_jar(path)
        } else {
            Err(ScanError::classpath(format!(
                "'{}' is neither a directory nor a jar archive",
                path.display()
            )))
        }
    }

    fn add_directory(&mut self, root: &Path) -> Result<()> {
        let mut added = 0;
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                ScanError::classpath(format!("Directory traversal error in '{}': {}", root.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let resource = relative
                .components()
                .map(|part| part.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !self.resources.contains_key(&resource) {
                self.resources
                    .insert(resource, Location::File(entry.path().to_path_buf()));
                added += 1;
            }
        }
        log::debug!("Indexed {} resources from directory {}", added, root.display());
        Ok(())
    }

    fn add_jar(&mut self, path: &Path) -> Result<()> {
        let archive_path = Arc::new(path.to_path_buf());
        let mut archive = open_archive(path)?;
        let mut added = 0;
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|e| zip_error(path, e))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if !self.resources.contains_key(&name) {
                self.resources.insert(
                    name.clone(),
                    Location::JarEntry {
                        archive: Arc::clone(&archive_path),
                        entry: name,
                    },
                );
                added += 1;
            }
        }
        log::debug!("Indexed {} resources from archive {}", added, path.display());
        Ok(())
    }

    // A class that fails to index stays readable by name; reaching it during a scan
    // reports the parse failure there.
    fn index_classes(&mut self) {
        let class_resources: Vec<(String, String)> = self
            .resources
            .keys()
            .filter_map(|path| class_name_from_resource(path).map(|name| (path.clone(), name)))
            .collect();

        for (path, name) in class_resources {
            if self.handles.contains_key(&name) {
                continue;
            }
            let loaded = self
                .open_resource(&path)
                .and_then(|stream| read_stream(&name, stream))
                .and_then(|bytes| match bytes {
                    Some(bytes) => ClassHandle::from_bytes(&bytes).map(Some),
                    None => Ok(None),
                });
            match loaded {
                Ok(Some(handle)) => {
                    self.handles.insert(name, Arc::new(handle));
                }
                Ok(None) => {}
                Err(e) => log::warn!("Skipping unreadable class {} while indexing: {}", name, e),
            }
        }
        log::debug!("Indexed {} classes", self.handles.len());
    }

    pub fn class_count(&self) -> usize {
        self.handles.len()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

fn read_stream(name: &str, stream: Option<Box<dyn Read + '_>>) -> Result<Option<Vec<u8>>> {
    let Some(stream) = stream else {
        return Ok(None);
    };
    let mut bytes = Vec::new();
    stream.take(MAX_CLASS_FILE_SIZE + 1).read_to_end(&mut bytes)?;
    if bytes.len() as u64 > MAX_CLASS_FILE_SIZE {
        return Err(ScanError::parse(name, "class file exceeds the maximum supported size"));
    }
    Ok(Some(bytes))
}

fn open_archive(path: &Path) -> Result<zip::ZipArchive<File>> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| zip_error(path, e))
}

fn zip_error(path: &Path, error: zip::result::ZipError) -> ScanError {
    ScanError::classpath(format!("Failed to read archive '{}': {}", path.display(), error))
}

impl ClassFinder for ClasspathFinder {
    fn open_resource(&self, path: &str) -> Result<Option<Box<dyn Read + '_>>> {
        let Some(location) = self.resources.get(path) else {
            return Ok(None);
        };
        let stream: Box<dyn Read> = match location {
            Location::File(file) => Box::new(File::open(file)?),
            // Entries borrow their archive, so jar resources are buffered
            Location::JarEntry { archive, entry } => {
                let mut zip = open_archive(archive)?;
                let mut entry_stream = zip.by_name(entry).map_err(|e| zip_error(archive, e))?;
                let mut bytes = Vec::with_capacity(entry_stream.size() as usize);
                (&mut entry_stream)
                    .take(MAX_CLASS_FILE_SIZE + 1)
                    .read_to_end(&mut bytes)?;
                Box::new(Cursor::new(bytes))
            }
            Location::Memory(bytes) => Box::new(Cursor::new(Arc::clone(bytes))),
        };
        Ok(Some(stream))
    }

    fn load_class(&self, name: &str) -> Result<Option<Arc<ClassHandle>>> {
        Ok(self.handles.get(name).cloned())
    }

    fn annotated_classes(&self, marker: &str) -> Result<Vec<String>> {
        Ok(self
            .handles
            .values()
            .filter(|handle| handle.has_marker(marker))
            .map(|handle| handle.name.clone())
            .collect())
    }

    fn subtypes_of(&self, supertype: &str) -> Result<Vec<String>> {
        let mut subtypes = Vec::new();
        for name in self.handles.keys() {
            if name != supertype && self.is_assignable(supertype, name)? {
                subtypes.push(name.clone());
            }
        }
        Ok(subtypes)
    }
}
