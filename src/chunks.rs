//! Grouping of entry point assets into bundler chunks

use crate::entry_points::{EntryKind, EntryPoint};
use crate::graph::{push_unique, ClassRecord, CssData};
use indexmap::IndexMap;
use serde::Serialize;

/// Chunk key. Internal entry points share [`ChunkInfo::GLOBAL`]; every other entry
/// point gets a chunk of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ChunkInfo {
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub dependency_triggers: Vec<String>,
    pub eager: bool,
}

impl ChunkInfo {
    pub const GLOBAL: ChunkInfo = ChunkInfo {
        kind: EntryKind::Internal,
        name: None,
        dependency_triggers: Vec::new(),
        eager: true,
    };

    pub fn for_entry(entry: &EntryPoint) -> Self {
        match entry.kind {
            EntryKind::Internal => Self::GLOBAL,
            kind => Self {
                kind,
                name: Some(entry.name.clone()),
                dependency_triggers: entry.dependency_triggers.clone(),
                eager: entry.eager,
            },
        }
    }

    pub fn is_global(&self) -> bool {
        *self == Self::GLOBAL
    }

    /// Stable identifier used as the chunk's key in reports
    pub fn id(&self) -> String {
        match &self.name {
            None => "global".to_string(),
            Some(name) => name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChunkAssets {
    pub modules: Vec<String>,
    pub modules_development_only: Vec<String>,
    pub scripts: Vec<String>,
    pub scripts_development_only: Vec<String>,
    pub css: Vec<CssData>,
}

impl ChunkAssets {
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
            && self.modules_development_only.is_empty()
            && self.scripts.is_empty()
            && self.scripts_development_only.is_empty()
            && self.css.is_empty()
    }

    pub fn merge(&mut self, other: &ChunkAssets) {
        for module in &other.modules {
            push_unique(&mut self.modules, module.clone());
        }
        for module in &other.modules_development_only {
            push_unique(&mut self.modules_development_only, module.clone());
        }
        for script in &other.scripts {
            push_unique(&mut self.scripts, script.clone());
        }
        for script in &other.scripts_development_only {
            push_unique(&mut self.scripts_development_only, script.clone());
        }
        for css in &other.css {
            push_unique(&mut self.css, css.clone());
        }
    }

    /// Append the assets a single class declares itself
    pub fn absorb_record(&mut self, record: &ClassRecord) {
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

    fn from_entry(entry: &EntryPoint) -> Self {
        Self {
            modules: entry.modules.clone(),
            modules_development_only: entry.modules_development_only.clone(),
            scripts: entry.scripts.clone(),
            scripts_development_only: entry.scripts_development_only.clone(),
            css: entry.css.clone(),
        }
    }

    // Anything needed eagerly in this chunk is not repeated as development only
    fn settle(&mut self) {
        let modules = &self.modules;
        self.modules_development_only.retain(|module| !modules.contains(module));
        let scripts = &self.scripts;
        self.scripts_development_only.retain(|script| !scripts.contains(script));
    }
}

/// Assets of every chunk, in entry point order with the global chunk first
#[derive(Debug, Clone, Default)]
pub struct Chunks {
    chunks: IndexMap<ChunkInfo, ChunkAssets>,
}

impl Chunks {
    /// Group entry points into chunks. `theme_assets` lead the global chunk.
    pub fn assemble<'e>(entries: impl IntoIterator<Item = &'e EntryPoint>, theme_assets: Option<ChunkAssets>) -> Self {
        let mut chunks: IndexMap<ChunkInfo, ChunkAssets> = IndexMap::new();
        if let Some(theme) = theme_assets.filter(|assets| !assets.is_empty()) {
            chunks.insert(ChunkInfo::GLOBAL, theme);
        }
        for entry in entries {
            let assets = ChunkAssets::from_entry(entry);
            if assets.is_empty() {
                continue;
            }
            chunks.entry(ChunkInfo::for_entry(entry)).or_default().merge(&assets);
        }
        for assets in chunks.values_mut() {
            assets.settle();
        }
        let mut chunks = Self { chunks };
        chunks.move_global_first();
        chunks
    }

    fn move_global_first(&mut self) {
        if let Some(index) = self.chunks.get_index_of(&ChunkInfo::GLOBAL) {
            self.chunks.move_index(index, 0);
        }
    }

    /// Put every asset into the global chunk, used when scanning the whole classpath
    pub fn global(assets: ChunkAssets) -> Self {
        let mut chunks = IndexMap::new();
        let mut assets = assets;
        assets.settle();
        if !assets.is_empty() {
            chunks.insert(ChunkInfo::GLOBAL, assets);
        }
        Self { chunks }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ChunkInfo, &ChunkAssets)> {
        self.chunks.iter()
    }

    pub fn get(&self, chunk: &ChunkInfo) -> Option<&ChunkAssets> {
        self.chunks.get(chunk)
    }

    pub fn global_assets(&self) -> Option<&ChunkAssets> {
        self.chunks.get(&ChunkInfo::GLOBAL)
    }

    fn view<T: Clone>(&self, pick: impl Fn(&ChunkAssets) -> &Vec<T>) -> IndexMap<ChunkInfo, Vec<T>> {
        self.chunks
            .iter()
            .filter(|(_, assets)| !pick(assets).is_empty())
            .map(|(info, assets)| (info.clone(), pick(assets).clone()))
            .collect()
    }

    pub fn modules(&self) -> IndexMap<ChunkInfo, Vec<String>> {
        self.view(|assets| &assets.modules)
    }

    pub fn modules_development_only(&self) -> IndexMap<ChunkInfo, Vec<String>> {
        self.view(|assets| &assets.modules_development_only)
    }

    pub fn scripts(&self) -> IndexMap<ChunkInfo, Vec<String>> {
        self.view(|assets| &assets.scripts)
    }

    pub fn scripts_development_only(&self) -> IndexMap<ChunkInfo, Vec<String>> {
        self.view(|assets| &assets.scripts_development_only)
    }

    pub fn css(&self) -> IndexMap<ChunkInfo, Vec<CssData>> {
        self.view(|assets| &assets.css)
    }

    /// Every module of every chunk, each listed once
    pub fn all_modules(&self) -> Vec<String> {
        let mut all = Vec::new();
        for assets in self.chunks.values() {
            for module in &assets.modules {
                push_unique(&mut all, module.clone());
            }
        }
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, kind: EntryKind, modules: &[&str]) -> EntryPoint {
        let mut entry = EntryPoint::new(name, kind);
        entry.modules = modules.iter().map(|m| m.to_string()).collect();
        entry.dependency_triggers = vec![name.to_string()];
        entry
    }

    #[test]
    fn test_internal_entries_share_global_chunk() {
        let entries = vec![
            entry("com.app.OrdersView", EntryKind::Routed, &["./orders.js"]),
            entry("com.app.Shell", EntryKind::Internal, &["./shell.js"]),
            entry("com.app.Listener", EntryKind::Internal, &["./listener.js", "./shell.js"]),
        ];
        let theme = ChunkAssets {
            modules: vec!["./theme.js".to_string()],
            ..ChunkAssets::default()
        };
        let chunks = Chunks::assemble(&entries, Some(theme));

        assert_eq!(chunks.len(), 2);
        let (first, global) = chunks.iter().next().unwrap();
        assert!(first.is_global());
        assert_eq!(global.modules, vec!["./theme.js", "./shell.js", "./listener.js"]);

        let orders = chunks.iter().nth(1).unwrap().0;
        assert_eq!(orders.name.as_deref(), Some("com.app.OrdersView"));
        assert!(!orders.eager);
    }

    #[test]
    fn test_development_only_never_in_eager_list() {
        let mut view = entry("com.app.MainView", EntryKind::Routed, &["./main.js"]);
        view.eager = true;
        view.modules_development_only = vec!["./debug.js".to_string(), "./main.js".to_string()];
        let chunks = Chunks::assemble(&[view], None);

        let modules = chunks.modules();
        let development = chunks.modules_development_only();
        let (info, eager) = modules.iter().next().unwrap();
        assert_eq!(eager, &vec!["./main.js".to_string()]);
        assert_eq!(development[info], vec!["./debug.js".to_string()]);
    }

    #[test]
    fn test_no_entries_no_chunks() {
        let chunks = Chunks::assemble(Vec::<EntryPoint>::new().iter(), None);
        assert!(chunks.is_empty());
        assert!(chunks.modules().is_empty());
    }

    #[test]
    fn test_chunk_identity_is_structural() {
        let a = entry("com.app.A", EntryKind::WidgetExport, &[]);
        let info = ChunkInfo::for_entry(&a);
        assert_eq!(info, ChunkInfo::for_entry(&a.clone()));
        assert_ne!(info, ChunkInfo::GLOBAL);
        assert_eq!(ChunkInfo::GLOBAL.id(), "global");
    }
}
