use crate::error::ScanDiagnostics;
use crate::types::{
    AssetEntity, AssetType, CallableEntity, DeclarationEntity, DeclarationKind, EntityKind,
    ModuleRef, PluginEntity, ProjectDescriptor,
};
use chrono::{DateTime, Utc};
use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::hash::Hash;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub total_matches: usize,
    pub query_duration_ms: u64,
}

impl<T> QueryResult<T> {
    pub fn new(items: Vec<T>, total_matches: usize, query_duration_ms: u64) -> Self {
        Self {
            items,
            total_matches,
            query_duration_ms,
        }
    }

    /// Keep at most `limit` items; `total_matches` still counts everything.
    pub fn truncated(mut self, limit: usize) -> Self {
        self.items.truncate(limit);
        self
    }
}

/// Why a file shows up in a usage query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    Inherits,
    ReturnType,
    ParameterType,
}

/// One textual reference: `referrer` in `file` mentions `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEdge {
    pub token: String,
    pub referrer: String,
    pub file: PathBuf,
    pub line: usize,
    pub kind: UsageKind,
}

impl UsageEdge {
    /// Parent edges match exactly; type edges match any substring.
    fn matches(&self, name: &str) -> bool {
        match self.kind {
            UsageKind::Inherits => self.token == name,
            UsageKind::ReturnType | UsageKind::ParameterType => self.token.contains(name),
        }
    }
}

/// Entries dropped by last-write-wins merges, per entity family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionCounts {
    pub declarations: usize,
    pub callables: usize,
    pub assets: usize,
    pub plugins: usize,
}

impl CollisionCounts {
    pub fn total(&self) -> usize {
        self.declarations + self.callables + self.assets + self.plugins
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzyMatch {
    pub kind: EntityKind,
    pub name: String,
    pub score: i64,
}

/// Transient per-scan entity lists handed to [`ProjectMap::build`].
#[derive(Debug, Clone, Default)]
pub struct ScanArtifacts {
    pub declarations: Vec<DeclarationEntity>,
    pub callables: Vec<CallableEntity>,
    pub assets: Vec<AssetEntity>,
    pub plugins: Vec<PluginEntity>,
    pub files_scanned: usize,
    pub diagnostics: ScanDiagnostics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMapMetadata {
    pub scanned_at: DateTime<Utc>,
    pub files_scanned: usize,
    pub collisions: CollisionCounts,
    pub diagnostics: ScanDiagnostics,
}

/// Summary counts over one scan generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub project_name: String,
    pub engine_association: String,
    pub modules: usize,
    pub plugin_modules: usize,
    pub module_types: BTreeMap<String, usize>,
    pub build_configurations: usize,
    pub declarations: usize,
    pub declarations_by_kind: BTreeMap<DeclarationKind, usize>,
    pub blueprint_exposed: usize,
    pub callables: usize,
    pub blueprint_callables: usize,
    pub assets: usize,
    pub assets_by_type: BTreeMap<AssetType, usize>,
    pub asset_bytes: u64,
    pub plugins: usize,
    pub enabled_plugins: usize,
    pub plugin_categories: BTreeMap<String, usize>,
    pub files_scanned: usize,
    pub collisions: CollisionCounts,
    pub diagnostics: ScanDiagnostics,
    pub scanned_at: DateTime<Utc>,
}

/// Merge `items` into a keyed arena. A later duplicate replaces the earlier
/// entry in place and counts as one collision.
fn merge_last_write_wins<T, K>(items: Vec<T>, key: impl Fn(&T) -> K) -> (Vec<T>, HashMap<K, usize>, usize)
where
    K: Eq + Hash,
{
    let mut arena: Vec<T> = Vec::with_capacity(items.len());
    let mut index: HashMap<K, usize> = HashMap::with_capacity(items.len());
    let mut collisions = 0;

    for item in items {
        let k = key(&item);
        match index.get(&k) {
            Some(&slot) => {
                arena[slot] = item;
                collisions += 1;
            }
            None => {
                index.insert(k, arena.len());
                arena.push(item);
            }
        }
    }
    (arena, index, collisions)
}

/// Stable reorder moving exact-name hits to the front.
fn exact_first<'a, T>(mut items: Vec<&'a T>, is_exact: impl Fn(&T) -> bool) -> Vec<&'a T> {
    items.sort_by_key(|item| !is_exact(item));
    items
}

/// The aggregate index for one scan generation.
///
/// Built once from [`ScanArtifacts`] and read-only afterwards; a rescan
/// builds a new map.
#[derive(Debug, Clone)]
pub struct ProjectMap {
    project: ProjectDescriptor,

    declarations: Vec<DeclarationEntity>,
    declaration_index: HashMap<String, usize>,
    children: HashMap<String, Vec<usize>>,

    callables: Vec<CallableEntity>,
    callable_index: HashMap<(String, String), usize>,
    callables_by_owner: HashMap<String, Vec<usize>>,

    assets: Vec<AssetEntity>,
    asset_index: HashMap<String, usize>,

    plugins: Vec<PluginEntity>,
    plugin_index: HashMap<String, usize>,

    usage_edges: Vec<UsageEdge>,
    metadata: ProjectMapMetadata,
}

impl ProjectMap {
    pub fn build(mut project: ProjectDescriptor, artifacts: ScanArtifacts) -> Self {
        let (declarations, declaration_index, declaration_collisions) =
            merge_last_write_wins(artifacts.declarations, |d| d.name.clone());
        let (callables, callable_index, callable_collisions) =
            merge_last_write_wins(artifacts.callables, |c| (c.owner.clone(), c.name.clone()));
        let (assets, asset_index, asset_collisions) =
            merge_last_write_wins(artifacts.assets, |a| a.name.clone());
        let (mut plugins, plugin_index, plugin_collisions) =
            merge_last_write_wins(artifacts.plugins, |p| p.name.clone());

        let collisions = CollisionCounts {
            declarations: declaration_collisions,
            callables: callable_collisions,
            assets: asset_collisions,
            plugins: plugin_collisions,
        };
        if collisions.total() > 0 {
            debug!("Merge collisions: {:?}", collisions);
        }

        // The project's own plugin list overrides a plugin's default.
        for plugin in &mut plugins {
            if let Some(plugin_ref) = project.plugin_ref(&plugin.name) {
                plugin.enabled = plugin_ref.enabled;
            }
        }

        let mut by_module: HashMap<&str, BTreeSet<String>> = HashMap::new();
        for decl in &declarations {
            by_module
                .entry(decl.module.as_str())
                .or_default()
                .insert(decl.name.clone());
        }
        let attach = |module: &mut ModuleRef| {
            if let Some(names) = by_module.get(module.name.as_str()) {
                module.declarations = names.clone();
            }
        };
        project.modules.iter_mut().for_each(attach);
        plugins
            .iter_mut()
            .flat_map(|plugin| plugin.modules.iter_mut())
            .for_each(attach);

        let mut children: HashMap<String, Vec<usize>> = HashMap::new();
        let mut usage_edges = Vec::new();
        for (idx, decl) in declarations.iter().enumerate() {
            if let Some(parent) = &decl.parent {
                children.entry(parent.clone()).or_default().push(idx);
                usage_edges.push(UsageEdge {
                    token: parent.clone(),
                    referrer: decl.name.clone(),
                    file: decl.file_path.clone(),
                    line: decl.line,
                    kind: UsageKind::Inherits,
                });
            }
        }

        let mut callables_by_owner: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, callable) in callables.iter().enumerate() {
            callables_by_owner.entry(callable.owner.clone()).or_default().push(idx);

            let referrer = callable.qualified_name();
            for (position, token) in callable.type_tokens().enumerate() {
                usage_edges.push(UsageEdge {
                    token: token.to_string(),
                    referrer: referrer.clone(),
                    file: callable.file_path.clone(),
                    line: callable.line,
                    kind: if position == 0 {
                        UsageKind::ReturnType
                    } else {
                        UsageKind::ParameterType
                    },
                });
            }
        }

        let metadata = ProjectMapMetadata {
            scanned_at: Utc::now(),
            files_scanned: artifacts.files_scanned,
            collisions,
            diagnostics: artifacts.diagnostics,
        };

        Self {
            project,
            declarations,
            declaration_index,
            children,
            callables,
            callable_index,
            callables_by_owner,
            assets,
            asset_index,
            plugins,
            plugin_index,
            usage_edges,
            metadata,
        }
    }

    pub fn project(&self) -> &ProjectDescriptor {
        &self.project
    }

    pub fn metadata(&self) -> &ProjectMapMetadata {
        &self.metadata
    }

    pub fn declarations(&self) -> &[DeclarationEntity] {
        &self.declarations
    }

    pub fn callables(&self) -> &[CallableEntity] {
        &self.callables
    }

    pub fn assets(&self) -> &[AssetEntity] {
        &self.assets
    }

    pub fn plugins(&self) -> &[PluginEntity] {
        &self.plugins
    }

    pub fn usage_edges(&self) -> &[UsageEdge] {
        &self.usage_edges
    }

    pub fn get_declaration(&self, name: &str) -> Option<&DeclarationEntity> {
        self.declaration_index
            .get(name)
            .and_then(|&idx| self.declarations.get(idx))
    }

    pub fn get_callable(&self, owner: &str, name: &str) -> Option<&CallableEntity> {
        self.callable_index
            .get(&(owner.to_string(), name.to_string()))
            .and_then(|&idx| self.callables.get(idx))
    }

    pub fn get_asset(&self, name: &str) -> Option<&AssetEntity> {
        self.asset_index.get(name).and_then(|&idx| self.assets.get(idx))
    }

    pub fn get_plugin(&self, name: &str) -> Option<&PluginEntity> {
        self.plugin_index.get(name).and_then(|&idx| self.plugins.get(idx))
    }

    /// Pattern matches on the name, exact hits first.
    pub fn find_declarations(&self, pattern: &str) -> QueryResult<&DeclarationEntity> {
        let start_time = std::time::Instant::now();

        let results = exact_first(
            self.declarations
                .iter()
                .filter(|decl| self.matches_pattern(&decl.name, pattern))
                .collect(),
            |decl| decl.name == pattern,
        );

        let len = results.len();
        QueryResult::new(results, len, start_time.elapsed().as_millis() as u64)
    }

    /// Pattern matches on the callable name across every owner.
    pub fn find_callables(&self, pattern: &str) -> QueryResult<&CallableEntity> {
        let start_time = std::time::Instant::now();

        let results = exact_first(
            self.callables
                .iter()
                .filter(|callable| self.matches_pattern(&callable.name, pattern))
                .collect(),
            |callable| callable.name == pattern,
        );

        let len = results.len();
        QueryResult::new(results, len, start_time.elapsed().as_millis() as u64)
    }

    pub fn find_assets(&self, pattern: &str) -> QueryResult<&AssetEntity> {
        let start_time = std::time::Instant::now();

        let results = exact_first(
            self.assets
                .iter()
                .filter(|asset| self.matches_pattern(&asset.name, pattern))
                .collect(),
            |asset| asset.name == pattern,
        );

        let len = results.len();
        QueryResult::new(results, len, start_time.elapsed().as_millis() as u64)
    }

    /// Matches either the directory name or the friendly name.
    pub fn find_plugins(&self, pattern: &str) -> QueryResult<&PluginEntity> {
        let start_time = std::time::Instant::now();

        let results = exact_first(
            self.plugins
                .iter()
                .filter(|plugin| {
                    self.matches_pattern(&plugin.name, pattern)
                        || self.matches_pattern(&plugin.friendly_name, pattern)
                })
                .collect(),
            |plugin| plugin.name == pattern,
        );

        let len = results.len();
        QueryResult::new(results, len, start_time.elapsed().as_millis() as u64)
    }

    /// Direct children of `name`, in index order.
    pub fn find_derived(&self, name: &str) -> Vec<&DeclarationEntity> {
        self.children
            .get(name)
            .map(|indices| indices.iter().filter_map(|&i| self.declarations.get(i)).collect())
            .unwrap_or_default()
    }

    pub fn callables_by_owner(&self, owner: &str) -> Vec<&CallableEntity> {
        self.callables_by_owner
            .get(owner)
            .map(|indices| indices.iter().filter_map(|&i| self.callables.get(i)).collect())
            .unwrap_or_default()
    }

    pub fn assets_by_type(&self, asset_type: AssetType) -> Vec<&AssetEntity> {
        self.assets
            .iter()
            .filter(|asset| asset.asset_type == asset_type)
            .collect()
    }

    /// Chain from `name` up through indexed parents.
    ///
    /// Starts at `name` itself, stops at the first parent that is not
    /// indexed, and never visits a declaration twice, so cycles terminate.
    /// An unknown name yields an empty chain.
    pub fn resolve_hierarchy(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let limit = self.declarations.len();

        let mut current = self.get_declaration(name);
        while let Some(decl) = current {
            if chain.len() >= limit || !visited.insert(decl.name.as_str()) {
                break;
            }
            chain.push(decl.name.clone());
            current = decl.parent.as_deref().and_then(|parent| self.get_declaration(parent));
        }
        chain
    }

    pub fn find_usage_edges(&self, name: &str) -> Vec<&UsageEdge> {
        if name.is_empty() {
            return Vec::new();
        }
        self.usage_edges.iter().filter(|edge| edge.matches(name)).collect()
    }

    /// Distinct files that inherit from `name` or mention it in a callable
    /// signature. Textual, so it can over-report.
    pub fn find_usages(&self, name: &str) -> Vec<PathBuf> {
        self.find_usage_edges(name)
            .into_iter()
            .map(|edge| edge.file.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Fuzzy search across every entity name, best score first.
    pub fn fuzzy_search(&self, query: &str, limit: Option<usize>) -> Vec<FuzzyMatch> {
        let matcher = SkimMatcherV2::default();
        let names = self
            .declarations
            .iter()
            .map(|d| (EntityKind::Declaration, d.name.clone()))
            .chain(self.callables.iter().map(|c| (EntityKind::Callable, c.qualified_name())))
            .chain(self.assets.iter().map(|a| (EntityKind::Asset, a.name.clone())))
            .chain(self.plugins.iter().map(|p| (EntityKind::Plugin, p.name.clone())));

        let mut results: Vec<FuzzyMatch> = names
            .filter_map(|(kind, name)| {
                matcher
                    .fuzzy_match(&name, query)
                    .map(|score| FuzzyMatch { kind, name, score })
            })
            .collect();

        results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.name.cmp(&b.name)));
        if let Some(limit) = limit {
            results.truncate(limit);
        }
        results
    }

    pub fn statistics(&self) -> IndexStatistics {
        let mut declarations_by_kind: BTreeMap<DeclarationKind, usize> = [
            DeclarationKind::Class,
            DeclarationKind::Struct,
            DeclarationKind::Enum,
            DeclarationKind::Interface,
        ]
        .into_iter()
        .map(|kind| (kind, 0))
        .collect();
        for decl in &self.declarations {
            *declarations_by_kind.entry(decl.kind).or_insert(0) += 1;
        }

        let mut assets_by_type: BTreeMap<AssetType, usize> = BTreeMap::new();
        for asset in &self.assets {
            *assets_by_type.entry(asset.asset_type).or_insert(0) += 1;
        }

        let mut plugin_categories: BTreeMap<String, usize> = BTreeMap::new();
        for plugin in &self.plugins {
            *plugin_categories.entry(plugin.category.clone()).or_insert(0) += 1;
        }

        let plugin_modules: Vec<&ModuleRef> =
            self.plugins.iter().flat_map(|p| p.modules.iter()).collect();
        let mut module_types: BTreeMap<String, usize> = BTreeMap::new();
        for module in self.project.modules.iter().chain(plugin_modules.iter().copied()) {
            *module_types.entry(module.module_type.clone()).or_insert(0) += 1;
        }

        IndexStatistics {
            project_name: self.project.name.clone(),
            engine_association: self.project.engine_association.clone(),
            modules: self.project.modules.len(),
            plugin_modules: plugin_modules.len(),
            module_types,
            build_configurations: self.project.build_configurations.len(),
            declarations: self.declarations.len(),
            declarations_by_kind,
            blueprint_exposed: self.declarations.iter().filter(|d| d.is_blueprint_exposed).count(),
            callables: self.callables.len(),
            blueprint_callables: self.callables.iter().filter(|c| c.is_blueprint_callable).count(),
            assets: self.assets.len(),
            assets_by_type,
            asset_bytes: self.assets.iter().map(|a| a.size).sum(),
            plugins: self.plugins.len(),
            enabled_plugins: self.plugins.iter().filter(|p| p.enabled).count(),
            plugin_categories,
            files_scanned: self.metadata.files_scanned,
            collisions: self.metadata.collisions,
            diagnostics: self.metadata.diagnostics.clone(),
            scanned_at: self.metadata.scanned_at,
        }
    }

    fn matches_pattern(&self, text: &str, pattern: &str) -> bool {
        if text == pattern {
            return true;
        }

        if text.to_lowercase() == pattern.to_lowercase() {
            return true;
        }

        // Only treat the pattern as a regex when it looks like one.
        if pattern.contains(['*', '^', '$', '[', ']', '(', ')', '{', '}', '|', '+', '?', '\\']) {
            if let Ok(regex) = Regex::new(pattern) {
                return regex.is_match(text);
            }
        }

        text.to_lowercase().contains(&pattern.to_lowercase())
    }
}
