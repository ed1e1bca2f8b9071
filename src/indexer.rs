use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::delegate::{DelegateCapabilities, DelegateOutcome, DelegateSlot, LiveDelegate, LiveEntity, MutationReport};
use crate::error::{IndexError, Result, ScanDiagnostics};
use crate::scanner::{
    AssetCataloger, ManifestParser, ModuleClassification, PluginScanner, SourceClassifier, TreeWalker,
};
use crate::storage::{
    CollisionCounts, FuzzyMatch, IndexStatistics, ProjectMap, QueryResult, ScanArtifacts, UsageEdge,
};
use crate::types::{
    AssetEntity, AssetType, CallableEntity, DeclarationEntity, EntityKind, ModuleRef, PluginEntity,
    ProjectDescriptor,
};

/// Summary of one completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub project_name: String,
    pub modules_scanned: usize,
    pub files_scanned: usize,
    pub declarations_found: usize,
    pub callables_found: usize,
    pub assets_found: usize,
    pub plugins_found: usize,
    pub collisions: CollisionCounts,
    pub diagnostics: ScanDiagnostics,
    pub duration_ms: u64,
}

/// Builder for [`UeIndex`].
#[derive(Debug, Default)]
pub struct UeIndexBuilder {
    config: IndexConfig,
    delegate: DelegateSlot,
}

impl UeIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: IndexConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_delegate(mut self, delegate: Arc<dyn LiveDelegate>) -> Self {
        self.delegate = DelegateSlot::attach(delegate);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.config.scanning.parallel = parallel;
        self
    }

    pub fn exclude_patterns(mut self, patterns: Vec<String>) -> Self {
        self.config.scanning.exclude_patterns = patterns;
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.scanning.max_depth = Some(depth);
        self
    }

    pub fn follow_symlinks(mut self, follow: bool) -> Self {
        self.config.scanning.follow_symlinks = follow;
        self
    }

    pub fn source_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.source.extensions = extensions;
        self
    }

    pub fn asset_extensions(mut self, extensions: Vec<String>) -> Self {
        self.config.assets.extensions = extensions;
        self
    }

    pub fn include_plugin_modules(mut self, include: bool) -> Self {
        self.config.source.include_plugin_modules = include;
        self
    }

    /// Fails only when the configuration cannot be compiled (bad globs).
    pub fn build(self) -> Result<UeIndex> {
        let walker = TreeWalker::new(&self.config.scanning)?;
        let parallel = self.config.scanning.parallel;
        Ok(UeIndex {
            sources: SourceClassifier::new(walker.clone(), self.config.source.extensions.clone(), parallel),
            assets: AssetCataloger::new(walker, self.config.assets.extensions.clone(), parallel),
            config: self.config,
            delegate: self.delegate,
            map: None,
        })
    }
}

/// Static index over one project tree.
///
/// `scan` replaces the whole index; queries before the first successful
/// scan return [`IndexError::NotScanned`].
#[derive(Debug)]
pub struct UeIndex {
    config: IndexConfig,
    sources: SourceClassifier,
    assets: AssetCataloger,
    delegate: DelegateSlot,
    map: Option<ProjectMap>,
}

fn maybe_join<A, B, RA, RB>(parallel: bool, a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    if parallel {
        rayon::join(a, b)
    } else {
        (a(), b())
    }
}

impl UeIndex {
    pub fn builder() -> UeIndexBuilder {
        UeIndexBuilder::new()
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    pub fn is_scanned(&self) -> bool {
        self.map.is_some()
    }

    /// Scan the project rooted at `root` and replace the index.
    ///
    /// Only manifest problems fail the scan; on failure the previous index
    /// (if any) is left as it was.
    pub fn scan(&mut self, root: impl AsRef<Path>) -> Result<ScanResult> {
        let start_time = Instant::now();
        let root = root.as_ref();
        info!("Scanning project at {}", root.display());

        let project = ManifestParser::parse(root)?;
        let parallel = self.config.scanning.parallel;
        let include_plugin_modules = self.config.source.include_plugin_modules;

        let (catalog, (plugin_scan, modules)) = maybe_join(
            parallel,
            || self.assets.catalog(&project.content_root()),
            || {
                let plugin_scan = PluginScanner::scan(&project.plugins_root());
                let modules = {
                    let mut targets: Vec<&ModuleRef> = project.modules.iter().collect();
                    if include_plugin_modules {
                        targets.extend(plugin_scan.plugins.iter().flat_map(|p| p.modules.iter()));
                    }
                    self.classify_modules(&targets)
                };
                (plugin_scan, modules)
            },
        );
        info!(
            "Classified {} modules, cataloged {} assets, found {} plugins",
            modules.len(),
            catalog.assets.len(),
            plugin_scan.plugins.len()
        );

        let mut artifacts = ScanArtifacts::default();
        for module in modules {
            artifacts.files_scanned += module.files_scanned;
            artifacts.diagnostics.merge(&module.diagnostics);
            artifacts.declarations.extend(module.declarations);
            artifacts.callables.extend(module.callables);
        }
        artifacts.diagnostics.merge(&catalog.diagnostics);
        artifacts.diagnostics.merge(&plugin_scan.diagnostics);
        artifacts.assets = catalog.assets;
        artifacts.plugins = plugin_scan.plugins;

        let modules_scanned = project.modules.len()
            + if include_plugin_modules {
                artifacts.plugins.iter().map(|p| p.modules.len()).sum()
            } else {
                0
            };

        let map = ProjectMap::build(project, artifacts);
        let metadata = map.metadata();
        let result = ScanResult {
            project_name: map.project().name.clone(),
            modules_scanned,
            files_scanned: metadata.files_scanned,
            declarations_found: map.declarations().len(),
            callables_found: map.callables().len(),
            assets_found: map.assets().len(),
            plugins_found: map.plugins().len(),
            collisions: metadata.collisions,
            diagnostics: metadata.diagnostics.clone(),
            duration_ms: start_time.elapsed().as_millis() as u64,
        };

        if result.diagnostics.total() > 0 {
            debug!("Scan absorbed issues: {:?}", result.diagnostics);
        }
        info!(
            "Indexed {} declarations, {} callables in {}ms",
            result.declarations_found, result.callables_found, result.duration_ms
        );

        self.map = Some(map);
        Ok(result)
    }

    fn classify_modules(&self, targets: &[&ModuleRef]) -> Vec<ModuleClassification> {
        if self.config.scanning.parallel {
            targets
                .par_iter()
                .map(|module| self.sources.classify_module(module))
                .collect()
        } else {
            targets
                .iter()
                .map(|module| self.sources.classify_module(module))
                .collect()
        }
    }

    /// The index itself, for callers that need more than the wrappers below.
    pub fn map(&self) -> Result<&ProjectMap> {
        self.map.as_ref().ok_or(IndexError::NotScanned)
    }

    pub fn project(&self) -> Result<&ProjectDescriptor> {
        Ok(self.map()?.project())
    }

    pub fn get_declaration(&self, name: &str) -> Result<Option<&DeclarationEntity>> {
        Ok(self.map()?.get_declaration(name))
    }

    pub fn find_declarations(&self, pattern: &str) -> Result<QueryResult<&DeclarationEntity>> {
        Ok(self.map()?.find_declarations(pattern))
    }

    pub fn find_callables(&self, pattern: &str) -> Result<QueryResult<&CallableEntity>> {
        Ok(self.map()?.find_callables(pattern))
    }

    pub fn find_assets(&self, pattern: &str) -> Result<QueryResult<&AssetEntity>> {
        Ok(self.map()?.find_assets(pattern))
    }

    pub fn find_plugins(&self, pattern: &str) -> Result<QueryResult<&PluginEntity>> {
        Ok(self.map()?.find_plugins(pattern))
    }

    pub fn resolve_hierarchy(&self, name: &str) -> Result<Vec<String>> {
        Ok(self.map()?.resolve_hierarchy(name))
    }

    pub fn find_derived(&self, name: &str) -> Result<Vec<&DeclarationEntity>> {
        Ok(self.map()?.find_derived(name))
    }

    pub fn find_usages(&self, name: &str) -> Result<Vec<PathBuf>> {
        Ok(self.map()?.find_usages(name))
    }

    pub fn find_usage_edges(&self, name: &str) -> Result<Vec<&UsageEdge>> {
        Ok(self.map()?.find_usage_edges(name))
    }

    pub fn callables_by_owner(&self, owner: &str) -> Result<Vec<&CallableEntity>> {
        Ok(self.map()?.callables_by_owner(owner))
    }

    pub fn assets_by_type(&self, asset_type: AssetType) -> Result<Vec<&AssetEntity>> {
        Ok(self.map()?.assets_by_type(asset_type))
    }

    pub fn fuzzy_search(&self, query: &str, limit: Option<usize>) -> Result<Vec<FuzzyMatch>> {
        Ok(self.map()?.fuzzy_search(query, limit))
    }

    pub fn get_stats(&self) -> Result<IndexStatistics> {
        Ok(self.map()?.statistics())
    }

    pub fn delegate_capabilities(&self) -> DelegateCapabilities {
        self.delegate.capabilities()
    }

    /// Never blocks; `Unavailable` without a capable delegate.
    pub fn try_get_live_entity(&self, kind: EntityKind, name: &str) -> DelegateOutcome<LiveEntity> {
        self.delegate.get_live_entity(kind, name)
    }

    pub fn try_mutate_live_entity(
        &self,
        kind: EntityKind,
        name: &str,
        changes: &Value,
    ) -> DelegateOutcome<MutationReport> {
        self.delegate.mutate_live_entity(kind, name, changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_project(dir: &Path) {
        fs::write(
            dir.join("Demo.uproject"),
            r#"{"EngineAssociation": "5.3", "Modules": [{"Name": "Demo"}], "Plugins": [{"Name": "Tools", "Enabled": false}]}"#,
        )
        .unwrap();

        let source = dir.join("Source/Demo");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("Hero.h"),
            "UCLASS(Blueprintable)\nclass DEMO_API AHero : public ACharacter\n{\n    UFUNCTION(BlueprintCallable)\n    void Jump(float Height);\n};\n",
        )
        .unwrap();

        let plugin = dir.join("Plugins/Tools");
        fs::create_dir_all(plugin.join("Source/ToolsRuntime")).unwrap();
        fs::write(
            plugin.join("Tools.uplugin"),
            r#"{"Category": "Editor", "Modules": [{"Name": "ToolsRuntime", "Type": "Editor"}]}"#,
        )
        .unwrap();
        fs::write(
            plugin.join("Source/ToolsRuntime/Widget.h"),
            "USTRUCT()\nstruct FToolData\n{\n};\n",
        )
        .unwrap();
    }

    #[test]
    fn test_queries_before_scan() {
        let index = UeIndex::builder().build().unwrap();
        assert!(!index.is_scanned());
        assert!(matches!(index.get_stats(), Err(IndexError::NotScanned)));
        assert!(matches!(index.resolve_hierarchy("A"), Err(IndexError::NotScanned)));
        assert!(matches!(index.find_usages("A"), Err(IndexError::NotScanned)));
    }

    #[test]
    fn test_builder_rejects_bad_globs() {
        let result = UeIndex::builder().exclude_patterns(vec!["{".to_string()]).build();
        assert!(matches!(result, Err(IndexError::Config(_))));
    }

    #[test]
    fn test_scan_includes_plugin_modules() {
        let dir = TempDir::new().unwrap();
        create_test_project(dir.path());

        let mut index = UeIndex::builder().build().unwrap();
        let result = index.scan(dir.path()).unwrap();

        assert_eq!(result.project_name, "Demo");
        assert_eq!(result.modules_scanned, 2);
        assert_eq!(result.files_scanned, 2);
        assert_eq!(result.declarations_found, 2);
        assert_eq!(result.callables_found, 1);
        assert_eq!(result.plugins_found, 1);

        let tool_data = index.get_declaration("FToolData").unwrap().unwrap();
        assert_eq!(tool_data.module, "ToolsRuntime");

        let tools = index.find_plugins("Tools").unwrap();
        assert!(!tools.items[0].enabled);
        assert!(tools.items[0].modules[0].declarations.contains("FToolData"));

        let stats = index.get_stats().unwrap();
        assert_eq!(stats.plugin_modules, 1);
        assert_eq!(stats.module_types["Editor"], 1);
    }

    #[test]
    fn test_scan_without_plugin_modules_sequential() {
        let dir = TempDir::new().unwrap();
        create_test_project(dir.path());

        let mut index = UeIndex::builder()
            .parallel(false)
            .include_plugin_modules(false)
            .build()
            .unwrap();
        let result = index.scan(dir.path()).unwrap();

        assert_eq!(result.modules_scanned, 1);
        assert_eq!(result.declarations_found, 1);
        assert!(index.get_declaration("FToolData").unwrap().is_none());
        assert_eq!(
            index.callables_by_owner("AHero").unwrap()[0].qualified_name(),
            "AHero::Jump"
        );
    }

    #[test]
    fn test_failed_rescan_keeps_previous_index() {
        let dir = TempDir::new().unwrap();
        create_test_project(dir.path());

        let mut index = UeIndex::builder().build().unwrap();
        index.scan(dir.path()).unwrap();

        let empty = TempDir::new().unwrap();
        assert!(matches!(index.scan(empty.path()), Err(IndexError::ManifestNotFound(_))));
        assert!(index.is_scanned());
        assert!(index.get_declaration("AHero").unwrap().is_some());
    }

    #[test]
    fn test_delegate_unavailable_without_attachment() {
        let index = UeIndex::builder().build().unwrap();
        assert_eq!(index.delegate_capabilities(), DelegateCapabilities::default());
        assert_eq!(
            index.try_get_live_entity(EntityKind::Declaration, "AHero"),
            DelegateOutcome::Unavailable
        );
    }
}
