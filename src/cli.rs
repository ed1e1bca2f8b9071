use anyhow::{Context, Result};
use colored::Colorize;
use serde_json::json;
use std::time::Instant;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use tracing::info;

use crate::{
    cli_types::{
        ConfigArgs, HierarchyArgs, OutputFormat, ProjectArgs, ScanArgs, SearchArgs, SearchType,
        StatsArgs, UsagesArgs,
    },
    config::IndexConfig,
    indexer::{ScanResult, UeIndex},
    storage::IndexStatistics,
};

/// Terminal printing helpers.
#[derive(Debug, Clone, Copy)]
pub struct Ui;

impl Ui {
    pub fn new(colors: bool) -> Self {
        if !colors {
            colored::control::set_override(false);
        }
        Ui
    }

    pub fn print_header(&self, title: &str) {
        println!("{}", title.bold().cyan());
        println!("{}", "─".repeat(title.chars().count()).dimmed());
    }

    pub fn print_success(&self, message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    pub fn print_info(&self, message: &str) {
        println!("{}", message);
    }

    pub fn print_warning(&self, message: &str) {
        eprintln!("{} {}", "warning:".yellow().bold(), message);
    }

    pub fn print_error(&self, message: &str) {
        eprintln!("{} {}", "error:".red().bold(), message);
    }
}

#[derive(Tabled)]
struct SearchRow {
    kind: String,
    name: String,
    detail: String,
    location: String,
}

#[derive(Tabled)]
struct StatRow {
    metric: String,
    value: String,
}

fn stat(metric: &str, value: impl ToString) -> StatRow {
    StatRow {
        metric: metric.to_string(),
        value: value.to_string(),
    }
}

/// Rows for the statistics table, in display order.
fn statistics_rows(stats: &IndexStatistics) -> Vec<StatRow> {
    let mut rows = vec![
        stat("Project", &stats.project_name),
        stat("Engine", &stats.engine_association),
        stat("Modules", stats.modules),
        stat("Plugin modules", stats.plugin_modules),
        stat("Build configurations", stats.build_configurations),
        stat("Files scanned", stats.files_scanned),
        stat("Declarations", stats.declarations),
    ];
    for (kind, count) in &stats.declarations_by_kind {
        rows.push(stat(&format!("  {}", kind), count));
    }
    rows.push(stat("Blueprint exposed", stats.blueprint_exposed));
    rows.push(stat("Callables", stats.callables));
    rows.push(stat("Blueprint callable", stats.blueprint_callables));
    rows.push(stat("Assets", stats.assets));
    for (asset_type, count) in &stats.assets_by_type {
        rows.push(stat(&format!("  {}", asset_type), count));
    }
    rows.push(stat("Asset bytes", stats.asset_bytes));
    rows.push(stat(
        "Plugins (enabled)",
        format!("{} ({})", stats.plugins, stats.enabled_plugins),
    ));
    for (category, count) in &stats.plugin_categories {
        rows.push(stat(&format!("  {}", category), count));
    }
    for (module_type, count) in &stats.module_types {
        rows.push(stat(&format!("Module type {}", module_type), count));
    }
    rows.push(stat("Merge collisions", stats.collisions.total()));
    rows.push(stat("Skipped items", stats.diagnostics.total()));
    rows
}

pub fn render_statistics(stats: &IndexStatistics) -> String {
    Table::new(statistics_rows(stats)).with(Style::psql()).to_string()
}

pub struct CliApp {
    config: IndexConfig,
    format: OutputFormat,
    verbose: bool,
    ui: Ui,
}

impl CliApp {
    pub fn new(config: IndexConfig, format: OutputFormat, verbose: bool, colors_enabled: bool) -> Self {
        Self {
            config,
            format,
            verbose,
            ui: Ui::new(colors_enabled),
        }
    }

    fn open_index(&self, args: &ProjectArgs) -> Result<(UeIndex, ScanResult)> {
        let mut config = self.config.clone();
        config.scanning.exclude_patterns.extend(args.exclude.iter().cloned());
        if args.sequential {
            config.scanning.parallel = false;
        }
        if args.no_plugin_modules {
            config.source.include_plugin_modules = false;
        }

        let mut index = UeIndex::builder()
            .with_config(config)
            .build()
            .context("Failed to configure indexer")?;
        let result = index
            .scan(&args.path)
            .with_context(|| format!("Failed to scan {}", args.path.display()))?;
        Ok((index, result))
    }

    fn print_json(&self, value: &impl serde::Serialize) -> Result<()> {
        let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
        println!("{}", text);
        Ok(())
    }

    pub fn scan(&self, args: ScanArgs) -> Result<()> {
        let start_time = Instant::now();
        let (_, result) = self.open_index(&args.project)?;

        if self.format == OutputFormat::Json {
            return self.print_json(&result);
        }

        self.ui.print_header("Project Scan");
        self.ui.print_success(&format!(
            "Indexed {} in {}ms",
            result.project_name.bold(),
            result.duration_ms
        ));
        self.ui.print_info(&format!(
            "  {} modules, {} files",
            result.modules_scanned, result.files_scanned
        ));
        self.ui.print_info(&format!(
            "  {} declarations, {} callables",
            result.declarations_found, result.callables_found
        ));
        self.ui.print_info(&format!(
            "  {} assets, {} plugins",
            result.assets_found, result.plugins_found
        ));

        if result.collisions.total() > 0 {
            self.ui.print_warning(&format!(
                "{} duplicate names replaced by later definitions",
                result.collisions.total()
            ));
        }
        if result.diagnostics.total() > 0 {
            self.ui.print_warning(&format!(
                "{} items skipped ({} unreadable dirs, {} unreadable files, {} unparseable files, {} invalid plugins)",
                result.diagnostics.total(),
                result.diagnostics.unreadable_directories,
                result.diagnostics.unreadable_files,
                result.diagnostics.unparseable_files,
                result.diagnostics.invalid_plugin_manifests
            ));
        }
        if self.verbose {
            self.ui.print_info(&format!("Total time {:?}", start_time.elapsed()));
        }
        Ok(())
    }

    pub fn search(&self, args: SearchArgs) -> Result<()> {
        let (index, _) = self.open_index(&args.project)?;
        info!("Searching for '{}' ({:?})", args.query, args.r#type);

        if args.fuzzy {
            let matches = index.fuzzy_search(&args.query, Some(args.limit))?;
            if self.format == OutputFormat::Json {
                return self.print_json(&matches);
            }
            self.ui.print_header(&format!("Fuzzy matches for '{}'", args.query));
            let rows: Vec<SearchRow> = matches
                .iter()
                .map(|m| SearchRow {
                    kind: m.kind.to_string(),
                    name: m.name.clone(),
                    detail: format!("score {}", m.score),
                    location: String::new(),
                })
                .collect();
            return self.print_rows(rows);
        }

        let wants = |ty: SearchType| args.r#type == SearchType::All || args.r#type == ty;
        let mut rows = Vec::new();
        let mut output = serde_json::Map::new();

        if wants(SearchType::Declaration) {
            let found = index.find_declarations(&args.query)?.truncated(args.limit);
            output.insert("declarations".to_string(), json!(found.items));
            rows.extend(found.items.iter().map(|d| SearchRow {
                kind: d.kind.to_string().to_lowercase(),
                name: d.name.clone(),
                detail: d.parent.clone().map(|p| format!(": {}", p)).unwrap_or_default(),
                location: format!("{}:{}", d.file_path.display(), d.line),
            }));
        }
        if wants(SearchType::Callable) {
            let found = index.find_callables(&args.query)?.truncated(args.limit);
            output.insert("callables".to_string(), json!(found.items));
            rows.extend(found.items.iter().map(|c| SearchRow {
                kind: "callable".to_string(),
                name: c.qualified_name(),
                detail: format!(
                    "{} ({})",
                    c.return_type,
                    c.parameters
                        .iter()
                        .map(|p| format!("{} {}", p.param_type, p.name))
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
                location: format!("{}:{}", c.file_path.display(), c.line),
            }));
        }
        if wants(SearchType::Asset) {
            let found = index.find_assets(&args.query)?.truncated(args.limit);
            output.insert("assets".to_string(), json!(found.items));
            rows.extend(found.items.iter().map(|a| SearchRow {
                kind: "asset".to_string(),
                name: a.name.clone(),
                detail: format!("{} ({} bytes)", a.asset_type, a.size),
                location: a.path.clone(),
            }));
        }
        if wants(SearchType::Plugin) {
            let found = index.find_plugins(&args.query)?.truncated(args.limit);
            output.insert("plugins".to_string(), json!(found.items));
            rows.extend(found.items.iter().map(|p| SearchRow {
                kind: "plugin".to_string(),
                name: p.name.clone(),
                detail: format!(
                    "{} v{}{}",
                    p.category,
                    p.version_name,
                    if p.enabled { "" } else { " (disabled)" }
                ),
                location: p.path.display().to_string(),
            }));
        }

        if self.format == OutputFormat::Json {
            return self.print_json(&output);
        }
        self.ui.print_header(&format!("Results for '{}'", args.query));
        self.print_rows(rows)
    }

    fn print_rows(&self, rows: Vec<SearchRow>) -> Result<()> {
        if rows.is_empty() {
            self.ui.print_warning("No matches");
        } else {
            let count = rows.len();
            println!("{}", Table::new(rows).with(Style::psql()));
            self.ui.print_info(&format!("{} result(s)", count));
        }
        Ok(())
    }

    pub fn hierarchy(&self, args: HierarchyArgs) -> Result<()> {
        let (index, _) = self.open_index(&args.project)?;
        let chain = index.resolve_hierarchy(&args.name)?;
        let derived: Vec<String> = if args.derived {
            index
                .find_derived(&args.name)?
                .into_iter()
                .map(|d| d.name.clone())
                .collect()
        } else {
            Vec::new()
        };

        if self.format == OutputFormat::Json {
            return self.print_json(&json!({ "name": args.name, "chain": chain, "derived": derived }));
        }

        self.ui.print_header(&format!("Hierarchy of {}", args.name));
        if chain.is_empty() {
            self.ui.print_warning(&format!("'{}' is not an indexed declaration", args.name));
            return Ok(());
        }
        for (depth, name) in chain.iter().enumerate() {
            let label = if depth == 0 { name.bold().to_string() } else { name.clone() };
            println!("{}{}", "  ".repeat(depth), label);
        }
        // Report a parent that exists in text but not in the index.
        if let Some(external) = chain
            .last()
            .and_then(|last| index.get_declaration(last).ok().flatten())
            .and_then(|decl| decl.parent.clone())
            .filter(|parent| !chain.contains(parent))
        {
            println!("{}{} {}", "  ".repeat(chain.len()), external.dimmed(), "(external)".dimmed());
        }
        if args.derived {
            self.ui.print_info(&format!("Derived: {}", derived.join(", ")));
        }
        Ok(())
    }

    pub fn usages(&self, args: UsagesArgs) -> Result<()> {
        let (index, _) = self.open_index(&args.project)?;

        if args.edges {
            let edges = index.find_usage_edges(&args.name)?;
            if self.format == OutputFormat::Json {
                return self.print_json(&edges);
            }
            self.ui.print_header(&format!("References to {}", args.name));
            let rows: Vec<SearchRow> = edges
                .iter()
                .map(|e| SearchRow {
                    kind: format!("{:?}", e.kind).to_lowercase(),
                    name: e.referrer.clone(),
                    detail: e.token.clone(),
                    location: format!("{}:{}", e.file.display(), e.line),
                })
                .collect();
            return self.print_rows(rows);
        }

        let files = index.find_usages(&args.name)?;
        if self.format == OutputFormat::Json {
            return self.print_json(&files);
        }
        self.ui.print_header(&format!("Files referencing {}", args.name));
        if files.is_empty() {
            self.ui.print_warning("No usages found");
        }
        for file in &files {
            println!("  {}", file.display());
        }
        Ok(())
    }

    pub fn stats(&self, args: StatsArgs) -> Result<()> {
        let (index, _) = self.open_index(&args.project)?;
        let stats = index.get_stats()?;

        if self.format == OutputFormat::Json {
            return self.print_json(&stats);
        }
        self.ui.print_header("Statistics");
        println!("{}", render_statistics(&stats));
        let labels: Vec<String> = index
            .project()?
            .build_configurations
            .iter()
            .map(|config| config.label())
            .collect();
        self.ui.print_info(&format!("Build matrix: {}", labels.join(", ")));
        Ok(())
    }

    pub fn show_config(&self, args: ConfigArgs, path: Option<&std::path::Path>) -> Result<()> {
        if args.init {
            let target = path
                .map(|p| p.to_path_buf())
                .or_else(IndexConfig::default_path)
                .context("No configuration path available on this platform")?;
            self.config
                .save(&target)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            self.ui.print_success(&format!("Wrote {}", target.display()));
            return Ok(());
        }

        if self.format == OutputFormat::Json {
            return self.print_json(&self.config);
        }
        self.ui.print_header("Configuration");
        let text = toml::to_string_pretty(&self.config).context("Failed to serialize configuration")?;
        println!("{}", text);
        if let Some(default_path) = IndexConfig::default_path() {
            self.ui.print_info(&format!("Default path: {}", default_path.display()));
        }
        Ok(())
    }

    pub fn report_error(&self, error: &anyhow::Error) {
        self.ui.print_error(&format!("{:#}", error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn create_test_project(dir: &Path) {
        fs::write(dir.join("Cli.uproject"), r#"{"Modules": [{"Name": "Cli"}]}"#).unwrap();
        let source = dir.join("Source/Cli");
        fs::create_dir_all(&source).unwrap();
        fs::write(
            source.join("Thing.h"),
            "UCLASS()\nclass AThing : public AActor\n{\n};\nUCLASS()\nclass ASubThing : public AThing\n{\n};\n",
        )
        .unwrap();
    }

    fn project_args(path: &Path) -> ProjectArgs {
        ProjectArgs {
            path: path.to_path_buf(),
            exclude: Vec::new(),
            sequential: true,
            no_plugin_modules: false,
        }
    }

    fn create_test_app(format: OutputFormat) -> CliApp {
        CliApp::new(IndexConfig::default(), format, false, false)
    }

    #[test]
    fn test_scan_and_stats_commands() {
        let dir = TempDir::new().unwrap();
        create_test_project(dir.path());
        let app = create_test_app(OutputFormat::Text);

        assert!(app.scan(ScanArgs { project: project_args(dir.path()) }).is_ok());
        assert!(app.stats(StatsArgs { project: project_args(dir.path()) }).is_ok());
    }

    #[test]
    fn test_query_commands_json() {
        let dir = TempDir::new().unwrap();
        create_test_project(dir.path());
        let app = create_test_app(OutputFormat::Json);

        let search = SearchArgs {
            query: "Thing".to_string(),
            project: project_args(dir.path()),
            r#type: SearchType::All,
            limit: 10,
            fuzzy: false,
        };
        assert!(app.search(search).is_ok());

        let hierarchy = HierarchyArgs {
            name: "ASubThing".to_string(),
            project: project_args(dir.path()),
            derived: true,
        };
        assert!(app.hierarchy(hierarchy).is_ok());

        let usages = UsagesArgs {
            name: "AThing".to_string(),
            project: project_args(dir.path()),
            edges: true,
        };
        assert!(app.usages(usages).is_ok());
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let dir = TempDir::new().unwrap();
        let app = create_test_app(OutputFormat::Text);
        let err = app
            .scan(ScanArgs { project: project_args(dir.path()) })
            .unwrap_err();
        assert!(format!("{:#}", err).contains("No .uproject manifest"));
    }

    #[test]
    fn test_config_init_writes_file() {
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().join("ueindex.toml");
        let app = create_test_app(OutputFormat::Text);

        app.show_config(ConfigArgs { init: true }, Some(&path)).unwrap();
        let loaded = IndexConfig::load(Some(&path)).unwrap();
        assert_eq!(loaded, IndexConfig::default());
    }

    #[test]
    fn test_statistics_table() {
        let dir = TempDir::new().unwrap();
        create_test_project(dir.path());
        let mut index = UeIndex::builder().parallel(false).build().unwrap();
        index.scan(dir.path()).unwrap();

        let table = render_statistics(&index.get_stats().unwrap());
        assert!(table.contains("Declarations"));
        assert!(table.contains("Class"));
        assert!(table.contains("Cli"));
    }
}
