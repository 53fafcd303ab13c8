use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::write_default_config;
use crate::error::ScrapeError;
use crate::store::{count_entries, ensure_list_file};

pub const CONFIG_FILENAME: &str = "abbrevscrape.toml";
pub const ADD_LIST_FILENAME: &str = "add.txt";
pub const REMOVE_LIST_FILENAME: &str = "remove.txt";
pub const SNAPSHOT_FILENAME: &str = "wiktionary.txt";
pub const OUTPUT_FILENAME: &str = "abbreviations.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Env,
    Heuristic,
    Default,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flag => "flag",
            Self::Env => "env",
            Self::Heuristic => "heuristic",
            Self::Default => "default",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ResolutionContext {
    pub cwd: PathBuf,
}

impl ResolutionContext {
    pub fn from_process() -> Result<Self> {
        let cwd = env::current_dir().context("failed to read current directory")?;
        Ok(Self { cwd })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedPaths {
    pub project_root: PathBuf,
    pub config_path: PathBuf,
    /// User allow-list.
    pub add_path: PathBuf,
    /// User deny-list.
    pub remove_path: PathBuf,
    /// Filtered scrape, written before overrides are applied.
    pub snapshot_path: PathBuf,
    /// Final merged list read by the sentence splitter.
    pub output_path: PathBuf,
    pub root_source: ValueSource,
    pub config_source: ValueSource,
}

impl ResolvedPaths {
    /// Lay the standard file names out under `project_root`.
    pub fn under(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            config_path: project_root.join(CONFIG_FILENAME),
            add_path: project_root.join(ADD_LIST_FILENAME),
            remove_path: project_root.join(REMOVE_LIST_FILENAME),
            snapshot_path: project_root.join(SNAPSHOT_FILENAME),
            output_path: project_root.join(OUTPUT_FILENAME),
            root_source: ValueSource::Default,
            config_source: ValueSource::Default,
        }
    }

    pub fn diagnostics(&self) -> String {
        format!(
            "project_root={} ({})\nconfig_path={} ({})\nadd_list={}\nremove_list={}\nsnapshot={}\noutput={}",
            normalize_for_display(&self.project_root),
            self.root_source.as_str(),
            normalize_for_display(&self.config_path),
            self.config_source.as_str(),
            normalize_for_display(&self.add_path),
            normalize_for_display(&self.remove_path),
            normalize_for_display(&self.snapshot_path),
            normalize_for_display(&self.output_path),
        )
    }
}

/// Presence and size of every file the tool reads or writes.
#[derive(Debug, Clone)]
pub struct RuntimeStatus {
    pub config_exists: bool,
    pub add_entries: Option<usize>,
    pub remove_entries: Option<usize>,
    pub snapshot_entries: Option<usize>,
    pub output_entries: Option<usize>,
    pub warnings: Vec<String>,
}

pub fn inspect_runtime(paths: &ResolvedPaths) -> Result<RuntimeStatus, ScrapeError> {
    let add_entries = count_entries(&paths.add_path)?;
    let remove_entries = count_entries(&paths.remove_path)?;
    let snapshot_entries = count_entries(&paths.snapshot_path)?;
    let output_entries = count_entries(&paths.output_path)?;

    let mut warnings = Vec::new();
    if add_entries.is_none() || remove_entries.is_none() {
        warnings.push(format!(
            "{ADD_LIST_FILENAME} and {REMOVE_LIST_FILENAME} are required for `update`; run `abbrevscrape init`"
        ));
    }
    if snapshot_entries.is_none() {
        warnings.push(format!(
            "{SNAPSHOT_FILENAME} is missing; `rebuild` needs a previous `update`"
        ));
    }

    Ok(RuntimeStatus {
        config_exists: paths.config_path.exists(),
        add_entries,
        remove_entries,
        snapshot_entries,
        output_entries,
        warnings,
    })
}

#[derive(Debug, Clone, Default)]
pub struct InitReport {
    pub wrote_config: bool,
    pub created_lists: Vec<PathBuf>,
}

/// Write the default config and create empty override lists.
///
/// Existing override lists are never touched; `force` only rewrites the config.
pub fn init_layout(paths: &ResolvedPaths, force: bool) -> Result<InitReport> {
    let wrote_config = write_default_config(&paths.config_path, force)?;
    let mut created_lists = Vec::new();
    for list in [&paths.add_path, &paths.remove_path] {
        if ensure_list_file(list)? {
            created_lists.push(list.clone());
        }
    }
    Ok(InitReport {
        wrote_config,
        created_lists,
    })
}

pub fn resolve_paths(
    context: &ResolutionContext,
    overrides: &PathOverrides,
) -> Result<ResolvedPaths> {
    resolve_paths_with_lookup(context, overrides, |key| env::var(key).ok())
}

fn resolve_paths_with_lookup<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: F,
) -> Result<ResolvedPaths>
where
    F: Fn(&str) -> Option<String>,
{
    let (project_root, root_source) = resolve_project_root(context, overrides, &lookup_env);

    let (config_path, config_source) = if let Some(path) = overrides.config.as_deref() {
        (absolutize(path, &project_root), ValueSource::Flag)
    } else if let Some(value) = non_empty(lookup_env("ABBREVSCRAPE_CONFIG")) {
        (absolutize(Path::new(&value), &project_root), ValueSource::Env)
    } else {
        (project_root.join(CONFIG_FILENAME), ValueSource::Default)
    };

    Ok(ResolvedPaths {
        config_path,
        root_source,
        config_source,
        ..ResolvedPaths::under(&project_root)
    })
}

fn resolve_project_root<F>(
    context: &ResolutionContext,
    overrides: &PathOverrides,
    lookup_env: &F,
) -> (PathBuf, ValueSource)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = overrides.project_root.as_deref() {
        return (absolutize(path, &context.cwd), ValueSource::Flag);
    }

    if let Some(value) = non_empty(lookup_env("ABBREVSCRAPE_PROJECT_ROOT")) {
        return (absolutize(Path::new(&value), &context.cwd), ValueSource::Env);
    }

    match detect_project_root(&context.cwd) {
        Some(root) => (root, ValueSource::Heuristic),
        None => (context.cwd.clone(), ValueSource::Default),
    }
}

// Nearest ancestor (cwd included) that already holds a config file.
fn detect_project_root(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|candidate| candidate.join(CONFIG_FILENAME).exists())
        .map(Path::to_path_buf)
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn normalize_for_display(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;

    use tempfile::tempdir;

    use super::{
        CONFIG_FILENAME, PathOverrides, ResolutionContext, ValueSource, init_layout,
        inspect_runtime, resolve_paths_with_lookup,
    };

    #[test]
    fn resolve_paths_prefers_flag_over_env() {
        let temp = tempdir().expect("tempdir");
        let cwd = temp.path().join("cwd");
        let from_flag = temp.path().join("flag-root");
        fs::create_dir_all(&cwd).expect("create cwd");

        let overrides = PathOverrides {
            project_root: Some(from_flag.clone()),
            ..PathOverrides::default()
        };
        let context = ResolutionContext { cwd: cwd.clone() };

        let env = HashMap::from([(
            "ABBREVSCRAPE_PROJECT_ROOT".to_string(),
            temp.path().join("env-root").to_string_lossy().to_string(),
        )]);

        let resolved = resolve_paths_with_lookup(&context, &overrides, |key| env.get(key).cloned())
            .expect("resolve paths");
        assert_eq!(resolved.project_root, from_flag);
        assert_eq!(resolved.root_source, ValueSource::Flag);
        assert_eq!(resolved.output_path, from_flag.join("abbreviations.txt"));
        assert_eq!(resolved.config_source, ValueSource::Default);
    }

    #[test]
    fn resolve_paths_uses_env_then_heuristic() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("project");
        let nested = root.join("sub").join("dir");
        fs::create_dir_all(&nested).expect("create nested");
        fs::write(root.join(CONFIG_FILENAME), "").expect("write config");

        let context = ResolutionContext { cwd: nested.clone() };
        let env = HashMap::from([(
            "ABBREVSCRAPE_CONFIG".to_string(),
            "alt.toml".to_string(),
        )]);
        let resolved = resolve_paths_with_lookup(&context, &PathOverrides::default(), |key| {
            env.get(key).cloned()
        })
        .expect("resolve paths");
        assert_eq!(resolved.project_root, root);
        assert_eq!(resolved.root_source, ValueSource::Heuristic);
        assert_eq!(resolved.config_path, root.join("alt.toml"));
        assert_eq!(resolved.config_source, ValueSource::Env);

        let bare = temp.path().join("bare");
        fs::create_dir_all(&bare).expect("create bare");
        let context = ResolutionContext { cwd: bare.clone() };
        let resolved =
            resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None).expect("resolve");
        assert_eq!(resolved.project_root, bare);
        assert_eq!(resolved.root_source, ValueSource::Default);
    }

    #[test]
    fn init_layout_creates_config_and_lists_once() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("project");
        fs::create_dir_all(&root).expect("create root");
        let context = ResolutionContext { cwd: root.clone() };
        let paths = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve");

        let report = init_layout(&paths, false).expect("init");
        assert!(report.wrote_config);
        assert_eq!(report.created_lists.len(), 2);
        assert!(paths.config_path.exists());
        assert!(paths.add_path.exists());
        assert!(paths.remove_path.exists());

        fs::write(&paths.add_path, "etc.\n").expect("edit add list");
        let report = init_layout(&paths, true).expect("re-init");
        assert!(report.wrote_config);
        assert!(report.created_lists.is_empty());
        assert_eq!(fs::read_to_string(&paths.add_path).expect("read"), "etc.\n");
    }

    #[test]
    fn inspect_runtime_reports_missing_lists() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("project");
        fs::create_dir_all(&root).expect("create root");
        let context = ResolutionContext { cwd: root.clone() };
        let paths = resolve_paths_with_lookup(&context, &PathOverrides::default(), |_| None)
            .expect("resolve");

        let status = inspect_runtime(&paths).expect("inspect");
        assert!(!status.config_exists);
        assert_eq!(status.add_entries, None);
        assert_eq!(status.warnings.len(), 2);

        init_layout(&paths, false).expect("init");
        fs::write(&paths.snapshot_path, "a.\nb.\n").expect("write snapshot");
        let status = inspect_runtime(&paths).expect("inspect");
        assert!(status.config_exists);
        assert_eq!(status.add_entries, Some(0));
        assert_eq!(status.snapshot_entries, Some(2));
        assert_eq!(status.output_entries, None);
        assert!(status.warnings.is_empty());
    }
}
