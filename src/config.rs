use crate::extract::{LogKind, ToolFormat};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Top-level configuration loaded from partlog.toml.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PartlogConfig {
    pub pipeline: PipelineConfig,
    pub logs: Vec<LogSource>,
    pub tables: Vec<TableSource>,
    pub table_labels: TableLabelsConfig,
    pub pivots: Vec<PivotConfig>,
    pub phases: Vec<TableSource>,
    pub phase_labels: PhaseLabelsConfig,
    pub geomean: GeomeanConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Graphs to report, in order. Empty means every graph that joins.
    pub graphs: Vec<String>,
    /// Tool every speedup is relative to.
    pub baseline: String,
    pub output: PathBuf,
}

/// One raw tool log.
#[derive(Debug, Deserialize, Clone)]
pub struct LogSource {
    pub tool: String,
    pub kind: LogKind,
    pub path: PathBuf,
    /// Log grammar; defaults to the format named like `tool`.
    #[serde(default)]
    pub format: Option<ToolFormat>,
}

impl LogSource {
    pub fn resolved_format(&self) -> Option<ToolFormat> {
        self.format.or_else(|| ToolFormat::from_name(&self.tool))
    }
}

/// One pre-aggregated table, attributed to a tool.
#[derive(Debug, Deserialize, Clone)]
pub struct TableSource {
    pub tool: String,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TableLabelsConfig {
    pub labels: Vec<String>,
    /// Tool the tabulated speedups are relative to; reads 1.0 everywhere.
    pub unit_baseline: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PivotConfig {
    pub tool: String,
    pub value_column: String,
    pub sources: Vec<PivotSource>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PivotSource {
    pub parts: u32,
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct PhaseLabelsConfig {
    pub coarsen: String,
    pub initial: String,
    pub uncoarsen: String,
}

impl PhaseLabelsConfig {
    pub fn as_labels(&self) -> Vec<String> {
        vec![
            self.coarsen.clone(),
            self.initial.clone(),
            self.uncoarsen.clone(),
        ]
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeomeanConfig {
    /// Label of the pre-aggregated geometric-mean row.
    pub row_label: String,
    pub classes: Vec<ClassSource>,
    /// Glob of class tables; class names come from the file stem.
    pub pattern: Option<String>,
    pub strip_prefix: String,
    pub strip_suffix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClassSource {
    pub name: String,
    pub path: PathBuf,
}

// --- Default implementations ---

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            graphs: Vec::new(),
            baseline: "hunyuan".to_string(),
            output: PathBuf::from("partlog-report.json"),
        }
    }
}

impl Default for TableLabelsConfig {
    fn default() -> Self {
        Self {
            labels: ["8-part", "32-part", "128-part", "512-part"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            unit_baseline: None,
        }
    }
}

impl Default for PhaseLabelsConfig {
    fn default() -> Self {
        Self {
            coarsen: "Coarsen".to_string(),
            initial: "Initial".to_string(),
            uncoarsen: "Uncoarsen".to_string(),
        }
    }
}

impl Default for GeomeanConfig {
    fn default() -> Self {
        Self {
            row_label: "Geomean".to_string(),
            classes: Vec::new(),
            pattern: None,
            strip_prefix: String::new(),
            strip_suffix: String::new(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    /// A `[[logs]]` entry names a (tool, kind) pair no grammar covers.
    UnknownGrammar { tool: String, kind: LogKind },
    /// Two `[[logs]]` entries carry the same (tool, kind) series.
    DuplicateLog { tool: String, kind: LogKind },
    Glob(glob::PatternError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "parse error: {e}"),
            ConfigError::UnknownGrammar { tool, kind } => {
                write!(f, "no log grammar for tool {tool:?} with kind {}", kind.as_str())
            }
            ConfigError::DuplicateLog { tool, kind } => {
                write!(f, "more than one {} log for tool {tool:?}", kind.as_str())
            }
            ConfigError::Glob(e) => write!(f, "invalid class pattern: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Glob(e) => Some(e),
            ConfigError::UnknownGrammar { .. } | ConfigError::DuplicateLog { .. } => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        ConfigError::Parse(e)
    }
}

impl From<glob::PatternError> for ConfigError {
    fn from(e: glob::PatternError) -> Self {
        ConfigError::Glob(e)
    }
}

impl PartlogConfig {
    /// Parse a config from TOML text and check every log has a grammar.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: PartlogConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file. Relative input paths are resolved
    /// against the config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&text)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for log in &self.logs {
            let known = log
                .resolved_format()
                .and_then(|format| format.grammar(log.kind))
                .is_some();
            if !known {
                return Err(ConfigError::UnknownGrammar {
                    tool: log.tool.clone(),
                    kind: log.kind,
                });
            }
            if !seen.insert((log.tool.as_str(), log.kind)) {
                return Err(ConfigError::DuplicateLog {
                    tool: log.tool.clone(),
                    kind: log.kind,
                });
            }
        }
        if let Some(pattern) = &self.geomean.pattern {
            glob::Pattern::new(pattern)?;
        }
        Ok(())
    }

    fn rebase(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for log in &mut self.logs {
            join(&mut log.path);
        }
        for table in self.tables.iter_mut().chain(self.phases.iter_mut()) {
            join(&mut table.path);
        }
        for pivot in &mut self.pivots {
            for source in &mut pivot.sources {
                join(&mut source.path);
            }
        }
        for class in &mut self.geomean.classes {
            join(&mut class.path);
        }
        if let Some(pattern) = &mut self.geomean.pattern {
            if Path::new(pattern.as_str()).is_relative() {
                *pattern = base.join(pattern.as_str()).to_string_lossy().into_owned();
            }
        }
    }

    /// Explicit classes followed by those matched by the glob pattern.
    pub fn geomean_classes(&self) -> Result<Vec<ClassSource>, ConfigError> {
        let mut classes = self.geomean.classes.clone();
        let Some(pattern) = &self.geomean.pattern else {
            return Ok(classes);
        };
        let mut matched: Vec<PathBuf> = glob::glob(pattern)?.filter_map(Result::ok).collect();
        matched.sort();
        for path in matched {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let name = stem
                .strip_prefix(self.geomean.strip_prefix.as_str())
                .unwrap_or(&stem);
            let name = name
                .strip_suffix(self.geomean.strip_suffix.as_str())
                .unwrap_or(name)
                .to_string();
            classes.push(ClassSource { name, path });
        }
        Ok(classes)
    }
}
