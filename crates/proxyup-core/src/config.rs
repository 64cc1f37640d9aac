use crate::error::{Result, UpdaterError};
use crate::git::CommitIdentity;
use crate::paths;
use crate::schedule::Schedule;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// ScheduleConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Seconds-resolution cron expression (`sec min hour dom month dow`).
    #[serde(default = "default_cron")]
    pub cron: String,
}

fn default_cron() -> String {
    "0 0 */4 * * *".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: default_cron(),
        }
    }
}

// ---------------------------------------------------------------------------
// RepositoryConfig
// ---------------------------------------------------------------------------

/// Where the working copy comes from and where it is pushed.
///
/// With no `url` the project root itself is the working copy. With a `url`
/// each run clones into a fresh temporary directory that is removed when the
/// run ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
}

// ---------------------------------------------------------------------------
// CommitConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    #[serde(default = "default_author_name")]
    pub author_name: String,
    #[serde(default = "default_author_email")]
    pub author_email: String,
    #[serde(default = "default_message")]
    pub message: String,
}

fn default_author_name() -> String {
    "GitHub Action".to_string()
}

fn default_author_email() -> String {
    "action@github.com".to_string()
}

fn default_message() -> String {
    "Update Sing-Box config".to_string()
}

impl CommitConfig {
    pub fn identity(&self) -> CommitIdentity {
        CommitIdentity {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            author_name: default_author_name(),
            author_email: default_author_email(),
            message: default_message(),
        }
    }
}

// ---------------------------------------------------------------------------
// ProvisionConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRequirement {
    pub program: String,
    /// Version specifier such as `3.x` or `3.11`; `x` and `*` are wildcards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<RuntimeRequirement>,
    /// Dependency-install commands, each an argv run in the working copy.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Vec<String>>,
}

// ---------------------------------------------------------------------------
// GeneratorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneratorConfig {
    /// In-process proxy fetch, probe, and sing-box rendering.
    Builtin(BuiltinSettings),
    /// External process that writes the artifact itself.
    Command { argv: Vec<String> },
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig::Builtin(BuiltinSettings::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltinSettings {
    #[serde(default = "default_subscriptions")]
    pub subscriptions: Vec<String>,
    #[serde(default = "default_max_per_protocol")]
    pub max_per_protocol: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_subscriptions() -> Vec<String> {
    [
        "https://raw.githubusercontent.com/mixool/hysteria/master/hysteria2.json",
        "https://raw.githubusercontent.com/mahdibland/V2RayAggregator/master/sub/shadowsocks2022.json",
        "https://raw.githubusercontent.com/Epodonios/v2ray-configs/main/vmess_configs.json",
        "https://raw.githubusercontent.com/soroushmirzaei/telegram-configs-collector/main/configs.json",
        "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/http.txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_per_protocol() -> usize {
    3
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_concurrency() -> usize {
    20
}

impl Default for BuiltinSettings {
    fn default() -> Self {
        Self {
            subscriptions: default_subscriptions(),
            max_per_protocol: default_max_per_protocol(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default = "default_artifact")]
    pub artifact: String,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub repository: RepositoryConfig,
    #[serde(default)]
    pub commit: CommitConfig,
    #[serde(default)]
    pub provision: ProvisionConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_version() -> u32 {
    1
}

fn default_artifact() -> String {
    paths::DEFAULT_ARTIFACT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            artifact: default_artifact(),
            schedule: ScheduleConfig::default(),
            repository: RepositoryConfig::default(),
            commit: CommitConfig::default(),
            provision: ProvisionConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Config {
    /// Load `.proxyup/config.yaml` under `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(UpdaterError::NotInitialized);
        }
        Self::load_from(&path)
    }

    /// Load from `root`, falling back to built-in defaults when the project
    /// has no config file.
    pub fn load_or_default(root: &Path) -> Result<Self> {
        match Self::load(root) {
            Err(UpdaterError::NotInitialized) => {
                tracing::debug!(root = %root.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UpdaterError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let error = |warnings: &mut Vec<ConfigWarning>, message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        if let Err(e) = paths::validate_artifact(&self.artifact) {
            error(&mut warnings, e.to_string());
        }

        if let Err(e) = Schedule::parse(&self.schedule.cron) {
            error(&mut warnings, e.to_string());
        }

        if self.commit.message.trim().is_empty() {
            error(&mut warnings, "commit.message is empty".to_string());
        }
        if self.commit.author_name.trim().is_empty() || self.commit.author_email.trim().is_empty()
        {
            error(&mut warnings, "commit author name and email must both be set".to_string());
        }

        if let Some(runtime) = &self.provision.runtime {
            if runtime.program.trim().is_empty() {
                error(&mut warnings, "provision.runtime.program is empty".to_string());
            }
        }
        for (i, step) in self.provision.steps.iter().enumerate() {
            if step.first().map(|p| p.trim().is_empty()).unwrap_or(true) {
                error(&mut warnings, format!("provision.steps[{i}] has an empty command"));
            }
        }

        match &self.generator {
            GeneratorConfig::Command { argv } => {
                if argv.first().map(|p| p.trim().is_empty()).unwrap_or(true) {
                    error(&mut warnings, "generator.argv is empty".to_string());
                }
            }
            GeneratorConfig::Builtin(settings) => {
                if settings.concurrency == 0 {
                    error(&mut warnings, "generator.concurrency must be at least 1".to_string());
                }
                if settings.timeout_secs == 0 {
                    error(&mut warnings, "generator.timeout_secs must be at least 1".to_string());
                }
                if settings.subscriptions.is_empty() {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: "generator.subscriptions is empty; every run will be a no-op"
                            .to_string(),
                    });
                }
                if settings.max_per_protocol == 0 {
                    warnings.push(ConfigWarning {
                        level: WarnLevel::Warning,
                        message: "generator.max_per_protocol is 0; no proxies will be selected"
                            .to_string(),
                    });
                }
                for url in &settings.subscriptions {
                    if !(url.starts_with("http://") || url.starts_with("https://")) {
                        warnings.push(ConfigWarning {
                            level: WarnLevel::Warning,
                            message: format!("subscription '{url}' is not an http(s) URL"),
                        });
                    }
                }
            }
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
