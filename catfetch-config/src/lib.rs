//! Loader for catfetch configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, so later files win over
//! earlier ones, and `CATFETCH__`-prefixed environment variables (sections
//! separated by `__`, e.g. `CATFETCH__ENDPOINT__BASE_URL`) win over files.
//! After merging, `${VAR}` placeholders inside string values are expanded.
//!
//! ```yaml
//! version: "1"
//! endpoint:
//!   base_url: "http://localhost:8080"
//!   path: "/cats"
//! render:
//!   content_match: exact   # or `essence`
//!   output: html           # text | html | json
//! logging:
//!   format: text
//!   emit_stderr: false
//!   filter: "info,catfetch_http=debug"
//! ```
use catfetch_common::observability::{LogConfig, LogFormat};
use catfetch_render::{ContentMatch, OutputFormat};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "CATFETCH";

#[derive(Debug, Default, Deserialize)]
pub struct CatfetchConfig {
    /// Free-form label; unquoted numbers (`version: 1`) are kept as text.
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: Option<String>,
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where both controls send their requests.
#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_path")]
    pub path: String,
    /// Unset means requests may wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            path: default_path(),
            timeout_secs: None,
        }
    }
}

impl EndpointConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub content_match: ContentMatch,
    #[serde(default)]
    pub output: OutputFormat,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub emit_stderr: bool,
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            dir: None,
            emit_stderr: false,
            filter: default_filter(),
        }
    }
}

impl LoggingConfig {
    /// Map onto the observability initialiser's settings.
    ///
    /// ```
    /// use catfetch_config::LoggingConfig;
    ///
    /// let log = LoggingConfig::default().to_log_config();
    /// assert_eq!(log.app_name, "catfetch");
    /// assert_eq!(log.default_filter, "info");
    /// ```
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            log_dir: self.dir.clone(),
            emit_stderr: self.emit_stderr,
            format: self.format,
            default_filter: self.filter.clone(),
            ..LogConfig::default()
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}
fn default_path() -> String {
    "/cats".into()
}
fn default_filter() -> String {
    "info".into()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|v| match v {
        Scalar::Text(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (files + env overrides).
pub struct CatfetchConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
}

impl Default for CatfetchConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CatfetchConfigLoader {
    /// Start with no files; only defaults and `CATFETCH__` env overrides.
    ///
    /// ```
    /// use catfetch_config::CatfetchConfigLoader;
    ///
    /// let config = CatfetchConfigLoader::new()
    ///     .with_yaml_str("version: '1'")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.endpoint.path, "/cats");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            files: Vec::new(),
            inline: Vec::new(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is silently skipped when absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use catfetch_config::CatfetchConfigLoader;
    /// use catfetch_render::{ContentMatch, OutputFormat};
    ///
    /// let cfg = CatfetchConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// endpoint:
    ///   base_url: "http://cats.test"
    ///   timeout_secs: 3
    /// render:
    ///   content_match: essence
    ///   output: html
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.endpoint.base_url, "http://cats.test");
    /// assert_eq!(cfg.endpoint.timeout(), Some(std::time::Duration::from_secs(3)));
    /// assert_eq!(cfg.render.content_match, ContentMatch::Essence);
    /// assert_eq!(cfg.render.output, OutputFormat::Html);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// Files come first, then inline snippets, then the environment, and
    /// `${VAR}` placeholders are expanded last.
    ///
    /// ```
    /// use catfetch_config::CatfetchConfigLoader;
    ///
    /// unsafe { std::env::set_var("CAT_HOST", "cats.internal"); }
    ///
    /// let config = CatfetchConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// endpoint:
    ///   base_url: "http://${CAT_HOST}:9000"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.endpoint.base_url, "http://cats.internal:9000");
    ///
    /// unsafe { std::env::remove_var("CAT_HOST"); }
    /// ```
    pub fn load(self) -> Result<CatfetchConfig, ConfigError> {
        let mut builder = self.builder;
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, config::FileFormat::Yaml));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;

        // Convert to serde_json::Value first
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
