use std::path::PathBuf;
use std::time::Duration;

use catfetch_common::observability::LogConfig;
use catfetch_config::CatfetchConfig;
use catfetch_render::{ContentMatch, OutputFormat};
use clap::Parser;

use crate::page::Control;

pub const DEFAULT_CONFIG_FILE: &str = "catfetch.yaml";

/// Fetch a cat as JSON or XML and render what comes back.
#[derive(Debug, Parser)]
#[command(name = "catfetch", version, about)]
pub struct Cli {
    /// Config file (YAML/TOML/JSON). Defaults to ./catfetch.yaml when present.
    #[arg(short, long, env = "CATFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Server base URL, e.g. http://localhost:8080
    #[arg(long, env = "CATFETCH_BASE_URL")]
    pub base_url: Option<String>,

    /// Resource path both controls request.
    #[arg(long)]
    pub path: Option<String>,

    /// How to print the content region: text, html or json.
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Match Content-Type by essence (ignore parameters and case).
    #[arg(long)]
    pub essence: bool,

    /// Give up on a request after this many seconds.
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Wait for each cycle before firing the next control.
    #[arg(long)]
    pub sequential: bool,

    /// Mirror log events to stderr.
    #[arg(long)]
    pub log_stderr: bool,

    /// Controls to activate, in order: json, xml, getCatsJSON or getCatsXML.
    #[arg(required = true, value_name = "CONTROL")]
    pub controls: Vec<Control>,
}

/// Everything `main` needs once flags and config are merged.
#[derive(Debug)]
pub struct Settings {
    pub base_url: String,
    pub path: String,
    pub timeout: Option<Duration>,
    pub content_match: ContentMatch,
    pub output: OutputFormat,
    pub log: LogConfig,
}

impl Cli {
    /// Flags win over the loaded configuration.
    pub fn settings(&self, cfg: CatfetchConfig) -> Settings {
        let mut log = cfg.logging.to_log_config();
        log.emit_stderr |= self.log_stderr;

        Settings {
            base_url: self.base_url.clone().unwrap_or(cfg.endpoint.base_url.clone()),
            path: self.path.clone().unwrap_or(cfg.endpoint.path.clone()),
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .or_else(|| cfg.endpoint.timeout()),
            content_match: if self.essence {
                ContentMatch::Essence
            } else {
                cfg.render.content_match
            },
            output: self.format.unwrap_or(cfg.render.output),
            log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catfetch_config::CatfetchConfigLoader;

    fn config(yaml: &str) -> CatfetchConfig {
        CatfetchConfigLoader::new()
            .with_yaml_str(yaml)
            .load()
            .unwrap()
    }

    #[test]
    fn controls_are_required() {
        assert!(Cli::try_parse_from(["catfetch"]).is_err());
    }

    #[test]
    fn parses_mixed_controls() {
        let cli = Cli::try_parse_from(["catfetch", "json", "#getCatsXML", "xml"]).unwrap();
        assert_eq!(
            cli.controls,
            vec![Control::GetCatsJson, Control::GetCatsXml, Control::GetCatsXml]
        );
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "catfetch",
            "--base-url",
            "http://flag.test",
            "--format",
            "html",
            "--essence",
            "--timeout-secs",
            "4",
            "json",
        ])
        .unwrap();
        let s = cli.settings(config(
            "endpoint:\n  base_url: http://file.test\n  path: /felines\nrender:\n  output: json\n",
        ));

        assert_eq!(s.base_url, "http://flag.test");
        assert_eq!(s.path, "/felines");
        assert_eq!(s.output, OutputFormat::Html);
        assert_eq!(s.content_match, ContentMatch::Essence);
        assert_eq!(s.timeout, Some(Duration::from_secs(4)));
    }

    #[test]
    fn config_fills_gaps() {
        let cli = Cli::try_parse_from(["catfetch", "xml"]).unwrap();
        let s = cli.settings(config(
            "endpoint:\n  timeout_secs: 9\nrender:\n  content_match: essence\n",
        ));

        assert_eq!(s.base_url, "http://localhost:8080");
        assert_eq!(s.path, "/cats");
        assert_eq!(s.timeout, Some(Duration::from_secs(9)));
        assert_eq!(s.content_match, ContentMatch::Essence);
        assert_eq!(s.output, OutputFormat::Text);
        assert!(!s.log.emit_stderr);
    }
}
