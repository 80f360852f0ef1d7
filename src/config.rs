use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::extract::SourceKind;

const CONFIG_BASENAME: &str = "mcp-registry";
const ENV_PREFIX: &str = "MCPREG";

/// A web registry to scrape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistrySource {
    pub name: String,
    pub url: String,
    pub kind: SourceKind,
}

impl RegistrySource {
    fn new(name: &str, url: &str, kind: SourceKind) -> Self {
        RegistrySource {
            name: name.to_string(),
            url: url.to_string(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one awesome-list checkout per subdirectory.
    pub directories_root: PathBuf,
    /// mcpdir checkout; its `data/pulsemcp-slugs.json` is the export.
    pub mcpdir_path: PathBuf,
    /// Where REGISTRY_INDEX.md and registry.json are written.
    pub output_dir: PathBuf,
    pub db_path: PathBuf,
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub registries: Vec<RegistrySource>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            directories_root: PathBuf::from("submodules/mcp-directories"),
            mcpdir_path: PathBuf::from("submodules/mcpdir"),
            output_dir: PathBuf::from("submodules/mcp-directories"),
            db_path: PathBuf::from("data/registry.sqlite"),
            user_agent: "Mozilla/5.0 (compatible; MCPDirectoryBot/1.0)".to_string(),
            request_timeout_secs: 30,
            fetch_concurrency: 4,
            registries: vec![
                RegistrySource::new("pulsemcp", "https://www.pulsemcp.com/servers", SourceKind::Html),
                RegistrySource::new("smithery", "https://smithery.ai/servers", SourceKind::Html),
                RegistrySource::new("glama", "https://glama.ai/mcp/servers", SourceKind::Html),
                RegistrySource::new(
                    "docker_hub",
                    "https://hub.docker.com/v2/search/repositories/?query=mcp&page_size=100",
                    SourceKind::DockerHub,
                ),
            ],
        }
    }
}

impl Settings {
    /// Layer an optional config file and `MCPREG_*` environment variables over
    /// the built-in defaults.
    ///
    /// Without an explicit path, `mcp-registry.{toml,json,yaml}` in the working
    /// directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Settings> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(CONFIG_BASENAME).required(false),
        };

        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Location of mcpdir's JSON export.
    pub fn mcpdir_export(&self) -> PathBuf {
        self.mcpdir_path.join("data").join("pulsemcp-slugs.json")
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_include_web_registries() {
        let s = Settings::default();
        assert_eq!(s.registries.len(), 4);
        assert!(s.registries.iter().any(|r| r.kind == SourceKind::DockerHub));
        assert_eq!(
            s.mcpdir_export(),
            PathBuf::from("submodules/mcpdir/data/pulsemcp-slugs.json")
        );
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
db_path = "/tmp/other.sqlite"
fetch_concurrency = 1

[[registries]]
name = "local"
url = "http://localhost:8080/servers"
kind = "html"
"#
        )
        .unwrap();

        let s = Settings::load(Some(file.path())).unwrap();
        assert_eq!(s.db_path, PathBuf::from("/tmp/other.sqlite"));
        assert_eq!(s.fetch_concurrency, 1);
        assert_eq!(s.request_timeout_secs, 30);
        assert_eq!(
            s.registries,
            vec![RegistrySource::new("local", "http://localhost:8080/servers", SourceKind::Html)]
        );
    }

    #[test]
    fn missing_explicit_file_is_error() {
        assert!(Settings::load(Some(Path::new("does/not/exist.toml"))).is_err());
    }
}
