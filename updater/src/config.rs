//! The persisted `config.json` store.
//!
//! The file is a flat JSON object with upper-case keys. Keys the updater
//! does not know about are carried through a load/save cycle unchanged.

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io;

use crate::build_id::BuildId;
use crate::status::{EndpointError, ServerEndpoint};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// Updater settings and state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Installation root.
    #[serde(rename = "INSTANCE_PATH", default, skip_serializing_if = "Option::is_none")]
    pub instance_path: Option<String>,

    /// Status endpoint, `host[:port]`.
    #[serde(rename = "SERVER_HOSTNAME", default, skip_serializing_if = "Option::is_none")]
    pub server_hostname: Option<String>,

    /// Status endpoint used when no host name is set.
    #[serde(rename = "SERVER_IP", default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,

    /// Token for the GitHub Actions API.
    #[serde(rename = "GITHUB_TOKEN", default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,

    /// Extra mod references copied into every install.
    #[serde(rename = "ADDITIONAL_MODS", default)]
    pub additional_mods: Vec<String>,

    /// The build recorded as installed.
    #[serde(
        rename = "CURRENTLY_INSTALLED",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub currently_installed: Option<BuildId>,

    /// Keys the updater does not interpret, kept for the next save.
    #[serde(flatten)]
    pub(crate) extra: Map<String, Value>,
}

/// Errors raised while loading or saving the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("configuration file {path} not found")]
    NotFound {
        /// The expected file.
        path: Utf8PathBuf,
    },

    /// Reading the file failed.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        /// The file being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The file is not a valid configuration object.
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        /// The file being parsed.
        path: Utf8PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the configuration failed.
    #[error("failed to serialize configuration: {source}")]
    Serialize {
        /// Underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Writing the file failed.
    #[error("failed to write configuration file {path}: {source}")]
    Write {
        /// The file being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// `INSTANCE_PATH` is missing or blank.
    #[error("INSTANCE_PATH is not set in the configuration file")]
    MissingInstancePath,

    /// The configured server address is malformed.
    #[error("invalid {key} in configuration: {source}")]
    InvalidEndpoint {
        /// The key holding the address.
        key: &'static str,
        /// Why it was rejected.
        #[source]
        source: EndpointError,
    },
}

impl UpdaterConfig {
    /// Load the configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] when the file is absent, or a read
    /// or parse error.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: path.to_owned(),
                }
            } else {
                ConfigError::Read {
                    path: path.to_owned(),
                    source,
                }
            }
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Write the configuration to `path` as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns a serialization or write error.
    pub fn save(&self, path: &Utf8Path) -> Result<(), ConfigError> {
        let mut json = serde_json::to_string_pretty(self)
            .map_err(|source| ConfigError::Serialize { source })?;
        json.push('\n');
        std::fs::write(path, json).map_err(|source| ConfigError::Write {
            path: path.to_owned(),
            source,
        })
    }

    /// The configured installation root.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingInstancePath`] when unset or blank.
    pub fn instance_path(&self) -> Result<&str, ConfigError> {
        self.instance_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingInstancePath)
    }

    /// The status endpoint, preferring `SERVER_HOSTNAME` over `SERVER_IP`.
    ///
    /// Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEndpoint`] when the chosen value does
    /// not parse.
    pub fn server_endpoint(&self) -> Result<Option<ServerEndpoint>, ConfigError> {
        let chosen = [
            ("SERVER_HOSTNAME", self.server_hostname.as_deref()),
            ("SERVER_IP", self.server_ip.as_deref()),
        ]
        .into_iter()
        .find_map(|(key, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (key, v))
        });

        chosen
            .map(|(key, value)| {
                value
                    .parse()
                    .map_err(|source| ConfigError::InvalidEndpoint { key, source })
            })
            .transpose()
    }

    /// The GitHub token, if one is set and not blank.
    #[must_use]
    pub fn github_token(&self) -> Option<&str> {
        self.github_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::utf8_tempdir;
    use rstest::rstest;

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, root) = utf8_tempdir();
        let err = UpdaterConfig::load(&root.join("config.json")).expect_err("missing");
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let (_dir, root) = utf8_tempdir();
        let path = root.join("config.json");
        std::fs::write(&path, "{\"INSTANCE_PATH\": ").expect("write");
        assert!(matches!(
            UpdaterConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn zero_installed_build_is_rejected() {
        let (_dir, root) = utf8_tempdir();
        let path = root.join("config.json");
        std::fs::write(&path, r#"{"INSTANCE_PATH": "x", "CURRENTLY_INSTALLED": 0}"#)
            .expect("write");
        assert!(matches!(
            UpdaterConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn round_trip_preserves_unknown_keys() {
        let (_dir, root) = utf8_tempdir();
        let path = root.join("config.json");
        std::fs::write(
            &path,
            r#"{"INSTANCE_PATH": "/games/gtnh", "ADDITIONAL_MODS": ["a.jar"], "THEME": {"dark": true}}"#,
        )
        .expect("write");

        let mut config = UpdaterConfig::load(&path).expect("load");
        config.currently_installed = BuildId::new(482).ok();
        config.save(&path).expect("save");

        let saved: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        assert_eq!(saved["THEME"], serde_json::json!({"dark": true}));
        assert_eq!(saved["CURRENTLY_INSTALLED"], 482);
        assert_eq!(saved["ADDITIONAL_MODS"], serde_json::json!(["a.jar"]));
        assert!(saved.get("GITHUB_TOKEN").is_none());
    }

    #[rstest]
    #[case::hostname_wins(Some("host.example:25570"), Some("10.0.0.1"), Some(("host.example", 25570)))]
    #[case::ip_fallback(None, Some("10.0.0.1"), Some(("10.0.0.1", 25565)))]
    #[case::blank_hostname(Some("  "), Some("10.0.0.1"), Some(("10.0.0.1", 25565)))]
    #[case::none(None, None, None)]
    fn endpoint_selection(
        #[case] hostname: Option<&str>,
        #[case] ip: Option<&str>,
        #[case] expected: Option<(&str, u16)>,
    ) {
        let config = UpdaterConfig {
            server_hostname: hostname.map(str::to_owned),
            server_ip: ip.map(str::to_owned),
            ..UpdaterConfig::default()
        };

        let endpoint = config.server_endpoint().expect("valid endpoint");

        assert_eq!(
            endpoint.as_ref().map(|e| (e.host(), e.port())),
            expected
        );
    }

    #[test]
    fn bad_port_names_the_key() {
        let config = UpdaterConfig {
            server_ip: Some("10.0.0.1:port".to_owned()),
            ..UpdaterConfig::default()
        };

        let err = config.server_endpoint().expect_err("bad port");

        assert!(matches!(err, ConfigError::InvalidEndpoint { key: "SERVER_IP", .. }));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = UpdaterConfig {
            instance_path: Some(" ".to_owned()),
            github_token: Some(String::new()),
            ..UpdaterConfig::default()
        };

        assert!(matches!(config.instance_path(), Err(ConfigError::MissingInstancePath)));
        assert_eq!(config.github_token(), None);
    }
}
