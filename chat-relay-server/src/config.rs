//! Process configuration, resolved once from the environment at startup.
//!
//! Both config types can be built from an arbitrary lookup function so tests
//! never have to touch the real process environment.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::RelayError;

pub const AZURE_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4o";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_STATIC_DIR: &str = "dist";

/// Which upstream the relay talks to.
#[derive(Clone, PartialEq, Eq)]
pub enum ClientConfig {
    /// No credentials: serve the simulated stream.
    Mock,
    /// Hosted deployment reached through a deployment-scoped path.
    Azure {
        api_key: String,
        endpoint: String,
        deployment: String,
    },
    /// Default public API surface.
    OpenAi { api_key: String, model: String },
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let Some(api_key) = non_empty("AZURE_OPENAI_API_KEY").or_else(|| non_empty("OPENAI_API_KEY"))
        else {
            return Self::Mock;
        };

        match non_empty("AZURE_OPENAI_ENDPOINT") {
            Some(endpoint) => Self::Azure {
                api_key,
                endpoint: endpoint.trim_end_matches('/').to_string(),
                deployment: non_empty("AZURE_OPENAI_DEPLOYMENT_NAME")
                    .unwrap_or_else(|| DEFAULT_AZURE_DEPLOYMENT.to_string()),
            },
            None => Self::OpenAi {
                api_key,
                model: non_empty("OPENAI_MODEL_NAME")
                    .unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Azure { .. } => "azure",
            Self::OpenAi { .. } => "openai",
        }
    }
}

// Keys must never end up in logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mock => f.write_str("Mock"),
            Self::Azure {
                endpoint,
                deployment,
                ..
            } => f
                .debug_struct("Azure")
                .field("api_key", &"<redacted>")
                .field("endpoint", endpoint)
                .field("deployment", deployment)
                .finish(),
            Self::OpenAi { model, .. } => f
                .debug_struct("OpenAi")
                .field("api_key", &"<redacted>")
                .field("model", model)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| RelayError::Config(format!("invalid PORT {raw:?}: {e}")))?,
            None => DEFAULT_PORT,
        };
        let static_dir = lookup("STATIC_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));

        Ok(Self { port, static_dir })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn no_key_means_mock() {
        assert_eq!(ClientConfig::from_lookup(env(&[])), ClientConfig::Mock);
        assert_eq!(
            ClientConfig::from_lookup(env(&[("OPENAI_API_KEY", "  "), ("AZURE_OPENAI_ENDPOINT", "https://x")])),
            ClientConfig::Mock
        );
    }

    #[test]
    fn dedicated_key_wins_over_generic() {
        let config = ClientConfig::from_lookup(env(&[
            ("AZURE_OPENAI_API_KEY", "azure-key"),
            ("OPENAI_API_KEY", "generic-key"),
        ]));
        assert_eq!(
            config,
            ClientConfig::OpenAi {
                api_key: "azure-key".into(),
                model: DEFAULT_OPENAI_MODEL.into(),
            }
        );
    }

    #[test]
    fn endpoint_selects_azure_with_defaults() {
        let config = ClientConfig::from_lookup(env(&[
            ("OPENAI_API_KEY", "k"),
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com/"),
        ]));
        assert_eq!(
            config,
            ClientConfig::Azure {
                api_key: "k".into(),
                endpoint: "https://res.openai.azure.com".into(),
                deployment: DEFAULT_AZURE_DEPLOYMENT.into(),
            }
        );
        assert_eq!(config.mode(), "azure");
    }

    #[test]
    fn model_and_deployment_overrides() {
        let azure = ClientConfig::from_lookup(env(&[
            ("AZURE_OPENAI_API_KEY", "k"),
            ("AZURE_OPENAI_ENDPOINT", "https://e"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "chat-prod"),
        ]));
        assert!(matches!(azure, ClientConfig::Azure { ref deployment, .. } if deployment == "chat-prod"));

        let openai = ClientConfig::from_lookup(env(&[
            ("OPENAI_API_KEY", "k"),
            ("OPENAI_MODEL_NAME", "gpt-4.1"),
        ]));
        assert!(matches!(openai, ClientConfig::OpenAi { ref model, .. } if model == "gpt-4.1"));
    }

    #[test]
    fn debug_output_redacts_key() {
        let config = ClientConfig::from_lookup(env(&[("OPENAI_API_KEY", "sk-secret")]));
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn server_config_defaults_and_errors() {
        let config = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.static_dir, PathBuf::from(DEFAULT_STATIC_DIR));

        let config = ServerConfig::from_lookup(env(&[("PORT", "8080"), ("STATIC_DIR", "public")])).unwrap();
        assert_eq!(config.addr().port(), 8080);
        assert_eq!(config.static_dir, PathBuf::from("public"));

        assert!(matches!(
            ServerConfig::from_lookup(env(&[("PORT", "http")])),
            Err(RelayError::Config(_))
        ));
    }
}
