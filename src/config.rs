//! Build-time constants and deployment settings.

use log::warn;
use std::env;
use std::path::PathBuf;

/// Model every chat request is run against.
pub const MODEL_ID: &str = "@cf/meta/llama-3.1-8b-instruct-fp8";

/// Injected at the front of a conversation that has no system message.
pub const SYSTEM_PROMPT: &str =
    "You are a helpful, friendly assistant. Provide concise and accurate responses.";

pub const MAX_TOKENS: u32 = 1024;

/// Name of the offline shell's cache bucket. Bumping it on deploy invalidates every older bucket.
pub const CACHE_NAME: &str = "llm-chat-app-v1";

/// URLs pre-cached when the offline shell installs.
pub const SHELL_ASSETS: &[&str] = &["/", "/chat.js", "/manifest.json"];

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_ASSETS_DIR: &str = "public";
pub const DEFAULT_WORKERS_AI_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
pub const DEFAULT_AI_GATEWAY_BASE_URL: &str = "https://gateway.ai.cloudflare.com/v1";

#[derive(Debug, Clone)]
pub struct Settings {
    pub bind_address: String,
    pub assets_dir: PathBuf,
}

/// Where and how the hosted inference endpoint is reached. Read by the inference client itself.
#[derive(Debug, Clone)]
pub struct InferenceSettings {
    pub base_url: String,
    pub account_id: Option<String>,
    pub api_token: Option<String>,
    pub gateway: Option<GatewayOptions>,
}

/// AI gateway routing. Disabled unless `AI_GATEWAY_ID` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayOptions {
    pub id: String,
    pub base_url: String,
    pub skip_cache: bool,
    pub cache_ttl: Option<u32>,
}

impl Settings {
    /// Reads settings from the process environment, loading `.env` first if present.
    pub fn from_env() -> Settings {
        dotenvy::dotenv().ok();
        Settings::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Settings {
        Settings {
            bind_address: lookup("BIND_ADDRESS").unwrap_or(DEFAULT_BIND_ADDRESS.to_owned()),
            assets_dir: lookup("ASSETS_DIR")
                .unwrap_or(DEFAULT_ASSETS_DIR.to_owned())
                .into(),
        }
    }
}

impl InferenceSettings {
    pub fn from_env() -> InferenceSettings {
        dotenvy::dotenv().ok();
        InferenceSettings::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> InferenceSettings {
        let gateway = lookup("AI_GATEWAY_ID")
            .filter(|id| !id.is_empty())
            .map(|id| GatewayOptions {
                id,
                base_url: lookup("AI_GATEWAY_BASE_URL")
                    .unwrap_or(DEFAULT_AI_GATEWAY_BASE_URL.to_owned()),
                skip_cache: lookup("AI_GATEWAY_SKIP_CACHE")
                    .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "yes"))
                    .unwrap_or(false),
                cache_ttl: lookup("AI_GATEWAY_CACHE_TTL").and_then(|v| match v.parse() {
                    Ok(ttl) => Some(ttl),
                    Err(_) => {
                        warn!("ignoring invalid AI_GATEWAY_CACHE_TTL {v:?}");
                        None
                    }
                }),
            });

        InferenceSettings {
            base_url: lookup("WORKERS_AI_BASE_URL")
                .unwrap_or(DEFAULT_WORKERS_AI_BASE_URL.to_owned()),
            account_id: lookup("CF_ACCOUNT_ID").filter(|v| !v.is_empty()),
            api_token: lookup("CF_API_TOKEN").filter(|v| !v.is_empty()),
            gateway,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let settings = Settings::from_lookup(lookup_from(&[]));

        assert_eq!(settings.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(settings.assets_dir, PathBuf::from(DEFAULT_ASSETS_DIR));

        let inference = InferenceSettings::from_lookup(lookup_from(&[]));
        assert_eq!(inference.base_url, DEFAULT_WORKERS_AI_BASE_URL);
        assert!(inference.account_id.is_none());
        assert!(inference.api_token.is_none());
        assert!(inference.gateway.is_none());
    }

    #[test]
    fn test_gateway_disabled_by_empty_id() {
        let settings = InferenceSettings::from_lookup(lookup_from(&[("AI_GATEWAY_ID", "")]));
        assert!(settings.gateway.is_none());
    }

    #[test]
    fn test_gateway_options_parsed() {
        let settings = InferenceSettings::from_lookup(lookup_from(&[
            ("CF_ACCOUNT_ID", "acc"),
            ("CF_API_TOKEN", "token"),
            ("AI_GATEWAY_ID", "chat-gw"),
            ("AI_GATEWAY_SKIP_CACHE", "true"),
            ("AI_GATEWAY_CACHE_TTL", "3600"),
        ]));

        assert_eq!(settings.account_id.as_deref(), Some("acc"));
        assert_eq!(
            settings.gateway,
            Some(GatewayOptions {
                id: "chat-gw".to_owned(),
                base_url: DEFAULT_AI_GATEWAY_BASE_URL.to_owned(),
                skip_cache: true,
                cache_ttl: Some(3600),
            })
        );
    }

    #[test]
    fn test_invalid_cache_ttl_is_ignored() {
        let settings = InferenceSettings::from_lookup(lookup_from(&[
            ("AI_GATEWAY_ID", "gw"),
            ("AI_GATEWAY_CACHE_TTL", "soon"),
        ]));

        let gateway = settings.gateway.unwrap();
        assert_eq!(gateway.cache_ttl, None);
        assert!(!gateway.skip_cache);
    }
}
