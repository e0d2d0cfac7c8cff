//! Provider registry and per-provider key rules.
//!
//! Each [`Provider`] variant carries its own key-format rule and client
//! construction parameters. [`ProviderConfig`] entries bind a menu id to a
//! provider, a model and the key name under which its secret is stored.

/// Supported model vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Google AI Studio (Gemini)
    Google,
    /// Direct Anthropic API
    Anthropic,
    /// Direct OpenAI API
    OpenAI,
}

impl Provider {
    /// Vendor name, as used in messages and by [`is_valid_format`].
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Google => "Google",
            Provider::Anthropic => "Anthropic",
            Provider::OpenAI => "OpenAI",
        }
    }

    /// Parse provider from its vendor name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Google" => Some(Provider::Google),
            "Anthropic" => Some(Provider::Anthropic),
            "OpenAI" => Some(Provider::OpenAI),
            _ => None,
        }
    }

    /// Check the syntactic shape of an API key. Never performs I/O.
    pub fn is_valid_key(&self, key: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        match self {
            Provider::Google => key.starts_with("AIzaSy"),
            Provider::OpenAI => key.starts_with("sk-"),
            Provider::Anthropic => {
                key.chars().count() == 40 && key.chars().all(char::is_alphanumeric)
            }
        }
    }
}

/// Check the key format for a provider given by vendor name.
///
/// Unknown providers and empty values are always invalid.
#[must_use]
pub fn is_valid_format(provider: &str, value: &str) -> bool {
    Provider::from_name(provider).is_some_and(|p| p.is_valid_key(value))
}

/// Mask a secret for display, keeping the first and last four characters.
#[must_use]
pub fn mask_key(key: Option<&str>) -> String {
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return "Not set".to_string();
    };

    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

/// Static registry entry for a selectable model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Stable menu id ("1", "2", ...).
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    pub provider: Provider,
    /// Model identifier sent to the provider API.
    pub model: &'static str,
    /// Key name under which the secret is stored.
    pub key_env: &'static str,
}

impl ProviderConfig {
    /// Built-in registry, ordered by id.
    pub const REGISTRY: &'static [ProviderConfig] = &[
        ProviderConfig {
            id: "1",
            name: "Gemini",
            provider: Provider::Google,
            model: "gemini-2.0-flash-exp",
            key_env: "GOOGLE_API_KEY",
        },
        ProviderConfig {
            id: "2",
            name: "Claude",
            provider: Provider::Anthropic,
            model: "claude-3-opus-20240229",
            key_env: "ANTHROPIC_API_KEY",
        },
        ProviderConfig {
            id: "3",
            name: "GPT-4",
            provider: Provider::OpenAI,
            model: "gpt-4",
            key_env: "OPENAI_API_KEY",
        },
    ];

    /// Look up a registry entry by id.
    pub fn get(id: &str) -> Option<&'static ProviderConfig> {
        Self::REGISTRY.iter().find(|c| c.id == id)
    }

    /// Key names of every registered provider.
    pub fn key_names() -> impl Iterator<Item = &'static str> {
        Self::REGISTRY.iter().map(|c| c.key_env)
    }
}
