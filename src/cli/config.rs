use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditorConfig {
    pub server: ServerSettings,
    pub fetch: FetchSettings,
    pub browser: BrowserSettings,
    pub extractor: ExtractorSettings,
    pub digest: DigestSettings,
    pub completion: CompletionSettings,
}

/// HTTP surface settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub listen_addr: String,
    pub cors_enabled: bool,
}

/// Which fetch strategy the pipeline uses by default
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Plain HTTP GET of server-rendered HTML
    Static,
    /// Headless-browser rendering for JavaScript-dependent pages
    Rendered,
}

/// Fetch strategy settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FetchSettings {
    pub mode: FetchMode,
    /// Per-attempt request timeout in seconds
    pub timeout_secs: u64,
    /// Extra attempts after the first, transient failures only
    pub max_retries: u32,
    /// Linear backoff unit between attempts, in milliseconds
    pub backoff_millis: u64,
    /// Bodies shorter than this are treated as unusable
    pub min_body_len: usize,
    /// Outbound proxy URL; overridden by OUTBOUND_PROXY
    pub outbound_proxy: Option<String>,
}

/// Headless browser settings for rendered mode
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BrowserSettings {
    pub webdriver_url: String,
    pub headless: bool,
    /// Overall navigation-and-render budget in seconds
    pub navigation_timeout_secs: u64,
    /// Debounce window after readyState settles, in milliseconds
    pub settle_millis: u64,
    /// Maximum concurrent rendering sessions across requests
    pub max_sessions: usize,
    pub fingerprints: Vec<FingerprintProfile>,
}

/// Browser identity presented to the target site
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FingerprintProfile {
    pub name: String,
    pub user_agent: String,
    pub accept_language: String,
    pub platform: String,
}

/// Structural extractor caps, applied at extraction time
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtractorSettings {
    pub max_headings: usize,
    pub max_snippets: usize,
    pub max_ctas: usize,
    pub max_image_alts: usize,
    pub max_trust_signals: usize,
    pub max_form_fields: usize,
    /// Body-text candidates shorter than this are discarded
    pub min_snippet_len: usize,
    /// Per-fragment character clip
    pub max_fragment_len: usize,
}

/// Digest assembly settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DigestSettings {
    /// Absolute character ceiling for the assembled digest
    pub max_chars: usize,
    /// Digests shorter than this classify as insufficient content
    pub min_content_len: usize,
}

/// Completion backend settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompletionSettings {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Hard cap on digest characters sent to the backend
    pub max_input_chars: usize,
    /// Sourced from GROQ_API_KEY, never persisted to a profile
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Sourced from PAGESPEED_API_KEY; performance metrics are skipped
    /// when absent
    #[serde(skip)]
    pub pagespeed_api_key: Option<String>,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                listen_addr: "127.0.0.1:3000".to_string(),
                cors_enabled: true,
            },
            fetch: FetchSettings {
                mode: FetchMode::Static,
                timeout_secs: 20,
                max_retries: 2,
                backoff_millis: 1000,
                min_body_len: 100,
                outbound_proxy: None,
            },
            browser: BrowserSettings {
                webdriver_url: "http://localhost:4444".to_string(),
                headless: true,
                navigation_timeout_secs: 40,
                settle_millis: 750,
                max_sessions: 4,
                fingerprints: vec![
                    FingerprintProfile {
                        name: "windows_chrome".to_string(),
                        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
                        accept_language: "en-US,en;q=0.9".to_string(),
                        platform: "Win32".to_string(),
                    },
                    FingerprintProfile {
                        name: "mac_chrome".to_string(),
                        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
                        accept_language: "en-US,en;q=0.9".to_string(),
                        platform: "MacIntel".to_string(),
                    },
                    FingerprintProfile {
                        name: "linux_chrome".to_string(),
                        user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36".to_string(),
                        accept_language: "en-US,en;q=0.9".to_string(),
                        platform: "Linux x86_64".to_string(),
                    },
                ],
            },
            extractor: ExtractorSettings {
                max_headings: 10,
                max_snippets: 15,
                max_ctas: 10,
                max_image_alts: 10,
                max_trust_signals: 10,
                max_form_fields: 15,
                min_snippet_len: 10,
                max_fragment_len: 300,
            },
            digest: DigestSettings {
                max_chars: 12_000,
                min_content_len: 100,
            },
            completion: CompletionSettings {
                endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
                model: "llama3-70b-8192".to_string(),
                temperature: 0.3,
                max_tokens: 1500,
                timeout_secs: 25,
                max_input_chars: 12_000,
                api_key: None,
                pagespeed_api_key: None,
            },
        }
    }
}

impl AuditorConfig {
    /// Get the path to the config directory
    fn config_dir() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("com", "page-auditor", "page-auditor") {
            proj_dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from("./config")
        }
    }

    /// Load the default configuration profile, creating it on first run,
    /// then apply environment-sourced secrets
    pub fn load_default() -> Result<Self> {
        let config_path = Self::config_dir().join("default.yaml");

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            info!("Default configuration not found. Creating...");
            let config = Self::default();
            config.save_to_file(&config_path)?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    /// Pull secrets and overrides from the process environment. These are
    /// read once at startup; the configuration is read-only afterwards.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            if !key.is_empty() {
                self.completion.api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("PAGESPEED_API_KEY") {
            if !key.is_empty() {
                self.completion.pagespeed_api_key = Some(key);
            }
        }
        if let Ok(proxy) = std::env::var("OUTBOUND_PROXY") {
            if !proxy.is_empty() {
                self.fetch.outbound_proxy = Some(proxy);
            }
        }
    }

    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from: {}", path.display());
        let contents = fs::read_to_string(path)
            .context(format!("Failed to read configuration file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .context(format!("Failed to parse configuration file: {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration to a file
    fn save_to_file(&self, path: &Path) -> Result<()> {
        debug!("Saving configuration to: {}", path.display());

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)
                    .context(format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let contents = serde_yaml::to_string(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, contents)
            .context(format!("Failed to write configuration file: {}", path.display()))?;

        Ok(())
    }
}
