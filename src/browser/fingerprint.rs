use anyhow::Result;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use tracing::debug;

use crate::cli::config::FingerprintProfile;

/// Viewport dimensions presented to the target site
#[derive(Debug, Clone)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// A browser identity resolved from a configured profile: the header set
/// the static fetcher sends and the arguments the rendered fetcher passes
/// to Chrome
#[derive(Debug, Clone)]
pub struct Fingerprint {
    pub name: String,
    pub user_agent: String,
    pub accept_language: String,
    pub platform: String,
    pub viewport: Viewport,
    pub headers: HashMap<String, String>,
}

/// Picks and completes fingerprint profiles
pub struct FingerprintManager {
    profiles: Vec<FingerprintProfile>,
}

impl FingerprintManager {
    pub fn new(profiles: Vec<FingerprintProfile>) -> Self {
        Self { profiles }
    }

    /// Select a random profile and complete it with a jittered viewport
    /// and a realistic header set
    pub fn random_fingerprint(&self) -> Result<Fingerprint> {
        if self.profiles.is_empty() {
            anyhow::bail!("No fingerprint profiles configured");
        }

        let mut rng = thread_rng();
        let profile = &self.profiles[rng.gen_range(0..self.profiles.len())];

        let viewport = Viewport {
            width: rng.gen_range(1280..1920),
            height: rng.gen_range(768..1080),
        };

        let mut headers = HashMap::new();
        headers.insert("User-Agent".to_string(), profile.user_agent.clone());
        headers.insert("Accept-Language".to_string(), profile.accept_language.clone());
        headers.insert(
            "Accept".to_string(),
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .to_string(),
        );
        // Accept-Encoding stays out of this set: the HTTP client negotiates
        // compression itself and must only advertise codings it can decode
        headers.insert("Upgrade-Insecure-Requests".to_string(), "1".to_string());

        let fingerprint = Fingerprint {
            name: profile.name.clone(),
            user_agent: profile.user_agent.clone(),
            accept_language: profile.accept_language.clone(),
            platform: profile.platform.clone(),
            viewport,
            headers,
        };

        debug!("Selected fingerprint: {}", fingerprint.name);

        Ok(fingerprint)
    }
}
