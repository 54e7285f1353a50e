use url::Url;

/// A validated absolute URL, guaranteed to be http or https
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl {
    url: Url,
}

impl NormalizedUrl {
    /// The underlying parsed URL
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// String form, suitable for handing to an HTTP client or WebDriver
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Host portion, used for log context
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

impl std::fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Validate and canonicalize user-supplied URL input.
///
/// Trims whitespace, assumes `https://` when no scheme is present, and
/// rejects anything that does not parse to an http(s) URL with a host.
/// Pure and deterministic; `None` means the input is not fetchable.
pub fn normalize(input: &str) -> Option<NormalizedUrl> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate).ok()?;

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    // A URL without a host (e.g. "https://") parses but is not fetchable
    url.host_str()?;

    Some(NormalizedUrl { url })
}
