use std::fmt;

/// API key for the vision model. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Trimmed key, `None` for blank input
    pub fn parse(raw: &str) -> Option<Self> {
        let key = raw.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(key.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First 10 characters followed by `...`, for logs and diagnostics
    pub fn masked(&self) -> String {
        if self.0.chars().count() > 10 {
            let prefix: String = self.0.chars().take(10).collect();
            format!("{prefix}...")
        } else {
            "*".repeat(self.0.chars().count())
        }
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"<redacted>").finish()
    }
}
