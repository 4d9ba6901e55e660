//! Credential redaction for diagnostic echoes.
//!
//! Only the 502 envelope uses the redacted copy. The live outbound request
//! always carries the caller's headers untouched.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

/// Header-name fragments that mark a credential (case-insensitive, substring)
static SENSITIVE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)authorization|api[-_ ]?key|x-api-key|token|secret")
        .expect("sensitive header pattern is a valid regex")
});

/// Whether a header name looks like it carries a credential
#[must_use]
pub fn is_sensitive_header(name: &str) -> bool {
    SENSITIVE_NAME.is_match(name)
}

/// Copy of `headers` with every credential-looking entry removed
#[must_use]
pub fn redact_headers(headers: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter(|(name, _)| !is_sensitive_header(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}
