//! Deadline settings injected into every task as constants.

use crate::provider::TaskDraft;

/// Constant carrying the Deadline repository location.
pub const REPOSITORY_KEY: &str = "DEADLINE_REPOSITORY";
/// Constant carrying the repository SSL/proxy setting.
pub const SSL_KEY: &str = "DEADLINE_SSL";
/// Constant carrying the license mode.
pub const LICENSE_MODE_KEY: &str = "DEADLINE_LICENSE_MODE";
/// Constant carrying the license server address.
pub const LICENSE_SERVER_KEY: &str = "DEADLINE_LICENSE_SERVER";
/// Constant carrying the flattened proxy certificate.
pub const CERTIFICATE_KEY: &str = "DEADLINE_CRT";

/// Values written into each task before submission.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnvironmentSettings {
    /// Repository path or address workers connect to.
    pub repository: String,
    /// SSL setting for the repository proxy.
    pub ssl: String,
    /// License mode, for example `Standard` or `LicenseFree`.
    pub license_mode: String,
    /// License server address.
    pub license_server: String,
    /// Proxy certificate in PEM form; may span several lines.
    pub proxy_certificate: String,
}

impl EnvironmentSettings {
    /// Sets the five Deadline constants on `draft`, replacing earlier values.
    pub fn inject(&self, draft: &mut TaskDraft) {
        draft.set_constant(REPOSITORY_KEY, self.repository.as_str());
        draft.set_constant(SSL_KEY, self.ssl.as_str());
        draft.set_constant(LICENSE_MODE_KEY, self.license_mode.as_str());
        draft.set_constant(LICENSE_SERVER_KEY, self.license_server.as_str());
        draft.set_constant(CERTIFICATE_KEY, flatten_lines(&self.proxy_certificate));
    }
}

/// Removes every line break from `value`, keeping all other characters in
/// order. Task constants cannot carry multi-line values.
#[must_use]
pub fn flatten_lines(value: &str) -> String {
    value.chars().filter(|ch| !is_line_break(*ch)).collect()
}

const fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{001C}'..='\u{001E}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}
