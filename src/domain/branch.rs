use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static PATTERN_WHITESPACE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\s\*?").expect("invalid whitespace marker regex"));

const ID_PLACEHOLDER: &str = r"(\d+)";

/// A branch as offered for selection: the provider-specific identifier
/// (commit hash, sha or ref id) the new branch will start from, plus the
/// name shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub id: String,
    pub display_name: String,
}

impl Branch {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchName(pub String);

impl BranchName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds `{prefix}-{sanitized name}` where the prefix comes from the
    /// tracking tool's branch pattern (id substituted into its `(\d+)`
    /// group) or falls back to `{default_prefix}_{id}`.
    pub fn from_pattern(
        pattern: Option<&str>,
        id: u64,
        name: &str,
        default_prefix: &str,
    ) -> Self {
        let sanitized = sanitize(name);
        let prefix = match pattern.filter(|p| !p.is_empty()) {
            Some(pattern) => PATTERN_WHITESPACE_MARKER
                .replace_all(pattern, "")
                .replacen(ID_PLACEHOLDER, &id.to_string(), 1),
            None => format!("{default_prefix}_{id}"),
        };
        Self(format!("{prefix}-{sanitized}"))
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// See git-check-ref-format: no "..", and none of ~ ^ : ? [
fn sanitize(input: &str) -> String {
    input
        .trim()
        .replace("..", "")
        .chars()
        .filter(|c| !matches!(c, '~' | '^' | ':' | '?' | '['))
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_default_prefix() {
        let name = BranchName::from_pattern(None, 42, "Fix login bug!", "user_story");
        assert_eq!(name.as_str(), "user_story_42-Fix_login_bug!");
    }

    #[test]
    fn empty_pattern_counts_as_missing() {
        let name = BranchName::from_pattern(Some(""), 7, "x", "defect");
        assert_eq!(name.as_str(), "defect_7-x");
    }

    #[test]
    fn strips_disallowed_ref_characters() {
        let name = BranchName::from_pattern(None, 1, "  a..b~c^d:e?f[g  ", "task");
        assert_eq!(name.as_str(), "task_1-abcdefg");
    }

    #[test]
    fn replaces_each_whitespace_with_underscore() {
        let name = BranchName::from_pattern(None, 3, "two  spaces\tand tab", "task");
        assert_eq!(name.as_str(), "task_3-two__spaces_and_tab");
    }

    #[test]
    fn substitutes_id_into_pattern_once() {
        let name = BranchName::from_pattern(Some(r"US\s*(\d+)_(\d+)"), 1001, "Login page", "x");
        assert_eq!(name.as_str(), r"US1001_(\d+)-Login_page");
    }

    #[test]
    fn removes_pattern_whitespace_markers() {
        let name = BranchName::from_pattern(Some(r"feature\s/\s*us_(\d+)"), 5, "Name", "x");
        assert_eq!(name.as_str(), "feature/us_5-Name");
    }
}
