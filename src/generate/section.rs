//! Text buffer for one section of a generated match list

use crate::matcher::pattern::NEGATION_PREFIX;
use crate::matcher::ListMode;

const GLOB_ALL: &str = "/**";

/// Accumulates lines for a match list of a given mode.
///
/// Callers say whether a path should be kept or dropped; the section picks
/// the rule polarity that means that in its mode.
#[derive(Debug, Clone)]
pub struct FileSection {
    mode: ListMode,
    buf: String,
}

impl FileSection {
    pub fn new(mode: ListMode) -> Self {
        Self { mode, buf: String::new() }
    }

    pub fn mode(&self) -> ListMode {
        self.mode
    }

    /// Free-form header text, written as is.
    pub fn header(&mut self, body: &str) -> &mut Self {
        self.line(body)
    }

    pub fn comment(&mut self, text: &str) -> &mut Self {
        self.buf.push_str("# ");
        self.line(text)
    }

    pub fn keep(&mut self, rule: &str) -> &mut Self {
        match self.mode {
            ListMode::Ignore => self.negated(rule),
            ListMode::Keep => self.line(rule),
        }
    }

    pub fn drop(&mut self, rule: &str) -> &mut Self {
        match self.mode {
            ListMode::Ignore => self.line(rule),
            ListMode::Keep => self.negated(rule),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }

    fn negated(&mut self, rule: &str) -> &mut Self {
        self.buf.push(NEGATION_PREFIX);
        self.line(rule)
    }

    fn line(&mut self, text: &str) -> &mut Self {
        self.buf.push_str(text);
        self.buf.push('\n');
        self
    }
}

/// Rule covering everything below `path`.
pub fn glob_all(path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }
    format!("{}{}", path.trim_end_matches('/'), GLOB_ALL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polarity_follows_mode() {
        let mut ignore = FileSection::new(ListMode::Ignore);
        ignore.keep("/etc/ssl/**").drop("/var/cache/**");
        assert_eq!(ignore.as_str(), "!/etc/ssl/**\n/var/cache/**\n");

        let mut keep = FileSection::new(ListMode::Keep);
        keep.keep("/etc/ssl/**").drop("/var/cache/**");
        assert_eq!(keep.as_str(), "/etc/ssl/**\n!/var/cache/**\n");
    }

    #[test]
    fn comments_and_headers() {
        let mut section = FileSection::new(ListMode::Ignore);
        section.header("\n## Title ##").comment("Certs");
        assert_eq!(section.into_string(), "\n## Title ##\n# Certs\n");
    }

    #[test]
    fn glob_all_handles_trailing_slash() {
        assert_eq!(glob_all("/etc/ssl/certs"), "/etc/ssl/certs/**");
        assert_eq!(glob_all("/etc/ssl/certs/"), "/etc/ssl/certs/**");
        assert_eq!(glob_all(""), "");
    }
}
