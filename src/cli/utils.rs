//! Shared CLI utilities.

use crate::config::{load_config, merge_cli_with_config, CliOverrides};
use crate::domain::Config;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Parse a comma-separated string into a `Vec<String>`, trimming whitespace and
/// discarding empty segments.  Returns `None` when `value` is `None`.
pub fn parse_csv(value: &Option<String>) -> Option<Vec<String>> {
    value.as_ref().map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect::<Vec<_>>()
    })
}

/// Flatten repeated, possibly comma-separated values.
pub fn parse_csv_multi(values: &[String]) -> Vec<String> {
    values.iter().filter_map(|v| parse_csv(&Some(v.clone()))).flatten().collect()
}

pub fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to determine current directory")
}

/// Load the config file (explicit or discovered in `cwd`) and apply CLI overrides.
pub fn resolve_config(cwd: &Path, config: Option<&Path>, overrides: CliOverrides) -> Result<Config> {
    let file_config = load_config(cwd, config)?;
    Ok(merge_cli_with_config(file_config, overrides))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_trims_and_drops_empty_parts() {
        assert_eq!(
            parse_csv(&Some(" nodejs, ,python3 ".to_string())),
            Some(vec!["nodejs".to_string(), "python3".to_string()])
        );
        assert_eq!(parse_csv(&None), None);
    }

    #[test]
    fn csv_multi_flattens() {
        let values = vec!["/a:700,/b:755".to_string(), "/c:600".to_string()];
        assert_eq!(parse_csv_multi(&values), vec!["/a:700", "/b:755", "/c:600"]);
    }
}
