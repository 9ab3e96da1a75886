//! Optional config file supplying CLI defaults.
//!
//! The file holds `key = value` lines with `#` comments. Strings are
//! double-quoted; booleans and integers are bare.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};

const MAX_CONNECT_TIMEOUT_SECS: u64 = 3600;
const MAX_READ_TIMEOUT_SECS: u64 = 86_400;

/// Defaults read from the config file. Unset keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    pub output_dir: Option<PathBuf>,
    pub overwrite: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    pub verbosity: Option<VerbositySetting>,
}

impl FileConfig {
    fn apply(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output_dir" => self.output_dir = Some(PathBuf::from(unquote(value)?)),
            "overwrite" => self.overwrite = Some(value.parse()?),
            "connect_timeout_secs" => {
                self.connect_timeout_secs =
                    Some(timeout_secs(value, MAX_CONNECT_TIMEOUT_SECS)?);
            }
            "read_timeout_secs" => {
                self.read_timeout_secs = Some(timeout_secs(value, MAX_READ_TIMEOUT_SECS)?);
            }
            "verbosity" => self.verbosity = Some(unquote(value)?.parse()?),
            unknown => bail!("unknown key `{unknown}`"),
        }
        Ok(())
    }
}

/// Verbosity labels accepted by the `verbosity` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbositySetting {
    Default,
    Verbose,
    Quiet,
    Debug,
}

impl VerbositySetting {
    /// Returns the tracing filter level for this setting.
    #[must_use]
    pub fn level(self) -> &'static str {
        match self {
            Self::Default => "info",
            Self::Verbose => "debug",
            Self::Quiet => "error",
            Self::Debug => "trace",
        }
    }
}

impl FromStr for VerbositySetting {
    type Err = anyhow::Error;

    fn from_str(label: &str) -> Result<Self> {
        Ok(match label {
            "default" => Self::Default,
            "verbose" => Self::Verbose,
            "quiet" => Self::Quiet,
            "debug" => Self::Debug,
            other => bail!("`{other}` is not one of: default, verbose, quiet, debug"),
        })
    }
}

/// Returns `$XDG_CONFIG_HOME/fetcher/config.toml`, falling back to
/// `$HOME/.config/fetcher/config.toml`.
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    let non_empty = |name: &str| env::var_os(name).filter(|value| !value.is_empty());
    let config_home = non_empty("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| non_empty("HOME").map(|home| PathBuf::from(home).join(".config")))?;
    Some(config_home.join("fetcher").join("config.toml"))
}

/// Loads config from an explicit path, or from the default path if present.
///
/// An explicit path must exist; a missing default file yields an empty config.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    if let Some(path) = explicit {
        return read_config(path);
    }
    match resolve_default_config_path() {
        Some(path) if path.exists() => read_config(&path),
        _ => Ok(FileConfig::default()),
    }
}

fn read_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (index, line) in raw.lines().enumerate() {
        let line_no = index + 1;
        let line = without_comment(line).trim();
        if line.is_empty() {
            continue;
        }
        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| anyhow!("line {line_no}: expected `key = value`"))?;
        let key = key.trim();
        cfg.apply(key, value.trim())
            .with_context(|| format!("line {line_no}: invalid `{key}`"))?;
    }
    Ok(cfg)
}

/// Cuts a trailing `#` comment, ignoring `#` inside a quoted string.
fn without_comment(line: &str) -> &str {
    let mut quoted = false;
    let end = line
        .char_indices()
        .find(|&(_, ch)| {
            if ch == '"' {
                quoted = !quoted;
            }
            ch == '#' && !quoted
        })
        .map_or(line.len(), |(index, _)| index);
    &line[..end]
}

fn unquote(value: &str) -> Result<&str> {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| anyhow!("expected a double-quoted string, got {value}"))
}

fn timeout_secs(value: &str, max: u64) -> Result<u64> {
    let secs: u64 = value.parse()?;
    if !(1..=max).contains(&secs) {
        bail!("{secs} is outside 1..={max}");
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_is_read() {
        let cfg = parse_config_str(
            "output_dir = \"/srv/incoming\"\n\
             overwrite = true\n\
             connect_timeout_secs = 15\n\
             read_timeout_secs = 600\n\
             verbosity = \"debug\"\n",
        )
        .expect("config should parse");
        assert_eq!(
            cfg,
            FileConfig {
                output_dir: Some(PathBuf::from("/srv/incoming")),
                overwrite: Some(true),
                connect_timeout_secs: Some(15),
                read_timeout_secs: Some(600),
                verbosity: Some(VerbositySetting::Debug),
            }
        );
    }

    #[test]
    fn test_blank_lines_and_comments_are_skipped() {
        let cfg = parse_config_str("\n# defaults for the lab box\n\noverwrite = false # keep copies\n")
            .expect("config should parse");
        assert_eq!(cfg.overwrite, Some(false));
        assert_eq!(cfg.output_dir, None);
    }

    #[test]
    fn test_hash_inside_quotes_is_not_a_comment() {
        let cfg = parse_config_str(r#"output_dir = "/mnt/#scratch" # note"#)
            .expect("config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/mnt/#scratch")));
    }

    #[test]
    fn test_errors_name_the_line_and_key() {
        let err = parse_config_str("overwrite = true\nretries = 3").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"), "{err:#}");
        assert!(format!("{err:#}").contains("retries"), "{err:#}");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for raw in [
            "overwrite = yes",
            "output_dir = /unquoted",
            "verbosity = \"loud\"",
            "connect_timeout_secs = -1",
            "connect_timeout_secs = 0",
            "read_timeout_secs = 86401",
            "overwrite",
        ] {
            assert!(parse_config_str(raw).is_err(), "accepted: {raw}");
        }
    }

    #[test]
    fn test_verbosity_labels_map_to_levels() {
        let levels: Vec<_> = ["default", "verbose", "quiet", "debug"]
            .into_iter()
            .map(|label| label.parse::<VerbositySetting>().expect("known label").level())
            .collect();
        assert_eq!(levels, ["info", "debug", "error", "trace"]);
    }

    #[test]
    fn test_load_explicit_config_path() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let path = dir.path().join("fetcher.toml");
        fs::write(&path, "read_timeout_secs = 30\n").expect("write config");

        let cfg = load_file_config(Some(&path)).expect("explicit config should load");
        assert_eq!(cfg.read_timeout_secs, Some(30));
    }

    #[test]
    fn test_load_missing_explicit_config_fails() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let err = load_file_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
