//! Env-file credential store
//!
//! The bootstrap tool writes a freshly obtained refresh token here; the
//! request path only ever reads. Format is one `KEY=VALUE` per line, `#`
//! comments, optional `export ` prefix and optional single or double quotes.
//! Lines that fit none of these are skipped with a warning.

use crate::credentials::{keys, CredentialConfig, CredentialSource, OAUTH2_PASSWORD_PLACEHOLDER};
use crate::CoreResult;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File-backed credential store
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current credentials
    ///
    /// A missing file yields empty credentials rather than an error.
    pub async fn load(&self) -> CoreResult<CredentialConfig> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Credential file {} not found", self.path.display());
                return Ok(CredentialConfig::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(CredentialConfig::from_vars(parse_env(&contents)))
    }

    /// Persist a new refresh token
    ///
    /// Replaces `REFRESH_TOKEN` in place (or appends it) and marks the
    /// password as superseded by OAuth2. Other lines are left untouched.
    pub async fn save_refresh_token(&self, refresh_token: &str) -> CoreResult<()> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let updated = upsert(
            &contents,
            &[
                (keys::REFRESH_TOKEN, refresh_token),
                (keys::PASSWORD, OAUTH2_PASSWORD_PLACEHOLDER),
            ],
        );

        // Readers never observe a partially written file
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, updated).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        info!("Stored refresh token in {}", self.path.display());
        Ok(())
    }

    /// Sibling of the store with `.tmp` appended to the full file name
    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(".env"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CredentialSource for CredentialStore {
    async fn load(&self) -> CoreResult<CredentialConfig> {
        CredentialStore::load(self).await
    }
}

/// Split a line into key and raw value, skipping blanks and comments
fn split_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    Some((key.trim(), value.trim()))
}

fn parse_env(contents: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();
    for (index, line) in contents.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match split_line(line) {
            Some((key, value)) if !key.is_empty() => {
                vars.push((key.to_string(), unquote(value).to_string()));
            }
            _ => warn!("Skipping malformed credential file line {}", index + 1),
        }
    }
    vars
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn upsert(contents: &str, updates: &[(&str, &str)]) -> String {
    let mut written = vec![false; updates.len()];
    let mut lines: Vec<String> = contents
        .lines()
        .map(|line| {
            let Some((key, _)) = split_line(line) else {
                return line.to_string();
            };
            match updates.iter().position(|(k, _)| *k == key) {
                Some(i) => {
                    written[i] = true;
                    format!("{}={}", updates[i].0, updates[i].1)
                }
                None => line.to_string(),
            }
        })
        .collect();

    for (i, (key, value)) in updates.iter().enumerate() {
        if !written[i] {
            lines.push(format!("{}={}", key, value));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
