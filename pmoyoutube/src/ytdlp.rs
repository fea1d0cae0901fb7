//! [`Extractor`] implementation driving the `yt-dlp` executable
//!
//! Each call spawns `yt-dlp -J ...` and decodes the single JSON document it
//! prints. yt-dlp's own socket timeout is set, and the whole process is also
//! bounded by a tokio timeout; the child is killed if the future is dropped.

use crate::extractor::{ExtractMode, Extractor, ExtractorError};
use crate::models::RawEntry;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default executable name
pub const DEFAULT_BINARY: &str = "yt-dlp";

/// Socket timeout for full extraction (seconds)
pub const DEFAULT_FULL_TIMEOUT_SECS: u64 = 15;

/// Socket timeout for flat extraction (seconds)
pub const DEFAULT_FLAT_TIMEOUT_SECS: u64 = 8;

/// Only the first items of a playlist are listed in flat mode
pub const DEFAULT_PLAYLIST_END: usize = 25;

/// Format selector: best Opus audio, else best audio
pub const AUDIO_FORMAT_SELECTOR: &str = "bestaudio[acodec=opus]/bestaudio";

/// Extra time granted to the process on top of the socket timeout
const PROCESS_GRACE: Duration = Duration::from_secs(5);

/// yt-dlp subprocess extractor
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: String,
    full_timeout: Duration,
    flat_timeout: Duration,
    playlist_end: usize,
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            full_timeout: Duration::from_secs(DEFAULT_FULL_TIMEOUT_SECS),
            flat_timeout: Duration::from_secs(DEFAULT_FLAT_TIMEOUT_SECS),
            playlist_end: DEFAULT_PLAYLIST_END,
        }
    }
}

impl YtDlpExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another executable (absolute path or name looked up in `PATH`)
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_timeouts(mut self, full: Duration, flat: Duration) -> Self {
        self.full_timeout = full;
        self.flat_timeout = flat;
        self
    }

    pub fn with_playlist_end(mut self, playlist_end: usize) -> Self {
        self.playlist_end = playlist_end;
        self
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn timeout_for(&self, mode: ExtractMode) -> Duration {
        match mode {
            ExtractMode::Full => self.full_timeout,
            ExtractMode::Flat => self.flat_timeout,
        }
    }

    /// Command-line arguments for one extraction
    pub fn build_args(&self, target: &str, mode: ExtractMode) -> Vec<String> {
        let timeout = self.timeout_for(mode).as_secs().max(1).to_string();
        let mut args: Vec<String> = vec![
            "-J".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            "--geo-bypass".into(),
            "--socket-timeout".into(),
            timeout,
        ];

        match mode {
            ExtractMode::Full => {
                args.extend([
                    "--skip-download".into(),
                    "--no-check-certificates".into(),
                    "-f".into(),
                    AUDIO_FORMAT_SELECTOR.into(),
                ]);
            }
            ExtractMode::Flat => {
                args.extend([
                    "--flat-playlist".into(),
                    "--playlist-end".into(),
                    self.playlist_end.to_string(),
                ]);
            }
        }

        // "--" : une cible commençant par '-' ne doit pas être lue comme une option
        args.push("--".into());
        args.push(target.to_string());
        args
    }

    async fn run(&self, args: &[String], limit: Duration) -> Result<Vec<u8>, ExtractorError> {
        let mut command = Command::new(&self.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(limit + PROCESS_GRACE, command.output())
            .await
            .map_err(|_| ExtractorError::Timeout(limit))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = error_message(&stderr)
                .unwrap_or_else(|| format!("{} exited with {}", self.binary, output.status));
            return Err(ExtractorError::Process {
                status: output.status.code(),
                message,
            });
        }

        Ok(output.stdout)
    }
}

/// Keep the `ERROR:` lines of yt-dlp's stderr, or the whole trimmed text
fn error_message(stderr: &str) -> Option<String> {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR:"))
        .collect();

    if !errors.is_empty() {
        return Some(errors.join("; "));
    }

    let trimmed = stderr.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Decode the `-J` dump; an empty output means "nothing extracted"
pub(crate) fn parse_output(stdout: &[u8]) -> Result<Option<RawEntry>, ExtractorError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_slice(stdout)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_value(value)?))
}

#[async_trait]
impl Extractor for YtDlpExtractor {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn search(
        &self,
        expression: &str,
        max_results: usize,
    ) -> Result<Vec<RawEntry>, ExtractorError> {
        let target = format!("ytsearch{}:{}", max_results.max(1), expression);
        let entries = match self.fetch(&target, ExtractMode::Full).await? {
            Some(result) if result.is_playlist() => result.into_entries(),
            Some(single) => vec![single],
            None => Vec::new(),
        };
        debug!(expression, found = entries.len(), "Search finished");
        Ok(entries.into_iter().take(max_results.max(1)).collect())
    }

    async fn fetch(
        &self,
        target: &str,
        mode: ExtractMode,
    ) -> Result<Option<RawEntry>, ExtractorError> {
        let args = self.build_args(target, mode);
        debug!(url = target, ?mode, "Running {}", self.binary);

        let stdout = self.run(&args, self.timeout_for(mode)).await?;
        parse_output(&stdout)
    }

    async fn version(&self) -> Option<String> {
        let args = vec!["--version".to_string()];
        match self.run(&args, Duration::from_secs(5)).await {
            Ok(out) => Some(String::from_utf8_lossy(&out).trim().to_string()),
            Err(e) => {
                warn!("Cannot read {} version: {}", self.binary, e);
                None
            }
        }
    }
}
