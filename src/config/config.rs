//! Application configuration and CLI argument parsing.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::request::{Job, JobInput, RequestConfig};
use crate::audio::PauseConfig;
use crate::text::{DEFAULT_CHARS_PER_TOKEN, MAX_CHARS_PER_TOKEN, RuleSet, TokenEstimator};
use crate::tts::{DEFAULT_SAMPLE_RATE, FailurePolicy};

/// Chunked synthesis application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "hebtts-chunker")]
#[command(author, version, about = "Chunked long-text synthesis for a Hebrew TTS model", long_about = None)]
pub struct AppConfig {
    /// Text to synthesize
    #[arg(conflicts_with_all = ["text_file", "job"])]
    pub text: Option<String>,

    /// Read the text from a file
    #[arg(long, short = 'f', conflicts_with = "job")]
    pub text_file: Option<PathBuf>,

    /// Read a JSON job ({"input": {...}}) from a file, or "-" for stdin
    #[arg(long, short = 'j')]
    pub job: Option<PathBuf>,

    /// Speaker prompt name [default: osim]
    #[arg(long, short = 's', env = "TTS_SPEAKER")]
    pub speaker: Option<String>,

    /// Top-k sampling [default: 15]
    #[arg(long)]
    pub top_k: Option<u32>,

    /// Sampling temperature, 0.0-2.0 [default: 0.6]
    #[arg(long, value_parser = parse_temperature)]
    pub temperature: Option<f32>,

    /// Disable the multi-band diffusion decoder
    #[arg(long)]
    pub no_mbd: bool,

    /// Synthesize the whole text in one call
    #[arg(long)]
    pub no_chunking: bool,

    /// Character budget per chunk [default: 150]
    #[arg(long, short = 'c')]
    pub max_chunk_chars: Option<usize>,

    /// Model token limit per synthesis call [default: 512]
    #[arg(long)]
    pub token_limit: Option<usize>,

    /// Characters per model token used for estimates (0 < ratio <= 64)
    #[arg(long, env = "TTS_CHARS_PER_TOKEN", default_value_t = DEFAULT_CHARS_PER_TOKEN, value_parser = parse_chars_per_token)]
    pub chars_per_token: f32,

    /// Boundary rule set for the input script
    #[arg(long, value_enum, default_value_t = RuleSet::Hebrew)]
    pub rules: RuleSet,

    /// Join chunks without inserted silence
    #[arg(long)]
    pub no_pauses: bool,

    /// Silence after sentence boundaries, in milliseconds
    #[arg(long, default_value = "300")]
    pub sentence_pause_ms: u32,

    /// Silence after clause boundaries, in milliseconds
    #[arg(long, default_value = "200")]
    pub clause_pause_ms: u32,

    /// Silence at word boundaries, in milliseconds
    #[arg(long, default_value = "100")]
    pub word_pause_ms: u32,

    /// Silence at forced cuts, in milliseconds
    #[arg(long, default_value = "0")]
    pub forced_pause_ms: u32,

    /// Retry a failing chunk this many times before giving up (0 = fail fast)
    #[arg(long, default_value = "0")]
    pub max_retries: u32,

    /// Print the chunk plan as JSON and exit without synthesizing
    #[arg(long)]
    pub plan_only: bool,

    /// Write the stitched audio to a WAV file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Output sample rate of the built-in tone engine
    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Maximum number of queued jobs
    #[arg(long, default_value = "8")]
    pub queue_size: usize,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Request settings from the command line on top of the defaults.
    pub fn request_config(&self) -> RequestConfig {
        let mut config = RequestConfig::default();
        self.apply_request_flags(&mut config);
        config
    }

    /// Override `config` with the request flags given on the command line.
    ///
    /// Flags left unset keep the values already in `config`.
    pub fn apply_request_flags(&self, config: &mut RequestConfig) {
        if let Some(ref speaker) = self.speaker {
            config.speaker = speaker.clone();
        }
        if let Some(top_k) = self.top_k {
            config.top_k = top_k;
        }
        if let Some(temperature) = self.temperature {
            config.temperature = temperature;
        }
        if self.no_mbd {
            config.use_mbd = false;
        }
        if self.no_chunking {
            config.enable_chunking = false;
        }
        if let Some(max_chunk_chars) = self.max_chunk_chars {
            config.max_chunk_chars = max_chunk_chars;
        }
        if let Some(token_limit) = self.token_limit {
            config.token_limit = token_limit;
        }
    }

    /// Load the job to run.
    ///
    /// Text comes from a job file, the positional argument or `--text-file`.
    /// Request flags given on the command line override the job's settings.
    ///
    /// # Errors
    /// Returns an error if no text source was given or it cannot be read.
    pub fn load_job(&self) -> Result<JobInput> {
        if let Some(path) = &self.job {
            let json = if path.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("Failed to read job from stdin")?;
                buf
            } else {
                std::fs::read_to_string(path).with_context(|| format!("Failed to read job file {}", path.display()))?
            };
            let mut input = Job::from_json(&json)?.input;
            self.apply_request_flags(&mut input.config);
            return Ok(input);
        }

        let text = match (&self.text, &self.text_file) {
            (Some(text), _) => text.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).with_context(|| format!("Failed to read text file {}", path.display()))?,
            (None, None) => anyhow::bail!("No input: pass TEXT, --text-file or --job"),
        };

        Ok(JobInput { text, config: self.request_config() })
    }

    /// Inter-chunk pause lengths, or `None` when pauses are disabled.
    pub fn pauses(&self) -> Option<PauseConfig> {
        if self.no_pauses {
            return None;
        }
        Some(PauseConfig { sentence_ms: self.sentence_pause_ms, clause_ms: self.clause_pause_ms, word_ms: self.word_pause_ms, forced_ms: self.forced_pause_ms })
    }

    /// Failure policy derived from `--max-retries`.
    pub fn failure_policy(&self) -> FailurePolicy {
        match self.max_retries {
            0 => FailurePolicy::FailFast,
            attempts => FailurePolicy::Retry { attempts },
        }
    }

    /// Token estimator for the configured ratio.
    pub fn estimator(&self) -> Result<TokenEstimator> {
        Ok(TokenEstimator::new(self.chars_per_token)?)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        self.request_config().validate()?;

        if self.sample_rate == 0 {
            anyhow::bail!("Sample rate must be positive");
        }

        if self.queue_size == 0 {
            anyhow::bail!("Queue size must be at least 1");
        }

        if let Some(path) = &self.text_file
            && !path.exists()
        {
            anyhow::bail!("Text file does not exist: {}", path.display());
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        let request = self.request_config();
        if self.job.is_some() {
            info!("  Request: from job file, command-line flags override");
        }
        info!("  Speaker: {}", request.speaker);
        info!("  Top-k: {}, temperature: {}, MBD: {}", request.top_k, request.temperature, request.use_mbd);
        info!("  Chunking: {}", if request.enable_chunking { format!("max {} chars", request.max_chunk_chars) } else { "disabled".to_string() });
        info!("  Token limit: {} (~{} chars per token)", request.token_limit, self.chars_per_token);
        info!("  Boundary rules: {}", self.rules);
        match self.pauses() {
            Some(p) => info!("  Pauses: sentence {}ms, clause {}ms, word {}ms, forced {}ms", p.sentence_ms, p.clause_ms, p.word_ms, p.forced_ms),
            None => info!("  Pauses: disabled"),
        }
        info!("  Failure policy: {:?}", self.failure_policy());
        if let Some(ref output) = self.output {
            info!("  Output: {}", output.display());
        }
    }
}

/// Parse and validate temperature value (0.0-2.0).
fn parse_temperature(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a valid float", s))?;
    if (0.0..=2.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("temperature must be between 0.0 and 2.0, got {}", value))
    }
}

/// Parse and validate the chars-per-token ratio (0 < ratio <= 64).
fn parse_chars_per_token(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a valid float", s))?;
    if value.is_finite() && value > 0.0 && value <= MAX_CHARS_PER_TOKEN {
        Ok(value)
    } else {
        Err(format!("chars per token must be in (0, {}], got {}", MAX_CHARS_PER_TOKEN, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SPEAKER;

    fn write_job(name: &str, json: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("hebtts-chunker-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::parse_from(["hebtts-chunker", "שלום"]);
        assert_eq!(config.request_config(), RequestConfig::default());
        assert_eq!(config.pauses(), Some(PauseConfig::default()));
        assert_eq!(config.failure_policy(), FailurePolicy::FailFast);
        assert_eq!(config.rules, RuleSet::Hebrew);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_flags_map_to_request() {
        let config = AppConfig::parse_from(["hebtts-chunker", "--speaker", "geek", "--no-mbd", "--no-chunking", "-c", "80", "--max-retries", "2", "--no-pauses", "x"]);
        let request = config.request_config();
        assert_eq!(request.speaker, "geek");
        assert!(!request.use_mbd);
        assert!(!request.enable_chunking);
        assert_eq!(request.max_chunk_chars, 80);
        assert_eq!(config.failure_policy(), FailurePolicy::Retry { attempts: 2 });
        assert_eq!(config.pauses(), None);
    }

    #[test]
    fn test_load_job_from_positional_text() {
        let config = AppConfig::parse_from(["hebtts-chunker", "שלום עולם"]);
        let job = config.load_job().unwrap();
        assert_eq!(job.text, "שלום עולם");
        assert_eq!(job.config.speaker, DEFAULT_SPEAKER);
    }

    #[test]
    fn test_load_job_requires_input() {
        let config = AppConfig::parse_from(["hebtts-chunker"]);
        assert!(config.load_job().is_err());
    }

    #[test]
    fn test_load_job_file() {
        let path = write_job("job", r#"{"input": {"text": "טקסט", "speaker": "shaul", "max_chunk_chars": 60}}"#);

        let config = AppConfig::parse_from(["hebtts-chunker".into(), "--job".into(), path.as_os_str().to_owned()]);
        let job = config.load_job().unwrap();
        assert_eq!(job.config.speaker, "shaul");
        assert_eq!(job.config.max_chunk_chars, 60);
        assert!(job.config.enable_chunking);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_command_line_flags_override_job_file() {
        let path = write_job("override", r#"{"input": {"text": "טקסט", "speaker": "shaul", "top_k": 20}}"#);

        let config = AppConfig::parse_from(["hebtts-chunker".into(), "--job".into(), path.as_os_str().to_owned(), "--max-chunk-chars".into(), "80".into(), "--no-chunking".into()]);
        let job = config.load_job().unwrap();
        assert_eq!(job.config.max_chunk_chars, 80);
        assert!(!job.config.enable_chunking);
        // Flags not given keep the job's values.
        assert_eq!(job.config.speaker, "shaul");
        assert_eq!(job.config.top_k, 20);
        assert_eq!(job.config.temperature, 0.6);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_parse_temperature() {
        assert!(parse_temperature("0.6").is_ok());
        assert!(parse_temperature("2.5").is_err());
        assert!(parse_temperature("hot").is_err());
        assert!(AppConfig::try_parse_from(["hebtts-chunker", "--temperature", "3", "x"]).is_err());
    }

    #[test]
    fn test_parse_chars_per_token() {
        assert_eq!(parse_chars_per_token("1.5"), Ok(1.5));
        assert!(parse_chars_per_token("0").is_err());
        assert!(parse_chars_per_token("-1").is_err());
        assert!(parse_chars_per_token("1e30").is_err());
        assert!(AppConfig::try_parse_from(["hebtts-chunker", "--chars-per-token", "1e9", "x"]).is_err());
    }
}
