//! Log output redaction
//!
//! Every line written by the `tracing` subscriber goes through
//! [`RedactionPatterns::redact`] so bot tokens and API credentials never
//! reach stderr.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    telegram_url: Regex,
    telegram_bare: Regex,
    authorization: Regex,
    access_token: Regex,
    env_secret: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            telegram_url: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)")?,
            telegram_bare: Regex::new(r"\b[0-9]{8,10}:[A-Za-z0-9_-]{35}\b")?,
            authorization: Regex::new(r"(?i)\b(Bearer|Basic)\s+[A-Za-z0-9._~+/=-]+")?,
            access_token: Regex::new(r#""access_token"\s*:\s*"[^"]*""#)?,
            env_secret: Regex::new(
                r"((?:GIGACHAT_AUTH_KEY|GIGACHAT_CLIENT_SECRET|OPENROUTER_API_KEY|WEBHOOK_TOKEN)=)[^\s&]+",
            )?,
        })
    }

    /// Masks every known secret shape in `input`
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let output = self
            .telegram_url
            .replace_all(input, "$1[TELEGRAM_TOKEN]");
        let output = self
            .telegram_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]");
        let output = self.authorization.replace_all(&output, "$1 [MASKED]");
        let output = self
            .access_token
            .replace_all(&output, r#""access_token":"[MASKED]""#);
        self.env_secret
            .replace_all(&output, "$1[MASKED]")
            .into_owned()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer was consumed in full even if the redacted text differs in length.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}

/// Installs the global subscriber: `RUST_LOG` filter (default `info`), redacted stderr output
pub fn init(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
