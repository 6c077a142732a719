//! Secret masking for log sinks and operator-facing messages.
//!
//! Bot tokens travel inside request paths (`/bot<token>/setWebhook`), so any
//! error or log line that echoes a URL can leak one. Every log writer is
//! wrapped in [`Redacting`], which rewrites matches before they hit the sink.

use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::LazyLock;

use regex::Regex;
use tracing_subscriber::fmt::MakeWriter;

const MASK: &str = "***";

static SECRET_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        // Telegram bot tokens, bare or as a `bot<token>` path segment
        r"(?:bot)?\d{5,}:[A-Za-z0-9_-]{20,}",
        // Token secret halves logged without the bot id
        r"(?:AAG|AAH)[A-Za-z0-9_-]{20,}",
        // JWT-style triples
        r"[A-Za-z0-9_-]{20,}\.[A-Za-z0-9_-]{6,}\.[A-Za-z0-9_-]{20,}",
    ]
    .into_iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Replace anything that looks like a credential with `***`.
pub fn redact(text: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(text);
    for pattern in SECRET_PATTERNS.iter() {
        if pattern.is_match(&out) {
            out = Cow::Owned(pattern.replace_all(&out, MASK).into_owned());
        }
    }
    out
}

/// `MakeWriter` adapter that redacts every formatted event.
pub struct Redacting<M> {
    inner: M,
}

impl<M> Redacting<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for Redacting<M> {
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
        }
    }
}

pub struct RedactingWriter<W> {
    inner: W,
}

impl<W: Write> Write for RedactingWriter<W> {
    // The fmt layer hands over one complete line per event.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(redact(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
