//! Miette-based error diagnostics for CLI error presentation.
//!
//! Renders answers-file parse errors with the offending snippet underlined.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Answers-file error with source location context.
#[derive(Debug, Error, Diagnostic)]
#[error("{message}")]
#[diagnostic(code(stackforge::config))]
pub struct ConfigDiagnostic {
    /// Human-readable error message.
    pub message: String,

    /// Source content (the answers file).
    #[source_code]
    pub src: miette::NamedSource<String>,

    /// Byte offset and length of the problematic region.
    #[label("here")]
    pub span: SourceSpan,

    /// Optional help text with suggestions for fixing the error.
    #[help]
    pub help: Option<String>,
}

impl ConfigDiagnostic {
    /// Create a new configuration error with source location.
    #[must_use]
    pub fn new(
        message: impl Into<String>,
        name: impl AsRef<str>,
        src: impl Into<String>,
        offset: usize,
        len: usize,
    ) -> Self {
        Self {
            message: message.into(),
            src: miette::NamedSource::new(name, src.into()),
            span: (offset, len).into(),
            help: None,
        }
    }

    /// Add a help suggestion to the error.
    #[must_use]
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Build from a TOML parse failure, if it carries a location.
    #[must_use]
    pub fn from_toml(name: &str, src: &str, err: &toml::de::Error) -> Option<Self> {
        let span = err.span()?;
        let len = span.end.saturating_sub(span.start).max(1);
        Some(
            Self::new(err.message(), name, src, span.start, len)
                .with_help("see config.toml.example for the accepted keys"),
        )
    }
}

/// Print a diagnostic with the graphical report handler.
pub fn report(diagnostic: ConfigDiagnostic) {
    eprintln!("{:?}", miette::Report::new(diagnostic));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_errors_carry_span() {
        let src = "[routing]\nmode = \"tunnel\"\n";
        let err = toml::from_str::<crate::infrastructure::config::settings::Config>(src)
            .unwrap_err();
        let diagnostic = ConfigDiagnostic::from_toml("config.toml", src, &err).unwrap();
        assert!(diagnostic.span.offset() >= src.find("mode").unwrap());
        assert!(diagnostic.help.is_some());
    }
}
