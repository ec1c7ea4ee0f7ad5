use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unsupported construct: {msg}")]
    Unsupported { msg: String, span: Span },

    #[error("Arity mismatch: {msg}")]
    Arity { msg: String, span: Span },

    #[error("Codegen error: {msg}")]
    Codegen { msg: String },

    #[error("Invalid input: {msg}")]
    Input { msg: String },

    #[error("Config error: {msg}")]
    Config { msg: String, path: PathBuf },

    #[error("I/O error: {msg}")]
    Io { msg: String, path: PathBuf },
}

impl CompileError {
    pub fn unsupported(msg: impl Into<String>, span: Span) -> Self {
        Self::Unsupported { msg: msg.into(), span }
    }

    pub fn arity(msg: impl Into<String>, span: Span) -> Self {
        Self::Arity { msg: msg.into(), span }
    }

    pub fn codegen(msg: impl Into<String>) -> Self {
        Self::Codegen { msg: msg.into() }
    }

    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input { msg: msg.into() }
    }

    pub fn config(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Config { msg: msg.into(), path }
    }

    pub fn io(msg: impl Into<String>, path: PathBuf) -> Self {
        Self::Io { msg: msg.into(), path }
    }

    /// The source span this error points at, if it carries one.
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::Unsupported { span, .. } | CompileError::Arity { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// Prefix the message with the name of the declaration being generated.
    pub fn in_context(self, context: &str) -> Self {
        match self {
            CompileError::Unsupported { msg, span } => CompileError::Unsupported { msg: format!("{context}: {msg}"), span },
            CompileError::Arity { msg, span } => CompileError::Arity { msg: format!("{context}: {msg}"), span },
            CompileError::Codegen { msg } => CompileError::Codegen { msg: format!("{context}: {msg}") },
            other => other,
        }
    }
}

/// Non-fatal findings. Collected alongside the output and logged as they occur.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// Two embedded fields expose the same promoted name; the first one wins.
    AmbiguousPromotion { type_name: String, member: String, kept: String, dropped: String },
    /// The front end did not supply type information for a node the generator needed.
    MissingType { what: String, span: Span },
}

impl std::fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileWarning::AmbiguousPromotion { type_name, member, kept, dropped } => write!(
                f,
                "ambiguous promoted member '{member}' on '{type_name}': using embedded '{kept}', ignoring '{dropped}'"
            ),
            CompileWarning::MissingType { what, span } => {
                write!(f, "missing type information for {what} at {}..{}", span.start, span.end)
            }
        }
    }
}

/// Render a CompileError with ariadne for nice terminal output.
///
/// `source` is the original text of the file the error points into, when the front end
/// shipped it; without it only the message is printed.
pub fn render_error(source: Option<&str>, filename: &str, err: &CompileError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match (err.span(), source) {
        (Some(span), Some(source)) if span.end <= source.len() && !span.is_dummy() => {
            let kind_str = match err {
                CompileError::Unsupported { .. } => "unsupported construct",
                CompileError::Arity { .. } => "arity mismatch",
                _ => "error",
            };
            let msg = match err {
                CompileError::Unsupported { msg, .. } | CompileError::Arity { msg, .. } => msg.clone(),
                other => other.to_string(),
            };
            eprintln!("--> {filename}");
            let printed = Report::build(ReportKind::Error, (), span.start)
                .with_message(kind_str)
                .with_label(Label::new(span.start..span.end).with_message(msg))
                .finish()
                .eprint(Source::from(source));
            if printed.is_err() {
                eprintln!("error: {err}");
            }
        }
        _ => match err {
            CompileError::Config { msg, path } => {
                eprintln!("error[config]: {msg}");
                eprintln!("  --> {}", path.display());
            }
            CompileError::Io { msg, path } => {
                eprintln!("error[io]: {msg}");
                eprintln!("  --> {}", path.display());
            }
            other => eprintln!("error: {other}"),
        },
    }
}
