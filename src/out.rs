use crate::source::{metrics, Info, Sources};
use source_span::fmt::Style;
use std::fmt;
use std::io;
use yansi::Paint;

/// Diagnostic category, named after the stage that raises it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Kind {
	Lexical,
	Syntax,
	Include,
	Semantic,
	Backend,
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		use self::Kind::*;
		match self {
			Lexical => write!(f, "lexical"),
			Syntax => write!(f, "syntax"),
			Include => write!(f, "include"),
			Semantic => write!(f, "semantic"),
			Backend => write!(f, "backend"),
		}
	}
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Severity {
	Warning,
	Error,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::Warning => write!(f, "{}", Paint::yellow("warning").bold()),
			Self::Error => write!(f, "{}", Paint::red("error").bold()),
		}
	}
}

/// One reported problem, with the origin of the offending node when it
/// has one.
#[derive(Debug)]
pub struct Diagnostic {
	pub severity: Severity,
	pub kind: Kind,
	pub message: String,
	pub info: Option<Info>,
	pub notes: Vec<String>,
}

impl Diagnostic {
	pub fn error<S: ToString>(kind: Kind, message: S, info: Option<Info>) -> Diagnostic {
		Diagnostic {
			severity: Severity::Error,
			kind,
			message: message.to_string(),
			info,
			notes: Vec::new(),
		}
	}

	pub fn warning<S: ToString>(kind: Kind, message: S, info: Option<Info>) -> Diagnostic {
		Diagnostic {
			severity: Severity::Warning,
			kind,
			message: message.to_string(),
			info,
			notes: Vec::new(),
		}
	}

	pub fn note<S: ToString>(mut self, note: S) -> Diagnostic {
		self.notes.push(note.to_string());
		self
	}

	pub fn is_error(&self) -> bool {
		self.severity == Severity::Error
	}
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
	diagnostics.iter().any(Diagnostic::is_error)
}

/// Render a diagnostic as a block: headline, origin, caret-underlined
/// snippet and trailing notes.
pub fn render(diagnostic: &Diagnostic, sources: &Sources) -> io::Result<String> {
	use std::fmt::Write;

	let mut block = String::new();
	let _ = write!(
		block,
		"{}{} {}{} {}\n",
		diagnostic.severity,
		Paint::new(':').bold(),
		Paint::new(&diagnostic.kind).bold(),
		Paint::new(':').bold(),
		Paint::new(&diagnostic.message).bold()
	);

	if let Some(info) = diagnostic.info {
		let position = info.span.start();
		let _ = write!(
			block,
			"  --> {}:{}:{}\n",
			sources.name(info.source),
			position.line + 1,
			position.column + 1
		);

		let style = match diagnostic.severity {
			Severity::Error => Style::Error,
			Severity::Warning => Style::Warning,
		};
		let mut fmt = source_span::fmt::Formatter::new();
		fmt.add(info.span, None, style);
		let m = metrics();
		let formatted = fmt.render(sources.chars(info.source), sources.span(info.source), &m)?;
		let _ = write!(block, "{}", formatted);
	}

	for note in &diagnostic.notes {
		for (i, line) in note.lines().enumerate() {
			if i == 0 {
				let _ = write!(block, "  = {}: {}\n", Paint::new("note").bold(), line);
			} else {
				let _ = write!(block, "    {}\n", line);
			}
		}
	}

	Ok(block)
}
