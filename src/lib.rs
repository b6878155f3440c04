pub mod charset;
pub mod gen;
pub mod modifier;
pub mod out;
pub mod preprocessor;
pub mod source;
pub mod syntax;

pub use charset::CharSet;
pub use source::{Info, SourceId, Sources};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

use out::Diagnostic;
use std::path::{Path, PathBuf};

/// A grammar that went through the preprocessor and the modifier, ready
/// for emission.
pub struct Compiled {
	pub grammar: syntax::Grammar,
	pub defs: Vec<(String, String)>,
	pub warnings: Vec<Diagnostic>,
}

pub fn compile_file(
	sources: &mut Sources,
	grammar_file: &Path,
	lookup_dirs: &[PathBuf],
	backend: &dyn gen::Backend,
) -> Result<Compiled, Vec<Diagnostic>> {
	let processed = preprocessor::process_file(sources, grammar_file, lookup_dirs, backend.name())?;
	finish(processed, backend)
}

pub fn compile_string(
	sources: &mut Sources,
	name: &str,
	grammar: &str,
	lookup_dirs: &[PathBuf],
	backend: &dyn gen::Backend,
) -> Result<Compiled, Vec<Diagnostic>> {
	let processed =
		preprocessor::process_string(sources, name, grammar, lookup_dirs, backend.name())?;
	finish(processed, backend)
}

fn finish(
	processed: preprocessor::Processed,
	backend: &dyn gen::Backend,
) -> Result<Compiled, Vec<Diagnostic>> {
	let mut grammar = processed.grammar;
	let mut warnings = processed.warnings;

	match modifier::apply(&mut grammar, backend.keywords()) {
		Ok(more) => warnings.extend(more),
		Err(mut diagnostics) => {
			warnings.append(&mut diagnostics);
			return Err(warnings);
		}
	}

	Ok(Compiled {
		grammar,
		defs: processed.defs,
		warnings,
	})
}
