use crate::out::{has_errors, Diagnostic, Kind};
use crate::source::{Info, Sources};
use crate::syntax::{self, Directive, Grammar, Id};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Result of preprocessing: the flattened grammar plus the
/// `@backend.<name>` bodies collected for the emitter, in encounter
/// order.
#[derive(Debug)]
pub struct Processed {
	pub grammar: Grammar,
	pub defs: Vec<(String, String)>,
	pub warnings: Vec<Diagnostic>,
}

pub fn process_file(
	sources: &mut Sources,
	path: &Path,
	lookup_dirs: &[PathBuf],
	backend: &str,
) -> Result<Processed, Vec<Diagnostic>> {
	let mut pre = Preprocessor::new(sources, lookup_dirs, backend);
	let grammar = pre.load(path, None, true);
	pre.finish(grammar)
}

/// Preprocess an in-memory grammar. Includes are resolved through the
/// lookup directories only.
pub fn process_string(
	sources: &mut Sources,
	name: &str,
	text: &str,
	lookup_dirs: &[PathBuf],
	backend: &str,
) -> Result<Processed, Vec<Diagnostic>> {
	let mut pre = Preprocessor::new(sources, lookup_dirs, backend);
	let id = pre.sources.add_string(name, text);
	let grammar = pre.parse(text, id).map(|mut grammar| {
		pre.walk(&mut grammar, None, true);
		grammar
	});
	pre.finish(grammar)
}

struct Preprocessor<'a> {
	sources: &'a mut Sources,
	lookup_dirs: &'a [PathBuf],
	backend: &'a str,
	defs: Vec<(String, String)>,
	entries: Vec<(Id, Option<Info>)>,
	ignores: Vec<(Id, Option<Info>)>,
	stack: Vec<PathBuf>,
	included: std::collections::HashSet<PathBuf>,
	diagnostics: Vec<Diagnostic>,
}

impl<'a> Preprocessor<'a> {
	fn new(sources: &'a mut Sources, lookup_dirs: &'a [PathBuf], backend: &'a str) -> Self {
		Preprocessor {
			sources,
			lookup_dirs,
			backend,
			defs: Vec::new(),
			entries: Vec::new(),
			ignores: Vec::new(),
			stack: Vec::new(),
			included: std::collections::HashSet::new(),
			diagnostics: Vec::new(),
		}
	}

	fn parse(&mut self, text: &str, id: crate::source::SourceId) -> Option<Grammar> {
		match syntax::parse(text, id) {
			Ok(grammar) => Some(grammar),
			Err(e) => {
				let info = Info::new(id, e.span());
				self.diagnostics
					.push(Diagnostic::error(Kind::Syntax, e.as_ref(), Some(info)));
				None
			}
		}
	}

	/// Read, parse and preprocess one grammar file. Only the first file
	/// of the run carries the toplevel flag; included files never do.
	fn load(&mut self, path: &Path, origin: Option<Info>, toplevel: bool) -> Option<Grammar> {
		let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
		if self.stack.contains(&canonical) {
			self.diagnostics.push(Diagnostic::error(
				Kind::Include,
				format!("circular include of `{}`", path.display()),
				origin,
			));
			return None;
		}
		// A file reached through two include chains is taken once.
		if !self.included.insert(canonical.clone()) {
			log::info!("already included {}", path.display());
			return None;
		}

		log::info!("reading {}", path.display());
		let id = match self.sources.load_file(path) {
			Ok(id) => id,
			Err(e) => {
				self.diagnostics.push(Diagnostic::error(
					Kind::Include,
					format!("cannot read `{}`: {}", path.display(), e),
					origin,
				));
				return None;
			}
		};

		let text = self.sources.text(id).to_string();
		let mut grammar = self.parse(&text, id)?;

		self.stack.push(canonical);
		self.walk(&mut grammar, path.parent(), toplevel);
		self.stack.pop();
		Some(grammar)
	}

	/// Resolve the directives of a grammar in order, inlining included
	/// and queried subgrammars as they are encountered.
	fn walk(&mut self, grammar: &mut Grammar, dir: Option<&Path>, toplevel: bool) {
		let mut queue: VecDeque<Directive> = std::mem::take(&mut grammar.directives).into();

		while let Some(directive) = queue.pop_front() {
			match directive {
				Directive::Include { path, info } => match self.resolve_include(&path, dir) {
					Some(file) => {
						if let Some(sub) = self.load(&file, info, false) {
							grammar.rules.extend(sub.rules);
							grammar.metarules.extend(sub.metarules);
						}
					}
					None => {
						self.diagnostics.push(Diagnostic::error(
							Kind::Include,
							format!("include path not found: `{}`", path),
							info,
						));
					}
				},
				Directive::Entry { id, info } => self.entries.push((id, info)),
				Directive::Ignore { ids, info } => {
					for id in ids {
						self.ignores.push((id, info));
					}
				}
				Directive::Toplevel { grammar: sub, .. } => {
					if toplevel {
						Self::splice(grammar, sub, &mut queue);
					}
				}
				Directive::Backend {
					name, grammar: sub, ..
				} => {
					if name.value == self.backend {
						Self::splice(grammar, sub, &mut queue);
					}
				}
				Directive::BackendDef { name, body, .. } => {
					self.defs.push((name.value, body));
				}
			}
		}
	}

	/// Inline a queried subgrammar: its rules and metarules join the
	/// current grammar, its directives are processed next, in order.
	fn splice(grammar: &mut Grammar, sub: Grammar, queue: &mut VecDeque<Directive>) {
		grammar.rules.extend(sub.rules);
		grammar.metarules.extend(sub.metarules);
		for directive in sub.directives.into_iter().rev() {
			queue.push_front(directive);
		}
	}

	fn resolve_include(&self, path: &str, dir: Option<&Path>) -> Option<PathBuf> {
		let p = Path::new(path);
		if p.is_absolute() {
			return p.exists().then(|| p.to_path_buf());
		}
		if let Some(dir) = dir {
			let candidate = dir.join(p);
			if candidate.exists() {
				return Some(candidate);
			}
		}
		for dir in self.lookup_dirs {
			let candidate = dir.join(p);
			if candidate.exists() {
				return Some(candidate);
			}
		}
		p.exists().then(|| p.to_path_buf())
	}

	/// Apply the deferred `@entry` and `@ignore` directives to the merged
	/// grammar and wrap up.
	fn finish(mut self, grammar: Option<Grammar>) -> Result<Processed, Vec<Diagnostic>> {
		let mut grammar = match grammar {
			Some(grammar) if !has_errors(&self.diagnostics) => grammar,
			_ => return Err(self.diagnostics),
		};

		let entries = std::mem::take(&mut self.entries);
		for (i, (id, info)) in entries.iter().enumerate() {
			if i > 0 {
				self.diagnostics.push(Diagnostic::error(
					Kind::Semantic,
					format!("duplicate `@entry` directive for `{}`", id),
					*info,
				));
				continue;
			}
			match grammar.rule_index(&id.value) {
				Some(index) => grammar.rules[index].entry = true,
				None => {
					self.diagnostics.push(Diagnostic::error(
						Kind::Semantic,
						format!("no rule named `{}` for `@entry`", id),
						*info,
					));
				}
			}
		}

		let ignores = std::mem::take(&mut self.ignores);
		for (id, info) in ignores {
			match grammar.rule_index(&id.value) {
				Some(index) => grammar.rules[index].ignore = true,
				None => {
					self.diagnostics.push(Diagnostic::error(
						Kind::Semantic,
						format!("no rule named `{}` for `@ignore`", id),
						info,
					));
				}
			}
		}

		if has_errors(&self.diagnostics) {
			Err(self.diagnostics)
		} else {
			Ok(Processed {
				grammar,
				defs: self.defs,
				warnings: self.diagnostics,
			})
		}
	}
}
