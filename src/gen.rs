use crate::out::{has_errors, Diagnostic, Kind};
use crate::syntax::Grammar;
use once_cell::sync::Lazy;
use std::io;
use std::path::{Path, PathBuf};

pub mod python;
pub mod skeleton;

/// Named fragment buffers the backend emits into. Fragments are merged
/// into the skeleton by the postprocessor, keyed by placeholder name.
pub struct Fragments {
	buffers: Vec<(String, String)>,
	current: Option<usize>,
	indent: usize,
}

impl Fragments {
	pub fn new() -> Fragments {
		Fragments {
			buffers: Vec::new(),
			current: None,
			indent: 0,
		}
	}

	fn index(&mut self, name: &str) -> usize {
		match self.buffers.iter().position(|(n, _)| n == name) {
			Some(i) => i,
			None => {
				self.buffers.push((name.to_string(), String::new()));
				self.buffers.len() - 1
			}
		}
	}

	/// Direct subsequent `put` calls into the named buffer.
	pub fn select(&mut self, name: &str) {
		let i = self.index(name);
		self.current = Some(i);
	}

	pub fn append(&mut self, name: &str, text: &str) {
		let i = self.index(name);
		self.buffers[i].1.push_str(text);
	}

	/// Write one line into the current buffer, indented. An empty line
	/// carries no indentation.
	pub fn put(&mut self, line: &str) {
		let indent = self.indent;
		if let Some(i) = self.current {
			let buffer = &mut self.buffers[i].1;
			if !line.is_empty() {
				for _ in 0..indent {
					buffer.push_str("    ");
				}
				buffer.push_str(line);
			}
			buffer.push('\n');
		}
	}

	pub fn put_raw(&mut self, text: &str) {
		if let Some(i) = self.current {
			self.buffers[i].1.push_str(text);
		}
	}

	pub fn blank(&mut self) {
		self.put("");
	}

	pub fn indent(&mut self) {
		self.indent += 1;
	}

	pub fn dedent(&mut self) {
		if self.indent > 0 {
			self.indent -= 1;
		}
	}

	pub fn indent_level(&self) -> usize {
		self.indent
	}

	pub fn get(&self, name: &str) -> Option<&str> {
		self.buffers
			.iter()
			.find(|(n, _)| n == name)
			.map(|(_, text)| text.as_str())
	}
}

/// Code-generation target: templates for the packrat machinery plus the
/// conventions for metanames and semantic action bodies.
pub trait Backend {
	fn name(&self) -> &'static str;
	fn language(&self) -> &'static str;
	fn version(&self) -> &'static str;

	/// Reserved words of the target language, avoided by metaname
	/// deduction.
	fn keywords(&self) -> &'static [&'static str];

	/// Output files: `(file name, skeleton text)`.
	fn files(&self) -> Vec<(&'static str, &'static str)>;

	/// Fragment names every skeleton must consume.
	fn required(&self) -> &'static [&'static str];

	fn generate(&self, grammar: &Grammar, out: &mut Fragments);

	/// Execution hook for the equivalency harness, given the generated
	/// output files.
	fn runner(&self, output_files: &[PathBuf]) -> Option<Box<dyn Runner>>;
}

/// Compiles and runs a generated parser for the equivalency harness.
pub trait Runner {
	fn compile(&mut self) -> io::Result<()>;
	fn run(&mut self, input: &Path) -> io::Result<(String, i32)>;
	fn cleanup(&mut self);
}

/// Backend registry, populated at startup and addressed by name.
static REGISTRY: Lazy<Vec<Box<dyn Backend + Send + Sync>>> =
	Lazy::new(|| vec![Box::new(python::Python)]);

pub fn find(name: &str) -> Option<&'static dyn Backend> {
	backends().find(|b| b.name() == name)
}

pub fn backends() -> impl Iterator<Item = &'static dyn Backend> {
	REGISTRY.iter().map(|b| {
		let backend: &'static dyn Backend = b.as_ref();
		backend
	})
}

/// Emit the grammar through the backend and merge the fragments into its
/// skeletons. Returns `(file name, content)` pairs for the driver to
/// write.
pub fn generate(
	grammar: &Grammar,
	backend: &dyn Backend,
	defs: &[(String, String)],
) -> Result<Vec<(String, String)>, Vec<Diagnostic>> {
	let mut diagnostics = Vec::new();

	let entry = match grammar.entry_rule() {
		Some(rule) => rule.id.value.clone(),
		None => {
			diagnostics.push(Diagnostic::error(
				Kind::Backend,
				"grammar has no resolved entry rule",
				None,
			));
			return Err(diagnostics);
		}
	};

	let mut fragments = Fragments::new();
	fragments.select("version");
	fragments.put(env!("CARGO_PKG_VERSION"));
	fragments.select("generator");
	fragments.put(backend.name());
	fragments.select("gen_version");
	fragments.put(backend.version());
	fragments.select("entry");
	fragments.put(&entry);
	fragments.select("header");
	fragments.select("footer");

	for (name, body) in defs {
		let mut text = reindent(body, "");
		text.push('\n');
		fragments.append(name, &text);
	}

	log::info!("emitting {} fragments", backend.language());
	backend.generate(grammar, &mut fragments);

	let mut outputs = Vec::new();
	for (filename, skeleton_text) in backend.files() {
		for required in backend.required() {
			if !skeleton::mentions(skeleton_text, required) {
				diagnostics.push(Diagnostic::error(
					Kind::Backend,
					format!(
						"skeleton for `{}` is missing the `@backend.{}` placeholder",
						filename, required
					),
					None,
				));
			}
		}
		outputs.push((
			filename.to_string(),
			skeleton::process(skeleton_text, &fragments),
		));
	}

	if has_errors(&diagnostics) {
		Err(diagnostics)
	} else {
		Ok(outputs)
	}
}

/// Align a multiline block to the given indentation, preserving the
/// block's internal relative indentation. Space-indented text only.
pub fn reindent(text: &str, indent: &str) -> String {
	let lines: Vec<&str> = text.lines().collect();
	let common = lines
		.iter()
		.filter(|line| !line.trim().is_empty())
		.map(|line| line.len() - line.trim_start_matches(' ').len())
		.min()
		.unwrap_or(0);

	let mut out = String::new();
	for (i, line) in lines.iter().enumerate() {
		if i > 0 {
			out.push('\n');
		}
		if !line.trim().is_empty() {
			out.push_str(indent);
			out.push_str(&line[common.min(line.len())..]);
		}
	}
	out
}
