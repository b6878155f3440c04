use source_span::{DefaultMetrics, Position, Span};
use std::{
	fs::File,
	io::{self, BufReader, Read},
	path::{Path, PathBuf},
};
use utf8_decode::UnsafeDecoder;

/// Character metrics used everywhere in the crate.
pub fn metrics() -> DefaultMetrics {
	DefaultMetrics::with_tab_stop(4)
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SourceId(u32);

/// Origin of an AST node: the source it was read from and its span there.
#[derive(Clone, Copy, Debug)]
pub struct Info {
	pub source: SourceId,
	pub span: Span,
}

impl Info {
	pub fn new(source: SourceId, span: Span) -> Info {
		Info { source, span }
	}

	pub fn union(self, other: Info) -> Info {
		Info {
			source: self.source,
			span: self.span.union(other.span),
		}
	}
}

struct Source {
	name: String,
	path: Option<PathBuf>,
	text: String,
	span: Span,
}

/// Registry of every grammar source read during a run.
///
/// The full text of each source is kept so that diagnostics can be
/// rendered with their snippet long after parsing.
pub struct Sources {
	sources: Vec<Source>,
}

impl Sources {
	pub fn new() -> Sources {
		Sources {
			sources: Vec::new(),
		}
	}

	pub fn load_file(&mut self, path: &Path) -> io::Result<SourceId> {
		let file = File::open(path)?;
		let input = BufReader::new(file);
		let text: String = UnsafeDecoder::new(input.bytes()).collect::<io::Result<String>>()?;
		Ok(self.add(
			path.to_string_lossy().into_owned(),
			Some(path.to_path_buf()),
			text,
		))
	}

	pub fn add_string<S: ToString, T: ToString>(&mut self, name: S, text: T) -> SourceId {
		self.add(name.to_string(), None, text.to_string())
	}

	fn add(&mut self, name: String, path: Option<PathBuf>, text: String) -> SourceId {
		let m = metrics();
		let mut span: Span = Position::default().into();
		for c in text.chars() {
			span.push(c, &m);
		}

		let id = SourceId(self.sources.len() as u32);
		self.sources.push(Source {
			name,
			path,
			text,
			span,
		});
		id
	}

	pub fn name(&self, id: SourceId) -> &str {
		&self.sources[id.0 as usize].name
	}

	pub fn path(&self, id: SourceId) -> Option<&Path> {
		self.sources[id.0 as usize].path.as_deref()
	}

	pub fn text(&self, id: SourceId) -> &str {
		&self.sources[id.0 as usize].text
	}

	/// Span covering the whole source.
	pub fn span(&self, id: SourceId) -> Span {
		self.sources[id.0 as usize].span
	}

	pub fn chars(&self, id: SourceId) -> impl Iterator<Item = io::Result<char>> + '_ {
		self.sources[id.0 as usize].text.chars().map(Ok)
	}
}
