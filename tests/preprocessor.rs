use indoc::indoc;
use polygen::out::Diagnostic;
use polygen::preprocessor::{self, Processed};
use polygen::Sources;
use std::fs;
use std::path::PathBuf;

fn process(text: &str, backend: &str) -> Processed {
	let mut sources = Sources::new();
	preprocessor::process_string(&mut sources, "<test>", text, &[], backend)
		.unwrap_or_else(|diagnostics| panic!("preprocessing failed: {:?}", diagnostics))
}

fn process_err(text: &str, backend: &str) -> Vec<Diagnostic> {
	let mut sources = Sources::new();
	match preprocessor::process_string(&mut sources, "<test>", text, &[], backend) {
		Ok(_) => panic!("expected preprocessing to fail"),
		Err(diagnostics) => diagnostics,
	}
}

/// Scratch directory for tests that need real files.
struct Workdir {
	root: PathBuf,
}

impl Workdir {
	fn new(tag: &str) -> Workdir {
		let root = std::env::temp_dir().join(format!("polygen-pre-{}-{}", tag, std::process::id()));
		fs::create_dir_all(&root).unwrap();
		Workdir { root }
	}

	fn write(&self, name: &str, content: &str) -> PathBuf {
		let path = self.root.join(name);
		fs::write(&path, content).unwrap();
		path
	}
}

impl Drop for Workdir {
	fn drop(&mut self) {
		let _ = fs::remove_dir_all(&self.root);
	}
}

#[test]
fn toplevel_query_fires_in_the_first_file() {
	let processed = process(
		indoc! {r"
			@toplevel {
			    @entry Main
			}
			Main <- 'm'
		"},
		"python",
	);

	let index = processed.grammar.rule_index("Main").unwrap();
	assert!(processed.grammar.rules[index].entry);
}

#[test]
fn toplevel_query_is_dropped_in_included_files() {
	let dir = Workdir::new("toplevel");
	dir.write(
		"lib.peg",
		indoc! {r"
			@toplevel {
			    @entry Main
			}
			Main <- 'm'
		"},
	);
	let root = dir.write(
		"root.peg",
		indoc! {r#"
			@include "lib.peg"
			@entry Start
			Start <- Main
		"#},
	);

	let mut sources = Sources::new();
	let processed = preprocessor::process_file(&mut sources, &root, &[], "python")
		.unwrap_or_else(|diagnostics| panic!("preprocessing failed: {:?}", diagnostics));

	let grammar = &processed.grammar;
	let start = grammar.rule_index("Start").unwrap();
	let main = grammar.rule_index("Main").unwrap();
	assert!(grammar.rules[start].entry);
	assert!(!grammar.rules[main].entry);
}

#[test]
fn include_merges_rules() {
	let dir = Workdir::new("include");
	dir.write("digits.peg", "Digit <- [0-9]\n");
	let root = dir.write(
		"root.peg",
		indoc! {r#"
			@include "digits.peg"
			@entry
			Number <- Digit+
		"#},
	);

	let mut sources = Sources::new();
	let processed = preprocessor::process_file(&mut sources, &root, &[], "python").unwrap();
	assert!(processed.grammar.rule_index("Digit").is_some());
	assert!(processed.grammar.rule_index("Number").is_some());
}

#[test]
fn circular_include_is_reported() {
	let dir = Workdir::new("cycle");
	dir.write("a.peg", "@include \"b.peg\"\nA <- 'a'\n");
	dir.write("b.peg", "@include \"a.peg\"\nB <- 'b'\n");
	let root = dir.root.join("a.peg");

	let mut sources = Sources::new();
	let diagnostics = preprocessor::process_file(&mut sources, &root, &[], "python")
		.expect_err("expected a cycle error");
	assert!(diagnostics.iter().any(|d| d.message.contains("circular include")));
}

#[test]
fn missing_include_is_reported() {
	let diagnostics = process_err("@include \"nowhere.peg\"\nA <- 'a'\n", "python");
	assert!(diagnostics.iter().any(|d| d.message.contains("include path not found")));
}

#[test]
fn backend_query_matches_the_configured_backend() {
	let text = indoc! {r"
		@entry
		Main <- 'm'
		@backend(python) {
		    Extra <- 'e'
		}
	"};

	let processed = process(text, "python");
	assert!(processed.grammar.rule_index("Extra").is_some());

	let processed = process(text, "c");
	assert!(processed.grammar.rule_index("Extra").is_none());
}

#[test]
fn duplicate_entry_directive_is_reported() {
	let diagnostics = process_err(
		indoc! {r"
			@entry A
			@entry B
			A <- 'a'
			B <- 'b'
		"},
		"python",
	);
	assert!(diagnostics.iter().any(|d| d.message.contains("duplicate `@entry`")));
}

#[test]
fn unknown_entry_rule_is_reported() {
	let diagnostics = process_err("@entry Missing\nA <- 'a'\n", "python");
	assert!(diagnostics.iter().any(|d| d.message.contains("no rule named `Missing`")));
}

#[test]
fn unknown_ignore_rule_is_reported() {
	let diagnostics = process_err("@ignore { Missing }\n@entry\nA <- 'a'\n", "python");
	assert!(diagnostics.iter().any(|d| d.message.contains("no rule named `Missing`")));
}

#[test]
fn ignore_marks_rules_across_includes() {
	let dir = Workdir::new("ignore");
	dir.write("space.peg", "Space <- ' '\n");
	let root = dir.write(
		"root.peg",
		indoc! {r#"
			@include "space.peg"
			@ignore { Space }
			@entry
			Main <- 'm' Space
		"#},
	);

	let mut sources = Sources::new();
	let processed = preprocessor::process_file(&mut sources, &root, &[], "python").unwrap();
	let space = processed.grammar.rule_index("Space").unwrap();
	assert!(processed.grammar.rules[space].ignore);
}

#[test]
fn backend_defs_are_collected_in_order() {
	let processed = process(
		indoc! {r"
			@backend.header { import sys }
			@entry
			Main <- 'm'
			@backend.footer { cleanup() }
			@backend.header { import os }
		"},
		"python",
	);

	let defs: Vec<(&str, &str)> = processed
		.defs
		.iter()
		.map(|(n, b)| (n.as_str(), b.trim()))
		.collect();
	assert_eq!(
		defs,
		vec![
			("header", "import sys"),
			("footer", "cleanup()"),
			("header", "import os"),
		]
	);
}

#[test]
fn nested_query_inside_unselected_block_never_fires() {
	let processed = process(
		indoc! {r"
			@entry
			Main <- 'm'
			@backend(c) {
			    @toplevel {
			        @entry Other
			    }
			    Other <- 'o'
			}
		"},
		"python",
	);

	assert!(processed.grammar.rule_index("Other").is_none());
	let main = processed.grammar.rule_index("Main").unwrap();
	assert!(processed.grammar.rules[main].entry);
}
