use clap::{Arg, ArgAction, Command};
use polygen::{gen, out, Sources};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn main() {
	let matches = Command::new("polygen")
		.version(polygen::VERSION)
		.about("Packrat parser generator for extended parsing expression grammars")
		.arg(
			Arg::new("verbose")
				.short('v')
				.action(ArgAction::Count)
				.global(true)
				.help("Increase log verbosity"),
		)
		.subcommand_required(true)
		.arg_required_else_help(true)
		.subcommand(
			Command::new("generate")
				.about("Generate a parser from a grammar file")
				.arg(
					Arg::new("FILE")
						.required(true)
						.value_parser(clap::value_parser!(PathBuf))
						.help("Grammar file"),
				)
				.arg(
					Arg::new("backend")
						.short('b')
						.long("backend")
						.required(true)
						.help("Code generation backend"),
				)
				.arg(
					Arg::new("output")
						.short('o')
						.long("output")
						.default_value(".")
						.value_parser(clap::value_parser!(PathBuf))
						.help("Output directory"),
				)
				.arg(
					Arg::new("define")
						.short('d')
						.long("define")
						.action(ArgAction::Append)
						.help("Skeleton definition override, as name=value"),
				)
				.arg(
					Arg::new("include")
						.short('I')
						.long("include")
						.action(ArgAction::Append)
						.value_parser(clap::value_parser!(PathBuf))
						.help("Additional include lookup directory"),
				),
		)
		.subcommand(
			Command::new("test")
				.about("Run the backend equivalency suite")
				.arg(
					Arg::new("backend")
						.short('b')
						.long("backend")
						.required(true)
						.help("Backend under test"),
				)
				.arg(
					Arg::new("suite")
						.long("suite")
						.default_value("equivalency")
						.value_parser(clap::value_parser!(PathBuf))
						.help("Directory holding the suite cases"),
				),
		)
		.get_matches();

	let verbosity = matches.get_count("verbose") as usize;
	stderrlog::new().verbosity(verbosity).init().ok();

	let code = match matches.subcommand() {
		Some(("generate", m)) => generate(m),
		Some(("test", m)) => equivalency(m),
		_ => 2,
	};
	std::process::exit(code)
}

fn backend_by_name(name: &str) -> Option<&'static dyn gen::Backend> {
	let backend = gen::find(name);
	if backend.is_none() {
		eprintln!("unknown backend `{}`", name);
		eprintln!("available backends:");
		for b in gen::backends() {
			eprintln!("  {} ({} {})", b.name(), b.language(), b.version());
		}
	}
	backend
}

fn report(diagnostics: &[out::Diagnostic], sources: &Sources) {
	for diagnostic in diagnostics {
		match out::render(diagnostic, sources) {
			Ok(block) => eprintln!("{}", block),
			Err(e) => eprintln!("{}", e),
		}
	}
}

fn generate(matches: &clap::ArgMatches) -> i32 {
	let grammar_file: &PathBuf = matches.get_one("FILE").unwrap();
	let backend_name: &String = matches.get_one("backend").unwrap();
	let out_dir: &PathBuf = matches.get_one("output").unwrap();

	let backend = match backend_by_name(backend_name) {
		Some(backend) => backend,
		None => return 1,
	};

	let lookup_dirs: Vec<PathBuf> = matches
		.get_many::<PathBuf>("include")
		.into_iter()
		.flatten()
		.cloned()
		.collect();

	let mut sources = Sources::new();

	log::info!("parsing grammar...");
	let compiled = match polygen::compile_file(&mut sources, grammar_file, &lookup_dirs, backend) {
		Ok(compiled) => compiled,
		Err(diagnostics) => {
			report(&diagnostics, &sources);
			return 1;
		}
	};
	report(&compiled.warnings, &sources);

	let mut defs = compiled.defs;
	for definition in matches
		.get_many::<String>("define")
		.into_iter()
		.flatten()
	{
		match definition.split_once('=') {
			Some((name, value)) => {
				defs.retain(|(n, _)| n != name);
				defs.push((name.to_string(), value.to_string()));
			}
			None => {
				eprintln!("malformed definition `{}`, expected name=value", definition);
				return 1;
			}
		}
	}

	log::info!("generating {} parser...", backend.language());
	let outputs = match gen::generate(&compiled.grammar, backend, &defs) {
		Ok(outputs) => outputs,
		Err(diagnostics) => {
			report(&diagnostics, &sources);
			return 1;
		}
	};

	if let Err(e) = write_outputs(&outputs, out_dir) {
		eprintln!("{}", e);
		return 1;
	}
	0
}

fn write_outputs(outputs: &[(String, String)], out_dir: &Path) -> io::Result<Vec<PathBuf>> {
	fs::create_dir_all(out_dir)?;
	let mut written = Vec::new();
	for (name, content) in outputs {
		let path = out_dir.join(name);
		log::info!("writing {}", path.display());
		let mut file = fs::File::create(&path)?;
		file.write_all(content.as_bytes())?;
		written.push(path);
	}
	Ok(written)
}

/// Drive the backend's runner over every case of the suite directory.
///
/// A case is a directory with a `grammar.peg`, input files `*.input` and
/// matching `*.expected` files holding the output the generated parser
/// must print.
fn equivalency(matches: &clap::ArgMatches) -> i32 {
	let backend_name: &String = matches.get_one("backend").unwrap();
	let suite: &PathBuf = matches.get_one("suite").unwrap();

	let backend = match backend_by_name(backend_name) {
		Some(backend) => backend,
		None => return 1,
	};

	let mut cases: Vec<PathBuf> = match fs::read_dir(suite) {
		Ok(entries) => entries
			.filter_map(|e| e.ok())
			.map(|e| e.path())
			.filter(|p| p.is_dir())
			.collect(),
		Err(e) => {
			eprintln!("cannot read suite directory `{}`: {}", suite.display(), e);
			return 1;
		}
	};
	cases.sort();

	let mut failures = 0;
	for case in &cases {
		match run_case(case, backend) {
			Ok(true) => println!("{}: ok", case.display()),
			Ok(false) => {
				println!("{}: FAILED", case.display());
				failures += 1;
			}
			Err(e) => {
				println!("{}: error: {}", case.display(), e);
				failures += 1;
			}
		}
	}

	if failures > 0 {
		println!("{} of {} cases failed", failures, cases.len());
		1
	} else {
		println!("{} cases passed", cases.len());
		0
	}
}

fn run_case(case: &Path, backend: &dyn gen::Backend) -> io::Result<bool> {
	let grammar_file = case.join("grammar.peg");
	let mut sources = Sources::new();

	let compiled = match polygen::compile_file(&mut sources, &grammar_file, &[], backend) {
		Ok(compiled) => compiled,
		Err(diagnostics) => {
			report(&diagnostics, &sources);
			return Ok(false);
		}
	};

	let outputs = match gen::generate(&compiled.grammar, backend, &compiled.defs) {
		Ok(outputs) => outputs,
		Err(diagnostics) => {
			report(&diagnostics, &sources);
			return Ok(false);
		}
	};

	let work = std::env::temp_dir().join(format!(
		"polygen-{}-{}",
		std::process::id(),
		case.file_name().and_then(|n| n.to_str()).unwrap_or("case")
	));
	let written = write_outputs(&outputs, &work)?;

	let mut runner = match backend.runner(&written) {
		Some(runner) => runner,
		None => {
			eprintln!("backend `{}` provides no runner", backend.name());
			return Ok(false);
		}
	};
	runner.compile()?;

	let mut ok = true;
	let mut inputs: Vec<PathBuf> = fs::read_dir(case)?
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|p| p.extension().map_or(false, |x| x == "input"))
		.collect();
	inputs.sort();

	for input in inputs {
		let expected_file = input.with_extension("expected");
		let expected = fs::read_to_string(&expected_file)?;
		let (stdout, code) = runner.run(&input)?;
		if code != 0 || stdout.trim_end() != expected.trim_end() {
			println!(
				"  {}: exit {}, output mismatch",
				input.display(),
				code
			);
			ok = false;
		}
	}

	runner.cleanup();
	let _ = fs::remove_dir_all(&work);
	Ok(ok)
}
