use super::{reindent, Backend, Fragments, Runner};
use crate::syntax::{Alt, AltMeta, Char, Grammar, Item, Rule, IGNORE};
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

const PYTHON_KEYWORDS: &[&str] = &[
	"False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
	"continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
	"if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
	"try", "while", "with", "yield",
];

/// Python backend: emits rule methods for the packrat runtime carried by
/// the embedded skeleton.
pub struct Python;

impl Backend for Python {
	fn name(&self) -> &'static str {
		"python"
	}

	fn language(&self) -> &'static str {
		"Python"
	}

	fn version(&self) -> &'static str {
		"0.1.0"
	}

	fn keywords(&self) -> &'static [&'static str] {
		PYTHON_KEYWORDS
	}

	fn files(&self) -> Vec<(&'static str, &'static str)> {
		vec![("parser.py", SKELETON)]
	}

	fn required(&self) -> &'static [&'static str] {
		&["entry", "grow_rules", "body"]
	}

	fn generate(&self, grammar: &Grammar, out: &mut Fragments) {
		out.select("grow_rules");
		out.select("body");

		for (i, rule) in grammar.rules.iter().enumerate() {
			if i > 0 {
				out.blank();
			}
			emit_rule(rule, out);
		}
	}

	fn runner(&self, output_files: &[PathBuf]) -> Option<Box<dyn Runner>> {
		let parser = output_files
			.iter()
			.find(|f| f.file_name().map_or(false, |n| n == "parser.py"))?;
		Some(Box::new(PythonRunner {
			parser: parser.clone(),
		}))
	}
}

fn emit_rule(rule: &Rule, out: &mut Fragments) {
	if rule.leftrec.is_some() {
		if rule.head {
			out.put("@_memoize_lr");
		}
	} else {
		out.put("@_memoize");
	}
	out.put(&format!("def _{}(self):", rule.id));
	out.indent();

	if rule.nullable {
		out.put("# Nullable");
	}
	if let Some(leftrec) = &rule.leftrec {
		out.put("# Left recursive:");
		out.put(&format!("#   {}", leftrec));
	}

	if rule.head {
		for i in 1..=rule.expr.alts.len() {
			out.put(&format!(
				"if (alt := self._{}_Alt_{}()) is not None:",
				rule.id, i
			));
			out.indent();
			out.put("return alt");
			out.dedent();
		}
		out.put("return None");
		out.dedent();

		let mut seeds = Vec::new();
		let mut growers = Vec::new();
		for (i, alt) in rule.expr.alts.iter().enumerate() {
			let name = format!("self._{}_Alt_{}", rule.id, i + 1);
			if alt.grower {
				growers.push(name);
			} else {
				seeds.push(name);
			}
		}
		out.select("grow_rules");
		out.put(&format!(
			"\"_{}\": ([{}], [{}]),",
			rule.id,
			seeds.join(", "),
			growers.join(", ")
		));
		out.select("body");

		for (i, alt) in rule.expr.alts.iter().enumerate() {
			out.blank();
			out.put(&format!("def _{}_Alt_{}(self):", rule.id, i + 1));
			out.indent();
			out.put("_begin_pos = self._mark()");
			emit_alt(alt, out);
			out.put("return None");
			out.dedent();
		}
	} else {
		out.put("_begin_pos = self._mark()");
		for alt in &rule.expr.alts {
			emit_alt(alt, out);
		}
		out.put("return None");
		out.dedent();
	}
}

fn emit_alt(alt: &Alt, out: &mut Fragments) {
	let has_cut = alt.items.iter().any(|part| part.cut);
	if has_cut {
		out.put("_cut = [False]");
	}

	let mut variables = Vec::new();
	let mut clauses = Vec::new();
	for part in &alt.items {
		if part.cut {
			clauses.push("self._commit(_cut) is not None".to_string());
		}
		clauses.push(clause(part, &mut variables));
	}

	match clauses.len() {
		0 => out.put("if True:"),
		1 => out.put(&format!("if ({}):", clauses[0])),
		_ => {
			out.put("if (");
			out.indent();
			for (i, c) in clauses.iter().enumerate() {
				if i > 0 {
					out.put(&format!("and {}", c));
				} else {
					out.put(c);
				}
			}
			out.dedent();
			out.put("):");
		}
	}

	out.indent();
	if alt.nullable {
		out.put("# Nullable");
	}
	if !alt.items.is_empty() {
		let shape: Vec<String> = alt.items.iter().map(|p| p.item.to_string()).collect();
		out.put(&format!("# {}", shape.join(" ")));
	}

	match &alt.meta {
		Some(AltMeta::Rule(metarule)) => {
			out.blank();
			if let Some(id) = &metarule.id {
				out.put(&format!("# Metarule: {}", id));
			}
			let indent = "    ".repeat(out.indent_level());
			let body = reindent(metarule.body.trim_matches('\n'), &indent);
			out.put_raw(&body);
			out.put_raw("\n");
		}
		_ => {
			if variables.len() == 1 {
				out.put(&format!("return {}", variables[0]));
			} else {
				out.put(&format!("return [{}]", variables.join(", ")));
			}
		}
	}
	out.dedent();

	out.put("self._reset(_begin_pos)");
	if has_cut {
		out.put("if _cut[0]:");
		out.indent();
		out.put("return None");
		out.dedent();
	}
}

fn clause(part: &crate::syntax::NamedItem, variables: &mut Vec<String>) -> String {
	let atoms = atoms(&part.item);
	let call = if atoms.len() == 1 {
		format!("{}()", atoms[0])
	} else {
		format!("{}({})", atoms[0], atoms[1..].join(", "))
	};

	let name = part
		.name
		.as_ref()
		.map(|n| n.value.as_str())
		.unwrap_or(IGNORE);
	if name == IGNORE {
		format!("{} is not None", call)
	} else {
		variables.push(name.to_string());
		format!("({} := {}) is not None", name, call)
	}
}

/// Flatten an item into a callable and its arguments, composing the
/// runtime combinators for quantifiers and lookahead.
fn atoms(item: &Item) -> Vec<String> {
	use Item::*;
	match item {
		Id(id) => vec![format!("self._{}", id)],
		Char(c) => vec!["self._expectc".to_string(), py_char(c)],
		Literal(lit) => vec!["self._expects".to_string(), py_string(&lit.chars)],
		Class(class) => {
			let mut v = vec!["self._ranges".to_string()];
			for range in &class.ranges {
				let first = range.first;
				let last = range.last.unwrap_or(first);
				v.push(format!("({}, {})", py_char(&first), py_char(&last)));
			}
			v
		}
		Any(_) => vec!["self._expectc".to_string()],
		ZeroOrOne(i) => with_head(&["self._maybe"], atoms(i)),
		ZeroOrMore(i) => with_head(&["self._loop", "False"], atoms(i)),
		OneOrMore(i) => with_head(&["self._loop", "True"], atoms(i)),
		Repetition(rep) => {
			let last = match rep.last {
				Some(n) => n.to_string(),
				None => "None".to_string(),
			};
			with_head(
				&["self._rep", &rep.first.to_string(), &last],
				atoms(&rep.item),
			)
		}
		And(i) => with_head(&["self._lookahead", "True"], atoms(i)),
		Not(i) => with_head(&["self._lookahead", "False"], atoms(i)),
		Expr(_) => unreachable!("nested expressions are desugared before emission"),
	}
}

fn with_head(head: &[&str], tail: Vec<String>) -> Vec<String> {
	head.iter()
		.map(|s| s.to_string())
		.chain(tail.into_iter())
		.collect()
}

fn py_char(c: &Char) -> String {
	match c.as_char() {
		Some('\n') => "'\\n'".to_string(),
		Some('\r') => "'\\r'".to_string(),
		Some('\t') => "'\\t'".to_string(),
		Some('\\') => "'\\\\'".to_string(),
		Some('\'') => "\"'\"".to_string(),
		Some(ch) if !ch.is_control() => format!("'{}'", ch),
		_ if c.code > 0xffff => format!("'\\U{:08x}'", c.code),
		_ => format!("'\\u{:04x}'", c.code),
	}
}

fn py_string(chars: &[Char]) -> String {
	let mut s = String::from("\"");
	for c in chars {
		match c.as_char() {
			Some('\n') => s.push_str("\\n"),
			Some('\r') => s.push_str("\\r"),
			Some('\t') => s.push_str("\\t"),
			Some('\\') => s.push_str("\\\\"),
			Some('"') => s.push_str("\\\""),
			Some(ch) if !ch.is_control() => s.push(ch),
			_ if c.code > 0xffff => s.push_str(&format!("\\U{:08x}", c.code)),
			_ => s.push_str(&format!("\\u{:04x}", c.code)),
		}
	}
	s.push('"');
	s
}

struct PythonRunner {
	parser: PathBuf,
}

impl Runner for PythonRunner {
	fn compile(&mut self) -> io::Result<()> {
		let status = Command::new("python3")
			.args(["-m", "py_compile"])
			.arg(&self.parser)
			.status()?;
		if status.success() {
			Ok(())
		} else {
			Err(io::Error::new(
				io::ErrorKind::Other,
				format!("py_compile failed for {}", self.parser.display()),
			))
		}
	}

	fn run(&mut self, input: &Path) -> io::Result<(String, i32)> {
		let output = Command::new("python3")
			.arg(&self.parser)
			.arg(input)
			.output()?;
		let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
		Ok((stdout, output.status.code().unwrap_or(-1)))
	}

	fn cleanup(&mut self) {
		if let Some(dir) = self.parser.parent() {
			let _ = std::fs::remove_dir_all(dir.join("__pycache__"));
		}
	}
}

/// Skeleton of the generated parser: the packrat runtime with
/// placeholders the emitter fills in.
const SKELETON: &str = r##"# This is automatically generated code, do not edit.
# Generated by Polygen @backend.version { 0.0.0 }
@backend.header {}

from __future__ import annotations

import io
import sys

from functools import wraps


class Token(str):
    def __new__(cls, value, line, start, end, filename=None):
        self = super().__new__(cls, value)
        self.line = line
        self.start = start
        self.end = end
        self.filename = filename
        return self

    @property
    def value(self):
        return str(self)

    def __repr__(self):
        return f"Token({self.value!r}, {self.line}, {self.start}, {self.end})"


class Reader:
    """Produces a stream of characters from a string or UTF-8 stream."""

    def __init__(self, stream, bufsize=4096):
        self.buffer = ""
        self.stream = None
        self.name = None
        self.bufsize = bufsize
        self.eof = False
        self.pointer = 0
        self.line = 1
        self.column = 0

        if isinstance(stream, str):
            self.name = "<string>"
            self.buffer = stream
        elif isinstance(stream, io.IOBase):
            self.name = getattr(stream, 'name', '<stream>')
            self.stream = stream
            if not stream.readable():
                raise ValueError(f"stream must be readable: {self.name}")

    def __iter__(self):
        return self

    def __next__(self):
        try:
            char = self.buffer[self.pointer]
        except IndexError:
            if self.stream:
                self.update()
            try:
                char = self.buffer[self.pointer]
            except IndexError:
                self.eof = True
                raise StopIteration
        tok = Token(char, self.line, self.column, self.column + 1, self.name)
        if char in '\r\n':
            self.line += 1
            self.column = 0
        else:
            self.column += 1
        self.pointer += 1
        return tok

    def update(self, length=1):
        if self.eof:
            return
        self.buffer = self.buffer[self.pointer:]
        self.pointer = 0
        while len(self.buffer) < length:
            data = self.stream.read(self.bufsize)
            if data:
                self.buffer += data
            else:
                self.eof = True
                break


class _MemoEntry:
    def __init__(self, value, pos):
        self.value = value
        self.pos = pos

    def __repr__(self):
        return f"_MemoEntry({self.value}, {self.pos})"


def _memoize(fn):

    @wraps(fn)
    def wrapper(self, *args):
        pos = self._mark()
        key = (fn, args, pos)
        memo = self._memos.get(key)
        if memo is None:
            self._memos[key] = memo = _MemoEntry(fn(self, *args), self._mark())
        else:
            self._reset(memo.pos)
        return memo.value

    return wrapper


def _memoize_lr(fn):

    context = fn.__name__

    @wraps(fn)
    def wrapper(self, *args):
        pos = self._mark()
        key = (fn, args, pos)
        memo = self._memos.get(key)

        # An entry planted during seed growth holds None and must be
        # treated as missing.
        if memo is None or memo.value is None:
            seeds, growers = self._grow_rules[context]

            self._memos[key] = memo = _MemoEntry(None, pos)

            # Plant the seed.
            result = None
            for seed in seeds:
                result = seed()
                if result is not None:
                    break
                self._reset(pos)
            if result is None:
                self._reset(pos)
                return None
            memo.value, memo.pos = result, self._pos

            # Grow while the match still advances.
            while True:
                self._reset(pos)
                result = None
                for alt in growers:
                    result = alt()
                    if result is not None:
                        break
                    self._reset(pos)
                if result is None or self._pos <= memo.pos:
                    self._reset(memo.pos)
                    return memo.value
                memo.value = result
                memo.pos = self._pos

        else:
            self._reset(memo.pos)
            return memo.value

    return wrapper


class Parser:

    def __init__(self, reader):
        self._memos = {}
        self._reader = reader
        self._tokens = []
        self._pos = 0
        self._cut_pos = -1
        self._grow_rules = {
            @backend.grow_rules {}
        }

    @_memoize
    def _expectc(self, char=None):
        tok = self._peek_token()
        if tok is not None:
            if char is None or tok.value == char:
                self._pos += 1
                return tok
        return None

    @_memoize
    def _expects(self, string):
        pos = self._mark()
        for c in string:
            tok = self._peek_token()
            if tok is None or c != tok.value:
                self._reset(pos)
                return None
            self._pos += 1
        reader = self._reader
        return Token(string, reader.line, pos, self._pos, reader.name)

    def _lookahead(self, positive, fn, *args):
        pos = self._mark()
        ok = fn(*args) is not None
        self._reset(pos)
        if ok == positive:
            return []
        return None

    def _loop(self, nonempty, fn, *args):
        pos = lastpos = self._mark()
        tokens = []
        while (tok := fn(*args)) is not None and self._mark() > lastpos:
            tokens.append(tok)
            lastpos = self._mark()
        if len(tokens) >= nonempty:
            return tokens
        self._reset(pos)
        return None

    def _rep(self, beg, end, fn, *args):
        end = beg if end is None else end
        pos = lastpos = self._mark()
        count = 0
        tokens = []
        while (tok := fn(*args)) is not None and self._mark() > lastpos:
            tokens.append(tok)
            lastpos = self._mark()
            count += 1
        if count >= beg and count <= end:
            return tokens
        self._reset(pos)
        return None

    def _ranges(self, *ranges):
        token = self._peek_token()
        if token is None:
            return None
        value = token.value
        for beg, end in ranges:
            if value >= beg and value <= end:
                self._pos += 1
                return token
        return None

    def _maybe(self, fn, *args):
        result = fn(*args)
        return result if result is not None else []

    def _commit(self, flag):
        flag[0] = True
        if self._pos > self._cut_pos:
            self._cut_pos = self._pos
        return []

    def _get_token(self):
        token = self._peek_token()
        self._pos += 1
        return token

    def _peek_token(self):
        if self._pos == len(self._tokens):
            self._tokens.append(next(self._reader, None))
        return self._tokens[self._pos]

    def _mark(self):
        return self._pos

    def _reset(self, pos):
        self._pos = pos

    def parse(self):
        result = self._@backend.entry {}()
        if result is None and self._cut_pos >= 0:
            print(f"parse error at position {self._cut_pos}", file=sys.stderr)
        return result

    @backend.body {}


def main():
    from argparse import ArgumentParser, FileType

    argparser = ArgumentParser()
    argparser.add_argument('input_file', nargs='?',
                           type=FileType('r', encoding='UTF-8'),
                           default=sys.stdin)
    ns = argparser.parse_args()

    reader = Reader(ns.input_file)
    parser = Parser(reader)
    result = parser.parse()

    if result is not None:
        print(repr(result))
        return 0
    return 1


@backend.footer {}
if __name__ == '__main__':
    exit(main())
"##;
