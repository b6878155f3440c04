use indoc::indoc;
use polygen::syntax::{self, AltMeta, Directive, Grammar, Item};
use polygen::Sources;

fn parse(text: &str) -> Grammar {
	let mut sources = Sources::new();
	let id = sources.add_string("<test>", text);
	match syntax::parse(text, id) {
		Ok(grammar) => grammar,
		Err(e) => panic!("parse failed: {} at {:?}", e.as_ref(), e.span()),
	}
}

fn parse_err(text: &str) -> String {
	let mut sources = Sources::new();
	let id = sources.add_string("<test>", text);
	match syntax::parse(text, id) {
		Ok(_) => panic!("expected a parse failure"),
		Err(e) => e.as_ref().to_string(),
	}
}

#[test]
fn minimal_grammar() {
	let grammar = parse(indoc! {r#"
		@entry
		Number <- Digit+ $int
		Digit  <- [0-9]

		$int { return join(digits) }
	"#});

	assert_eq!(grammar.rules.len(), 2);
	assert!(grammar.rules[0].entry);
	assert_eq!(grammar.rules[0].id.value, "Number");
	assert_eq!(grammar.rules[1].id.value, "Digit");
	assert_eq!(grammar.metarules.len(), 1);
	assert_eq!(grammar.metarules[0].body.trim(), "return join(digits)");

	let alt = &grammar.rules[0].expr.alts[0];
	assert_eq!(alt.items.len(), 1);
	assert!(matches!(&alt.items[0].item, Item::OneOrMore(_)));
	match &alt.meta {
		Some(AltMeta::Ref(r)) => assert_eq!(r.name.value, "int"),
		other => panic!("expected a metarule reference, got {:?}", other),
	}
}

#[test]
fn single_char_literal_is_a_char() {
	let grammar = parse("A <- 'x'\n");
	match &grammar.rules[0].expr.alts[0].items[0].item {
		Item::Char(c) => assert_eq!(c.code, 'x' as u32),
		other => panic!("expected a char, got {:?}", other),
	}
}

#[test]
fn multi_char_literal_is_a_string() {
	let grammar = parse("A <- \"abc\"\n");
	match &grammar.rules[0].expr.alts[0].items[0].item {
		Item::Literal(lit) => assert_eq!(lit.text(), vec!['a', 'b', 'c']),
		other => panic!("expected a literal, got {:?}", other),
	}
}

#[test]
fn escapes() {
	let grammar = parse(r"A <- '\n' '\t' '\]' '\\' '\101' 'A' '\0'");
	let items = &grammar.rules[0].expr.alts[0].items;
	let codes: Vec<u32> = items
		.iter()
		.map(|part| match &part.item {
			Item::Char(c) => c.code,
			other => panic!("expected a char, got {:?}", other),
		})
		.collect();
	assert_eq!(
		codes,
		vec!['\n' as u32, '\t' as u32, ']' as u32, '\\' as u32, 0o101, 0x41, 0]
	);
}

#[test]
fn class_ranges() {
	let grammar = parse("A <- [a-zA-Z_]\n");
	match &grammar.rules[0].expr.alts[0].items[0].item {
		Item::Class(class) => {
			assert_eq!(class.ranges.len(), 3);
			assert_eq!(class.ranges[0].first.code, 'a' as u32);
			assert_eq!(class.ranges[0].last.unwrap().code, 'z' as u32);
			assert!(class.ranges[2].last.is_none());
		}
		other => panic!("expected a class, got {:?}", other),
	}
}

#[test]
fn class_trailing_dash_is_literal() {
	// The dash cannot open a range right before the closing bracket.
	let grammar = parse("A <- [0-9_-]\n");
	match &grammar.rules[0].expr.alts[0].items[0].item {
		Item::Class(class) => {
			assert_eq!(class.ranges.len(), 3);
			assert_eq!(class.ranges[0].first.code, '0' as u32);
			assert_eq!(class.ranges[0].last.unwrap().code, '9' as u32);
			assert_eq!(class.ranges[1].first.code, '_' as u32);
			assert!(class.ranges[1].last.is_none());
			assert_eq!(class.ranges[2].first.code, '-' as u32);
			assert!(class.ranges[2].last.is_none());
		}
		other => panic!("expected a class, got {:?}", other),
	}
}

#[test]
fn part_prefixes_and_suffixes() {
	let grammar = parse("A <- ^ name:!B? _:C* . &(D 'x'){2,3}\n");
	let items = &grammar.rules[0].expr.alts[0].items;
	assert_eq!(items.len(), 4);

	assert!(items[0].cut);
	assert_eq!(items[0].name.as_ref().unwrap().value, "name");
	// The quantifier binds tighter than the predicate.
	match &items[0].item {
		Item::Not(inner) => assert!(matches!(&**inner, Item::ZeroOrOne(_))),
		other => panic!("expected a predicate, got {:?}", other),
	}

	assert!(items[1].is_ignored());
	assert!(matches!(&items[1].item, Item::ZeroOrMore(_)));
	assert!(matches!(&items[2].item, Item::Any(_)));

	match &items[3].item {
		Item::And(inner) => match &**inner {
			Item::Repetition(rep) => {
				assert_eq!((rep.first, rep.last), (2, Some(3)));
				assert!(matches!(&*rep.item, Item::Expr(_)));
			}
			other => panic!("expected a repetition, got {:?}", other),
		},
		other => panic!("expected a predicate, got {:?}", other),
	}
}

#[test]
fn ordered_choice_and_comments() {
	let grammar = parse(indoc! {"
		# leading comment
		A <- B / C 'x' / # trailing comment
		     D
		B <- 'b'
		C <- 'c'
		D <- 'd'
	"});
	assert_eq!(grammar.rules[0].expr.alts.len(), 3);
}

#[test]
fn metarule_body_escapes() {
	let grammar = parse(indoc! {r"
		A <- 'x' $act
		$act { return {'a': 1\} }
	"});
	assert_eq!(grammar.metarules[0].body.trim(), "return {'a': 1}");
}

#[test]
fn inline_metarule() {
	let grammar = parse("A <- 'x' ${ return 1 }\n");
	match &grammar.rules[0].expr.alts[0].meta {
		Some(AltMeta::Rule(m)) => {
			assert!(m.id.is_none());
			assert_eq!(m.body.trim(), "return 1");
		}
		other => panic!("expected an inline metarule, got {:?}", other),
	}
}

#[test]
fn directives() {
	let grammar = parse(indoc! {r#"
		@include "lib.peg"
		@entry Main
		@ignore { Space Comment }
		@toplevel {
		    Extra <- 'e'
		}
		@backend(python) {
		    PyOnly <- 'p'
		}
		@backend.header { import sys }
		Main <- 'm'
		Space <- ' '
		Comment <- '#'
	"#});

	assert_eq!(grammar.directives.len(), 6);
	assert!(matches!(&grammar.directives[0], Directive::Include { path, .. } if path == "lib.peg"));
	assert!(matches!(&grammar.directives[1], Directive::Entry { id, .. } if id.value == "Main"));
	match &grammar.directives[2] {
		Directive::Ignore { ids, .. } => {
			let names: Vec<&str> = ids.iter().map(|i| i.value.as_str()).collect();
			assert_eq!(names, vec!["Space", "Comment"]);
		}
		other => panic!("expected an ignore directive, got {:?}", other),
	}
	assert!(
		matches!(&grammar.directives[3], Directive::Toplevel { grammar, .. } if grammar.rules.len() == 1)
	);
	assert!(
		matches!(&grammar.directives[4], Directive::Backend { name, .. } if name.value == "python")
	);
	assert!(
		matches!(&grammar.directives[5], Directive::BackendDef { name, body, .. }
			if name.value == "header" && body.trim() == "import sys")
	);
}

#[test]
fn entry_prefix_versus_directive() {
	// A bare `@entry` marks the next rule; `@entry Name` stands alone.
	let grammar = parse("@entry\nA <- 'a'\n");
	assert!(grammar.rules[0].entry);
	assert!(grammar.directives.is_empty());

	let grammar = parse("@entry A\nA <- 'a'\n");
	assert!(!grammar.rules[0].entry);
	assert_eq!(grammar.directives.len(), 1);
}

#[test]
fn expected_report() {
	let message = parse_err("A <- (B\n");
	assert!(message.contains("expected"), "got: {}", message);

	let message = parse_err("A <- 'x");
	assert!(message.contains("expected"), "got: {}", message);
}

#[test]
fn unknown_directive_is_reported() {
	let message = parse_err("@nonsense\nA <- 'a'\n");
	assert!(message.contains("nonsense"), "got: {}", message);
}

#[test]
fn roundtrip() {
	let cases = [
		"A <- B / C 'x' / D\nB <- 'b'\nC <- 'c'\nD <- 'd'\n",
		"@entry\nNumber <- Digit+ $int\nDigit <- [0-9]\n\n$int { return join(digits) }\n",
		"A <- ^ name:!B? _:C* . (D 'x'){2,3}\nB <- 'b'\nC <- 'c'\nD <- \"dd\"\n",
		"Char <- '\\\\' ^ 'n' / '\\\\' 'r'\n",
		"A <- 'x' ${ inline }\n",
	];

	for case in cases {
		let first = parse(case);
		let printed = first.to_string();
		let second = parse(&printed);
		assert_eq!(first, second, "roundtrip failed for:\n{}\n->\n{}", case, printed);
	}
}
