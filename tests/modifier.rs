use indoc::indoc;
use polygen::out::Diagnostic;
use polygen::syntax::{self, Grammar, Item};
use polygen::{gen, modifier, preprocessor, Sources};

fn keywords() -> &'static [&'static str] {
	gen::find("python").unwrap().keywords()
}

/// Preprocess and modify an in-memory grammar, expecting success.
fn build(text: &str) -> (Grammar, Vec<Diagnostic>) {
	let mut sources = Sources::new();
	let processed = preprocessor::process_string(&mut sources, "<test>", text, &[], "python")
		.unwrap_or_else(|diagnostics| panic!("preprocessing failed: {:?}", diagnostics));
	let mut grammar = processed.grammar;
	match modifier::apply(&mut grammar, keywords()) {
		Ok(warnings) => (grammar, warnings),
		Err(diagnostics) => panic!("modifier failed: {:?}", diagnostics),
	}
}

fn build_err(text: &str) -> Vec<Diagnostic> {
	let mut sources = Sources::new();
	let processed = preprocessor::process_string(&mut sources, "<test>", text, &[], "python")
		.unwrap_or_else(|diagnostics| panic!("preprocessing failed: {:?}", diagnostics));
	let mut grammar = processed.grammar;
	match modifier::apply(&mut grammar, keywords()) {
		Ok(_) => panic!("expected the modifier to fail"),
		Err(diagnostics) => diagnostics,
	}
}

fn names(grammar: &Grammar, rule: &str) -> Vec<String> {
	let index = grammar.rule_index(rule).unwrap();
	grammar.rules[index].expr.alts[0]
		.items
		.iter()
		.map(|part| part.name.as_ref().unwrap().value.clone())
		.collect()
}

#[test]
fn number_grammar() {
	let (grammar, warnings) = build(indoc! {r"
		@entry
		Number <- Digit+ $int
		Digit  <- [0-9]

		$int { return join(digits) }
	"});

	assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);

	let number = &grammar.rules[grammar.rule_index("Number").unwrap()];
	assert!(number.entry);
	assert_eq!(grammar.entry, grammar.rule_index("Number"));

	// The quantified reference was promoted into a synthetic rule, and
	// the reference inside it took the lowercased rule name.
	let synthetic = grammar
		.rule_index("Number__GEN_1")
		.expect("missing synthetic rule");
	assert_eq!(names(&grammar, "Number"), vec!["_1"]);
	let inner = &grammar.rules[synthetic].expr.alts[0].items[0];
	assert_eq!(inner.name.as_ref().unwrap().value, "digit");
	assert!(matches!(&inner.item, Item::OneOrMore(_)));
}

#[test]
fn indirect_left_recursion() {
	let (grammar, _) = build(indoc! {r"
		@entry
		Primary <- MethodInvocation / FieldAccess / ArrayAccess / This
		MethodInvocation <- Primary '.' Name '(' ')'
		FieldAccess <- Primary '.' Name
		ArrayAccess <- Primary '[' Name ']'
		This <- 'this'
		Name <- [a-z]+
	"});

	for involved in ["Primary", "MethodInvocation", "FieldAccess", "ArrayAccess"] {
		let rule = &grammar.rules[grammar.rule_index(involved).unwrap()];
		assert!(rule.leftrec.is_some(), "{} should be left recursive", involved);
	}
	for free in ["This", "Name"] {
		let rule = &grammar.rules[grammar.rule_index(free).unwrap()];
		assert!(rule.leftrec.is_none(), "{} should not be left recursive", free);
	}

	// The cycle is entered through the entry rule.
	let primary = &grammar.rules[grammar.rule_index("Primary").unwrap()];
	assert!(primary.head);
	let method = &grammar.rules[grammar.rule_index("MethodInvocation").unwrap()];
	assert!(!method.head);

	// Recursive alternatives grow the seed, the rest plant it.
	let growers: Vec<bool> = primary.expr.alts.iter().map(|alt| alt.grower).collect();
	assert_eq!(growers, vec![true, true, true, false]);
}

#[test]
fn cut_masks_alternative() {
	let diagnostics = build_err(indoc! {r"
		@entry
		Char <- '\\' ^ 'n' / '\\' 'r'
	"});
	assert!(
		diagnostics
			.iter()
			.any(|d| d.message.contains("unreachable alternative after cut")),
		"got: {:?}",
		diagnostics
	);
}

#[test]
fn cut_with_distinct_prefix_passes() {
	let (_, warnings) = build(indoc! {r"
		@entry
		Char <- 'a' ^ 'n' / 'b' 'r'
	"});
	assert!(warnings.is_empty());
}

#[test]
fn ignore_propagation() {
	let (grammar, _) = build(indoc! {r"
		@entry
		TwoNumbers <- Number Sep Number
		@ignore { Sep }
		Number <- [0-9]+
		Sep <- ' '
	"});

	assert_eq!(names(&grammar, "TwoNumbers"), vec!["number", "_", "number1"]);

	// The return tuple holds exactly the two numbers.
	let index = grammar.rule_index("TwoNumbers").unwrap();
	let tuple: Vec<String> = grammar.rules[index].expr.alts[0]
		.items
		.iter()
		.filter(|part| !part.is_ignored())
		.map(|part| part.name.as_ref().unwrap().value.clone())
		.collect();
	assert_eq!(tuple, vec!["number", "number1"]);
}

#[test]
fn explicit_name_survives_ignore() {
	let (grammar, _) = build(indoc! {r"
		@entry
		Pair <- Number kept:Sep Number
		@ignore { Sep }
		Number <- [0-9]+
		Sep <- ' '
	"});
	assert_eq!(names(&grammar, "Pair"), vec!["number", "kept", "number1"]);
}

#[test]
fn ignore_reaches_hoisted_subexpressions() {
	// A reference inside a parenthesised group is hoisted into a
	// synthetic rule before ignore propagation, so it is still marked.
	let (grammar, _) = build(indoc! {r"
		@entry
		List <- Number (Sep Number)
		@ignore { Sep }
		Number <- [0-9]+
		Sep <- ' '
	"});

	let synthetic = grammar.rule_index("List__GEN_1").expect("missing synthetic rule");
	let inner: Vec<String> = grammar.rules[synthetic].expr.alts[0]
		.items
		.iter()
		.map(|part| part.name.as_ref().unwrap().value.clone())
		.collect();
	assert_eq!(inner, vec!["_", "number"]);
}

#[test]
fn modifier_is_idempotent() {
	let text = indoc! {r"
		@entry
		Expr <- Expr '+' Term / Term
		Term <- '(' Expr ')' / [0-9]+
	"};

	let (mut grammar, _) = build(text);
	let first = grammar.clone();
	modifier::apply(&mut grammar, keywords()).expect("second run failed");
	assert_eq!(first, grammar);
}

#[test]
fn synthetic_names_avoid_user_rules() {
	let (grammar, _) = build(indoc! {r"
		@entry
		Number <- (Digit) Number__GEN_1
		Number__GEN_1 <- 'x'
		Digit <- [0-9]
	"});

	let mut seen = std::collections::HashSet::new();
	for rule in &grammar.rules {
		assert!(
			seen.insert(rule.id.value.clone()),
			"duplicate rule name {}",
			rule.id
		);
	}
	assert!(grammar.rule_index("Number__GEN_2").is_some());
}

#[test]
fn metanames_are_unique_per_alternative() {
	let (grammar, _) = build(indoc! {r"
		@entry
		Triple <- Value Value Value
		Value <- [0-9]
	"});
	assert_eq!(names(&grammar, "Triple"), vec!["value", "value1", "value2"]);
}

#[test]
fn keyword_metanames_are_munged() {
	let (grammar, _) = build(indoc! {r"
		@entry
		Start <- Return
		Return <- 'r'
	"});
	assert_eq!(names(&grammar, "Start"), vec!["_return"]);
}

#[test]
fn class_normalisation() {
	let (grammar, _) = build(indoc! {r"
		@entry
		Letter <- [a-cb-dzx]
	"});

	let index = grammar.rule_index("Letter").unwrap();
	match &grammar.rules[index].expr.alts[0].items[0].item {
		Item::Class(class) => {
			let ranges: Vec<(u32, Option<u32>)> = class
				.ranges
				.iter()
				.map(|r| (r.first.code, r.last.map(|c| c.code)))
				.collect();
			assert_eq!(
				ranges,
				vec![
					('a' as u32, Some('d' as u32)),
					('x' as u32, None),
					('z' as u32, None),
				]
			);
		}
		other => panic!("expected a class, got {:?}", other),
	}
}

#[test]
fn reversed_range_is_rejected() {
	let diagnostics = build_err(indoc! {r"
		@entry
		Bad <- [z-a]
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("reversed")));
}

#[test]
fn empty_class_is_rejected() {
	let diagnostics = build_err(indoc! {r"
		@entry
		Bad <- []
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("empty character class")));
}

#[test]
fn bad_repetition_bounds() {
	let diagnostics = build_err(indoc! {r"
		@entry
		Bad <- 'x'{3,2}
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("repetition")));
}

#[test]
fn undefined_rule_is_reported() {
	let diagnostics = build_err(indoc! {r"
		@entry
		Start <- Missing
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("undefined rule `Missing`")));
}

#[test]
fn missing_entry_is_reported() {
	let diagnostics = build_err("Start <- 'x'\n");
	assert!(diagnostics.iter().any(|d| d.message.contains("no entry rule")));
}

#[test]
fn duplicate_entry_rules_are_reported() {
	let diagnostics = build_err(indoc! {r"
		@entry
		A <- 'a'
		@entry
		B <- 'b'
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("entry")));
}

#[test]
fn unused_metarule_is_an_error() {
	let diagnostics = build_err(indoc! {r"
		@entry
		A <- 'a'

		$orphan { return 1 }
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("never used")));
}

#[test]
fn undefined_metarule_is_an_error() {
	let diagnostics = build_err(indoc! {r"
		@entry
		A <- 'a' $missing
	"});
	assert!(diagnostics.iter().any(|d| d.message.contains("undefined metarule")));
}

#[test]
fn unreachable_rule_warns() {
	let (_, warnings) = build(indoc! {r"
		@entry
		Start <- 'x'
		Orphan <- 'y'
	"});
	assert!(warnings.iter().any(|d| d.message.contains("unreachable")));
}

#[test]
fn string_expansion() {
	let (grammar, _) = build(indoc! {r#"
		@entry
		Word <- "ab" 'c'
	"#});

	let index = grammar.rule_index("Word").unwrap();
	let items = &grammar.rules[index].expr.alts[0].items;
	assert_eq!(items.len(), 3);
	let codes: Vec<u32> = items
		.iter()
		.map(|part| match &part.item {
			Item::Char(c) => c.code,
			other => panic!("expected a char, got {:?}", other),
		})
		.collect();
	assert_eq!(codes, vec!['a' as u32, 'b' as u32, 'c' as u32]);
	assert_eq!(names(&grammar, "Word"), vec!["_1", "_2", "_3"]);
}

#[test]
fn named_string_stays_whole() {
	let (grammar, _) = build(indoc! {r#"
		@entry
		Word <- word:"ab"
	"#});

	let index = grammar.rule_index("Word").unwrap();
	let items = &grammar.rules[index].expr.alts[0].items;
	assert_eq!(items.len(), 1);
	assert!(matches!(&items[0].item, Item::Literal(_)));
}

#[test]
fn roundtrip_survives_modification() {
	// Printing the normalised grammar and reparsing it yields the same
	// structure, entry flag included.
	let (grammar, _) = build(indoc! {r"
		@entry
		Expr <- Expr '+' Term / Term
		Term <- '(' Expr ')' / [0-9]+
	"});

	let printed = grammar.to_string();
	let mut sources = Sources::new();
	let id = sources.add_string("<printed>", &printed);
	let reparsed = syntax::parse(&printed, id).expect("reparse failed");
	assert_eq!(grammar.rules.len(), reparsed.rules.len());
	for (a, b) in grammar.rules.iter().zip(&reparsed.rules) {
		assert_eq!(a.id, b.id);
	}
}
