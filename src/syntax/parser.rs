use super::ast::*;
use super::error::Error;
use crate::source::{metrics, Info, SourceId};
use source_span::{Loc, Position, Span};

/// Recursive descent recogniser for the grammar language.
///
/// Works over the buffered character vector so that backtracking is a
/// plain position reset. The deepest failure position and the tokens
/// expected there are tracked for error reporting.
pub struct Parser {
	chars: Vec<char>,
	spans: Vec<Span>,
	eof: Span,
	pos: usize,
	source: SourceId,
	furthest: usize,
	expected: Vec<&'static str>,
	failure: Option<Loc<Error>>,
}

impl Parser {
	pub fn new(text: &str, source: SourceId) -> Parser {
		let m = metrics();
		let mut chars = Vec::new();
		let mut spans = Vec::new();
		let mut span: Span = Position::default().into();
		for c in text.chars() {
			span.clear();
			span.push(c, &m);
			chars.push(c);
			spans.push(span);
		}

		Parser {
			chars,
			spans,
			eof: span.end().into(),
			pos: 0,
			source,
			furthest: 0,
			expected: Vec::new(),
			failure: None,
		}
	}

	pub fn parse(mut self) -> Result<Grammar, Loc<Error>> {
		self.spacing();
		match self.entities(false) {
			Some(grammar) if self.pos == self.chars.len() => Ok(grammar),
			_ => Err(self.error()),
		}
	}

	fn error(&mut self) -> Loc<Error> {
		if let Some(failure) = self.failure.take() {
			return failure;
		}

		let span = self.span_at(self.furthest);
		let expected = std::mem::take(&mut self.expected);
		if expected.is_empty() {
			Loc::new(Error::UnexpectedEof, span)
		} else {
			Loc::new(Error::Expected(expected), span)
		}
	}

	fn mark(&self) -> usize {
		self.pos
	}

	fn reset(&mut self, pos: usize) {
		self.pos = pos;
	}

	fn peek(&self) -> Option<char> {
		self.chars.get(self.pos).copied()
	}

	fn peek2(&self) -> Option<char> {
		self.chars.get(self.pos + 1).copied()
	}

	fn take(&mut self) -> Option<char> {
		let c = self.peek()?;
		self.pos += 1;
		Some(c)
	}

	fn span_at(&self, pos: usize) -> Span {
		self.spans.get(pos).copied().unwrap_or(self.eof)
	}

	/// Span of everything consumed since `begin`.
	fn span_from(&self, begin: usize) -> Span {
		if begin < self.pos {
			self.spans[begin].union(self.spans[self.pos - 1])
		} else {
			self.span_at(begin)
		}
	}

	fn info_from(&self, begin: usize) -> Option<Info> {
		Some(Info::new(self.source, self.span_from(begin)))
	}

	fn miss_at(&mut self, pos: usize, what: &'static str) {
		if pos > self.furthest {
			self.furthest = pos;
			self.expected.clear();
		}
		if pos == self.furthest && !self.expected.contains(&what) {
			self.expected.push(what);
		}
	}

	fn miss(&mut self, what: &'static str) {
		self.miss_at(self.pos, what)
	}

	fn fail(&mut self, error: Error, span: Span) {
		if self.failure.is_none() {
			self.failure = Some(Loc::new(error, span));
		}
	}

	fn accept(&mut self, c: char, what: &'static str) -> bool {
		if self.peek() == Some(c) {
			self.pos += 1;
			true
		} else {
			self.miss(what);
			false
		}
	}

	fn accept_str(&mut self, s: &str, what: &'static str) -> bool {
		let begin = self.mark();
		for c in s.chars() {
			if self.peek() == Some(c) {
				self.pos += 1;
			} else {
				self.reset(begin);
				self.miss_at(begin, what);
				return false;
			}
		}
		true
	}

	fn spacing(&mut self) {
		loop {
			match self.peek() {
				Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
					self.pos += 1;
				}
				Some('#') => {
					while let Some(c) = self.take() {
						if c == '\n' {
							break;
						}
					}
				}
				_ => break,
			}
		}
	}

	/// Parse rules, metarules and directives until end of input, or until
	/// an unconsumed `}` when parsing a subgrammar block.
	fn entities(&mut self, in_block: bool) -> Option<Grammar> {
		let mut grammar = Grammar::new();
		let mut entry_flag = false;
		let mut ignore_flag = false;

		loop {
			match self.peek() {
				None => break,
				Some('}') if in_block => break,
				Some('@') => {
					self.directive(&mut grammar, &mut entry_flag, &mut ignore_flag)?;
				}
				Some('$') => {
					let metarule = self.metadef()?;
					grammar.metarules.push(metarule);
				}
				Some(_) => {
					let mut rule = self.rule()?;
					rule.entry = entry_flag;
					rule.ignore = ignore_flag;
					entry_flag = false;
					ignore_flag = false;
					grammar.rules.push(rule);
				}
			}
		}

		Some(grammar)
	}

	fn directive(
		&mut self,
		grammar: &mut Grammar,
		entry_flag: &mut bool,
		ignore_flag: &mut bool,
	) -> Option<()> {
		let begin = self.mark();
		if !self.accept('@', "`@`") {
			return None;
		}
		let name = self.identifier()?;

		match name.value.as_str() {
			"include" => {
				let path = self.literal_text()?;
				grammar.directives.push(Directive::Include {
					path,
					info: self.info_from(begin),
				});
			}
			"entry" => {
				let m = self.mark();
				match self.identifier() {
					Some(id) if !self.at_arrow() => {
						grammar.directives.push(Directive::Entry {
							id,
							info: self.info_from(begin),
						});
					}
					_ => {
						self.reset(m);
						*entry_flag = true;
					}
				}
			}
			"ignore" => {
				if self.peek() == Some('{') {
					self.take();
					self.spacing();
					let mut ids = Vec::new();
					while self.peek() != Some('}') {
						ids.push(self.identifier()?);
					}
					self.take();
					self.spacing();
					grammar.directives.push(Directive::Ignore {
						ids,
						info: self.info_from(begin),
					});
				} else {
					*ignore_flag = true;
				}
			}
			"toplevel" => {
				let sub = self.subgrammar()?;
				grammar.directives.push(Directive::Toplevel {
					grammar: sub,
					info: self.info_from(begin),
				});
			}
			"backend" => {
				if self.peek() == Some('.') {
					self.take();
					let dirname = self.identifier()?;
					let body = self.body()?;
					grammar.directives.push(Directive::BackendDef {
						name: dirname,
						body,
						info: self.info_from(begin),
					});
				} else if self.accept('(', "`(`") {
					self.spacing();
					let backend = self.identifier()?;
					if !self.accept(')', "`)`") {
						return None;
					}
					self.spacing();
					let sub = self.subgrammar()?;
					grammar.directives.push(Directive::Backend {
						name: backend,
						grammar: sub,
						info: self.info_from(begin),
					});
				} else {
					return None;
				}
			}
			_ => {
				self.fail(
					Error::UnknownDirective(name.value.clone()),
					self.span_from(begin),
				);
				return None;
			}
		}

		Some(())
	}

	fn subgrammar(&mut self) -> Option<Grammar> {
		if !self.accept('{', "`{`") {
			return None;
		}
		self.spacing();
		let sub = self.entities(true)?;
		if !self.accept('}', "`}`") {
			return None;
		}
		self.spacing();
		Some(sub)
	}

	fn rule(&mut self) -> Option<Rule> {
		let begin = self.mark();
		let id = self.identifier()?;
		if !self.accept_str("<-", "`<-`") {
			self.reset(begin);
			return None;
		}
		self.spacing();
		let expr = self.expression()?;
		Some(Rule::new(id, expr, self.info_from(begin)))
	}

	fn expression(&mut self) -> Option<Expr> {
		let begin = self.mark();
		let mut alts = vec![self.alternative()?];

		loop {
			let m = self.mark();
			if !self.accept('/', "`/`") {
				break;
			}
			self.spacing();
			match self.alternative() {
				Some(alt) => alts.push(alt),
				None => {
					self.reset(m);
					break;
				}
			}
		}

		Some(Expr::new(alts, self.info_from(begin)))
	}

	fn alternative(&mut self) -> Option<Alt> {
		let begin = self.mark();
		let mut items = Vec::new();
		while let Some(item) = self.part() {
			items.push(item);
		}
		let meta = self.alt_meta();
		let info = if self.mark() > begin {
			self.info_from(begin)
		} else {
			None
		};
		Some(Alt::new(items, meta, info))
	}

	fn part(&mut self) -> Option<NamedItem> {
		let begin = self.mark();

		let cut = if self.accept('^', "`^`") {
			self.spacing();
			true
		} else {
			false
		};

		let name = self.metaname();

		let lookahead = if self.accept('&', "`&`") {
			self.spacing();
			Some(true)
		} else if self.accept('!', "`!`") {
			self.spacing();
			Some(false)
		} else {
			None
		};

		let primary = match self.suffix() {
			Some(item) => item,
			None => {
				self.reset(begin);
				return None;
			}
		};

		let item = match lookahead {
			Some(true) => Item::And(Box::new(primary)),
			Some(false) => Item::Not(Box::new(primary)),
			None => primary,
		};

		let mut part = NamedItem::new(name, item, self.info_from(begin));
		part.cut = cut;
		Some(part)
	}

	fn metaname(&mut self) -> Option<Id> {
		let begin = self.mark();
		let id = self.identifier()?;
		if self.accept(':', "`:`") {
			self.spacing();
			Some(id)
		} else {
			self.reset(begin);
			None
		}
	}

	fn suffix(&mut self) -> Option<Item> {
		let mut item = self.primary()?;

		if self.accept('?', "`?`") {
			self.spacing();
			item = Item::ZeroOrOne(Box::new(item));
		} else if self.accept('*', "`*`") {
			self.spacing();
			item = Item::ZeroOrMore(Box::new(item));
		} else if self.accept('+', "`+`") {
			self.spacing();
			item = Item::OneOrMore(Box::new(item));
		} else {
			let begin = self.mark();
			if let Some((first, last)) = self.repetition() {
				let info = self.info_from(begin);
				item = Item::Repetition(Repetition {
					item: Box::new(item),
					first,
					last,
					info,
				});
			}
		}

		Some(item)
	}

	fn repetition(&mut self) -> Option<(u32, Option<u32>)> {
		let begin = self.mark();
		if !self.accept('{', "`{`") {
			return None;
		}
		let first = match self.number() {
			Some(n) => n,
			None => {
				self.reset(begin);
				return None;
			}
		};
		let last = if self.accept(',', "`,`") {
			match self.number() {
				Some(n) => Some(n),
				None => {
					self.reset(begin);
					return None;
				}
			}
		} else {
			None
		};
		if !self.accept('}', "`}`") {
			self.reset(begin);
			return None;
		}
		self.spacing();
		Some((first, last))
	}

	fn number(&mut self) -> Option<u32> {
		let begin = self.mark();
		while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
			self.pos += 1;
		}
		if self.pos == begin {
			self.miss("number");
			return None;
		}
		let digits: String = self.chars[begin..self.pos].iter().collect();
		match digits.parse() {
			Ok(n) => Some(n),
			Err(_) => {
				self.fail(Error::NumberOverflow, self.span_from(begin));
				self.reset(begin);
				None
			}
		}
	}

	fn primary(&mut self) -> Option<Item> {
		let begin = self.mark();

		if let Some(id) = self.identifier() {
			if self.at_arrow() {
				self.reset(begin);
			} else {
				return Some(Item::Id(id));
			}
		}

		match self.peek() {
			Some('(') => {
				self.take();
				self.spacing();
				let expr = self.expression()?;
				if !self.accept(')', "`)`") {
					self.reset(begin);
					return None;
				}
				self.spacing();
				Some(Item::Expr(expr))
			}
			Some('\'') | Some('"') => self.literal(),
			Some('[') => self.class(),
			Some('.') => {
				self.take();
				let info = self.info_from(begin);
				self.spacing();
				Some(Item::Any(AnyChar { info }))
			}
			_ => {
				self.miss("identifier");
				self.miss("`(`");
				self.miss("literal");
				self.miss("`[`");
				self.miss("`.`");
				None
			}
		}
	}

	fn at_arrow(&self) -> bool {
		self.peek() == Some('<') && self.peek2() == Some('-')
	}

	fn identifier(&mut self) -> Option<Id> {
		let begin = self.mark();
		match self.peek() {
			Some(c) if c == '_' || c.is_ascii_alphabetic() => {
				self.pos += 1;
			}
			_ => {
				self.miss("identifier");
				return None;
			}
		}
		while matches!(self.peek(), Some(c) if c == '_' || c.is_ascii_alphanumeric()) {
			self.pos += 1;
		}
		let value: String = self.chars[begin..self.pos].iter().collect();
		let info = self.info_from(begin);
		self.spacing();
		Some(Id { value, info })
	}

	fn literal(&mut self) -> Option<Item> {
		let begin = self.mark();
		let quote = match self.peek() {
			Some(q @ '\'') | Some(q @ '"') => q,
			_ => {
				self.miss("literal");
				return None;
			}
		};
		self.take();

		let mut chars = Vec::new();
		loop {
			match self.peek() {
				Some(c) if c == quote => {
					self.take();
					break;
				}
				Some(_) => match self.char_any() {
					Some(c) => chars.push(c),
					None => {
						self.reset(begin);
						return None;
					}
				},
				None => {
					self.miss(if quote == '\'' { "`'`" } else { "`\"`" });
					self.reset(begin);
					return None;
				}
			}
		}
		let info = self.info_from(begin);
		self.spacing();

		if chars.len() == 1 {
			let mut c = chars.pop().unwrap();
			c.info = info;
			Some(Item::Char(c))
		} else {
			Some(Item::Literal(Literal { chars, info }))
		}
	}

	/// Quoted literal reduced to its text, used for include paths.
	fn literal_text(&mut self) -> Option<String> {
		let begin = self.mark();
		match self.literal()? {
			Item::Char(c) => Some(c.as_char().map(String::from).unwrap_or_default()),
			Item::Literal(lit) => Some(lit.text().into_iter().collect()),
			_ => {
				self.reset(begin);
				None
			}
		}
	}

	fn class(&mut self) -> Option<Item> {
		let begin = self.mark();
		if !self.accept('[', "`[`") {
			return None;
		}

		let mut ranges = Vec::new();
		loop {
			match self.peek() {
				Some(']') => {
					self.take();
					break;
				}
				Some(_) => match self.range() {
					Some(range) => ranges.push(range),
					None => {
						self.reset(begin);
						return None;
					}
				},
				None => {
					self.miss("`]`");
					self.reset(begin);
					return None;
				}
			}
		}
		let info = self.info_from(begin);
		self.spacing();
		Some(Item::Class(Class { ranges, info }))
	}

	fn range(&mut self) -> Option<Range> {
		let begin = self.mark();
		let first = self.char_any()?;

		let m = self.mark();
		if self.accept('-', "`-`") && self.peek() != Some(']') {
			if let Some(last) = self.char_any() {
				return Some(Range {
					first,
					last: Some(last),
					info: self.info_from(begin),
				});
			}
		}
		self.reset(m);
		Some(Range {
			first,
			last: None,
			info: self.info_from(begin),
		})
	}

	/// Single character with escape handling, as it appears inside
	/// literals and classes.
	fn char_any(&mut self) -> Option<Char> {
		let begin = self.mark();
		match self.peek() {
			Some('\\') => {
				self.take();
				let c = match self.take() {
					Some('n') => '\n' as u32,
					Some('r') => '\r' as u32,
					Some('t') => '\t' as u32,
					Some(c @ '\'') | Some(c @ '"') | Some(c @ '[') | Some(c @ ']')
					| Some(c @ '\\') => c as u32,
					Some('u') => {
						let mut code = 0;
						for _ in 0..4 {
							match self.take().and_then(|c| c.to_digit(16)) {
								Some(d) => code = (code << 4) | d,
								None => {
									self.miss_at(begin, "escape sequence");
									self.reset(begin);
									return None;
								}
							}
						}
						if char::from_u32(code).is_none() {
							self.fail(Error::InvalidCodePoint(code), self.span_from(begin));
							self.reset(begin);
							return None;
						}
						code
					}
					Some(d1 @ '0'..='7') => self.octal(d1),
					_ => {
						self.miss_at(begin, "escape sequence");
						self.reset(begin);
						return None;
					}
				};
				Some(Char::new(c, self.info_from(begin)))
			}
			Some(c) => {
				self.take();
				Some(Char::new(c as u32, self.info_from(begin)))
			}
			None => {
				self.miss("character");
				None
			}
		}
	}

	/// Octal escapes: `\ooo` with the first digit in `0..2`, or `\oo`/`\o`.
	fn octal(&mut self, d1: char) -> u32 {
		let v1 = d1.to_digit(8).unwrap();

		if d1 <= '2' {
			let m = self.mark();
			if let Some(v2) = self.peek().and_then(|c| c.to_digit(8)) {
				self.take();
				if let Some(v3) = self.peek().and_then(|c| c.to_digit(8)) {
					self.take();
					return (v1 << 6) | (v2 << 3) | v3;
				}
			}
			self.reset(m);
		}

		if let Some(v2) = self.peek().and_then(|c| c.to_digit(8)) {
			self.take();
			return (v1 << 3) | v2;
		}
		v1
	}

	fn alt_meta(&mut self) -> Option<AltMeta> {
		let begin = self.mark();
		if !self.accept('$', "`$`") {
			return None;
		}

		if self.peek() == Some('{') {
			let body = self.body()?;
			return Some(AltMeta::Rule(MetaRule {
				id: None,
				body,
				info: self.info_from(begin),
			}));
		}

		self.spacing();
		match self.identifier() {
			Some(id) if self.peek() != Some('{') => Some(AltMeta::Ref(MetaRef {
				name: id,
				info: self.info_from(begin),
			})),
			_ => {
				self.reset(begin);
				None
			}
		}
	}

	fn metadef(&mut self) -> Option<MetaRule> {
		let begin = self.mark();
		if !self.accept('$', "`$`") {
			return None;
		}
		self.spacing();
		let id = match self.identifier() {
			Some(id) => id,
			None => {
				self.reset(begin);
				return None;
			}
		};
		let body = match self.body() {
			Some(body) => body,
			None => {
				self.reset(begin);
				return None;
			}
		};
		Some(MetaRule {
			id: Some(id),
			body,
			info: self.info_from(begin),
		})
	}

	/// Opaque body `{ … }`. The body ends at the first unescaped `}`;
	/// `\}` is unescaped to `}`.
	fn body(&mut self) -> Option<String> {
		let begin = self.mark();
		if !self.accept('{', "`{`") {
			return None;
		}

		let mut body = String::new();
		loop {
			match self.peek() {
				Some('}') => {
					self.take();
					break;
				}
				Some('\\') if self.peek2() == Some('}') => {
					self.take();
					self.take();
					body.push('}');
				}
				Some(c) => {
					self.take();
					body.push(c);
				}
				None => {
					self.miss("`}`");
					self.reset(begin);
					return None;
				}
			}
		}
		self.spacing();
		Some(body)
	}
}
