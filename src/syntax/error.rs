use source_span::Loc;
use std::fmt;

#[derive(Debug)]
pub enum Error {
	UnexpectedEof,
	Expected(Vec<&'static str>),
	UnknownDirective(String),
	InvalidCodePoint(u32),
	NumberOverflow,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		use self::Error::*;
		match self {
			UnexpectedEof => write!(f, "unexpected end of input"),
			Expected(items) => {
				write!(f, "expected ")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						if i + 1 == items.len() {
							write!(f, " or ")?;
						} else {
							write!(f, ", ")?;
						}
					}
					write!(f, "{}", item)?;
				}
				Ok(())
			}
			UnknownDirective(name) => write!(f, "unknown directive `@{}`", name),
			InvalidCodePoint(code) => write!(f, "invalid character code U+{:04X}", code),
			NumberOverflow => write!(f, "repetition bound too large"),
		}
	}
}

pub type Result<T> = std::result::Result<T, Loc<Error>>;
