#![forbid(unsafe_code)]

mod lexer;
mod token;

pub use lexer::{LexError, Lexer};
pub use token::{Token, TokenKind};

#[cfg(test)]
mod tests {
	use super::*;

	fn kinds(src: &str) -> Vec<TokenKind> {
		Lexer::new(src)
			.lex()
			.unwrap()
			.into_iter()
			.map(|t| t.kind)
			.collect()
	}

	#[test]
	fn lex_launch_call_with_trailing_lambda() {
		let ks = kinds("GlobalScope.launch { }");
		assert_eq!(
			ks,
			vec![
				TokenKind::Ident("GlobalScope".to_string()),
				TokenKind::Dot,
				TokenKind::Ident("launch".to_string()),
				TokenKind::LBrace,
				TokenKind::RBrace,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_keeps_newlines_and_drops_comments() {
		let ks = kinds("val a = 1 // trailing\n/* block /* nested */ */ val b = 2\n");
		let newlines = ks.iter().filter(|k| **k == TokenKind::Newline).count();
		assert_eq!(newlines, 2);
		assert!(ks.contains(&TokenKind::Ident("b".to_string())));
		assert!(!ks.iter().any(|k| matches!(k, TokenKind::Slash | TokenKind::Star)));
	}

	#[test]
	fn lex_string_with_template_expression() {
		let ks = kinds("println(\"value ${map[\"key\"]} done\")");
		let s = ks
			.iter()
			.find_map(|k| match k {
				TokenKind::String(s) => Some(s.clone()),
				_ => None,
			})
			.unwrap();
		assert_eq!(s, "value ${map[\"key\"]} done");
	}

	#[test]
	fn lex_raw_string_and_empty_string() {
		let ks = kinds("val a = \"\"\"raw \"quoted\" text\"\"\"\nval b = \"\"");
		let strings: Vec<String> = ks
			.iter()
			.filter_map(|k| match k {
				TokenKind::String(s) => Some(s.clone()),
				_ => None,
			})
			.collect();
		assert_eq!(strings, vec!["raw \"quoted\" text".to_string(), String::new()]);
	}

	#[test]
	fn lex_numbers_and_ranges() {
		let ks = kinds("1..10 1_000L 0xFF 1.5f 2e3");
		assert_eq!(
			ks,
			vec![
				TokenKind::Int("1".to_string()),
				TokenKind::DotDot,
				TokenKind::Int("10".to_string()),
				TokenKind::Int("1_000L".to_string()),
				TokenKind::Int("0xFF".to_string()),
				TokenKind::Float("1.5f".to_string()),
				TokenKind::Float("2e3".to_string()),
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_safe_call_elvis_and_not_null() {
		let ks = kinds("a?.b ?: c!!");
		assert_eq!(
			ks,
			vec![
				TokenKind::Ident("a".to_string()),
				TokenKind::SafeDot,
				TokenKind::Ident("b".to_string()),
				TokenKind::Elvis,
				TokenKind::Ident("c".to_string()),
				TokenKind::BangBang,
				TokenKind::Eof,
			]
		);
	}

	#[test]
	fn lex_rejects_unterminated_string() {
		let err = Lexer::new("val s = \"open\nval t = 1").lex().unwrap_err();
		assert!(err.message.contains("unterminated string"));
	}

	#[test]
	fn lex_rejects_unterminated_block_comment() {
		let err = Lexer::new("/* never closed").lex().unwrap_err();
		assert!(err.message.contains("block comment"), "{}", err.message);
	}
}
