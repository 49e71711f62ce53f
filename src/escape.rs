//! Escaping for values embedded in file-index queries and AppleScript bodies
//!
//! Every dynamic value that ends up inside a query string or a script goes
//! through one of these functions. Nothing else in the crate interpolates raw
//! user input into host-executed text.

/// How a query value is matched against an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    BeginsWith,
    Contains,
}

/// Escape a value for use inside a double-quoted file-index query literal.
///
/// Backslash, `"`, `*` and `?` each gain one leading backslash. Mapping char by
/// char is equivalent to escaping backslash first, so added escapes are never
/// doubled.
pub fn spotlight_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for ch in value.chars() {
        if matches!(ch, '\\' | '"' | '*' | '?') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Case and diacritic insensitive comparison of `attribute` against `value`.
///
/// ```
/// use lacona_bridge::escape::{spotlight_match, MatchKind};
/// assert_eq!(
///     spotlight_match("kMDItemFSName", "notes", MatchKind::BeginsWith),
///     r#"kMDItemFSName == "notes*"cd"#
/// );
/// ```
pub fn spotlight_match(attribute: &str, value: &str, kind: MatchKind) -> String {
    let literal = spotlight_literal(value);
    let pattern = match kind {
        MatchKind::Exact => literal,
        MatchKind::BeginsWith => format!("{}*", literal),
        MatchKind::Contains => format!("*{}*", literal),
    };
    format!("{} == \"{}\"cd", attribute, pattern)
}

/// Quote a value as an AppleScript string literal
pub fn applescript_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal matcher for the query literal grammar: `\x` is a literal `x`,
    /// unescaped `*` matches any run and `?` any one char.
    fn matches(pattern: &str, candidate: &str) -> bool {
        enum Token {
            Lit(char),
            AnyRun,
            AnyOne,
        }
        let mut tokens = Vec::new();
        let mut chars = pattern.chars();
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => tokens.push(Token::Lit(chars.next().unwrap())),
                '*' => tokens.push(Token::AnyRun),
                '?' => tokens.push(Token::AnyOne),
                other => tokens.push(Token::Lit(other)),
            }
        }

        fn go(tokens: &[Token], text: &[char]) -> bool {
            match tokens.split_first() {
                None => text.is_empty(),
                Some((Token::Lit(c), rest)) => text.first() == Some(c) && go(rest, &text[1..]),
                Some((Token::AnyOne, rest)) => !text.is_empty() && go(rest, &text[1..]),
                Some((Token::AnyRun, rest)) => (0..=text.len()).any(|i| go(rest, &text[i..])),
            }
        }

        let text: Vec<char> = candidate.chars().collect();
        go(&tokens, &text)
    }

    /// Extract the quoted pattern from `attr == "…"cd`
    fn pattern_of(query: &str) -> &str {
        let start = query.find('"').unwrap() + 1;
        let end = query.rfind("\"cd").unwrap();
        &query[start..end]
    }

    #[test]
    fn test_literal_plain_text_unchanged() {
        assert_eq!(spotlight_literal("Quarterly Report.pdf"), "Quarterly Report.pdf");
    }

    #[test]
    fn test_literal_escapes_backslash_before_others() {
        assert_eq!(spotlight_literal(r"a\b"), r"a\\b");
        assert_eq!(spotlight_literal(r#"say "hi""#), r#"say \"hi\""#);
        assert_eq!(spotlight_literal("*.txt?"), r"\*.txt\?");
        // A literal backslash followed by a star stays two separate escapes
        assert_eq!(spotlight_literal(r"\*"), r"\\\*");
        assert_eq!(spotlight_literal(r#"\""#), r#"\\\""#);
    }

    #[test]
    fn test_begins_with_semantics() {
        let query = spotlight_match("kMDItemFSName", "re*port", MatchKind::BeginsWith);
        assert_eq!(query, r#"kMDItemFSName == "re\*port*"cd"#);

        let pattern = pattern_of(&query);
        assert!(matches(pattern, "re*port.pdf"));
        assert!(matches(pattern, "re*port"));
        assert!(!matches(pattern, "reXport.pdf"));
        assert!(!matches(pattern, "my re*port"));
    }

    #[test]
    fn test_contains_semantics() {
        let query = spotlight_match("kMDItemDisplayName", r#"a"b\c?"#, MatchKind::Contains);
        assert_eq!(query, r#"kMDItemDisplayName == "*a\"b\\c\?*"cd"#);

        let pattern = pattern_of(&query);
        assert!(matches(pattern, r#"xx a"b\c? yy"#));
        assert!(matches(pattern, r#"a"b\c?"#));
        assert!(!matches(pattern, r#"a"b\cZ"#));
        assert!(!matches(pattern, r#"ab\c?"#));
    }

    #[test]
    fn test_exact_semantics() {
        let query = spotlight_match("kMDItemFSName", "x?", MatchKind::Exact);
        let pattern = pattern_of(&query);
        assert!(matches(pattern, "x?"));
        assert!(!matches(pattern, "xy"));
        assert!(!matches(pattern, "x?z"));
    }

    #[test]
    fn test_escaped_value_cannot_close_the_literal() {
        let hostile = r#"" || kMDItemFSName == "*"#;
        let query = spotlight_match("kMDItemFSName", hostile, MatchKind::BeginsWith);
        let pattern = pattern_of(&query);
        // Every quote inside the pattern is escaped
        let bytes: Vec<char> = pattern.chars().collect();
        for (i, ch) in bytes.iter().enumerate() {
            if *ch == '"' {
                let preceding = bytes[..i].iter().rev().take_while(|c| **c == '\\').count();
                assert_eq!(preceding % 2, 1, "unescaped quote in {}", pattern);
            }
        }
        assert!(matches(pattern, hostile));
    }

    #[test]
    fn test_applescript_string() {
        assert_eq!(applescript_string("Safari"), r#""Safari""#);
        assert_eq!(applescript_string(r#"My "Disk""#), r#""My \"Disk\"""#);
        assert_eq!(applescript_string(r"C:\tmp"), r#""C:\\tmp""#);
        assert_eq!(applescript_string(""), r#""""#);
    }
}
