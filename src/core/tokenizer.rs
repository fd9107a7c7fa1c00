//! Shell-like tokenizer for console lines.
//!
//! Splits on whitespace; single or double quotes group a segment into one
//! argument. No external dependencies.

/// Tokenize a line into its arguments, command name first.
///
/// # Syntax
///
/// - Tokens are separated by whitespace
/// - Quoted strings (single or double) preserve whitespace
/// - Inside quotes, `\"`, `\'` and `\\` escape the next character
/// - An unterminated quote runs to the end of the line
/// - Quotes glued to a word join it: `say hi"  there"` is `["say", "hi  there"]`
///
/// A blank line yields no tokens.
///
/// # Examples
///
/// ```
/// use bevy_netconsole::core::tokenize;
///
/// assert_eq!(
///     tokenize(r#"addparticles player "big fire""#),
///     vec!["addparticles", "player", "big fire"],
/// );
/// assert!(tokenize("   ").is_empty());
/// ```
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match quote {
            Some(q) => match c {
                '\\' => match chars.next() {
                    Some(escaped @ ('"' | '\'' | '\\')) => current.push(escaped),
                    Some(other) => {
                        current.push('\\');
                        current.push(other);
                    }
                    None => current.push('\\'),
                },
                _ if c == q => quote = None,
                _ => current.push(c),
            },
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if in_token {
        tokens.push(current);
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple() {
        assert_eq!(tokenize("sendchat hello world"), vec!["sendchat", "hello", "world"]);
    }

    #[test]
    fn test_tokenize_quoted_segment() {
        assert_eq!(
            tokenize(r#"addparticles player "big fire""#),
            vec!["addparticles", "player", "big fire"]
        );
        assert_eq!(tokenize("say 'hello world'"), vec!["say", "hello world"]);
    }

    #[test]
    fn test_tokenize_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
        assert!(tokenize(" \t\r\n ").is_empty());
    }

    #[test]
    fn test_tokenize_extra_whitespace() {
        assert_eq!(tokenize("  help   cls  "), vec!["help", "cls"]);
    }

    #[test]
    fn test_tokenize_empty_quotes_are_an_argument() {
        assert_eq!(tokenize(r#"say """#), vec!["say", ""]);
    }

    #[test]
    fn test_tokenize_unterminated_quote_runs_to_end() {
        assert_eq!(tokenize(r#"say "hello there"#), vec!["say", "hello there"]);
    }

    #[test]
    fn test_tokenize_escapes_in_quotes() {
        assert_eq!(tokenize(r#"say "a \"b\" c""#), vec!["say", r#"a "b" c"#]);
        assert_eq!(tokenize(r#"say "c:\\tmp""#), vec!["say", r"c:\tmp"]);
        assert_eq!(tokenize(r#"say "\n""#), vec!["say", r"\n"]);
    }

    #[test]
    fn test_tokenize_other_quote_kind_is_literal() {
        assert_eq!(tokenize(r#"say "it's""#), vec!["say", "it's"]);
    }

    #[test]
    fn test_tokenize_glued_quote() {
        assert_eq!(tokenize(r#"say hi"  there""#), vec!["say", "hi  there"]);
    }

    #[test]
    fn test_tokenize_unicode() {
        assert_eq!(tokenize("say \"grüße welt\" ✓"), vec!["say", "grüße welt", "✓"]);
    }
}
