//! Answer templates
//!
//! An answer is rendered in two passes. [`substitute`] expands the `$`
//! placeholders with escaped session data, then [`tokenize`] splits the
//! result into text, `$n` breaks and `$( ... )` commands. A literal `$$`
//! is parked as [`PLACEHOLDER`] until tokenizing is done, and so is every
//! `$` coming from user data.

use crate::core::segment;
use crate::core::session::Session;
use crate::core::weighting::capture_groups;
use regex::RegexBuilder;

pub const PLACEHOLDER: &str = "@@__PLACEHOLDER__@@";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    /// `$n`
    Break,
    /// Source of a `$( ... )` directive
    Command(String),
}

/// Park every `$` of user-provided text so it cannot form a directive
///
/// Session text is already in message markup, so entities pass through as is.
pub fn escape_text(source: &str) -> String {
    source.replace('$', PLACEHOLDER)
}

fn restore(source: &str) -> String {
    source.replace(PLACEHOLDER, "$")
}

/// Expand `$$ $A $a $m $s $0`
pub fn substitute(answer: &str, session: &Session) -> String {
    answer
        .replace("$$", PLACEHOLDER)
        .replace("$A", &segment::at_all())
        .replace("$a", &segment::at_user(&session.user_id))
        .replace("$m", &segment::at_user(&session.self_id))
        .replace("$s", &escape_text(&session.username))
        .replace("$0", &escape_text(&session.content))
}

/// Expand `$1` to `$9`; missing groups become empty
pub fn apply_capture(answer: &str, capture: &[Option<String>]) -> String {
    let mut output = answer.to_string();
    for index in 1..=9 {
        let group = capture
            .get(index)
            .and_then(|group| group.as_deref())
            .unwrap_or_default();
        output = output.replace(&format!("${index}"), &escape_text(group));
    }
    output
}

/// Match `pattern` case-insensitively against `subject`
pub fn recapture(pattern: &str, subject: &str) -> Option<Vec<Option<String>>> {
    let pattern = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()?;
    capture_groups(&pattern, subject)
}

/// Split a substituted answer into tokens
///
/// An unbalanced `$(` is kept as text.
pub fn tokenize(answer: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = answer;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("$n") {
            push_text(&mut tokens, &mut text);
            tokens.push(Token::Break);
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix("$(") {
            if let Some(end) = closing_paren(after) {
                push_text(&mut tokens, &mut text);
                let source = segment::unescape(&restore(after[..end].trim()));
                tokens.push(Token::Command(source));
                rest = &after[end + 1..];
                continue;
            }
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            text.push(c);
        }
        rest = chars.as_str();
    }
    push_text(&mut tokens, &mut text);
    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: &mut String) {
    if !text.is_empty() {
        tokens.push(Token::Text(restore(&std::mem::take(text))));
    }
}

/// Byte offset of the parenthesis closing an already opened group
fn closing_paren(source: &str) -> Option<usize> {
    let mut depth = 1usize;
    for (offset, c) in source.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Token {
        Token::Text(s.to_string())
    }

    #[test]
    fn test_substitute_placeholders() {
        let mut session = Session::guild("200", "100", "foo $n");
        session.username = "Alice".into();
        let answer = substitute("$$ $a $s: $0", &session);
        let tokens = tokenize(&answer);
        assert_eq!(tokens, vec![text("$ <at id=\"200\"/> Alice: foo $n")]);
    }

    #[test]
    fn test_tokenize_breaks_and_commands() {
        assert_eq!(
            tokenize("1$n$(echo (a) b)2"),
            vec![
                text("1"),
                Token::Break,
                Token::Command("echo (a) b".into()),
                text("2")
            ]
        );
        assert_eq!(tokenize("$(open"), vec![text("$(open")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn test_capture_groups_are_escaped() {
        let capture = vec![Some("a$nb".to_string()), Some("$(x)".to_string()), None];
        let answer = apply_capture("[$1][$2][$9]", &capture);
        assert_eq!(tokenize(&answer), vec![text("[$(x)][][]")]);
    }

    #[test]
    fn test_markup_in_session_text_is_kept() {
        let session = Session::guild("200", "100", "a &amp; b &lt;x&gt; $(echo x)");
        let answer = substitute("echo:$0", &session);
        assert_eq!(
            tokenize(&answer),
            vec![text("echo:a &amp; b &lt;x&gt; $(echo x)")]
        );

        let capture = vec![None, Some("&amp;$1".to_string())];
        assert_eq!(tokenize(&apply_capture("<$1>", &capture)), vec![text("<&amp;$1>")]);
    }

    #[test]
    fn test_recapture_is_case_insensitive() {
        let capture = recapture("^A(.*)", "abc").unwrap();
        assert_eq!(capture[1].as_deref(), Some("bc"));
        assert!(recapture("(", "abc").is_none());
    }
}
