//! Teach command syntax
//!
//! ```text
//! #                 help
//! # q a             create
//! ##                stats
//! ## q a            search
//! ### q a           merged regexp search
//! #1,3..5 ...       view or modify dialogues
//! ##1,3..5          batch view
//! ```
//!
//! Tokens are separated by whitespace and may be quoted. `|` and `>#` take
//! the rest of the line.

use super::{LastSpan, TeachOptions, WriterOption};
use crate::config::AuthorityConfig;
use crate::core::errors::DialogueError;
use crate::core::types::DialogueId;
use crate::plugins::time::parse_time;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::time::Duration;

static IDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\.\d+)?(,\d+(\.\.\d+)?)*$").unwrap());
static INTERVAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:(\d+)d)?(?:(\d+)h)?(?:(\d+)m)?(?:(\d+)s)?$").unwrap());

/// What the command asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Help,
    Stats,
    /// Create, or review/revert history without targets
    Create,
    Search,
    Target(Vec<DialogueId>),
    BatchView(Vec<DialogueId>),
}

#[derive(Debug, Clone)]
pub struct TeachCommand {
    pub action: Action,
    pub options: TeachOptions,
    pub args: Vec<String>,
}

impl TeachCommand {
    /// Name of the operation for error messages
    pub fn operation(&self) -> &'static str {
        let options = &self.options;
        match &self.action {
            _ if options.revert => "revert",
            _ if options.remove => "remove",
            Action::Search | Action::BatchView(_) | Action::Stats => "search",
            Action::Target(_) => "modify",
            Action::Create if options.review => "review",
            Action::Create => "create",
            Action::Help => "show help",
        }
    }
}

/// Upper bound on the ids a single command may address
pub const MAX_TARGETS: usize = 1000;

/// Why an id list was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdsError {
    Syntax,
    TooMany,
}

/// Parse `1,3..5` into deduplicated ids, in first-seen order
pub fn parse_ids(source: &str) -> Result<Vec<DialogueId>, IdsError> {
    if !IDS_RE.is_match(source) {
        return Err(IdsError::Syntax);
    }
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for part in source.split(',') {
        let (start, end): (DialogueId, DialogueId) = match part.split_once("..") {
            Some((start, end)) => (
                start.parse().map_err(|_| IdsError::Syntax)?,
                end.parse().map_err(|_| IdsError::Syntax)?,
            ),
            None => {
                let id = part.parse().map_err(|_| IdsError::Syntax)?;
                (id, id)
            }
        };
        if start <= end && end - start >= MAX_TARGETS as DialogueId {
            return Err(IdsError::TooMany);
        }
        for id in start..=end {
            if seen.insert(id) {
                ids.push(id);
                if ids.len() > MAX_TARGETS {
                    return Err(IdsError::TooMany);
                }
            }
        }
    }
    Ok(ids)
}

/// Parse a duration such as `10m` or `1h30m`
pub fn parse_interval(source: &str) -> Option<Duration> {
    let captures = INTERVAL_RE.captures(source)?;
    let mut secs = 0u64;
    let mut any = false;
    for (index, unit) in [(1, 86400u64), (2, 3600), (3, 60), (4, 1)] {
        if let Some(value) = captures.get(index) {
            secs += value.as_str().parse::<u64>().ok()? * unit;
            any = true;
        }
    }
    (any && secs > 0).then(|| Duration::from_secs(secs))
}

fn parse_span(source: &str) -> Option<LastSpan> {
    match source.parse::<usize>() {
        Ok(0) => None,
        Ok(count) => Some(LastSpan::Count(count)),
        Err(_) => parse_interval(source).map(LastSpan::Interval),
    }
}

/// Whitespace tokenizer with quoting
struct Lexer<'a> {
    rest: &'a str,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self { rest: source }
    }

    fn next_token(&mut self) -> Option<String> {
        self.rest = self.rest.trim_start();
        let mut chars = self.rest.chars();
        let first = chars.next()?;
        let closing = match first {
            '"' => Some('"'),
            '\'' => Some('\''),
            '“' => Some('”'),
            _ => None,
        };
        if let Some(closing) = closing {
            let body = &self.rest[first.len_utf8()..];
            return Some(match body.find(closing) {
                Some(end) => {
                    let token = body[..end].to_string();
                    self.rest = &body[end + closing.len_utf8()..];
                    token
                }
                None => {
                    let token = body.to_string();
                    self.rest = "";
                    token
                }
            });
        }
        let end = self.rest.find(char::is_whitespace).unwrap_or(self.rest.len());
        let token = self.rest[..end].to_string();
        self.rest = &self.rest[end..];
        Some(token)
    }

    fn peek_token(&self) -> Option<String> {
        Lexer { rest: self.rest }.next_token()
    }

    fn take_rest(&mut self) -> String {
        let rest = self.rest.trim().to_string();
        self.rest = "";
        rest
    }
}

/// Required value of `option`
fn value(lexer: &mut Lexer, option: &str) -> Result<String, DialogueError> {
    lexer
        .next_token()
        .ok_or_else(|| DialogueError::invalid_option(option, "missing value"))
}

fn ids_value(lexer: &mut Lexer, option: &str) -> Result<Vec<DialogueId>, DialogueError> {
    let source = value(lexer, option)?;
    parse_ids(&source).map_err(|e| match e {
        IdsError::Syntax => DialogueError::invalid_option(option, "expected ids such as 1,3..5"),
        IdsError::TooMany => DialogueError::TooManyTargets(MAX_TARGETS),
    })
}

fn prob_value(lexer: &mut Lexer, option: &str) -> Result<f64, DialogueError> {
    value(lexer, option)?
        .parse()
        .map_err(|_| DialogueError::invalid_option(option, "expected a number"))
}

/// Optional value of `-l` / `-L`; a bare flag means the last one
fn span_value(lexer: &mut Lexer) -> LastSpan {
    match lexer.peek_token().as_deref().and_then(parse_span) {
        Some(span) => {
            lexer.next_token();
            span
        }
        None => LastSpan::Count(1),
    }
}

fn short_flag(
    flag: char,
    takes_value: bool,
    lexer: &mut Lexer,
    options: &mut TeachOptions,
) -> Result<(), DialogueError> {
    let name = format!("-{flag}");
    match flag {
        'r' => options.remove = true,
        'v' => options.review = true,
        'V' => options.revert = true,
        'R' => options.recursive = Some(false),
        'I' => options.ignore_hint = true,
        'x' => options.regexp = Some(true),
        'X' => options.regexp = Some(false),
        'f' => options.frozen = Some(true),
        'F' => options.frozen = Some(false),
        's' => options.substitute = Some(true),
        'S' => options.substitute = Some(false),
        'W' => options.writer = Some(WriterOption::Anonymous),
        'd' => options.disable = true,
        'D' => options.disable_global = true,
        'e' => options.enable = true,
        'E' => options.enable_global = true,
        'G' => options.global = true,
        'c' => options.context = Some(true),
        'C' => options.context = Some(false),
        'l' if takes_value => options.include_last = Some(span_value(lexer)),
        'L' if takes_value => options.exclude_last = Some(span_value(lexer)),
        'l' => options.include_last = Some(LastSpan::Count(1)),
        'L' => options.exclude_last = Some(LastSpan::Count(1)),
        'z' => {
            let secs = if takes_value {
                lexer
                    .peek_token()
                    .and_then(|token| token.parse::<u64>().ok())
                    .filter(|secs| *secs > 0)
            } else {
                None
            };
            if secs.is_some() {
                lexer.next_token();
            }
            options.successor_timeout = secs;
        }
        'p' | 'P' | 'w' | 'g' | 't' | 'T' if !takes_value => {
            return Err(DialogueError::invalid_option(name, "missing value"));
        }
        'p' => options.prob_s = Some(prob_value(lexer, &name)?),
        'P' => options.prob_a = Some(prob_value(lexer, &name)?),
        'w' => options.writer = Some(WriterOption::User(value(lexer, &name)?)),
        'g' => options.guilds = Some(value(lexer, &name)?),
        't' => options.start_time = Some(parse_time(&name, &value(lexer, &name)?)?),
        'T' => options.end_time = Some(parse_time(&name, &value(lexer, &name)?)?),
        _ => return Err(DialogueError::UnknownOption(name)),
    }
    options.given.push(name);
    Ok(())
}

fn is_flag_group(token: &str) -> bool {
    token.len() > 1
        && token.starts_with('-')
        && token[1..].chars().all(|c| c.is_ascii_alphabetic())
}

/// Parse options and positional arguments
fn parse_body(source: &str) -> Result<(TeachOptions, Vec<String>), DialogueError> {
    let mut lexer = Lexer::new(source);
    let mut options = TeachOptions::default();
    let mut args = Vec::new();

    while let Some(token) = lexer.next_token() {
        match token.as_str() {
            "|" => {
                options.pipe = Some(lexer.take_rest());
                options.given.push(token);
            }
            ">#" => {
                options.create_successor = Some(lexer.take_rest());
                options.given.push(token);
            }
            "=>" => {
                options.redirect = Some(value(&mut lexer, "=>")?);
                options.given.push(token);
            }
            "/" => {
                let page = value(&mut lexer, "/")?
                    .parse::<usize>()
                    .ok()
                    .filter(|page| *page > 0)
                    .ok_or_else(|| DialogueError::invalid_option("/", "expected a page number"))?;
                options.page = Some(page);
                options.given.push(token);
            }
            "<" => {
                options.set_pred = Some(ids_value(&mut lexer, "<")?);
                options.given.push(token);
            }
            "<<" => {
                options.add_pred = Some(ids_value(&mut lexer, "<<")?);
                options.given.push(token);
            }
            ">" => {
                options.set_succ = Some(ids_value(&mut lexer, ">")?);
                options.given.push(token);
            }
            ">>" => {
                options.add_succ = Some(ids_value(&mut lexer, ">>")?);
                options.given.push(token);
            }
            _ if is_flag_group(&token) => {
                let flags: Vec<char> = token[1..].chars().collect();
                for (index, flag) in flags.iter().enumerate() {
                    short_flag(*flag, index + 1 == flags.len(), &mut lexer, &mut options)?;
                }
            }
            _ => args.push(token),
        }
    }
    Ok((options, args))
}

/// Parse `content` if it is a teach command
///
/// Returns `None` when the message is not addressed to the teach command.
pub fn parse_command(prefix: &str, content: &str) -> Option<Result<TeachCommand, DialogueError>> {
    let content = content.trim();
    let head_end = content.find(char::is_whitespace).unwrap_or(content.len());
    let (head, body) = content.split_at(head_end);
    let last = prefix.chars().last()?;

    let rest = head.strip_prefix(prefix)?;
    let (search, rest) = match rest.strip_prefix(last) {
        Some(rest) => (true, rest),
        None => (false, rest),
    };
    let merge = search && rest == last.to_string();
    let ids = if rest.is_empty() || merge {
        None
    } else {
        match parse_ids(rest) {
            Ok(ids) => Some(ids),
            Err(IdsError::Syntax) => return None,
            Err(IdsError::TooMany) => return Some(Err(DialogueError::TooManyTargets(MAX_TARGETS))),
        }
    };

    let (mut options, args) = match parse_body(body) {
        Ok(parsed) => parsed,
        Err(e) => return Some(Err(e)),
    };
    let empty = args.is_empty() && options.is_empty();
    let action = match (search, ids) {
        (true, Some(ids)) => Action::BatchView(ids),
        (true, None) if empty => Action::Stats,
        (true, None) => {
            if merge {
                options.auto_merge = true;
                options.regexp = Some(true);
            }
            options.search = true;
            Action::Search
        }
        (false, Some(ids)) => Action::Target(ids),
        (false, None) if empty => Action::Help,
        (false, None) => Action::Create,
    };
    Some(Ok(TeachCommand {
        action,
        options,
        args,
    }))
}

/// Reject options above the invoker's authority
pub fn check_authority(
    options: &TeachOptions,
    levels: &AuthorityConfig,
    authority: u32,
) -> Result<(), DialogueError> {
    if options.regexp == Some(true) && authority < levels.regexp {
        return Err(DialogueError::InsufficientAuthority("-x".to_string()));
    }
    let required = [
        ("-f", levels.frozen),
        ("-F", levels.frozen),
        ("-W", levels.writer),
        ("-D", levels.context),
        ("-E", levels.context),
        ("-g", levels.context),
    ];
    for (option, level) in required {
        if authority < level && options.has(option) {
            return Err(DialogueError::InsufficientAuthority(option.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> TeachCommand {
        parse_command("#", content).unwrap().unwrap()
    }

    #[test]
    fn test_commands() {
        assert_eq!(parse("#").action, Action::Help);
        assert_eq!(parse("##").action, Action::Stats);
        assert_eq!(parse("# foo bar").action, Action::Create);
        assert_eq!(parse("## foo").action, Action::Search);
        assert_eq!(parse("#1,3..5 -r").action, Action::Target(vec![1, 3, 4, 5]));
        assert_eq!(parse("##2,1").action, Action::BatchView(vec![2, 1]));
        assert!(parse_command("#", "foo").is_none());
        assert!(parse_command("#", "#foo bar").is_none());
    }

    #[test]
    fn test_wide_ranges_are_rejected() {
        let started = std::time::Instant::now();
        assert_eq!(parse_ids("1..4000000000"), Err(IdsError::TooMany));
        assert_eq!(parse_ids("1..600,601..1200"), Err(IdsError::TooMany));
        assert_eq!(parse_ids("1..1000").map(|ids| ids.len()), Ok(1000));
        assert_eq!(parse_ids("1..1000,1..1000").map(|ids| ids.len()), Ok(1000));
        assert!(started.elapsed() < std::time::Duration::from_secs(1));

        assert_eq!(parse_ids("3,1..3"), Ok(vec![3, 1, 2]));
        assert_eq!(parse_ids("1,x"), Err(IdsError::Syntax));
        assert!(matches!(
            parse_command("#", "#1..99999 -r"),
            Some(Err(DialogueError::TooManyTargets(MAX_TARGETS)))
        ));
    }

    #[test]
    fn test_merged_search() {
        let command = parse("### ^foo");
        assert_eq!(command.action, Action::Search);
        assert!(command.options.auto_merge);
        assert_eq!(command.options.regexp, Some(true));
        assert_eq!(command.args, vec!["^foo"]);
    }

    #[test]
    fn test_quotes_and_combined_flags() {
        let command = parse("# \"foo bar\" 'baz qux' -xP 0.5");
        assert_eq!(command.args, vec!["foo bar", "baz qux"]);
        assert_eq!(command.options.regexp, Some(true));
        assert_eq!(command.options.prob_a, Some(0.5));
        assert!(command.options.has("-x"));
        assert!(command.options.has("-P"));
    }

    #[test]
    fn test_rest_of_line_options() {
        let command = parse("## foo | -p 0.5 -r");
        assert_eq!(command.args, vec!["foo"]);
        assert_eq!(command.options.pipe.as_deref(), Some("-p 0.5 -r"));

        let command = parse("#1 ># bar baz");
        assert_eq!(command.options.create_successor.as_deref(), Some("bar baz"));
    }

    #[test]
    fn test_flow_and_redirect_options() {
        let command = parse("# foo => bar < 1,2 >> 3");
        assert_eq!(command.args, vec!["foo"]);
        assert_eq!(command.options.redirect.as_deref(), Some("bar"));
        assert_eq!(command.options.set_pred, Some(vec![1, 2]));
        assert_eq!(command.options.add_succ, Some(vec![3]));
        assert!(parse_command("#", "# foo < bar").unwrap().is_err());
    }

    #[test]
    fn test_last_spans() {
        assert_eq!(parse("# -v -l 3").options.include_last, Some(LastSpan::Count(3)));
        assert_eq!(
            parse("# -v -L 10m").options.exclude_last,
            Some(LastSpan::Interval(Duration::from_secs(600)))
        );
        assert_eq!(parse("# -vl").options.include_last, Some(LastSpan::Count(1)));
        assert_eq!(parse("# -l foo").args, vec!["foo"]);
    }

    #[test]
    fn test_option_errors() {
        assert!(matches!(
            parse_command("#", "# foo -q").unwrap(),
            Err(DialogueError::UnknownOption(_))
        ));
        assert!(parse_command("#", "# foo bar -p").unwrap().is_err());
        assert!(parse_command("#", "# foo bar -p x").unwrap().is_err());
        assert!(parse_command("#", "# foo bar -t 25").unwrap().is_err());
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_interval("2d"), Some(Duration::from_secs(172_800)));
        assert_eq!(parse_interval(""), None);
        assert_eq!(parse_interval("10x"), None);
    }

    #[test]
    fn test_check_authority() {
        let levels = AuthorityConfig::default();
        let options = parse("# ^foo bar -x").options;
        assert!(check_authority(&options, &levels, 2).is_err());
        assert!(check_authority(&options, &levels, 3).is_ok());
        assert!(check_authority(&parse("# foo bar").options, &levels, 1).is_ok());
    }
}
