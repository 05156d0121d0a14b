//! Question normalization
//!
//! Turns raw message text into the form questions are stored and matched
//! in, and detects whether the bot was addressed by one of its nicknames.

use crate::core::errors::DialogueError;
use crate::core::segment::{self, Segment};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;

const FULL_WIDTH: &str = "，、。～？！（）【】";
const HALF_WIDTH: &str = ",,.~?!()[]";

/// Inline elements allowed inside a question
pub const ALLOWED_ELEMENTS: &[&str] = &["face"];

static LEADING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[()\[\]]*").unwrap());
static TRAILING_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,?!()\[\]~]*$").unwrap());

static WIDTH_MAP: Lazy<HashMap<char, char>> =
    Lazy::new(|| FULL_WIDTH.chars().zip(HALF_WIDTH.chars()).collect());

/// Traditional to simplified mapping for common characters
static SIMPLIFIED: Lazy<HashMap<char, char>> = Lazy::new(|| {
    const PAIRS: &str = "們们說说這这個个來来時时國国會会為为麼么對对開开學学問问題题與与沒没現现還还\
        裡里後后過过話话愛爱見见長长點点電电東东車车嗎吗誰谁聽听讓让邊边種种樣样從从頭头機机關关無无\
        歡欢應应實实經经麗丽壞坏難难買买賣卖錢钱飛飞鳥鸟魚鱼貓猫師师給给謝谢請请讀读寫写東东覺觉氣气\
        媽妈爺爷記记變变體体紅红網网聲声歲岁錯错書书語语親亲舊旧雙双隻只萬万樂乐幾几嗎吗們们";
    let chars: Vec<char> = PAIRS.chars().filter(|c| !c.is_whitespace()).collect();
    chars
        .chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .collect()
});

/// Result of normalizing a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Unescaped source
    pub original: String,
    /// Normalized text with the nickname prefix removed
    pub parsed: String,
    /// A nickname prefix was present and followed by more text
    pub appellative: bool,
    /// The message consisted of a nickname only
    pub activated: bool,
}

/// Normalizes questions against a fixed set of bot nicknames
#[derive(Debug, Clone)]
pub struct Normalizer {
    name_re: Option<Regex>,
}

impl Normalizer {
    pub fn new<S: AsRef<str>>(nicknames: &[S]) -> Self {
        let names: Vec<String> = nicknames
            .iter()
            .map(|name| name.as_ref().trim())
            .filter(|name| !name.is_empty())
            .map(regex::escape)
            .collect();
        let name_re = if names.is_empty() {
            None
        } else {
            RegexBuilder::new(&format!(r"^@?({})([,，]\s*|\s+|$)", names.join("|")))
                .case_insensitive(true)
                .build()
                .ok()
        };
        Self { name_re }
    }

    pub fn strip_question(&self, source: &str) -> Result<Question, DialogueError> {
        if segment::has_element_except(source, ALLOWED_ELEMENTS) {
            return Err(DialogueError::InvalidQuestionKind);
        }

        let original = segment::unescape(source);
        let segments = segment::parse(source);
        let last = segments.len().saturating_sub(1);
        let normalized: String = segments
            .iter()
            .enumerate()
            .map(|(index, segment)| match segment {
                Segment::Text(text) => normalize_text(text, index == 0, index == last),
                Segment::Element { raw, .. } => raw.clone(),
            })
            .collect();

        let unprefixed = match &self.name_re {
            Some(re) => match re.find(&normalized) {
                Some(found) => &normalized[found.end()..],
                None => normalized.as_str(),
            },
            None => normalized.as_str(),
        };

        let prefixed = unprefixed.len() != normalized.len();
        Ok(Question {
            original,
            parsed: if unprefixed.is_empty() {
                normalized.clone()
            } else {
                unprefixed.to_string()
            },
            appellative: prefixed && !unprefixed.is_empty(),
            activated: prefixed && unprefixed.is_empty(),
        })
    }
}

fn normalize_text(text: &str, first: bool, last: bool) -> String {
    let mut message: String = segment::unescape(text)
        .chars()
        .map(|c| *SIMPLIFIED.get(&c).unwrap_or(&c))
        .flat_map(char::to_lowercase)
        .filter(|c| !c.is_whitespace())
        .map(|c| *WIDTH_MAP.get(&c).unwrap_or(&c))
        .collect();
    if first {
        message = LEADING_RE.replace(&message, "").into_owned();
    }
    if last {
        message = TRAILING_RE.replace(&message, "").into_owned();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn normalizer() -> Normalizer {
        Normalizer::new(&["koishi", "satori"])
    }

    #[test]
    fn test_plain_question() {
        let q = normalizer().strip_question("  Foo Bar?? ").unwrap();
        assert_eq!(q.parsed, "foobar");
        assert_eq!(q.original, "  Foo Bar?? ");
        assert!(!q.appellative);
        assert!(!q.activated);
    }

    #[test]
    fn test_full_width_folding() {
        let q = normalizer().strip_question("【你好，世界】！").unwrap();
        assert_eq!(q.parsed, "你好,世界");
    }

    #[test]
    fn test_internal_punctuation_kept() {
        let q = normalizer().strip_question("(a.b)").unwrap();
        assert_eq!(q.parsed, "a.b");
    }

    #[test]
    fn test_simplified_script() {
        let q = normalizer().strip_question("說話").unwrap();
        assert_eq!(q.parsed, "说话");
    }

    #[test]
    fn test_appellative_prefix() {
        let q = normalizer().strip_question("Koishi, foo").unwrap();
        assert_eq!(q.parsed, "foo");
        assert!(q.appellative);
        assert!(!q.activated);

        let q = normalizer().strip_question("satori，foo?").unwrap();
        assert_eq!(q.parsed, "foo");
        assert!(q.appellative);
    }

    #[test]
    fn test_activation() {
        let q = normalizer().strip_question("koishi").unwrap();
        assert_eq!(q.parsed, "koishi");
        assert!(q.activated);
        assert!(!q.appellative);
    }

    #[test]
    fn test_nickname_inside_word_is_not_prefix() {
        let q = normalizer().strip_question("koishifoo").unwrap();
        assert_eq!(q.parsed, "koishifoo");
        assert!(!q.appellative);
    }

    #[test]
    fn test_rejects_images() {
        let err = normalizer()
            .strip_question("foo<image url=\"x\"/>")
            .unwrap_err();
        assert!(matches!(err, DialogueError::InvalidQuestionKind));
        assert!(normalizer().strip_question("foo<face id=\"1\"/>").is_ok());
    }

    #[test]
    fn test_unescapes_original() {
        let q = normalizer().strip_question("&#91;x&#93; &amp; y").unwrap();
        assert_eq!(q.original, "[x] & y");
        assert_eq!(q.parsed, "x]&y");
    }

    proptest! {
        #[test]
        fn normalizing_normalized_text_is_identity(text in "[a-z0-9]{1,24}") {
            let n = normalizer();
            let once = n.strip_question(&text).unwrap();
            let twice = n.strip_question(&once.parsed).unwrap();
            prop_assert_eq!(&once.parsed, &twice.parsed);
            if !text.starts_with("koishi") && !text.starts_with("satori") {
                prop_assert_eq!(&once.parsed, &text);
            }
        }
    }
}
