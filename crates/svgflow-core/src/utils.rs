use regex::Regex;
use url::Url;

pub const BLANK_URL: &str = "about:blank";

/// Characters that turn an id token, legend or filter alternative into a pattern.
const REGEX_META: &[char] = &['*', '+', '?', '^', '$', '(', ')', '[', ']', '{', '}', '|', '\\'];

fn prefix_tag_regex() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| Regex::new(r"_prfx\d+$").expect("valid regex"))
}

pub fn has_regex_meta(s: &str) -> bool {
    s.contains(REGEX_META)
}

/// Compiles `pattern` so that it has to match the whole subject.
pub fn anchored_regex(pattern: &str) -> Option<Regex> {
    match Regex::new(&format!("^(?:{pattern})$")) {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::debug!(pattern, error = %err, "invalid pattern");
            None
        }
    }
}

/// Literal or pattern match of names, depending on whether the needle carries metacharacters.
/// The pattern is compiled once, so one matcher can test many names.
#[derive(Debug, Clone)]
pub struct NameMatcher<'a> {
    needle: &'a str,
    pattern: Option<Regex>,
}

impl<'a> NameMatcher<'a> {
    pub fn new(needle: &'a str) -> Self {
        let pattern = if has_regex_meta(needle) {
            anchored_regex(needle)
        } else {
            None
        };
        Self { needle, pattern }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.needle == name || self.pattern.as_ref().is_some_and(|re| re.is_match(name))
    }
}

/// Removes the internal `_prfx<digits>` disambiguation suffix from a label.
pub fn strip_prefix_tag(label: &str) -> &str {
    match prefix_tag_regex().find(label) {
        Some(m) => &label[..m.start()],
        None => label,
    }
}

pub fn with_prefix_tag(label: &str, n: usize) -> String {
    format!("{label}_prfx{n}")
}

fn is_ctrl_character_like(ch: char) -> bool {
    matches!(ch,
        '\u{0000}'..='\u{001F}'
        | '\u{007F}'..='\u{009F}'
        | '\u{2000}'..='\u{200D}'
        | '\u{FEFF}'
    )
}

fn is_invalid_protocol_like(url_scheme: &str) -> bool {
    let lower = url_scheme.to_ascii_lowercase();
    let trimmed = lower.trim();
    let trimmed = trimmed.trim_start_matches(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '_'));

    trimmed.starts_with("javascript")
        || trimmed.starts_with("data")
        || trimmed.starts_with("vbscript")
}

/// Makes a rule link safe to embed: script-like schemes collapse to `about:blank`.
pub fn sanitize_url(url: &str) -> String {
    let cleaned: String = url
        .trim()
        .chars()
        .filter(|&ch| !is_ctrl_character_like(ch))
        .collect();
    if cleaned.is_empty() {
        return BLANK_URL.to_string();
    }

    if matches!(cleaned.as_bytes().first(), Some(b'.' | b'/' | b'#' | b'?')) {
        return cleaned;
    }

    let Some(colon) = cleaned.find(':') else {
        return cleaned;
    };
    let scheme = &cleaned[..=colon];
    if is_invalid_protocol_like(scheme) {
        return BLANK_URL.to_string();
    }

    let lower_scheme = scheme.to_ascii_lowercase();
    if lower_scheme == "http:" || lower_scheme == "https:" {
        let Ok(parsed) = Url::parse(&cleaned.replace('\\', "/")) else {
            return BLANK_URL.to_string();
        };
        return parsed.to_string();
    }

    cleaned
}
