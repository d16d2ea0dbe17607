//! Contact bookkeeping and phone number comparison.
//!
//! Number matching has to tolerate country code variance: the stored number
//! may carry a `+43` or `0043` prefix while the network reports the national
//! form, or the other way round. Comparison therefore falls back to the
//! longest common suffix after stripping leading zeros and plus signs.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum common suffix length for two differing numbers to count as the
/// same line, and the maximum prefix length either side may have beyond it.
const SUFFIX_MATCH_FLOOR: usize = 5;

fn valid_number_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[+*# \-()\d]+$").expect("number charset regex compiles"))
}

fn leading_signs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0+]+([1-9].*)$").expect("leading signs regex compiles"))
}

/// Strip a leading run of `0`/`+` characters when a significant digit follows.
fn strip_leading_signs(number: &str) -> &str {
    match leading_signs().captures(number) {
        Some(caps) => caps.get(1).map(|m| m.as_str()).unwrap_or(number),
        None => number,
    }
}

/// The configured alert contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub name: String,
    pub number: String,
}

impl Contact {
    pub fn new(name: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
        }
    }

    /// "Name (number)" when a name is known, otherwise the bare number.
    pub fn display_string(&self) -> String {
        if self.name.is_empty() {
            self.number.clone()
        } else {
            format!("{} ({})", self.name, self.number)
        }
    }

    /// Store a new number. The name is cleared because it may not describe
    /// the new number anymore.
    pub fn set_number(&mut self, number: impl Into<String>) {
        self.number = number.into();
        self.name.clear();
    }

    /// A well formed number contains only `+ * # space - ( )` and digits,
    /// with at least one digit present.
    pub fn has_valid_number(&self) -> bool {
        valid_number_chars().is_match(&self.number)
            && self.number.chars().any(|ch| ch.is_ascii_digit())
    }

    /// Whether `incoming` identifies the same line as the stored number.
    ///
    /// Exact matches short-circuit. Otherwise both numbers lose their
    /// leading `0`/`+` run and the shorter common suffix is compared; the
    /// suffix must be longer than five characters and neither number may
    /// extend more than five characters beyond it.
    pub fn matches(&self, incoming: &str) -> bool {
        if self.number == incoming {
            return true;
        }

        let n1 = strip_leading_signs(&self.number).as_bytes();
        let n2 = strip_leading_signs(incoming).as_bytes();
        let size = n1.len().min(n2.len());

        size > SUFFIX_MATCH_FLOOR
            && n1.len() - size <= SUFFIX_MATCH_FLOOR
            && n2.len() - size <= SUFFIX_MATCH_FLOOR
            && n1[n1.len() - size..] == n2[n2.len() - size..]
    }
}
