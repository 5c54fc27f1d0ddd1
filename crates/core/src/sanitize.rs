//! Input sanitization against stored-HTML/script injection.
//!
//! Sanitization never fails; it silently degrades the string. It is
//! applied to `sender`, `subject`, and `content` after validation and
//! independently of it: a field can be perfectly valid and still carry
//! markup that must not reach the audit log.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// `javascript:` URI scheme, case-insensitive.
    static ref JS_SCHEME: Regex = Regex::new(r"(?i)javascript:").unwrap();
    /// Inline event-handler attribute patterns such as `onclick=`.
    static ref EVENT_HANDLER: Regex = Regex::new(r"(?i)on\w+=").unwrap();
}

/// Strip angle brackets, `javascript:` prefixes, and `on<word>=` event
/// handler patterns from the input.
///
/// The pattern removals iterate until a fixpoint so that fragments which
/// only become a match after an inner match is removed (e.g.
/// `javajavascript:script:`) are also stripped. This makes `clean`
/// idempotent: `clean(clean(s)) == clean(s)` for every input.
pub fn clean(input: &str) -> String {
    let mut out: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    loop {
        let pass = JS_SCHEME.replace_all(&out, "");
        let pass = EVENT_HANDLER.replace_all(&pass, "").into_owned();
        if pass == out {
            return out;
        }
        out = pass;
    }
}
