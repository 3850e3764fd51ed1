//! Turns message text into the small HTML subset the chat view shows.
//!
//! The substitutions run in a fixed order and nothing is escaped first, so
//! stray `*` or backticks can produce unbalanced markup. Callers must not
//! treat the output as sanitized.

use once_cell::sync::Lazy;
use regex::Regex;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("bold pattern"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("italic pattern"));
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("code pattern"));

pub fn format_message(content: &str) -> String {
    let formatted = content.replace('\n', "<br>");
    let formatted = BOLD.replace_all(&formatted, "<strong>$1</strong>");
    let formatted = ITALIC.replace_all(&formatted, "<em>$1</em>");
    let formatted = CODE.replace_all(&formatted, "<code>$1</code>");
    format!("<p>{formatted}</p>")
}
