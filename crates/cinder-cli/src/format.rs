//! Pretty-printing for typed replies.
//!
//! Output conventions follow redis-cli: strings green and quoted,
//! integers yellow with an `(integer)` prefix, nil dimmed, errors red
//! with the wire error code appended.

use cinder_protocol::Reply;
use colored::Colorize;

/// Formats a reply for terminal display.
pub fn format_reply(reply: &Reply) -> String {
    match reply {
        Reply::Nil => format!("{}", "(nil)".dimmed()),

        Reply::Error { code, message } => format!(
            "{} {} {}",
            "(error)".red(),
            sanitize(message).red(),
            format!("[code {code}]").dimmed()
        ),

        Reply::String(data) => match std::str::from_utf8(data) {
            Ok(s) => format!("\"{}\"", sanitize(s)).green().to_string(),
            Err(_) => {
                // binary data, show as hex
                let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
                hex.green().to_string()
            }
        },

        Reply::Integer(n) => {
            format!("{} {}", "(integer)".yellow(), n.to_string().yellow())
        }

        Reply::Double(d) => {
            format!("{} {}", "(double)".yellow(), d.to_string().yellow())
        }
    }
}

/// Strips ANSI escapes and other control characters from
/// server-supplied strings so replies cannot manipulate the terminal.
fn sanitize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if let Some(next) = chars.next() {
                if next == '[' {
                    // CSI sequence, consume until a letter
                    for c in chars.by_ref() {
                        if c.is_ascii_alphabetic() {
                            break;
                        }
                    }
                }
            }
        } else if ch == '\t' || !ch.is_control() {
            out.push(ch);
        }
    }
    out
}
