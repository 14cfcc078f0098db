//! mIRC formatting and escape stripping.
//!
//! Server-reported names (e.g. the RPL_MYINFO hostname) occasionally carry
//! formatting codes; they are stripped before being used as lookup keys.
//!
//! Codes handled: bold `\x02`, color `\x03[fg[,bg]]`, hex color
//! `\x04[rrggbb[,rrggbb]]`, reset `\x0F`, monospace `\x11`, reverse `\x16`,
//! italic `\x1D`, strikethrough `\x1E` and underline `\x1F`.
//!
//! Reference: <https://modern.ircdocs.horse/formatting>

use std::borrow::Cow;

const COLOR: char = '\x03';
const HEX_COLOR: char = '\x04';

/// Returns true if the character is an IRC formatting code.
///
/// ```
/// use slirc_proto::format::is_irc_format_code;
///
/// assert!(is_irc_format_code('\x02'));
/// assert!(!is_irc_format_code('a'));
/// ```
#[inline]
pub fn is_irc_format_code(ch: char) -> bool {
    matches!(
        ch,
        '\x02' | '\x03' | '\x04' | '\x0F' | '\x11' | '\x16' | '\x1D' | '\x1E' | '\x1F'
    )
}

/// Strip every formatting code, including color arguments.
///
/// Borrows when there is nothing to strip.
///
/// ```
/// use slirc_proto::strip_formatting;
///
/// assert_eq!(strip_formatting("\x0304,12irc\x0F.example.net"), "irc.example.net");
/// ```
pub fn strip_formatting(s: &str) -> Cow<'_, str> {
    if !s.contains(is_irc_format_code) {
        return Cow::Borrowed(s);
    }

    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            COLOR => i = skip_color_args(&chars, i, 2, |c| c.is_ascii_digit()),
            HEX_COLOR => i = skip_color_args(&chars, i, 6, |c| c.is_ascii_hexdigit()),
            c if is_irc_format_code(c) => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Skip `fg[,bg]` after a color code. The comma is only consumed when a
/// background value follows it.
fn skip_color_args(chars: &[char], start: usize, width: usize, valid: fn(char) -> bool) -> usize {
    let run = |from: usize| {
        chars[from..]
            .iter()
            .take(width)
            .take_while(|c| valid(**c))
            .count()
    };

    let fg = run(start);
    if fg == 0 {
        return start;
    }
    let mut i = start + fg;
    if chars.get(i) == Some(&',') {
        let bg = run(i + 1);
        if bg > 0 {
            i += 1 + bg;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_basic() {
        assert_eq!(strip_formatting("\x02bold\x02"), "bold");
        assert_eq!(strip_formatting("\x1Funderline\x0F"), "underline");
    }

    #[test]
    fn test_strip_colors() {
        assert_eq!(strip_formatting("\x034red"), "red");
        assert_eq!(strip_formatting("\x0304red"), "red");
        assert_eq!(strip_formatting("\x034,5colored"), "colored");
        assert_eq!(strip_formatting("\x03,5comma"), ",5comma");
        assert_eq!(strip_formatting("\x034,text"), ",text");
        assert_eq!(strip_formatting("\x03123"), "3");
    }

    #[test]
    fn test_strip_hex_colors() {
        assert_eq!(strip_formatting("\x04FF0000,00FF00x"), "x");
        assert_eq!(strip_formatting("\x04plain"), "plain");
    }

    #[test]
    fn test_no_formatting_borrows() {
        assert!(matches!(strip_formatting("plain text"), Cow::Borrowed(_)));
    }
}
