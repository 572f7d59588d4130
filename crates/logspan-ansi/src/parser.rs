use std::sync::LazyLock;

use regex::Regex;

use crate::color::{Color, lookup_256, lookup_rgb};
use crate::span::{Span, Style};

static LINK_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^https?://").expect("link pattern is valid"));

static SGR_SEQUENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\x1b\[([0-9;]+)m").expect("SGR pattern is valid"));

/// Styling state carried between spans (and optionally between lines)
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParserState {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub style: Option<Style>,
}

impl ParserState {
    /// Neutral state: nothing set
    pub fn is_neutral(&self) -> bool {
        self.foreground.is_none() && self.background.is_none() && self.style.is_none()
    }
}

/// Parse one line into spans, starting from a neutral style
pub fn parse(input: &str) -> Vec<Span> {
    parse_line(ParserState::default(), input).0
}

/// Parse one line starting from `state`, returning the spans and the state
/// in effect at the end of the line
pub fn parse_line(state: ParserState, input: &str) -> (Vec<Span>, ParserState) {
    let mut scanner = Scanner::new(state);
    scanner.scan(input);
    (scanner.spans, scanner.state)
}

/// Line-by-line parser that keeps colours and styles across lines
#[derive(Clone, Debug, Default)]
pub struct SpanParser {
    state: ParserState,
}

impl SpanParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the next line, continuing from the previous line's style
    pub fn parse_line(&mut self, line: &str) -> Vec<Span> {
        let (spans, state) = parse_line(std::mem::take(&mut self.state), line);
        self.state = state;
        spans
    }

    pub fn reset(&mut self) {
        self.state = ParserState::default();
    }
}

struct Scanner {
    state: ParserState,
    spans: Vec<Span>,
    text: String,
    in_link: bool,
}

impl Scanner {
    fn new(state: ParserState) -> Self {
        Self {
            state,
            spans: Vec::new(),
            text: String::new(),
            in_link: false,
        }
    }

    fn scan(&mut self, input: &str) {
        let mut pos = 0;
        let mut prev: Option<char> = None;

        loop {
            let rest = &input[pos..];
            let cur = rest.chars().next();
            let control = SGR_SEQUENCE.captures(rest);

            if self.in_link && (is_link_close(cur) || control.is_some()) {
                self.close_link();
            }

            if !self.in_link && is_link_open(prev) && LINK_OPEN.is_match(rest) {
                self.flush(None);
                self.in_link = true;
            }

            // Escape sequences are invisible to the lookback.
            if let Some(caps) = control {
                self.flush(None);
                apply_sgr(&mut self.state, &caps[1]);
                pos += caps[0].len();
                continue;
            }

            match cur {
                Some(c) => {
                    self.text.push(c);
                    pos += c.len_utf8();
                    prev = Some(c);
                }
                None => break,
            }
        }

        self.flush(None);
    }

    fn close_link(&mut self) {
        let href = self.text.clone();
        self.flush(Some(href));
        self.in_link = false;
    }

    /// Emit the pending text as a span; empty text emits nothing
    fn flush(&mut self, href: Option<String>) {
        if self.text.is_empty() {
            return;
        }
        self.spans.push(Span {
            href,
            text: std::mem::take(&mut self.text),
            foreground: self.state.foreground,
            background: self.state.background,
            style: self.state.style,
        });
    }
}

fn is_link_open(prev: Option<char>) -> bool {
    match prev {
        None | Some('<') => true,
        Some(c) => c.is_whitespace(),
    }
}

/// `>` also closes so that `<https://...>` leaves the bracket outside the link
fn is_link_close(cur: Option<char>) -> bool {
    match cur {
        None | Some('<') | Some('>') => true,
        Some(c) => c.is_whitespace(),
    }
}

enum ExtendedColor {
    Resolved(Option<Color>),
    Unrecognized,
}

/// Consume the sub-parameters of an extended colour (38/48)
fn extended_color<I>(codes: &mut I) -> ExtendedColor
where
    I: Iterator<Item = Option<u32>>,
{
    match codes.next().flatten() {
        Some(5) => ExtendedColor::Resolved(codes.next().flatten().and_then(lookup_256)),
        Some(2) => {
            let r = codes.next().flatten();
            let g = codes.next().flatten();
            let b = codes.next().flatten();
            ExtendedColor::Resolved(lookup_rgb(r, g, b))
        }
        _ => ExtendedColor::Unrecognized,
    }
}

fn clear_style(state: &mut ParserState, styles: &[Style]) {
    if state.style.is_some_and(|s| styles.contains(&s)) {
        state.style = None;
    }
}

/// Apply the semicolon-separated SGR parameters left to right
fn apply_sgr(state: &mut ParserState, params: &str) {
    let mut codes = params.split(';').map(|code| {
        if code.is_empty() {
            Some(0)
        } else {
            code.parse::<u32>().ok()
        }
    });

    while let Some(code) = codes.next() {
        let Some(code) = code else {
            continue;
        };
        match code {
            0 => *state = ParserState::default(),

            1 => state.style = Some(Style::Bold),
            2 => state.style = Some(Style::Faint),
            3 => state.style = Some(Style::Italic),
            4 => state.style = Some(Style::Underline),
            5 | 6 => state.style = Some(Style::Blink),
            7 => state.style = Some(Style::Invert),
            9 => state.style = Some(Style::Strike),

            22 => clear_style(state, &[Style::Bold, Style::Faint]),
            23 => clear_style(state, &[Style::Bold, Style::Italic]),
            24 => clear_style(state, &[Style::Underline]),
            25 => clear_style(state, &[Style::Blink]),
            27 => clear_style(state, &[Style::Invert]),
            29 => clear_style(state, &[Style::Strike]),

            30..=37 => state.foreground = Color::standard(code - 30),
            40..=47 => state.background = Color::standard(code - 40),
            90..=97 => state.foreground = Color::bright(code - 90),
            100..=107 => state.background = Color::bright(code - 100),
            39 => state.foreground = None,
            49 => state.background = None,

            38 | 48 => {
                let (color, stop) = match extended_color(&mut codes) {
                    ExtendedColor::Resolved(color) => (color, false),
                    // The remaining parameters can't be interpreted.
                    ExtendedColor::Unrecognized => (None, true),
                };
                if code == 38 {
                    state.foreground = color;
                } else {
                    state.background = color;
                }
                if stop {
                    break;
                }
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::rgb(170, 0, 0);
    const GREEN: Color = Color::rgb(0, 170, 0);

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Vec::<Span>::new());
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(parse("asdf"), vec![Span::plain("asdf")]);
    }

    #[test]
    fn test_bare_link() {
        assert_eq!(parse("https://foo.com"), vec![Span::link("https://foo.com")]);
    }

    #[test]
    fn test_link_between_words() {
        assert_eq!(
            parse("foo https://foo.com bar"),
            vec![
                Span::plain("foo "),
                Span::link("https://foo.com"),
                Span::plain(" bar"),
            ]
        );
    }

    #[test]
    fn test_angle_bracketed_link() {
        assert_eq!(
            parse("foo <https://foo.com> bar"),
            vec![
                Span::plain("foo <"),
                Span::link("https://foo.com"),
                Span::plain("> bar"),
            ]
        );
    }

    #[test]
    fn test_link_scheme_is_case_insensitive() {
        assert_eq!(parse("HTTP://foo.com"), vec![Span::link("HTTP://foo.com")]);
    }

    #[test]
    fn test_link_requires_open_boundary() {
        assert_eq!(
            parse("xhttps://foo.com"),
            vec![Span::plain("xhttps://foo.com")]
        );
    }

    #[test]
    fn test_consecutive_links() {
        assert_eq!(
            parse("http://a.com\thttp://b.com"),
            vec![
                Span::link("http://a.com"),
                Span::plain("\t"),
                Span::link("http://b.com"),
            ]
        );
    }

    #[test]
    fn test_reset_clears_foreground() {
        assert_eq!(
            parse("\u{1b}[31mRed\u{1b}[0mPlain"),
            vec![Span::plain("Red").with_foreground(RED), Span::plain("Plain")]
        );
    }

    #[test]
    fn test_color_changes_split_spans() {
        assert_eq!(
            parse("\u{1b}[31mRed\u{1b}[32mGreen"),
            vec![
                Span::plain("Red").with_foreground(RED),
                Span::plain("Green").with_foreground(GREEN),
            ]
        );
    }

    #[test]
    fn test_malformed_sequence_is_plain_text() {
        assert_eq!(
            parse("\u{1b}[32mGreen\u{1b}34mBlue"),
            vec![Span::plain("Green\u{1b}34mBlue").with_foreground(GREEN)]
        );
        assert_eq!(parse("\u{1b}[31"), vec![Span::plain("\u{1b}[31")]);
    }

    #[test]
    fn test_only_control_codes() {
        assert!(parse("\u{1b}[1m\u{1b}[31m\u{1b}[0m").is_empty());
    }

    #[test]
    fn test_backgrounds_and_bright_colors() {
        assert_eq!(
            parse("\u{1b}[44;91mx"),
            vec![
                Span::plain("x")
                    .with_background(Color::rgb(0, 0, 170))
                    .with_foreground(Color::rgb(255, 85, 85))
            ]
        );
        assert_eq!(
            parse("\u{1b}[107mx"),
            vec![Span::plain("x").with_background(Color::rgb(255, 255, 255))]
        );
    }

    #[test]
    fn test_multiple_codes_in_one_sequence() {
        assert_eq!(
            parse("\u{1b}[1;31mx"),
            vec![Span::plain("x").with_style(Style::Bold).with_foreground(RED)]
        );
    }

    #[test]
    fn test_later_style_overwrites_earlier() {
        assert_eq!(
            parse("\u{1b}[1m\u{1b}[4mx"),
            vec![Span::plain("x").with_style(Style::Underline)]
        );
        assert_eq!(
            parse("\u{1b}[6mx"),
            vec![Span::plain("x").with_style(Style::Blink)]
        );
    }

    #[test]
    fn test_code_23_clears_only_bold_or_italic() {
        assert_eq!(parse("\u{1b}[3m\u{1b}[23mx"), vec![Span::plain("x")]);
        assert_eq!(
            parse("\u{1b}[9m\u{1b}[23mx"),
            vec![Span::plain("x").with_style(Style::Strike)]
        );
    }

    #[test]
    fn test_extended_colors() {
        assert_eq!(
            parse("\u{1b}[38;5;196mx"),
            vec![Span::plain("x").with_foreground(Color::rgb(255, 0, 0))]
        );
        assert_eq!(
            parse("\u{1b}[48;2;10;20;30mx"),
            vec![Span::plain("x").with_background(Color::rgb(10, 20, 30))]
        );
        assert_eq!(
            parse("\u{1b}[38;5;1mx"),
            vec![Span::plain("x").with_foreground(RED)]
        );
    }

    #[test]
    fn test_unrecognized_extended_selector_leaves_color_unset() {
        assert_eq!(parse("\u{1b}[31m\u{1b}[38;7;1mx"), vec![Span::plain("x")]);
        assert_eq!(parse("\u{1b}[38;5;300mx"), vec![Span::plain("x")]);
        assert_eq!(parse("\u{1b}[38;2;1;2mx"), vec![Span::plain("x")]);
    }

    #[test]
    fn test_unknown_codes_are_ignored() {
        assert_eq!(
            parse("\u{1b}[31;53mx"),
            vec![Span::plain("x").with_foreground(RED)]
        );
    }

    #[test]
    fn test_default_color_codes() {
        assert_eq!(
            parse("\u{1b}[31;44m\u{1b}[39mx"),
            vec![Span::plain("x").with_background(Color::rgb(0, 0, 170))]
        );
    }

    #[test]
    fn test_link_keeps_current_colors() {
        assert_eq!(
            parse("\u{1b}[32mhttps://foo.com"),
            vec![Span::link("https://foo.com").with_foreground(GREEN)]
        );
    }

    #[test]
    fn test_control_sequence_closes_link() {
        assert_eq!(
            parse("https://foo.com\u{1b}[31m!"),
            vec![
                Span::link("https://foo.com"),
                Span::plain("!").with_foreground(RED),
            ]
        );
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(
            parse("╭─ \u{1b}[33mé https://x.io ─╮"),
            vec![
                Span::plain("╭─ "),
                Span::plain("é ").with_foreground(Color::rgb(170, 85, 0)),
                Span::link("https://x.io").with_foreground(Color::rgb(170, 85, 0)),
                Span::plain(" ─╮").with_foreground(Color::rgb(170, 85, 0)),
            ]
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        let line = "\u{1b}[1;32mok\u{1b}[0m see https://example.com/a?b=c";
        assert_eq!(parse(line), parse(line));
    }

    #[test]
    fn test_parse_line_returns_final_state() {
        let (spans, state) = parse_line(ParserState::default(), "\u{1b}[31mRed");
        assert_eq!(spans, vec![Span::plain("Red").with_foreground(RED)]);
        assert_eq!(state.foreground, Some(RED));

        let (spans, state) = parse_line(state, "still red\u{1b}[0m");
        assert_eq!(spans, vec![Span::plain("still red").with_foreground(RED)]);
        assert!(state.is_neutral());
    }

    #[test]
    fn test_span_parser_threads_state_across_lines() {
        let mut parser = SpanParser::new();
        parser.parse_line("\u{1b}[4;32mstart");
        assert_eq!(
            parser.parse_line("next"),
            vec![
                Span::plain("next")
                    .with_style(Style::Underline)
                    .with_foreground(GREEN)
            ]
        );

        parser.reset();
        assert_eq!(parser.parse_line("next"), vec![Span::plain("next")]);
    }

    #[test]
    fn test_plain_parse_resets_per_line() {
        parse("\u{1b}[31mRed");
        assert_eq!(parse("plain"), vec![Span::plain("plain")]);
    }
}
