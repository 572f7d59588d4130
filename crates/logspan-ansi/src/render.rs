use ratatui::style::{Modifier, Style as TuiStyle};
use ratatui::text::{Line, Span as TuiSpan};

use crate::span::{Span, Style};

/// Concatenate the visible text of a line's spans
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}

/// Convert parsed spans into a ratatui line
pub fn to_line(spans: &[Span]) -> Line<'static> {
    Line::from(
        spans
            .iter()
            .map(|span| TuiSpan::styled(span.text.clone(), tui_style(span)))
            .collect::<Vec<_>>(),
    )
}

fn tui_style(span: &Span) -> TuiStyle {
    let mut style = TuiStyle::default();
    if let Some(fg) = span.foreground {
        style = style.fg(fg.into());
    }
    if let Some(bg) = span.background {
        style = style.bg(bg.into());
    }
    if let Some(named) = span.style {
        style = style.add_modifier(modifier(named));
    }
    // Links are always underlined
    if span.is_link() {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    style
}

fn modifier(style: Style) -> Modifier {
    match style {
        Style::Bold => Modifier::BOLD,
        Style::Faint => Modifier::DIM,
        Style::Italic => Modifier::ITALIC,
        Style::Underline => Modifier::UNDERLINED,
        Style::Blink => Modifier::SLOW_BLINK,
        Style::Invert => Modifier::REVERSED,
        Style::Strike => Modifier::CROSSED_OUT,
    }
}
