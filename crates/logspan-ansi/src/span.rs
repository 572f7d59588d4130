use serde::Serialize;

use crate::color::Color;

/// Named text attribute; only one is active at a time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Bold,
    Faint,
    Italic,
    Underline,
    Blink,
    Invert,
    Strike,
}

/// A contiguous run of text with uniform style
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,

    pub text: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
}

impl Span {
    /// Unstyled text span
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Hyperlink span whose text is its own target
    pub fn link(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            href: Some(url.clone()),
            text: url,
            ..Default::default()
        }
    }

    pub fn with_foreground(mut self, color: Color) -> Self {
        self.foreground = Some(color);
        self
    }

    pub fn with_background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn is_link(&self) -> bool {
        self.href.is_some()
    }
}
