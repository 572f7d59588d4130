use regex::Regex;

use logspan_types::LogEvent;

/// Case-insensitive substring filter over event messages
#[derive(Clone)]
pub struct EventFilter {
    /// Compiled matcher (None = match everything)
    regex: Option<Regex>,

    /// Filter string as given
    pattern: String,
}

impl EventFilter {
    /// Compile a filter; `None` or an empty string matches every event
    pub fn new(filter_str: Option<&str>) -> Self {
        let pattern = filter_str.unwrap_or_default().to_string();
        let regex = if pattern.is_empty() {
            None
        } else {
            // An escaped literal always compiles
            Regex::new(&format!("(?i){}", regex::escape(&pattern))).ok()
        };

        Self { regex, pattern }
    }

    /// Check if an event matches this filter
    pub fn matches(&self, event: &LogEvent) -> bool {
        match &self.regex {
            Some(re) => re.is_match(&event.message),
            None => true,
        }
    }

    /// Find all match positions in a string (for highlighting)
    pub fn find_matches(&self, text: &str) -> Vec<(usize, usize)> {
        match &self.regex {
            Some(re) => re.find_iter(text).map(|m| (m.start(), m.end())).collect(),
            None => Vec::new(),
        }
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }
}

impl std::fmt::Debug for EventFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFilter")
            .field("pattern", &self.pattern)
            .finish()
    }
}
