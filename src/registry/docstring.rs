//! Google-style documentation parsing.
//!
//! Tool documentation follows a small grammar:
//!
//! ```text
//! Summary line(s).
//!
//! Args:
//!     name: description
//!         continuation, indented deeper
//!     other (type): description
//!
//! Returns:
//!     What comes back.
//! ```
//!
//! Section headers are lines whose trimmed, lowercased text is one of
//! [`SECTION_HEADERS`]. Inside a section, any unindented line ending in `:`
//! ends the section.

/// Recognized section headers (lowercase, colon included).
pub const SECTION_HEADERS: &[&str] = &[
    "args:",
    "arguments:",
    "parameters:",
    "returns:",
    "return:",
    "raises:",
    "raise:",
    "yields:",
    "yield:",
    "examples:",
    "example:",
    "note:",
    "notes:",
    "warning:",
    "warnings:",
];

const ARGS_HEADERS: &[&str] = &["args:", "arguments:", "parameters:"];
const RETURNS_HEADERS: &[&str] = &["returns:", "return:"];

/// Summary used when a tool carries no documentation.
pub const NO_DESCRIPTION: &str = "No description available";

/// Parsed view over one documentation string.
#[derive(Debug, Clone)]
pub struct Docstring<'a> {
    lines: Vec<&'a str>,
}

impl<'a> Docstring<'a> {
    pub fn parse(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
        }
    }

    /// Summary: every non-empty line before the first section header,
    /// trimmed and joined with single spaces.
    pub fn summary(&self) -> String {
        let parts: Vec<&str> = self
            .lines
            .iter()
            .take_while(|line| !is_section_header(line, Some(SECTION_HEADERS), false))
            .map(|line| line.trim())
            .filter(|line| !line.is_empty())
            .collect();

        if parts.is_empty() {
            NO_DESCRIPTION.to_string()
        } else {
            parts.join(" ")
        }
    }

    /// Description of `name` from the Args section, continuation lines included.
    pub fn param(&self, name: &str) -> Option<String> {
        let start = self.section_start(ARGS_HEADERS)?;
        let typed_prefix = format!("{} (", name);

        for (offset, line) in self.lines[start..].iter().enumerate() {
            if is_section_header(line, None, true) {
                break;
            }

            let Some((param_part, desc_part)) = line.trim().split_once(':') else {
                continue;
            };
            let param_part = param_part.trim();

            if param_part == name || param_part.starts_with(&typed_prefix) {
                let desc_part = desc_part.trim();
                if !desc_part.is_empty() {
                    return Some(self.continuation(start + offset, desc_part));
                }
            }
        }

        None
    }

    /// Returns section text, or `None` when absent or empty.
    pub fn returns(&self) -> Option<String> {
        let start = self.section_start(RETURNS_HEADERS)?;
        let mut parts: Vec<&str> = Vec::new();

        for line in &self.lines[start..] {
            if is_section_header(line, None, true) {
                break;
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if parts.is_empty() {
                    continue;
                }
                break;
            }
            parts.push(trimmed);
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Index of the first line after a header from `names`.
    fn section_start(&self, names: &[&str]) -> Option<usize> {
        self.lines
            .iter()
            .position(|line| is_section_header(line, Some(names), false))
            .map(|i| i + 1)
    }

    /// Join `first` with following lines indented strictly deeper than line `index`.
    fn continuation(&self, index: usize, first: &str) -> String {
        let base_indent = indent_of(self.lines[index]);
        let mut parts = vec![first];

        for line in &self.lines[index + 1..] {
            if line.trim().is_empty() {
                continue;
            }
            if indent_of(line) > base_indent {
                parts.push(line.trim());
            } else {
                break;
            }
        }

        parts.join(" ")
    }
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Whether `line` is a section header.
///
/// With `valid` set, the trimmed lowercase text must be one of those names.
/// With `check_indentation`, indented lines never count as headers.
fn is_section_header(line: &str, valid: Option<&[&str]>, check_indentation: bool) -> bool {
    let stripped = line.trim();
    if stripped.is_empty() || !stripped.ends_with(':') {
        return false;
    }
    if check_indentation && line.starts_with([' ', '\t']) {
        return false;
    }
    match valid {
        Some(names) => {
            let lowered = stripped.to_lowercase();
            names.iter().any(|name| *name == lowered)
        }
        None => true,
    }
}
