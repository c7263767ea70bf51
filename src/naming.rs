//! Output filename templating and per-batch collision resolution
//!
//! Templates use `{placeholder}` tokens. Recognized placeholders are
//! `{name}`, `{ext}`, `{index}`, `{width}`, `{height}`, `{ratio}`, `{preset}`
//! and `{timestamp}`; anything else is kept verbatim. The expanded text is
//! always sanitized, and the format extension is appended when the template
//! neither references `{ext}` nor already ends with it.

use crate::{config::OutputFormat, services::OutputFormatHandler};
use std::collections::HashSet;

/// Longest filename produced by `sanitize`, in characters
pub const MAX_FILENAME_CHARS: usize = 200;

/// Name used when sanitizing leaves nothing
pub const FALLBACK_FILENAME: &str = "untitled";

const FORBIDDEN_CHARS: &[char] = &['/', '\\', '?', '%', '*', ':', '|', '"', '<', '>'];

/// Format string for the batch-wide `{timestamp}` value
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Values available to a template for one image
#[derive(Debug, Clone)]
pub struct NamingContext<'a> {
    /// Source file name without extension
    pub name: &'a str,
    /// 1-based position in the batch
    pub index: usize,
    pub width: u32,
    pub height: u32,
    /// Effective (post-coercion) output format
    pub format: OutputFormat,
    pub preset: Option<&'a str>,
    /// Batch capture time, shared by every image of the batch
    pub timestamp: &'a str,
}

/// Parsed filename template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTemplate {
    template: String,
    references_ext: bool,
}

impl FilenameTemplate {
    #[must_use]
    pub fn new<S: Into<String>>(template: S) -> Self {
        let template = template.into();
        let references_ext = template.contains("{ext}");
        Self {
            template,
            references_ext,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Expand, sanitize and complete the extension
    #[must_use]
    pub fn expand(&self, ctx: &NamingContext<'_>) -> String {
        let extension = OutputFormatHandler::get_extension(ctx.format);
        let substituted = self.substitute(ctx, extension);
        let mut name = sanitize(&substituted);

        if !self.references_ext && !has_extension(&name, ctx.format) {
            name.push('.');
            name.push_str(extension);
        }
        name
    }

    fn substitute(&self, ctx: &NamingContext<'_>, extension: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + 32);
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(rest.get(..open).unwrap_or_default());
            let after_open = rest.get(open..).unwrap_or_default();
            let Some(close) = after_open.find('}') else {
                out.push_str(after_open);
                rest = "";
                break;
            };

            let token = after_open.get(1..close).unwrap_or_default();
            match Self::placeholder_value(token, ctx, extension) {
                Some(value) => out.push_str(&value),
                None => out.push_str(after_open.get(..=close).unwrap_or_default()),
            }
            rest = after_open.get(close + 1..).unwrap_or_default();
        }
        out.push_str(rest);
        out
    }

    fn placeholder_value(
        token: &str,
        ctx: &NamingContext<'_>,
        extension: &str,
    ) -> Option<String> {
        let value = match token {
            "name" => ctx.name.to_string(),
            "ext" => extension.to_string(),
            "index" => ctx.index.to_string(),
            "width" => ctx.width.to_string(),
            "height" => ctx.height.to_string(),
            "ratio" => aspect_ratio(ctx.width, ctx.height),
            "preset" => ctx.preset.unwrap_or_default().to_string(),
            "timestamp" => ctx.timestamp.to_string(),
            _ => return None,
        };
        Some(value)
    }
}

impl Default for FilenameTemplate {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_FILENAME_TEMPLATE)
    }
}

fn gcd(a: u32, b: u32) -> u32 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// `width:height` reduced by their greatest common divisor
#[must_use]
pub fn aspect_ratio(width: u32, height: u32) -> String {
    match gcd(width, height) {
        0 => format!("{width}:{height}"),
        divisor => format!("{}:{}", width / divisor, height / divisor),
    }
}

fn has_extension(name: &str, format: OutputFormat) -> bool {
    let Some((_, ext)) = name.rsplit_once('.') else {
        return false;
    };
    let expected = OutputFormatHandler::get_extension(format);
    ext.eq_ignore_ascii_case(expected)
        || (format == OutputFormat::Jpeg && ext.eq_ignore_ascii_case("jpeg"))
}

/// Make a string safe to use as a filename
///
/// Forbidden characters become `-`, runs of `-` collapse, leading/trailing
/// `-` and spaces are trimmed, and the result is capped at
/// `MAX_FILENAME_CHARS`. Empty results become `untitled`. Idempotent.
#[must_use]
pub fn sanitize(input: &str) -> String {
    let mut collapsed = String::with_capacity(input.len());
    for c in input.chars() {
        let c = if FORBIDDEN_CHARS.contains(&c) { '-' } else { c };
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    let is_trimmed = |c: char| c == '-' || c == ' ';
    let truncated: String = collapsed
        .trim_matches(is_trimmed)
        .chars()
        .take(MAX_FILENAME_CHARS)
        .collect();
    // Truncation can expose a new trailing separator
    let result = truncated.trim_matches(is_trimmed);

    if result.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        result.to_string()
    }
}

/// Names already assigned within one batch
#[derive(Debug, Default)]
pub struct FilenameRegistry {
    names: HashSet<String>,
}

impl FilenameRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolve a collision-free name and register it
    ///
    /// Collisions get `(1)`, `(2)`, … inserted before the extension.
    pub fn make_unique(&mut self, candidate: &str) -> String {
        if self.names.insert(candidate.to_string()) {
            return candidate.to_string();
        }

        let (base, extension) = match candidate.rfind('.') {
            Some(pos) if pos > 0 => (
                candidate.get(..pos).unwrap_or(candidate),
                candidate.get(pos..).unwrap_or_default(),
            ),
            _ => (candidate, ""),
        };

        let mut counter = 1usize;
        loop {
            let attempt = format!("{base}({counter}){extension}");
            if self.names.insert(attempt.clone()) {
                return attempt;
            }
            counter += 1;
        }
    }
}
