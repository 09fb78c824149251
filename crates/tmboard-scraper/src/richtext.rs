//! The game client's `$`-escape rich-text format.
//!
//! A name is a sequence of [`StyleRun`]s. Plain runs are written verbatim;
//! every other run is wrapped as `$<` + codes + text + `$>`, where codes are,
//! in this order, a color `$rgb` (one hex digit per channel), `$i` for
//! italic and `$o` for bold.

use std::fmt;

use crate::error::TranscodeError;

/// Color code used when a styled run carries no explicit `color`.
pub const DEFAULT_COLOR: &str = "fff";

const NBSP: char = '\u{a0}';

/// A span of text sharing one color/italic/bold combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRun {
    pub text: String,
    /// Three hex digits, already reduced from the CSS color.
    pub color: Option<String>,
    pub italic: bool,
    pub bold: bool,
}

impl StyleRun {
    #[must_use]
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            color: None,
            italic: false,
            bold: false,
        }
    }

    #[must_use]
    pub fn styled(text: impl Into<String>, style: SpanStyle) -> Self {
        Self {
            text: text.into(),
            color: style.color,
            italic: style.italic,
            bold: style.bold,
        }
    }

    /// Plain runs are emitted without any `$<`/`$>` wrapper.
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.color.is_none() && !self.italic && !self.bold
    }

    fn write_markup(&self, out: &mut String) {
        if self.is_plain() {
            out.push_str(&self.text);
            return;
        }
        out.push_str("$<$");
        out.push_str(self.color.as_deref().unwrap_or(DEFAULT_COLOR));
        if self.italic {
            out.push_str("$i");
        }
        if self.bold {
            out.push_str("$o");
        }
        out.push_str(&self.text);
        out.push_str("$>");
    }
}

/// An ordered list of runs making up one display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedName {
    runs: Vec<StyleRun>,
}

impl FormattedName {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, run: StyleRun) {
        self.runs.push(run);
    }

    #[must_use]
    pub fn runs(&self) -> &[StyleRun] {
        &self.runs
    }

    /// The readable name with all styling dropped; used as the row's raw
    /// name so it always matches the markup's text.
    #[must_use]
    pub fn plain_text(&self) -> String {
        let text: String = self.runs.iter().map(|run| run.text.as_str()).collect();
        replace_nbsp(&text)
    }

    /// Serializes the runs into `$` markup.
    #[must_use]
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        for run in &self.runs {
            run.write_markup(&mut out);
        }
        replace_nbsp(&out)
    }
}

impl fmt::Display for FormattedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markup())
    }
}

impl FromIterator<StyleRun> for FormattedName {
    fn from_iter<I: IntoIterator<Item = StyleRun>>(iter: I) -> Self {
        Self {
            runs: iter.into_iter().collect(),
        }
    }
}

/// The declarations of one `style` attribute that affect the markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub color: Option<String>,
    pub italic: bool,
    pub bold: bool,
}

impl SpanStyle {
    /// Applies this style on top of an enclosing span's.
    ///
    /// The color is replaced when set here. Italic and bold accumulate: a
    /// nested `normal` cannot switch off what the parent turned on, since
    /// the markup has no code for that.
    #[must_use]
    pub fn inherit(self, parent: &SpanStyle) -> SpanStyle {
        SpanStyle {
            color: self.color.or_else(|| parent.color.clone()),
            italic: self.italic || parent.italic,
            bold: self.bold || parent.bold,
        }
    }
}

/// Parses an inline CSS `style` attribute.
///
/// Only `color`, `font-style` and `font-weight` change the output.
/// `letter-spacing` and `font-size` are accepted and ignored. Any other
/// property is rejected so that unsupported styling is never dropped silently.
///
/// # Errors
///
/// - [`TranscodeError::UnrecognizedStyleProperty`] for a property outside the
///   allow-list, or a declaration without a `:`.
/// - [`TranscodeError::UnexpectedColorFormat`] for a color that is not `#rgb`
///   or `#rrggbb`.
pub fn parse_style(style: &str) -> Result<SpanStyle, TranscodeError> {
    let mut parsed = SpanStyle::default();

    for declaration in style.split(';').map(str::trim).filter(|d| !d.is_empty()) {
        let Some((property, value)) = declaration.split_once(':') else {
            return Err(TranscodeError::UnrecognizedStyleProperty {
                property: declaration.to_string(),
            });
        };
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();

        match property.as_str() {
            "color" => parsed.color = Some(reduce_color(value)?),
            "font-style" => {
                parsed.italic = matches!(
                    value.to_ascii_lowercase().as_str(),
                    "italic" | "oblique"
                );
            }
            "font-weight" => parsed.bold = is_bold(value),
            "letter-spacing" | "font-size" => {}
            _ => return Err(TranscodeError::UnrecognizedStyleProperty { property }),
        }
    }

    Ok(parsed)
}

/// Reduces a CSS hex color to the three-digit client code.
///
/// `#rrggbb` keeps the high digit of each channel (characters 1, 3 and 5 of
/// the value), so `#aabbcc` becomes `abc`. The shorthand `#rgb` is already in
/// that form.
///
/// # Errors
///
/// Returns [`TranscodeError::UnexpectedColorFormat`] when the value does not
/// start with `#` or is not three or six hex digits.
pub fn reduce_color(value: &str) -> Result<String, TranscodeError> {
    let bad = || TranscodeError::UnexpectedColorFormat {
        value: value.to_string(),
    };

    let digits = value.strip_prefix('#').ok_or_else(bad)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(bad());
    }

    match digits.len() {
        6 => Ok(digits.chars().step_by(2).collect()),
        3 => Ok(digits.to_string()),
        _ => Err(bad()),
    }
}

fn is_bold(value: &str) -> bool {
    let value = value.to_ascii_lowercase();
    match value.as_str() {
        "bold" | "bolder" => true,
        numeric => numeric.parse::<u16>().is_ok_and(|weight| weight >= 600),
    }
}

pub(crate) fn replace_nbsp(text: &str) -> String {
    text.replace(NBSP, " ")
}

#[cfg(test)]
#[path = "richtext_test.rs"]
mod tests;
