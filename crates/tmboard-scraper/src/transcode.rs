//! Converts a styled HTML name cell into `$` markup.
//!
//! Names are rendered by the site as a link whose children are either bare
//! text or `<span style="...">` runs, possibly nested. Anything else inside
//! the link is treated as a layout change on the site and aborts transcoding.

use scraper::{ElementRef, Html, Node};

use crate::error::TranscodeError;
use crate::richtext::{parse_style, FormattedName, SpanStyle, StyleRun};

/// Returns the first `<a>` element inside `cell`, if any.
#[must_use]
pub fn name_link(cell: ElementRef<'_>) -> Option<ElementRef<'_>> {
    cell.descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "a")
}

/// Splits a name cell into style runs in document order.
///
/// A cell without a link degrades to a single plain run holding the cell's
/// visible text; styling is discarded in that case. Inside a link, a nested
/// span inherits its parent's style and overrides the color; every nested
/// `style` attribute is validated.
///
/// # Errors
///
/// - [`TranscodeError::UnexpectedTagInLink`] for a tag other than `<span>`.
/// - [`TranscodeError::UnexpectedNodeType`] for comments and other non-text nodes.
/// - Any error from [`parse_style`] for a span's `style` attribute.
pub fn parse_runs(cell: ElementRef<'_>) -> Result<FormattedName, TranscodeError> {
    let Some(link) = name_link(cell) else {
        let text: String = cell.text().collect();
        return Ok([StyleRun::plain(text)].into_iter().collect());
    };

    let mut name = FormattedName::new();
    push_runs(link, &SpanStyle::default(), &mut name)?;
    Ok(name)
}

fn push_runs(
    parent: ElementRef<'_>,
    style: &SpanStyle,
    name: &mut FormattedName,
) -> Result<(), TranscodeError> {
    for child in parent.children() {
        match child.value() {
            Node::Text(text) => name.push(StyleRun::styled(&**text, style.clone())),
            Node::Element(element) => {
                if element.name() != "span" {
                    return Err(TranscodeError::UnexpectedTagInLink {
                        tag: element.name().to_string(),
                    });
                }
                let nested = match element.attr("style") {
                    Some(declarations) => parse_style(declarations)?.inherit(style),
                    None => style.clone(),
                };
                if let Some(span) = ElementRef::wrap(child) {
                    push_runs(span, &nested, name)?;
                }
            }
            Node::Comment(_) => return Err(unexpected("comment")),
            Node::Doctype(_) => return Err(unexpected("doctype")),
            Node::ProcessingInstruction(_) => return Err(unexpected("processing instruction")),
            Node::Document => return Err(unexpected("document")),
            Node::Fragment => return Err(unexpected("fragment")),
        }
    }

    Ok(())
}

/// Transcodes one name cell to `$` markup.
///
/// # Errors
///
/// See [`parse_runs`].
pub fn transcode_cell(cell: ElementRef<'_>) -> Result<String, TranscodeError> {
    Ok(parse_runs(cell)?.to_markup())
}

/// Parses `fragment` as HTML and transcodes it as if it were one cell.
///
/// # Errors
///
/// See [`parse_runs`].
pub fn transcode_html(fragment: &str) -> Result<String, TranscodeError> {
    let html = Html::parse_fragment(fragment);
    transcode_cell(html.root_element())
}

fn unexpected(kind: &'static str) -> TranscodeError {
    TranscodeError::UnexpectedNodeType { kind }
}

#[cfg(test)]
#[path = "transcode_test.rs"]
mod tests;
