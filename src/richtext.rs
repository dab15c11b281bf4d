//! Renders CMS rich-text blocks as HTML. Consecutive list items are grouped
//! into a single list, and inline spans (bold, italics, links, labels) are
//! applied at their character offsets. All text goes through
//! [`pulldown_cmark`]'s escaping.

use crate::post::{Span, TextBlock};
use pulldown_cmark::escape::{escape_href, escape_html};
use std::io;
use tracing::debug;

/// Renders `blocks` as HTML, appending the result to `out`.
pub fn push_html(out: &mut String, blocks: &[TextBlock]) -> io::Result<()> {
    let mut list: Option<&str> = None;
    for block in blocks {
        let wanted = match block.kind.as_str() {
            "list-item" => Some("ul"),
            "o-list-item" => Some("ol"),
            _ => None,
        };
        if list != wanted {
            if let Some(tag) = list {
                out.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = wanted {
                out.push_str(&format!("<{}>", tag));
            }
            list = wanted;
        }

        match block.kind.as_str() {
            "paragraph" => push_element(out, "p", block)?,
            "preformatted" => push_element(out, "pre", block)?,
            "list-item" | "o-list-item" => push_element(out, "li", block)?,
            "image" => push_image(out, block)?,
            kind => match heading_level(kind) {
                Some(level) => push_element(out, &format!("h{}", level), block)?,
                None => debug!(kind, "skipping unsupported rich text block"),
            },
        }
    }
    if let Some(tag) = list {
        out.push_str(&format!("</{}>", tag));
    }
    Ok(())
}

/// Renders `blocks` as an HTML string.
pub fn to_html(blocks: &[TextBlock]) -> io::Result<String> {
    let mut out = String::new();
    push_html(&mut out, blocks)?;
    Ok(out)
}

fn heading_level(kind: &str) -> Option<u8> {
    kind.strip_prefix("heading")
        .and_then(|level| level.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

fn push_element(out: &mut String, tag: &str, block: &TextBlock) -> io::Result<()> {
    out.push_str(&format!("<{}>", tag));
    push_text(out, &block.text, &block.spans)?;
    out.push_str(&format!("</{}>", tag));
    Ok(())
}

fn push_image(out: &mut String, block: &TextBlock) -> io::Result<()> {
    let url = match &block.url {
        Some(url) => url,
        None => return Ok(()),
    };
    out.push_str("<img src=\"");
    escape_href(&mut *out, url)?;
    out.push_str("\" alt=\"");
    escape_html(&mut *out, block.alt.as_deref().unwrap_or_default())?;
    out.push_str("\" />");
    Ok(())
}

// Span offsets count characters, not bytes. Spans that start together are
// opened longest first. When a span ends while spans opened after it are
// still running, those are closed with it and reopened right after, so every
// tag covers exactly its own range and the output stays well nested.
fn push_text(out: &mut String, text: &str, spans: &[Span]) -> io::Result<()> {
    let mut spans: Vec<&Span> = spans.iter().filter(|s| s.start < s.end).collect();
    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
    let mut pending = spans.into_iter().peekable();
    let mut open: Vec<&Span> = Vec::new();

    let chars: Vec<char> = text.chars().collect();
    let mut run = String::new();
    for i in 0..=chars.len() {
        let in_text = i < chars.len();
        let closing = open.iter().any(|s| s.end <= i);
        let opening = in_text && pending.peek().map_or(false, |s| s.start <= i);
        if (closing || opening) && !run.is_empty() {
            escape_html(&mut *out, &run)?;
            run.clear();
        }

        if closing {
            let mut reopen: Vec<&Span> = Vec::new();
            while open.iter().any(|s| s.end <= i) {
                if let Some(span) = open.pop() {
                    close_span(out, span);
                    if span.end > i {
                        reopen.push(span);
                    }
                }
            }
            if in_text {
                for span in reopen.into_iter().rev() {
                    open_span(out, span)?;
                    open.push(span);
                }
            }
        }
        while in_text && pending.peek().map_or(false, |s| s.start <= i) {
            if let Some(span) = pending.next() {
                open_span(out, span)?;
                open.push(span);
            }
        }

        if let Some(c) = chars.get(i) {
            run.push(*c);
        }
    }

    escape_html(&mut *out, &run)?;
    while let Some(span) = open.pop() {
        close_span(out, span);
    }
    Ok(())
}

fn open_span(out: &mut String, span: &Span) -> io::Result<()> {
    let data = span.data.as_ref();
    match span.kind.as_str() {
        "strong" => out.push_str("<strong>"),
        "em" => out.push_str("<em>"),
        "hyperlink" => match data.and_then(|d| d.url.as_deref()) {
            Some(url) => {
                out.push_str("<a href=\"");
                escape_href(&mut *out, url)?;
                out.push_str("\">");
            }
            None => out.push_str("<a>"),
        },
        "label" => {
            out.push_str("<span class=\"");
            escape_html(&mut *out, data.and_then(|d| d.label.as_deref()).unwrap_or_default())?;
            out.push_str("\">");
        }
        _ => {}
    }
    Ok(())
}

fn close_span(out: &mut String, span: &Span) {
    match span.kind.as_str() {
        "strong" => out.push_str("</strong>"),
        "em" => out.push_str("</em>"),
        "hyperlink" => out.push_str("</a>"),
        "label" => out.push_str("</span>"),
        _ => {}
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::post::SpanData;

    fn block(kind: &str, text: &str, spans: Vec<Span>) -> TextBlock {
        TextBlock {
            kind: kind.to_owned(),
            text: text.to_owned(),
            spans,
            ..TextBlock::default()
        }
    }

    fn span(kind: &str, start: usize, end: usize) -> Span {
        Span {
            start,
            end,
            kind: kind.to_owned(),
            data: None,
        }
    }

    #[test]
    fn test_paragraph_is_escaped() -> io::Result<()> {
        assert_eq!(
            "<p>1 &lt; 2 &amp; 3 &gt; 2</p>",
            to_html(&[TextBlock::paragraph("1 < 2 & 3 > 2")])?
        );
        Ok(())
    }

    #[test]
    fn test_headings_and_preformatted() -> io::Result<()> {
        assert_eq!(
            "<h2>Title</h2><pre>let x = 1;</pre>",
            to_html(&[
                block("heading2", "Title", Vec::new()),
                block("preformatted", "let x = 1;", Vec::new()),
            ])?
        );
        Ok(())
    }

    #[test]
    fn test_list_items_are_grouped() -> io::Result<()> {
        assert_eq!(
            "<ul><li>a</li><li>b</li></ul><ol><li>c</li></ol><p>d</p>",
            to_html(&[
                block("list-item", "a", Vec::new()),
                block("list-item", "b", Vec::new()),
                block("o-list-item", "c", Vec::new()),
                block("paragraph", "d", Vec::new()),
            ])?
        );
        Ok(())
    }

    #[test]
    fn test_trailing_list_is_closed() -> io::Result<()> {
        assert_eq!(
            "<p>a</p><ol><li>b</li></ol>",
            to_html(&[
                block("paragraph", "a", Vec::new()),
                block("o-list-item", "b", Vec::new()),
            ])?
        );
        Ok(())
    }

    #[test]
    fn test_spans() -> io::Result<()> {
        assert_eq!(
            "<p><strong>Hello</strong> <em>wide</em> world</p>",
            to_html(&[block(
                "paragraph",
                "Hello wide world",
                vec![span("em", 6, 10), span("strong", 0, 5)]
            )])?
        );
        Ok(())
    }

    #[test]
    fn test_nested_spans_and_links() -> io::Result<()> {
        let mut link = span("hyperlink", 4, 12);
        link.data = Some(SpanData {
            url: Some(String::from("https://example.com/")),
            label: None,
        });
        assert_eq!(
            "<p>see <a href=\"https://example.com/\"><strong>the</strong> docs</a>!</p>",
            to_html(&[block(
                "paragraph",
                "see the docs!",
                vec![span("strong", 4, 7), link]
            )])?
        );
        Ok(())
    }

    #[test]
    fn test_overlapping_spans_keep_their_ranges() -> io::Result<()> {
        assert_eq!(
            "<p><strong>He<em>llo</em></strong><em> Wo</em>rld</p>",
            to_html(&[block(
                "paragraph",
                "Hello World",
                vec![span("strong", 0, 5), span("em", 2, 8)]
            )])?
        );
        Ok(())
    }

    #[test]
    fn test_span_past_end_of_text_is_closed() -> io::Result<()> {
        assert_eq!(
            "<p><em>a<strong>b</strong></em></p>",
            to_html(&[block(
                "paragraph",
                "ab",
                vec![span("em", 0, 2), span("strong", 1, 9)]
            )])?
        );
        Ok(())
    }

    #[test]
    fn test_span_offsets_count_characters() -> io::Result<()> {
        assert_eq!(
            "<p>café <em>olé</em></p>",
            to_html(&[block("paragraph", "café olé", vec![span("em", 5, 8)])])?
        );
        Ok(())
    }

    #[test]
    fn test_image_and_unknown_blocks() -> io::Result<()> {
        let mut image = block("image", "", Vec::new());
        image.url = Some(String::from("https://images.example.com/a.png"));
        image.alt = Some(String::from("A & B"));
        assert_eq!(
            "<img src=\"https://images.example.com/a.png\" alt=\"A &amp; B\" />",
            to_html(&[image, block("embed", "ignored", Vec::new())])?
        );
        Ok(())
    }
}
