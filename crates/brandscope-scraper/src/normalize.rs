//! Flattens an HTML subtree into link- and image-preserving plain text.
//!
//! Anchors render as `[text](href)`, images as one `![alt](src)` per unique
//! source, and block-level elements force line boundaries. The output is
//! what the completion service reads when asked to find products on a page.

use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html};

static EXCESS_NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid newline regex"));

const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "article", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Elements whose children are raw source, not rendered text.
const OPAQUE_TAGS: &[&str] = &["script", "style", "noscript", "template"];

const IMAGE_SOURCE_ATTRS: &[&str] = &["src", "data-src"];
const IMAGE_SRCSET_ATTRS: &[&str] = &["srcset", "data-srcset"];

/// Renders `html` (typically a `<body>` subtree) as plain text.
///
/// Never fails: attributes that are missing or malformed are omitted.
///
/// Character references are decoded, so the output is text rather than
/// HTML. A second pass is stable only when that text contains no
/// markup-like sequences: escaped `&lt;b&gt;` becomes `<b>` here and is then
/// parsed as a tag.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() / 2);
    render_children(fragment.root_element(), &mut out);
    tidy(&out)
}

fn render_children(el: ElementRef<'_>, out: &mut String) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&text.text),
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    render_element(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn render_element(el: ElementRef<'_>, out: &mut String) {
    let tag = el.value().name();

    if OPAQUE_TAGS.contains(&tag) {
        return;
    }

    match tag {
        "a" => render_anchor(el, out),
        "img" => render_image(el, out),
        "br" => out.push('\n'),
        t if BLOCK_TAGS.contains(&t) => {
            out.push('\n');
            render_children(el, out);
            out.push('\n');
        }
        _ => render_children(el, out),
    }
}

fn render_anchor(el: ElementRef<'_>, out: &mut String) {
    let mut inner = String::new();
    render_children(el, &mut inner);

    match el.value().attr("href").map(str::trim).filter(|h| !h.is_empty()) {
        Some(href) => {
            out.push('[');
            out.push_str(inner.trim());
            out.push_str("](");
            out.push_str(href);
            out.push(')');
        }
        None => out.push_str(&inner),
    }
}

fn render_image(el: ElementRef<'_>, out: &mut String) {
    let alt = el.value().attr("alt").map_or("", str::trim);
    for src in image_sources(el) {
        out.push_str("![");
        out.push_str(alt);
        out.push_str("](");
        out.push_str(&src);
        out.push(')');
    }
}

/// Every distinct candidate source of an `<img>`, in attribute order.
fn image_sources(el: ElementRef<'_>) -> Vec<String> {
    let element = el.value();
    let mut sources: Vec<String> = Vec::new();
    let mut push = |candidate: &str| {
        let candidate = candidate.trim();
        if !candidate.is_empty() && !sources.iter().any(|s| s == candidate) {
            sources.push(candidate.to_string());
        }
    };

    for attr in IMAGE_SOURCE_ATTRS {
        if let Some(value) = element.attr(attr) {
            push(value);
        }
    }

    for attr in IMAGE_SRCSET_ATTRS {
        let Some(value) = element.attr(attr) else {
            continue;
        };
        for entry in value.split(',') {
            // "url 2x" / "url 640w": the descriptor follows the URL.
            if let Some(url) = entry.split_whitespace().next() {
                push(url);
            }
        }
    }

    sources
}

fn tidy(raw: &str) -> String {
    let collapsed = EXCESS_NEWLINES_RE.replace_all(raw, "\n\n");
    collapsed
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
