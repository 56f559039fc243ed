//! HTML adaptation: click-tracking links and the open-tracking pixel.

use tracing::debug;

use super::parser::parse;
use super::serializer::serialize;
use super::tree::{Attribute, Document, Element, NodeId, NodeKind};
use crate::config::{Configuration, PixelPosition, TrackableAttribute};
use crate::domain::Metadata;
use crate::error::TrackingError;
use crate::tracking::{get_click_tracking_url, get_open_tracking_url};
use crate::utils::check_link;

pub const DOCTYPE: &str = "<!DOCTYPE html>";

/// Attributes of the inserted pixel, after `src`.
const PIXEL_ATTRIBUTES: &[(&str, &str)] = &[
    ("width", "0"),
    ("height", "0"),
    ("border", "0"),
    ("alt", ""),
];

/// Rewrites `html` for tracking.
///
/// - With `click_tracking`, every trackable link attribute (by default
///   `<a href>`) holding an http(s) or protocol-relative URL becomes a
///   click-tracking link. Empty values, fragments, other schemes and links
///   already under `base_click_tracking_url` or `base_open_tracking_url`
///   are left alone.
/// - With `open_tracking`, one zero-size `<img>` pointing at an
///   open-tracking link is inserted at the configured position, unless an
///   image under `base_open_tracking_url` is already present.
///
/// A missing doctype or character-encoding declaration is added. All other
/// content is written back unchanged.
///
/// Running this on its own output with the same configuration returns the
/// output unchanged.
///
/// # Errors
///
/// - [`TrackingError::HtmlParse`] if the document cannot be parsed
/// - [`TrackingError::Configuration`] if a needed base URL is not configured
/// - [`TrackingError::Encoding`] if a token cannot be generated
pub fn adapt_html(
    html: &str,
    extra_metadata: Option<&Metadata>,
    click_tracking: bool,
    open_tracking: bool,
    config: &Configuration,
) -> Result<String, TrackingError> {
    let mut doc = parse(html)?;
    ensure_document_defaults(&mut doc);

    if click_tracking {
        let rewritten = replace_links(&mut doc, extra_metadata, config)?;
        debug!(rewritten, "Replaced links with click-tracking links");
    }

    if open_tracking {
        let inserted = add_tracking_pixel(&mut doc, extra_metadata, config)?;
        debug!(inserted, "Processed open-tracking pixel");
    }

    Ok(serialize(&doc))
}

/// Rewrites eligible link attributes in place and returns how many changed.
fn replace_links(
    doc: &mut Document,
    extra_metadata: Option<&Metadata>,
    config: &Configuration,
) -> Result<usize, TrackingError> {
    let base_click_url = config.base_click_tracking_url();
    let base_open_url = config.base_open_tracking_url().filter(|base| !base.is_empty());
    let mut replacements: Vec<(NodeId, String, String)> = Vec::new();

    for (id, element) in doc.elements() {
        for attribute in matching_attributes(element, config.trackable_attributes()) {
            let Some(link) = element.attr(attribute) else {
                continue;
            };
            if check_link(link, base_click_url).is_err() {
                continue;
            }
            // an existing pixel stays an open-tracking link
            if base_open_url.is_some_and(|base| link.trim().starts_with(base)) {
                continue;
            }
            let tracking_url = get_click_tracking_url(link.trim(), extra_metadata, config)?;
            replacements.push((id, attribute.to_string(), tracking_url));
        }
    }

    let count = replacements.len();
    for (id, attribute, tracking_url) in replacements {
        if let Some(element) = doc.element_mut(id) {
            element.set_attr(&attribute, tracking_url);
        }
    }

    Ok(count)
}

fn matching_attributes<'c>(
    element: &Element,
    trackable: &'c [TrackableAttribute],
) -> impl Iterator<Item = &'c str> {
    trackable
        .iter()
        .filter(move |t| t.element == "*" || t.element == element.name)
        .map(|t| t.attribute.as_str())
}

/// Inserts the pixel once. Returns `false` if one was already present.
fn add_tracking_pixel(
    doc: &mut Document,
    extra_metadata: Option<&Metadata>,
    config: &Configuration,
) -> Result<bool, TrackingError> {
    let base_open_url = config.require_open_base_url()?;

    let already_present = doc.elements().any(|(_, element)| {
        element.name == "img" && element.attr("src").is_some_and(|src| src.starts_with(base_open_url))
    });
    if already_present {
        return Ok(false);
    }

    let url = get_open_tracking_url(extra_metadata, config)?;
    let mut attributes = vec![Attribute::new("src", url)];
    attributes.extend(
        PIXEL_ATTRIBUTES
            .iter()
            .map(|(name, value)| Attribute::new(*name, *value)),
    );
    let pixel = doc.create(NodeKind::Element(Element::synthesized("img", attributes)));

    match doc.find_element("body") {
        Some(body) => match config.pixel_position() {
            PixelPosition::StartOfBody => doc.insert_child(body, 0, pixel),
            PixelPosition::EndOfBody => doc.append_child(body, pixel),
        },
        None => {
            let parent = root_element(doc).unwrap_or_else(|| doc.root());
            doc.append_child(parent, pixel);
        }
    }

    Ok(true)
}

/// The `<html>` element, or the only non-void top-level element of a
/// fragment. Void siblings such as an inserted `<meta>` are ignored.
fn root_element(doc: &Document) -> Option<NodeId> {
    if let Some(html) = doc.find_element("html") {
        return Some(html);
    }

    let mut top_level = doc
        .node(doc.root())
        .children()
        .iter()
        .copied()
        .filter(|&id| doc.element(id).is_some_and(|e| !e.is_void()));

    match (top_level.next(), top_level.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// Adds `<!DOCTYPE html>` and a UTF-8 content-type `<meta>` when missing.
fn ensure_document_defaults(doc: &mut Document) {
    if !has_charset_declaration(doc) {
        let meta = doc.create(NodeKind::Element(Element::synthesized(
            "meta",
            vec![
                Attribute::new("http-equiv", "Content-Type"),
                Attribute::new("content", "text/html; charset=utf-8"),
            ],
        )));

        if let Some(head) = doc.find_element("head") {
            doc.insert_child(head, 0, meta);
        } else if let Some(html) = doc.find_element("html") {
            let head = doc.create(NodeKind::Element(Element::synthesized("head", vec![])));
            doc.append_child(head, meta);
            doc.insert_child(html, 0, head);
        } else {
            let index = leading_doctype_len(doc);
            let root = doc.root();
            doc.insert_child(root, index, meta);
        }
    }

    if !doc.has_doctype() {
        let root = doc.root();
        let doctype = doc.create(NodeKind::Doctype(DOCTYPE.to_string()));
        let newline = doc.create(NodeKind::Text("\n".to_string()));
        doc.insert_child(root, 0, doctype);
        doc.insert_child(root, 1, newline);
    }
}

/// Number of top-level nodes up to and including the doctype.
fn leading_doctype_len(doc: &Document) -> usize {
    doc.node(doc.root())
        .children()
        .iter()
        .position(|&id| matches!(doc.node(id).kind, NodeKind::Doctype(_)))
        .map_or(0, |i| i + 1)
}

fn has_charset_declaration(doc: &Document) -> bool {
    doc.elements().any(|(_, element)| {
        element.name == "meta"
            && (element.has_attr("charset")
                || (element
                    .attr("http-equiv")
                    .is_some_and(|v| v.eq_ignore_ascii_case("content-type"))
                    && element
                        .attr("content")
                        .is_some_and(|v| v.to_ascii_lowercase().contains("charset"))))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Configuration {
        Configuration::builder()
            .base_open_tracking_url("https://t.example.com/open/")
            .base_click_tracking_url("https://t.example.com/click/")
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_added_to_bare_document() {
        let out = adapt_html("<html><body><p>x</p></body></html>", None, false, false, &config())
            .unwrap();
        assert_eq!(
            out,
            "<!DOCTYPE html>\n<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"></head><body><p>x</p></body></html>"
        );
    }

    #[test]
    fn test_meta_goes_into_existing_head() {
        let out = adapt_html(
            "<!DOCTYPE html><html><head><title>t</title></head><body></body></html>",
            None,
            false,
            false,
            &config(),
        )
        .unwrap();
        assert_eq!(
            out,
            "<!DOCTYPE html><html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"><title>t</title></head><body></body></html>"
        );
    }

    #[test]
    fn test_existing_declarations_untouched() {
        let html = "<!doctype html><html><head><meta charset=\"utf-8\"></head><body>x</body></html>";
        let out = adapt_html(html, None, false, false, &config()).unwrap();
        assert_eq!(out, html);

        let html = "<!DOCTYPE html><html><head><META HTTP-EQUIV=\"content-type\" CONTENT=\"text/html; charset=iso-8859-1\"></head><body>x</body></html>";
        let out = adapt_html(html, None, false, false, &config()).unwrap();
        assert_eq!(out, html);
    }

    #[test]
    fn test_fragment_gets_meta_after_doctype() {
        let out = adapt_html("<p>hello</p>", None, false, false, &config()).unwrap();
        assert_eq!(
            out,
            "<!DOCTYPE html>\n<meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\"><p>hello</p>"
        );
    }

    #[test]
    fn test_pixel_without_body_goes_into_root_element() {
        let out = adapt_html("<div><p>hello</p></div>", None, false, true, &config()).unwrap();
        assert!(out.ends_with("width=\"0\" height=\"0\" border=\"0\" alt=\"\"></div>"));
    }

    #[test]
    fn test_pixel_start_of_body() {
        let config = Configuration::builder()
            .base_open_tracking_url("https://t.example.com/open/")
            .pixel_position(PixelPosition::StartOfBody)
            .build()
            .unwrap();

        let out = adapt_html("<html><body><p>x</p></body></html>", None, false, true, &config)
            .unwrap();
        assert!(out.contains("<body><img src=\"https://t.example.com/open/"));
    }

    #[test]
    fn test_pixel_requires_open_base_url() {
        let config = Configuration::builder()
            .base_click_tracking_url("https://t.example.com/click/")
            .build()
            .unwrap();

        let result = adapt_html("<body>x</body>", None, false, true, &config);
        assert!(matches!(result, Err(TrackingError::Configuration(_))));
    }

    #[test]
    fn test_click_requires_base_only_when_links_present() {
        let config = Configuration::builder()
            .base_open_tracking_url("https://t.example.com/open/")
            .build()
            .unwrap();

        assert!(adapt_html("<body>no links</body>", None, true, false, &config).is_ok());
        assert!(matches!(
            adapt_html("<body><a href=\"https://x.com\">x</a></body>", None, true, false, &config),
            Err(TrackingError::Configuration(_))
        ));
    }

    #[test]
    fn test_custom_trackable_attributes() {
        let config = Configuration::builder()
            .base_open_tracking_url("https://t.example.com/open/")
            .base_click_tracking_url("https://t.example.com/click/")
            .trackable_attributes(vec![
                TrackableAttribute::new("a", "href"),
                TrackableAttribute::new("area", "href"),
            ])
            .build()
            .unwrap();

        let out = adapt_html(
            "<body><map><area href=\"https://example.com/region\"></map><link href=\"https://example.com/s.css\"></body>",
            None,
            true,
            false,
            &config,
        )
        .unwrap();

        assert!(out.contains("<area href=\"https://t.example.com/click/"));
        assert!(out.contains("<link href=\"https://example.com/s.css\">"));
    }

    #[test]
    fn test_parse_error_aborts() {
        let result = adapt_html("<body><a href=\"x", None, true, true, &config());
        assert!(matches!(result, Err(TrackingError::HtmlParse(_))));
    }
}
