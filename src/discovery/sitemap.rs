//! Sitemap sniffing
//!
//! Classifies an XML payload by its root element and pulls every `<loc>`
//! value out of it. Parsing is deliberately forgiving: DTDs are tolerated,
//! unknown elements are ignored, and `<loc>` may appear at any depth.

use roxmltree::{Document, Node, ParsingOptions};

/// Namespace of sitemaps.org 0.9 documents
///
/// See <https://www.sitemaps.org/protocol.html>
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Root of a sitemap index
const INDEX_ROOT_ELEMENT: &str = "sitemapindex";

/// Root of a standalone sitemap
const URLSET_ROOT_ELEMENT: &str = "urlset";

/// Root used when a sitemap fragment is served on its own
const SITEMAP_ROOT_ELEMENT: &str = "sitemap";

const LOC_ELEMENT: &str = "loc";

/// What an XML payload turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SitemapDocument {
    /// A sitemap index; the values are locations of further sitemaps
    Index(Vec<String>),

    /// A sitemap; the values are page URLs
    UrlSet(Vec<String>),

    /// Well-formed XML with some other root element
    Other(String),
}

impl SitemapDocument {
    /// Root element name this document was recognised by
    pub fn kind(&self) -> &str {
        match self {
            Self::Index(_) => INDEX_ROOT_ELEMENT,
            Self::UrlSet(_) => URLSET_ROOT_ELEMENT,
            Self::Other(root) => root,
        }
    }
}

/// Parses `text` as XML and classifies it
///
/// # Returns
///
/// * `Ok(SitemapDocument)` - The payload is XML
/// * `Err(roxmltree::Error)` - The payload is not well-formed XML
///
/// # Example
///
/// ```
/// use swarmload::discovery::{parse_sitemap, SitemapDocument};
///
/// let xml = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
///   <url><loc>https://example.com/</loc></url>
/// </urlset>"#;
/// assert_eq!(
///     parse_sitemap(xml).unwrap(),
///     SitemapDocument::UrlSet(vec!["https://example.com/".to_string()])
/// );
/// ```
pub fn parse_sitemap(text: &str) -> Result<SitemapDocument, roxmltree::Error> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(text, options)?;
    let root = document.root_element();

    let document = match root.tag_name().name() {
        INDEX_ROOT_ELEMENT => SitemapDocument::Index(loc_values(root)),
        URLSET_ROOT_ELEMENT | SITEMAP_ROOT_ELEMENT => SitemapDocument::UrlSet(loc_values(root)),
        other => SitemapDocument::Other(other.to_string()),
    };

    Ok(document)
}

/// Collects the trimmed text of every sitemap `<loc>` below `root`
///
/// Only `<loc>` elements in the sitemap namespace, or in no namespace at all,
/// count; extension elements such as `image:loc` are skipped.
fn loc_values(root: Node<'_, '_>) -> Vec<String> {
    root.descendants()
        .filter(|node| is_sitemap_loc(node))
        .filter_map(|node| {
            let text: String = node
                .descendants()
                .filter(|child| child.is_text())
                .filter_map(|child| child.text())
                .collect();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

fn is_sitemap_loc(node: &Node<'_, '_>) -> bool {
    if !node.is_element() || node.tag_name().name() != LOC_ELEMENT {
        return false;
    }
    match node.tag_name().namespace() {
        None => true,
        Some(namespace) => namespace == SITEMAP_NAMESPACE,
    }
}
