//! Markup queries over a fetched storefront page.
//!
//! The extractor only ever needs raw strings out of the document: attribute
//! values and element text for a CSS selector.

use scraper::{Html, Selector};
use tracing::debug;

pub struct Page {
    document: Html,
}

impl Page {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    fn selector(css: &str) -> Option<Selector> {
        match Selector::parse(css) {
            Ok(selector) => Some(selector),
            Err(err) => {
                debug!("invalid selector {:?}: {}", css, err);
                None
            }
        }
    }

    /// Value of `attr` on the first element matching `css`.
    pub fn first_attr(&self, css: &str, attr: &str) -> Option<String> {
        let selector = Self::selector(css)?;
        self.document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr(attr))
            .map(str::to_string)
    }

    /// Values of `attr` on every element matching `css`, in document order.
    pub fn all_attrs(&self, css: &str, attr: &str) -> Vec<String> {
        let Some(selector) = Self::selector(css) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::to_string)
            .collect()
    }

    /// Text content of the first element matching `css`.
    pub fn first_text(&self, css: &str) -> Option<String> {
        let selector = Self::selector(css)?;
        self.document
            .select(&selector)
            .next()
            .map(|el| el.text().collect())
    }

    /// Text content of every element matching `css`, in document order.
    pub fn all_texts(&self, css: &str) -> Vec<String> {
        let Some(selector) = Self::selector(css) else {
            return Vec::new();
        };
        self.document
            .select(&selector)
            .map(|el| el.text().collect())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HTML: &str = r#"<html><head>
        <meta property="og:title" content="Night Drive by DJ Foo on Beatport">
        <script type="application/ld+json">{"a": 1}</script>
        <script type="application/ld+json">{"b": 2}</script>
        </head><body>
        <span data-json='{"id": 1}'></span>
        <span data-json='{"id": 2}'></span>
        </body></html>"#;

    #[test]
    fn test_first_attr() {
        let page = Page::parse(HTML);
        assert_eq!(
            page.first_attr("meta[property='og:title']", "content").as_deref(),
            Some("Night Drive by DJ Foo on Beatport")
        );
        assert_eq!(page.first_attr("script[data-tralbum]", "data-tralbum"), None);
    }

    #[test]
    fn test_all_attrs_in_document_order() {
        let page = Page::parse(HTML);
        assert_eq!(
            page.all_attrs("span[data-json]", "data-json"),
            vec![r#"{"id": 1}"#, r#"{"id": 2}"#]
        );
    }

    #[test]
    fn test_texts() {
        let page = Page::parse(HTML);
        let texts = page.all_texts("script[type='application/ld+json']");
        assert_eq!(texts, vec![r#"{"a": 1}"#, r#"{"b": 2}"#]);
        assert_eq!(page.first_text("script#__NEXT_DATA__"), None);
    }

    #[test]
    fn test_invalid_selector_is_empty() {
        let page = Page::parse(HTML);
        assert!(page.all_attrs("[[[", "x").is_empty());
        assert_eq!(page.first_text("[[["), None);
    }
}
