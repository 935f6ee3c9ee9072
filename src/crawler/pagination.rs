//! "Next page" link discovery and URL resolution

use crate::crawler::extractor::compile_selector;
use crate::ExtractResult;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// What the next-page selector matched, resolved once per match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextLink {
    /// The matched node is itself an `<a>` element
    pub is_link: bool,
    /// `href` of the matched node when it is a link
    pub href: Option<String>,
    /// `href` of the first `<a>` descendant of the matched node
    pub first_descendant_link: Option<String>,
}

impl NextLink {
    pub fn from_element(element: ElementRef<'_>) -> Self {
        if is_link(element) {
            return Self {
                is_link: true,
                href: element.value().attr("href").map(str::to_string),
                first_descendant_link: None,
            };
        }

        let first_descendant_link = element
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .find(|descendant| is_link(*descendant))
            .and_then(|link| link.value().attr("href"))
            .map(str::to_string);

        Self {
            is_link: false,
            href: None,
            first_descendant_link,
        }
    }

    /// The link target this match points at, if any
    pub fn target(&self) -> Option<&str> {
        if self.is_link {
            self.href.as_deref()
        } else {
            self.first_descendant_link.as_deref()
        }
    }
}

fn is_link(element: ElementRef<'_>) -> bool {
    element.value().name().eq_ignore_ascii_case("a")
}

/// Finds the next-page target in an already parsed document
pub fn find_next_in(document: &Html, next_selector: &Selector) -> Option<String> {
    document
        .select(next_selector)
        .next()
        .map(NextLink::from_element)
        .and_then(|link| link.target().map(str::to_string))
}

/// Finds the `href` of the next page link, relative or absolute
///
/// Uses the first node matching `next_selector`. A matched `<a>` yields its
/// own `href`; any other node yields the `href` of its first `<a>` descendant.
///
/// # Example
///
/// ```
/// use pagetrawl::crawler::find_next;
///
/// let html = r#"<div class="pager"><a href="/p/2">Next</a></div>"#;
/// assert_eq!(find_next(html, "div.pager").unwrap().as_deref(), Some("/p/2"));
/// ```
pub fn find_next(html: &str, next_selector: &str) -> ExtractResult<Option<String>> {
    let selector = compile_selector(next_selector)?;
    let document = Html::parse_document(html);
    Ok(find_next_in(&document, &selector))
}

/// Resolves `href` against the page it was found on
///
/// Relative references inherit scheme and host from `base_url`; absolute
/// ones come back unchanged.
pub fn resolve(base_url: &str, href: &str) -> Result<String, url::ParseError> {
    let base = Url::parse(base_url)?;
    Ok(base.join(href.trim())?.to_string())
}
