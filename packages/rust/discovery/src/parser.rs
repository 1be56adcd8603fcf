//! Category listing parser.
//!
//! The listing page wraps each recent seed in an item container:
//! - Container: `#itemListLeading .itemContainer`
//! - Title anchor: `h3.catItemTitle a` (text = title, href = detail link)

use std::sync::LazyLock;

use scraper::{Html, Selector};
use url::Url;

use seedbank_shared::{Result, SeedError};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A discovered seed detail link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedLink {
    /// Title text of the listing anchor.
    pub title: String,
    /// The anchor's href, usually relative to the site root.
    pub href: String,
}

impl SeedLink {
    /// Resolve the href against the site root.
    pub fn resolve(&self, base: &Url) -> Result<Url> {
        base.join(&self.href)
            .map_err(|e| SeedError::parse(format!("invalid link {:?}: {e}", self.href)))
    }
}

// ---------------------------------------------------------------------------
// Selectors (compiled once)
// ---------------------------------------------------------------------------

/// One listing entry.
static ITEM_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#itemListLeading .itemContainer").expect("item selector")
});

/// Title anchor inside a listing entry.
static TITLE_LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3.catItemTitle a").expect("title link selector"));

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Collect `(title, href)` pairs from a parsed listing page, in page order.
///
/// Titles act as keys: when two entries share a title the later href wins,
/// keeping the position of the first. Entries without an anchor href are skipped.
pub fn parse_links(doc: &Html) -> Vec<SeedLink> {
    let mut links: Vec<SeedLink> = Vec::new();

    for item in doc.select(&ITEM_SEL) {
        let anchors: Vec<_> = item.select(&TITLE_LINK_SEL).collect();

        let Some(href) = anchors
            .iter()
            .find_map(|a| a.value().attr("href"))
            .map(|href| href.trim().to_string())
        else {
            continue;
        };

        let title = anchors
            .iter()
            .flat_map(|a| a.text())
            .collect::<String>()
            .trim()
            .to_string();

        match links.iter_mut().find(|link| link.title == title) {
            Some(existing) => existing.href = href,
            None => links.push(SeedLink { title, href }),
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(items: &str) -> Html {
        Html::parse_document(&format!(
            r#"<html><body>
            <div id="itemListLeading">{items}</div>
            <div id="itemListSecondary">
                <div class="itemContainer">
                    <h3 class="catItemTitle"><a href="/old">Not leading</a></h3>
                </div>
            </div>
            </body></html>"#
        ))
    }

    #[test]
    fn collects_leading_items_in_order() {
        let doc = listing(
            r#"
            <div class="itemContainer"><h3 class="catItemTitle">
                <a href="/index.php/item/101-walk-in-love"> Walk in Love </a></h3></div>
            <div class="itemContainer"><h3 class="catItemTitle">
                <a href="/index.php/item/102-the-power-of-praise">The Power of Praise</a></h3></div>
            "#,
        );

        let links = parse_links(&doc);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Walk in Love");
        assert_eq!(links[0].href, "/index.php/item/101-walk-in-love");
        assert_eq!(links[1].title, "The Power of Praise");
    }

    #[test]
    fn ignores_items_outside_the_leading_list() {
        let doc = listing("");
        assert!(parse_links(&doc).is_empty());
    }

    #[test]
    fn skips_items_without_href() {
        let doc = listing(
            r#"
            <div class="itemContainer"><h3 class="catItemTitle"><a>No link</a></h3></div>
            <div class="itemContainer"><h3 class="other"><a href="/x">Wrong heading</a></h3></div>
            "#,
        );
        assert!(parse_links(&doc).is_empty());
    }

    #[test]
    fn duplicate_titles_keep_last_href() {
        let doc = listing(
            r#"
            <div class="itemContainer"><h3 class="catItemTitle"><a href="/a">Same</a></h3></div>
            <div class="itemContainer"><h3 class="catItemTitle"><a href="/b">Other</a></h3></div>
            <div class="itemContainer"><h3 class="catItemTitle"><a href="/c">Same</a></h3></div>
            "#,
        );

        let links = parse_links(&doc);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].title, "Same");
        assert_eq!(links[0].href, "/c");
    }

    #[test]
    fn resolves_relative_and_absolute_hrefs() {
        let base = Url::parse("http://www.dunamisgospel.org").unwrap();
        let relative = SeedLink {
            title: "t".into(),
            href: "/index.php/item/1".into(),
        };
        assert_eq!(
            relative.resolve(&base).unwrap().as_str(),
            "http://www.dunamisgospel.org/index.php/item/1"
        );

        let absolute = SeedLink {
            title: "t".into(),
            href: "https://mirror.example.com/item/1".into(),
        };
        assert_eq!(
            absolute.resolve(&base).unwrap().as_str(),
            "https://mirror.example.com/item/1"
        );
    }
}
