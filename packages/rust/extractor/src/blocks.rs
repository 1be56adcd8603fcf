//! Text block extraction from a seed detail page.

use std::sync::LazyLock;

use scraper::{Html, Selector};

/// Every `div` under the article's full-text container, in document order.
/// Nested divs match too, each contributing its own rendered text.
static BLOCK_SEL: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "#k2Container.row.itemView.clearfix div.itemViewContent.span8.pull-right \
         div.itemBody div.itemFullText div",
    )
    .expect("content block selector")
});

/// Literal placeholder some pages carry instead of a rendered space.
const NBSP_PLACEHOLDER: &str = "&nbsp;";

/// Rendered, trimmed text of each non-blank content block in page order.
///
/// The index of a block in the returned list is its ordinal position.
/// Blank blocks (empty, whitespace, or only a non-breaking space) are
/// dropped and do not consume a position.
pub fn text_blocks(doc: &Html) -> Vec<String> {
    doc.select(&BLOCK_SEL)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty() && text != NBSP_PLACEHOLDER)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(blocks: &str) -> Html {
        Html::parse_document(&format!(
            r#"<div id="k2Container" class="row itemView clearfix">
                 <div class="itemViewContent span8 pull-right"><div class="itemBody">
                   <div class="itemFullText">{blocks}</div>
                 </div></div>
               </div>"#
        ))
    }

    #[test]
    fn blank_blocks_do_not_consume_positions() {
        let doc = page(
            "<div>first</div><div>&nbsp;</div><div>   </div><div></div>\
             <div>&amp;nbsp;</div><div>second</div>",
        );
        assert_eq!(text_blocks(&doc), vec!["first", "second"]);
    }

    #[test]
    fn text_is_rendered_and_trimmed() {
        let doc = page("<div>  <strong>PRAYER:</strong> Lord, <em>help</em> me \n</div>");
        assert_eq!(text_blocks(&doc), vec!["PRAYER: Lord, help me"]);
    }

    #[test]
    fn blocks_outside_the_container_are_ignored() {
        let doc = Html::parse_document(
            r#"<div class="itemFullText"><div>stray</div></div>
               <div id="k2Container" class="itemView"><div class="itemFullText">
                 <div>wrong container classes</div></div></div>"#,
        );
        assert!(text_blocks(&doc).is_empty());
    }
}
