//! HTML export: Template → standalone HTML document.
//!
//! Every element carries its desktop style inline, since many mail clients
//! drop `<style>` blocks; the collected stylesheet adds the responsive rules.
//! Each Block renders exactly one leaf tag whose class is the block's id.

use crate::css::{COLUMN_CLASS, collect_css};
use crate::export::ExportConfig;
use crate::id::ElementId;
use crate::model::{Element, ElementKind, Template};
use crate::style::{Device, StyleMap, StyleValue, to_css_string};
use crate::value::{escape_attr, escape_html, format_num};
use crate::widgets::{BlockKind, apply_block_defaults, container_is_styled, split_container};
use petgraph::graph::NodeIndex;
use serde_json::Value;
use std::fmt::Write;

/// Full HTML document for a template.
#[must_use]
pub fn to_html(template: &Template, config: &ExportConfig) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    out.push_str("<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_html(&config.title));
    out.push_str("<style>\n");
    let _ = writeln!(
        out,
        "body{{margin:0;padding:0;font-family:{}}}",
        config.font_family
    );
    out.push_str("img{border:0;outline:none;text-decoration:none}\n");
    out.push_str(&collect_css(template, config));
    out.push_str("</style>\n</head>\n<body>\n");
    render_node(&mut out, template, template.root(), config, 0);
    out.push_str("</body>\n</html>\n");
    out
}

/// Markup of one element and its subtree.
pub fn render_html(template: &Template, id: ElementId, config: &ExportConfig) -> Option<String> {
    let idx = template.index_of(id)?;
    let mut out = String::new();
    render_node(&mut out, template, idx, config, 0);
    Some(out)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn render_node(out: &mut String, template: &Template, idx: NodeIndex, config: &ExportConfig, depth: usize) {
    let Some(element) = template.element_at(idx) else {
        return;
    };
    log::trace!("html {}", element.id());

    let id = element.id();
    let class = match element.kind() {
        ElementKind::Template => id.to_string(),
        ElementKind::Section => format!("mb-section {id}"),
        ElementKind::Column { .. } => format!("{COLUMN_CLASS} {id}"),
        ElementKind::InnerSection => format!("mb-inner-section {id}"),
        ElementKind::Block(kind) => {
            render_block(out, element, kind, depth);
            return;
        }
    };

    let mut style = to_css_string(&element.computed_style(Device::Desktop));
    if let Some(width) = element.width() {
        let w = format!("width:{}%", format_num(width));
        style = if style.is_empty() { w } else { format!("{w};{style}") };
    }
    if config.include_comments && matches!(element.kind(), ElementKind::Section) {
        indent(out, depth);
        let _ = writeln!(out, "<!-- section {id} -->");
    }
    indent(out, depth);
    let _ = writeln!(out, "<div class=\"{}\" style=\"{}\">", escape_attr(&class), escape_attr(&style));
    for child in template.children(idx) {
        render_node(out, template, *child, config, depth + 1);
    }
    indent(out, depth);
    out.push_str("</div>\n");
}

/// Desktop style of a block split into (element with defaults, container).
pub(crate) fn block_styles(element: &Element, kind: &BlockKind, device: Device) -> (StyleMap, StyleMap) {
    let (mut own, container) = split_container(element.computed_style(device));
    apply_block_defaults(kind, &mut own);
    (own, container)
}

fn render_block(out: &mut String, element: &Element, kind: &BlockKind, depth: usize) {
    let (own, container) = block_styles(element, kind, Device::Desktop);
    // Responsive container rules need the wrapper even when desktop is bare.
    let wrapped = container_is_styled(&container)
        || [Device::Tablet, Device::Mobile]
            .into_iter()
            .any(|device| container_is_styled(&block_styles(element, kind, device).1));
    let id = escape_attr(element.id().as_str());

    if wrapped {
        indent(out, depth);
        let _ = writeln!(
            out,
            "<div class=\"{id}-container\" style=\"{}\">",
            escape_attr(&to_css_string(&container))
        );
    }
    indent(out, depth + usize::from(wrapped));
    let attrs = format!("class=\"{id}\" style=\"{}\"", escape_attr(&to_css_string(&own)));
    out.push_str(&block_markup(element, kind, &attrs, &own));
    out.push('\n');
    if wrapped {
        indent(out, depth);
        out.push_str("</div>\n");
    }
}

fn text(element: &Element, key: &str) -> String {
    element.data_str(key).unwrap_or_default()
}

/// The single leaf tag (plus its inner content) of a block.
fn block_markup(element: &Element, kind: &BlockKind, attrs: &str, style: &StyleMap) -> String {
    match kind {
        BlockKind::Headline => {
            let level = heading_level(element);
            format!("<{level} {attrs}>{}</{level}>", text(element, "content"))
        }
        BlockKind::Paragraph => format!("<p {attrs}>{}</p>", text(element, "content")),
        BlockKind::Html => format!("<div {attrs}>{}</div>", text(element, "content")),
        BlockKind::Button => format!(
            "<a {attrs} href=\"{}\" target=\"_blank\">{}</a>",
            escape_attr(&text(element, "href")),
            escape_html(&text(element, "text"))
        ),
        BlockKind::Image => {
            let img = format!(
                "<img {attrs} src=\"{}\" alt=\"{}\">",
                escape_attr(&text(element, "src")),
                escape_attr(&text(element, "alt"))
            );
            match element.data_str("href") {
                Some(href) => format!("<a href=\"{}\" target=\"_blank\">{img}</a>", escape_attr(&href)),
                None => img,
            }
        }
        BlockKind::List => {
            let tag = if element.data().get("ordered").and_then(Value::as_bool) == Some(true) {
                "ol"
            } else {
                "ul"
            };
            let items: String = list_items(element)
                .iter()
                .map(|item| format!("<li>{}</li>", escape_html(item)))
                .collect();
            format!("<{tag} {attrs}>{items}</{tag}>")
        }
        BlockKind::Divider => format!("<hr {attrs}>"),
        BlockKind::Spacer => format!("<div {attrs}></div>"),
        BlockKind::SocialLinks => {
            let size = element
                .data()
                .get("iconSize")
                .and_then(Value::as_f64)
                .unwrap_or(24.0);
            let links: String = social_links(element)
                .iter()
                .map(|(platform, url)| {
                    format!(
                        "<a href=\"{}\" target=\"_blank\" style=\"display:inline-block;margin:0 4px;line-height:{}px\">{}</a>",
                        escape_attr(url),
                        format_num(size),
                        escape_html(platform)
                    )
                })
                .collect();
            format!("<div {attrs}>{links}</div>")
        }
        BlockKind::Video => {
            let width = style.get("width").map(StyleValue::to_css).unwrap_or_else(|| "100%".into());
            format!(
                "<a {attrs} href=\"{}\" target=\"_blank\"><img src=\"{}\" alt=\"{}\" style=\"display:block;width:{}\"></a>",
                escape_attr(&text(element, "url")),
                escape_attr(&text(element, "thumbnail")),
                escape_attr(&text(element, "alt")),
                escape_attr(&width)
            )
        }
        BlockKind::Unknown(name) => format!(
            "<div {attrs} data-block-type=\"{}\"></div>",
            escape_attr(name)
        ),
    }
}

pub(crate) fn heading_level(element: &Element) -> &'static str {
    match element.data_str("level").as_deref() {
        Some("h1") | Some("1") => "h1",
        Some("h3") | Some("3") => "h3",
        Some("h4") | Some("4") => "h4",
        Some("h5") | Some("5") => "h5",
        Some("h6") | Some("6") => "h6",
        _ => "h2",
    }
}

/// List items as text; objects contribute their `text` field.
pub(crate) fn list_items(element: &Element) -> Vec<String> {
    match element.data().get("items") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(map) => map.get("text").and_then(Value::as_str).map(str::to_string),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// `(platform, url)` pairs; entries without a URL are skipped.
pub(crate) fn social_links(element: &Element) -> Vec<(String, String)> {
    match element.data().get("links") {
        Some(Value::Array(links)) => links
            .iter()
            .filter_map(|link| {
                let url = link.get("url")?.as_str()?.to_string();
                let platform = link
                    .get("platform")
                    .and_then(Value::as_str)
                    .unwrap_or("link")
                    .to_string();
                Some((platform, url))
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementTree;

    fn single(kind: BlockKind) -> (Template, ElementId) {
        let mut t = Template::new();
        let root = t.root_id();
        let section = t
            .add_child(root, ElementTree::section_with_columns(&[100.0]), None)
            .unwrap();
        let column = t.children_of(section)[0];
        let block = t.add_child(column, ElementTree::block(kind), None).unwrap();
        (t, block)
    }

    fn markup(t: &Template, id: ElementId) -> String {
        render_html(t, id, &ExportConfig::default()).unwrap()
    }

    #[test]
    fn button_defaults_apply_only_when_unset() {
        let (mut t, block) = single(BlockKind::Button);
        assert!(markup(&t, block).contains("background-color:#007bff"));
        t.update(block, Device::Desktop, "backgroundColor", Some("".into()));
        let html = markup(&t, block);
        assert!(!html.contains("#007bff"));
    }

    #[test]
    fn container_wrapper_only_when_styled() {
        let (mut t, block) = single(BlockKind::Paragraph);
        assert!(!markup(&t, block).contains("-container"));
        t.update(block, Device::Desktop, "containerPadding", Some("0px".into()));
        assert!(!markup(&t, block).contains("-container"));
        t.update(block, Device::Desktop, "containerBackgroundColor", Some("#eee".into()));
        let html = markup(&t, block);
        assert!(html.starts_with(&format!("<div class=\"{block}-container\" style=\"")));
        assert!(html.contains("background-color:#eee"));
    }

    #[test]
    fn image_links_wrap_the_img() {
        let (mut t, block) = single(BlockKind::Image);
        t.update_data(block, "href", "https://example.com".into());
        let html = markup(&t, block);
        assert!(html.starts_with("<a href=\"https://example.com\""));
        assert!(html.contains(&format!("<img class=\"{block}\"")));
    }

    #[test]
    fn headline_level_and_list_kind() {
        let (mut t, block) = single(BlockKind::Headline);
        t.update_data(block, "level", "h1".into());
        assert!(markup(&t, block).starts_with("<h1 "));

        let (mut t, list) = single(BlockKind::List);
        t.update_data(list, "ordered", true.into());
        t.update_data(list, "items", serde_json::json!(["a < b"]));
        let html = markup(&t, list);
        assert!(html.starts_with("<ol "));
        assert!(html.contains("<li>a &lt; b</li>"));
    }

    #[test]
    fn document_skeleton() {
        let (t, _) = single(BlockKind::Spacer);
        let config = ExportConfig {
            title: "Hello & welcome".into(),
            include_comments: true,
            ..Default::default()
        };
        let html = to_html(&t, &config);
        assert!(html.starts_with("<!DOCTYPE html>\n<html"));
        assert!(html.contains("<title>Hello &amp; welcome</title>"));
        assert!(html.contains("<!-- section "));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn unknown_blocks_render_a_placeholder() {
        let (t, block) = single(BlockKind::Unknown("Countdown".into()));
        assert!(markup(&t, block).contains("data-block-type=\"Countdown\""));
    }

    #[test]
    fn block_ids_are_escaped_in_class_attributes() {
        let t = Template::from_json(&serde_json::json!({ "children": [
            { "id": "s\"x", "name": "Section", "children": [
                { "name": "Column", "width": 100, "children": [
                    { "id": "p\"><script>x</script>", "type": "Paragraph",
                      "data": { "content": "Hi" },
                      "_style": { "containerPadding": "8px" } }
                ]}
            ]}
        ]}));
        let html = to_html(&t, &ExportConfig::default());
        assert!(!html.contains("<script>"));
        assert!(html.contains("class=\"p&quot;&gt;&lt;script&gt;x&lt;/script&gt;\""));
        assert!(html.contains("class=\"p&quot;&gt;&lt;script&gt;x&lt;/script&gt;-container\""));
        assert!(html.contains("class=\"mb-section s&quot;x\""));
    }

    #[test]
    fn video_renders_a_linked_thumbnail() {
        let (mut t, block) = single(BlockKind::Video);
        t.update_data(block, "url", "https://video.example/watch?v=1&t=2".into());
        let html = markup(&t, block);
        assert!(html.starts_with(&format!("<a class=\"{block}\"")));
        assert!(html.contains("href=\"https://video.example/watch?v=1&amp;t=2\""));
        assert!(html.contains("<img src=\"https://placehold.co/600x340?text=Video\""));
        assert!(html.contains("alt=\"Watch the video\""));
        assert!(html.trim_end().ends_with("</a>"));
    }

    #[test]
    fn social_links_render_one_anchor_per_link() {
        let (mut t, block) = single(BlockKind::SocialLinks);
        t.update_data(
            block,
            "links",
            serde_json::json!([
                { "platform": "mastodon", "url": "https://social.example/@mb" },
                { "url": "https://example.com" },
                { "platform": "broken" }
            ]),
        );
        let html = markup(&t, block);
        assert!(html.starts_with(&format!("<div class=\"{block}\"")));
        assert_eq!(html.matches("<a href=").count(), 2);
        assert!(html.contains(">mastodon</a>"));
        assert!(html.contains(">link</a>"));
        assert!(html.contains("line-height:24px"));
    }
}
