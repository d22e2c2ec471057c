//! MJML export: Template → `<mjml>` document.
//!
//! Sections map to `<mj-section>`, Columns to `<mj-column>`, InnerSections to
//! `<mj-group>`. Blocks map to the closest MJML component and read their
//! attributes from the same resolved style (widget defaults included) that the
//! HTML exporter inlines.

use crate::css::collect_css;
use crate::export::ExportConfig;
use crate::html::{block_styles, heading_level, list_items, social_links};
use crate::id::ElementId;
use crate::model::{Element, ElementKind, Template};
use crate::style::{Device, StyleMap, StyleValue};
use crate::value::{box_shorthand, escape_attr, escape_html, format_num, parse_box};
use crate::widgets::BlockKind;
use petgraph::graph::NodeIndex;
use serde_json::Value;
use std::fmt::Write;

const OWA_STYLE: &str = "[owa] .mj-column-per-100 { width: 100% !important; max-width: 100%; }";

/// Full MJML document for a template.
#[must_use]
pub fn to_mjml(template: &Template, config: &ExportConfig) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str("<mjml>\n  <mj-head>\n");
    let _ = writeln!(out, "    <mj-title>{}</mj-title>", escape_html(&config.title));
    out.push_str("    <mj-attributes>\n");
    let _ = writeln!(
        out,
        "      <mj-all font-family=\"{}\" />",
        escape_attr(&config.font_family)
    );
    out.push_str("      <mj-section padding=\"0\" />\n");
    out.push_str("      <mj-column padding=\"0\" />\n");
    out.push_str("      <mj-text padding=\"0\" />\n");
    out.push_str("    </mj-attributes>\n");
    let _ = writeln!(out, "    <mj-style>\n      {OWA_STYLE}\n    </mj-style>");
    let _ = writeln!(
        out,
        "    <mj-style>\n      @media only screen and (max-width:{}px) {{ table.mj-full-width-mobile {{ width: 100% !important; }} td.mj-full-width-mobile {{ width: auto !important; }} }}\n    </mj-style>",
        config.mobile_breakpoint
    );
    // mj-column stacks on small screens by itself.
    let head_config = ExportConfig {
        stack_columns_on_mobile: false,
        ..config.clone()
    };
    let css = collect_css(template, &head_config);
    if !css.trim().is_empty() {
        out.push_str("    <mj-style>\n");
        for line in css.lines() {
            let _ = writeln!(out, "      {line}");
        }
        out.push_str("    </mj-style>\n");
    }
    out.push_str("  </mj-head>\n");

    let root = template.root_element();
    let body_style = root.computed_style(Device::Desktop);
    let mut attrs = vec![("width", format!("{}px", config.body_width))];
    push_css(&mut attrs, "background-color", &body_style, "backgroundColor");
    push_attr(&mut attrs, "css-class", Some(root.id().to_string()));
    let _ = writeln!(out, "  <mj-body{}>", attr_string(&attrs));
    for child in template.children(template.root()) {
        render_node(&mut out, template, *child, 2);
    }
    out.push_str("  </mj-body>\n</mjml>\n");
    out
}

/// MJML of one element and its subtree.
pub fn render_mjml(template: &Template, id: ElementId) -> Option<String> {
    let idx = template.index_of(id)?;
    let mut out = String::new();
    render_node(&mut out, template, idx, 0);
    Some(out)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn attr_string(attrs: &[(&str, String)]) -> String {
    attrs
        .iter()
        .map(|(k, v)| format!(" {k}=\"{}\"", escape_attr(v)))
        .collect()
}

fn push_attr(attrs: &mut Vec<(&'static str, String)>, name: &'static str, value: Option<String>) {
    if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
        attrs.push((name, value));
    }
}

fn css_value(style: &StyleMap, prop: &str) -> Option<String> {
    style
        .get(prop)
        .filter(|v| !v.is_blank())
        .map(StyleValue::to_css)
}

fn push_css(attrs: &mut Vec<(&'static str, String)>, name: &'static str, style: &StyleMap, prop: &str) {
    push_attr(attrs, name, css_value(style, prop));
}

fn open(out: &mut String, depth: usize, tag: &str, attrs: &[(&str, String)]) {
    indent(out, depth);
    let _ = writeln!(out, "<{tag}{}>", attr_string(attrs));
}

fn close(out: &mut String, depth: usize, tag: &str) {
    indent(out, depth);
    let _ = writeln!(out, "</{tag}>");
}

fn render_node(out: &mut String, template: &Template, idx: NodeIndex, depth: usize) {
    let Some(element) = template.element_at(idx) else {
        return;
    };
    let style = element.computed_style(Device::Desktop);
    let tag = match element.kind() {
        ElementKind::Template => {
            for child in template.children(idx) {
                render_node(out, template, *child, depth);
            }
            return;
        }
        ElementKind::Block(kind) => {
            render_block(out, element, kind, depth);
            return;
        }
        ElementKind::Section => "mj-section",
        ElementKind::Column { .. } => "mj-column",
        ElementKind::InnerSection => "mj-group",
    };

    let mut attrs = Vec::new();
    if let Some(width) = element.width() {
        attrs.push(("width", format!("{}%", format_num(width))));
    }
    push_css(&mut attrs, "background-color", &style, "backgroundColor");
    if tag != "mj-group" {
        push_attr(&mut attrs, "padding", box_shorthand(&style, "padding"));
        push_css(&mut attrs, "border-radius", &style, "borderRadius");
    }
    if tag == "mj-section" {
        push_css(&mut attrs, "text-align", &style, "textAlign");
    }
    if tag == "mj-column" {
        push_css(&mut attrs, "vertical-align", &style, "verticalAlign");
    }
    attrs.push(("css-class", element.id().to_string()));

    open(out, depth, tag, &attrs);
    for child in template.children(idx) {
        render_node(out, template, *child, depth + 1);
    }
    close(out, depth, tag);
}

fn text(element: &Element, key: &str) -> String {
    element.data_str(key).unwrap_or_default()
}

/// Typography attributes shared by `mj-text`, `mj-button` and `mj-social`.
fn text_attrs(attrs: &mut Vec<(&'static str, String)>, style: &StyleMap) {
    push_css(attrs, "color", style, "color");
    push_css(attrs, "font-family", style, "fontFamily");
    push_css(attrs, "font-size", style, "fontSize");
    push_css(attrs, "font-weight", style, "fontWeight");
    push_css(attrs, "line-height", style, "lineHeight");
}

/// The wrapper padding of a block: container padding, else the block's own.
fn outer_padding(own: &StyleMap, container: &StyleMap) -> Option<String> {
    box_shorthand(container, "padding").or_else(|| box_shorthand(own, "padding"))
}

fn render_block(out: &mut String, element: &Element, kind: &BlockKind, depth: usize) {
    let (own, container) = block_styles(element, kind, Device::Desktop);
    let id = element.id().to_string();
    let align = css_value(&container, "textAlign").or_else(|| css_value(&own, "textAlign"));
    let mut attrs: Vec<(&'static str, String)> = vec![("css-class", id.clone())];
    push_css(&mut attrs, "container-background-color", &container, "backgroundColor");

    match kind {
        BlockKind::Paragraph | BlockKind::Headline | BlockKind::List => {
            text_attrs(&mut attrs, &own);
            push_attr(&mut attrs, "align", align);
            push_attr(&mut attrs, "padding", outer_padding(&own, &container));
            let inner = match kind {
                BlockKind::Headline => {
                    let level = heading_level(element);
                    format!("<{level} style=\"margin:0\">{}</{level}>", text(element, "content"))
                }
                BlockKind::List => {
                    let tag = if element.data().get("ordered").and_then(Value::as_bool) == Some(true) {
                        "ol"
                    } else {
                        "ul"
                    };
                    let indent = css_value(&own, "paddingLeft").unwrap_or_else(|| "20px".into());
                    let items: String = list_items(element)
                        .iter()
                        .map(|item| format!("<li>{}</li>", escape_html(item)))
                        .collect();
                    format!("<{tag} style=\"margin:0;padding-left:{indent}\">{items}</{tag}>")
                }
                _ => text(element, "content"),
            };
            leaf(out, depth, "mj-text", &attrs, &inner);
        }
        BlockKind::Button => {
            push_attr(&mut attrs, "href", element.data_str("href"));
            text_attrs(&mut attrs, &own);
            push_css(&mut attrs, "background-color", &own, "backgroundColor");
            push_css(&mut attrs, "border-radius", &own, "borderRadius");
            push_attr(&mut attrs, "inner-padding", box_shorthand(&own, "padding"));
            push_attr(&mut attrs, "padding", box_shorthand(&container, "padding"));
            push_attr(&mut attrs, "align", css_value(&container, "textAlign"));
            leaf(out, depth, "mj-button", &attrs, &escape_html(&text(element, "text")));
        }
        BlockKind::Image | BlockKind::Video => {
            let (src, href) = match kind {
                BlockKind::Video => (element.data_str("thumbnail"), element.data_str("url")),
                _ => (element.data_str("src"), element.data_str("href")),
            };
            push_attr(&mut attrs, "src", src);
            push_attr(&mut attrs, "href", href);
            push_attr(&mut attrs, "alt", element.data_str("alt"));
            push_attr(&mut attrs, "width", css_value(&own, "width").filter(|w| w.ends_with("px")));
            push_css(&mut attrs, "border-radius", &own, "borderRadius");
            push_attr(&mut attrs, "align", align);
            push_attr(&mut attrs, "padding", outer_padding(&own, &container));
            empty(out, depth, "mj-image", &attrs);
        }
        BlockKind::Divider => {
            push_css(&mut attrs, "border-color", &own, "borderColor");
            push_css(&mut attrs, "border-style", &own, "borderStyle");
            push_attr(&mut attrs, "border-width", divider_width(&own));
            push_attr(&mut attrs, "padding", outer_padding(&own, &container));
            empty(out, depth, "mj-divider", &attrs);
        }
        BlockKind::Spacer => {
            push_css(&mut attrs, "height", &own, "height");
            empty(out, depth, "mj-spacer", &attrs);
        }
        BlockKind::SocialLinks => {
            let size = element
                .data()
                .get("iconSize")
                .and_then(Value::as_f64)
                .unwrap_or(24.0);
            attrs.push(("mode", "horizontal".into()));
            attrs.push(("icon-size", format!("{}px", format_num(size))));
            push_attr(&mut attrs, "align", align);
            push_attr(&mut attrs, "padding", outer_padding(&own, &container));
            open(out, depth, "mj-social", &attrs);
            for (platform, url) in social_links(element) {
                let link = [("name", platform.to_ascii_lowercase()), ("href", url)];
                leaf(out, depth + 1, "mj-social-element", &link, &escape_html(&platform));
            }
            close(out, depth, "mj-social");
        }
        BlockKind::Html => {
            let inner = format!("<div class=\"{id}\">{}</div>", text(element, "content"));
            leaf(out, depth, "mj-raw", &[], &inner);
        }
        BlockKind::Unknown(name) => {
            let inner = format!("<div class=\"{id}\" data-block-type=\"{}\"></div>", escape_attr(name));
            leaf(out, depth, "mj-raw", &[], &inner);
        }
    }
}

fn leaf(out: &mut String, depth: usize, tag: &str, attrs: &[(&str, String)], inner: &str) {
    indent(out, depth);
    let _ = writeln!(out, "<{tag}{}>{inner}</{tag}>", attr_string(attrs));
}

fn empty(out: &mut String, depth: usize, tag: &str, attrs: &[(&str, String)]) {
    indent(out, depth);
    let _ = writeln!(out, "<{tag}{} />", attr_string(attrs));
}

/// `mj-divider` takes one width; use the first non-zero side of `borderWidth`.
fn divider_width(style: &StyleMap) -> Option<String> {
    let raw = css_value(style, "borderWidth")?;
    let sides = parse_box(&raw)?;
    sides
        .into_iter()
        .find(|side| side.trim_end_matches(|c: char| c.is_ascii_alphabetic()) != "0")
        .or(Some(raw))
}
