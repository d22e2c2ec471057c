//! Widget defaults table.
//!
//! The single source of truth for what a block looks like when the user has
//! not styled it. Both the canvas preview (through the WASM bridge) and the
//! HTML/MJML exporters resolve styles through this table, so preview and
//! export agree.

use crate::style::{StyleMap, StyleValue, style_map};
use serde_json::{Map, Value, json};
use std::fmt;

// ─── Block kinds ─────────────────────────────────────────────────────────

/// The leaf widget types a Block can be.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Image,
    Button,
    Headline,
    Paragraph,
    List,
    Divider,
    Spacer,
    SocialLinks,
    Video,
    Html,
    /// A type this version does not know. Kept verbatim for round trips and
    /// rendered as an empty placeholder.
    Unknown(String),
}

impl BlockKind {
    pub const KNOWN: [BlockKind; 10] = [
        BlockKind::Image,
        BlockKind::Button,
        BlockKind::Headline,
        BlockKind::Paragraph,
        BlockKind::List,
        BlockKind::Divider,
        BlockKind::Spacer,
        BlockKind::SocialLinks,
        BlockKind::Video,
        BlockKind::Html,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            BlockKind::Image => "Image",
            BlockKind::Button => "Button",
            BlockKind::Headline => "Headline",
            BlockKind::Paragraph => "Paragraph",
            BlockKind::List => "List",
            BlockKind::Divider => "Divider",
            BlockKind::Spacer => "Spacer",
            BlockKind::SocialLinks => "SocialLinks",
            BlockKind::Video => "Video",
            BlockKind::Html => "Html",
            BlockKind::Unknown(name) => name,
        }
    }

    /// Case-insensitive; a few legacy aliases are accepted.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "image" | "img" => BlockKind::Image,
            "button" => BlockKind::Button,
            "headline" | "heading" | "title" => BlockKind::Headline,
            "paragraph" | "text" => BlockKind::Paragraph,
            "list" => BlockKind::List,
            "divider" => BlockKind::Divider,
            "spacer" => BlockKind::Spacer,
            "sociallinks" | "social" | "social-links" => BlockKind::SocialLinks,
            "video" => BlockKind::Video,
            "html" | "code" => BlockKind::Html,
            _ => BlockKind::Unknown(s.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, BlockKind::Unknown(_))
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Default entries ─────────────────────────────────────────────────────

/// When a table entry replaces the element's own value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Only when the property is absent. An explicit empty or zero value stays.
    Unset,
    /// When absent or an empty string.
    Blank,
}

#[derive(Debug, Clone, Copy)]
pub struct WidgetDefault {
    pub prop: &'static str,
    pub value: &'static str,
    pub when: Fallback,
}

const fn unset(prop: &'static str, value: &'static str) -> WidgetDefault {
    WidgetDefault {
        prop,
        value,
        when: Fallback::Unset,
    }
}

const fn blank(prop: &'static str, value: &'static str) -> WidgetDefault {
    WidgetDefault {
        prop,
        value,
        when: Fallback::Blank,
    }
}

const HEADLINE: &[WidgetDefault] = &[
    blank("color", "#333333"),
    blank("fontSize", "28px"),
    blank("fontWeight", "bold"),
    blank("lineHeight", "1.3"),
    blank("margin", "0"),
    blank("textAlign", "left"),
];

const PARAGRAPH: &[WidgetDefault] = &[
    blank("color", "#555555"),
    blank("fontSize", "14px"),
    blank("lineHeight", "1.6"),
    blank("margin", "0"),
    blank("textAlign", "left"),
];

const BUTTON: &[WidgetDefault] = &[
    unset("backgroundColor", "#007bff"),
    unset("borderRadius", "4px"),
    unset("padding", "10px 20px"),
    blank("color", "#ffffff"),
    blank("display", "inline-block"),
    blank("fontSize", "14px"),
    blank("fontWeight", "bold"),
    blank("textAlign", "center"),
    blank("textDecoration", "none"),
];

const IMAGE: &[WidgetDefault] = &[
    blank("display", "block"),
    blank("height", "auto"),
    blank("maxWidth", "100%"),
    blank("width", "100%"),
];

const LIST: &[WidgetDefault] = &[
    blank("color", "#555555"),
    blank("fontSize", "14px"),
    blank("lineHeight", "1.6"),
    blank("margin", "0"),
    blank("paddingLeft", "20px"),
];

const DIVIDER: &[WidgetDefault] = &[
    blank("borderColor", "#dddddd"),
    blank("borderStyle", "solid"),
    blank("borderWidth", "1px 0 0 0"),
    blank("margin", "10px 0"),
    blank("width", "100%"),
];

const SPACER: &[WidgetDefault] = &[blank("height", "20px")];

const SOCIAL_LINKS: &[WidgetDefault] = &[blank("textAlign", "center")];

const VIDEO: &[WidgetDefault] = &[
    blank("display", "block"),
    blank("maxWidth", "100%"),
    blank("width", "100%"),
];

const NONE: &[WidgetDefault] = &[];

/// Default style entries for a block kind.
pub fn block_defaults(kind: &BlockKind) -> &'static [WidgetDefault] {
    match kind {
        BlockKind::Headline => HEADLINE,
        BlockKind::Paragraph => PARAGRAPH,
        BlockKind::Button => BUTTON,
        BlockKind::Image => IMAGE,
        BlockKind::List => LIST,
        BlockKind::Divider => DIVIDER,
        BlockKind::Spacer => SPACER,
        BlockKind::SocialLinks => SOCIAL_LINKS,
        BlockKind::Video => VIDEO,
        BlockKind::Html | BlockKind::Unknown(_) => NONE,
    }
}

/// Fill unset properties of a resolved block style from the table.
pub fn apply_block_defaults(kind: &BlockKind, style: &mut StyleMap) {
    for entry in block_defaults(kind) {
        let missing = match (style.get(entry.prop), entry.when) {
            (None, _) => true,
            (Some(v), Fallback::Blank) => v.is_blank(),
            (Some(_), Fallback::Unset) => false,
        };
        if missing {
            style.insert(entry.prop.to_string(), StyleValue::from(entry.value));
        }
    }
}

/// Lookup of a single default, for exporters that read one property.
pub fn block_default(kind: &BlockKind, prop: &str) -> Option<&'static str> {
    block_defaults(kind)
        .iter()
        .find(|entry| entry.prop == prop)
        .map(|entry| entry.value)
}

// ─── Container styles ────────────────────────────────────────────────────

const CONTAINER_PREFIX: &str = "container";

/// Values a block's wrapper has when nothing is set.
pub const CONTAINER_DEFAULTS: &[(&str, &str)] = &[
    ("backgroundColor", "transparent"),
    ("margin", "0"),
    ("padding", "0"),
    ("textAlign", "left"),
];

/// Split a resolved block style into `(element, container)`.
///
/// `containerPadding` becomes `padding` in the container map.
pub fn split_container(style: StyleMap) -> (StyleMap, StyleMap) {
    let mut element = StyleMap::new();
    let mut container = StyleMap::new();
    for (key, value) in style {
        match container_prop(&key) {
            Some(name) => {
                container.insert(name, value);
            }
            None => {
                element.insert(key, value);
            }
        }
    }
    (element, container)
}

/// `containerTextAlign` → `textAlign`; `None` for non-container keys.
fn container_prop(key: &str) -> Option<String> {
    let rest = key.strip_prefix(CONTAINER_PREFIX)?;
    let mut chars = rest.chars();
    let first = chars.next().filter(char::is_ascii_uppercase)?;
    Some(first.to_ascii_lowercase().to_string() + chars.as_str())
}

/// True when the container carries anything a bare wrapper would not.
pub fn container_is_styled(container: &StyleMap) -> bool {
    container.iter().any(|(prop, value)| {
        if value.is_blank() {
            return false;
        }
        let css = value.to_css();
        match CONTAINER_DEFAULTS.iter().find(|(p, _)| *p == prop.as_str()) {
            Some((_, default)) => css.trim() != *default && !(is_zero(&css) && is_zero(default)),
            None => true,
        }
    })
}

fn is_zero(s: &str) -> bool {
    s.split_whitespace()
        .all(|t| t.trim_end_matches(|c: char| c.is_ascii_alphabetic() || c == '%') == "0")
}

// ─── Structural defaults ─────────────────────────────────────────────────

/// Body-level defaults stored on a new Template.
pub fn template_style() -> StyleMap {
    style_map([
        ("backgroundColor", "#f4f4f4"),
        ("color", "#333333"),
        ("fontFamily", "Arial, Helvetica, sans-serif"),
        ("paddingTop", "20px"),
        ("paddingBottom", "20px"),
    ])
}

/// Email-safe row: 650px wide, centered.
pub fn section_style() -> StyleMap {
    style_map([
        ("backgroundColor", "#ffffff"),
        ("boxSizing", "border-box"),
        ("display", "flex"),
        ("flexWrap", "wrap"),
        ("margin", "0 auto"),
        ("maxWidth", "650px"),
        ("width", "100%"),
    ])
}

pub fn column_style() -> StyleMap {
    style_map([("boxSizing", "border-box"), ("padding", "10px")])
}

pub fn inner_section_style() -> StyleMap {
    style_map([
        ("display", "flex"),
        ("flexDirection", "row"),
        ("width", "100%"),
    ])
}

// ─── Default content ─────────────────────────────────────────────────────

/// Initial `data` for a freshly dropped block.
pub fn block_data(kind: &BlockKind) -> Map<String, Value> {
    let value = match kind {
        BlockKind::Headline => json!({ "content": "Your headline here", "level": "h2" }),
        BlockKind::Paragraph => json!({
            "content": "Write something people will want to read."
        }),
        BlockKind::Button => json!({ "text": "Click here", "href": "#" }),
        BlockKind::Image => json!({
            "src": "https://placehold.co/600x300",
            "alt": "Image",
            "href": ""
        }),
        BlockKind::List => json!({
            "items": ["First item", "Second item", "Third item"],
            "ordered": false
        }),
        BlockKind::SocialLinks => json!({
            "links": [
                { "platform": "facebook", "url": "https://facebook.com" },
                { "platform": "twitter", "url": "https://twitter.com" },
                { "platform": "instagram", "url": "https://instagram.com" }
            ],
            "iconSize": 24
        }),
        BlockKind::Video => json!({
            "url": "",
            "thumbnail": "https://placehold.co/600x340?text=Video",
            "alt": "Watch the video"
        }),
        BlockKind::Html => json!({ "content": "" }),
        BlockKind::Divider | BlockKind::Spacer | BlockKind::Unknown(_) => json!({}),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_keeps_explicit_zero_radius() {
        let mut style = style_map([("borderRadius", "0")]);
        apply_block_defaults(&BlockKind::Button, &mut style);
        assert_eq!(style["borderRadius"], StyleValue::from("0"));
        assert_eq!(style["backgroundColor"], StyleValue::from("#007bff"));
    }

    #[test]
    fn button_keeps_explicit_empty_background() {
        let mut style = style_map([("backgroundColor", "")]);
        apply_block_defaults(&BlockKind::Button, &mut style);
        assert_eq!(style["backgroundColor"], StyleValue::from(""));
    }

    #[test]
    fn headline_replaces_blank_color() {
        let mut style = style_map([("color", "")]);
        apply_block_defaults(&BlockKind::Headline, &mut style);
        assert_eq!(style["color"], StyleValue::from("#333333"));
    }

    #[test]
    fn container_split_strips_prefix() {
        let (element, container) = split_container(style_map([
            ("color", "red"),
            ("containerPadding", "12px"),
            ("containerBackgroundColor", "#eee"),
            ("containers", "not-a-container-prop"),
        ]));
        assert_eq!(element.len(), 2);
        assert_eq!(container["padding"], StyleValue::from("12px"));
        assert_eq!(container["backgroundColor"], StyleValue::from("#eee"));
    }

    #[test]
    fn default_container_is_not_styled() {
        assert!(!container_is_styled(&style_map([
            ("padding", "0px"),
            ("textAlign", "left")
        ])));
        assert!(container_is_styled(&style_map([("padding", "8px")])));
        assert!(container_is_styled(&style_map([("borderTop", "1px solid red")])));
    }

    #[test]
    fn parse_is_lenient() {
        assert_eq!(BlockKind::parse("paragraph"), BlockKind::Paragraph);
        assert_eq!(BlockKind::parse("Social"), BlockKind::SocialLinks);
        assert_eq!(
            BlockKind::parse("Countdown"),
            BlockKind::Unknown("Countdown".into())
        );
    }

    #[test]
    fn every_known_kind_has_data_object() {
        for kind in BlockKind::KNOWN {
            let _ = block_data(&kind);
            assert_eq!(BlockKind::parse(kind.as_str()), kind);
        }
    }
}
