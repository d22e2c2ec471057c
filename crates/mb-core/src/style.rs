//! Responsive style engine.
//!
//! Every element stores three style buckets keyed by device. Desktop is the
//! base; tablet and mobile hold overrides only. Resolving a style for a device
//! is a cascade (`desktop ← tablet ← mobile`), followed by expansion of the
//! editor's intermediate keys (size/unit pairs, gradient and shadow pickers)
//! into plain CSS properties.

use crate::value::{format_num, is_numeric};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ─── Devices ─────────────────────────────────────────────────────────────

/// A responsive breakpoint. Determines which style bucket an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    #[default]
    Desktop,
    Tablet,
    Mobile,
}

impl Device {
    /// Cascade order, lowest priority first.
    pub const ALL: [Device; 3] = [Device::Desktop, Device::Tablet, Device::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Device::Desktop => "desktop",
            Device::Tablet => "tablet",
            Device::Mobile => "mobile",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desktop" => Some(Device::Desktop),
            "tablet" => Some(Device::Tablet),
            "mobile" => Some(Device::Mobile),
            _ => None,
        }
    }

    /// The next-lower bucket this device inherits from.
    pub fn fallback(&self) -> Option<Device> {
        match self {
            Device::Desktop => None,
            Device::Tablet => Some(Device::Desktop),
            Device::Mobile => Some(Device::Tablet),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Values ──────────────────────────────────────────────────────────────

/// A single style value as stored by the editor: a string or a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    Number(f64),
    Text(String),
}

impl StyleValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Text(s) => Some(s),
            StyleValue::Number(_) => None,
        }
    }

    /// Numeric view: numbers as-is, numeric strings parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StyleValue::Number(n) => Some(*n),
            StyleValue::Text(s) => s.trim().parse().ok(),
        }
    }

    /// An empty or whitespace-only string.
    pub fn is_blank(&self) -> bool {
        matches!(self, StyleValue::Text(s) if s.trim().is_empty())
    }

    /// Render as a CSS value. Numbers carry no unit.
    pub fn to_css(&self) -> String {
        match self {
            StyleValue::Number(n) => format_num(*n),
            StyleValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        StyleValue::Text(s.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        StyleValue::Text(s)
    }
}

impl From<f64> for StyleValue {
    fn from(n: f64) -> Self {
        StyleValue::Number(n)
    }
}

impl From<i32> for StyleValue {
    fn from(n: i32) -> Self {
        StyleValue::Number(f64::from(n))
    }
}

impl fmt::Display for StyleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

/// Property name → value. Ordered so generated CSS is deterministic; the
/// lexical order also places shorthands (`padding`) before their longhands
/// (`paddingTop`).
pub type StyleMap = BTreeMap<String, StyleValue>;

/// Build a `StyleMap` from literal pairs.
pub fn style_map<K, V, I>(pairs: I) -> StyleMap
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<StyleValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

// ─── Per-device storage ──────────────────────────────────────────────────

/// The three style buckets of one element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleRecord {
    pub desktop: StyleMap,
    pub tablet: StyleMap,
    pub mobile: StyleMap,
}

impl StyleRecord {
    pub fn from_desktop(desktop: StyleMap) -> Self {
        Self {
            desktop,
            ..Default::default()
        }
    }

    pub fn bucket(&self, device: Device) -> &StyleMap {
        match device {
            Device::Desktop => &self.desktop,
            Device::Tablet => &self.tablet,
            Device::Mobile => &self.mobile,
        }
    }

    pub fn bucket_mut(&mut self, device: Device) -> &mut StyleMap {
        match device {
            Device::Desktop => &mut self.desktop,
            Device::Tablet => &mut self.tablet,
            Device::Mobile => &mut self.mobile,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desktop.is_empty() && self.tablet.is_empty() && self.mobile.is_empty()
    }
}

// ─── Resolution ──────────────────────────────────────────────────────────

/// Cascade the buckets up to `device`. Later buckets win on conflict.
#[must_use]
pub fn merge_for_device(record: &StyleRecord, device: Device) -> StyleMap {
    let mut merged = record.desktop.clone();
    if device == Device::Desktop {
        return merged;
    }
    merged.extend(record.tablet.iter().map(|(k, v)| (k.clone(), v.clone())));
    if device == Device::Mobile {
        merged.extend(record.mobile.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

const DEFAULT_SHADOW_COLOR: &str = "rgba(0,0,0,0.25)";

/// Expand editor-only keys into CSS properties, then drop every key that
/// contains a hyphen.
///
/// - `<prop>-size` + `<prop>-unit` → `<prop>` (`auto` unit wins, missing unit is `px`)
/// - `bgGradient-*` → `background` or `backgroundColor`
/// - `boxShadow-*` → `boxShadow`
#[must_use]
pub fn expand_derived(mut style: StyleMap) -> StyleMap {
    expand_sizes(&mut style);
    expand_gradient(&mut style);
    expand_box_shadow(&mut style);
    style.retain(|key, _| !key.contains('-'));
    style
}

fn expand_sizes(style: &mut StyleMap) {
    let sizes: Vec<(String, StyleValue)> = style
        .iter()
        .filter_map(|(k, v)| k.strip_suffix("-size").map(|base| (base.to_string(), v.clone())))
        .collect();

    for (base, size) in sizes {
        if size.is_blank() {
            continue;
        }
        let unit = style
            .get(&format!("{base}-unit"))
            .map(StyleValue::to_css)
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| "px".to_string());
        let value = if unit == "auto" {
            "auto".to_string()
        } else {
            format!("{}{unit}", size.to_css())
        };
        style.insert(base, StyleValue::Text(value));
    }
}

fn text_or(style: &StyleMap, key: &str, default: &str) -> String {
    style
        .get(key)
        .filter(|v| !v.is_blank())
        .map(StyleValue::to_css)
        .unwrap_or_else(|| default.to_string())
}

fn number_or(style: &StyleMap, key: &str, default: f64) -> String {
    style
        .get(key)
        .and_then(StyleValue::as_f64)
        .map(format_num)
        .unwrap_or_else(|| format_num(default))
}

fn expand_gradient(style: &mut StyleMap) {
    let kind = style
        .get("bgGradient-type")
        .and_then(StyleValue::as_str)
        .map(str::to_string);
    match kind.as_deref() {
        Some("gradient") => {
            let color1 = text_or(style, "bgGradient-color1", "transparent");
            let color2 = text_or(style, "bgGradient-color2", "transparent");
            let location1 = number_or(style, "bgGradient-location1", 0.0);
            let location2 = number_or(style, "bgGradient-location2", 100.0);
            let value = match style.get("bgGradient-gradientType").and_then(StyleValue::as_str) {
                Some("radial") => format!(
                    "radial-gradient(circle, {color1} {location1}%, {color2} {location2}%)"
                ),
                _ => {
                    let angle = number_or(style, "bgGradient-angle", 180.0);
                    format!(
                        "linear-gradient({angle}deg, {color1} {location1}%, {color2} {location2}%)"
                    )
                }
            };
            style.insert("background".into(), StyleValue::Text(value));
        }
        Some("solid") => {
            let color = style
                .get("bgGradient-color1")
                .filter(|v| !v.is_blank())
                .cloned();
            if let Some(color) = color {
                style.insert("backgroundColor".into(), color);
            }
        }
        _ => {}
    }
}

/// A shadow offset: plain numbers get `px`, anything else is used verbatim.
fn shadow_length(style: &StyleMap, key: &str, default: f64) -> String {
    match style.get(key).filter(|v| !v.is_blank()) {
        Some(StyleValue::Number(n)) => format!("{}px", format_num(*n)),
        Some(StyleValue::Text(t)) if is_numeric(t) => format!("{}px", t.trim()),
        Some(StyleValue::Text(t)) => t.trim().to_string(),
        None => format!("{}px", format_num(default)),
    }
}

fn expand_box_shadow(style: &mut StyleMap) {
    if !style.keys().any(|k| k.starts_with("boxShadow-")) {
        return;
    }
    let inset = match style.get("boxShadow-position").and_then(StyleValue::as_str) {
        Some("inset") => "inset ",
        _ => "",
    };
    let value = format!(
        "{inset}{} {} {} {} {}",
        shadow_length(style, "boxShadow-horizontal", 0.0),
        shadow_length(style, "boxShadow-vertical", 0.0),
        shadow_length(style, "boxShadow-blur", 10.0),
        shadow_length(style, "boxShadow-spread", 0.0),
        text_or(style, "boxShadow-color", DEFAULT_SHADOW_COLOR),
    );
    style.insert("boxShadow".into(), StyleValue::Text(value));
}

/// `backgroundColor` → `background-color`, `WebkitTransform` → `-webkit-transform`.
pub fn camel_to_kebab(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Expanded `(css-property, value)` pairs, blank values skipped.
pub fn declarations(style: &StyleMap) -> Vec<(String, String)> {
    expand_derived(style.clone())
        .iter()
        .filter(|(_, v)| !v.is_blank())
        .map(|(k, v)| (camel_to_kebab(k), v.to_css()))
        .collect()
}

/// Serialize a flat style as a CSS declaration list: `prop:value;prop2:value2`.
#[must_use]
pub fn to_css_string(style: &StyleMap) -> String {
    declarations(style)
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Properties of `effective` whose value differs from `base`.
pub fn diff_styles(base: &StyleMap, effective: &StyleMap) -> StyleMap {
    effective
        .iter()
        .filter(|(k, v)| base.get(*k) != Some(*v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record() -> StyleRecord {
        StyleRecord {
            desktop: style_map([("color", "red"), ("fontSize", "16px")]),
            tablet: style_map([("fontSize", "14px")]),
            mobile: style_map([("color", "blue")]),
        }
    }

    #[test]
    fn desktop_only_properties_reach_mobile() {
        let merged = merge_for_device(&record(), Device::Mobile);
        assert_eq!(merged["fontSize"], StyleValue::from("14px"));
        assert_eq!(merged["color"], StyleValue::from("blue"));
        let desktop = merge_for_device(&record(), Device::Desktop);
        assert_eq!(desktop["color"], StyleValue::from("red"));
    }

    #[test]
    fn tablet_does_not_see_mobile_bucket() {
        let merged = merge_for_device(&record(), Device::Tablet);
        assert_eq!(merged["color"], StyleValue::from("red"));
        assert_eq!(merged["fontSize"], StyleValue::from("14px"));
    }

    #[test]
    fn size_and_unit_pairs_collapse() {
        for (size, unit, expected) in [
            (StyleValue::from(12), "px", "12px"),
            (StyleValue::from(50), "%", "50%"),
            (StyleValue::from(1.5), "em", "1.5em"),
            (StyleValue::from(10), "vw", "10vw"),
            (StyleValue::from(99), "auto", "auto"),
        ] {
            let out = expand_derived(style_map([
                ("width-size", size),
                ("width-unit", StyleValue::from(unit)),
            ]));
            assert_eq!(out, style_map([("width", expected)]));
        }
    }

    #[test]
    fn size_without_unit_defaults_to_px() {
        let out = expand_derived(style_map([("fontSize-size", 18)]));
        assert_eq!(out["fontSize"], StyleValue::from("18px"));
    }

    #[test]
    fn linear_gradient_synthesis() {
        let out = expand_derived(style_map([
            ("bgGradient-type", StyleValue::from("gradient")),
            ("bgGradient-gradientType", "linear".into()),
            ("bgGradient-color1", "#fff".into()),
            ("bgGradient-location1", 0.into()),
            ("bgGradient-color2", "#000".into()),
            ("bgGradient-location2", 100.into()),
            ("bgGradient-angle", 90.into()),
        ]));
        assert_eq!(
            out,
            style_map([("background", "linear-gradient(90deg, #fff 0%, #000 100%)")])
        );
    }

    #[test]
    fn radial_gradient_uses_defaults() {
        let out = expand_derived(style_map([
            ("bgGradient-type", "gradient"),
            ("bgGradient-gradientType", "radial"),
            ("bgGradient-color1", "red"),
            ("bgGradient-color2", "blue"),
        ]));
        assert_eq!(
            out["background"],
            StyleValue::from("radial-gradient(circle, red 0%, blue 100%)")
        );
    }

    #[test]
    fn solid_gradient_sets_background_color() {
        let out = expand_derived(style_map([
            ("bgGradient-type", "solid"),
            ("bgGradient-color1", "#123456"),
        ]));
        assert_eq!(out, style_map([("backgroundColor", "#123456")]));
    }

    #[test]
    fn box_shadow_defaults_and_inset() {
        let out = expand_derived(style_map([("boxShadow-horizontal", 2)]));
        assert_eq!(
            out["boxShadow"],
            StyleValue::from("2px 0px 10px 0px rgba(0,0,0,0.25)")
        );

        let out = expand_derived(style_map([
            ("boxShadow-position", StyleValue::from("inset")),
            ("boxShadow-vertical", 4.into()),
            ("boxShadow-color", "#333".into()),
        ]));
        assert_eq!(out["boxShadow"], StyleValue::from("inset 0px 4px 10px 0px #333"));
    }

    #[test]
    fn hyphenated_keys_are_dropped_and_others_pass_through() {
        let out = expand_derived(style_map([
            ("flex", StyleValue::from(1)),
            ("some-thing", "x".into()),
            ("customProp", "keep".into()),
        ]));
        assert_eq!(
            out,
            style_map([("customProp", StyleValue::from("keep")), ("flex", 1.into())])
        );
    }

    #[test]
    fn css_string_is_kebab_cased() {
        let css = to_css_string(&style_map([
            ("backgroundColor", StyleValue::from("#fff")),
            ("flex", 1.into()),
            ("padding-size", 10.into()),
        ]));
        assert_eq!(css, "background-color:#fff;flex:1;padding:10px");
    }

    #[test]
    fn kebab_handles_vendor_prefix() {
        assert_eq!(camel_to_kebab("WebkitTextSizeAdjust"), "-webkit-text-size-adjust");
        assert_eq!(camel_to_kebab("color"), "color");
    }

    #[test]
    fn diff_keeps_only_changes() {
        let base = style_map([("a", "1"), ("b", "2")]);
        let eff = style_map([("a", "1"), ("b", "3"), ("c", "4")]);
        assert_eq!(diff_styles(&base, &eff), style_map([("b", "3"), ("c", "4")]));
    }

    #[test]
    fn device_parse_and_fallback() {
        assert_eq!(Device::parse("Mobile"), Some(Device::Mobile));
        assert_eq!(Device::parse("watch"), None);
        assert_eq!(Device::Mobile.fallback(), Some(Device::Tablet));
        assert_eq!(Device::Desktop.fallback(), None);
    }
}
