//! Style collection: one CSS rule per element per non-empty device bucket.
//!
//! Desktop rules are plain. Tablet and mobile rules hold only what changes
//! relative to the next-lower device and carry `!important`, because the
//! exporters also inline the desktop style on every element.

use crate::export::ExportConfig;
use crate::model::{ElementKind, Template};
use crate::style::{Device, StyleMap, StyleValue, declarations, diff_styles};
use crate::value::format_num;
use crate::widgets::split_container;
use petgraph::graph::NodeIndex;
use std::fmt::Write;

/// Class shared by every rendered Column, targeted by the stacking rule.
pub const COLUMN_CLASS: &str = "mb-column";

#[derive(Debug, Clone, PartialEq)]
pub struct CssRule {
    /// Class name without the leading dot.
    pub class: String,
    pub declarations: Vec<(String, String)>,
}

/// Collected rules, grouped by the media query they belong to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyleSheet {
    pub desktop: Vec<CssRule>,
    pub tablet: Vec<CssRule>,
    pub mobile: Vec<CssRule>,
}

impl StyleSheet {
    pub fn rules(&self, device: Device) -> &[CssRule] {
        match device {
            Device::Desktop => &self.desktop,
            Device::Tablet => &self.tablet,
            Device::Mobile => &self.mobile,
        }
    }

    fn rules_mut(&mut self, device: Device) -> &mut Vec<CssRule> {
        match device {
            Device::Desktop => &mut self.desktop,
            Device::Tablet => &mut self.tablet,
            Device::Mobile => &mut self.mobile,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.desktop.is_empty() && self.tablet.is_empty() && self.mobile.is_empty()
    }

    /// Render as CSS text. Responsive groups are wrapped in
    /// `@media (max-width:<n>px)` using the configured breakpoints.
    pub fn render(&self, config: &ExportConfig) -> String {
        let mut out = String::new();
        for rule in &self.desktop {
            write_rule(&mut out, rule, false);
        }
        for (device, width) in [
            (Device::Tablet, config.tablet_breakpoint),
            (Device::Mobile, config.mobile_breakpoint),
        ] {
            let rules = self.rules(device);
            let stack = device == Device::Mobile && config.stack_columns_on_mobile;
            if rules.is_empty() && !stack {
                continue;
            }
            let _ = writeln!(out, "@media (max-width:{width}px){{");
            if stack {
                let _ = writeln!(out, ".{COLUMN_CLASS}{{width:100% !important}}");
            }
            for rule in rules {
                write_rule(&mut out, rule, true);
            }
            out.push_str("}\n");
        }
        out
    }
}

/// Ids that can be written verbatim as a `.class` selector.
fn is_selector_safe(class: &str) -> bool {
    !class.is_empty()
        && class
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

fn write_rule(out: &mut String, rule: &CssRule, important: bool) {
    if !is_selector_safe(&rule.class) {
        log::warn!("skipping CSS rule for unsafe class `{}`", rule.class);
        return;
    }
    let body = rule
        .declarations
        .iter()
        .map(|(k, v)| {
            if important {
                format!("{k}:{v} !important")
            } else {
                format!("{k}:{v}")
            }
        })
        .collect::<Vec<_>>()
        .join(";");
    let _ = writeln!(out, ".{}{{{body}}}", rule.class);
}

/// Walk the whole tree once per device bucket.
#[must_use]
pub fn collect_styles(template: &Template) -> StyleSheet {
    let mut sheet = StyleSheet::default();
    for device in Device::ALL {
        for (idx, _) in template.walk() {
            collect_node(template, idx, device, &mut sheet);
        }
    }
    sheet
}

/// [`collect_styles`] rendered to CSS text.
pub fn collect_css(template: &Template, config: &ExportConfig) -> String {
    collect_styles(template).render(config)
}

fn collect_node(template: &Template, idx: NodeIndex, device: Device, sheet: &mut StyleSheet) {
    let Some(element) = template.element_at(idx) else {
        return;
    };
    let record = element.style_record();
    let is_column = matches!(element.kind(), ElementKind::Column { .. });
    if record.bucket(device).is_empty() && !(is_column && device == Device::Desktop) {
        return;
    }

    let mut style = match device.fallback() {
        None => element.computed_style(Device::Desktop),
        Some(lower) => diff_styles(
            &element.computed_style(lower),
            &element.computed_style(device),
        ),
    };
    if let (Some(width), Device::Desktop) = (element.width(), device) {
        style.insert("width".into(), StyleValue::Text(format!("{}%", format_num(width))));
    }

    let class = element.id().as_str().to_string();
    let rules = sheet.rules_mut(device);
    if element.kind().is_block() {
        let (own, container) = split_container(style);
        push_rule(rules, format!("{class}-container"), &container);
        push_rule(rules, class, &own);
    } else {
        push_rule(rules, class, &style);
    }
}

fn push_rule(rules: &mut Vec<CssRule>, class: String, style: &StyleMap) {
    let declarations = declarations(style);
    if !declarations.is_empty() {
        log::trace!("css rule .{class} ({} declarations)", declarations.len());
        rules.push(CssRule {
            class,
            declarations,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ElementTree;
    use crate::widgets::BlockKind;

    fn template() -> (Template, crate::id::ElementId) {
        let mut t = Template::new();
        let root = t.root_id();
        let section = t
            .add_child(root, ElementTree::section_with_columns(&[100.0]), None)
            .unwrap();
        let column = t.children_of(section)[0];
        let block = t
            .add_child(column, ElementTree::block(BlockKind::Paragraph), None)
            .unwrap();
        (t, block)
    }

    #[test]
    fn responsive_rules_are_diffs() {
        let (mut t, block) = template();
        t.update(block, Device::Desktop, "color", Some("red".into()));
        t.update(block, Device::Desktop, "fontSize", Some("16px".into()));
        t.update(block, Device::Mobile, "fontSize", Some("12px".into()));
        let sheet = collect_styles(&t);
        let mobile = sheet
            .mobile
            .iter()
            .find(|r| r.class == block.as_str())
            .unwrap();
        assert_eq!(mobile.declarations, vec![("font-size".to_string(), "12px".to_string())]);
        assert!(sheet.tablet.iter().all(|r| r.class != block.as_str()));
    }

    #[test]
    fn container_styles_get_their_own_selector() {
        let (mut t, block) = template();
        t.update(block, Device::Desktop, "containerPadding", Some("8px".into()));
        let sheet = collect_styles(&t);
        let container = format!("{block}-container");
        let rule = sheet.desktop.iter().find(|r| r.class == container).unwrap();
        assert_eq!(rule.declarations, vec![("padding".to_string(), "8px".to_string())]);
    }

    #[test]
    fn rendered_css_has_both_media_queries() {
        let (mut t, block) = template();
        t.update(block, Device::Tablet, "color", Some("blue".into()));
        let css = collect_css(&t, &ExportConfig::default());
        assert!(css.contains("@media (max-width:768px){"));
        assert!(css.contains(&format!(".{block}{{color:blue !important}}")));
        assert!(css.contains("@media (max-width:480px){\n.mb-column{width:100% !important}"));
    }

    #[test]
    fn column_width_is_collected() {
        let (t, _) = template();
        let css = collect_css(&t, &ExportConfig::default());
        assert!(css.contains("width:100%"));
    }

    #[test]
    fn unsafe_ids_get_no_selector() {
        let t = Template::from_json(&serde_json::json!({ "children": [
            { "id": "a b{}", "name": "Section", "_style": { "color": "red" }, "children": [
                { "id": "ok-col", "name": "Column", "width": 100 }
            ]}
        ]}));
        let css = collect_css(&t, &ExportConfig::default());
        assert!(!css.contains("a b"));
        assert!(css.contains(".ok-col{"));
        assert!(is_selector_safe("section-4"));
        assert!(!is_selector_safe("p\"><script>"));
        assert!(!is_selector_safe(""));
    }
}
