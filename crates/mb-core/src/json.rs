//! Document JSON: the persisted form of a template.
//!
//! ```text
//! { id?, name?, type?, _style?: {desktop, tablet, mobile}, data?, children?, width? }
//! ```
//!
//! Import is best-effort. Every field is read as a raw `Value` and
//! interpreted leniently; anything missing or of the wrong shape falls back to
//! the kind's construction defaults. Only text that is not JSON at all is an
//! error.

use crate::id::ElementId;
use crate::model::{Element, ElementKind, ElementTree, Template};
use crate::style::{Device, StyleMap, StyleRecord, StyleValue};
use crate::widgets::BlockKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("template is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot could not be decoded: {0}")]
    Snapshot(#[from] rmp_serde::decode::Error),
}

/// Wire shape of one node. Fields stay raw so a wrong type in one field does
/// not reject the whole node.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementJson {
    #[serde(skip_serializing_if = "Value::is_null")]
    pub id: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub name: Value,
    #[serde(rename = "type", skip_serializing_if = "Value::is_null")]
    pub kind: Value,
    #[serde(rename = "_style", skip_serializing_if = "Value::is_null")]
    pub style: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub data: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub children: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub width: Value,
}

// ─── Import ──────────────────────────────────────────────────────────────

impl Template {
    /// Build a template from a Document JSON value. The top-level node is
    /// always the Template root, whatever its `name` says.
    pub fn from_json(value: &Value) -> Self {
        let node = read_node(value);
        let root_kind = ElementKind::Template;
        let root = decode_element(&node, root_kind.clone());
        let mut template = Template::with_root(root);
        let root_idx = template.root();
        let children = child_values(&node);
        let count = children.len();
        for child in children {
            let tree = decode_tree(child, Some(&root_kind), count);
            template.insert_tree(root_idx, tree, None);
        }
        log::debug!("imported template with {} elements", template.element_count());
        template
    }

    pub fn from_json_str(text: &str) -> Result<Self, ImportError> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&value))
    }

    /// Decode a snapshot written by [`Template::to_msgpack`].
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, ImportError> {
        let value: Value = rmp_serde::from_slice(bytes)?;
        Ok(Self::from_json(&value))
    }
}

impl ElementTree {
    /// Decode a detached subtree. With no parent to infer from, a node with a
    /// `type` is a Block, one with a `width` is a Column, anything else a
    /// Section.
    pub fn from_json(value: &Value) -> Self {
        decode_tree(value, None, 1)
    }
}

fn read_node(value: &Value) -> ElementJson {
    if !value.is_object() {
        log::warn!("element is not an object; using defaults");
        return ElementJson::default();
    }
    serde_json::from_value(value.clone()).unwrap_or_else(|err| {
        log::warn!("element could not be read ({err}); using defaults");
        ElementJson::default()
    })
}

fn child_values(node: &ElementJson) -> &[Value] {
    match &node.children {
        Value::Array(items) => items,
        Value::Null => &[],
        _ => {
            log::warn!("`children` is not an array; ignored");
            &[]
        }
    }
}

fn decode_tree(value: &Value, parent: Option<&ElementKind>, siblings: usize) -> ElementTree {
    let node = read_node(value);
    let kind = infer_kind(&node, parent, siblings);
    let element = decode_element(&node, kind.clone());

    let children = child_values(&node);
    if kind.is_block() && !children.is_empty() {
        log::warn!("block {} has children; ignored", element.id());
        return ElementTree {
            element,
            children: Vec::new(),
        };
    }
    let count = children.len();
    ElementTree {
        element,
        children: children
            .iter()
            .map(|child| decode_tree(child, Some(&kind), count))
            .collect(),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

const ELEMENT_NAMES: &[&str] = &[
    "template",
    "section",
    "column",
    "innersection",
    "inner-section",
    "inner_section",
    "block",
];

fn infer_kind(node: &ElementJson, parent: Option<&ElementKind>, siblings: usize) -> ElementKind {
    let block_type = text_of(&node.kind);
    let explicit = text_of(&node.name).map(|n| n.to_ascii_lowercase());
    if let Some(other) = explicit.as_deref().filter(|n| !ELEMENT_NAMES.contains(n)) {
        log::warn!("unknown element name `{other}`; inferring from parent");
    }
    let name = explicit.filter(|n| ELEMENT_NAMES.contains(&n.as_str()));

    let name = name.unwrap_or_else(|| {
        let has_children = !child_values(node).is_empty();
        let inferred = match parent {
            Some(ElementKind::Template) => "section",
            Some(ElementKind::Section) | Some(ElementKind::InnerSection) => "column",
            Some(ElementKind::Column { .. }) => {
                if block_type.is_some() || !has_children {
                    "block"
                } else {
                    "innersection"
                }
            }
            Some(ElementKind::Block(_)) => "block",
            None if block_type.is_some() => "block",
            None if !node.width.is_null() => "column",
            None => "section",
        };
        inferred.to_string()
    });

    match name.as_str() {
        "template" => ElementKind::Template,
        "section" => ElementKind::Section,
        "column" => ElementKind::Column {
            width: width_of(&node.width, siblings),
        },
        "block" => ElementKind::Block(
            block_type
                .as_deref()
                .map(BlockKind::parse)
                .unwrap_or(BlockKind::Paragraph),
        ),
        _ => ElementKind::InnerSection,
    }
}

fn width_of(value: &Value, siblings: usize) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    };
    match parsed {
        Some(w) if w.is_finite() => w.clamp(0.0, 100.0),
        _ => 100.0 / siblings.max(1) as f64,
    }
}

fn decode_element(node: &ElementJson, kind: ElementKind) -> Element {
    let id = match text_of(&node.id) {
        Some(id) => ElementId::intern(&id),
        None => ElementId::fresh(kind.id_prefix()),
    };

    let style = match &node.style {
        Value::Null => StyleRecord::from_desktop(kind.default_style()),
        other => decode_style(other),
    };

    let mut data = kind.default_data();
    match &node.data {
        Value::Object(map) => data.extend(map.iter().map(|(k, v)| (k.clone(), v.clone()))),
        Value::Null => {}
        _ => log::warn!("`data` of {id} is not an object; using defaults"),
    }

    Element::from_parts(id, kind, style, data)
}

/// Per-device buckets, or a flat map read as the desktop bucket.
fn decode_style(value: &Value) -> StyleRecord {
    let Value::Object(map) = value else {
        log::warn!("`_style` is not an object; ignored");
        return StyleRecord::default();
    };
    let bucketed = Device::ALL
        .iter()
        .any(|d| matches!(map.get(d.as_str()), Some(Value::Object(_))));
    if !bucketed {
        return StyleRecord::from_desktop(decode_style_map(map));
    }
    let mut record = StyleRecord::default();
    for device in Device::ALL {
        if let Some(Value::Object(bucket)) = map.get(device.as_str()) {
            *record.bucket_mut(device) = decode_style_map(bucket);
        }
    }
    record
}

fn decode_style_map(map: &Map<String, Value>) -> StyleMap {
    map.iter()
        .filter_map(|(k, v)| {
            let value = match v {
                Value::String(s) => StyleValue::Text(s.clone()),
                Value::Number(n) => StyleValue::Number(n.as_f64()?),
                Value::Bool(b) => StyleValue::Text(b.to_string()),
                Value::Null => return None,
                _ => {
                    log::warn!("style `{k}` has a non-scalar value; ignored");
                    return None;
                }
            };
            Some((k.clone(), value))
        })
        .collect()
}

// ─── Export ──────────────────────────────────────────────────────────────

impl Template {
    /// Full document with IDs, for persistence.
    pub fn to_json(&self) -> Value {
        encode_tree(&self.subtree_at(self.root()), true)
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_default()
    }

    /// A subtree without IDs, so instantiating it mints new identity.
    pub fn to_clone_json(&self, id: ElementId) -> Option<Value> {
        self.subtree(id).map(|tree| encode_tree(&tree, false))
    }

    /// Compact binary snapshot of [`Template::to_json`].
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec(&self.to_json())
    }
}

impl ElementTree {
    pub fn to_json(&self, with_ids: bool) -> Value {
        encode_tree(self, with_ids)
    }
}

fn encode_tree(tree: &ElementTree, with_ids: bool) -> Value {
    let element = tree.element();
    let mut node = ElementJson {
        name: Value::from(element.kind().name()),
        style: encode_style(element.style_record()),
        data: Value::Object(element.data().clone()),
        ..Default::default()
    };
    if with_ids {
        node.id = Value::from(element.id().as_str());
    }
    match element.kind() {
        ElementKind::Block(kind) => node.kind = Value::from(kind.as_str()),
        ElementKind::Column { width } => node.width = number(*width),
        _ => {}
    }
    if !element.kind().is_block() {
        node.children = Value::Array(
            tree.children()
                .iter()
                .map(|child| encode_tree(child, with_ids))
                .collect(),
        );
    }
    serde_json::to_value(node).unwrap_or(Value::Null)
}

fn encode_style(record: &StyleRecord) -> Value {
    let mut out = Map::new();
    for device in Device::ALL {
        let bucket: Map<String, Value> = record
            .bucket(device)
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    StyleValue::Number(n) => number(*n),
                    StyleValue::Text(s) => Value::from(s.as_str()),
                };
                (k.clone(), value)
            })
            .collect();
        out.insert(device.as_str().to_string(), Value::Object(bucket));
    }
    Value::Object(out)
}

/// Integral floats are written as JSON integers.
fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fresh_calls() -> usize {
        crate::id::FRESH_CALLS.with(|calls| calls.get())
    }

    #[test]
    fn explicit_ids_mint_nothing() {
        let doc = json!({ "id": "mint-root", "children": [
            { "id": "mint-section", "name": "Section", "children": [
                { "id": "mint-column", "name": "Column", "width": 100, "children": [
                    { "id": "mint-button", "type": "Button" }
                ]}
            ]}
        ]});
        let before = fresh_calls();
        let t = Template::from_json(&doc);
        assert_eq!(fresh_calls(), before);

        let section = t.get(ElementId::intern("mint-section")).unwrap();
        assert_eq!(section.style_record().desktop, crate::widgets::section_style());
        let button = t.get(ElementId::intern("mint-button")).unwrap();
        assert_eq!(button.data_str("text").as_deref(), Some("Click here"));

        let before = fresh_calls();
        Template::from_json(&json!({ "id": "mint-root", "children": [{ "name": "Section" }] }));
        assert_eq!(fresh_calls(), before + 1);
    }

    #[test]
    fn names_are_inferred_from_parents() {
        let t = Template::from_json(&json!({
            "children": [{ "children": [{ "children": [{ "type": "Button" }] }] }]
        }));
        let section = t.children_of(t.root_id())[0];
        let column = t.children_of(section)[0];
        let block = t.children_of(column)[0];
        assert_eq!(t.get(section).unwrap().kind(), &ElementKind::Section);
        assert_eq!(t.get(column).unwrap().width(), Some(100.0));
        assert_eq!(
            t.get(block).unwrap().kind(),
            &ElementKind::Block(BlockKind::Button)
        );
    }

    #[test]
    fn column_child_with_children_is_inner_section() {
        let t = Template::from_json(&json!({
            "children": [{ "name": "Section", "children": [{ "name": "Column", "children": [
                { "children": [{ "name": "Column" }] }
            ]}]}]
        }));
        let ids = t.descendants(t.root_id());
        assert_eq!(t.get(ids[3]).unwrap().kind(), &ElementKind::InnerSection);
    }

    #[test]
    fn missing_widths_share_the_row() {
        let t = Template::from_json(&json!({
            "children": [{ "name": "Section", "children": [
                { "name": "Column" }, { "name": "Column" }, { "name": "Column", "width": "40%" }
            ]}]
        }));
        let section = t.children_of(t.root_id())[0];
        let widths: Vec<f64> = t
            .children_of(section)
            .iter()
            .map(|c| t.get(*c).unwrap().width().unwrap())
            .collect();
        assert!((widths[0] - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(widths[2], 40.0);
    }

    #[test]
    fn flat_style_is_desktop() {
        let tree = ElementTree::from_json(&json!({
            "type": "Paragraph", "_style": { "color": "red", "fontSize": 12 }
        }));
        let record = tree.element().style_record();
        assert_eq!(record.desktop["color"], StyleValue::from("red"));
        assert_eq!(record.desktop["fontSize"], StyleValue::from(12));
        assert!(record.mobile.is_empty());
    }

    #[test]
    fn malformed_fields_fall_back() {
        let t = Template::from_json(&json!({
            "children": [
                "not an element",
                { "name": "Section", "_style": 5, "data": [1, 2], "children": {} }
            ]
        }));
        assert_eq!(t.children_of(t.root_id()).len(), 2);
        let data_block = ElementTree::from_json(&json!({ "type": "Button", "data": "x" }));
        assert_eq!(data_block.element().data()["text"], json!("Click here"));
    }

    #[test]
    fn duplicate_ids_are_reminted_on_import() {
        let t = Template::from_json(&json!({
            "children": [
                { "id": "dup", "name": "Section" },
                { "id": "dup", "name": "Section" }
            ]
        }));
        let sections = t.children_of(t.root_id());
        assert_eq!(sections.len(), 2);
        assert_ne!(sections[0], sections[1]);
        assert_eq!(sections[0].as_str(), "dup");
    }

    #[test]
    fn unknown_block_types_survive() {
        let t = Template::from_json(&json!({
            "children": [{ "children": [{ "children": [{ "id": "c1", "type": "Countdown", "data": { "until": "2030" } }] }] }]
        }));
        let out = t.to_json();
        let block = &out["children"][0]["children"][0]["children"][0];
        assert_eq!(block["type"], json!("Countdown"));
        assert_eq!(block["data"]["until"], json!("2030"));
    }

    #[test]
    fn clone_json_omits_ids() {
        let t = Template::from_json(&json!({
            "children": [{ "id": "s1", "name": "Section", "children": [{ "id": "c1", "name": "Column", "width": 50 }] }]
        }));
        let clone = t.to_clone_json(ElementId::intern("s1")).unwrap();
        assert!(clone.get("id").is_none());
        assert!(clone["children"][0].get("id").is_none());
        assert_eq!(clone["children"][0]["width"], json!(50));
    }

    #[test]
    fn text_that_is_not_json_is_an_error() {
        assert!(matches!(
            Template::from_json_str("{ nope"),
            Err(ImportError::Json(_))
        ));
    }

    #[test]
    fn msgpack_snapshot_preserves_document() {
        let t = Template::from_json(&json!({
            "id": "root",
            "children": [{ "id": "s", "name": "Section" }]
        }));
        let bytes = t.to_msgpack().unwrap();
        let back = Template::from_msgpack(&bytes).unwrap();
        assert_eq!(back.to_json(), t.to_json());
    }
}
