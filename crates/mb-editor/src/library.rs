//! Saved widgets: reusable element subtrees.
//!
//! A widget is stored as clone-JSON (no ids), so every instantiation mints
//! fresh identity. The whole library can be exported as a compact MessagePack
//! blob and imported again.

use chrono::{DateTime, Utc};
use mb_core::{ElementId, ElementTree, Template};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("no saved widget named `{0}`")]
    NotFound(String),
    #[error("element `{0}` does not exist in the template")]
    MissingElement(ElementId),
    #[error("could not encode widget library: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("could not decode widget library: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedWidget {
    pub name: String,
    /// Element kind of the saved root (`Section`, `Block`, ...).
    pub kind: String,
    pub snapshot: Value,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WidgetLibrary {
    widgets: BTreeMap<String, SavedWidget>,
}

impl WidgetLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save the subtree at `id` under `name`, replacing any widget of that name.
    pub fn save(&mut self, name: &str, template: &Template, id: ElementId) -> Result<&SavedWidget, LibraryError> {
        let element = template.get(id).ok_or(LibraryError::MissingElement(id))?;
        let kind = element.kind().name().to_string();
        let snapshot = template
            .to_clone_json(id)
            .ok_or(LibraryError::MissingElement(id))?;
        log::debug!("saved widget `{name}` from {id}");
        let widget = SavedWidget {
            name: name.to_string(),
            kind,
            snapshot,
            saved_at: Utc::now(),
        };
        self.widgets.insert(name.to_string(), widget);
        self.widgets
            .get(name)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&SavedWidget> {
        self.widgets.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.widgets.keys().map(String::as_str)
    }

    pub fn remove(&mut self, name: &str) -> Option<SavedWidget> {
        self.widgets.remove(name)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// A detached copy of the widget, ready for [`Template::add_child`].
    pub fn instantiate(&self, name: &str) -> Result<ElementTree, LibraryError> {
        let widget = self
            .widgets
            .get(name)
            .ok_or_else(|| LibraryError::NotFound(name.to_string()))?;
        Ok(ElementTree::from_json(&widget.snapshot))
    }

    pub fn to_msgpack(&self) -> Result<Vec<u8>, LibraryError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, LibraryError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }

    /// Add every widget from `other`; same-named widgets are replaced.
    pub fn merge(&mut self, other: WidgetLibrary) {
        self.widgets.extend(other.widgets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::BlockKind;

    fn template_with_button() -> (Template, ElementId) {
        let mut t = Template::new();
        let root = t.root_id();
        let section = t
            .add_child(root, ElementTree::section_with_columns(&[100.0]), None)
            .unwrap();
        let column = t.children_of(section)[0];
        let button = t
            .add_child(
                column,
                ElementTree::block(BlockKind::Button).with_data("text", "Buy"),
                None,
            )
            .unwrap();
        (t, button)
    }

    #[test]
    fn instantiate_mints_fresh_ids() {
        let (t, button) = template_with_button();
        let mut library = WidgetLibrary::new();
        library.save("cta", &t, button).unwrap();

        let a = library.instantiate("cta").unwrap();
        let b = library.instantiate("cta").unwrap();
        assert_ne!(a.id(), button);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.element().data()["text"], serde_json::json!("Buy"));
        assert_eq!(library.get("cta").unwrap().kind, "Block");
    }

    #[test]
    fn missing_names_and_elements_are_errors() {
        let (t, _) = template_with_button();
        let mut library = WidgetLibrary::new();
        assert!(matches!(library.instantiate("nope"), Err(LibraryError::NotFound(_))));
        assert!(matches!(
            library.save("x", &t, ElementId::intern("ghost")),
            Err(LibraryError::MissingElement(_))
        ));
    }

    #[test]
    fn msgpack_export_and_import() {
        let (t, button) = template_with_button();
        let mut library = WidgetLibrary::new();
        library.save("cta", &t, button).unwrap();
        let bytes = library.to_msgpack().unwrap();
        let restored = WidgetLibrary::from_msgpack(&bytes).unwrap();
        assert_eq!(restored, library);

        let mut other = WidgetLibrary::new();
        other.merge(restored);
        assert_eq!(other.names().collect::<Vec<_>>(), vec!["cta"]);
    }
}
