//! EditorStore: one editing session.
//!
//! Owns the current template, the selection, the active device, the panel
//! tab and the theme. Drag-and-drop, panels and the WASM bridge call the
//! action methods here; nothing outside the store mutates the template.
//! After every action the template's change journal is drained onto the
//! [`ChangeBus`].

use crate::bus::{ChangeBus, StoreEvent, SubscriptionId};
use crate::library::{LibraryError, WidgetLibrary};
use crate::persistence::{RepositoryError, TemplateRecord, TemplateRepository};
use mb_core::{
    BlockKind, Device, Element, ElementId, ElementKind, ElementTree, ExportConfig, ExportFormat,
    ImportError, LintDiagnostic, StyleMap, StyleValue, Template, export, lint_template,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─── Session enums ───────────────────────────────────────────────────────

/// The side-panel tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorTab {
    #[default]
    Content,
    Style,
    Settings,
    Layers,
}

impl EditorTab {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" => Some(EditorTab::Content),
            "style" => Some(EditorTab::Style),
            "settings" => Some(EditorTab::Settings),
            "layers" => Some(EditorTab::Layers),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }
}

// ─── Config ──────────────────────────────────────────────────────────────

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Device the session starts on. Default: **desktop**.
    pub initial_device: Device,
    /// Default: **light**.
    pub theme: Theme,
    /// Column widths of a section added without explicit widths. Default: **[100]**.
    pub default_section_widths: Vec<f64>,
    /// Used by `export_as_html` and `export_as_mjml`.
    pub export: ExportConfig,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            initial_device: Device::Desktop,
            theme: Theme::Light,
            default_section_widths: vec![100.0],
            export: ExportConfig::default(),
        }
    }
}

// ─── Actions ─────────────────────────────────────────────────────────────

/// Every mutation the store accepts, as data, for hosts that queue or
/// forward actions instead of calling methods.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorAction {
    AddSection {
        widths: Vec<f64>,
        index: Option<usize>,
    },
    AddColumn {
        section: ElementId,
        width: Option<f64>,
    },
    AddBlock {
        column: ElementId,
        kind: BlockKind,
        index: Option<usize>,
    },
    AddInnerSection {
        column: ElementId,
        widths: Vec<f64>,
        index: Option<usize>,
    },
    InsertWidget {
        name: String,
        column: ElementId,
        index: Option<usize>,
    },
    Remove {
        id: ElementId,
    },
    MoveBlock {
        block: ElementId,
        column: ElementId,
        index: Option<usize>,
    },
    Copy {
        id: ElementId,
    },
    ReorderSections {
        ids: Vec<ElementId>,
    },
    ReorderColumns {
        section: ElementId,
        ids: Vec<ElementId>,
    },
    ReorderElements {
        column: ElementId,
        ids: Vec<ElementId>,
    },
    /// Style edit in the active device's bucket. `None` clears the property.
    UpdateStyle {
        id: ElementId,
        field: String,
        value: Option<StyleValue>,
    },
    UpdateStyleFor {
        id: ElementId,
        device: Device,
        field: String,
        value: Option<StyleValue>,
    },
    UpdateData {
        id: ElementId,
        key: String,
        value: Value,
    },
    SetColumnWidth {
        id: ElementId,
        width: f64,
    },
    Select(Option<ElementId>),
    SetDevice(Device),
    SetTab(EditorTab),
    SetTheme(Theme),
    LoadJson(Value),
}

// ─── Store ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EditorStore {
    template: Template,
    selected: Option<ElementId>,
    active_device: Device,
    active_tab: EditorTab,
    theme: Theme,
    bus: ChangeBus,
    library: WidgetLibrary,
    config: EditorConfig,
}

impl Default for EditorStore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorStore {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_template(Template::new(), config)
    }

    pub fn with_template(mut template: Template, config: EditorConfig) -> Self {
        template.drain_changes();
        Self {
            template,
            selected: None,
            active_device: config.initial_device,
            active_tab: EditorTab::default(),
            theme: config.theme,
            bus: ChangeBus::new(),
            library: WidgetLibrary::new(),
            config,
        }
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    pub fn selected_element(&self) -> Option<&Element> {
        self.selected.and_then(|id| self.template.get(id))
    }

    /// Computed style of the selection for the active device.
    pub fn selected_style(&self) -> Option<StyleMap> {
        self.selected
            .and_then(|id| self.template.style(id, self.active_device))
    }

    pub fn active_device(&self) -> Device {
        self.active_device
    }

    pub fn active_tab(&self) -> EditorTab {
        self.active_tab
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn library(&self) -> &WidgetLibrary {
        &self.library
    }

    pub fn library_mut(&mut self) -> &mut WidgetLibrary {
        &mut self.library
    }

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn lint(&self) -> Vec<LintDiagnostic> {
        lint_template(&self.template)
    }

    // ─── Dispatch ────────────────────────────────────────────────────────

    /// Apply an action. Returns whether anything changed.
    pub fn apply(&mut self, action: EditorAction) -> bool {
        log::debug!("apply {action:?}");
        match action {
            EditorAction::AddSection { widths, index } => self.add_section(&widths, index).is_some(),
            EditorAction::AddColumn { section, width } => {
                self.add_column_to_section(section, width).is_some()
            }
            EditorAction::AddBlock {
                column,
                kind,
                index,
            } => self.add_block_to_column(column, kind, index).is_some(),
            EditorAction::AddInnerSection {
                column,
                widths,
                index,
            } => self.add_inner_section(column, &widths, index).is_some(),
            EditorAction::InsertWidget {
                name,
                column,
                index,
            } => self.insert_widget(&name, column, index).is_ok(),
            EditorAction::Remove { id } => self.remove_element(id),
            EditorAction::MoveBlock {
                block,
                column,
                index,
            } => self.move_block_to_column(block, column, index),
            EditorAction::Copy { id } => self.copy_element(id).is_some(),
            EditorAction::ReorderSections { ids } => self.reorder_sections(&ids),
            EditorAction::ReorderColumns { section, ids } => self.reorder_columns(section, &ids),
            EditorAction::ReorderElements { column, ids } => self.reorder_elements(column, &ids),
            EditorAction::UpdateStyle { id, field, value } => self.update_style(id, &field, value),
            EditorAction::UpdateStyleFor {
                id,
                device,
                field,
                value,
            } => self.update_style_for(id, device, &field, value),
            EditorAction::UpdateData { id, key, value } => self.update_data(id, &key, value),
            EditorAction::SetColumnWidth { id, width } => self.set_column_width(id, width),
            EditorAction::Select(id) => self.select(id),
            EditorAction::SetDevice(device) => self.set_active_device(device),
            EditorAction::SetTab(tab) => self.set_active_tab(tab),
            EditorAction::SetTheme(theme) => self.set_theme(theme),
            EditorAction::LoadJson(value) => {
                self.load_json(&value);
                true
            }
        }
    }

    /// Publish everything the template journaled since the last flush.
    fn flush(&mut self) {
        for change in self.template.drain_changes() {
            self.bus.publish(&StoreEvent::Model(change));
        }
    }

    fn kind_of(&self, id: ElementId) -> Option<&ElementKind> {
        self.template.get(id).map(Element::kind)
    }

    fn insert(&mut self, parent: ElementId, tree: ElementTree, index: Option<usize>) -> Option<ElementId> {
        let id = self.template.add_child(parent, tree, index);
        self.flush();
        id
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Append (or insert at `index`) a Section with one Column per width.
    pub fn add_section(&mut self, widths: &[f64], index: Option<usize>) -> Option<ElementId> {
        let widths = if widths.is_empty() {
            self.config.default_section_widths.clone()
        } else {
            widths.to_vec()
        };
        let root = self.template.root_id();
        self.insert(root, ElementTree::section_with_columns(&widths), index)
    }

    /// Add a Column to a Section or InnerSection. Without a width the row is
    /// rebalanced so every column gets an equal share.
    pub fn add_column_to_section(&mut self, section: ElementId, width: Option<f64>) -> Option<ElementId> {
        if !matches!(
            self.kind_of(section)?,
            ElementKind::Section | ElementKind::InnerSection
        ) {
            return None;
        }
        let existing = self.template.children_of(section);
        let width = match width {
            Some(w) => w,
            None => {
                let share = 100.0 / (existing.len() + 1) as f64;
                for column in &existing {
                    self.template.set_column_width(*column, share);
                }
                share
            }
        };
        self.insert(section, ElementTree::column(width), None)
    }

    pub fn add_block_to_column(&mut self, column: ElementId, kind: BlockKind, index: Option<usize>) -> Option<ElementId> {
        if !matches!(self.kind_of(column)?, ElementKind::Column { .. }) {
            return None;
        }
        self.insert(column, ElementTree::block(kind), index)
    }

    /// Nested row inside a Column.
    pub fn add_inner_section(&mut self, column: ElementId, widths: &[f64], index: Option<usize>) -> Option<ElementId> {
        if !matches!(self.kind_of(column)?, ElementKind::Column { .. }) {
            return None;
        }
        let widths = if widths.is_empty() { &[50.0, 50.0][..] } else { widths };
        let tree = widths
            .iter()
            .fold(ElementTree::inner_section(), |inner, w| {
                inner.with_child(ElementTree::column(*w))
            });
        self.insert(column, tree, index)
    }

    /// Detach an element and its subtree. Clears the selection if it was
    /// inside the removed subtree. The root cannot be removed.
    pub fn remove_element(&mut self, id: ElementId) -> bool {
        let removed = self.template.descendants(id);
        if self.template.remove(id).is_none() {
            return false;
        }
        self.flush();
        if self.selected.is_some_and(|sel| removed.contains(&sel)) {
            self.selected = None;
            self.bus.publish(&StoreEvent::SelectionChanged(None));
        }
        true
    }

    /// Structural move of a Block (or InnerSection) into a Column. The node
    /// keeps its identity; nothing is copied.
    pub fn move_block_to_column(&mut self, block: ElementId, column: ElementId, index: Option<usize>) -> bool {
        let (Some(kind), Some(target)) = (self.kind_of(block), self.kind_of(column)) else {
            return false;
        };
        if !target.accepts(kind) {
            return false;
        }
        let moved = self.template.move_element(block, column, index);
        self.flush();
        moved
    }

    /// Duplicate an element right after the original and select the copy.
    pub fn copy_element(&mut self, id: ElementId) -> Option<ElementId> {
        let parent = self.template.parent_of(id)?;
        let position = self.template.position_of(id)?;
        let clone = self.template.clone_element(id)?;
        let copy = self.insert(parent, clone, Some(position + 1))?;
        self.select(Some(copy));
        Some(copy)
    }

    pub fn reorder_sections(&mut self, ids: &[ElementId]) -> bool {
        let root = self.template.root_id();
        self.reorder(root, ids)
    }

    pub fn reorder_columns(&mut self, section: ElementId, ids: &[ElementId]) -> bool {
        self.reorder(section, ids)
    }

    pub fn reorder_elements(&mut self, column: ElementId, ids: &[ElementId]) -> bool {
        self.reorder(column, ids)
    }

    fn reorder(&mut self, parent: ElementId, ids: &[ElementId]) -> bool {
        let done = self.template.reorder_children(parent, ids);
        self.flush();
        done
    }

    // ─── Content & style ─────────────────────────────────────────────────

    /// Edit a style property in the active device's bucket.
    pub fn update_style(&mut self, id: ElementId, field: &str, value: Option<StyleValue>) -> bool {
        self.update_style_for(id, self.active_device, field, value)
    }

    pub fn update_style_for(&mut self, id: ElementId, device: Device, field: &str, value: Option<StyleValue>) -> bool {
        let done = self.template.update(id, device, field, value);
        self.flush();
        done
    }

    pub fn update_data(&mut self, id: ElementId, key: &str, value: Value) -> bool {
        let done = self.template.update_data(id, key, value);
        self.flush();
        done
    }

    pub fn set_column_width(&mut self, id: ElementId, width: f64) -> bool {
        let done = self.template.set_column_width(id, width);
        self.flush();
        done
    }

    // ─── Session state ───────────────────────────────────────────────────

    /// Select an element, or clear with `None`. Unknown ids are refused.
    pub fn select(&mut self, id: Option<ElementId>) -> bool {
        if id.is_some_and(|id| !self.template.contains(id)) || id == self.selected {
            return false;
        }
        self.selected = id;
        self.bus.publish(&StoreEvent::SelectionChanged(id));
        true
    }

    pub fn set_active_device(&mut self, device: Device) -> bool {
        if device == self.active_device {
            return false;
        }
        self.active_device = device;
        self.bus.publish(&StoreEvent::DeviceChanged(device));
        true
    }

    pub fn set_active_tab(&mut self, tab: EditorTab) -> bool {
        if tab == self.active_tab {
            return false;
        }
        self.active_tab = tab;
        self.bus.publish(&StoreEvent::TabChanged(tab));
        true
    }

    pub fn set_theme(&mut self, theme: Theme) -> bool {
        if theme == self.theme {
            return false;
        }
        self.theme = theme;
        self.bus.publish(&StoreEvent::ThemeChanged(theme));
        true
    }

    // ─── Load & export ───────────────────────────────────────────────────

    /// Replace the document. Selection is cleared.
    pub fn load_json(&mut self, value: &Value) {
        self.replace_template(Template::from_json(value));
    }

    pub fn load_json_str(&mut self, text: &str) -> Result<(), ImportError> {
        self.replace_template(Template::from_json_str(text)?);
        Ok(())
    }

    fn replace_template(&mut self, mut template: Template) {
        template.drain_changes();
        self.template = template;
        self.bus.publish(&StoreEvent::TemplateReplaced);
        if self.selected.take().is_some() {
            self.bus.publish(&StoreEvent::SelectionChanged(None));
        }
    }

    pub fn export(&self, format: ExportFormat) -> String {
        export(&self.template, format, &self.config.export)
    }

    pub fn export_as_html(&self) -> String {
        self.export(ExportFormat::Html)
    }

    pub fn export_as_mjml(&self) -> String {
        self.export(ExportFormat::Mjml)
    }

    pub fn export_as_json(&self) -> Value {
        self.template.to_json()
    }

    // ─── Saved widgets ───────────────────────────────────────────────────

    pub fn save_widget(&mut self, name: &str, id: ElementId) -> Result<(), LibraryError> {
        self.library.save(name, &self.template, id).map(|_| ())
    }

    /// Instantiate a saved widget into a Column.
    pub fn insert_widget(&mut self, name: &str, column: ElementId, index: Option<usize>) -> Result<ElementId, LibraryError> {
        let tree = self.library.instantiate(name)?;
        if !matches!(self.kind_of(column), Some(ElementKind::Column { .. })) {
            return Err(LibraryError::MissingElement(column));
        }
        self.insert(column, tree, index)
            .ok_or(LibraryError::MissingElement(column))
    }

    // ─── Persistence ─────────────────────────────────────────────────────

    /// Store the current document as a new record.
    pub fn save_as<R: TemplateRepository>(&self, repo: &mut R, name: &str) -> Result<TemplateRecord, RepositoryError> {
        repo.create(name, self.template.to_json())
    }

    /// Overwrite an existing record with the current document.
    pub fn save_to<R: TemplateRepository>(&self, repo: &mut R, id: &str) -> Result<TemplateRecord, RepositoryError> {
        repo.update(id, None, self.template.to_json())
    }

    pub fn open<R: TemplateRepository>(&mut self, repo: &R, id: &str) -> Result<(), RepositoryError> {
        let record = repo.get(id)?;
        self.replace_template(record.template());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with_block() -> (EditorStore, ElementId, ElementId) {
        let mut store = EditorStore::default();
        let section = store.add_section(&[50.0, 50.0], None).unwrap();
        let column = store.template().children_of(section)[0];
        let block = store
            .add_block_to_column(column, BlockKind::Paragraph, None)
            .unwrap();
        (store, column, block)
    }

    #[test]
    fn empty_widths_use_config_default() {
        let mut store = EditorStore::default();
        let section = store.add_section(&[], None).unwrap();
        let cols = store.template().children_of(section);
        assert_eq!(cols.len(), 1);
        assert_eq!(store.template().get(cols[0]).unwrap().width(), Some(100.0));
    }

    #[test]
    fn blocks_only_go_into_columns() {
        let (mut store, column, block) = store_with_block();
        let section = store.template().parent_of(column).unwrap();
        assert!(store.add_block_to_column(section, BlockKind::Image, None).is_none());
        assert!(store.add_block_to_column(block, BlockKind::Image, None).is_none());
    }

    #[test]
    fn add_column_rebalances_without_width() {
        let (mut store, column, _) = store_with_block();
        let section = store.template().parent_of(column).unwrap();
        store.add_column_to_section(section, None).unwrap();
        let widths: Vec<f64> = store
            .template()
            .children_of(section)
            .iter()
            .map(|c| store.template().get(*c).unwrap().width().unwrap())
            .collect();
        assert_eq!(widths.len(), 3);
        assert!(widths.iter().all(|w| (w - 100.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn style_edits_follow_active_device() {
        let (mut store, _, block) = store_with_block();
        store.update_style(block, "color", Some("red".into()));
        store.set_active_device(Device::Mobile);
        store.update_style(block, "color", Some("blue".into()));
        let record = store.template().get(block).unwrap().style_record();
        assert_eq!(record.desktop["color"], StyleValue::from("red"));
        assert_eq!(record.mobile["color"], StyleValue::from("blue"));
        assert!(record.tablet.is_empty());

        store.select(Some(block));
        assert_eq!(store.selected_style().unwrap()["color"], StyleValue::from("blue"));
        store.update_style(block, "color", None);
        assert_eq!(store.selected_style().unwrap()["color"], StyleValue::from("red"));
    }

    #[test]
    fn inner_sections_accept_blocks_in_their_columns() {
        let (mut store, column, _) = store_with_block();
        let inner = store.add_inner_section(column, &[], None).unwrap();
        let inner_cols = store.template().children_of(inner);
        assert_eq!(inner_cols.len(), 2);
        assert!(store
            .add_block_to_column(inner_cols[1], BlockKind::Button, None)
            .is_some());
    }

    #[test]
    fn apply_dispatches_actions() {
        let mut store = EditorStore::default();
        assert!(store.apply(EditorAction::AddSection {
            widths: vec![100.0],
            index: None
        }));
        assert!(store.apply(EditorAction::SetTab(EditorTab::Layers)));
        assert!(!store.apply(EditorAction::SetTab(EditorTab::Layers)));
        assert!(store.apply(EditorAction::SetTheme(Theme::Dark)));
        assert_eq!(store.theme(), Theme::Dark);
        let root = store.template().root_id();
        assert!(!store.apply(EditorAction::Remove { id: root }));
    }

    #[test]
    fn model_changes_reach_subscribers() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let (mut store, _, block) = store_with_block();
        let sink = Rc::clone(&events);
        store.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        store.update_data(block, "content", "Hello".into());
        store.select(Some(block));
        assert_eq!(
            *events.borrow(),
            vec![
                StoreEvent::Model(mb_core::Change::DataUpdated {
                    id: block,
                    key: "content".into()
                }),
                StoreEvent::SelectionChanged(Some(block)),
            ]
        );
    }

    #[test]
    fn load_json_clears_selection() {
        let (mut store, _, block) = store_with_block();
        store.select(Some(block));
        store.load_json(&serde_json::json!({ "children": [] }));
        assert_eq!(store.selected(), None);
        assert_eq!(store.template().element_count(), 1);
        assert!(store.load_json_str("{").is_err());
    }

    #[test]
    fn widgets_insert_as_fresh_copies() {
        let (mut store, column, block) = store_with_block();
        store.save_widget("para", block).unwrap();
        let copy = store.insert_widget("para", column, None).unwrap();
        assert_ne!(copy, block);
        assert_eq!(store.template().children_of(column), vec![block, copy]);
        assert!(store.insert_widget("para", block, None).is_err());
        assert!(store.apply(EditorAction::InsertWidget {
            name: "para".into(),
            column,
            index: Some(0)
        }));
    }
}
