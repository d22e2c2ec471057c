//! WASM bridge for Mailblocks: exposes the editing session to the browser shell.
//!
//! Compiled via `wasm-pack build --target web`. The JS side owns the canvas,
//! panels and drag-and-drop; every mutation goes through [`MailEditor`], and
//! the shell re-renders from the events it receives in `on_change`.

use mb_core::{BlockKind, Device, ElementId, StyleValue};
use mb_editor::{EditorConfig, EditorStore, EditorTab, SubscriptionId, Theme};
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// The main WASM-facing editor controller.
#[wasm_bindgen]
pub struct MailEditor {
    store: EditorStore,
}

impl Default for MailEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl MailEditor {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        console_setup();
        Self {
            store: EditorStore::new(EditorConfig::default()),
        }
    }

    /// Create an editor from a JSON `EditorConfig`. Malformed config falls
    /// back to the defaults.
    pub fn with_config(config_json: &str) -> Self {
        console_setup();
        let config = serde_json::from_str(config_json).unwrap_or_else(|e| {
            log::warn!("invalid editor config, using defaults: {e}");
            EditorConfig::default()
        });
        Self {
            store: EditorStore::new(config),
        }
    }

    // ─── Document ────────────────────────────────────────────────────────

    /// Replace the document with Document JSON. Returns `false` if the text
    /// is not JSON at all.
    pub fn load_json(&mut self, json: &str) -> bool {
        match self.store.load_json_str(json) {
            Ok(()) => true,
            Err(e) => {
                log::error!("load_json: {e}");
                false
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.store.export_as_json()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_html(&self) -> String {
        self.store.export_as_html()
    }

    pub fn to_mjml(&self) -> String {
        self.store.export_as_mjml()
    }

    /// Lint diagnostics as a JSON array.
    pub fn lint_json(&self) -> String {
        serde_json::to_string(&self.store.lint()).unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Structure ───────────────────────────────────────────────────────

    /// Add a section with one column per entry of `widths`. A negative
    /// `index` appends. Returns the new section's ID, or empty string.
    pub fn add_section(&mut self, widths: Vec<f64>, index: i32) -> String {
        id_or_empty(self.store.add_section(&widths, position(index)))
    }

    /// Add a column to a section. A non-positive width rebalances the row.
    pub fn add_column(&mut self, section_id: &str, width: f64) -> String {
        let width = (width > 0.0).then_some(width);
        id_or_empty(
            self.store
                .add_column_to_section(ElementId::intern(section_id), width),
        )
    }

    pub fn add_block(&mut self, column_id: &str, kind: &str, index: i32) -> String {
        id_or_empty(self.store.add_block_to_column(
            ElementId::intern(column_id),
            BlockKind::parse(kind),
            position(index),
        ))
    }

    pub fn add_inner_section(&mut self, column_id: &str, widths: Vec<f64>, index: i32) -> String {
        id_or_empty(self.store.add_inner_section(
            ElementId::intern(column_id),
            &widths,
            position(index),
        ))
    }

    pub fn remove(&mut self, element_id: &str) -> bool {
        self.store.remove_element(ElementId::intern(element_id))
    }

    /// Drop a block onto a column (drag-and-drop).
    pub fn move_block(&mut self, block_id: &str, column_id: &str, index: i32) -> bool {
        self.store.move_block_to_column(
            ElementId::intern(block_id),
            ElementId::intern(column_id),
            position(index),
        )
    }

    /// Duplicate an element. Returns the copy's ID, or empty string.
    pub fn copy(&mut self, element_id: &str) -> String {
        id_or_empty(self.store.copy_element(ElementId::intern(element_id)))
    }

    /// `ids_json` is a JSON array of IDs. `parent_id` empty means the
    /// template's sections.
    pub fn reorder(&mut self, parent_id: &str, ids_json: &str) -> bool {
        let Ok(ids) = serde_json::from_str::<Vec<String>>(ids_json) else {
            return false;
        };
        let ids: Vec<ElementId> = ids.iter().map(|s| ElementId::intern(s)).collect();
        if parent_id.is_empty() {
            self.store.reorder_sections(&ids)
        } else {
            self.store.reorder_elements(ElementId::intern(parent_id), &ids)
        }
    }

    // ─── Content & style ─────────────────────────────────────────────────

    /// Set a style property for the active device. Empty `value` clears it;
    /// a bare number is stored as a number.
    pub fn update_style(&mut self, element_id: &str, field: &str, value: &str) -> bool {
        self.store
            .update_style(ElementId::intern(element_id), field, style_value(value))
    }

    pub fn update_style_for(&mut self, element_id: &str, device: &str, field: &str, value: &str) -> bool {
        let Some(device) = Device::parse(device) else {
            return false;
        };
        self.store
            .update_style_for(ElementId::intern(element_id), device, field, style_value(value))
    }

    /// `value_json` is any JSON value; text that is not JSON is stored as a string.
    pub fn update_data(&mut self, element_id: &str, key: &str, value_json: &str) -> bool {
        let value = serde_json::from_str(value_json)
            .unwrap_or_else(|_| Value::String(value_json.to_string()));
        self.store
            .update_data(ElementId::intern(element_id), key, value)
    }

    pub fn set_column_width(&mut self, column_id: &str, width: f64) -> bool {
        self.store
            .set_column_width(ElementId::intern(column_id), width)
    }

    // ─── Session ─────────────────────────────────────────────────────────

    /// Select an element. Empty string clears the selection.
    pub fn select(&mut self, element_id: &str) -> bool {
        if element_id.is_empty() {
            self.store.select(None);
            return true;
        }
        self.store.select(Some(ElementId::intern(element_id)))
    }

    pub fn get_selected_id(&self) -> String {
        id_or_empty(self.store.selected())
    }

    /// Computed style of the selection for the active device, as a JSON
    /// object. `{}` when nothing is selected.
    pub fn selected_style_json(&self) -> String {
        self.store
            .selected_style()
            .and_then(|style| serde_json::to_string(&style).ok())
            .unwrap_or_else(|| "{}".to_string())
    }

    pub fn set_device(&mut self, device: &str) -> bool {
        Device::parse(device).is_some_and(|d| self.store.set_active_device(d))
    }

    pub fn get_device(&self) -> String {
        self.store.active_device().as_str().to_string()
    }

    pub fn set_tab(&mut self, tab: &str) -> bool {
        EditorTab::parse(tab).is_some_and(|t| self.store.set_active_tab(t))
    }

    pub fn set_theme(&mut self, is_dark: bool) {
        let theme = if is_dark { Theme::Dark } else { Theme::Light };
        self.store.set_theme(theme);
    }

    // ─── Saved widgets ───────────────────────────────────────────────────

    pub fn save_widget(&mut self, name: &str, element_id: &str) -> bool {
        self.store
            .save_widget(name, ElementId::intern(element_id))
            .map_err(|e| log::warn!("save_widget: {e}"))
            .is_ok()
    }

    pub fn insert_widget(&mut self, name: &str, column_id: &str, index: i32) -> String {
        match self
            .store
            .insert_widget(name, ElementId::intern(column_id), position(index))
        {
            Ok(id) => id.to_string(),
            Err(e) => {
                log::warn!("insert_widget: {e}");
                String::new()
            }
        }
    }

    pub fn widget_names_json(&self) -> String {
        let names: Vec<&str> = self.store.library().names().collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }

    // ─── Events ──────────────────────────────────────────────────────────

    /// Register a JS callback. It receives each store event as a JSON string.
    /// Returns a handle for `off_change`.
    pub fn on_change(&mut self, callback: js_sys::Function) -> f64 {
        let id = self.store.subscribe(move |event| {
            let Ok(json) = serde_json::to_string(event) else {
                return;
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                log::error!("on_change callback threw: {e:?}");
            }
        });
        id.get() as f64
    }

    pub fn off_change(&mut self, handle: f64) -> bool {
        match subscription_from_handle(handle) {
            Some(id) => self.store.unsubscribe(id),
            None => false,
        }
    }
}

impl MailEditor {
    pub fn store(&self) -> &EditorStore {
        &self.store
    }
}

fn subscription_from_handle(handle: f64) -> Option<SubscriptionId> {
    (handle >= 1.0 && handle.fract() == 0.0).then(|| SubscriptionId::from_raw(handle as u64))
}

fn position(index: i32) -> Option<usize> {
    usize::try_from(index).ok()
}

fn id_or_empty(id: Option<ElementId>) -> String {
    id.map(|id| id.to_string()).unwrap_or_default()
}

fn style_value(value: &str) -> Option<StyleValue> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(match value.parse::<f64>() {
        Ok(n) if n.is_finite() => StyleValue::Number(n),
        _ => StyleValue::Text(value.to_string()),
    })
}

// ─── Console ─────────────────────────────────────────────────────────────

#[cfg(target_arch = "wasm32")]
struct ConsoleLogger;

#[cfg(target_arch = "wasm32")]
impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("[mailblocks] {}", record.args());
        match record.level() {
            log::Level::Error => web_sys::console::error_1(&msg.into()),
            log::Level::Warn => web_sys::console::warn_1(&msg.into()),
            _ => web_sys::console::log_1(&msg.into()),
        }
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
static LOGGER: ConsoleLogger = ConsoleLogger;

/// Route panics and `log` output to the browser console, once.
fn console_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SETUP: Once = Once::new();
        SETUP.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Mailblocks WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(log::LevelFilter::Info);
            }
        });
    }
}

// ─── Standalone functions (no editor needed) ─────────────────────────────

/// Export Document JSON straight to HTML with default settings.
#[wasm_bindgen]
pub fn json_to_html(json: &str) -> String {
    match mb_core::Template::from_json_str(json) {
        Ok(template) => mb_core::to_html(&template, &mb_core::ExportConfig::default()),
        Err(e) => {
            log::error!("json_to_html: {e}");
            String::new()
        }
    }
}

#[wasm_bindgen]
pub fn json_to_mjml(json: &str) -> String {
    match mb_core::Template::from_json_str(json) {
        Ok(template) => mb_core::to_mjml(&template, &mb_core::ExportConfig::default()),
        Err(e) => {
            log::error!("json_to_mjml: {e}");
            String::new()
        }
    }
}

/// Lint Document JSON. Returns a JSON array of diagnostics, or
/// `{"ok":false,"error":"..."}` if the text is not JSON.
#[wasm_bindgen]
pub fn lint(json: &str) -> String {
    match serde_json::from_str::<Value>(json) {
        Ok(value) => serde_json::to_string(&mb_core::lint_json(&value)).unwrap_or_else(|_| "[]".to_string()),
        Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
    }
}
