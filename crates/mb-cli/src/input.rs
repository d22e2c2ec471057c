//! Reading templates from disk.

use anyhow::{Context, Result};
use mb_editor::TemplateRecord;
use serde_json::Value;
use std::path::Path;

/// Read a template file as Document JSON.
///
/// Accepts either a bare document or a saved `TemplateRecord`, in which case
/// its `data` is used.
pub fn read_document(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let value: Value =
        serde_json::from_str(&text).with_context(|| format!("{} is not JSON", path.display()))?;
    Ok(unwrap_record(value))
}

fn unwrap_record(value: Value) -> Value {
    if value.get("data").is_some() && value.get("createdAt").is_some() {
        match serde_json::from_value::<TemplateRecord>(value.clone()) {
            Ok(record) => {
                log::info!("using data of saved template `{}`", record.name);
                return record.data;
            }
            Err(e) => log::debug!("not a template record: {e}"),
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::Template;
    use serde_json::json;

    #[test]
    fn records_are_unwrapped() {
        let record = TemplateRecord::new("tpl-1", "Promo", &Template::new());
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(unwrap_record(value), record.data);
    }

    #[test]
    fn documents_pass_through() {
        let doc = json!({ "id": "doc", "data": {}, "children": [] });
        assert_eq!(unwrap_record(doc.clone()), doc);
    }
}
