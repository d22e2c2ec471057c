//! Integration tests: Document JSON → HTML export.

use mb_core::*;
use pretty_assertions::assert_eq;
use serde_json::json;

const NEWSLETTER: &str = include_str!("fixtures/newsletter.json");

fn newsletter() -> Template {
    Template::from_json_str(NEWSLETTER).expect("fixture is valid JSON")
}

// ─── Scenario ────────────────────────────────────────────────────────────

#[test]
fn paragraph_renders_inside_its_column() {
    let template = Template::from_json(&json!({
        "children": [{ "name": "Section", "children": [{ "name": "Column", "width": 50, "children": [
            { "name": "Block", "type": "Paragraph", "data": { "content": "Hi" } }
        ]}]}]
    }));
    let section = template.children_of(template.root_id())[0];
    let column = template.children_of(section)[0];
    let block = template.children_of(column)[0];

    let html = to_html(&template, &ExportConfig::default());
    let p_open = format!("<p class=\"{block}\" style=\"");
    let p_at = html.find(&p_open).expect("paragraph tag");
    assert!(html[p_at..].contains("\">Hi</p>"));

    let col_open = format!("<div class=\"mb-column {column}\" style=\"width:50%");
    let col_at = html.find(&col_open).expect("column div");
    assert!(col_at < p_at);
    let col_close = html[p_at..].find("</div>").map(|i| i + p_at);
    assert!(col_close.is_some());
}

// ─── Structure ───────────────────────────────────────────────────────────

#[test]
fn one_leaf_tag_per_block() {
    const KINDS: [BlockKind; 4] = [
        BlockKind::Paragraph,
        BlockKind::Button,
        BlockKind::Divider,
        BlockKind::Spacer,
    ];
    let (n, m, k) = (3, 2, 4);
    let mut template = Template::new();
    let root = template.root_id();
    let mut blocks = Vec::new();
    for _ in 0..n {
        let section = template
            .add_child(root, ElementTree::section_with_columns(&vec![100.0 / m as f64; m]), None)
            .unwrap();
        for column in template.children_of(section) {
            for kind in KINDS.iter().take(k) {
                blocks.push(
                    template
                        .add_child(column, ElementTree::block(kind.clone()), None)
                        .unwrap(),
                );
            }
        }
    }
    assert_eq!(blocks.len(), n * m * k);

    let html = to_html(&template, &ExportConfig::default());
    for block in &blocks {
        let tag = format!("class=\"{block}\"");
        assert_eq!(html.matches(&tag).count(), 1, "block {block} rendered once");
    }
    assert_eq!(html.matches("class=\"block-").count(), n * m * k);
}

// ─── Fixture ─────────────────────────────────────────────────────────────

#[test]
fn newsletter_responsive_rules() {
    let html = to_html(&newsletter(), &ExportConfig::default());
    let tablet = html.find("@media (max-width:768px){").expect("tablet query");
    let mobile = html.find("@media (max-width:480px){").expect("mobile query");
    assert!(tablet < mobile);

    let hero_tablet = html.find(".hero{padding:12px !important}").expect("tablet rule");
    let hero_mobile = html.find(".hero{padding:4px !important}").expect("mobile rule");
    assert!(tablet < hero_tablet && hero_tablet < mobile);
    assert!(mobile < hero_mobile);
    assert!(html.contains(".hero-title{font-size:24px !important}"));
    assert!(html.contains(".mb-column{width:100% !important}"));
}

#[test]
fn newsletter_button_and_derived_styles() {
    let html = to_html(&newsletter(), &ExportConfig::default());
    assert!(html.contains(
        "<div class=\"hero-cta-container\" style=\"padding:12px 0;text-align:center\">"
    ));
    assert!(html.contains(
        "<a class=\"hero-cta\" style=\"background-color:#e4572e;border-radius:4px;color:#ffffff;\
         display:inline-block;font-size:14px;font-weight:bold;padding:10px 20px;text-align:center;\
         text-decoration:none\" href=\"https://example.com/shop\" target=\"_blank\">Shop now</a>"
    ));
    assert!(html.contains("box-shadow:0px 0px 4px 0px #cccccc"));
    assert!(html.contains("<h1 class=\"hero-title\""));
    assert!(html.contains(">Spring <em>sale</em></h1>"));
}

#[test]
fn newsletter_title_comes_from_config() {
    let config = ExportConfig {
        title: "Spring update".into(),
        ..Default::default()
    };
    let html = to_html(&newsletter(), &config);
    assert!(html.contains("<title>Spring update</title>"));
}
