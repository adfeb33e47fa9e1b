//! Core behaviour of the canvas DOM: attributes, properties, tree edits,
//! selector queries and attribute observation.

use canvas_dom::{Document, MutationKind, Node, TEXT_CONTENT};
use serde_json::json;

/// Build a `ui-button.btn` host holding `span.inner > button[type=button]`,
/// attached to the document root.
fn button_fixture(doc: &Document) -> (Node, Node) {
    let host = doc.create_element("UI-Button");
    host.set_attribute("class", "btn");
    let wrapper = doc.create_element("span");
    wrapper.set_attribute("class", "inner");
    let button = doc.create_element("button");
    button.set_attribute("type", "button");
    wrapper.append_child(&button).unwrap();
    host.append_child(&wrapper).unwrap();
    doc.root().append_child(&host).unwrap();
    (host, button)
}

#[test]
fn attributes_are_case_insensitive_and_ordered() {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc = Document::new();
    let el = doc.create_element("div");
    el.set_attribute("Variant", "primary");
    el.set_attribute("size", "big");
    el.set_attribute("variant", "secondary");

    assert_eq!(el.attribute("VARIANT").as_deref(), Some("secondary"));
    assert_eq!(
        el.attributes(),
        vec![
            ("variant".to_owned(), "secondary".to_owned()),
            ("size".to_owned(), "big".to_owned()),
        ]
    );
    assert!(el.remove_attribute("size"));
    assert!(!el.remove_attribute("size"));
    assert!(!el.has_attribute("size"));
}

#[test]
fn query_selector_finds_light_dom_descendants() {
    let doc = Document::new();
    let (host, button) = button_fixture(&doc);

    assert_eq!(host.tag_name().as_deref(), Some("ui-button"));
    assert_eq!(host.query_selector("button"), Some(button.clone()));
    assert_eq!(host.query_selector(".inner > button[type=button]"), Some(button.clone()));
    assert_eq!(host.query_selector("ui-button button"), Some(button.clone()));
    assert_eq!(doc.query_selector("span button, input"), Some(button));
    assert!(host.query_selector("input").is_none());
    assert!(host.query_selector("button:hover").is_none());
    // The scope itself is never a candidate.
    assert!(host.query_selector("ui-button").is_none());
}

#[test]
fn removal_disconnects_the_whole_subtree() {
    let doc = Document::new();
    let (host, button) = button_fixture(&doc);
    assert!(host.is_connected());
    assert!(button.is_connected());

    host.remove();
    assert!(!host.is_connected());
    assert!(!button.is_connected());
    // Handles stay usable after detaching.
    assert_eq!(host.query_selector("button"), Some(button));
}

#[test]
fn text_content_property_replaces_children() {
    let doc = Document::new();
    let (_, button) = button_fixture(&doc);
    button.set_property(TEXT_CONTENT, json!("Save"));
    assert_eq!(button.text_content(), "Save");
    assert_eq!(button.children().len(), 1);

    button.set_property(TEXT_CONTENT, json!(null));
    assert_eq!(button.text_content(), "");
    assert!(button.children().is_empty());

    button.set_property("disabled", json!(true));
    assert_eq!(button.property("disabled"), Some(json!(true)));
}

#[test]
fn replaced_text_is_freed() {
    let doc = Document::new();
    let (_, button) = button_fixture(&doc);
    button.set_text_content("0");
    let baseline = doc.node_count();
    let first = button.children().remove(0).key();

    for count in 1..50 {
        button.set_text_content(&count.to_string());
    }
    assert_eq!(doc.node_count(), baseline);
    assert_eq!(button.text_content(), "49");
    assert!(doc.node(first).is_none());

    // Element children are detached, not freed.
    let icon = doc.create_element("i");
    button.append_child(&icon).unwrap();
    button.set_text_content("Go");
    assert!(!icon.is_connected());
    assert_eq!(doc.node(icon.key()), Some(icon.clone()));
    button.append_child(&icon).unwrap();
    assert_eq!(button.children().len(), 2);
}

#[test]
fn append_rejects_cycles_and_foreign_nodes() {
    let doc = Document::new();
    let other = Document::new();
    let (host, button) = button_fixture(&doc);

    assert!(button.append_child(&host).is_err());
    assert!(host.append_child(&other.create_element("div")).is_err());
    let text = doc.create_text("hi");
    assert!(text.append_child(&doc.create_element("b")).is_err());
    assert_ne!(doc.id(), other.id());
}

#[test]
fn serializes_markup_in_attribute_order() {
    let doc = Document::new();
    let (host, button) = button_fixture(&doc);
    host.set_attribute("title", "a \"quoted\" <title>");
    button.set_text_content("Go & see");
    assert_eq!(
        doc.to_html(),
        "<ui-button class=\"btn\" title=\"a &quot;quoted&quot; &lt;title&gt;\">\
         <span class=\"inner\"><button type=\"button\">Go &amp; see</button></span></ui-button>"
    );
}

#[tokio::test]
async fn observer_receives_only_its_targets_attribute_records() {
    let doc = Document::new();
    let (host, button) = button_fixture(&doc);
    let mut observer = doc.observe_attributes(&host).with_attribute_filter(["Label"]);

    button.set_attribute("label", "ignored: other target");
    host.set_attribute("size", "ignored: filtered out");
    host.set_attribute("label", "first");
    host.set_attribute("label", "first");

    let record = observer.next().await.unwrap();
    assert_eq!(record.target, host.key());
    assert_eq!(
        record.kind,
        MutationKind::Attribute {
            name: "label".into(),
            old_value: None,
        }
    );
    // Same-value writes are still reported, like the platform DOM.
    let echo = observer.try_next().unwrap();
    assert_eq!(echo.attribute_name(), Some("label"));
    assert!(observer.try_next().is_none());
}
