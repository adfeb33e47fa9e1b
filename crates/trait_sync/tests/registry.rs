mod common;

use serde_json::json;
use trait_sync::factories::{
    AttributeTrait, AttributeTraitConfig, BooleanTrait, BooleanTraitConfig,
};
use trait_sync::{
    AttributeMap, ComponentRegistration, ComponentRegistry, TraitDefinition, TraitOption, TraitType,
};

fn button(label_default: &str) -> ComponentRegistration {
    ComponentRegistration::new("UI-Button")
        .with_trait(
            TraitDefinition::new("variant", TraitType::Select)
                .default_value("default")
                .options([
                    TraitOption::new("default", "Default"),
                    TraitOption::new("primary", "Primary"),
                ]),
            AttributeTrait::new(
                "variant",
                AttributeTraitConfig::default().remove_defaults(["default"]),
            ),
        )
        .with_trait(
            TraitDefinition::new("disabled", TraitType::Checkbox).default_value(false),
            BooleanTrait::new("disabled", BooleanTraitConfig::default()),
        )
        .with_trait(
            TraitDefinition::new("label", TraitType::Text)
                .default_value(label_default)
                .visible_when(|attributes| attributes.get("variant") != Some(&json!("icon"))),
            AttributeTrait::new("label", AttributeTraitConfig::default()),
        )
}

#[test]
fn projections_follow_declaration_order() {
    common::init_logging();
    let registry = ComponentRegistry::new();
    registry.register(button("Click")).unwrap();

    let names: Vec<String> = registry
        .trait_definitions("ui-button")
        .into_iter()
        .map(|definition| definition.name)
        .collect();
    assert_eq!(names, ["variant", "disabled", "label"]);

    let handlers = registry.trait_handlers("UI-BUTTON").unwrap();
    assert_eq!(handlers.keys().collect::<Vec<_>>(), ["variant", "disabled", "label"]);

    let defaults = registry.trait_defaults("ui-button");
    assert_eq!(defaults.get("disabled"), Some(&json!(false)));
    assert_eq!(defaults.get("label"), Some(&json!("Click")));

    assert!(registry.trait_definitions("ui-missing").is_empty());
    assert!(registry.trait_handlers("ui-missing").is_none());
    assert!(registry.trait_defaults("ui-missing").is_empty());
}

#[test]
fn definitions_are_serializable_data() {
    let registry = ComponentRegistry::new();
    registry.register(button("Click")).unwrap();
    let definitions = registry.trait_definitions("ui-button");

    assert!(definitions.iter().all(|definition| definition.visible_when.is_none()));
    let encoded = serde_json::to_value(&definitions).unwrap();
    assert_eq!(encoded[2]["type"], "text");
    assert_eq!(encoded[0]["options"][1]["id"], "primary");
}

#[test]
fn second_registration_wins() {
    let registry = ComponentRegistry::new();
    registry.register(button("Click")).unwrap();
    registry.register(button("Go")).unwrap();

    assert_eq!(registry.tags(), ["ui-button"]);
    assert_eq!(registry.trait_defaults("ui-button").get("label"), Some(&json!("Go")));
}

#[test]
fn duplicate_trait_names_are_rejected() {
    let registry = ComponentRegistry::new();
    registry.register(button("Click")).unwrap();
    let broken = button("Broken").with_trait(
        TraitDefinition::new("label", TraitType::Textarea),
        AttributeTrait::new("label", AttributeTraitConfig::default()),
    );

    let err = registry.register(broken).unwrap_err();
    assert!(err.to_string().contains("label"), "{err}");
    assert_eq!(registry.trait_defaults("ui-button").get("label"), Some(&json!("Click")));
}

#[test]
fn register_many_and_queries() {
    let registry = ComponentRegistry::new();
    registry
        .register_many([
            button("Click"),
            ComponentRegistration::new("ui-card").droppable(true),
        ])
        .unwrap();

    assert_eq!(registry.tags(), ["ui-button", "ui-card"]);
    assert!(registry.contains("ui-card"));
    assert!(registry.is_droppable("ui-card"));
    assert!(!registry.is_droppable("ui-button"));
    assert!(!registry.is_droppable("ui-missing"));
}

#[test]
fn seeding_fills_only_missing_traits() {
    let registry = ComponentRegistry::new();
    registry.register(button("Click")).unwrap();
    let mut attributes = AttributeMap::new();
    attributes.insert("label".to_owned(), json!("Buy"));

    let added = registry.seed_attributes("ui-button", &mut attributes);

    assert_eq!(added, 2);
    assert_eq!(attributes.get("label"), Some(&json!("Buy")));
    assert_eq!(attributes.get("variant"), Some(&json!("default")));
    assert_eq!(attributes.get("disabled"), Some(&json!(false)));
}

#[test]
fn visibility_is_evaluated_against_attributes() {
    let registry = ComponentRegistry::new();
    registry.register(button("Click")).unwrap();
    let mut attributes = AttributeMap::new();
    attributes.insert("variant".to_owned(), json!("icon"));

    let visible: Vec<String> = registry
        .visible_traits("ui-button", &attributes)
        .into_iter()
        .map(|definition| definition.name)
        .collect();
    assert_eq!(visible, ["variant", "disabled"]);
    assert_eq!(registry.visible_traits("ui-button", &AttributeMap::new()).len(), 3);
}
