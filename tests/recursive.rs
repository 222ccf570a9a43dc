use schemaform::{FormOptions, ItemContext, JsonSchemaForm, resolve_schema};
use serde_json::{Value, json};

fn person() -> Value {
    json!({
        "definitions": {
            "person": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "spouse": { "$ref": "#/definitions/person" },
                    "children": { "type": "array", "items": { "$ref": "#/definitions/person" } }
                }
            }
        },
        "type": "object",
        "properties": { "boss": { "$ref": "#/definitions/person" } }
    })
}

fn form(data: Option<Value>) -> JsonSchemaForm {
    let mut form = JsonSchemaForm::new(person());
    if let Some(data) = data {
        form = form.with_data(data);
    }
    form.initialize().unwrap();
    form
}

#[test]
fn one_entry_per_cycle() {
    let resolved = resolve_schema(&person()).unwrap();
    let mut recursive: Vec<&str> = resolved.schema_recursive_refs.keys().map(String::as_str).collect();
    recursive.sort();
    assert_eq!(
        recursive,
        vec!["/properties/boss/properties/children/items", "/properties/boss/properties/spouse"]
    );
    assert_eq!(resolved.canonical_data_pointer("/boss/children/4/spouse/name").as_deref(), Some("/boss/name"));
}

#[test]
fn empty_form_shows_placeholders() {
    let form = form(None);
    assert_eq!(form.data(), Some(&json!({ "boss": { "children": [] } })));
    let boss = &form.layout().unwrap().nodes[0];
    let types: Vec<&str> = boss.items.iter().map(|n| n.node_type.as_str()).collect();
    assert_eq!(types, vec!["text", "$ref", "array"]);
    assert_eq!(boss.items[1].options["title"], json!("Add Spouse"));
    assert!(form.get_control("/boss/spouse").is_none());
}

#[test]
fn recursive_property_expands_and_collapses() {
    let mut form = form(None);
    let before_nodes = form.layout().unwrap().nodes.clone();
    let before_data = form.data().cloned();

    assert!(form.add_item(&ItemContext::new([], [0, 1]), Some("Partner")));
    let boss = &form.layout().unwrap().nodes[0];
    assert_eq!(boss.items[1].node_type, "section");
    assert_eq!(boss.items[1].options["title"], json!("Partner"));
    assert!(boss.items[2].hidden);
    assert!(form.set_value("/boss/spouse/name", json!("Ann")));
    assert_eq!(form.data().unwrap()["boss"]["spouse"]["name"], json!("Ann"));

    // the placeholder is hidden while its instance exists
    assert!(!form.add_item(&ItemContext::new([], [0, 2]), None));

    assert!(form.remove_item(&ItemContext::new([], [0, 1])));
    assert_eq!(form.layout().unwrap().nodes, before_nodes);
    assert_eq!(form.data().cloned(), before_data);
}

#[test]
fn recursive_items_nest() {
    let mut form = form(None);
    assert!(form.add_item(&ItemContext::new([], [0, 2]), None));
    assert!(form.set_value("/boss/children/0/name", json!("Kid")));

    // boss > children > first child > its own children
    let grandchildren = ItemContext::new([0], [0, 2, 0, 2]);
    assert!(form.add_item(&grandchildren, None));
    assert!(form.set_value("/boss/children/0/children/0/name", json!("Grandkid")));
    assert_eq!(
        form.data().unwrap()["boss"]["children"],
        json!([{ "name": "Kid", "children": [{ "name": "Grandkid", "children": [] }] }])
    );

    assert!(form.remove_item(&ItemContext::new([0], [0, 2, 0])));
    assert_eq!(form.data(), Some(&json!({ "boss": { "children": [] } })));
}

#[test]
fn data_drives_recursive_depth() {
    let data = json!({
        "boss": {
            "name": "A",
            "spouse": { "name": "B", "children": [] },
            "children": [{ "name": "C", "children": [{ "name": "D", "children": [] }] }]
        }
    });
    let form = form(Some(data.clone()));
    assert_eq!(form.data(), Some(&data));
    assert_eq!(form.get_control("/boss/children/0/children/0/name").map(|c| c.value()), Some(json!("D")));
}

#[test]
fn root_recursion_with_list_items_stays_finite() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "kids": { "type": "array", "minItems": 1, "items": { "$ref": "#" } }
        }
    });
    let mut form = JsonSchemaForm::new(schema).with_options(FormOptions { list_items: 3, ..Default::default() });
    form.initialize().unwrap();
    assert!(form.resolved().unwrap().has_root_reference);
    assert_eq!(form.get_control("/kids").map(|c| c.len()), Some(0));
}

#[test]
fn recursive_tuple_slots_wait_for_an_add() {
    let schema = json!({
        "type": "object",
        "properties": {
            "name": { "type": "string" },
            "pair": { "type": "array", "items": [{ "$ref": "#" }] }
        }
    });
    let mut form = JsonSchemaForm::new(schema);
    form.initialize().unwrap();
    assert_eq!(form.get_control("/pair").map(|c| c.len()), Some(0));
    let pair = &form.layout().unwrap().nodes[1];
    assert_eq!(pair.item_count(), 0);
    assert!(pair.items.last().is_some_and(|n| n.is_placeholder()));

    assert!(form.add_item(&ItemContext::new([], [1]), None));
    assert_eq!(form.get_control("/pair/0/pair").map(|c| c.len()), Some(0));
    let pair = &form.layout().unwrap().nodes[1];
    assert_eq!(pair.items.len(), 1);
    assert_eq!(pair.items[0].node_type, "section");

    // the inner tuple fills the same way, one level per add
    assert!(form.add_item(&ItemContext::new([], [1, 0, 1]), None));
    assert_eq!(form.get_control("/pair/0/pair/0/pair").map(|c| c.len()), Some(0));

    assert!(form.remove_item(&ItemContext::new([0], [1, 0])));
    assert_eq!(form.get_control("/pair").map(|c| c.len()), Some(0));
    assert!(form.layout().unwrap().nodes[1].items[0].is_placeholder());
}

#[test]
fn layout_keys_through_recursive_arrays_use_the_inlined_schema() {
    let schema = json!({
        "definitions": {
            "address": { "type": "object", "properties": { "street": { "type": "string" } } },
            "person": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "home": { "$ref": "#/definitions/address" },
                    "children": { "type": "array", "items": { "$ref": "#/definitions/person" } }
                }
            }
        },
        "type": "object",
        "properties": { "boss": { "$ref": "#/definitions/person" } }
    });
    let resolved = resolve_schema(&schema).unwrap();
    assert_eq!(
        resolved.schema_pointer_for("/boss/children/0/name").as_deref(),
        Some("/properties/boss/properties/name")
    );

    let mut form = JsonSchemaForm::new(schema).with_layout(json!(["boss.children[].home"]));
    form.initialize().unwrap();
    let home = &form.layout().unwrap().nodes[0];
    assert_eq!(home.node_type, "section");
    assert_eq!(home.schema_pointer.as_deref(), Some("/properties/boss/properties/home"));
    assert_eq!(home.data_pointer.as_deref(), Some("/boss/children/-/home"));
    assert_eq!(home.items.len(), 1);
    assert_eq!(home.items[0].name.as_deref(), Some("street"));
}
