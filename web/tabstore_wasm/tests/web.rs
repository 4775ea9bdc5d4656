//! Browser tests for the WASM bindings.

#![cfg(target_arch = "wasm32")]

use tabstore_wasm::TabStorage;
use wasm_bindgen_test::*;
use web_sys::{Storage, StorageEvent, StorageEventInit};

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn set_get_remove() {
    let storage = TabStorage::new(Some(false), None).unwrap();
    storage.clear();

    storage.set_item("theme", "dark");
    assert_eq!(storage.get_item("theme").as_deref(), Some("dark"));
    assert_eq!(storage.length(), 1);
    assert_eq!(storage.key(0).as_string().as_deref(), Some("theme"));
    assert!(storage.key(1).is_null());

    storage.remove_item("theme");
    assert_eq!(storage.get_item("theme"), None);
    storage.close();
}

#[wasm_bindgen_test]
fn set_items_accepts_json_text() {
    let storage = TabStorage::new(Some(false), None).unwrap();
    storage.clear();

    storage
        .set_items(wasm_bindgen::JsValue::from_str(r#"{"a":"1","b":"2"}"#))
        .unwrap();
    assert_eq!(storage.keys().length(), 2);
    storage.close();
}

#[wasm_bindgen_test]
fn rejects_unknown_direction() {
    assert!(TabStorage::new(Some(true), Some("sideways".into())).is_err());
}

/// Fires a `storage` event for the default channel as if `area` changed.
fn dispatch_storage_event(area: &Storage, new_value: &str) {
    let init = StorageEventInit::new();
    init.set_key(Some("tabStorage"));
    init.set_new_value(Some(new_value));
    init.set_storage_area(Some(area));
    let event = StorageEvent::new_with_event_init_dict("storage", &init).unwrap();
    web_sys::window().unwrap().dispatch_event(&event).unwrap();
}

#[wasm_bindgen_test]
fn only_local_storage_events_are_applied() {
    let window = web_sys::window().unwrap();
    let storage = TabStorage::new(Some(false), None).unwrap();
    storage.clear();
    storage.set_item("kept", "yes");

    let clear = r#"{"message":"clear"}"#;
    dispatch_storage_event(&window.session_storage().unwrap().unwrap(), clear);
    assert_eq!(storage.get_item("kept").as_deref(), Some("yes"));

    dispatch_storage_event(&window.local_storage().unwrap().unwrap(), clear);
    assert_eq!(storage.get_item("kept"), None);
    storage.close();
}
