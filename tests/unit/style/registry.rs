use std::sync::atomic::{AtomicUsize, Ordering};

use super::*;

fn id(s: &str) -> StyleId {
    StyleId::new(s).unwrap()
}

const DOC: &str = r#"{
  "styles": [
    { "id": 5, "name": "Small", "actions": ["resize 50,50", "sepia"] },
    { "id": "thumb", "name": "Thumbnail", "status": true, "actions": ["thumbnail 100,100"] },
    { "id": "off", "name": "Disabled", "status": false, "actions": ["invert"] }
  ]
}"#;

struct CountingSource {
    inner: MemoryStyleSource,
    gets: AtomicUsize,
}

impl StyleSource for CountingSource {
    fn get(&self, id: &StyleId) -> Option<Style> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id)
    }

    fn list(&self, filter: StyleFilter) -> Vec<Style> {
        self.inner.list(filter)
    }
}

#[test]
fn document_loads_numeric_and_string_ids() {
    let src = MemoryStyleSource::from_json_str(DOC).unwrap();
    assert_eq!(src.len(), 3);
    let small = src.get(&id("5")).unwrap();
    assert_eq!(small.name, "Small");
    assert_eq!(small.action_lines(), vec!["resize 50,50", "sepia"]);
    assert_eq!(src.get(&id("off")).unwrap().status, StyleStatus::Disabled);
}

#[test]
fn document_with_bad_actions_names_the_style() {
    let doc = r#"{ "styles": [ { "id": "bad", "actions": ["rotate 400"] } ] }"#;
    let err = MemoryStyleSource::from_json_str(doc).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("style 'bad'"), "{msg}");
    assert!(msg.contains("lines 1"), "{msg}");
}

#[test]
fn document_rejects_duplicate_ids() {
    let doc = r#"{ "styles": [
        { "id": 1, "actions": ["invert"] },
        { "id": "1", "actions": ["sepia"] }
    ] }"#;
    assert!(MemoryStyleSource::from_json_str(doc).is_err());
}

#[test]
fn disabled_absent_and_empty_styles_are_not_found() {
    let src = MemoryStyleSource::from_json_str(DOC)
        .unwrap()
        .with_style(Style::from_actions(
            id("empty"),
            "Empty",
            StyleStatus::Enabled,
            vec![],
        ));
    let registry = StyleRegistry::new(Arc::new(src));

    assert!(registry.get_style(&id("thumb")).is_ok());
    for missing in ["off", "nope", "empty"] {
        let err = registry.get_style(&id(missing)).unwrap_err();
        assert!(matches!(err, StyleCacheError::NotFound(_)), "{missing}");
    }
}

#[test]
fn list_enabled_skips_disabled_styles() {
    let registry = StyleRegistry::new(Arc::new(MemoryStyleSource::from_json_str(DOC).unwrap()));
    let mut ids: Vec<String> = registry
        .list_enabled()
        .iter()
        .map(|s| s.id.to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["5", "thumb"]);
}

#[test]
fn registry_reads_through_once_until_forgotten() {
    let source = Arc::new(CountingSource {
        inner: MemoryStyleSource::from_json_str(DOC).unwrap(),
        gets: AtomicUsize::new(0),
    });
    let registry = StyleRegistry::new(source.clone());

    registry.get_style(&id("thumb")).unwrap();
    registry.get_style(&id("thumb")).unwrap();
    assert_eq!(source.gets.load(Ordering::SeqCst), 1);

    registry.forget(&id("thumb"));
    registry.get_style(&id("thumb")).unwrap();
    assert_eq!(source.gets.load(Ordering::SeqCst), 2);

    registry.forget_all();
    registry.get_style(&id("thumb")).unwrap();
    assert_eq!(source.gets.load(Ordering::SeqCst), 3);
}

#[test]
fn actions_are_sorted_by_order() {
    let a = Action::parse("sepia", 4).unwrap();
    let b = Action::parse("invert", 1).unwrap();
    let style = Style::from_actions(id("x"), "X", StyleStatus::Enabled, vec![a, b]);
    let kinds: Vec<&str> = style.actions().iter().map(|a| a.kind.as_str()).collect();
    assert_eq!(kinds, vec!["invert", "sepia"]);
}
