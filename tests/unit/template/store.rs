use super::*;

fn unique_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "framekit_{tag}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn load_caches_and_returns_same_arc() {
    let dir = unique_dir("store_cache");
    let path = dir.join("t.json");
    std::fs::write(&path, r#"{ "fields": [{ "name": "price", "position": [0, 0] }] }"#).unwrap();

    let store = TemplateStore::new();
    assert!(store.is_empty());
    let a = store.load(&path).unwrap();
    let b = store.load(&path).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.len(), 1);
    assert_eq!(store.fields(&path).unwrap(), vec!["price".to_string()]);

    store.clear();
    assert!(store.is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn errors_are_not_cached() {
    let dir = unique_dir("store_err");
    let path = dir.join("t.json");
    std::fs::write(&path, "{").unwrap();

    let store = TemplateStore::new();
    assert!(matches!(
        store.load(&path),
        Err(TemplateError::MalformedTemplate(_))
    ));
    assert!(store.is_empty());

    std::fs::write(&path, r#"{ "fields": [{ "name": "a", "position": [0, 0] }] }"#).unwrap();
    assert_eq!(store.fields(&path).unwrap(), vec!["a".to_string()]);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn equivalent_paths_share_one_entry() {
    let dir = unique_dir("store_canon");
    std::fs::create_dir_all(dir.join("sub")).unwrap();
    let path = dir.join("t.json");
    std::fs::write(&path, r#"{ "fields": [{ "name": "size", "position": [0, 0] }] }"#).unwrap();
    let roundabout = dir.join("sub").join("..").join(".").join("t.json");

    let store = TemplateStore::new();
    let a = store.load(&path).unwrap();
    let b = store.load(&roundabout).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(store.len(), 1);

    std::fs::remove_dir_all(&dir).ok();
}
