//! Behaviour every ObjectStore backend must share

use revtree::store::CountingListener;
use revtree::tree::{empty_tree_id, RevFeature, RevObject};
use revtree::{ContentId, MemoryObjectStore, ObjectStore, SledObjectStore, StorageError, TreeBuilder};
use std::sync::Arc;
use tempfile::TempDir;

fn objects(count: usize) -> Vec<RevObject> {
    (0..count)
        .map(|i| RevFeature::new(format!("object {i}").into_bytes()).into())
        .collect()
}

fn check_single_object_contract(store: &dyn ObjectStore) {
    let object: RevObject = RevFeature::new(b"payload".to_vec()).into();
    let id = *object.id();

    assert!(!store.exists(&id).unwrap());
    assert!(matches!(store.get(&id), Err(StorageError::NotFound(missing)) if missing == id));
    assert!(store.get_if_present(&id).unwrap().is_none());

    assert!(store.put(object.clone()).unwrap());
    assert!(!store.put(object.clone()).unwrap());
    assert!(store.exists(&id).unwrap());
    assert_eq!(store.get(&id).unwrap(), object);
    assert_eq!(store.get_feature(&id).unwrap().data(), b"payload");
    assert!(matches!(
        store.get_tree(&id),
        Err(StorageError::TypeMismatch { expected: "tree", .. })
    ));

    assert!(store.delete(&id).unwrap());
    assert!(!store.delete(&id).unwrap());
    assert!(!store.exists(&id).unwrap());
}

fn check_bulk_contract(store: &dyn ObjectStore) {
    let batch = objects(50);
    let ids: Vec<ContentId> = batch.iter().map(|o| *o.id()).collect();

    store.put(batch[0].clone()).unwrap();
    let mut listener = CountingListener::default();
    let inserted = store
        .put_all(&mut batch.clone().into_iter(), &mut listener)
        .unwrap();
    assert_eq!(inserted, 49);
    assert_eq!(listener.inserted, 49);

    let mut wanted = ids.clone();
    wanted.push(*RevFeature::new(b"never stored".to_vec()).id());
    let mut listener = CountingListener::default();
    let fetched: Vec<RevObject> = store
        .get_all(&wanted, &mut listener)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(fetched.len(), 50);
    assert_eq!(listener.found, 50);
    assert_eq!(listener.not_found, 1);
}

fn check_lookup_contract(store: &dyn ObjectStore) {
    let object: RevObject = RevFeature::new(b"lookup target".to_vec()).into();
    let id = *object.id();
    store.put(object).unwrap();
    let hex = id.to_string();

    assert_eq!(store.lookup(&hex[..8]).unwrap(), vec![id]);
    assert_eq!(store.lookup(&hex[..11]).unwrap(), vec![id]);
    assert_eq!(store.lookup(&hex.to_uppercase()).unwrap(), vec![id]);
    assert!(matches!(store.lookup(&hex[..7]), Err(StorageError::InvalidArgument(_))));
    assert!(matches!(store.lookup("zzzzzzzz"), Err(StorageError::InvalidArgument(_))));
}

fn check_tree_round_trip(store: Arc<dyn ObjectStore>) {
    assert!(store.get_tree(&empty_tree_id()).unwrap().is_empty());

    let mut builder = TreeBuilder::new(store.clone());
    for i in 0..700 {
        builder
            .put(RevFeature::new(format!("f{i}").into_bytes()).node(format!("f{i}")))
            .unwrap();
    }
    let tree = builder.build().unwrap();
    let loaded = store.get_tree(tree.id()).unwrap();
    assert_eq!(loaded.size(), 700);
    assert_eq!(loaded.buckets(), tree.buckets());
    for bucket in tree.buckets().values() {
        assert!(store.exists(bucket.id()).unwrap());
    }
}

#[test]
fn test_memory_store_conformance() {
    let store = Arc::new(MemoryObjectStore::new());
    check_single_object_contract(store.as_ref());
    check_bulk_contract(store.as_ref());
    check_lookup_contract(store.as_ref());
    check_tree_round_trip(store);
}

#[test]
fn test_sled_store_conformance() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(SledObjectStore::open(dir.path()).unwrap());
    check_single_object_contract(store.as_ref());
    check_bulk_contract(store.as_ref());
    check_lookup_contract(store.as_ref());
    check_tree_round_trip(store);
}

#[test]
fn test_sled_store_survives_reopen() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let id = {
        let store = Arc::new(SledObjectStore::open(dir.path())?);
        let mut builder = TreeBuilder::new(store.clone());
        builder.put(RevFeature::new(b"kept".to_vec()).node("kept"))?;
        let tree = builder.build()?;
        store.flush()?;
        *tree.id()
    };

    let reopened = SledObjectStore::open(dir.path())?;
    let tree = reopened.get_tree(&id)?;
    assert!(tree.child("kept").is_some());
    Ok(())
}
