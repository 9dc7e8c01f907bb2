use product_store::{MemoryBacking, Product, ProductInput, ProductPatch, ProductStore};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn input(name: &str, price: f64, quantity: i64) -> ProductInput {
    ProductInput {
        name: name.into(),
        description: format!("{name} description"),
        price,
        quantity,
    }
}

fn memory_store() -> (ProductStore, MemoryBacking) {
    let backing = MemoryBacking::new();
    let store = ProductStore::builder().backing(backing.clone()).build();
    (store, backing)
}

fn persisted(backing: &MemoryBacking) -> serde_json::Map<String, serde_json::Value> {
    let raw = backing.contents_string().unwrap();
    serde_json::from_str(&raw).unwrap()
}

// ---- create / find_one ------------------------------------------------------

#[test]
fn create_then_find_one() {
    let (store, _) = memory_store();
    let created = store.create(input("Lamp", 19.5, 4));

    assert!(!created.id.is_empty());
    assert_eq!(created.name, "Lamp");
    assert_eq!(store.find_one(&created.id), Some(created));
}

#[test]
fn create_ids_are_pairwise_distinct() {
    let (store, _) = memory_store();
    let ids: HashSet<String> = (0..200)
        .map(|i| store.create(input(&format!("p{i}"), 1.0, i)).id)
        .collect();
    assert_eq!(ids.len(), 200);
    assert_eq!(store.len(), 200);
}

#[test]
fn create_ids_are_uuids() {
    let (store, _) = memory_store();
    let id = store.create(input("x", 1.0, 1)).id;
    assert!(uuid::Uuid::parse_str(&id).is_ok());
}

#[test]
fn create_regenerates_on_collision() {
    let backing = MemoryBacking::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    // hands out "dup" twice, then "fresh"
    let store = ProductStore::builder()
        .backing(backing)
        .id_source(move || match counter.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => "dup".to_string(),
            _ => "fresh".to_string(),
        })
        .build();

    let first = store.create(input("a", 1.0, 1));
    assert_eq!(first.id, "dup");
    let second = store.create(input("b", 2.0, 2));
    assert_eq!(second.id, "fresh");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(store.find_one("dup").unwrap().name, "a");
}

#[test]
fn create_persists_before_return() {
    let (store, backing) = memory_store();
    let created = store.create(input("Mug", 7.25, 12));

    let on_disk = persisted(&backing);
    let record: Product = serde_json::from_value(on_disk[&created.id].clone()).unwrap();
    assert_eq!(record, created);
}

#[test]
fn find_one_missing_is_none() {
    let (store, _) = memory_store();
    assert_eq!(store.find_one("nonexistent"), None);
    assert!(!store.contains("nonexistent"));
}

// ---- find_all ---------------------------------------------------------------

#[test]
fn find_all_empty() {
    let (store, _) = memory_store();
    assert!(store.find_all().is_empty());
    assert!(store.is_empty());
}

#[test]
fn find_all_in_insertion_order() {
    let (store, _) = memory_store();
    let a = store.create(input("a", 1.0, 1));
    let b = store.create(input("b", 2.0, 2));
    let c = store.create(input("c", 3.0, 3));
    assert_eq!(store.find_all(), vec![a, b, c]);
}

// ---- update -----------------------------------------------------------------

#[test]
fn update_merges_only_given_fields() {
    let (store, _) = memory_store();
    let created = store.create(ProductInput {
        name: "A".into(),
        description: "d".into(),
        price: 10.0,
        quantity: 1,
    });

    let updated = store.update(&created.id, ProductPatch::price(20.0)).unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.name, "A");
    assert_eq!(updated.description, "d");
    assert_eq!(updated.price, 20.0);
    assert_eq!(updated.quantity, 1);
    assert_eq!(store.find_one(&created.id), Some(updated));
}

#[test]
fn update_with_full_input_replaces_fields() {
    let (store, backing) = memory_store();
    let created = store.create(input("old", 1.0, 1));
    let updated = store.update(&created.id, input("new", 2.0, 5)).unwrap();

    assert_eq!(updated.name, "new");
    assert_eq!(updated.quantity, 5);
    assert_eq!(persisted(&backing)[&created.id]["name"], "new");
}

#[test]
fn update_payload_id_is_ignored() {
    let (store, _) = memory_store();
    let created = store.create(input("a", 1.0, 1));
    let patch: ProductPatch = serde_json::from_str(r#"{"id":"other","quantity":9}"#).unwrap();

    let updated = store.update(&created.id, patch).unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.quantity, 9);
    assert_eq!(store.find_one("other"), None);
}

#[test]
fn update_missing_returns_none_and_does_not_save() {
    let (store, backing) = memory_store();
    store.create(input("a", 1.0, 1));
    let before = backing.contents();

    assert_eq!(store.update("nonexistent", ProductPatch::price(5.0)), None);
    assert_eq!(store.len(), 1);
    assert_eq!(backing.contents(), before);
}

#[test]
fn update_keeps_position() {
    let (store, _) = memory_store();
    let a = store.create(input("a", 1.0, 1));
    let b = store.create(input("b", 2.0, 2));
    store.update(&a.id, ProductPatch::quantity(0));

    let ids: Vec<String> = store.find_all().into_iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
}

// ---- remove -----------------------------------------------------------------

#[test]
fn remove_deletes_exactly_one_record() {
    let (store, backing) = memory_store();
    store.create(input("a", 1.0, 1));
    store.create(input("b", 2.0, 2));
    let x = store.create(input("x", 3.0, 3));

    let removed = store.remove(&x.id);
    assert_eq!(removed, Some(x.clone()));
    assert_eq!(store.len(), 2);
    assert!(store.find_all().iter().all(|p| p.id != x.id));

    let on_disk = persisted(&backing);
    assert_eq!(on_disk.len(), 2);
    assert!(!on_disk.contains_key(&x.id));
}

#[test]
fn remove_missing_leaves_state_unchanged() {
    let (store, backing) = memory_store();
    store.create(input("a", 1.0, 1));
    let before = backing.contents();

    assert_eq!(store.remove("nonexistent"), None);
    assert_eq!(store.len(), 1);
    assert_eq!(backing.contents(), before);
}

#[test]
fn remove_twice() {
    let (store, _) = memory_store();
    let a = store.create(input("a", 1.0, 1));
    assert!(store.remove(&a.id).is_some());
    assert!(store.remove(&a.id).is_none());
    assert!(store.is_empty());
}

// ---- handle / debug ---------------------------------------------------------

#[test]
fn handle_clones_share_one_store() {
    let handle = ProductStore::builder()
        .backing(MemoryBacking::new())
        .build_handle();
    let other = handle.clone();

    let created = handle.create(input("shared", 1.0, 1));
    assert_eq!(other.find_one(&created.id), Some(created));
}

#[test]
fn handle_across_threads() {
    let handle = ProductStore::builder()
        .backing(MemoryBacking::new())
        .build_handle();

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let h = handle.clone();
            std::thread::spawn(move || {
                for i in 0..25 {
                    h.create(input(&format!("t{t}-{i}"), 1.0, i));
                }
            })
        })
        .collect();
    for w in workers {
        w.join().unwrap();
    }
    assert_eq!(handle.len(), 100);
}

#[test]
fn debug_impls_dont_panic() {
    let builder = ProductStore::builder().backing(MemoryBacking::new());
    assert!(format!("{builder:?}").contains("ProductStoreBuilder"));

    let handle = builder.build_handle();
    let dbg = format!("{handle:?}");
    assert!(dbg.contains("ProductStore"));
    assert!(dbg.contains("<memory>"));
}
