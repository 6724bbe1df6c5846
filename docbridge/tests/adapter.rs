use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bson::{Bson, DateTime, Document, doc, oid::ObjectId};
use docbridge::{
    memory::{InMemoryConnector, InMemoryStore},
    prelude::*,
};

fn counter(
    count: &Arc<AtomicUsize>,
) -> impl Fn(OperationKind, Payload<'_>) -> CallbackResult + Send + Sync + 'static {
    let count = count.clone();
    move |_, _| {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn recorder(
    log: &Arc<Mutex<Vec<(OperationKind, Document)>>>,
) -> impl Fn(OperationKind, Payload<'_>) -> CallbackResult + Send + Sync + 'static {
    let log = log.clone();
    move |kind, payload| {
        let mut log = log.lock().unwrap();
        log.extend(payload.documents().iter().map(|document| (kind, document.clone())));
        Ok(())
    }
}

/// Connector that yields while connecting and records how many connects overlap.
#[derive(Debug, Default)]
struct YieldingConnector {
    inner: InMemoryConnector,
    connects: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait]
impl StoreConnector for YieldingConnector {
    async fn connect(&self, config: &DatabaseConfig) -> AdapterResult<Arc<dyn StoreBackend>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(in_flight, Ordering::SeqCst);

        tokio::task::yield_now().await;
        let backend = self.inner.connect(config).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        backend
    }
}

async fn database(store: &InMemoryStore) -> DatabaseAdapter {
    DatabaseAdapter::connect(
        &DatabaseConfig::memory("app"),
        &InMemoryConnector::with_store(store.clone()),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn write_fires_create_then_update() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    let creates = Arc::new(AtomicUsize::new(0));
    let updates = Arc::new(AtomicUsize::new(0));
    items.on_event(OperationKind::Create, "creates", counter(&creates)).await.unwrap();
    items.on_event(OperationKind::Update, "updates", counter(&updates)).await.unwrap();

    let outcome = items.write("k1", doc! { "_key": "k1", "v": 1 }).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Created);
    assert_eq!(creates.load(Ordering::SeqCst), 1);
    assert_eq!(updates.load(Ordering::SeqCst), 0);

    let outcome = items.write("k1", doc! { "_key": "k1", "v": 2 }).await.unwrap();
    assert_eq!(outcome, WriteOutcome::Updated);
    assert_eq!(creates.load(Ordering::SeqCst), 1);
    assert_eq!(updates.load(Ordering::SeqCst), 1);

    assert_eq!(items.all().await.unwrap(), vec![doc! { "_key": "k1", "v": 2 }]);
}

#[tokio::test]
async fn write_callbacks_receive_the_stored_document() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    let kinds = OperationKinds::parse("cu").unwrap();
    items.on_event(kinds, "log", recorder(&log)).await.unwrap();

    items.write("k1", doc! { "at": DateTime::from_millis(5) }).await.unwrap();
    let stored = store.all_documents("items").await.unwrap();
    {
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].0, OperationKind::Create);
        assert!(log[0].1.get_str("at").unwrap().starts_with(r#"{"$bson": "#));
        assert_eq!(log[0].1, stored[0]);
    }

    items.write("k1", doc! { "at": DateTime::from_millis(7) }).await.unwrap();
    let stored = store.all_documents("items").await.unwrap();
    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].0, OperationKind::Update);
    assert!(log[1].1.get_str("at").unwrap().starts_with(r#"{"$bson": "#));
    assert_eq!(log[1].1, stored[0]);
    assert_ne!(log[0].1, log[1].1);
}

#[tokio::test]
async fn insert_many_notifies_once_with_the_batch() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    let batches = Arc::new(Mutex::new(Vec::new()));
    let seen = batches.clone();
    items
        .on_event(OperationKind::Create, "batch", move |_, payload| {
            seen.lock().unwrap().push(payload.documents().to_vec());
            Ok(())
        })
        .await
        .unwrap();

    let result = items
        .insert_many([doc! { "a": 1 }, doc! { "b": 2 }])
        .await
        .unwrap();

    assert_eq!(result.keys.len(), 2);
    assert_eq!(
        *batches.lock().unwrap(),
        vec![vec![doc! { "a": 1 }, doc! { "b": 2 }]]
    );
    assert_eq!(items.count().await.unwrap(), 2);
}

#[tokio::test]
async fn insert_many_callback_runs_before_the_store() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    items
        .on_event(OperationKind::Create, "reject", |_, _| Err("batch rejected".into()))
        .await
        .unwrap();

    let result = items.insert_many([doc! { "a": 1 }, doc! { "b": 2 }]).await;

    assert!(matches!(result, Err(AdapterError::Callback { .. })));
    assert_eq!(store.count_documents("items").await.unwrap(), 0);
}

#[tokio::test]
async fn insert_many_rejects_non_documents() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    let creates = Arc::new(AtomicUsize::new(0));
    items.on_event(OperationKind::Create, "creates", counter(&creates)).await.unwrap();

    let result = items
        .insert_many([Bson::Document(doc! { "a": 1 }), Bson::String("not-a-doc".into())])
        .await;

    assert!(matches!(result, Err(AdapterError::InvalidDocument(_))));
    assert_eq!(creates.load(Ordering::SeqCst), 0);
    assert_eq!(store.count_documents("items").await.unwrap(), 0);
}

#[tokio::test]
async fn contains_reports_written_keys() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    items.write("k1", doc! { "v": 1 }).await.unwrap();

    assert!(items.contains(doc! { "_key": "k1" }).await.unwrap());
    assert!(items.contains("k1").await.unwrap());
    assert!(!items.contains(doc! { "_key": "k2" }).await.unwrap());
    assert!(matches!(
        items.contains(KeyRef::Inline).await,
        Err(AdapterError::InvalidKey(_))
    ));
}

#[tokio::test]
async fn write_resolves_keys() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let items = db.collection("items").await.unwrap();

    items.write(KeyRef::Inline, doc! { "_key": "inline", "v": 1 }).await.unwrap();
    items.write(doc! { "_key": "borrowed" }, doc! { "v": 2 }).await.unwrap();

    assert!(items.contains("inline").await.unwrap());
    // expression values are strings, so they never match the stored integer
    assert!(items.read("v=2").await.unwrap().is_empty());
    assert_eq!(
        items.read_filter(doc! { "v": 2 }).await.unwrap(),
        vec![doc! { "v": 2, "_key": "borrowed" }]
    );

    assert!(matches!(
        items.write(KeyRef::Inline, doc! { "v": 3 }).await,
        Err(AdapterError::InvalidKey(_))
    ));
    assert!(matches!(
        items.write(Bson::Int32(7), doc! { "v": 3 }).await,
        Err(AdapterError::InvalidKey(_))
    ));
}

#[tokio::test]
async fn non_native_fields_round_trip_through_the_store() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let events = db.collection("events").await.unwrap();

    let document = doc! {
        "_key": "e1",
        "title": "launch",
        "at": DateTime::from_millis(1_700_000_000_000),
        "owner": ObjectId::parse_str("65f1c0a2b3c4d5e6f7a8b9c0").unwrap(),
    };
    events.write(KeyRef::Inline, document.clone()).await.unwrap();

    let stored = store.all_documents("events").await.unwrap();
    assert!(matches!(stored[0].get("at"), Some(Bson::String(_))));
    assert_eq!(stored[0].get_str("title").unwrap(), "launch");

    assert_eq!(events.all().await.unwrap(), vec![document.clone()]);
    assert_eq!(events.read("title=launch").await.unwrap(), vec![document]);
}

#[tokio::test]
async fn read_notifies_with_every_match() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let users = db.collection("users").await.unwrap();

    users
        .insert_many([
            doc! { "_key": "a", "city": "Lisbon" },
            doc! { "_key": "b", "city": "Porto" },
            doc! { "_key": "c", "city": "Lisbon" },
        ])
        .await
        .unwrap();

    let sizes = Arc::new(Mutex::new(Vec::new()));
    let seen = sizes.clone();
    users
        .on_event(OperationKinds::parse("r").unwrap(), "", move |kind, payload| {
            assert_eq!(kind, OperationKind::Read);
            seen.lock().unwrap().push(payload.documents().len());
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(users.read("city=Lisbon").await.unwrap().len(), 2);
    assert_eq!(users.read("").await.unwrap().len(), 3);
    assert_eq!(users.read("city=Faro").await.unwrap().len(), 0);
    users.all().await.unwrap();

    assert_eq!(*sizes.lock().unwrap(), vec![2, 3, 0]);
}

#[tokio::test]
async fn delete_returns_and_notifies_the_removed_document() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let users = db.collection("users").await.unwrap();

    users.write("a", doc! { "name": "Alice" }).await.unwrap();

    let removed = Arc::new(Mutex::new(Vec::new()));
    let seen = removed.clone();
    users
        .on_event(OperationKind::Delete, "removed", move |_, payload| {
            seen.lock().unwrap().extend_from_slice(payload.documents());
            Ok(())
        })
        .await
        .unwrap();

    let document = users.delete("a").await.unwrap();

    assert_eq!(document, doc! { "name": "Alice", "_key": "a" });
    assert_eq!(*removed.lock().unwrap(), vec![document]);
    assert_eq!(users.count().await.unwrap(), 0);
    assert!(matches!(
        users.delete("a").await,
        Err(AdapterError::DocumentNotFound(_, _))
    ));
}

#[tokio::test]
async fn failing_callback_surfaces_after_the_write() {
    let store = InMemoryStore::new();
    let db = database(&store).await;
    let users = db.collection("users").await.unwrap();

    users
        .on_event(OperationKinds::default(), "audit", |_, _| Err("audit log unavailable".into()))
        .await
        .unwrap();

    let error = users.write("a", doc! { "name": "Alice" }).await.unwrap_err();

    match error {
        AdapterError::Callback { name, kind, .. } => {
            assert_eq!(name, "audit");
            assert_eq!(kind, OperationKind::Create);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(store.has_document("a", "users").await.unwrap());
}

#[tokio::test]
async fn collections_are_cached_per_name() {
    let store = InMemoryStore::new();
    let db = database(&store).await;

    let first = db.collection("users").await.unwrap();
    let second = db.collection("users").await.unwrap();
    let other = db.collection("orders").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &other));
    assert_eq!(db.cached_collections().await, vec!["orders", "users"]);

    let creates = Arc::new(AtomicUsize::new(0));
    first.on_event(OperationKind::Create, "c", counter(&creates)).await.unwrap();
    second.write("a", doc! {}).await.unwrap();
    assert_eq!(creates.load(Ordering::SeqCst), 1);

    assert_eq!(db.list_collections().await.unwrap(), vec!["orders", "users"]);
    db.drop_collection("orders").await.unwrap();
    assert_eq!(db.cached_collections().await, vec!["users"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_access_opens_one_collection() {
    let store = InMemoryStore::new();
    let db = Arc::new(database(&store).await);

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let db = db.clone();
            tokio::spawn(async move { db.collection("users").await.unwrap() })
        })
        .collect();

    let mut collections = Vec::new();
    for task in tasks {
        collections.push(task.await.unwrap());
    }

    let cached = db.collection("users").await.unwrap();
    assert!(collections.iter().all(|collection| Arc::ptr_eq(collection, &cached)));
    assert_eq!(db.cached_collections().await, vec!["users"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sharing_installs_one_adapter() {
    let registry = Arc::new(AdapterRegistry::new(YieldingConnector::default()));
    let config = DatabaseConfig::memory("app");

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let registry = registry.clone();
            let config = config.clone();
            tokio::spawn(async move { registry.get(Some(&config), true).await.unwrap() })
        })
        .collect();

    let mut adapters = Vec::new();
    for task in tasks {
        adapters.push(task.await.unwrap());
    }

    let shared = registry.shared().await.unwrap();
    let installed = adapters
        .iter()
        .filter(|adapter| Arc::ptr_eq(adapter, &shared))
        .count();

    assert_eq!(installed, 1);
    assert_eq!(registry.connector().connects.load(Ordering::SeqCst), 16);
    assert_eq!(registry.connector().peak.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&registry.get(None, true).await.unwrap(), &shared));
}

#[tokio::test]
async fn registry_shares_one_adapter() {
    let registry = AdapterRegistry::new(InMemoryConnector::new());
    let config = DatabaseConfig::memory("app");

    let installed = registry.get(Some(&config), true).await.unwrap();
    let shared = registry.get(None, true).await.unwrap();
    assert!(Arc::ptr_eq(&installed, &shared));

    let first = registry.get(Some(&config), false).await.unwrap();
    let second = registry.get(Some(&config), false).await.unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(!Arc::ptr_eq(&first, &installed));

    let again = registry.get(Some(&config), true).await.unwrap();
    assert!(!Arc::ptr_eq(&again, &installed));
    assert!(Arc::ptr_eq(&registry.shared().await.unwrap(), &installed));
}

#[tokio::test]
async fn registry_without_an_adapter_fails() {
    let registry = AdapterRegistry::new(InMemoryConnector::new());

    assert!(matches!(
        registry.get(None, true).await,
        Err(AdapterError::AdapterCreation(_))
    ));
    assert!(matches!(
        registry.get(None, false).await,
        Err(AdapterError::AdapterCreation(_))
    ));

    registry.get(Some(&DatabaseConfig::memory("app")), false).await.unwrap();
    assert!(registry.shared().await.is_none());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_connecting() {
    let registry = AdapterRegistry::new(InMemoryConnector::new());
    let mut config = DatabaseConfig::memory("app");
    config.host.clear();

    assert!(matches!(
        registry.get(Some(&config), true).await,
        Err(AdapterError::Configuration(_))
    ));
    assert!(registry.shared().await.is_none());
}

#[tokio::test]
async fn process_wide_adapter_is_shared() {
    let config = DatabaseConfig::memory("process");

    let installed = docbridge::get_adapter(Some(&config), true).await.unwrap();
    let shared = docbridge::get_adapter(None, true).await.unwrap();

    assert!(Arc::ptr_eq(&installed, &shared));
    assert!(docbridge::get_adapter(None, false).await.is_err());
}

#[cfg(not(feature = "mongodb"))]
#[tokio::test]
async fn mongodb_backend_requires_the_feature() {
    let mut config = DatabaseConfig::memory("app");
    config.backend = BackendKind::MongoDb;

    let result = DatabaseAdapter::connect(&config, &BackendConnector::default()).await;

    assert!(matches!(result, Err(AdapterError::Configuration(_))));
}
