use serde_json::json;
use taskline::error::PipelineError;
use taskline::runtime::fs_store::FsStore;
use taskline::runtime::identity::{Params, TaskId};
use taskline::runtime::store::{MemoryStore, ResultStore};

fn train_id(model: &str) -> TaskId {
    let mut params = Params::new();
    params.insert("model".to_string(), json!(model));
    TaskId::new("train_model", params)
}

async fn exercise_store(store: &dyn ResultStore) {
    let id = train_id("svd");

    assert!(!store.exists(&id).await.unwrap());
    let err = store.load(&id).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    store.save(&id, &json!({"weights": [1, 2, 3]})).await.unwrap();
    assert!(store.exists(&id).await.unwrap());
    assert_eq!(store.load(&id).await.unwrap(), json!({"weights": [1, 2, 3]}));

    // Overwrite replaces the prior value.
    store.save(&id, &json!({"weights": [9]})).await.unwrap();
    assert_eq!(store.load(&id).await.unwrap(), json!({"weights": [9]}));
}

async fn exercise_meta_channel(store: &dyn ResultStore) {
    let id = train_id("nmf");

    // Metadata may exist without the primary output; it does not make the
    // task complete.
    store.save_meta(&id, &json!({"rmse": 0.9})).await.unwrap();
    assert!(!store.exists(&id).await.unwrap());
    assert_eq!(store.load_meta(&id).await.unwrap(), json!({"rmse": 0.9}));
    assert!(matches!(
        store.load(&id).await.unwrap_err(),
        PipelineError::NotFound(_)
    ));
}

async fn exercise_parameter_isolation(store: &dyn ResultStore) {
    let svd = train_id("svd");
    let nmf = train_id("nmf");

    store.save(&svd, &json!("svd output")).await.unwrap();
    store.save(&nmf, &json!("nmf output")).await.unwrap();

    assert_eq!(store.load(&svd).await.unwrap(), json!("svd output"));
    assert_eq!(store.load(&nmf).await.unwrap(), json!("nmf output"));
}

/// Bindings that differ only in value type are different identities and
/// must not alias one cache entry.
async fn exercise_type_punned_isolation(store: &dyn ResultStore) {
    let mut as_string = Params::new();
    as_string.insert("epochs".to_string(), json!("1"));
    let string_id = TaskId::new("train_model", as_string);

    let mut as_number = Params::new();
    as_number.insert("epochs".to_string(), json!(1));
    let number_id = TaskId::new("train_model", as_number);

    store.save(&string_id, &json!("string epochs")).await.unwrap();
    assert!(!store.exists(&number_id).await.unwrap());

    store.save(&number_id, &json!("number epochs")).await.unwrap();
    assert_eq!(store.load(&string_id).await.unwrap(), json!("string epochs"));
    assert_eq!(store.load(&number_id).await.unwrap(), json!("number epochs"));
}

#[tokio::test]
async fn memory_store_roundtrip() {
    exercise_store(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_meta_channel() {
    exercise_meta_channel(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_parameter_isolation() {
    exercise_parameter_isolation(&MemoryStore::new()).await;
}

#[tokio::test]
async fn memory_store_type_punned_isolation() {
    exercise_type_punned_isolation(&MemoryStore::new()).await;
}

#[tokio::test]
async fn fs_store_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    exercise_store(&FsStore::new(dir.path()).unwrap()).await;
}

#[tokio::test]
async fn fs_store_meta_channel() {
    let dir = tempfile::tempdir().unwrap();
    exercise_meta_channel(&FsStore::new(dir.path()).unwrap()).await;
}

#[tokio::test]
async fn fs_store_parameter_isolation() {
    let dir = tempfile::tempdir().unwrap();
    exercise_parameter_isolation(&FsStore::new(dir.path()).unwrap()).await;
}

#[tokio::test]
async fn fs_store_type_punned_isolation() {
    let dir = tempfile::tempdir().unwrap();
    exercise_type_punned_isolation(&FsStore::new(dir.path()).unwrap()).await;
}

#[tokio::test]
async fn fs_store_keeps_lookalike_kinds_apart() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path()).unwrap();

    // Kinds whose keys differ only in a character that needs escaping
    // must land in separate files.
    let questioned = TaskId::bare("a?b");
    let dashed = TaskId::bare("a-b");
    store.save(&questioned, &json!("questioned")).await.unwrap();
    store.save(&dashed, &json!("dashed")).await.unwrap();

    assert_eq!(store.load(&questioned).await.unwrap(), json!("questioned"));
    assert_eq!(store.load(&dashed).await.unwrap(), json!("dashed"));
}

#[tokio::test]
async fn fs_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let id = train_id("svdpp");

    {
        let store = FsStore::new(dir.path()).unwrap();
        store.save(&id, &json!(42)).await.unwrap();
        store.save_meta(&id, &json!({"rmse": 0.818})).await.unwrap();
    }

    let reopened = FsStore::new(dir.path()).unwrap();
    assert!(reopened.exists(&id).await.unwrap());
    assert_eq!(reopened.load(&id).await.unwrap(), json!(42));
    assert_eq!(
        reopened.load_meta(&id).await.unwrap(),
        json!({"rmse": 0.818})
    );
}

#[tokio::test]
async fn fs_store_leaves_no_temp_files_behind() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path()).unwrap();
    store.save(&train_id("svd"), &json!([1, 2, 3])).await.unwrap();

    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp-"))
        .collect();
    assert!(leftovers.is_empty());
}
