use std::fs;

use amity_common::records::{Graph, UserRecord};
use amity_common::{FriendRequest, UserId};
use amity_core::RelationStore;
use anyhow::Result;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn uid(id: &str) -> UserId {
    UserId::new(id)
}

fn sample_graph() -> Graph {
    let mut graph = Graph::new();
    let mut alice = UserRecord::named("Alice");
    alice.friends.insert(uid("b"));
    let mut bob = UserRecord::named("Bob");
    bob.friends.insert(uid("a"));
    bob.inbox.insert(
        uid("c"),
        FriendRequest::new(uid("c"), "Carol", uid("b"), "hello"),
    );
    graph.insert(uid("a"), alice);
    graph.insert(uid("b"), bob);
    graph.insert(uid("c"), UserRecord::named("Carol"));
    graph
}

async fn graph_of(store: &RelationStore) -> Graph {
    store.lock().await.clone()
}

#[tokio::test]
async fn missing_file_loads_empty() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let store = RelationStore::open(dir.path().join("data.json"));
    assert!(graph_of(&store).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn save_then_load_round_trips() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");

    let store = RelationStore::open(&path);
    let graph = sample_graph();
    store.save(&graph)?;

    let reopened = RelationStore::open(&path);
    assert_eq!(graph_of(&reopened).await, graph);
    Ok(())
}

#[tokio::test]
async fn save_leaves_no_temp_file_behind() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    let store = RelationStore::open(&path);
    store.save(&sample_graph())?;

    assert!(path.exists());
    assert!(!dir.path().join("data.json.tmp").exists());
    Ok(())
}

#[tokio::test]
async fn backup_holds_the_previous_snapshot() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    let store = RelationStore::open(&path);

    let first = sample_graph();
    store.save(&first)?;

    let mut second = first.clone();
    second.insert(uid("d"), UserRecord::named("Dave"));
    store.save(&second)?;

    let bak: Graph = serde_json::from_slice(&fs::read(dir.path().join("data.json.bak"))?)?;
    assert_eq!(bak, first);
    Ok(())
}

#[tokio::test]
async fn corrupt_file_recovers_from_backup() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    let store = RelationStore::open(&path);
    let first = sample_graph();
    store.save(&first)?;
    store.save(&first)?; // second save writes the backup
    drop(store);

    fs::write(&path, "{ not json")?;
    let recovered = RelationStore::open(&path);
    assert_eq!(graph_of(&recovered).await, first);
    Ok(())
}

#[tokio::test]
async fn corrupt_file_and_backup_reset_to_empty() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    fs::write(&path, "{ not json")?;
    fs::write(dir.path().join("data.json.bak"), "also not json")?;

    let store = RelationStore::open(&path);
    assert!(graph_of(&store).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn list_shaped_friends_field_deduplicates() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    fs::write(
        &path,
        r#"{"a": {"name": "Alice", "friends": ["b", "b", "c", "b"], "inbox": {}}}"#,
    )?;

    let store = RelationStore::open(&path);
    let graph = graph_of(&store).await;
    let friends = &graph[&uid("a")].friends;
    assert_eq!(friends.len(), 2);
    assert!(friends.contains(&uid("b")));
    assert!(friends.contains(&uid("c")));
    Ok(())
}

#[tokio::test]
async fn partial_records_load_with_defaults() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    fs::write(&path, r#"{"a": {"name": "Alice"}, "b": {}}"#)?;

    let store = RelationStore::open(&path);
    let graph = graph_of(&store).await;
    assert_eq!(graph[&uid("a")].name, "Alice");
    assert!(graph[&uid("a")].friends.is_empty());
    assert!(graph[&uid("a")].inbox.is_empty());
    assert_eq!(graph[&uid("b")].name, "");
    Ok(())
}

#[tokio::test]
async fn self_links_are_scrubbed_on_load() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    fs::write(
        &path,
        r#"{"a": {"name": "Alice", "friends": ["a", "b"], "inbox": {}}}"#,
    )?;

    let store = RelationStore::open(&path);
    let graph = graph_of(&store).await;
    assert!(!graph[&uid("a")].friends.contains(&uid("a")));
    assert!(graph[&uid("a")].friends.contains(&uid("b")));
    Ok(())
}

#[tokio::test]
async fn open_keeps_the_configured_path() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    let store = RelationStore::open(&path);
    assert_eq!(store.path(), path);
    Ok(())
}

#[tokio::test]
async fn flush_writes_the_current_graph() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("data.json");
    let store = RelationStore::open(&path);
    {
        let mut graph = store.lock().await;
        graph.insert(uid("a"), UserRecord::named("Alice"));
    }
    store.flush().await?;

    let reopened = RelationStore::open(&path);
    assert_eq!(graph_of(&reopened).await[&uid("a")].name, "Alice");
    Ok(())
}
