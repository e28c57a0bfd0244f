use std::sync::Arc;

use sedge::analysis::UnicodeSegmenter;
use sedge::document::{MemoryPostStore, Post};
use sedge::engine::{EngineConfig, SearchEngine};
use sedge::error::Result;
use sedge::storage::{FileStorage, MemoryStorage, Storage};

fn post(id: u64, title: &str, content: &str) -> Post {
    Post {
        id,
        url: format!("post-{id}"),
        title: title.to_string(),
        content: content.to_string(),
        tags: Vec::new(),
        update_time: id,
    }
}

fn open_engine(storage: Arc<dyn Storage>, posts: Arc<MemoryPostStore>) -> Result<SearchEngine> {
    let _ = env_logger::builder().is_test(true).try_init();
    SearchEngine::open(
        storage,
        posts,
        Arc::new(UnicodeSegmenter::new()),
        EngineConfig::default(),
    )
}

#[test]
fn test_index_survives_restart_in_shared_memory_storage() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let posts = Arc::new(MemoryPostStore::new());

    // First run: index two posts, then drop the engine without any
    // explicit shutdown. The writes only live in the stores' WAL.
    {
        let engine = open_engine(storage.clone(), posts.clone())?;
        for id in 1..=2u64 {
            let p = post(id, "durable", &format!("durable body {id}"));
            posts.put_post(p.clone());
            engine.reindex(&p)?;
        }
        engine.add_tag_entries(1, &["kept".to_string()])?;
        assert_eq!(engine.search("durable")?.len(), 2);
    }

    // Restart: reopening replays the WAL against the same storage.
    let engine = open_engine(storage, posts)?;
    assert_eq!(engine.search("durable")?.len(), 2);
    assert_eq!(engine.list_posts_by_tag("kept", 0, None)?, [1]);
    Ok(())
}

#[test]
fn test_index_survives_restart_on_disk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let posts = Arc::new(MemoryPostStore::new());

    {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(dir.path())?);
        let engine = open_engine(storage, posts.clone())?;
        let p = post(7, "persisted", "a post that outlives the process");
        posts.put_post(p.clone());
        engine.reindex(&p)?;
    }

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(dir.path())?);
    let engine = open_engine(storage, posts)?;
    let results = engine.search("outlives")?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, 7);

    // Reindexing after recovery still replaces postings cleanly.
    let p = post(7, "persisted", "fresh wording after restart");
    engine.reindex(&p)?;
    assert!(engine.search("outlives")?.is_empty());
    assert_eq!(engine.search("fresh")?.len(), 1);
    Ok(())
}
