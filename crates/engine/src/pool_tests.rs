use super::*;
use convoy_adapters::FakeGitAdapter;
use std::path::Path;

#[tokio::test]
async fn fill_to_target_creates_target_size_entries() {
    let git = Arc::new(FakeGitAdapter::new());
    let pool = WorktreePool::new(git, PathBuf::from("/base"), 3);
    pool.fill_to_target().await;
    assert_eq!(pool.ready_len(), 3);
}

#[tokio::test]
async fn acquire_on_empty_pool_returns_pool_empty() {
    let git = Arc::new(FakeGitAdapter::new());
    let pool = WorktreePool::new(git, PathBuf::from("/base"), 0);
    let result = pool.acquire("job-1", "feat/job-1").await;
    assert!(matches!(result, Err(EngineError::PoolEmpty)));
}

#[tokio::test]
async fn acquire_moves_and_renames_entry() {
    let git = Arc::new(FakeGitAdapter::new());
    let pool = WorktreePool::new(git.clone(), PathBuf::from("/base"), 1);
    pool.fill_to_target().await;
    assert_eq!(pool.ready_len(), 1);

    let acquired = pool.acquire("job-1", "feat/job-1").await.unwrap();
    assert_eq!(acquired.path, PathBuf::from("/base/job-1"));
    assert_eq!(acquired.branch_name, "feat/job-1");
    assert_eq!(pool.ready_len(), 0);
}

#[tokio::test]
async fn cleanup_pool_removes_all_entries() {
    let git = Arc::new(FakeGitAdapter::new());
    let pool = WorktreePool::new(git.clone(), PathBuf::from("/base"), 2);
    pool.fill_to_target().await;
    pool.cleanup_pool().await;
    assert_eq!(pool.ready_len(), 0);
    assert_eq!(git.worktree_count(), 0);
}

#[tokio::test]
async fn reclaim_keeps_valid_sentinel_worktrees_up_to_target() {
    let git = Arc::new(FakeGitAdapter::new());
    git.create_worktree(Path::new("/base/pool-a"), "pool-ready-a", "origin/main")
        .await
        .unwrap();
    git.create_worktree(Path::new("/base/pool-b"), "pool-ready-b", "origin/main")
        .await
        .unwrap();

    let pool = WorktreePool::new(git, PathBuf::from("/base"), 1);
    pool.reclaim_orphaned_pool_worktrees(vec![
        PathBuf::from("/base/pool-a"),
        PathBuf::from("/base/pool-b"),
    ])
    .await;

    assert_eq!(pool.ready_len(), 1);
}
