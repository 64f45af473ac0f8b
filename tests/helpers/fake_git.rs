//! A scripted `GitClient` that never spawns a process.

use async_trait::async_trait;
use repowatch::core::{GitClient, GitQuery};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Mutex,
};

#[derive(Debug, Default)]
pub struct FakeGitClient {
    log_record: Mutex<String>,
    branch: Mutex<String>,
    calls: AtomicUsize,
    last_path: Mutex<Option<String>>,
}

impl FakeGitClient {
    pub fn new(log_record: &str, branch: &str) -> Self {
        Self {
            log_record: Mutex::new(log_record.to_string()),
            branch: Mutex::new(branch.to_string()),
            ..Default::default()
        }
    }

    /// A client whose queries all fail, i.e. return no output.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn set_commit(&self, log_record: &str, branch: &str) {
        *self.log_record.lock().unwrap() = log_record.to_string();
        *self.branch.lock().unwrap() = branch.to_string();
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_path(&self) -> Option<String> {
        self.last_path.lock().unwrap().clone()
    }
}

#[async_trait]
impl GitClient for FakeGitClient {
    async fn query(&self, repo_path: &str, query: GitQuery) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_path.lock().unwrap() = Some(repo_path.to_string());
        match query {
            GitQuery::LatestCommit => self.log_record.lock().unwrap().clone(),
            GitQuery::CurrentBranch => self.branch.lock().unwrap().clone(),
        }
    }
}
