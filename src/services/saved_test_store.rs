//! 已保存试卷存储 - 业务能力层
//!
//! 一个 JSON 文件保存全部记录（新的在前）。启动时读取一次，
//! 每次增删都整体重写（临时文件 + 改名）。写入前检查容量上限；磁盘写满与超限一样
//! 报告为 `QuotaExceeded`，调用方可以删掉旧试卷后重试。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{AppResult, PersistenceError};
use crate::models::saved_test::SavedTest;

/// 已保存试卷存储
///
/// 职责：
/// - 读写存储文件
/// - 维护新→旧的顺序
/// - 区分"空间不足"和其他失败
pub struct SavedTestStore {
    path: PathBuf,
    quota_bytes: u64,
    tests: Vec<SavedTest>,
}

impl SavedTestStore {
    /// 打开存储
    ///
    /// 文件不存在时为空；文件损坏时记录警告并按空存储处理
    pub async fn open(path: impl AsRef<Path>, quota_bytes: u64) -> Self {
        let path = path.as_ref().to_path_buf();
        let tests = match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Vec<SavedTest>>(&content) {
                Ok(tests) => tests,
                Err(e) => {
                    warn!("⚠️ 存储文件 {} 已损坏，按空存储处理: {}", path.display(), e);
                    Vec::new()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!("⚠️ 无法读取存储文件 {}: {}", path.display(), e);
                Vec::new()
            }
        };

        debug!("已加载 {} 份保存的试卷", tests.len());

        Self {
            path,
            quota_bytes,
            tests,
        }
    }

    /// 全部记录，新的在前
    pub fn list(&self) -> &[SavedTest] {
        &self.tests
    }

    pub fn get(&self, id: &str) -> Option<&SavedTest> {
        self.tests.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// 新增一条记录（放在最前）
    ///
    /// 写入失败时内存中的列表保持不变
    pub async fn add(&mut self, test: SavedTest) -> AppResult<()> {
        let mut next = Vec::with_capacity(self.tests.len() + 1);
        next.push(test);
        next.extend(self.tests.iter().cloned());

        self.persist(&next).await?;
        info!("💾 已保存试卷: {}", next[0].name);
        self.tests = next;
        Ok(())
    }

    /// 删除一条记录
    pub async fn delete(&mut self, id: &str) -> AppResult<SavedTest> {
        let position = self
            .tests
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| PersistenceError::NotFound { id: id.to_string() })?;

        let mut next = self.tests.clone();
        let removed = next.remove(position);

        self.persist(&next).await?;
        info!("🗑️ 已删除试卷: {}", removed.name);
        self.tests = next;
        Ok(removed)
    }

    /// 整体重写存储文件
    async fn persist(&self, tests: &[SavedTest]) -> Result<(), PersistenceError> {
        let content = serde_json::to_vec(tests).map_err(|e| self.failed(e))?;

        let needed = content.len() as u64;
        if needed > self.quota_bytes {
            warn!("存储空间不足: 需要 {} 字节，上限 {} 字节", needed, self.quota_bytes);
            return Err(PersistenceError::QuotaExceeded {
                needed,
                quota: self.quota_bytes,
            });
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e, needed))?;
        }

        // 先写临时文件再改名，写到一半中断时旧文件仍然完整
        let staging = self.staging_path();
        if let Err(e) = tokio::fs::write(&staging, &content).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(self.io_error(e, needed));
        }
        if let Err(e) = tokio::fs::rename(&staging, &self.path).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(self.io_error(e, needed));
        }

        debug!("存储文件已写入: {} ({} 字节)", self.path.display(), needed);
        Ok(())
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, err: std::io::Error, needed: u64) -> PersistenceError {
        if err.kind() == ErrorKind::StorageFull {
            PersistenceError::QuotaExceeded {
                needed,
                quota: self.quota_bytes,
            }
        } else {
            self.failed(err)
        }
    }

    fn failed(&self, reason: impl std::fmt::Display) -> PersistenceError {
        PersistenceError::Failed {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::exam::{CognitiveLevel, GeneratedTest, WrittenQuestion};
    use crate::models::form::FormConfig;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn saved(millis: i64, subject: &str) -> SavedTest {
        let test = GeneratedTest {
            written_questions: vec![WrittenQuestion {
                question_text: "Em hãy kể lại câu chuyện.".into(),
                suggested_answer: "...".into(),
                cognitive_level: CognitiveLevel::Application,
            }],
            ..Default::default()
        };
        let form = FormConfig {
            subject: subject.into(),
            ..Default::default()
        };
        let at = Utc.timestamp_millis_opt(millis).unwrap();
        SavedTest::at(at, &test, &form)
    }

    #[tokio::test]
    async fn newest_first_and_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store/saved.json");

        let mut store = SavedTestStore::open(&path, 1 << 20).await;
        assert!(store.is_empty());
        store.add(saved(1_000, "Toán")).await.unwrap();
        store.add(saved(2_000, "Tiếng Việt")).await.unwrap();

        let ids: Vec<&str> = store.list().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["2000", "1000"]);

        let reopened = SavedTestStore::open(&path, 1 << 20).await;
        assert_eq!(reopened.list(), store.list());
    }

    #[tokio::test]
    async fn delete_rewrites_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let mut store = SavedTestStore::open(&path, 1 << 20).await;
        store.add(saved(1_000, "Toán")).await.unwrap();
        store.add(saved(2_000, "Toán")).await.unwrap();

        let removed = store.delete("1000").await.unwrap();
        assert_eq!(removed.id, "1000");
        assert_eq!(store.len(), 1);

        let reopened = SavedTestStore::open(&path, 1 << 20).await;
        assert!(reopened.get("1000").is_none());
        assert!(reopened.get("2000").is_some());
    }

    #[tokio::test]
    async fn deleting_unknown_id_is_not_found() {
        let dir = tempdir().unwrap();
        let mut store = SavedTestStore::open(dir.path().join("s.json"), 1 << 20).await;
        let err = store.delete("42").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Persistence(PersistenceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn quota_exhaustion_is_recoverable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let mut store = SavedTestStore::open(&path, 1 << 20).await;
        store.add(saved(1_000, "Toán")).await.unwrap();
        let one_record = tokio::fs::metadata(&path).await.unwrap().len();

        let mut store = SavedTestStore::open(&path, one_record + 10).await;
        let err = store.add(saved(2_000, "Toán")).await.unwrap_err();
        assert!(err.is_quota_exceeded());
        assert_eq!(store.len(), 1);

        // 删掉旧的之后可以继续保存
        store.delete("1000").await.unwrap();
        store.add(saved(2_000, "Toán")).await.unwrap();
        assert_eq!(store.list()[0].id, "2000");
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = SavedTestStore::open(&path, 1 << 20).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn other_write_failures_are_not_quota_errors() {
        let dir = tempdir().unwrap();
        // 目标路径是一个目录，写入必然失败
        let path = dir.path().join("occupied");
        tokio::fs::create_dir(&path).await.unwrap();

        let mut store = SavedTestStore::open(&path, 1 << 20).await;
        let err = store.add(saved(1_000, "Toán")).await.unwrap_err();
        assert!(!err.is_quota_exceeded());
        assert!(matches!(
            err,
            AppError::Persistence(PersistenceError::Failed { .. })
        ));
    }

    #[tokio::test]
    async fn rewrite_replaces_file_without_leaving_staging_copy() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("saved.json");
        let staging = dir.path().join("saved.json.tmp");
        // 上次中断留下的半截临时文件
        std::fs::write(&staging, b"[{\"trunc").unwrap();

        let mut store = SavedTestStore::open(&path, 1_000_000).await;
        store.add(saved(1_000, "Toán")).await.unwrap();

        assert!(!staging.exists());
        let reopened = SavedTestStore::open(&path, 1_000_000).await;
        assert_eq!(reopened.len(), 1);
    }
}
