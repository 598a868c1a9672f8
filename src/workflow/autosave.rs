//! 表单自动保存
//!
//! 每个 (用户, 条目) 一个后台任务。编辑通过 mpsc 送入，静默期内没有新的编辑
//! 才真正保存；保存状态通过 watch 通道发布。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::EntryDraft;
use crate::services::EntryService;

/// 自动保存的落盘目标
pub trait DraftSink: Send + Sync + 'static {
    fn save(&self, user_id: &str, entry_id: Uuid, draft: EntryDraft) -> BoxFuture<'_, AppResult<()>>;
}

impl DraftSink for EntryService {
    fn save(&self, user_id: &str, entry_id: Uuid, draft: EntryDraft) -> BoxFuture<'_, AppResult<()>> {
        let user_id = user_id.to_string();
        Box::pin(async move {
            self.save_entry(&user_id, entry_id, draft).await?;
            Ok(())
        })
    }
}

/// 自动保存状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveStatus {
    /// 最近一次成功保存的时间
    pub last_saved: Option<DateTime<Utc>>,
    pub is_saving: bool,
    /// 最近一次保存失败的原因，成功后清空
    pub last_error: Option<String>,
    /// 成功保存的次数
    pub saves: u64,
}

/// 单个条目的自动保存任务句柄
///
/// 句柄被丢弃后任务退出，静默期内尚未保存的编辑一并丢弃。
/// 空闲超过 `idle` 时任务也会自行退出，之后的编辑会失败，需要重新创建。
pub struct Autosaver {
    edits: mpsc::UnboundedSender<EntryDraft>,
    status: watch::Receiver<AutosaveStatus>,
}

/// 后台任务的固定参数
struct Worker {
    status: watch::Sender<AutosaveStatus>,
    sink: Arc<dyn DraftSink>,
    user_id: String,
    entry_id: Uuid,
    quiet: Duration,
    idle: Duration,
}

impl Autosaver {
    pub fn spawn(
        sink: Arc<dyn DraftSink>,
        user_id: impl Into<String>,
        entry_id: Uuid,
        quiet: Duration,
        idle: Duration,
    ) -> Self {
        let (edits, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(AutosaveStatus::default());

        let worker = Worker {
            status: status_tx,
            sink,
            user_id: user_id.into(),
            entry_id,
            quiet,
            idle,
        };
        tokio::spawn(worker.run(rx));

        Self { edits, status }
    }

    /// 提交一次编辑，重新开始计时
    pub fn edit(&self, draft: EntryDraft) -> AppResult<()> {
        self.edits
            .send(draft)
            .map_err(|_| AppError::Other("自动保存任务已退出".to_string()))
    }

    pub fn status(&self) -> AutosaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AutosaveStatus> {
        self.status.clone()
    }

    fn is_alive(&self) -> bool {
        !self.edits.is_closed()
    }
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<EntryDraft>) {
        debug!("[条目 #{}] 自动保存任务启动", self.entry_id);

        loop {
            let mut draft = match timeout(self.idle, rx.recv()).await {
                Ok(Some(draft)) => draft,
                Ok(None) => break,
                Err(_) => {
                    // 关闭通道后再取一次，避免丢掉刚好在超时时送达的编辑
                    rx.close();
                    let mut late = None;
                    while let Ok(draft) = rx.try_recv() {
                        late = Some(draft);
                    }
                    if let Some(draft) = late {
                        self.save(draft).await;
                    }
                    debug!("[条目 #{}] 自动保存任务空闲退出", self.entry_id);
                    return;
                }
            };

            // 静默期内的新编辑覆盖旧编辑并重新计时
            loop {
                match timeout(self.quiet, rx.recv()).await {
                    Ok(Some(newer)) => draft = newer,
                    Ok(None) => {
                        debug!(
                            "[条目 #{}] 自动保存任务退出，丢弃未保存的编辑",
                            self.entry_id
                        );
                        return;
                    }
                    Err(_) => break,
                }
            }

            self.save(draft).await;
        }

        debug!("[条目 #{}] 自动保存任务结束", self.entry_id);
    }

    async fn save(&self, draft: EntryDraft) {
        self.status.send_modify(|s| s.is_saving = true);

        match self.sink.save(&self.user_id, self.entry_id, draft).await {
            Ok(()) => {
                debug!("[条目 #{}] 💾 自动保存完成", self.entry_id);
                self.status.send_modify(|s| {
                    s.is_saving = false;
                    s.last_saved = Some(crate::models::now());
                    s.last_error = None;
                    s.saves += 1;
                });
            }
            Err(e) => {
                warn!("[条目 #{}] ⚠️ 自动保存失败: {}", self.entry_id, e);
                self.status.send_modify(|s| {
                    s.is_saving = false;
                    s.last_error = Some(e.to_string());
                });
            }
        }
    }
}

type WorkerKey = (String, Uuid);

/// 所有自动保存任务，按 (用户, 条目) 索引
///
/// 已退出的任务在下一次 `edit` / `status` 时清理。
pub struct AutosaveRegistry {
    sink: Arc<dyn DraftSink>,
    quiet: Duration,
    idle: Duration,
    workers: Mutex<HashMap<WorkerKey, Autosaver>>,
}

impl AutosaveRegistry {
    pub fn new(sink: Arc<dyn DraftSink>, quiet: Duration, idle: Duration) -> Self {
        Self {
            sink,
            quiet,
            idle,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// 把编辑送入对应的任务，没有任务或任务已退出时重新创建
    pub fn edit(&self, user_id: &str, entry_id: Uuid, draft: EntryDraft) -> AppResult<AutosaveStatus> {
        let mut workers = self.lock()?;
        workers.retain(|_, worker| worker.is_alive());

        let worker = workers
            .entry((user_id.to_string(), entry_id))
            .or_insert_with(|| {
                Autosaver::spawn(self.sink.clone(), user_id, entry_id, self.quiet, self.idle)
            });

        worker.edit(draft)?;
        Ok(worker.status())
    }

    /// 任务已退出时返回它最后的状态，然后清理
    pub fn status(&self, user_id: &str, entry_id: Uuid) -> AppResult<AutosaveStatus> {
        let mut workers = self.lock()?;
        let status = workers
            .get(&(user_id.to_string(), entry_id))
            .map(Autosaver::status)
            .unwrap_or_default();
        workers.retain(|_, worker| worker.is_alive());
        Ok(status)
    }

    /// 丢弃条目的任务（条目删除时调用）
    pub fn remove(&self, user_id: &str, entry_id: Uuid) -> AppResult<()> {
        self.lock()?.remove(&(user_id.to_string(), entry_id));
        Ok(())
    }

    /// 当前登记的任务数
    pub fn worker_count(&self) -> AppResult<usize> {
        Ok(self.lock()?.len())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, HashMap<WorkerKey, Autosaver>>> {
        self.workers
            .lock()
            .map_err(|_| AppError::Other("自动保存注册表锁已损坏".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;
    use tokio_test::{assert_err, assert_ok};

    #[derive(Default)]
    struct RecordingSink {
        saved: Mutex<Vec<EntryDraft>>,
        fail: bool,
    }

    impl DraftSink for RecordingSink {
        fn save(&self, _user_id: &str, _entry_id: Uuid, draft: EntryDraft) -> BoxFuture<'_, AppResult<()>> {
            Box::pin(async move {
                if self.fail {
                    return Err(AppError::Other("disk full".to_string()));
                }
                self.saved.lock().unwrap().push(draft);
                Ok(())
            })
        }
    }

    fn draft(question: &str) -> EntryDraft {
        EntryDraft {
            question: question.to_string(),
            ..EntryDraft::default()
        }
    }

    const QUIET: Duration = Duration::from_millis(1000);
    const IDLE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_three_quick_edits_save_once() {
        let sink = Arc::new(RecordingSink::default());
        let saver = Autosaver::spawn(sink.clone(), "alice", Uuid::new_v4(), QUIET, IDLE);

        assert_ok!(saver.edit(draft("W")));
        sleep(Duration::from_millis(300)).await;
        assert_ok!(saver.edit(draft("Wh")));
        sleep(Duration::from_millis(300)).await;
        assert_ok!(saver.edit(draft("Wha")));

        sleep(Duration::from_millis(999)).await;
        assert!(sink.saved.lock().unwrap().is_empty());
        assert_eq!(saver.status().saves, 0);

        sleep(Duration::from_millis(10)).await;
        let saved = sink.saved.lock().unwrap().clone();
        assert_eq!(saved, vec![draft("Wha")]);

        let status = saver.status();
        assert_eq!(status.saves, 1);
        assert!(status.last_saved.is_some());
        assert!(!status.is_saving);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bursts_save_separately() {
        let sink = Arc::new(RecordingSink::default());
        let saver = Autosaver::spawn(sink.clone(), "alice", Uuid::new_v4(), QUIET, IDLE);

        assert_ok!(saver.edit(draft("first")));
        sleep(Duration::from_millis(1500)).await;
        assert_ok!(saver.edit(draft("second")));
        sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            sink.saved.lock().unwrap().clone(),
            vec![draft("first"), draft("second")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_reported_not_retried() {
        let sink = Arc::new(RecordingSink {
            fail: true,
            ..RecordingSink::default()
        });
        let saver = Autosaver::spawn(sink, "alice", Uuid::new_v4(), QUIET, IDLE);
        let mut updates = saver.subscribe();

        assert_ok!(saver.edit(draft("x")));
        sleep(Duration::from_millis(1100)).await;

        assert!(assert_ok!(updates.has_changed()));
        let status = updates.borrow_and_update().clone();
        assert_eq!(status.saves, 0);
        assert_eq!(status.last_error.as_deref(), Some("错误: disk full"));
        assert!(!status.is_saving);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_keeps_one_worker_per_entry() {
        let sink = Arc::new(RecordingSink::default());
        let registry = AutosaveRegistry::new(sink.clone(), QUIET, IDLE);
        let entry_id = Uuid::new_v4();

        assert_ok!(registry.edit("alice", entry_id, draft("a")));
        assert_ok!(registry.edit("alice", entry_id, draft("ab")));
        assert_ok!(registry.edit("bob", entry_id, draft("b")));
        sleep(Duration::from_millis(1100)).await;

        assert_eq!(sink.saved.lock().unwrap().len(), 2);
        assert_eq!(assert_ok!(registry.status("alice", entry_id)).saves, 1);
        assert_eq!(
            assert_ok!(registry.status("carol", entry_id)),
            AutosaveStatus::default()
        );

        assert_ok!(registry.remove("alice", entry_id));
        assert_eq!(assert_ok!(registry.status("alice", entry_id)).saves, 0);
    }

    #[tokio::test]
    async fn test_edit_after_worker_exit_fails() {
        let (edits, rx) = mpsc::unbounded_channel();
        drop(rx);
        let (_tx, status) = watch::channel(AutosaveStatus::default());
        let saver = Autosaver { edits, status };

        assert!(!saver.is_alive());
        assert_err!(saver.edit(draft("late")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_exits_and_is_evicted() {
        let sink = Arc::new(RecordingSink::default());
        let registry = AutosaveRegistry::new(sink.clone(), QUIET, IDLE);
        let entry_id = Uuid::new_v4();

        assert_ok!(registry.edit("alice", entry_id, draft("a")));
        assert_ok!(registry.edit("bob", Uuid::new_v4(), draft("b")));
        assert_eq!(assert_ok!(registry.worker_count()), 2);

        sleep(QUIET + IDLE + Duration::from_millis(100)).await;
        assert_eq!(sink.saved.lock().unwrap().len(), 2);

        // 退出的任务仍能报告最后的状态，随后被清理
        assert_eq!(assert_ok!(registry.status("alice", entry_id)).saves, 1);
        assert_eq!(assert_ok!(registry.worker_count()), 0);

        // 再次编辑会重新创建任务
        assert_ok!(registry.edit("alice", entry_id, draft("again")));
        assert_eq!(assert_ok!(registry.worker_count()), 1);
        sleep(QUIET + Duration::from_millis(10)).await;
        assert_eq!(sink.saved.lock().unwrap().last(), Some(&draft("again")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_active_worker_is_not_evicted() {
        let sink = Arc::new(RecordingSink::default());
        let saver = Autosaver::spawn(sink.clone(), "alice", Uuid::new_v4(), QUIET, IDLE);

        for i in 0..3 {
            sleep(IDLE - Duration::from_secs(1)).await;
            assert_ok!(saver.edit(draft(&i.to_string())));
        }
        assert!(saver.is_alive());

        sleep(QUIET + IDLE + Duration::from_millis(100)).await;
        assert!(!saver.is_alive());
        assert_err!(saver.edit(draft("late")));
        assert_eq!(sink.saved.lock().unwrap().len(), 3);
    }
}
