//! 删除 worker 池
//!
//! 生命周期：`new` → `start` → 运行中（接受 `submit`）→ `shutdown`（关闭队列、排空）→ 结束。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinSet;
use tokio::time::{Instant, sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{DeleteBatch, DeleteRequest, DeleteService, DeleteWorkerConfig};
use crate::errors::{Result, ShortenerError};

/// 强制取消后等待 worker 完成最后一次刷盘的时间上限，超时直接 abort。
/// 实际宽限取该值与 `deadline / 2` 中的较小者。
const FORCE_EXIT_GRACE: Duration = Duration::from_millis(500);

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<DeleteRequest>>>;

/// 删除池状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub worker_count: usize,
}

/// 批量删除 worker 池
///
/// 所有 worker 共享同一个有界队列，每个 worker 维护自己的 [`DeleteBatch`]。
/// 被 drop 时未调用 [`shutdown`](Self::shutdown) 的 worker 会被直接 abort，
/// 尚未刷盘的批次随之丢弃。
pub struct DeleteWorkerPool {
    service: Arc<dyn DeleteService>,
    config: DeleteWorkerConfig,
    /// shutdown 时取走，队列在所有在途 submit 结束后关闭
    sender: RwLock<Option<mpsc::Sender<DeleteRequest>>>,
    receiver: SharedReceiver,
    /// 已入队但尚未被 worker 取出的请求数
    queued: Arc<AtomicUsize>,
    /// shutdown 开始：拒绝新的 submit，唤醒阻塞中的 submit
    closing: CancellationToken,
    /// 排空超时：通知 worker 立即刷盘退出
    cancel: CancellationToken,
    workers: Mutex<JoinSet<()>>,
    started: AtomicBool,
    shutdown_started: AtomicBool,
}

impl DeleteWorkerPool {
    /// 为 0 的数量或超时会被提升到最小可运行值，见 [`DeleteWorkerConfig::clamped`]
    pub fn new(service: Arc<dyn DeleteService>, config: DeleteWorkerConfig) -> Self {
        let clamped = config.clamped();
        if clamped != config {
            warn!(
                requested = ?config,
                effective = ?clamped,
                "DeleteWorkerPool: invalid config values raised to minimum"
            );
        }
        let config = clamped;
        let (sender, receiver) = mpsc::channel(config.queue_capacity);

        Self {
            service,
            config,
            sender: RwLock::new(Some(sender)),
            receiver: Arc::new(tokio::sync::Mutex::new(receiver)),
            queued: Arc::new(AtomicUsize::new(0)),
            closing: CancellationToken::new(),
            cancel: CancellationToken::new(),
            workers: Mutex::new(JoinSet::new()),
            started: AtomicBool::new(false),
            shutdown_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DeleteWorkerConfig {
        &self.config
    }

    /// 启动 `worker_count` 个 worker，必须在 tokio runtime 内调用
    pub fn start(&self) {
        // 持锁与 shutdown 互斥，避免 shutdown 取走 JoinSet 后再 spawn
        let mut workers = self.workers.lock();
        if self.started.swap(true, Ordering::AcqRel) {
            warn!("DeleteWorkerPool: start() called more than once or after shutdown, ignoring");
            return;
        }

        info!(
            workers = self.config.worker_count,
            batch_size = self.config.batch_size,
            batch_timeout = ?self.config.batch_timeout,
            "Starting delete worker pool"
        );

        for worker_id in 0..self.config.worker_count {
            workers.spawn(run_worker(WorkerContext {
                worker_id,
                receiver: Arc::clone(&self.receiver),
                service: Arc::clone(&self.service),
                queued: Arc::clone(&self.queued),
                cancel: self.cancel.clone(),
                batch_size: self.config.batch_size,
                batch_timeout: self.config.batch_timeout,
            }));
        }
    }

    /// 提交删除请求
    ///
    /// 队列有空位时立即返回；队列已满时等待空位，期间若开始 shutdown 则返回
    /// `Cancelled`。返回 `Ok` 只代表请求已入队，不代表已删除。
    pub async fn submit(&self, user_id: impl Into<String>, url_ids: Vec<String>) -> Result<()> {
        if self.closing.is_cancelled() {
            return Err(shutting_down());
        }
        let user_id = user_id.into();
        if url_ids.is_empty() {
            trace!(user_id = %user_id, "DeleteWorkerPool: empty delete request skipped");
            return Ok(());
        }

        let sender = self.sender.read().clone();
        let Some(sender) = sender else {
            return Err(shutting_down());
        };

        let permit = match sender.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => {
                warn!(
                    user_id = %user_id,
                    url_count = url_ids.len(),
                    "Delete queue is full, blocking"
                );
                tokio::select! {
                    biased;
                    _ = self.closing.cancelled() => return Err(shutting_down()),
                    permit = sender.reserve() => permit.map_err(|_| shutting_down())?,
                }
            }
            Err(TrySendError::Closed(())) => return Err(shutting_down()),
        };

        let url_count = url_ids.len();
        self.queued.fetch_add(1, Ordering::AcqRel);
        permit.send(DeleteRequest {
            user_id: user_id.clone(),
            url_ids,
        });

        debug!(user_id = %user_id, url_count, "Delete request submitted");
        Ok(())
    }

    /// 关闭队列并等待所有 worker 排空退出
    ///
    /// 超过 `deadline` 仍未完成时广播取消（worker 会再尝试刷盘一次后退出），
    /// 并返回 `DeadlineExceeded`。从未 `start` 过的池在当前任务内排空队列。
    /// 返回 `Ok` 表示所有已入队请求都已交给 [`DeleteService`]。
    /// 重复调用直接返回 `Ok`。
    pub async fn shutdown(&self, deadline: Duration) -> Result<()> {
        if self.shutdown_started.swap(true, Ordering::AcqRel) {
            debug!("DeleteWorkerPool: shutdown already in progress or finished");
            return Ok(());
        }

        info!("Shutting down delete worker pool");
        self.closing.cancel();
        self.sender.write().take();

        let (was_started, mut workers) = {
            let mut guard = self.workers.lock();
            (
                self.started.swap(true, Ordering::AcqRel),
                std::mem::take(&mut *guard),
            )
        };

        if !was_started {
            info!(
                queued = self.queued.load(Ordering::Acquire),
                "DeleteWorkerPool: shutdown before start, draining queue inline"
            );
            if timeout(deadline, self.drain_inline()).await.is_ok() {
                return Ok(());
            }
            warn!(
                remaining = self.queued.load(Ordering::Acquire),
                "DeleteWorkerPool: inline drain timeout"
            );
            return Err(deadline_exceeded(deadline));
        }

        if timeout(deadline, join_all(&mut workers)).await.is_ok() {
            info!("Delete worker pool shut down gracefully");
            return Ok(());
        }

        warn!(
            remaining = workers.len(),
            "Delete worker pool shutdown timeout, forcing shutdown"
        );
        self.cancel.cancel();

        let grace = FORCE_EXIT_GRACE.min(deadline / 2);
        if timeout(grace, join_all(&mut workers)).await.is_err() {
            error!(
                remaining = workers.len(),
                "Delete workers did not exit after cancellation, aborting"
            );
            workers.shutdown().await;
        }

        Err(deadline_exceeded(deadline))
    }

    /// 没有 worker 时由调用方直接消费队列，直到所有发送端释放
    async fn drain_inline(&self) {
        let mut batch = DeleteBatch::new();
        let mut receiver = self.receiver.lock().await;
        while let Some(request) = receiver.recv().await {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            if batch.merge(request) >= self.config.batch_size {
                batch.flush(self.service.as_ref(), INLINE_WORKER_ID).await;
            }
        }
        batch.flush(self.service.as_ref(), INLINE_WORKER_ID).await;
    }

    pub fn is_shutting_down(&self) -> bool {
        self.closing.is_cancelled()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            queue_size: self
                .queued
                .load(Ordering::Acquire)
                .min(self.config.queue_capacity),
            queue_capacity: self.config.queue_capacity,
            worker_count: self.config.worker_count,
        }
    }
}

/// 排空未启动池时日志里使用的 worker 编号
const INLINE_WORKER_ID: usize = usize::MAX;

fn deadline_exceeded(deadline: Duration) -> ShortenerError {
    ShortenerError::deadline_exceeded(format!(
        "delete worker pool did not drain within {:?}",
        deadline
    ))
}

fn shutting_down() -> ShortenerError {
    ShortenerError::cancelled("delete worker pool is shutting down")
}

async fn join_all(workers: &mut JoinSet<()>) {
    while let Some(result) = workers.join_next().await {
        if let Err(e) = result
            && e.is_panic()
        {
            error!("Delete worker panicked: {}", e);
        }
    }
}

struct WorkerContext {
    worker_id: usize,
    receiver: SharedReceiver,
    service: Arc<dyn DeleteService>,
    queued: Arc<AtomicUsize>,
    cancel: CancellationToken,
    batch_size: usize,
    batch_timeout: Duration,
}

async fn recv_shared(receiver: &SharedReceiver) -> Option<DeleteRequest> {
    receiver.lock().await.recv().await
}

/// worker 主循环：取消 / 队列 / 空闲定时器，谁先就绪处理谁
async fn run_worker(ctx: WorkerContext) {
    let WorkerContext {
        worker_id,
        receiver,
        service,
        queued,
        cancel,
        batch_size,
        batch_timeout,
    } = ctx;

    debug!(worker_id, "Delete worker started");

    let mut batch = DeleteBatch::new();
    // 定时器只在批次从空变为非空时启动，不随后续请求重置
    let timer = sleep(batch_timeout);
    tokio::pin!(timer);
    let mut timer_armed = false;

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                debug!(worker_id, "Delete worker shutting down");
                batch.flush(service.as_ref(), worker_id).await;
                return;
            }

            _ = &mut timer, if timer_armed => {
                timer_armed = false;
                trace!(worker_id, urls = batch.total(), "Batch timeout reached");
                batch.flush(service.as_ref(), worker_id).await;
            }

            request = recv_shared(&receiver) => {
                let Some(request) = request else {
                    debug!(worker_id, "Delete queue closed, processing remaining batch");
                    batch.flush(service.as_ref(), worker_id).await;
                    return;
                };
                queued.fetch_sub(1, Ordering::AcqRel);

                let was_empty = batch.is_empty();
                if batch.merge(request) >= batch_size {
                    timer_armed = false;
                    batch.flush(service.as_ref(), worker_id).await;
                } else if was_empty {
                    timer.as_mut().reset(Instant::now() + batch_timeout);
                    timer_armed = true;
                }
            }
        }
    }
}
