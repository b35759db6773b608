//! DeleteWorkerPool 性能基准测试

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use url_shortener::worker::{DeleteService, DeleteWorkerConfig, DeleteWorkerPool};

/// 空删除服务，只测量队列与批次开销
struct NoopDeleteService;

#[async_trait::async_trait]
impl DeleteService for NoopDeleteService {
    async fn delete_user_urls(&self, _user_id: &str, _url_ids: &[String]) -> anyhow::Result<()> {
        Ok(())
    }
}

fn create_pool(workers: usize) -> Arc<DeleteWorkerPool> {
    Arc::new(DeleteWorkerPool::new(
        Arc::new(NoopDeleteService),
        DeleteWorkerConfig {
            worker_count: workers,
            queue_capacity: 1024,
            batch_size: 64,
            batch_timeout: Duration::from_millis(5),
        },
    ))
}

/// 单生产者提交 + 关闭排空
fn bench_submit_and_drain(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("submit_and_drain");

    for workers in [1, 4, 8] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(BenchmarkId::new("workers", workers), &workers, |b, &workers| {
            b.to_async(&rt).iter(|| async move {
                let pool = create_pool(workers);
                pool.start();
                for i in 0..1000 {
                    pool.submit(format!("user_{}", i % 16), vec![format!("url_{}", i)])
                        .await
                        .unwrap();
                }
                pool.shutdown(Duration::from_secs(5)).await.unwrap();
            });
        });
    }

    group.finish();
}

/// 多生产者并发提交
fn bench_concurrent_submit(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("concurrent_submit");

    for producers in [2, 8, 16] {
        group.throughput(Throughput::Elements(1000));
        group.bench_with_input(
            BenchmarkId::new("producers", producers),
            &producers,
            |b, &producers| {
                b.to_async(&rt).iter(|| async move {
                    let pool = create_pool(4);
                    pool.start();

                    let mut handles = vec![];
                    for p in 0..producers {
                        let pool = Arc::clone(&pool);
                        handles.push(tokio::spawn(async move {
                            for i in 0..1000 / producers {
                                pool.submit(format!("user_{}", p), vec![format!("url_{}_{}", p, i)])
                                    .await
                                    .unwrap();
                            }
                        }));
                    }
                    for handle in handles {
                        handle.await.unwrap();
                    }

                    pool.shutdown(Duration::from_secs(5)).await.unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_submit_and_drain, bench_concurrent_submit);
criterion_main!(benches);
