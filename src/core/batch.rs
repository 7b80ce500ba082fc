use crate::domain::model::{BatchResult, TermInfo};
use crate::utils::error::{EnhanceError, Result};
use futures::future::join_all;
use std::future::Future;
use std::time::Instant;

/// 輸入列表中一段連續的用語
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub index: usize,
    /// 第一個用語在原始輸入中的位置
    pub offset: usize,
    pub terms: Vec<TermInfo>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// 將用語依固定大小切成 batch，保留原始順序
pub fn split_batches(terms: &[TermInfo], batch_size: usize) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        return Err(EnhanceError::input("batch_size", "must be at least 1"));
    }

    Ok(terms
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            offset: index * batch_size,
            terms: chunk.to_vec(),
        })
        .collect())
}

pub fn batch_count(total_terms: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    total_terms.div_ceil(batch_size)
}

pub fn round_count(total_batches: usize, concurrent_batches: usize) -> usize {
    if concurrent_batches == 0 {
        return 0;
    }
    total_batches.div_ceil(concurrent_batches)
}

/// 預估處理時間（秒），每回合以平均 batch 時間計
pub fn estimate_processing_time(
    total_terms: usize,
    batch_size: usize,
    concurrent_batches: usize,
    avg_batch_secs: f64,
) -> f64 {
    let rounds = round_count(batch_count(total_terms, batch_size), concurrent_batches);
    rounds as f64 * avg_batch_secs
}

/// 回合制排程：每回合最多 `concurrent_batches` 個 batch 同時執行，
/// 整個回合結束後才開始下一回合。
///
/// 例如 33 個用語、batch 大小 5、同時 3 個：
/// Round 1: A(1-5) B(6-10) C(11-15)
/// Round 2: D(16-20) E(21-25) F(26-30)
/// Round 3: G(31-33)
#[derive(Debug, Clone, Copy)]
pub struct RoundRobinScheduler {
    concurrent_batches: usize,
}

impl RoundRobinScheduler {
    pub fn new(concurrent_batches: usize) -> Result<Self> {
        if concurrent_batches == 0 {
            return Err(EnhanceError::input("concurrent_batches", "must be at least 1"));
        }
        Ok(Self { concurrent_batches })
    }

    pub fn rounds(&self, batches: Vec<Batch>) -> Vec<Vec<Batch>> {
        let mut rounds = Vec::with_capacity(round_count(batches.len(), self.concurrent_batches));
        let mut current = Vec::with_capacity(self.concurrent_batches);
        for batch in batches {
            current.push(batch);
            if current.len() == self.concurrent_batches {
                rounds.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            rounds.push(current);
        }
        rounds
    }

    /// 執行所有 batch；單一 batch 的失敗由 `run_batch` 轉成失敗的 `BatchResult`，
    /// 不會取消同回合或之後的 batch。結果依原始位置排序。
    pub async fn schedule<F, Fut>(&self, batches: Vec<Batch>, run_batch: F) -> Vec<BatchResult>
    where
        F: Fn(Batch) -> Fut,
        Fut: Future<Output = BatchResult>,
    {
        let total_batches = batches.len();
        let rounds = self.rounds(batches);
        let total_rounds = rounds.len();
        let mut results = Vec::with_capacity(total_batches);

        for (round_index, round) in rounds.into_iter().enumerate() {
            let started = Instant::now();
            let width = round.len();
            tracing::debug!(
                "📦 Round {}/{}: running {} batches concurrently",
                round_index + 1,
                total_rounds,
                width
            );

            let round_results = join_all(round.into_iter().map(&run_batch)).await;
            let failed = round_results.iter().filter(|r| !r.is_success()).count();

            tracing::info!(
                "📦 Round {}/{} finished in {:?} ({} ok, {} failed)",
                round_index + 1,
                total_rounds,
                started.elapsed(),
                width - failed,
                failed
            );
            results.extend(round_results);
        }

        results.sort_by_key(|r| r.offset);
        results
    }
}
