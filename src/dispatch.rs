// src/dispatch.rs
//! Parallel classification over contiguous chunks.
//!
//! partition -> validate chunk uniformity -> one task per chunk -> gather in
//! chunk order -> flatten. Chunks are positional and non-overlapping, so the
//! flattened result lines up with the caller's input order.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tokio::task::JoinSet;

use crate::classify::{Batch, ClassifierInput, DynClassifier, Prediction};
use crate::error::{PipelineError, Result};
use crate::model::{Classification, ValidatedItem};

pub const DEFAULT_WORKER_TIMEOUT: Duration = Duration::from_secs(30);

/// Split `items` into at most `workers` contiguous, non-empty chunks.
///
/// `size = n / workers` after clamping `workers` to `n`; the remainder goes to
/// the last chunk. No items means no chunks.
pub fn partition<T>(items: &[T], workers: usize) -> Result<Vec<&[T]>> {
    if workers < 1 {
        return Err(PipelineError::InvalidWorkerCount(workers));
    }
    let n = items.len();
    if n == 0 {
        return Ok(Vec::new());
    }
    let effective = workers.min(n);
    let size = n / effective;

    let mut chunks = Vec::with_capacity(effective);
    for i in 0..effective {
        let start = i * size;
        let end = if i + 1 == effective { n } else { start + size };
        chunks.push(&items[start..end]);
    }
    Ok(chunks)
}

/// Turn one chunk into a uniform batch. Mixed representations or malformed
/// token inputs are rejected.
pub fn build_batch(chunk: &[ClassifierInput]) -> Result<Batch> {
    match chunk.first() {
        None | Some(ClassifierInput::Text(_)) => {
            let mut texts = Vec::with_capacity(chunk.len());
            for (i, input) in chunk.iter().enumerate() {
                match input {
                    ClassifierInput::Text(t) => texts.push(t.clone()),
                    ClassifierInput::Prepared(_) => {
                        return Err(PipelineError::MalformedBatch(format!(
                            "chunk mixes raw text and prepared inputs (position {i})"
                        )))
                    }
                }
            }
            Ok(Batch::Raw(texts))
        }
        Some(ClassifierInput::Prepared(_)) => {
            let mut prepared = Vec::with_capacity(chunk.len());
            for (i, input) in chunk.iter().enumerate() {
                match input {
                    ClassifierInput::Prepared(p) if p.is_well_formed() => prepared.push(p.clone()),
                    ClassifierInput::Prepared(_) => {
                        return Err(PipelineError::MalformedBatch(format!(
                            "prepared input at position {i} needs input_ids and an attention_mask of equal length"
                        )))
                    }
                    ClassifierInput::Text(_) => {
                        return Err(PipelineError::MalformedBatch(format!(
                            "chunk mixes prepared inputs and raw text (position {i})"
                        )))
                    }
                }
            }
            Ok(Batch::Prepared(prepared))
        }
    }
}

/// Runs one classifier profile over a bounded pool of worker tasks.
#[derive(Clone)]
pub struct Dispatcher {
    classifier: DynClassifier,
    workers: usize,
    timeout: Duration,
    prefer_prepared: bool,
}

impl Dispatcher {
    pub fn new(classifier: DynClassifier, workers: usize, timeout: Duration) -> Result<Self> {
        if workers < 1 {
            return Err(PipelineError::InvalidWorkerCount(workers));
        }
        Ok(Self {
            classifier,
            workers,
            timeout,
            prefer_prepared: false,
        })
    }

    /// Forward pre-tokenized inputs when every item carries one.
    pub fn prefer_prepared(mut self, yes: bool) -> Self {
        self.prefer_prepared = yes;
        self
    }

    pub fn profile(&self) -> &str {
        self.classifier.profile()
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Classify inputs in parallel. Output is aligned with `inputs`.
    ///
    /// Every chunk is checked before any worker starts. The first failing
    /// worker (error, timeout, wrong prediction count, panic) aborts the
    /// remaining ones and the partial results are dropped.
    pub async fn classify(&self, inputs: &[ClassifierInput]) -> Result<Vec<Prediction>> {
        let chunks = partition(inputs, self.workers)?;
        let batches = chunks
            .iter()
            .map(|c| build_batch(c))
            .collect::<Result<Vec<_>>>()?;
        if batches.is_empty() {
            return Ok(Vec::new());
        }

        let profile = self.profile().to_string();
        let t0 = Instant::now();
        let mut set = JoinSet::new();
        for (idx, batch) in batches.into_iter().enumerate() {
            let classifier = Arc::clone(&self.classifier);
            let timeout = self.timeout;
            set.spawn(async move {
                let expected = batch.len();
                let out = match tokio::time::timeout(timeout, classifier.classify(batch)).await {
                    Err(_) => Err(format!("chunk {idx} timed out after {timeout:?}")),
                    Ok(Err(e)) => Err(format!("chunk {idx}: {e:#}")),
                    Ok(Ok(preds)) if preds.len() != expected => Err(format!(
                        "chunk {idx}: {} predictions for {expected} inputs",
                        preds.len()
                    )),
                    Ok(Ok(preds)) => Ok(preds),
                };
                (idx, out)
            });
        }

        let mut slots: Vec<Option<Vec<Prediction>>> = vec![None; set.len()];
        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok((idx, Ok(preds))) => {
                    slots[idx] = Some(preds);
                    continue;
                }
                Ok((_, Err(reason))) => reason,
                Err(e) => format!("worker task failed: {e}"),
            };
            set.abort_all();
            counter!("pipeline_worker_failures_total").increment(1);
            tracing::warn!(profile = %profile, reason = %failure, "classification worker failed, aborting call");
            return Err(PipelineError::unavailable(profile, failure));
        }

        histogram!("pipeline_classify_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        let mut out = Vec::with_capacity(inputs.len());
        for (idx, slot) in slots.into_iter().enumerate() {
            let preds = slot.ok_or_else(|| {
                PipelineError::unavailable(profile.clone(), format!("chunk {idx} returned nothing"))
            })?;
            out.extend(preds);
        }
        Ok(out)
    }

    /// Classify validated items and attach each prediction to its item id.
    pub async fn classify_items(&self, items: &[ValidatedItem]) -> Result<Vec<Classification>> {
        let use_prepared = self.prefer_prepared
            && !items.is_empty()
            && items.iter().all(|it| it.prepared().is_some());
        let inputs: Vec<ClassifierInput> = items
            .iter()
            .map(|it| match (use_prepared, it.prepared()) {
                (true, Some(p)) => ClassifierInput::Prepared(p.clone()),
                _ => ClassifierInput::Text(it.content().to_string()),
            })
            .collect();

        let preds = self.classify(&inputs).await?;
        counter!("pipeline_classified_total").increment(preds.len() as u64);
        Ok(items
            .iter()
            .zip(preds)
            .map(|(it, p)| Classification {
                item_id: it.id().to_string(),
                label: p.label,
                confidence: p.confidence,
            })
            .collect())
    }
}
