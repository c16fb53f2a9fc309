//! Bulk submission and bulk deletion against the exchange.
//!
//! The exchange has no bulk endpoint, so records are fanned out as single
//! create calls:
//!
//! ```text
//! records ──▶ chunk(concurrency) ──▶ [create ─fail─▶ wait ─▶ create] × chunk ──▶ wait ──▶ next chunk
//! ```
//!
//! Chunk N+1 starts only after chunk N has fully drained. Each record gets
//! exactly one retry. Individual failures never abort the run.

use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::client::{extract_offers, offer_id, OfferApi};
use crate::error::{ApiError, ApiResult};
use crate::models::OfferKind;

/// Pacing of a bulk submission.
#[derive(Debug, Clone, Copy)]
pub struct BulkOptions {
    /// Items in flight per chunk.
    pub concurrency: usize,
    /// Wait before the single retry of a failed item.
    pub retry_delay: Duration,
    /// Wait between chunks (not after the last).
    pub batch_delay: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            retry_delay: Duration::from_secs(1),
            batch_delay: Duration::from_secs(1),
        }
    }
}

/// A record that failed both attempts (or a deletion that failed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub original_index: usize,
    pub error_message: String,
}

/// Aggregate of a bulk submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkResult {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
    /// Created payloads, in completion order within each chunk.
    pub results: Vec<Value>,
    pub failures: Vec<ItemFailure>,
}

/// Aggregate of a delete-all run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAllResult {
    pub total: usize,
    pub deleted: usize,
    pub failed: usize,
    /// Offers without an identifier; logged, never deleted.
    pub skipped: usize,
    pub failures: Vec<ItemFailure>,
}

enum Outcome {
    Created(Value),
    Failed(String),
}

// =============================================================================
// Bulk submission
// =============================================================================

/// Submit `items` through `create` in paced chunks with one retry each.
///
/// `create` is called once per attempt with a clone of the item.
pub async fn submit_in_batches<T, F, Fut>(items: &[T], options: BulkOptions, create: F) -> BulkResult
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ApiResult<Value>>,
{
    let chunk_size = options.concurrency.max(1);
    let chunk_count = items.len().div_ceil(chunk_size);
    let mut result = BulkResult {
        total: items.len(),
        ..Default::default()
    };

    log_info(format!(
        "📤 Submitting {} records in {} chunk(s) of up to {}",
        items.len(),
        chunk_count,
        chunk_size
    ));

    for (chunk_index, chunk) in items.chunks(chunk_size).enumerate() {
        let offset = chunk_index * chunk_size;

        let mut in_flight: FuturesUnordered<_> = chunk
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let create = &create;
                async move { (offset + i, submit_one(item, create, options.retry_delay).await) }
            })
            .collect();

        while let Some((index, outcome)) = in_flight.next().await {
            match outcome {
                Outcome::Created(value) => {
                    result.created += 1;
                    result.results.push(value);
                }
                Outcome::Failed(error_message) => {
                    log_error(format!("Record {} failed: {}", index, error_message));
                    result.failed += 1;
                    result.failures.push(ItemFailure {
                        original_index: index,
                        error_message,
                    });
                }
            }
        }

        log_info(format!(
            "Chunk {}/{} done ({} created, {} failed so far)",
            chunk_index + 1,
            chunk_count,
            result.created,
            result.failed
        ));

        if chunk_index + 1 < chunk_count && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }
    }

    if result.failed == 0 {
        log_success(format!("All {} records created", result.created));
    } else {
        log_warning(format!("{} created, {} failed", result.created, result.failed));
    }

    result
}

async fn submit_one<T, F, Fut>(item: &T, create: &F, retry_delay: Duration) -> Outcome
where
    T: Clone,
    F: Fn(T) -> Fut,
    Fut: Future<Output = ApiResult<Value>>,
{
    let first = match create(item.clone()).await {
        Ok(value) => return Outcome::Created(value),
        Err(e) => e,
    };

    if !retry_delay.is_zero() {
        tokio::time::sleep(retry_delay).await;
    }

    match create(item.clone()).await {
        Ok(value) => Outcome::Created(value),
        Err(retry) => Outcome::Failed(format!("first attempt: {}; retry: {}", first, retry)),
    }
}

/// Submit offer payloads of one kind through an [`OfferApi`].
pub async fn submit_offers(
    api: &dyn OfferApi,
    kind: OfferKind,
    offers: &[Value],
    options: BulkOptions,
) -> BulkResult {
    log_info(format!("Posting {} {}s", offers.len(), kind.label()));
    submit_in_batches(offers, options, |offer: Value| async move {
        api.create(kind, &offer).await.map(|response| response.data)
    })
    .await
}

// =============================================================================
// Delete all
// =============================================================================

/// Delete every offer of `kind`, one at a time, `delay` apart.
///
/// Only the initial list call can fail the run.
pub async fn delete_all(
    api: &dyn OfferApi,
    kind: OfferKind,
    delay: Duration,
) -> Result<DeleteAllResult, ApiError> {
    let listed = api.list(kind).await?;
    let offers = extract_offers(&listed.data);
    let mut result = DeleteAllResult {
        total: offers.len(),
        ..Default::default()
    };

    if offers.is_empty() {
        log_info(format!("No {}s to delete", kind.label()));
        return Ok(result);
    }

    log_info(format!("🗑️  Deleting {} {}s", offers.len(), kind.label()));
    let mut issued = 0usize;

    for (index, offer) in offers.iter().enumerate() {
        let Some(id) = offer_id(offer) else {
            log_warning(format!("Offer {} has no identifier, skipped", index));
            result.skipped += 1;
            continue;
        };

        if issued > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        issued += 1;

        match api.delete(kind, &id).await {
            Ok(_) => result.deleted += 1,
            Err(e) => {
                log_error(format!("Delete {} failed: {}", id, e));
                result.failed += 1;
                result.failures.push(ItemFailure {
                    original_index: index,
                    error_message: format!("{}: {}", id, e),
                });
            }
        }
    }

    log_success(format!(
        "Deleted {}/{} {}s ({} failed, {} skipped)",
        result.deleted,
        result.total,
        kind.label(),
        result.failed,
        result.skipped
    ));

    Ok(result)
}
