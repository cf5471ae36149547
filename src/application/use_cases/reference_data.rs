use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{Semaphore, mpsc};
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::PaymentProviderPort,
    domain::entities::{price::Price, reference::ReferenceEntity, tax_rate::TaxRate},
};

// ============================================================================
// Constants
// ============================================================================

/// Added to the hardware parallelism when sizing the fetch semaphore.
pub const DEFAULT_LOADER_HEADROOM: usize = 10;

const ERROR_CHANNEL_CAPACITY: usize = 16;

/// A single id that could not be fetched. Never aborts the batch.
#[derive(Error, Debug)]
#[error("failed to load reference {id}: {source}")]
pub struct ReferenceLoadError {
    pub id: String,
    #[source]
    pub source: AppError,
}

/// Outcome counts of one load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub requested: usize,
    pub failed: usize,
    pub added: usize,
}

/// Read reference ids, one per line. Blank lines and lines starting with `#`
/// (after leading whitespace) are skipped; ids are trimmed.
pub async fn parse_reference_ids<R>(reader: R) -> AppResult<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut ids = Vec::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| AppError::InvalidInput(format!("failed to read reference ids: {}", e)))?
    {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        ids.push(line.to_string());
    }
    Ok(ids)
}

/// Number of concurrent fetches allowed for a given headroom.
pub fn loader_concurrency(headroom: usize) -> usize {
    let parallelism = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    parallelism + headroom
}

#[derive(Debug)]
struct TableInner<T> {
    ids: HashSet<String>,
    by_key: HashMap<String, T>,
    entries: Vec<T>,
}

impl<T> Default for TableInner<T> {
    fn default() -> Self {
        Self {
            ids: HashSet::new(),
            by_key: HashMap::new(),
            entries: Vec::new(),
        }
    }
}

/// Lookup table filled by concurrent bulk loads.
///
/// The first load of an id wins; later loads never replace or duplicate it.
/// When two ids share a grouping key, the first one merged is kept and the
/// later id is remembered as loaded but never listed.
/// Readers see either the whole of a merged batch or none of it.
#[derive(Debug)]
pub struct ReferenceTable<T> {
    inner: RwLock<TableInner<T>>,
    concurrency: usize,
    label: &'static str,
}

impl<T: ReferenceEntity> ReferenceTable<T> {
    pub fn new(label: &'static str, concurrency: usize) -> Self {
        Self {
            inner: RwLock::new(TableInner::default()),
            concurrency: concurrency.max(1),
            label,
        }
    }

    /// Entity for the grouping key, or `ValidationError` if none was loaded.
    pub fn get(&self, key: &str) -> AppResult<T> {
        self.find(key).ok_or_else(|| {
            AppError::ValidationError(format!("unknown {} key: {}", self.label, key))
        })
    }

    pub fn find(&self, key: &str) -> Option<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.by_key.get(key).cloned()
    }

    /// Every loaded entity in load order.
    pub fn all(&self) -> Vec<T> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clone()
    }

    /// Number of listed entities, one per grouping key.
    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_loaded(&self, id: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.ids.contains(id)
    }

    /// Fetch every id from `reader` and merge the successes.
    ///
    /// Ids already in the table are not fetched again. Per-id failures go to
    /// `on_error`; only a failure to read `reader` is returned as an error.
    #[instrument(skip_all, fields(table = self.label))]
    pub async fn load<R, F, Fut, H>(
        &self,
        reader: R,
        fetch: F,
        mut on_error: H,
    ) -> AppResult<LoadReport>
    where
        R: AsyncBufRead + Unpin + Send,
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<T>> + Send + 'static,
        H: FnMut(ReferenceLoadError) + Send,
    {
        let mut seen = HashSet::new();
        let ids: Vec<String> = parse_reference_ids(reader)
            .await?
            .into_iter()
            .filter(|id| seen.insert(id.clone()) && !self.is_loaded(id))
            .collect();

        let mut report = LoadReport {
            requested: ids.len(),
            ..LoadReport::default()
        };
        if ids.is_empty() {
            return Ok(report);
        }

        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let fetch = Arc::new(fetch);
        let (err_tx, mut err_rx) = mpsc::channel::<ReferenceLoadError>(ERROR_CHANNEL_CAPACITY);

        let handles: Vec<_> = ids
            .into_iter()
            .map(|id| {
                let semaphore = semaphore.clone();
                let fetch = fetch.clone();
                let err_tx = err_tx.clone();
                let task_id = id.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok()?;
                    match fetch(task_id.clone()).await {
                        Ok(item) => Some(item),
                        Err(source) => {
                            let _ = err_tx.send(ReferenceLoadError { id: task_id, source }).await;
                            None
                        }
                    }
                });
                (id, handle)
            })
            .collect();
        drop(err_tx);

        // Errors are drained while tasks finish so senders never block forever.
        let join_all = async {
            let mut items = Vec::with_capacity(handles.len());
            let mut panicked = Vec::new();
            for (id, handle) in handles {
                match handle.await {
                    Ok(Some(item)) => items.push(item),
                    Ok(None) => {}
                    Err(join_err) => panicked.push(ReferenceLoadError {
                        id,
                        source: AppError::Internal(join_err.to_string()),
                    }),
                }
            }
            (items, panicked)
        };
        let mut failed = 0;
        let drain = async {
            while let Some(err) = err_rx.recv().await {
                failed += 1;
                on_error(err);
            }
        };
        let ((items, panicked), ()) = tokio::join!(join_all, drain);

        for err in panicked {
            failed += 1;
            on_error(err);
        }
        report.failed = failed;

        report.added = self.merge(items);
        tracing::info!(
            requested = report.requested,
            added = report.added,
            failed = report.failed,
            "Reference data loaded"
        );
        Ok(report)
    }

    /// Merge in input order under one write lock. Returns how many were new.
    fn merge(&self, items: Vec<T>) -> usize {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let mut added = 0;
        for item in items {
            if !inner.ids.insert(item.id().to_string()) {
                continue;
            }
            let key = item.grouping_key().to_string();
            if let Some(existing) = inner.by_key.get(&key) {
                tracing::warn!(
                    id = %item.id(),
                    kept = %existing.id(),
                    key = %key,
                    "Reference id shadowed by an earlier id with the same {}",
                    self.label
                );
                continue;
            }
            inner.by_key.insert(key, item.clone());
            inner.entries.push(item);
            added += 1;
        }
        added
    }
}

// ============================================================================
// Provider-backed tables
// ============================================================================

/// Tax rates by jurisdiction and prices by product id.
pub struct ReferenceData {
    provider: Arc<dyn PaymentProviderPort>,
    tax_rates: ReferenceTable<TaxRate>,
    prices: ReferenceTable<Price>,
}

impl ReferenceData {
    pub fn new(provider: Arc<dyn PaymentProviderPort>, headroom: usize) -> Self {
        let concurrency = loader_concurrency(headroom);
        Self {
            provider,
            tax_rates: ReferenceTable::new("jurisdiction", concurrency),
            prices: ReferenceTable::new("product", concurrency),
        }
    }

    pub fn tax_rates(&self) -> &ReferenceTable<TaxRate> {
        &self.tax_rates
    }

    pub fn prices(&self) -> &ReferenceTable<Price> {
        &self.prices
    }

    pub fn tax_rate(&self, jurisdiction: &str) -> AppResult<TaxRate> {
        self.tax_rates.get(jurisdiction)
    }

    pub fn price_for_product(&self, product_id: &str) -> AppResult<Price> {
        self.prices.get(product_id)
    }

    pub async fn load_tax_rates<R>(&self, reader: R) -> AppResult<LoadReport>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let provider = self.provider.clone();
        self.tax_rates
            .load(
                reader,
                move |id| {
                    let provider = provider.clone();
                    async move { provider.retrieve_tax_rate(&id).await }
                },
                log_load_error,
            )
            .await
    }

    pub async fn load_prices<R>(&self, reader: R) -> AppResult<LoadReport>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let provider = self.provider.clone();
        self.prices
            .load(
                reader,
                move |id| {
                    let provider = provider.clone();
                    async move { provider.retrieve_price(&id).await }
                },
                log_load_error,
            )
            .await
    }

    /// Load (or reload) whichever id files are configured.
    pub async fn reload_from_files(
        &self,
        tax_rates_file: Option<&Path>,
        prices_file: Option<&Path>,
    ) -> AppResult<()> {
        if let Some(path) = tax_rates_file {
            self.load_tax_rates(open_id_file(path).await?).await?;
        }
        if let Some(path) = prices_file {
            self.load_prices(open_id_file(path).await?).await?;
        }
        Ok(())
    }
}

async fn open_id_file(path: &Path) -> AppResult<BufReader<tokio::fs::File>> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        AppError::InvalidInput(format!("cannot open {}: {}", path.display(), e))
    })?;
    Ok(BufReader::new(file))
}

fn log_load_error(err: ReferenceLoadError) {
    tracing::warn!(reference_id = %err.id, error = %err.source, "Failed to load reference");
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use super::*;
    use crate::test_utils::{FakePaymentProvider, create_test_tax_rate};

    fn ids(text: &str) -> &[u8] {
        text.as_bytes()
    }

    #[tokio::test]
    async fn parses_ids_skipping_blanks_and_comments() {
        let input = "txr_1\n\n   \n# comment\n  # indented comment\n  txr_2  \r\ntxr_3";
        let parsed = parse_reference_ids(ids(input)).await.unwrap();
        assert_eq!(parsed, vec!["txr_1", "txr_2", "txr_3"]);
    }

    #[tokio::test]
    async fn loads_every_id_once() {
        let provider = Arc::new(FakePaymentProvider::new());
        let data = ReferenceData::new(provider.clone(), DEFAULT_LOADER_HEADROOM);

        let report = data.load_tax_rates(ids("a\nb\nc\n")).await.unwrap();
        assert_eq!(report.added, 3);
        assert_eq!(data.tax_rates().len(), 3);

        // Overlapping reload adds only the new id and skips known ones.
        let report = data.load_tax_rates(ids("b\nc\nd\n")).await.unwrap();
        assert_eq!(report.requested, 1);
        assert_eq!(report.added, 1);
        assert_eq!(data.tax_rates().len(), 4);
        assert_eq!(FakePaymentProvider::calls(&provider.reference_calls), 4);
    }

    #[tokio::test]
    async fn failures_are_isolated_and_reported() {
        let provider = Arc::new(FakePaymentProvider::new().with_failing_ids(&["bad_1", "bad_2"]));
        let table = ReferenceTable::<TaxRate>::new("jurisdiction", 4);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let sink = errors.clone();
        let fetcher = provider.clone();
        let report = table
            .load(
                ids("ok_1\nbad_1\nok_2\nbad_2\nok_3\n"),
                move |id| {
                    let provider = fetcher.clone();
                    async move { provider.retrieve_tax_rate(&id).await }
                },
                move |err| sink.lock().unwrap().push(err.id),
            )
            .await
            .unwrap();

        assert_eq!(report.failed, 2);
        assert_eq!(table.len(), 3);
        let mut failed = errors.lock().unwrap().clone();
        failed.sort();
        assert_eq!(failed, vec!["bad_1", "bad_2"]);
    }

    #[tokio::test]
    async fn failed_ids_are_retried_on_reload() {
        let provider = Arc::new(FakePaymentProvider::new().with_failing_ids(&["flaky"]));
        let data = ReferenceData::new(provider.clone(), 1);

        data.load_tax_rates(ids("flaky\n")).await.unwrap();
        assert!(data.tax_rates().is_empty());

        provider.failing_ids.lock().unwrap().clear();
        data.load_tax_rates(ids("flaky\n")).await.unwrap();
        assert_eq!(data.tax_rates().len(), 1);
    }

    #[tokio::test]
    async fn in_flight_fetches_are_bounded() {
        let provider =
            Arc::new(FakePaymentProvider::new().with_fetch_delay(Duration::from_millis(5)));
        let table = ReferenceTable::<TaxRate>::new("jurisdiction", 3);

        let input: String = (0..30).map(|i| format!("txr_{}\n", i)).collect();
        let fetcher = provider.clone();
        table
            .load(
                input.as_bytes(),
                move |id| {
                    let provider = fetcher.clone();
                    async move { provider.retrieve_tax_rate(&id).await }
                },
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(table.len(), 30);
        assert!(provider.peak_in_flight.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn lookup_by_grouping_key() {
        let provider = Arc::new(
            FakePaymentProvider::new()
                .with_tax_rate(create_test_tax_rate(|r| {
                    r.id = "txr_gb".into();
                    r.jurisdiction = Some("GB".into());
                }))
                .with_tax_rate(create_test_tax_rate(|r| {
                    r.id = "txr_fr".into();
                    r.jurisdiction = Some("FR".into());
                    r.percentage = 19.6;
                })),
        );
        let data = ReferenceData::new(provider, DEFAULT_LOADER_HEADROOM);
        data.load_tax_rates(ids("txr_gb\ntxr_fr\n")).await.unwrap();

        assert_eq!(data.tax_rate("FR").unwrap().id, "txr_fr");
        let err = data.tax_rate("DE").unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn first_loaded_id_wins_within_a_batch() {
        let table = ReferenceTable::<TaxRate>::new("jurisdiction", 2);
        let added = table.merge(vec![
            create_test_tax_rate(|r| r.percentage = 20.0),
            create_test_tax_rate(|r| r.percentage = 5.0),
        ]);
        assert_eq!(added, 1);
        assert_eq!(table.get("GB").unwrap().percentage, 20.0);
    }

    #[tokio::test]
    async fn distinct_ids_sharing_a_key_keep_the_first() {
        let provider = Arc::new(
            FakePaymentProvider::new()
                .with_tax_rate(create_test_tax_rate(|r| {
                    r.id = "txr_first".into();
                    r.jurisdiction = Some("GB".into());
                }))
                .with_tax_rate(create_test_tax_rate(|r| {
                    r.id = "txr_second".into();
                    r.jurisdiction = Some("GB".into());
                })),
        );
        let data = ReferenceData::new(provider.clone(), DEFAULT_LOADER_HEADROOM);

        let report = data
            .load_tax_rates(ids("txr_first\ntxr_second\n"))
            .await
            .unwrap();

        assert_eq!(report.added, 1);
        assert_eq!(data.tax_rate("GB").unwrap().id, "txr_first");
        assert_eq!(data.tax_rates().len(), 1);
        let listed: Vec<String> = data.tax_rates().all().into_iter().map(|r| r.id).collect();
        assert_eq!(listed, vec!["txr_first".to_string()]);

        let calls = FakePaymentProvider::calls(&provider.reference_calls);
        data.load_tax_rates(ids("txr_second\n")).await.unwrap();
        assert_eq!(FakePaymentProvider::calls(&provider.reference_calls), calls);
        assert_eq!(data.tax_rate("GB").unwrap().id, "txr_first");
    }

    #[tokio::test]
    async fn prices_are_keyed_by_product() {
        let provider = Arc::new(FakePaymentProvider::new());
        let data = ReferenceData::new(provider, DEFAULT_LOADER_HEADROOM);
        data.load_prices(ids("price_a\nprice_b\n")).await.unwrap();

        let price = data.price_for_product("prod_price_a").unwrap();
        assert_eq!(price.id, "price_a");
        assert_eq!(data.prices().all().len(), 2);
    }
}
