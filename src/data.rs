//! Clients for the external metrics service.

use crate::catalog::Section;
use crate::dates::DateRange;
use anyhow::{Context, Result};
use futures::future::try_join_all;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio::sync::OnceCell;

const LOG_TARGET: &str = "  provider";
const CURRENT_SUFFIX: &str = "Current";
const PREVIOUS_SUFFIX: &str = "Prev";

/// One metric as delivered by the data layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub prev_value: Option<f64>,
}

impl MetricRecord {
    pub const fn new(value: Option<f64>, prev_value: Option<f64>) -> Self {
        Self { value, prev_value }
    }
}

/// Records of one dashboard section keyed by metric stem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionMetrics {
    records: FxHashMap<String, MetricRecord>,
}

impl SectionMetrics {
    /// Unknown keys read as a record with no data.
    pub fn get(&self, key: &str) -> MetricRecord {
        self.records.get(key).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, MetricRecord)> for SectionMetrics {
    fn from_iter<I: IntoIterator<Item = (K, MetricRecord)>>(iter: I) -> Self {
        Self {
            records: iter
                .into_iter()
                .map(|(key, record)| (key.into(), record))
                .collect(),
        }
    }
}

/// Largest positions of a section (`topStakers`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopHolder {
    pub address: String,
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Most active addresses (`topUsers`); each section fills a different pair
/// of the counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub address: String,
    #[serde(default)]
    pub full_address: String,
    #[serde(default)]
    pub tx_count: Option<f64>,
    #[serde(default)]
    pub shit_sent: Option<f64>,
    #[serde(default)]
    pub claim_count: Option<f64>,
    #[serde(default)]
    pub claim_amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepeatClaim {
    pub address: String,
    #[serde(default)]
    pub count: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateAddress {
    pub address: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tx_count: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevenueShare {
    pub source: String,
    #[serde(default)]
    pub amount: Option<f64>,
}

/// Ranking and breakdown tables listed under a section's cards. Daily
/// series and heatmaps are not kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionTables {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_stakers: Vec<TopHolder>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top_users: Vec<TopUser>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repeat_ranking: Vec<RepeatClaim>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub duplicate_addresses: Vec<DuplicateAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub composition: Vec<RevenueShare>,
}

impl SectionTables {
    pub fn is_empty(&self) -> bool {
        self.top_stakers.is_empty()
            && self.top_users.is_empty()
            && self.repeat_ranking.is_empty()
            && self.duplicate_addresses.is_empty()
            && self.composition.is_empty()
    }
}

/// Everything one section page shows: card records plus ranking tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionData {
    #[serde(default)]
    pub metrics: SectionMetrics,
    #[serde(flatten)]
    pub tables: SectionTables,
}

impl From<SectionMetrics> for SectionData {
    fn from(metrics: SectionMetrics) -> Self {
        Self {
            metrics,
            tables: SectionTables::default(),
        }
    }
}

/// Pairs the service's `{stem}Current` / `{stem}Prev` fields into records.
/// Fields that are null or not numbers read as missing.
pub fn pair_backend_metrics(metrics: &Map<String, Value>) -> SectionMetrics {
    metrics
        .iter()
        .filter_map(|(key, value)| {
            let stem = key.strip_suffix(CURRENT_SUFFIX)?;
            let previous = metrics
                .get(&format!("{stem}{PREVIOUS_SUFFIX}"))
                .and_then(Value::as_f64);
            Some((stem, MetricRecord::new(value.as_f64(), previous)))
        })
        .collect()
}

pub trait MetricProvider {
    fn fetch(
        &self,
        section: Section,
        range: &DateRange,
    ) -> impl Future<Output = Result<SectionData>> + Send;
}

/// Hooks invoked around every section request of [`fetch_sections`].
pub trait FetchProgress: Sync {
    fn section_started(&self, section: Section);
    fn section_finished(&self, section: Section, outcome: Result<&SectionData, &anyhow::Error>);
}

/// Progress reporter that reports nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn section_started(&self, _section: Section) {}
    fn section_finished(&self, _section: Section, _outcome: Result<&SectionData, &anyhow::Error>) {}
}

/// Fetches every section concurrently, preserving order.
pub async fn fetch_sections<P>(
    provider: &P,
    sections: &[Section],
    range: &DateRange,
    progress: &dyn FetchProgress,
) -> Result<Vec<(Section, SectionData)>>
where
    P: MetricProvider + Sync,
{
    let requests = sections.iter().map(|&section| async move {
        progress.section_started(section);
        let fetched = provider.fetch(section, range).await;
        progress.section_finished(section, fetched.as_ref());
        Ok::<_, anyhow::Error>((section, fetched?))
    });
    try_join_all(requests).await
}

#[derive(Debug, Serialize)]
struct LoadDataRequest {
    force_refresh: bool,
}

/// Cache state reported by the service after `/loadData`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoadStatus {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub timestamp_ms: i64,
    #[serde(default)]
    pub cache_size_mb: Option<f64>,
}

#[derive(Debug, Serialize)]
struct CalculateRequest {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Deserialize)]
struct CalculateResponse {
    metrics: Map<String, Value>,
    #[serde(flatten)]
    tables: SectionTables,
}

/// Client for the metrics service. The service only answers `/calculate/*`
/// once its data cache is loaded, so the first fetch loads it.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
    token: Option<String>,
    loaded: OnceCell<LoadStatus>,
}

impl HttpProvider {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("metricdash/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            token,
            loaded: OnceCell::new(),
        })
    }

    pub fn endpoint_url(&self, section: Section) -> String {
        format!(
            "{}/calculate/{}",
            self.base_url.trim_end_matches('/'),
            section.endpoint()
        )
    }

    fn load_url(&self) -> String {
        format!("{}/loadData", self.base_url.trim_end_matches('/'))
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Asks the service to fill its data cache; `force_refresh` discards
    /// what it already holds.
    pub async fn load_data(&self, force_refresh: bool) -> Result<LoadStatus> {
        let url = self.load_url();
        log::debug!(target: LOG_TARGET, "POST {url} (force_refresh={force_refresh})");
        let request = self
            .client
            .post(&url)
            .json(&LoadDataRequest { force_refresh });
        let status: LoadStatus = self
            .authorized(request)
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))?
            .error_for_status()
            .context("metrics service failed to load its data")?
            .json()
            .await
            .with_context(|| format!("failed to decode load status from {url}"))?;
        log::info!(
            target: LOG_TARGET,
            "service data loaded at {} ({} MB cached)",
            status.timestamp,
            status.cache_size_mb.map_or_else(|| "?".to_string(), |size| format!("{size:.1}"))
        );
        Ok(status)
    }

    /// Loads the service cache once, shared by concurrent section fetches.
    pub async fn ensure_loaded(&self) -> Result<&LoadStatus> {
        self.loaded.get_or_try_init(|| self.load_data(false)).await
    }

    async fn post_calculate(&self, url: &str, range: &DateRange) -> Result<Response> {
        let body = CalculateRequest {
            start_date: range.start_string(),
            end_date: range.end_string(),
        };
        self.authorized(self.client.post(url).json(&body))
            .send()
            .await
            .with_context(|| format!("failed to reach {url}"))
    }
}

impl MetricProvider for HttpProvider {
    async fn fetch(&self, section: Section, range: &DateRange) -> Result<SectionData> {
        self.ensure_loaded().await?;
        let url = self.endpoint_url(section);
        log::debug!(target: LOG_TARGET, "POST {url} for {range}");

        let mut response = self.post_calculate(&url, range).await?;
        if response.status() == StatusCode::PRECONDITION_FAILED {
            log::warn!(target: LOG_TARGET, "{section}: service data cache is empty, reloading");
            self.load_data(false).await?;
            response = self.post_calculate(&url, range).await?;
        }
        let payload: CalculateResponse = response
            .error_for_status()
            .with_context(|| format!("{section} metrics request was rejected"))?
            .json()
            .await
            .with_context(|| format!("failed to decode {section} metrics from {url}"))?;

        let metrics = pair_backend_metrics(&payload.metrics);
        log::info!(target: LOG_TARGET, "received {} {section} metrics", metrics.len());
        Ok(SectionData {
            metrics,
            tables: payload.tables,
        })
    }
}

/// Section data read from a JSON file shaped
/// `{ section: { "metrics": { stem: { value, prevValue } }, "topUsers": [...] } }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SnapshotProvider {
    sections: FxHashMap<Section, SectionData>,
}

impl SnapshotProvider {
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        Self::from_json(&text)
            .with_context(|| format!("failed to parse snapshot {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("snapshot is not valid metrics JSON")
    }
}

impl MetricProvider for SnapshotProvider {
    async fn fetch(&self, section: Section, range: &DateRange) -> Result<SectionData> {
        let Some(data) = self.sections.get(&section) else {
            log::warn!(target: LOG_TARGET, "snapshot has no {section} metrics for {range}");
            return Ok(SectionData::default());
        };
        Ok(data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn range() -> DateRange {
        DateRange::parse("2025-03-01", "2025-03-07").unwrap()
    }

    #[test]
    fn pairs_current_and_previous_fields() {
        let payload = json!({
            "totalStakeCurrent": 1500.5,
            "totalStakePrev": 1000.0,
            "totalStakeDelta": 50.05,
            "stakeCountCurrent": 12,
            "stakeCountPrev": null,
            "avgClaimPerAddressCurrent": null,
        });
        let Value::Object(map) = payload else {
            unreachable!()
        };
        let metrics = pair_backend_metrics(&map);
        assert_eq!(metrics.len(), 3);
        assert_eq!(metrics.get("totalStake"), MetricRecord::new(Some(1500.5), Some(1000.0)));
        assert_eq!(metrics.get("stakeCount"), MetricRecord::new(Some(12.0), None));
        assert_eq!(metrics.get("avgClaimPerAddress"), MetricRecord::default());
        assert_eq!(metrics.get("totalStakeDelta"), MetricRecord::default());
    }

    #[test]
    fn records_accept_missing_fields() {
        let record: MetricRecord = serde_json::from_str(r#"{ "value": 3 }"#).unwrap();
        assert_eq!(record, MetricRecord::new(Some(3.0), None));
        let record: MetricRecord =
            serde_json::from_str(r#"{ "value": null, "prevValue": 2 }"#).unwrap();
        assert_eq!(record, MetricRecord::new(None, Some(2.0)));
    }

    #[test]
    fn endpoint_urls_join_cleanly() {
        let provider =
            HttpProvider::new("http://localhost:8000/", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            provider.endpoint_url(Section::ShitCode),
            "http://localhost:8000/calculate/shitcode"
        );
        assert_eq!(provider.load_url(), "http://localhost:8000/loadData");
    }

    #[tokio::test]
    async fn snapshot_serves_sections_in_order() {
        let provider = SnapshotProvider::from_json(
            r#"{
                "staking": {
                    "metrics": { "totalStake": { "value": 150, "prevValue": 100 } },
                    "topStakers": [{ "address": "0xab..cd", "amount": 900.5 }]
                },
                "defi": { "metrics": { "buyCount": { "value": 4 } } }
            }"#,
        )
        .unwrap();
        let sections = [Section::Defi, Section::Staking, Section::Ts];
        let fetched = fetch_sections(&provider, &sections, &range(), &NoProgress)
            .await
            .unwrap();
        let order: Vec<Section> = fetched.iter().map(|(section, _)| *section).collect();
        assert_eq!(order, sections);
        let staking = &fetched[1].1;
        assert_eq!(staking.metrics.get("totalStake").value, Some(150.0));
        assert_eq!(staking.tables.top_stakers[0].amount, Some(900.5));
        assert!(fetched[0].1.tables.is_empty());
        assert_eq!(fetched[2].1, SectionData::default());
    }

    #[derive(Default)]
    struct Recorder {
        events: std::sync::Mutex<Vec<String>>,
    }

    impl FetchProgress for Recorder {
        fn section_started(&self, section: Section) {
            self.events.lock().unwrap().push(format!("start {section}"));
        }

        fn section_finished(
            &self,
            section: Section,
            outcome: Result<&SectionData, &anyhow::Error>,
        ) {
            let status = if outcome.is_ok() { "ok" } else { "err" };
            self.events.lock().unwrap().push(format!("{status} {section}"));
        }
    }

    #[tokio::test]
    async fn progress_hears_about_every_section() {
        let provider = SnapshotProvider::default();
        let recorder = Recorder::default();
        fetch_sections(&provider, &[Section::Pos, Section::Revenue], &range(), &recorder)
            .await
            .unwrap();
        let mut events = recorder.events.into_inner().unwrap();
        events.sort();
        assert_eq!(events, ["ok pos", "ok revenue", "start pos", "start revenue"]);
    }

    #[test]
    fn tables_ignore_daily_series() {
        let data: SectionData = serde_json::from_value(json!({
            "metrics": {},
            "dailyData": [{ "date": "2025-03-01", "stake": 1.0 }],
            "repeatRanking": [{ "address": "0x1", "count": 7 }],
            "composition": [{ "source": "TS", "amount": 12.5 }]
        }))
        .unwrap();
        assert_eq!(data.tables.repeat_ranking[0].count, Some(7.0));
        assert_eq!(data.tables.composition[0].source, "TS");
        assert!(data.tables.top_users.is_empty());
    }

    #[tokio::test]
    async fn snapshot_load_reports_missing_file() {
        let missing = std::env::temp_dir().join("metricdash-no-such-snapshot.json");
        let err = SnapshotProvider::load(&missing).await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to read snapshot"));
    }
}
