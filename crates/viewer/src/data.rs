//! Patient data access: repository seam, HTTP implementation and the UI-side store.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use shared::{map_points, HeartPoint, Patient, PatientId, CLUSTER_COUNT, DEFAULT_METRIC};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::DataError;

pub trait PatientRepository: Send + Sync + 'static {
    fn list_patients(&self) -> impl Future<Output = Result<Vec<Patient>, DataError>> + Send;

    fn get_points(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<Vec<HeartPoint>, DataError>> + Send;
}

/// Reads `/data/patients.json` and `/data/points-{id}.json` under a base URL
#[derive(Debug, Clone)]
pub struct HttpRepository {
    client: reqwest::Client,
    base: String,
}

impl HttpRepository {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn patients_url(&self) -> String {
        self.data_url("patients.json")
    }

    /// The id is percent-encoded as a single path segment
    pub fn points_url(&self, patient_id: &str) -> String {
        self.data_url(&format!("points-{patient_id}.json"))
    }

    fn data_url(&self, file: &str) -> String {
        let Ok(mut url) = reqwest::Url::parse(&self.base) else {
            // Left for reqwest to reject when the request is built
            return format!("{}/data/{}", self.base, file);
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("data").push(file);
        }
        url.into()
    }

    async fn get_json(client: &reqwest::Client, url: String) -> Result<Value, DataError> {
        let response = client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DataError::Status {
                url,
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl PatientRepository for HttpRepository {
    fn list_patients(&self) -> impl Future<Output = Result<Vec<Patient>, DataError>> + Send {
        let client = self.client.clone();
        let url = self.patients_url();
        async move {
            let body = Self::get_json(&client, url).await?;
            Ok(serde_json::from_value(body)?)
        }
    }

    fn get_points(
        &self,
        patient_id: &str,
    ) -> impl Future<Output = Result<Vec<HeartPoint>, DataError>> + Send {
        let client = self.client.clone();
        let url = self.points_url(patient_id);
        async move {
            let body = Self::get_json(&client, url).await?;
            let records: Vec<Value> = serde_json::from_value(body)?;
            Ok(map_points(&records))
        }
    }
}

// ── Background requests ──────────────────────────────────────

#[derive(Debug)]
pub enum DataEvent {
    Patients(Result<Vec<Patient>, DataError>),
    Points {
        patient_id: PatientId,
        result: Result<Vec<HeartPoint>, DataError>,
    },
}

/// Runs repository calls on the runtime and reports back over a channel
pub struct DataService<R> {
    repo: Arc<R>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<DataEvent>,
    rx: mpsc::UnboundedReceiver<DataEvent>,
}

impl<R: PatientRepository> DataService<R> {
    pub fn new(repo: R, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            repo: Arc::new(repo),
            runtime,
            tx,
            rx,
        }
    }

    pub fn request_patients(&self) {
        let repo = self.repo.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            if tx.send(DataEvent::Patients(repo.list_patients().await)).is_err() {
                tracing::debug!("Patient list arrived after the viewer closed");
            }
        });
    }

    pub fn request_points(&self, patient_id: PatientId) {
        let repo = self.repo.clone();
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            let result = repo.get_points(&patient_id).await;
            if tx.send(DataEvent::Points { patient_id, result }).is_err() {
                tracing::debug!("Points arrived after the viewer closed");
            }
        });
    }

    pub fn try_recv(&mut self) -> Option<DataEvent> {
        self.rx.try_recv().ok()
    }

    pub async fn next(&mut self) -> Option<DataEvent> {
        self.rx.recv().await
    }
}

// ── Store ────────────────────────────────────────────────────

/// Patients and the points of the selected patient
#[derive(Debug)]
pub struct PatientStore {
    patients: Vec<Patient>,
    loaded: bool,
    points: Vec<HeartPoint>,
    points_for: Option<PatientId>,
    metric: String,
    last_error: Option<String>,
}

impl Default for PatientStore {
    fn default() -> Self {
        Self {
            patients: Vec::new(),
            loaded: false,
            points: Vec::new(),
            points_for: None,
            metric: DEFAULT_METRIC.to_string(),
            last_error: None,
        }
    }
}

impl PatientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn patient(&self, id: &str) -> Option<&Patient> {
        self.patients.iter().find(|p| p.id == id)
    }

    pub fn set_patients(&mut self, patients: Vec<Patient>) {
        self.patients = patients;
        self.loaded = true;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn set_error(&mut self, error: impl ToString) {
        self.last_error = Some(error.to_string());
    }

    /// Forget the points of the previous selection
    pub fn begin_points(&mut self, patient_id: Option<&str>) {
        self.points.clear();
        self.points_for = patient_id.map(str::to_string);
    }

    /// Store points if they belong to the selected patient. Returns whether they were kept.
    pub fn apply_points(&mut self, patient_id: &str, points: Vec<HeartPoint>, selected: Option<&str>) -> bool {
        if selected != Some(patient_id) {
            tracing::debug!("Dropping points for {}, no longer selected", patient_id);
            return false;
        }
        self.points = points;
        self.points_for = Some(patient_id.to_string());
        true
    }

    pub fn points(&self) -> &[HeartPoint] {
        &self.points
    }

    pub fn points_for(&self) -> Option<&str> {
        self.points_for.as_deref()
    }

    /// Points whose cluster is visible
    pub fn filtered_points(&self, clusters: [bool; CLUSTER_COUNT]) -> Vec<&HeartPoint> {
        self.points
            .iter()
            .filter(|p| clusters.get(p.cluster as usize).copied().unwrap_or(false))
            .collect()
    }

    pub fn cluster_counts(&self) -> [usize; CLUSTER_COUNT] {
        let mut counts = [0; CLUSTER_COUNT];
        for p in &self.points {
            if let Some(c) = counts.get_mut(p.cluster as usize) {
                *c += 1;
            }
        }
        counts
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn set_metric(&mut self, metric: impl Into<String>) {
        self.metric = metric.into();
    }

    /// Distinct metric names present in the loaded points, sorted
    pub fn metrics(&self) -> Vec<&str> {
        let mut metrics: Vec<&str> = self.points.iter().map(|p| p.metric.as_str()).collect();
        metrics.sort_unstable();
        metrics.dedup();
        metrics
    }
}
