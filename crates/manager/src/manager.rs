use crate::dataset::{dataset_data_json, dataset_definition_json};
use crate::error::ManagerError;
use analytics::FinancialMetrics;
use api_client::extract::{extract_array_of_objects, extract_number, extract_value};
use api_client::push::DatasetPush;
use api_client::{LibraryItem, MstrClient, Project, SearchResult, Session};
use core_types::{FinancialRecord, Transaction};
use database::{
    DepartmentSpending, FinStore, SourceSystemCount, StorageBackend, connect as connect_store,
};

/// Page size used when draining a cube instance into the local store.
const CUBE_PAGE_SIZE: u32 = 1000;

/// Central orchestrator: owns the API session, the protocol client and the
/// storage backend, and composes them into the two application flows — the
/// ETL pull (fetch, compute, summarize) and the dataset push/publish.
///
/// One `DataManager` holds one `Session`, used serially; every protocol call
/// runs to completion before the next begins.
pub struct DataManager {
    client: MstrClient,
    session: Session,
    store: Option<Box<dyn FinStore>>,
}

impl DataManager {
    /// Creates a manager for the given Library base URL, over the production
    /// TLS transport. Neither the API nor a store is connected yet.
    pub fn new(base_url: &str) -> Result<Self, ManagerError> {
        Ok(Self {
            client: MstrClient::new()?,
            session: Session::new(base_url),
            store: None,
        })
    }

    /// Manager over a caller-supplied client (used by tests).
    pub fn with_client(client: MstrClient, base_url: &str) -> Self {
        Self {
            client,
            session: Session::new(base_url),
            store: None,
        }
    }

    // --- Connection lifecycle ---

    /// Attaches the configured storage backend, replacing any current one.
    pub async fn connect_store(
        &mut self,
        backend: StorageBackend,
        connection: &str,
    ) -> Result<(), ManagerError> {
        self.store = Some(connect_store(backend, connection).await?);
        Ok(())
    }

    pub fn disconnect_store(&mut self) {
        self.store = None;
    }

    /// Authenticates the session against the remote API.
    pub async fn connect_api(&mut self, username: &str, password: &str) -> Result<(), ManagerError> {
        self.client
            .login(&mut self.session, username, password)
            .await?;
        Ok(())
    }

    /// Logs out and clears the session. The server-side logout is
    /// best-effort; local credentials are dropped either way.
    pub async fn disconnect_api(&mut self) {
        if self.session.authenticated {
            if let Err(error) = self.client.logout(&self.session).await {
                tracing::warn!(%error, "logout round-trip failed, clearing session anyway");
            }
            self.session.clear();
        }
    }

    /// Scopes every subsequent authenticated call to one project.
    pub fn set_project(&mut self, project_id: &str) {
        self.session.project_id = project_id.to_string();
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_api_connected(&self) -> bool {
        self.session.authenticated
    }

    pub async fn is_store_connected(&self) -> bool {
        match &self.store {
            Some(store) => store.is_open().await,
            None => false,
        }
    }

    pub fn store_backend_name(&self) -> &'static str {
        match &self.store {
            Some(store) => store.backend_name(),
            None => "none",
        }
    }

    fn store(&self) -> Result<&dyn FinStore, ManagerError> {
        self.store
            .as_deref()
            .ok_or(ManagerError::StoreNotConnected)
    }

    // --- Local storage reads ---

    pub async fn fetch_transactions(&self) -> Result<Vec<Transaction>, ManagerError> {
        Ok(self.store()?.get_all_transactions().await?)
    }

    pub async fn fetch_department_spending(&self) -> Result<Vec<DepartmentSpending>, ManagerError> {
        Ok(self.store()?.get_department_spending().await?)
    }

    pub async fn fetch_source_system_counts(
        &self,
    ) -> Result<Vec<SourceSystemCount>, ManagerError> {
        Ok(self.store()?.get_source_system_counts().await?)
    }

    pub async fn fetch_total_spending(&self) -> Result<f64, ManagerError> {
        Ok(self.store()?.get_total_spending().await?)
    }

    pub async fn fetch_all_financials(&self) -> Result<Vec<FinancialRecord>, ManagerError> {
        Ok(self.store()?.get_financial_records().await?)
    }

    pub async fn fetch_financials(
        &self,
        company_id: &str,
    ) -> Result<Vec<FinancialRecord>, ManagerError> {
        Ok(self
            .store()?
            .get_financial_records_by_company(company_id)
            .await?)
    }

    // --- Remote catalog queries ---

    pub async fn get_projects(&self) -> Result<Vec<Project>, ManagerError> {
        Ok(self.client.get_projects(&self.session).await?)
    }

    pub async fn search(
        &self,
        name: Option<&str>,
        object_type: Option<u32>,
        limit: u32,
    ) -> Result<Vec<SearchResult>, ManagerError> {
        Ok(self
            .client
            .search(&self.session, name, object_type, limit)
            .await?)
    }

    pub async fn get_library(&self, limit: u32) -> Result<Vec<LibraryItem>, ManagerError> {
        Ok(self.client.get_library(&self.session, limit).await?)
    }

    pub async fn get_report(&self, report_id: &str) -> Result<String, ManagerError> {
        Ok(self.client.get_report(&self.session, report_id).await?)
    }

    pub async fn get_report_definition(&self, report_id: &str) -> Result<String, ManagerError> {
        Ok(self
            .client
            .get_report_definition(&self.session, report_id)
            .await?)
    }

    // --- Remote pull into the local store ---

    /// Drains a cube into the local store: creates an instance, pages
    /// through its rows, and appends one financial record per row span.
    /// Returns how many records were inserted. Spans without a `period`
    /// are skipped.
    pub async fn sync_cube_to_store(&self, cube_id: &str) -> Result<usize, ManagerError> {
        let store = self.store()?;

        let body = self.client.create_cube(&self.session, cube_id).await?;
        let instance_id = extract_value(&body, "instanceId");
        if instance_id.is_empty() {
            return Err(ManagerError::Api(
                api_client::error::ApiError::MissingField("instanceId"),
            ));
        }

        let mut inserted = 0usize;
        let mut offset = 0u32;
        loop {
            let page = self
                .client
                .get_cube(&self.session, cube_id, &instance_id, offset, CUBE_PAGE_SIZE)
                .await?;

            let spans = extract_array_of_objects(&page);
            if spans.is_empty() {
                break;
            }

            for span in &spans {
                let record = record_from_span(span);
                if record.period.is_empty() {
                    continue;
                }
                store.insert_financial_record(&record).await?;
                inserted += 1;
            }

            if (spans.len() as u32) < CUBE_PAGE_SIZE {
                break;
            }
            offset += CUBE_PAGE_SIZE;
        }

        tracing::info!(cube_id, inserted, "cube synced into local store");
        Ok(inserted)
    }

    /// Single-page variant of the cube sync: executes a report and appends
    /// one financial record per row span of the first result page.
    pub async fn sync_report_to_store(&self, report_id: &str) -> Result<usize, ManagerError> {
        let store = self.store()?;

        let body = self.client.get_report(&self.session, report_id).await?;
        let mut inserted = 0usize;
        for span in extract_array_of_objects(&body) {
            let record = record_from_span(&span);
            if record.period.is_empty() {
                continue;
            }
            store.insert_financial_record(&record).await?;
            inserted += 1;
        }

        tracing::info!(report_id, inserted, "report synced into local store");
        Ok(inserted)
    }

    // --- Metrics ---

    /// Derives one metrics view per stored record. Pure and infallible.
    pub fn calculate_metrics(&self, records: &[FinancialRecord]) -> Vec<FinancialMetrics> {
        records
            .iter()
            .cloned()
            .map(FinancialMetrics::from)
            .collect()
    }

    /// Period-over-period revenue growth; input order is the caller's
    /// responsibility (chronological per company).
    pub fn calculate_yoy_growth(&self, metrics: &[FinancialMetrics]) -> Vec<f64> {
        analytics::calculate_yoy_growth(metrics)
    }

    // --- Dataset push / cube refresh ---

    /// Creates the metrics dataset on the server and returns its id.
    pub async fn create_dataset(
        &self,
        name: &str,
        description: &str,
        table_name: &str,
    ) -> Result<String, ManagerError> {
        let definition = dataset_definition_json(name, description, table_name);
        Ok(self.client.create_dataset(&self.session, &definition).await?)
    }

    /// Runs the full push chain against an existing dataset: open an upload
    /// session, stage the metric rows, publish. A failure aborts the chain
    /// at that step; later steps are never attempted.
    pub async fn push_to_dataset(
        &self,
        dataset_id: &str,
        table_name: &str,
        metrics: &[FinancialMetrics],
    ) -> Result<(), ManagerError> {
        let mut push = DatasetPush::new(dataset_id.to_string());
        push.open_session(&self.client, &self.session).await?;

        let rows = dataset_data_json(metrics);
        push.upload(&self.client, &self.session, table_name, &rows)
            .await?;
        push.publish(&self.client, &self.session).await?;
        Ok(())
    }

    /// Single-call refresh of an existing cube with the metric rows.
    pub async fn update_cube(
        &self,
        cube_id: &str,
        metrics: &[FinancialMetrics],
    ) -> Result<(), ManagerError> {
        let rows = dataset_data_json(metrics);
        Ok(self.client.update_cube(&self.session, cube_id, &rows).await?)
    }
}

/// Maps one scanned row span onto a financial record. Missing string fields
/// come back empty, missing numerics come back 0.0; the caller decides
/// whether the result is usable.
fn record_from_span(span: &str) -> FinancialRecord {
    FinancialRecord {
        period: extract_value(span, "period"),
        company_id: extract_value(span, "companyId"),
        revenue: extract_number(span, "revenue"),
        cogs: extract_number(span, "cogs"),
        operating_expenses: extract_number(span, "operatingExpenses"),
        depreciation: extract_number(span, "depreciation"),
        amortization: extract_number(span, "amortization"),
        interest: extract_number(span, "interest"),
        taxes: extract_number(span, "taxes"),
        current_assets: extract_number(span, "currentAssets"),
        current_liabilities: extract_number(span, "currentLiabilities"),
        inventory: extract_number(span, "inventory"),
        total_assets: extract_number(span, "totalAssets"),
        total_liabilities: extract_number(span, "totalLiabilities"),
    }
}
