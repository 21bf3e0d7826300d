use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use super::error::{EngineError, EngineResult, ValidationError};
use super::is_valid_session_id;
use crate::catalog::{EscalationStep, ScenarioCatalog};
use crate::compiler::{self, CatalogMissPolicy};
use crate::export::{self, ArtifactEnvelope, ArtifactExport};
use crate::gate;
use crate::mutation::MutationRequest;
use crate::overrides::{self, OverrideRequest};
use crate::policy::PolicyRequest;
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;
use crate::topology;

/// Source of "now" for expiry and timestamps
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub catalog_miss: CatalogMissPolicy,
    pub artifact_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            catalog_miss: CatalogMissPolicy::Drop,
            artifact_prefix: export::DEFAULT_PREFIX.to_string(),
        }
    }
}

/// Per-session serialized access to snapshots in a pluggable store
pub struct SessionEngine {
    catalog: Arc<ScenarioCatalog>,
    store: Arc<dyn SnapshotStore>,
    config: EngineConfig,
    clock: Clock,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionEngine {
    pub fn new(catalog: Arc<ScenarioCatalog>, store: Arc<dyn SnapshotStore>, config: EngineConfig) -> Self {
        Self {
            catalog,
            store,
            config,
            clock: Arc::new(Utc::now),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn catalog(&self) -> &Arc<ScenarioCatalog> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Lock for a well-formed session id. Entries nobody holds or waits on
    /// are pruned, so the map only tracks sessions with operations in flight.
    fn session_lock(&self, session_id: &str) -> EngineResult<Arc<AsyncMutex<()>>> {
        if !is_valid_session_id(session_id) {
            return Err(EngineError::SessionNotFound(session_id.to_string()));
        }
        let mut locks = self.locks.lock();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(locks.entry(session_id.to_string()).or_default().clone())
    }

    #[cfg(test)]
    fn lock_entries(&self) -> usize {
        self.locks.lock().len()
    }

    /// Load an existing snapshot with expired overrides compacted away.
    /// Returns whether anything was dropped.
    async fn load_existing(&self, session_id: &str, now: DateTime<Utc>) -> EngineResult<(Snapshot, bool)> {
        let mut snapshot = self
            .store
            .load(session_id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound(session_id.to_string()))?;

        let dropped = overrides::compact(&mut snapshot.overrides, now);
        if dropped > 0 {
            log::info!("Compacted {} expired override(s) in session {}", dropped, session_id);
        }
        Ok((snapshot, dropped > 0))
    }

    async fn commit(&self, mut snapshot: Snapshot, now: DateTime<Utc>) -> EngineResult<Snapshot> {
        snapshot.touch(now);
        self.store.save(&snapshot).await?;
        Ok(snapshot)
    }

    // ========================================================================
    // OPERATIONS
    // ========================================================================

    /// Create a fresh snapshot. A missing id gets a generated one; re-init of
    /// an existing id overwrites it.
    pub async fn init(&self, session_id: Option<&str>) -> EngineResult<Snapshot> {
        let session_id = match session_id.map(str::trim).filter(|s| !s.is_empty()) {
            Some(id) if is_valid_session_id(id) => id.to_string(),
            Some(id) => return Err(EngineError::SessionNotFound(id.to_string())),
            None => Uuid::new_v4().to_string(),
        };

        let lock = self.session_lock(&session_id)?;
        let _guard = lock.lock().await;

        let now = self.now();
        let snapshot = Snapshot::new(session_id, &self.catalog, now);
        self.store.save(&snapshot).await?;
        log::info!("Initialized session {}", snapshot.session_id);
        Ok(snapshot)
    }

    pub async fn inject_mutation(&self, session_id: &str, request: &MutationRequest) -> EngineResult<Snapshot> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock.lock().await;

        let now = self.now();
        let (mut snapshot, _) = self.load_existing(session_id, now).await?;
        let mutation = request.validate(&self.catalog, now)?;
        log::debug!(
            "Session {}: mutation {} {} on {}/{}",
            session_id,
            mutation.id,
            mutation.kind,
            mutation.service_id,
            mutation.field_id
        );
        snapshot.mutations.push(mutation);
        self.commit(snapshot, now).await
    }

    /// Compile, filter, project and gate; overwrites the previous run
    pub async fn recompute(&self, session_id: &str) -> EngineResult<Snapshot> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock.lock().await;

        let now = self.now();
        let (mut snapshot, _) = self.load_existing(session_id, now).await?;

        let findings = compiler::compile(&snapshot.mutations, &self.catalog, self.config.catalog_miss);
        let (active, suppressed) = overrides::active_findings(&findings, &snapshot.overrides, now);
        let edges = topology::project(self.catalog.edges(), &active);
        let summary = gate::evaluate(&active, suppressed, &snapshot.policy, snapshot.run_count() + 1, now);

        log::info!(
            "Session {} run {}: gate={} findings={} blocked={} suppressed={}",
            session_id,
            summary.run_count,
            summary.gate,
            summary.finding_count,
            summary.blocked_count,
            summary.suppressed_count
        );

        snapshot.findings = active;
        snapshot.edges = edges;
        snapshot.run_summary = summary;
        self.commit(snapshot, now).await
    }

    pub async fn set_policy(&self, session_id: &str, request: &PolicyRequest) -> EngineResult<Snapshot> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock.lock().await;

        let now = self.now();
        let (mut snapshot, _) = self.load_existing(session_id, now).await?;
        snapshot.policy = request.parse().ok_or(ValidationError::Policy)?;
        self.commit(snapshot, now).await
    }

    pub async fn add_override(&self, session_id: &str, request: &OverrideRequest) -> EngineResult<Snapshot> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock.lock().await;

        let now = self.now();
        let (mut snapshot, _) = self.load_existing(session_id, now).await?;
        let entry = request.validate(now)?;
        log::debug!(
            "Session {}: override {} on {}/{} until {}",
            session_id,
            entry.id,
            entry.field_id,
            entry.change_type,
            entry.expires
        );
        snapshot.overrides.push(entry);
        self.commit(snapshot, now).await
    }

    /// Pure catalog lookup; unknown services get an empty chain
    pub fn resolve_escalation(&self, service_id: &str) -> Vec<EscalationStep> {
        self.catalog.escalation_chain(service_id)
    }

    /// Current state; persists only when compaction dropped something
    pub async fn read_snapshot(&self, session_id: &str) -> EngineResult<Snapshot> {
        let lock = self.session_lock(session_id)?;
        let _guard = lock.lock().await;

        let now = self.now();
        let (snapshot, compacted) = self.load_existing(session_id, now).await?;
        if compacted {
            return self.commit(snapshot, now).await;
        }
        Ok(snapshot)
    }

    /// Ingest envelope and storage key for the session's last run
    pub async fn export_artifact(
        &self,
        session_id: &str,
        organization: &str,
        project: &str,
        service: Option<&str>,
    ) -> EngineResult<ArtifactExport> {
        let snapshot = self.read_snapshot(session_id).await?;
        let envelope = ArtifactEnvelope::from_snapshot(&snapshot, organization, project, service)?;
        Ok(envelope.into_export(&self.config.artifact_prefix))
    }

    pub async fn list_sessions(&self) -> EngineResult<Vec<String>> {
        Ok(self.store.list_sessions().await?)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sample_catalog;
    use crate::gate::Gate;
    use crate::policy::{EnforcementMode, Severity};
    use crate::store::{MemoryStore, StoreError};
    use crate::topology::EdgeStatus;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn engine() -> SessionEngine {
        SessionEngine::new(
            Arc::new(sample_catalog()),
            Arc::new(MemoryStore::new()),
            EngineConfig::default(),
        )
    }

    fn override_request(expires: &str) -> OverrideRequest {
        OverrideRequest {
            field_id: "response_x".to_string(),
            change_type: Some("*".to_string()),
            expires: expires.to_string(),
            reason: "accepted".to_string(),
            ticket: None,
        }
    }

    async fn session_with_high_mutation(engine: &SessionEngine) -> String {
        let id = engine.init(None).await.unwrap().session_id;
        engine
            .inject_mutation(&id, &MutationRequest::new("enum_changed", "a", "response_x"))
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_init_defaults() {
        let engine = engine();
        let snapshot = engine.init(Some("demo-1")).await.unwrap();
        assert_eq!(snapshot.session_id, "demo-1");
        assert_eq!(snapshot.run_count(), 0);
        assert_eq!(snapshot.run_summary.gate, Gate::Pass);
        assert_eq!(snapshot.policy.mode, EnforcementMode::Warn);
        assert_eq!(snapshot.policy.fail_on, Severity::High);
        assert!(snapshot.edges.iter().all(|e| e.status == EdgeStatus::Healthy));
    }

    #[tokio::test]
    async fn test_block_mode_blocks_high_finding() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        engine.set_policy(&id, &PolicyRequest::new("block", "high")).await.unwrap();

        let snapshot = engine.recompute(&id).await.unwrap();
        let summary = &snapshot.run_summary;
        assert_eq!(summary.finding_count, 1);
        assert_eq!(summary.blocked_count, 1);
        assert_eq!(summary.gate, Gate::Block);
        assert_eq!(summary.run_count, 1);
        let edge = snapshot.edges.iter().find(|e| e.field_id == "response_x").unwrap();
        assert_eq!(edge.status, EdgeStatus::Blocked);
    }

    #[tokio::test]
    async fn test_live_wildcard_override_passes() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        engine.set_policy(&id, &PolicyRequest::new("block", "high")).await.unwrap();
        engine.add_override(&id, &override_request("2099-01-01")).await.unwrap();

        let snapshot = engine.recompute(&id).await.unwrap();
        assert_eq!(snapshot.run_summary.finding_count, 0);
        assert_eq!(snapshot.run_summary.suppressed_count, 1);
        assert_eq!(snapshot.run_summary.gate, Gate::Pass);
        assert!(snapshot.edges.iter().all(|e| e.status == EdgeStatus::Healthy));
    }

    #[tokio::test]
    async fn test_expired_override_does_not_suppress() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        let yesterday = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
        engine.add_override(&id, &override_request(&yesterday)).await.unwrap();

        let snapshot = engine.recompute(&id).await.unwrap();
        assert_eq!(snapshot.run_summary.finding_count, 1);
        assert!(snapshot.overrides.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_mutation_rejected_without_change() {
        let engine = engine();
        let id = engine.init(None).await.unwrap().session_id;
        let err = engine
            .inject_mutation(&id, &MutationRequest::new("enum_changed", "a", "response_z"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(ValidationError::MutationTypeOrField)));
        assert_eq!(err.to_string(), "mutation requires valid type and fieldId");
        assert!(engine.read_snapshot(&id).await.unwrap().mutations.is_empty());
    }

    #[tokio::test]
    async fn test_warn_mode_passes_with_blocked_count() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        engine.set_policy(&id, &PolicyRequest::new("warn", "high")).await.unwrap();

        let summary = engine.recompute(&id).await.unwrap().run_summary;
        assert_eq!(summary.gate, Gate::Pass);
        assert_eq!(summary.blocked_count, 1);
    }

    #[tokio::test]
    async fn test_unknown_escalation_is_empty() {
        let engine = engine();
        assert!(engine.resolve_escalation("nobody").is_empty());
        assert_eq!(engine.resolve_escalation(" A ").len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_policy_leaves_policy_unchanged() {
        let engine = engine();
        let id = engine.init(None).await.unwrap().session_id;
        engine.set_policy(&id, &PolicyRequest::new("block", "medium")).await.unwrap();

        let err = engine.set_policy(&id, &PolicyRequest::new("strict", "high")).await.unwrap_err();
        assert_eq!(err.to_string(), "policy requires valid mode and failOn");
        let policy = engine.read_snapshot(&id).await.unwrap().policy;
        assert_eq!(policy.mode, EnforcementMode::Block);
        assert_eq!(policy.fail_on, Severity::Medium);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        let first = engine.recompute(&id).await.unwrap();
        let second = engine.recompute(&id).await.unwrap();

        assert_eq!(first.findings, second.findings);
        assert_eq!(first.edges, second.edges);
        let (a, b) = (&first.run_summary, &second.run_summary);
        assert_eq!((a.gate, a.finding_count, a.blocked_count, a.warning_count), (b.gate, b.finding_count, b.blocked_count, b.warning_count));
        assert_eq!(b.run_count, a.run_count + 1);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let engine = engine();
        assert!(matches!(engine.read_snapshot("missing").await, Err(EngineError::SessionNotFound(_))));
        assert!(matches!(engine.recompute("../x").await, Err(EngineError::SessionNotFound(_))));
        let err = engine
            .inject_mutation("missing", &MutationRequest::new("bogus", "", ""))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SessionNotFound(_)));
    }

    #[tokio::test]
    async fn test_lock_map_stays_bounded_for_unknown_sessions() {
        let engine = engine();
        let id = engine.init(Some("known")).await.unwrap().session_id;
        for i in 0..1000 {
            let _ = engine.read_snapshot(&format!("ghost-{}", i)).await;
            let _ = engine.read_snapshot("../../etc/passwd").await;
        }
        assert!(engine.lock_entries() <= 1);
        engine.read_snapshot(&id).await.unwrap();
        assert!(engine.lock_entries() <= 1);
    }

    #[tokio::test]
    async fn test_unrecognized_override_type_is_appended_and_inert() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        let request = OverrideRequest {
            change_type: Some("breaking_change".to_string()),
            ..override_request("2099-01-01")
        };
        let snapshot = engine.add_override(&id, &request).await.unwrap();
        assert_eq!(snapshot.overrides.len(), 1);
        assert_eq!(snapshot.overrides[0].change_type.as_str(), "breaking_change");

        let run = engine.recompute(&id).await.unwrap();
        assert_eq!(run.findings.len(), 1);
        assert_eq!(run.run_summary.suppressed_count, 0);
    }

    #[tokio::test]
    async fn test_read_compacts_and_persists() {
        let start = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        let later = start + Duration::days(3);
        let flip = Arc::new(AtomicBool::new(false));
        let clock_flip = flip.clone();
        let store = Arc::new(MemoryStore::new());
        let engine = SessionEngine::new(Arc::new(sample_catalog()), store.clone(), EngineConfig::default())
            .with_clock(Arc::new(move || if clock_flip.load(Ordering::SeqCst) { later } else { start }));

        let id = engine.init(None).await.unwrap().session_id;
        engine.add_override(&id, &override_request("2026-05-02")).await.unwrap();
        assert_eq!(engine.read_snapshot(&id).await.unwrap().overrides.len(), 1);

        flip.store(true, Ordering::SeqCst);
        assert!(engine.read_snapshot(&id).await.unwrap().overrides.is_empty());
        let stored = store.load(&id).await.unwrap().unwrap();
        assert!(stored.overrides.is_empty());
        assert_eq!(stored.updated_at, later);
    }

    #[tokio::test]
    async fn test_concurrent_injections_are_all_kept() {
        let engine = Arc::new(engine());
        let id = engine.init(None).await.unwrap().session_id;

        let mut handles = Vec::new();
        for n in 0..16 {
            let engine = engine.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                let field = if n % 2 == 0 { "response_x" } else { "response_y" };
                engine
                    .inject_mutation(&id, &MutationRequest::new("enum_changed", "", field))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = engine.recompute(&id).await.unwrap();
        assert_eq!(snapshot.mutations.len(), 16);
        assert_eq!(snapshot.run_summary.finding_count, 16);
        assert_eq!(snapshot.run_summary.blocked_count, 8);
    }

    #[tokio::test]
    async fn test_surface_policy_reports_uncovered_mutation() {
        let engine = SessionEngine::new(
            Arc::new(sample_catalog()),
            Arc::new(MemoryStore::new()),
            EngineConfig { catalog_miss: CatalogMissPolicy::Surface, ..Default::default() },
        );
        let id = engine.init(None).await.unwrap().session_id;
        engine
            .inject_mutation(&id, &MutationRequest::new("annotation_missing", "a", "response_x"))
            .await
            .unwrap();
        let snapshot = engine.recompute(&id).await.unwrap();
        assert_eq!(snapshot.run_summary.finding_count, 1);
        assert_eq!(snapshot.findings[0].severity, Severity::Low);
        assert_eq!(snapshot.edges[0].status, EdgeStatus::Warning);
    }

    #[tokio::test]
    async fn test_export_after_run() {
        let engine = engine();
        let id = session_with_high_mutation(&engine).await;
        engine.recompute(&id).await.unwrap();

        let export = engine.export_artifact(&id, "Acme", "checkout-web", None).await.unwrap();
        assert!(export.key.starts_with("stricture/v1/org=acme/project=checkout-web/service=a/date="));
        assert!(export.key.ends_with("/run=run-1/payload.json"));
        assert_eq!(export.payload.diff.changes.len(), 1);
    }

    // Store that fails saves on demand
    struct FlakyStore {
        inner: MemoryStore,
        fail_saves: AtomicBool,
    }

    #[async_trait]
    impl SnapshotStore for FlakyStore {
        async fn load(&self, session_id: &str) -> Result<Option<Snapshot>, StoreError> {
            self.inner.load(session_id).await
        }

        async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(StoreError::Backend("disk full".to_string()));
            }
            self.inner.save(snapshot).await
        }

        async fn list_sessions(&self) -> Result<Vec<String>, StoreError> {
            self.inner.list_sessions().await
        }
    }

    #[tokio::test]
    async fn test_storage_failure_persists_nothing() {
        let store = Arc::new(FlakyStore { inner: MemoryStore::new(), fail_saves: AtomicBool::new(false) });
        let engine = SessionEngine::new(Arc::new(sample_catalog()), store.clone(), EngineConfig::default());
        let id = session_with_high_mutation(&engine).await;

        store.fail_saves.store(true, Ordering::SeqCst);
        assert!(matches!(engine.recompute(&id).await, Err(EngineError::Storage(_))));
        assert!(matches!(
            engine.add_override(&id, &override_request("2099-01-01")).await,
            Err(EngineError::Storage(_))
        ));

        store.fail_saves.store(false, Ordering::SeqCst);
        let snapshot = engine.read_snapshot(&id).await.unwrap();
        assert_eq!(snapshot.run_count(), 0);
        assert!(snapshot.overrides.is_empty());
        assert_eq!(snapshot.mutations.len(), 1);
    }
}
