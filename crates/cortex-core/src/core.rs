//! CortexCore - the engine facade
//!
//! Wires the storage layer and the lifecycle subsystems into the
//! programmatic interface consumed by agent hosts:
//!
//! - Write path: bloom pre-check -> resonance gate -> valence tagging ->
//!   chained persist -> silent twin -> tier assignment -> co-access
//! - Read path: band routing -> filtered vector search -> decay-applied
//!   energy floor -> labilization -> co-access prefetch
//! - Background: homeostasis prune cycle, consolidation sweep, co-access
//!   decay
//! - Action queue: Bellman policy evaluation over scan snapshots
//!
//! All state is explicit: no process-wide singletons, capabilities
//! (encoder, clock, randomness) are injected at construction.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::admission::{
    semantic_fingerprint, AdaptiveResonanceGate, FastNegativeFilter, GateDecision,
};
use crate::capabilities::{
    check_deadline, cosine_similarity, is_zero_vector, seeded_rng, Clock, Encoder,
};
use crate::config::CortexConfig;
use crate::consolidation::{
    DualTraceConsolidator, EnergyVerdict, HomeostasisEngine, PruneReport, ReconsolidationTracker,
    SweepCounts,
};
use crate::crdt::CrdtEngram;
use crate::engram::{
    classify_valence, content_hash, Engram, EngramState, RetrievedEngram, StoreInput,
    StoreOutcome,
};
use crate::error::{CortexError, Result};
use crate::frequency::TierClassifier;
use crate::graph::{AnticipatoryCache, CausalGraph, CausalLink, PrefetchResult};
use crate::policy::{ActionItem, PolicyConfig, PolicyEngine};
use crate::search::{
    EntryMeta, QueryHints, RetrievalBand, RetrievalRouter, SearchFilter, VectorIndex,
};
use crate::session::{SessionGuardrail, WorkingSetBuffer};
use crate::storage::{ChainReport, EngramStore, ScanFilter, TenantStats};

/// Bounded retries for chain-lock contention before surfacing the error
const CHAIN_LOCK_RETRIES: u32 = 3;

/// Candidates considered per anticipatory prefetch
const MAX_PREFETCH: usize = 5;

// ============================================================================
// REQUEST / RESPONSE TYPES
// ============================================================================

/// Result of a store operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResult {
    /// Resonance (reinforced an existing engram) or reset (inserted)
    pub outcome: StoreOutcome,
    /// The surviving engram: the reinforced one on resonance, the new
    /// one on reset
    pub engram_id: String,
    /// Id of the silent twin created on reset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub silent_id: Option<String>,
    /// Best similarity observed by the gate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// A retrieval request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SearchRequest {
    /// Tenant scope
    pub tenant_id: String,
    /// Caller's project (band config decides whether it constrains)
    pub project_id: Option<String>,
    /// Query text; routed to a band by shape
    pub query: String,
    /// Pre-computed query vector; encoded from `query` when absent
    pub query_vector: Option<Vec<f32>>,
    /// Band hints
    #[serde(default)]
    pub hints: QueryHints,
    /// Foreground deadline
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

/// A retrieval response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Band the query was routed to
    pub band: RetrievalBand,
    /// Ranked hits
    pub results: Vec<RetrievedEngram>,
    /// Anticipatory prefetch plan, when confidence cleared the threshold
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefetch: Option<PrefetchResult>,
}

// ============================================================================
// CORE
// ============================================================================

/// The assembled memory engine
pub struct CortexCore {
    config: CortexConfig,
    store: EngramStore,
    index: Mutex<VectorIndex>,
    gate: AdaptiveResonanceGate,
    bloom: Mutex<FastNegativeFilter>,
    consolidator: DualTraceConsolidator,
    homeostasis: HomeostasisEngine,
    classifier: TierClassifier,
    reconsolidation: Mutex<ReconsolidationTracker>,
    anticipatory: Mutex<AnticipatoryCache>,
    causal: Mutex<CausalGraph>,
    policy: PolicyEngine,
    encoder: Arc<dyn Encoder>,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl CortexCore {
    /// Assemble an engine from injected capabilities.
    ///
    /// Fails loudly on misconfiguration: invalid vigilance/thresholds,
    /// zero encoder dimension, unusable database path.
    pub fn new(
        db_path: Option<PathBuf>,
        config: CortexConfig,
        encoder: Arc<dyn Encoder>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let dimensions = encoder.dimensions();
        if dimensions == 0 {
            return Err(CortexError::Validation(
                "encoder must report a positive dimension".to_string(),
            ));
        }

        let store = EngramStore::new(db_path)?;
        let mut index = VectorIndex::new(dimensions)?;
        let mut bloom =
            FastNegativeFilter::new(config.bloom_expected_items, config.bloom_fp_rate);
        let mut causal = CausalGraph::new();

        // Warm the index, the admission filter, and the causal graph from
        // persisted state
        let rows = store.scan_all()?;
        for engram in &rows {
            bloom.add(&semantic_fingerprint(&engram.content));
            if let Some(vector) = store.get_embedding(&engram.id)? {
                if vector.len() == dimensions {
                    if !is_zero_vector(&vector) {
                        index.upsert(&engram.id, &vector, Self::meta_for(engram))?;
                    }
                } else {
                    tracing::warn!(
                        engram = %engram.id,
                        "Skipping persisted embedding with stale dimensions"
                    );
                }
            }
        }
        for link in store.load_causal_edges()? {
            causal.add_link(link);
        }
        if !rows.is_empty() {
            tracing::info!(engrams = rows.len(), "Rebuilt in-memory state from store");
        }

        let policy = PolicyEngine::new(PolicyConfig {
            gamma: config.gamma,
            blocking_multiplier: config.blocking_multiplier,
            cross_project_bonus: config.cross_project_bonus,
            error_recency_weight: config.error_recency_weight,
            ghost_age_decay: config.ghost_age_decay,
            max_actions: config.max_actions,
            recency_window_hours: config.recency_window_hours,
        });

        Ok(Self {
            gate: AdaptiveResonanceGate::new(config.vigilance_rho, config.art_search_k),
            consolidator: DualTraceConsolidator::new(
                config.maturation_days,
                config.silent_initial_energy,
                config.decay_rate_per_day,
            ),
            homeostasis: HomeostasisEngine::new(config.decay_rate_per_day, config.atp_threshold),
            classifier: TierClassifier::new(
                config.tier_promotion_thresholds,
                config.tier_min_energy,
            ),
            reconsolidation: Mutex::new(ReconsolidationTracker::new(
                config.labile_window_seconds,
                config.reconsolidate_boost,
                config.ignore_penalty,
            )),
            anticipatory: Mutex::new(AnticipatoryCache::new(
                config.coaccess_decay_factor,
                config.prefetch_threshold,
                MAX_PREFETCH,
                config.anticipatory_cache_size,
            )),
            causal: Mutex::new(causal),
            policy,
            store,
            index: Mutex::new(index),
            bloom: Mutex::new(bloom),
            rng: Mutex::new(seeded_rng(config.rng_seed)),
            encoder,
            clock,
            config,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &CortexConfig {
        &self.config
    }

    /// Direct store access (read-mostly; hosts use it for inspection)
    pub fn engram_store(&self) -> &EngramStore {
        &self.store
    }

    fn meta_for(engram: &Engram) -> EntryMeta {
        EntryMeta {
            tenant_id: engram.tenant_id.clone(),
            project_id: engram.project_id.clone(),
            energy: engram.energy_level,
            tier: engram.tier,
            is_diamond: engram.is_diamond,
            state: engram.state,
        }
    }

    fn index_guard(&self) -> Result<MutexGuard<'_, VectorIndex>> {
        self.index
            .lock()
            .map_err(|_| CortexError::IndexUnavailable("index lock poisoned".to_string()))
    }

    // ========================================================================
    // WRITE PATH
    // ========================================================================

    /// Store a fact through the admission pipeline.
    ///
    /// Novel content inserts a new active engram plus its silent twin;
    /// near-duplicate content reinforces the matched engram instead.
    pub fn store(&self, input: StoreInput) -> Result<StoreResult> {
        check_deadline(input.deadline)?;

        if input.content.trim().is_empty() {
            return Err(CortexError::Validation("content must not be empty".to_string()));
        }

        let vector = self.encoder.encode(&input.content)?;
        let hash = content_hash(&input.content);

        // Bloom fast-negative over the normalized fingerprint: provably
        // novel content skips the gate, rephrasings of seen content don't
        let maybe_seen = {
            let bloom = self
                .bloom
                .lock()
                .map_err(|_| CortexError::Validation("bloom lock poisoned".into()))?;
            bloom.might_contain(&semantic_fingerprint(&input.content))
        };

        if maybe_seen {
            let decision = {
                match self.index_guard() {
                    Ok(index) => self.gate.evaluate(&vector, &input.tenant_id, &index),
                    Err(err) => Err(err),
                }
            };
            match decision {
                Ok(GateDecision::Resonance { engram_id, similarity }) => {
                    return self.reinforce_on_resonance(&engram_id, similarity, &input);
                }
                Ok(GateDecision::Reset { best_similarity }) => {
                    return self.insert_new(input, vector, hash, Some(best_similarity));
                }
                Err(CortexError::IndexUnavailable(reason)) => {
                    // Degrade to the fast-insert path; duplicates will be
                    // merged by a later consolidation sweep
                    tracing::warn!(%reason, "Gate degraded to fast-insert: index unavailable");
                    return self.insert_new(input, vector, hash, None);
                }
                Err(other) => return Err(other),
            }
        }

        self.insert_new(input, vector, hash, None)
    }

    fn reinforce_on_resonance(
        &self,
        engram_id: &str,
        similarity: f32,
        input: &StoreInput,
    ) -> Result<StoreResult> {
        check_deadline(input.deadline)?;
        let now = self.clock.now();

        // The candidate is never inserted; its identity survives as an
        // entanglement on the reinforced engram
        let candidate_id = Uuid::new_v4().to_string();
        self.store.reinforce(engram_id, self.config.ltp_boost, now)?;
        self.store.add_entangled_ref(engram_id, &candidate_id)?;
        self.sync_row_into_index(engram_id)?;
        self.migrate_tier_if_needed(engram_id)?;

        Ok(StoreResult {
            outcome: StoreOutcome::Resonance,
            engram_id: engram_id.to_string(),
            silent_id: None,
            similarity: Some(similarity),
        })
    }

    fn insert_new(
        &self,
        input: StoreInput,
        vector: Vec<f32>,
        hash: String,
        best_similarity: Option<f32>,
    ) -> Result<StoreResult> {
        check_deadline(input.deadline)?;
        let now = self.clock.now();

        let valence = classify_valence(&input.content, input.fact_type);
        let mut engram = Engram {
            id: Uuid::new_v4().to_string(),
            tenant_id: input.tenant_id.clone(),
            project_id: input.project_id.clone(),
            content: input.content.clone(),
            content_hash: hash.clone(),
            fact_type: input.fact_type,
            confidence: input.confidence,
            created_at: now,
            last_accessed: now,
            energy_level: valence.initial_energy(),
            access_count: 0,
            valence: valence.valence,
            arousal: valence.arousal,
            energy_multiplier: valence.energy_multiplier(),
            state: EngramState::Active,
            active_twin_id: None,
            maturation_days: self.config.maturation_days,
            contradiction_count: 0,
            tier: self.classifier.classify(0, valence.initial_energy()),
            is_diamond: input.is_diamond,
            entangled_refs: vec![],
            tags: input.tags.clone(),
            source: input.source.clone(),
            extra: input.extra.clone(),
            hash: String::new(),
            prev_hash: String::new(),
        };

        self.put_with_retry(&mut engram)?;
        self.store.put_embedding(&engram.id, &vector, self.encoder.name())?;

        // Silent twin: the cortical consolidation buffer
        let mut silent = self.consolidator.make_silent(&engram, now);
        self.put_with_retry(&mut silent)?;
        self.store.put_embedding(&silent.id, &vector, self.encoder.name())?;

        // Index upserts are non-fatal when the index is unavailable: the
        // rows and embeddings are persisted, so a rebuilt index recovers
        // them at next boot. Zero vectors carry no direction and stay
        // out of the index entirely.
        if !is_zero_vector(&vector) {
            match self.index_guard() {
                Ok(mut index) => {
                    index.upsert(&engram.id, &vector, Self::meta_for(&engram))?;
                    index.upsert(&silent.id, &vector, Self::meta_for(&silent))?;
                }
                Err(CortexError::IndexUnavailable(reason)) => {
                    tracing::warn!(%reason, "Skipping index upsert: index unavailable");
                }
                Err(other) => return Err(other),
            }
        }

        {
            let mut bloom = self
                .bloom
                .lock()
                .map_err(|_| CortexError::Validation("bloom lock poisoned".into()))?;
            bloom.add(&semantic_fingerprint(&engram.content));
        }

        // The write establishes recency in the co-access graph
        {
            let mut anticipatory = self
                .anticipatory
                .lock()
                .map_err(|_| CortexError::Validation("cache lock poisoned".into()))?;
            anticipatory.on_access(&engram.id, Some(engram.clone()));
        }

        tracing::info!(
            engram = %engram.id,
            silent = %silent.id,
            tenant = %engram.tenant_id,
            best_sim = best_similarity.unwrap_or(0.0),
            "Engram admitted (reset)"
        );

        Ok(StoreResult {
            outcome: StoreOutcome::Reset,
            engram_id: engram.id,
            silent_id: Some(silent.id),
            similarity: best_similarity,
        })
    }

    fn put_with_retry(&self, engram: &mut Engram) -> Result<()> {
        let mut backoff_ms = 5u64;
        for attempt in 0..=CHAIN_LOCK_RETRIES {
            match self.store.put(engram) {
                Err(CortexError::ChainLocked(tenant)) if attempt < CHAIN_LOCK_RETRIES => {
                    // Capped exponential backoff with seeded jitter
                    let jitter: u64 = self
                        .rng
                        .lock()
                        .map(|mut rng| rng.gen_range(0..5))
                        .unwrap_or(0);
                    tracing::debug!(%tenant, attempt, "Append chain contended; retrying");
                    std::thread::sleep(std::time::Duration::from_millis(backoff_ms + jitter));
                    backoff_ms = (backoff_ms * 2).min(100);
                }
                other => return other,
            }
        }
        unreachable!("put retry loop always returns")
    }

    fn sync_row_into_index(&self, engram_id: &str) -> Result<()> {
        if let Some(row) = self.store.get(engram_id)? {
            let mut index = self.index_guard()?;
            index.set_energy(engram_id, row.energy_level);
            index.set_tier(engram_id, row.tier);
            index.set_state(engram_id, row.state);
        }
        Ok(())
    }

    fn migrate_tier_if_needed(&self, engram_id: &str) -> Result<()> {
        let Some(row) = self.store.get(engram_id)? else {
            return Ok(());
        };
        if let Some(new_tier) =
            self.classifier
                .evaluate_and_migrate(engram_id, row.access_count, row.energy_level, row.tier)
        {
            self.store.set_tier(engram_id, new_tier)?;
            self.index_guard()?.set_tier(engram_id, new_tier);
        }
        Ok(())
    }

    // ========================================================================
    // READ PATH
    // ========================================================================

    /// Retrieve engrams for a query, routed through the band classifier.
    ///
    /// Returned scores are cosine similarities; the band's energy floor
    /// is applied to the *current* (decay-adjusted) energy. Every hit is
    /// labilized and recorded in the co-access graph.
    pub fn search(&self, request: SearchRequest) -> Result<SearchResponse> {
        check_deadline(request.deadline)?;
        let now = self.clock.now();

        let band = RetrievalRouter::classify_query(&request.query, request.hints);
        let band_config = RetrievalRouter::config_for(band);

        let vector = match &request.query_vector {
            Some(v) => v.clone(),
            None => self.encoder.encode(&request.query)?,
        };

        let filter = SearchFilter {
            tenant_id: request.tenant_id.clone(),
            project_id: request.project_id.clone(),
            min_energy: band_config.min_energy,
            required_diamond: band_config.require_diamond,
            allowed_tiers: None,
            allow_cross_project: band_config.cross_project,
        };

        let mut hits = {
            let index = self.index_guard()?;
            index.search(&vector, band_config.max_results, &filter)?
        };

        // Gamma is the exact-recall band: union in keyword matches that
        // the ANN scan may have missed, scored by true cosine
        if band == RetrievalBand::Gamma {
            let keyword_ids = self.store.keyword_search(
                &request.tenant_id,
                &request.query,
                band_config.max_results,
            )?;
            let seen: HashSet<String> = hits.iter().map(|(id, _)| id.clone()).collect();
            for id in keyword_ids {
                if seen.contains(&id) {
                    continue;
                }
                if let Some(stored) = self.store.get_embedding(&id)? {
                    hits.push((id, cosine_similarity(&vector, &stored)));
                }
            }
            hits.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });
            hits.truncate(band_config.max_results);
        }

        let mut results = Vec::with_capacity(hits.len());
        let mut best_prefetch: Option<PrefetchResult> = None;

        for (id, score) in hits {
            let Some(row) = self.store.get(&id)? else {
                continue;
            };
            if !row.state.is_searchable() || row.tenant_id != request.tenant_id {
                continue;
            }
            if !band_config.cross_project {
                if let Some(project) = &request.project_id {
                    if &row.project_id != project {
                        continue;
                    }
                }
            }
            if band_config.require_diamond && !row.is_diamond {
                continue;
            }

            // Decay-applied floor: stale energy does not count
            let current_energy = row.compute_decay(now, self.config.decay_rate_per_day);
            if current_energy < band_config.min_energy {
                continue;
            }

            self.store.touch_access(&id, now)?;
            {
                let mut tracker = self
                    .reconsolidation
                    .lock()
                    .map_err(|_| CortexError::Validation("labile lock poisoned".into()))?;
                tracker.on_access(&id, now);
            }
            {
                let mut anticipatory = self
                    .anticipatory
                    .lock()
                    .map_err(|_| CortexError::Validation("cache lock poisoned".into()))?;
                let plan = anticipatory.on_access(&id, Some(row.clone()));
                if !plan.prefetched_ids.is_empty()
                    && best_prefetch
                        .as_ref()
                        .map(|p| plan.confidence > p.confidence)
                        .unwrap_or(true)
                {
                    best_prefetch = Some(plan);
                }
            }
            self.migrate_tier_if_needed(&id)?;

            results.push(RetrievedEngram {
                id: row.id.clone(),
                content: row.content.clone(),
                score,
                project_id: row.project_id.clone(),
                fact_type: row.fact_type,
                energy: current_energy,
                tier: row.tier,
            });
        }

        Ok(SearchResponse {
            band,
            results,
            prefetch: best_prefetch,
        })
    }

    /// List a tenant's recallable (active + matured) engrams
    pub fn recall(&self, tenant_id: &str, project_id: Option<&str>) -> Result<Vec<Engram>> {
        self.store.scan(
            tenant_id,
            project_id,
            &ScanFilter {
                states: Some(vec![EngramState::Active, EngramState::Matured]),
                ..Default::default()
            },
        )
    }

    // ========================================================================
    // RECONSOLIDATION
    // ========================================================================

    /// Confirm a recently accessed engram: re-stabilizes it with an
    /// energy boost. Returns false when the labile window already closed.
    pub fn confirm(&self, engram_id: &str) -> Result<bool> {
        if self.store.get(engram_id)?.is_none() {
            return Err(CortexError::UnknownId(engram_id.to_string()));
        }
        let now = self.clock.now();

        let boost = {
            let mut tracker = self
                .reconsolidation
                .lock()
                .map_err(|_| CortexError::Validation("labile lock poisoned".into()))?;
            tracker.confirm(engram_id, now)
        };

        match boost {
            Some(boost) => {
                self.store.reinforce(engram_id, boost, now)?;
                self.sync_row_into_index(engram_id)?;
                self.migrate_tier_if_needed(engram_id)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Contradict a recently accessed engram. Within the labile window
    /// this also resets the maturation clock of its silent twins (and of
    /// the engram itself when it is silent). Returns false when the
    /// window already closed.
    pub fn contradict(&self, engram_id: &str) -> Result<bool> {
        let Some(row) = self.store.get(engram_id)? else {
            return Err(CortexError::UnknownId(engram_id.to_string()));
        };
        let now = self.clock.now();

        let in_window = {
            let mut tracker = self
                .reconsolidation
                .lock()
                .map_err(|_| CortexError::Validation("labile lock poisoned".into()))?;
            tracker.contradict(engram_id, now)
        };
        if !in_window {
            return Ok(false);
        }

        if row.state == EngramState::Silent {
            self.store.contradict_silent(engram_id, now)?;
        }
        for silent in self.store.silents_of(engram_id)? {
            self.store.contradict_silent(&silent.id, now)?;
        }
        Ok(true)
    }

    // ========================================================================
    // BACKGROUND CYCLES
    // ========================================================================

    /// One homeostasis cycle: recompute decay, prune depleted engrams,
    /// sweep expired labiles, run the consolidation sweep. Idempotent.
    pub fn prune_cycle(&self, tenant_id: &str) -> Result<PruneReport> {
        let now = self.clock.now();
        let mut report = PruneReport::default();

        // Decay pass over searchable engrams
        let rows = self.store.scan(
            tenant_id,
            None,
            &ScanFilter {
                states: Some(vec![EngramState::Active, EngramState::Matured]),
                ..Default::default()
            },
        )?;

        let mut energy_updates: Vec<(String, f64)> = Vec::new();
        let mut reclaimed = 0usize;
        for engram in &rows {
            match self.homeostasis.evaluate(engram, now) {
                EnergyVerdict::Prune => {
                    reclaimed += self.resolve_orphaned_silents(&engram.id)?;
                    self.destroy_engram(&engram.id)?;
                    report.pruned += 1;
                }
                EnergyVerdict::Update(energy) => {
                    energy_updates.push((engram.id.clone(), energy));
                }
                EnergyVerdict::Keep => {}
            }
        }
        report.deceased += reclaimed;

        if !energy_updates.is_empty() {
            report.decayed = self.store.batch_set_energy(&energy_updates, now)?;
            let mut index = self.index_guard()?;
            for (id, energy) in &energy_updates {
                index.set_energy(id, *energy);
            }
        }

        // Expired labile windows draw the ignore penalty
        let penalties = {
            let mut tracker = self
                .reconsolidation
                .lock()
                .map_err(|_| CortexError::Validation("labile lock poisoned".into()))?;
            tracker.sweep(now)
        };
        for (id, delta) in penalties {
            match self.store.apply_energy_delta(&id, delta) {
                Ok(()) => {
                    report.expired_labiles += 1;
                    self.sync_row_into_index(&id)?;
                }
                // The engram may have been pruned since it went labile
                Err(CortexError::UnknownId(_)) => {}
                Err(other) => return Err(other),
            }
        }

        // Coupled consolidation sweep
        let counts = self.consolidation_sweep(tenant_id)?;
        report.matured = counts.matured;
        report.deceased += counts.deceased;

        self.store
            .record_deceased(tenant_id, (report.pruned + reclaimed) as i64)?;

        tracing::info!(
            tenant = tenant_id,
            pruned = report.pruned,
            matured = report.matured,
            deceased = report.deceased,
            decayed = report.decayed,
            "Homeostasis cycle complete"
        );
        Ok(report)
    }

    /// Run the dual-trace consolidation sweep for a tenant
    pub fn consolidation_sweep(&self, tenant_id: &str) -> Result<SweepCounts> {
        let now = self.clock.now();
        let silents = self.store.scan(
            tenant_id,
            None,
            &ScanFilter {
                states: Some(vec![EngramState::Silent]),
                ..Default::default()
            },
        )?;

        let plan = self.consolidator.plan_sweep(&silents, now);

        for id in &plan.mature {
            self.store.set_state(id, EngramState::Matured)?;
            self.store.set_tier(id, crate::engram::Tier::Warm)?;
            let mut index = self.index_guard()?;
            index.set_state(id, EngramState::Matured);
            index.set_tier(id, crate::engram::Tier::Warm);
        }
        for id in &plan.decease {
            self.destroy_engram(id)?;
        }
        self.store.record_deceased(tenant_id, plan.decease.len() as i64)?;

        Ok(plan.counts())
    }

    /// Apply temporal decay to the co-access graph (background cadence)
    pub fn decay_coaccess(&self) -> Result<()> {
        let mut anticipatory = self
            .anticipatory
            .lock()
            .map_err(|_| CortexError::Validation("cache lock poisoned".into()))?;
        anticipatory.decay_all();
        Ok(())
    }

    /// Destruction path: index entry first, then the row, then every
    /// in-memory trace. A crash between the steps leaves at worst a
    /// store row that the next cycle re-prunes; a dangling vector is
    /// impossible.
    fn destroy_engram(&self, engram_id: &str) -> Result<()> {
        self.index_guard()?.delete(engram_id)?;
        self.store.delete(engram_id)?;
        self.causal
            .lock()
            .map_err(|_| CortexError::Validation("causal lock poisoned".into()))?
            .remove_node(engram_id);
        self.anticipatory
            .lock()
            .map_err(|_| CortexError::Validation("cache lock poisoned".into()))?
            .evict(engram_id);
        Ok(())
    }

    /// On active removal, every silent twin either promotes (when its
    /// maturation conditions already hold) or is reclaimed. Returns the
    /// number reclaimed.
    fn resolve_orphaned_silents(&self, active_id: &str) -> Result<usize> {
        let now = self.clock.now();
        let mut reclaimed = 0;
        for silent in self.store.silents_of(active_id)? {
            if self.consolidator.tick(&silent, now) == EngramState::Matured {
                self.store.set_state(&silent.id, EngramState::Matured)?;
                self.store.set_tier(&silent.id, crate::engram::Tier::Warm)?;
                let mut index = self.index_guard()?;
                index.set_state(&silent.id, EngramState::Matured);
                index.set_tier(&silent.id, crate::engram::Tier::Warm);
            } else {
                self.destroy_engram(&silent.id)?;
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    /// Remove an engram on explicit external request
    pub fn delete(&self, engram_id: &str) -> Result<bool> {
        let Some(row) = self.store.get(engram_id)? else {
            return Ok(false);
        };
        let reclaimed = self.resolve_orphaned_silents(engram_id)?;
        self.destroy_engram(engram_id)?;
        self.store
            .record_deceased(&row.tenant_id, 1 + reclaimed as i64)?;
        Ok(true)
    }

    // ========================================================================
    // ACTION QUEUE
    // ========================================================================

    /// Convert stored facts into a prioritized action queue
    pub fn prioritize(&self, tenant_id: &str, project_id: Option<&str>) -> Result<Vec<ActionItem>> {
        let facts = self.recall(tenant_id, project_id)?;
        Ok(self.policy.evaluate(&facts, self.clock.now()))
    }

    // ========================================================================
    // INTEGRITY / STATS
    // ========================================================================

    /// Recompute the tenant's hash chain
    pub fn verify_chain(&self, tenant_id: &str) -> Result<ChainReport> {
        self.store.verify_chain(tenant_id)
    }

    /// Aggregate statistics for a tenant
    pub fn stats(&self, tenant_id: &str) -> Result<TenantStats> {
        self.store.stats(tenant_id)
    }

    // ========================================================================
    // CAUSAL GRAPH
    // ========================================================================

    /// Record a causal relationship between two stored engrams
    pub fn add_causal_link(&self, link: CausalLink) -> Result<()> {
        if self.store.get(&link.cause_id)?.is_none() {
            return Err(CortexError::UnknownId(link.cause_id));
        }
        if self.store.get(&link.effect_id)?.is_none() {
            return Err(CortexError::UnknownId(link.effect_id));
        }
        self.store.insert_causal_edge(&link)?;
        self.causal
            .lock()
            .map_err(|_| CortexError::Validation("causal lock poisoned".into()))?
            .add_link(link);
        Ok(())
    }

    /// Downstream impact chain of an engram
    pub fn impact_chain(&self, engram_id: &str, max_depth: usize) -> Result<Vec<String>> {
        Ok(self
            .causal
            .lock()
            .map_err(|_| CortexError::Validation("causal lock poisoned".into()))?
            .impact_chain(engram_id, max_depth))
    }

    /// Root causes of an engram
    pub fn root_causes(&self, engram_id: &str, max_depth: usize) -> Result<Vec<String>> {
        Ok(self
            .causal
            .lock()
            .map_err(|_| CortexError::Validation("causal lock poisoned".into()))?
            .root_causes(engram_id, max_depth))
    }

    /// Engrams whose root causes have all been destroyed - candidates
    /// for deprecation
    pub fn find_zombies(&self, tenant_id: &str) -> Result<Vec<String>> {
        let alive: HashSet<String> = self
            .store
            .scan(tenant_id, None, &ScanFilter::default())?
            .into_iter()
            .map(|e| e.id)
            .collect();
        Ok(self
            .causal
            .lock()
            .map_err(|_| CortexError::Validation("causal lock poisoned".into()))?
            .find_zombies(&alive))
    }

    // ========================================================================
    // CRDT REPLICATION
    // ========================================================================

    /// Snapshot an engram's replica state for gossip exchange. Uses the
    /// persisted CRDT state when present; otherwise synthesizes one from
    /// the row.
    pub fn crdt_snapshot(&self, engram_id: &str, agent_id: &str) -> Result<CrdtEngram> {
        let row = self
            .store
            .get(engram_id)?
            .ok_or_else(|| CortexError::UnknownId(engram_id.to_string()))?;

        if let Some(json) = self.store.get_crdt_state(engram_id)? {
            if let Ok(state) = serde_json::from_str::<CrdtEngram>(&json) {
                return Ok(state);
            }
            tracing::warn!(engram = engram_id, "Discarding unreadable CRDT state");
        }

        let mut state = CrdtEngram::new(
            &row.id,
            &row.content,
            row.energy_level,
            row.created_at,
            agent_id,
        );
        if row.access_count > 0 {
            state.access_count.increment(agent_id, row.access_count as u64);
        }
        for tag in &row.tags {
            state.tags.add(tag, row.created_at);
        }
        Ok(state)
    }

    /// Merge a remote replica into the local engram.
    ///
    /// CRDT fields (access count, tags, energy) merge conflict-free and
    /// are applied to the row; the row's canonical content stays local -
    /// the merged content register travels in the persisted CRDT state
    /// for the next exchange.
    pub fn merge_replica(
        &self,
        engram_id: &str,
        remote: &CrdtEngram,
        agent_id: &str,
    ) -> Result<CrdtEngram> {
        let local = self.crdt_snapshot(engram_id, agent_id)?;
        let merged = local.merge(remote).ok_or_else(|| {
            CortexError::Validation(format!(
                "cannot merge replicas of different engrams: {} vs {}",
                engram_id, remote.engram_id
            ))
        })?;

        let mut row = self
            .store
            .get(engram_id)?
            .ok_or_else(|| CortexError::UnknownId(engram_id.to_string()))?;
        row.access_count = row.access_count.max(merged.access_count.value() as i64);
        row.energy_level = merged.energy.value.clamp(0.0, 1.0);
        for tag in merged.tags.elements() {
            if !row.tags.contains(&tag) {
                row.tags.push(tag);
            }
        }
        self.store.put(&mut row)?;
        self.store
            .set_crdt_state(engram_id, &serde_json::to_string(&merged).unwrap_or_default())?;
        self.sync_row_into_index(engram_id)?;

        Ok(merged)
    }

    // ========================================================================
    // SESSION HELPERS
    // ========================================================================

    /// Working-set buffer sized from the engine configuration
    pub fn working_set_buffer(&self) -> WorkingSetBuffer {
        WorkingSetBuffer::new(self.config.working_set_max_tokens)
    }

    /// Session guardrail sized from the engine configuration
    pub fn session_guardrail(&self) -> SessionGuardrail {
        SessionGuardrail::new(
            self.config.max_session_tokens,
            self.config.warn_threshold,
            self.config.max_turns,
            self.clock.now(),
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
