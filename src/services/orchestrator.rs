use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;

use crate::configuration::{PipelineSettings, Settings};
use crate::domain::{
    extract_contact, is_decision_maker, normalize_company_name, CompanyQuery, DecisionMakerRecord,
    EmailCandidate, EnrichmentResult, ResolvedWebsite,
};
use crate::services::email_discovery::{EmailDiscoveryClient, EmailDiscoveryOutcome};
use crate::services::gateway::{Gateway, GatewayError};
use crate::services::profile_resolver::ProfileResolver;
use crate::services::website_resolver::WebsiteResolver;

/// Progress events for callers that want to watch a batch instead of
/// waiting for it. Pulled off a channel at whatever cadence the caller
/// likes; the pipeline never blocks on a slow consumer.
#[derive(Debug)]
pub enum PipelineEvent {
    CompanyStarted { company_name: String },
    WebsiteResolved { company_name: String, domain: String },
    RecordFound { record: DecisionMakerRecord },
    CompanyFinished { result: EnrichmentResult },
    BatchAborted { error: String },
}

/// The enrichment pipeline for one or many companies.
///
/// For each company:
/// 1. Resolve the canonical domain (cached).
/// 2. Pull email candidates at that domain.
/// 3. One task per candidate, bounded by a semaphore: extract a name,
///    dedup against the company's seen-name set, confirm the profile,
///    classify the title.
/// 4. Stop early once enough decision-makers are confirmed.
pub struct Pipeline {
    websites: WebsiteResolver,
    emails: EmailDiscoveryClient,
    profiles: ProfileResolver,
    settings: PipelineSettings,
    // TODO: Bound this; a batch run over a very large company list grows it
    // without limit.
    record_cache: Mutex<HashMap<String, Vec<DecisionMakerRecord>>>,
}

impl Pipeline {
    pub fn new(gateway: Arc<Gateway>, settings: PipelineSettings) -> Self {
        Pipeline {
            websites: WebsiteResolver::new(Arc::clone(&gateway)),
            emails: EmailDiscoveryClient::new(Arc::clone(&gateway), settings.max_email_candidates),
            profiles: ProfileResolver::new(
                gateway,
                settings.high_confidence_cutoff,
                settings.fuzzy_name_cutoff,
                settings.company_similarity_cutoff,
            ),
            settings,
            record_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let gateway = Arc::new(Gateway::new(&settings.gateway)?);
        Ok(Pipeline::new(gateway, settings.pipeline.clone()))
    }

    /// Enrich one company. Everything except an auth failure degrades to
    /// an empty or placeholder result.
    pub async fn enrich(&self, query: &CompanyQuery) -> Result<EnrichmentResult, GatewayError> {
        self.enrich_inner(query, None).await
    }

    async fn enrich_inner(
        &self,
        query: &CompanyQuery,
        events: Option<&UnboundedSender<PipelineEvent>>,
    ) -> Result<EnrichmentResult, GatewayError> {
        let cache_key = normalize_company_name(&query.name);
        if let Some(records) = self.record_cache.lock().await.get(&cache_key) {
            log::info!("Cache hit for {}", query.name);
            return Ok(EnrichmentResult {
                company_name: query.name.clone(),
                records: records.clone(),
            });
        }

        let website = match self.websites.resolve(query, &[]).await? {
            Some(website) => website,
            None => {
                log::info!("No website found for {}", query.name);
                return Ok(self.empty_outcome(&query.name, None));
            }
        };
        emit(
            events,
            PipelineEvent::WebsiteResolved {
                company_name: query.name.clone(),
                domain: website.domain.clone(),
            },
        );

        let outcome = match self
            .emails
            .discover(&website.domain, Some(&query.name))
            .await
        {
            Ok(outcome) => outcome,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("Email discovery failed for {}: {}", website.domain, e);
                EmailDiscoveryOutcome::NotFound
            }
        };
        let candidates = match outcome {
            EmailDiscoveryOutcome::Found(candidates) => candidates,
            EmailDiscoveryOutcome::NotFound => {
                log::info!("No email candidates at {}", website.domain);
                return Ok(self.empty_outcome(&query.name, Some(&website)));
            }
        };

        let semaphore = Arc::new(Semaphore::new(self.settings.email_concurrency.max(1)));
        let seen_names = Arc::new(Mutex::new(HashSet::new()));
        let mut tasks = JoinSet::new();
        for candidate in candidates {
            tasks.spawn(enrich_candidate(
                self.profiles.clone(),
                Arc::clone(&semaphore),
                Arc::clone(&seen_names),
                query.name.clone(),
                website.clone(),
                candidate,
                self.settings.min_extract_confidence,
            ));
        }

        let mut records: Vec<DecisionMakerRecord> = vec![];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Some(record))) => {
                    emit(
                        events,
                        PipelineEvent::RecordFound {
                            record: record.clone(),
                        },
                    );
                    records.push(record);
                    if records.len() >= self.settings.max_records {
                        tasks.abort_all();
                        break;
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) if e.is_fatal() => {
                    tasks.abort_all();
                    return Err(e);
                }
                Ok(Err(e)) => log::warn!("Candidate task failed for {}: {}", query.name, e),
                Err(e) if e.is_cancelled() => {}
                Err(e) => log::error!("Candidate task panicked for {}: {}", query.name, e),
            }
        }

        if records.is_empty() {
            return Ok(self.empty_outcome(&query.name, Some(&website)));
        }

        self.record_cache
            .lock()
            .await
            .insert(cache_key, records.clone());
        Ok(EnrichmentResult {
            company_name: query.name.clone(),
            records,
        })
    }

    /// Enrich a batch, bounded company-level fan-out, input order preserved
    /// in the output. A company that fails for any non-auth reason becomes
    /// an empty result; an auth failure aborts the whole batch.
    pub async fn enrich_batch(
        self: &Arc<Self>,
        queries: Vec<CompanyQuery>,
    ) -> Result<Vec<EnrichmentResult>, GatewayError> {
        let names: Vec<String> = queries.iter().map(|q| q.name.clone()).collect();
        let semaphore = Arc::new(Semaphore::new(self.settings.company_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, query) in queries.into_iter().enumerate() {
            let pipeline = Arc::clone(self);
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = pipeline.enrich(&query).await;
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<EnrichmentResult>> = vec![None; names.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(result))) => slots[index] = Some(result),
                Ok((_, Err(e))) if e.is_fatal() => {
                    tasks.abort_all();
                    return Err(e);
                }
                Ok((index, Err(e))) => {
                    log::error!("Enrichment failed for {}: {}", names[index], e);
                }
                Err(e) if e.is_cancelled() => {}
                Err(e) => log::error!("Company task panicked: {}", e),
            }
        }

        Ok(slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.unwrap_or_else(|| EnrichmentResult::empty(&names[index])))
            .collect())
    }

    /// Batch enrichment as a stream of progress events the caller drains.
    /// The channel closes when the batch is done or aborted.
    pub fn stream_batch(
        self: &Arc<Self>,
        queries: Vec<CompanyQuery>,
    ) -> UnboundedReceiver<PipelineEvent> {
        let (event_sender, event_receiver) = mpsc::unbounded_channel();
        let pipeline = Arc::clone(self);

        tokio::spawn(async move {
            let semaphore = Arc::new(Semaphore::new(
                pipeline.settings.company_concurrency.max(1),
            ));
            let mut tasks = JoinSet::new();

            for query in queries {
                let pipeline = Arc::clone(&pipeline);
                let semaphore = Arc::clone(&semaphore);
                let events = event_sender.clone();
                tasks.spawn(async move {
                    let _permit = semaphore.acquire_owned().await.ok();
                    _ = events.send(PipelineEvent::CompanyStarted {
                        company_name: query.name.clone(),
                    });
                    match pipeline.enrich_inner(&query, Some(&events)).await {
                        Ok(result) => {
                            _ = events.send(PipelineEvent::CompanyFinished { result });
                            Ok(())
                        }
                        Err(e) if e.is_fatal() => Err(e),
                        Err(e) => {
                            log::error!("Enrichment failed for {}: {}", query.name, e);
                            _ = events.send(PipelineEvent::CompanyFinished {
                                result: EnrichmentResult::empty(&query.name),
                            });
                            Ok(())
                        }
                    }
                });
            }

            while let Some(joined) = tasks.join_next().await {
                if let Ok(Err(e)) = joined {
                    _ = event_sender.send(PipelineEvent::BatchAborted {
                        error: e.to_string(),
                    });
                    tasks.abort_all();
                    break;
                }
            }
        });

        event_receiver
    }

    fn empty_outcome(&self, company_name: &str, website: Option<&ResolvedWebsite>) -> EnrichmentResult {
        match self.settings.placeholder_on_empty {
            true => EnrichmentResult {
                company_name: company_name.to_string(),
                records: vec![DecisionMakerRecord::placeholder(
                    company_name,
                    website.map(|w| w.domain.clone()).unwrap_or_default(),
                    website.map(|w| w.source_attempt),
                )],
            },
            false => EnrichmentResult::empty(company_name),
        }
    }
}

/// One email candidate, start to finish. Returns `Ok(None)` for every
/// "not a decision-maker we can report" outcome; only fatal gateway errors
/// bubble up.
async fn enrich_candidate(
    profiles: ProfileResolver,
    semaphore: Arc<Semaphore>,
    seen_names: Arc<Mutex<HashSet<String>>>,
    company_name: String,
    website: ResolvedWebsite,
    candidate: EmailCandidate,
    min_confidence: f64,
) -> Result<Option<DecisionMakerRecord>, GatewayError> {
    let _permit = match semaphore.acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => return Ok(None),
    };

    let contact = extract_contact(&candidate.address);
    if contact.is_generic || contact.name.is_empty() || contact.confidence < min_confidence {
        return Ok(None);
    }

    // Reserve the name before the profile lookup so a sibling task that
    // extracted the same person cannot race past the dedup check.
    {
        let mut seen = seen_names.lock().await;
        if !seen.insert(contact.name.to_lowercase()) {
            log::info!(
                "Skipping duplicate contact {} at {}",
                contact.name,
                company_name
            );
            return Ok(None);
        }
    }

    let profile = match profiles
        .resolve(&contact.name, &company_name, contact.confidence)
        .await?
    {
        Some(profile) => profile,
        None => return Ok(None),
    };

    if !is_decision_maker(&profile.title) {
        return Ok(None);
    }

    let (first_name, last_name) = contact.split_name();
    Ok(Some(DecisionMakerRecord {
        company_name,
        domain: website.domain,
        first_name,
        last_name,
        title: profile.title,
        email: candidate.address,
        profile_url: profile.profile_url,
        source_attempt: Some(website.source_attempt),
    }))
}

fn emit(events: Option<&UnboundedSender<PipelineEvent>>, event: PipelineEvent) {
    if let Some(sender) = events {
        _ = sender.send(event);
    }
}
