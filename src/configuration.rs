use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Settings {
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct GatewaySettings {
    pub search_url: String,
    pub email_lookup_url: String,
    pub search_api_keys: Vec<String>,
    pub email_api_keys: Vec<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub search_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub email_delay_ms: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attempts: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub request_timeout_secs: u64,
}

/// Tunables for the enrichment pipeline. The cutoffs are empirically tuned,
/// not load-bearing semantics; override any of them through configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct PipelineSettings {
    /// Stop enriching a company once this many decision-makers are found.
    #[serde(default = "default_max_records")]
    pub max_records: usize,
    /// Keep at most this many email candidates per domain.
    #[serde(default = "default_max_email_candidates")]
    pub max_email_candidates: usize,
    /// Concurrent email-candidate tasks per company.
    #[serde(default = "default_email_concurrency")]
    pub email_concurrency: usize,
    /// Concurrent companies in a batch run.
    #[serde(default = "default_company_concurrency")]
    pub company_concurrency: usize,
    /// Extractor confidence at or above which the profile resolver spends
    /// its full query budget (3 attempts instead of 1).
    #[serde(default = "default_high_confidence_cutoff")]
    pub high_confidence_cutoff: f64,
    /// Minimum extractor confidence to keep a candidate at all.
    #[serde(default = "default_min_extract_confidence")]
    pub min_extract_confidence: f64,
    /// Minimum similarity between the queried name and a profile hit.
    #[serde(default = "default_fuzzy_name_cutoff")]
    pub fuzzy_name_cutoff: f64,
    /// Similarity at which a "person name" is rejected as the company name.
    #[serde(default = "default_company_similarity_cutoff")]
    pub company_similarity_cutoff: f64,
    /// Emit a record carrying only company/domain fields when a company
    /// yields no decision-makers, so consumers can flag manual follow-up.
    #[serde(default)]
    pub placeholder_on_empty: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        PipelineSettings {
            max_records: default_max_records(),
            max_email_candidates: default_max_email_candidates(),
            email_concurrency: default_email_concurrency(),
            company_concurrency: default_company_concurrency(),
            high_confidence_cutoff: default_high_confidence_cutoff(),
            min_extract_confidence: default_min_extract_confidence(),
            fuzzy_name_cutoff: default_fuzzy_name_cutoff(),
            company_similarity_cutoff: default_company_similarity_cutoff(),
            placeholder_on_empty: false,
        }
    }
}

fn default_max_records() -> usize {
    3
}

fn default_max_email_candidates() -> usize {
    15
}

fn default_email_concurrency() -> usize {
    5
}

fn default_company_concurrency() -> usize {
    10
}

fn default_high_confidence_cutoff() -> f64 {
    0.7
}

fn default_min_extract_confidence() -> f64 {
    0.5
}

fn default_fuzzy_name_cutoff() -> f64 {
    0.6
}

fn default_company_similarity_cutoff() -> f64 {
    0.7
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("gateway.search_api_keys")
                .with_list_parse_key("gateway.email_api_keys"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
