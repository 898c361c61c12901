use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vanguard::configuration::{GatewaySettings, PipelineSettings};
use vanguard::domain::{CompanyQuery, WebsiteAttempt};
use vanguard::services::{Gateway, Pipeline, PipelineEvent};

fn init_logging() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .is_test(true)
    .try_init();
}

fn gateway_settings(server_uri: &str) -> GatewaySettings {
    GatewaySettings {
        search_url: format!("{}/search", server_uri),
        email_lookup_url: format!("{}/domain-search", server_uri),
        search_api_keys: vec!["search-key-1".to_string(), "search-key-2".to_string()],
        email_api_keys: vec!["email-key-1".to_string()],
        search_delay_ms: 0,
        email_delay_ms: 0,
        max_attempts: 3,
        request_timeout_secs: 5,
    }
}

fn build_pipeline(server_uri: &str, pipeline_settings: PipelineSettings) -> Arc<Pipeline> {
    init_logging();
    let gateway = Gateway::new(&gateway_settings(server_uri)).expect("gateway should build");
    Arc::new(Pipeline::new(Arc::new(gateway), pipeline_settings))
}

fn search_response(hits: &[(&str, &str, &str)]) -> ResponseTemplate {
    let organic: Vec<serde_json::Value> = hits
        .iter()
        .map(|(link, title, snippet)| {
            json!({ "link": link, "title": title, "snippet": snippet })
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "organic": organic }))
}

fn emails_response(emails: &[(&str, &str)]) -> ResponseTemplate {
    let emails: Vec<serde_json::Value> = emails
        .iter()
        .map(|(value, kind)| json!({ "value": value, "type": kind }))
        .collect();
    ResponseTemplate::new(200).set_body_json(json!({ "data": { "emails": emails } }))
}

/// Mount the full happy path for Acme Robotics: website search, bulk email
/// lookup, and a profile hit for the one personal address.
async fn mount_acme_mocks(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(
            json!({ "q": "\"Acme Robotics\" official website" }),
        ))
        .respond_with(search_response(&[(
            "https://www.acmerobotics.com/",
            "Acme Robotics | Industrial Automation",
            "Acme Robotics builds collaborative grippers.",
        )]))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .and(query_param("domain", "acmerobotics.com"))
        .respond_with(emails_response(&[
            ("info@acmerobotics.com", "generic"),
            ("j.smith@acmerobotics.com", "personal"),
        ]))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(
            json!({ "q": "site:linkedin.com/in \"J Smith\" \"Acme Robotics\"" }),
        ))
        .respond_with(search_response(&[(
            "https://www.linkedin.com/in/j-smith-0a1b2c",
            "J Smith - Co-Founder & CEO at Acme Robotics | LinkedIn",
            "J Smith. Co-Founder & CEO at Acme Robotics.",
        )]))
        .mount(server)
        .await;
}

#[tokio::test]
async fn acme_robotics_end_to_end() {
    let server = MockServer::start().await;
    mount_acme_mocks(&server).await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let result = pipeline
        .enrich(&CompanyQuery::new("Acme Robotics"))
        .await
        .expect("enrichment should succeed");

    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert_eq!(record.first_name, "J");
    assert_eq!(record.last_name, "Smith");
    assert_eq!(record.title, "Co-Founder & CEO");
    assert_eq!(record.email, "j.smith@acmerobotics.com");
    assert_eq!(record.domain, "acmerobotics.com");
    assert_eq!(record.profile_url, "https://www.linkedin.com/in/j-smith-0a1b2c");
    assert_eq!(record.source_attempt, Some(WebsiteAttempt::Official));
}

#[tokio::test]
async fn company_with_no_emails_yields_an_empty_result() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(
            json!({ "q": "\"Globex\" official website" }),
        ))
        .respond_with(search_response(&[(
            "https://globex.com/",
            "Globex",
            "Globex corporate site.",
        )]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .and(query_param("domain", "globex.com"))
        .respond_with(emails_response(&[]))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let result = pipeline
        .enrich(&CompanyQuery::new("Globex"))
        .await
        .expect("enrichment should succeed");

    assert!(result.is_empty());
}

#[tokio::test]
async fn placeholder_policy_flags_an_empty_company_for_follow_up() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(
            json!({ "q": "\"Globex\" official website" }),
        ))
        .respond_with(search_response(&[(
            "https://globex.com/",
            "Globex",
            "Globex corporate site.",
        )]))
        .mount(&server)
        .await;

    // The provider does not know the domain at all.
    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let settings = PipelineSettings {
        placeholder_on_empty: true,
        ..PipelineSettings::default()
    };
    let pipeline = build_pipeline(&server.uri(), settings);
    let result = pipeline
        .enrich(&CompanyQuery::new("Globex"))
        .await
        .expect("enrichment should succeed");

    assert_eq!(result.records.len(), 1);
    let record = &result.records[0];
    assert!(record.is_placeholder());
    assert_eq!(record.company_name, "Globex");
    assert_eq!(record.domain, "globex.com");
    assert!(record.first_name.is_empty());
    assert!(record.title.is_empty());
}

#[tokio::test]
async fn two_addresses_for_the_same_person_emit_one_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(
            json!({ "q": "\"Initech\" official website" }),
        ))
        .respond_with(search_response(&[(
            "https://initech.com/",
            "Initech",
            "Initech software.",
        )]))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .and(query_param("domain", "initech.com"))
        .respond_with(emails_response(&[
            ("john.smith@initech.com", "personal"),
            ("john_smith@initech.com", "personal"),
        ]))
        .mount(&server)
        .await;

    // Any profile query for John Smith resolves to the same person.
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_partial_json(
            json!({ "q": "site:linkedin.com/in \"John Smith\" \"Initech\"" }),
        ))
        .respond_with(search_response(&[(
            "https://www.linkedin.com/in/john-smith-9f8e7d",
            "John Smith - Founder at Initech | LinkedIn",
            "John Smith. Founder at Initech.",
        )]))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let result = pipeline
        .enrich(&CompanyQuery::new("Initech"))
        .await
        .expect("enrichment should succeed");

    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].full_name(), "John Smith");
}

#[tokio::test]
async fn blocked_hosts_never_become_the_company_domain() {
    let server = MockServer::start().await;

    // Every ladder query only ever surfaces blocked hosts.
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(search_response(&[
            (
                "https://www.linkedin.com/company/vandelay",
                "Vandelay Industries | LinkedIn",
                "",
            ),
            (
                "https://www.facebook.com/vandelay",
                "Vandelay Industries - Facebook",
                "",
            ),
        ]))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let result = pipeline
        .enrich(&CompanyQuery::new("Vandelay Industries"))
        .await
        .expect("enrichment should succeed");

    assert!(result.is_empty());
    // The email lookup must never have been called without a domain.
    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.path().contains("domain-search")));
}

#[tokio::test]
async fn auth_failure_is_fatal_and_surfaces_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let error = pipeline
        .enrich(&CompanyQuery::new("Acme Robotics"))
        .await
        .expect_err("bad credentials must fail the run");

    assert!(error.is_fatal());
    // No retries for auth failures.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn a_known_website_skips_the_search_ladder() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .and(query_param("domain", "acmerobotics.com"))
        .respond_with(emails_response(&[]))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let result = pipeline
        .enrich(&CompanyQuery::with_website(
            "Acme Robotics",
            "https://www.acmerobotics.com/about",
        ))
        .await
        .expect("enrichment should succeed");

    assert!(result.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| r.url.path() == "/domain-search"));
}

#[tokio::test]
async fn identical_queries_produce_identical_membership() {
    let server = MockServer::start().await;
    mount_acme_mocks(&server).await;

    // Two cold pipelines against the same stable responses.
    let first = build_pipeline(&server.uri(), PipelineSettings::default())
        .enrich(&CompanyQuery::new("Acme Robotics"))
        .await
        .expect("first run should succeed");
    let second = build_pipeline(&server.uri(), PipelineSettings::default())
        .enrich(&CompanyQuery::new("Acme Robotics"))
        .await
        .expect("second run should succeed");

    let mut first_names: Vec<String> = first.records.iter().map(|r| r.full_name()).collect();
    let mut second_names: Vec<String> = second.records.iter().map(|r| r.full_name()).collect();
    first_names.sort();
    second_names.sort();
    assert_eq!(first_names, second_names);
}

#[tokio::test]
async fn stream_batch_reports_progress_and_completion() {
    let server = MockServer::start().await;
    mount_acme_mocks(&server).await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let mut events = pipeline.stream_batch(vec![CompanyQuery::new("Acme Robotics")]);

    let mut started = 0;
    let mut websites = 0;
    let mut records = 0;
    let mut finished = 0;
    while let Some(event) = events.recv().await {
        match event {
            PipelineEvent::CompanyStarted { .. } => started += 1,
            PipelineEvent::WebsiteResolved { domain, .. } => {
                assert_eq!(domain, "acmerobotics.com");
                websites += 1;
            }
            PipelineEvent::RecordFound { record } => {
                assert_eq!(record.full_name(), "J Smith");
                records += 1;
            }
            PipelineEvent::CompanyFinished { result } => {
                assert_eq!(result.records.len(), 1);
                finished += 1;
            }
            PipelineEvent::BatchAborted { error } => panic!("unexpected abort: {}", error),
        }
    }

    assert_eq!(started, 1);
    assert_eq!(websites, 1);
    assert_eq!(records, 1);
    assert_eq!(finished, 1);
}

#[tokio::test]
async fn batch_preserves_input_order_and_degrades_failures() {
    let server = MockServer::start().await;
    mount_acme_mocks(&server).await;

    // Globex resolves no website at all: empty organic for every ladder
    // query, mounted after the Acme mocks so those still match first.
    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(search_response(&[]))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/domain-search"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&server.uri(), PipelineSettings::default());
    let results = pipeline
        .enrich_batch(vec![
            CompanyQuery::new("Globex"),
            CompanyQuery::new("Acme Robotics"),
        ])
        .await
        .expect("batch should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].company_name, "Globex");
    assert!(results[0].is_empty());
    assert_eq!(results[1].company_name, "Acme Robotics");
    assert_eq!(results[1].records.len(), 1);
}
