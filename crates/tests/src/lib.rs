//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试 (发布消息格式)
//! - 基于 wiremock 的 e2e 测试：列表页 -> 搜索 -> Pub/Sub REST

#[cfg(test)]
mod contract_tests {
    use contracts::{CorrelationId, MatchEnvelope, SearchQuery, VehicleData};

    #[test]
    fn test_published_message_shape() {
        let vehicle: VehicleData = serde_json::from_str(
            r#"{"vrm":"AB12CDE","contravention_date":"2026-10-16T08:30:00Z",
                "is_hirer_vehicle":true,"lease_company":{"companyname":"Acme Lease"}}"#,
        )
        .unwrap();
        let envelope = MatchEnvelope::new(CorrelationId::new(), vehicle);

        let value: serde_json::Value = serde_json::from_slice(&envelope.to_json().unwrap()).unwrap();
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["contravention_date", "is_hirer_vehicle", "lease_company", "reference", "vrm"]
        );
    }

    #[test]
    fn test_search_body_shape() {
        let value = serde_json::to_value(SearchQuery::new("AB12CDE".into())).unwrap();
        assert_eq!(value["vrm"], "AB12CDE");
        assert!(value["contravention_date"].as_str().unwrap().ends_with('Z'));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::{HashMap, HashSet};
    use std::io::Write;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use config_loader::{ConfigLoader, Overrides};
    use contracts::{EndpointError, EndpointOutcome, MatchEnvelope, TopicReadiness};
    use dispatcher::{HttpTransport, SearchDispatcher};
    use ingestion::{HtmlListingSource, JobQueue, ListingSource};
    use publisher::{MatchPublisher, PubSubRestClient, PublishError};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOPIC: &str = "projects/demo/topics/hirers";

    fn vehicle(flag: bool) -> serde_json::Value {
        json!({
            "vrm": "AB12CDE",
            "contravention_date": "2026-10-16T08:30:00Z",
            "is_hirer_vehicle": flag,
            "lease_company": { "companyname": "Acme Lease", "postcode": "AB1 2CD" },
        })
    }

    async fn search_endpoint(server: &MockServer, route: &str, template: ResponseTemplate) -> String {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(template)
            .mount(server)
            .await;
        format!("{}{}", server.uri(), route)
    }

    fn http_dispatcher(endpoints: &[String]) -> SearchDispatcher<HttpTransport> {
        SearchDispatcher::new(HttpTransport::default(), endpoints)
    }

    /// 4 endpoints: 2 false, 1 transport error, 1 true at 200ms
    #[tokio::test]
    async fn test_single_match_among_mixed_endpoints() {
        let server = MockServer::start().await;
        let endpoints = vec![
            search_endpoint(&server, "/acmelease", ResponseTemplate::new(200).set_body_json(vehicle(false))).await,
            search_endpoint(
                &server,
                "/fleetcompany",
                ResponseTemplate::new(200)
                    .set_body_json(vehicle(false))
                    .set_delay(Duration::from_millis(50)),
            )
            .await,
            "http://127.0.0.1:9/hirecompany".to_string(),
            search_endpoint(
                &server,
                "/leasecompany",
                ResponseTemplate::new(200)
                    .set_body_json(vehicle(true))
                    .set_delay(Duration::from_millis(200)),
            )
            .await,
        ];

        let dispatcher = http_dispatcher(&endpoints);
        let report = dispatcher.search(&"AB12CDE".into(), Duration::from_secs(5)).await;

        let envelope = report.envelope.as_ref().expect("one match");
        assert_eq!(report.winner(), Some(endpoints[3].as_str()));
        assert_eq!(envelope.vehicle.lease_company["companyname"], "Acme Lease");
        assert!(report.elapsed < Duration::from_secs(2));

        let matched = report
            .results
            .iter()
            .filter(|r| r.outcome == EndpointOutcome::Matched)
            .count();
        assert_eq!(matched, 1);
        assert!(matches!(
            report.results[2].outcome,
            EndpointOutcome::Failed(EndpointError::Transport(_))
        ));
    }

    /// Every endpoint slower than the deadline
    #[tokio::test]
    async fn test_all_endpoints_past_deadline() {
        let server = MockServer::start().await;
        let mut endpoints = Vec::new();
        for route in ["/a", "/b", "/c"] {
            let slow = ResponseTemplate::new(200)
                .set_body_json(vehicle(true))
                .set_delay(Duration::from_secs(3));
            endpoints.push(search_endpoint(&server, route, slow).await);
        }

        let timeout = Duration::from_millis(300);
        let started = Instant::now();
        let report = http_dispatcher(&endpoints).search(&"AB12CDE".into(), timeout).await;

        assert!(report.envelope.is_none());
        assert!(report.timed_out);
        assert!(started.elapsed() < Duration::from_secs(2));
        for result in &report.results {
            assert_eq!(
                result.outcome,
                EndpointOutcome::Failed(EndpointError::DeadlineExceeded(timeout))
            );
        }
    }

    #[tokio::test]
    async fn test_malformed_endpoint_excluded() {
        let server = MockServer::start().await;
        let mut endpoints = Vec::new();
        for route in ["/a", "/b", "/c"] {
            let answer = ResponseTemplate::new(200).set_body_json(vehicle(false));
            endpoints.push(search_endpoint(&server, route, answer).await);
        }
        endpoints.insert(1, "acme-lease/search".to_string());

        let report = http_dispatcher(&endpoints)
            .search(&"AB12CDE".into(), Duration::from_secs(5))
            .await;

        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(|r| r.outcome == EndpointOutcome::NotMatched));
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_settings_file_drives_search() {
        let server = MockServer::start().await;
        let hit = search_endpoint(&server, "/hire", ResponseTemplate::new(200).set_body_json(vehicle(true))).await;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "search_apis = [\"{hit}\", \"broken\"]\nrequest_timeout = \"2s\"\npubsub_emulator_host = \"localhost:8085\""
        )
        .unwrap();

        let parsed = ConfigLoader::load_file(file.path()).unwrap();
        let settings = ConfigLoader::load_with_env(&parsed, &HashMap::new(), &Overrides::default()).unwrap();

        let dispatcher = http_dispatcher(&settings.search_apis);
        assert_eq!(dispatcher.endpoints().len(), 1);
        let found = dispatcher.dispatch(&"AB12CDE".into(), settings.search_timeout).await;
        assert!(found.is_some());
    }

    const LISTING: &str = r#"
<table><tbody>
  <tr><td>AB12CDE</td><td>Acme Lease</td></tr>
  <tr><td>CD34EFG</td><td>Fleet Co</td></tr>
  <tr><td>EF56GHI</td><td>Hire Co</td></tr>
</tbody></table>"#;

    /// Listing -> workers -> search -> readiness -> publish, all over HTTP
    #[tokio::test]
    async fn test_listing_to_pubsub() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/test_vehicles"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;
        let hit = search_endpoint(&server, "/test_search/hire", ResponseTemplate::new(200).set_body_json(vehicle(true))).await;
        let miss = search_endpoint(&server, "/test_search/lease", ResponseTemplate::new(200).set_body_json(vehicle(false))).await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/{TOPIC}")))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/{TOPIC}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": TOPIC })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/v1/{TOPIC}:publish")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messageIds": ["1"] })))
            .expect(3)
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let listing = HtmlListingSource::new(client.clone(), format!("{}/test_vehicles", server.uri()));
        let records = listing.fetch().await.unwrap();
        assert_eq!(records.len(), 3);

        let dispatcher = SearchDispatcher::new(HttpTransport::new(client.clone()), &[hit, miss]);
        let topic = PubSubRestClient::with_base(client, server.uri(), TOPIC, None);
        let publisher = Arc::new(MatchPublisher::new(
            topic,
            TopicReadiness {
                max_attempts: 5,
                delay: Duration::from_millis(10),
            },
        ));
        assert_eq!(publisher.ensure_ready().await.unwrap(), 3);

        let jobs = JobQueue::preloaded(records);
        let mut workers = tokio::task::JoinSet::new();
        for _ in 0..2 {
            let jobs = jobs.clone();
            let dispatcher = dispatcher.clone();
            let publisher = publisher.clone();
            workers.spawn(async move {
                let mut published = 0;
                while let Ok(record) = jobs.recv().await {
                    if let Some(envelope) = dispatcher.dispatch(&record.identifier, Duration::from_secs(5)).await {
                        publisher.publish(&envelope).await.unwrap();
                        published += 1;
                    }
                }
                published
            });
        }
        let mut total = 0;
        while let Some(joined) = workers.join_next().await {
            total += joined.unwrap();
        }
        assert_eq!(total, 3);

        let requests = server.received_requests().await.unwrap();
        let published: Vec<MatchEnvelope> = requests
            .iter()
            .filter(|r| r.url.path().ends_with(":publish"))
            .map(|r| {
                let body: serde_json::Value = serde_json::from_slice(&r.body).unwrap();
                let data = STANDARD.decode(body["messages"][0]["data"].as_str().unwrap()).unwrap();
                MatchEnvelope::from_json(&data).unwrap()
            })
            .collect();

        let references: HashSet<_> = published.iter().map(|e| e.correlation_id).collect();
        assert_eq!(references.len(), 3);
        assert!(published.iter().all(|e| e.vehicle.is_hirer_vehicle));
    }

    #[tokio::test]
    async fn test_topic_never_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(4)
            .mount(&server)
            .await;

        let topic = PubSubRestClient::with_base(reqwest::Client::new(), server.uri(), TOPIC, None);
        let publisher = MatchPublisher::new(
            topic,
            TopicReadiness {
                max_attempts: 4,
                delay: Duration::from_millis(10),
            },
        );

        let err = publisher.ensure_ready().await.unwrap_err();
        assert!(matches!(err, PublishError::TopicUnavailable { attempts: 4, .. }));
    }
}
