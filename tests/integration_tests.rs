use std::time::Duration;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mstar_studio::config::{BackendConfig, StudioConfig};
use mstar_studio::{
  Error, ErrorKind, GenerationRequest, Language, Mode, StudioClient
};

/// Chat-completions body carrying `content` as the assistant text
fn completion(content: &str) -> serde_json::Value
{   json!({
      "id": "gen-123",
      "object": "chat.completion",
      "choices": [{
        "index": 0,
        "message": { "role": "assistant", "content": content },
        "finish_reason": "stop"
      }]
    })
}

fn config_for(server: &MockServer, ids: &[&str]) -> StudioConfig
{   let endpoint = format!("{}/chat/completions", server.uri());
    StudioConfig
    {   backends: ids
          .iter()
          .map(|id| {
            BackendConfig::new(*id, endpoint.clone()).with_timeout_ms(2_000)
          })
          .collect()
      , ..StudioConfig::default()
    }
}

fn shared_key(var: &str) -> Option<String>
{   (var == "OPENROUTER_API_KEY").then(|| "test-key".to_string())
}

fn client_for(config: StudioConfig) -> StudioClient
{   StudioClient::with_key_lookup(config, shared_key)
      .expect("valid test config")
}

fn roast_request() -> GenerationRequest
{   GenerationRequest::new("my friend Rahul", Mode::Roast, Language::Hinglish)
}

async fn mount_status(server: &MockServer, model: &str, status: u16)
{   Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_partial_json(json!({ "model": model })))
      .respond_with(ResponseTemplate::new(status)
        .set_body_json(json!({ "error": { "message": "nope" } })))
      .mount(server)
      .await;
}

async fn mount_content(server: &MockServer, model: &str, content: &str)
{   Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(body_partial_json(json!({ "model": model })))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(content)))
      .mount(server)
      .await;
}

#[tokio::test]
async fn test_falls_back_past_rate_limited_backends()
{   let server = MockServer::start().await;
    mount_status(&server, "m1", 429).await;
    mount_status(&server, "m2", 429).await;
    mount_content(&server, "m3", r#"{"results":["only item"]}"#).await;

    let client = client_for(config_for(&server, &["m1", "m2", "m3"]));
    let result = client.generate(&roast_request()).await
      .expect("third backend succeeds");

    assert_eq!(result.results, vec!["only item".to_string()]);
    assert_eq!(result.backend, "m3");
}

#[tokio::test]
async fn test_all_server_errors_differ_from_rate_limit()
{   let server = MockServer::start().await;
    for id in ["m1", "m2", "m3"]
    {   mount_status(&server, id, 500).await;
    }

    let client = client_for(config_for(&server, &["m1", "m2", "m3"]));
    let err = client.generate(&roast_request()).await
      .expect_err("every backend fails");

    assert_eq!(err.kind(), ErrorKind::BackendExhaustion);
    assert_eq!(err.status_code(), 503);
    match &err
    {   Error::BackendsExhausted { attempts, last_error } => {
          assert_eq!(*attempts, 3);
          assert!(last_error.contains("500"));
        }
      , other => panic!("unexpected error: {:?}", other)
    }
    let rate_limited = Error::AllRateLimited { attempts: 3 };
    assert_ne!(err.user_message(), rate_limited.user_message());
}

#[tokio::test]
async fn test_all_rate_limited_reports_retry_guidance()
{   let server = MockServer::start().await;
    mount_status(&server, "m1", 429).await;
    mount_status(&server, "m2", 429).await;

    let client = client_for(config_for(&server, &["m1", "m2"]));
    let err = client.generate(&roast_request()).await
      .expect_err("everything is rate limited");

    assert_eq!(err, Error::AllRateLimited { attempts: 2 });
    assert!(err.user_message().contains("try again"));
}

#[tokio::test]
async fn test_unavailable_model_is_skipped()
{   let server = MockServer::start().await;
    mount_status(&server, "gone", 404).await;
    mount_status(&server, "bad", 400).await;
    mount_content(&server, "ok", r#"{"results":["a line","another line"]}"#).await;

    let client = client_for(config_for(&server, &["gone", "bad", "ok"]));
    let result = client.generate(&roast_request()).await
      .expect("third backend succeeds");
    assert_eq!(result.backend, "ok");
    assert_eq!(result.results.len(), 2);
}

#[tokio::test]
async fn test_whitespace_prompt_rejected_before_network()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(r#"{"results":["x"]}"#)))
      .expect(0)
      .mount(&server)
      .await;

    let client = client_for(config_for(&server, &["m1"]));
    let request = GenerationRequest::new(" ", Mode::Roast, Language::English);
    let err = client.generate(&request).await
      .expect_err("blank prompt is invalid");

    assert_eq!(err.kind(), ErrorKind::Input);
    assert_eq!(err.status_code(), 400);
    server.verify().await;
}

#[tokio::test]
async fn test_single_char_prompt_rejected()
{   let server = MockServer::start().await;
    let client = client_for(config_for(&server, &["m1"]));
    let request = GenerationRequest::new("  a ", Mode::Auto, Language::English);
    let err = client.generate(&request).await
      .expect_err("below minimum length");
    assert_eq!(err, Error::PromptTooShort { min_chars: 2 });
}

#[tokio::test]
async fn test_identical_requests_parse_identically()
{   let server = MockServer::start().await;
    mount_content(
      &server,
      "m1",
      "```json\n{\"results\":[\"one liner\",\"two liner\"]}\n```"
    ).await;

    let client = client_for(config_for(&server, &["m1"]));
    let first = client.generate(&roast_request()).await.expect("first call");
    let second = client.generate(&roast_request()).await.expect("second call");

    assert_eq!(first, second);
    assert_eq!(first.results, vec!["one liner", "two liner"]);
}

#[tokio::test]
async fn test_shared_credential_rejection_aborts_loop()
{   let server = MockServer::start().await;
    mount_status(&server, "m1", 401).await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "model": "m2" })))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(r#"{"results":["never"]}"#)))
      .expect(0)
      .mount(&server)
      .await;

    let client = client_for(config_for(&server, &["m1", "m2"]));
    let err = client.generate(&roast_request()).await
      .expect_err("bad shared key is fatal");

    assert_eq!(err, Error::Unauthorized("m1".to_string()));
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.status_code(), 500);
    assert!(!err.user_message().contains("m1"));
    server.verify().await;
}

#[tokio::test]
async fn test_own_credential_rejection_only_skips_backend()
{   let server = MockServer::start().await;
    mount_status(&server, "m1", 401).await;
    mount_content(&server, "m2", r#"{"results":["fallback worked"]}"#).await;

    let mut config = config_for(&server, &["m1", "m2"]);
    config.backends[0] = config.backends[0].clone().with_api_key_env("M1_KEY");
    let client = StudioClient::with_key_lookup(config, |var| match var
    {   "M1_KEY" => Some("m1-key".to_string())
      , other => shared_key(other)
    }).expect("valid config");

    let result = client.generate(&roast_request()).await
      .expect("second backend succeeds");
    assert_eq!(result.backend, "m2");
}

#[tokio::test]
async fn test_missing_credential_is_configuration_error()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200))
      .expect(0)
      .mount(&server)
      .await;

    let client = StudioClient::with_key_lookup(
      config_for(&server, &["m1"]),
      |_| None
    ).expect("client builds without keys");
    assert!(client.backends().is_empty());

    let err = client.generate(&roast_request()).await
      .expect_err("no credential");
    assert_eq!(err, Error::MissingApiKey("OPENROUTER_API_KEY".to_string()));
    assert_eq!(err.status_code(), 500);
    server.verify().await;
}

#[tokio::test]
async fn test_unparseable_answers_are_parse_exhaustion()
{   let server = MockServer::start().await;
    mount_content(&server, "m1", "ok").await;
    mount_content(&server, "m2", r#"{"results": "not a list"}"#).await;

    let client = client_for(config_for(&server, &["m1", "m2"]));
    let err = client.generate(&roast_request()).await
      .expect_err("nothing usable");

    assert_eq!(err, Error::NothingParsed { attempts: 2 });
    assert_eq!(err.kind(), ErrorKind::ParseExhaustion);
}

#[tokio::test]
async fn test_prose_answer_is_accepted_via_line_split()
{   let server = MockServer::start().await;
    mount_content(
      &server,
      "m1",
      "Here are your roasts:\n1. Tera wifi bhi tujhse tez hai\n2. Alarm bhi tujhe ignore karta hai"
    ).await;

    let client = client_for(config_for(&server, &["m1"]));
    let result = client.generate(&roast_request()).await
      .expect("line split salvages the answer");
    assert_eq!(result.results, vec![
      "Tera wifi bhi tujhse tez hai",
      "Alarm bhi tujhe ignore karta hai",
    ]);
}

#[tokio::test]
async fn test_slow_backend_times_out_and_next_is_tried()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "model": "slow" })))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(r#"{"results":["too late"]}"#))
        .set_delay(Duration::from_secs(2)))
      .mount(&server)
      .await;
    mount_content(&server, "fast", r#"{"results":["in time"]}"#).await;

    let mut config = config_for(&server, &["slow", "fast"]);
    config.backends[0].timeout_ms = 100;
    let client = client_for(config);

    let result = client.generate(&roast_request()).await
      .expect("fast backend answers");
    assert_eq!(result.results, vec!["in time"]);
    assert_eq!(result.backend, "fast");
}

#[tokio::test]
async fn test_request_deadline_bounds_whole_loop()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(r#"{"results":["too late"]}"#))
        .set_delay(Duration::from_secs(2)))
      .mount(&server)
      .await;

    let mut config = config_for(&server, &["m1", "m2"]);
    config.failover.request_deadline_ms = 150;
    let client = client_for(config);

    let err = client.generate(&roast_request()).await
      .expect_err("deadline elapses");
    assert_eq!(err, Error::Timeout);
    assert_eq!(err.kind(), ErrorKind::BackendExhaustion);
}

#[tokio::test]
async fn test_race_window_prefers_earliest_listed_success()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "model": "first" })))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(r#"{"results":["from first"]}"#))
        .set_delay(Duration::from_millis(300)))
      .mount(&server)
      .await;
    mount_content(&server, "second", r#"{"results":["from second"]}"#).await;

    let mut config = config_for(&server, &["first", "second"]);
    config.failover.race_width = 2;
    let client = client_for(config);

    let result = client.generate(&roast_request()).await
      .expect("window succeeds");
    assert_eq!(result.backend, "first");
    assert_eq!(result.results, vec!["from first"]);
}

#[tokio::test]
async fn test_race_window_falls_through_on_earlier_failure()
{   let server = MockServer::start().await;
    mount_status(&server, "first", 503).await;
    mount_content(&server, "second", r#"{"results":["from second"]}"#).await;
    mount_content(&server, "third", r#"{"results":["from third"]}"#).await;

    let mut config = config_for(&server, &["first", "second", "third"]);
    config.failover.race_width = 3;
    let client = client_for(config);

    let result = client.generate(&roast_request()).await
      .expect("second backend wins");
    assert_eq!(result.backend, "second");
}

#[tokio::test]
async fn test_outbound_request_shape()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(path("/chat/completions"))
      .and(header("Authorization", "Bearer test-key"))
      .and(header("X-Title", "M-Star AI Studio"))
      .and(body_partial_json(json!({
        "model": "m1",
        "temperature": 0.8,
        "max_tokens": 2000,
        "response_format": { "type": "json_object" }
      })))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(completion(r#"{"results":["shaped"]}"#)))
      .expect(1)
      .mount(&server)
      .await;

    let client = client_for(config_for(&server, &["m1"]));
    let result = client.generate(&roast_request()).await
      .expect("request matches");
    assert_eq!(result.results, vec!["shaped"]);

    let received = server.received_requests().await.expect("recording on");
    let body: serde_json::Value = serde_json::from_slice(&received[0].body)
      .expect("json body");
    let system = body["messages"][0]["content"].as_str().unwrap_or_default();
    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    assert_eq!(body["messages"][0]["role"], "system");
    assert!(system.contains("Hinglish"));
    assert!(system.contains("Output exactly 8 items."));
    assert!(user.contains("my friend Rahul"));
    assert!(user.contains("Roast"));
}

#[tokio::test]
async fn test_empty_choices_are_soft_failures()
{   let server = MockServer::start().await;
    Mock::given(method("POST"))
      .and(body_partial_json(json!({ "model": "m1" })))
      .respond_with(ResponseTemplate::new(200)
        .set_body_json(json!({ "choices": [] })))
      .mount(&server)
      .await;
    mount_content(&server, "m2", r#"{"results":["recovered"]}"#).await;

    let client = client_for(config_for(&server, &["m1", "m2"]));
    let result = client.generate(&roast_request()).await
      .expect("second backend succeeds");
    assert_eq!(result.backend, "m2");
}
