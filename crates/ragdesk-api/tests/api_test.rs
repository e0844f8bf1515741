use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use ragdesk_api::{build_router, AppState, Config};
use ragdesk_llm::mock::{HashEmbeddingClient, ScriptedChatClient, ScriptedReply};
use ragdesk_llm::ToolCall;
use ragdesk_persist::{
    InMemoryPersistenceClient, KnowledgeBase, PersistenceClient, PromptStore,
};
use ragdesk_retrieval::{SimilarityReranker, RETRIEVE_DOCUMENTS};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "ragdesk-test-boundary";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    store: Arc<InMemoryPersistenceClient>,
    chat: Arc<ScriptedChatClient>,
    _upload_dir: tempfile::TempDir,
}

fn test_app() -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.llm.embedding_model = "test-embedding".to_string();
    config.storage.upload_dir = upload_dir.path().to_path_buf();
    config.retrieval.chunk_size = 200;
    config.retrieval.chunk_overlap = 0;

    let store = Arc::new(InMemoryPersistenceClient::new());
    let chat = Arc::new(ScriptedChatClient::default());

    let state = Arc::new(AppState::new(
        config,
        store.clone() as Arc<dyn PersistenceClient>,
        chat.clone(),
        Arc::new(HashEmbeddingClient::new(128)),
        Arc::new(SimilarityReranker),
    ));

    TestApp {
        router: build_router(state.clone()),
        state,
        store,
        chat,
        _upload_dir: upload_dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let (status, bytes) = self.send(request).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn seed_prompt(&self, user_id: &str) {
        self.store
            .add_prompt(user_id, "support", "You answer support questions.")
            .await
            .unwrap();
    }

    async fn seed_default_document(&self, filename: &str, text: &str) {
        self.state
            .ingestor
            .ingest(&KnowledgeBase::Default, filename, text.as_bytes())
            .await
            .unwrap();
    }
}

fn multipart_upload(uri: &str, filename: &str, content: &str, user_id: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    if let Some(user_id) = user_id {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"user_id\"\r\n\r\n{user_id}\r\n"
        ));
    }
    body.push_str(&format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
         Content-Type: text/plain\r\n\r\n{content}\r\n--{BOUNDARY}--\r\n"
    ));

    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn retrieve_call(query: &str) -> ScriptedReply {
    ScriptedReply::ToolCalls(vec![ToolCall::new(
        "call_1",
        RETRIEVE_DOCUMENTS,
        json!({ "query": query }).to_string(),
    )])
}

#[tokio::test]
async fn test_health_reports_store_and_reranker() {
    let app = test_app();

    let (status, body) = app.json(Method::GET, "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["memory"], "connected");
    assert_eq!(body["services"]["reranker"], "similarity");
}

#[tokio::test]
async fn test_openapi_lists_query_route() {
    let app = test_app();

    let (status, body) = app.json(Method::GET, "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/query"]["post"].is_object());
    assert!(body["paths"]["/kb_access/{user_id}"]["put"].is_object());
}

#[tokio::test]
async fn test_query_without_active_prompt_is_not_found() {
    let app = test_app();

    let (status, body) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({ "query": "hello", "user_id": "alice" })),
        )
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No active prompt found for this user.");
    assert!(app.chat.requests().is_empty());
}

#[tokio::test]
async fn test_query_answers_with_sources_and_stores_conversation() {
    let app = test_app();
    app.seed_prompt("alice").await;
    app.seed_default_document("refunds.txt", "Refunds are issued within five business days.")
        .await;
    app.seed_default_document("shipping.txt", "Orders ship from the warehouse every morning.")
        .await;
    app.chat.push(retrieve_call("refunds business days"));
    app.chat.push(ScriptedReply::Text("Refunds take five business days.".into()));

    let (status, body) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({ "query": "How long do refunds take?", "user_id": "alice" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["response"], "Refunds take five business days.");
    assert_eq!(body["knowledge_base"], "default");
    assert_eq!(body["sources"][0]["source"], "refunds.txt");

    // The system prompt leads the first model request
    let requests = app.chat.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages[0].role(), "system");

    let conversation_id = body["conversation_id"].as_str().unwrap().to_string();
    let (status, history) = app
        .json(
            Method::GET,
            &format!("/conversations/{conversation_id}/messages?user_id=alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages[0]["content"], "How long do refunds take?");
    let last = messages.last().unwrap();
    assert_eq!(last["content"], "Refunds take five business days.");
    assert_eq!(last["sources"][0]["source"], "refunds.txt");

    let (_, listed) = app
        .json(Method::GET, "/conversations?user_id=alice", None)
        .await;
    assert_eq!(listed["conversations"][0]["conversation_id"], conversation_id.as_str());
    assert_eq!(listed["has_more"], false);
}

#[tokio::test]
async fn test_query_rejects_someone_elses_conversation() {
    let app = test_app();
    app.seed_prompt("alice").await;
    app.seed_prompt("bob").await;
    app.chat.push(ScriptedReply::Text("Hi Bob.".into()));

    let (_, first) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({ "query": "hello", "user_id": "bob" })),
        )
        .await;
    let bobs_conversation = first["conversation_id"].as_str().unwrap();

    let (status, _) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({
                "query": "what did bob ask?",
                "user_id": "alice",
                "conversation_id": bobs_conversation,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/conversations/{bobs_conversation}?user_id=alice"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/conversations/{bobs_conversation}?user_id=bob"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_restricted_default_kb_requires_grant() {
    let mut app = test_app();
    let mut config = (*app.state.config).clone();
    config.retrieval.restrict_default_kb = true;
    let state = Arc::new(AppState::new(
        config,
        app.store.clone() as Arc<dyn PersistenceClient>,
        app.chat.clone(),
        Arc::new(HashEmbeddingClient::new(128)),
        Arc::new(SimilarityReranker),
    ));
    app.router = build_router(state);
    app.seed_prompt("carol").await;

    let query = json!({ "query": "hello", "user_id": "carol", "kb_type": "default" });
    let (status, _) = app.json(Method::POST, "/query", Some(query.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            Method::PUT,
            "/kb_access/carol",
            Some(json!({ "has_access_to_default_kb": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_access_to_default_kb"], true);

    app.chat.push(ScriptedReply::Text("Hello Carol.".into()));
    let (status, body) = app.json(Method::POST, "/query", Some(query)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Hello Carol.");
}

#[tokio::test]
async fn test_query_stream_emits_sources_before_end() {
    let app = test_app();
    app.seed_prompt("alice").await;
    app.seed_default_document("refunds.txt", "Refunds are issued within five business days.")
        .await;
    app.chat.push(retrieve_call("refunds"));
    app.chat.push(ScriptedReply::Text("Five business days.".into()));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/query/stream")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "query": "refunds?", "user_id": "alice" }).to_string(),
        ))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);

    let text = String::from_utf8(body).unwrap();
    let position = |event: &str| {
        text.find(&format!("event: {event}\n"))
            .unwrap_or_else(|| panic!("missing {event} event in:\n{text}"))
    };

    assert!(position("conversation") < position("tool_call"));
    assert!(position("tool_result") < position("sources"));
    assert!(position("sources") < position("end_stream"));
    assert!(text.contains("refunds.txt"));
}

#[tokio::test]
async fn test_prompt_lifecycle() {
    let app = test_app();
    let add = |name: &str| {
        json!({ "user_id": "dave", "name": name, "prompt": format!("You are {name}.") })
    };

    let (status, body) = app.json(Method::POST, "/add_prompt", Some(add("first"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["prompt"]["is_active"], true);

    let (status, _) = app.json(Method::POST, "/add_prompt", Some(add("first"))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app.json(Method::POST, "/add_prompt", Some(add("second"))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["prompt"]["is_active"], false);

    let (status, _) = app
        .json(Method::POST, "/set_active_prompt/dave/second", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(Method::GET, "/get_active_prompt/dave", None).await;
    assert_eq!(body["active_prompt"]["name"], "second");

    let (status, body) = app
        .json(
            Method::PUT,
            "/edit_prompt",
            Some(json!({ "user_id": "dave", "old_name": "second", "new_prompt": "Be terse." })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prompt"]["prompt"], "Be terse.");

    let (status, _) = app
        .json(Method::DELETE, "/delete_prompt/dave/first", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(Method::GET, "/get_prompts/dave", None).await;
    assert_eq!(body["prompts"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .json(Method::DELETE, "/delete_prompt/dave/missing", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_document_upload_list_and_delete() {
    let app = test_app();

    let (status, _) = app.json(Method::GET, "/check_user_kb/erin", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(multipart_upload(
            "/upload_user_document",
            "notes.txt",
            "Erin prefers email over phone calls.",
            Some("erin"),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let upload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(upload["filename"], "notes.txt");
    assert_eq!(upload["user_id"], "erin");
    let file_id = upload["file_id"].as_str().unwrap().to_string();

    let (_, body) = app.json(Method::GET, "/check_user_kb/erin", None).await;
    assert_eq!(body["has_personal_kb"], true);

    let (_, body) = app.json(Method::GET, "/get_user_documents/erin", None).await;
    assert_eq!(body["documents"][0]["id"], file_id.as_str());
    assert!(body["documents"][0]["createdAt"].is_string());

    // Another user cannot delete it
    let (status, body) = app
        .json(
            Method::DELETE,
            &format!("/delete_user_document/frank/{file_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Document not found or doesn't belong to user");

    let (status, _) = app
        .json(
            Method::DELETE,
            &format!("/delete_user_document/erin/{file_id}"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.json(Method::GET, "/check_user_kb/erin", None).await;
    assert_eq!(body["has_personal_kb"], false);
}

#[tokio::test]
async fn test_upload_rejects_unsupported_and_missing_user() {
    let app = test_app();

    let (status, _) = app
        .send(multipart_upload("/upload", "image.png", "not really a png", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(multipart_upload("/upload_user_document", "notes.txt", "text", None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(multipart_upload("/upload", "faq.md", "# FAQ\nOpen every day.", None))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let upload: Value = serde_json::from_slice(&body).unwrap();
    assert!(upload.get("user_id").is_none());
}

#[tokio::test]
async fn test_kb_access_defaults_to_false() {
    let app = test_app();

    let (status, body) = app.json(Method::GET, "/kb_access/gina", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "gina");
    assert_eq!(body["has_access_to_default_kb"], false);
}

#[tokio::test]
async fn test_memories_feed_the_system_prompt() {
    let app = test_app();
    app.seed_prompt("hank").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/memories/hank",
            Some(json!({ "memory_text": "Hank lives in Lisbon." })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .json(Method::POST, "/memories/hank", Some(json!({ "memory_text": "  " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.json(Method::GET, "/memories/hank", None).await;
    assert_eq!(body["memories"].as_array().unwrap().len(), 1);

    app.chat.push(ScriptedReply::Text("Hello from Lisbon.".into()));
    let (status, _) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({ "query": "hi", "user_id": "hank" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let system = serde_json::to_string(&app.chat.requests()[0].messages[0]).unwrap();
    assert!(system.contains("Known facts about the user"));
    assert!(system.contains("Hank lives in Lisbon."));
}

#[tokio::test]
async fn test_switching_active_prompt_changes_system_message() {
    let app = test_app();
    for (name, prompt) in [("formal", "Answer formally."), ("pirate", "Answer like a pirate.")] {
        let (status, _) = app
            .json(
                Method::POST,
                "/add_prompt",
                Some(json!({ "user_id": "ivy", "name": name, "prompt": prompt })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let query = json!({ "query": "hello", "user_id": "ivy" });

    app.chat.push(ScriptedReply::Text("Good day.".into()));
    let (status, _) = app.json(Method::POST, "/query", Some(query.clone())).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::POST, "/set_active_prompt/ivy/pirate", None)
        .await;
    assert_eq!(status, StatusCode::OK);

    app.chat.push(ScriptedReply::Text("Ahoy.".into()));
    let (status, _) = app.json(Method::POST, "/query", Some(query)).await;
    assert_eq!(status, StatusCode::OK);

    let requests = app.chat.requests();
    assert_eq!(requests.len(), 2);
    let first = serde_json::to_string(&requests[0].messages[0]).unwrap();
    let second = serde_json::to_string(&requests[1].messages[0]).unwrap();
    assert!(first.contains("Answer formally."));
    assert!(second.contains("Answer like a pirate."));
    assert!(!second.contains("Answer formally."));
}

#[tokio::test]
async fn test_query_prefers_the_users_own_documents() {
    let app = test_app();
    app.seed_prompt("jade").await;
    app.seed_default_document("holidays.txt", "The office closes for public holidays.")
        .await;

    let (status, _) = app
        .send(multipart_upload(
            "/upload_user_document",
            "itinerary.txt",
            "Jade flies to Oslo on the office holidays.",
            Some("jade"),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    app.chat.push(retrieve_call("office holidays"));
    app.chat.push(ScriptedReply::Text("You fly to Oslo.".into()));
    let (status, body) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({ "query": "What are my holiday plans?", "user_id": "jade" })),
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["knowledge_base"], "user");
    let sources = body["sources"].as_array().unwrap();
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["source"], "itinerary.txt");

    let tool_output = serde_json::to_string(&app.chat.requests()[1].messages).unwrap();
    assert!(tool_output.contains("Jade flies to Oslo"));
    assert!(!tool_output.contains("closes for public holidays"));
}

#[tokio::test]
async fn test_resumed_conversation_replays_prior_turns() {
    let app = test_app();
    app.seed_prompt("kim").await;
    app.seed_default_document("hours.txt", "Support is open from nine to five.")
        .await;

    app.chat.push(retrieve_call("support hours"));
    app.chat.push(ScriptedReply::Text("Nine to five.".into()));
    let (status, first) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({ "query": "When is support open?", "user_id": "kim" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{first}");
    let conversation_id = first["conversation_id"].as_str().unwrap().to_string();

    app.chat.push(ScriptedReply::Text("Yes, on weekdays.".into()));
    let (status, second) = app
        .json(
            Method::POST,
            "/query",
            Some(json!({
                "query": "Every day?",
                "user_id": "kim",
                "conversation_id": conversation_id,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{second}");
    assert_eq!(second["conversation_id"], conversation_id.as_str());

    let requests = app.chat.requests();
    assert_eq!(requests.len(), 3);
    let replay = &requests[2].messages;
    let roles: Vec<&str> = replay.iter().map(|m| m.role()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "tool", "assistant", "user"]);
    assert_eq!(replay[2].tool_calls().len(), 1);
    assert_eq!(replay[4].ai_text().as_deref(), Some("Nine to five."));
    assert!(serde_json::to_string(&replay[5]).unwrap().contains("Every day?"));
}
