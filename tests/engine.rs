use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use agentflow::{
    AgentflowError, ApprovalRequest, ApprovalResponse, ChannelEvent, ChannelOptions, Engine, EngineBuilder, ExecutorEvent, ExecutorRegistry, FunctionCall,
    GraphEvent, Payload, RunStatus, UpdateContent, WorkflowBuilder, WorkflowEvent, WorkflowModel, executor_fn, stream_fn,
};
use futures::{StreamExt, stream};
use tokio::runtime::Handle;

fn engine() -> Engine {
    let engine = EngineBuilder::new().handle(Handle::current()).build().unwrap();
    engine.launch().unwrap();
    engine
}

fn greeter() -> WorkflowBuilder {
    WorkflowBuilder::new("greeter")
        .add_executor(
            "greet",
            stream_fn(|_, input: Payload| {
                stream::iter(vec![Ok(ExecutorEvent::text("Hello, ")), Ok(ExecutorEvent::text(input.to_string())), Ok(ExecutorEvent::completed(format!("Hello, {}", input)))])
            }),
        )
        .set_start_executor("greet")
}

async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..100 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn test_engine_run_and_evict() {
    let engine = engine();
    assert!(!engine.deploy(greeter().build().unwrap()));
    assert!(engine.deploy(greeter().build().unwrap()));

    let handle = engine.run("greeter", "Toronto").unwrap();
    let rid = handle.id().to_string();
    assert!(engine.get_run(&rid).is_some());

    let status = handle.wait().await;
    assert_eq!(status.status, RunStatus::Completed);
    assert_eq!(status.output, Some(Payload::text("Hello, Toronto")));

    assert!(eventually(|| engine.get_run(&rid).is_none()).await, "finished run is evicted");
    engine.shutdown();
}

#[tokio::test]
async fn test_engine_rejects_unknown_and_stopped() {
    let engine = engine();
    assert!(matches!(engine.run("missing", "x"), Err(AgentflowError::Engine(_))));
    assert!(matches!(engine.stop("no-such-run"), Err(AgentflowError::Run(_))));

    engine.deploy(greeter().build().unwrap());
    engine.shutdown();
    assert!(!engine.is_running());
    assert!(engine.run("greeter", "x").is_err());
}

#[tokio::test]
async fn test_channel_subscription_filters_by_executor() {
    let engine = engine();
    engine.deploy(greeter().build().unwrap());

    let texts = Arc::new(Mutex::new(Vec::new()));
    let statuses = Arc::new(Mutex::new(Vec::new()));

    let sink = texts.clone();
    ChannelEvent::channel(engine.channel(), ChannelOptions::with_nid("gree*".to_string())).unwrap().on_update(move |_, content| {
        if let Some(text) = content.as_text() {
            sink.lock().unwrap().push(text.to_string());
        }
    });
    let sink = statuses.clone();
    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_status(move |rid, status| {
        sink.lock().unwrap().push((rid.clone(), status.status));
    });

    let rid = engine.spawn("greeter", "Lyon").unwrap();
    assert!(eventually(|| !statuses.lock().unwrap().is_empty()).await);
    assert_eq!(statuses.lock().unwrap()[0], (rid, RunStatus::Completed));
    assert_eq!(texts.lock().unwrap().join(""), "Hello, Lyon");
    engine.shutdown();
}

#[tokio::test]
async fn test_channel_rejects_bad_pattern() {
    let engine = engine();
    assert!(ChannelEvent::channel(engine.channel(), ChannelOptions::with_rid("[".to_string())).is_err());
}

#[tokio::test]
async fn test_engine_approve_and_stop() {
    let engine = engine();
    let gate = stream_fn(|_, _| {
        let request = ApprovalRequest::new(FunctionCall::new("c1", "send_email", serde_json::json!({"to": "ops"})));
        stream::iter(vec![Ok(ExecutorEvent::Update(UpdateContent::ApprovalRequest(request)))])
    })
    .on_resume(|_, response: ApprovalResponse| stream::iter(vec![Ok(ExecutorEvent::completed(if response.approved { "sent" } else { "skipped" }))]));
    engine.deploy(WorkflowBuilder::new("gate").add_executor("gate", gate).set_start_executor("gate").build().unwrap());

    let mut handle = engine.run("gate", Payload::null()).unwrap();
    let rid = handle.id().to_string();
    while let Some(event) = handle.next().await {
        if let GraphEvent::Workflow(WorkflowEvent::AwaitingApproval(request)) = &event.event {
            assert_eq!(engine.get_run(&rid).unwrap().pending_approval().map(|r| r.id), Some(request.id.clone()));
            engine.approve(&rid, &request.id, false).unwrap();
        }
        if let Some(status) = event.as_status() {
            assert_eq!(status.output, Some(Payload::text("skipped")));
        }
    }

    let mut handle = engine.run("gate", Payload::null()).unwrap();
    let rid = handle.id().to_string();
    while let Some(event) = handle.next().await {
        if matches!(event.event, GraphEvent::Workflow(WorkflowEvent::AwaitingApproval(_))) {
            engine.stop(&rid).unwrap();
        }
        if let Some(status) = event.as_status() {
            assert_eq!(status.status, RunStatus::Cancelled);
        }
    }
    engine.shutdown();
}

#[tokio::test]
async fn test_deploy_model() {
    let engine = engine();
    let registry = ExecutorRegistry::new()
        .register("shout", executor_fn(|_, input: Payload| async move { Ok(Payload::text(input.to_string().to_uppercase())) }))
        .register("whisper", executor_fn(|_, input: Payload| async move { Ok(Payload::text(input.to_string().to_lowercase())) }));

    let model = WorkflowModel::from_json(
        r#"{
            "id": "volume",
            "start": "shout",
            "executors": [
                { "id": "shout", "uses": "shout" },
                { "id": "whisper", "uses": "whisper", "title": "Whisper it" }
            ],
            "edges": [{ "source": "shout", "target": "whisper" }]
        }"#,
    )
    .unwrap();

    engine.deploy_model(&model, &registry).unwrap();
    assert!(engine.workflow("volume").unwrap().schema().contains("[whisper] Whisper it"));

    let status = engine.run("volume", "Hello").unwrap().wait().await;
    assert_eq!(status.output, Some(Payload::text("hello")));
    engine.shutdown();
}
