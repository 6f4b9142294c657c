use std::{sync::Arc, time::Duration};

use agentflow::{AgentflowError, ChannelEvent, ChannelOptions, EngineBuilder, Executor, ExecutorEvent, ExecutorRegistry, WorkflowModel, stream_fn};
use futures::{StreamExt, stream};
use tracing_subscriber::EnvFilter;

/// Stands in for a model call: streams the configured reply word by word.
fn agent(params: &serde_json::Value) -> agentflow::Result<Arc<dyn Executor>> {
    let reply = params.get("reply").and_then(|v| v.as_str()).ok_or_else(|| AgentflowError::Config("agent requires a reply".to_string()))?.to_string();

    Ok(Arc::new(stream_fn(move |_, _| {
        let words: Vec<String> = reply.split_inclusive(' ').map(str::to_string).collect();
        let output = reply.clone();
        stream::iter(words)
            .then(|word| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, AgentflowError>(ExecutorEvent::text(word))
            })
            .chain(stream::once(async move { Ok(ExecutorEvent::completed(output)) }))
    })))
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let engine = EngineBuilder::new().async_worker_thread_number(4).build().unwrap();
    engine.launch().unwrap();

    let registry = ExecutorRegistry::new().register_factory("agent", agent);
    let workflow_model = WorkflowModel::from_json(include_str!("./workflow.json")).unwrap();
    engine.deploy_model(&workflow_model, &registry).unwrap();
    println!("{}\n", engine.workflow(&workflow_model.id).unwrap().schema());

    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_update(|e, content| {
        if let Some(text) = content.as_text() {
            println!("[{}] {}", e.nid, text);
        }
    });
    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_complete(move |rid| {
        println!("Workflow completed, rid: {}", rid);
    });
    ChannelEvent::channel(engine.channel(), ChannelOptions::default()).unwrap().on_error(move |e| {
        println!("Workflow failed: {:?}", e);
    });

    let rid = engine.spawn(&workflow_model.id, "You are at the CN Tower.").unwrap();
    let run = engine.get_run(&rid).unwrap();

    loop {
        if run.is_complete() {
            break;
        }
        std::thread::sleep(Duration::from_millis(100));
    }

    for (nid, output) in run.history() {
        println!("{}: {}", nid, output);
    }
    engine.shutdown();
}
