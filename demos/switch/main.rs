use std::sync::Arc;

use agentflow::{ExecutorEvent, GraphEvent, Payload, StructuredCondition, SwitchCase, WorkflowBuilder, executor_fn, stream_fn};
use futures::{StreamExt, stream};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct CityInfo {
    name: Option<String>,
    country: Option<String>,
}

fn recommend(text: &'static str) -> impl agentflow::Executor + 'static {
    stream_fn(move |_, input: Payload| {
        let city = input.parse::<CityInfo>().ok().and_then(|c| c.name).unwrap_or_else(|| "the city".to_string());
        let reply = format!("{} {}", text, city);
        stream::iter(vec![Ok(ExecutorEvent::text(reply.clone())), Ok(ExecutorEvent::completed(reply))])
    })
}

#[tokio::main]
async fn main() -> agentflow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let city = std::env::args().nth(1).unwrap_or_else(|| "Vancouver".to_string());
    let is_canada = StructuredCondition::new(|info: &CityInfo| info.country.as_deref() == Some("Canada"));

    let workflow = Arc::new(
        WorkflowBuilder::new("city_switch")
            .add_executor(
                "city_info",
                executor_fn(|_, input: Payload| async move {
                    let name = input.to_string();
                    let country = if ["Toronto", "Vancouver", "Montreal"].contains(&name.as_str()) { "Canada" } else { "Elsewhere" };
                    Payload::from_serialize(&serde_json::json!({ "name": name, "country": country }))
                }),
            )
            .add_executor("hockey", recommend("Catch a hockey game in"))
            .add_executor("tourist", recommend("Take the walking tour of"))
            .add_switch("city_info", [SwitchCase::when(is_canada, "hockey"), SwitchCase::otherwise("tourist")])
            .set_start_executor("city_info")
            .build()?,
    );
    println!("{}", workflow.to_dot());

    let mut events = workflow.run_stream(city)?;
    let mut last_executor: Option<String> = None;
    while let Some(event) = events.next().await {
        match &event.event {
            GraphEvent::Update(content) => {
                if last_executor.as_deref() != Some(event.nid.as_str()) {
                    println!();
                    print!("{}: ", event.nid);
                    last_executor = Some(event.nid.clone());
                }
                if let Some(text) = content.as_text() {
                    print!("{}", text);
                }
            }
            GraphEvent::Status(status) => {
                println!("\n=== Status ===\n{:?}", status);
            }
            _ => {}
        }
    }
    Ok(())
}
