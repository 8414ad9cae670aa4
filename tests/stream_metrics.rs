use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, stream};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use shellstream::application::stream::{
    ChunkStream, METRIC_SETUP_FAILURE_TOTAL, METRIC_SHELL_FAILURE_TOTAL,
    METRIC_STREAM_STARTED_TOTAL, METRIC_TAIL_FAILURE_TOTAL, RenderCause, RenderOptions, Renderer,
    ResponseBody, ResponseConfig, stream_node,
};

enum Outcome {
    ShellFails,
    TailFails,
    Completes,
}

struct OutcomeRenderer;

#[async_trait]
impl Renderer for OutcomeRenderer {
    type Node = Outcome;

    async fn render(
        &self,
        node: Outcome,
        _options: RenderOptions,
    ) -> Result<ChunkStream, RenderCause> {
        match node {
            Outcome::ShellFails => Err("no shell".into()),
            Outcome::TailFails => Ok(stream::iter(vec![
                Ok(Bytes::from("<html>")),
                Err(RenderCause::from("gone")),
            ])
            .boxed()),
            Outcome::Completes => Ok(stream::iter(vec![Ok(Bytes::from("<html></html>"))]).boxed()),
        }
    }
}

async fn drive(outcome: Outcome, config: ResponseConfig) {
    let response = stream_node(&OutcomeRenderer, outcome, RenderOptions::new(), config).await;
    if let ResponseBody::Stream(tail) = response.into_body() {
        let _ = tail.collect::<Vec<_>>().await;
    }
}

#[tokio::test]
async fn stream_outcomes_emit_expected_counters() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    drive(Outcome::Completes, ResponseConfig::new()).await;
    drive(Outcome::Completes, ResponseConfig::new()).await;
    drive(Outcome::TailFails, ResponseConfig::new()).await;
    drive(Outcome::ShellFails, ResponseConfig::new()).await;
    drive(
        Outcome::Completes,
        ResponseConfig::new().with_header("bad header", "x"),
    )
    .await;

    let counters: HashMap<String, u64> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .filter_map(|(composite_key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((composite_key.key().name().to_string(), count)),
            _ => None,
        })
        .collect();

    assert_eq!(counters.get(METRIC_STREAM_STARTED_TOTAL), Some(&3));
    assert_eq!(counters.get(METRIC_TAIL_FAILURE_TOTAL), Some(&1));
    assert_eq!(counters.get(METRIC_SHELL_FAILURE_TOTAL), Some(&1));
    assert_eq!(counters.get(METRIC_SETUP_FAILURE_TOTAL), Some(&1));
}
