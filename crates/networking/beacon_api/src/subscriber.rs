use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use eventsource_client::{Client, ClientBuilder, ReconnectOptions, SSE};
use futures::StreamExt;
use posmoni_api_types::checkpoint::Checkpoint;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const FINALIZED_CHECKPOINT_STREAM: &str = "/eth/v1/events?topics=finalized_checkpoint";

/// A long-lived connection to one endpoint's event stream.
///
/// `listen` keeps pushing decoded checkpoints into `sender` until the stream ends for good or the
/// receiving side goes away. The caller aborts it by dropping the future.
#[async_trait]
pub trait StreamSubscriber: Send + Sync + 'static {
    async fn listen(&self, url: String, sender: mpsc::UnboundedSender<Checkpoint>);
}

#[derive(Clone)]
pub struct SubscribeOptions {
    pub endpoints: Vec<String>,
    pub stream_path: String,
    pub subscriber: Arc<dyn StreamSubscriber>,
}

impl SubscribeOptions {
    pub fn finalized_checkpoints(
        endpoints: Vec<String>,
        subscriber: Arc<dyn StreamSubscriber>,
    ) -> Self {
        Self {
            endpoints,
            stream_path: FINALIZED_CHECKPOINT_STREAM.to_string(),
            subscriber,
        }
    }
}

/// Opens one stream per endpoint and merges everything they produce into a single receiver.
///
/// Checkpoints reported by several endpoints are delivered once per endpoint. The receiver stays
/// open until `cancel` fires, even if every listener has already returned.
pub fn subscribe(
    cancel: CancellationToken,
    options: SubscribeOptions,
) -> mpsc::UnboundedReceiver<Checkpoint> {
    let (sender, receiver) = mpsc::unbounded_channel();

    for endpoint in options.endpoints {
        let url = format!("{}{}", endpoint.trim_end_matches('/'), options.stream_path);
        let subscriber = options.subscriber.clone();
        let sender = sender.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            info!("Subscribing to {url}");
            tokio::select! {
                _ = cancel.cancelled() => debug!("Subscription to {url} cancelled"),
                _ = subscriber.listen(url.clone(), sender) => warn!("Subscription to {url} ended"),
            }
        });
    }

    tokio::spawn(async move {
        let _sender = sender;
        cancel.cancelled().await;
    });

    receiver
}

/// Decodes one event payload and forwards it. Returns `false` once nobody is receiving anymore.
pub fn forward_event_data(
    url: &str,
    data: &str,
    sender: &mpsc::UnboundedSender<Checkpoint>,
) -> bool {
    match Checkpoint::from_event_data(data) {
        Ok(Some(checkpoint)) => {
            debug!("{url}: finalized checkpoint at epoch {}", checkpoint.epoch);
            sender.send(checkpoint).is_ok()
        }
        Ok(None) => true,
        Err(err) => {
            error!("{url}: failed to decode checkpoint event: {err}");
            true
        }
    }
}

/// Reconnect delays for a dropped event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub backoff_factor: u32,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            backoff_factor: 2,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl ReconnectPolicy {
    fn options(&self) -> ReconnectOptions {
        ReconnectOptions::reconnect(true)
            .retry_initial(true)
            .delay(self.initial_delay)
            .backoff_factor(self.backoff_factor)
            .delay_max(self.max_delay)
            .build()
    }
}

/// Server sent events subscriber that reconnects with backoff whenever the connection drops.
#[derive(Debug, Clone, Default)]
pub struct SseSubscriber {
    reconnect: ReconnectPolicy,
}

impl SseSubscriber {
    pub fn new(reconnect: ReconnectPolicy) -> Self {
        Self { reconnect }
    }
}

#[async_trait]
impl StreamSubscriber for SseSubscriber {
    async fn listen(&self, url: String, sender: mpsc::UnboundedSender<Checkpoint>) {
        let client = match ClientBuilder::for_url(&url) {
            Ok(builder) => builder.reconnect(self.reconnect.options()).build(),
            Err(err) => {
                error!("{url}: invalid event stream url: {err:?}");
                return;
            }
        };

        let mut stream = client.stream();
        while let Some(event) = stream.next().await {
            match event {
                Ok(SSE::Event(event)) => {
                    if !forward_event_data(&url, &event.data, &sender) {
                        debug!("{url}: checkpoint receiver dropped");
                        return;
                    }
                }
                Ok(SSE::Connected(connection_details)) => {
                    info!("{url}: connected to event stream: {connection_details:?}");
                }
                Ok(SSE::Comment(comment)) => debug!("{url}: received comment: {comment:?}"),
                Err(err) => error!("{url}: error receiving event: {err:?}"),
            }
        }
    }
}
