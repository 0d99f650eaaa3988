//! AMQP front-end: a `lapin` consumer with two durable queue bindings on
//! one topic exchange. Business-rule failures reject without requeue;
//! transient failures (cancelled, unavailable) nack with requeue, per the
//! redelivery policy recorded in DESIGN.md.

use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties, ExchangeKind};
use tokio_util::sync::CancellationToken;
use tracing as log;

use crate::config::AmqpConfig;
use crate::derive::derive_thumbnail;
use crate::error::VithError;
use crate::model::{Request, Source};
use crate::state::AppState;
use crate::{metrics, worker::StreamWorker};
use std::sync::Arc;

const KIND_STREAM: &str = "stream";
const KIND_THUMBNAIL: &str = "thumbnail";

pub async fn run(state: AppState, worker: Arc<StreamWorker>, cancel: CancellationToken) -> anyhow::Result<()> {
    let config = state.config.amqp.clone();
    let conn = Connection::connect(&config.url, ConnectionProperties::default()).await?;
    let channel = conn.create_channel().await?;

    channel
        .exchange_declare(
            &config.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    let stream_queue = declare_and_bind(&channel, &config, &config.stream_queue, "stream.#").await?;
    let thumbnail_queue = declare_and_bind(&channel, &config, &config.thumbnail_queue, "thumbnail.#").await?;

    let mut stream_consumer = channel
        .basic_consume(
            &stream_queue,
            "vith-stream-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;
    let mut thumbnail_consumer = channel
        .basic_consume(
            &thumbnail_queue,
            "vith-thumbnail-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::info!("amqp consumer shutting down");
                return Ok(());
            }
            delivery = stream_consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        handle_stream_delivery(&worker, delivery).await;
                    }
                    Some(Err(e)) => log::warn!("stream consumer error: {e}"),
                    None => return Ok(()),
                }
            }
            delivery = thumbnail_consumer.next() => {
                match delivery {
                    Some(Ok(delivery)) => {
                        handle_thumbnail_delivery(&state, &channel, &config, delivery, &cancel).await;
                    }
                    Some(Err(e)) => log::warn!("thumbnail consumer error: {e}"),
                    None => return Ok(()),
                }
            }
        }
    }
}

async fn declare_and_bind(
    channel: &lapin::Channel,
    config: &AmqpConfig,
    queue_name: &str,
    routing_pattern: &str,
) -> anyhow::Result<String> {
    channel
        .queue_declare(
            queue_name,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;
    channel
        .queue_bind(
            queue_name,
            &config.exchange,
            routing_pattern,
            QueueBindOptions::default(),
            FieldTable::default(),
        )
        .await?;
    Ok(queue_name.to_string())
}

fn decode_request(data: &[u8]) -> Result<Request, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Enqueues onto the Stream Worker instead of invoking `derive_stream`
/// directly, so AMQP-sourced stream requests share the same serial FIFO
/// queue as HTTP PUT rather than running unbounded in parallel.
async fn handle_stream_delivery(worker: &Arc<StreamWorker>, delivery: lapin::message::Delivery) {
    let req = match decode_request(&delivery.data) {
        Ok(req) => req,
        Err(e) => {
            log::warn!("invalid amqp stream payload: {e}");
            metrics::record(Source::Amqp.as_str(), KIND_STREAM, "unknown", "invalid");
            ack_reject(&delivery, false).await;
            return;
        }
    };

    if let Err(e) = req.validate() {
        log::warn!("invalid amqp stream request rejected: {e}");
        metrics::record(Source::Amqp.as_str(), KIND_STREAM, req.item_type.as_str(), e.metric_state());
        ack_reject(&delivery, false).await;
        return;
    }

    match worker.enqueue(Source::Amqp, req).await {
        Ok(()) => ack(&delivery).await,
        Err(e) => {
            let requeue = matches!(e, VithError::Unavailable(_) | VithError::Cancelled(_));
            log::warn!("amqp stream request rejected: {e}");
            ack_reject(&delivery, requeue).await;
        }
    }
}

async fn handle_thumbnail_delivery(
    state: &AppState,
    channel: &lapin::Channel,
    config: &AmqpConfig,
    delivery: lapin::message::Delivery,
    cancel: &CancellationToken,
) {
    let req = match decode_request(&delivery.data) {
        Ok(req) => req,
        Err(e) => {
            log::warn!("invalid amqp thumbnail payload: {e}");
            metrics::record(Source::Amqp.as_str(), KIND_THUMBNAIL, "unknown", "invalid");
            ack_reject(&delivery, false).await;
            return;
        }
    };

    let outcome = derive_thumbnail(state, Source::Amqp, &req, cancel).await;
    match outcome {
        Ok(()) => {
            publish_completion(channel, config, &req).await;
            ack(&delivery).await;
        }
        Err(e) => {
            let requeue = matches!(e, VithError::Unavailable(_) | VithError::Cancelled(_));
            log::warn!("amqp thumbnail request failed: {e}");
            ack_reject(&delivery, requeue).await;
        }
    }
}

async fn publish_completion(channel: &lapin::Channel, config: &AmqpConfig, req: &Request) {
    let Ok(payload) = serde_json::to_vec(req) else {
        return;
    };
    if let Err(e) = channel
        .basic_publish(
            &config.exchange,
            &config.routing_key,
            BasicPublishOptions::default(),
            &payload,
            BasicProperties::default(),
        )
        .await
    {
        log::warn!("failed to publish thumbnail completion event: {e}");
    }
}

async fn ack(delivery: &lapin::message::Delivery) {
    if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
        log::warn!("failed to ack delivery: {e}");
    }
}

async fn ack_reject(delivery: &lapin::message::Delivery, requeue: bool) {
    if let Err(e) = delivery.nack(BasicNackOptions { requeue, multiple: false }).await {
        log::warn!("failed to nack delivery: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemType;

    #[test]
    fn decodes_valid_payload() {
        let raw = br#"{"input":"a.mp4","output":"v/out.m3u8","type":"video","scale":150}"#;
        let req = decode_request(raw).unwrap();
        assert_eq!(req.item_type, ItemType::Video);
        assert_eq!(req.input, "a.mp4");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(decode_request(b"not json").is_err());
    }
}
