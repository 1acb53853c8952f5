use super::*;
use convoy_adapters::{FakeTransport, TransportCall};

fn sample_message() -> OutboundMessage {
    OutboundMessage::ProcessingMessage {
        job_id: "job-1".into(),
        processed_message_id: "m-1".into(),
    }
}

#[tokio::test]
async fn enqueue_blocks_until_connected_then_sends() {
    let transport = Arc::new(FakeTransport::new());
    let connection = ConnectionState::new();
    let pipeline = OutboundPipeline::spawn(transport.clone(), connection.clone());

    pipeline.enqueue(sample_message()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(transport.calls().is_empty(), "should not send while disconnected");

    connection.set_connected(true);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn retries_on_failure_and_eventually_succeeds() {
    let transport = Arc::new(FakeTransport::new());
    let connection = ConnectionState::new();
    connection.set_connected(true);
    transport.set_connected(false);
    let pipeline = OutboundPipeline::spawn(transport.clone(), connection);

    pipeline.enqueue(sample_message()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(transport.calls().last(), Some(TransportCall::Send(_))));

    transport.set_connected(true);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(transport.calls().len() >= 2);
}

#[tokio::test]
async fn in_order_emission_for_successive_enqueues() {
    let transport = Arc::new(FakeTransport::new());
    let connection = ConnectionState::new();
    connection.set_connected(true);
    let pipeline = OutboundPipeline::spawn(transport.clone(), connection);

    pipeline
        .enqueue(OutboundMessage::ProcessingMessage {
            job_id: "job-1".into(),
            processed_message_id: "m-1".into(),
        })
        .await;
    pipeline
        .enqueue(OutboundMessage::ProcessingMessage {
            job_id: "job-1".into(),
            processed_message_id: "m-2".into(),
        })
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[0],
        TransportCall::Send(OutboundMessage::ProcessingMessage {
            job_id: "job-1".into(),
            processed_message_id: "m-1".into(),
        })
    );
}
