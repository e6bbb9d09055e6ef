// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::NaiveTime;
use sk_core::{StudioId, TriggerConfig};

#[tokio::test]
async fn frame_round_trip() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let request = Request::Ping;
    let data = encode(&request).unwrap();
    write_message(&mut client, &data).await.unwrap();

    let received = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert!(matches!(received, Request::Ping));
}

#[tokio::test]
async fn structured_request_round_trip() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let config = TriggerConfig::new(
        "morning start",
        StudioId::new("ml-box", "research", "ada"),
        TriggerAction::Start,
        Recurrence::Daily {
            at: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        },
    );
    let data = encode(&Request::TriggerCreate { config }).unwrap();
    write_message(&mut client, &data).await.unwrap();

    let received = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    let Request::TriggerCreate { config } = received else {
        panic!("wrong variant");
    };
    assert_eq!(config.name, "morning start");
    assert_eq!(config.studio.to_string(), "ada/research/ml-box");
}

#[tokio::test]
async fn response_round_trip() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    write_response(
        &mut server,
        &Response::Status {
            uptime_secs: 42,
            studios: 2,
            triggers_active: 3,
        },
        DEFAULT_TIMEOUT,
    )
    .await
    .unwrap();

    let bytes = read_message(&mut client).await.unwrap();
    let response: Response = decode(&bytes).unwrap();
    assert!(matches!(
        response,
        Response::Status {
            uptime_secs: 42,
            studios: 2,
            triggers_active: 3,
        }
    ));
}

#[tokio::test]
async fn closed_connection_is_distinguished_from_io_error() {
    let (client, mut server) = tokio::io::duplex(4096);
    drop(client);

    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_frame_is_rejected() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    tokio::io::AsyncWriteExt::write_u32(&mut client, u32::MAX)
        .await
        .unwrap();

    let err = read_message(&mut server).await.unwrap_err();
    assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
}

#[tokio::test]
async fn slow_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(4096);

    let err = read_request(&mut server, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}
