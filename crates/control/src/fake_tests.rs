// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::client::{ControlClient, ControlError, RemoteStatus};
use sk_core::{MachineType, StudioId};

fn studio() -> StudioId {
    StudioId::new("ml-box", "research", "ada")
}

#[tokio::test]
async fn scripted_polls_are_consumed_in_order() {
    let client = FakeControlClient::new();
    let id = studio();
    client.push_poll(&id, Ok(RemoteStatus::Stopped));
    client.push_poll(&id, Ok(RemoteStatus::Pending));
    client.push_poll(&id, Ok(RemoteStatus::Running));

    assert_eq!(client.poll(&id).await.unwrap(), RemoteStatus::Stopped);
    assert_eq!(client.poll(&id).await.unwrap(), RemoteStatus::Pending);
    assert_eq!(client.poll(&id).await.unwrap(), RemoteStatus::Running);
}

#[tokio::test]
async fn exhausted_script_repeats_last_outcome() {
    let client = FakeControlClient::new();
    let id = studio();
    client.push_poll(&id, Ok(RemoteStatus::Running));

    assert_eq!(client.poll(&id).await.unwrap(), RemoteStatus::Running);
    assert_eq!(client.poll(&id).await.unwrap(), RemoteStatus::Running);
}

#[tokio::test]
async fn unscripted_studio_defaults_to_stopped() {
    let client = FakeControlClient::new();
    assert_eq!(client.poll(&studio()).await.unwrap(), RemoteStatus::Stopped);
}

#[tokio::test]
async fn scripted_errors_surface() {
    let client = FakeControlClient::new();
    let id = studio();
    client.push_poll(
        &id,
        Err(ControlError::Transient {
            message: "timeout".to_string(),
        }),
    );

    let err = client.poll(&id).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn calls_are_recorded() {
    let client = FakeControlClient::new();
    let id = studio();

    client.start(&id, MachineType::Gpu).await.unwrap();
    client.stop(&id).await.unwrap();
    client.poll(&id).await.unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0], ControlCall::Start(id.clone(), MachineType::Gpu));
    assert_eq!(calls[1], ControlCall::Stop(id.clone()));
    assert_eq!(calls[2], ControlCall::Poll(id));
}

#[tokio::test]
async fn fail_start_rejects_subsequent_starts() {
    let client = FakeControlClient::new();
    client.fail_start(ControlError::Terminal {
        message: "quota exceeded".to_string(),
    });

    let err = client.start(&studio(), MachineType::Cpu).await.unwrap_err();
    assert!(!err.is_transient());
}
