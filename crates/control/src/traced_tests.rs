// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fake::FakeControlClient;
use sk_core::{MachineType, StudioId};

fn studio() -> StudioId {
    StudioId::new("ml-box", "research", "ada")
}

#[tokio::test]
async fn traced_client_passes_through_results() {
    let fake = FakeControlClient::new();
    let id = studio();
    fake.push_poll(&id, Ok(RemoteStatus::Running));

    let traced = TracedControlClient::new(fake.clone());

    assert_eq!(traced.poll(&id).await.unwrap(), RemoteStatus::Running);
    traced.start(&id, MachineType::Cpu).await.unwrap();
    traced.stop(&id).await.unwrap();

    assert_eq!(fake.calls().len(), 3);
}

#[tokio::test]
async fn traced_client_passes_through_errors() {
    let fake = FakeControlClient::new();
    fake.fail_stop(ControlError::Terminal {
        message: "not allowed".to_string(),
    });

    let traced = TracedControlClient::new(fake);
    let err = traced.stop(&studio()).await.unwrap_err();
    assert!(!err.is_transient());
}
