// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket server and connection handling.

use tokio::net::UnixStream;
use tracing::{debug, error};

use crate::lifecycle::DaemonState;
use crate::protocol::{
    self, Query, Request, Response, StudioSummary, TriggerSummary, DEFAULT_TIMEOUT,
    PROTOCOL_VERSION,
};
use sk_core::{EventPattern, StudioId, TriggerId};

/// Handle a single client connection
pub async fn handle_connection(
    daemon: &mut DaemonState,
    stream: UnixStream,
) -> Result<(), ServerError> {
    // Split stream for reading/writing
    let (mut reader, mut writer) = stream.into_split();

    // Read request with timeout
    let request = match protocol::read_request(&mut reader, DEFAULT_TIMEOUT).await {
        Ok(req) => req,
        Err(protocol::ProtocolError::Timeout) => {
            error!("Request read timeout");
            return Err(ServerError::Timeout);
        }
        Err(protocol::ProtocolError::ConnectionClosed) => {
            debug!("Client disconnected before sending request");
            return Ok(());
        }
        Err(e) => {
            error!("Failed to read request: {}", e);
            return Err(ServerError::Protocol(e));
        }
    };

    debug!("Received request: {:?}", request);

    // Handle request
    let response = handle_request(daemon, request).await;

    debug!("Sending response: {:?}", response);

    // Write response with timeout
    protocol::write_response(&mut writer, &response, DEFAULT_TIMEOUT)
        .await
        .map_err(ServerError::Protocol)?;

    Ok(())
}

/// Handle a single request and return a response
async fn handle_request(daemon: &mut DaemonState, request: Request) -> Response {
    match request {
        Request::Ping => Response::Pong,

        Request::Hello { version: _ } => Response::Hello {
            version: PROTOCOL_VERSION.to_string(),
        },

        Request::Status => {
            let uptime_secs = daemon.start_time.elapsed().as_secs();
            let studios = daemon.runtime.studios().len();
            let triggers_active = daemon
                .runtime
                .list_triggers(true)
                .map(|t| t.len())
                .unwrap_or(0);
            Response::Status {
                uptime_secs,
                studios,
                triggers_active,
            }
        }

        Request::Shutdown => {
            daemon.shutdown_requested = true;
            Response::ShuttingDown
        }

        Request::TriggerCreate { config } => match daemon.runtime.create_trigger(config) {
            Ok(trigger) => Response::Trigger {
                trigger: Box::new(TriggerSummary::of(&trigger)),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::TriggerEnable { id, enabled } => {
            match daemon
                .runtime
                .set_trigger_enabled(&TriggerId::new(id), enabled)
            {
                Ok(trigger) => Response::Trigger {
                    trigger: Box::new(TriggerSummary::of(&trigger)),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::TriggerReschedule { id, recurrence } => {
            match daemon
                .runtime
                .reschedule_trigger(&TriggerId::new(id), recurrence)
            {
                Ok(trigger) => Response::Trigger {
                    trigger: Box::new(TriggerSummary::of(&trigger)),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::TriggerDelete { id } => match daemon.runtime.delete_trigger(&TriggerId::new(id)) {
            Ok(()) => Response::Ok,
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Request::Transition {
            studio,
            action,
            machine_type,
        } => {
            let id: StudioId = match studio.parse() {
                Ok(id) => id,
                Err(e) => return Response::Error { message: e },
            };
            match daemon
                .runtime
                .request_transition(&id, action, machine_type)
                .await
            {
                Ok(state) => Response::Transition {
                    state: state.to_string(),
                },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }

        Request::TransitionCancel { studio } => {
            let id: StudioId = match studio.parse() {
                Ok(id) => id,
                Err(e) => return Response::Error { message: e },
            };
            Response::Cancelled {
                cancelled: daemon.runtime.cancel_transition(&id),
            }
        }

        Request::Query { query } => handle_query(daemon, query),
    }
}

/// Handle query requests
fn handle_query(daemon: &DaemonState, query: Query) -> Response {
    match query {
        Query::ListTriggers { enabled_only } => match daemon.runtime.list_triggers(enabled_only) {
            Ok(triggers) => Response::Triggers {
                triggers: triggers.iter().map(TriggerSummary::of).collect(),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Query::GetTrigger { id } => match daemon.runtime.get_trigger(&TriggerId::new(id)) {
            Ok(trigger) => Response::Trigger {
                trigger: Box::new(TriggerSummary::of(&trigger)),
            },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Query::ListStudios => Response::Studios {
            studios: daemon
                .runtime
                .studios()
                .iter()
                .map(StudioSummary::of)
                .collect(),
        },

        Query::GetStudio { id } => {
            let id: StudioId = match id.parse() {
                Ok(id) => id,
                Err(e) => return Response::Error { message: e },
            };
            let studio = daemon
                .runtime
                .studios()
                .into_iter()
                .find(|s| s.id == id)
                .map(|s| StudioSummary::of(&s));
            Response::Studio { studio }
        }

        Query::EventsSince { sequence } => match daemon.runtime.events_since(sequence) {
            Ok(events) => Response::Events { events },
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        },

        Query::EventsMatching { pattern } => {
            match daemon.runtime.events_matching(&EventPattern::new(pattern)) {
                Ok(events) => Response::Events { events },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            }
        }
    }
}

/// Server errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] protocol::ProtocolError),

    #[error("Request timeout")]
    Timeout,
}
