// src/core/stub/action.rs

//! The tagged sum a matched prime's `then` list is made of (SPEC_FULL.md §9,
//! "Polymorphic action list"). The connection engine runs these in order with
//! a plain match, no virtual dispatch.

use crate::core::protocol::Message;
use crate::core::scope::{ActionScope, DisconnectHow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Respond {
        message: Message,
    },
    NoResponse,
    Disconnect {
        scope: ActionScope,
        how: DisconnectHow,
    },
    /// Pause the action list for `delay_in_ms` before continuing. The field
    /// name is load-bearing at the JSON boundary.
    Delay {
        delay_in_ms: u64,
    },
}

impl Action {
    pub fn respond(message: Message) -> Self {
        Action::Respond { message }
    }
}
