// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
pub mod codec;
pub mod error;
pub mod handle;
pub mod queue;
pub mod session;
pub mod state;
pub mod supervisor;
pub mod translate;

pub use error::LinkError;
pub use handle::{LinkEvent, LinkHandle};
pub use pilotlink_config::Action;
pub use queue::{command_queue, CommandReceiver, CommandSender, Outbound, QueuedMessage};
pub use session::{run_session, SessionConfig, SessionEnd, MAX_LINE_LEN};
pub use state::{ApSnapshot, StateReader, StateWriter};
pub use supervisor::{Backoff, Connector, LinkStream, Supervisor, TcpConnector, MIN_BACKOFF};
pub use translate::translate;
