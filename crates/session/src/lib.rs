//! Eva session engine.
//!
//! Drives one optimization run against a remote optimizer: connect, send
//! the request, apply each candidate to the caller's parameter sink, report
//! fitness values back and negotiate generation continuation.
//!
//! ```no_run
//! use eva_core::ParameterStore;
//! use eva_session::{Session, SessionConfig, Step};
//!
//! # async fn run(config: SessionConfig) -> eva_session::Result<()> {
//! let connector = config.connector();
//! let mut session = Session::new(&config, connector, ParameterStore::new())?;
//!
//! let mut step = session.start().await?;
//! while let Step::Evaluate(values) = step {
//!     let fitness = values.as_slice().iter().map(|v| v * v).sum();
//!     step = session.finish(fitness).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod error;
mod id;

pub mod config;
pub mod session;
pub mod tracker;
pub mod transport;

pub use error::{Result, SessionError};
pub use id::SessionId;

pub use config::{SessionConfig, DEFAULT_HOST, DEFAULT_PORT};
pub use session::{Session, SessionEvent, SessionPhase, Step};
pub use tracker::{BestTracker, SessionState};
pub use transport::{Connector, FramedTransport, TcpConnector, Transport, DEFAULT_MAX_FRAME_LEN};
