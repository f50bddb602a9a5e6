//! The optimization session: connection lifecycle and response loop.
//!
//! A session owns its transport, its strategy and the live parameter sink.
//! Every exchange is strictly request/response. Any failure during an
//! exchange drops the connection and leaves the session `Errored` with the
//! sink at its last successfully applied values.

use eva_core::{
    MessageKind, ParameterSink, ParameterSpace, ParameterValueSet, ProtocolError, WireMessage,
    CONTINUE_TOKEN, TERMINATE_TOKEN,
};
use eva_strategy::{OptimizerStrategy, ProgressReport, Strategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info};

use crate::config::SessionConfig;
use crate::id::SessionId;
use crate::tracker::{BestTracker, SessionState};
use crate::transport::{Connector, Transport};
use crate::{Result, SessionError};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// No connection
    Disconnected,
    /// Welcome received, nothing sent yet
    Connected,
    /// Request sent, waiting for the first candidate
    Configured,
    /// A candidate is applied and waits for its fitness
    Evaluating,
    /// Answering a continuation query
    AwaitingContinuation,
    /// The optimizer reported its final result
    Finished,
    /// The last exchange failed
    Errored,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Configured => "configured",
            Self::Evaluating => "evaluating",
            Self::AwaitingContinuation => "awaiting continuation",
            Self::Finished => "finished",
            Self::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// What the caller has to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// A candidate has been applied to the sink; evaluate it and call
    /// [`Session::finish`] with the fitness.
    Evaluate(ParameterValueSet),
    /// The run is over and the best parameters are back in the sink.
    Finished {
        /// Final value reported by the optimizer
        result: f64,
    },
}

/// Notifications for observers such as a UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Welcome received
    Connected,
    /// Optimization request sent
    Configured {
        /// Method name
        method: String,
    },
    /// A candidate is ready to be evaluated
    EvaluationRequested {
        /// Generation the candidate belongs to
        generation: u32,
        /// Applied values
        parameters: ParameterValueSet,
    },
    /// Progress after an evaluation
    Progress(ProgressReport),
    /// An evaluation beat the best fitness so far
    NewBest {
        /// New best fitness
        fitness: f64,
        /// Values that produced it
        parameters: ParameterValueSet,
    },
    /// A continuation query was answered
    Continuation {
        /// Whether `continue` was sent
        proceed: bool,
        /// Generation after the answer
        generation: u32,
    },
    /// The run is over
    Finished {
        /// Final value reported by the optimizer
        result: f64,
        /// Best fitness seen locally
        best_fitness: f64,
    },
    /// The session failed
    Failed {
        /// Error description
        reason: String,
    },
}

/// A client session with a remote optimizer.
pub struct Session<C: Connector, P: ParameterSink> {
    id: SessionId,
    connector: C,
    transport: Option<C::Transport>,
    strategy: Box<dyn OptimizerStrategy>,
    space: ParameterSpace,
    sink: P,
    tracker: BestTracker,
    phase: SessionPhase,
    candidate: Option<ParameterValueSet>,
    result: Option<f64>,
    stop_requested: bool,
    events: Option<Sender<SessionEvent>>,
}

impl<C: Connector, P: ParameterSink> Session<C, P> {
    /// Create a session from a validated configuration.
    pub fn new(config: &SessionConfig, connector: C, sink: P) -> Result<Self> {
        config.validate()?;
        let space = config.parameter_space()?;
        let strategy = Strategy::from_config(&config.strategy)?;
        Self::with_strategy(space, Box::new(strategy), connector, sink)
    }

    /// Create a session with a custom strategy.
    ///
    /// Fails if the strategy cannot encode every descriptor of `space`.
    pub fn with_strategy(
        space: ParameterSpace,
        strategy: Box<dyn OptimizerStrategy>,
        connector: C,
        sink: P,
    ) -> Result<Self> {
        strategy.encode_parameters(&space)?;

        Ok(Self {
            id: SessionId::new(),
            connector,
            transport: None,
            strategy,
            space,
            sink,
            tracker: BestTracker::new(),
            phase: SessionPhase::Disconnected,
            candidate: None,
            result: None,
            stop_requested: false,
            events: None,
        })
    }

    /// Send lifecycle notifications to `events`.
    ///
    /// The session never waits on the observer: events that do not fit in
    /// the channel are dropped.
    pub fn with_events(mut self, events: Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Identifier of the current connection.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Resolved parameter space.
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Active strategy.
    pub fn strategy(&self) -> &dyn OptimizerStrategy {
        self.strategy.as_ref()
    }

    /// Live parameter sink.
    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Live parameter sink, mutable.
    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    /// Progress indicators of the current run.
    pub fn progress(&self) -> ProgressReport {
        self.strategy.progress()
    }

    /// Snapshot of results and counters.
    pub fn state(&self) -> SessionState {
        let schedule = self.strategy.schedule();
        SessionState {
            fitness: self.tracker.fitness(),
            last_fitness: self.tracker.last_fitness(),
            best_fitness: self.tracker.best_fitness(),
            worst_fitness: self.tracker.worst_fitness(),
            best_parameter_set: self.tracker.best_parameter_set().cloned(),
            best_found_at: self.tracker.best_found_at(),
            generation: schedule.generation(),
            individual: schedule.individual(),
            evaluations: self.tracker.evaluations(),
            result: self.result,
        }
    }

    /// Open a connection and wait for the welcome message.
    ///
    /// Does nothing when a connection is already open.
    pub async fn connect(&mut self) -> Result<()> {
        if self.transport.is_some() {
            return Ok(());
        }
        let outcome = self.open().await;
        self.settle(outcome)
    }

    /// Start a new run.
    ///
    /// Connects if needed, sends the optimization request and returns the
    /// first thing the caller has to do.
    pub async fn start(&mut self) -> Result<Step> {
        match self.phase {
            SessionPhase::Disconnected
            | SessionPhase::Connected
            | SessionPhase::Finished
            | SessionPhase::Errored => {}
            phase => {
                return Err(SessionError::InvalidState {
                    operation: "start",
                    phase,
                })
            }
        }

        self.reset_run();
        let outcome = self.run().await;
        self.settle(outcome)
    }

    /// Report the fitness of the current candidate and ask for the next one.
    pub async fn finish(&mut self, fitness: f64) -> Result<Step> {
        self.expect_phase("finish", SessionPhase::Evaluating)?;

        if let Some(candidate) = self.candidate.take() {
            if self.tracker.record(fitness, &candidate) {
                info!(
                    "New best fitness {} in generation {}",
                    fitness,
                    self.strategy.schedule().generation()
                );
                self.emit(SessionEvent::NewBest {
                    fitness,
                    parameters: candidate,
                });
            }
        }

        self.strategy.finish(
            fitness,
            self.tracker.best_fitness(),
            self.tracker.worst_fitness(),
        );
        self.emit(SessionEvent::Progress(self.strategy.progress()));

        let outcome = self.exchange(fitness).await;
        self.settle(outcome)
    }

    /// Send `fitness` without recording it and ask for the next candidate.
    pub async fn request_new_values(&mut self, fitness: f64) -> Result<Step> {
        self.expect_phase("request new values", SessionPhase::Evaluating)?;
        self.candidate = None;

        let outcome = self.exchange(fitness).await;
        self.settle(outcome)
    }

    /// Re-apply the best parameter set to the sink.
    ///
    /// Returns `false` when nothing has been evaluated yet.
    pub fn set_best(&mut self) -> Result<bool> {
        match self.tracker.best_parameter_set() {
            Some(best) => {
                apply_values(&self.space, &mut self.sink, best)?;
                info!("Restored best parameters (fitness {})", self.tracker.best_fitness());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Answer the next continuation query with `terminate`.
    pub fn request_stop(&mut self) {
        self.stop_requested = true;
        info!("Stop requested for session {}", self.id);
    }

    /// Drop the connection immediately.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            info!("Session {} disconnected", self.id);
        }
        self.candidate = None;
        if !matches!(self.phase, SessionPhase::Finished | SessionPhase::Errored) {
            self.phase = SessionPhase::Disconnected;
        }
    }

    fn reset_run(&mut self) {
        self.tracker.reset();
        self.strategy.reset();
        self.candidate = None;
        self.result = None;
        self.stop_requested = false;
    }

    async fn run(&mut self) -> Result<Step> {
        if self.transport.is_none() {
            self.open().await?;
        }
        self.configure().await?;
        self.respond().await
    }

    async fn open(&mut self) -> Result<()> {
        self.id = SessionId::new();
        let mut transport = self.connector.connect().await?;

        match transport.recv().await? {
            Some(WireMessage::Welcome) => {}
            Some(WireMessage::Error(text)) => return Err(SessionError::Remote(text)),
            Some(other) => {
                return Err(ProtocolError::UnexpectedMessage {
                    expected: "welcome",
                    actual: other.kind(),
                }
                .into())
            }
            None => return Err(SessionError::ConnectionClosed),
        }

        self.transport = Some(transport);
        self.phase = SessionPhase::Connected;
        info!("Session {} connected", self.id);
        self.emit(SessionEvent::Connected);
        Ok(())
    }

    async fn configure(&mut self) -> Result<()> {
        let request = self.strategy.request(&self.space)?;
        let document = request.to_document()?;
        debug!("Optimization request: {}", document);

        self.send(&WireMessage::text(&document)).await?;
        self.strategy.begin();
        self.phase = SessionPhase::Configured;

        info!(
            "Configured {} run with {} parameters ({} slots)",
            request.method,
            self.space.descriptors().len(),
            self.space.slot_count()
        );
        self.emit(SessionEvent::Configured {
            method: request.method,
        });
        Ok(())
    }

    async fn exchange(&mut self, fitness: f64) -> Result<Step> {
        self.send(&WireMessage::Scalar(fitness)).await?;
        self.respond().await
    }

    /// Read replies until the caller has something to do.
    ///
    /// Continuation queries are answered in place, so a whole run of
    /// generations never grows the stack.
    async fn respond(&mut self) -> Result<Step> {
        loop {
            match self.recv().await? {
                WireMessage::Scalar(result) => return self.complete(result),
                WireMessage::Error(text) => return Err(SessionError::Remote(text)),
                WireMessage::Welcome => {
                    return Err(ProtocolError::UnexpectedMessage {
                        expected: "candidate or result",
                        actual: MessageKind::Welcome,
                    }
                    .into())
                }
                message if message.is_token(CONTINUE_TOKEN) => self.answer_continuation().await?,
                candidate => return self.accept(&candidate),
            }
        }
    }

    async fn answer_continuation(&mut self) -> Result<()> {
        self.phase = SessionPhase::AwaitingContinuation;
        self.strategy.await_continuation();

        let proceed = !self.stop_requested && self.strategy.can_continue();
        let token = if proceed { CONTINUE_TOKEN } else { TERMINATE_TOKEN };
        self.send(&WireMessage::text(token)).await?;

        if proceed {
            self.strategy.next_iteration();
        } else {
            self.strategy.terminate();
        }

        let generation = self.strategy.schedule().generation();
        info!("Answered {} at generation {}", token, generation);
        self.emit(SessionEvent::Continuation {
            proceed,
            generation,
        });
        Ok(())
    }

    fn accept(&mut self, message: &WireMessage) -> Result<Step> {
        let values = self.strategy.decode_parameters(message, &self.space)?;
        apply_values(&self.space, &mut self.sink, &values)?;

        let generation = self.strategy.schedule().generation();
        debug!("Applied candidate {:?} in generation {}", values.as_slice(), generation);

        self.phase = SessionPhase::Evaluating;
        self.candidate = Some(values.clone());
        self.emit(SessionEvent::EvaluationRequested {
            generation,
            parameters: values.clone(),
        });
        Ok(Step::Evaluate(values))
    }

    fn complete(&mut self, result: f64) -> Result<Step> {
        self.transport = None;
        self.candidate = None;
        if let Some(best) = self.tracker.best_parameter_set() {
            apply_values(&self.space, &mut self.sink, best)?;
        }

        self.result = Some(result);
        self.phase = SessionPhase::Finished;
        info!(
            "Optimization finished with result {} (best fitness {} after {} evaluations)",
            result,
            self.tracker.best_fitness(),
            self.tracker.evaluations()
        );
        self.emit(SessionEvent::Finished {
            result,
            best_fitness: self.tracker.best_fitness(),
        });
        Ok(Step::Finished { result })
    }

    async fn send(&mut self, message: &WireMessage) -> Result<()> {
        let transport = self.transport.as_mut().ok_or(SessionError::ConnectionClosed)?;
        transport.send(message).await
    }

    async fn recv(&mut self) -> Result<WireMessage> {
        let transport = self.transport.as_mut().ok_or(SessionError::ConnectionClosed)?;
        transport.recv().await?.ok_or(SessionError::ConnectionClosed)
    }

    fn expect_phase(&self, operation: &'static str, expected: SessionPhase) -> Result<()> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                phase: self.phase,
            })
        }
    }

    /// Tear down on failure.
    fn settle<T>(&mut self, outcome: Result<T>) -> Result<T> {
        outcome.map_err(|err| self.fail(err))
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        self.transport = None;
        self.candidate = None;
        self.phase = SessionPhase::Errored;
        error!("Session {} failed: {}", self.id, err);
        self.emit(SessionEvent::Failed {
            reason: err.to_string(),
        });
        err
    }

    fn emit(&self, event: SessionEvent) {
        let Some(events) = &self.events else {
            return;
        };
        match events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => debug!("Observer is lagging, dropped {:?}", event),
            // A dropped receiver only means nobody is watching.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Apply all values or none of them.
fn apply_values<P: ParameterSink>(
    space: &ParameterSpace,
    sink: &mut P,
    values: &ParameterValueSet,
) -> std::result::Result<(), ProtocolError> {
    for (name, value) in space.assignments(values)? {
        sink.apply(name, value);
    }
    Ok(())
}
