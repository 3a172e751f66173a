use std::fmt;
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::api::{ApiError, CoachApi, Endpoint};
use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::models::{FormAnswers, Problem, Recommendation};

/// Screen the wizard is currently on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    CollectingInput,
    ReviewingProblems,
    ViewingRecommendations,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WizardStep::CollectingInput => "collecting-input",
            WizardStep::ReviewingProblems => "reviewing-problems",
            WizardStep::ViewingRecommendations => "viewing-recommendations",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("all three answers must be filled in")]
    IncompleteAnswers,
    #[error("a request is already in flight")]
    Busy,
    #[error("action not available in step {0}")]
    WrongStep(WizardStep),
    #[error("{0}")]
    RequestFailed(String),
}

/// State machine driving the three-screen coaching flow.
pub struct Wizard<A: CoachApi> {
    api: A,
    session_id: String,
    step: WizardStep,
    problems: Vec<Problem>,
    recommendations: Vec<Recommendation>,
    error: Option<String>,
    busy: bool,
    event_bus: Option<Arc<EventBus>>,
}

impl<A: CoachApi> Wizard<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            session_id: uuid::Uuid::new_v4().to_string(),
            step: WizardStep::CollectingInput,
            problems: Vec::new(),
            recommendations: Vec::new(),
            error: None,
            busy: false,
            event_bus: None,
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Announce the session on the event bus.
    pub async fn start(&self) {
        info!("Starting coaching session {}", self.session_id);
        let _ = self
            .emit_event(Event::SessionStarted {
                session_id: self.session_id.clone(),
            })
            .await;
    }

    fn guard(&self, expected: WizardStep) -> Result<(), WizardError> {
        if self.busy {
            return Err(WizardError::Busy);
        }
        if self.step != expected {
            return Err(WizardError::WrongStep(self.step));
        }
        Ok(())
    }

    /// Send the answers for analysis and move on to the problem review.
    pub async fn submit_answers(&mut self, answers: &FormAnswers) -> Result<(), WizardError> {
        self.guard(WizardStep::CollectingInput)?;
        if !answers.is_complete() {
            return Err(WizardError::IncompleteAnswers);
        }

        self.begin_request(Endpoint::Analyze).await;
        let result = self.api.analyze(answers).await;
        self.busy = false;

        match result {
            Ok(problems) => {
                info!("Received {} problems", problems.len());
                self.finish_request(Endpoint::Analyze, problems.len()).await;
                self.problems = problems;
                self.advance(WizardStep::ReviewingProblems).await;
                Ok(())
            }
            Err(e) => Err(self.fail_request(Endpoint::Analyze, e.user_message(), &e).await),
        }
    }

    /// Request recommendations for the problems currently held.
    pub async fn confirm_problems(&mut self) -> Result<(), WizardError> {
        self.guard(WizardStep::ReviewingProblems)?;

        self.begin_request(Endpoint::Recommend).await;
        let result = self.api.recommend(&self.problems).await;
        self.busy = false;

        match result {
            Ok(recommendations) => {
                info!("Received {} recommendations", recommendations.len());
                self.finish_request(Endpoint::Recommend, recommendations.len())
                    .await;
                self.recommendations = recommendations;
                self.advance(WizardStep::ViewingRecommendations).await;
                Ok(())
            }
            Err(e) => Err(self
                .fail_request(Endpoint::Recommend, e.user_message(), &e)
                .await),
        }
    }

    /// Discard all server-derived state and return to the form.
    pub async fn reset(&mut self) {
        info!("Resetting wizard from {}", self.step);
        self.problems.clear();
        self.recommendations.clear();
        self.error = None;
        self.step = WizardStep::CollectingInput;
        let _ = self.emit_event(Event::WizardReset).await;
    }

    pub async fn dismiss_error(&mut self) {
        if self.error.take().is_some() {
            let _ = self.emit_event(Event::ErrorDismissed).await;
        }
    }

    async fn begin_request(&mut self, endpoint: Endpoint) {
        self.error = None;
        self.busy = true;
        let _ = self
            .emit_event(Event::RequestStarted { endpoint })
            .await;
    }

    async fn finish_request(&self, endpoint: Endpoint, items: usize) {
        let _ = self
            .emit_event(Event::RequestCompleted { endpoint, items })
            .await;
    }

    async fn fail_request(
        &mut self,
        endpoint: Endpoint,
        message: String,
        cause: &ApiError,
    ) -> WizardError {
        warn!("{} failed: {}", endpoint.path(), cause);
        self.error = Some(message.clone());
        let _ = self
            .emit_event(Event::RequestFailed {
                endpoint,
                error: message.clone(),
            })
            .await;
        WizardError::RequestFailed(message)
    }

    async fn advance(&mut self, step: WizardStep) {
        self.step = step;
        let _ = self
            .emit_event(Event::StepChanged {
                step: step.to_string(),
            })
            .await;
    }
}

#[async_trait::async_trait]
impl<A: CoachApi> EventEmitter for Wizard<A> {
    fn set_event_bus(&mut self, bus: Arc<EventBus>) {
        self.event_bus = Some(bus);
    }

    async fn emit_event(&self, event: Event) -> anyhow::Result<()> {
        if let Some(bus) = &self.event_bus {
            bus.emit(event).await
        } else {
            Ok(())
        }
    }
}
