//! Dialogue router: owns the session state machine and the transcript, and
//! sends each input to the identity service, the NLU backend, or local
//! control logic.
//!
//! Shared state lives behind one `std::sync::Mutex` that is never held
//! across an `.await`. Every network round-trip snapshots the session
//! `epoch` first; a reset (logout, failed session resolution) bumps the
//! epoch, and any response that comes back under an older epoch is dropped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use parley_client::{ClientError, HistoryStore, IdentityService, NluService};
use parley_core::{AuthStep, Button, ButtonAction, Message, ParleyConfig, Profile, Theme};
use tokio::task::JoinHandle;

use crate::error::{ChatError, Result};
use crate::normalizer::TextNormalizer;
use crate::session::SessionStore;
use crate::state::AuthState;
use crate::suggest::SuggestionEngine;
use crate::transcript::Transcript;

const LOGOUT_COMMAND: &str = "logout";

/// The router's network collaborators.
#[derive(Clone)]
pub struct RouterServices {
    pub identity: Arc<dyn IdentityService>,
    pub history: Arc<dyn HistoryStore>,
    pub nlu: Arc<dyn NluService>,
    pub normalizer: TextNormalizer,
}

/// What handling one input did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Empty or whitespace-only input.
    Ignored,
    /// An auth step succeeded; the session is now at this step.
    Advanced(AuthStep),
    /// An auth step failed; an error message was appended and the session
    /// stays at this step.
    Retry(AuthStep),
    /// An NLU reply was appended.
    Answered,
    /// The NLU call failed; an error message was appended.
    AnswerFailed,
    /// A repeat button dispatch was suppressed.
    Suppressed,
    /// A link button was activated. Nothing was dispatched.
    Link(String),
    /// The session was reset while the call was in flight; the response was
    /// discarded.
    Stale,
    LoggedOut,
}

/// One NLU dispatch, typed or from a button.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Dispatch {
    request_id: u64,
    /// `None` for typed queries.
    payload: Option<String>,
}

#[derive(Debug)]
struct Inner {
    state: AuthState,
    transcript: Transcript,
    suggestions: SuggestionEngine,
    epoch: u64,
    auth_pending: bool,
    nlu_in_flight: usize,
    next_request_id: u64,
    last_dispatch: Option<Dispatch>,
    last_satisfied: u64,
}

impl Inner {
    fn begin_dispatch(&mut self, payload: Option<&str>) -> u64 {
        self.next_request_id += 1;
        let request_id = self.next_request_id;
        self.last_dispatch = Some(Dispatch {
            request_id,
            payload: payload.map(str::to_string),
        });
        self.nlu_in_flight += 1;
        request_id
    }

    /// Drop everything tied to the current session and start a new epoch.
    fn reset(&mut self, opening: Message) {
        self.epoch += 1;
        self.state = AuthState::Phone;
        self.transcript.clear();
        self.transcript.append(opening);
        self.suggestions.clear_utterances();
        self.nlu_in_flight = 0;
        self.last_dispatch = None;
    }
}

/// Result of an auth-step service call, applied under the lock afterwards.
enum StepOutcome {
    Advance(AuthState, Message),
    Authenticate { token: String, profile: Profile },
    Stay(Message),
}

/// Clears `auth_pending` however the auth call ends.
struct AuthPending<'a> {
    router: &'a DialogueRouter,
}

impl Drop for AuthPending<'_> {
    fn drop(&mut self) {
        self.router.lock().auth_pending = false;
    }
}

/// Decrements the in-flight NLU count unless the session was reset.
struct InFlight<'a> {
    router: &'a DialogueRouter,
    epoch: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.router.lock();
        if inner.epoch == self.epoch {
            inner.nlu_in_flight = inner.nlu_in_flight.saturating_sub(1);
        }
    }
}

/// Conversation front-end for one client identity.
///
/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct DialogueRouter {
    inner: Arc<Mutex<Inner>>,
    session: Arc<SessionStore>,
    services: RouterServices,
    assistant_name: Arc<str>,
    persistence: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl DialogueRouter {
    pub fn new(config: &ParleyConfig, session: Arc<SessionStore>, services: RouterServices) -> Self {
        let inner = Inner {
            state: AuthState::Phone,
            transcript: Transcript::new(),
            suggestions: SuggestionEngine::new(&config.suggestions),
            epoch: 0,
            auth_pending: false,
            nlu_in_flight: 0,
            next_request_id: 0,
            last_dispatch: None,
            last_satisfied: 0,
        };
        Self {
            inner: Arc::new(Mutex::new(inner)),
            session,
            services,
            assistant_name: config.chat.assistant_name.as_str().into(),
            persistence: Arc::new(Mutex::new(Vec::new())),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Resume the stored session if its token still resolves, otherwise
    /// start at the phone step with a greeting. Never shows an error.
    pub async fn start(&self) -> AuthStep {
        let Some(token) = self.session.token() else {
            tracing::info!("No stored session, starting at phone step");
            self.lock().reset(Message::bot(self.greeting()));
            return AuthStep::Phone;
        };

        let epoch = {
            let mut inner = self.lock();
            inner.auth_pending = true;
            inner.epoch
        };
        let _pending = AuthPending { router: self };
        match self
            .services
            .identity
            .resolve_session(self.session.user_id(), &token)
            .await
        {
            Ok(profile) => {
                tracing::info!(user_id = %self.session.user_id(), "Stored session resolved");
                self.finish_authentication(epoch, token, profile).await;
            }
            Err(e) => {
                tracing::warn!(
                    class = %e.class(),
                    error = %e,
                    "Stored session could not be resolved, starting over"
                );
                if let Err(e) = self.session.clear_token() {
                    tracing::warn!(error = %e, "Failed to clear stored token");
                }
                self.lock().reset(Message::bot(self.greeting()));
            }
        }
        self.auth_step()
    }

    /// Route one line of user input.
    pub async fn submit(&self, input: &str) -> Result<Routed> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Routed::Ignored);
        }

        let authenticated = self.lock().state.is_authenticated();
        if authenticated {
            if trimmed.eq_ignore_ascii_case(LOGOUT_COMMAND) {
                return Ok(self.logout().await);
            }
            return self.submit_query(input, trimmed).await;
        }
        self.submit_auth(input, trimmed).await
    }

    /// Activate a quick-reply button from a bot message.
    pub async fn press_button(&self, button: &Button) -> Result<Routed> {
        let payload = match button.action() {
            ButtonAction::Link(url) => return Ok(Routed::Link(url.to_string())),
            ButtonAction::Dispatch(payload) => payload.to_string(),
        };

        let title_turn = Message::user(button.title.as_str());
        let (epoch, request_id, token) = {
            let mut inner = self.lock();
            let token = inner
                .state
                .token()
                .map(str::to_string)
                .ok_or(ChatError::NotAuthenticated)?;

            // Same payload as the immediately preceding dispatch, that
            // dispatch has been answered, and its title is already on screen.
            let repeat_of = inner
                .last_dispatch
                .as_ref()
                .filter(|d| d.payload.as_deref() == Some(payload.as_str()))
                .map(|d| d.request_id)
                .filter(|id| *id <= inner.last_satisfied)
                .filter(|_| inner.transcript.contains_text(&button.title));
            inner.transcript.append(title_turn.clone());
            if let Some(previous) = repeat_of {
                tracing::debug!(
                    payload = %payload,
                    previous_request = previous,
                    "Suppressing repeat button dispatch"
                );
                return Ok(Routed::Suppressed);
            }

            let request_id = inner.begin_dispatch(Some(&payload));
            (inner.epoch, request_id, token)
        };
        let in_flight = InFlight {
            router: self,
            epoch,
        };
        self.persist(title_turn, &token);

        Ok(self.dispatch(in_flight, request_id, &payload, &token).await)
    }

    /// Empty the transcript and delete the server-side copy. Does not log
    /// out.
    pub async fn clear_chat(&self) {
        let token = {
            let mut inner = self.lock();
            inner.transcript.clear();
            inner.last_dispatch = None;
            inner.state.token().map(str::to_string)
        };
        if let Some(token) = token {
            self.flush_persistence().await;
            if let Err(e) = self
                .services
                .history
                .clear(self.session.user_id(), &token)
                .await
            {
                tracing::warn!(error = %e, "Failed to delete server transcript");
            }
        }
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let theme = self.session.theme().toggled();
        self.session.set_theme(theme)?;
        tracing::debug!(theme = %theme, "Theme changed");
        Ok(theme)
    }

    /// Wait for every outstanding history append to finish.
    pub async fn flush_persistence(&self) {
        let handles: Vec<JoinHandle<()>> = {
            let mut pending = self
                .persistence
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            pending.drain(..).collect()
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "History append task failed");
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn auth_step(&self) -> AuthStep {
        self.lock().state.step()
    }

    pub fn profile(&self) -> Option<Profile> {
        self.lock().state.profile().cloned()
    }

    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }

    pub fn theme(&self) -> Theme {
        self.session.theme()
    }

    pub fn transcript(&self) -> Vec<Message> {
        self.lock().transcript.messages().to_vec()
    }

    pub fn transcript_len(&self) -> usize {
        self.lock().transcript.len()
    }

    pub fn input_hint(&self) -> &'static str {
        self.lock().state.input_hint()
    }

    /// True while an NLU reply is outstanding for the current session.
    pub fn is_typing(&self) -> bool {
        self.lock().nlu_in_flight > 0
    }

    /// Id of the most recent dispatch whose reply has been applied.
    pub fn last_satisfied_request(&self) -> u64 {
        self.lock().last_satisfied
    }

    /// Completions for partial input. Only offered while authenticated.
    pub fn suggestions(&self, partial: &str) -> Vec<String> {
        let inner = self.lock();
        if !inner.state.is_authenticated() {
            return Vec::new();
        }
        inner.suggestions.suggest(partial)
    }

    // =========================================================================
    // Authentication steps
    // =========================================================================

    async fn submit_auth(&self, raw: &str, value: &str) -> Result<Routed> {
        let snapshot = {
            let mut inner = self.lock();
            if inner.auth_pending {
                return Err(ChatError::AuthInFlight);
            }
            if inner.state.is_authenticated() {
                None
            } else {
                inner.auth_pending = true;
                inner.transcript.append(Message::user(raw));
                Some((inner.epoch, inner.state.clone()))
            }
        };
        let Some((epoch, state)) = snapshot else {
            // Logged in by a concurrent call since `submit` looked.
            return self.submit_query(raw, value).await;
        };
        let _pending = AuthPending { router: self };

        let outcome = match &state {
            AuthState::Phone => self.request_otp(value).await,
            AuthState::Otp { phone } => self.verify_otp(phone, value).await,
            AuthState::Name { phone } => self.register(value, phone).await,
            AuthState::Authenticated { .. } => return Ok(Routed::Stale),
        };

        match outcome {
            StepOutcome::Advance(next, prompt) => {
                let mut inner = self.lock();
                if inner.epoch != epoch || !inner.state.can_transition_to(next.step()) {
                    tracing::debug!("Discarding stale auth response");
                    return Ok(Routed::Stale);
                }
                tracing::debug!("Auth state: {} -> {}", inner.state, next);
                let step = next.step();
                inner.state = next;
                inner.transcript.append(prompt);
                Ok(Routed::Advanced(step))
            }
            StepOutcome::Authenticate { token, profile } => {
                Ok(self.finish_authentication(epoch, token, profile).await)
            }
            StepOutcome::Stay(error) => {
                let mut inner = self.lock();
                if inner.epoch != epoch {
                    return Ok(Routed::Stale);
                }
                inner.transcript.append(error);
                Ok(Routed::Retry(inner.state.step()))
            }
        }
    }

    async fn request_otp(&self, phone: &str) -> StepOutcome {
        match self.services.identity.request_otp(phone).await {
            Ok(()) => {
                tracing::info!("OTP requested");
                StepOutcome::Advance(
                    AuthState::Otp {
                        phone: phone.to_string(),
                    },
                    Message::bot("An OTP has been sent to your phone. Please enter it."),
                )
            }
            Err(e) => {
                log_step_failure("request OTP", &e);
                StepOutcome::Stay(Message::bot(format!(
                    "Failed to send OTP: {}. Please try again.",
                    e.user_message()
                )))
            }
        }
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> StepOutcome {
        let verification = match self.services.identity.verify_otp(phone, otp).await {
            Ok(v) => v,
            Err(e) => {
                log_step_failure("verify OTP", &e);
                return StepOutcome::Stay(Message::bot(format!(
                    "Error verifying OTP: {}. Please try again.",
                    e.user_message()
                )));
            }
        };

        let name_prompt = || {
            StepOutcome::Advance(
                AuthState::Name {
                    phone: phone.to_string(),
                },
                Message::bot("OTP verified! Please enter your name."),
            )
        };

        let name = match verification.name {
            Some(name) if verification.existing_user => name,
            _ => return name_prompt(),
        };

        // Existing user: re-register under this client's id to get a token.
        match self.register(&name, phone).await {
            StepOutcome::Stay(error) => StepOutcome::Advance(
                AuthState::Name {
                    phone: phone.to_string(),
                },
                error,
            ),
            outcome => outcome,
        }
    }

    async fn register(&self, name: &str, phone: &str) -> StepOutcome {
        match self
            .services
            .identity
            .register_user(self.session.user_id(), name, phone)
            .await
        {
            Ok(registration) => StepOutcome::Authenticate {
                token: registration.token,
                profile: Profile {
                    name: name.to_string(),
                    phone_number: phone.to_string(),
                },
            },
            Err(e) => {
                log_step_failure("register user", &e);
                StepOutcome::Stay(Message::bot(format!(
                    "Error saving user: {}. Please try again.",
                    e.user_message()
                )))
            }
        }
    }

    /// Load history with the new token, then enter `Authenticated` and
    /// append the history followed by the welcome message in one step, so
    /// no query can land ahead of them.
    async fn finish_authentication(&self, epoch: u64, token: String, profile: Profile) -> Routed {
        if self.lock().epoch != epoch {
            return Routed::Stale;
        }

        let user_id = self.session.user_id();
        let history = match self.services.history.load(user_id, &token).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to load chat history");
                Vec::new()
            }
        };

        {
            let mut inner = self.lock();
            if inner.epoch != epoch || !inner.state.can_transition_to(AuthStep::Authenticated) {
                return Routed::Stale;
            }
            tracing::debug!("Auth state: {} -> authenticated", inner.state);
            inner.state = AuthState::Authenticated {
                token: token.clone(),
                profile: profile.clone(),
            };
            for message in history.iter().filter(|m| m.is_user) {
                inner.suggestions.record_utterance(&message.text.to_plain());
            }
            let loaded = history.len();
            inner.transcript.extend(history);
            inner.transcript.append(Message::bot(format!(
                "Welcome, {}! How can I assist you today?",
                profile.name
            )));
            tracing::info!(user_id = %user_id, history = loaded, "Session authenticated");
        }

        if let Err(e) = self.session.set_token(&token) {
            tracing::warn!(error = %e, "Failed to store session token");
        }
        Routed::Advanced(AuthStep::Authenticated)
    }

    async fn logout(&self) -> Routed {
        let token = {
            let mut inner = self.lock();
            let token = inner.state.token().map(str::to_string);
            inner.reset(Message::bot(format!(
                "You have been logged out. {}",
                self.greeting()
            )));
            token
        };
        if let Err(e) = self.session.clear_token() {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
        tracing::info!(user_id = %self.session.user_id(), "Logged out");

        if let Some(token) = token {
            self.flush_persistence().await;
            if let Err(e) = self
                .services
                .history
                .clear(self.session.user_id(), &token)
                .await
            {
                tracing::warn!(error = %e, "Failed to delete server transcript on logout");
            }
        }
        Routed::LoggedOut
    }

    // =========================================================================
    // NLU dispatch
    // =========================================================================

    async fn submit_query(&self, raw: &str, trimmed: &str) -> Result<Routed> {
        let user_turn = Message::user(raw);
        let (epoch, request_id, token) = {
            let mut inner = self.lock();
            let token = inner
                .state
                .token()
                .map(str::to_string)
                .ok_or(ChatError::NotAuthenticated)?;
            inner.transcript.append(user_turn.clone());
            inner.suggestions.record_utterance(trimmed);
            let request_id = inner.begin_dispatch(None);
            (inner.epoch, request_id, token)
        };
        let in_flight = InFlight {
            router: self,
            epoch,
        };
        self.persist(user_turn, &token);

        let text = self.services.normalizer.normalize(trimmed).await;
        Ok(self.dispatch(in_flight, request_id, &text, &token).await)
    }

    /// Send `text` to the NLU backend and apply the reply.
    async fn dispatch(
        &self,
        in_flight: InFlight<'_>,
        request_id: u64,
        text: &str,
        token: &str,
    ) -> Routed {
        let epoch = in_flight.epoch;
        let result = self.services.nlu.ask(self.session.user_id(), text).await;
        drop(in_flight);

        let reply = {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                tracing::debug!(request_id, "Discarding stale NLU reply");
                return Routed::Stale;
            }
            match result {
                Ok(reply) => {
                    let message = Message::from_reply(reply);
                    inner.transcript.append(message.clone());
                    inner.last_satisfied = inner.last_satisfied.max(request_id);
                    message
                }
                Err(e) => {
                    tracing::warn!(request_id, error = %e, "NLU request failed");
                    inner.transcript.append(Message::bot(
                        "Error communicating with the chatbot. Please try again later.",
                    ));
                    return Routed::AnswerFailed;
                }
            }
        };
        self.persist(reply, token);
        Routed::Answered
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn greeting(&self) -> String {
        format!(
            "Hello! Welcome to the {}. Please provide your phone number to begin.",
            self.assistant_name
        )
    }

    /// Fire-and-forget append to the server transcript.
    fn persist(&self, message: Message, token: &str) {
        let history = Arc::clone(&self.services.history);
        let user_id = self.session.user_id().to_string();
        let token = token.to_string();
        let handle = tokio::spawn(async move {
            if let Err(e) = history.append(&user_id, &message, &token).await {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to persist message");
            }
        });

        let mut pending = self
            .persistence
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_step_failure(step: &str, error: &ClientError) {
    tracing::warn!(step, class = %error.class(), error = %error, "Auth step failed");
}
