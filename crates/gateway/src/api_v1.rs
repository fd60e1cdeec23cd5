//! HTTP API v1.
//!
//! Endpoints:
//!
//! - `POST /v1/flows/chat`: one simulated-doctor reply
//! - `POST /v1/flows/summarize`: consultation summary
//! - `POST /v1/flows/transcribe`: audio data URI → transcript
//! - `POST /v1/flows/follow-ups`: follow-up suggestions
//! - `POST /v1/flows/recommend`: specialty recommendation
//! - `POST /v1/accounts/signup`: create an account
//! - `POST /v1/accounts/login`: returns a bearer token
//! - `POST /v1/accounts/logout`: revoke the bearer token
//! - `GET  /v1/accounts/me`: the signed-in account
//! - `POST /v1/prescriptions`: issue (doctors)
//! - `GET  /v1/prescriptions`: own prescriptions (patients)
//! - `POST /v1/intake`: validate a consultation intake form
//! - `GET  /v1/testimonials`: list testimonials
//! - `POST /v1/testimonials`: submit a testimonial
//! - `GET  /v1/directory`: departments, doctors, specialties
//!
//! Errors are JSON `{ "error": .., "field": .. }`: 400 for invalid input,
//! 401/403 for auth, 409 for a taken email, 500 for storage failures.

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use curalink_config::{DirectoryConfig, DoctorEntry};
use curalink_core::{Clock, KeyValueStore, ValidationError};
use curalink_flows::{
    ChatWithDoctorInput, ChatWithDoctorOutput, FlowSet, FollowUpSuggestionsInput,
    FollowUpSuggestionsOutput, RecommendSpecialtyInput, RecommendSpecialtyOutput,
    SummarizeConsultationInput, SummarizeConsultationOutput, TranscribeConsultationInput,
    TranscribeConsultationOutput,
};
use curalink_session::{ConsultationIntake, IntakeForm};
use curalink_store::{
    AccountError, AccountService, CurrentUser, LoginRequest, PrescriptionDraft,
    PrescriptionService, SignupRequest, StoredPrescription, Testimonial, TestimonialDraft,
    TestimonialService,
};

// ── State ─────────────────────────────────────────────────────────────────

/// Maximum number of live bearer tokens before the oldest is revoked.
const MAX_SESSIONS: usize = 1_000;

/// Shared state for the v1 API.
pub struct ApiState {
    pub flows: Arc<FlowSet>,
    pub accounts: AccountService,
    pub prescriptions: PrescriptionService,
    pub testimonials: TestimonialService,
    pub directory: DirectoryConfig,
    pub clock: Arc<dyn Clock>,
    /// Bearer token → signed-in account, oldest first.
    sessions: RwLock<Vec<(String, CurrentUser)>>,
}

pub type SharedApiState = Arc<ApiState>;

impl ApiState {
    pub fn new(
        flows: Arc<FlowSet>,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        directory: DirectoryConfig,
    ) -> Self {
        Self {
            flows,
            accounts: AccountService::new(store.clone()),
            prescriptions: PrescriptionService::new(store.clone(), clock.clone()),
            testimonials: TestimonialService::new(store, clock.clone()),
            directory,
            clock,
            sessions: RwLock::new(Vec::new()),
        }
    }

    pub(crate) async fn open_session(&self, user: CurrentUser) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        let mut sessions = self.sessions.write().await;
        if sessions.len() >= MAX_SESSIONS {
            sessions.remove(0);
        }
        sessions.push((token.clone(), user));
        token
    }

    async fn session_user(&self, token: &str) -> Option<CurrentUser> {
        self.sessions
            .read()
            .await
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, user)| user.clone())
    }

    /// Whether `token` belongs to a live session.
    pub(crate) async fn has_session(&self, token: &str) -> bool {
        self.sessions.read().await.iter().any(|(t, _)| t == token)
    }

    async fn close_session(&self, token: &str) {
        self.sessions.write().await.retain(|(t, _)| t != token);
    }
}

// ── Router ────────────────────────────────────────────────────────────────

/// Build the v1 API router. Nest this under "/v1" in the main router.
pub fn v1_router(state: SharedApiState) -> Router {
    Router::new()
        .route("/flows/chat", post(chat_handler))
        .route("/flows/summarize", post(summarize_handler))
        .route("/flows/transcribe", post(transcribe_handler))
        .route("/flows/follow-ups", post(follow_ups_handler))
        .route("/flows/recommend", post(recommend_handler))
        .route("/accounts/signup", post(signup_handler))
        .route("/accounts/login", post(login_handler))
        .route("/accounts/logout", post(logout_handler))
        .route("/accounts/me", get(me_handler))
        .route(
            "/prescriptions",
            get(list_prescriptions_handler).post(issue_prescription_handler),
        )
        .route("/intake", post(intake_handler))
        .route(
            "/testimonials",
            get(list_testimonials_handler).post(submit_testimonial_handler),
        )
        .route("/directory", get(directory_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Unauthorized(String),
    Forbidden(String),
    Conflict { field: String, message: String },
    TooLarge,
    Storage,
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        match e {
            AccountError::Validation(v) => Self::Validation(v),
            AccountError::EmailTaken => Self::Conflict {
                field: "email".into(),
                message: e.to_string(),
            },
            AccountError::InvalidCredentials | AccountError::NotSignedIn => {
                Self::Unauthorized(e.to_string())
            }
            AccountError::Forbidden { .. } => Self::Forbidden(e.to_string()),
            AccountError::Storage(_) | AccountError::Hashing(_) => {
                error!(error = %e, "Request failed in the store");
                Self::Storage
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, field) = match self {
            Self::Validation(v) => (StatusCode::BAD_REQUEST, v.message, Some(v.field)),
            Self::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m, None),
            Self::Forbidden(m) => (StatusCode::FORBIDDEN, m, None),
            Self::Conflict { field, message } => (StatusCode::CONFLICT, message, Some(field)),
            Self::TooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "Request body is too large.".to_string(),
                None,
            ),
            Self::Storage => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage error".to_string(),
                None,
            ),
        };
        (status, Json(ErrorResponse { error, field })).into_response()
    }
}

// ── Extractors ────────────────────────────────────────────────────────────

/// JSON body whose rejections use the API error shape.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                Err(ApiError::TooLarge)
            }
            Err(rejection) => Err(ApiError::Validation(ValidationError::new(
                "(root)",
                rejection.body_text(),
            ))),
        }
    }
}

/// The account behind a `Authorization: Bearer <token>` header.
pub struct Authenticated {
    pub token: String,
    pub user: CurrentUser,
}

impl FromRequestParts<SharedApiState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedApiState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::to_string)
            .ok_or_else(|| ApiError::from(AccountError::NotSignedIn))?;

        match state.session_user(&token).await {
            Some(user) => Ok(Self { token, user }),
            None => Err(AccountError::NotSignedIn.into()),
        }
    }
}

// ── Flows ─────────────────────────────────────────────────────────────────

async fn chat_handler(
    State(state): State<SharedApiState>,
    ApiJson(input): ApiJson<ChatWithDoctorInput>,
) -> Result<Json<ChatWithDoctorOutput>, ApiError> {
    Ok(Json(state.flows.chat.run(input).await?))
}

async fn summarize_handler(
    State(state): State<SharedApiState>,
    ApiJson(input): ApiJson<SummarizeConsultationInput>,
) -> Result<Json<SummarizeConsultationOutput>, ApiError> {
    Ok(Json(state.flows.summarize.run(input).await?))
}

async fn transcribe_handler(
    State(state): State<SharedApiState>,
    ApiJson(input): ApiJson<TranscribeConsultationInput>,
) -> Result<Json<TranscribeConsultationOutput>, ApiError> {
    Ok(Json(state.flows.transcribe.run(input).await?))
}

async fn follow_ups_handler(
    State(state): State<SharedApiState>,
    ApiJson(input): ApiJson<FollowUpSuggestionsInput>,
) -> Result<Json<FollowUpSuggestionsOutput>, ApiError> {
    Ok(Json(state.flows.follow_ups.run(input).await?))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest {
    symptoms: String,
    /// Defaults to the directory's departments.
    #[serde(default)]
    available_specialties: Option<Vec<String>>,
}

async fn recommend_handler(
    State(state): State<SharedApiState>,
    ApiJson(request): ApiJson<RecommendRequest>,
) -> Result<Json<RecommendSpecialtyOutput>, ApiError> {
    let input = RecommendSpecialtyInput {
        symptoms: request.symptoms,
        available_specialties: request
            .available_specialties
            .unwrap_or_else(|| state.directory.departments.clone()),
    };
    Ok(Json(state.flows.recommend.run(input).await?))
}

// ── Accounts ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: CurrentUser,
}

async fn signup_handler(
    State(state): State<SharedApiState>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<CurrentUser>), ApiError> {
    let user = state.accounts.signup(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login_handler(
    State(state): State<SharedApiState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state.accounts.authenticate(&request).await?;
    let token = state.open_session(user.clone()).await;
    info!(email = %user.email, role = %user.role, "Bearer session opened");
    Ok(Json(LoginResponse { token, user }))
}

async fn logout_handler(
    State(state): State<SharedApiState>,
    auth: Authenticated,
) -> StatusCode {
    state.close_session(&auth.token).await;
    StatusCode::NO_CONTENT
}

async fn me_handler(auth: Authenticated) -> Json<CurrentUser> {
    Json(auth.user)
}

// ── Prescriptions ─────────────────────────────────────────────────────────

async fn issue_prescription_handler(
    State(state): State<SharedApiState>,
    auth: Authenticated,
    ApiJson(draft): ApiJson<PrescriptionDraft>,
) -> Result<(StatusCode, Json<StoredPrescription>), ApiError> {
    let prescription = state.prescriptions.issue(&auth.user, draft).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

async fn list_prescriptions_handler(
    State(state): State<SharedApiState>,
    auth: Authenticated,
) -> Result<Json<Vec<StoredPrescription>>, ApiError> {
    Ok(Json(state.prescriptions.list_for(&auth.user).await?))
}

// ── Intake, testimonials, directory ───────────────────────────────────────

async fn intake_handler(
    State(state): State<SharedApiState>,
    ApiJson(form): ApiJson<IntakeForm>,
) -> Result<(StatusCode, Json<ConsultationIntake>), ApiError> {
    let today = state.clock.now().date_naive();
    let intake = form.submit(&state.directory.intake_specialties, today)?;
    info!(intake = %intake.id, specialty = %intake.medical_specialty, "Consultation intake accepted");
    Ok((StatusCode::CREATED, Json(intake)))
}

async fn list_testimonials_handler(
    State(state): State<SharedApiState>,
) -> Result<Json<Vec<Testimonial>>, ApiError> {
    Ok(Json(state.testimonials.list().await?))
}

async fn submit_testimonial_handler(
    State(state): State<SharedApiState>,
    ApiJson(draft): ApiJson<TestimonialDraft>,
) -> Result<(StatusCode, Json<Testimonial>), ApiError> {
    let testimonial = state.testimonials.submit(draft).await?;
    Ok((StatusCode::CREATED, Json(testimonial)))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryResponse {
    pub departments: Vec<String>,
    pub doctors: Vec<DoctorEntry>,
    pub intake_specialties: Vec<String>,
}

async fn directory_handler(State(state): State<SharedApiState>) -> Json<DirectoryResponse> {
    Json(DirectoryResponse {
        departments: state.directory.departments.clone(),
        doctors: state.directory.doctors.clone(),
        intake_specialties: state.directory.intake_specialties.clone(),
    })
}
