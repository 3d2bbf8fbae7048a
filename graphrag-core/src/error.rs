//! The closed reason-code taxonomy for the pipeline.

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced anywhere in the query-processing pipeline.
///
/// Every variant maps 1:1 to a reason code in the closed taxonomy; see
/// [`Error::reason_code`]. New variants must not be added without also
/// extending [`ReasonCode`] — the set is closed by design.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("guardrail blocked the request: {0}")]
    GuardrailBlocked(String),

    #[error("planning failed: {0}")]
    PlanFailed(String),

    #[error("LLM did not produce a valid structured response after retries: {0}")]
    LlmStructuredFailure(String),

    #[error("LLM call was rate limited")]
    LlmRateLimited,

    #[error("template is missing required parameter: {0}")]
    TemplateParamMissing(String),

    #[error("query contains a write/mutation keyword: {0}")]
    ValidationWriteBanned(String),

    #[error("query references a label not in the allow-list: {0}")]
    ValidationUnknownLabel(String),

    #[error("query references a relationship type not in the allow-list: {0}")]
    ValidationUnknownRel(String),

    #[error("query contains an unparameterised literal")]
    ValidationUnparameterised,

    #[error("variable-length path exceeds the traversal depth cap: {0}")]
    ValidationDepthExceeded(String),

    #[error("query is missing a LIMIT clause, or its LIMIT exceeds the cap")]
    ValidationLimitMissing,

    #[error("parameter ${0} is referenced but has no binding")]
    ValidationParamUnbound(String),

    #[error("query execution exceeded its timeout")]
    QueryTimeout,

    #[error("write attempted in read-only mode")]
    WriteBlocked,

    #[error("an upstream dependency is unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("citation could not be verified against retrieved chunks")]
    CitationUnverified,

    #[error("schema is unavailable; admin refresh cannot proceed: {0}")]
    SchemaUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A fieldless mirror of [`Error`]'s variants, serialised as the exact
/// closed-set strings used in audit records and the (out-of-scope) HTTP
/// surface's error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    GuardrailBlocked,
    PlanFailed,
    LlmStructuredFailure,
    LlmRateLimited,
    TemplateParamMissing,
    ValidationWriteBanned,
    ValidationUnknownLabel,
    ValidationUnknownRel,
    ValidationUnparameterised,
    ValidationDepthExceeded,
    ValidationLimitMissing,
    ValidationParamUnbound,
    QueryTimeout,
    WriteBlocked,
    UpstreamUnavailable,
    CitationUnverified,
    SchemaUnavailable,
    Internal,
}

/// A status the (out-of-scope) HTTP layer would map a [`ReasonCode`] to.
/// Named `StatusLike` rather than reusing a real HTTP-status type, since the
/// HTTP surface itself is an external collaborator this crate never talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLike {
    BadRequest,
    Blocked,
    RateLimited,
    Timeout,
    UpstreamUnavailable,
    Internal,
}

impl Error {
    /// The closed reason code this error corresponds to.
    #[must_use]
    pub fn reason_code(&self) -> ReasonCode {
        match self {
            Error::GuardrailBlocked(_) => ReasonCode::GuardrailBlocked,
            Error::PlanFailed(_) => ReasonCode::PlanFailed,
            Error::LlmStructuredFailure(_) => ReasonCode::LlmStructuredFailure,
            Error::LlmRateLimited => ReasonCode::LlmRateLimited,
            Error::TemplateParamMissing(_) => ReasonCode::TemplateParamMissing,
            Error::ValidationWriteBanned(_) => ReasonCode::ValidationWriteBanned,
            Error::ValidationUnknownLabel(_) => ReasonCode::ValidationUnknownLabel,
            Error::ValidationUnknownRel(_) => ReasonCode::ValidationUnknownRel,
            Error::ValidationUnparameterised => ReasonCode::ValidationUnparameterised,
            Error::ValidationDepthExceeded(_) => ReasonCode::ValidationDepthExceeded,
            Error::ValidationLimitMissing => ReasonCode::ValidationLimitMissing,
            Error::ValidationParamUnbound(_) => ReasonCode::ValidationParamUnbound,
            Error::QueryTimeout => ReasonCode::QueryTimeout,
            Error::WriteBlocked => ReasonCode::WriteBlocked,
            Error::UpstreamUnavailable(_) => ReasonCode::UpstreamUnavailable,
            Error::CitationUnverified => ReasonCode::CitationUnverified,
            Error::SchemaUnavailable(_) => ReasonCode::SchemaUnavailable,
            Error::Serialization(_) | Error::Io(_) => ReasonCode::Internal,
        }
    }

    /// The status the (absent) HTTP layer would surface per §7 of the spec.
    #[must_use]
    pub fn http_status(&self) -> StatusLike {
        match self.reason_code() {
            ReasonCode::GuardrailBlocked => StatusLike::Blocked,
            ReasonCode::ValidationWriteBanned
            | ReasonCode::ValidationUnknownLabel
            | ReasonCode::ValidationUnknownRel
            | ReasonCode::ValidationUnparameterised
            | ReasonCode::ValidationDepthExceeded
            | ReasonCode::ValidationLimitMissing
            | ReasonCode::ValidationParamUnbound
            | ReasonCode::TemplateParamMissing
            | ReasonCode::PlanFailed => StatusLike::BadRequest,
            ReasonCode::LlmRateLimited => StatusLike::RateLimited,
            ReasonCode::QueryTimeout => StatusLike::Timeout,
            ReasonCode::UpstreamUnavailable | ReasonCode::SchemaUnavailable => {
                StatusLike::UpstreamUnavailable
            }
            ReasonCode::LlmStructuredFailure => StatusLike::BadRequest,
            ReasonCode::WriteBlocked | ReasonCode::CitationUnverified | ReasonCode::Internal => {
                StatusLike::Internal
            }
        }
    }

    /// Whether this error must fail the request closed (security-relevant)
    /// or may be absorbed fail-open by the caller. Mirrors the §7
    /// fail-closed/fail-open split; auxiliaries such as the rate limiter and
    /// audit sink construct their own fail-open fallback values instead of
    /// ever raising these variants for recoverable conditions.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::LlmRateLimited | Error::CitationUnverified | Error::UpstreamUnavailable(_)
        )
    }

    /// Whether this error reflects a transient upstream-boundary failure a
    /// [`crate::resilience::CircuitBreaker`] should count towards tripping
    /// open, as opposed to a validation-shaped rejection that has nothing to
    /// do with backend health.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UpstreamUnavailable(_) | Error::QueryTimeout | Error::SchemaUnavailable(_)
        )
    }
}
