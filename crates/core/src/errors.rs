use thiserror::Error;

use crate::dialogue::engine::DialogueError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid value for slot '{field}': {reason}")]
    InvalidSlotValue { field: String, reason: String },
    #[error(transparent)]
    Dialogue(#[from] DialogueError),
    #[error("unknown language '{value}'")]
    UnknownLanguage { value: String },
    #[error("unknown dialogue step '{value}'")]
    UnknownStep { value: String },
    #[error("unknown call intent '{value}'")]
    UnknownIntent { value: String },
    #[error("unknown reservation status '{value}'")]
    UnknownStatus { value: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("slot analyzer unavailable: {0}")]
    ExtractionUnavailable(String),
    #[error("slot analyzer returned malformed output: {0}")]
    ExtractionMalformed(String),
    #[error("session store failure: {0}")]
    SessionStoreUnavailable(String),
    #[error("reservation store failure: {0}")]
    ReservationStoreUnavailable(String),
    #[error("caller not understood after {0} attempts")]
    RetryExhausted(u8),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        match value {
            ApplicationError::Domain(_) => Self::BadRequest {
                message: "domain validation failed".to_owned(),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::RetryExhausted(attempts) => Self::BadRequest {
                message: format!("caller not understood after {attempts} attempts"),
                correlation_id: "unassigned".to_owned(),
            },
            ApplicationError::ExtractionUnavailable(message)
            | ApplicationError::ExtractionMalformed(message)
            | ApplicationError::SessionStoreUnavailable(message)
            | ApplicationError::ReservationStoreUnavailable(message) => {
                Self::ServiceUnavailable { message, correlation_id: "unassigned".to_owned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: "unassigned".to_owned() }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface = ApplicationError::from(DomainError::InvalidSlotValue {
            field: "party_size".to_owned(),
            reason: "not a number".to_owned(),
        })
        .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
    }

    #[test]
    fn bad_request_has_user_safe_message() {
        let interface = ApplicationError::from(DomainError::UnknownLanguage {
            value: "tlh".to_owned(),
        })
        .into_interface("req-2");

        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn store_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::SessionStoreUnavailable("database lock timeout".to_owned())
            .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(
            interface.user_message(),
            "The service is temporarily unavailable. Please retry shortly."
        );
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface =
            ApplicationError::Configuration("missing analyzer key".to_owned()).into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }
}
