//! Error types for the nexslice provisioner

use thiserror::Error;

/// Main error type for provisioning operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// The addressed cluster object does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Cluster connection settings could not be resolved
    #[error("kube config error: {0}")]
    Config(String),

    /// Invalid identifier or input
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Local artifact storage error
    #[error("storage error: {0}")]
    Storage(String),

    /// SMF notification failure
    #[error("smf notification error: {0}")]
    Smf(String),
}

impl Error {
    /// Create a not-found error for the named object
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a config error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    /// Create a storage error with the given message
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an SMF notification error with the given message
    pub fn smf(msg: impl Into<String>) -> Self {
        Self::Smf(msg.into())
    }

    /// Whether this error means the target object was already absent
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound(_) => true,
            Error::Kube(kube::Error::Api(ae)) => ae.code == 404,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Story Tests: how failures are classified by the lifecycle steps
    // ==========================================================================

    /// Story: deleting something that is already gone is not a failure
    ///
    /// Decommission treats absent objects as success, so both the explicit
    /// variant and a raw 404 from the API server must classify as not-found.
    #[test]
    fn story_absent_objects_classify_as_not_found() {
        assert!(Error::not_found("pod ueransim-ue3").is_not_found());

        let api_404 = Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "pods \"ueransim-ue3\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        }));
        assert!(api_404.is_not_found());
    }

    /// Story: every other failure stays a real failure
    #[test]
    fn story_other_failures_are_not_swallowed() {
        let conflict = Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "deployments.apps \"upf-ue5\" already exists".to_string(),
            reason: "AlreadyExists".to_string(),
            code: 409,
        }));
        assert!(!conflict.is_not_found());
        assert!(!Error::smf("connection refused").is_not_found());
        assert!(!Error::storage("permission denied").is_not_found());
        assert!(!Error::config("no kubeconfig found").is_not_found());
    }

    #[test]
    fn error_messages_carry_their_category() {
        assert_eq!(
            Error::validation("ue_id must be positive").to_string(),
            "validation error: ue_id must be positive"
        );
        assert_eq!(
            Error::config("failed to infer kube config: no kubeconfig").to_string(),
            "kube config error: failed to infer kube config: no kubeconfig"
        );
        assert!(Error::smf("timed out")
            .to_string()
            .starts_with("smf notification error"));

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        match Error::from(json_err) {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("expected Serialization, got {other:?}"),
        }
    }
}
