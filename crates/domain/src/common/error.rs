use thiserror::Error;

/// Error taxonomy for one interaction with the appliance management API.
///
/// Propagation scoping: a `resource_list` failure aborts the whole
/// collection cycle; `Auth` stops polling entirely; everything else is
/// scoped to the resource it occurred on and recorded in the snapshot's
/// status map instead of being raised further.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Network-level failure, including request timeouts.
    #[error("transport error: {0}")]
    Transport(String),

    /// Credentials rejected by the appliance. Fatal for polling.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Resource disappeared between enumeration and detail fetch.
    #[error("resource {resource_id} not found")]
    NotFound { resource_id: u64 },

    /// Response shape or enum value outside the declared domain.
    /// Carries the offending raw value for diagnosis.
    #[error("schema violation in {field}: unexpected value {value:?}")]
    Schema { field: String, value: String },
}

impl ApiError {
    pub fn schema(field: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self::Schema {
            field: field.into(),
            value: value.to_string(),
        }
    }

    /// Fatal errors stop the poll scheduler instead of only degrading
    /// the current cycle.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_is_fatal() {
        assert!(ApiError::Auth("bad key".to_string()).is_fatal());
    }

    #[test]
    fn transport_is_not_fatal() {
        assert!(!ApiError::Transport("connection refused".to_string()).is_fatal());
        assert!(!ApiError::NotFound { resource_id: 7 }.is_fatal());
        assert!(!ApiError::schema("color", 1).is_fatal());
    }

    #[test]
    fn schema_keeps_raw_value() {
        let e = ApiError::schema("anomaly.color", 1);
        assert!(e.to_string().contains("anomaly.color"));
        assert!(e.to_string().contains('1'));
    }
}
