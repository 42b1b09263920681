use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            format!("{}", Error::Validation("duplicate task id: a".to_string())),
            "Validation error: duplicate task id: a"
        );
        assert_eq!(
            format!(
                "{}",
                Error::Computation("layering did not converge".to_string())
            ),
            "Computation error: layering did not converge"
        );
    }

    #[test]
    fn test_error_from_json() {
        let bad: std::result::Result<i32, _> = serde_json::from_str("not json");
        let err: Error = bad.unwrap_err().into();
        assert!(matches!(err, Error::Json(_)));
    }
}
