use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
	#[error("Duplicate {kind} key: {key}")]
	DuplicateKey { kind: &'static str, key: String },
	#[error("{kind} not found: {id}")]
	NotFound { kind: &'static str, id: String },
	#[error("Invalid reference: edge {source_id} -> {target_id} names a missing node")]
	InvalidReference { source_id: String, target_id: String },
	#[error("Validation failed: {0}")]
	Validation(String),
	#[error("Invariant violated: {0}")]
	InvariantViolation(String),
	#[error("Config error: {0}")]
	Config(#[from] serde_json::Error),
}

impl CatalogError {
	pub fn code(&self) -> &str {
		match self {
			Self::DuplicateKey { .. } => "CATALOG_DUPLICATE_KEY",
			Self::NotFound { .. } => "CATALOG_NOT_FOUND",
			Self::InvalidReference { .. } => "CATALOG_INVALID_REFERENCE",
			Self::Validation(_) => "CATALOG_VALIDATION",
			Self::InvariantViolation(_) => "CATALOG_INVARIANT_VIOLATION",
			Self::Config(_) => "CATALOG_CONFIG",
		}
	}

	pub fn to_json_error(&self) -> serde_json::Value {
		serde_json::json!({
			"catalogCode": self.code(),
			"message": self.to_string(),
		})
	}
}

pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codes_are_stable() {
		let err = CatalogError::DuplicateKey {
			kind: "book",
			key: "978".into(),
		};
		assert_eq!(err.code(), "CATALOG_DUPLICATE_KEY");
		assert_eq!(err.to_string(), "Duplicate book key: 978");

		let err = CatalogError::NotFound {
			kind: "user",
			id: "u1".into(),
		};
		assert_eq!(err.code(), "CATALOG_NOT_FOUND");
		assert_eq!(err.to_string(), "user not found: u1");
	}

	#[test]
	fn json_error_carries_code_and_message() {
		let err = CatalogError::Validation("email must contain '@'".into());
		let json = err.to_json_error();
		assert_eq!(json["catalogCode"], "CATALOG_VALIDATION");
		assert_eq!(json["message"], "Validation failed: email must contain '@'");
	}
}
