use crate::error::ValidationError;

/// Builds the certificate verification path for a free-text identifier.
/// The identifier's shape is not checked beyond being non-empty.
pub fn verification_path(certificate_id: &str) -> Result<String, ValidationError> {
    let id = certificate_id.trim();
    if id.is_empty() {
        return Err(ValidationError::EmptyCertificateId);
    }
    Ok(format!("/verify/{}", urlencoding::encode(id)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_identifier_maps_to_verify_path() {
        assert_eq!(verification_path("LRN-2026-0042").unwrap(), "/verify/LRN-2026-0042");
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        assert_eq!(verification_path("  abc123 \n").unwrap(), "/verify/abc123");
    }

    #[test]
    fn blank_identifier_is_rejected() {
        assert_eq!(verification_path(""), Err(ValidationError::EmptyCertificateId));
        assert_eq!(verification_path("   "), Err(ValidationError::EmptyCertificateId));
    }

    #[test]
    fn identifier_stays_a_single_path_segment() {
        assert_eq!(verification_path("a/b c").unwrap(), "/verify/a%2Fb%20c");
        assert_eq!(verification_path("../admin").unwrap(), "/verify/..%2Fadmin");
    }
}
