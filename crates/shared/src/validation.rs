//! Common validation utilities.

use validator::ValidationError;

/// Longest group or user name accepted.
pub const MAX_NAME_LENGTH: usize = 100;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a display name: not blank after trimming, at most
/// [`MAX_NAME_LENGTH`] characters.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("name_blank");
        err.message = Some("Name must not be empty".into());
        return Err(err);
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        let mut err = ValidationError::new("name_length");
        err.message = Some(format!("Name must be at most {} characters", MAX_NAME_LENGTH).into());
        return Err(err);
    }
    Ok(())
}

/// Longest image reference accepted on a study session.
pub const MAX_IMAGE_REFERENCE_LENGTH: usize = 2048;

/// Validates an image reference: not blank after trimming, at most
/// [`MAX_IMAGE_REFERENCE_LENGTH`] characters.
pub fn validate_image_reference(image: &str) -> Result<(), ValidationError> {
    if image.trim().is_empty() {
        let mut err = ValidationError::new("image_blank");
        err.message = Some("Image reference must not be empty".into());
        return Err(err);
    }
    if image.chars().count() > MAX_IMAGE_REFERENCE_LENGTH {
        let mut err = ValidationError::new("image_length");
        err.message = Some(
            format!(
                "Image reference must be at most {} characters",
                MAX_IMAGE_REFERENCE_LENGTH
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

/// Normalizes an email for lookups: trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
