use thiserror::Error;

/// Image extensions a camera may upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

/// Content type sent to storage when the client declares none
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn missing_part(field_name: &str) -> Self {
        Self {
            code: "MISSING_FILE",
            message: format!("No file found in field '{}'", field_name),
        }
    }
}

/// Checks the client-supplied filename hint and returns its lowercased extension.
///
/// Only the final path component is considered, so a hint like
/// `../../etc/passwd.jpg` is judged by `passwd.jpg`.
pub fn validate_image_filename(hint: Option<&str>) -> Result<String, ValidationError> {
    let hint = hint.map(str::trim).unwrap_or_default();
    if hint.is_empty() {
        return Err(ValidationError {
            code: "EMPTY_FILENAME",
            message: "File has no name".to_string(),
        });
    }

    // Client may send Windows paths
    let last_component = hint.rsplit(['/', '\\']).next().unwrap_or(hint);
    // Text after the last dot, so a bare `.jpg` still counts as a jpg
    let ext = last_component
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty());

    match ext {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => Ok(ext),
        Some(ext) => Err(ValidationError {
            code: "INVALID_EXTENSION",
            message: format!(
                "File type '.{}' is not allowed. Allowed: {}",
                ext,
                ALLOWED_EXTENSIONS.join(", ")
            ),
        }),
        None => Err(ValidationError {
            code: "INVALID_EXTENSION",
            message: format!(
                "File '{}' has no extension. Allowed: {}",
                last_component,
                ALLOWED_EXTENSIONS.join(", ")
            ),
        }),
    }
}

/// Normalizes the declared content type, falling back to JPEG.
pub fn normalize_content_type(declared: Option<&str>) -> String {
    declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase())
        .filter(|ct| ct.parse::<mime::Mime>().is_ok())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}
