use base64::{engine::general_purpose, Engine as _};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("file is empty")]
    Empty,
    #[error("unsupported image type: {0}")]
    Unsupported(String),
    #[error("malformed data URI")]
    MalformedDataUri,
}

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

fn normalize_image_mime_type(mime_type: &str) -> String {
    let lowered = mime_type.trim().to_ascii_lowercase();
    match lowered.as_str() {
        "image/jpg" => "image/jpeg".to_string(),
        _ => lowered,
    }
}

fn supports_image_mime(mime_type: &str) -> bool {
    matches!(
        mime_type,
        "image/png" | "image/jpeg" | "image/webp" | "image/heic" | "image/heif"
    )
}

/// Base64 image payload as exchanged with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

impl InlineImage {
    pub fn new(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            mime_type: normalize_image_mime_type(&mime_type.into()),
            data: data.into(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::Empty);
        }
        let mime_type = detect_mime_type(bytes)
            .map(|value| normalize_image_mime_type(&value))
            .unwrap_or_else(|| "application/octet-stream".to_string());
        if !supports_image_mime(&mime_type) {
            return Err(MediaError::Unsupported(mime_type));
        }
        Ok(Self {
            mime_type,
            data: general_purpose::STANDARD.encode(bytes),
        })
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, MediaError> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or(MediaError::MalformedDataUri)?;
        let (mime_type, data) = rest
            .split_once(";base64,")
            .ok_or(MediaError::MalformedDataUri)?;
        if mime_type.is_empty() || data.is_empty() {
            return Err(MediaError::MalformedDataUri);
        }
        Ok(Self::new(mime_type, data))
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.data)
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "jpg",
        }
    }
}
