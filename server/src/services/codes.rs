//! Ticket code and scannable image generation.
//!
//! A ticket carries a printable code (`<random hex><first 5 chars of user id>`)
//! and a scannable payload (`<event id>-<user id>-<random hex>`) that is
//! rendered to an SVG data URL. Codes double as check-in tokens, so the random
//! part always comes from the operating system CSPRNG in production.
//!
//! Uniqueness is enforced by storage, not here.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use qrcode::render::svg;
use qrcode::QrCode;
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_CODE_LENGTH: usize = 16;
const USER_SUFFIX_LEN: usize = 5;
const QR_MIN_DIMENSION: u32 = 200;

#[derive(Debug, Error)]
pub enum CodeError {
    #[error("payload cannot be encoded: {0}")]
    Encode(String),
}

/// Source of random bytes for ticket codes.
pub trait EntropySource: Send + Sync {
    fn fill(&self, buf: &mut [u8]);
}

pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, buf: &mut [u8]) {
        OsRng.fill_bytes(buf);
    }
}

/// Renders a payload into an image reference (data URL or hosted URL).
pub trait QrEncoder: Send + Sync {
    fn encode(&self, payload: &str) -> Result<String, CodeError>;
}

pub struct SvgQrEncoder;

impl QrEncoder for SvgQrEncoder {
    fn encode(&self, payload: &str) -> Result<String, CodeError> {
        let code = QrCode::new(payload.as_bytes()).map_err(|e| CodeError::Encode(e.to_string()))?;
        let image = code
            .render::<svg::Color<'_>>()
            .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
            .build();
        Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(image)))
    }
}

/// Outcome of rendering the scannable image. `Pending` is not a failure:
/// the ticket is valid and the image can be regenerated later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannableImage {
    Rendered(String),
    Pending,
}

impl ScannableImage {
    pub fn into_option(self) -> Option<String> {
        match self {
            ScannableImage::Rendered(image) => Some(image),
            ScannableImage::Pending => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedCodes {
    pub ticket_code: String,
    pub qr_payload: String,
    pub qr_image: ScannableImage,
}

pub struct CodeGenerator {
    entropy: Arc<dyn EntropySource>,
    encoder: Arc<dyn QrEncoder>,
    code_length: usize,
}

impl CodeGenerator {
    pub fn new(
        entropy: Arc<dyn EntropySource>,
        encoder: Arc<dyn QrEncoder>,
        code_length: usize,
    ) -> Self {
        Self {
            entropy,
            encoder,
            code_length,
        }
    }

    /// OS randomness and SVG rendering.
    pub fn secure(code_length: usize) -> Self {
        Self::new(Arc::new(OsEntropy), Arc::new(SvgQrEncoder), code_length)
    }

    /// Lowercase hex string of exactly `length` characters.
    pub fn random_string(&self, length: usize) -> String {
        let mut bytes = vec![0u8; length.div_ceil(2)];
        self.entropy.fill(&mut bytes);
        let mut encoded = hex::encode(bytes);
        encoded.truncate(length);
        encoded
    }

    pub fn generate(&self, event_id: Uuid, user_id: Uuid) -> IssuedCodes {
        let random = self.random_string(self.code_length);
        let user_id = user_id.to_string();
        let suffix: String = user_id.chars().take(USER_SUFFIX_LEN).collect();

        let ticket_code = format!("{random}{suffix}");
        let qr_payload = format!("{event_id}-{user_id}-{random}");
        let qr_image = self.render(&qr_payload);

        IssuedCodes {
            ticket_code,
            qr_payload,
            qr_image,
        }
    }

    pub fn render(&self, payload: &str) -> ScannableImage {
        match self.encoder.encode(payload) {
            Ok(image) => ScannableImage::Rendered(image),
            Err(e) => {
                tracing::warn!(error = %e, "Scannable image rendering failed; image pending");
                ScannableImage::Pending
            }
        }
    }
}
