//! Raster data-URL decoding.

use crate::error::AppError;
use base64::{
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

/// Standard alphabet; trailing `=` padding is optional, as browsers' `atob` allows.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode the base64 payload of a `data:<mime>;base64,<payload>` URL.
///
/// Everything before the first `,` is ignored. ASCII whitespace inside the
/// payload is tolerated and padding may be omitted, as browsers do.
///
/// # Errors
/// Returns [`AppError::Decode`] when there is no `,` separator or the
/// payload is not valid base64.
pub fn decode_payload(data_url: &str) -> Result<Vec<u8>, AppError> {
    let (_, payload) = data_url
        .split_once(',')
        .ok_or_else(|| AppError::Decode("data URL has no ',' separator".to_string()))?;
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(PAYLOAD_ENGINE.decode(compact)?)
}
