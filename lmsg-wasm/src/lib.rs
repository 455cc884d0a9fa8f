//! lmsg WASM Bindings
//!
//! WebAssembly bindings for the lmsg crypto library.
//! Byte arguments arrive as `Uint8Array`; structured results are returned as
//! JSON strings with hex-encoded byte fields.

use lmsg_crypto::{self, Envelope, RangeProofConfig, StegoError};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in the browser
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Convert StegoError to JsValue
fn to_js_error(err: StegoError) -> JsValue {
    JsValue::from_str(&format!("{}", err))
}

/// Copy a byte argument into a fixed-size array
fn fixed<const N: usize>(bytes: &[u8], what: &str) -> Result<[u8; N], JsValue> {
    bytes
        .try_into()
        .map_err(|_| JsValue::from_str(&format!("{} must be {} bytes, got {}", what, N, bytes.len())))
}

// ============================================================================
// Range Proof Operations
// ============================================================================

/// Build a range proof carrying a message
///
/// # Arguments
///
/// * `commitment` - Output value commitment (33 bytes)
/// * `generator` - Output asset generator (33 bytes)
/// * `nonce` - Shared nonce (32 bytes, see `sharedNonce`)
/// * `value` - Proven value (amount - 1)
/// * `blind` - Output value blinding factor (32 bytes)
/// * `extra_commit` - Output script bound into the proof
/// * `asset_id` - Asset id (32 bytes)
/// * `asset_blinder` - Asset blinding factor (32 bytes)
/// * `message` - Printable ASCII message, empty for none
///
/// # Returns
///
/// Proof as a Uint8Array (4174 bytes)
#[wasm_bindgen(js_name = encodeRangeProof)]
#[allow(clippy::too_many_arguments)]
pub fn encode_range_proof(
    commitment: &[u8],
    generator: &[u8],
    nonce: &[u8],
    value: u64,
    blind: &[u8],
    extra_commit: &[u8],
    asset_id: &[u8],
    asset_blinder: &[u8],
    message: &str,
) -> Result<Vec<u8>, JsValue> {
    let config = RangeProofConfig {
        commitment: fixed(commitment, "commitment")?,
        generator: fixed(generator, "generator")?,
        nonce: fixed(nonce, "nonce")?,
        value,
        value_blind: fixed(blind, "blind")?,
        extra_commit: extra_commit.to_vec(),
        asset_id: fixed(asset_id, "asset id")?,
        asset_blinder: fixed(asset_blinder, "asset blinder")?,
        message: message.to_owned(),
    };

    lmsg_crypto::encode(&config).map_err(to_js_error)
}

/// Read value and message from a proof
///
/// # Returns
///
/// JSON object with { value, amount, message }
#[wasm_bindgen(js_name = decodeRangeProof)]
pub fn decode_range_proof(
    proof: &[u8],
    nonce: &[u8],
    commitment: &[u8],
    generator: &[u8],
) -> Result<String, JsValue> {
    let nonce = fixed(nonce, "nonce")?;
    let result = lmsg_crypto::decode(proof, &nonce, commitment, generator).map_err(to_js_error)?;

    let json = serde_json::json!({
        "value": result.value,
        "amount": result.amount(),
        "message": result.message,
    });

    Ok(json.to_string())
}

/// Verify a proof against its output
///
/// # Returns
///
/// `true` if the rings close, `false` if they do not. Malformed input throws.
#[wasm_bindgen(js_name = verifyRangeProof)]
pub fn verify_range_proof(
    proof: &[u8],
    commitment: &[u8],
    generator: &[u8],
    extra_commit: &[u8],
) -> Result<bool, JsValue> {
    match lmsg_crypto::verify(proof, commitment, generator, extra_commit) {
        Ok(()) => Ok(true),
        Err(StegoError::RingConsistency { .. }) => Ok(false),
        Err(err) => Err(to_js_error(err)),
    }
}

/// Rewind a proof
///
/// # Returns
///
/// JSON object with { value, blind, asset_id, asset_blinder, message }
#[wasm_bindgen(js_name = rewindRangeProof)]
pub fn rewind_range_proof(
    proof: &[u8],
    nonce: &[u8],
    commitment: &[u8],
    generator: &[u8],
    extra_commit: &[u8],
) -> Result<String, JsValue> {
    let nonce = fixed(nonce, "nonce")?;
    let result = lmsg_crypto::rewind(proof, &nonce, commitment, generator, extra_commit)
        .map_err(to_js_error)?;

    serde_json::to_string(&result).map_err(|e| JsValue::from_str(&format!("JSON encoding failed: {}", e)))
}

/// Replace the message in an existing proof
///
/// # Returns
///
/// New proof as a Uint8Array, valid for the same output
#[wasm_bindgen(js_name = reembedMessage)]
pub fn reembed_message(
    proof: &[u8],
    nonce: &[u8],
    commitment: &[u8],
    generator: &[u8],
    extra_commit: &[u8],
    message: &str,
) -> Result<Vec<u8>, JsValue> {
    let nonce = fixed(nonce, "nonce")?;
    let commitment = fixed(commitment, "commitment")?;
    let generator = fixed(generator, "generator")?;

    lmsg_crypto::reembed(proof, &nonce, &commitment, &generator, extra_commit, message)
        .map_err(to_js_error)
}

// ============================================================================
// Nonce and Commitment Operations
// ============================================================================

/// Derive the shared rewind nonce
///
/// # Arguments
///
/// * `nonce_commitment` - Other side's public key (33 or 65 bytes)
/// * `blinding_key` - Our secret key (32 bytes)
///
/// # Returns
///
/// Nonce as a Uint8Array (32 bytes)
#[wasm_bindgen(js_name = sharedNonce)]
pub fn shared_nonce(nonce_commitment: &[u8], blinding_key: &[u8]) -> Result<Vec<u8>, JsValue> {
    let key = fixed(blinding_key, "blinding key")?;
    lmsg_crypto::shared_nonce(nonce_commitment, &key)
        .map(|nonce| nonce.to_vec())
        .map_err(to_js_error)
}

/// Create a value commitment `blind*G + value*generator`
///
/// # Returns
///
/// Commitment as a Uint8Array (33 bytes, `0x08`/`0x09` prefix)
#[wasm_bindgen(js_name = pedersenCommit)]
pub fn pedersen_commit(value: u64, blind: &[u8], generator: &[u8]) -> Result<Vec<u8>, JsValue> {
    let blind = fixed(blind, "blind")?;
    let generator = lmsg_crypto::point::load_point(generator).map_err(to_js_error)?;

    lmsg_crypto::pedersen_commit(value, &blind, &generator)
        .map(|commitment| commitment.to_vec())
        .map_err(to_js_error)
}

// ============================================================================
// Envelope Operations
// ============================================================================

/// Wrap text as `lm:<salt>:<body>`
///
/// The salt travels in the clear; this is framing, not encryption.
#[wasm_bindgen(js_name = sealEnvelope)]
pub fn seal_envelope(text: &str, salt: &[u8]) -> String {
    Envelope::seal(text, salt).to_string()
}

/// Open an `lm:<salt>:<body>` frame
#[wasm_bindgen(js_name = openEnvelope)]
pub fn open_envelope(frame: &str) -> Result<String, JsValue> {
    Envelope::parse(frame).map(|e| e.open()).map_err(to_js_error)
}
