//! WASM bindings for the QRIS merchant display
//!
//! JavaScript API for the display and setup pages: codec operations,
//! config persistence in localStorage and QR rendering/decoding.

use qris_core::{MerchantConfig, QrisDisplay, QrisError, ServiceFeeConfig, CONFIG_KEY};
use wasm_bindgen::prelude::*;

/// Panic hook and console logger for debugging in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Debug).ok();
    log::info!("QRIS display WASM module initialized");
}

fn into_js(e: QrisError) -> JsError {
    JsError::new(&e.to_string())
}

/// Display/setup flows bound to one merchant config.
#[wasm_bindgen]
pub struct QrisApp {
    display: QrisDisplay,
}

#[wasm_bindgen]
impl QrisApp {
    /// Creates the app from the config stored in localStorage, falling
    /// back to the built-in default.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        let stored = read_storage(CONFIG_KEY);
        let config = MerchantConfig::load(stored.as_deref());
        Self {
            display: QrisDisplay::new(config),
        }
    }

    /// Creates the app from an explicit config JSON string.
    #[wasm_bindgen(js_name = fromConfig)]
    pub fn from_config(config_json: &str) -> Self {
        Self {
            display: QrisDisplay::new(MerchantConfig::load(Some(config_json))),
        }
    }

    /// Merchant name shown in the page header.
    #[wasm_bindgen(js_name = merchantName)]
    pub fn merchant_name(&self) -> String {
        self.display.merchant_name()
    }

    /// Canonical static payload for the at-rest code.
    #[wasm_bindgen(js_name = staticPayload)]
    pub fn static_payload(&self) -> String {
        self.display.static_payload()
    }

    /// PNG bytes of the static code (280 px, margin 2, black on white,
    /// error correction H).
    #[wasm_bindgen(js_name = renderStaticPng)]
    pub fn render_static_png(&self) -> Result<Vec<u8>, JsError> {
        self.display.render_static().map_err(into_js)
    }

    /// Fee breakdown `{amount, serviceFee, total}` for an entered amount.
    pub fn quote(&self, amount: u64) -> Result<JsValue, JsError> {
        let breakdown = self.display.quote(amount).map_err(into_js)?;
        serde_wasm_bindgen::to_value(&breakdown).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Query string for the dynamic-QRIS service, with the service fee
    /// already folded into the nominal.
    #[wasm_bindgen(js_name = dynamicQuery)]
    pub fn dynamic_query(&self, amount: u64) -> Result<String, JsError> {
        self.display.dynamic_query(amount).map_err(into_js)
    }

    /// Reads a dynamic-service response into `{payload, merchant}`. On
    /// error the page keeps showing the last static payload.
    #[wasm_bindgen(js_name = acceptDynamicResponse)]
    pub fn accept_dynamic_response(&self, response_json: &str) -> Result<JsValue, JsError> {
        let dynamic = self.display.accept_dynamic(response_json).map_err(into_js)?;
        serde_wasm_bindgen::to_value(&dynamic).map_err(|e| JsError::new(&e.to_string()))
    }

    /// Current config as a JSON string.
    #[wasm_bindgen(js_name = configJson)]
    pub fn config_json(&self) -> Result<String, JsError> {
        self.display
            .config()
            .to_json()
            .map_err(|e| JsError::new(&e.to_string()))
    }
}

impl Default for QrisApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrites any payload into its canonical static form.
#[wasm_bindgen(js_name = toStatic)]
pub fn to_static(payload: &str) -> String {
    qris_core::to_static(payload)
}

/// CRC16 of a string, formatted the way tag 63 carries it.
#[wasm_bindgen]
pub fn crc16(text: &str) -> String {
    qris_core::crc::crc16(text)
}

/// Merchant name from tag 59, or null.
#[wasm_bindgen(js_name = merchantNameOf)]
pub fn merchant_name_of(payload: &str) -> Option<String> {
    qris_core::merchant_name(payload).ok().map(str::to_string)
}

/// Structured view of a payload (CRC-validated first).
#[wasm_bindgen(js_name = parsePayload)]
pub fn parse_payload(payload: &str) -> Result<JsValue, JsError> {
    let data = qris_core::QrisData::parse(payload).map_err(|e| JsError::new(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&data).map_err(|e| JsError::new(&e.to_string()))
}

/// Decodes a QR from encoded image bytes (PNG, JPEG).
#[wasm_bindgen(js_name = decodeImage)]
pub fn decode_image(bytes: &[u8]) -> Result<String, JsError> {
    qris_core::decode::decode_bytes(bytes).map_err(|e| JsError::new(&e.to_string()))
}

/// Decodes a QR from canvas RGBA data.
#[wasm_bindgen(js_name = decodeRgba)]
pub fn decode_rgba(data: &[u8], width: u32, height: u32) -> Result<String, JsError> {
    qris_core::decode::decode_rgba(data, width, height).map_err(|e| JsError::new(&e.to_string()))
}

/// Loads the stored config (or the default) as a JS object.
#[wasm_bindgen(js_name = loadConfig)]
pub fn load_config() -> Result<JsValue, JsError> {
    let stored = read_storage(CONFIG_KEY);
    let config = MerchantConfig::load(stored.as_deref());
    serde_wasm_bindgen::to_value(&config).map_err(|e| JsError::new(&e.to_string()))
}

/// Validates setup-form input, persists the canonical config and returns
/// it as a JS object.
#[wasm_bindgen(js_name = saveConfig)]
pub fn save_config(
    raw_qris: &str,
    min_transaction: u64,
    fee_min_amount: u64,
    fee_percentage: f64,
) -> Result<JsValue, JsError> {
    let config = MerchantConfig::from_submitted(
        raw_qris,
        min_transaction,
        ServiceFeeConfig {
            min_amount: fee_min_amount,
            percentage: fee_percentage,
        },
    )
    .map_err(|e| JsError::new(&e.to_string()))?;

    let json = config.to_json().map_err(|e| JsError::new(&e.to_string()))?;
    write_storage(CONFIG_KEY, &json)?;

    serde_wasm_bindgen::to_value(&config).map_err(|e| JsError::new(&e.to_string()))
}

fn read_storage(key: &str) -> Option<String> {
    let storage = web_sys::window()?.local_storage().ok()??;
    storage.get_item(key).ok()?
}

fn write_storage(key: &str, value: &str) -> Result<(), JsError> {
    let storage = web_sys::window()
        .and_then(|w| w.local_storage().ok().flatten())
        .ok_or_else(|| JsError::new("localStorage unavailable"))?;
    storage
        .set_item(key, value)
        .map_err(|_| JsError::new("failed to persist config"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_crc16_known_vector() {
        assert_eq!(crc16("123456789"), "29B1");
    }

    #[wasm_bindgen_test]
    fn test_to_static_strips_amount() {
        let rebuilt = to_static("0002010102125405100005913TEST MERCHANT6304ABCD");
        assert!(rebuilt.contains("010211"));
        assert_eq!(merchant_name_of(&rebuilt).as_deref(), Some("TEST MERCHANT"));
    }

    #[wasm_bindgen_test]
    fn test_app_from_default_config() {
        let app = QrisApp::new();
        assert!(!app.merchant_name().is_empty());
        assert!(app.static_payload().ends_with(&crc16_suffix(&app.static_payload())));
    }

    fn crc16_suffix(payload: &str) -> String {
        crc16(&payload[..payload.len() - 4])
    }
}
