use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::HashMap;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_HEADER: &str = "X-Twilio-Signature";

fn signing_payload(url: &str, params: &HashMap<String, String>) -> String {
    let mut sorted_params: Vec<(&String, &String)> = params.iter().collect();
    sorted_params.sort_by(|a, b| a.0.cmp(b.0));

    let mut data = url.to_string();
    for (key, value) in sorted_params {
        data.push_str(key);
        data.push_str(value);
    }
    data
}

/// Signature Twilio computes for a form POST to `url`.
pub fn compute_signature(auth_token: &str, url: &str, params: &HashMap<String, String>) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes()).ok()?;
    mac.update(signing_payload(url, params).as_bytes());
    Some(BASE64.encode(mac.finalize().into_bytes()))
}

pub fn validate_webhook_signature(
    auth_token: &str,
    signature: &str,
    url: &str,
    params: &HashMap<String, String>,
) -> bool {
    let Ok(expected) = BASE64.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(auth_token.as_bytes()) else {
        return false;
    };
    mac.update(signing_payload(url, params).as_bytes());
    mac.verify_slice(&expected).is_ok()
}
