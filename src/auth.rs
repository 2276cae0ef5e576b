//! `Authorization` header checks.
//!
//! Only test-mode secret keys are accepted, either as a Bearer token or as
//! the username of Basic auth.

use base64::{engine::general_purpose::STANDARD, Engine};

/// Returns true if `header` carries an acceptable test secret key.
///
/// Accepted forms are `Bearer sk_test_<id>` and `Basic <base64 of
/// "sk_test_<id>[:password]">`. Anything with extra tokens is rejected.
pub fn validate_auth(header: &str) -> bool {
    let parts: Vec<&str> = header.split(' ').collect();
    let [scheme, credentials] = parts.as_slice() else {
        return false;
    };
    if credentials.is_empty() {
        return false;
    }

    let key = match *scheme {
        "Bearer" => credentials.to_string(),
        "Basic" => {
            let Ok(decoded) = STANDARD.decode(credentials) else {
                return false;
            };
            let Ok(decoded) = String::from_utf8(decoded) else {
                return false;
            };
            match decoded.split_once(':') {
                Some((username, _password)) => username.to_string(),
                None => decoded,
            }
        }
        _ => return false,
    };

    is_test_secret_key(&key)
}

/// `sk_test_<id>` with a non-empty id and no further underscores.
fn is_test_secret_key(key: &str) -> bool {
    matches!(
        key.split('_').collect::<Vec<_>>().as_slice(),
        ["sk", "test", id] if !id.is_empty()
    )
}
