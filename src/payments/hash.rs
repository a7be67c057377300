//! Keyed hash construction shared by the redirect form and the bank callback
//!
//! Two mutually incompatible schemes exist on the bank side:
//!
//! * `ver3`: every field except `hash`, `encoding` and `countdown`, sorted by
//!   name (A to Z, case-insensitive), values escaped and joined with `|`, the
//!   store key appended after a final `|`, SHA-512, Base64.
//! * `sha1`: a fixed positional concatenation followed by the store key,
//!   SHA-1, Base64. Callbacks echo the concatenation of a fixed field list in
//!   `HASHPARAMSVAL`; the list itself is never taken from the request.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha512};

/// Fields never included in a `ver3` hash
pub const IGNORED_FIELDS: [&str; 3] = ["hash", "encoding", "countdown"];

/// Request fields hashed by the legacy scheme, in hashing order
pub const LEGACY_REQUEST_FIELDS: [&str; 8] = [
    "clientid",
    "oid",
    "amount",
    "okUrl",
    "failUrl",
    "islemtipi",
    "taksit",
    "rnd",
];

/// Callback fields covered by the legacy hash, in `HASHPARAMS` order
pub const LEGACY_CALLBACK_FIELDS: [&str; 10] = [
    "clientid",
    "oid",
    "AuthCode",
    "ProcReturnCode",
    "Response",
    "mdStatus",
    "cavv",
    "eci",
    "md",
    "rnd",
];

pub const HASH_FIELD: &str = "HASH";
pub const HASH_PARAMS_FIELD: &str = "HASHPARAMS";
pub const HASH_PARAMS_VALUE_FIELD: &str = "HASHPARAMSVAL";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HashScheme {
    /// Alphabetical, pipe-joined SHA-512
    #[default]
    Ver3,
    /// Positional SHA-1
    Sha1,
}

impl HashScheme {
    /// Value posted as `hashAlgorithm`, if the scheme announces itself
    pub fn algorithm_name(&self) -> Option<&'static str> {
        match self {
            HashScheme::Ver3 => Some("ver3"),
            HashScheme::Sha1 => None,
        }
    }

    /// Hash for the outgoing redirect form.
    ///
    /// `fields` is every form field except `hash` itself.
    pub fn request_hash<K, V>(&self, fields: &[(K, V)], store_key: &str) -> String
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            HashScheme::Ver3 => ver3_hash(fields, store_key),
            HashScheme::Sha1 => {
                let mut plain: String = LEGACY_REQUEST_FIELDS
                    .iter()
                    .map(|name| field_value(fields, name).unwrap_or(""))
                    .collect();
                plain.push_str(store_key);
                sha1_base64(&plain)
            }
        }
    }

    /// Expected hash for an incoming callback.
    ///
    /// Returns `None` when the legacy hash descriptors are missing or do not
    /// agree with the posted values; such a callback can never verify.
    pub fn callback_hash<K, V>(&self, fields: &[(K, V)], store_key: &str) -> Option<String>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match self {
            HashScheme::Ver3 => Some(ver3_hash(fields, store_key)),
            HashScheme::Sha1 => legacy_callback_hash(fields, store_key),
        }
    }

    /// Check the callback's `HASH` field against the recomputed value
    pub fn verify_callback<K, V>(&self, fields: &[(K, V)], store_key: &str) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let Some(provided) = field_value(fields, HASH_FIELD) else {
            return false;
        };
        match self.callback_hash(fields, store_key) {
            Some(expected) => constant_time_eq(expected.as_bytes(), provided.as_bytes()),
            None => false,
        }
    }
}

/// Escape `\` and `|` so a value cannot forge a field boundary
pub fn escape_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('|', "\\|")
}

/// Plaintext fed to SHA-512 by the `ver3` scheme
pub fn ver3_plaintext<K, V>(fields: &[(K, V)], store_key: &str) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut included: Vec<(&str, &str)> = fields
        .iter()
        .map(|(k, v)| (k.as_ref(), v.as_ref()))
        .filter(|(k, _)| {
            !IGNORED_FIELDS
                .iter()
                .any(|ignored| k.eq_ignore_ascii_case(ignored))
        })
        .collect();

    included.sort_by(|(a, _), (b, _)| {
        a.to_ascii_lowercase()
            .cmp(&b.to_ascii_lowercase())
            .then_with(|| a.cmp(b))
    });

    let mut parts: Vec<String> = included.iter().map(|(_, v)| escape_value(v)).collect();
    parts.push(escape_value(store_key));
    parts.join("|")
}

pub fn ver3_hash<K, V>(fields: &[(K, V)], store_key: &str) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let digest = Sha512::digest(ver3_plaintext(fields, store_key).as_bytes());
    STANDARD.encode(digest)
}

fn legacy_callback_hash<K, V>(fields: &[(K, V)], store_key: &str) -> Option<String>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let echoed = field_value(fields, HASH_PARAMS_VALUE_FIELD)?;

    // A posted field list other than ours would move trusted fields out of the hash
    if let Some(names) = field_value(fields, HASH_PARAMS_FIELD) {
        let posted = names.split(':').filter(|name| !name.is_empty());
        if !posted.eq(LEGACY_CALLBACK_FIELDS.iter().copied()) {
            return None;
        }
    }

    let concatenated: String = LEGACY_CALLBACK_FIELDS
        .iter()
        .map(|name| field_value(fields, name).unwrap_or(""))
        .collect();

    if concatenated != echoed {
        return None;
    }

    Some(sha1_base64(&format!("{}{}", echoed, store_key)))
}

fn sha1_base64(plain: &str) -> String {
    STANDARD.encode(Sha1::digest(plain.as_bytes()))
}

fn field_value<'a, K, V>(fields: &'a [(K, V)], name: &str) -> Option<&'a str>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fields
        .iter()
        .find(|(k, _)| k.as_ref() == name)
        .map(|(_, v)| v.as_ref())
}

/// Length-checked constant-time byte comparison
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE_KEY: &str = "SKEY0000";
    const RETURN_URL: &str = "https://shop.example/payment/callback?order=1001";

    fn reference_request() -> Vec<(&'static str, &'static str)> {
        vec![
            ("clientid", "12345"),
            ("amount", "100.00"),
            ("currency", "807"),
            ("failUrl", RETURN_URL),
            ("hashAlgorithm", "ver3"),
            ("islemtipi", "Auth"),
            ("oid", "1001"),
            ("okUrl", RETURN_URL),
            ("refreshtime", "10"),
            ("rnd", "abc123"),
            ("storetype", "3D_PAY_HOSTING"),
        ]
    }

    #[test]
    fn test_ver3_reference_vector() {
        let fields = reference_request();
        assert_eq!(
            ver3_plaintext(&fields, STORE_KEY),
            format!(
                "100.00|12345|807|{url}|ver3|Auth|1001|{url}|10|abc123|3D_PAY_HOSTING|SKEY0000",
                url = RETURN_URL
            )
        );
        assert_eq!(
            HashScheme::Ver3.request_hash(&fields, STORE_KEY),
            "EoAOHzzVRvmKGXxoAH0DA7tOaFHWI6R34PoJbidMRQUQGCigfTb0+7gzIJwxVn8CJ9ggh+iENCfSSSFLQznyYw=="
        );
    }

    #[test]
    fn test_ver3_ignores_input_order() {
        let fields = reference_request();
        let mut reversed = fields.clone();
        reversed.reverse();
        assert_eq!(
            ver3_hash(&fields, STORE_KEY),
            ver3_hash(&reversed, STORE_KEY)
        );
    }

    #[test]
    fn test_ver3_is_sensitive_to_field_names() {
        let fields = reference_request();
        // Same values under swapped names sort differently
        let mut swapped = fields.clone();
        swapped[0] = ("clientid", "100.00");
        swapped[1] = ("amount", "12345");
        assert_ne!(ver3_hash(&fields, STORE_KEY), ver3_hash(&swapped, STORE_KEY));
    }

    #[test]
    fn test_ver3_skips_ignored_fields_case_insensitively() {
        let fields = reference_request();
        let mut with_extras = fields.clone();
        with_extras.push(("HASH", "whatever"));
        with_extras.push(("encoding", "UTF-8"));
        with_extras.push(("countdown", "5"));
        assert_eq!(
            ver3_hash(&fields, STORE_KEY),
            ver3_hash(&with_extras, STORE_KEY)
        );
    }

    #[test]
    fn test_escaping_prevents_boundary_forgery() {
        let joined = vec![("a", "x|y")];
        let split = vec![("a", "x"), ("b", "y")];
        assert_ne!(ver3_hash(&joined, STORE_KEY), ver3_hash(&split, STORE_KEY));
        assert_eq!(escape_value(r"a\b|c"), r"a\\b\|c");
    }

    #[test]
    fn test_legacy_request_vector() {
        let mut fields = reference_request();
        fields.push(("taksit", ""));
        assert_eq!(
            HashScheme::Sha1.request_hash(&fields, STORE_KEY),
            "S81t7F60r5LZe0xsNmsyIy1/8dY="
        );
    }

    #[test]
    fn test_legacy_request_is_positional() {
        let fields = vec![("clientid", "1"), ("oid", "2")];
        let swapped = vec![("clientid", "2"), ("oid", "1")];
        assert_ne!(
            HashScheme::Sha1.request_hash(&fields, STORE_KEY),
            HashScheme::Sha1.request_hash(&swapped, STORE_KEY)
        );
    }

    fn legacy_callback() -> Vec<(String, String)> {
        [
            ("clientid", "12345"),
            ("oid", "1001"),
            ("AuthCode", "P1"),
            ("ProcReturnCode", "00"),
            ("Response", "Approved"),
            ("mdStatus", "1"),
            ("rnd", "abc123"),
            (
                "HASHPARAMS",
                "clientid:oid:AuthCode:ProcReturnCode:Response:mdStatus:cavv:eci:md:rnd:",
            ),
            ("HASHPARAMSVAL", "123451001P100Approved1abc123"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn set(fields: &mut [(String, String)], name: &str, value: &str) {
        if let Some(field) = fields.iter_mut().find(|(k, _)| k == name) {
            field.1 = value.to_string();
        }
    }

    #[test]
    fn test_legacy_callback_round_trip() {
        let mut fields = legacy_callback();
        let hash = HashScheme::Sha1
            .callback_hash(&fields, STORE_KEY)
            .expect("descriptors are consistent");
        fields.push((HASH_FIELD.to_string(), hash));
        assert!(HashScheme::Sha1.verify_callback(&fields, STORE_KEY));
    }

    #[test]
    fn test_legacy_callback_rejects_tampered_value() {
        let mut fields = legacy_callback();
        let hash = HashScheme::Sha1
            .callback_hash(&fields, STORE_KEY)
            .expect("descriptors are consistent");
        fields.push((HASH_FIELD.to_string(), hash));
        fields[1].1 = "1002".to_string();
        assert!(!HashScheme::Sha1.verify_callback(&fields, STORE_KEY));
    }

    #[test]
    fn test_legacy_callback_rejects_rewritten_field_list() {
        let mut declined: Vec<(String, String)> = [
            ("clientid", "12345"),
            ("oid", "1001"),
            ("ProcReturnCode", "05"),
            ("Response", "Declined"),
            ("mdStatus", "0"),
            (
                "HASHPARAMS",
                "clientid:oid:AuthCode:ProcReturnCode:Response:mdStatus:cavv:eci:md:rnd:",
            ),
            ("HASHPARAMSVAL", "12345100105Declined0"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let hash = HashScheme::Sha1
            .callback_hash(&declined, STORE_KEY)
            .expect("descriptors are consistent");
        declined.push((HASH_FIELD.to_string(), hash));
        assert!(HashScheme::Sha1.verify_callback(&declined, STORE_KEY));

        // Park the signed string in an unrelated field and flip the outcome
        let mut forged = declined.clone();
        set(&mut forged, "HASHPARAMS", "zz:");
        set(&mut forged, "Response", "Approved");
        set(&mut forged, "mdStatus", "1");
        forged.push(("zz".to_string(), "12345100105Declined0".to_string()));
        assert!(!HashScheme::Sha1.verify_callback(&forged, STORE_KEY));

        // Dropping the list does not help either, the fixed one still applies
        forged.retain(|(k, _)| k != "HASHPARAMS");
        assert!(!HashScheme::Sha1.verify_callback(&forged, STORE_KEY));

        // Reordering the genuine names is refused outright
        let mut reordered = declined.clone();
        set(
            &mut reordered,
            "HASHPARAMS",
            "mdStatus:Response:ProcReturnCode:AuthCode:oid:clientid:cavv:eci:md:rnd:",
        );
        assert_eq!(HashScheme::Sha1.callback_hash(&reordered, STORE_KEY), None);
    }

    #[test]
    fn test_legacy_callback_without_descriptors_never_verifies() {
        let fields = vec![("oid", "1001"), ("HASH", "abc")];
        assert_eq!(HashScheme::Sha1.callback_hash(&fields, STORE_KEY), None);
        assert!(!HashScheme::Sha1.verify_callback(&fields, STORE_KEY));
    }

    #[test]
    fn test_ver3_callback_round_trip_and_tamper() {
        let mut fields: Vec<(String, String)> = reference_request()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let hash = HashScheme::Ver3
            .callback_hash(&fields, STORE_KEY)
            .expect("ver3 always hashes");
        fields.push((HASH_FIELD.to_string(), hash));
        assert!(HashScheme::Ver3.verify_callback(&fields, STORE_KEY));
        assert!(!HashScheme::Ver3.verify_callback(&fields, "OTHERKEY"));

        for index in 0..fields.len() - 1 {
            let mut tampered = fields.clone();
            tampered[index].1.push('0');
            assert!(
                !HashScheme::Ver3.verify_callback(&tampered, STORE_KEY),
                "altering {} must fail verification",
                tampered[index].0
            );
        }
    }

    #[test]
    fn test_missing_hash_field_fails() {
        let fields = reference_request();
        assert!(!HashScheme::Ver3.verify_callback(&fields, STORE_KEY));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
