//! Typed access to directory entries
//!
//! Wraps the library's search entry in a small accessor interface so the
//! rest of the crate never pokes at attribute maps directly, and decodes
//! the unique-identifier attribute, which directories deliver in three
//! shapes: a 16-byte binary GUID, plain text, or arbitrary bytes.

use ldap3::SearchEntry;
use std::collections::HashMap;
use uuid::Uuid;

/// A directory entry with string and binary attribute maps.
///
/// Mirrors `ldap3::SearchEntry`: values that decode as UTF-8 land in
/// `attrs`, everything else in `bin_attrs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirEntry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
    pub bin_attrs: HashMap<String, Vec<Vec<u8>>>,
}

impl From<SearchEntry> for DirEntry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
            bin_attrs: entry.bin_attrs,
        }
    }
}

impl DirEntry {
    /// First value of a textual attribute.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.attrs
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of a textual attribute; empty slice when absent.
    pub fn multi(&self, name: &str) -> &[String] {
        self.attrs.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First value of an attribute as raw bytes. Binary values take
    /// precedence; textual values are returned as their UTF-8 bytes.
    pub fn raw(&self, name: &str) -> Option<&[u8]> {
        if let Some(v) = self.bin_attrs.get(name).and_then(|v| v.first()) {
            return Some(v.as_slice());
        }
        self.attrs
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_bytes)
    }

    /// Decoded unique identifier for the configured attribute, or `None`
    /// when the attribute is absent or decodes to an empty string.
    pub fn unique_id(&self, attr: &str) -> Option<String> {
        self.raw(attr).and_then(decode_unique_id)
    }
}

/// Decode a unique-identifier attribute value.
///
/// A 16-byte value is an Active Directory style GUID: the first three
/// fields are little-endian on the wire, the final eight bytes are in
/// order. Anything else is tried as text first and falls back to hex.
/// Empty input and blank text both mean "absent".
pub fn decode_unique_id(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }

    if bytes.len() == 16 {
        let d1 = u32::from_le_bytes(bytes[0..4].try_into().ok()?);
        let d2 = u16::from_le_bytes(bytes[4..6].try_into().ok()?);
        let d3 = u16::from_le_bytes(bytes[6..8].try_into().ok()?);
        let d4: [u8; 8] = bytes[8..16].try_into().ok()?;
        return Some(Uuid::from_fields(d1, d2, d3, &d4).to_string());
    }

    match std::str::from_utf8(bytes) {
        Ok(s) => {
            let s = s.trim().to_lowercase();
            if s.is_empty() {
                None
            } else {
                Some(s)
            }
        }
        Err(_) => Some(hex::encode(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_with(attrs: &[(&str, &[&str])]) -> DirEntry {
        DirEntry {
            dn: "uid=test,dc=example,dc=com".to_string(),
            attrs: attrs
                .iter()
                .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
                .collect(),
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn test_scalar_and_multi() {
        let entry = entry_with(&[("mail", &["a@x.com", "b@x.com"]), ("cn", &["Alice"])]);
        assert_eq!(entry.scalar("mail"), Some("a@x.com"));
        assert_eq!(entry.scalar("missing"), None);
        assert_eq!(entry.multi("mail").len(), 2);
        assert!(entry.multi("missing").is_empty());
    }

    #[test]
    fn test_guid_mixed_endian_decode() {
        // objectGUID wire bytes for 01020304-0506-0708-090a-0b0c0d0e0f10:
        // first three fields little-endian, trailing eight bytes in order.
        let bytes: [u8; 16] = [
            0x04, 0x03, 0x02, 0x01, 0x06, 0x05, 0x08, 0x07, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ];
        assert_eq!(
            decode_unique_id(&bytes),
            Some("01020304-0506-0708-090a-0b0c0d0e0f10".to_string())
        );
    }

    #[test]
    fn test_textual_id_lowercased_and_trimmed() {
        assert_eq!(
            decode_unique_id(b"  ABC-123-Def  "),
            Some("abc-123-def".to_string())
        );
        // 36-byte textual entryUUID passes through the UTF-8 path
        assert_eq!(
            decode_unique_id(b"9A1B2C3D-0000-1111-2222-333344445555"),
            Some("9a1b2c3d-0000-1111-2222-333344445555".to_string())
        );
    }

    #[test]
    fn test_non_utf8_falls_back_to_hex() {
        assert_eq!(
            decode_unique_id(&[0xff, 0xfe, 0x01]),
            Some("fffe01".to_string())
        );
    }

    #[test]
    fn test_empty_and_blank_are_absent() {
        assert_eq!(decode_unique_id(b""), None);
        assert_eq!(decode_unique_id(b"   "), None);
    }

    #[test]
    fn test_binary_attr_takes_precedence() {
        let mut entry = entry_with(&[("objectGUID", &["textual"])]);
        entry
            .bin_attrs
            .insert("objectGUID".to_string(), vec![vec![0xff, 0x00]]);
        assert_eq!(entry.unique_id("objectGUID"), Some("ff00".to_string()));
    }
}
