//! Distinguished name canonicalization
//!
//! Group membership is matched by comparing DNs, and directories are free to
//! render the same DN with different case, incidental whitespace, or a
//! different ordering of multi-valued RDN components. Canonicalization
//! produces a comparison-stable string: types and values lowercased,
//! whitespace around separators stripped, and the pairs inside each RDN
//! sorted. RDN order across components is semantic and preserved.
//!
//! Escape sequences (`\2c`, `\+`, ...) are kept verbatim in the value; two
//! DNs only compare equal if they escape identically, which is the safe
//! direction for an allow-list match.

/// Canonicalize a DN for comparison. `None` marks an unparsable DN.
///
/// Callers must treat `None` as "invalid", never as a comparison key: an
/// invalid DN is not equal to anything, including another invalid DN.
pub fn canonicalize(dn: &str) -> Option<String> {
    let dn = dn.trim();
    // The empty DN is the root and canonicalizes to itself.
    if dn.is_empty() {
        return Some(String::new());
    }

    let mut rdns = Vec::new();
    for rdn in split_unescaped(dn, ',')? {
        let mut pairs = Vec::new();
        for part in split_unescaped(&rdn, '+')? {
            pairs.push(canonicalize_pair(&part)?);
        }
        pairs.sort();
        rdns.push(pairs.join("+"));
    }
    Some(rdns.join(","))
}

/// Split on a separator, honoring backslash escapes. A dangling trailing
/// backslash makes the whole DN invalid.
fn split_unescaped(input: &str, sep: char) -> Option<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;

    for c in input.chars() {
        if escaped {
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            current.push(c);
            escaped = true;
        } else if c == sep {
            parts.push(current);
            current = String::new();
        } else {
            current.push(c);
        }
    }

    if escaped {
        return None;
    }
    parts.push(current);
    Some(parts)
}

/// Normalize one `type=value` pair: lowercase both sides, trim whitespace
/// around the `=`.
fn canonicalize_pair(part: &str) -> Option<String> {
    let eq = find_unescaped_eq(part)?;
    let attr_type = part[..eq].trim().to_lowercase();
    let value = trim_end_unescaped(part[eq + 1..].trim_start()).to_lowercase();

    if attr_type.is_empty() {
        return None;
    }
    // Attribute types are descriptors (alphanumeric + hyphen) or OIDs.
    if !attr_type
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
    {
        return None;
    }

    Some(format!("{}={}", attr_type, value))
}

/// Trim trailing whitespace, leaving an escaped trailing space (`\ `) in
/// place since it is part of the value.
fn trim_end_unescaped(s: &str) -> &str {
    let bytes = s.as_bytes();
    let mut end = bytes.len();
    while end > 0 && (bytes[end - 1] == b' ' || bytes[end - 1] == b'\t') {
        let mut backslashes = 0;
        let mut i = end - 1;
        while i > 0 && bytes[i - 1] == b'\\' {
            backslashes += 1;
            i -= 1;
        }
        if backslashes % 2 == 1 {
            break;
        }
        end -= 1;
    }
    &s[..end]
}

fn find_unescaped_eq(part: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in part.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '=' {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace_normalized() {
        assert_eq!(
            canonicalize("CN=Alice , OU=People, DC=Example,DC=Com"),
            Some("cn=alice,ou=people,dc=example,dc=com".to_string())
        );
    }

    #[test]
    fn test_multivalued_rdn_order_invariance() {
        let a = canonicalize("email=a@x+cn=B,ou=U,dc=E,dc=C");
        let b = canonicalize("cn=b+email=a@x,OU=u,DC=e,DC=c");
        assert!(a.is_some());
        assert_eq!(a, b);
    }

    #[test]
    fn test_rdn_order_across_components_preserved() {
        assert_ne!(
            canonicalize("ou=a,ou=b,dc=x"),
            canonicalize("ou=b,ou=a,dc=x")
        );
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "CN=Alice+SN=Smith , OU=People, DC=Example,DC=Com",
            "uid=j.doe,ou=users,dc=corp,dc=net",
            "",
        ];
        for dn in inputs {
            let once = canonicalize(dn).unwrap();
            assert_eq!(canonicalize(&once), Some(once.clone()));
        }
    }

    #[test]
    fn test_empty_dn_is_root() {
        assert_eq!(canonicalize(""), Some(String::new()));
        assert_eq!(canonicalize("   "), Some(String::new()));
    }

    #[test]
    fn test_invalid_dns_rejected() {
        assert_eq!(canonicalize("not a valid dn !!!"), None);
        assert_eq!(canonicalize("cn"), None);
        assert_eq!(canonicalize("=value"), None);
        assert_eq!(canonicalize("cn=a,,dc=b"), None);
        // dangling escape
        assert_eq!(canonicalize("cn=a\\"), None);
        // space inside the attribute type
        assert_eq!(canonicalize("c n=a"), None);
    }

    #[test]
    fn test_escaped_separators_preserved() {
        let dn = canonicalize("cn=Smith\\, John,ou=people,dc=x").unwrap();
        assert_eq!(dn, "cn=smith\\, john,ou=people,dc=x");

        let dn = canonicalize("cn=a\\+b+sn=c,dc=x").unwrap();
        assert_eq!(dn, "cn=a\\+b+sn=c,dc=x");
    }

    #[test]
    fn test_escaped_trailing_space_survives() {
        let dn = canonicalize("cn=a\\ ,dc=x").unwrap();
        assert_eq!(dn, "cn=a\\ ,dc=x");
        assert_eq!(canonicalize(&dn), Some(dn.clone()));
    }

    #[test]
    fn test_empty_value_allowed() {
        assert_eq!(canonicalize("cn=,dc=x"), Some("cn=,dc=x".to_string()));
    }
}
