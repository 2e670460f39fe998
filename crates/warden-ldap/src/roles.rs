//! Group-to-role mapping
//!
//! Mappings are evaluated in configured order and the first match wins.
//! That is a deliberate ordering contract: administrators list the most
//! privileged mappings first, and a later wildcard catches everyone else.

use std::collections::HashSet;
use tracing::warn;
use warden_core::RoleMapping;

use crate::dn::canonicalize;

/// The mapping pattern that matches any group set, including the empty one.
pub const WILDCARD: &str = "*";

/// Resolve an application role from the user's group DNs.
///
/// Group DNs and mapping patterns are canonicalized before comparison so
/// case, whitespace, and multi-valued RDN ordering differences do not break
/// a match. Unparsable DNs on either side are dropped with a warning, never
/// treated as equal to anything. `None` means no mapping matched, which
/// callers treat as a denial.
pub fn map_role(group_dns: &[String], mappings: &[RoleMapping]) -> Option<String> {
    let canonical: HashSet<String> = group_dns
        .iter()
        .filter_map(|dn| match canonicalize(dn) {
            Some(c) => Some(c),
            None => {
                warn!(group = %dn, "dropping unparsable group DN from role matching");
                None
            }
        })
        .collect();

    for mapping in mappings {
        if mapping.group == WILDCARD {
            return Some(mapping.role.clone());
        }
        match canonicalize(&mapping.group) {
            Some(pattern) => {
                if canonical.contains(&pattern) {
                    return Some(mapping.role.clone());
                }
            }
            None => {
                warn!(pattern = %mapping.group, "unparsable group pattern in role mapping");
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(group: &str, role: &str) -> RoleMapping {
        RoleMapping {
            group: group.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn test_wildcard_matches_any_group_set() {
        let mappings = [mapping("*", "VIEWER")];
        assert_eq!(
            map_role(&["cn=x,dc=y".to_string()], &mappings),
            Some("VIEWER".to_string())
        );
        assert_eq!(map_role(&[], &mappings), Some("VIEWER".to_string()));
    }

    #[test]
    fn test_first_match_wins_over_wildcard() {
        let mappings = [
            mapping("cn=admins,ou=groups,dc=co,dc=com", "ADMIN"),
            mapping("*", "VIEWER"),
        ];
        let groups = vec![
            "cn=other,ou=groups,dc=co,dc=com".to_string(),
            "CN=Admins,OU=Groups,DC=co,DC=com".to_string(),
        ];
        assert_eq!(map_role(&groups, &mappings), Some("ADMIN".to_string()));
    }

    #[test]
    fn test_ordering_is_the_contract() {
        // wildcard listed first shadows the later, more specific mapping
        let mappings = [
            mapping("*", "VIEWER"),
            mapping("cn=admins,ou=groups,dc=co,dc=com", "ADMIN"),
        ];
        let groups = vec!["cn=admins,ou=groups,dc=co,dc=com".to_string()];
        assert_eq!(map_role(&groups, &mappings), Some("VIEWER".to_string()));
    }

    #[test]
    fn test_no_match_denies() {
        let mappings = [mapping("cn=admins,dc=x", "ADMIN")];
        assert_eq!(map_role(&["cn=users,dc=x".to_string()], &mappings), None);
        assert_eq!(map_role(&[], &mappings), None);
    }

    #[test]
    fn test_invalid_group_dn_never_matches_invalid_pattern() {
        // both sides unparsable; they must not be considered equal
        let mappings = [mapping("!!garbage!!", "ADMIN")];
        assert_eq!(map_role(&["!!garbage!!".to_string()], &mappings), None);
    }

    #[test]
    fn test_multivalued_rdn_order_matches() {
        let mappings = [mapping("email=a@x+cn=B,ou=U,dc=E,dc=C", "MEMBER")];
        let groups = vec!["cn=b+email=a@x,OU=u,DC=e,DC=c".to_string()];
        assert_eq!(map_role(&groups, &mappings), Some("MEMBER".to_string()));
    }
}
