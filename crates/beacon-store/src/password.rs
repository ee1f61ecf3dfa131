// Password hashing and verification

use crate::error::Result;

/// Hash a password using bcrypt with the given cost.
///
/// The returned string embeds the salt and cost, e.g. `$2b$10$...`.
pub(crate) fn hash_password(password: &str, cost: u32) -> Result<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Check a password against a bcrypt hash.
///
/// `Ok(false)` on mismatch; `Err` only if the hash itself is malformed.
pub(crate) fn check_password(password: &str, hash: &str) -> Result<bool> {
    Ok(bcrypt::verify(password, hash)?)
}

/// Cost factor embedded in a bcrypt hash (`$2b$10$...` -> 10).
pub(crate) fn hash_cost(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_check_password() {
        let hash = hash_password("mypass", 4).expect("Failed to hash");
        assert!(hash.starts_with("$2b$04$"));
        assert!(!hash.contains("mypass"));

        assert!(check_password("mypass", &hash).unwrap());
        assert!(!check_password("newpass", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("mypass", 4).unwrap();
        let second = hash_password("mypass", 4).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_hash_cost() {
        let hash = hash_password("mypass", 5).unwrap();
        assert_eq!(hash_cost(&hash), Some(5));
        assert_eq!(hash_cost("not-a-bcrypt-hash"), None);
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(check_password("mypass", "not-a-bcrypt-hash").is_err());
    }
}
