//! Identity resolver - recover a created resource's identity by diffing
//! two listing snapshots
//!
//! The creation API never returns the identifier of the resource it
//! created. The only identity the backend exposes is the correlation key
//! it generates into listings, so the controller lists the class before
//! and after the order and diffs the two snapshots.

use thiserror::Error;

use crate::api::Snapshot;

/// Resolution failure after an otherwise successful create order
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The post-order listing holds nothing absent from the pre-order one
    #[error("no new resource in the listing ({before} before, {after} after)")]
    NoNewResource { before: usize, after: usize },
}

/// Find the descriptor present in `after` but not in `before` and return
/// its correlation key
///
/// Keys compare by exact string equality, no normalization. When several
/// descriptors are unmatched, the first in `after` listing order wins;
/// callers depend on that ordering, so it must not change. Equal-sized
/// snapshots fail fast: the backend created nothing despite reporting a
/// completed order.
pub fn resolve_created_key(before: &Snapshot, after: &Snapshot) -> Result<String, ResolveError> {
    let no_new = ResolveError::NoNewResource {
        before: before.len(),
        after: after.len(),
    };

    if before.len() == after.len() {
        return Err(no_new);
    }

    after
        .iter()
        .find(|d| {
            !before
                .iter()
                .any(|b| b.correlation_key == d.correlation_key)
        })
        .map(|d| d.correlation_key.clone())
        .ok_or(no_new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApplianceDescriptor;

    fn descriptor(key: &str) -> ApplianceDescriptor {
        ApplianceDescriptor {
            correlation_key: key.to_string(),
            attributes: serde_json::Map::new(),
        }
    }

    #[test]
    fn resolves_the_single_new_descriptor() {
        let before = vec![descriptor("host-a")];
        let after = vec![descriptor("host-a"), descriptor("host-b")];

        assert_eq!(resolve_created_key(&before, &after).unwrap(), "host-b");
    }

    #[test]
    fn errors_when_snapshots_are_identical() {
        let before = vec![descriptor("host-a"), descriptor("host-b")];
        let after = vec![descriptor("host-a"), descriptor("host-b")];

        assert_eq!(
            resolve_created_key(&before, &after),
            Err(ResolveError::NoNewResource {
                before: 2,
                after: 2
            })
        );
    }

    #[test]
    fn equal_sized_snapshots_fail_even_when_keys_differ() {
        let before = vec![descriptor("host-a")];
        let after = vec![descriptor("host-b")];

        assert!(resolve_created_key(&before, &after).is_err());
    }

    #[test]
    fn errors_when_after_shrank() {
        let before = vec![descriptor("host-a"), descriptor("host-b")];
        let after = vec![descriptor("host-a")];

        assert!(resolve_created_key(&before, &after).is_err());
    }

    #[test]
    fn first_unmatched_descriptor_wins() {
        let before = vec![descriptor("host-a")];
        let after = vec![
            descriptor("host-a"),
            descriptor("host-b"),
            descriptor("host-c"),
        ];

        assert_eq!(resolve_created_key(&before, &after).unwrap(), "host-b");
    }

    #[test]
    fn keys_compare_without_normalization() {
        let before = vec![descriptor("host-a")];
        let after = vec![descriptor("HOST-A"), descriptor("host-a")];

        assert_eq!(resolve_created_key(&before, &after).unwrap(), "HOST-A");
    }

    #[test]
    fn resolves_from_an_empty_before_snapshot() {
        let before = Vec::new();
        let after = vec![descriptor("host-a")];

        assert_eq!(resolve_created_key(&before, &after).unwrap(), "host-a");
    }
}
