//! Property-based tests for ordering guarantees.
//!
//! Lock order and merge source order both decide what concurrent or
//! repeated builds produce, so they are checked against random inputs.

#[cfg(test)]
mod proptest_tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::lock::LockFiles;
    use crate::repoman::{merge_sources, ONLY_MISSING};
    use crate::reposync::broken_packages;
    use proptest::prelude::*;

    fn dir_paths() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("/[a-z]{1,8}(/[a-z0-9_][a-z0-9_.-]{0,7}){0,2}", 0..12)
    }

    // ============================================================================
    // Lock ordering
    // ============================================================================

    proptest! {
        /// Property: directories are locked in strictly increasing string order
        #[test]
        fn lock_order_is_sorted_and_unique(paths in dir_paths()) {
            let lock_files = LockFiles::new(paths.clone(), "mkrepo.lock", Duration::from_secs(1));
            let ordered = lock_files.paths();

            let mut expected = paths.clone();
            expected.sort();
            expected.dedup();
            let expected: Vec<PathBuf> = expected.iter().map(PathBuf::from).collect();
            prop_assert_eq!(ordered, &expected[..]);
            prop_assert!(ordered.windows(2).all(|w| w[0].as_os_str() < w[1].as_os_str()));
        }

        /// Property: the caller's order never changes the lock order
        #[test]
        fn lock_order_ignores_input_order(paths in dir_paths()) {
            let mut reversed = paths.clone();
            reversed.reverse();

            let forward = LockFiles::new(paths, "mkrepo.lock", Duration::from_secs(1));
            let backward = LockFiles::new(reversed, "mkrepo.lock", Duration::from_secs(1));
            prop_assert_eq!(forward.paths(), backward.paths());
        }
    }

    // ============================================================================
    // Merge source ordering
    // ============================================================================

    proptest! {
        /// Property: custom sources keep their order and precede every cache dir
        #[test]
        fn merge_sources_custom_first(
            custom in prop::collection::vec("[a-zA-Z0-9/_.-]{1,20}", 0..5),
            caches in dir_paths(),
        ) {
            let sources = merge_sources(&custom, caches.iter().map(Path::new));

            prop_assert_eq!(sources.len(), custom.len() + caches.len());
            prop_assert_eq!(&sources[..custom.len()], &custom[..]);
            for (source, cache) in sources[custom.len()..].iter().zip(&caches) {
                prop_assert_eq!(source, &format!("{}{}", cache, ONLY_MISSING));
            }
        }
    }

    // ============================================================================
    // Broken package detection
    // ============================================================================

    proptest! {
        /// Property: any well-formed package name is recovered from both signatures
        #[test]
        fn broken_packages_finds_reported_name(name in "[a-z][a-zA-Z0-9._-]{1,30}") {
            let errno = broken_packages(&format!("{}: [Errno 256] No more mirrors to try.", name)).unwrap();
            prop_assert!(errno.contains(&name));

            let failed = broken_packages(&format!("(1/3): {} FAILED", name)).unwrap();
            prop_assert!(failed.contains(&name));
        }
    }
}
