//! Anti-spam proof-of-work.
//!
//! A block's nonce is valued by hashing it against the block's root:
//! `work_value = u64_le(blake2b(8, nonce_le ‖ root))`. The nonce is valid
//! when the value clears the network's publish threshold. Generation here is
//! a plain search loop; production deployments point `work_peers` at
//! external generators.

use ferrite_types::{BlockHash, Root};
use rand::Rng;

/// The difficulty value of a nonce for the given root.
pub fn work_value(root: &Root, work: u64) -> u64 {
    let digest = ferrite_crypto::blake2b(8, &[&work.to_le_bytes(), root.as_bytes()]);
    u64::from_le_bytes(digest.try_into().expect("8-byte digest"))
}

/// Whether `work` clears `threshold` for `root`.
pub fn work_validate(root: &Root, work: u64, threshold: u64) -> bool {
    work_value(root, work) >= threshold
}

/// Search for a nonce clearing `threshold`. Returns `None` if none is found
/// within `max_iterations` probes.
pub fn generate(root: &Root, threshold: u64, rng: &mut impl Rng, max_iterations: u64) -> Option<u64> {
    for _ in 0..max_iterations {
        let candidate: u64 = rng.gen();
        if work_validate(root, candidate, threshold) {
            return Some(candidate);
        }
    }
    None
}

/// Test-network generation: the threshold is low enough that a bounded
/// search practically never fails.
pub fn generate_for_tests(root: &BlockHash, threshold: u64, rng: &mut impl Rng) -> u64 {
    generate(root, threshold, rng, 1 << 24).expect("test threshold is reachable")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const TEST_THRESHOLD: u64 = 0xff00_0000_0000_0000;

    #[test]
    fn generated_work_validates() {
        let root = BlockHash::new([0xDE; 32]);
        let mut rng = StdRng::seed_from_u64(1);
        let work = generate_for_tests(&root, TEST_THRESHOLD, &mut rng);
        assert!(work_validate(&root, work, TEST_THRESHOLD));
    }

    #[test]
    fn work_is_root_specific() {
        let a = BlockHash::new([1; 32]);
        let b = BlockHash::new([2; 32]);
        let mut rng = StdRng::seed_from_u64(2);
        let work = generate_for_tests(&a, TEST_THRESHOLD, &mut rng);
        assert_ne!(work_value(&a, work), work_value(&b, work));
    }

    #[test]
    fn impossible_threshold_gives_up() {
        let root = BlockHash::new([3; 32]);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(generate(&root, u64::MAX, &mut rng, 64), None);
    }

    #[test]
    fn genesis_work_clears_test_threshold() {
        let root = BlockHash::decode_hex(ferrite_types::params::DEV_GENESIS_PUBLIC_KEY).unwrap();
        assert!(work_validate(
            &root,
            ferrite_types::params::DEV_GENESIS_WORK,
            TEST_THRESHOLD
        ));
    }

    proptest! {
        #[test]
        fn value_is_deterministic(root in any::<[u8; 32]>(), work in any::<u64>()) {
            let root = BlockHash::new(root);
            prop_assert_eq!(work_value(&root, work), work_value(&root, work));
        }

        #[test]
        fn validate_agrees_with_value(root in any::<[u8; 32]>(), work in any::<u64>()) {
            let root = BlockHash::new(root);
            let value = work_value(&root, work);
            prop_assert!(work_validate(&root, work, value));
            if value < u64::MAX {
                prop_assert!(!work_validate(&root, work, value + 1));
            }
        }
    }
}
