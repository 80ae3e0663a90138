use rand::prelude::*;
use rand::{rngs::StdRng, thread_rng, Rng, SeedableRng};
use slasher::{
    test_utils::{
        indexed_att, logger, slashed_validators_from_attestations,
        slashed_validators_from_slashings, E,
    },
    Config, Error, InvalidInput, Slasher, SlashingStatus,
};
use std::cmp::max;
use std::collections::HashSet;
use std::path::PathBuf;
use types::Epoch;

fn random_test(seed: u64, check_slashings: bool) {
    let num_validators = 4_usize;
    let max_attestations = 50;

    eprintln!("Running with seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let mut config = Config::new(PathBuf::new()).for_testing();
    config.validator_chunk_size = 1 << rng.gen_range(0..3);
    config.history_length = 1 << rng.gen_range(2..6);

    eprintln!("Validator chunk size: {}", config.validator_chunk_size);
    eprintln!("History length: {}", config.history_length);

    let slasher = Slasher::<E>::open(config.clone(), logger()).unwrap();

    let validators = (0..num_validators as u64).collect::<Vec<u64>>();

    let num_attestations = rng.gen_range(2..=max_attestations);

    let mut current_epoch = Epoch::new(0);
    let mut attestations = vec![];
    let mut slashings = HashSet::new();

    for _ in 0..num_attestations {
        let num_attesters = rng.gen_range(1..=num_validators);
        let mut attesting_indices = validators
            .choose_multiple(&mut rng, num_attesters)
            .copied()
            .collect::<Vec<u64>>();
        attesting_indices.sort_unstable();

        // If checking slashings, generate valid attestations in range.
        let (source, target) = if check_slashings {
            let min_epoch = config.min_epoch(current_epoch).as_u64();
            let source = rng.gen_range(min_epoch..=current_epoch.as_u64());
            let target = rng.gen_range(source..=current_epoch.as_u64());
            (source, target)
        } else {
            let source = rng.gen_range(0..max(3 * current_epoch.as_u64(), 1));
            let target = rng.gen_range(source..max(3 * current_epoch.as_u64(), source + 1));
            (source, target)
        };
        let target_root = rng.gen_range(0..3);
        let attestation = indexed_att(&attesting_indices, source, target, target_root);

        eprintln!(
            "Attestation {}=>{} from {:?} for root {}",
            source, target, attesting_indices, target_root
        );

        match slasher.is_slashable_attestation(&attestation) {
            Ok(found) => {
                for slashing in &found {
                    assert!(slashing.is_slashable_pair(), "{:#?}", slashing);
                }
                slashings.extend(found);
                if check_slashings {
                    attestations.push(attestation);
                }
            }
            // Out-of-window votes are the only acceptable failure.
            Err(e) => {
                assert!(!check_slashings, "unexpected error: {:?}", e);
                match e {
                    Error::StaleInput { .. }
                    | Error::InvalidInput(InvalidInput::FutureEpoch { .. }) => (),
                    e => panic!("unexpected error: {:?}", e),
                }
            }
        }

        // Maybe prune
        if rng.gen_bool(0.1) {
            eprintln!("Pruning at epoch {}", current_epoch);
            slasher.prune_database(current_epoch).unwrap();
        }

        // Maybe advance to the next epoch
        if rng.gen_bool(0.5) {
            current_epoch += 1;
            slasher.set_current_epoch(current_epoch);
        }
    }

    if !check_slashings {
        return;
    }

    let slashed_validators = slashed_validators_from_slashings(&slashings);
    let expected_slashed_validators = slashed_validators_from_attestations(&attestations);
    assert_eq!(slashed_validators, expected_slashed_validators);

    let active = slasher
        .attester_slashings(SlashingStatus::Active)
        .into_iter()
        .collect::<HashSet<_>>();
    assert_eq!(active, slashings);
}

#[test]
fn no_crash() {
    let mut rng = thread_rng();
    for _ in 0..200 {
        random_test(rng.gen(), false);
    }
}

#[test]
fn check_slashings() {
    let mut rng = thread_rng();
    for _ in 0..200 {
        random_test(rng.gen(), true);
    }
}

#[test]
fn check_slashings_fixed_seeds() {
    for seed in 0..64 {
        random_test(seed, true);
    }
}

#[test]
fn problem() {
    random_test(2064946994010930548, false);
}

#[test]
fn problem2() {
    random_test(10684284558065464334, false);
}
