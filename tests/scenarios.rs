#![allow(missing_docs)]

use float_cmp::approx_eq;
use isomarginal::{Marginal, Precalculated, Trek};
use rand::Rng;
use rand_pcg::Pcg64;
use std::collections::HashSet;

fn marginal(masses: &[f64], probs: &[f64], n: u32) -> Marginal {
    Marginal::new(masses, probs, n).unwrap()
}

#[test]
fn degenerate_single_isotope_has_exactly_one_configuration() {
    let m = marginal(&[12.0], &[1.0], 10);
    assert!(approx_eq!(f64, m.mode_log_prob(), 0.0, epsilon = 1e-12));
    assert_eq!(m.log_size_estimate(5.0), f64::NEG_INFINITY);

    let mut trek = Trek::from_marginal(m);
    assert_eq!(trek.configuration(0), [10]);
    assert!(approx_eq!(f64, trek.log_prob(0), 0.0, epsilon = 1e-12));
    assert!(approx_eq!(f64, trek.prob(0), 1.0, epsilon = 1e-12));
    assert!(approx_eq!(f64, trek.mass(0), 120.0, epsilon = 1e-9));
    assert!(!trek.advance());
}

#[test]
fn binary_symmetric_trek_order_and_probabilities() {
    let mut trek = Trek::from_marginal(marginal(&[1.0, 2.0], &[0.5, 0.5], 4));
    trek.ensure_index(4);

    let confs: Vec<Vec<u32>> = (0..5).map(|i| trek.configuration(i).to_vec()).collect();
    assert_eq!(confs[0], vec![2, 2]);
    // tied pair: [1,3] before [3,1] per the larger-donor-index tiebreak
    assert_eq!(confs[1], vec![1, 3]);
    assert_eq!(confs[2], vec![3, 1]);
    let mut tail = vec![confs[3].clone(), confs[4].clone()];
    tail.sort();
    assert_eq!(tail, vec![vec![0, 4], vec![4, 0]]);

    let expected_probs = [0.375, 0.25, 0.25, 0.0625, 0.0625];
    let mut actual_probs: Vec<f64> = (0..5).map(|i| trek.prob(i)).collect();
    let mut expected_sorted = expected_probs.to_vec();
    actual_probs.sort_by(|a, b| b.partial_cmp(a).unwrap());
    expected_sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    for (a, e) in actual_probs.iter().zip(expected_sorted.iter()) {
        assert!(approx_eq!(f64, *a, *e, epsilon = 1e-9));
    }
    assert!(approx_eq!(f64, trek.total_prob(), 1.0, epsilon = 1e-9));
}

#[test]
fn carbon_isotope_mode_and_precalculated_cutoff() {
    let m = marginal(&[12.0, 13.003355], &[0.9893, 0.0107], 100);
    assert_eq!(m.mode_configuration(), [99, 1]);

    let precalc = Precalculated::from_marginal(m, 1e-6_f64.ln(), true);
    assert!(precalc.count() >= 7);
    for i in 0..precalc.count() {
        assert!(precalc.configuration(i)[1] <= 4);
    }
    let sum: f64 = (0..precalc.count()).map(|i| precalc.prob(i)).sum();
    assert!(approx_eq!(f64, sum, 1.0, epsilon = 0.01));
}

#[test]
fn layered_refinement_is_nested_and_matches_precalculated_at_final_cutoff() {
    use isomarginal::Layered;

    let m = marginal(&[12.0, 13.003355], &[0.9893, 0.0107], 100);
    let cutoff = 1e-6_f64.ln();

    let mut layered = Layered::from_marginal(m.clone());
    layered.extend(0.1_f64.ln());
    let s1: HashSet<Vec<u32>> = (0..layered.count())
        .map(|i| layered.configuration(i).to_vec())
        .collect();

    layered.extend(1e-3_f64.ln());
    let s2: HashSet<Vec<u32>> = (0..layered.count())
        .map(|i| layered.configuration(i).to_vec())
        .collect();
    assert!(s1.is_subset(&s2));

    layered.extend(cutoff);
    let s3: HashSet<Vec<u32>> = (0..layered.count())
        .map(|i| layered.configuration(i).to_vec())
        .collect();
    assert!(s2.is_subset(&s3));

    let precalc = Precalculated::from_marginal(m, cutoff, false);
    let precalc_set: HashSet<Vec<u32>> = (0..precalc.count())
        .map(|i| precalc.configuration(i).to_vec())
        .collect();
    assert_eq!(s3, precalc_set);
}

#[test]
fn trek_run_until_cutoff_matches_precalculated_configuration_set() {
    let masses = [1.0, 2.0, 3.0];
    let probs = [0.5, 0.3, 0.2];
    let n = 12;
    let cutoff = 1e-3_f64.ln();

    let mut trek = Trek::from_marginal(marginal(&masses, &probs, n));
    while trek.advance() {
        if trek.log_prob(trek.count() - 1) < cutoff {
            break;
        }
    }
    let trek_set: HashSet<Vec<u32>> = (0..trek.count())
        .filter(|&i| trek.log_prob(i) >= cutoff)
        .map(|i| trek.configuration(i).to_vec())
        .collect();

    let precalc = Precalculated::from_marginal(marginal(&masses, &probs, n), cutoff, false);
    let precalc_set: HashSet<Vec<u32>> = (0..precalc.count())
        .map(|i| precalc.configuration(i).to_vec())
        .collect();

    assert_eq!(trek_set, precalc_set);
}

#[test]
fn arena_backed_configurations_stay_valid_across_many_advances() {
    let mut rng = Pcg64::new(0xcafef00dd15ea5e5, 0xa02bdbf7bb3c0a7ac28fa16a64abf96);
    let k = 4;
    let probs: Vec<f64> = {
        let raw: Vec<f64> = (0..k).map(|_| 0.1 + rng.gen::<f64>() * 0.9).collect();
        let sum: f64 = raw.iter().sum();
        raw.into_iter().map(|v| v / sum).collect()
    };
    let masses: Vec<f64> = (0..k).map(|i| 1.0 + f64::from(i as u32)).collect();
    let mut trek = Trek::from_marginal(marginal(&masses, &probs, 20));

    for _ in 0..200 {
        if !trek.advance() {
            break;
        }
    }

    let snapshot: Vec<(Vec<u32>, f64, f64)> = (0..trek.count())
        .map(|i| (trek.configuration(i).to_vec(), trek.log_prob(i), trek.mass(i)))
        .collect();
    for _ in 0..50 {
        trek.advance();
    }
    for (i, (config, lp, m)) in snapshot.into_iter().enumerate() {
        assert_eq!(trek.configuration(i), config.as_slice());
        assert!(approx_eq!(f64, trek.log_prob(i), lp, epsilon = 1e-15));
        assert!(approx_eq!(f64, trek.mass(i), m, epsilon = 1e-15));
    }
}

#[test]
fn recomputed_log_prob_matches_stored_value_bit_exactly() {
    use isomarginal::config::log_prob;

    let m = marginal(&[12.0, 13.003355], &[0.9893, 0.0107], 50);
    let loggamma_nominator = m.loggamma_nominator();
    let atom_log_probs = m.atom_log_probs().to_vec();

    let precalc = Precalculated::from_marginal(m, f64::NEG_INFINITY, true);
    for i in 0..precalc.count() {
        let recomputed = log_prob(loggamma_nominator, &atom_log_probs, precalc.configuration(i));
        assert_eq!(recomputed, precalc.log_prob(i));
        assert_eq!(precalc.prob(i), precalc.log_prob(i).exp());
    }
}

#[test]
fn construction_is_deterministic_across_independent_runs() {
    let a = Precalculated::from_marginal(
        marginal(&[12.0, 13.003355], &[0.9893, 0.0107], 80),
        1e-8_f64.ln(),
        true,
    );
    let b = Precalculated::from_marginal(
        marginal(&[12.0, 13.003355], &[0.9893, 0.0107], 80),
        1e-8_f64.ln(),
        true,
    );

    assert_eq!(a.count(), b.count());
    for i in 0..a.count() {
        assert_eq!(a.configuration(i), b.configuration(i));
        assert_eq!(a.log_prob(i), b.log_prob(i));
    }
}
