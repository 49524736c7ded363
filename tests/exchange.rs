use ferrovis::{Error, ReduceOp, World, ANY_TAG, NEG_INF_ANGLE};
use proptest::prelude::*;

fn exclusive_max(values: &[f64]) -> Vec<f64> {
    World::new(values.len())
        .unwrap()
        .run(|comm| comm.exscan_scalar(values[comm.rank() as usize], ReduceOp::Max))
        .unwrap()
}

#[test]
fn rank_zero_sees_nothing() {
    for size in 1..=10 {
        let values: Vec<f64> = (0..size).map(|r| f64::from(r) * 0.1).collect();
        assert_eq!(exclusive_max(&values)[0], NEG_INF_ANGLE, "size {size}");
    }
}

#[test]
fn power_of_two_group() {
    let values = [0.3, -0.2, 0.9, 0.1, -1.0, 0.95, 0.2, 0.0];
    assert_eq!(
        exclusive_max(&values),
        vec![NEG_INF_ANGLE, 0.3, 0.3, 0.9, 0.9, 0.9, 0.95, 0.95]
    );
}

#[test]
fn odd_sized_group() {
    let values = [0.5, 0.1, 0.7, -0.3, 0.2];
    assert_eq!(exclusive_max(&values), vec![NEG_INF_ANGLE, 0.5, 0.5, 0.7, 0.7]);
}

#[test]
fn idle_ranks_contribute_identity() {
    let values = [NEG_INF_ANGLE, 0.4, NEG_INF_ANGLE, NEG_INF_ANGLE];
    assert_eq!(exclusive_max(&values), vec![NEG_INF_ANGLE, NEG_INF_ANGLE, 0.4, 0.4]);
}

#[test]
fn integer_min_and_product() {
    let mins = World::new(7)
        .unwrap()
        .run(|comm| comm.exscan_scalar(10 - comm.rank() * 3, ReduceOp::Min))
        .unwrap();
    assert_eq!(mins, vec![i32::MAX, 10, 7, 4, 1, -2, -5]);

    let products = World::new(5)
        .unwrap()
        .run(|comm| comm.scan_scalar(2u64, ReduceOp::Prod))
        .unwrap();
    assert_eq!(products, vec![2, 4, 8, 16, 32]);
}

#[test]
fn mismatched_participation_is_detected() {
    // Rank 1 skips the exchange: it sends a stray value, then swallows rank 0's
    // up-sweep message without answering.
    let err = World::new(2)
        .unwrap()
        .run(|comm| {
            if comm.rank() == 1 {
                comm.send_scalar(1.0f64, 0, 0)?;
                return comm.recv_scalar::<f64>(0, ANY_TAG);
            }
            comm.exscan_scalar(0.5f64, ReduceOp::Max)
        })
        .unwrap_err();
    assert!(matches!(err, Error::ProtocolMismatch { peer: 1, .. }));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn matches_serial_prefix_and_is_monotonic(
        values in prop::collection::vec(-1.5f64..1.5, 1..24),
    ) {
        let got = exclusive_max(&values);
        let mut running = NEG_INF_ANGLE;
        for (rank, &value) in values.iter().enumerate() {
            prop_assert_eq!(got[rank], running);
            running = running.max(value);
        }
        prop_assert!(got.windows(2).all(|w| w[0] <= w[1]));
    }
}
