//! Greedy vertex thinning for boundary rings.
//!
//! Full resolution boundary datasets contain extremely short segments which cost query time and
//! make the ray casting numerically touchy. Thinning them out before indexing keeps the overall
//! outline while dropping most of the vertices.

use crate::geometry::Point;

/// Smallest number of points of a closed ring (a triangle plus the closing point).
const MIN_RING_LEN: usize = 4;

/// Simplifies a ring by enforcing a minimum separation between consecutive kept points.
///
/// The first point is kept and becomes the anchor. Each following point is kept, and becomes the
/// new anchor, only if it lies at least `min_separation` away from the current anchor. The last
/// point is always kept so that a closed ring stays closed, unless it duplicates the last kept
/// point.
///
/// This is a single greedy pass: the result depends on where the ring starts and is not the
/// smallest possible approximation. It is deterministic though.
///
/// The ring is returned unchanged if `min_separation <= 0`, or if thinning would leave fewer than
/// 4 points.
pub fn simplify(ring: &[Point], min_separation: f64) -> Vec<Point> {
    // Written so that NaN also returns the ring unchanged
    if !(min_separation > 0.) || ring.len() <= MIN_RING_LEN {
        return ring.to_vec();
    }
    let (first, last) = (ring[0], ring[ring.len() - 1]);

    let mut kept = Vec::with_capacity(ring.len());
    kept.push(first);
    let mut anchor = first;
    for &p in &ring[1..ring.len() - 1] {
        if p.distance(&anchor) >= min_separation {
            kept.push(p);
            anchor = p;
        }
    }
    if anchor != last {
        kept.push(last);
    }

    if kept.len() < MIN_RING_LEN {
        ring.to_vec()
    } else {
        kept
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn ring(coords: &[[f64; 2]]) -> Vec<Point> {
        coords.iter().map(Point::from).collect()
    }

    /// A closed ring going around a circle with `n` distinct vertices.
    fn circle(n: usize, radius: f64) -> Vec<Point> {
        (0..=n)
            .map(|i| {
                let angle = 2. * std::f64::consts::PI * (i % n) as f64 / n as f64;
                Point::new(radius * angle.cos(), radius * angle.sin())
            })
            .collect()
    }

    #[rstest]
    #[case(0.)]
    #[case(-1.)]
    #[case(f64::NAN)]
    fn non_positive_separation_returns_ring_unchanged(#[case] min_separation: f64) {
        let input = circle(100, 1.);

        assert_eq!(simplify(&input, min_separation), input);
    }

    #[test]
    fn close_points_are_dropped() {
        let input = ring(&[
            [0., 0.],
            [0.1, 0.],
            [1., 0.],
            [1., 0.05],
            [1., 1.],
            [0., 1.],
            [0., 0.9],
            [0., 0.],
        ]);

        let output = simplify(&input, 0.5);

        assert_eq!(
            output,
            ring(&[[0., 0.], [1., 0.], [1., 1.], [0., 1.], [0., 0.]])
        );
    }

    #[test]
    fn distance_is_measured_from_the_last_kept_point() {
        // Each step is shorter than the separation, but they add up
        let input = ring(&[
            [0., 0.],
            [0.4, 0.],
            [0.8, 0.],
            [1.2, 0.],
            [1.2, 1.2],
            [0., 1.2],
            [0., 0.],
        ]);

        let output = simplify(&input, 0.7);

        assert_eq!(
            output,
            ring(&[[0., 0.], [0.8, 0.], [1.2, 1.2], [0., 1.2], [0., 0.]])
        );
    }

    #[test]
    fn last_point_is_kept_even_when_close() {
        // The closing point is only 0.5 away from the previous one
        let input = ring(&[[0., 0.], [2., 0.], [2., 2.], [0., 0.5], [0., 0.]]);

        let output = simplify(&input, 1.);

        assert_eq!(output.first(), output.last());
        assert_eq!(output, input);
    }

    #[test]
    fn duplicate_closing_point_is_collapsed() {
        // The ring passes through its starting point again right before closing
        let input = ring(&[
            [0., 0.],
            [2., 0.],
            [2., 2.],
            [0., 2.],
            [0., 0.],
            [0., 0.],
        ]);

        let output = simplify(&input, 1.);

        assert_eq!(
            output,
            ring(&[[0., 0.], [2., 0.], [2., 2.], [0., 2.], [0., 0.]])
        );
    }

    #[test]
    fn over_simplified_ring_falls_back_to_input() {
        let input = circle(50, 1.);

        // Every point is within the separation of the first one
        let output = simplify(&input, 10.);

        assert_eq!(output, input);
    }

    proptest! {
        #[test]
        fn simplified_rings_stay_closed(n in 3..200usize, radius in 0.1..100.0f64, min_separation in 0.0..50.0f64) {
            let input = circle(n, radius);

            let output = simplify(&input, min_separation);

            prop_assert_eq!(output.first(), output.last());
            prop_assert!(output.len() >= MIN_RING_LEN);
            prop_assert!(output.len() <= input.len());
            // Every kept point but the closing one is far enough from its predecessor
            if output != input {
                for (a, b) in output[..output.len() - 1].iter().tuple_windows() {
                    prop_assert!(a.distance(b) >= min_separation);
                }
            }
        }
    }
}
