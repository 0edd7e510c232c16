//! Index selection for fixed-length resampling.

/// Indices into a raw window of `raw_len` rows picking `out_len` rows evenly:
/// `round(k·(L−1)/(T−1))` for k = 0..T. The last index is always `L − 1`
/// (the anchor row). With `out_len == 1` only the anchor row is picked.
pub fn resample_indices(raw_len: usize, out_len: usize) -> Vec<usize> {
    if raw_len == 0 || out_len == 0 {
        return Vec::new();
    }
    if out_len == 1 {
        return vec![raw_len - 1];
    }
    let span = raw_len - 1;
    let steps = out_len - 1;
    // integer round-half-up of k·span/steps
    (0..out_len).map(|k| (2 * k * span + steps) / (2 * steps)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window_indices() {
        let idx = resample_indices(500, 100);
        assert_eq!(idx.len(), 100);
        assert_eq!(idx[0], 0);
        assert_eq!(idx[1], 5); // 499/99 = 5.04
        assert_eq!(idx[99], 499);
        assert!(idx.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_degenerate_lengths() {
        assert_eq!(resample_indices(500, 1), vec![499]);
        assert_eq!(resample_indices(3, 3), vec![0, 1, 2]);
        assert_eq!(resample_indices(5, 3), vec![0, 2, 4]);
        assert!(resample_indices(0, 3).is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: T indices, ascending, within the raw window, ending at the anchor
            #[test]
            fn prop_indices_cover_window(raw_len in 1usize..2000, out_len in 1usize..300) {
                let idx = resample_indices(raw_len, out_len);
                prop_assert_eq!(idx.len(), out_len);
                prop_assert_eq!(*idx.last().unwrap(), raw_len - 1);
                prop_assert!(idx.iter().all(|&i| i < raw_len));
                prop_assert!(idx.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
