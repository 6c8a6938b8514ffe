//! Seeded train/test split.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Shuffle `0..n_rows` with a seeded RNG and split it.
///
/// The test set holds `ceil(test_size * n_rows)` rows and the train set the
/// rest. Returns `(train_indexes, test_indexes)`.
pub fn train_test_split(n_rows: usize, test_size: f64, random_state: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indexes: Vec<usize> = (0..n_rows).collect();
    let mut rng = StdRng::seed_from_u64(random_state);
    indexes.shuffle(&mut rng);

    let n_test = ((test_size * n_rows as f64).ceil() as usize).min(n_rows);
    let train = indexes.split_off(n_test);
    (train, indexes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sizes() {
        let (train, test) = train_test_split(10, 0.2, 0);
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 8);

        let (train, test) = train_test_split(11, 0.2, 0);
        assert_eq!(test.len(), 3);
        assert_eq!(train.len(), 8);
    }

    #[test]
    fn test_split_is_a_partition() {
        let (train, test) = train_test_split(25, 0.3, 7);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..25).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_deterministic() {
        assert_eq!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 42));
        assert_ne!(train_test_split(50, 0.2, 42), train_test_split(50, 0.2, 43));
    }

    #[test]
    fn test_split_empty() {
        let (train, test) = train_test_split(0, 0.2, 0);
        assert!(train.is_empty());
        assert!(test.is_empty());
    }
}
