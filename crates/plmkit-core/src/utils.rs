use crate::alphabet::CANONICAL_AMINO_ACIDS;
use rand::seq::SliceRandom;
use rand::Rng;

/// Edit distance between two sequences, counted in characters.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let (short, long): (Vec<char>, Vec<char>) = if a.chars().count() > b.chars().count() {
        (b.chars().collect(), a.chars().collect())
    } else {
        (a.chars().collect(), b.chars().collect())
    };

    let mut distances: Vec<usize> = (0..=short.len()).collect();
    for (i2, c2) in long.iter().enumerate() {
        let mut next = Vec::with_capacity(short.len() + 1);
        next.push(i2 + 1);
        for (i1, c1) in short.iter().enumerate() {
            if c1 == c2 {
                next.push(distances[i1]);
            } else {
                let best = distances[i1].min(distances[i1 + 1]).min(next[i1]);
                next.push(best + 1);
            }
        }
        distances = next;
    }
    distances[short.len()]
}

/// Random sequence over the canonical residues with a length drawn uniformly
/// from `min_length..=max_length`. Bounds given in reverse order are swapped.
pub fn random_sequence<R: Rng>(rng: &mut R, min_length: usize, max_length: usize) -> String {
    let (lo, hi) = if min_length <= max_length {
        (min_length, max_length)
    } else {
        (max_length, min_length)
    };
    let length = rng.gen_range(lo..=hi);
    let alphabet = CANONICAL_AMINO_ACIDS.as_bytes();
    (0..length)
        .filter_map(|_| alphabet.choose(&mut *rng).map(|&b| b as char))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::AminoAcid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("sitting", "kitten"), 3);
        assert_eq!(levenshtein_distance("", "MKV"), 3);
        assert_eq!(levenshtein_distance("MKV", "MKV"), 0);
        assert_eq!(levenshtein_distance("MKVLA", "MVLA"), 1);
    }

    #[test]
    fn test_random_sequence() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..50 {
            let seq = random_sequence(&mut rng, 5, 12);
            let len = seq.chars().count();
            assert!((5..=12).contains(&len));
            assert!(seq.chars().all(|c| AminoAcid::from_char(c).is_some()));
        }
        assert_eq!(random_sequence(&mut rng, 7, 7).len(), 7);
        assert_eq!(random_sequence(&mut rng, 0, 0), "");
    }

    #[test]
    fn test_random_sequence_is_seeded() {
        let a = random_sequence(&mut StdRng::seed_from_u64(7), 10, 20);
        let b = random_sequence(&mut StdRng::seed_from_u64(7), 10, 20);
        assert_eq!(a, b);
    }
}
