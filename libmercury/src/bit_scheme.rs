//! Combinatorial identifiers for barcoding.
//!
//! Every field (or sub-cell) to barcode receives a unique identifier which decides the set
//! of ports that will address it. Two encodings exist:
//!
//! - Digit tuples: fixed-length tuples over `0..=alphabet_size`, where `0` marks an unused
//! slot and digit `d` stands for the `d`-th port. Zeros are stripped before identifiers
//! are compared, so `[1, 0]` and `[0, 1]` are the same identifier.
//! - Fixed-weight bit vectors: vectors with exactly `weight` ones, where slot `i` stands
//! for the `i`-th port. Vectors are enumerated in lexicographic order of their one
//! positions.
//!
//! Generation is deterministic: callers pair identifier `i` with field `i`.
use std::fmt;

use bitvec::prelude::*;
use fxhash::FxHashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use super::constants::MAX_DIGIT_CANDIDATES;
use super::error::SchemeError;
use super::ports::{Port, PortList};

/// Which identifier encoding to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SchemeMode {
    DigitTuple { alphabet_size: usize },
    FixedWeight { weight: usize },
}

impl Default for SchemeMode {
    fn default() -> Self {
        Self::FixedWeight {
            weight: crate::constants::DEFAULT_CONCATENATIONS,
        }
    }
}

/// One unique combinatorial identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identifier {
    Digits(Vec<usize>),
    Bits(BitVec),
}

impl Identifier {
    /// Number of slots (tuple length or vector length)
    pub fn len(&self) -> usize {
        match self {
            Self::Digits(d) => d.len(),
            Self::Bits(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots that address a port
    pub fn weight(&self) -> usize {
        match self {
            Self::Digits(d) => d.iter().filter(|digit| **digit != 0).count(),
            Self::Bits(b) => b.count_ones(),
        }
    }

    /// Slot positions that address a port
    pub fn active_slots(&self) -> Vec<usize> {
        match self {
            Self::Digits(d) => d
                .iter()
                .enumerate()
                .filter(|(_, digit)| **digit != 0)
                .map(|(slot, _)| slot)
                .collect(),
            Self::Bits(b) => b.iter_ones().collect(),
        }
    }

    /// The identity used for uniqueness: non-zero digits for tuples, the vector itself for bits
    pub fn canonical(&self) -> Vec<usize> {
        match self {
            Self::Digits(d) => d.iter().copied().filter(|digit| *digit != 0).collect(),
            Self::Bits(b) => b.iter_ones().collect(),
        }
    }

    fn values(&self) -> Vec<usize> {
        match self {
            Self::Digits(d) => d.clone(),
            Self::Bits(b) => b.iter().map(|bit| *bit as usize).collect(),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.values().iter().join(", "))
    }
}

/// Identifiers in generation order together with the number of slots they use
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScheme {
    pub sequences: Vec<Identifier>,
    pub columns: usize,
}

/// Per-slot port assignment of one identifier. `None` means the slot addresses no port.
pub type PortSequence = Vec<Option<Port>>;

/// Binomial coefficient, saturating at `u128::MAX`
pub fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        // Exact at every step: the running product of i+1 consecutive integers is divisible by (i+1)!
        result = match result.checked_mul((n - i) as u128) {
            Some(r) => r / (i as u128 + 1),
            None => return u128::MAX,
        };
    }
    result
}

/// Generate `n` pairwise-distinct identifiers for a rig with `port_count` ports
pub fn generate_sequences(
    n: usize,
    mode: SchemeMode,
    port_count: usize,
) -> Result<GeneratedScheme, SchemeError> {
    let scheme = match mode {
        SchemeMode::DigitTuple { alphabet_size } => {
            generate_digit_tuples(n, alphabet_size, port_count)?
        }
        SchemeMode::FixedWeight { weight } => generate_fixed_weight(n, weight, port_count)?,
    };
    log::info!(
        "Generated {} identifiers using {} columns",
        scheme.sequences.len(),
        scheme.columns
    );
    Ok(scheme)
}

/// Digit-tuple mode. The tuple length grows from 1 until enough distinct stripped tuples
/// exist, then the first `n` in Cartesian-product order are returned.
fn generate_digit_tuples(
    n: usize,
    alphabet_size: usize,
    port_count: usize,
) -> Result<GeneratedScheme, SchemeError> {
    if alphabet_size > port_count {
        return Err(SchemeError::AlphabetExceedsPorts {
            alphabet: alphabet_size,
            ports: port_count,
        });
    }
    if n == 0 {
        return Ok(GeneratedScheme {
            sequences: vec![],
            columns: 1,
        });
    }
    if alphabet_size == 0 {
        return Err(SchemeError::CapacityExceeded {
            requested: n,
            capacity: 0,
            weight: 0,
            ports: port_count,
        });
    }

    // Distinct non-empty stripped tuples of length <= L: a + a^2 + ... + a^L
    let mut length = 1;
    let mut distinct: u128 = alphabet_size as u128;
    let mut power: u128 = alphabet_size as u128;
    while distinct < n as u128 {
        length += 1;
        power = power.saturating_mul(alphabet_size as u128);
        distinct = distinct.saturating_add(power);
    }
    let candidates = (alphabet_size as u128 + 1)
        .checked_pow(length as u32)
        .unwrap_or(u128::MAX);
    if candidates > MAX_DIGIT_CANDIDATES {
        return Err(SchemeError::SearchSpaceTooLarge {
            length,
            alphabet: alphabet_size,
        });
    }

    let mut seen: FxHashSet<Vec<usize>> = FxHashSet::default();
    let mut sequences = Vec::with_capacity(n);
    for tuple in (0..length)
        .map(|_| 0..=alphabet_size)
        .multi_cartesian_product()
    {
        let stripped: Vec<usize> = tuple.iter().copied().filter(|d| *d != 0).collect();
        if !stripped.is_empty() && seen.insert(stripped) {
            sequences.push(Identifier::Digits(tuple));
            if sequences.len() == n {
                break;
            }
        }
    }

    Ok(GeneratedScheme {
        sequences,
        columns: length,
    })
}

/// Fixed-weight mode. Picks the smallest vector length `columns >= weight` with
/// `C(columns, weight) >= n` and enumerates weight-`weight` vectors in lexicographic order
/// of their one positions.
fn generate_fixed_weight(
    n: usize,
    weight: usize,
    port_count: usize,
) -> Result<GeneratedScheme, SchemeError> {
    let capacity = binomial(port_count, weight);
    if weight > port_count || n as u128 > capacity {
        log::warn!(
            "Requested {n} identifiers but at most {capacity} exist for weight {weight} over {port_count} ports"
        );
        return Err(SchemeError::CapacityExceeded {
            requested: n,
            capacity,
            weight,
            ports: port_count,
        });
    }

    let mut columns = weight;
    while binomial(columns, weight) < n as u128 {
        columns += 1;
    }

    let sequences = (0..columns)
        .combinations(weight)
        .take(n)
        .map(|positions| {
            let mut bits = bitvec![0; columns];
            for pos in positions {
                bits.set(pos, true);
            }
            Identifier::Bits(bits)
        })
        .collect();

    Ok(GeneratedScheme { sequences, columns })
}

/// Replace slot contents with the ports they address.
///
/// Digits index the port list from 1 (digit `0` stays "no port"); bit vectors index it
/// from 0 by slot position.
pub fn map_to_ports(
    sequences: &[Identifier],
    port_list: &PortList,
) -> Result<Vec<PortSequence>, SchemeError> {
    sequences
        .iter()
        .map(|sequence| match sequence {
            Identifier::Digits(digits) => digits
                .iter()
                .map(|digit| match digit {
                    0 => Ok(None),
                    d => port_list
                        .get(d - 1)
                        .map(Some)
                        .ok_or(SchemeError::PortIndexOutOfRange(*d)),
                })
                .collect(),
            Identifier::Bits(bits) => bits
                .iter()
                .enumerate()
                .map(|(slot, bit)| {
                    if *bit {
                        port_list
                            .get(slot)
                            .map(Some)
                            .ok_or(SchemeError::PortIndexOutOfRange(slot))
                    } else {
                        Ok(None)
                    }
                })
                .collect(),
        })
        .collect()
}

/// Inverse of [`map_to_ports`] for a single sequence
pub fn decode_ports(
    sequence: &PortSequence,
    port_list: &PortList,
    mode: SchemeMode,
) -> Result<Identifier, SchemeError> {
    match mode {
        SchemeMode::DigitTuple { .. } => sequence
            .iter()
            .map(|slot| match slot {
                None => Ok(0),
                Some(port) => port_list
                    .position(*port)
                    .map(|pos| pos + 1)
                    .ok_or(SchemeError::PortNotInList(*port)),
            })
            .collect::<Result<Vec<usize>, SchemeError>>()
            .map(Identifier::Digits),
        SchemeMode::FixedWeight { .. } => {
            let mut bits = bitvec![0; sequence.len()];
            for (slot, entry) in sequence.iter().enumerate() {
                if let Some(port) = entry {
                    if port_list.position(*port) != Some(slot) {
                        return Err(SchemeError::PortNotInList(*port));
                    }
                    bits.set(slot, true);
                }
            }
            Ok(Identifier::Bits(bits))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bits(values: &[u8]) -> Identifier {
        Identifier::Bits(values.iter().map(|v| *v == 1).collect())
    }

    #[test]
    fn test_binomial() {
        assert_eq!(binomial(4, 2), 6);
        assert_eq!(binomial(20, 5), 15504);
        assert_eq!(binomial(3, 5), 0);
        assert_eq!(binomial(7, 0), 1);
    }

    #[test]
    fn test_fixed_weight_minimal_columns() {
        let scheme = generate_sequences(5, SchemeMode::FixedWeight { weight: 2 }, 5).unwrap();
        assert_eq!(scheme.columns, 4);
        assert_eq!(
            scheme.sequences,
            vec![
                bits(&[1, 1, 0, 0]),
                bits(&[1, 0, 1, 0]),
                bits(&[1, 0, 0, 1]),
                bits(&[0, 1, 1, 0]),
                bits(&[0, 1, 0, 1]),
            ]
        );
    }

    #[test]
    fn test_fixed_weight_capacity_exceeded() {
        let result = generate_sequences(11, SchemeMode::FixedWeight { weight: 2 }, 5);
        assert_eq!(
            result,
            Err(SchemeError::CapacityExceeded {
                requested: 11,
                capacity: 10,
                weight: 2,
                ports: 5
            })
        );
        assert!(generate_sequences(1, SchemeMode::FixedWeight { weight: 6 }, 5).is_err());
    }

    #[test]
    fn test_digit_tuples_strip_zeros() {
        let scheme =
            generate_sequences(5, SchemeMode::DigitTuple { alphabet_size: 3 }, 18).unwrap();
        assert_eq!(scheme.columns, 2);
        let digits: Vec<Identifier> = [[0, 1], [0, 2], [0, 3], [1, 1], [1, 2]]
            .iter()
            .map(|d| Identifier::Digits(d.to_vec()))
            .collect();
        // [1, 0] strips to the same identifier as [0, 1] and is skipped
        assert_eq!(scheme.sequences, digits);
    }

    #[test]
    fn test_digit_tuples_single_length() {
        let scheme =
            generate_sequences(3, SchemeMode::DigitTuple { alphabet_size: 3 }, 3).unwrap();
        assert_eq!(scheme.columns, 1);
        assert_eq!(scheme.sequences[2], Identifier::Digits(vec![3]));
    }

    #[test]
    fn test_digit_search_limit() {
        // One digit needs one slot per identifier: 2^25 candidates for 25 identifiers
        assert_eq!(
            generate_sequences(25, SchemeMode::DigitTuple { alphabet_size: 1 }, 20),
            Err(SchemeError::SearchSpaceTooLarge {
                length: 25,
                alphabet: 1
            })
        );
        let scheme =
            generate_sequences(3, SchemeMode::DigitTuple { alphabet_size: 1 }, 20).unwrap();
        assert_eq!(scheme.columns, 3);
        assert_eq!(scheme.sequences[2], Identifier::Digits(vec![1, 1, 1]));
    }

    #[test]
    fn test_digit_alphabet_must_fit_ports() {
        assert_eq!(
            generate_sequences(2, SchemeMode::DigitTuple { alphabet_size: 4 }, 3),
            Err(SchemeError::AlphabetExceedsPorts {
                alphabet: 4,
                ports: 3
            })
        );
    }

    #[test]
    fn test_map_to_ports() {
        let ports = PortList::new(vec![1, 2, 3, 4, 5, 6, 9, 10]).unwrap();
        let mapped = map_to_ports(
            &[Identifier::Digits(vec![0, 7]), bits(&[0, 1, 0, 0, 0, 0, 1])],
            &ports,
        )
        .unwrap();
        assert_eq!(mapped[0], vec![None, Some(9)]);
        assert_eq!(
            mapped[1],
            vec![None, Some(2), None, None, None, None, Some(9)]
        );
    }

    #[test]
    fn test_map_to_ports_out_of_range() {
        let ports = PortList::new(vec![1, 2]).unwrap();
        assert_eq!(
            map_to_ports(&[Identifier::Digits(vec![3])], &ports),
            Err(SchemeError::PortIndexOutOfRange(3))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(bits(&[1, 0, 1]).to_string(), "[1, 0, 1]");
        assert_eq!(Identifier::Digits(vec![2, 0]).to_string(), "[2, 0]");
    }

    proptest! {
        #[test]
        fn prop_fixed_weight_unique(ports in 1usize..10, weight in 1usize..5, n in 0usize..60) {
            prop_assume!(weight <= ports);
            prop_assume!((n as u128) <= binomial(ports, weight));
            let scheme = generate_sequences(n, SchemeMode::FixedWeight { weight }, ports).unwrap();
            prop_assert_eq!(scheme.sequences.len(), n);
            prop_assert!(scheme.columns <= ports);
            let unique: FxHashSet<&Identifier> = scheme.sequences.iter().collect();
            prop_assert_eq!(unique.len(), n);
            for seq in scheme.sequences.iter() {
                prop_assert_eq!(seq.weight(), weight);
                prop_assert_eq!(seq.len(), scheme.columns);
            }
        }

        #[test]
        fn prop_digit_tuples_unique(alphabet in 2usize..5, n in 1usize..40) {
            let scheme = generate_sequences(n, SchemeMode::DigitTuple { alphabet_size: alphabet }, 8).unwrap();
            prop_assert_eq!(scheme.sequences.len(), n);
            let unique: FxHashSet<Vec<usize>> = scheme.sequences.iter().map(|s| s.canonical()).collect();
            prop_assert_eq!(unique.len(), n);
        }

        #[test]
        fn prop_port_mapping_round_trip(weight in 1usize..4, n in 1usize..30) {
            let ports = PortList::default();
            prop_assume!((n as u128) <= binomial(ports.len(), weight));
            for mode in [SchemeMode::FixedWeight { weight }, SchemeMode::DigitTuple { alphabet_size: weight + 1 }] {
                let scheme = generate_sequences(n, mode, ports.len()).unwrap();
                let mapped = map_to_ports(&scheme.sequences, &ports).unwrap();
                for (original, seq) in scheme.sequences.iter().zip(mapped.iter()) {
                    prop_assert_eq!(&decode_ports(seq, &ports, mode).unwrap(), original);
                }
            }
        }
    }
}
