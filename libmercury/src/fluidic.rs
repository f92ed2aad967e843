//! Instrument visitation order.
//!
//! A fluidic table is built round by round: the outer loop walks identifier slots, the
//! middle loop walks the port list, the inner loop walks fields. The same physical port can
//! therefore come back in a later round, and each return costs a separate actuation. Time
//! estimates and the regrouping below both depend on this exact nesting.
use std::path::PathBuf;

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::bit_scheme::PortSequence;
use super::constants::{DWELL_TIME_S, PORT_SWITCH_S};
use super::error::SchemeError;
use super::field::ImagingField;
use super::ports::{Port, PortList};

/// One instrument instruction: deliver through `port` at a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluidicCommand {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub mask: PathBuf,
    pub port: Port,
}

/// One (slot, port) delivery event and the items it addresses, in item order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub slot: usize,
    pub port: Port,
    pub members: Vec<usize>,
}

/// All ports addressed to one field, recovered from a flat command table
#[derive(Debug, Clone, PartialEq)]
pub struct FieldScheme {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    pub mask: PathBuf,
    pub ports: Vec<Port>,
}

/// Sequential cost model for running a command table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeModel {
    pub dwell_time_s: f64,
    pub port_switch_s: f64,
}

impl Default for TimeModel {
    fn default() -> Self {
        Self {
            dwell_time_s: DWELL_TIME_S,
            port_switch_s: PORT_SWITCH_S,
        }
    }
}

/// Group items into rounds; slot outermost, then port-list order. Empty rounds are skipped.
pub fn plan_rounds(port_sequences: &[PortSequence], port_list: &PortList) -> Vec<Round> {
    let slots = port_sequences.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut rounds = Vec::new();
    for slot in 0..slots {
        for port in port_list.iter() {
            let members: Vec<usize> = port_sequences
                .iter()
                .enumerate()
                .filter(|(_, seq)| seq.get(slot).copied().flatten() == Some(port))
                .map(|(idx, _)| idx)
                .collect();
            if !members.is_empty() {
                rounds.push(Round {
                    slot,
                    port,
                    members,
                });
            }
        }
    }
    rounds
}

/// Expand port sequences into the flat command table the instrument runs
pub fn build_fluidic_table(
    fields: &[ImagingField],
    port_sequences: &[PortSequence],
    port_list: &PortList,
) -> Result<Vec<FluidicCommand>, SchemeError> {
    if fields.len() != port_sequences.len() {
        return Err(SchemeError::LengthMismatch {
            sequences: port_sequences.len(),
            fields: fields.len(),
        });
    }
    let mut commands = Vec::new();
    for round in plan_rounds(port_sequences, port_list) {
        for member in round.members {
            let field = &fields[member];
            commands.push(FluidicCommand {
                x: field.x,
                y: field.y,
                z: field.z,
                mask: field.mask_path.clone(),
                port: round.port,
            });
        }
    }
    Ok(commands)
}

/// Collect, per mask (first-seen order), every port addressed to it.
///
/// Ports keep accumulating on every later sighting of the same mask. Older planning
/// scripts cached a field's list at first sight and are not followed here.
pub fn regroup_by_field(commands: &[FluidicCommand]) -> Vec<FieldScheme> {
    let mut schemes: Vec<FieldScheme> = Vec::new();
    let mut lookup: FxHashMap<&PathBuf, usize> = FxHashMap::default();
    for command in commands {
        match lookup.get(&command.mask) {
            Some(idx) => schemes[*idx].ports.push(command.port),
            None => {
                lookup.insert(&command.mask, schemes.len());
                schemes.push(FieldScheme {
                    x: command.x,
                    y: command.y,
                    z: command.z,
                    mask: command.mask.clone(),
                    ports: vec![command.port],
                });
            }
        }
    }
    schemes
}

/// Walk the table in order: every command dwells, every port change pays the switch penalty
pub fn estimate_time_complexity(commands: &[FluidicCommand], model: &TimeModel) -> f64 {
    let mut total = 0.0;
    let mut current_port = match commands.first() {
        Some(command) => command.port,
        None => return total,
    };
    for command in commands {
        total += model.dwell_time_s;
        if command.port != current_port {
            current_port = command.port;
            total += model.port_switch_s;
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bit_scheme::{binomial, generate_sequences, map_to_ports, SchemeMode};
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn command(mask: &str, port: Port) -> FluidicCommand {
        FluidicCommand {
            x: 0.0,
            y: 0.0,
            z: None,
            mask: PathBuf::from(mask),
            port,
        }
    }

    fn fields(n: usize) -> Vec<ImagingField> {
        (0..n)
            .map(|i| ImagingField {
                x: i as f64 * 100.0,
                y: -(i as f64),
                z: Some(1.5),
                mask_path: PathBuf::from(format!("{}.png", 1000 + i)),
            })
            .collect()
    }

    #[test]
    fn test_loop_nesting_order() {
        let ports = PortList::new(vec![7, 3]).unwrap();
        let seqs = vec![vec![Some(3), Some(7)], vec![Some(7), Some(3)], vec![Some(3), None]];
        let table = build_fluidic_table(&fields(3), &seqs, &ports).unwrap();
        let order: Vec<(String, Port)> = table
            .iter()
            .map(|c| (c.mask.to_string_lossy().to_string(), c.port))
            .collect();
        assert_eq!(
            order,
            vec![
                ("1001.png".to_string(), 7),
                ("1000.png".to_string(), 3),
                ("1002.png".to_string(), 3),
                ("1000.png".to_string(), 7),
                ("1001.png".to_string(), 3),
            ]
        );
    }

    #[test]
    fn test_rounds_skip_empty() {
        let ports = PortList::new(vec![1, 2, 3]).unwrap();
        let seqs = vec![vec![Some(1), None, Some(3)], vec![Some(1), Some(2), None]];
        let rounds = plan_rounds(&seqs, &ports);
        let summary: Vec<(usize, Port, Vec<usize>)> = rounds
            .into_iter()
            .map(|r| (r.slot, r.port, r.members))
            .collect();
        assert_eq!(
            summary,
            vec![(0, 1, vec![0, 1]), (1, 2, vec![1]), (2, 3, vec![0])]
        );
    }

    #[test]
    fn test_length_mismatch() {
        let ports = PortList::default();
        assert!(matches!(
            build_fluidic_table(&fields(2), &[vec![Some(1)]], &ports),
            Err(SchemeError::LengthMismatch {
                sequences: 1,
                fields: 2
            })
        ));
    }

    #[test]
    fn test_regroup_accumulates_every_sighting() {
        // A first-sight cache would report only [5] for a.png
        let table = vec![
            command("a.png", 5),
            command("b.png", 5),
            command("a.png", 9),
            command("a.png", 11),
        ];
        let schemes = regroup_by_field(&table);
        assert_eq!(schemes.len(), 2);
        assert_eq!(schemes[0].mask, PathBuf::from("a.png"));
        assert_eq!(schemes[0].ports, vec![5, 9, 11]);
        assert_eq!(schemes[1].ports, vec![5]);
    }

    #[test]
    fn test_time_same_port() {
        let table = vec![command("a", 5), command("b", 5), command("c", 5)];
        assert_eq!(estimate_time_complexity(&table, &TimeModel::default()), 15.0);
    }

    #[test]
    fn test_time_port_switches() {
        let table = vec![command("a", 5), command("b", 6), command("c", 5)];
        assert_eq!(
            estimate_time_complexity(&table, &TimeModel::default()),
            15.0 + 2.0 * 1140.0
        );
        assert_eq!(estimate_time_complexity(&[], &TimeModel::default()), 0.0);
    }

    proptest! {
        #[test]
        fn prop_regroup_recovers_port_sets(n in 1usize..40, weight in 1usize..4) {
            let ports = PortList::default();
            prop_assume!((n as u128) <= binomial(ports.len(), weight));
            let scheme = generate_sequences(n, SchemeMode::FixedWeight { weight }, ports.len()).unwrap();
            let mapped = map_to_ports(&scheme.sequences, &ports).unwrap();
            let fields = fields(n);
            let table = build_fluidic_table(&fields, &mapped, &ports).unwrap();
            let schemes = regroup_by_field(&table);
            prop_assert_eq!(schemes.len(), n);
            for scheme in schemes {
                let idx = fields.iter().position(|f| f.mask_path == scheme.mask).unwrap();
                let expected: BTreeSet<Port> = mapped[idx].iter().flatten().copied().collect();
                let found: BTreeSet<Port> = scheme.ports.iter().copied().collect();
                prop_assert_eq!(found, expected);
            }
        }
    }
}
