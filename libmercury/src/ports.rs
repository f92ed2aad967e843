use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};

use super::constants::DEFAULT_PORTS;
use super::error::PortListError;

/// Identifier of a physical fluidic/laser delivery channel
pub type Port = u32;

/// The ordered set of ports available on the rig.
///
/// Valid ports are not a contiguous range (the default rig skips port 20), so the list is
/// kept exactly as given. Order matters: slot `i` of a bit vector and digit `i + 1` of a
/// digit tuple both refer to the `i`-th entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Port>", into = "Vec<Port>")]
pub struct PortList {
    ports: Vec<Port>,
}

impl PortList {
    pub fn new(ports: Vec<Port>) -> Result<Self, PortListError> {
        if ports.is_empty() {
            return Err(PortListError::Empty);
        }
        let mut seen = FxHashSet::default();
        for port in ports.iter() {
            if !seen.insert(*port) {
                return Err(PortListError::Duplicate(*port));
            }
        }
        Ok(Self { ports })
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Port> {
        self.ports.get(index).copied()
    }

    /// Position of a port in the list, if present
    pub fn position(&self, port: Port) -> Option<usize> {
        self.ports.iter().position(|p| *p == port)
    }

    pub fn iter(&self) -> impl Iterator<Item = Port> + '_ {
        self.ports.iter().copied()
    }

    pub fn as_slice(&self) -> &[Port] {
        &self.ports
    }
}

impl Default for PortList {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.to_vec(),
        }
    }
}

impl TryFrom<Vec<Port>> for PortList {
    type Error = PortListError;

    fn try_from(value: Vec<Port>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PortList> for Vec<Port> {
    fn from(value: PortList) -> Self {
        value.ports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skips_port_20() {
        let ports = PortList::default();
        assert_eq!(ports.len(), 20);
        assert_eq!(ports.position(20), None);
        assert_eq!(ports.get(19), Some(21));
    }

    #[test]
    fn test_rejects_duplicates() {
        assert_eq!(
            PortList::new(vec![1, 2, 3, 2]),
            Err(PortListError::Duplicate(2))
        );
        assert_eq!(PortList::new(vec![]), Err(PortListError::Empty));
    }

    #[test]
    fn test_yaml_keeps_order() {
        let ports: PortList = serde_yaml::from_str("[5, 3, 9]").unwrap();
        assert_eq!(ports.as_slice(), &[5, 3, 9]);
        assert!(serde_yaml::from_str::<PortList>("[5, 5]").is_err());
    }
}
