//! Subnet to interface index assignment

use crate::action::ConnectSubnetAction;
use crate::error::{CloudError, Result};

/// Subnet used when a deploy request names no subnets
pub const DEFAULT_SUBNET: &str = "default";

/// Ordered mapping from subnet id to zero-based interface index
///
/// Built once per deploy request. The primary subnet always holds interface
/// 0, since it is the one the instance's network interface is bound to; the
/// other subnets follow in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAssignment {
    entries: Vec<(String, usize)>,
}

impl NetworkAssignment {
    /// Single implicit interface on the default subnet
    pub fn single_default() -> Self {
        Self {
            entries: vec![(DEFAULT_SUBNET.to_string(), 0)],
        }
    }

    /// Assign interface indices to the subnets of `actions`
    ///
    /// The action flagged `isPrimary` is moved to index 0, otherwise the
    /// first action keeps it. Duplicate subnet ids and more than one primary
    /// flag are rejected.
    pub fn from_connect_actions(actions: &[ConnectSubnetAction]) -> Result<Self> {
        if actions.is_empty() {
            return Ok(Self::single_default());
        }

        let mut subnets: Vec<&str> = Vec::with_capacity(actions.len());
        let mut primary = None;
        for (position, action) in actions.iter().enumerate() {
            let subnet_id = action.action_params.subnet_id.as_str();
            if subnets.contains(&subnet_id) {
                return Err(CloudError::InvalidRequest(format!(
                    "subnet {} requested more than once",
                    subnet_id
                )));
            }
            if action.action_params.is_primary {
                if primary.is_some() {
                    return Err(CloudError::InvalidRequest(
                        "more than one subnet marked primary".to_string(),
                    ));
                }
                primary = Some(position);
            }
            subnets.push(subnet_id);
        }

        if let Some(position) = primary {
            let subnet_id = subnets.remove(position);
            subnets.insert(0, subnet_id);
        }

        Ok(Self {
            entries: subnets
                .into_iter()
                .enumerate()
                .map(|(index, id)| (id.to_string(), index))
                .collect(),
        })
    }

    /// Subnet the instance is attached to
    pub fn primary_subnet(&self) -> &str {
        &self.entries[0].0
    }

    pub fn interface_index(&self, subnet_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(id, _)| id == subnet_id)
            .map(|(_, index)| *index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(id, index)| (id.as_str(), *index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ConnectSubnetParams;

    fn connect(id: &str, subnet: &str, is_primary: bool) -> ConnectSubnetAction {
        ConnectSubnetAction {
            action_id: id.to_string(),
            action_params: ConnectSubnetParams {
                subnet_id: subnet.to_string(),
                vnic_name: None,
                is_primary,
            },
        }
    }

    #[test]
    fn test_empty_maps_to_default() {
        let assignment = NetworkAssignment::from_connect_actions(&[]).unwrap();
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment.primary_subnet(), "default");
        assert_eq!(assignment.interface_index("default"), Some(0));
    }

    #[test]
    fn test_indices_follow_input_order() {
        let actions = [
            connect("c1", "web-aaaaaa", false),
            connect("c2", "app-bbbbbb", false),
            connect("c3", "db-cccccc", false),
        ];
        let assignment = NetworkAssignment::from_connect_actions(&actions).unwrap();

        let pairs: Vec<_> = assignment.iter().collect();
        assert_eq!(
            pairs,
            vec![("web-aaaaaa", 0), ("app-bbbbbb", 1), ("db-cccccc", 2)]
        );
        assert_eq!(assignment.primary_subnet(), "web-aaaaaa");
    }

    #[test]
    fn test_explicit_primary_takes_interface_zero() {
        let actions = [
            connect("c1", "web-aaaaaa", false),
            connect("c2", "app-bbbbbb", false),
            connect("c3", "db-cccccc", true),
        ];
        let assignment = NetworkAssignment::from_connect_actions(&actions).unwrap();

        assert_eq!(assignment.primary_subnet(), "db-cccccc");
        let pairs: Vec<_> = assignment.iter().collect();
        assert_eq!(
            pairs,
            vec![("db-cccccc", 0), ("web-aaaaaa", 1), ("app-bbbbbb", 2)]
        );
    }

    #[test]
    fn test_rejects_duplicates_and_two_primaries() {
        let dup = [connect("c1", "web", false), connect("c2", "web", false)];
        assert!(NetworkAssignment::from_connect_actions(&dup).is_err());

        let two = [connect("c1", "a", true), connect("c2", "b", true)];
        assert!(NetworkAssignment::from_connect_actions(&two).is_err());
    }
}
