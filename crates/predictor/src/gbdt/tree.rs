//! Decision tree structures for ensemble inference
//!
//! Trees are flat node arrays (node 0 is the root). Splits compare the
//! widened feature value against an `f64` threshold with `<=`; a NaN input
//! fails the comparison and routes right.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the encoded feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` holds the tree's contribution
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    #[serde(rename = "feature", alias = "feature_idx")]
    pub feature_idx: i32,

    /// Split threshold; `value <= threshold` goes left
    pub threshold: f64,

    /// Leaf value (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<f64>,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(id: i32, feature_idx: i32, threshold: f64, left: i32, right: i32) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    /// Tree nodes (node 0 is the root)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk the tree for `features` and return the reached leaf value
    ///
    /// A tree that never passed [`Tree::validate`] may still be malformed, so
    /// the walk checks every index it follows and gives up once it has taken
    /// more steps than the tree has nodes.
    pub fn evaluate(&self, features: &[f32]) -> Result<f64, String> {
        let mut idx = 0usize;
        for _ in 0..=self.nodes.len() {
            let node = self
                .nodes
                .get(idx)
                .ok_or_else(|| format!("Node index {idx} out of range"))?;
            if let Some(value) = node.leaf {
                return Ok(value);
            }
            let value = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|f| features.get(f))
                .map(|&v| f64::from(v))
                .ok_or_else(|| {
                    format!(
                        "Node {idx} has invalid feature index {} (features: {})",
                        node.feature_idx,
                        features.len()
                    )
                })?;
            // NaN <= t is false: missing features always take the right branch.
            let child = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            idx = usize::try_from(child)
                .map_err(|_| format!("Node {idx} has invalid child: {child}"))?;
        }
        Err(format!(
            "No leaf reached within {} steps; the tree has a cycle",
            self.nodes.len() + 1
        ))
    }

    /// Number of leaves in the tree
    pub fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Validate tree structure against a feature count
    pub fn validate(&self, num_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let len = self.nodes.len();
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    None => return Err(format!("Leaf node {i} has no leaf value")),
                    Some(v) if !v.is_finite() => {
                        return Err(format!("Leaf node {i} has non-finite value {v}"))
                    }
                    Some(_) => {}
                }
                continue;
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= num_features {
                return Err(format!(
                    "Node {} has invalid feature index {} (features: {})",
                    i, node.feature_idx, num_features
                ));
            }
            if !node.threshold.is_finite() {
                return Err(format!("Node {i} has non-finite threshold"));
            }
            // Children must point forward, which rules out cycles.
            for (side, child) in [("left", node.left), ("right", node.right)] {
                if child <= i as i32 || child as usize >= len {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        // if feature[0] <= 50 then 100 else 200
        Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::leaf(1, 100.0),
            Node::leaf(2, 200.0),
        ])
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 12.5, 1, 2);
        assert_eq!(internal.feature_idx, 3);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(1, -2.5);
        assert_eq!(leaf.feature_idx, -1);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.leaf, Some(-2.5));
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30.0]).unwrap(), 100.0);
        assert_eq!(tree.evaluate(&[50.0]).unwrap(), 100.0); // equal goes left
        assert_eq!(tree.evaluate(&[60.0]).unwrap(), 200.0);
    }

    #[test]
    fn test_nan_routes_right() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[f32::NAN]).unwrap(), 200.0);
    }

    #[test]
    fn test_deeper_walk() {
        let tree = Tree::new(vec![
            Node::internal(0, 1, 72.0, 1, 4),
            Node::internal(1, 0, 10.0, 2, 3),
            Node::leaf(2, 1.0),
            Node::leaf(3, 2.0),
            Node::leaf(4, 3.0),
        ]);
        assert_eq!(tree.evaluate(&[5.0, 70.0]).unwrap(), 1.0);
        assert_eq!(tree.evaluate(&[15.0, 70.0]).unwrap(), 2.0);
        assert_eq!(tree.evaluate(&[f32::NAN, 70.0]).unwrap(), 2.0);
        assert_eq!(tree.evaluate(&[5.0, f32::NAN]).unwrap(), 3.0);
        assert_eq!(tree.num_leaves(), 3);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(1).is_ok());

        // feature index out of range for the schema
        assert!(stump().validate(0).is_err());

        let out_of_bounds = Tree::new(vec![
            Node::internal(0, 0, 50.0, 5, 2),
            Node::leaf(1, 100.0),
            Node::leaf(2, 200.0),
        ]);
        assert!(out_of_bounds.validate(1).is_err());

        let cycle = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::internal(1, 0, 10.0, 0, 2),
            Node::leaf(2, 1.0),
        ]);
        assert!(cycle.validate(1).is_err());

        let bad_leaf = Tree::new(vec![Node::leaf(0, f64::INFINITY)]);
        assert!(bad_leaf.validate(1).is_err());

        assert!(Tree::new(vec![]).validate(1).is_err());
    }

    #[test]
    fn test_unvalidated_cycle_is_an_error() {
        let self_loop = Tree::new(vec![Node::internal(0, 0, 1.0, 0, 0)]);
        assert!(self_loop.evaluate(&[0.5]).unwrap_err().contains("cycle"));

        let back_edge = Tree::new(vec![
            Node::internal(0, 0, 50.0, 1, 2),
            Node::internal(1, 0, 10.0, 0, 2),
            Node::leaf(2, 1.0),
        ]);
        assert!(back_edge.evaluate(&[5.0]).is_err());
        assert_eq!(back_edge.evaluate(&[20.0]).unwrap(), 1.0);
    }

    #[test]
    fn test_unvalidated_indices_are_errors() {
        let wide = Tree::new(vec![
            Node::internal(0, 7, 1.0, 1, 2),
            Node::leaf(1, 1.0),
            Node::leaf(2, 2.0),
        ]);
        assert!(wide.evaluate(&[0.5]).is_err());

        let dangling = Tree::new(vec![Node::internal(0, 0, 1.0, 1, 9)]);
        assert!(dangling.evaluate(&[5.0]).is_err());
        assert!(Tree::new(vec![]).evaluate(&[5.0]).is_err());

        let single_leaf = Tree::new(vec![Node::leaf(0, 1.0)]);
        assert_eq!(single_leaf.evaluate(&[]).unwrap(), 1.0);
    }
}
