//! Tree-ensemble inference
//!
//! The ensemble is data, not code: a list of trees, each a flat node array,
//! interpreted by a small walker. Model format (canonical JSON):
//!
//! ```json
//! {
//!   "base_score": 0.0,
//!   "feature_names": ["n_vars", "n_cstrs", "total_nnz", "mem_total_mb"],
//!   "name": "cpufj",
//!   "trees": [
//!     {"nodes": [
//!       {"feature":1,"id":0,"leaf":null,"left":1,"right":2,"threshold":72.5},
//!       {"feature":-1,"id":1,"leaf":156.8,"left":-1,"right":-1,"threshold":0.0},
//!       {"feature":-1,"id":2,"leaf":233.2,"left":-1,"right":-1,"threshold":0.0}
//!     ]}
//!   ],
//!   "version": 1
//! }
//! ```
//!
//! # Missing values
//!
//! A missing feature arrives as NaN. Splits test `value <= threshold`, which
//! is false for NaN, so missing values always follow the right branch. There
//! is no separate missing-value flag; trained models rely on this routing.

pub mod model;
pub mod tree;

pub use model::{EnsembleModel, MODEL_VERSION, VALUE_TYPE};
pub use tree::{Node, Tree};
