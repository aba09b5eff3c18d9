//! Gradient-boosted decision trees for binary classification.
//!
//! Trees are fit on the logistic loss with second-order (gradient/hessian)
//! leaf weights and exact greedy splits. Each tree is stored as a flat node
//! array so a fitted model serializes to plain JSON.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Probabilities are clipped to this margin when deriving the base score
const PROB_EPSILON: f64 = 1e-6;

/// Splits gaining less than this are not taken
const MIN_SPLIT_GAIN: f64 = 1e-9;

/// Boosting hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GbdtParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// L2 penalty on leaf weights
    pub lambda: f64,
    /// Minimum hessian sum in each child of a split
    pub min_child_weight: f64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 5,
            learning_rate: 0.1,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

/// One node of a flattened tree; children are indices into the node array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Walk from the root; `x < threshold` goes left
    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if x < *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value }) => return *value,
                None => return 0.0,
            }
        }
    }

    /// Flat node array, root first
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Longest root-to-leaf path in edges
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

/// Gradient statistics over one training batch
struct TreeBuilder<'a> {
    features: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a GbdtParams,
    n_features: usize,
    nodes: Vec<Node>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl<'a> TreeBuilder<'a> {
    fn build(mut self, rows: Vec<usize>) -> RegressionTree {
        self.grow(rows, 0);
        RegressionTree { nodes: self.nodes }
    }

    /// Push the subtree for `rows` and return its root index
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let (g, h) = self.sums(&rows);
        self.nodes.push(Node::Leaf {
            value: self.leaf_weight(g, h),
        });

        if depth >= self.params.max_depth || rows.len() < 2 {
            return idx;
        }
        let Some(best) = self.best_split(&rows, g, h) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&r| self.features[r][best.feature] < best.threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    fn leaf_weight(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.lambda) * self.params.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.lambda)
    }

    fn best_split(&self, rows: &[usize], g_total: f64, h_total: f64) -> Option<SplitCandidate> {
        let parent = self.score(g_total, h_total);
        let mut best: Option<SplitCandidate> = None;
        let mut order = rows.to_vec();

        for feature in 0..self.n_features {
            order.sort_by(|&a, &b| {
                self.features[a][feature].total_cmp(&self.features[b][feature])
            });

            let (mut g_left, mut h_left) = (0.0, 0.0);
            for pair in order.windows(2) {
                let (cur, next) = (pair[0], pair[1]);
                g_left += self.grad[cur];
                h_left += self.hess[cur];

                let x_cur = self.features[cur][feature];
                let x_next = self.features[next][feature];
                if x_cur >= x_next {
                    continue;
                }
                let (g_right, h_right) = (g_total - g_left, h_total - h_left);
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight
                {
                    continue;
                }

                let gain = self.score(g_left, h_left) + self.score(g_right, h_right) - parent;
                if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(SplitCandidate {
                        feature,
                        threshold: x_cur + (x_next - x_cur) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Boosted ensemble predicting P(fraud)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    params: GbdtParams,
    /// Log-odds of the training positive rate
    base_score: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedClassifier {
    /// Fit on a dense feature matrix with 0/1 labels
    pub fn fit(features: &[Vec<f64>], labels: &[f64], params: GbdtParams) -> Result<Self> {
        if features.is_empty() {
            return Err(PipelineError::EmptyDataset { stage: "train" });
        }
        if features.len() != labels.len() {
            return Err(PipelineError::schema_mismatch(
                "<target>",
                format!("{} feature rows but {} labels", features.len(), labels.len()),
            ));
        }
        let n_features = features[0].len();
        if let Some(i) = features.iter().position(|row| row.len() != n_features) {
            return Err(PipelineError::schema_mismatch(
                "<features>",
                format!("row {} has {} features, expected {}", i, features[i].len(), n_features),
            ));
        }
        if let Some(bad) = labels.iter().find(|y| **y != 0.0 && **y != 1.0) {
            return Err(PipelineError::schema_mismatch(
                "<target>",
                format!("labels must be 0 or 1, got {}", bad),
            ));
        }

        let positive_rate = labels.iter().sum::<f64>() / labels.len() as f64;
        let p = positive_rate.clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
        let base_score = (p / (1.0 - p)).ln();

        let mut raw = vec![base_score; features.len()];
        let mut grad = vec![0.0; features.len()];
        let mut hess = vec![0.0; features.len()];
        let mut trees = Vec::with_capacity(params.n_trees);
        let all_rows: Vec<usize> = (0..features.len()).collect();

        for round in 0..params.n_trees {
            for i in 0..features.len() {
                let prob = sigmoid(raw[i]);
                grad[i] = prob - labels[i];
                hess[i] = (prob * (1.0 - prob)).max(PROB_EPSILON);
            }
            let tree = TreeBuilder {
                features,
                grad: &grad,
                hess: &hess,
                params: &params,
                n_features,
                nodes: Vec::new(),
            }
            .build(all_rows.clone());

            for (i, row) in features.iter().enumerate() {
                raw[i] += tree.predict(row);
            }
            if round % 25 == 0 {
                debug!(round, nodes = tree.nodes().len(), "Boosting round");
            }
            trees.push(tree);
        }

        Ok(Self {
            params,
            base_score,
            n_features,
            trees,
        })
    }

    /// P(fraud) for one feature vector
    pub fn predict_proba(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(PipelineError::schema_mismatch(
                "<features>",
                format!(
                    "model expects {} features, got {}",
                    self.n_features,
                    features.len()
                ),
            ));
        }
        let raw = self.base_score + self.trees.iter().map(|t| t.predict(features)).sum::<f64>();
        Ok(sigmoid(raw))
    }

    /// Hard label at the 0.5 cut
    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        Ok(if self.predict_proba(features)? >= 0.5 {
            1.0
        } else {
            0.0
        })
    }

    /// Width of the feature rows the model was fitted on
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of boosting rounds kept
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Hyper-parameters used to fit
    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Boosted trees in fit order
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }
}
