//! Randomized regression trees over mixed continuous/categorical features.

use super::random_forest::RandomForestConfig;

/// How a split node routes a sample to its left child.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SplitRule {
    /// Left when the feature is `<=` the threshold.
    Threshold(f64),
    /// Left when the (categorical) feature equals the category index.
    Category(usize),
}

impl SplitRule {
    #[allow(clippy::cast_precision_loss)]
    fn goes_left(self, value: f64) -> bool {
        match self {
            Self::Threshold(t) => value <= t,
            Self::Category(c) => (value - c as f64).abs() < 0.5,
        }
    }
}

/// A node in the regression tree (arena-allocated).
#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        mean: f64,
        variance: f64,
    },
    Split {
        feature: usize,
        rule: SplitRule,
        left: usize,
        right: usize,
    },
}

/// Candidate split with its variance reduction.
struct BestSplit {
    score: f64,
    feature: usize,
    rule: SplitRule,
}

/// A regression tree; leaves store the mean and variance of their targets.
#[derive(Debug, Clone)]
pub(crate) struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Build a tree on the samples selected by `indices` (a bootstrap draw).
    ///
    /// `feature_types` holds one entry per column: `0` for continuous, the
    /// category count for categorical columns.
    pub(crate) fn build(
        data: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        feature_types: &[usize],
        config: &RandomForestConfig,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build_node(data, targets, indices, feature_types, 0, config, rng);
        tree
    }

    /// Mean and variance of the leaf `row` falls into.
    pub(crate) fn predict(&self, row: &[f64]) -> (f64, f64) {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { mean, variance } => return (mean, variance),
                TreeNode::Split {
                    feature,
                    rule,
                    left,
                    right,
                } => {
                    idx = if rule.goes_left(row[feature]) {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    fn push_leaf(&mut self, targets: &[f64], indices: &[usize]) -> usize {
        let (mean, variance) = mean_variance(indices.iter().map(|&i| targets[i]));
        let idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { mean, variance });
        idx
    }

    #[allow(clippy::too_many_arguments)]
    fn build_node(
        &mut self,
        data: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        feature_types: &[usize],
        depth: usize,
        config: &RandomForestConfig,
        rng: &mut fastrand::Rng,
    ) -> usize {
        if indices.len() < config.min_samples_split
            || config.max_depth.is_some_and(|d| depth >= d)
        {
            return self.push_leaf(targets, indices);
        }

        #[allow(clippy::float_cmp)]
        if indices.iter().all(|&i| targets[i] == targets[indices[0]]) {
            return self.push_leaf(targets, indices);
        }

        let Some(best) = find_best_split(data, targets, indices, feature_types, config, rng) else {
            return self.push_leaf(targets, indices);
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| best.rule.goes_left(data[i][best.feature]));

        if left_indices.is_empty() || right_indices.is_empty() {
            return self.push_leaf(targets, indices);
        }

        // Reserve slot for this split node (placeholder replaced below)
        let node_idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            mean: 0.0,
            variance: 0.0,
        });

        let left = self.build_node(
            data,
            targets,
            &left_indices,
            feature_types,
            depth + 1,
            config,
            rng,
        );
        let right = self.build_node(
            data,
            targets,
            &right_indices,
            feature_types,
            depth + 1,
            config,
            rng,
        );

        self.nodes[node_idx] = TreeNode::Split {
            feature: best.feature,
            rule: best.rule,
            left,
            right,
        };

        node_idx
    }
}

/// Search a random subset of features for the split with the largest
/// variance reduction.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn find_best_split(
    data: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    feature_types: &[usize],
    config: &RandomForestConfig,
    rng: &mut fastrand::Rng,
) -> Option<BestSplit> {
    let n_features = feature_types.len();
    let max_features = ((n_features as f64 * config.ratio_features).ceil() as usize)
        .max(1)
        .min(n_features);
    let candidates = partial_shuffle(n_features, max_features, rng);

    let (_, total_var) = sum_squares(targets, indices);
    if total_var <= 0.0 {
        return None;
    }

    let mut best: Option<BestSplit> = None;
    let mut consider = |feature: usize, rule: SplitRule| {
        let stats = split_stats(data, targets, indices, feature, rule);
        if stats.left_n < config.min_samples_leaf || stats.right_n < config.min_samples_leaf {
            return;
        }
        let score = total_var - stats.left_sse() - stats.right_sse();
        if score > best.as_ref().map_or(0.0, |b| b.score) {
            best = Some(BestSplit {
                score,
                feature,
                rule,
            });
        }
    };

    for &feat in &candidates {
        if feature_types[feat] > 0 {
            let mut present: Vec<usize> = indices
                .iter()
                .map(|&i| data[i][feat].round().max(0.0) as usize)
                .collect();
            present.sort_unstable();
            present.dedup();
            if present.len() < 2 {
                continue;
            }
            for category in present {
                consider(feat, SplitRule::Category(category));
            }
        } else {
            let mut values: Vec<f64> = indices.iter().map(|&i| data[i][feat]).collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(core::cmp::Ordering::Equal));
            values.dedup();
            for w in values.windows(2) {
                consider(feat, SplitRule::Threshold(f64::midpoint(w[0], w[1])));
            }
        }
    }

    best
}

/// Left/right sums for a candidate split.
struct SplitStats {
    left_sum: f64,
    left_sq: f64,
    left_n: usize,
    right_sum: f64,
    right_sq: f64,
    right_n: usize,
}

impl SplitStats {
    #[allow(clippy::cast_precision_loss)]
    fn left_sse(&self) -> f64 {
        self.left_sq - self.left_sum * self.left_sum / self.left_n as f64
    }

    #[allow(clippy::cast_precision_loss)]
    fn right_sse(&self) -> f64 {
        self.right_sq - self.right_sum * self.right_sum / self.right_n as f64
    }
}

fn split_stats(
    data: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    feature: usize,
    rule: SplitRule,
) -> SplitStats {
    let mut stats = SplitStats {
        left_sum: 0.0,
        left_sq: 0.0,
        left_n: 0,
        right_sum: 0.0,
        right_sq: 0.0,
        right_n: 0,
    };
    for &i in indices {
        let y = targets[i];
        if rule.goes_left(data[i][feature]) {
            stats.left_sum += y;
            stats.left_sq += y * y;
            stats.left_n += 1;
        } else {
            stats.right_sum += y;
            stats.right_sq += y * y;
            stats.right_n += 1;
        }
    }
    stats
}

/// Sum and sum of squared deviations of the selected targets.
#[allow(clippy::cast_precision_loss)]
fn sum_squares(targets: &[f64], indices: &[usize]) -> (f64, f64) {
    let n = indices.len() as f64;
    let sum: f64 = indices.iter().map(|&i| targets[i]).sum();
    let mean = sum / n;
    let sse = indices.iter().map(|&i| (targets[i] - mean).powi(2)).sum();
    (sum, sse)
}

/// Population mean and variance.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_variance(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let (sum, n) = values.clone().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = sum / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    (mean, var.max(0.0))
}

/// Select `k` random indices from `0..n` using partial Fisher-Yates shuffle.
fn partial_shuffle(n: usize, k: usize, rng: &mut fastrand::Rng) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let k = k.min(n);
    for i in 0..k {
        let j = rng.usize(i..n);
        indices.swap(i, j);
    }
    indices.truncate(k);
    indices
}
