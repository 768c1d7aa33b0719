//! Gradient-boosted tree ensemble loaded from XGBoost's JSON model format.
//!
//! Supports `gbtree` boosters with numerical splits and the
//! `multi:softprob`, `multi:softmax` and `binary:logistic` objectives, which
//! covers models written by `Booster.save_model("model.json")` for this
//! classifier.
//!
//! Evaluation follows XGBoost: feature values and split thresholds are
//! compared in single precision, `value < threshold` goes left, missing
//! (`NaN`) values follow the node's default direction, and each tree's leaf
//! value is added to the margin of the class group listed in `tree_info`.

use std::path::Path;

use serde::Deserialize;

use crate::{Classifier, ClassifierError};

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: ObjectiveParam,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<GbTreeModel>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModel {
    tree_info: Vec<usize>,
    trees: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f64>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<u8>,
}

/// Older writers emit `default_left` as booleans, newer ones as 0/1.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    const fn is_set(self) -> bool {
        match self {
            Self::Bool(b) => b,
            Self::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
    num_class: String,
    num_feature: String,
}

#[derive(Debug, Deserialize)]
struct ObjectiveParam {
    name: String,
}

/// Output transform applied to the summed margins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Softmax over class margins.
    MultiSoftprob,
    /// Same margins as softprob; XGBoost itself only reports the class.
    MultiSoftmax,
    /// Sigmoid over a single margin.
    BinaryLogistic,
}

impl Objective {
    fn parse(name: &str) -> Result<Self, ClassifierError> {
        match name {
            "multi:softprob" => Ok(Self::MultiSoftprob),
            "multi:softmax" => Ok(Self::MultiSoftmax),
            "binary:logistic" => Ok(Self::BinaryLogistic),
            other => Err(ClassifierError::Unsupported {
                message: format!("objective {other}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    left: usize,
    right: usize,
    split_index: usize,
    split_condition: f32,
    default_left: bool,
    is_leaf: bool,
    leaf_value: f64,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_raw(raw: &RawTree, num_feature: usize) -> Result<Self, ClassifierError> {
        let n = raw.left_children.len();
        if raw.right_children.len() != n
            || raw.split_indices.len() != n
            || raw.split_conditions.len() != n
            || raw.default_left.len() != n
        {
            return Err(ClassifierError::Invalid {
                message: "tree node arrays have different lengths".to_string(),
            });
        }
        if n == 0 {
            return Err(ClassifierError::Invalid {
                message: "tree has no nodes".to_string(),
            });
        }
        if raw.split_type.iter().any(|t| *t != 0) {
            return Err(ClassifierError::Unsupported {
                message: "categorical splits".to_string(),
            });
        }

        let child = |idx: i32| -> Result<usize, ClassifierError> {
            usize::try_from(idx)
                .ok()
                .filter(|i| *i < n)
                .ok_or_else(|| ClassifierError::Invalid {
                    message: format!("child index {idx} out of range for {n} nodes"),
                })
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let is_leaf = raw.left_children[i] == -1;
            let (left, right) = if is_leaf {
                (0, 0)
            } else {
                (child(raw.left_children[i])?, child(raw.right_children[i])?)
            };
            if !is_leaf && raw.split_indices[i] >= num_feature {
                return Err(ClassifierError::Invalid {
                    message: format!(
                        "split on feature {} but model has {num_feature} features",
                        raw.split_indices[i]
                    ),
                });
            }
            #[allow(clippy::cast_possible_truncation)]
            let split_condition = raw.split_conditions[i] as f32;
            nodes.push(Node {
                left,
                right,
                split_index: raw.split_indices[i],
                split_condition,
                default_left: raw.default_left[i].is_set(),
                is_leaf,
                leaf_value: raw.split_conditions[i],
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        // Bounded so a cyclic tree can't hang a request.
        for _ in 0..=self.nodes.len() {
            let node = &self.nodes[idx];
            if node.is_leaf {
                return node.leaf_value;
            }
            let value = features[node.split_index];
            let go_left = if value.is_nan() {
                node.default_left
            } else {
                #[allow(clippy::cast_possible_truncation)]
                let value = value as f32;
                value < node.split_condition
            };
            idx = if go_left { node.left } else { node.right };
        }
        log::warn!("Tree walk exceeded node count; treating as zero contribution");
        0.0
    }
}

/// A loaded gradient-boosted tree classifier.
#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    trees: Vec<Tree>,
    tree_groups: Vec<usize>,
    base_margins: Vec<f64>,
    num_class: usize,
    num_feature: usize,
    objective: Objective,
}

impl GradientBoostedTrees {
    /// Parses an XGBoost JSON model.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the JSON is malformed, the booster or
    /// objective is unsupported, or the trees are inconsistent.
    pub fn from_json(json: &str) -> Result<Self, ClassifierError> {
        let file: ModelFile = serde_json::from_str(json)?;
        let learner = file.learner;

        if learner.gradient_booster.name != "gbtree" {
            return Err(ClassifierError::Unsupported {
                message: format!("booster {}", learner.gradient_booster.name),
            });
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or_else(|| ClassifierError::Invalid {
                message: "gbtree booster has no model".to_string(),
            })?;

        let objective = Objective::parse(&learner.objective.name)?;
        let params = &learner.learner_model_param;
        let num_feature = parse_param::<usize>("num_feature", &params.num_feature)?;
        let declared_classes = parse_param::<usize>("num_class", &params.num_class)?;

        let (num_class, groups) = match objective {
            Objective::BinaryLogistic => (2, 1),
            Objective::MultiSoftprob | Objective::MultiSoftmax => {
                if declared_classes < 2 {
                    return Err(ClassifierError::Invalid {
                        message: format!("multi-class objective with num_class {declared_classes}"),
                    });
                }
                (declared_classes, declared_classes)
            }
        };

        if model.tree_info.len() != model.trees.len() {
            return Err(ClassifierError::Invalid {
                message: format!(
                    "tree_info has {} entries for {} trees",
                    model.tree_info.len(),
                    model.trees.len()
                ),
            });
        }
        if let Some(bad) = model.tree_info.iter().find(|g| **g >= groups) {
            return Err(ClassifierError::Invalid {
                message: format!("tree assigned to group {bad} of {groups}"),
            });
        }

        let base_margins = base_margins(&params.base_score, groups, objective)?;

        let trees = model
            .trees
            .iter()
            .map(|raw| Tree::from_raw(raw, num_feature))
            .collect::<Result<Vec<_>, _>>()?;

        log::info!(
            "Loaded {} trees ({num_class} classes, {num_feature} features, {objective:?})",
            trees.len()
        );

        Ok(Self {
            trees,
            tree_groups: model.tree_info,
            base_margins,
            num_class,
            num_feature,
            objective,
        })
    }

    /// Reads and parses a model file.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError`] if the file can't be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let json = std::fs::read_to_string(path).map_err(|source| ClassifierError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The model's objective.
    #[must_use]
    pub const fn objective(&self) -> Objective {
        self.objective
    }

    /// Summed margins per output group.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::FeatureCount`] on a length mismatch.
    pub fn margins(&self, features: &[f64]) -> Result<Vec<f64>, ClassifierError> {
        self.check_features(features)?;
        let mut margins = self.base_margins.clone();
        for (tree, group) in self.trees.iter().zip(&self.tree_groups) {
            margins[*group] += tree.leaf_value(features);
        }
        Ok(margins)
    }
}

impl Classifier for GradientBoostedTrees {
    fn num_features(&self) -> usize {
        self.num_feature
    }

    fn num_classes(&self) -> usize {
        self.num_class
    }

    fn classify(&self, features: &[f64]) -> Result<usize, ClassifierError> {
        let margins = self.margins(features)?;
        Ok(match self.objective {
            Objective::BinaryLogistic => usize::from(margins[0] > 0.0),
            Objective::MultiSoftprob | Objective::MultiSoftmax => argmax(&margins),
        })
    }

    fn classify_proba(&self, features: &[f64]) -> Result<Option<Vec<f64>>, ClassifierError> {
        let margins = self.margins(features)?;
        Ok(Some(match self.objective {
            Objective::BinaryLogistic => {
                let p = sigmoid(margins[0]);
                vec![1.0 - p, p]
            }
            Objective::MultiSoftprob | Objective::MultiSoftmax => softmax(&margins),
        }))
    }
}

fn parse_param<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ClassifierError> {
    value.trim().parse().map_err(|_| ClassifierError::Invalid {
        message: format!("{name} {value:?} is not a number"),
    })
}

/// Parses `base_score`, which newer writers store as a bracketed list
/// (one entry per output group) and older ones as a single number.
fn base_margins(
    raw: &str,
    groups: usize,
    objective: Objective,
) -> Result<Vec<f64>, ClassifierError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let scores = trimmed
        .split(',')
        .map(|s| parse_param::<f64>("base_score", s))
        .collect::<Result<Vec<_>, _>>()?;

    let scores = match scores.len() {
        1 => vec![scores[0]; groups],
        n if n == groups => scores,
        n => {
            return Err(ClassifierError::Invalid {
                message: format!("base_score has {n} entries for {groups} groups"),
            });
        }
    };

    Ok(match objective {
        Objective::BinaryLogistic => scores.into_iter().map(logit).collect(),
        Objective::MultiSoftprob | Objective::MultiSoftmax => scores,
    })
}

fn logit(p: f64) -> f64 {
    let p = p.clamp(1e-16, 1.0 - 1e-16);
    (p / (1.0 - p)).ln()
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(margins: &[f64]) -> Vec<f64> {
    let max = margins.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = margins.iter().map(|m| (m - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest margin; ties go to the lowest index.
fn argmax(margins: &[f64]) -> usize {
    let mut best = 0;
    for (idx, m) in margins.iter().enumerate() {
        if *m > margins[best] {
            best = idx;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// One stump per class, all splitting on feature 0 at 0.5.
    /// Class `c` gets `left[c]` below the threshold and `right[c]` above.
    fn stump_model(left: &[f64], right: &[f64], objective: &str, base_score: &str) -> String {
        let trees: Vec<serde_json::Value> = left
            .iter()
            .zip(right)
            .enumerate()
            .map(|(id, (l, r))| {
                json!({
                    "id": id,
                    "left_children": [1, -1, -1],
                    "right_children": [2, -1, -1],
                    "parents": [2_147_483_647, 0, 0],
                    "split_indices": [0, 0, 0],
                    "split_conditions": [0.5, l, r],
                    "default_left": [1, 0, 0],
                    "split_type": [0, 0, 0],
                    "base_weights": [0.0, l, r]
                })
            })
            .collect();
        let tree_info: Vec<usize> = (0..left.len()).collect();
        let num_class = if objective == "binary:logistic" {
            0
        } else {
            left.len()
        };
        json!({
            "learner": {
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {
                        "tree_info": tree_info,
                        "trees": trees
                    }
                },
                "learner_model_param": {
                    "base_score": base_score,
                    "num_class": num_class.to_string(),
                    "num_feature": "3"
                },
                "objective": { "name": objective }
            },
            "version": [2, 0, 3]
        })
        .to_string()
    }

    #[test]
    fn multiclass_picks_highest_margin() {
        let json = stump_model(&[1.0, 0.0, -1.0], &[-1.0, 0.2, 2.0], "multi:softprob", "5E-1");
        let model = GradientBoostedTrees::from_json(&json).unwrap();

        assert_eq!(model.num_classes(), 3);
        assert_eq!(model.classify(&[0.0, 9.0, 9.0]).unwrap(), 0);
        assert_eq!(model.classify(&[1.0, 9.0, 9.0]).unwrap(), 2);
    }

    #[test]
    fn probabilities_are_a_distribution() {
        let json = stump_model(&[1.0, 0.0, -1.0], &[-1.0, 0.2, 2.0], "multi:softprob", "5E-1");
        let model = GradientBoostedTrees::from_json(&json).unwrap();
        let proba = model.classify_proba(&[0.0, 0.0, 0.0]).unwrap().unwrap();

        assert_eq!(proba.len(), 3);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(proba.iter().all(|p| *p >= 0.0));
        assert!(proba[0] > proba[1] && proba[1] > proba[2]);

        let e = [1.0_f64.exp(), 1.0, (-1.0_f64).exp()];
        let total: f64 = e.iter().sum();
        assert!((proba[0] - e[0] / total).abs() < 1e-12);
    }

    #[test]
    fn missing_value_follows_default_direction() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "multi:softprob", "0.5");
        let model = GradientBoostedTrees::from_json(&json).unwrap();
        assert_eq!(model.classify(&[f64::NAN, 0.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn threshold_is_strict_less_than() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "multi:softprob", "0.5");
        let model = GradientBoostedTrees::from_json(&json).unwrap();
        assert_eq!(model.classify(&[0.5, 0.0, 0.0]).unwrap(), 1);
        assert_eq!(model.classify(&[0.499, 0.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn binary_logistic_uses_logit_base_score() {
        let json = stump_model(&[-2.0], &[2.0], "binary:logistic", "5E-1");
        let model = GradientBoostedTrees::from_json(&json).unwrap();

        assert_eq!(model.num_classes(), 2);
        assert_eq!(model.classify(&[0.0, 0.0, 0.0]).unwrap(), 0);
        assert_eq!(model.classify(&[1.0, 0.0, 0.0]).unwrap(), 1);

        let proba = model.classify_proba(&[1.0, 0.0, 0.0]).unwrap().unwrap();
        assert!((proba[1] - sigmoid(2.0)).abs() < 1e-12);
        assert!((proba[0] + proba[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn bracketed_base_score_per_group() {
        let json = stump_model(&[0.0, 0.0], &[0.0, 0.0], "multi:softprob", "[1E0,3E0]");
        let model = GradientBoostedTrees::from_json(&json).unwrap();
        assert_eq!(model.margins(&[0.0, 0.0, 0.0]).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn wrong_feature_count_is_rejected() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "multi:softprob", "0.5");
        let model = GradientBoostedTrees::from_json(&json).unwrap();
        assert!(matches!(
            model.classify(&[0.0; 25]),
            Err(ClassifierError::FeatureCount {
                expected: 3,
                actual: 25
            })
        ));
        assert!(model.classify_proba(&[]).is_err());
    }

    #[test]
    fn unsupported_objective_is_rejected() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "reg:squarederror", "0.5");
        assert!(matches!(
            GradientBoostedTrees::from_json(&json),
            Err(ClassifierError::Unsupported { .. })
        ));
    }

    #[test]
    fn categorical_splits_are_rejected() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "multi:softprob", "0.5")
            .replace("\"split_type\":[0,0,0]", "\"split_type\":[1,0,0]");
        assert!(matches!(
            GradientBoostedTrees::from_json(&json),
            Err(ClassifierError::Unsupported { .. })
        ));
    }

    #[test]
    fn out_of_range_children_are_rejected() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "multi:softprob", "0.5")
            .replace("\"right_children\":[2,-1,-1]", "\"right_children\":[7,-1,-1]");
        let err = GradientBoostedTrees::from_json(&json).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }

    #[test]
    fn boolean_default_left_is_accepted() {
        let json = stump_model(&[1.0, 0.0], &[-1.0, 0.5], "multi:softprob", "0.5")
            .replace("\"default_left\":[1,0,0]", "\"default_left\":[true,false,false]");
        let model = GradientBoostedTrees::from_json(&json).unwrap();
        assert_eq!(model.classify(&[f64::NAN, 0.0, 0.0]).unwrap(), 0);
    }
}
