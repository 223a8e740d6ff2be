use serde::{Deserialize, Serialize};
use crate::classifier::tfidf::SparseVector;

/// Multinomial logistic regression over sparse features
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub(crate) struct SoftmaxRegression {
    /// One row per class
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

pub(crate) struct TrainingParams {
    pub(crate) learning_rate: f64,
    pub(crate) iterations: usize,
    pub(crate) l2_penalty: f64,
}

impl SoftmaxRegression {
    /// Full-batch gradient descent on the cross-entropy loss, starting from zero weights
    pub(crate) fn fit(samples: &[SparseVector], targets: &[usize], classes: usize, features: usize,
                      params: &TrainingParams) -> SoftmaxRegression {
        let mut model = SoftmaxRegression {
            weights: vec![vec![0.0; features]; classes],
            bias: vec![0.0; classes],
        };
        if samples.is_empty() || classes == 0 {
            return model;
        }

        let n = samples.len() as f64;
        for _ in 0..params.iterations {
            let mut weight_gradient = vec![vec![0.0; features]; classes];
            let mut bias_gradient = vec![0.0; classes];

            for (x, &y) in samples.iter().zip(targets) {
                let probabilities = model.probabilities(x);
                for (class, p) in probabilities.iter().enumerate() {
                    let error = p - if class == y { 1.0 } else { 0.0 };
                    bias_gradient[class] += error;
                    for &(feature, value) in x {
                        weight_gradient[class][feature] += error * value;
                    }
                }
            }

            for class in 0..classes {
                for feature in 0..features {
                    let w = model.weights[class][feature];
                    model.weights[class][feature] -= params.learning_rate * (weight_gradient[class][feature] / n + params.l2_penalty * w);
                }
                model.bias[class] -= params.learning_rate * bias_gradient[class] / n;
            }
        }

        model
    }

    pub(crate) fn classes(&self) -> usize {
        self.bias.len()
    }

    pub(crate) fn probabilities(&self, x: &SparseVector) -> Vec<f64> {
        let logits: Vec<f64> = self.weights.iter()
            .zip(&self.bias)
            .map(|(w, b)| b + x.iter().map(|&(feature, value)| w[feature] * value).sum::<f64>())
            .collect();

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let exp: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exp.iter().sum();
        exp.into_iter().map(|e| e / total).collect()
    }

    /// Most probable class and its probability. Equal probabilities keep the lowest class index.
    pub(crate) fn predict(&self, x: &SparseVector) -> (usize, f64) {
        let probabilities = self.probabilities(x);
        let mut best = (0, f64::NEG_INFINITY);
        for (class, &p) in probabilities.iter().enumerate() {
            if p > best.1 {
                best = (class, p);
            }
        }
        best
    }
}
