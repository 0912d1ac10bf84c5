use std::collections::BTreeMap;
use std::fmt::Debug;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// The model algorithms a training task may be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Svd,
    Svdpp,
    Nmf,
}

impl ModelKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "svd" => Some(Self::Svd),
            "svdpp" => Some(Self::Svdpp),
            "nmf" => Some(Self::Nmf),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Svd => "svd",
            Self::Svdpp => "svdpp",
            Self::Nmf => "nmf",
        }
    }
}

/// A rating after ID mapping: everything numeric, ready for a trainer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappedRating {
    pub user: u32,
    pub movie: u32,
    pub rating: f64,
}

/// Serializable handle to a fitted model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub kind: ModelKind,
    pub global_mean: f64,
    pub user_bias: BTreeMap<u32, f64>,
    pub movie_bias: BTreeMap<u32, f64>,
}

impl FittedModel {
    pub fn predict(&self, user: u32, movie: u32) -> f64 {
        let bu = self.user_bias.get(&user).copied().unwrap_or(0.0);
        let bm = self.movie_bias.get(&movie).copied().unwrap_or(0.0);
        (self.global_mean + bu + bm).clamp(0.5, 5.0)
    }
}

/// Opaque model-training collaborator: the pipeline only ever calls
/// `fit` and `evaluate` and does not care what the algorithm does.
pub trait ModelTrainer: Send + Sync + Debug {
    fn fit(&self, kind: ModelKind, train: &[MappedRating]) -> Result<FittedModel>;

    /// Root-mean-squared error of the model over held-out ratings.
    fn evaluate(&self, model: &FittedModel, test: &[MappedRating]) -> f64;
}

/// Damped-mean bias model standing in for an external matrix-factorization
/// library. Each algorithm flavor gets its own damping constant, so the
/// three variants produce genuinely different errors.
#[derive(Debug, Default)]
pub struct BaselineTrainer;

impl BaselineTrainer {
    fn damping(kind: ModelKind) -> f64 {
        match kind {
            ModelKind::Svd => 25.0,
            ModelKind::Svdpp => 15.0,
            ModelKind::Nmf => 60.0,
        }
    }
}

impl ModelTrainer for BaselineTrainer {
    fn fit(&self, kind: ModelKind, train: &[MappedRating]) -> Result<FittedModel> {
        anyhow::ensure!(!train.is_empty(), "cannot fit a model on zero ratings");

        let global_mean = train.iter().map(|r| r.rating).sum::<f64>() / train.len() as f64;
        let damping = Self::damping(kind);

        let mut user_sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        let mut movie_sums: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
        for r in train {
            let u = user_sums.entry(r.user).or_insert((0.0, 0));
            u.0 += r.rating - global_mean;
            u.1 += 1;
            let m = movie_sums.entry(r.movie).or_insert((0.0, 0));
            m.0 += r.rating - global_mean;
            m.1 += 1;
        }

        let user_bias = user_sums
            .into_iter()
            .map(|(id, (sum, n))| (id, sum / (n as f64 + damping)))
            .collect();
        let movie_bias = movie_sums
            .into_iter()
            .map(|(id, (sum, n))| (id, sum / (n as f64 + damping)))
            .collect();

        Ok(FittedModel {
            kind,
            global_mean,
            user_bias,
            movie_bias,
        })
    }

    fn evaluate(&self, model: &FittedModel, test: &[MappedRating]) -> f64 {
        if test.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = test
            .iter()
            .map(|r| {
                let err = r.rating - model.predict(r.user, r.movie);
                err * err
            })
            .sum();
        (sum_sq / test.len() as f64).sqrt()
    }
}
