//! Time-aware train/val/test split and a baseline logistic regression.
//!
//! The fit minimises class-balanced log loss with an L2 penalty of strength
//! `1/C` on the weights (the intercept is not penalised), using full-batch
//! gradient descent on standardised inputs.

use serde::Serialize;

use crate::error::{Result, SignalForgeError};

use super::artifacts::{sigmoid, LogisticModel, ModelMeta, StandardScaler};
use super::dataset::{Dataset, LabeledRow};

#[derive(Debug, Clone, Copy)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.70,
            val: 0.15,
            test: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainParams {
    #[serde(rename = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
    pub tol: f64,
    pub class_weight: &'static str,
    pub threshold: f64,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            learning_rate: 0.1,
            tol: 1e-6,
            class_weight: "balanced",
            threshold: 0.5,
        }
    }
}

/// Chronological split boundaries: `[0, a)`, `[a, b)`, `[b, n)`.
pub fn time_split(n: usize, ratios: SplitRatios) -> Result<(usize, usize)> {
    let total = ratios.train + ratios.val + ratios.test;
    if (total - 1.0).abs() > 1e-6 {
        return Err(SignalForgeError::BadRequest(format!(
            "split ratios must sum to 1, got {total}"
        )));
    }
    let train_end = (n as f64 * ratios.train) as usize;
    let val_end = train_end + (n as f64 * ratios.val) as usize;
    Ok((train_end, val_end.min(n)))
}

/// Fit an L2-regularised, class-balanced logistic regression on already
/// standardised rows.
pub fn fit_logistic(x: &[Vec<f64>], y: &[u8], params: &TrainParams) -> Result<LogisticModel> {
    let Some(first) = x.first() else {
        return Err(SignalForgeError::InsufficientData("no training rows".into()));
    };
    if x.len() != y.len() {
        return Err(SignalForgeError::BadRequest("x and y lengths differ".into()));
    }
    if params.c <= 0.0 {
        return Err(SignalForgeError::BadRequest("C must be > 0".into()));
    }
    let d = first.len();
    let n = x.len() as f64;

    let pos = y.iter().filter(|v| **v == 1).count() as f64;
    let neg = n - pos;
    let weight = |label: u8| -> f64 {
        let count = if label == 1 { pos } else { neg };
        if count > 0.0 {
            n / (2.0 * count)
        } else {
            1.0
        }
    };

    let mut w = vec![0.0; d];
    let mut b = 0.0;
    let l2 = 1.0 / (params.c * n);

    for iter in 0..params.max_iter {
        let mut gw = vec![0.0; d];
        let mut gb = 0.0;
        for (row, &label) in x.iter().zip(y) {
            let z = w.iter().zip(row).map(|(wi, xi)| wi * xi).sum::<f64>() + b;
            let err = (sigmoid(z) - f64::from(label)) * weight(label) / n;
            for (g, xi) in gw.iter_mut().zip(row) {
                *g += err * xi;
            }
            gb += err;
        }
        for (g, wi) in gw.iter_mut().zip(&w) {
            *g += l2 * wi;
        }

        let norm = (gw.iter().map(|g| g * g).sum::<f64>() + gb * gb).sqrt();
        for (wi, g) in w.iter_mut().zip(&gw) {
            *wi -= params.learning_rate * g;
        }
        b -= params.learning_rate * gb;

        if norm < params.tol {
            tracing::debug!(iter, norm, "logistic fit converged");
            break;
        }
    }
    Ok(LogisticModel::new(w, b))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SplitMetrics {
    /// `None` when only one class is present.
    pub auc: Option<f64>,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// `[[tn, fp], [fn, tp]]`
    pub confusion_matrix: [[usize; 2]; 2],
}

/// Rank-based ROC AUC (ties get the average rank).
pub fn roc_auc(y: &[u8], proba: &[f64]) -> Option<f64> {
    let pos = y.iter().filter(|v| **v == 1).count();
    let neg = y.len() - pos;
    if pos == 0 || neg == 0 {
        return None;
    }
    let mut idx: Vec<usize> = (0..proba.len()).collect();
    idx.sort_by(|a, b| proba[*a].total_cmp(&proba[*b]));

    let mut ranks = vec![0.0; proba.len()];
    let mut i = 0;
    while i < idx.len() {
        let mut j = i;
        while j + 1 < idx.len() && proba[idx[j + 1]] == proba[idx[i]] {
            j += 1;
        }
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[idx[k]] = avg;
        }
        i = j + 1;
    }
    let pos_rank_sum: f64 = y.iter().zip(&ranks).filter(|(l, _)| **l == 1).map(|(_, r)| r).sum();
    let pos = pos as f64;
    Some((pos_rank_sum - pos * (pos + 1.0) / 2.0) / (pos * neg as f64))
}

pub fn evaluate(y: &[u8], proba: &[f64], pred: &[u8]) -> SplitMetrics {
    let mut cm = [[0usize; 2]; 2];
    for (t, p) in y.iter().zip(pred) {
        cm[usize::from(*t)][usize::from(*p)] += 1;
    }
    let [[tn, fp], [fneg, tp]] = cm;
    let ratio = |a: usize, b: usize| if b == 0 { 0.0 } else { a as f64 / b as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fneg);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    SplitMetrics {
        auc: roc_auc(y, proba),
        accuracy: ratio(tp + tn, y.len()),
        precision,
        recall,
        f1,
        confusion_matrix: cm,
    }
}

/// Sum of next-bar returns over bars the model would have bought.
pub fn toy_profit(pred: &[u8], ret_next: &[f64]) -> f64 {
    pred.iter().zip(ret_next).filter(|(p, _)| **p == 1).map(|(_, r)| r).sum()
}

#[derive(Debug, Clone, Serialize)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PerSplit<T> {
    pub train: T,
    pub val: T,
    pub test: T,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    pub dataset_path: String,
    pub n_rows: usize,
    pub split: SplitSizes,
    pub features: Vec<String>,
    pub target: String,
    pub model: &'static str,
    pub params: TrainParams,
    pub metrics: PerSplit<SplitMetrics>,
    pub toy_profit_sum: PerSplit<f64>,
}

/// Everything a training run produces.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub model: LogisticModel,
    pub scaler: StandardScaler,
    pub meta: ModelMeta,
    pub report: EvalReport,
}

fn columns(rows: &[LabeledRow]) -> (Vec<Vec<f64>>, Vec<u8>, Vec<f64>) {
    let x = rows.iter().map(|r| r.features.clone()).collect();
    let y = rows.iter().map(|r| r.target).collect();
    let ret = rows.iter().map(|r| r.ret_next).collect();
    (x, y, ret)
}

/// Split, standardise on the train split, fit, and evaluate every split.
pub fn train_and_evaluate(
    ds: &Dataset,
    dataset_path: &str,
    params: TrainParams,
    model_version: &str,
) -> Result<TrainOutcome> {
    let n = ds.rows.len();
    let (a, b) = time_split(n, SplitRatios::default())?;
    let (train, val, test) = (&ds.rows[..a], &ds.rows[a..b], &ds.rows[b..]);

    let (x_tr, y_tr, r_tr) = columns(train);
    let (x_va, y_va, r_va) = columns(val);
    let (x_te, y_te, r_te) = columns(test);

    let scaler = StandardScaler::fit(&x_tr)?;
    let model = fit_logistic(&scaler.transform(&x_tr), &y_tr, &params)?;

    let score = |x: &[Vec<f64>], y: &[u8], ret: &[f64]| {
        let proba: Vec<f64> = x.iter().map(|r| model.proba(&scaler.transform_row(r))).collect();
        let pred: Vec<u8> = proba.iter().map(|p| u8::from(*p >= params.threshold)).collect();
        (evaluate(y, &proba, &pred), toy_profit(&pred, ret))
    };
    let (m_tr, p_tr) = score(&x_tr, &y_tr, &r_tr);
    let (m_va, p_va) = score(&x_va, &y_va, &r_va);
    let (m_te, p_te) = score(&x_te, &y_te, &r_te);

    tracing::info!(
        rows = n,
        train_auc = ?m_tr.auc,
        test_auc = ?m_te.auc,
        test_f1 = m_te.f1,
        "training finished"
    );

    let mut extra = serde_json::Map::new();
    extra.insert(
        "params".into(),
        serde_json::json!({ "C": params.c, "max_iter": params.max_iter, "class_weight": params.class_weight }),
    );
    extra.insert("dataset_path".into(), serde_json::Value::String(dataset_path.to_string()));

    let meta = ModelMeta {
        model_version: Some(model_version.to_string()),
        dataset_version: Some(ds.config.dataset_version.clone()),
        threshold: Some(params.threshold),
        feature_names: Some(ds.feature_names.clone()),
        features: None,
        target: Some(ds.target.clone()),
        model: Some("LogisticRegression".into()),
        extra,
    };

    let report = EvalReport {
        dataset_path: dataset_path.to_string(),
        n_rows: n,
        split: SplitSizes {
            train: train.len(),
            val: val.len(),
            test: test.len(),
        },
        features: ds.feature_names.clone(),
        target: ds.target.clone(),
        model: "LogisticRegression",
        params,
        metrics: PerSplit {
            train: m_tr,
            val: m_va,
            test: m_te,
        },
        toy_profit_sum: PerSplit {
            train: p_tr,
            val: p_va,
            test: p_te,
        },
    };

    Ok(TrainOutcome {
        model,
        scaler,
        meta,
        report,
    })
}
