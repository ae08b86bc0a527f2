//! Rolling indicators over a price column.
//!
//! Every function returns a vector aligned with its input; positions without a
//! full window are `None`. Windows are recomputed from scratch so a prefix of a
//! series always yields exactly the same values as the full series.

/// Rolling simple moving average.
pub fn sma(xs: &[f64], n: usize) -> Vec<Option<f64>> {
    rolling(xs.iter().map(|x| Some(*x)).collect::<Vec<_>>().as_slice(), n, mean)
}

/// Same as [`sma`] but over a column that may already contain gaps.
pub fn sma_opt(xs: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    rolling(xs, n, mean)
}

/// Relative change over `n` periods: `x[i] / x[i-n] - 1`.
pub fn pct_change(xs: &[f64], n: usize) -> Vec<Option<f64>> {
    (0..xs.len())
        .map(|i| {
            if n == 0 || i < n {
                return None;
            }
            let prev = xs[i - n];
            if prev == 0.0 {
                None
            } else {
                Some(xs[i] / prev - 1.0)
            }
        })
        .collect()
}

/// Rolling sample standard deviation (`ddof = 1`).
pub fn rolling_std(xs: &[Option<f64>], n: usize) -> Vec<Option<f64>> {
    rolling(xs, n, |w| {
        if w.len() < 2 {
            return None;
        }
        let m = w.iter().sum::<f64>() / w.len() as f64;
        let var = w.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (w.len() - 1) as f64;
        Some(var.sqrt())
    })
}

/// RSI from rolling means of gains and losses over `n` diffs.
/// Undefined when the average loss is zero.
pub fn rsi(xs: &[f64], n: usize) -> Vec<Option<f64>> {
    let mut ups = Vec::with_capacity(xs.len());
    let mut downs = Vec::with_capacity(xs.len());
    for i in 0..xs.len() {
        if i == 0 {
            ups.push(None);
            downs.push(None);
            continue;
        }
        let d = xs[i] - xs[i - 1];
        ups.push(Some(d.max(0.0)));
        downs.push(Some((-d).max(0.0)));
    }
    let roll_up = sma_opt(&ups, n);
    let roll_down = sma_opt(&downs, n);

    roll_up
        .into_iter()
        .zip(roll_down)
        .map(|(u, d)| match (u, d) {
            (Some(u), Some(d)) if d != 0.0 => Some(100.0 - 100.0 / (1.0 + u / d)),
            _ => None,
        })
        .collect()
}

fn mean(w: &[f64]) -> Option<f64> {
    if w.is_empty() {
        None
    } else {
        Some(w.iter().sum::<f64>() / w.len() as f64)
    }
}

fn rolling(xs: &[Option<f64>], n: usize, f: impl Fn(&[f64]) -> Option<f64>) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(xs.len());
    let mut buf = Vec::with_capacity(n);
    for i in 0..xs.len() {
        if n == 0 || i + 1 < n {
            out.push(None);
            continue;
        }
        buf.clear();
        let window = &xs[i + 1 - n..=i];
        for v in window {
            match v {
                Some(x) => buf.push(*x),
                None => break,
            }
        }
        out.push(if buf.len() == n { f(&buf) } else { None });
    }
    out
}
