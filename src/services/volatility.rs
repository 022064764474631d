//! Realized and rolling volatility of log returns.
//!
//! Both estimators use the sample standard deviation (n - 1 denominator) and
//! annualize by `sqrt(year_seconds / period_seconds)`. Adjacent prices that are
//! non-finite or non-positive break the return chain: the return that would
//! span them is skipped, never treated as zero.

/// Seconds in a 365-day year.
pub const DEFAULT_YEAR_SECONDS: f64 = 365.0 * 24.0 * 60.0 * 60.0;

fn valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

/// Log return ending at each index; `None` at index 0 and across gaps.
pub fn log_returns(prices: &[f64]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return returns;
    }
    returns.push(None);
    for pair in prices.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        returns.push(if valid_price(prev) && valid_price(curr) {
            Some((curr / prev).ln())
        } else {
            None
        });
    }
    returns
}

fn annualization(period_seconds: f64, year_seconds: f64) -> Option<f64> {
    if period_seconds.is_nan()
        || period_seconds <= 0.0
        || year_seconds.is_nan()
        || year_seconds <= 0.0
    {
        return None;
    }
    Some((year_seconds / period_seconds).sqrt())
}

/// Annualized sample volatility of a whole price series.
///
/// Returns `None` with fewer than two valid returns.
pub fn realized_volatility(
    closes: &[f64],
    period_seconds: f64,
    year_seconds: Option<f64>,
) -> Option<f64> {
    let scale = annualization(period_seconds, year_seconds.unwrap_or(DEFAULT_YEAR_SECONDS))?;
    let returns: Vec<f64> = log_returns(closes).into_iter().flatten().collect();
    if returns.len() < 2 {
        return None;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.max(0.0).sqrt() * scale)
}

/// Sliding-window annualized volatility.
///
/// The window is measured in returns, so the first defined value sits at
/// index `window_returns`. Each step is O(1) from prefix sums of returns and
/// squared returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RollingVolatility {
    period_seconds: f64,
    window_returns: usize,
    year_seconds: f64,
}

impl RollingVolatility {
    pub fn new(period_seconds: f64, window_returns: usize) -> Self {
        Self {
            period_seconds,
            window_returns,
            year_seconds: DEFAULT_YEAR_SECONDS,
        }
    }

    pub fn with_year_seconds(mut self, year_seconds: f64) -> Self {
        self.year_seconds = year_seconds;
        self
    }

    pub fn window_returns(&self) -> usize {
        self.window_returns
    }

    /// One optional volatility per price.
    pub fn compute(&self, prices: &[f64]) -> Vec<Option<f64>> {
        let n = prices.len();
        let mut out = vec![None; n];
        let k = self.window_returns;
        let scale = match annualization(self.period_seconds, self.year_seconds) {
            Some(scale) if k >= 2 => scale,
            _ => return out,
        };
        if n <= k {
            return out;
        }

        // prefix[i] covers returns ending at indices 1..=i
        let mut sum = vec![0.0; n];
        let mut sum_sq = vec![0.0; n];
        let mut valid = vec![0usize; n];
        for (i, ret) in log_returns(prices).into_iter().enumerate().skip(1) {
            let (r, v) = match ret {
                Some(r) => (r, 1),
                None => (0.0, 0),
            };
            sum[i] = sum[i - 1] + r;
            sum_sq[i] = sum_sq[i - 1] + r * r;
            valid[i] = valid[i - 1] + v;
        }

        let kf = k as f64;
        for end in k..n {
            let start = end - k;
            if valid[end] - valid[start] != k {
                continue;
            }
            let window_sum = sum[end] - sum[start];
            let window_sq = sum_sq[end] - sum_sq[start];
            let mean = window_sum / kf;
            // Rounding can push a flat window slightly negative
            let variance = ((window_sq - kf * mean * mean) / (kf - 1.0)).max(0.0);
            out[end] = Some(variance.sqrt() * scale);
        }

        out
    }
}

/// Sliding-window volatility via the prefix-sum method.
pub fn rolling_volatility(
    prices: &[f64],
    period_seconds: f64,
    window_returns: usize,
    year_seconds: Option<f64>,
) -> Vec<Option<f64>> {
    RollingVolatility::new(period_seconds, window_returns)
        .with_year_seconds(year_seconds.unwrap_or(DEFAULT_YEAR_SECONDS))
        .compute(prices)
}

/// O(n·window) recomputation of [`rolling_volatility`], kept as a reference.
pub fn rolling_volatility_naive(
    prices: &[f64],
    period_seconds: f64,
    window_returns: usize,
    year_seconds: Option<f64>,
) -> Vec<Option<f64>> {
    let n = prices.len();
    let mut out = vec![None; n];
    if window_returns < 2 {
        return out;
    }
    for end in window_returns..n {
        let window = &prices[end - window_returns..=end];
        let returns = log_returns(window);
        if returns.iter().skip(1).any(|r| r.is_none()) {
            continue;
        }
        out[end] = realized_volatility(window, period_seconds, year_seconds);
    }
    out
}

/// Size of a `lag`-step move in units of volatility scaled to that horizon:
/// `ln(P_t / P_{t-lag}) / (σ · sqrt(lag · step / year))`.
///
/// `None` when there is not enough history, σ is missing or zero, or either
/// price is invalid.
pub fn z_score(
    prices: &[f64],
    index: usize,
    lag: usize,
    sigma: Option<f64>,
    step_seconds: f64,
    year_seconds: f64,
) -> Option<f64> {
    if lag == 0 || index < lag || index >= prices.len() {
        return None;
    }
    let sigma = sigma.filter(|s| s.is_finite() && *s > 0.0)?;
    let (past, current) = (prices[index - lag], prices[index]);
    if !valid_price(past) || !valid_price(current) {
        return None;
    }
    let horizon = sigma * (lag as f64 * step_seconds / year_seconds).sqrt();
    if !horizon.is_finite() || horizon <= 0.0 {
        return None;
    }
    Some((current / past).ln() / horizon)
}
