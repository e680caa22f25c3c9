// crates/wf_analysis/src/statistics.rs

//! Gumbel 极值统计
//!
//! 对逐年洪峰做 Gumbel 拟合（均值 + 样本标准差），按重现期 T 求分位数
//! `X_T = mean + K_T · stdev`，其中
//!
//! ```text
//! K_T = −(√6/π) · (0.5772 + ln(ln(T / (T − 1))))
//! ```
//!
//! 只支持 10 年和 100 年一遇。

use std::collections::BTreeMap;
use std::f64::consts::PI;

/// Euler–Mascheroni 常数（四位小数）
pub const EULER_GAMMA: f64 = 0.5772;

/// 支持的重现期
pub const SUPPORTED_RETURN_PERIODS: [u32; 2] = [10, 100];

/// Gumbel 拟合参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GumbelFit {
    /// 均值
    pub mean: f64,
    /// 样本标准差（n − 1）
    pub stdev: f64,
}

impl GumbelFit {
    /// 拟合有限值；有限值少于 2 个时返回 `None`
    pub fn fit(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let finite: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
        let n = finite.len();
        if n < 2 {
            return None;
        }

        let mean = finite.iter().sum::<f64>() / n as f64;
        let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        Some(Self {
            mean,
            stdev: var.sqrt(),
        })
    }

    /// 重现期 `return_period` 对应的分位数
    pub fn quantile(&self, return_period: u32) -> Option<f64> {
        frequency_factor(return_period).map(|k| self.mean + k * self.stdev)
    }
}

/// 频率因子 K_T；不支持的重现期返回 `None`
pub fn frequency_factor(return_period: u32) -> Option<f64> {
    if !SUPPORTED_RETURN_PERIODS.contains(&return_period) {
        return None;
    }
    let t = return_period as f64;
    Some(-(6.0_f64.sqrt() / PI) * (EULER_GAMMA + (t / (t - 1.0)).ln().ln()))
}

/// 洪峰最接近 `X_T` 的年份
///
/// 距离相同时取较早年份；非有限的洪峰不参与拟合也不参与选择。
pub fn return_period_year(peaks: &BTreeMap<i32, f64>, return_period: u32) -> Option<i32> {
    let x_t = GumbelFit::fit(peaks.values().copied())?.quantile(return_period)?;

    let mut best: Option<(i32, f64)> = None;
    for (&year, &peak) in peaks {
        if !peak.is_finite() {
            continue;
        }
        let d = (x_t - peak).abs();
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((year, d)),
        }
    }
    best.map(|(year, _)| year)
}

/// 序列最大值；空序列返回 `None`
pub fn annual_peak(series: &[f32]) -> Option<f64> {
    series
        .iter()
        .map(|&v| v as f64)
        .fold(None, |acc: Option<f64>, v| match acc {
            Some(m) if m >= v => Some(m),
            _ => Some(v),
        })
}
