//! 四项评分.
//!
//! 1. [`whole_body_mae`]: 全身体素级 SUV 平均绝对误差, 排除肝顶附近的区域;
//! 2. [`brain_outlier_score`]: 脑部离群鲁棒性曲线的积分;
//! 3. [`organ_bias`]: 器官 SUV 均值的平均绝对相对误差;
//! 4. [`tac_bias`]: 动态扫描中各区域积分 TAC 的平均绝对相对误差.

mod brain_outlier;
mod organ_bias;
mod tac_bias;
mod whole_body;

pub use brain_outlier::{brain_outlier_score, k_value, BrainCase};
pub use organ_bias::{organ_bias, organ_bias_breakdown};
pub use tac_bias::{tac_bias, tac_bias_breakdown};
pub use whole_body::{
    body_mae, evaluation_mask, exclusion_slices, superior_slice, whole_body_mae,
};

use crate::error::{MetricError, MetricResult};

/// 单个区域的相对偏差.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionBias {
    /// 区域名称.
    pub name: String,

    /// `|pred - gt| / (|gt| + ε)`.
    pub bias: f64,
}

/// 对所有区域偏差求平均. 若没有任何区域, 则返回 [`MetricError::NoValidRegions`].
pub fn mean_bias(values: &[RegionBias]) -> MetricResult<f64> {
    if values.is_empty() {
        return Err(MetricError::NoValidRegions);
    }
    Ok(values.iter().map(|r| r.bias).sum::<f64>() / values.len() as f64)
}
