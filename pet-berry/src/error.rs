//! 评分运行时错误.

use std::fmt::{Display, Formatter};

/// 评分计算的运行时错误.
///
/// 所有错误都在检测到的位置立即返回, 核心库不会重试, 也不会静默回退.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricError {
    /// 单位标志不是 `kBq` 或 `Bq`. 参数为原始输入.
    InvalidUnit(String),

    /// 成对的数组或序列形状不一致.
    ShapeMismatch {
        /// 期望的形状 (序列时为单元素数组).
        expected: Vec<usize>,

        /// 实际的形状.
        found: Vec<usize>,
    },

    /// 必需的锚点掩膜不含任何体素. 参数为掩膜名称.
    EmptyMask(&'static str),

    /// 多区域聚合中所有候选区域都为空, 没有可以平均的值.
    NoValidRegions,

    /// 队列中没有任何病例.
    EmptyCohort,

    /// 患者体重或注射剂量不是有限正数.
    InvalidMetadata,

    /// 层间距 (毫米) 不是有限正数, 通常来自损坏的 nifti header. 参数为原始值.
    InvalidSpacing(f64),
}

impl Display for MetricError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidUnit(u) => write!(f, "pet unit must be `kBq` or `Bq`, got `{u}`"),
            Self::ShapeMismatch { expected, found } => {
                write!(f, "shape mismatch: expected {expected:?}, found {found:?}")
            }
            Self::EmptyMask(name) => write!(f, "{name} mask selects no voxel"),
            Self::NoValidRegions => f.write_str("no valid region found"),
            Self::EmptyCohort => f.write_str("cohort contains no case"),
            Self::InvalidMetadata => {
                f.write_str("patient weight and injected radioactivity must be positive")
            }
            Self::InvalidSpacing(z) => {
                write!(f, "slice spacing must be a positive number of mm, got {z}")
            }
        }
    }
}

impl std::error::Error for MetricError {}

/// 评分计算结果.
pub type MetricResult<T> = Result<T, MetricError>;

/// 检查两个形状是否一致, 不一致时返回 [`MetricError::ShapeMismatch`].
#[inline]
pub(crate) fn ensure_shape(expected: &[usize], found: &[usize]) -> MetricResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(MetricError::ShapeMismatch {
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}

/// 检查两个序列长度是否一致.
#[inline]
pub(crate) fn ensure_len(expected: usize, found: usize) -> MetricResult<()> {
    ensure_shape(&[expected], &[found])
}
