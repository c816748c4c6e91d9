//! 评估配置. 评分函数从不读取隐藏的全局配置, 调用方通过 [`EvalConfig`] 显式传入.

use crate::consts::{self, synthseg, totalseg};
use crate::suv::PetUnit;

/// 器官名到标签 ID 的有序映射.
///
/// 允许重复的标签 ID (语义上合法, 但罕见).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct OrganLabelTable(Vec<(String, i32)>);

impl OrganLabelTable {
    /// 挑战赛默认使用的 TotalSegmentator 器官表.
    pub fn totalseg() -> Self {
        Self::from_iter([
            ("brain", totalseg::BRAIN),
            ("liver", totalseg::LIVER),
            ("spleen", totalseg::SPLEEN),
            ("heart", totalseg::HEART),
            ("pancreas", totalseg::PANCREAS),
            ("muscle", totalseg::MUSCLE),
            ("adipose", totalseg::ADIPOSE),
            ("extremities", totalseg::EXTREMITIES),
        ])
    }

    /// 按插入顺序迭代 `(器官名, 标签)`.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, i32)> {
        self.0.iter().map(|(name, label)| (name.as_str(), *label))
    }

    /// 器官个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空表.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, i32)> for OrganLabelTable {
    fn from_iter<T: IntoIterator<Item = (S, i32)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(n, l)| (n.into(), l)).collect())
    }
}

/// 一次受试者评估所需的全部配置. [`Default`] 给出挑战赛的默认设置.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EvalConfig {
    /// PET 数据的存储单位.
    pub unit: PetUnit,

    /// 全身 MAE 中肝顶上下排除带的半宽 (厘米).
    pub exclusion_cm: f64,

    /// 器官偏差评估使用的器官表.
    pub organs: OrganLabelTable,

    /// 肝脏在全身分割中的标签, 用于定位肝顶.
    pub liver_label: i32,

    /// 主动脉在全身分割中的标签.
    pub aorta_label: i32,

    /// TAC 偏差评估使用的脑分区标签.
    pub brain_labels: Vec<i32>,

    /// 脑部离群评分的相对误差阈值.
    pub outlier_thresholds: Vec<f64>,

    /// `K(x)` 曲线采样点数.
    pub auc_points: usize,

    /// 缺少帧时长信息时, 每帧的默认时长 (秒).
    pub frame_duration: f64,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            unit: PetUnit::KBq,
            exclusion_cm: consts::LIVER_DOME_EXCLUSION_CM,
            organs: OrganLabelTable::totalseg(),
            liver_label: totalseg::LIVER,
            aorta_label: totalseg::AORTA,
            brain_labels: synthseg::TAC_REGIONS.to_vec(),
            outlier_thresholds: consts::OUTLIER_THRESHOLDS.to_vec(),
            auc_points: consts::AUC_POINTS,
            frame_duration: consts::DEFAULT_FRAME_DURATION,
        }
    }
}

impl EvalConfig {
    /// 为 `frames` 个时间帧生成等长的帧时长序列.
    #[inline]
    pub fn frame_durations(&self, frames: usize) -> Vec<f64> {
        vec![self.frame_duration; frames]
    }
}
