#![warn(missing_docs)]
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 为 PET/CT 衰减校正重建挑战赛提供评分后端:
//! 将预测体数据与真值体数据对比, 并借助解剖分割掩膜把比较限制在有临床意义的区域内.
//!
//! 该 crate 只做数值计算, 不关心文件发现与结果输出. 读取 nifti 文件的便捷入口位于
//! [`data`] 模块, 但所有评分函数只接收 `ndarray` 视图.
//!
//! # 坐标约定
//!
//! 与 nifti 原始的 `[W, H, z(, t)]` 不同, 本 crate 中所有数组均按
//! `(z, h, w)` (3D) 或 `(t, z, h, w)` (4D) 组织. 因此 "最上方切片" 就是第 0 轴上的最大索引.
//!
//! # 模块概览
//!
//! ### SUV 归一化 ✅
//!
//! 将活度浓度 (kBq/mL 或 Bq/mL) 按患者体重和注射剂量换算为 SUV.
//!
//! 实现位于 `pet-berry/src/suv.rs`.
//!
//! ### 区域统计 & 阈值曲线积分 ✅
//!
//! 区域均值, TAC 时间积分, `K(x)` 生存曲线的梯形积分, 带 ε 保护的相对误差.
//!
//! 实现位于 `pet-berry/src/region.rs`.
//!
//! ### 四项评分 ✅
//!
//! 1. 全身 SUV MAE (排除肝顶上下 ±4 cm 区域);
//! 2. 脑部离群鲁棒性 (5%, 10%, 15% 三个阈值下的 AUC 平均);
//! 3. 器官 SUV 均值偏差 (MARE);
//! 4. 动态扫描的 TAC 积分偏差.
//!
//! 实现位于 `pet-berry/src/metrics/*`.
//!
//! # 注意
//!
//! 所有评分函数都是纯函数, 不持有任何全局可变状态, 因此调用方可以对不同受试者并行求值.
//! 出错时立即返回 [`MetricError`], 不做任何静默回退.

/// 三维索引 `(z, h, w)`.
pub type Idx3d = (usize, usize, usize);

/// 体素分辨率, 以毫米为单位, 按 `[z, h, w]` 顺序存储.
pub type VoxelSpacing = [f64; 3];

pub mod consts;

mod error;

pub use error::{MetricError, MetricResult};

/// PET 体数据与分割标签的 nifti 载体.
pub mod data;

pub use data::{NiftiHeaderAttr, PetVolume, SegLabel};

pub mod config;

pub use config::{EvalConfig, OrganLabelTable};

pub mod suv;

pub use suv::{PetUnit, SubjectMetadata};

pub mod region;

pub mod metrics;

pub mod prelude;
