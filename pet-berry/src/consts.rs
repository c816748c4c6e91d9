//! 通用常量. 其中的数值均为挑战赛默认设置, 评分函数本身通过参数接收它们.

/// 相对误差分母的数值下限, 防止真值接近 0 时除零.
pub const EPSILON: f64 = 1e-6;

/// `K(x)` 曲线在 `[0, 1]` 上的默认采样点数.
pub const AUC_POINTS: usize = 1000;

/// 脑部离群评分使用的三个相对误差阈值.
pub const OUTLIER_THRESHOLDS: [f64; 3] = [0.05, 0.10, 0.15];

/// 全身 MAE 评估时, 肝顶上下排除带的默认半宽 (厘米).
pub const LIVER_DOME_EXCLUSION_CM: f64 = 4.0;

/// 模拟动态扫描时每帧的默认时长 (秒).
pub const DEFAULT_FRAME_DURATION: f64 = 4.0;

/// 模拟动态扫描时的默认帧数.
pub const DEFAULT_SIMULATED_FRAMES: usize = 8;

/// SUV 合理性检查的区间. 体内平均 SUV 一般在 1 附近.
pub const SUV_SANE_RANGE: std::ops::RangeInclusive<f64> = 0.01..=50.0;

/// TotalSegmentator 标签.
pub mod totalseg {
    /// 脾.
    pub const SPLEEN: i32 = 1;

    /// 肝.
    pub const LIVER: i32 = 5;

    /// 胰腺.
    pub const PANCREAS: i32 = 10;

    /// 心脏. 同时也被用作主动脉 (血池输入函数) 的代理标签.
    pub const HEART: i32 = 52;

    /// 主动脉区域.
    pub const AORTA: i32 = 52;

    /// 脑.
    pub const BRAIN: i32 = 90;

    /// 骨骼肌.
    pub const MUSCLE: i32 = 200;

    /// 脂肪组织.
    pub const ADIPOSE: i32 = 201;

    /// 四肢.
    pub const EXTREMITIES: i32 = 300;
}

/// SynthSeg 脑分区标签.
pub mod synthseg {
    /// 左侧大脑皮层.
    pub const LEFT_CEREBRAL_CORTEX: i32 = 3;

    /// 左侧小脑皮层.
    pub const LEFT_CEREBELLUM_CORTEX: i32 = 8;

    /// 左侧丘脑.
    pub const LEFT_THALAMUS: i32 = 10;

    /// 右侧大脑皮层.
    pub const RIGHT_CEREBRAL_CORTEX: i32 = 42;

    /// 右侧小脑皮层.
    pub const RIGHT_CEREBELLUM_CORTEX: i32 = 47;

    /// 右侧丘脑.
    pub const RIGHT_THALAMUS: i32 = 49;

    /// TAC 偏差评估默认使用的脑分区, 顺序与挑战赛评估脚本一致.
    pub const TAC_REGIONS: [i32; 6] = [
        LEFT_CEREBRAL_CORTEX,
        RIGHT_CEREBRAL_CORTEX,
        LEFT_THALAMUS,
        RIGHT_THALAMUS,
        LEFT_CEREBELLUM_CORTEX,
        RIGHT_CEREBELLUM_CORTEX,
    ];
}
