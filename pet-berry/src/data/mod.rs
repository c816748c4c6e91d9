use std::fmt::{Display, Formatter};
use std::path::Path;

use ndarray::{Array3, Array4, ArrayD, ArrayView3, ArrayView4, Axis, Ix3, Ix4};
use nifti::{InMemNiftiVolume, IntoNdArray, NiftiError, NiftiHeader, NiftiObject, ReaderOptions};

use crate::error::{MetricError, MetricResult};
use crate::region::{foreground_mask, label_mask};
use crate::{Idx3d, VoxelSpacing};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 打开 nifti 体数据错误.
#[derive(Debug)]
pub enum OpenVolumeError {
    /// 底层 nifti 读取错误.
    Nifti(NiftiError),

    /// 数据维数不受支持. PET 扫描只能是 3D 或 4D, 分割只能是 3D.
    Dimensionality(usize),
}

impl Display for OpenVolumeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nifti(e) => write!(f, "nifti error: {e}"),
            Self::Dimensionality(n) => write!(f, "unsupported {n}D volume"),
        }
    }
}

impl std::error::Error for OpenVolumeError {}

impl From<NiftiError> for OpenVolumeError {
    fn from(value: NiftiError) -> Self {
        Self::Nifti(value)
    }
}

/// 读取 nifti 文件, 返回堆上的 header 与原始体数据.
fn read_nifti(path: &Path) -> Result<(BoxedHeader, InMemNiftiVolume), OpenVolumeError> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());
    Ok((header, obj.into_volume()))
}

/// 将 `[W, H, z(, t)]` 转换为 `[(t,) z, H, W]`.
///
/// hint: 原第一维向下增长, 原第二维向右增长.
fn reverse_axes<T>(data: ArrayD<T>) -> ArrayD<T> {
    let axes: Vec<usize> = (0..data.ndim()).rev().collect();
    let data = data.permuted_axes(axes);
    // The nature of nifti data field layout.
    debug_assert!(data.is_standard_layout());
    data
}

/// 构造一个仅包含体素分辨率与维度信息的 header.
fn header_with(pix_dim: [f32; 3], shape: &[usize]) -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    let [_, pw, ph, pz, ..] = &mut header.pixdim;
    let [z, h, w] = pix_dim;
    (*pw, *ph, *pz) = (w, h, z);

    // 维度按 nifti 习惯倒序写入.
    header.dim = [1; 8];
    header.dim[0] = shape.len() as u16;
    for (slot, len) in header.dim[1..].iter_mut().zip(shape.iter().rev()) {
        *slot = *len as u16;
    }
    header
}

/// nifti header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> VoxelSpacing {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }
}

/// nii 格式 PET 扫描, 包括 header 和活度浓度数据. 数据以 `f32` 保存.
///
/// 静态 (3D) 扫描同样以 `(t, z, h, w)` 存储, 此时 `t == 1`.
#[derive(Debug, Clone)]
pub struct PetVolume {
    header: BoxedHeader,
    data: Array4<f32>,
    dynamic: bool,
}

impl NiftiHeaderAttr for PetVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl PetVolume {
    /// 打开 nii 文件格式的 3D 或 4D PET 扫描. `path` 为 nii 文件的本地路径.
    /// 如果打开成功, 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let (header, volume) = read_nifti(path.as_ref())?;
        let data = reverse_axes(volume.into_ndarray::<f32>()?);
        let ndim = data.ndim();
        let data = match ndim {
            3 => data.insert_axis(Axis(0)),
            4 => data,
            n => return Err(OpenVolumeError::Dimensionality(n)),
        };
        let data = data
            .into_dimensionality::<Ix4>()
            .map_err(|_| OpenVolumeError::Dimensionality(ndim))?
            .as_standard_layout()
            .into_owned();
        log::debug!("opened {ndim}D pet volume of shape {:?}", data.shape());
        Ok(Self {
            header,
            data,
            dynamic: ndim == 4,
        })
    }

    /// 根据裸数据直接创建静态扫描.
    ///
    /// `data` 按 `(z, h, w)` 组织, `pix_dim` 按 `[z, h, w]` 组织, 单位毫米.
    pub fn from_static(data: Array3<f32>, pix_dim: [f32; 3]) -> Self {
        let header = header_with(pix_dim, data.shape());
        Self {
            header,
            data: data.insert_axis(Axis(0)),
            dynamic: false,
        }
    }

    /// 根据裸数据直接创建动态扫描.
    ///
    /// `data` 按 `(t, z, h, w)` 组织, `pix_dim` 按 `[z, h, w]` 组织, 单位毫米.
    pub fn from_frames(data: Array4<f32>, pix_dim: [f32; 3]) -> Self {
        let header = header_with(pix_dim, data.shape());
        Self {
            header,
            data,
            dynamic: true,
        }
    }

    /// 是否为动态 (4D) 扫描.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// 时间帧个数. 静态扫描为 1.
    #[inline]
    pub fn frames(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    /// 获取第 `t` 个时间帧的视图.
    ///
    /// 当 `t` 越界时 panic.
    #[inline]
    pub fn frame(&self, t: usize) -> ArrayView3<'_, f32> {
        self.data.index_axis(Axis(0), t)
    }

    /// 获取用于静态评估的视图, 即第一个时间帧.
    #[inline]
    pub fn static_view(&self) -> ArrayView3<'_, f32> {
        self.frame(0)
    }

    /// 获取全部 `(t, z, h, w)` 数据的不可变视图.
    #[inline]
    pub fn data(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// 获取动态扫描的 4D 视图. 若为静态扫描, 则返回 [`MetricError::ShapeMismatch`].
    pub fn dynamic(&self) -> MetricResult<ArrayView4<'_, f32>> {
        if self.dynamic {
            Ok(self.data.view())
        } else {
            Err(MetricError::ShapeMismatch {
                expected: vec![4],
                found: vec![3],
            })
        }
    }

    /// 将第一帧重复 `frames` 次, 模拟一个动态扫描.
    ///
    /// 仅用于本地测试没有动态扫描数据的场景.
    pub fn repeat_frames(&self, frames: usize) -> Self {
        let first = self.static_view().insert_axis(Axis(0));
        let views = vec![first; frames];
        // 所有视图形状相同, 该操作仅在 `frames == 0` 时失败.
        let data = ndarray::concatenate(Axis(0), &views)
            .unwrap_or_else(|_| Array4::zeros((0, 0, 0, 0)));

        let mut header = self.header.clone();
        header.dim[0] = 4;
        header.dim[4] = frames as u16;
        Self {
            header,
            data,
            dynamic: true,
        }
    }
}

/// nii 格式 3D 分割标签. 标签值以 `i32` 保存, 可以是二值掩膜或解剖标签 ID.
#[derive(Debug, Clone)]
pub struct SegLabel {
    header: BoxedHeader,
    data: Array3<i32>,
}

impl NiftiHeaderAttr for SegLabel {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl SegLabel {
    /// 打开 nii 文件格式的 3D 分割. `path` 为 nii 文件的本地路径. 如果打开成功,
    /// 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, OpenVolumeError> {
        let (header, volume) = read_nifti(path.as_ref())?;
        let data = reverse_axes(volume.into_ndarray::<i32>()?);
        let ndim = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| OpenVolumeError::Dimensionality(ndim))?
            .as_standard_layout()
            .into_owned();
        Ok(Self { header, data })
    }

    /// 根据裸标签数据直接创建 `SegLabel` 实体.
    ///
    /// `data` 按 `(z, h, w)` 组织, `pix_dim` 按 `[z, h, w]` 组织, 单位毫米.
    pub fn from_array(data: Array3<i32>, pix_dim: [f32; 3]) -> Self {
        let header = header_with(pix_dim, data.shape());
        Self { header, data }
    }

    /// 获取形状 `(z, h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, i32> {
        self.data.view()
    }

    /// 获取值为 `label` 的区域掩膜.
    #[inline]
    pub fn mask(&self, label: i32) -> Array3<bool> {
        label_mask(self.data(), label)
    }

    /// 获取所有正值体素构成的前景掩膜.
    #[inline]
    pub fn foreground(&self) -> Array3<bool> {
        foreground_mask(self.data())
    }
}
