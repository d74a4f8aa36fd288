// 视图树宿主接口 - 截图核心依赖的外部能力
//
// 视图树由 UI 子系统持有，核心只通过该 trait 读取节点几何信息并请求绘制。
// 所有调用都必须发生在持有视图树状态的线程上。

use image::RgbaImage;

use crate::models::ViewTag;

pub mod memory;

pub use memory::MemoryViewTree;

/// 可变的 RGBA 像素缓冲，原点在左上角
pub type RasterBuffer = RgbaImage;

/// 宿主内节点的不透明句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub usize);

/// 节点几何信息，left/top 相对直接父节点
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeGeometry {
    pub width: i32,
    pub height: i32,
    pub left: i32,
    pub top: i32,
    pub padding_left: i32,
    pub padding_top: i32,
}

impl NodeGeometry {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            left,
            top,
            padding_left: 0,
            padding_top: 0,
        }
    }

    pub fn with_padding(mut self, padding_left: i32, padding_top: i32) -> Self {
        self.padding_left = padding_left;
        self.padding_top = padding_top;
        self
    }
}

/// 节点只读视图，不能在一次同步截图之外保留
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHandle {
    pub id: NodeId,
    pub geometry: NodeGeometry,
    /// 整个屏幕的根节点没有父节点
    pub parent: Option<NodeId>,
    /// 内容由独立合成表面产生（视频、相机预览等）
    pub is_independent_surface: bool,
}

/// 视图树宿主
pub trait ViewTreeHost {
    /// 按标识查找节点
    fn resolve(&self, tag: ViewTag) -> Option<NodeId>;

    /// 当前显示界面的内容根节点
    fn resolve_full_screen_root(&self) -> NodeId;

    /// 读取节点信息，节点已销毁时返回 None
    fn node(&self, id: NodeId) -> Option<NodeHandle>;

    /// 直接子节点，保持兄弟顺序
    fn children(&self, id: NodeId) -> Vec<NodeId>;

    /// 通过常规绘制路径把节点绘制到缓冲中（不包含独立合成表面）
    fn rasterize_into(&self, id: NodeId, buffer: &mut RasterBuffer);

    /// 获取独立合成表面当前内容，尺寸为节点自身宽高；
    /// 表面尚未渲染时返回 None
    fn capture_independent_surface(
        &mut self,
        id: NodeId,
        force_transparent: bool,
    ) -> Option<RasterBuffer>;
}
