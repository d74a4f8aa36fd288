// 内存视图树 - 以数组 + 父索引保存的视图树宿主实现
//
// 供嵌入方镜像自己的 UI 树使用，也作为测试中的宿主

use image::{imageops, Pixel, Rgba, RgbaImage};

use super::{NodeGeometry, NodeHandle, NodeId, RasterBuffer, ViewTreeHost};
use crate::models::ViewTag;

/// 独立合成表面的状态
#[derive(Debug, Clone)]
struct SurfaceState {
    /// 当前帧内容，None 表示尚未渲染
    content: Option<RgbaImage>,
    /// 不透明表面的内容在输出时 alpha 全部为 255
    opaque: bool,
}

#[derive(Debug, Clone)]
struct ViewNode {
    tag: Option<ViewTag>,
    geometry: NodeGeometry,
    parent: Option<usize>,
    children: Vec<usize>,
    background: Option<Rgba<u8>>,
    surface: Option<SurfaceState>,
}

/// 内存视图树，索引 0 为整个屏幕的内容根节点
#[derive(Debug, Clone)]
pub struct MemoryViewTree {
    nodes: Vec<ViewNode>,
}

impl MemoryViewTree {
    /// 创建只有一个根节点的视图树
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            nodes: vec![ViewNode {
                tag: None,
                geometry: NodeGeometry::new(0, 0, width, height),
                parent: None,
                children: Vec::new(),
                background: None,
                surface: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// 设置根节点背景色
    pub fn set_background(&mut self, id: NodeId, background: Option<Rgba<u8>>) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.background = background;
        }
    }

    /// 添加普通视图
    pub fn add_view(
        &mut self,
        parent: NodeId,
        tag: Option<ViewTag>,
        geometry: NodeGeometry,
        background: Option<Rgba<u8>>,
    ) -> NodeId {
        self.push(parent, tag, geometry, background, None)
    }

    /// 添加独立合成表面
    pub fn add_surface(
        &mut self,
        parent: NodeId,
        tag: Option<ViewTag>,
        geometry: NodeGeometry,
        content: Option<RgbaImage>,
    ) -> NodeId {
        self.push(
            parent,
            tag,
            geometry,
            None,
            Some(SurfaceState {
                content,
                opaque: true,
            }),
        )
    }

    /// 更新表面内容（模拟新的一帧）
    pub fn set_surface_content(&mut self, id: NodeId, content: Option<RgbaImage>) {
        if let Some(surface) = self.nodes.get_mut(id.0).and_then(|n| n.surface.as_mut()) {
            surface.content = content;
        }
    }

    /// 表面当前是否为不透明模式，非表面节点返回 None
    pub fn is_surface_opaque(&self, id: NodeId) -> Option<bool> {
        self.nodes
            .get(id.0)
            .and_then(|n| n.surface.as_ref())
            .map(|s| s.opaque)
    }

    fn push(
        &mut self,
        parent: NodeId,
        tag: Option<ViewTag>,
        geometry: NodeGeometry,
        background: Option<Rgba<u8>>,
        surface: Option<SurfaceState>,
    ) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(ViewNode {
            tag,
            geometry,
            parent: Some(parent.0),
            children: Vec::new(),
            background,
            surface,
        });
        if let Some(parent_node) = self.nodes.get_mut(parent.0) {
            parent_node.children.push(index);
        }
        NodeId(index)
    }

    /// 以 (origin_x, origin_y) 为节点左上角递归绘制
    fn paint(&self, index: usize, origin_x: i64, origin_y: i64, buffer: &mut RasterBuffer) {
        let node = &self.nodes[index];

        // 独立合成表面不会出现在离屏绘制结果中
        if node.surface.is_some() {
            return;
        }

        if let Some(color) = node.background {
            fill_rect(
                buffer,
                origin_x,
                origin_y,
                node.geometry.width,
                node.geometry.height,
                color,
            );
        }

        for &child in &node.children {
            let geometry = self.nodes[child].geometry;
            self.paint(
                child,
                origin_x + geometry.left as i64,
                origin_y + geometry.top as i64,
                buffer,
            );
        }
    }
}

/// 以 source-over 方式填充矩形，超出缓冲部分被裁剪
fn fill_rect(buffer: &mut RasterBuffer, x: i64, y: i64, width: i32, height: i32, color: Rgba<u8>) {
    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + width as i64).min(buffer.width() as i64);
    let y1 = (y + height as i64).min(buffer.height() as i64);

    for py in y0..y1 {
        for px in x0..x1 {
            buffer.get_pixel_mut(px as u32, py as u32).blend(&color);
        }
    }
}

impl ViewTreeHost for MemoryViewTree {
    fn resolve(&self, tag: ViewTag) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.tag == Some(tag))
            .map(NodeId)
    }

    fn resolve_full_screen_root(&self) -> NodeId {
        self.root()
    }

    fn node(&self, id: NodeId) -> Option<NodeHandle> {
        self.nodes.get(id.0).map(|node| NodeHandle {
            id,
            geometry: node.geometry,
            parent: node.parent.map(NodeId),
            is_independent_surface: node.surface.is_some(),
        })
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id.0)
            .map(|node| node.children.iter().copied().map(NodeId).collect())
            .unwrap_or_default()
    }

    fn rasterize_into(&self, id: NodeId, buffer: &mut RasterBuffer) {
        if id.0 < self.nodes.len() {
            self.paint(id.0, 0, 0, buffer);
        }
    }

    fn capture_independent_surface(
        &mut self,
        id: NodeId,
        force_transparent: bool,
    ) -> Option<RasterBuffer> {
        let node = self.nodes.get_mut(id.0)?;
        let (width, height) = (node.geometry.width, node.geometry.height);
        let surface = node.surface.as_mut()?;

        if force_transparent {
            surface.opaque = false;
        }

        if width <= 0 || height <= 0 {
            return None;
        }
        let content = surface.content.as_ref()?;

        let (width, height) = (width as u32, height as u32);
        let mut frame = if content.dimensions() == (width, height) {
            content.clone()
        } else {
            imageops::resize(content, width, height, imageops::FilterType::Triangle)
        };

        if surface.opaque {
            for pixel in frame.pixels_mut() {
                pixel[3] = 255;
            }
        }

        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);

    #[test]
    fn test_resolve_by_tag() {
        let mut tree = MemoryViewTree::new(100, 100);
        let root = tree.root();
        let view = tree.add_view(root, Some(5), NodeGeometry::new(0, 0, 10, 10), None);

        assert_eq!(tree.resolve(5), Some(view));
        assert_eq!(tree.resolve(6), None);
        assert_eq!(tree.node(view).unwrap().parent, Some(root));
        assert_eq!(tree.node(root).unwrap().parent, None);
    }

    #[test]
    fn test_paint_offsets_children_and_skips_surfaces() {
        let mut tree = MemoryViewTree::new(20, 20);
        let root = tree.root();
        let panel = tree.add_view(root, None, NodeGeometry::new(5, 5, 10, 10), Some(RED));
        let content = RgbaImage::from_pixel(4, 4, BLUE);
        tree.add_surface(panel, None, NodeGeometry::new(0, 0, 4, 4), Some(content));

        let mut buffer = RasterBuffer::new(20, 20);
        tree.rasterize_into(root, &mut buffer);

        assert_eq!(buffer.get_pixel(0, 0)[3], 0);
        // 表面区域只有父节点的红色背景
        assert_eq!(*buffer.get_pixel(5, 5), RED);
        assert_eq!(*buffer.get_pixel(14, 14), RED);
        assert_eq!(buffer.get_pixel(15, 15)[3], 0);
    }

    #[test]
    fn test_surface_capture_respects_transparency_flag() {
        let mut tree = MemoryViewTree::new(10, 10);
        let root = tree.root();
        let content = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 100]));
        let surface = tree.add_surface(root, None, NodeGeometry::new(0, 0, 2, 2), Some(content));

        assert_eq!(tree.is_surface_opaque(surface), Some(true));
        let opaque = tree.capture_independent_surface(surface, false).unwrap();
        assert_eq!(opaque.get_pixel(0, 0)[3], 255);

        let transparent = tree.capture_independent_surface(surface, true).unwrap();
        assert_eq!(transparent.get_pixel(0, 0)[3], 100);
        assert_eq!(tree.is_surface_opaque(surface), Some(false));
    }

    #[test]
    fn test_surface_capture_scales_to_node_size() {
        let mut tree = MemoryViewTree::new(10, 10);
        let root = tree.root();
        let content = RgbaImage::from_pixel(8, 8, BLUE);
        let surface = tree.add_surface(root, None, NodeGeometry::new(0, 0, 4, 2), Some(content));

        let frame = tree.capture_independent_surface(surface, true).unwrap();
        assert_eq!(frame.dimensions(), (4, 2));
    }

    #[test]
    fn test_unrendered_surface_returns_none() {
        let mut tree = MemoryViewTree::new(10, 10);
        let root = tree.root();
        let surface = tree.add_surface(root, None, NodeGeometry::new(0, 0, 4, 4), None);
        let view = tree.add_view(root, None, NodeGeometry::new(0, 0, 4, 4), None);

        assert!(tree.capture_independent_surface(surface, true).is_none());
        assert!(tree.capture_independent_surface(view, true).is_none());
    }
}
