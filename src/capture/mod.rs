// 截图合成模块 - 负责把视图子树合成为一张位图
//
// 常规绘制路径不会把独立合成表面（视频、相机预览等）画进离屏缓冲，
// 所以先绘制基础层，再逐个取出这些表面的内容按偏移贴回基础层。

use image::imageops;
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

use crate::error::SnapshotError;
use crate::host::{NodeHandle, NodeId, RasterBuffer, ViewTreeHost};
use crate::models::{CaptureRequest, RootSelector, TargetSize};

/// 有效宽高的上限
const MAX_DIMENSION: i64 = i32::MAX as i64;

/// 缩放使用的插值滤波器
const RESCALE_FILTER: imageops::FilterType = imageops::FilterType::Lanczos3;

/// 相对截图根节点的累计偏移（基础层像素坐标）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulatedOffset {
    pub left: i64,
    pub top: i64,
}

/// 截图合成器
///
/// 持有视图树宿主的可变借用，只能在一次同步截图期间存在
pub struct Compositor<'a, H: ViewTreeHost> {
    host: &'a mut H,
}

impl<'a, H: ViewTreeHost> Compositor<'a, H> {
    /// 创建合成器
    pub fn new(host: &'a mut H) -> Self {
        Self { host }
    }

    /// 解析截图根节点，找不到时报告 NodeNotFound
    pub fn resolve_root(&self, selector: RootSelector) -> Result<NodeHandle, SnapshotError> {
        let id = match selector {
            RootSelector::FullScreen => Some(self.host.resolve_full_screen_root()),
            RootSelector::Node(tag) => self.host.resolve(tag),
        };

        id.and_then(|id| self.host.node(id))
            .ok_or_else(|| SnapshotError::NodeNotFound(selector.to_string()))
    }

    /// 计算截图的有效尺寸
    ///
    /// 滚动内容模式下宽度不变，高度为直接子节点高度之和
    pub fn compute_effective_size(
        &self,
        node: &NodeHandle,
        treat_as_scrollable_content: bool,
    ) -> Result<(u32, u32), SnapshotError> {
        let width = node.geometry.width as i64;
        let mut height = node.geometry.height as i64;

        if width <= 0 || height <= 0 {
            return Err(SnapshotError::InvalidGeometry { width, height });
        }

        if treat_as_scrollable_content {
            height = self
                .host
                .children(node.id)
                .into_iter()
                .filter_map(|child| self.host.node(child))
                .map(|child| child.geometry.height as i64)
                .fold(0i64, i64::saturating_add);
        }

        // 有效尺寸必须仍能用宿主的 i32 坐标表示
        if height <= 0 || height > MAX_DIMENSION {
            return Err(SnapshotError::InvalidGeometry { width, height });
        }

        Ok((width as u32, height as u32))
    }

    /// 分配基础层并通过常规绘制路径绘制根节点
    pub fn rasterize_base(&self, node: &NodeHandle, width: u32, height: u32) -> RasterBuffer {
        let mut buffer = RasterBuffer::new(width, height);
        self.host.rasterize_into(node.id, &mut buffer);
        buffer
    }

    /// 深度优先遍历所有后代，按遍历顺序返回独立合成表面
    ///
    /// 不包含根节点本身；容器节点透明地穿过
    pub fn enumerate_independent_surfaces(&self, root: NodeId) -> Vec<NodeHandle> {
        let mut surfaces = Vec::new();
        let mut stack: Vec<NodeId> = self.host.children(root).into_iter().rev().collect();

        while let Some(id) = stack.pop() {
            let Some(node) = self.host.node(id) else {
                continue;
            };

            if node.is_independent_surface {
                surfaces.push(node);
            }

            stack.extend(self.host.children(id).into_iter().rev());
        }

        surfaces
    }

    /// 计算节点相对截图根节点的偏移
    ///
    /// 累加节点自身和每个严格祖先的 left/top，到达根节点或无父节点时停止；
    /// 最后加上目标节点自身（不含祖先）的 padding
    pub fn compute_offset(&self, node: &NodeHandle, root: NodeId) -> AccumulatedOffset {
        let mut left = node.geometry.left as i64;
        let mut top = node.geometry.top as i64;

        let mut visited = HashSet::new();
        visited.insert(node.id);

        let mut current = node.parent;
        while let Some(parent_id) = current {
            if parent_id == root {
                break;
            }
            if !visited.insert(parent_id) {
                warn!("节点 {:?} 的祖先链出现环，停止累计偏移", node.id);
                break;
            }
            let Some(parent) = self.host.node(parent_id) else {
                break;
            };

            left = left.saturating_add(parent.geometry.left as i64);
            top = top.saturating_add(parent.geometry.top as i64);
            current = parent.parent;
        }

        AccumulatedOffset {
            left: left.saturating_add(node.geometry.padding_left as i64),
            top: top.saturating_add(node.geometry.padding_top as i64),
        }
    }

    /// 取出独立合成表面的内容并以 source-over 贴到基础层
    ///
    /// 表面尚未渲染时跳过，返回 false
    pub fn blit_surface(
        &mut self,
        base: &mut RasterBuffer,
        node: &NodeHandle,
        offset: AccumulatedOffset,
    ) -> bool {
        let Some(frame) = self.host.capture_independent_surface(node.id, true) else {
            debug!("独立表面 {:?} 尚无内容，跳过", node.id);
            return false;
        };

        let outside = offset.left >= base.width() as i64
            || offset.top >= base.height() as i64
            || offset.left.saturating_add(frame.width() as i64) <= 0
            || offset.top.saturating_add(frame.height() as i64) <= 0;
        if outside {
            warn!(
                "独立表面 {:?} 位于截图范围之外 ({}, {})，跳过",
                node.id, offset.left, offset.top
            );
            return false;
        }

        imageops::overlay(base, &frame, offset.left, offset.top);
        trace!(
            "贴入独立表面 {:?}: {}x{} @ ({}, {})",
            node.id,
            frame.width(),
            frame.height(),
            offset.left,
            offset.top
        );
        true
    }

    /// 执行完整的截图合成
    pub fn capture(&mut self, request: &CaptureRequest) -> Result<RasterBuffer, SnapshotError> {
        let root = self.resolve_root(request.root_selector)?;
        let (width, height) =
            self.compute_effective_size(&root, request.treat_as_scrollable_content)?;

        let mut base = self.rasterize_base(&root, width, height);

        // 根节点本身就是独立表面时，先贴它自己的内容
        if root.is_independent_surface {
            let offset = AccumulatedOffset {
                left: root.geometry.padding_left as i64,
                top: root.geometry.padding_top as i64,
            };
            self.blit_surface(&mut base, &root, offset);
        }

        let surfaces = self.enumerate_independent_surfaces(root.id);
        let mut blitted = 0;
        for surface in &surfaces {
            let offset = self.compute_offset(surface, root.id);
            if self.blit_surface(&mut base, surface, offset) {
                blitted += 1;
            }
        }

        info!(
            "截取视图 {} 成功: {}x{}，独立表面 {}/{}",
            request.root_selector,
            width,
            height,
            blitted,
            surfaces.len()
        );

        Ok(rescale(base, request.target_size))
    }
}

/// 缩放到目标尺寸，未指定或尺寸相同时原样返回
pub fn rescale(base: RasterBuffer, target_size: Option<TargetSize>) -> RasterBuffer {
    match target_size {
        Some(size) if (size.width, size.height) != base.dimensions() => {
            imageops::resize(&base, size.width, size.height, RESCALE_FILTER)
        }
        _ => base,
    }
}
