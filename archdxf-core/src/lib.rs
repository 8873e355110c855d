pub mod geometry {
    use glam::DVec2;

    /// 二维点，内部以 `glam::DVec2` 表示。图纸平面固定为 z = 0。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        /// 两个分量均为有限值（非 NaN、非无穷）。
        #[inline]
        pub fn is_finite(self) -> bool {
            self.0.is_finite()
        }
    }

    impl From<[f64; 2]> for Point2 {
        fn from([x, y]: [f64; 2]) -> Self {
            Self::new(x, y)
        }
    }
}

pub mod document {
    use std::fmt;

    use serde::{Deserialize, Serialize};
    use thiserror::Error;
    use tracing::debug;

    use crate::geometry::Point2;

    pub const LAYER_WALL: &str = "ARCH-WALL";
    pub const LAYER_PARTITION: &str = "ARCH-PARTITION";
    pub const LAYER_DOOR: &str = "ARCH-DOOR";
    pub const LAYER_WINDOW: &str = "ARCH-WINDOW";
    pub const LAYER_FURNITURE: &str = "ARCH-FURNITURE";
    pub const LAYER_TEXT: &str = "ARCH-TEXT";
    pub const LAYER_CURVE: &str = "ARCH-CURVE";

    #[derive(Debug, Clone, PartialEq, Eq, Error)]
    pub enum DocumentError {
        #[error("layer {0:?} already exists")]
        DuplicateLayer(String),
        #[error("layer {0:?} does not exist")]
        UnknownLayer(String),
        #[error("invalid geometry: {0}")]
        InvalidGeometry(String),
        #[error("invalid layer name {0:?}")]
        InvalidLayerName(String),
        #[error("color index {0} is outside 1..=255")]
        InvalidColor(u8),
    }

    /// AutoCAD 颜色索引（ACI），合法范围 1..=255。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(try_from = "u8", into = "u8")]
    pub struct ColorIndex(u8);

    impl ColorIndex {
        pub const RED: Self = Self(1);
        pub const YELLOW: Self = Self(2);
        pub const GREEN: Self = Self(3);
        pub const CYAN: Self = Self(4);
        pub const BLUE: Self = Self(5);
        pub const MAGENTA: Self = Self(6);
        pub const WHITE: Self = Self(7);
        pub const GRAY: Self = Self(8);

        pub fn new(index: u8) -> Result<Self, DocumentError> {
            if index == 0 {
                Err(DocumentError::InvalidColor(index))
            } else {
                Ok(Self(index))
            }
        }

        #[inline]
        pub fn get(self) -> u8 {
            self.0
        }
    }

    impl TryFrom<u8> for ColorIndex {
        type Error = DocumentError;

        fn try_from(value: u8) -> Result<Self, Self::Error> {
            Self::new(value)
        }
    }

    impl From<ColorIndex> for u8 {
        fn from(value: ColorIndex) -> Self {
            value.0
        }
    }

    impl fmt::Display for ColorIndex {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub color: ColorIndex,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>, color: ColorIndex) -> Self {
            Self {
                name: name.into(),
                color,
            }
        }
    }

    /// 建筑制图标准图层，顺序即 LAYER 表的输出顺序。
    pub fn standard_layers() -> [Layer; 7] {
        [
            Layer::new(LAYER_WALL, ColorIndex::WHITE),
            Layer::new(LAYER_PARTITION, ColorIndex::GRAY),
            Layer::new(LAYER_DOOR, ColorIndex::YELLOW),
            Layer::new(LAYER_WINDOW, ColorIndex::CYAN),
            Layer::new(LAYER_FURNITURE, ColorIndex::RED),
            Layer::new(LAYER_TEXT, ColorIndex::GREEN),
            Layer::new(LAYER_CURVE, ColorIndex::MAGENTA),
        ]
    }

    /// 实体标识，即插入序号。
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于序列化或日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum Entity {
        Line(Line),
        Polyline(Polyline),
        Arc(Arc),
        Circle(Circle),
        Text(Text),
    }

    impl Entity {
        #[inline]
        pub fn kind(&self) -> &'static str {
            match self {
                Entity::Line(_) => "line",
                Entity::Polyline(_) => "polyline",
                Entity::Arc(_) => "arc",
                Entity::Circle(_) => "circle",
                Entity::Text(_) => "text",
            }
        }

        /// 校验实体自身的几何约束（半径、字高、顶点数与数值有限性）。
        pub fn validate(&self) -> Result<(), DocumentError> {
            match self {
                Entity::Line(line) => {
                    require_finite_point(line.start, "line start")?;
                    require_finite_point(line.end, "line end")
                }
                Entity::Polyline(polyline) => {
                    if polyline.vertices.is_empty() {
                        return Err(DocumentError::InvalidGeometry(
                            "polyline needs at least one vertex".to_string(),
                        ));
                    }
                    for (index, vertex) in polyline.vertices.iter().enumerate() {
                        require_finite_point(*vertex, &format!("polyline vertex {index}"))?;
                    }
                    Ok(())
                }
                Entity::Arc(arc) => {
                    require_finite_point(arc.center, "arc center")?;
                    require_positive(arc.radius, "arc radius")?;
                    require_finite(arc.start_angle_deg, "arc start angle")?;
                    require_finite(arc.end_angle_deg, "arc end angle")
                }
                Entity::Circle(circle) => {
                    require_finite_point(circle.center, "circle center")?;
                    require_positive(circle.radius, "circle radius")
                }
                Entity::Text(text) => {
                    require_finite_point(text.position, "text position")?;
                    require_positive(text.height, "text height")?;
                    if has_control_chars(&text.content) {
                        return Err(DocumentError::InvalidGeometry(
                            "text content must not contain control characters".to_string(),
                        ));
                    }
                    Ok(())
                }
            }
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Line {
        pub start: Point2,
        pub end: Point2,
    }

    /// 轻量多段线。闭合时首尾连线是隐含的，末顶点不会重复存储首顶点。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Polyline {
        pub vertices: Vec<Point2>,
        pub closed: bool,
    }

    /// 圆弧，角度单位为度，自 +X 轴逆时针。角度原样保存，不做归一化。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Arc {
        pub center: Point2,
        pub radius: f64,
        pub start_angle_deg: f64,
        pub end_angle_deg: f64,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Circle {
        pub center: Point2,
        pub radius: f64,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub struct Text {
        pub content: String,
        pub position: Point2,
        pub height: f64,
    }

    /// 文档中的一条实体记录：插入时解析好的图层名与几何本身。
    #[derive(Debug, Clone, PartialEq)]
    pub struct EntityRecord {
        pub id: EntityId,
        pub layer: String,
        pub entity: Entity,
    }

    /// 图纸文档：有序图层表 + 只追加的实体序列。
    #[derive(Debug, Clone, PartialEq)]
    pub struct Document {
        layers: Vec<Layer>,
        entities: Vec<EntityRecord>,
        active_layer: String,
    }

    impl Document {
        /// 新建文档，仅包含七个标准图层。
        pub fn new() -> Self {
            Self {
                layers: standard_layers().into(),
                entities: Vec::new(),
                active_layer: LAYER_WALL.to_string(),
            }
        }

        /// 丢弃全部图层与实体，恢复到 `Document::new()` 的状态。
        pub fn reset(&mut self) {
            *self = Self::new();
        }

        pub fn add_layer(
            &mut self,
            name: impl Into<String>,
            color: ColorIndex,
        ) -> Result<(), DocumentError> {
            let name = name.into();
            if name.is_empty() || has_control_chars(&name) {
                return Err(DocumentError::InvalidLayerName(name));
            }
            if self.has_layer(&name) {
                return Err(DocumentError::DuplicateLayer(name));
            }
            debug!(layer = %name, color = color.get(), "新增图层");
            self.layers.push(Layer::new(name, color));
            Ok(())
        }

        /// 追加实体。图层必须已存在，几何约束不满足时文档保持不变。
        pub fn add_entity(
            &mut self,
            entity: Entity,
            layer: impl AsRef<str>,
        ) -> Result<EntityId, DocumentError> {
            let layer = layer.as_ref();
            if !self.has_layer(layer) {
                return Err(DocumentError::UnknownLayer(layer.to_string()));
            }
            entity.validate()?;

            let id = EntityId::new(self.entities.len() as u64);
            debug!(id = id.get(), kind = entity.kind(), layer, "追加实体");
            self.entities.push(EntityRecord {
                id,
                layer: layer.to_string(),
                entity,
            });
            Ok(id)
        }

        pub fn add_line(
            &mut self,
            start: Point2,
            end: Point2,
            layer: impl AsRef<str>,
        ) -> Result<EntityId, DocumentError> {
            self.add_entity(Entity::Line(Line { start, end }), layer)
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            closed: bool,
            layer: impl AsRef<str>,
        ) -> Result<EntityId, DocumentError>
        where
            I: IntoIterator<Item = Point2>,
        {
            self.add_entity(
                Entity::Polyline(Polyline {
                    vertices: vertices.into_iter().collect(),
                    closed,
                }),
                layer,
            )
        }

        pub fn add_arc(
            &mut self,
            center: Point2,
            radius: f64,
            start_angle_deg: f64,
            end_angle_deg: f64,
            layer: impl AsRef<str>,
        ) -> Result<EntityId, DocumentError> {
            self.add_entity(
                Entity::Arc(Arc {
                    center,
                    radius,
                    start_angle_deg,
                    end_angle_deg,
                }),
                layer,
            )
        }

        pub fn add_circle(
            &mut self,
            center: Point2,
            radius: f64,
            layer: impl AsRef<str>,
        ) -> Result<EntityId, DocumentError> {
            self.add_entity(Entity::Circle(Circle { center, radius }), layer)
        }

        pub fn add_text(
            &mut self,
            position: Point2,
            content: impl Into<String>,
            height: f64,
            layer: impl AsRef<str>,
        ) -> Result<EntityId, DocumentError> {
            self.add_entity(
                Entity::Text(Text {
                    content: content.into(),
                    position,
                    height,
                }),
                layer,
            )
        }

        /// 切换当前图层。仅供命令层记录状态，`add_entity` 不会读取它。
        pub fn set_active_layer(&mut self, name: impl AsRef<str>) -> Result<(), DocumentError> {
            let name = name.as_ref();
            if !self.has_layer(name) {
                return Err(DocumentError::UnknownLayer(name.to_string()));
            }
            self.active_layer = name.to_string();
            Ok(())
        }

        #[inline]
        pub fn active_layer(&self) -> &str {
            &self.active_layer
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.iter()
        }

        #[inline]
        pub fn layer_count(&self) -> usize {
            self.layers.len()
        }

        pub fn layer(&self, name: &str) -> Option<&Layer> {
            self.layers.iter().find(|layer| layer.name == name)
        }

        #[inline]
        pub fn has_layer(&self, name: &str) -> bool {
            self.layer(name).is_some()
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
            usize::try_from(id.get())
                .ok()
                .and_then(|index| self.entities.get(index))
        }
    }

    impl Default for Document {
        fn default() -> Self {
            Self::new()
        }
    }

    // 包括制表符在内的全部控制字符。
    fn has_control_chars(value: &str) -> bool {
        value.chars().any(char::is_control)
    }

    fn require_finite(value: f64, what: &str) -> Result<(), DocumentError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(DocumentError::InvalidGeometry(format!(
                "{what} must be finite (got {value})"
            )))
        }
    }

    fn require_finite_point(point: Point2, what: &str) -> Result<(), DocumentError> {
        if point.is_finite() {
            Ok(())
        } else {
            Err(DocumentError::InvalidGeometry(format!(
                "{what} must be finite (got {}, {})",
                point.x(),
                point.y()
            )))
        }
    }

    // NaN 也会被 `> 0.0` 拒绝。
    fn require_positive(value: f64, what: &str) -> Result<(), DocumentError> {
        if value > 0.0 && value.is_finite() {
            Ok(())
        } else {
            Err(DocumentError::InvalidGeometry(format!(
                "{what} must be greater than 0 (got {value})"
            )))
        }
    }

}
