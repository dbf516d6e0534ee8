//! 清单模块
//!
//! 提供EPUB包中文件清单的结构定义。

/// XHTML内容文档的媒体类型
pub const XHTML_MEDIA_TYPE: &str = "application/xhtml+xml";

/// 清单项信息
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    /// 项目ID
    pub id: String,
    /// 文件路径(相对于OPF文件)
    pub href: String,
    /// 媒体类型
    pub media_type: String,
    /// 属性(如nav、cover-image等)
    pub properties: Option<String>,
}

impl ManifestItem {
    /// 创建新的清单项
    pub fn new(id: impl Into<String>, href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            href: href.into(),
            media_type: media_type.into(),
            properties: None,
        }
    }

    /// 创建带属性的清单项
    pub fn with_properties(
        id: impl Into<String>,
        href: impl Into<String>,
        media_type: impl Into<String>,
        properties: impl Into<String>,
    ) -> Self {
        Self {
            properties: Some(properties.into()),
            ..Self::new(id, href, media_type)
        }
    }

    /// 检查是否包含指定属性
    ///
    /// `properties` 是以空白分隔的列表，例如 `"nav scripted"`。
    pub fn has_property(&self, property: &str) -> bool {
        if let Some(properties) = &self.properties {
            properties.split_whitespace().any(|p| p == property)
        } else {
            false
        }
    }

    /// 检查是否为导航文档
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }

    /// 检查是否为封面图片
    pub fn is_cover_image(&self) -> bool {
        self.has_property("cover-image")
    }

    /// 检查是否为XHTML文件
    pub fn is_xhtml(&self) -> bool {
        self.media_type == XHTML_MEDIA_TYPE
    }
}
