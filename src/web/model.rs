//! 网页阅读器使用的数据结构
//!
//! 字段名与序列化后的JSON键名由前端约定，修改时需要同步前端。

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// JSON清单的媒体类型
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// 书籍元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub identifier: String,
    pub language: String,
    /// 转换时的时间
    pub modified: DateTime<FixedOffset>,
    /// 封面资源的解析后路径
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<String>,
}

/// 链接的关系角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRel {
    /// 指向清单自身
    #[serde(rename = "self")]
    SelfLink,
    /// 导航文档
    Contents,
    /// 封面图片
    Cover,
}

/// 资源链接
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceLink {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<LinkRel>,
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

impl ResourceLink {
    pub fn new(href: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            rel: None,
            href: href.into(),
            media_type: media_type.into(),
            height: None,
            width: None,
        }
    }

    pub fn with_rel(mut self, rel: LinkRel) -> Self {
        self.rel = Some(rel);
        self
    }

    /// 是否为图片资源
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// 一本书的JSON清单
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookManifest {
    pub metadata: BookMetadata,
    pub links: Vec<ResourceLink>,
    /// 阅读顺序
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub spine: Vec<ResourceLink>,
    /// 辅助资源，顺序无意义
    pub resources: Vec<ResourceLink>,
}

impl BookManifest {
    /// 清单自身的链接：`domain + "/" + bookName + "/manifest.json"`
    pub fn self_link(domain: &str, book_name: &str) -> ResourceLink {
        ResourceLink::new(format!("{}/{}/manifest.json", domain, book_name), JSON_MEDIA_TYPE)
            .with_rel(LinkRel::SelfLink)
    }
}

/// 安装图标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    pub src: String,
    pub size: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// 可安装网页应用的描述文件
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebAppDescriptor {
    pub short_name: String,
    pub name: String,
    pub start_url: String,
    pub display: String,
    pub icons: Icon,
}

impl WebAppDescriptor {
    /// 以书名生成描述文件，其余字段固定
    pub fn for_title(title: &str) -> Self {
        Self {
            short_name: title.to_string(),
            name: title.to_string(),
            start_url: "index.html".to_string(),
            display: "standalone".to_string(),
            icons: Icon {
                src: "/logo.png".to_string(),
                size: "144x144".to_string(),
                media_type: "image/png".to_string(),
            },
        }
    }
}
