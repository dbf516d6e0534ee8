//! 元数据模块
//!
//! 只保留网页阅读器需要的几个Dublin Core字段，每个字段取文档中第一次出现的值。

/// OPF文件中的元数据信息
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageMetadata {
    /// 标题
    pub title: Option<String>,
    /// 语言
    pub language: Option<String>,
    /// 标识符
    pub identifier: Option<String>,
    /// 第一个创建者(作者)
    pub creator: Option<String>,
    /// EPUB2风格的封面引用，即 `<meta name="cover" content="..."/>` 中的清单项ID
    pub cover_id: Option<String>,
}

impl PackageMetadata {
    /// 创建空的元数据
    pub fn new() -> Self {
        Self::default()
    }

    /// 按元素本地名记录文本内容，已有值时保持不变
    ///
    /// 返回是否识别了该元素。
    pub fn record(&mut self, element: &str, text: &str) -> bool {
        let slot = match element {
            "title" => &mut self.title,
            "language" => &mut self.language,
            "identifier" => &mut self.identifier,
            "creator" => &mut self.creator,
            _ => return false,
        };
        if slot.is_none() {
            *slot = Some(text.trim().to_string());
        }
        true
    }

    /// 标题，缺失时为空字符串
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or_default()
    }

    /// 作者，缺失时为空字符串
    pub fn author(&self) -> &str {
        self.creator.as_deref().unwrap_or_default()
    }

    /// 语言，缺失时为空字符串
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or_default()
    }

    /// 标识符，缺失时为空字符串
    pub fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or_default()
    }
}
