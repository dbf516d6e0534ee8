//! OPF解析器模块
//!
//! 提供OPF（Open Packaging Format）文件的XML解析功能。

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::{manifest::ManifestItem, metadata::PackageMetadata, spine::SpineItem};
use crate::epub::path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// OPF文件解析结果
#[derive(Debug, Clone)]
pub struct Package {
    /// OPF文件在压缩包中的路径
    pub path: String,
    /// 元数据
    pub metadata: PackageMetadata,
    /// 清单项，保持文档中的顺序
    pub manifest: Vec<ManifestItem>,
    /// 脊柱(阅读顺序)
    pub spine: Vec<SpineItem>,
}

/// 解析过程中遇到的必需结构元素
#[derive(Default)]
struct Sections {
    package: bool,
    metadata: bool,
    manifest: bool,
    spine: bool,
}

impl Sections {
    fn missing(&self) -> Option<&'static str> {
        [
            (self.package, "package"),
            (self.metadata, "metadata"),
            (self.manifest, "manifest"),
            (self.spine, "spine"),
        ]
        .into_iter()
        .find(|(seen, _)| !seen)
        .map(|(_, name)| name)
    }
}

impl Package {
    /// 解析OPF文件内容
    ///
    /// # 参数
    /// * `xml_content` - OPF文件的XML内容
    /// * `path` - OPF文件在压缩包中的路径，用于解析清单项的相对路径
    ///
    /// # 返回值
    /// * `Result<Package>` - 解析后的包信息；缺少 `package`、`metadata`、
    ///   `manifest` 或 `spine` 元素时返回 `OpfParseError`
    pub fn parse_xml(xml_content: &str, path: &str) -> Result<Package> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut package = Package {
            path: path.to_string(),
            metadata: PackageMetadata::new(),
            manifest: Vec::new(),
            spine: Vec::new(),
        };

        let mut unique_identifier = None;
        let mut identifier_id = None;
        let mut unique_identifier_text = None;

        let mut sections = Sections::default();
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut text_content = String::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name = e.local_name().as_ref().to_vec();

                    match (stack.as_slice(), local_name.as_slice()) {
                        ([], b"package") => {
                            sections.package = true;
                            unique_identifier = Self::attribute(e, b"unique-identifier")?;
                        }
                        ([root], b"metadata") if root == b"package" => sections.metadata = true,
                        ([root], b"manifest") if root == b"package" => sections.manifest = true,
                        ([root], b"spine") if root == b"package" => sections.spine = true,
                        ([root, section], name) if root == b"package" => {
                            match (section.as_slice(), name) {
                                (b"metadata", b"meta") => package.parse_meta(e)?,
                                (b"metadata", b"identifier") => {
                                    text_content.clear();
                                    identifier_id = Self::attribute(e, b"id")?;
                                }
                                (b"metadata", _) => text_content.clear(),
                                (b"manifest", b"item") => package.parse_manifest_item(e)?,
                                (b"spine", b"itemref") => package.parse_spine_item(e)?,
                                _ => {}
                            }
                        }
                        _ => {}
                    }

                    stack.push(local_name);
                }
                Event::Text(e) => {
                    text_content.push_str(&e.unescape()?);
                }
                Event::CData(e) => {
                    text_content.push_str(&String::from_utf8_lossy(&e));
                }
                Event::End(_) => {
                    if let Some(local_name) = stack.pop() {
                        if Self::in_metadata(&stack) {
                            if local_name == b"identifier"
                                && unique_identifier_text.is_none()
                                && unique_identifier.is_some()
                                && identifier_id == unique_identifier
                            {
                                unique_identifier_text = Some(text_content.trim().to_string());
                            }
                            let element = String::from_utf8_lossy(&local_name);
                            package.metadata.record(&element, &text_content);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if let Some(missing) = sections.missing() {
            return Err(EpubError::OpfParseError(format!("缺少<{}>元素", missing)));
        }

        // unique-identifier指向的标识符优先于第一个标识符
        if unique_identifier_text.is_some() {
            package.metadata.identifier = unique_identifier_text;
        }

        Ok(package)
    }

    /// 当前栈是否正好位于 `package → metadata` 下
    fn in_metadata(stack: &[Vec<u8>]) -> bool {
        matches!(stack, [root, section] if root == b"package" && section == b"metadata")
    }

    /// 读取元素上指定本地名的属性值
    fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>> {
        for attr_result in e.attributes() {
            let attr = attr_result?;
            if attr.key.local_name().as_ref() == name {
                return Ok(Some(attr.unescape_value()?.to_string()));
            }
        }
        Ok(None)
    }

    /// 处理 `<meta name="cover" content="..."/>`，只记录第一次出现的值
    fn parse_meta(&mut self, e: &BytesStart) -> Result<()> {
        let mut name = String::new();
        let mut content = String::new();

        for attr_result in e.attributes() {
            let attr = attr_result?;
            match attr.key.local_name().as_ref() {
                b"name" => name = attr.unescape_value()?.to_string(),
                b"content" => content = attr.unescape_value()?.to_string(),
                _ => {}
            }
        }

        if name == "cover" && !content.is_empty() && self.metadata.cover_id.is_none() {
            self.metadata.cover_id = Some(content);
        }
        Ok(())
    }

    /// 解析清单项
    ///
    /// 属性缺失的清单项同样保留，只是会生成退化的链接。
    fn parse_manifest_item(&mut self, e: &BytesStart) -> Result<()> {
        let mut item = ManifestItem::new(String::new(), String::new(), String::new());

        for attr_result in e.attributes() {
            let attr = attr_result?;
            match attr.key.local_name().as_ref() {
                b"id" => item.id = attr.unescape_value()?.to_string(),
                b"href" => item.href = attr.unescape_value()?.to_string(),
                b"media-type" => item.media_type = attr.unescape_value()?.to_string(),
                b"properties" => item.properties = Some(attr.unescape_value()?.to_string()),
                _ => {}
            }
        }

        self.manifest.push(item);
        Ok(())
    }

    /// 解析脊柱项
    fn parse_spine_item(&mut self, e: &BytesStart) -> Result<()> {
        let mut spine_item = SpineItem::new(String::new());

        for attr_result in e.attributes() {
            let attr = attr_result?;
            match attr.key.local_name().as_ref() {
                b"idref" => spine_item.idref = attr.unescape_value()?.to_string(),
                _ => {}
            }
        }

        self.spine.push(spine_item);
        Ok(())
    }

    /// 获取OPF文件所在的目录，位于根目录时为空字符串
    pub fn base_dir(&self) -> &str {
        path::base_dir(&self.path)
    }

    /// 计算清单项对外可见的相对路径
    pub fn resolve(&self, item: &ManifestItem) -> String {
        path::resolve_href(self.base_dir(), &item.href)
    }

    /// 根据ID获取第一个匹配的清单项
    pub fn get_manifest_item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// 按清单顺序返回所有解析后的资源路径
    pub fn resource_paths(&self) -> Vec<String> {
        self.manifest.iter().map(|item| self.resolve(item)).collect()
    }
}
