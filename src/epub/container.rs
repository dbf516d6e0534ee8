use crate::epub::error::{EpubError, Result};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

/// container.xml在压缩包中的固定路径
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone, PartialEq)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: Option<String>,
}

/// Container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

impl Container {
    /// 解析container.xml内容
    ///
    /// 只接受 `container → rootfiles → rootfile` 路径下的条目，
    /// 缺少 `full-path` 属性的条目会被忽略。
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container>` - 解析后的Container信息，没有任何rootfile时返回错误
    pub fn parse_xml(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);
        reader.config_mut().expand_empty_elements = true;

        let mut rootfiles = Vec::new();
        let mut buf = Vec::new();
        let mut stack: Vec<Vec<u8>> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let local_name = e.local_name().as_ref().to_vec();
                    let in_rootfiles = stack.len() == 2
                        && stack[0] == b"container"
                        && stack[1] == b"rootfiles";

                    if in_rootfiles && local_name == b"rootfile" {
                        let mut full_path = String::new();
                        let mut media_type = None;

                        for attr_result in e.attributes() {
                            let attr = attr_result?;
                            match attr.key.local_name().as_ref() {
                                b"full-path" => {
                                    full_path = attr.unescape_value()?.trim().to_string();
                                }
                                b"media-type" => {
                                    media_type = Some(attr.unescape_value()?.to_string());
                                }
                                _ => {}
                            }
                        }

                        if !full_path.is_empty() {
                            rootfiles.push(RootFile { full_path, media_type });
                        }
                    }
                    stack.push(local_name);
                }
                Event::End(_) => {
                    stack.pop();
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError(
                "没有找到任何rootfile条目".to_string(),
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 获取包文件(OPF)路径，即第一个rootfile的 `full-path`
    pub fn package_path(&self) -> Option<&str> {
        self.rootfiles.first().map(|rf| rf.full_path.as_str())
    }
}

/// 从container.xml内容中定位包文件路径
///
/// 描述文件格式错误或没有rootfile时返回 `None`，由调用方按单本书的软失败处理。
pub fn locate_package_document(xml_content: &str) -> Option<String> {
    match Container::parse_xml(xml_content) {
        Ok(container) => container.package_path().map(str::to_string),
        Err(e) => {
            tracing::debug!(error = %e, "container.xml中没有可用的包文件路径");
            None
        }
    }
}
