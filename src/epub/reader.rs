use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

use crate::epub::container::{self, CONTAINER_PATH};
use crate::epub::error::{EpubError, Result};
use crate::epub::opf::Package;

/// EPUB的mimetype文件内容
const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 表示一个打开的EPUB压缩包
pub struct Epub<R = File> {
    archive: ZipArchive<R>,
}

/// 压缩包成员解压结果
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractSummary {
    /// 写出的文件数
    pub files: usize,
    /// 因路径越界而跳过的成员
    pub skipped: Vec<String>,
}

impl Epub<File> {
    /// 从文件路径打开EPUB
    ///
    /// # 参数
    /// * `path` - epub文件的路径
    ///
    /// # 返回值
    /// * `Result<Epub>` - 无法打开文件或不是zip压缩包时返回错误
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Epub<File>> {
        let file = File::open(path)?;
        Epub::from_reader(file)
    }
}

impl<R: Read + Seek> Epub<R> {
    /// 从任意可读可定位的数据源创建Epub实例
    pub fn from_reader(reader: R) -> Result<Epub<R>> {
        let archive = ZipArchive::new(reader)?;
        let mut epub = Epub { archive };
        epub.check_mimetype();
        Ok(epub)
    }

    /// 检查mimetype文件
    ///
    /// 缺失或内容不符只记录警告，不影响后续转换。
    pub fn check_mimetype(&mut self) -> bool {
        match self.extract_file("mimetype") {
            Ok(content) if content.trim() == EPUB_MIMETYPE => true,
            Ok(content) => {
                tracing::warn!(found = %content.trim(), expected = EPUB_MIMETYPE, "mimetype内容不正确");
                false
            }
            Err(_) => {
                tracing::warn!("缺少mimetype文件");
                false
            }
        }
    }

    /// 提取指定文件的文本内容
    pub fn extract_file(&mut self, filename: &str) -> Result<String> {
        let mut file = self.archive.by_name(filename)?;
        let mut content = String::new();
        file.read_to_string(&mut content)?;
        Ok(content)
    }

    /// 提取指定文件的二进制内容
    pub fn extract_binary_file(&mut self, filename: &str) -> Result<Vec<u8>> {
        let mut file = self.archive.by_name(filename)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// 定位包文件(OPF)路径
    ///
    /// container.xml缺失、格式错误或没有rootfile时返回 `None`。
    pub fn locate_package(&mut self) -> Option<String> {
        match self.extract_file(CONTAINER_PATH) {
            Ok(content) => container::locate_package_document(&content),
            Err(e) => {
                tracing::debug!(error = %e, "无法读取container.xml");
                None
            }
        }
    }

    /// 定位并解析包文件
    ///
    /// # 返回值
    /// * `Result<Package>` - container.xml中没有包文件路径或该路径不在压缩包中时
    ///   返回 `PackageNotFound`，OPF结构不完整时返回 `OpfParseError`
    pub fn parse_package(&mut self) -> Result<Package> {
        let opf_path = self.locate_package().ok_or_else(|| {
            EpubError::PackageNotFound(format!("{}中没有有效的rootfile", CONTAINER_PATH))
        })?;

        let opf_content = match self.extract_file(&opf_path) {
            Ok(content) => content,
            Err(EpubError::Zip(zip::result::ZipError::FileNotFound)) => {
                return Err(EpubError::PackageNotFound(opf_path));
            }
            Err(e) => return Err(e),
        };

        Package::parse_xml(&opf_content, &opf_path)
    }

    /// 按清单中的链接地址读取成员内容
    ///
    /// 链接是URL形式，找不到同名成员时再按百分号解码后的名字查找。
    pub fn extract_href(&mut self, href: &str) -> Result<Vec<u8>> {
        match self.extract_binary_file(href) {
            Err(EpubError::Zip(zip::result::ZipError::FileNotFound)) => {}
            other => return other,
        }

        let decoded = percent_encoding::percent_decode_str(href).decode_utf8_lossy();
        self.extract_binary_file(&decoded)
    }

    /// 读取图片成员的宽高
    ///
    /// 成员会被整个读入内存后再识别格式。
    pub fn image_dimensions(&mut self, href: &str) -> Result<(u32, u32)> {
        let data = self.extract_href(href)?;
        let dimensions = image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(dimensions)
    }

    /// 将所有成员按压缩包内部目录结构解压到 `dest`
    ///
    /// 路径越界（绝对路径或包含 `..`）的成员会被跳过并记录。
    pub fn extract_all(&mut self, dest: &Path) -> Result<ExtractSummary> {
        let mut summary = ExtractSummary::default();

        for i in 0..self.archive.len() {
            let mut file = self.archive.by_index(i)?;
            let Some(relative) = file.enclosed_name() else {
                tracing::warn!(entry = %file.name(), "跳过路径越界的压缩包成员");
                summary.skipped.push(file.name().to_string());
                continue;
            };
            let out_path = dest.join(relative);

            if file.is_dir() {
                fs::create_dir_all(&out_path)?;
                continue;
            }

            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out_file = File::create(&out_path)?;
            io::copy(&mut file, &mut out_file)?;
            summary.files += 1;
        }

        Ok(summary)
    }
}
