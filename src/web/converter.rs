//! 批量转换
//!
//! 每本书独立完成 定位 → 解析 → 对账 → 输出 的流程，
//! 单本书的失败记录在报告中，不会中断其他书的转换。

use std::fmt;
use std::fs;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::epub::error::{EpubError, Result};
use crate::epub::opf::Package;
use crate::epub::reader::{Epub, ExtractSummary};
use crate::web::assets::{self, AssetFailure};
use crate::web::clock::{Clock, SystemClock};
use crate::web::config::ConverterConfig;
use crate::web::emit;
use crate::web::model::{BookManifest, WebAppDescriptor};
use crate::web::reconcile::{Reconciler, SpineAnomaly};
use crate::web::template::IndexTemplate;

/// EPUB文件扩展名
pub const EPUB_EXTENSION: &str = ".epub";

/// 单本书转换的各个阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 创建书籍输出目录
    OutputDir,
    /// 打开压缩包
    Open,
    /// 生成manifest.json与manifest.appcache
    Manifest,
    /// 生成webapp.webmanifest
    WebApp,
    /// 渲染index.html
    Index,
    /// 解压压缩包成员
    Assets,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::OutputDir => "输出目录",
            Stage::Open => "打开压缩包",
            Stage::Manifest => "清单",
            Stage::WebApp => "网页应用描述",
            Stage::Index => "入口页面",
            Stage::Assets => "资源解压",
        };
        f.write_str(name)
    }
}

/// 某个阶段的失败
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: EpubError,
}

/// 清单生成结果摘要
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestSummary {
    pub spine: usize,
    pub resources: usize,
    pub cover: Option<String>,
    pub anomalies: Vec<SpineAnomaly>,
}

/// 单本书的转换报告
#[derive(Debug)]
pub struct BookReport {
    /// 压缩包文件名，同时也是输出目录名
    pub name: String,
    pub output_dir: PathBuf,
    pub manifest: Option<ManifestSummary>,
    pub extracted: Option<ExtractSummary>,
    pub failures: Vec<StageFailure>,
}

impl BookReport {
    fn new(name: &str, output_dir: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            output_dir,
            manifest: None,
            extracted: None,
            failures: Vec::new(),
        }
    }

    fn record<T>(&mut self, stage: Stage, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(book = %self.name, %stage, %error, "转换阶段失败");
                self.failures.push(StageFailure { stage, error });
                None
            }
        }
    }

    /// 所有阶段都成功
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 指定阶段是否失败
    pub fn failed_at(&self, stage: Stage) -> bool {
        self.failures.iter().any(|f| f.stage == stage)
    }
}

/// 整批转换的报告
#[derive(Debug, Default)]
pub struct BatchReport {
    /// 按枚举顺序排列的书籍报告
    pub books: Vec<BookReport>,
    pub shared_asset_failures: Vec<AssetFailure>,
}

impl BatchReport {
    /// 完全成功的书籍数
    pub fn converted(&self) -> usize {
        self.books.iter().filter(|b| b.is_success()).count()
    }

    /// 至少一个阶段失败的书籍数
    pub fn failed(&self) -> usize {
        self.books.len() - self.converted()
    }
}

/// EPUB到静态网页的转换器
pub struct Converter {
    config: ConverterConfig,
    clock: Box<dyn Clock>,
    template: std::result::Result<IndexTemplate, String>,
}

impl Converter {
    /// 创建转换器
    ///
    /// 模板无法加载时不会立即失败，而是让每本书的入口页面阶段报告该错误。
    pub fn new(config: ConverterConfig) -> Self {
        let template = IndexTemplate::load(config.template.as_deref()).map_err(|e| {
            tracing::error!(error = %e, "无法加载入口页面模板");
            e.to_string()
        });

        Self {
            config,
            clock: Box::new(SystemClock),
            template,
        }
    }

    /// 替换时间来源
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// 列出输入目录中的EPUB文件，按文件名排序
    ///
    /// 符号链接按其指向的目标判断，指向目录的条目被跳过。
    ///
    /// 这是整批转换中唯一的致命错误来源。
    pub fn enumerate_books(&self) -> Result<Vec<String>> {
        let mut books = Vec::new();

        for entry in fs::read_dir(&self.config.input_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.ends_with(EPUB_EXTENSION) {
                continue;
            }
            if entry.path().is_file() {
                books.push(name);
            }
        }

        books.sort();
        Ok(books)
    }

    /// 转换输入目录中的所有书籍，最后复制共享文件
    pub fn run(&self) -> Result<BatchReport> {
        let books = self.enumerate_books()?;
        tracing::info!(
            count = books.len(),
            input = %self.config.input_dir.display(),
            "找到EPUB文件"
        );

        if let Err(error) = fs::create_dir_all(&self.config.output_dir) {
            tracing::error!(output = %self.config.output_dir.display(), %error, "无法创建输出目录");
        }

        let reports: Vec<BookReport> = if self.config.parallel {
            books.par_iter().map(|name| self.convert_book(name)).collect()
        } else {
            books.iter().map(|name| self.convert_book(name)).collect()
        };

        let shared_asset_failures =
            assets::copy_shared_assets(&self.config.assets_dir, &self.config.output_dir);

        Ok(BatchReport {
            books: reports,
            shared_asset_failures,
        })
    }

    /// 转换单本书
    pub fn convert_book(&self, name: &str) -> BookReport {
        let _span = tracing::info_span!("book", name).entered();
        let book_dir = self.config.output_dir.join(name);
        let mut report = BookReport::new(name, book_dir.clone());

        report.record(Stage::OutputDir, fs::create_dir_all(&book_dir).map_err(EpubError::from));

        let Some(mut epub) = report.record(Stage::Open, Epub::open(self.config.input_dir.join(name))) else {
            return report;
        };

        match epub.parse_package() {
            Ok(package) => self.write_book_files(&mut epub, &package, name, &book_dir, &mut report),
            Err(error) => {
                report.record::<()>(Stage::Manifest, Err(error));
            }
        }

        report.extracted = report.record(Stage::Assets, epub.extract_all(&book_dir));

        if report.is_success() {
            tracing::info!("转换完成");
        }
        report
    }

    /// 由解析好的包文件生成并写出清单、网页应用描述与入口页面
    fn write_book_files<R: Read + Seek>(
        &self,
        epub: &mut Epub<R>,
        package: &Package,
        name: &str,
        book_dir: &Path,
        report: &mut BookReport,
    ) {
        let built = report.record(Stage::Manifest, self.build_manifest(epub, package, name, book_dir));

        let webapp = WebAppDescriptor::for_title(package.metadata.title());
        report.record(Stage::WebApp, emit::write_webapp_file(book_dir, &webapp));

        if let Some((manifest, anomalies)) = built {
            let rendered = match &self.template {
                Ok(template) => template.write(book_dir, &manifest),
                Err(msg) => Err(EpubError::TemplateError(msg.clone())),
            };
            report.record(Stage::Index, rendered);

            report.manifest = Some(ManifestSummary {
                spine: manifest.spine.len(),
                resources: manifest.resources.len(),
                cover: manifest.metadata.cover.clone(),
                anomalies,
            });
        }
    }

    fn build_manifest<R: Read + Seek>(
        &self,
        epub: &mut Epub<R>,
        package: &Package,
        name: &str,
        book_dir: &Path,
    ) -> Result<(BookManifest, Vec<SpineAnomaly>)> {
        let now = self.clock.now();
        let reconciliation = Reconciler::new(self.config.spine_anomalies).reconcile(package)?;
        let anomalies = reconciliation.anomalies.clone();

        let mut manifest = reconciliation.into_manifest(
            &package.metadata,
            BookManifest::self_link(&self.config.domain, name),
            now,
        );
        if self.config.probe_image_sizes {
            probe_image_sizes(epub, &mut manifest);
        }

        let cache = emit::cache_manifest(package.resource_paths(), now);
        emit::write_manifest_files(book_dir, &manifest, &cache)?;

        tracing::info!(
            spine = manifest.spine.len(),
            resources = manifest.resources.len(),
            anomalies = anomalies.len(),
            "已生成清单"
        );
        Ok((manifest, anomalies))
    }
}

/// 为图片资源填充宽高，读取失败时保持为空
fn probe_image_sizes<R: Read + Seek>(epub: &mut Epub<R>, manifest: &mut BookManifest) {
    let links = manifest.spine.iter_mut().chain(manifest.resources.iter_mut());
    for link in links.filter(|link| link.is_image()) {
        match epub.image_dimensions(&link.href) {
            Ok((width, height)) => {
                link.width = Some(width);
                link.height = Some(height);
            }
            Err(error) => {
                tracing::debug!(href = %link.href, %error, "无法读取图片尺寸");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::container::CONTAINER_PATH;
    use crate::epub::reader::tests::{CONTAINER_XML, build_epub, png_bytes, sample_epub};
    use crate::web::clock::FixedClock;
    use crate::web::reconcile::SpineAnomalyPolicy;
    use chrono::DateTime;
    use tempfile::TempDir;

    struct Workspace {
        _root: TempDir,
        config: ConverterConfig,
    }

    impl Workspace {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let config = ConverterConfig {
                input_dir: root.path().join("books"),
                output_dir: root.path().join("out"),
                domain: "https://books.example.com".to_string(),
                assets_dir: root.path().join("public"),
                ..ConverterConfig::default()
            };
            fs::create_dir_all(&config.input_dir).unwrap();
            fs::create_dir_all(config.assets_dir.join("polyfill")).unwrap();
            for asset in assets::SHARED_ASSETS {
                fs::write(config.assets_dir.join(asset), "// asset").unwrap();
            }
            Self { _root: root, config }
        }

        fn add_book(&self, name: &str, data: &[u8]) {
            fs::write(self.config.input_dir.join(name), data).unwrap();
        }

        fn converter(&self) -> Converter {
            let frozen = DateTime::parse_from_rfc3339("2024-03-05T09:07:01+08:00").unwrap();
            Converter::new(self.config.clone()).with_clock(FixedClock(frozen))
        }

        fn read(&self, path: &str) -> String {
            fs::read_to_string(self.config.output_dir.join(path)).unwrap()
        }
    }

    #[test]
    fn test_enumerate_only_epub_files_sorted() {
        let ws = Workspace::new();
        ws.add_book("b.epub", &sample_epub());
        ws.add_book("a.epub", &sample_epub());
        ws.add_book("notes.txt", b"not a book");
        fs::create_dir_all(ws.config.input_dir.join("dir.epub")).unwrap();

        assert_eq!(ws.converter().enumerate_books().unwrap(), ["a.epub", "b.epub"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_enumerate_follows_symlinks() {
        let ws = Workspace::new();
        let shelf = ws.config.input_dir.parent().unwrap().join("shelf");
        fs::create_dir_all(shelf.join("folder.epub")).unwrap();
        fs::write(shelf.join("alice.epub"), sample_epub()).unwrap();

        std::os::unix::fs::symlink(shelf.join("alice.epub"), ws.config.input_dir.join("linked.epub")).unwrap();
        std::os::unix::fs::symlink(shelf.join("folder.epub"), ws.config.input_dir.join("folder.epub")).unwrap();

        let converter = ws.converter();
        assert_eq!(converter.enumerate_books().unwrap(), ["linked.epub"]);
        assert!(converter.convert_book("linked.epub").is_success());
    }

    #[test]
    fn test_missing_input_dir_is_fatal() {
        let ws = Workspace::new();
        let mut config = ws.config.clone();
        config.input_dir = config.input_dir.join("nope");

        assert!(Converter::new(config).run().is_err());
    }

    #[test]
    fn test_convert_complete_book() {
        let ws = Workspace::new();
        ws.add_book("alice.epub", &sample_epub());

        let report = ws.converter().run().unwrap();
        assert_eq!(report.converted(), 1);
        assert!(report.shared_asset_failures.is_empty());

        let book = &report.books[0];
        let summary = book.manifest.as_ref().unwrap();
        assert_eq!(summary.spine, 2);
        assert_eq!(summary.resources, 3);
        assert_eq!(summary.cover.as_deref(), Some("OEBPS/images/cover.png"));
        assert_eq!(book.extracted.as_ref().unwrap().files, 8);

        let manifest: serde_json::Value = serde_json::from_str(&ws.read("alice.epub/manifest.json")).unwrap();
        assert_eq!(manifest["metadata"]["title"], "测试书籍");
        assert_eq!(manifest["metadata"]["modified"], "2024-03-05T09:07:01+08:00");
        assert_eq!(
            manifest["links"][0]["href"],
            "https://books.example.com/alice.epub/manifest.json"
        );
        assert_eq!(manifest["spine"][0]["href"], "OEBPS/text/chapter1.xhtml");
        assert_eq!(manifest["spine"][1]["href"], "OEBPS/text/chapter2.xhtml");

        let resources = manifest["resources"].as_array().unwrap();
        assert_eq!(resources[0]["href"], "OEBPS/style.css");
        assert_eq!(resources[1]["rel"], "cover");
        assert_eq!(resources[1]["width"], 4);
        assert_eq!(resources[1]["height"], 3);
        assert_eq!(resources[2]["rel"], "contents");

        let cache = ws.read("alice.epub/manifest.appcache");
        assert!(cache.contains(
            "index.html\nOEBPS/nav.xhtml\nOEBPS/text/chapter1.xhtml\nOEBPS/text/chapter2.xhtml\nOEBPS/style.css\nOEBPS/images/cover.png\n\nNETWORK:\n*\n"
        ));

        let webapp = ws.read("alice.epub/webapp.webmanifest");
        assert!(webapp.contains(r#""name":"测试书籍""#));

        let index = ws.read("alice.epub/index.html");
        assert!(index.contains("<title>测试书籍</title>"));

        assert!(ws.config.output_dir.join("alice.epub/OEBPS/style.css").exists());
        assert!(ws.config.output_dir.join("polyfill/fetch.js").exists());
    }

    #[test]
    fn test_image_sizes_for_percent_encoded_href() {
        let ws = Workspace::new();
        let opf = r#"<package><metadata><title>T</title></metadata>
<manifest>
<item id="a" href="a.xhtml" media-type="application/xhtml+xml"/>
<item id="img" href="my%20cover.png" media-type="image/png" properties="cover-image"/>
</manifest>
<spine><itemref idref="a"/></spine></package>"#;
        let cover = png_bytes(4, 3);
        ws.add_book(
            "spaced.epub",
            &build_epub(&[
                (CONTAINER_PATH, CONTAINER_XML.as_bytes()),
                ("OEBPS/content.opf", opf.as_bytes()),
                ("OEBPS/a.xhtml", b"<html/>"),
                ("OEBPS/my cover.png", &cover),
            ]),
        );

        let report = ws.converter().convert_book("spaced.epub");
        assert!(report.is_success());

        let manifest: serde_json::Value = serde_json::from_str(&ws.read("spaced.epub/manifest.json")).unwrap();
        let cover_link = &manifest["resources"][0];
        assert_eq!(cover_link["href"], "OEBPS/my%20cover.png");
        assert_eq!(cover_link["width"], 4);
        assert_eq!(cover_link["height"], 3);
    }

    #[test]
    fn test_rerun_is_byte_identical_with_frozen_clock() {
        let ws = Workspace::new();
        ws.add_book("alice.epub", &sample_epub());

        ws.converter().run().unwrap();
        let first = (ws.read("alice.epub/manifest.json"), ws.read("alice.epub/manifest.appcache"));
        ws.converter().run().unwrap();
        let second = (ws.read("alice.epub/manifest.json"), ws.read("alice.epub/manifest.appcache"));

        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_container_degrades_gracefully() {
        let ws = Workspace::new();
        ws.add_book("a-broken.epub", &build_epub(&[("mimetype", b"application/epub+zip"), ("x.txt", b"x")]));
        ws.add_book("b-good.epub", &sample_epub());
        ws.add_book("c-garbage.epub", b"definitely not a zip");

        let report = ws.converter().run().unwrap();
        assert_eq!(report.books.len(), 3);
        assert_eq!(report.converted(), 1);
        assert_eq!(report.failed(), 2);

        let broken = &report.books[0];
        assert!(broken.failed_at(Stage::Manifest));
        assert!(!broken.failed_at(Stage::Assets));
        assert!(broken.manifest.is_none());
        let broken_dir = ws.config.output_dir.join("a-broken.epub");
        assert!(!broken_dir.join(emit::MANIFEST_FILE).exists());
        assert!(!broken_dir.join(emit::WEBAPP_FILE).exists());
        assert!(broken_dir.join("x.txt").exists());

        assert!(report.books[1].is_success());

        let garbage = &report.books[2];
        assert!(garbage.failed_at(Stage::Open));
        assert_eq!(garbage.failures.len(), 1);
    }

    #[test]
    fn test_strict_policy_skips_manifest_but_keeps_webapp() {
        let ws = Workspace::new();
        let opf = r#"<package><metadata><title>T</title></metadata>
<manifest><item id="a" href="a.xhtml" media-type="application/xhtml+xml"/></manifest>
<spine><itemref idref="a"/><itemref idref="ghost"/></spine></package>"#;
        ws.add_book(
            "odd.epub",
            &build_epub(&[(CONTAINER_PATH, CONTAINER_XML.as_bytes()), ("OEBPS/content.opf", opf.as_bytes())]),
        );

        let report = ws.converter().run().unwrap();
        assert_eq!(report.books[0].manifest.as_ref().unwrap().anomalies.len(), 1);

        let mut config = ws.config.clone();
        config.spine_anomalies = SpineAnomalyPolicy::Strict;
        let strict = Converter::new(config);
        let report = strict.convert_book("odd.epub");

        assert!(report.failed_at(Stage::Manifest));
        assert!(!report.failed_at(Stage::WebApp));
        assert!(!report.failed_at(Stage::Index));
    }

    #[test]
    fn test_bad_template_only_fails_index_stage() {
        let ws = Workspace::new();
        ws.add_book("alice.epub", &sample_epub());
        let mut config = ws.config.clone();
        config.template = Some(ws.config.input_dir.join("missing-template.html"));

        let report = Converter::new(config).convert_book("alice.epub");
        assert_eq!(report.failures.len(), 1);
        assert!(report.failed_at(Stage::Index));
        assert!(report.manifest.is_some());
    }

    #[test]
    fn test_parallel_run_keeps_enumeration_order() {
        let ws = Workspace::new();
        for name in ["c.epub", "a.epub", "b.epub"] {
            ws.add_book(name, &sample_epub());
        }
        let mut config = ws.config.clone();
        config.parallel = true;

        let report = Converter::new(config).run().unwrap();
        let names: Vec<&str> = report.books.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["a.epub", "b.epub", "c.epub"]);
        assert_eq!(report.converted(), 3);
    }
}
