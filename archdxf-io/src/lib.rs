use std::ffi::OsString;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use archdxf_core::document::Document;
use thiserror::Error;
use tracing::{debug, info};

mod writer;

pub use writer::{encode, write_document};

const DXF_EXTENSION: &str = ".dxf";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("invalid output path: {0}")]
    InvalidPath(String),
    #[error("failed to create directory {path:?}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub trait DocumentSaver {
    /// 将文档写入给定的最终路径，已存在的文件会被覆盖。
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError>;
}

pub struct DxfFacade;

impl DxfFacade {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DxfFacade {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSaver for DxfFacade {
    fn save(&self, document: &Document, path: &Path) -> Result<(), IoError> {
        let write_error = |source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        };
        // 文件句柄随 BufWriter 一起释放，出错时同样会关闭。
        let file = File::create(path).map_err(write_error)?;
        let mut sink = BufWriter::new(file);
        write_document(document, &mut sink).map_err(write_error)?;
        debug!(
            path = %path.display(),
            entities = document.entity_count(),
            "DXF 已写入"
        );
        Ok(())
    }
}

/// 保存文档：补全 `.dxf` 后缀、解析为绝对路径、创建缺失的父目录，返回最终路径。
/// 文档本身不会被修改。
pub fn save(document: &Document, filename: impl AsRef<Path>) -> Result<PathBuf, IoError> {
    let path = resolve_output_path(filename.as_ref())?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| IoError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    DxfFacade::new().save(document, &path)?;
    info!(
        path = %path.display(),
        layers = document.layer_count(),
        entities = document.entity_count(),
        "图纸已保存"
    );
    Ok(path)
}

/// 补全 `.dxf` 后缀（大小写不敏感）并转换为绝对路径。
pub fn resolve_output_path(filename: &Path) -> Result<PathBuf, IoError> {
    if filename.as_os_str().is_empty() {
        return Err(IoError::InvalidPath("filename is empty".to_string()));
    }
    let named = with_dxf_extension(filename);
    std::path::absolute(&named).map_err(|source| {
        IoError::InvalidPath(format!("cannot resolve {}: {source}", named.display()))
    })
}

fn with_dxf_extension(filename: &Path) -> PathBuf {
    let has_extension = filename
        .to_string_lossy()
        .to_lowercase()
        .ends_with(DXF_EXTENSION);
    if has_extension {
        filename.to_path_buf()
    } else {
        let mut raw = OsString::from(filename.as_os_str());
        raw.push(DXF_EXTENSION);
        PathBuf::from(raw)
    }
}
