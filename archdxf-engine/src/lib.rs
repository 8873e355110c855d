pub mod command;

pub mod errors {
    use archdxf_core::document::DocumentError;
    use archdxf_io::IoError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("missing required argument: {0}")]
        MissingArgument(String),
        #[error("invalid argument {name}: {reason}")]
        InvalidArgument { name: String, reason: String },
        #[error(transparent)]
        Document(#[from] DocumentError),
        #[error(transparent)]
        Io(#[from] IoError),
    }

    impl EngineError {
        pub(crate) fn invalid(name: &str, reason: impl Into<String>) -> Self {
            Self::InvalidArgument {
                name: name.to_string(),
                reason: reason.into(),
            }
        }
    }
}

pub mod session {
    use std::path::PathBuf;

    use archdxf_core::document::Document;
    use archdxf_io::IoError;
    use tracing::info;

    use crate::errors::EngineError;

    pub const DEFAULT_FILENAME: &str = "output_plan.dxf";
    pub const DEFAULT_TEXT_HEIGHT: f64 = 0.2;

    /// 会话级默认值，由前端根据配置注入。
    #[derive(Debug, Clone)]
    pub struct SessionOptions {
        /// 相对文件名会拼接到该目录下；为空时相对于进程工作目录。
        pub output_dir: Option<PathBuf>,
        pub default_filename: String,
        pub default_text_height: f64,
    }

    impl Default for SessionOptions {
        fn default() -> Self {
            Self {
                output_dir: None,
                default_filename: DEFAULT_FILENAME.to_string(),
                default_text_height: DEFAULT_TEXT_HEIGHT,
            }
        }
    }

    /// 一个绘图会话独占一份 `Document`。调用方保证同一时刻只有一个修改在进行。
    #[derive(Debug)]
    pub struct Session {
        document: Document,
        options: SessionOptions,
    }

    impl Session {
        pub fn new() -> Self {
            Self::with_options(SessionOptions::default())
        }

        pub fn with_options(options: SessionOptions) -> Self {
            Self {
                document: Document::new(),
                options,
            }
        }

        /// 开始新项目：清空实体并重建标准图层。
        pub fn reset(&mut self) {
            self.document.reset();
            info!("新项目已创建");
        }

        #[inline]
        pub fn document(&self) -> &Document {
            &self.document
        }

        #[inline]
        pub fn document_mut(&mut self) -> &mut Document {
            &mut self.document
        }

        #[inline]
        pub fn options(&self) -> &SessionOptions {
            &self.options
        }

        /// 保存当前文档，返回写入的绝对路径。
        pub fn save(&self, filename: Option<&str>) -> Result<PathBuf, EngineError> {
            let filename = filename.unwrap_or(self.options.default_filename.as_str());
            if filename.is_empty() {
                return Err(IoError::InvalidPath("filename is empty".to_string()).into());
            }
            let target = match &self.options.output_dir {
                Some(dir) => dir.join(filename),
                None => PathBuf::from(filename),
            };
            Ok(archdxf_io::save(&self.document, target)?)
        }
    }

    impl Default for Session {
        fn default() -> Self {
            Self::new()
        }
    }

}
