use std::fmt;

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 文档读取相关错误
    #[error("文档错误: {0}")]
    Document(#[from] DocumentError),
    /// 选页（上下文组装）错误
    #[error("选页错误: {0}")]
    Selection(#[from] SelectionError),
    /// 出题会话流程错误（前置条件不满足）
    #[error("流程错误: {0}")]
    Session(#[from] SessionError),
    /// 生成服务调用失败，区分是哪一步失败
    #[error("生成失败 ({step}): {message}")]
    Generation {
        step: GenerationStep,
        message: String,
    },
    /// 持久化错误
    #[error("存储错误: {0}")]
    Persistence(#[from] PersistenceError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 三个生成步骤
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationStep {
    /// 出题矩阵
    Matrix,
    /// 试卷
    Test,
    /// 评分指南
    Solution,
}

impl fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStep::Matrix => write!(f, "矩阵"),
            GenerationStep::Test => write!(f, "试卷"),
            GenerationStep::Solution => write!(f, "评分指南"),
        }
    }
}

/// 文档读取错误
#[derive(Debug, Error)]
pub enum DocumentError {
    /// 声明的媒体类型不是分页文档
    #[error("不支持的文件类型: {media_type}，只接受 PDF")]
    UnsupportedMediaType { media_type: String },
    /// 文档完全无法解析
    #[error("无法读取文档: {reason}")]
    Unreadable { reason: String },
    /// 底层渲染库无法加载
    #[error("无法加载 PDF 渲染库: {reason}")]
    RendererUnavailable { reason: String },
}

/// 选页错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    /// 没有任何一个课题的页码范围是有效的
    #[error("请至少为一个课题填写有效的页码范围")]
    NoValidPageRange,
    /// 页码范围有效，但所选页面没有任何文字内容
    #[error("所选页面没有可用内容，请检查页码")]
    NoContentForSelectedPages,
}

/// 会话流程错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// 三个认知层级比例之和不是 100
    #[error("认知层级比例之和必须为 100%，当前为 {total}%")]
    RatioMismatch { total: u32 },
    /// 客观题比例超出 0-100
    #[error("客观题比例 {value}% 超出范围 [0, 100]")]
    InvalidRatio { value: u32 },
    /// 还没有生成矩阵
    #[error("请先生成出题矩阵")]
    MatrixRequired,
    /// 还没有生成试卷
    #[error("请先生成试卷")]
    TestRequired,
    /// 已有生成请求在进行中
    #[error("{step}生成正在进行中，请稍候")]
    StepInFlight { step: GenerationStep },
    /// 收到结果时该步骤并不在进行中
    #[error("{step}生成并未在进行中")]
    NotPending { step: GenerationStep },
    /// 还没有上传文档
    #[error("请先上传教材文档")]
    NoDocument,
    /// 至少要保留一个课题
    #[error("至少需要保留一个课题")]
    LastTopic,
    /// 找不到指定课题
    #[error("找不到课题: {id}")]
    TopicNotFound { id: String },
    /// 课题字段不合法
    #[error("课题 {id} 不合法: {reason}")]
    InvalidTopic { id: String, reason: String },
}

/// 持久化错误
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// 存储空间不足（可恢复：删掉旧试卷后重试）
    #[error("存储空间不足 ({needed} 字节，上限 {quota} 字节)，请删除部分旧试卷")]
    QuotaExceeded { needed: u64, quota: u64 },
    /// 其他写入/读取失败
    #[error("保存试卷失败 ({path}): {reason}")]
    Failed { path: String, reason: String },
    /// 找不到指定的已保存试卷
    #[error("找不到已保存的试卷: {id}")]
    NotFound { id: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 表单文件解析失败
    #[error("表单文件 {path} 解析失败: {reason}")]
    FormParseFailed { path: String, reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(ConfigError::FormParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            reason: err.to_string(),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建生成失败错误
    pub fn generation_failed(step: GenerationStep, source: impl fmt::Display) -> Self {
        AppError::Generation {
            step,
            message: source.to_string(),
        }
    }

    /// 创建文档无法读取错误
    pub fn document_unreadable(reason: impl Into<String>) -> Self {
        AppError::Document(DocumentError::Unreadable {
            reason: reason.into(),
        })
    }

    /// 是否为存储空间不足（调用方可提示用户删除旧试卷）
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            AppError::Persistence(PersistenceError::QuotaExceeded { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_error_names_failing_step() {
        let err = AppError::generation_failed(GenerationStep::Solution, "timeout");
        assert_eq!(err.to_string(), "生成失败 (评分指南): timeout");
    }

    #[test]
    fn quota_is_distinguished_from_other_persistence_failures() {
        let quota: AppError = PersistenceError::QuotaExceeded {
            needed: 10,
            quota: 5,
        }
        .into();
        let other: AppError = PersistenceError::Failed {
            path: "x.json".into(),
            reason: "denied".into(),
        }
        .into();
        assert!(quota.is_quota_exceeded());
        assert!(!other.is_quota_exceeded());
    }
}
