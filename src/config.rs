/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 教材 PDF 路径
    pub document_path: String,
    /// 出题表单（TOML）路径
    pub form_file: String,
    /// pdfium 动态库所在目录（为空时使用系统库）
    pub pdfium_library_dir: Option<String>,
    /// 已保存试卷的存储文件
    pub saved_tests_file: String,
    /// 存储文件大小上限（字节）
    pub store_quota_bytes: u64,
    /// 导出文件目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 连线题右列展示顺序的随机种子（为空时保持原顺序）
    pub matching_shuffle_seed: Option<u64>,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            document_path: "sach-giao-khoa.pdf".to_string(),
            form_file: "exam_form.toml".to_string(),
            pdfium_library_dir: None,
            saved_tests_file: "saved_tests.json".to_string(),
            store_quota_bytes: 5 * 1024 * 1024,
            output_dir: "output".to_string(),
            verbose_logging: false,
            matching_shuffle_seed: None,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-2.5-flash".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            document_path: std::env::var("DOCUMENT_PATH").unwrap_or(default.document_path),
            form_file: std::env::var("FORM_FILE").unwrap_or(default.form_file),
            pdfium_library_dir: std::env::var("PDFIUM_LIBRARY_DIR").ok().filter(|v| !v.trim().is_empty()).or(default.pdfium_library_dir),
            saved_tests_file: std::env::var("SAVED_TESTS_FILE").unwrap_or(default.saved_tests_file),
            store_quota_bytes: std::env::var("STORE_QUOTA_BYTES").ok().and_then(|v| v.parse().ok()).unwrap_or(default.store_quota_bytes),
            output_dir: std::env::var("OUTPUT_DIR").unwrap_or(default.output_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            matching_shuffle_seed: std::env::var("MATCHING_SHUFFLE_SEED").ok().and_then(|v| v.parse().ok()).or(default.matching_shuffle_seed),
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            llm_model_name: std::env::var("LLM_MODEL_NAME").unwrap_or(default.llm_model_name),
        }
    }
}
