//! LLM 服务 - 业务能力层
//!
//! 只负责"调用模型生成结构化结果"的能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点）

use anyhow::{Context, Result};
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::exam::GeneratedTest;
use crate::models::form::FormConfig;
use crate::models::matrix::TestMatrix;
use crate::models::solution::TestSolution;
use crate::services::prompts;
use crate::services::region_selector::ContextPayload;
use crate::utils::truncate_text;

/// 矩阵生成温度
pub const MATRIX_TEMPERATURE: f32 = 0.2;
/// 试卷生成温度
pub const TEST_TEMPERATURE: f32 = 0.7;
/// 评分指南生成温度
pub const SOLUTION_TEMPERATURE: f32 = 0.3;

/// 生成服务边界
///
/// 三个请求/响应操作，每个都可能很慢或失败。
/// 返回值只保证能解析成对应结构，业务校验由编排层负责。
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate_matrix(
        &self,
        payload: &ContextPayload,
        form: &FormConfig,
    ) -> Result<TestMatrix>;

    async fn generate_test(
        &self,
        payload: &ContextPayload,
        matrix: &TestMatrix,
        form: &FormConfig,
    ) -> Result<GeneratedTest>;

    async fn generate_solution(&self, test: &GeneratedTest, form: &FormConfig)
        -> Result<TestSolution>;
}

/// 把 base64 JPEG 包装成 data URL
pub fn jpeg_data_url(encoded: &str) -> String {
    format!("data:image/jpeg;base64,{}", encoded)
}

/// 解析模型返回的 JSON
///
/// 兼容 ```json ... ``` 代码块包裹的响应
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T> {
    let re = Regex::new(r"(?s)^\s*```(?:json|JSON)?\s*(.*?)\s*```\s*$")?;
    let body = match re.captures(response) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => response.trim(),
    };

    serde_json::from_str(body).with_context(|| {
        format!("响应不是预期的 JSON 结构: {}", truncate_text(body, 200))
    })
}

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 生成矩阵 / 试卷 / 评分指南
/// - 提供通用的 LLM 调用接口
/// - 不持有会话状态
/// - 不关心流程顺序
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `imgs`: base64 JPEG 列表（可选），以 data URL 追加到用户消息中
    /// - `temperature`: 采样温度
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        imgs: Option<&[String]>,
        temperature: f32,
    ) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.chars().count());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = match imgs {
            Some(images) if !images.is_empty() => {
                let mut content_parts = vec![ChatCompletionRequestUserMessageContentPart::Text(
                    ChatCompletionRequestMessageContentPartText {
                        text: user_message.to_string(),
                    },
                )];

                for encoded in images {
                    content_parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: jpeg_data_url(encoded),
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    ));
                }

                debug!("使用 Vision API，包含 {} 张图片", images.len());

                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
                    .build()?
            }
            _ => ChatCompletionRequestUserMessageArgs::default()
                .content(user_message)
                .build()?,
        };

        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(temperature)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl GenerationBackend for LlmService {
    async fn generate_matrix(
        &self,
        payload: &ContextPayload,
        form: &FormConfig,
    ) -> Result<TestMatrix> {
        let (user_message, system_message) = prompts::matrix_prompt(form, &payload.text);
        let response = self
            .send_to_llm(
                &user_message,
                Some(&system_message),
                Some(&payload.images),
                MATRIX_TEMPERATURE,
            )
            .await
            .context("无法生成出题矩阵")?;
        parse_json_response(&response)
    }

    async fn generate_test(
        &self,
        payload: &ContextPayload,
        matrix: &TestMatrix,
        form: &FormConfig,
    ) -> Result<GeneratedTest> {
        let (user_message, system_message) = prompts::test_prompt(form, matrix, &payload.text);
        let response = self
            .send_to_llm(
                &user_message,
                Some(&system_message),
                Some(&payload.images),
                TEST_TEMPERATURE,
            )
            .await
            .context("无法生成试卷")?;
        parse_json_response(&response)
    }

    async fn generate_solution(
        &self,
        test: &GeneratedTest,
        form: &FormConfig,
    ) -> Result<TestSolution> {
        let (user_message, system_message) = prompts::solution_prompt(form, test);
        let response = self
            .send_to_llm(&user_message, Some(&system_message), None, SOLUTION_TEMPERATURE)
            .await
            .context("无法生成评分指南")?;
        parse_json_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::topic::LessonTopic;

    #[test]
    fn fenced_json_is_unwrapped() {
        let response = "```json\n{\"writtenGradingGuides\":[{\"questionText\":\"Câu 1\",\"detailedGuide\":\"1 điểm\"}]}\n```";
        let solution: TestSolution = parse_json_response(response).unwrap();
        assert_eq!(solution.written_grading_guides.len(), 1);
        assert_eq!(solution.written_grading_guides[0].detailed_guide, "1 điểm");
    }

    #[test]
    fn bare_matrix_array_is_parsed() {
        let response = r#"[{"topic":"Bài 1","mcq":{"recognition":2,"comprehension":1,"application":0},"written":{"recognition":0,"comprehension":1,"application":1}}]"#;
        let matrix: TestMatrix = parse_json_response(response).unwrap();
        assert_eq!(matrix.rows.len(), 1);
        assert_eq!(matrix.rows[0].total(), 5);
        assert_eq!(matrix.topic_mismatch(&[LessonTopic::new("t", "Bài 1", 1, 2)]), None);
    }

    #[test]
    fn missing_written_collection_is_rejected() {
        let result: Result<GeneratedTest> =
            parse_json_response(r#"{"multipleChoiceQuestions":[]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn non_json_reply_is_an_error() {
        let result: Result<TestMatrix> = parse_json_response("Xin lỗi, tôi không thể giúp.");
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("响应不是预期的 JSON 结构"));
    }

    #[test]
    fn images_become_jpeg_data_urls() {
        assert_eq!(jpeg_data_url("AAAA"), "data:image/jpeg;base64,AAAA");
    }

    /// 测试真实的 LLM 调用
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_send_to_llm_simple -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_send_to_llm_simple() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = LlmService::new(&Config::from_env());
        let response = service
            .send_to_llm(
                "Trả lời bằng một từ: thủ đô của Việt Nam?",
                Some("Bạn là trợ lý ngắn gọn."),
                None,
                SOLUTION_TEMPERATURE,
            )
            .await
            .expect("LLM 调用失败");

        println!("LLM 响应: {}", response);
        assert!(!response.is_empty());
    }
}
