//! LLM 服务 - 业务能力层
//!
//! 只负责"让模型审核一道题"的能力，不关心提交记录和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行流式 API 调用
//! - 兼容 OpenAI API 的服务（如 Gemini, Azure, Doubao 等）
//! - 模型列表通过 `reqwest` 直接请求 `{base}/models`

use std::pin::Pin;

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
use futures::future::BoxFuture;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};
use crate::models::{AnswerChoices, Entry, PartialAiAnswer};
use crate::stream::PartialJsonParser;
use crate::utils::logging::truncate_text;

const SYSTEM_PROMPT: &str = "You are a helpful AI tutor that provides detailed explanations and solutions to multiple choice questions.
Your task is to:
1. Analyze the question and all answer choices
2. Determine the correct answer based on your knowledge
3. Explain why your chosen answer is correct
4. Explain why other options are incorrect
5. Provide a detailed solution process";

/// 部分结果流
pub type PartialStream = Pin<Box<dyn Stream<Item = AppResult<PartialAiAnswer>> + Send>>;

/// 一次审核请求的输入
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRequest {
    pub question: String,
    pub choices: AnswerChoices,
    /// 示意图 URL
    pub image: Option<String>,
}

impl ReviewRequest {
    pub fn from_entry(entry: &Entry) -> Self {
        Self {
            question: entry.question.clone(),
            choices: entry.answer_choices.clone(),
            image: entry.image.clone(),
        }
    }
}

/// 审核模型能力
///
/// 流程层只依赖这个 trait，测试里可以换成假的实现。
pub trait ReviewModel: Send + Sync {
    /// 模型名称，用于日志和错误信息
    fn name(&self) -> &str;

    /// 发起审核，返回部分结果流；流的最后一项是完整结果
    fn stream_review(&self, request: ReviewRequest) -> BoxFuture<'_, AppResult<PartialStream>>;

    /// 列出端点上可用的模型
    fn list_models(&self) -> BoxFuture<'_, AppResult<Vec<String>>>;
}

/// LLM 服务
///
/// 职责：
/// - 构建审核提示词（题干 + 带字母的选项 + 可选示意图）
/// - 流式调用 LLM API，把文本增量解析成部分结果
/// - 不出现 Submission / 用户身份
pub struct LlmService {
    client: Client<OpenAIConfig>,
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model_name: String,
}

impl LlmService {
    /// 创建新的 LLM 服务
    ///
    /// 密钥为空时也能创建，真正调用时才报错。
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            http: reqwest::Client::new(),
            api_key: config.llm_api_key.clone(),
            api_base: config.llm_api_base_url.trim_end_matches('/').to_string(),
            model_name: config.llm_model_name.clone(),
        }
    }

    fn ensure_credential(&self) -> AppResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingCredential.into());
        }
        Ok(())
    }

    /// 构建消息列表：系统提示词 + 用户消息（有示意图时附带图片）
    fn build_messages(
        &self,
        request: &ReviewRequest,
    ) -> AppResult<Vec<ChatCompletionRequestMessage>> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(format!("{}\n\n{}", SYSTEM_PROMPT, output_format()))
            .build()
            .map_err(build_failed)?;

        let user_text = build_user_prompt(request);
        let user_msg = match &request.image {
            Some(url) => {
                debug!("使用 Vision API，附带示意图: {}", url);
                let parts = vec![
                    ChatCompletionRequestUserMessageContentPart::Text(
                        ChatCompletionRequestMessageContentPartText { text: user_text },
                    ),
                    ChatCompletionRequestUserMessageContentPart::ImageUrl(
                        ChatCompletionRequestMessageContentPartImage {
                            image_url: ImageUrl {
                                url: url.clone(),
                                detail: Some(ImageDetail::Auto),
                            },
                        },
                    ),
                ];
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ChatCompletionRequestUserMessageContent::Array(parts))
                    .build()
                    .map_err(build_failed)?
            }
            None => ChatCompletionRequestUserMessageArgs::default()
                .content(user_text)
                .build()
                .map_err(build_failed)?,
        };

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }

    async fn open_stream(&self, request: ReviewRequest) -> AppResult<PartialStream> {
        self.ensure_credential()?;

        debug!(
            "调用 LLM 流式 API，模型: {}，题干: {}",
            self.model_name,
            truncate_text(&request.question, 40)
        );

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(self.build_messages(&request)?)
            .temperature(0.3)
            .stream(true)
            .build()
            .map_err(build_failed)?;

        let mut upstream = self.client.chat().create_stream(chat_request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            AppError::llm_api_failed(&self.model_name, e)
        })?;

        let model = self.model_name.clone();
        let stream = async_stream::stream! {
            let mut parser = PartialJsonParser::new();

            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(response) => {
                        for choice in response.choices {
                            let Some(text) = choice.delta.content else { continue };
                            if let Some(partial) = parser.push(&text) {
                                yield Ok(partial);
                            }
                        }
                    }
                    Err(e) => {
                        warn!("LLM 流式响应中断: {}", e);
                        yield Err(AppError::Llm(LlmError::StreamFailed {
                            model: model.clone(),
                            message: e.to_string(),
                        }));
                        return;
                    }
                }
            }

            let raw = parser.text().to_string();
            match parser.finish() {
                Ok(answer) => {
                    debug!("LLM 流式响应结束，共 {} 字符", raw.chars().count());
                    yield Ok(answer);
                }
                Err(reason) => {
                    warn!("LLM 返回内容无法解析: {}", reason);
                    yield Err(AppError::Llm(LlmError::MalformedOutput {
                        model: model.clone(),
                        response: truncate_text(&raw, 200),
                    }));
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn fetch_models(&self) -> AppResult<Vec<String>> {
        self.ensure_credential()?;

        let endpoint = format!("{}/models", self.api_base);
        let list_failed = |message: String| {
            AppError::Llm(LlmError::ModelListFailed {
                endpoint: endpoint.clone(),
                message,
            })
        };

        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| list_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(list_failed(format!("HTTP {}", response.status())));
        }

        let body: Value = response.json().await.map_err(|e| list_failed(e.to_string()))?;
        let models = parse_model_list(&body);
        info!("✓ 获取到 {} 个可用模型", models.len());
        Ok(models)
    }
}

impl ReviewModel for LlmService {
    fn name(&self) -> &str {
        &self.model_name
    }

    fn stream_review(&self, request: ReviewRequest) -> BoxFuture<'_, AppResult<PartialStream>> {
        Box::pin(self.open_stream(request))
    }

    fn list_models(&self) -> BoxFuture<'_, AppResult<Vec<String>>> {
        Box::pin(self.fetch_models())
    }
}

fn build_failed(err: impl std::fmt::Display) -> AppError {
    AppError::Llm(LlmError::RequestBuildFailed {
        message: err.to_string(),
    })
}

/// 用户消息：题干 + A-D 选项
fn build_user_prompt(request: &ReviewRequest) -> String {
    let choices: Vec<String> = request
        .choices
        .lettered()
        .map(|(letter, text)| format!("{}. {}", letter, text))
        .collect();

    format!(
        "Given the following multiple choice question and options, determine the correct answer and provide a detailed explanation:\n\nQuestion: {}\n\nAnswer Choices:\n{}",
        request.question,
        choices.join("\n")
    )
}

/// 要求模型输出的 JSON 结构
fn output_format() -> &'static str {
    r#"Respond with a single JSON object and nothing else:
{
  "aiAnswerMultipleChoice": "The letter (A, B, C, or D) of the correct answer",
  "explanation": "Detailed explanation of why the chosen answer is correct and why others are wrong",
  "solution": "Step-by-step solution process to arrive at the correct answer",
  "keyPoints": ["Key concepts and points to remember from this question"]
}"#
}

/// 兼容两种返回格式：OpenAI 的 `{data: [{id}]}` 和 Gemini 原生的 `{models: [{name}]}`
fn parse_model_list(body: &Value) -> Vec<String> {
    if let Some(data) = body.get("data").and_then(Value::as_array) {
        return data
            .iter()
            .filter_map(|m| m.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
    }

    body.get("models")
        .and_then(Value::as_array)
        .map(|models| {
            models
                .iter()
                .filter_map(|m| m.get("name").and_then(Value::as_str))
                .map(|name| name.trim_start_matches("models/").to_string())
                .collect()
        })
        .unwrap_or_default()
}
