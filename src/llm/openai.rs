//! OpenAI 兼容 API 客户端
//!
//! 通过 async_openai 调用任意 OpenAI 兼容端点（可配置 base_url），
//! 使用原生 function calling：工具目录转 tools[]，响应中的 tool_calls
//! 解析回内部 ToolCall。temperature 置 0 即可获得可复现的确定性模式。

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionMessageToolCall, ChatCompletionMessageToolCalls,
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionTool, ChatCompletionTools,
    CreateChatCompletionRequestArgs, FunctionCall, FunctionObjectArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::core::AgentError;
use crate::llm::{ChatClient, ChatResponse};
use crate::memory::{Message, ToolCall};
use crate::tools::CatalogueEntry;

/// OpenAI 兼容客户端：持有 Client、model 与可选 temperature
pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    /// None 用服务端默认；Some(0.0) 为确定性模式
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<&str>,
        model: &str,
        api_key: Option<&str>,
        temperature: Option<f32>,
    ) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());

        let config = if let Some(url) = base_url {
            OpenAIConfig::new().with_api_base(url).with_api_key(api_key)
        } else {
            OpenAIConfig::new().with_api_key(api_key)
        };

        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature,
        }
    }

    fn to_request_messages(&self, messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(content.clone())
                        .build()
                        .unwrap(),
                ),
                Message::User { content } => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(content.clone())
                        .build()
                        .unwrap(),
                ),
                Message::Assistant {
                    content,
                    tool_calls,
                } => {
                    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();
                    builder.content(content.clone());
                    if !tool_calls.is_empty() {
                        builder.tool_calls(
                            tool_calls
                                .iter()
                                .map(|tc| {
                                    ChatCompletionMessageToolCalls::Function(
                                        ChatCompletionMessageToolCall {
                                            id: tc.id.clone(),
                                            function: FunctionCall {
                                                name: tc.name.clone(),
                                                arguments: tc.arguments.to_string(),
                                            },
                                        },
                                    )
                                })
                                .collect::<Vec<_>>(),
                        );
                    }
                    ChatCompletionRequestMessage::Assistant(builder.build().unwrap())
                }
                Message::Tool {
                    tool_call_id,
                    content,
                } => ChatCompletionRequestMessage::Tool(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(tool_call_id.clone())
                        .content(content.clone())
                        .build()
                        .unwrap(),
                ),
            })
            .collect()
    }

    fn to_request_tools(&self, catalogue: &[CatalogueEntry]) -> Vec<ChatCompletionTools> {
        catalogue
            .iter()
            .map(|entry| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObjectArgs::default()
                        .name(entry.name.clone())
                        .description(entry.description.clone())
                        .parameters(entry.parameters.clone())
                        .build()
                        .unwrap(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn chat(
        &self,
        messages: &[Message],
        tools: &[CatalogueEntry],
    ) -> Result<ChatResponse, AgentError> {
        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(&self.model)
            .messages(self.to_request_messages(messages));
        if !tools.is_empty() {
            builder.tools(self.to_request_tools(tools));
        }
        if let Some(t) = self.temperature {
            builder.temperature(t);
        }
        let request = builder.build().map_err(|e| AgentError::Llm(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::Llm(e.to_string()))?;

        if let Some(usage) = &response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat usage"
            );
        }

        let message = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| AgentError::Llm("empty choices in chat response".to_string()))?;

        let tool_calls = message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .filter_map(|tc| match tc {
                ChatCompletionMessageToolCalls::Function(f) => Some(ToolCall {
                    id: f.id,
                    name: f.function.name,
                    // 参数串解析失败时按空对象处理，交给工具层校验报错
                    arguments: serde_json::from_str(&f.function.arguments)
                        .unwrap_or_else(|_| serde_json::json!({})),
                }),
                _ => None,
            })
            .collect();

        Ok(ChatResponse {
            content: message.content,
            tool_calls,
        })
    }
}
