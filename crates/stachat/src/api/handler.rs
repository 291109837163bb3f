use std::sync::Arc;

use stachat_core::Query;
use tracing::info;

use crate::{
    api::{
        error::HandlerError,
        models::{WebhookRequest, WebhookResponse},
    },
    pipeline::AnswerPipeline,
};

#[derive(Clone)]
pub struct RequestHandler {
    pipeline: Arc<AnswerPipeline>,
    max_question_chars: Option<usize>,
}

impl RequestHandler {
    pub fn new(pipeline: Arc<AnswerPipeline>) -> Self {
        Self {
            pipeline,
            max_question_chars: None,
        }
    }

    /// Reject questions longer than `max` characters.
    pub fn with_max_question_chars(mut self, max: Option<usize>) -> Self {
        self.max_question_chars = max;
        self
    }

    /// Parse the raw webhook body and answer the question in it.
    pub async fn process_body(&self, body: &[u8]) -> Result<WebhookResponse, HandlerError> {
        let request: WebhookRequest = serde_json::from_slice(body)
            .map_err(|err| HandlerError::Validation(format!("invalid JSON body: {}", err)))?;
        self.process_request(request).await
    }

    pub async fn process_request(
        &self,
        request: WebhookRequest,
    ) -> Result<WebhookResponse, HandlerError> {
        let question = request
            .question
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| HandlerError::Validation("Question is required".to_string()))?;
        if let Some(max) = self.max_question_chars {
            if question.chars().count() > max {
                return Err(HandlerError::Validation(format!(
                    "Question exceeds {} characters",
                    max
                )));
            }
        }
        let query = Query::new(question).map_err(|err| HandlerError::Validation(err.to_string()))?;

        info!(question_chars = query.as_str().len(), "Answering webhook question");
        let answer = self.pipeline.answer(&query).await?;
        Ok(WebhookResponse { answer })
    }
}
