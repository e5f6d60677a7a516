use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::llm::LlmClient;

const SYSTEM_FRAMING: &str = "You are a concise assistant for a sales team's \
WhatsApp CRM bot. Answer the question in one short paragraph. If the user \
seems to want a CRM change, point them at the @bot directives instead of \
pretending to make the change.";

pub struct AssistantRuntime {
    client: Arc<dyn LlmClient>,
}

impl AssistantRuntime {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub async fn answer(&self, question: &str) -> Result<String> {
        let prompt = format!("{SYSTEM_FRAMING}\n\nQuestion: {question}");
        let completion =
            self.client.complete(&prompt).await.context("llm completion failed")?;

        let answer = completion.trim();
        if answer.is_empty() {
            bail!("llm returned an empty completion");
        }

        Ok(answer.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use super::AssistantRuntime;
    use crate::llm::LlmClient;

    struct ScriptedClient {
        completion: Result<&'static str, &'static str>,
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            assert!(prompt.contains("Question:"), "prompt should carry the framing");
            match self.completion {
                Ok(text) => Ok(text.to_owned()),
                Err(message) => bail!("{message}"),
            }
        }
    }

    #[tokio::test]
    async fn trims_the_completion() {
        let runtime = AssistantRuntime::new(Arc::new(ScriptedClient {
            completion: Ok("  Deals move stages via @bot update deal.  \n"),
        }));

        let answer = runtime.answer("how do I move a deal?").await.expect("answer");
        assert_eq!(answer, "Deals move stages via @bot update deal.");
    }

    #[tokio::test]
    async fn empty_completion_is_an_error() {
        let runtime =
            AssistantRuntime::new(Arc::new(ScriptedClient { completion: Ok("   ") }));
        assert!(runtime.answer("hello?").await.is_err());
    }

    #[tokio::test]
    async fn client_failure_propagates() {
        let runtime = AssistantRuntime::new(Arc::new(ScriptedClient {
            completion: Err("connection refused"),
        }));
        assert!(runtime.answer("hello?").await.is_err());
    }
}
