//! The exchange runner: assemble, send, record.

use crate::context::assembler::{AssembledPrompt, PromptAssembler, PromptSources};
use crate::session::SessionBuffer;
use neo_core::channel::ChannelMessage;
use neo_core::error::ChannelError;
use neo_core::message::{Message, Role};
use neo_core::provider::{GenerationParams, Provider, ProviderRequest};
use neo_core::skill::UnmatchedPolicy;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Drives one exchange at a time against the configured provider.
pub struct AgentRunner {
    /// The LLM provider to use
    provider: Arc<dyn Provider>,

    /// Content sources for the system prompt
    sources: PromptSources,

    assembler: PromptAssembler,

    /// The model to request
    model: String,

    /// Raw generation parameters; normalized on the way out
    params: GenerationParams,

    /// Shown in the debug dump only
    base_url: String,

    /// Session window in user/assistant pairs
    session_max_turns: usize,

    /// Dump each request to stderr before sending
    debug: bool,
}

/// A fully built request and the prompt behind it.
#[derive(Debug, Clone)]
pub struct PreparedExchange {
    pub prompt: AssembledPrompt,
    pub request: ProviderRequest,
}

impl AgentRunner {
    /// Create a new runner.
    pub fn new(provider: Arc<dyn Provider>, sources: PromptSources, model: impl Into<String>) -> Self {
        Self {
            provider,
            sources,
            assembler: PromptAssembler::new(),
            model: model.into(),
            params: GenerationParams::default(),
            base_url: String::new(),
            session_max_turns: neo_config::DEFAULT_SESSION_MAX_TURNS as usize,
            debug: false,
        }
    }

    /// Create a runner from a loaded configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &neo_config::AppConfig) -> Self {
        Self::new(provider, PromptSources::from_config(config), &config.model.name)
            .with_params(GenerationParams::new(config.model.max_tokens, config.model.temperature))
            .with_base_url(&config.model.base_url)
            .with_session_max_turns(config.session_max_turns())
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the session window. Zero falls back to the default.
    pub fn with_session_max_turns(mut self, max_turns: usize) -> Self {
        self.session_max_turns = if max_turns == 0 {
            neo_config::DEFAULT_SESSION_MAX_TURNS as usize
        } else {
            max_turns
        };
        self
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn session_max_turns(&self) -> usize {
        self.session_max_turns
    }

    /// Assemble the system prompt and build `[system] + history + [user]`.
    pub fn prepare(&self, user_text: &str, history: &[Message]) -> PreparedExchange {
        let prompt = self.assembler.assemble(&self.sources, user_text);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(prompt.text.clone()));
        messages.extend(history.iter().cloned());
        messages.push(Message::user(user_text));

        PreparedExchange {
            prompt,
            request: ProviderRequest {
                model: self.model.clone(),
                messages,
                params: self.params,
            },
        }
    }

    /// Single-shot exchange with no history.
    pub async fn run_once(&self, user_text: &str) -> neo_core::Result<String> {
        let prepared = self.prepare(user_text, &[]);
        self.send(prepared, user_text).await
    }

    /// Daemon exchange: history in, reply out, session updated on success.
    ///
    /// A failed exchange leaves the session untouched. An empty reply is
    /// returned but not recorded.
    pub async fn run_turn(&self, session: &mut SessionBuffer, user_text: &str) -> neo_core::Result<String> {
        let history = session.snapshot();
        let prepared = self.prepare(user_text, &history);
        let reply = self.send(prepared, user_text).await?;

        if !reply.is_empty() {
            session.append(Role::User, user_text);
            session.append(Role::Assistant, reply.as_str());
            session.trim_to_turns(self.session_max_turns);
        }
        Ok(reply)
    }

    /// Daemon loop: answer channel messages one at a time until the
    /// channel closes.
    ///
    /// The session lives for the duration of the loop and is owned by it.
    /// A transport error ends the loop and is returned.
    pub async fn serve(
        &self,
        mut inbound: mpsc::Receiver<Result<ChannelMessage, ChannelError>>,
    ) -> Result<(), ChannelError> {
        let mut session = SessionBuffer::new();
        while let Some(item) = inbound.recv().await {
            let msg = item?;
            let reply = self.run_turn(&mut session, &msg.content).await.ok();
            if !msg.reply.send(reply) {
                debug!("Reply dropped: transport went away");
            }
        }
        info!(turns = session.len(), "Channel closed, daemon stopping");
        Ok(())
    }

    async fn send(&self, prepared: PreparedExchange, user_text: &str) -> neo_core::Result<String> {
        if self.debug {
            eprint!("{}", self.debug_dump(&prepared.prompt, user_text));
        }

        debug!(
            provider = self.provider.name(),
            model = %self.model,
            prompt_chars = prepared.prompt.char_count(),
            history = prepared.request.messages.len().saturating_sub(2),
            "Sending exchange"
        );

        match self.provider.complete(prepared.request).await {
            Ok(response) => {
                info!(
                    provider = self.provider.name(),
                    reply_chars = response.text.chars().count(),
                    "Exchange completed"
                );
                Ok(response.text)
            }
            Err(e) => {
                warn!(provider = self.provider.name(), error = %e, "Exchange failed");
                Err(e.into())
            }
        }
    }

    /// Plain-text dump of a request: parameters, skills, prompt, user text.
    pub fn debug_dump(&self, prompt: &AssembledPrompt, user_text: &str) -> String {
        let params = self.params.normalized();
        let mut out = String::new();

        let _ = writeln!(out, "\n=== NEO DEBUG: request params ===");
        let _ = writeln!(out, "base_url: {}", self.base_url);
        let _ = writeln!(out, "model: {}", self.model);
        let _ = writeln!(out, "max_tokens: {}", params.max_tokens);
        let _ = writeln!(out, "temperature: {:.2}", params.temperature);

        if !self.sources.skills.is_empty() {
            let paths: Vec<String> = self
                .sources
                .skills
                .iter()
                .map(|s| s.path.display().to_string())
                .collect();
            let _ = writeln!(out, "loaded skills: {}", paths.join(", "));
            if self.sources.unmatched == UnmatchedPolicy::Skip {
                let _ = writeln!(
                    out,
                    "(unmatched: skip: only high-priority and matched skills are in the prompt; \
                     set unmatched = \"index\" to include a short index for all)"
                );
            }
        }

        let _ = writeln!(
            out,
            "\n=== NEO DEBUG: system prompt ({} chars) ===\n{}\n=== END system prompt ===",
            prompt.char_count(),
            prompt.text
        );
        let _ = writeln!(
            out,
            "\n=== NEO DEBUG: user message ({} chars) ===\n{}\n=== END user message ===\n",
            user_text.chars().count(),
            user_text
        );
        out
    }
}
