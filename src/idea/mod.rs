//! Idea uniqueness and cost-estimation pipeline
//!
//! The registry is consulted first: a close name match settles the question
//! without spending an LLM call. Otherwise the registry digest is embedded in a
//! prompt and the free-text answer is post-processed into a [`Verdict`].

/// Effort/budget extraction from LLM replies.
pub mod estimate;
/// Prompt builders.
pub mod prompt;
/// Character similarity ratio.
pub mod similarity;
/// Verdict and contact extraction from LLM replies.
pub mod verdict;

use crate::form::Initiative;
use crate::llm::{LlmClient, LlmError};
use crate::registry::{AgentRecord, Registry, RegistryStore};
use estimate::CostEstimate;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, warn};
pub use verdict::Verdict;

/// Outcome of a uniqueness check
#[derive(Debug, Clone)]
pub struct IdeaAssessment {
    /// Parsed judgment
    pub verdict: Verdict,
    /// Text shown to the user
    pub response: String,
    /// Who to contact about the overlapping agent
    pub contact: Option<String>,
    /// Registry records that matched before the LLM was asked
    pub matches: Vec<AgentRecord>,
}

/// Runs uniqueness checks and estimates against the registry
pub struct IdeaChecker {
    llm: Arc<LlmClient>,
    registry: Arc<RegistryStore>,
    threshold: f32,
}

impl IdeaChecker {
    /// Creates a checker; `threshold` is the similarity ratio for a registry match
    #[must_use]
    pub const fn new(llm: Arc<LlmClient>, registry: Arc<RegistryStore>, threshold: f32) -> Self {
        Self {
            llm,
            registry,
            threshold,
        }
    }

    async fn registry(&self) -> Option<Arc<Registry>> {
        match self.registry.current().await {
            Ok(registry) => Some(registry),
            Err(e) => {
                warn!("Registry unavailable, prompting without it: {e}");
                None
            }
        }
    }

    fn digest(registry: Option<&Registry>) -> String {
        registry.map_or_else(|| prompt::REGISTRY_UNAVAILABLE.to_string(), Registry::digest)
    }

    /// Checks a free-form idea
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the model could not be reached.
    pub async fn check_idea(&self, idea: &str) -> Result<IdeaAssessment, LlmError> {
        let registry = self.registry().await;

        if let Some(registry) = registry.as_deref() {
            let matches = registry.similar_to(idea, self.threshold);
            if !matches.is_empty() {
                info!(matches = matches.len(), "Idea matches the registry, skipping LLM");
                return Ok(registry_match(matches.into_iter().map(|(r, _)| r)));
            }
        }

        let response = self
            .llm
            .chat(
                prompt::SYSTEM_PROMPT,
                &prompt::idea_check(&Self::digest(registry.as_deref()), idea),
            )
            .await?;
        let verdict = verdict::parse(&response);
        let contact = verdict::extract_contact(&response)
            .or_else(|| registry.as_deref().and_then(|r| r.contact_for(idea)));
        info!(%verdict, "Idea checked");

        Ok(IdeaAssessment {
            verdict,
            response,
            contact,
            matches: Vec::new(),
        })
    }

    /// Checks a structured initiative
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the model could not be reached.
    pub async fn check_initiative(
        &self,
        initiative: &Initiative,
    ) -> Result<IdeaAssessment, LlmError> {
        let registry = self.registry().await;

        if let Some(registry) = registry.as_deref() {
            // An exact name scores 1.0, so it always leads the matches
            let mut matches: Vec<&AgentRecord> = Vec::new();
            let candidates = std::iter::once(initiative.name.as_str())
                .chain(initiative.short_name.as_deref());
            for candidate in candidates {
                for (record, _) in registry.similar_to(candidate, self.threshold) {
                    if !matches.contains(&record) {
                        matches.push(record);
                    }
                }
            }
            if !matches.is_empty() {
                info!(
                    name = %initiative.name,
                    exact = registry.contains_name(&initiative.name),
                    matches = matches.len(),
                    "Initiative already in registry"
                );
                return Ok(registry_match(matches));
            }
        }

        let response = self
            .llm
            .chat(
                prompt::SYSTEM_PROMPT,
                &prompt::initiative_check(&Self::digest(registry.as_deref()), initiative),
            )
            .await?;
        let verdict = verdict::parse(&response);
        info!(name = %initiative.name, %verdict, "Initiative checked");

        Ok(IdeaAssessment {
            verdict,
            contact: verdict::extract_contact(&response),
            response,
            matches: Vec::new(),
        })
    }

    /// Estimates effort and budget for a completed template
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the model could not be reached.
    pub async fn estimate(&self, fields: &[(String, String)]) -> Result<CostEstimate, LlmError> {
        let response = self
            .llm
            .chat(prompt::SYSTEM_PROMPT, &prompt::cost_estimate(fields))
            .await?;
        Ok(estimate::parse(&response))
    }

    /// Sends `prompt` to the model as is
    ///
    /// # Errors
    ///
    /// Returns `LlmError` if the model could not be reached.
    pub async fn ask(&self, prompt: &str) -> Result<String, LlmError> {
        self.llm.complete(prompt).await
    }
}

fn registry_match<'a>(records: impl IntoIterator<Item = &'a AgentRecord>) -> IdeaAssessment {
    let matches: Vec<AgentRecord> = records.into_iter().cloned().collect();

    let mut response = String::from("НЕ уникальна: похожие агенты уже есть в реестре.\n");
    for record in &matches {
        let _ = write!(response, "\n• **{}**", record.name);
        if let Some(description) = &record.description {
            let _ = write!(response, ": {description}");
        }
    }

    IdeaAssessment {
        verdict: Verdict::NotUnique,
        contact: matches.iter().find_map(AgentRecord::responsible),
        response,
        matches,
    }
}
