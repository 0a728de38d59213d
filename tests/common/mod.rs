#![allow(dead_code)]

use agentolog::config::Settings;
use agentolog::dialog::Dialog;
use agentolog::documents::xlsx::{write_table, XlsxTable};
use agentolog::llm::{LlmClient, LlmError, LlmProvider, Message};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::error::Error;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Replays canned completions in order and records every prompt it saw
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(ToString::to_string).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn chat_completion(
        &self,
        _system_prompt: &str,
        _history: &[Message],
        user_message: &str,
        _model_id: &str,
        _max_tokens: u32,
    ) -> Result<String, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(user_message.to_string());
        }
        self.replies
            .lock()
            .map_err(|e| LlmError::Unknown(e.to_string()))?
            .pop_front()
            .ok_or_else(|| LlmError::ApiError("script exhausted".to_string()))
    }
}

pub const REGISTRY_HEADER: [&str; 8] = [
    "Блок",
    "Команда",
    "Владелец",
    "Контакт",
    "Название",
    "Краткое название",
    "Описание",
    "Тип",
];

pub fn write_registry(path: &Path) -> Result<(), Box<dyn Error>> {
    let row = |cells: [&str; 8]| cells.iter().map(ToString::to_string).collect::<Vec<_>>();
    write_table(
        path,
        &XlsxTable {
            sheet_name: "Реестр".into(),
            header: REGISTRY_HEADER.iter().map(ToString::to_string).collect(),
            rows: vec![
                row([
                    "Розница",
                    "HR Tech",
                    "Иван Петров",
                    "@hr_lead",
                    "HR-ассистент",
                    "HR",
                    "Отвечает на вопросы сотрудников об отпусках",
                    "Ассистент",
                ]),
                row([
                    "КИБ",
                    "Legal AI",
                    "Анна Смирнова",
                    "@legal_lead",
                    "Аналитик договоров",
                    "Договоры",
                    "Находит риски в договорах поставки",
                    "Аналитик",
                ]),
            ],
            column_widths: vec![20.0; 8],
        },
    )?;
    Ok(())
}

/// Temp workspace with a registry fixture and settings pointing into it
pub struct Fixture {
    pub dir: TempDir,
    pub settings: Settings,
}

impl Fixture {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let registry = dir.path().join("agents.xlsx");
        write_registry(&registry)?;
        let output = dir.path().join("generated");
        std::fs::create_dir_all(&output)?;

        let settings: Settings = serde_json::from_value(serde_json::json!({
            "llm_provider": "openrouter",
            "openrouter_api_key": "test",
            "registry_path": registry,
            "ideas_journal_path": dir.path().join("ideas.txt"),
            "output_dir": output,
            "support_contact": "@agentolog_support",
        }))?;
        Ok(Self { dir, settings })
    }

    pub fn dialog(&self, provider: Arc<ScriptedProvider>) -> Arc<Dialog> {
        let llm = LlmClient::with_provider(provider, "scripted", 512);
        Arc::new(Dialog::new(&self.settings, Arc::new(llm)))
    }
}

impl Fixture {
    pub fn dialog_output(&self) -> &Path {
        &self.settings.output_dir
    }
}
