//! Persona and reply types shared by the gateway and the HTTP layer.

use serde::Serialize;
use strum::{Display, EnumIter};

use crate::config::PersonaConfig;

use super::prompts::{BASIC_INSTRUCTIONS, MECHANIC_INSTRUCTIONS};

/// The assistant personas the gateway serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PersonaKind {
    /// General purpose mechanic assistant
    Mechanic,
    /// Restricted assistant behind the topic gate
    Basic,
}

impl PersonaKind {
    fn default_name(self) -> &'static str {
        match self {
            PersonaKind::Mechanic => "manual-assistant-mechanic",
            PersonaKind::Basic => "manual-assistant-basic",
        }
    }

    fn default_instructions(self) -> &'static str {
        match self {
            PersonaKind::Mechanic => MECHANIC_INSTRUCTIONS,
            PersonaKind::Basic => BASIC_INSTRUCTIONS,
        }
    }
}

/// Persona settings with per-kind defaults filled in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaSettings {
    pub kind: PersonaKind,
    pub assistant_id: Option<String>,
    pub name: String,
    pub instructions: String,
    pub override_run_instructions: bool,
    pub topic_gated: bool,
}

impl PersonaSettings {
    pub fn resolve(kind: PersonaKind, config: &PersonaConfig) -> Self {
        Self {
            kind,
            assistant_id: config
                .assistant_id
                .clone()
                .filter(|id| !id.trim().is_empty()),
            name: config
                .name
                .clone()
                .unwrap_or_else(|| kind.default_name().to_string()),
            instructions: config
                .instructions
                .clone()
                .unwrap_or_else(|| kind.default_instructions().to_string()),
            override_run_instructions: config.override_run_instructions.unwrap_or(true),
            topic_gated: config
                .topic_gated
                .unwrap_or(kind == PersonaKind::Basic),
        }
    }

    /// Bind the settings to a remote assistant
    pub fn into_persona(self, assistant_id: String) -> Persona {
        let run_instructions = self.override_run_instructions.then_some(self.instructions);
        Persona {
            kind: self.kind,
            assistant_id,
            run_instructions,
            topic_gated: self.topic_gated,
        }
    }
}

/// A persona bound to a remote assistant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub kind: PersonaKind,
    pub assistant_id: String,
    /// Instructions sent with every run, overriding the assistant's own
    pub run_instructions: Option<String>,
    pub topic_gated: bool,
}

/// Final answer returned to the HTTP caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatReply {
    pub text: String,
    pub thread: String,
}
