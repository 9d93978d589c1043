//! Workflow definition registry.
//!
//! The registry is constructed explicitly at startup from built-in and
//! caller-supplied definitions; there is no implicit global state.

use std::collections::BTreeMap;

use serde_json::json;

use crate::domain::models::workflow::{WorkflowDefinition, WorkflowStep, WorkflowType};

/// Named collection of workflow definitions.
#[derive(Default)]
pub struct WorkflowRegistry {
    definitions: BTreeMap<String, WorkflowDefinition>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in templates.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(codebase_analysis_workflow());
        registry.register(content_generation_workflow());
        registry.register(lead_generation_workflow());
        registry
    }

    /// Register a definition under its name, replacing any previous one.
    pub fn register(&mut self, definition: WorkflowDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<&WorkflowDefinition> {
        self.definitions.get(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Multi-agent pipeline for comprehensive codebase analysis.
fn codebase_analysis_workflow() -> WorkflowDefinition {
    let mut discover = WorkflowStep::new("discover", "claude", "analyze_project_structure");
    discover.name = "Project Discovery".to_string();
    discover.description = "Scan project structure and identify key components".to_string();
    discover.parameters.insert("scan_depth".to_string(), json!("comprehensive"));

    let mut document = WorkflowStep::new("document", "gemini", "analyze_documentation")
        .with_dependencies(&["discover"]);
    document.name = "Documentation Analysis".to_string();
    document.description = "Analyze existing documentation and identify gaps".to_string();

    let mut tests = WorkflowStep::new("test", "codex", "analyze_testing")
        .with_dependencies(&["discover"]);
    tests.name = "Testing Analysis".to_string();
    tests.description = "Review testing coverage and strategies".to_string();

    let mut synthesize = WorkflowStep::new("synthesize", "claude", "synthesize_analysis")
        .with_dependencies(&["document", "test"]);
    synthesize.name = "Synthesis Report".to_string();
    synthesize.description =
        "Combine all agent analyses into comprehensive recommendations".to_string();
    synthesize
        .parameters
        .insert("report_format".to_string(), json!("executive_summary"));

    let mut definition = WorkflowDefinition::new(
        "codebase-analysis-v1",
        WorkflowType::Pipeline,
        vec![discover, document, tests, synthesize],
    );
    definition.name = "codebase-analysis".to_string();
    definition.description =
        "Multi-agent workflow for comprehensive codebase analysis and insights".to_string();
    definition
}

/// Sequential content creation workflow.
fn content_generation_workflow() -> WorkflowDefinition {
    let mut research = WorkflowStep::new("research", "claude", "research_topic");
    research.name = "Topic Research".to_string();
    research.parameters.insert("depth".to_string(), json!("comprehensive"));

    let mut outline =
        WorkflowStep::new("outline", "claude", "create_outline").with_dependencies(&["research"]);
    outline.name = "Content Outline".to_string();

    let mut write =
        WorkflowStep::new("write", "codex", "generate_content").with_dependencies(&["outline"]);
    write.name = "Content Writing".to_string();
    write.parameters.insert("tone".to_string(), json!("professional"));

    let mut edit = WorkflowStep::new("edit", "gemini", "edit_content").with_dependencies(&["write"]);
    edit.name = "Content Editing".to_string();

    let mut definition = WorkflowDefinition::new(
        "content-generation-v1",
        WorkflowType::Sequential,
        vec![research, outline, write, edit],
    );
    definition.name = "content-generation".to_string();
    definition.description =
        "Multi-agent workflow for content creation and optimization".to_string();
    definition
}

/// Lead generation pipeline; data flows between steps.
fn lead_generation_workflow() -> WorkflowDefinition {
    let mut search = WorkflowStep::new("search", "codex", "search_leads");
    search.name = "Initial Search".to_string();
    search
        .parameters
        .insert("sources".to_string(), json!(["linkedin", "company_websites", "news"]));

    let mut enrich =
        WorkflowStep::new("enrich", "claude", "enrich_profiles").with_dependencies(&["search"]);
    enrich.name = "Data Enrichment".to_string();

    let mut score =
        WorkflowStep::new("score", "claude", "analyze_leads").with_dependencies(&["enrich"]);
    score.name = "Lead Scoring".to_string();

    let mut validate =
        WorkflowStep::new("validate", "gemini", "validate_contacts").with_dependencies(&["score"]);
    validate.name = "Contact Validation".to_string();

    let mut definition = WorkflowDefinition::new(
        "lead-generation-v1",
        WorkflowType::Pipeline,
        vec![search, enrich, score, validate],
    );
    definition.name = "lead-generation".to_string();
    definition.description =
        "Multi-agent workflow for comprehensive lead generation".to_string();
    definition
}
