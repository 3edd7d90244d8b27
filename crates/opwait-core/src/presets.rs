//! Named wait presets for Bedrock document-intelligence operations
//!
//! Each preset bundles the status path, terminal states and polling budget
//! used when waiting on one kind of managed-service operation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::path::{PathSegment, StatusPath};
use crate::probe::StatusProbe;
use crate::request::{PollPolicy, PollRequest};
use crate::status::StatusSet;

/// Long-running operations with a known status shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Bedrock Data Automation invocation (`GetDataAutomationStatus`)
    DataAutomationJob,
    /// Agent creation or preparation (`GetAgent`)
    Agent,
    /// Agent alias creation (`GetAgentAlias`)
    AgentAlias,
    /// Action group enablement (`GetAgentActionGroup`)
    ActionGroup,
    /// Knowledge base activation (`GetKnowledgeBase`)
    KnowledgeBase,
    /// Data source availability (`GetDataSource`)
    DataSource,
    /// Single document ingestion (`GetKnowledgeBaseDocuments`)
    DocumentIngestion,
}

/// Path, states and budget for one [`OperationKind`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationPreset {
    pub kind: OperationKind,
    pub status_path: StatusPath,
    pub policy: PollPolicy,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::DataAutomationJob,
        OperationKind::Agent,
        OperationKind::AgentAlias,
        OperationKind::ActionGroup,
        OperationKind::KnowledgeBase,
        OperationKind::DataSource,
        OperationKind::DocumentIngestion,
    ];

    /// Snake-case name, as accepted by [`FromStr`]
    pub fn name(self) -> &'static str {
        match self {
            OperationKind::DataAutomationJob => "data_automation_job",
            OperationKind::Agent => "agent",
            OperationKind::AgentAlias => "agent_alias",
            OperationKind::ActionGroup => "action_group",
            OperationKind::KnowledgeBase => "knowledge_base",
            OperationKind::DataSource => "data_source",
            OperationKind::DocumentIngestion => "document_ingestion",
        }
    }

    /// Operation name used in logs and error messages
    pub fn operation_name(self) -> &'static str {
        match self {
            OperationKind::DataAutomationJob => "get_data_automation_status",
            OperationKind::Agent => "get_agent",
            OperationKind::AgentAlias => "get_agent_alias",
            OperationKind::ActionGroup => "get_agent_action_group",
            OperationKind::KnowledgeBase => "get_knowledge_base",
            OperationKind::DataSource => "get_data_source",
            OperationKind::DocumentIngestion => "get_knowledge_base_documents",
        }
    }

    pub fn status_path(self) -> StatusPath {
        let fields: &[&str] = match self {
            OperationKind::DataAutomationJob => &["status"],
            OperationKind::Agent => &["agent", "agentStatus"],
            OperationKind::AgentAlias => &["agentAlias", "agentAliasStatus"],
            OperationKind::ActionGroup => &["agentActionGroup", "actionGroupState"],
            OperationKind::KnowledgeBase => &["knowledgeBase", "status"],
            OperationKind::DataSource => &["dataSource", "status"],
            OperationKind::DocumentIngestion => {
                return StatusPath::from_trusted_segments(vec![
                    PathSegment::Field("documentDetails".into()),
                    PathSegment::Index(0),
                    PathSegment::Field("status".into()),
                ]);
            }
        };

        StatusPath::from_trusted_segments(
            fields
                .iter()
                .map(|field| PathSegment::Field((*field).to_string()))
                .collect(),
        )
    }

    pub fn policy(self) -> PollPolicy {
        let (completion, error, max_attempts, interval_secs, verbose): (
            &[&str],
            &[&str],
            u32,
            u64,
            bool,
        ) = match self {
            OperationKind::DataAutomationJob => {
                (&["Success"], &["ServiceError", "ClientError"], 15, 30, true)
            }
            // An agent that was only created reports NOT_PREPARED and is usable
            OperationKind::Agent => (&["NOT_PREPARED", "PREPARED"], &["FAILED"], 10, 2, true),
            OperationKind::AgentAlias => (&["PREPARED"], &["FAILED"], 10, 5, true),
            OperationKind::ActionGroup => (&["ENABLED"], &[], 10, 2, true),
            OperationKind::KnowledgeBase => (&["ACTIVE"], &["FAILED"], 10, 10, true),
            OperationKind::DataSource => (&["AVAILABLE"], &["FAILED"], 5, 5, true),
            OperationKind::DocumentIngestion => (&["INDEXED"], &["FAILED"], 5, 5, false),
        };

        PollPolicy::new()
            .with_completion_states(completion.iter().copied().collect::<StatusSet>())
            .with_error_states(error.iter().copied().collect::<StatusSet>())
            .with_max_attempts(max_attempts)
            .with_interval(Duration::from_secs(interval_secs))
            .with_verbose(verbose)
    }

    pub fn preset(self) -> OperationPreset {
        OperationPreset {
            kind: self,
            status_path: self.status_path(),
            policy: self.policy(),
        }
    }

    /// Build a ready-to-run request for this kind of operation
    pub fn request(self, probe: impl StatusProbe + 'static) -> PollRequest {
        PollRequest::new(self.operation_name(), probe, self.status_path()).with_policy(self.policy())
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Unrecognized preset name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation kind `{0}`")]
pub struct UnknownOperationKind(pub String);

impl FromStr for OperationKind {
    type Err = UnknownOperationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_").to_ascii_lowercase();
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.name() == normalized)
            .ok_or_else(|| UnknownOperationKind(s.to_string()))
    }
}
