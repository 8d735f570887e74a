pub mod config;
pub mod dashboard;
pub mod extraction;
pub mod metrics;
pub mod orchestrator;
pub mod processor;
pub mod testing;
pub mod ticket;

pub use config::{
    load_config, load_config_from_str, resolve_config, validate_config, Config, ConfigError,
    SanitizedConfig,
};
pub use dashboard::{compute_metrics, DashboardMetrics};
pub use extraction::{ExtractionEngine, ExtractionError};
pub use orchestrator::{NewAttachment, NewTicket, OrchestratorError, Stage, StageOrchestrator};
pub use processor::{
    CodeMappings, FallbackPolicy, MappingsError, ProcessorError, ProxyProcessor, StageProcessor,
};
pub use ticket::{
    AttachmentError, AttachmentInfo, ExtractionMethod, FsAttachmentStore, NextAction, RawTicket,
    SqliteTicketStore, StageStatus, Ticket, TicketError, TicketFilter, TicketPriority,
    TicketStatus, TicketStore, TicketSummary,
};
