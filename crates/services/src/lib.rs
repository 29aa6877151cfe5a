#![forbid(unsafe_code)]

pub mod access_service;
pub mod ai;
pub mod app_services;
pub mod content_service;
pub mod error;
pub mod ranking_service;
pub mod sessions;

pub use exam_core::Clock;
pub use sessions as session;

pub use access_service::AccessService;
pub use ai::{ASSISTANT_FALLBACK, AiClient, AiConfig, ErrorExplainer, FALLBACK_EXPLANATION};
pub use app_services::{AppConfig, AppServices};
pub use content_service::{ContentService, ImportReport, ImportedExamSpec};
pub use error::{AccessError, AiError, AppServicesError, ContentError, SessionError};
pub use ranking_service::{RankingEntry, RankingService};

pub use sessions::{
    CompletedSession, Explanation, ExplanationSlot, RevealedFeedback, SessionLoopService,
    SessionOptions, SessionService, SessionState,
};
