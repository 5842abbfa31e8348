// privacy-backend/src/features/compliance/models/mod.rs

pub mod report;

pub use report::{
    build_report, AuditObservation, ComplianceReport, ReportInputs, RequestOutcome, RiskAssessment,
    RiskLevel,
};
