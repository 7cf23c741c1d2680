//! Change notification and audit records
//!
//! The model reports what it changed after each committed operation.
//! Observers and audit sinks are passive: they receive copies and cannot
//! influence any decision.

use chrest_core::{Modality, Time};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::node::NodeId;

/// What changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    NodeCreated { node: NodeId, modality: Modality },
    LinkAdded { parent: NodeId, child: NodeId },
    ImageExtended { node: NodeId },
    StmUpdated { modality: Modality },
    SemanticLinkAdded { from: NodeId, to: NodeId },
    ProductionAdded { visual: NodeId, action: NodeId },
    ProductionReinforced { visual: NodeId, action: NodeId, weight: f64 },
    NamingAdded { visual: NodeId, verbal: NodeId },
    AssociationAdded { from: NodeId, to: NodeId },
    TemplateCreated { node: NodeId },
    SlotsFilled { node: NodeId, count: usize },
    SlotsCleared { node: NodeId },
    Reset,
}

/// A change stamped with the logical time it took effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEvent {
    pub time: Time,
    pub change: Change,
}

/// Receives committed changes
pub trait ModelObserver {
    fn model_changed(&self, event: &ModelEvent);
}

/// Observer that keeps every event it sees
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<ModelEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ModelEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelObserver for EventLog {
    fn model_changed(&self, event: &ModelEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// One audited operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub time: Time,
    pub operation: String,
    pub input: String,
    pub description: String,
    pub output: String,
}

impl AuditRecord {
    pub fn new(
        time: Time,
        operation: impl Into<String>,
        input: impl Into<String>,
        description: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            time,
            operation: operation.into(),
            input: input.into(),
            description: description.into(),
            output: output.into(),
        }
    }
}

/// Destination for audit records
pub trait AuditSink {
    fn record(&mut self, record: &AuditRecord);
}

/// Keeps records in a shared buffer
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    records: Arc<Mutex<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Records as JSON lines
    pub fn to_json_lines(&self) -> serde_json::Result<String> {
        let mut out = String::new();
        for record in self.records() {
            out.push_str(&serde_json::to_string(&record)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&mut self, record: &AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }
}

/// Emits records as `tracing` events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&mut self, record: &AuditRecord) {
        info!(
            target: "chrest::audit",
            time = record.time,
            operation = %record.operation,
            input = %record.input,
            output = %record.output,
            "{}",
            record.description
        );
    }
}
