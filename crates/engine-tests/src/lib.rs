#![allow(dead_code)]

use connectors::sink::MemorySink;
use engine_core::connectors::{
    archive::Archiver,
    notify::{CollectingNotifier, Notifier},
    sink::RecordSink,
    source::CsvRecordSource,
};
use engine_processing::transform::{DeviceFaultInjection, NoFaults, fault::FaultInjectionStrategy};
use engine_runtime::job::JobResources;
use std::{path::Path, sync::Arc};

pub mod utils;

/// Wiring shared by the end-to-end tests: CSV source, in-memory sink and a
/// notifier that keeps every summary.
pub struct TestBed {
    pub sink: MemorySink,
    pub notifier: CollectingNotifier,
    pub resources: JobResources,
}

impl TestBed {
    pub fn new(input: &Path, archiver: Arc<dyn Archiver>, inject_faults: bool) -> Self {
        let sink = MemorySink::new();
        let notifier = CollectingNotifier::new();
        let resources = resources(
            input,
            Arc::new(sink.clone()),
            archiver,
            Arc::new(notifier.clone()),
            inject_faults,
        );
        Self {
            sink,
            notifier,
            resources,
        }
    }
}

pub fn resources(
    input: &Path,
    sink: Arc<dyn RecordSink>,
    archiver: Arc<dyn Archiver>,
    notifier: Arc<dyn Notifier>,
    inject_faults: bool,
) -> JobResources {
    let faults: Arc<dyn FaultInjectionStrategy> = if inject_faults {
        Arc::new(DeviceFaultInjection::default())
    } else {
        Arc::new(NoFaults)
    };
    JobResources {
        source: Arc::new(CsvRecordSource::new(input)),
        sink,
        archiver,
        notifier,
        faults,
    }
}
