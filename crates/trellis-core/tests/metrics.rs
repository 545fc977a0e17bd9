use std::sync::Arc;
use trellis_core::{
    attachment::{AttachmentResource, UploadedFile},
    config::{AdminConfig, EntityConfig},
    model::descriptor::{PropertyDescriptor, ValueType},
    obs::{metrics_report, metrics_reset_all},
    storage::{
        BufferedResponse,
        memory::{MemoryRepository, Record},
    },
};

// Single test: the counters are process-wide and reset here.
#[test]
fn global_counters_track_protocol_traffic() {
    let mut repo = MemoryRepository::new();
    repo.define(
        "Invoice",
        vec![
            PropertyDescriptor::new("name", ValueType::Text),
            PropertyDescriptor::new("scan", ValueType::Blob),
        ],
    );
    repo.insert("Invoice", Record::new("42"))
        .expect("insert should succeed");
    let resource = AttachmentResource::bootstrap(
        AdminConfig::default().with_entity(EntityConfig::new("Invoice")),
        Arc::new(repo),
    )
    .expect("bootstrap should succeed");

    metrics_reset_all();

    let mut response = BufferedResponse::new();
    resource
        .commit("Invoice", "42", "scan", UploadedFile::new("a.bin", vec![0; 5]))
        .expect("commit should succeed");
    resource
        .fetch("Invoice", "42", "scan", &mut response)
        .expect("fetch should succeed");
    resource
        .fetch("Invoice", "42", "name", &mut response)
        .expect("fetch should succeed");
    resource
        .delete("Invoice", "42", "name")
        .expect_err("delete on a simple field should fail");
    resource
        .delete("Invoice", "1", "scan")
        .expect_err("delete on an absent instance should fail");

    let report = metrics_report(None);
    let ops = report.counters.expect("counters should be reported").ops;
    assert_eq!(ops.commit_calls, 1);
    assert_eq!(ops.bytes_committed, 5);
    assert_eq!(ops.fetch_calls, 2);
    assert_eq!(ops.fetch_skipped, 1);
    assert_eq!(ops.bytes_streamed, 5);
    assert_eq!(ops.method_not_allowed, 1);
    assert_eq!(ops.not_found, 1);

    let invoice = &report.entity_counters[0];
    assert_eq!(invoice.entity, "Invoice");
    assert_eq!(invoice.rejections, 2);
    assert!((invoice.avg_bytes_per_fetch - 2.5).abs() < f64::EPSILON);

    metrics_reset_all();
    let ops = metrics_report(None)
        .counters
        .expect("counters should be reported")
        .ops;
    assert_eq!(ops.fetch_calls, 0);
}
