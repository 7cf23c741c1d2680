//! End-to-end learning scenarios through the public API

use chrest_cognition::{Change, EventLog, MemoryAuditSink, Model, ModelError, NodeId};
use chrest_core::{Modality, ModelConfig, Pattern, SortedDomain, Time};
use std::io::Write;

fn pat(s: &str) -> Pattern {
    s.parse().unwrap()
}

fn next(m: &Model) -> Time {
    m.clocks().cognition
}

fn learn_all(m: &mut Model, patterns: &[&str]) {
    for p in patterns {
        let t = next(m);
        m.recognise_and_learn(&pat(p), t).unwrap();
    }
}

#[test]
fn test_first_pattern_becomes_root_child() {
    let mut m = Model::new(ModelConfig::default(), 0).unwrap();
    let root = m.root(Modality::Visual);

    let node = m.recognise_and_learn(&pat("visual: <A 1 1>"), 0).unwrap();

    let t = next(&m);
    let links = m.node(root).unwrap().children_at(t);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].child, node);
    assert_eq!(m.node(node).unwrap().contents(), &pat("visual: <A 1 1>"));
    assert_eq!(m.ltm_size(Modality::Visual, t), 1);
}

#[test]
fn test_stm_keeps_most_informative_compatible_node_first() {
    let mut m = Model::new(ModelConfig::default(), 0).unwrap();
    learn_all(
        &mut m,
        &[
            "visual: <A 1 1>",
            "visual: <B 2 1>",
            "visual: <C 3 1>",
            "visual: <D 4 1>",
            "visual: <E 5 1>",
        ],
    );

    let t = next(&m);
    let a = m.recognise_at(&pat("visual: <A 1 1>"), t);
    let ab = m.discriminate(a, &pat("visual: <A 1 1> <B 2 1>"), t).unwrap();
    assert_eq!(m.node(ab).unwrap().contents(), &pat("visual: <A 1 1> <B 2 1>"));

    let t = next(&m);
    m.clear_stm(Modality::Visual, t).unwrap();

    for p in [
        "visual: <C 3 1>",
        "visual: <D 4 1>",
        "visual: <E 5 1>",
        "visual: <A 1 1> <B 2 1>",
        "visual: <A 1 1>",
    ] {
        let t = next(&m);
        m.recognise(&pat(p), t).unwrap();
    }

    let t = next(&m);
    let stm = m.stm(Modality::Visual);
    assert_eq!(stm.len_at(t), 4);
    // <A> was added last, but <A B> is compatible and more informative
    assert_eq!(stm.hypothesis_at(t), Some(ab));
    assert_eq!(stm.items_at(t)[1], a);
}

#[test]
fn test_refused_operation_changes_nothing() {
    let mut m = Model::new(ModelConfig::default(), 0).unwrap();
    learn_all(&mut m, &["visual: <A 1 1>", "visual: <A 1 1> <B 2 1>"]);

    let busy_at = next(&m) - 1;
    let before = m.snapshot(next(&m) + 100_000);

    let err = m.recognise_and_learn(&pat("visual: <C 1 1>"), busy_at).unwrap_err();
    assert!(matches!(err, ModelError::ResourceBusy(_)));
    assert!(m.construct_templates(busy_at).is_err());

    assert_eq!(m.snapshot(next(&m) + 100_000), before);
}

#[test]
fn test_same_seed_same_snapshot() {
    let mut config = ModelConfig::default();
    config.rho = 0.6;
    config.seed = 11;

    let patterns = [
        "visual: <A 1 1> <B 2 1> <C 3 1>",
        "visual: <A 1 1> <D 2 1>",
        "visual: <E 1 1> <B 2 1> $",
        "verbal: <cat 0 0>",
    ];
    let run = || {
        let mut m = Model::new(config.clone(), 0).unwrap();
        for _ in 0..15 {
            learn_all(&mut m, &patterns);
        }
        m.snapshot(next(&m)).to_json_pretty().unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn test_history_is_readable() {
    let mut m = Model::new(ModelConfig::default(), 0).unwrap();
    learn_all(&mut m, &["visual: <A 1 1>"]);
    let first = next(&m);
    learn_all(&mut m, &["visual: <B 1 1>"]);

    assert_eq!(m.snapshot(first).networks[0].nodes.len(), 2);
    assert_eq!(m.snapshot(next(&m)).networks[0].nodes.len(), 3);
    assert_eq!(m.snapshot(0).networks[0].nodes.len(), 1);
}

#[test]
fn test_config_file_drives_model() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "rho: 0.0\nstm_capacity:\n  visual: 1\n").unwrap();

    let config = ModelConfig::from_file(file.path()).unwrap();
    let mut m = Model::new(config, 0).unwrap();
    learn_all(&mut m, &["visual: <A 1 1>", "visual: <B 1 1>"]);

    let t = next(&m);
    assert_eq!(m.ltm_size(Modality::Visual, t), 0);
    assert_eq!(m.stm(Modality::Visual).capacity_at(t), 1);
    assert_eq!(m.stm(Modality::Visual).len_at(t), 1);
}

#[test]
fn test_sorted_domain_normalises_contents() {
    let mut m = Model::with_domain(ModelConfig::default(), Box::new(SortedDomain), 0).unwrap();
    for _ in 0..5 {
        learn_all(&mut m, &["visual: <B 2 1> <A 1 1>"]);
    }

    let t = next(&m);
    let sorted = pat("visual: <A 1 1> <B 2 1>");
    let found = m
        .network(Modality::Visual)
        .members()
        .iter()
        .filter_map(|id| m.node(*id))
        .any(|node| node.contents() == &sorted && node.exists_at(t));
    assert!(found);
}

#[test]
fn test_sorted_domain_ignores_input_order() {
    let sorted_input = "visual: <A 1 1> <B 2 1>";
    let reversed_input = "visual: <B 2 1> <A 1 1>";

    let mut sorted = Model::with_domain(ModelConfig::default(), Box::new(SortedDomain), 0).unwrap();
    let mut mixed = Model::with_domain(ModelConfig::default(), Box::new(SortedDomain), 0).unwrap();
    for i in 0..30 {
        learn_all(&mut sorted, &[sorted_input]);
        learn_all(&mut mixed, &[if i % 2 == 0 { reversed_input } else { sorted_input }]);
    }

    let t = next(&sorted);
    assert_eq!(next(&mixed), t);
    assert_eq!(mixed.snapshot(t), sorted.snapshot(t));
    assert_eq!(mixed.ltm_size(Modality::Visual, t), sorted.ltm_size(Modality::Visual, t));

    let node = mixed.recognise_at(&pat(sorted_input), t);
    assert_ne!(node, mixed.root(Modality::Visual));
    assert_eq!(mixed.recognise_at(&pat(reversed_input), t), node);
    assert_eq!(
        mixed.node(node).unwrap().image_at(t),
        Some(&pat(sorted_input))
    );
}

#[test]
fn test_observers_see_committed_changes() {
    let mut m = Model::new(ModelConfig::default(), 0).unwrap();
    let log = EventLog::new();
    let audit = MemoryAuditSink::new();
    m.add_observer(Box::new(log.clone()));
    m.set_audit_sink(Some(Box::new(audit.clone())));

    learn_all(&mut m, &["visual: <A 1 1>"]);

    let created: Vec<NodeId> = log
        .events()
        .iter()
        .filter_map(|e| match e.change {
            Change::NodeCreated { node, .. } => Some(node),
            _ => None,
        })
        .collect();
    assert_eq!(created.len(), 1);
    assert_eq!(audit.records().len(), 1);
    assert_eq!(audit.records()[0].operation, "recognise_and_learn");

    // without a sink nothing is recorded, and behaviour is the same
    m.set_audit_sink(None);
    learn_all(&mut m, &["visual: <A 1 1>"]);
    assert_eq!(audit.records().len(), 1);
}
