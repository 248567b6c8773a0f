//! # Configuration Tests
//!
//! Deserialization, defaults and validation of the simulator configuration.

use o3sim_core::common::{ConfigError, RegClass};
use o3sim_core::config::{
    BranchPredictorKind, Config, FetchKind, RecoverKind, Sharing, SharingPolicy,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

#[test]
fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.general.cores, 1);
    assert_eq!(config.general.threads, 1);
    assert_eq!(config.general.recover_kind, RecoverKind::Writeback);
    assert_eq!(config.pipeline.fetch_kind, FetchKind::TimeSlice);
    assert_eq!(config.pipeline.commit_kind, SharingPolicy::Shared);
    assert_eq!(config.queues.rob_size, 64);
    assert_eq!(config.queues.rob_kind, Sharing::Private);
    assert_eq!(config.reg_file.size(RegClass::Int), 80);
    assert_eq!(config.branch_predictor.btb_sets, 256);
    assert_eq!(config.branch_predictor.btb_assoc, 4);
    assert!(config.validate().is_ok());
}

#[test]
fn test_json_overrides_selected_fields() {
    let json = r#"{
        "general": { "threads": 4, "recover_kind": "Commit", "max_cycles": 500 },
        "pipeline": { "fetch_kind": "SwitchOnEvent" },
        "queues": { "rob_kind": "Shared" },
        "branch_predictor": { "kind": "Combined" }
    }"#;
    let config = Config::from_json(json).unwrap();
    assert_eq!(config.general.threads, 4);
    assert_eq!(config.general.recover_kind, RecoverKind::Commit);
    assert_eq!(config.general.max_cycles, Some(500));
    assert_eq!(config.pipeline.fetch_kind, FetchKind::SwitchOnEvent);
    assert_eq!(config.queues.rob_kind, Sharing::Shared);
    assert_eq!(config.branch_predictor.kind, BranchPredictorKind::Combined);
    // Untouched sections keep their defaults.
    assert_eq!(config.queues.iq_size, 40);
    assert_eq!(config.pipeline.decode_width, 4);
}

#[test]
fn test_malformed_json_is_a_parse_error() {
    let err = Config::from_json("{ \"general\": ").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[rstest]
#[case::zero_rob(|c: &mut Config| c.queues.rob_size = 0, "queues.rob_size")]
#[case::zero_threads(|c: &mut Config| c.general.threads = 0, "general.threads")]
#[case::zero_issue_width(|c: &mut Config| c.pipeline.issue_width = 0, "pipeline.issue_width")]
#[case::zero_ports(|c: &mut Config| c.memory.ports = 0, "memory.ports")]
fn test_zero_sizes_rejected(#[case] edit: fn(&mut Config), #[case] field: &str) {
    let mut config = Config::default();
    edit(&mut config);
    match config.validate() {
        Err(ConfigError::Zero { field: f }) => assert_eq!(f, field),
        other => panic!("expected a zero-field error, got {other:?}"),
    }
}

#[rstest]
#[case::btb_sets(|c: &mut Config| c.branch_predictor.btb_sets = 100)]
#[case::bimod(|c: &mut Config| c.branch_predictor.bimod_size = 1000)]
#[case::block(|c: &mut Config| c.memory.block_size = 48)]
fn test_table_sizes_must_be_powers_of_two(#[case] edit: fn(&mut Config)) {
    let mut config = Config::default();
    edit(&mut config);
    assert!(matches!(
        config.validate(),
        Err(ConfigError::NotPowerOfTwo { .. })
    ));
}

#[test]
fn test_register_file_must_hold_logical_state_plus_one_uop() {
    let mut config = Config::default();
    // 18 integer registers and 4 flags, plus 4 outputs.
    config.reg_file.int_size = 25;
    match config.validate() {
        Err(ConfigError::RegisterFileTooSmall { class, size, min }) => {
            assert_eq!(class, RegClass::Int);
            assert_eq!(size, 25);
            assert_eq!(min, 26);
        }
        other => panic!("expected an undersized register file, got {other:?}"),
    }
    config.reg_file.int_size = 26;
    assert!(config.validate().is_ok());
}

#[test]
fn test_history_size_range() {
    let mut config = Config::default();
    config.branch_predictor.twolevel_history_size = 31;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OutOfRange { .. })
    ));
}

#[test]
fn test_defaults_round_trip_through_json() {
    let json = serde_json::to_string(&Config::default()).unwrap();
    assert_eq!(Config::from_json(&json).unwrap(), Config::default());
}
