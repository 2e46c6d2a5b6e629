use async_trait::async_trait;
use crm_helpers::core::envelope::{HelperFailure, HelperInput, HelperOutput};
use crm_helpers::core::helper::{ExecutionContext, Helper};
use crm_helpers::core::registry::HelperRegistry;
use crm_helpers::core::schema::{ConfigSchema, PropertySchema};
use crm_helpers::core::types::ErrorCategory;

const BUILTIN_TYPES: [&str; 10] = [
    "math_it",
    "format_it",
    "copy_it",
    "date_calc",
    "tag_it",
    "clear_tags",
    "score_it",
    "goal_it",
    "trigger_automation",
    "ip_location",
];

struct Echo {
    kind: &'static str,
    flavor: &'static str,
}

impl Echo {
    fn new(kind: &'static str, flavor: &'static str) -> Self {
        Self { kind, flavor }
    }
}

#[async_trait]
impl Helper for Echo {
    fn name(&self) -> &'static str {
        "Echo"
    }
    fn helper_type(&self) -> &'static str {
        self.kind
    }
    fn category(&self) -> &'static str {
        self.flavor
    }
    fn description(&self) -> &'static str {
        "Does nothing"
    }
    fn requires_crm(&self) -> bool {
        false
    }
    fn supported_crms(&self) -> &'static [&'static str] {
        &["keap"]
    }
    fn config_schema(&self) -> ConfigSchema {
        ConfigSchema::new()
            .property("text", PropertySchema::string("Anything"))
            .required(&["text"])
    }
    async fn execute(
        &self,
        _ctx: &ExecutionContext,
        _input: HelperInput<'_>,
    ) -> Result<HelperOutput, HelperFailure> {
        Ok(HelperOutput::new().succeed("echoed"))
    }
}

#[test]
fn test_builtins_register_in_catalog_order() {
    let registry = HelperRegistry::with_builtins();
    assert_eq!(registry.len(), BUILTIN_TYPES.len());
    assert_eq!(registry.helper_types(), BUILTIN_TYPES.to_vec());
}

#[test]
fn test_every_registered_type_instantiates_itself() {
    let registry = HelperRegistry::with_builtins();
    for helper_type in registry.helper_types() {
        let helper = registry.new_helper(&helper_type).ok().unwrap();
        assert_eq!(helper.helper_type(), helper_type);
        assert!(!helper.name().is_empty());
        assert!(!helper.description().is_empty());
    }
}

#[test]
fn test_unknown_type_is_not_registered() {
    let registry = HelperRegistry::with_builtins();
    assert!(!registry.is_registered("teleport_it"));
    let err = registry.new_helper("teleport_it").err().unwrap();
    assert_eq!(err.category, ErrorCategory::NotRegistered);
    assert_eq!(
        err.context.get("helper_type").map(String::as_str),
        Some("teleport_it")
    );
}

#[test]
fn test_list_helper_info_is_stable() {
    let registry = HelperRegistry::with_builtins();
    let first = registry.list_helper_info();
    let second = registry.list_helper_info();
    let types: Vec<_> = first.iter().map(|info| info.metadata.helper_type.clone()).collect();
    assert_eq!(types, BUILTIN_TYPES.to_vec());
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_helper_info_flattens_metadata() {
    let registry = HelperRegistry::with_builtins();
    let info = registry
        .list_helper_info()
        .into_iter()
        .find(|info| info.metadata.helper_type == "math_it")
        .unwrap();
    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["type"], "math_it");
    assert_eq!(json["category"], "data");
    assert_eq!(json["requires_crm"], true);
    assert_eq!(json["config_schema"]["type"], "object");
    assert!(json.get("supported_crms").is_none());
}

#[test]
fn test_registering_twice_keeps_one_entry() {
    let mut builder = HelperRegistry::builder();
    builder.register("echo", || Box::new(Echo::new("echo", "first")));
    builder.register("noop", || Box::new(Echo::new("noop", "other")));
    builder.register("echo", || Box::new(Echo::new("echo", "second")));
    let registry = builder.build();

    assert_eq!(registry.len(), 2);
    assert_eq!(registry.helper_types(), vec!["echo", "noop"]);
    let helper = registry.new_helper("echo").ok().unwrap();
    assert_eq!(helper.category(), "second");
}

#[test]
fn test_custom_metadata_reaches_catalog() {
    let mut builder = HelperRegistry::builder();
    builder.register("echo", || Box::new(Echo::new("echo", "test")));
    let registry = builder.build();

    let info = &registry.list_helper_info()[0];
    assert!(!info.metadata.requires_crm);
    assert!(info.metadata.supports("keap"));
    assert!(!info.metadata.supports("hubspot"));
    assert!(info.config_schema.is_required("text"));
}

#[test]
fn test_registry_clones_share_entries() {
    let registry = HelperRegistry::with_builtins();
    let clone = registry.clone();
    let handle = std::thread::spawn(move || clone.is_registered("tag_it"));
    assert!(handle.join().unwrap());
    assert!(registry.is_registered("tag_it"));
}

#[test]
fn test_manual_registrations_instantiate_their_own_type() {
    let mut builder = HelperRegistry::builder();
    builder
        .register("echo", || Box::new(Echo::new("echo", "a")))
        .register("noop", || Box::new(Echo::new("noop", "b")));
    let registry = builder.build();
    for helper_type in registry.helper_types() {
        let helper = registry.new_helper(&helper_type).ok().unwrap();
        assert_eq!(helper.helper_type(), helper_type);
    }
}

#[test]
#[cfg(debug_assertions)]
#[should_panic(expected = "different helper type")]
fn test_mismatched_registration_is_caught() {
    let mut builder = HelperRegistry::builder();
    builder.register("alias", || Box::new(Echo::new("echo", "a")));
}
