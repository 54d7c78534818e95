//! Property-based tests for error page lookup

use canopy_engine::*;
use proptest::prelude::*;

#[test]
fn test_first_registered_match_wins() {
    let config = Configuration::new();
    config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine"), "/error/engine")
        .unwrap();
    config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine.veto"), "/error/veto")
        .unwrap();

    assert_eq!(
        config.error_page(DEFAULT_DEVICE, &ErrorClass::new("engine.veto")),
        Some("/error/engine".to_string())
    );
    assert_eq!(
        config.default_error_page(&ErrorClass::new("engine.veto")),
        Some("/error/engine".to_string())
    );
}

#[test]
fn test_readding_class_replaces_and_moves_to_end() {
    let config = Configuration::new();
    config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine"), "/old")
        .unwrap();
    config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine.veto"), "/veto")
        .unwrap();

    let previous = config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine"), "/new")
        .unwrap();
    assert_eq!(previous, Some("/old".to_string()));

    let locations: Vec<String> = config
        .error_pages(DEFAULT_DEVICE)
        .into_iter()
        .map(|p| p.location)
        .collect();
    assert_eq!(locations, vec!["/veto", "/new"]);
    assert_eq!(
        config.error_page(DEFAULT_DEVICE, &ErrorClass::new("engine.veto")),
        Some("/veto".to_string())
    );
    assert_eq!(
        config.error_page(DEFAULT_DEVICE, &ErrorClass::new("engine.argument")),
        Some("/new".to_string())
    );
}

#[test]
fn test_page_for_engine_error() {
    let config = Configuration::new();
    config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine.richlet"), "/richlet-down")
        .unwrap();

    let err = EngineError::DeadlockSuspected {
        name: "main".to_string(),
        waited: std::time::Duration::from_secs(300),
    };
    assert_eq!(
        config.error_page_for(DEFAULT_DEVICE, &err),
        Some("/richlet-down".to_string())
    );
    let err = EngineError::InvalidArgument("x".to_string());
    assert_eq!(config.error_page_for(DEFAULT_DEVICE, &err), None);
}

#[test]
fn test_empty_class_catches_everything() {
    let config = Configuration::new();
    config
        .add_error_page("mobile", ErrorClass::new(""), "/oops")
        .unwrap();
    assert_eq!(
        config.error_page("mobile", &ErrorClass::new("anything.at.all")),
        Some("/oops".to_string())
    );
}

#[test]
fn test_empty_arguments_rejected() {
    let config = Configuration::new();
    assert!(config
        .add_error_page("", ErrorClass::new("engine"), "/e")
        .is_err());
    assert!(config
        .add_error_page(DEFAULT_DEVICE, ErrorClass::new("engine"), "")
        .is_err());
}

fn class_path() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,5}", 1..4)
}

proptest! {
    /// Pages registered for one device are invisible to another.
    #[test]
    fn prop_devices_are_isolated(
        devices in prop::collection::hash_set("[a-z]{1,6}", 2..4),
        path in class_path(),
    ) {
        let devices: Vec<String> = devices.into_iter().collect();
        let class = ErrorClass::new(path.join("."));
        let config = Configuration::new();
        config.add_error_page(&devices[0], class.clone(), "/only-here").unwrap();

        prop_assert_eq!(config.error_page(&devices[0], &class), Some("/only-here".to_string()));
        for other in &devices[1..] {
            prop_assert_eq!(config.error_page(other, &class), None);
            prop_assert!(config.error_pages(other).is_empty());
        }
    }

    /// A class covers every class nested under it, and nothing that merely
    /// shares a textual prefix.
    #[test]
    fn prop_class_covers_nested_classes(path in class_path(), extra in class_path(), suffix in "[a-z]{1,3}") {
        let parent = ErrorClass::new(path.join("."));
        let nested = ErrorClass::new(format!("{}.{}", path.join("."), extra.join(".")));
        let lookalike = ErrorClass::new(format!("{}{}", path.join("."), suffix));

        prop_assert!(parent.is_assignable_from(&parent));
        prop_assert!(parent.is_assignable_from(&nested));
        prop_assert!(!nested.is_assignable_from(&parent));
        prop_assert!(!parent.is_assignable_from(&lookalike));
    }

    /// Re-registering a class keeps a single entry for it.
    #[test]
    fn prop_one_entry_per_class(paths in prop::collection::vec(class_path(), 1..8)) {
        let config = Configuration::new();
        for (i, path) in paths.iter().enumerate() {
            config
                .add_error_page(DEFAULT_DEVICE, ErrorClass::new(path.join(".")), &format!("/p{}", i))
                .unwrap();
        }
        let distinct: std::collections::HashSet<String> = paths.iter().map(|p| p.join(".")).collect();
        prop_assert_eq!(config.error_pages(DEFAULT_DEVICE).len(), distinct.len());
    }
}
