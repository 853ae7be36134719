use super::*;

#[test]
fn should_expose_nothing_when_default_then_reject_every_name() {
    let headers = ExposedHeaders::default();

    assert!(matches!(&headers, ExposedHeaders::List(list) if list.is_empty()));
    assert!(!headers.exposes("X-Trace", false));
}

#[test]
fn should_trim_and_deduplicate_entries_when_list_created_then_return_unique_values() {
    let headers = ExposedHeaders::list([" X-Trace ", "x-trace", "X-Span"]);

    assert_eq!(
        headers,
        ExposedHeaders::List(vec!["X-Trace".to_string(), "X-Span".to_string()])
    );
}

#[test]
fn should_convert_single_wildcard_to_variant_when_star_provided_then_use_wildcard() {
    let headers = ExposedHeaders::list(["*"]);

    assert!(matches!(headers, ExposedHeaders::Any));
}

#[test]
fn should_merge_repeated_header_values_when_parsed_then_keep_order() {
    let headers = ExposedHeaders::parse(["X-A, X-B", "", "x-a,X-C"]);

    assert_eq!(
        headers,
        ExposedHeaders::List(vec![
            "X-A".to_string(),
            "X-B".to_string(),
            "X-C".to_string()
        ])
    );
}

#[test]
fn should_match_case_insensitively_when_name_listed_then_expose() {
    let headers = ExposedHeaders::parse(["X-Request-Id"]);

    assert!(headers.exposes("x-request-id", true));
    assert!(!headers.exposes("x-other", false));
}

#[test]
fn should_expose_any_name_when_wildcard_without_credentials_then_allow() {
    let headers = ExposedHeaders::parse(["*"]);

    assert!(headers.exposes("X-Anything", false));
    assert!(!headers.exposes("X-Anything", true));
}

#[test]
fn should_treat_wildcard_inside_list_as_literal_when_credentials_used() {
    let headers = ExposedHeaders::parse(["*, X-Trace"]);

    assert!(headers.exposes("X-Other", false));
    assert!(!headers.exposes("X-Other", true));
    assert!(headers.exposes("X-Trace", true));
}
