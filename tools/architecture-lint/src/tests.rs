//! Unit tests for the architecture lint.

use rstest::rstest;

use super::*;

fn lint_one(file: &str, contents: &str) -> Result<(), ArchitectureLintError> {
    lint_sources(&[LintSource::new(file, contents)])
}

#[rstest]
#[case(
    "inbound/cli/mod.rs",
    "use crate::domain::SessionStore; fn run() { let _ = SessionStore::<()>::new; }",
    true
)]
#[case(
    "inbound/cli/mod.rs",
    "use crate::config::StorefrontSettings; fn run() {}",
    true
)]
#[case(
    "inbound/cli/mod.rs",
    "use crate::outbound::http::HttpStorefrontApi; fn run() {}",
    false
)]
#[case(
    "inbound/cli/mod.rs",
    "use storefront::outbound::http::HttpStorefrontApi; fn run() {}",
    false
)]
#[case("inbound/cli/mod.rs", "fn run() { let _ = reqwest::Client::new(); }", false)]
#[case("domain/session.rs", "use super::ports::StorefrontApi; fn f() {}", true)]
#[case("domain/session.rs", "use tokio::sync::watch; fn f() {}", true)]
#[case("domain/session.rs", "use crate::inbound::cli; fn f() {}", false)]
#[case("domain/session.rs", "use super::super::config::StorefrontSettings; fn f() {}", false)]
#[case("domain/session.rs", "use clap::Parser; fn f() {}", false)]
#[case("domain/session.rs", "fn f() { let _ = std::env::var(\"HOME\"); }", false)]
#[case("domain/session.rs", "use std::sync::Arc; fn f() {}", true)]
#[case("outbound/http/client.rs", "use crate::domain::ports::StorefrontApi; fn f() {}", true)]
#[case("outbound/http/client.rs", "use inbound::cli::Cli; fn f() {}", false)]
#[case("outbound/http/client.rs", "use ortho_config::OrthoConfig; fn f() {}", false)]
fn detects_boundary_violations(#[case] file: &str, #[case] contents: &str, #[case] ok: bool) {
    let result = lint_one(file, contents);
    assert_eq!(result.is_ok(), ok, "result: {result:?}");
}

#[rstest]
fn files_outside_the_layers_are_rejected() {
    let err = lint_one("config.rs", "fn f() {}").expect_err("config is not a layer");
    assert!(matches!(err, ArchitectureLintError::Parse { .. }));
}

#[rstest]
fn unparsable_sources_report_the_file() {
    let err = lint_one("domain/broken.rs", "fn {").expect_err("syntax error");
    match err {
        ArchitectureLintError::Parse { file, .. } => assert_eq!(file, "domain/broken.rs"),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[rstest]
fn repeated_imports_are_reported_once() {
    let err = lint_one(
        "domain/guard.rs",
        "use reqwest::Client; fn f() { let _ = reqwest::Client::new(); }",
    )
    .expect_err("reqwest in domain");
    let ArchitectureLintError::Violations(violations) = err else {
        panic!("expected violations");
    };
    assert_eq!(violations.len(), 1);
    assert!(violations[0].to_string().starts_with("domain/guard.rs: "));
}
