// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use story_adapters::FakeLlmProvider;
use story_core::Story;

fn story() -> Story {
    Story::builder().title("Add a README").description("Write a README.md").build()
}

#[tokio::test]
async fn analyze_parses_well_formed_response() {
    let response = serde_json::json!({
        "summary": "Add documentation",
        "coreRequirements": ["create README.md"],
        "technicalConstraints": [],
        "affectedFiles": ["README.md"],
        "suggestedApproach": "write a short overview",
    })
    .to_string();
    let provider = Arc::new(FakeLlmProvider::returning(response));
    let analyzer = Analyzer::new(provider, None);
    let context = analyzer.analyze(&story()).await.unwrap();
    assert_eq!(context.summary, "Add documentation");
    assert_eq!(context.affected_files, vec!["README.md".to_string()]);
}

#[tokio::test]
async fn analyze_surfaces_transport_error_as_llm_unavailable() {
    let provider = Arc::new(FakeLlmProvider::failing("connection refused"));
    let analyzer = Analyzer::new(provider, None);
    let err = analyzer.analyze(&story()).await.unwrap_err();
    assert!(matches!(err, AnalyzerError::LlmUnavailable(_)));
}

#[tokio::test]
async fn analyze_surfaces_unparseable_response_as_parse_error() {
    let provider = Arc::new(FakeLlmProvider::returning("not json"));
    let analyzer = Analyzer::new(provider, None);
    let err = analyzer.analyze(&story()).await.unwrap_err();
    assert!(matches!(err, AnalyzerError::ParseError(_)));
}
