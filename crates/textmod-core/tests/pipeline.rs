mod support;

use std::fs;
use std::sync::Arc;

use anyhow::Result;
use pretty_assertions::assert_eq;
use serde_json::json;
use support::ScriptedOracle;
use textmod_core::services::diff::changed_lines;
use textmod_core::services::matching::search_variations;
use textmod_core::services::session::snapshot_key;
use textmod_core::{
    EngineConfig, FileMap, InMemorySessionStore, ModificationRequest, ModificationScope,
    ProjectRoot, RequestOutcome, SessionStore, TextModEngine, TextReplaceTerms,
};
use tokio_util::sync::CancellationToken;

const APP: &str = r#"export default function App() {
  return (
    <main>
      <h1>Welcome to our site</h1>
      <p>We build things.</p>
    </main>
  );
}
"#;

const CONTACT: &str = r#"export function Contact() {
  return (
    <p>
      Contact <strong>Us</strong> Today
    </p>
  );
}
"#;

fn file_map(entries: &[(&str, &str)]) -> FileMap {
    entries
        .iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect()
}

fn terms(search: &str, replacement: &str) -> TextReplaceTerms {
    TextReplaceTerms {
        search_term: search.to_string(),
        replacement_term: replacement.to_string(),
        search_variations: search_variations(search),
    }
}

fn engine(oracle: &Arc<ScriptedOracle>, config: EngineConfig) -> TextModEngine {
    TextModEngine::new(oracle.clone(), config)
}

#[tokio::test]
async fn test_single_replacement() {
    let oracle = Arc::new(ScriptedOracle::new());
    let request = ModificationRequest::new(
        "change 'Welcome to our site' to 'Hello there'",
        file_map(&[("src/App.tsx", APP)]),
    );

    let result = engine(&oracle, EngineConfig::default())
        .run_text_replace(&request, &terms("Welcome to our site", "Hello there"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.modified_files, vec!["src/App.tsx".to_string()]);
    assert_eq!(result.total_replacements, 1);
    assert_eq!(result.diffs.len(), 1);
    assert_eq!(changed_lines(&result.diffs[0]), (1, 1));
    assert!(result.diffs[0].contains("-      <h1>Welcome to our site</h1>"));
    assert!(result.diffs[0].contains("+      <h1>Hello there</h1>"));
    assert_eq!(
        result.updated_files["src/App.tsx"],
        APP.replace("Welcome to our site", "Hello there")
    );
    assert_eq!(result.applied_changes[0].strategy, "exact-snippet");
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_fragmented_term_keeps_markup() {
    let oracle = Arc::new(ScriptedOracle::new());
    let request = ModificationRequest::new("", file_map(&[("src/Contact.tsx", CONTACT)]));

    let result = engine(&oracle, EngineConfig::default())
        .run_text_replace(&request, &terms("Contact Us Today", "Reach Out Now"))
        .await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.total_replacements, 1);
    let updated = &result.updated_files["src/Contact.tsx"];
    assert!(updated.contains("Reach <strong>Out</strong> Now"));
    assert!(updated.contains("export function Contact()"));
    assert!(result.strategy_summary.contains("fragment"));
}

#[tokio::test]
async fn test_two_files() {
    let header = "export const Header = () => <header><span>Acme Corp</span></header>;\n";
    let footer = "export const Footer = () => <footer><span>Acme Corp</span></footer>;\n";
    let oracle = Arc::new(ScriptedOracle::new());
    let request = ModificationRequest::new(
        "",
        file_map(&[("src/Header.tsx", header), ("src/Footer.tsx", footer)]),
    );

    let result = engine(&oracle, EngineConfig::default())
        .run_text_replace(&request, &terms("Acme Corp", "Globex"))
        .await;

    assert!(result.success);
    assert_eq!(result.total_replacements, 2);
    assert_eq!(
        result.modified_files,
        vec!["src/Footer.tsx".to_string(), "src/Header.tsx".to_string()]
    );
    assert_eq!(result.batches.len(), 1);
    assert_eq!(result.batches[0].successful_modifications, 2);
    assert!(result.updated_files["src/Header.tsx"].contains("<span>Globex</span>"));
}

fn sale_list() -> String {
    let items: String = ["one", "two", "three", "four", "five"]
        .iter()
        .map(|n| format!("      <li>Sale {}</li>\n", n))
        .collect();
    format!(
        "export default function A() {{\n  return (\n    <ul>\n{}    </ul>\n  );\n}}\n",
        items
    )
}

const SALE_BANNER: &str = r#"export default function B() {
  return <p>Sale today</p>;
}
"#;

#[tokio::test]
async fn test_failed_batch_does_not_sink_the_rest() {
    let list = sale_list();
    let oracle = Arc::new(ScriptedOracle::new().malformed_for("src/a.tsx"));
    let config = EngineConfig {
        batch_size: 5,
        ..EngineConfig::default()
    };
    let request = ModificationRequest::new(
        "",
        file_map(&[("src/a.tsx", list.as_str()), ("src/b.tsx", SALE_BANNER)]),
    );

    let result = engine(&oracle, config)
        .run_text_replace(&request, &terms("Sale", "Deal"))
        .await;

    assert!(result.success);
    assert_eq!(result.batches.len(), 2);
    assert_eq!(result.batches[0].node_count, 5);
    assert!(result.batches[0].failed());
    assert!(!result.batches[1].failed());
    assert_eq!(result.modified_files, vec!["src/b.tsx".to_string()]);
    assert_eq!(result.total_replacements, 1);
    assert!(result.updated_files["src/b.tsx"].contains("<p>Deal today</p>"));
}

#[tokio::test]
async fn test_all_batches_failed() {
    let list = sale_list();
    let oracle = Arc::new(
        ScriptedOracle::new()
            .malformed_for("src/a.tsx")
            .malformed_for("src/b.tsx"),
    );
    let config = EngineConfig {
        batch_size: 5,
        ..EngineConfig::default()
    };
    let request = ModificationRequest::new(
        "",
        file_map(&[("src/a.tsx", list.as_str()), ("src/b.tsx", SALE_BANNER)]),
    );

    let result = engine(&oracle, config)
        .run_text_replace(&request, &terms("Sale", "Deal"))
        .await;

    assert!(!result.success);
    assert!(result.batches.iter().all(|b| b.failed()));
    assert!(result.modified_files.is_empty());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_cancel_keeps_answered_batches() {
    let cancel = CancellationToken::new();
    let oracle = Arc::new(ScriptedOracle::new().stalls_for("src/b.tsx", cancel.clone()));
    let config = EngineConfig {
        batch_size: 1,
        ..EngineConfig::default()
    };
    let request = ModificationRequest::new(
        "",
        file_map(&[
            ("src/a.tsx", "export const A = () => <p>Sale today</p>;\n"),
            ("src/b.tsx", "export const B = () => <p>Sale ends soon</p>;\n"),
        ]),
    );

    let result = engine(&oracle, config)
        .run_text_replace_with_cancel(&request, &terms("Sale", "Deal"), cancel)
        .await;

    assert!(result.success);
    assert_eq!(result.total_replacements, 1);
    assert_eq!(result.modified_files, vec!["src/a.tsx".to_string()]);
    assert!(result.updated_files["src/a.tsx"].contains("<p>Deal today</p>"));
    assert_eq!(result.batches.len(), 2);
    assert!(!result.batches[0].failed());
    assert!(result.batches[1]
        .error
        .as_deref()
        .is_some_and(|e| e.contains("cancelled")));
}

#[tokio::test]
async fn test_rerun_changes_nothing() {
    let oracle = Arc::new(ScriptedOracle::new());
    let engine = engine(&oracle, EngineConfig::default());
    let search = terms("Welcome to our site", "Hello there");

    let first = engine
        .run_text_replace(
            &ModificationRequest::new("", file_map(&[("src/App.tsx", APP)])),
            &search,
        )
        .await;
    assert!(first.success);

    let second = engine
        .run_text_replace(&ModificationRequest::new("", first.updated_files.clone()), &search)
        .await;

    assert!(!second.success);
    assert!(second.modified_files.is_empty());
    assert_eq!(second.total_replacements, 0);
    assert_eq!(oracle.calls(), 1);
}

#[tokio::test]
async fn test_no_match_never_calls_oracle() {
    let oracle = Arc::new(ScriptedOracle::new());
    let request = ModificationRequest::new("", file_map(&[("src/App.tsx", APP)]));

    let result = engine(&oracle, EngineConfig::default())
        .run_text_replace(&request, &terms("Nonexistent phrase here", "Anything"))
        .await;

    assert!(!result.success);
    assert!(result.modified_files.is_empty());
    assert!(result.error.is_some());
    assert_eq!(oracle.calls(), 0);
}

#[tokio::test]
async fn test_dry_run_leaves_disk_untouched() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("src"))?;
    fs::write(dir.path().join("src/App.tsx"), APP)?;
    fs::create_dir_all(dir.path().join("node_modules/pkg"))?;
    fs::write(dir.path().join("node_modules/pkg/index.js"), "Welcome to our site")?;

    let config = EngineConfig {
        dry_run: true,
        ..EngineConfig::default()
    };
    let root = ProjectRoot::new(dir.path());
    let files = root.load_files(&config).await?;
    assert_eq!(files.keys().map(String::as_str).collect::<Vec<_>>(), vec!["src/App.tsx"]);

    let oracle = Arc::new(ScriptedOracle::new());
    let result = engine(&oracle, config)
        .with_workspace(root)
        .run_text_replace(
            &ModificationRequest::new("", files),
            &terms("Welcome to our site", "Hello there"),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.diffs.len(), 1);
    assert_eq!(fs::read_to_string(dir.path().join("src/App.tsx"))?, APP);
    Ok(())
}

#[tokio::test]
async fn test_writes_through_workspace() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::create_dir_all(dir.path().join("src"))?;
    fs::write(dir.path().join("src/App.tsx"), APP)?;

    let config = EngineConfig::default();
    let root = ProjectRoot::new(dir.path());
    let files = root.load_files(&config).await?;

    let oracle = Arc::new(ScriptedOracle::new());
    let result = engine(&oracle, config)
        .with_workspace(root)
        .run_text_replace(
            &ModificationRequest::new("", files),
            &terms("Welcome to our site", "Hello there"),
        )
        .await;

    assert!(result.success);
    let on_disk = fs::read_to_string(dir.path().join("src/App.tsx"))?;
    assert!(on_disk.contains("<h1>Hello there</h1>"));
    assert!(!on_disk.contains("Welcome to our site"));
    Ok(())
}

#[tokio::test]
async fn test_session_log_and_snapshots() {
    let oracle = Arc::new(ScriptedOracle::new());
    let store = Arc::new(InMemorySessionStore::new());
    let engine = engine(&oracle, EngineConfig::default()).with_session_store(store.clone());

    let mut request = ModificationRequest::new("", file_map(&[("src/App.tsx", APP)]));
    request.session_id = Some("session-1".to_string());

    let result = engine
        .run_text_replace(&request, &terms("Welcome to our site", "Hello there"))
        .await;
    assert!(result.success);

    assert_eq!(
        store.get("session-1", &snapshot_key("src/App.tsx")).await,
        Some(APP.to_string())
    );
    let changes = store.changes("session-1").await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "src/App.tsx");
    assert_eq!(changes[0].replacement_count, 1);
    assert_eq!(changes[0].diff, result.diffs[0]);
}

#[tokio::test]
async fn test_handle_request_routes_text_changes() {
    let oracle = Arc::new(ScriptedOracle::new().with_classification(json!({
        "scope": "TEXT_REPLACE",
        "reasoning": "quoted text swap",
        "confidence": 0.97,
        "searchTerm": "Welcome to our site",
        "replacementTerm": "Hello there"
    })));
    let request = ModificationRequest::new(
        "change 'Welcome to our site' to 'Hello there'",
        file_map(&[("src/App.tsx", APP)]),
    );

    let outcome = engine(&oracle, EngineConfig::default())
        .handle_request(&request)
        .await;

    let result = outcome.result().expect("text replace outcome");
    assert!(result.success);
    assert_eq!(
        result.scope.as_ref().map(|d| d.scope),
        Some(ModificationScope::TextReplace)
    );
    assert_eq!(oracle.calls(), 2);

    let serialized = serde_json::to_value(&outcome).unwrap();
    assert_eq!(serialized["outcome"], "textReplaced");
    assert_eq!(serialized["result"]["totalReplacements"], 1);
}

#[tokio::test]
async fn test_handle_request_delegates_other_scopes() {
    let oracle = Arc::new(ScriptedOracle::new().with_classification(json!({
        "scope": "COMPONENT_ADDITION",
        "reasoning": "new pricing section"
    })));
    let request = ModificationRequest::new(
        "add a pricing section below the hero",
        file_map(&[("src/App.tsx", APP)]),
    );

    let outcome = engine(&oracle, EngineConfig::default())
        .handle_request(&request)
        .await;

    match outcome {
        RequestOutcome::Delegated { scope, .. } => {
            assert_eq!(scope, ModificationScope::ComponentAddition)
        }
        other => panic!("expected delegation, got {:?}", other),
    }
    assert_eq!(oracle.calls(), 1);
}
