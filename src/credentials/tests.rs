use super::*;
use crate::test_support::{Reply, StubFactory, temp_store};
use std::time::Duration;

const ANTHROPIC_KEY: &str = "abcdefghijABCDEFGHIJ0123456789klmnopqrst";

fn manager(store: &Arc<SecretStore>, factory: &Arc<StubFactory>) -> CredentialManager {
    CredentialManager::new(Arc::clone(store), Arc::clone(factory) as Arc<dyn ClientFactory>)
}

#[tokio::test]
async fn test_update_commits_verified_key() {
    let (_dir, path, store) = temp_store("");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let message = credentials.update("1", "AIzaSy_validlooking").await.unwrap();

    assert!(message.contains("verified"));
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_validlooking"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("GOOGLE_API_KEY=AIzaSy_validlooking"));

    let statuses = credentials.list_statuses().await;
    assert_eq!(statuses.get("1"), Some(&true));
    assert_eq!(statuses.get("2"), Some(&false));
    assert_eq!(statuses.get("3"), Some(&false));
}

#[tokio::test]
async fn test_verification_uses_deterministic_client() {
    let (_dir, _path, store) = temp_store("");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    credentials.update("3", "sk-test").await.unwrap();

    let options = factory.last_options.lock().unwrap().unwrap();
    assert_eq!(options.temperature, Some(0.0));
}

#[tokio::test]
async fn test_failed_verification_restores_previous_key() {
    let (_dir, path, store) = temp_store("GOOGLE_API_KEY=AIzaSy_old_valid\n");
    let factory = StubFactory::new(Reply::Text("I am not sure"));
    let credentials = manager(&store, &factory);

    let err = credentials.update("1", "AIzaSy_new").await.unwrap_err();

    assert!(matches!(err, CredentialError::VerificationFailure { name: "Gemini", .. }));
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_old_valid"));
    let reopened = SecretStore::open(&path).unwrap();
    assert_eq!(reopened.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_old_valid"));
}

#[tokio::test]
async fn test_failed_verification_clears_invalid_previous_key() {
    let (_dir, _path, store) = temp_store("GOOGLE_API_KEY=not-a-google-key\n");
    let factory = StubFactory::new(Reply::Fail("HTTP 400: API key not valid"));
    let credentials = manager(&store, &factory);

    let err = credentials.update("1", "AIzaSy_new").await.unwrap_err();

    match err {
        CredentialError::VerificationFailure { message, .. } => {
            assert!(message.contains("API key not valid"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some(""));
}

#[tokio::test]
async fn test_failed_verification_without_previous_key_clears() {
    let (_dir, _path, store) = temp_store("");
    let factory = StubFactory::new(Reply::BuildFail);
    let credentials = manager(&store, &factory);

    let err = credentials.update("2", ANTHROPIC_KEY).await.unwrap_err();

    assert!(matches!(err, CredentialError::VerificationFailure { name: "Claude", .. }));
    assert_eq!(store.get("ANTHROPIC_API_KEY").as_deref(), Some(""));
    assert_eq!(factory.invoked(), 0);
}

#[tokio::test]
async fn test_bad_format_rejected_before_any_write() {
    let (_dir, path, store) = temp_store("GOOGLE_API_KEY=AIzaSy_old_valid\n");
    let before = std::fs::read_to_string(&path).unwrap();
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let err = credentials.update("1", "bad-format").await.unwrap_err();

    assert!(matches!(err, CredentialError::InvalidFormat { provider: "Google" }));
    assert_eq!(err.to_string(), "Invalid Google API key format");
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_old_valid"));
    assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_unknown_provider_rejected() {
    let (_dir, _path, store) = temp_store("");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let err = credentials.update("42", "sk-anything").await.unwrap_err();
    assert!(matches!(err, CredentialError::UnknownProvider(ref id) if id == "42"));

    let err = credentials.remove("42", true).await.unwrap_err();
    assert!(matches!(err, CredentialError::UnknownProvider(_)));
}

#[tokio::test]
async fn test_persistence_failure_skips_verification() {
    let (_dir, path, store) = temp_store("OPENAI_API_KEY=sk-old\n");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir(&path).unwrap();

    let err = credentials.update("3", "sk-new").await.unwrap_err();

    assert!(matches!(err, CredentialError::PersistenceFailure { name: "GPT-4", .. }));
    assert_eq!(store.get("OPENAI_API_KEY").as_deref(), Some("sk-old"));
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_empty_update_keeps_valid_previous_key() {
    let (_dir, _path, store) = temp_store("OPENAI_API_KEY=sk-old\n");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let err = credentials.update("3", "   ").await.unwrap_err();

    assert!(matches!(err, CredentialError::VerificationFailure { .. }));
    assert_eq!(store.get("OPENAI_API_KEY").as_deref(), Some("sk-old"));
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_remove_requires_confirmation() {
    let (_dir, _path, store) = temp_store("GOOGLE_API_KEY=AIzaSy_old_valid\n");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let outcome = credentials.remove("1", false).await.unwrap();
    assert_eq!(outcome, RemoveOutcome::Cancelled);
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_old_valid"));

    let outcome = credentials.remove("1", true).await.unwrap();
    assert_eq!(outcome, RemoveOutcome::Removed);
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some(""));
    assert_eq!(factory.created(), 0);
    assert!(!credentials.has_key("1").unwrap());
}

#[tokio::test]
async fn test_verify_checks_presence_then_format() {
    let (_dir, _path, store) = temp_store("OPENAI_API_KEY=AIzaSy_wrong_vendor\nGOOGLE_API_KEY=\n");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let err = credentials.verify("1").await.unwrap_err();
    assert!(matches!(err, CredentialError::NoKeyConfigured { name: "Gemini" }));

    let err = credentials.verify("2").await.unwrap_err();
    assert!(matches!(err, CredentialError::NoKeyConfigured { name: "Claude" }));

    let err = credentials.verify("3").await.unwrap_err();
    assert!(matches!(err, CredentialError::InvalidFormat { provider: "OpenAI" }));

    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_status_report_reverifies_every_call() {
    let (_dir, _path, store) = temp_store(&format!(
        "GOOGLE_API_KEY=AIzaSy_abcdefgh1234\nANTHROPIC_API_KEY={ANTHROPIC_KEY}\n"
    ));
    let factory = StubFactory::new(Reply::OkIfKeyContains("AIzaSy"));
    let credentials = manager(&store, &factory);

    let report = credentials.status_report().await;
    assert_eq!(report.len(), 3);
    assert!(report[0].usable);
    assert_eq!(report[0].masked_key, "AIza...1234");
    assert!(!report[1].usable);
    assert!(report[1].message.as_deref().unwrap().contains("unexpected response"));
    assert!(!report[2].usable);
    assert_eq!(report[2].masked_key, "Not set");
    assert!(report[2].message.is_none());
    assert_eq!(factory.invoked(), 2);

    credentials.list_statuses().await;
    assert_eq!(factory.invoked(), 4);
}

#[tokio::test]
async fn test_is_usable_is_recomputed_after_mutation() {
    let (_dir, _path, store) = temp_store("");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    assert!(!credentials.is_usable("3"));
    credentials.update("3", "sk-live").await.unwrap();
    assert!(credentials.is_usable("3"));
    credentials.remove("3", true).await.unwrap();
    assert!(!credentials.is_usable("3"));
    assert!(!credentials.is_usable("99"));
}

#[tokio::test]
async fn test_client_for_checks_key_at_call_time() {
    let (_dir, _path, store) = temp_store("");
    let factory = StubFactory::new(Reply::Ok);
    let credentials = manager(&store, &factory);

    let err = credentials.client_for("1").await.unwrap_err();
    assert!(matches!(err, CredentialError::NoKeyConfigured { .. }));

    store.set_atomic("GOOGLE_API_KEY", "garbage").await.unwrap();
    let err = credentials.client_for("1").await.unwrap_err();
    assert!(matches!(err, CredentialError::InvalidFormat { .. }));

    store.set_atomic("GOOGLE_API_KEY", "AIzaSy_now_valid").await.unwrap();
    let credential = credentials.client_for("1").await.unwrap();
    assert_eq!(credential.config.id, "1");
    assert_eq!(credential.config.model, "gemini-2.0-flash-exp");
    assert_eq!(credential.api_key(), "AIzaSy_now_valid");
    assert!(!format!("{credential:?}").contains("AIzaSy_now_valid"));
    assert_eq!(factory.created(), 0);
}

#[tokio::test]
async fn test_client_for_with_live_verification() {
    let (_dir, _path, store) = temp_store("OPENAI_API_KEY=sk-revoked\n");
    let factory = StubFactory::new(Reply::Fail("HTTP 401: revoked"));
    let credentials = manager(&store, &factory).with_verify_before_use(true);

    let err = credentials.client_for("3").await.unwrap_err();
    assert!(matches!(err, CredentialError::VerificationFailure { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_same_key_serialize() {
    let (_dir, path, store) = temp_store("");
    let factory = StubFactory::with_delay(Reply::OkIfKeyContains("good"), Duration::from_millis(5));
    let credentials = Arc::new(manager(&store, &factory));

    let attempts: Vec<String> = (0..12)
        .map(|i| {
            if i % 3 == 0 {
                format!("sk-good-{i}")
            } else {
                format!("sk-bad-{i}")
            }
        })
        .collect();

    let handles: Vec<_> = attempts
        .iter()
        .cloned()
        .map(|value| {
            let credentials = Arc::clone(&credentials);
            tokio::spawn(async move { credentials.update("3", &value).await })
        })
        .collect();
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    // A rejected key is never left behind, even when another update
    // snapshotted it mid-flight.
    let stored = store.get("OPENAI_API_KEY").unwrap();
    assert!(stored.contains("good"), "stored {stored:?}");
    assert!(attempts.contains(&stored));

    let on_disk = SecretStore::open(&path).unwrap().get("OPENAI_API_KEY").unwrap();
    assert_eq!(stored, on_disk);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_end_with_one_attempted_value() {
    let (_dir, _path, store) = temp_store("");
    let factory = StubFactory::with_delay(Reply::Ok, Duration::from_millis(2));
    let credentials = Arc::new(manager(&store, &factory));

    let attempts: Vec<String> = (0..10).map(|i| format!("AIzaSy_attempt_{i}")).collect();
    let results = futures::future::join_all(attempts.iter().map(|value| {
        let credentials = Arc::clone(&credentials);
        async move { credentials.update("1", value).await }
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    let stored = store.get("GOOGLE_API_KEY").unwrap();
    assert!(attempts.contains(&stored));
}

#[tokio::test]
async fn test_updates_to_different_keys_do_not_wait_on_verification() {
    let (_dir, _path, store) = temp_store("");
    let slow = StubFactory::with_delay(Reply::Ok, Duration::from_millis(300));
    let credentials = Arc::new(manager(&store, &slow));

    let pending = {
        let credentials = Arc::clone(&credentials);
        tokio::spawn(async move { credentials.update("1", "AIzaSy_slow").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The slow probe holds only the Google key guard; other keys write freely.
    tokio::time::timeout(Duration::from_millis(100), store.set_atomic("OPENAI_API_KEY", "sk-fast"))
        .await
        .expect("write blocked by unrelated verification")
        .unwrap();

    pending.await.unwrap().unwrap();
    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_slow"));
}

#[tokio::test]
async fn test_abandoned_update_still_rolls_back() {
    let (_dir, path, store) = temp_store("GOOGLE_API_KEY=AIzaSy_old_valid\n");
    let factory = StubFactory::with_delay(Reply::Fail("HTTP 400: API key not valid"), Duration::from_millis(500));
    let credentials = manager(&store, &factory);

    // Caller gives up while the probe is still in flight.
    let abandoned = tokio::time::timeout(Duration::from_millis(50), credentials.update("1", "AIzaSy_new")).await;
    assert!(abandoned.is_err());

    tokio::time::sleep(Duration::from_millis(700)).await;

    assert_eq!(store.get("GOOGLE_API_KEY").as_deref(), Some("AIzaSy_old_valid"));
    let on_disk = std::fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("AIzaSy_old_valid"));
    assert!(!on_disk.contains("AIzaSy_new"));
}

#[tokio::test]
async fn test_settle_waits_for_abandoned_update() {
    let (_dir, _path, store) = temp_store("OPENAI_API_KEY=sk-old\n");
    let factory = StubFactory::with_delay(Reply::Fail("HTTP 401: revoked"), Duration::from_millis(200));
    let credentials = manager(&store, &factory);

    let abandoned = tokio::time::timeout(Duration::from_millis(20), credentials.update("3", "sk-new")).await;
    assert!(abandoned.is_err());

    credentials.settle().await;
    assert_eq!(store.get("OPENAI_API_KEY").as_deref(), Some("sk-old"));
    assert_eq!(factory.invoked(), 1);
}
