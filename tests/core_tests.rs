use anyhow::Result;
use serde_json::json;
use std::path::PathBuf;
use unifi_filter_sync::cli::Commands;
use unifi_filter_sync::core::FilterSync;
use unifi_filter_sync::error::{self, AuthFailure, SyncError};
use unifi_filter_sync::filters::{ContentFilter, FilterApi};

/// In-memory controller recording every call
#[derive(Default)]
struct FakeApi {
    filters: Vec<ContentFilter>,
    reject_login: bool,
    fail_update: bool,
    calls: Vec<&'static str>,
    updates: Vec<ContentFilter>,
}

impl FakeApi {
    fn with_filters(filters: Vec<ContentFilter>) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }
}

impl FilterApi for FakeApi {
    async fn login(&mut self) -> error::Result<()> {
        self.calls.push("login");
        if self.reject_login {
            return Err(SyncError::auth(AuthFailure::Rejected, "bad credentials"));
        }
        Ok(())
    }

    async fn list_filters(&mut self) -> error::Result<Vec<ContentFilter>> {
        self.calls.push("list");
        Ok(self.filters.clone())
    }

    async fn update_filter(&mut self, filter: &ContentFilter) -> error::Result<()> {
        self.calls.push("update");
        if self.fail_update {
            return Err(SyncError::Api {
                status: Some(500),
                message: "update failed".to_string(),
            });
        }
        self.updates.push(filter.clone());
        Ok(())
    }
}

fn filter(id: &str, name: &str, domains: &[&str]) -> ContentFilter {
    let object = json!({
        "_id": id,
        "name": name,
        "enabled": true,
        "block_list": domains,
        "schedule": {"mode": "ALWAYS"}
    });
    let fields = object.as_object().cloned().unwrap_or_default();
    ContentFilter::try_from(fields).expect("valid filter object")
}

fn write_temp(dir: &tempfile::TempDir, contents: &str) -> Result<PathBuf> {
    let path = dir.path().join("filters.txt");
    std::fs::write(&path, contents)?;
    Ok(path)
}

#[tokio::test]
async fn test_fetch_writes_domains_to_stdout_in_controller_order() -> Result<()> {
    let api = FakeApi::with_filters(vec![
        filter("1", "Ads", &["x.com"]),
        filter("2", "ads", &["b.com", "a.com"]),
    ]);
    let mut sync = FilterSync::new(api);
    let mut stdout = Vec::new();

    let command = Commands::Fetch {
        filter_name: "ads".to_string(),
        output: None,
    };
    sync.run(&command, &mut stdout).await?;

    let text = String::from_utf8(stdout)?;
    assert!(text.starts_with("# ads\n"));
    assert_eq!(
        unifi_filter_sync::filter_file::read(&text),
        vec!["b.com".to_string(), "a.com".to_string()]
    );
    assert_eq!(sync.api().calls, vec!["login", "list"]);
    Ok(())
}

#[tokio::test]
async fn test_fetch_to_file_leaves_stdout_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out.txt");
    let mut sync = FilterSync::new(FakeApi::with_filters(vec![filter("1", "Kids", &["g.com"])]));
    let mut stdout = Vec::new();

    sync.fetch_to("Kids", Some(out.as_path()), &mut stdout).await?;

    assert!(stdout.is_empty());
    assert!(std::fs::read_to_string(&out)?.ends_with("g.com\n"));
    Ok(())
}

#[tokio::test]
async fn test_fetch_missing_filter_writes_nothing() -> Result<()> {
    let mut sync = FilterSync::new(FakeApi::with_filters(vec![filter("1", "Ads", &["x.com"])]));
    let mut stdout = Vec::new();

    let result = sync.fetch_to("Ad", None, &mut stdout).await;

    match result {
        Err(err @ SyncError::NotFound(_)) => assert!(err.to_string().contains("'Ad'")),
        other => panic!("expected NotFound, got {:?}", other),
    }
    assert!(stdout.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_login_failure_stops_before_listing() -> Result<()> {
    let api = FakeApi {
        reject_login: true,
        ..FakeApi::with_filters(vec![filter("1", "Ads", &[])])
    };
    let mut sync = FilterSync::new(api);

    assert!(matches!(
        sync.fetch("Ads").await,
        Err(SyncError::Auth { .. })
    ));
    assert_eq!(sync.api().calls, vec!["login"]);
    Ok(())
}

#[tokio::test]
async fn test_sync_replaces_only_block_list() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_temp(&dir, "# header\nnew.com\n\nnew.com\nother.net\n")?;
    let original = filter("42", "Samsung Adblock", &["old.com"]);
    let mut sync = FilterSync::new(FakeApi::with_filters(vec![original.clone()]));

    let pushed = sync.sync("Samsung Adblock", &path).await?;

    assert_eq!(pushed, 3);
    let api = sync.into_api();
    assert_eq!(api.calls, vec!["login", "list", "update"]);
    assert_eq!(api.updates.len(), 1);
    let sent = &api.updates[0];
    assert_eq!(sent.block_list(), ["new.com", "new.com", "other.net"]);
    assert_eq!(sent.id(), original.id());
    assert_eq!(sent.name(), original.name());
    for (key, value) in original.fields() {
        if key != "block_list" {
            assert_eq!(&sent.fields()[key], value, "field {} changed", key);
        }
    }
    assert_eq!(sent.fields()["block_list"], json!(["new.com", "new.com", "other.net"]));
    Ok(())
}

#[tokio::test]
async fn test_sync_empty_file_clears_block_list() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_temp(&dir, "# only comments\n\n   \n")?;
    let mut sync = FilterSync::new(FakeApi::with_filters(vec![filter("1", "Ads", &["a.com"])]));

    assert_eq!(sync.sync("Ads", &path).await?, 0);
    let api = sync.into_api();
    assert_eq!(api.updates.len(), 1);
    assert!(api.updates[0].block_list().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sync_missing_file_never_updates() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut sync = FilterSync::new(FakeApi::with_filters(vec![filter("1", "Ads", &[])]));

    let command = Commands::Sync {
        filter_name: "Ads".to_string(),
        file: dir.path().join("missing.txt"),
    };
    let result = sync.run(&command, &mut Vec::<u8>::new()).await;

    assert!(matches!(result, Err(SyncError::File { .. })));
    assert!(sync.api().updates.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_sync_unknown_filter_never_updates() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_temp(&dir, "a.com\n")?;
    let mut sync = FilterSync::new(FakeApi::with_filters(vec![filter("1", "Ads", &[])]));

    assert!(matches!(
        sync.sync("Missing", &path).await,
        Err(SyncError::NotFound(_))
    ));
    assert!(!sync.api().calls.contains(&"update"));
    Ok(())
}

#[tokio::test]
async fn test_failed_update_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_temp(&dir, "a.com\n")?;
    let api = FakeApi {
        fail_update: true,
        ..FakeApi::with_filters(vec![filter("1", "Ads", &[])])
    };
    let mut sync = FilterSync::new(api);

    assert!(matches!(
        sync.sync("Ads", &path).await,
        Err(SyncError::Api { .. })
    ));
    Ok(())
}
