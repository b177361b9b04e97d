use super::{apply_env, normalize_database_url, parse_settings, prepare_database_url, Settings};

use std::{fs, path::Path};

use grid::{ColumnId, SortDirection, SortField};

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn blank_database_url_falls_back_to_default() {
    assert_eq!(normalize_database_url("  "), Settings::default().database_url);
}

#[test]
fn keeps_memory_url_untouched() {
    assert_eq!(normalize_database_url("sqlite::memory:"), "sqlite::memory:");
}

#[test]
fn normalizes_windows_paths_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("C:\\Users\\alice\\deadlines.db"),
        "sqlite:C:/Users/alice/deadlines.db"
    );
    assert_eq!(
        normalize_database_url("sqlite://C:/Users/alice/deadlines.db"),
        "sqlite:C:/Users/alice/deadlines.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}

#[test]
fn settings_file_overrides_grid_defaults() {
    let raw = r#"
        database_url = "sqlite://./custom.db"
        log_filter = "debug"

        [active_grid]
        sort_field = "name"
        sort_direction = "descending"
        hidden_columns = ["type"]
        page_size = 25
    "#;
    let settings = parse_settings(Path::new("tools.toml"), raw).expect("parse");

    assert_eq!(settings.database_url, "sqlite://./custom.db");
    assert_eq!(settings.log_filter, "debug");
    assert_eq!(settings.active_grid.sort_field, SortField::Name);
    assert_eq!(settings.active_grid.sort_direction, SortDirection::Descending);
    assert_eq!(settings.active_grid.hidden_columns, vec![ColumnId::Type]);
    assert_eq!(settings.active_grid.page_size, 25);
    assert_eq!(settings.completed_grid, Settings::default().completed_grid);
}

#[test]
fn malformed_settings_file_is_an_error() {
    assert!(parse_settings(Path::new("tools.toml"), "database_url = [").is_err());
}

#[test]
fn prefixed_env_wins_over_plain_database_url() {
    let mut settings = Settings::default();
    apply_env(
        &mut settings,
        vars(&[
            ("APP__DATABASE_URL", "sqlite://./app.db"),
            ("DATABASE_URL", "sqlite://./plain.db"),
            ("APP__LOG", "info"),
            ("APP__PAGE_SIZE", "5"),
            ("UNRELATED", "x"),
        ]),
    )
    .expect("env");

    assert_eq!(settings.database_url, "sqlite://./app.db");
    assert_eq!(settings.log_filter, "info");
    assert_eq!(settings.active_grid.page_size, 5);
    assert_eq!(settings.completed_grid.page_size, 5);
}

#[test]
fn rejects_zero_page_size_from_env() {
    let mut settings = Settings::default();
    let err = apply_env(&mut settings, vars(&[("APP__PAGE_SIZE", "0")])).expect_err("invalid");
    assert!(err.to_string().contains("APP__PAGE_SIZE"));
}

#[tokio::test]
async fn prepared_database_url_creates_openable_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("deadlines.db");

    let prepared = prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare");
    let storage = storage::Storage::new(&prepared).await.expect("open sqlite");
    drop(storage);

    assert!(
        fs::metadata(&db_path).is_ok(),
        "database file should be created: {}",
        db_path.display()
    );
}
