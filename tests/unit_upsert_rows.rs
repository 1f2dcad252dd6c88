use anyhow::Result;
use serde_json::json;
use sheets_bridge::backend::{BackendCall, InMemoryBackend};
use sheets_bridge::errors::{ErrorKind, classify};
use sheets_bridge::ops::{UpsertRowsParams, upsert_rows};
use sheets_bridge::rows::RawPayload;

mod support;
use support::SPREADSHEET;

fn params(key_column: &str, data: serde_json::Value) -> UpsertRowsParams {
    UpsertRowsParams {
        spreadsheet_id: Some(SPREADSHEET.to_string()),
        sheet_name: Some("People".to_string()),
        key_column: Some(key_column.to_string()),
        data_to_upsert: Some(RawPayload::from(data)),
        confirm_upsert: Some(true),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn updates_known_keys_in_place_and_appends_new_ones() -> Result<()> {
    let (state, provider) = support::memory_state(support::people());

    let response = upsert_rows(
        state,
        params(
            "id",
            json!([
                {"id": 2, "name": "Grace Hopper", "email": "grace@navy.mil"},
                {"id": "9", "email": "new@example.com", "name": "Newcomer"}
            ]),
        ),
    )
    .await?;

    assert_eq!((response.updated, response.inserted, response.total), (1, 1, 2));
    assert_eq!(response.message, "Upsert complete: 1 updated, 1 inserted.");

    let rows = provider.backend().sheet_rows(SPREADSHEET, "People").unwrap();
    assert_eq!(rows.len(), 7);
    assert_eq!(rows[2], vec!["2", "Grace Hopper", "grace@navy.mil"]);
    // Appended values follow the sheet's header order, not the record's.
    assert_eq!(rows[6], vec!["9", "Newcomer", "new@example.com"]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn reads_once_then_updates_then_appends() -> Result<()> {
    let (state, provider) = support::memory_state(support::people());

    upsert_rows(
        state,
        params(
            "id",
            json!([{"id": "1", "name": "A"}, {"id": "7"}, {"id": "3", "name": "E"}]),
        ),
    )
    .await?;

    let calls = provider.backend().calls();
    let kinds: Vec<&str> = calls
        .iter()
        .map(|call| match call {
            BackendCall::GetValues { .. } => "get",
            BackendCall::UpdateValues { .. } => "update",
            BackendCall::AppendValues { .. } => "append",
            _ => "other",
        })
        .collect();
    assert_eq!(kinds, vec!["get", "update", "update", "append"]);

    let BackendCall::UpdateValues { range, values, .. } = &calls[1] else {
        unreachable!()
    };
    assert_eq!(range, "People!A2:C2");
    assert_eq!(values, &vec![vec![json!("1"), json!("A"), json!("")]]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn record_without_key_rejects_the_whole_request() {
    let (state, provider) = support::memory_state(support::people());

    let err = upsert_rows(
        state,
        params("id", json!([{"id": "1", "name": "A"}, {"name": "no key"}, {"id": " "}])),
    )
    .await
    .unwrap_err();

    assert_eq!(classify(&err), ErrorKind::Validation);
    let message = format!("{err:#}");
    assert!(message.contains("missing or blank in record(s) #2, #3"), "{message}");
    assert!(provider.scopes().is_empty());
    assert!(provider.backend().calls().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn unknown_key_column_lists_the_headers() {
    let (state, _provider) = support::memory_state(support::people());

    let err = upsert_rows(state, params("sku", json!([{"sku": "1"}])))
        .await
        .unwrap_err();
    assert_eq!(
        format!("{err:#}"),
        "Failed to upsert rows in Google Sheet: Key column 'sku' not found in sheet headers: [\"id\", \"name\", \"email\"]"
    );
}

#[tokio::test(flavor = "current_thread")]
async fn empty_sheet_has_no_headers_to_match() {
    let backend = InMemoryBackend::new().with_sheet(SPREADSHEET, "People", Vec::<Vec<String>>::new());
    let (state, _provider) = support::memory_state(backend);

    let err = upsert_rows(state, params("id", json!([{"id": "1"}])))
        .await
        .unwrap_err();
    assert!(format!("{err:#}").ends_with("Sheet is empty or missing headers"));
}

#[tokio::test(flavor = "current_thread")]
async fn validation_order_matches_field_order() {
    let (state, provider) = support::memory_state(support::people());

    let mut missing_key = params("id", json!([{"id": "1"}]));
    missing_key.key_column = Some("  ".to_string());
    let err = upsert_rows(state.clone(), missing_key).await.unwrap_err();
    assert_eq!(err.to_string(), "Key column is required");

    let mut unconfirmed = params("id", json!("not json at all"));
    unconfirmed.confirm_upsert = None;
    let err = upsert_rows(state.clone(), unconfirmed).await.unwrap_err();
    assert_eq!(classify(&err), ErrorKind::ConfirmationRequired);

    let err = upsert_rows(state, params("id", json!("[{oops"))).await.unwrap_err();
    assert_eq!(classify(&err), ErrorKind::Parse);
    assert!(format!("{err:#}").starts_with("Invalid data to upsert"));

    assert!(provider.scopes().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn boolean_keys_match_sheet_booleans() -> Result<()> {
    let backend = InMemoryBackend::new().with_sheet(
        SPREADSHEET,
        "Flags",
        [vec!["active", "label"], vec!["TRUE", "on"], vec!["FALSE", "off"]],
    );
    let (state, provider) = support::memory_state(backend);

    let mut request = params("active", json!([{"active": true, "label": "enabled"}]));
    request.sheet_name = Some("Flags".to_string());
    let response = upsert_rows(state, request).await?;

    assert_eq!((response.updated, response.inserted), (1, 0));
    let rows = provider.backend().sheet_rows(SPREADSHEET, "Flags").unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[1], vec!["TRUE", "enabled"]);
    Ok(())
}
