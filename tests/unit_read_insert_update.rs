use anyhow::Result;
use serde_json::json;
use sheets_bridge::backend::{AccessScope, BackendCall, InMemoryBackend, ValueInputOption};
use sheets_bridge::errors::{ErrorKind, classify};
use sheets_bridge::ops::{
    InsertRowsParams, ReadRowsParams, UpdateCellsParams, insert_rows, read_rows, update_cells,
};
use sheets_bridge::rows::RawPayload;

mod support;
use support::SPREADSHEET;

fn read_params(range: Option<&str>, include_headers: Option<bool>) -> ReadRowsParams {
    ReadRowsParams {
        spreadsheet_id: Some(SPREADSHEET.to_string()),
        sheet_name: Some("People".to_string()),
        range: range.map(str::to_string),
        include_headers,
    }
}

fn update_params(range: &str, data: serde_json::Value, option: Option<&str>) -> UpdateCellsParams {
    UpdateCellsParams {
        spreadsheet_id: Some(SPREADSHEET.to_string()),
        sheet_name: Some("People".to_string()),
        range: Some(range.to_string()),
        update_data: Some(RawPayload::from(data)),
        value_input_option: option.map(str::to_string),
        confirm_update: Some(true),
    }
}

#[tokio::test(flavor = "current_thread")]
async fn read_whole_sheet_with_read_only_scope() -> Result<()> {
    let (state, provider) = support::memory_state(support::people());

    let response = read_rows(state, read_params(None, None)).await?;
    assert_eq!(response.row_count, 6);
    assert_eq!(response.range, "People");
    assert_eq!(response.rows[0], vec!["id", "name", "email"]);
    assert_eq!(provider.scopes(), vec![AccessScope::ReadOnly]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn read_range_can_drop_the_first_row() -> Result<()> {
    let (state, _provider) = support::memory_state(support::people());

    let response = read_rows(state, read_params(Some("A1:B3"), Some(false))).await?;
    assert_eq!(response.range, "People!A1:B3");
    assert_eq!(response.rows, vec![vec!["1", "Ada"], vec!["2", "Grace"]]);
    assert_eq!(response.row_count, 2);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn read_of_missing_spreadsheet_is_not_found() {
    let (state, _provider) = support::memory_state(InMemoryBackend::new());

    let err = read_rows(state, read_params(None, None)).await.unwrap_err();
    assert_eq!(classify(&err), ErrorKind::BackendNotFound);
    assert_eq!(
        format!("{err:#}"),
        "Failed to read data from Google Sheet: Requested entity was not found."
    );
}

#[tokio::test(flavor = "current_thread")]
async fn insert_appends_below_existing_rows() -> Result<()> {
    let (state, provider) = support::memory_state(support::people());

    let response = insert_rows(
        state,
        InsertRowsParams {
            spreadsheet_id: Some(SPREADSHEET.to_string()),
            sheet_name: Some("People".to_string()),
            data_to_insert: Some(RawPayload::from(
                r#"[{"id": 6, "name": "Alan", "email": "alan@example.com"},
                    {"id": 7, "name": "Kathleen"}]"#,
            )),
            include_headers: None,
        },
    )
    .await?;

    assert_eq!(response.message, "Successfully appended 2 rows");
    assert_eq!(response.updated_range, "People!A7:C8");
    assert_eq!(response.inserted_data.len(), 2);

    let rows = provider.backend().sheet_rows(SPREADSHEET, "People").unwrap();
    assert_eq!(rows[6], vec!["6", "Alan", "alan@example.com"]);
    assert_eq!(rows[7], vec!["7", "Kathleen"]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn insert_without_data_is_rejected_before_connecting() {
    let (state, provider) = support::memory_state(support::people());

    for data in [None, Some(RawPayload::from("  ")), Some(RawPayload::from("[]"))] {
        let err = insert_rows(
            state.clone(),
            InsertRowsParams {
                spreadsheet_id: Some(SPREADSHEET.to_string()),
                sheet_name: Some("People".to_string()),
                data_to_insert: data,
                include_headers: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Parsed data_to_insert is empty");
    }

    let err = insert_rows(
        state,
        InsertRowsParams {
            spreadsheet_id: Some(SPREADSHEET.to_string()),
            sheet_name: Some("People".to_string()),
            data_to_insert: Some(RawPayload::from("[1, 2]")),
            include_headers: None,
        },
    )
    .await
    .unwrap_err();
    assert_eq!(classify(&err), ErrorKind::Parse);
    assert!(provider.scopes().is_empty());
}

#[tokio::test(flavor = "current_thread")]
async fn update_writes_a_grid_at_the_anchor() -> Result<()> {
    let (state, provider) = support::memory_state(support::people());

    let response = update_cells(
        state,
        update_params("B2", json!([["Ada L.", "ada@lovelace.org"], ["Grace H."]]), None),
    )
    .await?;

    assert_eq!(response.updated_range, "People!B2:C3");
    assert_eq!((response.updated_rows, response.updated_columns), (2, 2));

    let rows = provider.backend().sheet_rows(SPREADSHEET, "People").unwrap();
    assert_eq!(rows[1], vec!["1", "Ada L.", "ada@lovelace.org"]);
    assert_eq!(rows[2], vec!["2", "Grace H.", "grace@example.com"]);

    let calls = provider.backend().calls();
    assert!(matches!(
        calls.as_slice(),
        [BackendCall::UpdateValues {
            option: ValueInputOption::Raw,
            ..
        }]
    ));
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn update_accepts_a_single_json_value() -> Result<()> {
    let (state, provider) = support::memory_state(support::people());

    let response = update_cells(
        state,
        update_params("C2", json!(r#""=1+1""#), Some("USER_ENTERED")),
    )
    .await?;
    assert_eq!(response.updated_range, "People!C2");
    assert_eq!((response.updated_rows, response.updated_columns), (1, 1));

    let calls = provider.backend().calls();
    let BackendCall::UpdateValues { option, values, .. } = &calls[0] else {
        panic!("expected an update");
    };
    assert_eq!(*option, ValueInputOption::UserEntered);
    assert_eq!(values, &vec![vec![json!("=1+1")]]);
    Ok(())
}

#[tokio::test(flavor = "current_thread")]
async fn update_rejects_unknown_input_option() {
    let (state, provider) = support::memory_state(support::people());

    let err = update_cells(state, update_params("A1", json!([["x"]]), Some("FORMATTED")))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Invalid value input option. Must be one of: RAW, USER_ENTERED"
    );
    assert!(provider.backend().calls().is_empty());

    let (state, _provider) = support::memory_state(support::people());
    let err = update_cells(state, update_params("A1", json!([["x"]]), Some("user_entered")))
        .await
        .unwrap_err();
    assert_eq!(classify(&err), ErrorKind::Validation);
}

#[tokio::test(flavor = "current_thread")]
async fn update_counts_come_from_the_write() -> Result<()> {
    let (state, _provider) = support::memory_state(support::people());

    let response = update_cells(
        state,
        update_params("B5", json!([["Barbara L."], ["Don K.", "knuth@example.com"]]), None),
    )
    .await?;

    // The widest row sets the column count, not the first.
    assert_eq!(response.updated_range, "People!B5:C6");
    assert_eq!((response.updated_rows, response.updated_columns), (2, 2));
    Ok(())
}
