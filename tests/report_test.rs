mod common;

use common::{soap_result, waybill_list, SOAP_PATH};
use httpmock::prelude::*;
use rs_waybill_proxy::app::pipelines::InventoryPipeline;
use rs_waybill_proxy::core::DocumentStore;
use rs_waybill_proxy::utils::validation::Validate;
use rs_waybill_proxy::{AppState, FileDocumentStore, LocalStorage, ProxyConfig, ReportEngine};
use serde_json::{json, Value};
use tempfile::TempDir;

fn detail(id: &str, goods: &[(&str, &str, &str)]) -> String {
    let goods: String = goods
        .iter()
        .map(|(name, quantity, amount)| {
            format!(
                "<GOODS><W_NAME>{}</W_NAME><UNIT_TXT>kg</UNIT_TXT><QUANTITY>{}</QUANTITY><AMOUNT>{}</AMOUNT></GOODS>",
                name, quantity, amount
            )
        })
        .collect();
    soap_result(
        "get_waybill",
        &format!("<WAYBILL><ID>{}</ID><GOODS_LIST>{}</GOODS_LIST></WAYBILL>", id, goods),
    )
}

#[tokio::test]
async fn test_inventory_report_end_to_end() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST)
            .path(SOAP_PATH)
            .body_contains(r#"<get_waybills xmlns="#);
        then.status(200).body(waybill_list("get_waybills", &["s1"]));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path(SOAP_PATH)
            .body_contains(r#"<get_buyer_waybills xmlns="#);
        then.status(200).body(waybill_list("get_buyer_waybills", &["p1"]));
    });
    let sale_detail = server.mock(|when, then| {
        when.method(POST)
            .path(SOAP_PATH)
            .body_contains("<waybill_id>s1</waybill_id>");
        then.status(200).body(detail("s1", &[("sugar", "4", "10")]));
    });
    let purchase_detail = server.mock(|when, then| {
        when.method(POST)
            .path(SOAP_PATH)
            .body_contains("<waybill_id>p1</waybill_id>");
        then.status(200)
            .body(detail("p1", &[("Sugar", "10", "20"), ("Salt", "5", "3.5")]));
    });

    let data_dir = TempDir::new().unwrap();
    let report_dir = TempDir::new().unwrap();
    let config = ProxyConfig::from_toml_str(&format!(
        r#"
[upstream]
endpoint = "{}"

[storage]
data_dir = "{}"
report_dir = "{}"

[reports]
batch_delay_ms = 0
"#,
        server.url(SOAP_PATH),
        data_dir.path().display().to_string().replace('\\', "/"),
        report_dir.path().display().to_string().replace('\\', "/"),
    ))
    .unwrap();
    tokio_test::assert_ok!(config.validate());

    FileDocumentStore::new(data_dir.path())
        .put("uid1", "product_mappings", &json!({"SUGAR": "Sugar (white)"}))
        .await
        .unwrap();

    let state = AppState::from_config(&config).unwrap();
    let context = state
        .report_context("uid1", "2024-01-01", "2024-01-31")
        .unwrap();
    let storage = LocalStorage::new(config.report_dir());
    let engine = ReportEngine::new(InventoryPipeline::new(context, storage));

    let output = tokio_test::assert_ok!(engine.run().await);
    assert_eq!(output, "inventory_uid1_20240101-20240131.csv");
    sale_detail.assert_hits(1);
    purchase_detail.assert_hits(1);

    let csv = std::fs::read_to_string(report_dir.path().join(&output)).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("product,unit,purchased_quantity,purchased_amount,sold_quantity,sold_amount,balance_quantity")
    );
    assert!(lines.next().unwrap().starts_with("Salt,kg,"));
    assert!(lines.next().unwrap().starts_with("Sugar (white),kg,"));

    let json_path = report_dir.path().join("inventory_uid1_20240101-20240131.json");
    let rows: Value = serde_json::from_slice(&std::fs::read(json_path).unwrap()).unwrap();
    assert_eq!(rows[1]["purchased_quantity"], 10.0);
    assert_eq!(rows[1]["sold_quantity"], 4.0);
    assert_eq!(rows[1]["balance_quantity"], 6.0);
    assert_eq!(rows[0]["balance_quantity"], 5.0);
}

#[tokio::test]
async fn test_report_period_is_validated_before_any_call() {
    let server = MockServer::start();
    let upstream = server.mock(|when, then| {
        when.method(POST).path(SOAP_PATH);
        then.status(200).body(waybill_list("get_waybills", &[]));
    });

    let config = ProxyConfig::from_toml_str(&format!(
        "[upstream]\nendpoint = \"{}\"\n",
        server.url(SOAP_PATH)
    ))
    .unwrap();
    let state = AppState::from_config(&config).unwrap();

    assert!(state.report_context("uid1", "2024-02-01", "2024-01-01").is_err());
    assert!(state.report_context("uid1", "yesterday", "2024-01-01").is_err());
    upstream.assert_hits(0);
}
