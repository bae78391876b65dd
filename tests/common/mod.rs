#![allow(dead_code)]

use httpmock::prelude::*;
use rs_waybill_proxy::SoapSettings;

pub const SOAP_PATH: &str = "/WayBillService/WayBillService.asmx";

/// `<op>Response><op>Result>inner</..>` wrapped in a SOAP 1.1 envelope.
pub fn soap_result(operation: &str, inner: &str) -> String {
    soap_body(&format!(
        r#"<{op}Response xmlns="http://tempuri.org/"><{op}Result>{inner}</{op}Result></{op}Response>"#,
        op = operation,
        inner = inner
    ))
}

pub fn soap_body(inner: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<soap:Body>{}</soap:Body></soap:Envelope>"
        ),
        inner
    )
}

pub fn status_result(operation: &str, code: i64) -> String {
    soap_result(operation, &format!("<RESULT><STATUS>{}</STATUS></RESULT>", code))
}

pub fn waybill_list(operation: &str, ids: &[&str]) -> String {
    let waybills: String = ids
        .iter()
        .map(|id| {
            format!(
                "<WAYBILL><ID>{}</ID><STATUS>1</STATUS><BUYER_TIN>123456789</BUYER_TIN><FULL_AMOUNT>10.00</FULL_AMOUNT></WAYBILL>",
                id
            )
        })
        .collect();
    soap_result(operation, &format!("<WAYBILL_LIST>{}</WAYBILL_LIST>", waybills))
}

pub fn settings(server: &MockServer) -> SoapSettings {
    let mut settings = SoapSettings::new(server.url(SOAP_PATH));
    settings.chunk_concurrency = 2;
    settings
}
