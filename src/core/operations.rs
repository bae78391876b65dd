use crate::utils::error::{ProxyError, Result};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static OPERATION_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid operation regex"));

/// RS.ge WayBillService operations the proxy forwards by default.
pub const DEFAULT_OPERATIONS: &[&str] = &[
    // 查詢
    "get_waybills",
    "get_waybills_ex",
    "get_buyer_waybills",
    "get_buyer_waybills_ex",
    "get_waybill",
    "get_waybill_by_number",
    "get_waybill_goods_list",
    "get_buyer_waybilll_goods_list",
    "get_name_from_tin",
    "get_tin_from_un_id",
    "get_error_codes",
    "get_akciz_codes",
    "get_waybill_types",
    "get_waybill_units",
    "get_trans_types",
    "get_server_time",
    "what_is_my_ip",
    "chek_service_user",
    // 買方動作
    "confirm_waybill",
    "reject_waybill",
    // 賣方動作
    "save_waybill",
    "send_waybill",
];

pub const SELLER_ID_REQUIRED: i64 = -101;
pub const DATE_RANGE_TOO_LARGE: i64 = -1064;

#[derive(Debug, Clone)]
pub struct OperationAllowList {
    operations: BTreeSet<String>,
}

impl OperationAllowList {
    pub fn new<I, S>(operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            operations: operations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_allowed(&self, operation: &str) -> bool {
        self.operations.contains(operation)
    }

    /// 名稱格式錯誤與不在名單內都回傳錯誤
    pub fn check(&self, operation: &str) -> Result<()> {
        if !OPERATION_NAME_RE.is_match(operation) {
            return Err(ProxyError::InvalidRequest {
                message: format!("'{}' is not a valid operation name", operation),
            });
        }
        if !self.is_allowed(operation) {
            return Err(ProxyError::OperationNotAllowed {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl Default for OperationAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATIONS.iter().copied())
    }
}
