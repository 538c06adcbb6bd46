// Entry fixtures

use blobsearch::core::types::SearchEngineEntry;
use chrono::{TimeZone, Utc};

/// Published entry with predictable fields
#[allow(dead_code)]
pub fn entry(tenant_id: i32, entry_id: i32, title: &str) -> SearchEngineEntry {
    entry_with(tenant_id, entry_id, title, &format!("{title} body"))
}

#[allow(dead_code)]
pub fn entry_with(tenant_id: i32, entry_id: i32, title: &str, body: &str) -> SearchEngineEntry {
    SearchEngineEntry {
        tenant_id,
        tenant_name: format!("Tenant {tenant_id}"),
        body: body.to_string(),
        group_id: 1,
        entry_id,
        is_published: true,
        entry_name: Some(format!("entry-{entry_id}")),
        publish_date: Utc.with_ymd_and_hms(2022, 5, 6, 7, 8, 9).unwrap(),
        tags: "news".to_string(),
        title: title.to_string(),
    }
}
