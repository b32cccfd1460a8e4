use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::types::{Endpoint, NaverItem, SearchResult};

static BOLD_MARKUP: LazyLock<Regex> = LazyLock::new(|| Regex::new("</?b>").unwrap());

/// Strip the `<b>`/`</b>` highlight markup the upstream wraps around matched
/// terms, keeping the text between the tags.
pub fn strip_bold(text: &str) -> String {
    BOLD_MARKUP.replace_all(text, "").into_owned()
}

/// Map one raw upstream record into the uniform result shape. Missing
/// optional fields degrade to empty strings; there is no failure path.
pub fn normalize_item(item: &NaverItem, endpoint: Endpoint) -> SearchResult {
    SearchResult {
        id: Uuid::new_v4().to_string(),
        title: item.title.as_deref().map(strip_bold).unwrap_or_default(),
        content: item
            .description
            .as_deref()
            .map(strip_bold)
            .unwrap_or_default(),
        link: item.link.clone().unwrap_or_default(),
        source: non_empty(item.bloggername.clone())
            .or_else(|| non_empty(item.publisher.clone()))
            .unwrap_or_default(),
        kind: endpoint.into(),
        date: non_empty(item.postdate.clone()).or_else(|| non_empty(item.pub_date.clone())),
        thumbnail: non_empty(item.thumbnail.clone()),
    }
}

pub fn normalize_items(items: &[NaverItem], endpoint: Endpoint) -> Vec<SearchResult> {
    items
        .iter()
        .map(|item| normalize_item(item, endpoint))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
