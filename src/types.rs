use serde::{Deserialize, Serialize};

/// Content categories a user can search for. Everything that is not `news`
/// is served by the upstream blog endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    All,
    Blog,
    News,
    Cafe,
}

/// Upstream category routes. The Naver Open API only exposes `blog` and
/// `news`; other content types alias onto `blog`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Blog,
    News,
}

impl Endpoint {
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Blog => "blog",
            Endpoint::News => "news",
        }
    }
}

impl From<ContentType> for Endpoint {
    fn from(content_type: ContentType) -> Self {
        match content_type {
            ContentType::News => Endpoint::News,
            _ => Endpoint::Blog,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    Blog,
    News,
    Cafe,
    Other,
}

impl From<Endpoint> for ResultKind {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Blog => ResultKind::Blog,
            Endpoint::News => ResultKind::News,
        }
    }
}

/// One normalized search result, uniform across upstream endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub title: String,
    pub content: String,
    pub link: String,
    pub source: String,
    #[serde(rename = "type")]
    pub kind: ResultKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// A saved (keyword, content type) pair the user can re-invoke or attach to
/// a schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTag {
    pub id: String,
    pub keyword: String,
    pub content_type: ContentType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    Daily,
    Weekly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    #[serde(rename = "type")]
    pub recurrence: Recurrence,
    /// Fire time, zero-padded 24-hour "HH:mm".
    pub time: String,
    /// Day-of-week indexes for weekly schedules, 0 = Sunday.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<u8>>,
}

/// A user rule pairing a set of tags with a recurrence and fire time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSearch {
    pub id: String,
    pub search_tags: Vec<SearchTag>,
    pub schedule: Schedule,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
}

// Naver Open API wire types

#[derive(Debug, Deserialize)]
pub struct NaverEnvelope {
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub start: Option<u32>,
    #[serde(default)]
    pub display: Option<u32>,
    pub items: Option<Vec<NaverItem>>,
}

/// One raw upstream record. Field presence varies by endpoint: blog items
/// carry `bloggername`/`postdate`, news items `publisher`/`pubDate`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct NaverItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub bloggername: Option<String>,
    pub publisher: Option<String>,
    pub postdate: Option<String>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_aliases_onto_blog() {
        assert_eq!(Endpoint::from(ContentType::News), Endpoint::News);
        assert_eq!(Endpoint::from(ContentType::Blog), Endpoint::Blog);
        assert_eq!(Endpoint::from(ContentType::Cafe), Endpoint::Blog);
        assert_eq!(Endpoint::from(ContentType::All), Endpoint::Blog);
    }

    #[test]
    fn result_serializes_with_type_tag_and_optional_fields() {
        let result = SearchResult {
            id: "abc".to_string(),
            title: "t".to_string(),
            content: "c".to_string(),
            link: "https://example.com".to_string(),
            source: String::new(),
            kind: ResultKind::Blog,
            date: None,
            thumbnail: None,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "blog");
        assert!(json.get("date").is_none());
        assert!(json.get("thumbnail").is_none());
    }

    #[test]
    fn naver_item_tolerates_missing_fields() {
        let item: NaverItem = serde_json::from_str(r#"{"title": "only a title"}"#).unwrap();
        assert_eq!(item.title.as_deref(), Some("only a title"));
        assert!(item.link.is_none());

        let envelope: NaverEnvelope = serde_json::from_str(r#"{"total": 3}"#).unwrap();
        assert!(envelope.items.is_none());
    }
}
