use serde::Deserialize;

/// Query string shared by the list endpoints. Values are kept as text so a
/// malformed filter degrades instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<String>,
    pub church: Option<String>,
    pub group: Option<String>,
    pub post: Option<String>,
    pub unread: Option<String>,
}

impl ListQuery {
    /// Page size: absent uses `default`; negative or non-numeric means no limit (0)
    pub fn limit(&self, default: i64) -> i64 {
        match self.limit.as_deref().map(str::trim) {
            None | Some("") => default,
            Some(raw) => raw.parse::<i64>().map(|n| n.max(0)).unwrap_or(0),
        }
    }

    pub fn church(&self) -> Option<i64> {
        parse_id(self.church.as_deref())
    }

    pub fn group(&self) -> Option<i64> {
        parse_id(self.group.as_deref())
    }

    pub fn post(&self) -> Option<i64> {
        parse_id(self.post.as_deref())
    }

    pub fn unread_only(&self) -> bool {
        matches!(
            self.unread.as_deref().map(str::trim),
            Some("true") | Some("1") | Some("yes")
        )
    }
}

fn parse_id(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|value| value.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_limit(limit: &str) -> ListQuery {
        ListQuery {
            limit: Some(limit.to_string()),
            ..ListQuery::default()
        }
    }

    #[test]
    fn limit_falls_back_to_zero_on_bad_input() {
        assert_eq!(ListQuery::default().limit(25), 25);
        assert_eq!(with_limit("5").limit(25), 5);
        assert_eq!(with_limit("-3").limit(25), 0);
        assert_eq!(with_limit("abc").limit(25), 0);
    }

    #[test]
    fn filters_ignore_garbage() {
        let query = ListQuery {
            church: Some("2".into()),
            group: Some("x".into()),
            unread: Some("true".into()),
            ..ListQuery::default()
        };
        assert_eq!(query.church(), Some(2));
        assert_eq!(query.group(), None);
        assert!(query.unread_only());
    }
}
